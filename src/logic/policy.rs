//! Decision Policy
//!
//! Pure mapping from (label, threat flag, verification) to a decision
//! status and recommended action. No hidden state.

use serde::{Deserialize, Serialize};

use super::verification::VerificationOutcome;

/// Labels that are never escalated, compared case-insensitively
pub const BENIGN_LABELS: [&str; 3] = ["Normal Traffic", "Normal", "Benign"];

pub const ACTION_NONE: &str = "No action required. Traffic logged for audit.";
pub const ACTION_ESCALATE: &str = "Escalate to incident response: prioritize and report the threat.";
pub const ACTION_REVIEW: &str =
    "Flag for analyst review: retain verification details and await corroborating evidence.";

const DETAILS_BENIGN: &str = "Benign traffic, verification not required";

/// Operational status surfaced to analysts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionStatus {
    #[serde(rename = "Normal (No Threat)")]
    Normal,
    #[serde(rename = "Verified Threat")]
    VerifiedThreat,
    #[serde(rename = "Suspicious (Verification Failed)")]
    SuspiciousUnverified,
}

impl DecisionStatus {
    pub const ALL: [DecisionStatus; 3] = [
        DecisionStatus::Normal,
        DecisionStatus::VerifiedThreat,
        DecisionStatus::SuspiciousUnverified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Normal => "Normal (No Threat)",
            DecisionStatus::VerifiedThreat => "Verified Threat",
            DecisionStatus::SuspiciousUnverified => "Suspicious (Verification Failed)",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn action(&self) -> &'static str {
        match self {
            DecisionStatus::Normal => ACTION_NONE,
            DecisionStatus::VerifiedThreat => ACTION_ESCALATE,
            DecisionStatus::SuspiciousUnverified => ACTION_REVIEW,
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub status: DecisionStatus,
    pub action: &'static str,
    /// Verification as surfaced: forced to passed for benign traffic
    pub verification: VerificationOutcome,
}

pub fn is_benign_label(label: &str) -> bool {
    BENIGN_LABELS.iter().any(|b| b.eq_ignore_ascii_case(label.trim()))
}

/// Main policy decision function
pub fn decide(label: &str, is_threat: bool, verification: &VerificationOutcome) -> PolicyOutcome {
    let status = if is_benign_label(label) || !is_threat {
        DecisionStatus::Normal
    } else if verification.passed {
        DecisionStatus::VerifiedThreat
    } else {
        DecisionStatus::SuspiciousUnverified
    };

    let verification = match status {
        DecisionStatus::Normal if !verification.passed => VerificationOutcome::passed(DETAILS_BENIGN),
        _ => verification.clone(),
    };

    PolicyOutcome {
        status,
        action: status.action(),
        verification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_threat_is_normal_even_if_gate_failed() {
        let failed = VerificationOutcome::failed("gate said no");
        let outcome = decide("Port Scanning", false, &failed);

        assert_eq!(outcome.status, DecisionStatus::Normal);
        assert!(outcome.verification.passed);
        assert_eq!(outcome.action, ACTION_NONE);
    }

    #[test]
    fn test_benign_label_wins_over_threat_flag() {
        let failed = VerificationOutcome::failed("low confidence");
        let outcome = decide("normal traffic", true, &failed);

        assert_eq!(outcome.status, DecisionStatus::Normal);
        assert!(outcome.verification.passed);
    }

    #[test]
    fn test_verified_threat() {
        let ok = VerificationOutcome::passed("verified");
        let outcome = decide("DDoS Volumetric", true, &ok);

        assert_eq!(outcome.status, DecisionStatus::VerifiedThreat);
        assert_eq!(outcome.action, ACTION_ESCALATE);
        assert_eq!(outcome.verification, ok);
    }

    #[test]
    fn test_unverified_threat_is_suspicious() {
        let failed = VerificationOutcome::failed("low confidence");
        let outcome = decide("Port Scanning", true, &failed);

        assert_eq!(outcome.status, DecisionStatus::SuspiciousUnverified);
        assert_eq!(outcome.action, ACTION_REVIEW);
        assert!(!outcome.verification.passed);
        assert_eq!(outcome.verification.details, "low confidence");
    }

    #[test]
    fn test_status_strings() {
        for status in DecisionStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
            assert_eq!(DecisionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DecisionStatus::parse("bogus"), None);
    }
}
