//! Verification Gate
//!
//! Secondary confidence check applied after classification. A threat
//! scored between the decision threshold and the verification threshold
//! is marked unverified (possible adversarial perturbation).

use serde::{Deserialize, Serialize};

/// Minimum attack probability for a threat to count as verified
pub const VERIFICATION_THRESHOLD: f64 = 0.78;

pub const DETAILS_VERIFIED: &str = "Verified by Random Forest Ensemble";
pub const DETAILS_LOW_CONFIDENCE: &str = "Low Confidence! Possible Adversarial Perturbation detected.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub passed: bool,
    pub details: String,
}

impl VerificationOutcome {
    pub fn passed(details: impl Into<String>) -> Self {
        Self {
            passed: true,
            details: details.into(),
        }
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VerificationGate {
    pub min_confidence: f64,
}

impl Default for VerificationGate {
    fn default() -> Self {
        Self {
            min_confidence: VERIFICATION_THRESHOLD,
        }
    }
}

impl VerificationGate {
    pub fn verify(&self, is_threat: bool, attack_probability: f64) -> VerificationOutcome {
        if is_threat && attack_probability < self.min_confidence {
            VerificationOutcome::failed(DETAILS_LOW_CONFIDENCE)
        } else {
            VerificationOutcome::passed(DETAILS_VERIFIED)
        }
    }
}

/// Verify with the default threshold
pub fn verify(is_threat: bool, attack_probability: f64) -> VerificationOutcome {
    VerificationGate::default().verify(is_threat, attack_probability)
}
