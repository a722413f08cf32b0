//! Threat Classification
//!
//! Turns an attack probability into a threat flag and a human-readable
//! threat type. The threat type is derived from the flow itself, not
//! from the model.

use serde::{Deserialize, Serialize};

use super::flow::{FlowObservation, Protocol};

/// Strictly above this probability the flow is a threat
pub const ATTACK_THRESHOLD: f64 = 0.5;

/// Above this byte count a non-ICMP threat is volumetric
pub const VOLUMETRIC_BYTES: u64 = 20_000;

pub const LABEL_NORMAL: &str = "Normal Traffic";
pub const LABEL_SMURF: &str = "Smurf Attack";
pub const LABEL_DDOS: &str = "DDoS Volumetric";
pub const LABEL_PORT_SCAN: &str = "Port Scanning";

/// Classifier output for one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_label: String,
    pub attack_probability: f64,
    pub is_threat: bool,
}

impl ClassificationResult {
    pub fn from_probability(observation: &FlowObservation, attack_probability: f64) -> Self {
        let attack_probability = attack_probability.clamp(0.0, 1.0);
        let is_threat = is_threat(attack_probability);
        Self {
            predicted_label: threat_type(observation, is_threat).to_string(),
            attack_probability,
            is_threat,
        }
    }
}

pub fn is_threat(attack_probability: f64) -> bool {
    attack_probability > ATTACK_THRESHOLD
}

/// Threat type for a (possibly benign) flow
pub fn threat_type(observation: &FlowObservation, is_threat: bool) -> &'static str {
    if !is_threat {
        LABEL_NORMAL
    } else if observation.protocol == Protocol::Icmp {
        LABEL_SMURF
    } else if observation.byte_count > VOLUMETRIC_BYTES {
        LABEL_DDOS
    } else {
        LABEL_PORT_SCAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        assert!(!is_threat(0.5));
        assert!(is_threat(0.5000001));
        assert!(!is_threat(0.0));
        assert!(is_threat(1.0));
    }

    #[test]
    fn test_threat_types() {
        let icmp = FlowObservation::new(Protocol::Icmp, 50_000, 10);
        let big_udp = FlowObservation::new(Protocol::Udp, 20_001, 10);
        let edge_tcp = FlowObservation::new(Protocol::Tcp, 20_000, 10);

        assert_eq!(threat_type(&icmp, true), LABEL_SMURF);
        assert_eq!(threat_type(&big_udp, true), LABEL_DDOS);
        assert_eq!(threat_type(&edge_tcp, true), LABEL_PORT_SCAN);
        assert_eq!(threat_type(&icmp, false), LABEL_NORMAL);
    }

    #[test]
    fn test_unknown_protocol_uses_byte_rule() {
        let obs = FlowObservation::new(Protocol::Other("GRE".to_string()), 25_000, 1);
        assert_eq!(threat_type(&obs, true), LABEL_DDOS);
    }

    #[test]
    fn test_result_keeps_flag_consistent() {
        let obs = FlowObservation::new(Protocol::Tcp, 25_000, 10);
        for p in [0.0, 0.3, 0.5, 0.51, 0.78, 0.9, 1.0] {
            let result = ClassificationResult::from_probability(&obs, p);
            assert_eq!(result.is_threat, p > 0.5);
            assert_eq!(result.predicted_label == LABEL_NORMAL, !result.is_threat);
        }
    }
}
