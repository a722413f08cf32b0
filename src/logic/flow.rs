//! Flow Types
//!
//! Data structures for one traffic-flow observation.
//! No classification logic lives here.

use serde::{Deserialize, Serialize};

// ============================================================================
// PROTOCOL
// ============================================================================

/// Transport protocol of a flow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Anything outside the model vocabulary (only reachable from CSV input)
    Other(String),
}

impl Protocol {
    /// Parse a protocol name, case-insensitive
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "TCP" => Protocol::Tcp,
            "UDP" => Protocol::Udp,
            "ICMP" => Protocol::Icmp,
            _ => Protocol::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        Protocol::parse(&value)
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

/// One synthesized (or replayed) network flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowObservation {
    pub protocol: Protocol,
    pub byte_count: u64,
    pub duration_seconds: u64,
}

impl FlowObservation {
    pub fn new(protocol: Protocol, byte_count: u64, duration_seconds: u64) -> Self {
        Self {
            protocol,
            byte_count,
            duration_seconds,
        }
    }
}

/// Ground-truth label for training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowLabel {
    Normal,
    Attack,
}

impl FlowLabel {
    pub fn is_attack(&self) -> bool {
        matches!(self, FlowLabel::Attack)
    }
}

/// Observation plus label, used only while fitting the model
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub observation: FlowObservation,
    pub label: FlowLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_case_insensitive() {
        assert_eq!(Protocol::parse("tcp"), Protocol::Tcp);
        assert_eq!(Protocol::parse(" Udp "), Protocol::Udp);
        assert_eq!(Protocol::parse("ICMP"), Protocol::Icmp);
        assert_eq!(Protocol::parse("sctp"), Protocol::Other("sctp".to_string()));
    }

    #[test]
    fn test_protocol_serializes_as_name() {
        let obs = FlowObservation::new(Protocol::Udp, 12_000, 15);
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["protocol"], "UDP");

        let back: FlowObservation = serde_json::from_value(json).unwrap();
        assert_eq!(back, obs);
    }
}
