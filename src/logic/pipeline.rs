//! Decision Engine
//!
//! Sampler -> Classifier -> Verification Gate -> Decision Policy.
//! One engine is built at start-up and shared by every handler.

use std::sync::Arc;

use super::flow::FlowObservation;
use super::model::ThreatModel;
use super::policy::{self, DecisionStatus};
use super::sampler::FlowSource;
use super::threat::ClassificationResult;
use super::verification::{VerificationGate, VerificationOutcome};

/// Everything the pipeline decided about one flow
#[derive(Debug, Clone)]
pub struct Decision {
    pub observation: FlowObservation,
    pub classification: ClassificationResult,
    pub verification: VerificationOutcome,
    pub status: DecisionStatus,
    pub action: &'static str,
}

impl Decision {
    pub fn label(&self) -> &str {
        &self.classification.predicted_label
    }

    pub fn attack_probability(&self) -> f64 {
        self.classification.attack_probability
    }

    pub fn is_threat(&self) -> bool {
        self.classification.is_threat
    }
}

#[derive(Clone)]
pub struct DecisionEngine {
    model: Arc<dyn ThreatModel>,
    source: Arc<dyn FlowSource>,
    gate: VerificationGate,
}

impl DecisionEngine {
    pub fn new(model: Arc<dyn ThreatModel>, source: Arc<dyn FlowSource>) -> Self {
        Self {
            model,
            source,
            gate: VerificationGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: VerificationGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Draw a flow from the configured source
    pub fn sample_flow(&self) -> FlowObservation {
        self.source.sample()
    }

    /// Run one flow through classification, verification and policy
    pub fn evaluate(&self, observation: &FlowObservation) -> Decision {
        let probability = self.model.attack_probability(observation);
        let classification = ClassificationResult::from_probability(observation, probability);

        let gate_outcome = self.gate.verify(classification.is_threat, classification.attack_probability);
        let outcome = policy::decide(
            &classification.predicted_label,
            classification.is_threat,
            &gate_outcome,
        );

        tracing::debug!(
            protocol = %observation.protocol,
            bytes = observation.byte_count,
            duration = observation.duration_seconds,
            probability = classification.attack_probability,
            status = %outcome.status,
            "Flow evaluated"
        );

        Decision {
            observation: observation.clone(),
            classification,
            verification: outcome.verification,
            status: outcome.status,
            action: outcome.action,
        }
    }

    /// Sample a flow and evaluate it
    pub fn analyze_sampled(&self) -> Decision {
        let observation = self.sample_flow();
        self.evaluate(&observation)
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("model", &self.model.name())
            .field("gate", &self.gate)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::engine;
    use super::*;
    use crate::logic::flow::Protocol;
    use crate::logic::threat::{LABEL_DDOS, LABEL_NORMAL, LABEL_PORT_SCAN, LABEL_SMURF};

    #[test]
    fn test_forced_high_probability_volumetric() {
        let e = engine(0.9, FlowObservation::new(Protocol::Tcp, 25_000, 10));
        let d = e.analyze_sampled();

        assert_eq!(d.label(), LABEL_DDOS);
        assert_eq!(d.status, DecisionStatus::VerifiedThreat);
        assert!(d.verification.passed);
    }

    #[test]
    fn test_mid_band_is_suspicious() {
        let e = engine(0.65, FlowObservation::new(Protocol::Tcp, 2_000, 3));
        let d = e.analyze_sampled();

        assert!(d.is_threat());
        assert_eq!(d.label(), LABEL_PORT_SCAN);
        assert_eq!(d.status, DecisionStatus::SuspiciousUnverified);
        assert!(!d.verification.passed);
    }

    #[test]
    fn test_icmp_threat_is_smurf() {
        let e = engine(0.99, FlowObservation::new(Protocol::Icmp, 100, 1));
        assert_eq!(e.analyze_sampled().label(), LABEL_SMURF);
    }

    #[test]
    fn test_non_threat_always_normal_and_verified() {
        for p in [0.0, 0.25, 0.5] {
            let e = engine(p, FlowObservation::new(Protocol::Udp, 30_000, 20));
            let d = e.analyze_sampled();
            assert_eq!(d.status, DecisionStatus::Normal);
            assert_eq!(d.label(), LABEL_NORMAL);
            assert!(d.verification.passed);
        }
    }

    #[test]
    fn test_gate_boundary_through_engine() {
        let obs = FlowObservation::new(Protocol::Tcp, 1_000, 1);
        assert_eq!(engine(0.78, obs.clone()).evaluate(&obs).status, DecisionStatus::VerifiedThreat);
        assert_eq!(
            engine(0.77, obs.clone()).evaluate(&obs).status,
            DecisionStatus::SuspiciousUnverified
        );
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let obs = FlowObservation::new(Protocol::Tcp, 1_000, 1);
        let d = engine(1.7, obs.clone()).evaluate(&obs);
        assert_eq!(d.attack_probability(), 1.0);
    }
}
