//! Traffic Classifier
//!
//! Wraps the random forest with the fixed protocol vocabulary and the
//! synthetic training-set generation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::forest::{ForestParams, RandomForest};
use super::{ModelError, ThreatModel};
use crate::logic::flow::{FlowObservation, Protocol, TrainingSample};
use crate::logic::sampler::{synthesize_training_set, DEFAULT_TRAINING_SAMPLES};

/// Maps protocols to category indices
///
/// Vocabulary is fixed and sorted: ICMP=0, TCP=1, UDP=2. Anything else
/// falls back to index 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolEncoder;

impl ProtocolEncoder {
    pub const VOCABULARY: [&'static str; 3] = ["ICMP", "TCP", "UDP"];

    pub fn encode(&self, protocol: &Protocol) -> usize {
        Self::VOCABULARY
            .iter()
            .position(|name| name.eq_ignore_ascii_case(protocol.as_str()))
            .unwrap_or(0)
    }
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of synthetic samples to generate
    pub samples: usize,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_TRAINING_SAMPLES,
            forest: ForestParams::default(),
        }
    }
}

/// Random forest over (protocol, bytes, duration)
#[derive(Debug)]
pub struct TrafficClassifier {
    forest: RandomForest,
    encoder: ProtocolEncoder,
}

impl TrafficClassifier {
    /// Fit on an explicit training set
    pub fn train(samples: &[TrainingSample], params: &ForestParams) -> Result<Self, ModelError> {
        let encoder = ProtocolEncoder;
        let rows: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| Self::features(&encoder, &s.observation).to_vec())
            .collect();
        let labels: Vec<bool> = samples.iter().map(|s| s.label.is_attack()).collect();

        let forest = RandomForest::fit(&rows, &labels, params)?;
        Ok(Self { forest, encoder })
    }

    /// Generate the synthetic training set and fit on it
    ///
    /// The training set is seeded from the forest seed, so the same
    /// config always yields the same model.
    pub fn train_synthetic(config: &TrainingConfig) -> Result<Self, ModelError> {
        let mut rng = StdRng::seed_from_u64(config.forest.seed);
        let samples = synthesize_training_set(config.samples, &mut rng);

        let attacks = samples.iter().filter(|s| s.label.is_attack()).count();
        tracing::debug!(
            "Synthesized {} training samples ({} attack, {} normal)",
            samples.len(),
            attacks,
            samples.len() - attacks
        );

        Self::train(&samples, &config.forest)
    }

    fn features(encoder: &ProtocolEncoder, observation: &FlowObservation) -> [f64; 3] {
        [
            encoder.encode(&observation.protocol) as f64,
            observation.byte_count as f64,
            observation.duration_seconds as f64,
        ]
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}

impl ThreatModel for TrafficClassifier {
    fn attack_probability(&self, observation: &FlowObservation) -> f64 {
        let row = Self::features(&self.encoder, observation);
        self.forest.predict_proba(&row)
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::flow::FlowLabel;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            samples: 1000,
            forest: ForestParams {
                n_trees: 30,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_encoder_vocabulary() {
        let enc = ProtocolEncoder;
        assert_eq!(enc.encode(&Protocol::Icmp), 0);
        assert_eq!(enc.encode(&Protocol::Tcp), 1);
        assert_eq!(enc.encode(&Protocol::Udp), 2);
    }

    #[test]
    fn test_unknown_protocol_falls_back_to_zero() {
        let enc = ProtocolEncoder;
        assert_eq!(enc.encode(&Protocol::Other("SCTP".to_string())), 0);
        assert_eq!(enc.encode(&Protocol::Other(String::new())), 0);
    }

    #[test]
    fn test_unknown_protocol_does_not_panic_at_inference() {
        let model = TrafficClassifier::train_synthetic(&small_config()).unwrap();
        let obs = FlowObservation::new(Protocol::Other("GRE".to_string()), 500, 0);
        let p = model.attack_probability(&obs);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_unknown_protocol_scores_like_icmp() {
        let model = TrafficClassifier::train_synthetic(&small_config()).unwrap();

        for (bytes, duration) in [(1500, 4), (500, 0), (25_000, 30)] {
            let unknown = model.attack_probability(&FlowObservation::new(
                Protocol::Other("SCTP".to_string()),
                bytes,
                duration,
            ));
            let icmp = model.attack_probability(&FlowObservation::new(Protocol::Icmp, bytes, duration));
            assert_eq!(unknown, icmp, "bytes = {bytes}, duration = {duration}");
        }
    }

    #[test]
    fn test_attack_shaped_flows_score_higher() {
        let model = TrafficClassifier::train_synthetic(&small_config()).unwrap();

        let benign = model.attack_probability(&FlowObservation::new(Protocol::Tcp, 500, 0));
        let volumetric = model.attack_probability(&FlowObservation::new(Protocol::Udp, 30_000, 30));
        let smurf = model.attack_probability(&FlowObservation::new(Protocol::Icmp, 20_000, 40));

        assert!(benign < 0.5, "benign = {benign}");
        assert!(volumetric > 0.78, "volumetric = {volumetric}");
        assert!(smurf > 0.78, "smurf = {smurf}");
        assert!(volumetric > benign);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let a = TrafficClassifier::train_synthetic(&small_config()).unwrap();
        let b = TrafficClassifier::train_synthetic(&small_config()).unwrap();

        let flow = FlowObservation::new(Protocol::Tcp, 2400, 3);
        assert_eq!(a.attack_probability(&flow), b.attack_probability(&flow));
    }

    #[test]
    fn test_empty_training_set_is_error() {
        let result = TrafficClassifier::train(&[], &ForestParams::default());
        assert!(matches!(result, Err(ModelError::EmptyTrainingSet)));
    }

    #[test]
    fn test_train_on_explicit_samples() {
        let samples: Vec<TrainingSample> = (0..40)
            .map(|i| TrainingSample {
                observation: FlowObservation::new(Protocol::Tcp, if i < 20 { 100 } else { 30_000 }, 0),
                label: if i < 20 { FlowLabel::Normal } else { FlowLabel::Attack },
            })
            .collect();

        let model = TrafficClassifier::train(&samples, &ForestParams::default()).unwrap();
        assert!(model.attack_probability(&FlowObservation::new(Protocol::Tcp, 40_000, 0)) > 0.9);
        assert!(model.attack_probability(&FlowObservation::new(Protocol::Tcp, 50, 0)) < 0.1);
    }
}
