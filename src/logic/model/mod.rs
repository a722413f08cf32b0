//! Model Module - Attack probability inference
//!
//! The classifier is trained once at start-up and then only read.
//! Callers hold it through the [`ThreatModel`] trait so tests can swap
//! in fixed-probability models.

pub mod classifier;
pub mod forest;

pub use classifier::{ProtocolEncoder, TrafficClassifier, TrainingConfig};
pub use forest::{ForestParams, RandomForest};

use super::flow::FlowObservation;

/// Errors raised while fitting a model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training set has {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("training rows have inconsistent feature counts")]
    RaggedFeatures,

    #[error("invalid model parameters: {0}")]
    InvalidParams(String),

    #[error("tree fitting failed: {0}")]
    Fit(String),
}

/// Anything that can score a flow
pub trait ThreatModel: Send + Sync {
    /// Attack probability in [0, 1]
    fn attack_probability(&self, observation: &FlowObservation) -> f64;

    /// Short name for logs and traffic context
    fn name(&self) -> &'static str {
        "model"
    }
}
