//! Decision pipeline
//!
//! ```text
//! FlowSource ──► ThreatModel ──► VerificationGate ──► policy::decide
//!  (sampler)     (classifier)      (0.78 check)       (status, action)
//! ```

pub mod flow;
pub mod model;
pub mod pipeline;
pub mod policy;
pub mod sampler;
pub mod threat;
pub mod verification;

pub use flow::{FlowLabel, FlowObservation, Protocol, TrainingSample};
pub use model::{ModelError, ThreatModel, TrafficClassifier, TrainingConfig};
pub use pipeline::{Decision, DecisionEngine};
pub use policy::DecisionStatus;
pub use sampler::{FlowSource, SyntheticSampler};
pub use threat::ClassificationResult;
pub use verification::{VerificationGate, VerificationOutcome};
