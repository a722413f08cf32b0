//! Feature Sampler
//!
//! Stand-in for real traffic capture. Produces flows from three
//! hand-tuned regimes, and synthesizes the labeled training set the
//! classifier is fitted on at start-up.

use rand::seq::SliceRandom;
use rand::Rng;

use super::flow::{FlowLabel, FlowObservation, Protocol, TrainingSample};

// ============================================================================
// LIVE SAMPLING REGIMES
// ============================================================================

/// Probability of an adversarial-style flow (overlaps attack space)
pub const ADVERSARIAL_PROBABILITY: f64 = 0.15;

/// Probability of a volumetric flow, among non-adversarial draws
pub const VOLUMETRIC_PROBABILITY: f64 = 0.2;

// ============================================================================
// TRAINING REGIMES
// ============================================================================

/// Share of attack samples in the synthetic training set
pub const TRAINING_ATTACK_PROBABILITY: f64 = 0.3;

/// Default size of the synthetic training set
pub const DEFAULT_TRAINING_SAMPLES: usize = 1000;

const ATTACK_PROTOCOLS: [Protocol; 3] = [Protocol::Udp, Protocol::Icmp, Protocol::Tcp];
const NORMAL_PROTOCOLS: [Protocol; 2] = [Protocol::Tcp, Protocol::Udp];

/// Source of flows for the decision pipeline
pub trait FlowSource: Send + Sync {
    fn sample(&self) -> FlowObservation;
}

/// Default flow source drawing from the live regimes
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSampler;

impl SyntheticSampler {
    pub fn new() -> Self {
        Self
    }

    /// Draw one flow from the given RNG
    pub fn sample_with<R: Rng + ?Sized>(rng: &mut R) -> FlowObservation {
        if rng.gen::<f64>() < ADVERSARIAL_PROBABILITY {
            FlowObservation::new(
                Protocol::Tcp,
                rng.gen_range(1600..=3000),
                rng.gen_range(2..=5),
            )
        } else if rng.gen::<f64>() < VOLUMETRIC_PROBABILITY {
            FlowObservation::new(
                Protocol::Udp,
                rng.gen_range(10_000..=40_000),
                rng.gen_range(10..=30),
            )
        } else {
            FlowObservation::new(Protocol::Tcp, rng.gen_range(100..=1200), 0)
        }
    }
}

impl FlowSource for SyntheticSampler {
    fn sample(&self) -> FlowObservation {
        Self::sample_with(&mut rand::thread_rng())
    }
}

/// Synthetic source address for the traffic context
pub fn synthetic_source_ip() -> String {
    format!("192.168.1.{}", rand::thread_rng().gen_range(2..=254))
}

/// Generate the labeled training set
pub fn synthesize_training_set<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<TrainingSample> {
    (0..count)
        .map(|_| {
            if rng.gen::<f64>() < TRAINING_ATTACK_PROBABILITY {
                let protocol = ATTACK_PROTOCOLS
                    .choose(rng)
                    .cloned()
                    .unwrap_or(Protocol::Tcp);
                TrainingSample {
                    observation: FlowObservation::new(
                        protocol,
                        rng.gen_range(1000..=50_000),
                        rng.gen_range(5..=60),
                    ),
                    label: FlowLabel::Attack,
                }
            } else {
                let protocol = NORMAL_PROTOCOLS
                    .choose(rng)
                    .cloned()
                    .unwrap_or(Protocol::Tcp);
                TrainingSample {
                    observation: FlowObservation::new(
                        protocol,
                        rng.gen_range(64..=1500),
                        rng.gen_range(0..=2),
                    ),
                    label: FlowLabel::Normal,
                }
            }
        })
        .collect()
}
