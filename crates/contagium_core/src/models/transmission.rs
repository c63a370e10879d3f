//! Transmission models: per-edge probability and migrant count.

use crate::config::{MigrantPolicy, TransmissionMode, TransmissionModelConfig};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Migrant-count rule of a transmission model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransmissionSize {
    /// Count drawn from Poisson(mean) per successful edge trial.
    Poisson { mean: f64 },
    /// Fixed count per successful edge trial.
    Constant { count: usize },
}

/// One transmission model bound to a subset of hosts.
#[derive(Debug)]
pub struct TransmissionModel {
    id: u32,
    name: String,
    probability: f64,
    size: TransmissionSize,
    policy: MigrantPolicy,
}

impl TransmissionModel {
    #[must_use]
    pub fn from_config(
        id: u32,
        config: &TransmissionModelConfig,
        default_policy: MigrantPolicy,
    ) -> Self {
        let size = match config.mode {
            TransmissionMode::Poisson => TransmissionSize::Poisson {
                mean: config.transmission_size,
            },
            TransmissionMode::Constant => TransmissionSize::Constant {
                count: config.transmission_size as usize,
            },
        };
        Self {
            id,
            name: config.model_name.clone(),
            probability: config.transmission_prob,
            size,
            policy: config.size_policy.unwrap_or(default_policy),
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fallback probability for edges without a usable weight.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[must_use]
    pub fn policy(&self) -> MigrantPolicy {
        self.policy
    }

    /// Draw the migrant count for one successful edge trial.
    pub fn draw_size<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self.size {
            TransmissionSize::Constant { count } => count,
            TransmissionSize::Poisson { mean } => {
                if mean <= 0.0 {
                    0
                } else {
                    let poisson = Poisson::new(mean)
                        .expect("positive mean always admits a Poisson");
                    poisson.sample(rng) as usize
                }
            }
        }
    }
}
