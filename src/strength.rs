// Latent team strength model.
// Every team gets a fixed distribution over [0, 1] derived from its seed; each trial draws one value per team.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use tracing::debug;

use crate::config::ModelSettings;
use crate::error::{PoolError, Result};

/// One strength value per team index, drawn fresh for every trial.
pub type StrengthVector = Vec<f64>;

/// Distribution of one team's strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeamDistribution {
    Unimodal { alpha: f64, beta: f64 },
    /// Mixture of a low component (1) and a high component (2); `mix_weight` is the chance of component 2
    Bimodal {
        alpha1: f64,
        beta1: f64,
        alpha2: f64,
        beta2: f64,
        mix_weight: f64,
    },
}

/// Mean strength for `rank_index` (0 = best seed), linear from `top_mean` down to `bottom_mean`.
pub fn interpolate_mean(rank_index: usize, num_teams: usize, top_mean: f64, bottom_mean: f64) -> f64 {
    let t = rank_index as f64 / (num_teams - 1) as f64;
    top_mean * (1.0 - t) + bottom_mean * t
}

/// Beta shape parameters with the given mean and concentration (alpha + beta).
pub fn shape_params(mean: f64, concentration: f64) -> (f64, f64) {
    (mean * concentration, (1.0 - mean) * concentration)
}

// Ready-to-draw form of a TeamDistribution
#[derive(Debug, Clone)]
enum Sampler {
    Unimodal(Beta<f64>),
    Bimodal {
        low: Beta<f64>,
        high: Beta<f64>,
        mix_weight: f64,
    },
}

fn beta(alpha: f64, b: f64, team: usize) -> Result<Beta<f64>> {
    Beta::new(alpha, b).map_err(|e| {
        PoolError::InvalidModel(format!(
            "team {} has Beta({}, {}): {}",
            team + 1,
            alpha,
            b,
            e
        ))
    })
}

/// Immutable table of per-team distributions, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct StrengthModel {
    distributions: Vec<TeamDistribution>,
    samplers: Vec<Sampler>,
}

impl StrengthModel {
    pub fn new(num_teams: usize, settings: &ModelSettings) -> Result<Self> {
        if num_teams < 2 {
            return Err(PoolError::InvalidModel(format!(
                "need at least 2 teams, got {}",
                num_teams
            )));
        }
        if !(0.0..=1.0).contains(&settings.bimodal_mix) {
            return Err(PoolError::InvalidModel(format!(
                "bimodal_mix must be in [0, 1], got {}",
                settings.bimodal_mix
            )));
        }

        let volatile_end = settings.stable_count + settings.volatile_count;
        let half_spread = settings.bimodal_spread / 2.0;

        let mut distributions = Vec::with_capacity(num_teams);
        let mut samplers = Vec::with_capacity(num_teams);

        for i in 0..num_teams {
            let mean = interpolate_mean(i, num_teams, settings.top_mean, settings.bottom_mean);

            if i < volatile_end {
                let concentration = if i < settings.stable_count {
                    settings.stable_concentration
                } else {
                    settings.volatile_concentration
                };
                let (alpha, b) = shape_params(mean, concentration);
                samplers.push(Sampler::Unimodal(beta(alpha, b, i)?));
                distributions.push(TeamDistribution::Unimodal { alpha, beta: b });
            } else {
                let low_mean = (mean - half_spread).clamp(0.01, 0.99);
                let high_mean = (mean + half_spread).clamp(0.01, 0.99);
                let (alpha1, beta1) = shape_params(low_mean, settings.bimodal_concentration);
                let (alpha2, beta2) = shape_params(high_mean, settings.bimodal_concentration);
                samplers.push(Sampler::Bimodal {
                    low: beta(alpha1, beta1, i)?,
                    high: beta(alpha2, beta2, i)?,
                    mix_weight: settings.bimodal_mix,
                });
                distributions.push(TeamDistribution::Bimodal {
                    alpha1,
                    beta1,
                    alpha2,
                    beta2,
                    mix_weight: settings.bimodal_mix,
                });
            }
        }

        debug!(
            num_teams,
            stable = settings.stable_count.min(num_teams),
            bimodal = num_teams.saturating_sub(volatile_end),
            "built strength model"
        );

        Ok(StrengthModel {
            distributions,
            samplers,
        })
    }

    pub fn num_teams(&self) -> usize {
        self.distributions.len()
    }

    pub fn distributions(&self) -> &[TeamDistribution] {
        &self.distributions
    }

    /// Draw one strength per team, in team index order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> StrengthVector {
        self.samplers
            .iter()
            .map(|sampler| match sampler {
                Sampler::Unimodal(dist) => dist.sample(rng),
                Sampler::Bimodal {
                    low,
                    high,
                    mix_weight,
                } => {
                    if rng.gen::<f64>() < *mix_weight {
                        high.sample(rng)
                    } else {
                        low.sample(rng)
                    }
                }
            })
            .collect()
    }
}
