// Configuration module for the bracket pool simulator
// Supports YAML configuration files for the strength model, scoring weights, and simulation settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PoolError, Result};

/// Files tried, in order, when no --config is given
const DEFAULT_PATHS: &[&str] = &["config.yaml", "config.yml", ".ncaa-pool.yaml"];

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(PoolError::Config(format!("config file not found: {}", path)));
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            // An explicit path must load
            Some(p) => Self::from_file(p),
            None => Self::load_first_existing(DEFAULT_PATHS),
        }
    }

    // The first candidate that exists must parse; later candidates are not tried
    fn load_first_existing(candidates: &[&str]) -> Result<Self> {
        for path in candidates {
            if Path::new(path).exists() {
                let config = Self::from_file(path)
                    .map_err(|e| PoolError::Config(format!("{}: {}", path, e)))?;
                info!("loaded configuration from {}", path);
                return Ok(config);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

/// Per-seed strength distribution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Mean strength of the best seed
    #[serde(default = "default_top_mean")]
    pub top_mean: f64,

    /// Mean strength of the worst seed
    #[serde(default = "default_bottom_mean")]
    pub bottom_mean: f64,

    /// Number of top seeds drawn from a tight Beta
    #[serde(default = "default_stable_count")]
    pub stable_count: usize,

    /// Number of seeds after the stable band drawn from a wide Beta
    #[serde(default = "default_volatile_count")]
    pub volatile_count: usize,

    #[serde(default = "default_stable_concentration")]
    pub stable_concentration: f64,

    #[serde(default = "default_volatile_concentration")]
    pub volatile_concentration: f64,

    /// Concentration of each component of the boom/bust mixture
    #[serde(default = "default_bimodal_concentration")]
    pub bimodal_concentration: f64,

    /// Distance between the low and high component means
    #[serde(default = "default_bimodal_spread")]
    pub bimodal_spread: f64,

    /// Probability of drawing from the high component
    #[serde(default = "default_bimodal_mix")]
    pub bimodal_mix: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            top_mean: default_top_mean(),
            bottom_mean: default_bottom_mean(),
            stable_count: default_stable_count(),
            volatile_count: default_volatile_count(),
            stable_concentration: default_stable_concentration(),
            volatile_concentration: default_volatile_concentration(),
            bimodal_concentration: default_bimodal_concentration(),
            bimodal_spread: default_bimodal_spread(),
            bimodal_mix: default_bimodal_mix(),
        }
    }
}

fn default_top_mean() -> f64 { 0.8 }
fn default_bottom_mean() -> f64 { 0.3 }
fn default_stable_count() -> usize { 16 }
fn default_volatile_count() -> usize { 16 }
fn default_stable_concentration() -> f64 { 40.0 }
fn default_volatile_concentration() -> f64 { 10.0 }
fn default_bimodal_concentration() -> f64 { 15.0 }
fn default_bimodal_spread() -> f64 { 0.35 }
fn default_bimodal_mix() -> f64 { 0.5 }

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Points awarded for a correct pick in each round [R64, R32, Sweet16, Elite8, Final4, Championship]
    #[serde(default = "default_round_weights")]
    pub round_weights: Vec<u32>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            round_weights: default_round_weights(),
        }
    }
}

fn default_round_weights() -> Vec<u32> {
    vec![1, 2, 4, 8, 16, 32]
}

/// What to do with a game where both teams drew zero strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Decide the game with a fair coin
    #[default]
    CoinFlip,
    /// Abort the trial with an error
    Reject,
}

/// Monte Carlo settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Number of simulated tournaments
    #[serde(default = "default_trials")]
    pub trials: u64,

    /// Seed for the random stream
    #[serde(default)]
    pub seed: u64,

    /// Worker count; 1 keeps a single random stream
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub degenerate_policy: DegeneratePolicy,

    /// Trials per progress update
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            trials: default_trials(),
            seed: 0,
            workers: default_workers(),
            degenerate_policy: DegeneratePolicy::default(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_trials() -> u64 { 1_000_000 }
fn default_workers() -> usize { 1 }
fn default_chunk_size() -> u64 { 10_000 }

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    r#"# NCAA Bracket Pool Configuration
# All values shown are defaults - uncomment and modify as needed

# Team strength model (team index 0 = seed 1)
model:
  # Mean strength interpolated linearly from the best seed to the worst seed
  top_mean: 0.8
  bottom_mean: 0.3
  # Seeds 1-16: single Beta with high concentration (stable contenders)
  stable_count: 16
  stable_concentration: 40.0
  # Seeds 17-32: single Beta with low concentration (volatile)
  volatile_count: 16
  volatile_concentration: 10.0
  # Remaining seeds: 50/50 mixture of two Betas, means +/- spread/2 (boom/bust)
  bimodal_concentration: 15.0
  bimodal_spread: 0.35
  bimodal_mix: 0.5

# Scoring configuration
scoring:
  # Points per correct pick [R64, R32, Sweet16, Elite8, Final4, Championship]
  round_weights: [1, 2, 4, 8, 16, 32]

# Monte Carlo settings
simulation:
  # Number of simulated tournaments
  trials: 1000000
  # Seed for the random stream (same seed + same brackets = same leaderboard)
  seed: 0
  # Parallel workers, each with its own random stream (1 = single stream)
  workers: 1
  # Zero-strength games: "coin_flip" or "reject"
  degenerate_policy: coin_flip
  # Trials per progress bar update
  chunk_size: 10000
"#
    .to_string()
}
