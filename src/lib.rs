//! NCAA bracket pool simulator.
//!
//! Simulates a seeded 64-team single-elimination tournament many times under a per-seed
//! strength model, scores every submitted bracket against each simulated outcome, and gives
//! each tournament's point to its best bracket (ties split the point).

pub mod bracket;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pool;
pub mod report;
pub mod scoring;
pub mod simulate;
pub mod strength;
pub mod topology;

pub use bracket::{validate_winners, Prediction, Winners};
pub use config::{Config, DegeneratePolicy};
pub use error::{PoolError, Result};
pub use pool::{run_parallel, Competition, CompetitionResult, Standing};
pub use scoring::Scorer;
pub use simulate::Simulator;
pub use strength::{StrengthModel, StrengthVector, TeamDistribution};
pub use topology::{BracketTopology, NUM_GAMES, NUM_TEAMS};
