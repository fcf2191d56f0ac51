// Error type shared by every stage of the pool: ingestion, validation, simulation and scoring.
// Game numbers and team ids in messages are 1-based so they line up with the g1..g63 CSV columns.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{what} has length {actual}, expected {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("inconsistent bracket: game g{game} picks team {winner}, but the game is team {} vs team {}", .participants.0, .participants.1)]
    StructuralInconsistency {
        game: usize,
        winner: usize,
        participants: (usize, usize),
    },

    #[error("invalid team id in column {column} for student {student} bracket {bracket}: got '{value}'")]
    InvalidIdentifier {
        student: String,
        bracket: String,
        column: String,
        value: String,
    },

    #[error("missing column '{0}' in CSV header")]
    MissingColumn(String),

    #[error("duplicate bracket {bracket} for student {student}")]
    DuplicatePrediction { student: String, bracket: String },

    #[error("invalid bracket for student {student} bracket {bracket}: {source}")]
    InvalidPrediction {
        student: String,
        bracket: String,
        #[source]
        source: Box<PoolError>,
    },

    #[error("game g{game} between team {} and team {} has zero combined strength", .teams.0, .teams.1)]
    DegenerateProbability { game: usize, teams: (usize, usize) },

    #[error("invalid bracket topology: {0}")]
    InvalidTopology(String),

    #[error("invalid strength model: {0}")]
    InvalidModel(String),

    #[error("invalid scoring rule: {0}")]
    InvalidScoring(String),

    #[error("no brackets read from input")]
    NoPredictions,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoolError {
    /// Attach entrant context to a validation failure.
    pub fn for_prediction(self, student: &str, bracket: &str) -> PoolError {
        PoolError::InvalidPrediction {
            student: student.to_string(),
            bracket: bracket.to_string(),
            source: Box::new(self),
        }
    }
}
