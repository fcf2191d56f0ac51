// Winner sequences and submitted predictions.
// A winner sequence holds one 0-based team index per game in canonical game order; simulated
// outcomes and predictions share this shape. Predictions are validated once when they are created.

use serde::Serialize;

use crate::error::{PoolError, Result};
use crate::topology::BracketTopology;

/// Winners of every game, in canonical game order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Winners(Vec<usize>);

impl Winners {
    /// Validate `winners` against `topology`.
    pub fn parse(winners: Vec<usize>, topology: &BracketTopology) -> Result<Self> {
        validate_winners(&winners, topology)?;
        Ok(Winners(winners))
    }

    // Only for sequences produced by replaying the topology itself
    pub(crate) fn new_unchecked(winners: Vec<usize>) -> Self {
        Winners(winners)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Winner of the last game.
    pub fn champion(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The bracket where the better seed wins every game.
    pub fn favorites(topology: &BracketTopology) -> Self {
        let mut out = Vec::with_capacity(topology.num_games());
        let mut round = topology.initial_round().to_vec();
        while round.len() > 1 {
            round = round.chunks(2).map(|p| p[0].min(p[1])).collect();
            out.extend_from_slice(&round);
        }
        Winners(out)
    }
}

/// Check that `winners` replays cleanly through `topology`: every pick is one of the two
/// teams actually in that game, and each pick is carried into the next round.
pub fn validate_winners(winners: &[usize], topology: &BracketTopology) -> Result<()> {
    let num_games = topology.num_games();
    if winners.len() != num_games {
        return Err(PoolError::SizeMismatch {
            what: "winner sequence",
            expected: num_games,
            actual: winners.len(),
        });
    }

    let mut picks = winners.iter().copied();
    let mut game = 0;
    let mut current_round = topology.initial_round().to_vec();

    while current_round.len() > 1 {
        let mut next_round = Vec::with_capacity(current_round.len() / 2);
        for pair in current_round.chunks(2) {
            let w = picks.next().ok_or(PoolError::SizeMismatch {
                what: "winner sequence",
                expected: num_games,
                actual: game,
            })?;
            game += 1;

            let (i, j) = (pair[0], pair[1]);
            if w != i && w != j {
                return Err(PoolError::StructuralInconsistency {
                    game,
                    winner: w.saturating_add(1),
                    participants: (i + 1, j + 1),
                });
            }
            next_round.push(w);
        }
        current_round = next_round;
    }

    if picks.next().is_some() {
        return Err(PoolError::SizeMismatch {
            what: "winner sequence",
            expected: num_games,
            actual: winners.len(),
        });
    }
    Ok(())
}

/// One submitted bracket. (student, bracket_name) identifies it; a student may submit several.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub student: String,
    pub bracket_name: String,
    pub winners: Winners,
}

impl Prediction {
    /// Validate and build a prediction. Errors carry the student and bracket name.
    pub fn new(
        student: &str,
        bracket_name: &str,
        winners: Vec<usize>,
        topology: &BracketTopology,
    ) -> Result<Self> {
        let winners = Winners::parse(winners, topology)
            .map_err(|e| e.for_prediction(student, bracket_name))?;
        Ok(Prediction {
            student: student.to_string(),
            bracket_name: bracket_name.to_string(),
            winners,
        })
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.student, &self.bracket_name)
    }
}
