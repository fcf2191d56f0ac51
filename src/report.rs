// Read-only views for people: one simulated tournament next to one bracket, and the
// handout that lists which seeds can reach each game.

use std::fmt;

use crate::bracket::{Prediction, Winners};
use crate::error::{PoolError, Result};
use crate::scoring::Scorer;
use crate::topology::BracketTopology;

#[derive(Debug, Clone, PartialEq)]
pub struct GameReport {
    /// 1-based game number (g1..g63)
    pub game: usize,
    pub team_a: usize,
    pub team_b: usize,
    pub strength_a: f64,
    pub strength_b: f64,
    pub actual: usize,
    pub predicted: usize,
}

impl GameReport {
    pub fn correct(&self) -> bool {
        self.actual == self.predicted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    /// 1-based round number
    pub round: usize,
    pub weight: u32,
    pub games: Vec<GameReport>,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentReport {
    pub student: String,
    pub bracket_name: String,
    pub rounds: Vec<RoundReport>,
    pub total_points: u32,
}

/// Walk the simulated tournament game by game next to `prediction`.
pub fn compare(
    topology: &BracketTopology,
    scorer: &Scorer,
    strengths: &[f64],
    actual: &Winners,
    prediction: &Prediction,
) -> Result<TournamentReport> {
    if strengths.len() != topology.num_teams() {
        return Err(PoolError::SizeMismatch {
            what: "strength vector",
            expected: topology.num_teams(),
            actual: strengths.len(),
        });
    }
    let actual = actual.as_slice();
    let predicted = prediction.winners.as_slice();
    let round_points = scorer.round_scores(predicted, actual)?;

    let mut rounds = Vec::with_capacity(topology.num_rounds());
    let mut current_round = topology.initial_round().to_vec();
    let mut idx = 0;

    for (r, (&size, &weight)) in scorer.round_sizes().iter().zip(scorer.weights()).enumerate() {
        let mut games = Vec::with_capacity(size);
        let mut next_round = Vec::with_capacity(size);
        for pair in current_round.chunks(2) {
            let (a, b) = (pair[0], pair[1]);
            games.push(GameReport {
                game: idx + 1,
                team_a: a,
                team_b: b,
                strength_a: strengths[a],
                strength_b: strengths[b],
                actual: actual[idx],
                predicted: predicted[idx],
            });
            next_round.push(actual[idx]);
            idx += 1;
        }
        rounds.push(RoundReport {
            round: r + 1,
            weight,
            games,
            points: round_points[r],
        });
        current_round = next_round;
    }

    Ok(TournamentReport {
        student: prediction.student.clone(),
        bracket_name: prediction.bracket_name.clone(),
        total_points: round_points.iter().sum(),
        rounds,
    })
}

impl fmt::Display for TournamentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Tournament vs Bracket: {} [{}] ===", self.student, self.bracket_name)?;
        writeln!(f)?;
        for round in &self.rounds {
            writeln!(f, "--- Round {} (weight {} per correct pick) ---", round.round, round.weight)?;
            for g in &round.games {
                writeln!(
                    f,
                    "G{:2}: Seed {:2} (v={:.3}) vs Seed {:2} (v={:.3})  --> actual: Seed {:2}, predicted: Seed {:2}  [{}]",
                    g.game,
                    g.team_a + 1,
                    g.strength_a,
                    g.team_b + 1,
                    g.strength_b,
                    g.actual + 1,
                    g.predicted + 1,
                    if g.correct() { "✓" } else { "✗" },
                )?;
            }
            writeln!(f, "Round {} points: {}", round.round, round.points)?;
            writeln!(f)?;
        }
        writeln!(f, "TOTAL POINTS for {} [{}]: {}", self.student, self.bracket_name, self.total_points)?;
        writeln!(f, "==============================================")
    }
}

/// For each game, the seeds that can show up on either side.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketMapping {
    /// (round, [(game, left seeds, right seeds)]) with 1-based numbers throughout
    pub rounds: Vec<(usize, Vec<(usize, Vec<usize>, Vec<usize>)>)>,
}

pub fn bracket_mapping(topology: &BracketTopology) -> BracketMapping {
    let slots = topology.game_slots();
    let seeds = |teams: &[usize]| teams.iter().map(|t| t + 1).collect::<Vec<_>>();

    let rounds = topology
        .round_sizes()
        .iter()
        .enumerate()
        .map(|(r, &size)| {
            let start = topology.round_start(r);
            let games = (start..start + size)
                .map(|g| (g + 1, seeds(&slots[g].0), seeds(&slots[g].1)))
                .collect();
            (r + 1, games)
        })
        .collect();
    BracketMapping { rounds }
}

impl fmt::Display for BracketMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (round, games) in &self.rounds {
            writeln!(f, "Round {}:", round)?;
            for (game, left, right) in games {
                writeln!(f, "  g{}: teams {:?} vs {:?}", game, left, right)?;
            }
        }
        Ok(())
    }
}
