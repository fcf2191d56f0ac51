// Seeded single-elimination bracket structure.
// Game numbering used everywhere in this crate: all round-1 games left to right, then round 2, ...
// ending with the championship. Round r (0-based) has num_teams >> (r + 1) games.

use std::sync::OnceLock;

use crate::error::{PoolError, Result};

/// Number of teams in the standard field.
pub const NUM_TEAMS: usize = 64;

/// Number of games in the standard field.
pub const NUM_GAMES: usize = NUM_TEAMS - 1;

static STANDARD: OnceLock<BracketTopology> = OnceLock::new();

/// Standard seeding order for `n` teams, as 1-based seeds from the top of the bracket to the bottom.
///
/// Seed 1 meets seed n in round 1 and seeds 1 and 2 can only meet in the final.
/// `n` must be a power of two.
pub fn seed_order(n: usize) -> Vec<usize> {
    let mut order = vec![1];
    let mut size = 1;
    while size < n {
        size *= 2;
        order = order
            .iter()
            .flat_map(|&a| [a, size + 1 - a])
            .collect();
    }
    order
}

/// Round-of-n slot order plus the implied pairing of adjacent slots in every round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketTopology {
    /// 0-based team indices (seed - 1) in first round slot order
    slots: Vec<usize>,
    /// Games per round, first round first
    round_sizes: Vec<usize>,
}

impl BracketTopology {
    /// Build the topology for `num_teams` teams. The count must be a power of two, at least 2.
    pub fn new(num_teams: usize) -> Result<Self> {
        if num_teams < 2 || !num_teams.is_power_of_two() {
            return Err(PoolError::InvalidTopology(format!(
                "team count must be a power of two of at least 2, got {}",
                num_teams
            )));
        }

        Ok(Self::build(num_teams))
    }

    /// The cached 64-team topology. Computed on first use, read-only afterwards.
    pub fn standard() -> &'static BracketTopology {
        STANDARD.get_or_init(|| Self::build(NUM_TEAMS))
    }

    // `num_teams` is a power of two of at least 2
    fn build(num_teams: usize) -> Self {
        let slots = seed_order(num_teams).into_iter().map(|s| s - 1).collect();

        let mut round_sizes = Vec::new();
        let mut games = num_teams / 2;
        while games >= 1 {
            round_sizes.push(games);
            games /= 2;
        }

        BracketTopology { slots, round_sizes }
    }

    pub fn num_teams(&self) -> usize {
        self.slots.len()
    }

    pub fn num_games(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn num_rounds(&self) -> usize {
        self.round_sizes.len()
    }

    /// Team indices in first round slot order.
    pub fn initial_round(&self) -> &[usize] {
        &self.slots
    }

    /// Games per round, e.g. [32, 16, 8, 4, 2, 1] for 64 teams.
    pub fn round_sizes(&self) -> &[usize] {
        &self.round_sizes
    }

    /// Index of the first game of `round` in canonical game order.
    pub fn round_start(&self, round: usize) -> usize {
        self.round_sizes[..round].iter().sum()
    }

    /// For every game, the teams that could appear on each side of it.
    pub fn game_slots(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut out = Vec::with_capacity(self.num_games());
        let mut current: Vec<Vec<usize>> = self.slots.iter().map(|&t| vec![t]).collect();

        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len() / 2);
            for pair in current.chunks(2) {
                out.push((pair[0].clone(), pair[1].clone()));
                let mut merged = pair[0].clone();
                merged.extend_from_slice(&pair[1]);
                next.push(merged);
            }
            current = next;
        }
        out
    }
}
