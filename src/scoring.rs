// Round-weighted bracket scoring: a correct pick in round r earns weights[r] points.

use crate::error::{PoolError, Result};
use crate::topology::BracketTopology;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorer {
    round_sizes: Vec<usize>,
    weights: Vec<u32>,
    /// weight of every game in canonical order
    game_weights: Vec<u32>,
}

impl Scorer {
    /// Doubling weights: 1 point in round 1, 2 in round 2, ... so every round is worth the same.
    pub fn standard(topology: &BracketTopology) -> Self {
        let weights = (0..topology.num_rounds()).map(|r| 1u32 << r).collect();
        Self::build(topology, weights)
    }

    /// Custom weights, one per round.
    pub fn with_weights(topology: &BracketTopology, weights: &[u32]) -> Result<Self> {
        if weights.len() != topology.num_rounds() {
            return Err(PoolError::InvalidScoring(format!(
                "{} round weights given for a {}-round bracket",
                weights.len(),
                topology.num_rounds()
            )));
        }
        // every score is bounded by a perfect bracket, so checking that total covers all sums
        let perfect = topology
            .round_sizes()
            .iter()
            .zip(weights)
            .try_fold(0u32, |acc, (&size, &w)| {
                u32::try_from(size)
                    .ok()
                    .and_then(|n| n.checked_mul(w))
                    .and_then(|points| acc.checked_add(points))
            });
        if perfect.is_none() {
            return Err(PoolError::InvalidScoring(format!(
                "round weights {:?} overflow the score of a perfect bracket",
                weights
            )));
        }
        Ok(Self::build(topology, weights.to_vec()))
    }

    fn build(topology: &BracketTopology, weights: Vec<u32>) -> Self {
        let round_sizes = topology.round_sizes().to_vec();
        let game_weights = round_sizes
            .iter()
            .zip(&weights)
            .flat_map(|(&size, &w)| std::iter::repeat(w).take(size))
            .collect();
        Scorer {
            round_sizes,
            weights,
            game_weights,
        }
    }

    pub fn round_sizes(&self) -> &[usize] {
        &self.round_sizes
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    pub fn num_games(&self) -> usize {
        self.game_weights.len()
    }

    /// Score of a perfect bracket.
    pub fn max_score(&self) -> u32 {
        self.game_weights.iter().sum()
    }

    /// Score `predicted` against `actual`.
    pub fn score(&self, predicted: &[usize], actual: &[usize]) -> Result<u32> {
        for (what, seq) in [("predicted winners", predicted), ("actual winners", actual)] {
            if seq.len() != self.num_games() {
                return Err(PoolError::SizeMismatch {
                    what,
                    expected: self.num_games(),
                    actual: seq.len(),
                });
            }
        }
        Ok(self.score_unchecked(predicted, actual))
    }

    // Hot path for the competition loop; lengths were checked when the brackets were built
    #[inline]
    pub(crate) fn score_unchecked(&self, predicted: &[usize], actual: &[usize]) -> u32 {
        predicted
            .iter()
            .zip(actual)
            .zip(&self.game_weights)
            .filter(|((p, a), _)| p == a)
            .map(|(_, &w)| w)
            .sum()
    }

    /// Points per round, first round first.
    pub fn round_scores(&self, predicted: &[usize], actual: &[usize]) -> Result<Vec<u32>> {
        self.score(predicted, actual)?;
        let mut out = Vec::with_capacity(self.round_sizes.len());
        let mut start = 0;
        for (&size, &w) in self.round_sizes.iter().zip(&self.weights) {
            let correct = predicted[start..start + size]
                .iter()
                .zip(&actual[start..start + size])
                .filter(|(p, a)| p == a)
                .count() as u32;
            out.push(correct * w);
            start += size;
        }
        Ok(out)
    }
}
