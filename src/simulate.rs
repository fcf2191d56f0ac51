// Plays one tournament from a sampled strength vector.
// Team i beats team j with probability v_i / (v_i + v_j); one uniform draw per game, in canonical game order.

use rand::Rng;
use tracing::warn;

use crate::bracket::Winners;
use crate::config::DegeneratePolicy;
use crate::error::{PoolError, Result};
use crate::topology::BracketTopology;

/// Probability that a team with strength `vi` beats a team with strength `vj`.
///
/// Returns `None` when the combined strength is not a positive finite number,
/// since the ratio is undefined there.
#[inline]
pub fn win_probability(vi: f64, vj: f64) -> Option<f64> {
    let total = vi + vj;
    if total > 0.0 && total.is_finite() {
        Some(vi / total)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Simulator<'a> {
    topology: &'a BracketTopology,
    policy: DegeneratePolicy,
}

impl<'a> Simulator<'a> {
    pub fn new(topology: &'a BracketTopology, policy: DegeneratePolicy) -> Self {
        Simulator { topology, policy }
    }

    pub fn topology(&self) -> &'a BracketTopology {
        self.topology
    }

    /// Play every game and return the winners in canonical game order.
    pub fn simulate<R: Rng + ?Sized>(&self, strengths: &[f64], rng: &mut R) -> Result<Winners> {
        let num_teams = self.topology.num_teams();
        if strengths.len() != num_teams {
            return Err(PoolError::SizeMismatch {
                what: "strength vector",
                expected: num_teams,
                actual: strengths.len(),
            });
        }

        let mut winners = Vec::with_capacity(self.topology.num_games());
        let mut current_round = self.topology.initial_round().to_vec();

        while current_round.len() > 1 {
            let mut next_round = Vec::with_capacity(current_round.len() / 2);
            for pair in current_round.chunks(2) {
                let (i, j) = (pair[0], pair[1]);
                let p_i_wins = match win_probability(strengths[i], strengths[j]) {
                    Some(p) => p,
                    None => match self.policy {
                        DegeneratePolicy::CoinFlip => {
                            warn!(
                                game = winners.len() + 1,
                                team_a = i + 1,
                                team_b = j + 1,
                                "zero combined strength, deciding by coin flip"
                            );
                            0.5
                        }
                        DegeneratePolicy::Reject => {
                            return Err(PoolError::DegenerateProbability {
                                game: winners.len() + 1,
                                teams: (i + 1, j + 1),
                            })
                        }
                    },
                };
                let winner = if rng.gen::<f64>() < p_i_wins { i } else { j };
                winners.push(winner);
                next_round.push(winner);
            }
            current_round = next_round;
        }

        debug_assert_eq!(winners.len(), self.topology.num_games());
        Ok(Winners::new_unchecked(winners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::validate_winners;
    use crate::config::ModelSettings;
    use crate::strength::StrengthModel;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_win_probability() {
        assert_eq!(win_probability(0.75, 0.25), Some(0.75));
        assert_eq!(win_probability(0.0, 0.5), Some(0.0));
        assert_eq!(win_probability(0.0, 0.0), None);
        assert_eq!(win_probability(f64::NAN, 0.5), None);
    }

    #[test]
    fn test_wrong_length_strengths() {
        let sim = Simulator::new(BracketTopology::standard(), DegeneratePolicy::CoinFlip);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sim.simulate(&[0.5; 63], &mut rng).unwrap_err();
        assert!(matches!(
            err,
            PoolError::SizeMismatch { expected: 64, actual: 63, .. }
        ));
    }

    #[test]
    fn test_certain_outcomes() {
        // a team with zero strength never beats a positive one
        let topo = BracketTopology::new(4).unwrap();
        let sim = Simulator::new(&topo, DegeneratePolicy::Reject);
        let strengths = [0.9, 0.0, 0.4, 0.0];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let winners = sim.simulate(&strengths, &mut rng).unwrap();
            // topology [0, 3, 1, 2]: team 0 beats 3, team 2 beats 1, then 0 vs 2
            assert_eq!(&winners.as_slice()[..2], &[0, 2]);
        }
    }

    #[test]
    fn test_degenerate_reject() {
        let topo = BracketTopology::new(4).unwrap();
        let sim = Simulator::new(&topo, DegeneratePolicy::Reject);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = sim.simulate(&[0.0, 0.5, 0.5, 0.0], &mut rng).unwrap_err();
        match err {
            PoolError::DegenerateProbability { game, teams } => {
                assert_eq!(game, 1);
                assert_eq!(teams, (1, 4));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_coin_flip_picks_both_sides() {
        let topo = BracketTopology::new(2).unwrap();
        let sim = Simulator::new(&topo, DegeneratePolicy::CoinFlip);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut first = 0;
        for _ in 0..1000 {
            if sim.simulate(&[0.0, 0.0], &mut rng).unwrap().as_slice()[0] == 0 {
                first += 1;
            }
        }
        assert!((400..600).contains(&first), "first team won {} of 1000", first);
    }

    #[test]
    fn test_stronger_team_wins_proportionally() {
        let topo = BracketTopology::new(2).unwrap();
        let sim = Simulator::new(&topo, DegeneratePolicy::CoinFlip);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let n = 20_000;
        let wins = (0..n)
            .filter(|_| sim.simulate(&[0.6, 0.2], &mut rng).unwrap().as_slice()[0] == 0)
            .count();
        let rate = wins as f64 / n as f64;
        assert!((rate - 0.75).abs() < 0.02, "observed {}", rate);
    }

    #[test]
    fn test_same_seed_same_tournament() {
        let model = StrengthModel::new(64, &ModelSettings::default()).unwrap();
        let sim = Simulator::new(BracketTopology::standard(), DegeneratePolicy::CoinFlip);
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let v = model.sample(&mut rng);
            sim.simulate(&v, &mut rng).unwrap()
        };
        assert_eq!(run(123), run(123));
    }

    proptest! {
        #[test]
        fn prop_simulated_brackets_always_validate(seed in any::<u64>()) {
            let model = StrengthModel::new(64, &ModelSettings::default()).unwrap();
            let topo = BracketTopology::standard();
            let sim = Simulator::new(topo, DegeneratePolicy::CoinFlip);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let v = model.sample(&mut rng);
            let winners = sim.simulate(&v, &mut rng).unwrap();
            prop_assert_eq!(winners.len(), 63);
            prop_assert!(validate_winners(winners.as_slice(), topo).is_ok());
        }
    }
}
