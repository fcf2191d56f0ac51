use crate::bracket::Prediction;
use crate::error::{PoolError, Result};
use crate::scoring::Scorer;
use crate::simulate::Simulator;
use crate::strength::StrengthModel;
use fnv::FnvHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

//This file runs the pool itself: simulate a tournament, score every submitted bracket against it,
//and give that tournament's point to the best bracket. Ties split the point evenly.
//
//All draws come from one ChaCha stream seeded once, in a fixed order (strengths, then games), so
//a (seed, trial count, bracket list) triple always produces the same leaderboard. Running N trials
//and then M more is the same as running N + M in one go.
//
//Parallel runs give every worker its own ChaCha stream (same seed, different stream id) and add the
//partial totals together in worker order at the end.

/// Scoring brackets in parallel only pays off for big pools
const PAR_SCORING_THRESHOLD: usize = 256;

/// Split one point evenly between every score tied for the maximum.
/// Returns how many brackets shared the point.
pub fn split_point(scores: &[u32], totals: &mut [f64]) -> usize {
    let max_score = match scores.iter().max() {
        Some(&m) => m,
        None => return 0,
    };
    let tied = scores.iter().filter(|&&s| s == max_score).count();
    let points_each = 1.0 / tied as f64;
    for (total, _) in totals
        .iter_mut()
        .zip(scores)
        .filter(|(_, &s)| s == max_score)
    {
        *total += points_each;
    }
    tied
}

pub struct Competition<'a> {
    predictions: &'a [Prediction],
    model: &'a StrengthModel,
    simulator: Simulator<'a>,
    scorer: &'a Scorer,
    rng: ChaCha8Rng,
    totals: Vec<f64>,
    scores: Vec<u32>,
    trials: u64,
}

impl<'a> Competition<'a> {
    /// Start a competition on a single random stream seeded with `seed`.
    pub fn new(
        predictions: &'a [Prediction],
        model: &'a StrengthModel,
        simulator: Simulator<'a>,
        scorer: &'a Scorer,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(predictions, model, simulator, scorer, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(
        predictions: &'a [Prediction],
        model: &'a StrengthModel,
        simulator: Simulator<'a>,
        scorer: &'a Scorer,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        if predictions.is_empty() {
            return Err(PoolError::NoPredictions);
        }
        let topology = simulator.topology();
        if model.num_teams() != topology.num_teams() {
            return Err(PoolError::SizeMismatch {
                what: "strength model",
                expected: topology.num_teams(),
                actual: model.num_teams(),
            });
        }
        if scorer.num_games() != topology.num_games() {
            return Err(PoolError::SizeMismatch {
                what: "scoring rule",
                expected: topology.num_games(),
                actual: scorer.num_games(),
            });
        }
        for p in predictions {
            if p.winners.len() != topology.num_games() {
                return Err(PoolError::SizeMismatch {
                    what: "winner sequence",
                    expected: topology.num_games(),
                    actual: p.winners.len(),
                }
                .for_prediction(&p.student, &p.bracket_name));
            }
        }

        Ok(Competition {
            predictions,
            model,
            simulator,
            scorer,
            rng,
            totals: vec![0.0; predictions.len()],
            scores: vec![0; predictions.len()],
            trials: 0,
        })
    }

    /// Trials completed so far.
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Accumulated points per prediction, in prediction order.
    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    /// Play one tournament and award its point. A failed trial leaves earlier totals untouched.
    pub fn run_trial(&mut self) -> Result<usize> {
        let strengths = self.model.sample(&mut self.rng);
        self.play(&strengths)
    }

    // Simulate from `strengths`, then score and award. Totals only change once the tournament is complete.
    fn play(&mut self, strengths: &[f64]) -> Result<usize> {
        let actual = self.simulator.simulate(strengths, &mut self.rng)?;
        let actual = actual.as_slice();
        let scorer = self.scorer;

        if self.predictions.len() >= PAR_SCORING_THRESHOLD {
            self.predictions
                .par_iter()
                .map(|p| scorer.score_unchecked(p.winners.as_slice(), actual))
                .collect_into_vec(&mut self.scores);
        } else {
            for (score, p) in self.scores.iter_mut().zip(self.predictions) {
                *score = scorer.score_unchecked(p.winners.as_slice(), actual);
            }
        }

        let tied = split_point(&self.scores, &mut self.totals);
        self.trials += 1;
        Ok(tied)
    }

    /// Run `n` more trials on the same stream.
    pub fn run(&mut self, n: u64) -> Result<()> {
        for _ in 0..n {
            self.run_trial()?;
        }
        debug!(trials = self.trials, "competition progress");
        Ok(())
    }

    pub fn result(&self) -> CompetitionResult {
        CompetitionResult::from_totals(self.predictions, &self.totals, self.trials)
    }
}

/// Run `trials` tournaments split over `workers` independent streams.
///
/// Worker `w` draws from stream `w + 1` of the ChaCha generator seeded with `seed`, so no two
/// workers share draws. The first `trials % workers` workers run one extra trial.
pub fn run_parallel<'a>(
    predictions: &'a [Prediction],
    model: &'a StrengthModel,
    simulator: Simulator<'a>,
    scorer: &'a Scorer,
    seed: u64,
    trials: u64,
    workers: usize,
) -> Result<CompetitionResult> {
    let workers = workers.max(1);
    let base = trials / workers as u64;
    let extra = trials % workers as u64;
    info!(trials, workers, "running competition in parallel");

    let partials: Vec<Vec<f64>> = (0..workers)
        .into_par_iter()
        .map(|w| -> Result<Vec<f64>> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(w as u64 + 1);
            let mut competition = Competition::with_rng(predictions, model, simulator, scorer, rng)?;
            let n = base + u64::from((w as u64) < extra);
            competition.run(n)?;
            Ok(competition.totals)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut totals = vec![0.0; predictions.len()];
    for partial in &partials {
        for (total, p) in totals.iter_mut().zip(partial) {
            *total += p;
        }
    }
    Ok(CompetitionResult::from_totals(predictions, &totals, trials))
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub student: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bracket_name: Option<String>,
    pub points: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetitionResult {
    pub trials: u64,
    /// (student, bracket_name) -> points
    pub bracket_points: FnvHashMap<(String, String), f64>,
    /// student -> points summed over their brackets
    pub entrant_points: FnvHashMap<String, f64>,
}

impl CompetitionResult {
    pub fn from_totals(predictions: &[Prediction], totals: &[f64], trials: u64) -> Self {
        let mut bracket_points = FnvHashMap::default();
        let mut entrant_points = FnvHashMap::default();
        for (p, &points) in predictions.iter().zip(totals) {
            *bracket_points
                .entry((p.student.clone(), p.bracket_name.clone()))
                .or_insert(0.0) += points;
            *entrant_points.entry(p.student.clone()).or_insert(0.0) += points;
        }
        CompetitionResult {
            trials,
            bracket_points,
            entrant_points,
        }
    }

    /// Brackets by points, best first.
    pub fn standings(&self) -> Vec<Standing> {
        let mut out: Vec<Standing> = self
            .bracket_points
            .iter()
            .map(|((student, bracket), &points)| Standing {
                student: student.clone(),
                bracket_name: Some(bracket.clone()),
                points,
            })
            .collect();
        out.sort_by(by_points_then_name);
        out
    }

    /// Students by points, best first.
    pub fn entrant_standings(&self) -> Vec<Standing> {
        let mut out: Vec<Standing> = self
            .entrant_points
            .iter()
            .map(|(student, &points)| Standing {
                student: student.clone(),
                bracket_name: None,
                points,
            })
            .collect();
        out.sort_by(by_points_then_name);
        out
    }

    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Export {
            trials: u64,
            brackets: Vec<Standing>,
            students: Vec<Standing>,
        }
        let export = Export {
            trials: self.trials,
            brackets: self.standings(),
            students: self.entrant_standings(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

fn by_points_then_name(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .partial_cmp(&a.points)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.student.cmp(&b.student))
        .then_with(|| a.bracket_name.cmp(&b.bracket_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::Winners;
    use crate::config::{DegeneratePolicy, ModelSettings};
    use crate::topology::BracketTopology;
    use proptest::prelude::*;

    struct Fixture {
        predictions: Vec<Prediction>,
        model: StrengthModel,
        scorer: Scorer,
    }

    // chalk, an all-upsets bracket and a favourites-but-seed-2-champion bracket
    fn fixture() -> Fixture {
        let topo = BracketTopology::standard();
        let chalk = Winners::favorites(topo).as_slice().to_vec();

        let mut upsets = Vec::with_capacity(63);
        let mut round = topo.initial_round().to_vec();
        while round.len() > 1 {
            round = round.chunks(2).map(|p| p[0].max(p[1])).collect();
            upsets.extend_from_slice(&round);
        }

        let mut seed2 = chalk.clone();
        seed2[62] = 1;

        let predictions = vec![
            Prediction::new("alice", "chalk", chalk, topo).unwrap(),
            Prediction::new("bob", "upsets", upsets, topo).unwrap(),
            Prediction::new("alice", "seed2", seed2, topo).unwrap(),
        ];
        Fixture {
            predictions,
            model: StrengthModel::new(64, &ModelSettings::default()).unwrap(),
            scorer: Scorer::standard(topo),
        }
    }

    fn simulator() -> Simulator<'static> {
        Simulator::new(BracketTopology::standard(), DegeneratePolicy::CoinFlip)
    }

    #[test]
    fn test_split_point() {
        let mut totals = vec![0.0; 4];
        assert_eq!(split_point(&[5, 9, 9, 1], &mut totals), 2);
        assert_eq!(totals, vec![0.0, 0.5, 0.5, 0.0]);
        assert_eq!(split_point(&[3, 3, 3, 3], &mut totals), 4);
        assert_eq!(totals, vec![0.25, 0.75, 0.75, 0.25]);
        assert_eq!(split_point(&[], &mut []), 0);
    }

    #[test]
    fn test_points_sum_to_trials() {
        let f = fixture();
        let mut comp = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, 0).unwrap();
        comp.run(200).unwrap();
        let total: f64 = comp.totals().iter().sum();
        assert!((total - 200.0).abs() < 1e-9);
        assert_eq!(comp.trials(), 200);
    }

    #[test]
    fn test_chalk_beats_upsets() {
        let f = fixture();
        let mut comp = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, 1).unwrap();
        comp.run(500).unwrap();
        let result = comp.result();
        let chalk = result.bracket_points[&("alice".to_string(), "chalk".to_string())];
        let upsets = result.bracket_points[&("bob".to_string(), "upsets".to_string())];
        assert!(chalk > upsets, "chalk {} vs upsets {}", chalk, upsets);
    }

    #[test]
    fn test_entrant_totals_sum_brackets() {
        let f = fixture();
        let mut comp = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, 2).unwrap();
        comp.run(100).unwrap();
        let result = comp.result();
        let alice = result.bracket_points[&("alice".to_string(), "chalk".to_string())]
            + result.bracket_points[&("alice".to_string(), "seed2".to_string())];
        assert!((result.entrant_points["alice"] - alice).abs() < 1e-12);
        assert_eq!(result.entrant_points.len(), 2);
        assert_eq!(result.trials, 100);
    }

    #[test]
    fn test_same_seed_same_leaderboard() {
        let f = fixture();
        let run = |seed| {
            let mut comp = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, seed).unwrap();
            comp.run(150).unwrap();
            comp.totals().to_vec()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_continuing_matches_single_run() {
        let f = fixture();
        let mut split = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, 7).unwrap();
        split.run(120).unwrap();
        split.run(80).unwrap();

        let mut whole = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, 7).unwrap();
        whole.run(200).unwrap();

        assert_eq!(split.totals(), whole.totals());
        assert_eq!(split.result(), whole.result());
    }

    #[test]
    fn test_identical_brackets_split_every_point() {
        let f = fixture();
        let twins = vec![f.predictions[0].clone(), {
            let mut p = f.predictions[0].clone();
            p.student = "carol".to_string();
            p
        }];
        let mut comp = Competition::new(&twins, &f.model, simulator(), &f.scorer, 3).unwrap();
        for _ in 0..20 {
            assert_eq!(comp.run_trial().unwrap(), 2);
        }
        assert_eq!(comp.totals(), &[10.0, 10.0]);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let f = fixture();
        assert!(matches!(
            Competition::new(&[], &f.model, simulator(), &f.scorer, 0),
            Err(PoolError::NoPredictions)
        ));
    }

    #[test]
    fn test_mismatched_model_rejected() {
        let f = fixture();
        let small = StrengthModel::new(32, &ModelSettings::default()).unwrap();
        assert!(matches!(
            Competition::new(&f.predictions, &small, simulator(), &f.scorer, 0),
            Err(PoolError::SizeMismatch { what: "strength model", .. })
        ));
    }

    #[test]
    fn test_single_bracket_wins_every_trial() {
        let topo = BracketTopology::new(2).unwrap();
        let model = StrengthModel::new(2, &ModelSettings::default()).unwrap();
        let scorer = Scorer::standard(&topo);
        let predictions = vec![Prediction::new("a", "x", vec![0], &topo).unwrap()];
        let sim = Simulator::new(&topo, DegeneratePolicy::Reject);
        let mut comp = Competition::new(&predictions, &model, sim, &scorer, 0).unwrap();
        comp.run(10).unwrap();
        assert_eq!(comp.totals(), &[10.0]);
        assert_eq!(comp.trials(), 10);
    }

    #[test]
    fn test_rejected_trial_keeps_earlier_totals() {
        let topo = BracketTopology::new(4).unwrap();
        let model = StrengthModel::new(4, &ModelSettings::default()).unwrap();
        let scorer = Scorer::standard(&topo);
        let predictions = vec![
            Prediction::new("a", "chalk", vec![0, 1, 0], &topo).unwrap(),
            Prediction::new("b", "upset", vec![3, 2, 2], &topo).unwrap(),
        ];
        let sim = Simulator::new(&topo, DegeneratePolicy::Reject);
        let mut comp = Competition::new(&predictions, &model, sim, &scorer, 11).unwrap();
        comp.run(25).unwrap();
        let before = comp.totals().to_vec();

        // seeds 1 and 4 both at zero strength make game 1 undefined
        let err = comp.play(&[0.0, 0.7, 0.6, 0.0]).unwrap_err();
        assert!(matches!(err, PoolError::DegenerateProbability { game: 1, teams: (1, 4) }));
        assert_eq!(comp.totals(), before.as_slice());
        assert_eq!(comp.trials(), 25);
        assert_eq!(comp.result().trials, 25);

        // the competition is still usable afterwards
        comp.run(5).unwrap();
        assert_eq!(comp.trials(), 30);
        let total: f64 = comp.totals().iter().sum();
        assert!((total - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_coin_flip_trial_still_counts() {
        let topo = BracketTopology::new(4).unwrap();
        let model = StrengthModel::new(4, &ModelSettings::default()).unwrap();
        let scorer = Scorer::standard(&topo);
        let predictions = vec![Prediction::new("a", "chalk", vec![0, 1, 0], &topo).unwrap()];
        let sim = Simulator::new(&topo, DegeneratePolicy::CoinFlip);
        let mut comp = Competition::new(&predictions, &model, sim, &scorer, 11).unwrap();
        assert_eq!(comp.play(&[0.0; 4]).unwrap(), 1);
        assert_eq!(comp.totals(), &[1.0]);
        assert_eq!(comp.trials(), 1);
    }

    #[test]
    fn test_parallel_is_deterministic_and_complete() {
        let f = fixture();
        let a = run_parallel(&f.predictions, &f.model, simulator(), &f.scorer, 5, 301, 4).unwrap();
        let b = run_parallel(&f.predictions, &f.model, simulator(), &f.scorer, 5, 301, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trials, 301);
        let total: f64 = a.bracket_points.values().sum();
        assert!((total - 301.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_single_worker_uses_own_stream() {
        let f = fixture();
        let par = run_parallel(&f.predictions, &f.model, simulator(), &f.scorer, 9, 50, 1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        rng.set_stream(1);
        let mut comp = Competition::with_rng(&f.predictions, &f.model, simulator(), &f.scorer, rng).unwrap();
        comp.run(50).unwrap();
        assert_eq!(par, comp.result());
    }

    #[test]
    fn test_standings_sorted() {
        let mut result = CompetitionResult::default();
        result.bracket_points.insert(("b".into(), "1".into()), 2.0);
        result.bracket_points.insert(("a".into(), "1".into()), 2.0);
        result.bracket_points.insert(("c".into(), "1".into()), 5.5);
        result.entrant_points.insert("x".into(), 0.5);
        result.entrant_points.insert("y".into(), 1.5);

        let standings = result.standings();
        let names: Vec<&str> = standings.iter().map(|s| s.student.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(result.entrant_standings()[0].student, "y");

        let json = result.to_json().unwrap();
        assert!(json.contains("\"bracket_name\": \"1\""));
        assert!(json.contains("\"students\""));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn prop_each_trial_awards_one_point(seed in any::<u64>()) {
            let f = fixture();
            let mut comp = Competition::new(&f.predictions, &f.model, simulator(), &f.scorer, seed).unwrap();
            let mut before = 0.0;
            for _ in 0..25 {
                comp.run_trial().unwrap();
                let after: f64 = comp.totals().iter().sum();
                prop_assert!((after - before - 1.0).abs() < 1e-9);
                before = after;
            }
        }
    }
}
