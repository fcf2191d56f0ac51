use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ncaa_pool::config::{generate_sample_config, Config};
use ncaa_pool::report::{bracket_mapping, compare};
use ncaa_pool::{ingest, run_parallel, BracketTopology, Competition, CompetitionResult, Scorer, Simulator, StrengthModel};

/// Seed for the single tournament shown with --show-example
const DEMO_SEED: u64 = 123;

#[derive(Parser)]
#[command(name = "ncaa-pool", about = "Monte Carlo leaderboard for an NCAA bracket pool")]
struct Cli {
    /// YAML config file (defaults to config.yaml / config.yml / .ncaa-pool.yaml if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate tournaments and score every bracket in a CSV file
    Run {
        /// CSV with columns student,bracket_name,g1..g63 (team ids 1-64)
        #[arg(long)]
        brackets: PathBuf,

        /// Number of simulated tournaments
        #[arg(long)]
        trials: Option<u64>,

        #[arg(long)]
        seed: Option<u64>,

        /// Parallel workers (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,

        /// Also write the leaderboards as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print one simulated tournament against the first bracket before the run
        #[arg(long)]
        show_example: bool,
    },
    /// Print which seeds can appear in each game g1..g63
    Mapping,
    /// Print a sample configuration file
    SampleConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Mapping => {
            print!("{}", bracket_mapping(BracketTopology::standard()));
            Ok(())
        }
        Command::SampleConfig => {
            print!("{}", generate_sample_config());
            Ok(())
        }
        Command::Run {
            brackets,
            trials,
            seed,
            workers,
            json,
            show_example,
        } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(t) = trials {
                config.simulation.trials = t;
            }
            if let Some(s) = seed {
                config.simulation.seed = s;
            }
            if let Some(w) = workers {
                config.simulation.workers = if w == 0 { num_cpus::get() } else { w };
            }
            run(&config, &brackets, json.as_deref(), show_example)
        }
    }
}

fn run(config: &Config, brackets: &Path, json: Option<&Path>, show_example: bool) -> Result<()> {
    let topology = BracketTopology::standard();
    let model = StrengthModel::new(topology.num_teams(), &config.model)?;
    let scorer = Scorer::with_weights(topology, &config.scoring.round_weights)?;
    let simulator = Simulator::new(topology, config.simulation.degenerate_policy);

    let predictions = ingest::read_predictions_from_path(brackets, topology)
        .with_context(|| format!("reading brackets from {}", brackets.display()))?;

    if show_example {
        let mut rng = ChaCha8Rng::seed_from_u64(DEMO_SEED);
        let strengths = model.sample(&mut rng);
        let actual = simulator.simulate(&strengths, &mut rng)?;
        println!("{}", compare(topology, &scorer, &strengths, &actual, &predictions[0])?);
    }

    let sim = &config.simulation;
    info!(
        brackets = predictions.len(),
        trials = sim.trials,
        seed = sim.seed,
        workers = sim.workers,
        "starting competition"
    );

    let result = if sim.workers > 1 {
        run_parallel(&predictions, &model, simulator, &scorer, sim.seed, sim.trials, sim.workers)?
    } else {
        let mut competition = Competition::new(&predictions, &model, simulator, &scorer, sim.seed)?;
        let pb = ProgressBar::new(sim.trials);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{elapsed_precise} [{bar:40}] {pos}/{len} tournaments ({eta})")
                .progress_chars("=> "),
        );
        let chunk = sim.chunk_size.max(1);
        let mut remaining = sim.trials;
        while remaining > 0 {
            let n = remaining.min(chunk);
            competition.run(n)?;
            pb.inc(n);
            remaining -= n;
        }
        pb.finish_and_clear();
        competition.result()
    };
    info!(trials = result.trials, "competition finished");

    print_leaderboards(&result);

    if let Some(path) = json {
        fs::write(path, result.to_json()?).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote leaderboards to {}", path.display());
    }
    Ok(())
}

fn print_leaderboards(result: &CompetitionResult) {
    println!("Bracket points (tournaments' points split among ties):");
    for s in result.standings() {
        println!("  {} [{}]: {:.3}", s.student, s.bracket_name.unwrap_or_default(), s.points);
    }

    println!("\nStudent leaderboard (total points over all brackets):");
    for s in result.entrant_standings() {
        println!("  {}: {:.3}", s.student, s.points);
    }
}
