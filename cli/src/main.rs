//! `fusion-ekf` CLI: scenario runs, replay import/export, text data files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fusion_core::{Estimate, FusionConfig, FusionEkf, RmseAccumulator, StateVec};
use rayon::prelude::*;
use sim::data_file::{read_data_file, write_records, DataRecord};
use sim::replay::{load_replay, record, save_replay, ReplayLog};
use sim::scenarios::{Scenario, ScenarioKind};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fusion-ekf", about = "Laser/radar fusion EKF")]
struct Cli {
    /// JSON file overriding the default filter configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario and report RMSE.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
        /// Also write the measurements of the first target as a text data file
        #[arg(long)]
        export_data: Option<PathBuf>,
    },
    /// Load and re-fuse a previously recorded scenario log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fuse a text measurement file (one `L ...` / `R ...` record per line).
    Process {
        /// Path to the measurement file
        input: PathBuf,
        /// Write one estimate line per measurement to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            output,
            save_replay: save_path,
            export_data,
        } => {
            run_scenario(
                &config,
                scenario,
                seed,
                output.as_deref(),
                save_path.as_deref(),
                export_data.as_deref(),
            )?;
        }
        Commands::Replay { input, output } => {
            run_replay(&config, &input, output.as_deref())?;
        }
        Commands::Process { input, output } => {
            run_process(&config, &input, output.as_deref())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FusionConfig> {
    let Some(path) = path else {
        return Ok(FusionConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(path = %path.display(), "loaded filter configuration");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Fusion over one measurement stream
// ---------------------------------------------------------------------------

/// Result of fusing one target's measurement stream.
struct StreamOutcome {
    /// Estimate after each accepted measurement, paired with its record
    estimates: Vec<(DataRecord, Estimate)>,
    rmse: RmseAccumulator,
    rejected: usize,
}

/// Feed a chronological stream through a fresh estimator. Rejected
/// measurements are logged and skipped.
fn fuse_stream(config: &FusionConfig, records: &[DataRecord]) -> StreamOutcome {
    let mut ekf = FusionEkf::new(config.clone());
    let mut outcome = StreamOutcome {
        estimates: Vec::with_capacity(records.len()),
        rmse: RmseAccumulator::new(),
        rejected: 0,
    };

    for (idx, rec) in records.iter().enumerate() {
        match ekf.process(&rec.package) {
            Ok(estimate) => {
                if let Some(gt) = rec.ground_truth {
                    outcome
                        .rmse
                        .accumulate(&estimate.state, &StateVec::from(gt));
                }
                outcome.estimates.push((rec.clone(), estimate));
            }
            Err(e) => {
                warn!(record = idx, error = %e, "skipping measurement");
                outcome.rejected += 1;
            }
        }
    }
    outcome
}

/// Fuse every target of a log with its own estimator, in parallel.
fn fuse_log(config: &FusionConfig, log: &ReplayLog) -> (RmseAccumulator, usize, usize) {
    let streams: Vec<(u64, Vec<DataRecord>)> = log.by_target().into_iter().collect();
    let outcomes: Vec<(u64, StreamOutcome)> = streams
        .par_iter()
        .map(|(id, records)| (*id, fuse_stream(config, records)))
        .collect();

    let mut total = RmseAccumulator::new();
    let mut rejected = 0;
    for (id, outcome) in &outcomes {
        let rmse = outcome.rmse.rmse();
        info!(
            target = id,
            samples = outcome.rmse.n_samples,
            rmse_px = rmse[0],
            rmse_py = rmse[1],
            rmse_vx = rmse[2],
            rmse_vy = rmse[3],
            "target fused"
        );
        total.merge(&outcome.rmse);
        rejected += outcome.rejected;
    }
    (total, outcomes.len(), rejected)
}

fn print_rmse(rmse: &RmseAccumulator) {
    let r = rmse.rmse();
    println!(
        "RMSE over {} samples: px={:.4} py={:.4} vx={:.4} vy={:.4}",
        rmse.n_samples, r[0], r[1], r[2], r[3]
    );
}

fn write_metrics(
    path: &Path,
    name: &str,
    seed: Option<u64>,
    elapsed_s: f64,
    rmse: &RmseAccumulator,
    targets: usize,
    rejected: usize,
) -> Result<()> {
    let r = rmse.rmse();
    let json = serde_json::json!({
        "scenario": name,
        "seed": seed,
        "elapsed_s": elapsed_s,
        "targets": targets,
        "samples": rmse.n_samples,
        "rejected": rejected,
        "rmse": [r[0], r[1], r[2], r[3]],
        "rmse_position": rmse.rmse_position(),
        "rmse_velocity": rmse.rmse_velocity(),
    });
    std::fs::write(path, serde_json::to_string_pretty(&json)?)
        .with_context(|| format!("writing metrics {}", path.display()))?;
    println!("Metrics saved to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_scenario(
    config: &FusionConfig,
    kind: ScenarioKind,
    seed: u64,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
    export_path: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::build(kind, seed);
    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s, {} targets)...",
        scenario.name,
        seed,
        scenario.duration,
        scenario.targets.len()
    );

    let start = std::time::Instant::now();
    let log = record(scenario);
    let (rmse, targets, rejected) = fuse_log(config, &log);
    let elapsed = start.elapsed();

    println!(
        "Done: {} measurements, {} targets, {} rejected, elapsed={:.3}s",
        log.measurements.len(),
        targets,
        rejected,
        elapsed.as_secs_f64(),
    );
    print_rmse(&rmse);

    if let Some(rpath) = replay_path {
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(epath) = export_path {
        if let Some(records) = log.by_target().into_values().next() {
            let file = std::fs::File::create(epath)
                .with_context(|| format!("creating {}", epath.display()))?;
            write_records(BufWriter::new(file), &records)?;
            println!("Data file written to {}", epath.display());
        }
    }

    if let Some(opath) = output_path {
        write_metrics(
            opath,
            &log.scenario_name,
            Some(seed),
            elapsed.as_secs_f64(),
            &rmse,
            targets,
            rejected,
        )?;
    }

    Ok(())
}

fn run_replay(config: &FusionConfig, input: &Path, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input)?;
    println!(
        "Replaying '{}' ({} measurements)...",
        log.scenario_name,
        log.measurements.len()
    );

    let start = std::time::Instant::now();
    let (rmse, targets, rejected) = fuse_log(config, &log);
    let elapsed = start.elapsed();

    println!(
        "Replay done: {} targets, {} rejected, elapsed={:.3}s",
        targets,
        rejected,
        elapsed.as_secs_f64()
    );
    print_rmse(&rmse);

    if let Some(opath) = output_path {
        write_metrics(
            opath,
            &log.scenario_name,
            Some(log.seed),
            elapsed.as_secs_f64(),
            &rmse,
            targets,
            rejected,
        )?;
    }

    Ok(())
}

fn run_process(config: &FusionConfig, input: &Path, output_path: Option<&Path>) -> Result<()> {
    let records = read_data_file(input)
        .with_context(|| format!("reading measurement file {}", input.display()))?;
    println!("Processing {} measurements from {}...", records.len(), input.display());

    let outcome = fuse_stream(config, &records);
    println!(
        "Done: {} fused, {} rejected",
        outcome.estimates.len(),
        outcome.rejected
    );
    if outcome.rmse.n_samples > 0 {
        print_rmse(&outcome.rmse);
    }

    if let Some(opath) = output_path {
        let file = std::fs::File::create(opath)
            .with_context(|| format!("creating {}", opath.display()))?;
        let mut out = BufWriter::new(file);
        for (rec, est) in &outcome.estimates {
            let reading = rec.package.reading()?;
            let (mx, my) = reading.to_cartesian_2d();
            let s = est.state;
            write!(out, "{}\t{}\t{}\t{}\t{}\t{}", s[0], s[1], s[2], s[3], mx, my)?;
            if let Some(gt) = rec.ground_truth {
                write!(out, "\t{}\t{}\t{}\t{}", gt[0], gt[1], gt[2], gt[3])?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        println!("Estimates written to {}", opath.display());
    }

    Ok(())
}
