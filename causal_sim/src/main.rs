//! Causal Sim CLI
//!
//! Step causal clock scenarios, script files or random scripts and check
//! their invariants.

use causal_core::EngineConfig;
use causal_env::{Discipline, SnapshotSink};
use causal_sim::scenarios::{self, ScenarioId};
use causal_sim::{ScenarioResult, ScenarioRunner, SimExport, TextPresenter};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Causal clock simulator CLI
#[derive(Parser, Debug)]
#[command(name = "causal-sim")]
#[command(about = "Step vector and matrix clock simulations and check causal delivery", long_about = None)]
struct Args {
    /// Scenario to run (bss, bss_reorder, ses, ses_reorder, matrix, supply_chain, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Clock discipline (vector-bss, vector-ses, matrix); filters scenarios,
    /// picks the discipline of --random, overrides the one in --script
    #[arg(short, long)]
    discipline: Option<Discipline>,

    /// Run an engine config loaded from a JSON file
    #[arg(long, conflicts_with = "random")]
    script: Option<String>,

    /// Run seeded random scripts instead of built-in scenarios
    #[arg(long)]
    random: bool,

    /// Master seed for random scripts (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run with --random
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Participants in random scripts
    #[arg(short, long, default_value = "3")]
    participants: usize,

    /// Sends per random script
    #[arg(short, long, default_value = "8")]
    events: usize,

    /// Export every snapshot of a single run to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One run to perform.
struct Job {
    name: String,
    config: EngineConfig,
    seed: Option<u64>,
}

fn load_script(path: &str, discipline: Option<Discipline>) -> Result<Job, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path, e))?;
    let mut config = EngineConfig::from_json(&json).map_err(|e| format!("{}: {}", path, e))?;
    if let Some(discipline) = discipline {
        config.discipline = discipline;
    }
    Ok(Job {
        name: path.to_string(),
        config,
        seed: None,
    })
}

fn plan(args: &Args, base_seed: u64) -> Result<Vec<Job>, String> {
    if let Some(path) = &args.script {
        return Ok(vec![load_script(path, args.discipline)?]);
    }

    if args.random {
        let disciplines = match args.discipline {
            Some(d) => vec![d],
            None => Discipline::all(),
        };
        let mut jobs = Vec::new();
        for offset in 0..args.seeds {
            let seed = base_seed.wrapping_add(offset as u64);
            let runner = ScenarioRunner::new(seed)
                .with_participants(args.participants)
                .with_events(args.events);
            for discipline in &disciplines {
                jobs.push(Job {
                    name: format!("random/{}", discipline),
                    config: runner.random_config(*discipline),
                    seed: Some(seed),
                });
            }
        }
        return Ok(jobs);
    }

    let jobs: Vec<Job> = scenarios::parse_selection(&args.scenario)?
        .into_iter()
        .filter(|s| args.discipline.map_or(true, |d| s.discipline() == d))
        .map(|s: ScenarioId| Job {
            name: s.name().to_string(),
            config: s.config(),
            seed: None,
        })
        .collect();

    if jobs.is_empty() {
        return Err(format!("No scenario matches '{}'", args.scenario));
    }
    Ok(jobs)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    if !args.json {
        info!("Causal Sim v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let jobs = match plan(&args, base_seed) {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("{}", e);
            error!("Available scenarios: bss, bss_reorder, ses, ses_reorder, matrix, supply_chain, all");
            std::process::exit(1);
        }
    };

    if args.export.is_some() && jobs.len() > 1 {
        error!("--export only supports a single run, not {}", jobs.len());
        std::process::exit(1);
    }

    let runner = ScenarioRunner::new(base_seed);
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for job in jobs {
        if !args.json {
            info!("");
            info!("▶ {} [{}]", job.name, job.config.discipline);
        }

        let mut presenter = TextPresenter::new();
        if args.verbose {
            presenter = presenter.detailed();
        }
        let mut export = SimExport::new(&job.name, job.config.discipline);
        if let Some(seed) = job.seed {
            export = export.with_seed(seed);
        }

        let result = {
            let mut sinks: Vec<&mut dyn SnapshotSink> = Vec::new();
            if !args.json {
                sinks.push(&mut presenter);
            }
            if args.export.is_some() {
                sinks.push(&mut export);
            }
            runner.run_config(&job.name, job.config, job.seed, &mut sinks)
        };

        if let Some(path) = &args.export {
            export.finalize(result.passed, result.failure_reason.clone());
            match export.write_to_file(path) {
                Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
                Err(e) => {
                    error!("Failed to write export: {}", e);
                    failed_count += 1;
                }
            }
        }

        if !args.json {
            if result.passed {
                info!(
                    "✓ {} PASSED ({} steps, {} delivered, {} buffered)",
                    result.scenario,
                    result.steps,
                    result.metrics.deliveries,
                    result.metrics.buffered_arrivals
                );
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    result.scenario,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }
        all_results.push(result);
    }

    // Summary
    let total = all_results.len();
    let failed_runs = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_runs,
            "failed": failed_runs,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "discipline": r.discipline,
                    "seed": r.seed,
                    "passed": r.passed,
                    "steps": r.steps,
                    "messages_sent": r.metrics.messages_sent,
                    "deliveries": r.metrics.deliveries,
                    "buffered_arrivals": r.metrics.buffered_arrivals,
                    "max_buffer_depth": r.metrics.max_buffer_depth,
                    "final_clocks": r.final_snapshot.as_ref().map(|s| {
                        s.participants.iter().map(|p| p.clock.clone()).collect::<Vec<_>>()
                    }),
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to encode summary: {}", e);
                failed_count += 1;
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_runs == 0 {
            info!("✅ All {} runs passed!", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_runs, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {}{}: {}",
                    result.scenario,
                    result.seed.map(|s| format!(" seed={}", s)).unwrap_or_default(),
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
