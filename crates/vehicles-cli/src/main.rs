use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use vehicles_core::scenario::Population;
use vehicles_core::species::presets;
use vehicles_core::{Scenario, SimulationState, StateListener, World};

const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 200;
const TARGET_SPS: f64 = 100.0;

#[derive(Parser)]
#[command(name = "vehicles")]
#[command(about = "Braitenberg Vehicles Simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file for a fixed number of ticks
    Run {
        /// Path to scenario file (JSON)
        #[arg(long)]
        scenario: PathBuf,

        /// Output directory for the run summary (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of ticks to run
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Record metrics every N ticks
        #[arg(long, default_value_t = 100)]
        sample_every: usize,

        /// Write every tick's state as JSON lines to this file
        #[arg(long)]
        stream: Option<PathBuf>,
    },
    /// Run the performance benchmark suite
    Benchmark,
    /// Dump the demo scenario to stdout
    DumpDefaultScenario,
    /// List the built-in species
    ListSpecies {
        /// Print full definitions as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Streams each broadcast state as one JSON line.
struct JsonLinesListener {
    writer: BufWriter<File>,
}

impl StateListener for JsonLinesListener {
    fn on_state_update(
        &mut self,
        state: &SimulationState,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        serde_json::to_writer(&mut self.writer, state)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl Drop for JsonLinesListener {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

fn benchmark_scenario(per_species: usize, seed: u64) -> Scenario {
    let mut scenario = Scenario::demo();
    scenario.config.seed = seed;
    scenario.config.arena.width = 4000.0;
    scenario.config.arena.height = 3000.0;
    scenario.populations = presets::PRESET_NAMES
        .iter()
        .map(|name| Population {
            species: (*name).to_owned(),
            count: per_species,
            color: None,
        })
        .collect();
    scenario
}

fn run_benchmark(per_species: usize, seed: u64) -> Result<()> {
    let scenario = benchmark_scenario(per_species, seed);
    let mut world = scenario
        .build()
        .context("failed to build benchmark world")?;

    // Warmup
    for _ in 0..WARMUP_STEPS {
        world.step();
    }

    let mut total_spatial = 0u64;
    let mut total_sense = 0u64;
    let mut total_think = 0u64;
    let mut total_act = 0u64;
    let mut total_time = 0u64;

    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step().timings;
        total_spatial += timings.spatial_build_us;
        total_sense += timings.sense_us;
        total_think += timings.advance_us + timings.think_us;
        total_act += timings.act_us;
        total_time += timings.total_us;
    }

    let avg_step_us = (total_time as f64 / BENCHMARK_STEPS as f64).max(1.0);
    let steps_per_sec = 1_000_000.0 / avg_step_us;
    let total_vehicles = per_species * presets::PRESET_NAMES.len();

    println!("--- {total_vehicles} vehicles ({per_species} per species) ---");
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     spatial={:.0} us, sense={:.0} us, network={:.0} us, act={:.0} us",
        total_spatial as f64 / BENCHMARK_STEPS as f64,
        total_sense as f64 / BENCHMARK_STEPS as f64,
        total_think as f64 / BENCHMARK_STEPS as f64,
        total_act as f64 / BENCHMARK_STEPS as f64,
    );
    let verdict = if steps_per_sec >= TARGET_SPS {
        "GO"
    } else {
        "NO-GO"
    };
    println!("  Verdict:       {verdict} (target: >={TARGET_SPS} steps/sec)");
    println!(
        "  Remaining:     {}/{} (removed {})",
        world.vehicles().len(),
        total_vehicles,
        world.total_removed()
    );
    println!();
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let file = File::open(path).context("failed to open scenario file")?;
    let reader = BufReader::new(file);
    let scenario: Scenario = serde_json::from_reader(reader).context("failed to parse scenario")?;
    Ok(scenario)
}

fn run_scenario(
    path: PathBuf,
    out: Option<PathBuf>,
    steps: usize,
    sample_every: usize,
    stream: Option<PathBuf>,
) -> Result<()> {
    let scenario = load_scenario(&path)?;
    scenario
        .config
        .validate()
        .context("config validation error")?;
    let mut world: World = scenario.build().context("failed to build world")?;

    if let Some(stream_path) = stream {
        let file = File::create(&stream_path).context("failed to create stream file")?;
        world.add_listener(Box::new(JsonLinesListener {
            writer: BufWriter::new(file),
        }));
    }

    info!(
        scenario = %path.display(),
        vehicles = world.vehicles().len(),
        steps,
        "starting run"
    );
    println!("Loaded scenario from {:?}", path);
    println!("Simulating for {} ticks...", steps);

    let summary = world
        .try_run_experiment(steps, sample_every)
        .context("invalid experiment parameters")?;

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        let summary_path = out_dir.join("summary.json");
        let file = File::create(summary_path).context("failed to create summary file")?;
        serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
        println!("Run complete. Results saved to {:?}", out_dir);
    } else {
        println!(
            "Run complete. Vehicles: {} (removed {}, faults {})",
            summary.final_vehicle_count, summary.total_removed, summary.total_faults
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultScenario => {
            println!("{}", serde_json::to_string_pretty(&Scenario::demo())?);
        }
        Commands::ListSpecies { json } => {
            let definitions = presets::all_definitions();
            if json {
                println!("{}", serde_json::to_string_pretty(&definitions)?);
            } else {
                for def in definitions {
                    println!(
                        "{:<12} color={:<6} max_speed={:<5} receptors={}",
                        def.id,
                        def.color,
                        def.body.max_speed,
                        def.receptors.len()
                    );
                }
            }
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p vehicles-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Braitenberg Vehicles Benchmark ===");
            println!("Warmup: {WARMUP_STEPS} ticks, Benchmark: {BENCHMARK_STEPS} ticks");
            println!("Target: >={TARGET_SPS} steps/sec");
            println!();

            for per_species in [10, 50, 200, 500] {
                run_benchmark(per_species, 42)?;
            }
        }
        Commands::Run {
            scenario,
            out,
            steps,
            sample_every,
            stream,
        } => run_scenario(scenario, out, steps, sample_every, stream)?,
    }
    Ok(())
}
