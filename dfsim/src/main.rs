use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dfsim::config::{FailurePolicy, SimConfig};
use dfsim::graph_file;
use dfsim::metrics::LineWriter;
use dfsim::network::NetworkBuilder;
use dfsim::tracing::SimulationTime;

/// Discrete-event simulation of a data-flow network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML or JSON graph description
    graph: PathBuf,

    /// Metrics output file, or `-` for stdout
    metrics: String,

    /// Path to a YAML or JSON run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation horizon, in seconds
    #[arg(long)]
    horizon: Option<f64>,

    /// Seed of the pseudo-random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Channel whose records are listed in the summary (repeatable)
    #[arg(long = "summarize", value_name = "CHANNEL")]
    summarize: Vec<String>,

    /// What happens to a record whose action fails (`abort` or `drop`)
    #[arg(long)]
    failure_policy: Option<FailurePolicy>,

    /// Log level, overridden by `RUST_LOG`
    #[arg(
        long,
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    loglevel: String,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_path(path)
                .wrap_err_with(|| format!("Failed to load configuration '{}'", path.display()))?,
            None => SimConfig::default(),
        };

        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(policy) = self.failure_policy {
            config.failure_policy = policy;
        }
        config.summarize.extend(self.summarize.iter().cloned());
        config.validate().wrap_err("Invalid run parameters")?;

        Ok(config)
    }

    fn metrics_writer(&self) -> Result<Box<dyn Write>> {
        if self.metrics == "-" {
            return Ok(Box::new(io::stdout()));
        }
        let file = File::create(&self.metrics)
            .wrap_err_with(|| format!("Failed to create metrics file '{}'", self.metrics))?;

        Ok(Box::new(BufWriter::new(file)))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.loglevel));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(SimulationTime::with_system_timer())
        .with_writer(io::stderr)
        .init();

    let config = args.config()?;
    let graph = graph_file::load(&args.graph)
        .wrap_err_with(|| format!("Failed to load graph '{}'", args.graph.display()))?;
    let metrics = LineWriter::new(args.metrics_writer()?);

    let mut network = NetworkBuilder::new(config)
        .with_metrics(metrics)
        .build(&graph)
        .wrap_err("Invalid network description")?;

    info!(horizon = %network.horizon(), "starting simulation");
    network.run_to_horizon().wrap_err("Simulation aborted")?;

    let summary = network.summary();
    if args.json {
        let json =
            serde_json::to_string_pretty(&summary).wrap_err("Failed to serialize summary")?;
        println!("{json}");
    } else {
        print!("{summary}");
    }

    Ok(())
}
