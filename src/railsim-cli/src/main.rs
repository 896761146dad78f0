// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use railsim_engine::network::FlowProvider;
use railsim_engine::{
    ExperimentConfig, ModelConfig, RailNetwork, SeededSampler, Simplex, TransportModel, allocate,
    run_experiment,
};

#[derive(Parser)]
#[command(name = "railsim")]
#[command(about = "Size rail station facilities and allocate a sustainable-development budget")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// JSON network description
    #[arg(long)]
    network: PathBuf,

    /// JSON model configuration; defaults apply to omitted fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the alternate cost calibration as the base configuration
    #[arg(long)]
    alternate: bool,

    /// Seed for the variate generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the sensitivity estimate over the parameter grid
    Experiment {
        #[command(flatten)]
        model: ModelArgs,

        /// JSON experiment configuration
        #[arg(long)]
        experiment: Option<PathBuf>,

        /// Tab-separated output file
        #[arg(long, short, default_value = "res.txt")]
        output: PathBuf,

        /// Valid samples per grid cell
        #[arg(long)]
        repetitions: Option<usize>,

        /// Write a header line
        #[arg(long)]
        header: bool,
    },
    /// Compute one budget allocation
    Allocate {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run one simulation step and print per-station state
    Simulate {
        #[command(flatten)]
        model: ModelArgs,

        /// Number of steps to run before printing
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load(args: &ModelArgs) -> Result<(RailNetwork, TransportModel)> {
    let network = RailNetwork::from_reader(open(&args.network)?)
        .with_context(|| format!("loading network {}", args.network.display()))?;
    let config = match &args.config {
        Some(path) => ModelConfig::from_reader(open(path)?)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if args.alternate => ModelConfig::alternate(),
        None => ModelConfig::default(),
    };
    let model = TransportModel::new(config, &network)?;
    info!(
        stations = network.stations().len(),
        links = network.links().len(),
        "network loaded"
    );
    Ok((network, model))
}

fn experiment(
    args: &ModelArgs,
    experiment: Option<&Path>,
    output: &Path,
    repetitions: Option<usize>,
    header: bool,
) -> Result<()> {
    let (mut network, mut model) = load(args)?;
    let mut config = match experiment {
        Some(path) => serde_json::from_reader(open(path)?)
            .with_context(|| format!("loading experiment {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if let Some(repetitions) = repetitions {
        config.repetitions = repetitions;
    }
    config.header |= header;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut sampler = SeededSampler::new(args.seed);
    let rows = run_experiment(
        &mut model,
        &mut network,
        &mut sampler,
        &config,
        BufWriter::new(file),
    )
    .with_context(|| format!("writing {}", output.display()))?;
    info!(rows, output = %output.display(), "experiment written");
    Ok(())
}

fn allocation(args: &ModelArgs) -> Result<()> {
    let (mut network, mut model) = load(args)?;
    let (ia, bs) = (model.config().inter_arrival, model.config().batch_size);
    let mut sampler = SeededSampler::new(args.seed);
    let alloc = allocate(
        &mut model,
        &mut network,
        &ia,
        &bs,
        &mut sampler,
        &Simplex::default(),
    )?;

    let mut out = io::stdout().lock();
    let [sc0, sc1, sc2, sc3] = alloc.estimate.coefficients;
    writeln!(out, "coefficients\t{sc0}\t{sc1}\t{sc2}\t{sc3}")?;
    let [x0, x1, x2, x3] = alloc.shares;
    writeln!(out, "shares\t{x0}\t{x1}\t{x2}\t{x3}")?;
    writeln!(out, "value\t{}", alloc.value)?;
    writeln!(out, "investment\t{}", alloc.estimate.investment)?;
    Ok(())
}

fn simulate(args: &ModelArgs, steps: u32) -> Result<()> {
    let (mut network, mut model) = load(args)?;
    let (ia, bs) = (model.config().inter_arrival, model.config().batch_size);
    let mut sampler = SeededSampler::new(args.seed);
    for _ in 0..steps {
        model.simulate_step(&mut network, &ia, &bs, &mut sampler)?;
    }

    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "code\tname\tEQ\tET\tLN\tGN\tTW\tTL\tTG")?;
    for station in network.stations() {
        let Some(s) = model.station(station.id) else {
            continue;
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            station.code,
            station.name,
            s.eq,
            s.et,
            s.locomotives,
            s.gear,
            s.total_wagon_time,
            s.total_locomotive_time,
            s.total_gear_time
        )?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Experiment {
            model,
            experiment: experiment_path,
            output,
            repetitions,
            header,
        } => experiment(
            model,
            experiment_path.as_deref(),
            output,
            *repetitions,
            *header,
        ),
        Commands::Allocate { model } => allocation(model),
        Commands::Simulate { model, steps } => simulate(model, *steps),
    }
}
