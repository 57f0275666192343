use std::fs::File;
use std::io::{self, Write};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use synod_node::{
    cli::{Cli, Commands, RunArgs, SweepArgs},
    config::RunConfig,
    runtime::{orchestrator::run, sweep::{sweep, SweepPlan}},
    setup::ensure_config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    std::panic::set_hook(Box::new(|info| {
        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<Any>",
            },
        };
        let location = match info.location() {
            Some(l) => format!("at {}:{}:{}", l.file(), l.line(), l.column()),
            None => "unknown location".to_string(),
        };
        eprintln!("CRASH: {} {}", msg, location);
    }));

    // audit trail: only the `consensus` target goes to the file
    let file_appender = tracing_appender::rolling::never("logs", "synod-audit.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| metadata.target() == "consensus"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,synod_consensus=warn".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| metadata.target() != "consensus"));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run_once(args).await,
        Commands::Sweep(args) => run_sweep(args).await,
    };
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn run_once(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = match &args.config {
        Some(path) => ensure_config(path)?,
        None => RunConfig::default(),
    };
    let config = args.apply(base);
    info!("Config: {}", serde_json::to_string(&config)?);

    let summary = run(config).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

async fn run_sweep(args: SweepArgs) -> Result<(), Box<dyn std::error::Error>> {
    let plan = SweepPlan {
        ns: args.n,
        alphas: args.alpha,
        tles: args.tle,
        trials: args.trials,
        base: RunConfig {
            run_ms: args.run_ms,
            ..RunConfig::default()
        },
        seed: args.seed,
    };

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let rows = sweep(&plan, &mut out).await?;
    info!("Sweep finished: {} grid points", rows.len());
    Ok(())
}
