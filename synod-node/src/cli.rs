use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "synod")]
#[command(about = "Crash-tolerant binary consensus experiments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a single experiment and print its summary
    Run(RunArgs),
    /// Repeat experiments over a grid of parameters and write a CSV table
    Sweep(SweepArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSON config file; created with defaults if missing
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub n: Option<usize>,
    #[arg(long)]
    pub f: Option<usize>,
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Leader election timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub hold_ms: Option<u64>,
    #[arg(long, value_name = "MS")]
    pub run_ms: Option<u64>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Applies the flags that were given on top of `base`.
    pub fn apply(&self, mut base: RunConfig) -> RunConfig {
        if let Some(n) = self.n {
            base.n = n;
        }
        if let Some(f) = self.f {
            base.f = f;
        }
        if let Some(alpha) = self.alpha {
            base.alpha = alpha;
        }
        if let Some(hold_ms) = self.hold_ms {
            base.hold_ms = hold_ms;
        }
        if let Some(run_ms) = self.run_ms {
            base.run_ms = run_ms;
        }
        if self.seed.is_some() {
            base.seed = self.seed;
        }
        base
    }
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Process counts
    #[arg(long, value_delimiter = ',', default_values_t = vec![3, 10, 100])]
    pub n: Vec<usize>,
    /// Crash probabilities
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 0.1, 1.0])]
    pub alpha: Vec<f64>,
    /// Leader election timeouts in milliseconds
    #[arg(long, value_delimiter = ',', default_values_t = vec![500, 1000, 1500, 2000])]
    pub tle: Vec<u64>,
    /// Runs per grid point
    #[arg(long, default_value_t = 5)]
    pub trials: usize,
    #[arg(long, value_name = "MS", default_value_t = 3000)]
    pub run_ms: u64,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output CSV; stdout when absent
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}
