use std::io::Write;

use serde::Serialize;
use tracing::info;
use synod_common::{utils::seed::generate_seed, Result};

use super::orchestrator::run;
use crate::config::RunConfig;

pub const CSV_HEADER: &str = "n,f,alpha,tle_ms,trials,decided,mean_latency_ms";

/// Grid of runs: every combination of `ns`, `alphas` and `tles`, `trials` times each.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub ns: Vec<usize>,
    pub alphas: Vec<f64>,
    pub tles: Vec<u64>,
    pub trials: usize,
    /// Template for every run; `n`, `f`, `alpha`, `hold_ms` and `seed` are overwritten.
    pub base: RunConfig,
    pub seed: Option<u64>,
}

/// Aggregate of the trials of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub n: usize,
    pub f: usize,
    pub alpha: f64,
    pub tle_ms: u64,
    pub trials: usize,
    /// Trials in which some instance was decided.
    pub decided: usize,
    /// Mean latency over the decided trials.
    pub mean_latency_ms: Option<f64>,
}

impl SweepRow {
    pub fn to_csv(&self) -> String {
        let latency = self.mean_latency_ms.map(|ms| format!("{:.1}", ms)).unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{}",
            self.n, self.f, self.alpha, self.tle_ms, self.trials, self.decided, latency
        )
    }
}

/// Largest number of faulty processes a majority protocol tolerates.
pub fn max_faulty(n: usize) -> usize {
    n.saturating_sub(1) / 2
}

/// Runs the plan sequentially, writing the header and one line per grid point to `out`.
pub async fn sweep<W: Write>(plan: &SweepPlan, out: &mut W) -> Result<Vec<SweepRow>> {
    let mut seed = plan.seed.unwrap_or_else(generate_seed);
    let mut rows = Vec::new();
    writeln!(out, "{}", CSV_HEADER)?;

    for &n in &plan.ns {
        for &alpha in &plan.alphas {
            for &tle_ms in &plan.tles {
                let f = max_faulty(n);
                let mut latencies = Vec::with_capacity(plan.trials);
                for trial in 0..plan.trials {
                    let config = RunConfig {
                        n,
                        f,
                        alpha,
                        hold_ms: tle_ms,
                        seed: Some(seed),
                        ..plan.base.clone()
                    };
                    seed = seed.wrapping_add(1);
                    let summary = run(config).await?;
                    info!("n={} alpha={} tle={}ms trial {}: {}", n, alpha, tle_ms, trial, summary);
                    if let Some(ms) = summary.latency_ms {
                        latencies.push(ms as f64);
                    }
                }

                let row = SweepRow {
                    n,
                    f,
                    alpha,
                    tle_ms,
                    trials: plan.trials,
                    decided: latencies.len(),
                    mean_latency_ms: if latencies.is_empty() {
                        None
                    } else {
                        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
                    },
                };
                writeln!(out, "{}", row.to_csv())?;
                out.flush()?;
                rows.push(row);
            }
        }
    }
    Ok(rows)
}
