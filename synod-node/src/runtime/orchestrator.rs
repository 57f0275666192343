use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use synod_common::{
    utils::{
        seed::{generate_seed, process_seeds},
        time::current_time_millis,
    },
    ProcessId, Result,
};
use synod_consensus::{DecisionSink, Process, ProcessHandle, ProcessStatus};

use super::collector::{Collector, CollectorHandle, Summary};
use crate::config::RunConfig;

/// Sets up a run: spawns and wires the processes, picks the faulty ones,
/// launches everybody and later holds all correct processes but one.
#[derive(Debug)]
pub struct Orchestrator {
    config: RunConfig,
    seed: u64,
    rng: StdRng,
}

/// A running set of processes and the choices made while setting it up.
#[derive(Debug)]
pub struct Cluster {
    pub handles: Vec<ProcessHandle>,
    /// Processes that received a non-zero crash probability.
    pub faulty: Vec<ProcessId>,
    /// Correct processes told to stop proposing.
    pub held: Vec<ProcessId>,
    /// The one correct process left proposing, if any.
    pub survivor: Option<ProcessId>,
    pub seed: u64,
    pub launched_at: Instant,
    tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(generate_seed);
        Ok(Self {
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Runs the setup sequence. Returns once the hold messages are sent.
    ///
    /// If a step fails after the processes were spawned, they are stopped
    /// before the error is returned.
    pub async fn start(mut self, collector: &CollectorHandle) -> Result<Cluster> {
        let RunConfig { n, f, alpha, .. } = self.config;
        info!("🚀 Starting {} processes, {} faulty at alpha {} (seed {})", n, f, alpha, self.seed);

        let (handles, tasks): (Vec<_>, Vec<_>) = process_seeds(&mut self.rng, n)
            .into_iter()
            .enumerate()
            .map(|(i, seed)| Process::spawn(ProcessId(i), n, self.config.process_config(seed)))
            .unzip();

        match self.drive(&handles, collector).await {
            Ok(setup) => Ok(Cluster {
                handles,
                faulty: setup.faulty,
                held: setup.held,
                survivor: setup.survivor,
                seed: self.seed,
                launched_at: setup.launched_at,
                tasks,
            }),
            Err(e) => {
                warn!("setup failed, stopping {} processes: {}", n, e);
                stop_all(&handles, tasks).await;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, handles: &[ProcessHandle], collector: &CollectorHandle) -> Result<Setup> {
        let RunConfig { n, f, alpha, init_ms, hold_ms, .. } = self.config;

        let sink: Arc<dyn DecisionSink> = Arc::new(collector.clone());
        for handle in handles {
            handle.wire(Arc::clone(&sink), handles.to_vec())?;
        }
        debug!("{} processes wired", n);

        let mut faulty: Vec<ProcessId> = rand::seq::index::sample(&mut self.rng, n, f)
            .into_iter()
            .map(ProcessId)
            .collect();
        faulty.sort();
        for id in &faulty {
            handles[id.index()].crash(alpha)?;
        }
        info!("💥 Faulty processes: {:?}", faulty);

        tokio::time::sleep(Duration::from_millis(init_ms)).await;

        let launched_at = Instant::now();
        collector.start(current_time_millis())?;
        for handle in handles {
            handle.launch()?;
        }
        info!("Launched");

        tokio::time::sleep(Duration::from_millis(hold_ms)).await;

        let faulty_set: BTreeSet<ProcessId> = faulty.iter().copied().collect();
        let mut correct: Vec<ProcessId> = (0..n).map(ProcessId).filter(|id| !faulty_set.contains(id)).collect();
        correct.shuffle(&mut self.rng);
        let survivor = correct.first().copied();
        let mut held: Vec<ProcessId> = correct.into_iter().skip(1).collect();
        held.sort();
        for id in &held {
            handles[id.index()].hold()?;
        }
        match survivor {
            Some(id) => info!("✋ Held {} processes, {} keeps proposing", held.len(), id),
            None => warn!("every process is faulty, nobody left to hold"),
        }

        Ok(Setup {
            faulty,
            held,
            survivor,
            launched_at,
        })
    }
}

/// Choices made by a successful setup.
struct Setup {
    faulty: Vec<ProcessId>,
    held: Vec<ProcessId>,
    survivor: Option<ProcessId>,
    launched_at: Instant,
}

/// Sends `Stop` to every process and waits for their tasks to end.
async fn stop_all(handles: &[ProcessHandle], tasks: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.stop();
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!("process task failed: {}", e);
        }
    }
}

impl Cluster {
    pub fn handle(&self, id: ProcessId) -> Option<&ProcessHandle> {
        self.handles.get(id.index())
    }

    /// Snapshot of every process, in id order.
    pub async fn statuses(&self) -> Result<Vec<ProcessStatus>> {
        let mut statuses = Vec::with_capacity(self.handles.len());
        for handle in &self.handles {
            statuses.push(handle.inspect().await?);
        }
        Ok(statuses)
    }

    /// Stops every process and waits for their tasks to end.
    pub async fn shutdown(self) {
        stop_all(&self.handles, self.tasks).await;
        debug!("cluster stopped");
    }
}

/// One full experiment: setup, wait `run_ms` from launch, report, shut down.
///
/// The processes are shut down even when the report cannot be taken.
pub async fn run(config: RunConfig) -> Result<Summary> {
    let run_ms = config.run_ms;
    let (collector, _collector_task) = Collector::spawn();
    let cluster = Orchestrator::new(config)?.start(&collector).await?;

    let remaining = Duration::from_millis(run_ms).saturating_sub(cluster.launched_at.elapsed());
    tokio::time::sleep(remaining).await;

    let report = collector.report().await;
    cluster.shutdown().await;
    report
}
