use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};
use synod_common::{Result, SynodError};

use super::{
    core::{Process, Wiring},
    handle::{DecisionSink, ProcessHandle},
};

impl Process {
    /// Stores the collector and the neighbour table. Only the first list counts.
    pub(super) fn on_actor_list(
        &mut self,
        collector: Arc<dyn DecisionSink>,
        neighbors: Vec<ProcessHandle>,
    ) -> Result<()> {
        let neighbors: BTreeMap<_, _> = neighbors
            .into_iter()
            .filter(|h| h.id() != self.id)
            .map(|h| (h.id(), h))
            .collect();
        let count = neighbors.len();

        self.wiring
            .set(Wiring { collector, neighbors })
            .map_err(|_| SynodError::AlreadyWired(self.id))?;

        debug!("🔗 {} wired to {} neighbours", self.id, count);
        Ok(())
    }

    /// Sets the crash probability. Only the first `Crash` counts.
    pub(super) fn on_crash(&mut self, alpha: f64) -> Result<()> {
        if !self.gate.set_probability(alpha) {
            return Err(SynodError::AlreadyArmed(self.id));
        }
        if self.gate.probability() > 0.0 {
            info!("{} armed with crash probability {}", self.id, self.gate.probability());
            tracing::info!(target: "consensus", "EVENT:CRASH process={} state=armed alpha={}", self.id, self.gate.probability());
        }
        Ok(())
    }

    pub(super) fn on_hold(&mut self) -> Result<()> {
        if self.engine.hold() {
            info!("✋ {} on hold", self.id);
            tracing::info!(target: "consensus", "EVENT:HOLD process={}", self.id);
        }
        Ok(())
    }
}
