use tracing::{debug, info, trace, warn};
use synod_common::{
    utils::time::current_time_millis, Ballot, Decided, InstanceId, ProcessId, ProtocolMessage, Result, SynodError,
    Value,
};

use super::{
    core::{Process, Wiring},
    handle::{Envelope, Message},
    retry,
};
use crate::consensus::Outbound;

impl Process {
    /// Draws against the crash gate. Returns false if the message must be dropped.
    fn admit(&mut self) -> bool {
        let was_crashed = self.gate.is_crashed();
        if self.gate.admit(&mut self.rng) {
            return true;
        }
        if !was_crashed {
            info!("💀 {} crashed", self.id);
            tracing::info!(target: "consensus", "EVENT:CRASH process={} state=crashed", self.id);
        }
        false
    }

    pub(super) fn on_launch(&mut self) -> Result<()> {
        if self.wiring.get().is_none() {
            return Err(SynodError::NotWired(self.id));
        }
        if !self.admit() {
            return Ok(());
        }
        let value = Value::random(&mut self.rng);
        match self.engine.launch(value) {
            Some((instance, out)) => {
                debug!("{} launched instance {}", self.id, instance);
                self.dispatch(out)
            }
            None => Ok(()),
        }
    }

    pub(super) fn on_retry_due(&mut self, instance: InstanceId, ballot: Ballot) -> Result<()> {
        if !self.admit() {
            return Ok(());
        }
        let fallback = Value::random(&mut self.rng);
        let out = self.engine.retry(instance, ballot, fallback);
        self.dispatch(out)
    }

    pub(super) fn on_protocol(&mut self, from: Option<ProcessId>, message: ProtocolMessage) -> Result<()> {
        if self.wiring.get().is_none() {
            return Err(SynodError::NotWired(self.id));
        }
        let Some(from) = from else {
            debug!("{} dropping {} without sender", self.id, message);
            return Ok(());
        };
        if !self.admit() {
            return Ok(());
        }
        let out = self.engine.handle(from, message);
        self.dispatch(out)
    }

    /// Carries out what the engine asked for, in order.
    fn dispatch(&mut self, out: Vec<Outbound>) -> Result<()> {
        let wiring = self.wiring.get().ok_or(SynodError::NotWired(self.id))?;

        for action in out {
            match action {
                Outbound::Broadcast(message) => {
                    self.send_to_self(message.clone());
                    self.announce(wiring, &message);
                }
                Outbound::Announce(message) => self.announce(wiring, &message),
                Outbound::Reply { to, message } if to == self.id => self.send_to_self(message),
                Outbound::Reply { to, message } => {
                    let sent = wiring
                        .neighbors
                        .get(&to)
                        .ok_or(SynodError::UnknownPeer(to))
                        .and_then(|peer| peer.send_protocol(self.id, message));
                    if let Err(e) = sent {
                        warn!("{}: {}", self.id, e);
                    }
                }
                Outbound::Decided { instance, value } => {
                    wiring.collector.decided(Decided {
                        timestamp_ms: current_time_millis(),
                        instance,
                        value,
                        process: self.id,
                    });
                }
                Outbound::ScheduleRetry { instance, ballot } => {
                    let delay = self.config.retry_delay(&mut self.rng);
                    trace!("{} retrying instance {} in {:?}", self.id, instance, delay);
                    retry::arm(self.me.clone(), delay, instance, ballot);
                }
            }
        }
        Ok(())
    }

    fn announce(&self, wiring: &Wiring, message: &ProtocolMessage) {
        for peer in wiring.neighbors.values() {
            if let Err(e) = peer.send_protocol(self.id, message.clone()) {
                warn!("{}: {}", self.id, e);
            }
        }
    }

    fn send_to_self(&self, message: ProtocolMessage) {
        if let Some(tx) = self.me.upgrade() {
            let _ = tx.send(Envelope {
                from: Some(self.id),
                message: Message::Protocol(message),
            });
        }
    }
}
