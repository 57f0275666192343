use tracing::{debug, info, trace, warn};

use synod_common::{Ballot, InstanceId, ProcessId, ProtocolMessage, Value};

use super::{
    instance::{InstanceState, InstanceStore, PeerState, Phase},
    quorum::QuorumPolicy,
};

/// Side effect requested by the engine. The owning process carries them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Deliver to every acceptor, this process included.
    Broadcast(ProtocolMessage),
    /// Deliver to every neighbour, this process excluded.
    Announce(ProtocolMessage),
    /// Deliver to a single process.
    Reply { to: ProcessId, message: ProtocolMessage },
    /// Tell the collector this process decided or adopted `value`.
    Decided { instance: InstanceId, value: Value },
    /// Come back to `instance` after a short delay unless `ballot` is superseded by then.
    ScheduleRetry { instance: InstanceId, ballot: Ballot },
}

/// Synod state machine of one process, for all of its instances.
///
/// The engine never touches channels or clocks: every handler mutates the
/// instance store and returns the messages and notifications it wants sent.
#[derive(Debug, Clone)]
pub struct SynodEngine {
    id: ProcessId,
    quorum: QuorumPolicy,
    instances: InstanceStore,
    held: bool,
    next_instance: InstanceId,
}

impl SynodEngine {
    pub fn new(id: ProcessId, n: usize) -> Self {
        Self {
            id,
            quorum: QuorumPolicy::majority(n),
            instances: InstanceStore::new(id, n),
            held: false,
            next_instance: 1,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn peer_count(&self) -> usize {
        self.quorum.acceptors
    }

    pub fn instance(&self, instance: InstanceId) -> Option<&InstanceState> {
        self.instances.get(instance)
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Stops self-initiated rounds for good. Returns false if already held.
    pub fn hold(&mut self) -> bool {
        !std::mem::replace(&mut self.held, true)
    }

    /// Opens the next instance of this proposer and proposes `value` on it.
    ///
    /// Returns `None` while held.
    pub fn launch(&mut self, value: Value) -> Option<(InstanceId, Vec<Outbound>)> {
        if self.held {
            debug!("{} is on hold, launch ignored", self.id);
            return None;
        }
        let instance = self.next_instance;
        self.next_instance += 1;
        Some((instance, self.propose(instance, value)))
    }

    /// Starts a new round for `instance` with `value` as this process's proposal.
    pub fn propose(&mut self, instance: InstanceId, value: Value) -> Vec<Outbound> {
        let n = self.peer_count();
        let state = self.instances.get_or_create(instance);
        if state.is_decided() {
            debug!("{} instance {} already decided, not proposing", self.id, instance);
            return Vec::new();
        }

        state.proposal = Some(value);
        let ballot = state.start_round(n);

        info!("🗳️ {} proposing {} on instance {} (ballot {})", self.id, value, instance, ballot);
        tracing::info!(target: "consensus", "EVENT:PROPOSE process={} instance={} ballot={} value={}", self.id, instance, ballot, value);

        vec![Outbound::Broadcast(ProtocolMessage::Read { ballot, instance })]
    }

    /// Abort-driven retry, fired once the delay scheduled by [`Self::on_abort`] elapsed.
    ///
    /// `fallback` is only proposed when the instance never had a proposal.
    pub fn retry(&mut self, instance: InstanceId, ballot: Ballot, fallback: Value) -> Vec<Outbound> {
        if self.held {
            trace!("{} held, retry of instance {} dropped", self.id, instance);
            return Vec::new();
        }
        let state = self.instances.get_or_create(instance);
        if state.is_decided() || state.ballot != ballot {
            trace!("{} retry of instance {} ballot {} is moot", self.id, instance, ballot);
            return Vec::new();
        }
        state.clear_retry();
        let value = state.proposal.unwrap_or(fallback);

        tracing::info!(target: "consensus", "EVENT:RETRY process={} instance={} after_ballot={}", self.id, instance, ballot);
        self.propose(instance, value)
    }

    /// Routes an inbound protocol message from `from` to its handler.
    pub fn handle(&mut self, from: ProcessId, message: ProtocolMessage) -> Vec<Outbound> {
        trace!("{} <- {}: {}", self.id, from, message);
        match message {
            ProtocolMessage::Read { ballot, instance } => self.on_read(from, ballot, instance),
            ProtocolMessage::Gather { sender, ballot, est_ballot, estimate, instance } => {
                self.on_gather(sender, ballot, est_ballot, estimate, instance)
            }
            ProtocolMessage::Impose { ballot, value, instance } => self.on_impose(from, ballot, value, instance),
            ProtocolMessage::Ack { ballot, instance } => self.on_ack(from, ballot, instance),
            ProtocolMessage::Abort { ballot, instance } => self.on_abort(ballot, instance),
            ProtocolMessage::Decide { value, instance } => self.on_decide(value, instance),
        }
    }

    /// Acceptor, phase 1.
    pub fn on_read(&mut self, from: ProcessId, ballot: Ballot, instance: InstanceId) -> Vec<Outbound> {
        let id = self.id;
        let state = self.instances.get_or_create(instance);

        let message = if state.is_outdated(ballot) {
            debug!(
                "{} rejects READ ballot {} from {} (read={}, impose={})",
                id, ballot, from, state.read_ballot, state.impose_ballot
            );
            ProtocolMessage::Abort { ballot, instance }
        } else {
            state.read_ballot = ballot;
            ProtocolMessage::Gather {
                sender: id,
                ballot,
                est_ballot: state.impose_ballot,
                estimate: state.estimate,
                instance,
            }
        };

        vec![Outbound::Reply { to: from, message }]
    }

    /// Proposer, phase 1 collection.
    pub fn on_gather(
        &mut self,
        sender: ProcessId,
        ballot: Ballot,
        est_ballot: Ballot,
        estimate: Option<Value>,
        instance: InstanceId,
    ) -> Vec<Outbound> {
        if sender.index() >= self.peer_count() {
            warn!("{} ignoring GATHER from unknown process {}", self.id, sender);
            return Vec::new();
        }
        let id = self.id;
        let quorum = self.quorum;
        let state = self.instances.get_or_create(instance);

        if ballot != state.ballot {
            if !state.is_decided() {
                warn!("⚠️ {} stale GATHER from {} (ballot {}, current {})", id, sender, ballot, state.ballot);
            }
            return Vec::new();
        }
        if state.phase != Phase::Reading {
            trace!("{} late GATHER from {} for ballot {}", id, sender, ballot);
            return Vec::new();
        }

        let count = state.record_state(sender, PeerState { est_ballot, estimate });
        if !quorum.is_reached(count) {
            return Vec::new();
        }

        // Accepted ballots are >= 0 and untouched acceptors report `id - N`,
        // so a value is present exactly when some acceptor already accepted one.
        if let Some(PeerState { estimate: Some(value), est_ballot }) = state.highest_state() {
            if state.proposal != Some(value) {
                debug!("{} adopts {} accepted at ballot {} on instance {}", id, value, est_ballot, instance);
            }
            state.proposal = Some(value);
        }
        state.reset_states();

        let Some(value) = state.proposal else {
            warn!("{} reached GATHER quorum on instance {} without a proposal", id, instance);
            return Vec::new();
        };
        state.phase = Phase::Imposing;

        debug!("{} gathered {} states, imposing {} on instance {}", id, count, value, instance);
        vec![Outbound::Broadcast(ProtocolMessage::Impose { ballot, value, instance })]
    }

    /// Acceptor, phase 2.
    pub fn on_impose(&mut self, from: ProcessId, ballot: Ballot, value: Value, instance: InstanceId) -> Vec<Outbound> {
        let id = self.id;
        let state = self.instances.get_or_create(instance);

        let message = if state.is_outdated(ballot) {
            debug!(
                "{} rejects IMPOSE ballot {} from {} (read={}, impose={})",
                id, ballot, from, state.read_ballot, state.impose_ballot
            );
            ProtocolMessage::Abort { ballot, instance }
        } else {
            state.impose_ballot = ballot;
            match state.decided() {
                None => state.estimate = Some(value),
                Some(decided) if decided != value => {
                    warn!("{} instance {} decided {} but IMPOSE carries {}", id, instance, decided, value);
                }
                Some(_) => {}
            }
            ProtocolMessage::Ack { ballot, instance }
        };

        vec![Outbound::Reply { to: from, message }]
    }

    /// Proposer, phase 2 collection.
    pub fn on_ack(&mut self, from: ProcessId, ballot: Ballot, instance: InstanceId) -> Vec<Outbound> {
        if from.index() >= self.peer_count() {
            warn!("{} ignoring ACK from unknown process {}", self.id, from);
            return Vec::new();
        }
        let id = self.id;
        let quorum = self.quorum;
        let state = self.instances.get_or_create(instance);

        if state.is_decided() {
            trace!("{} ACK from {} after decision on instance {}", id, from, instance);
            return Vec::new();
        }
        if ballot != state.ballot {
            warn!("⚠️ {} stale ACK from {} (ballot {}, current {})", id, from, ballot, state.ballot);
            return Vec::new();
        }
        if state.phase != Phase::Imposing {
            trace!("{} ACK from {} outside the impose phase", id, from);
            return Vec::new();
        }

        let count = state.record_ack(from);
        if !quorum.is_reached(count) {
            return Vec::new();
        }
        let Some(value) = state.proposal else {
            warn!("{} reached ACK quorum on instance {} without a proposal", id, instance);
            return Vec::new();
        };
        state.mark_decided(value);

        info!("✅ {} decided {} on instance {} (ballot {}, {} acks)", id, value, instance, ballot, count);
        tracing::info!(target: "consensus", "EVENT:DECIDE process={} instance={} ballot={} value={}", id, instance, ballot, value);

        vec![
            Outbound::Announce(ProtocolMessage::Decide { value, instance }),
            Outbound::Decided { instance, value },
        ]
    }

    /// Either role. Schedules at most one retry per ballot.
    pub fn on_abort(&mut self, ballot: Ballot, instance: InstanceId) -> Vec<Outbound> {
        let id = self.id;
        let held = self.held;
        let state = self.instances.get_or_create(instance);

        if state.is_decided() || held {
            trace!("{} ABORT on instance {} ignored (decided or held)", id, instance);
            return Vec::new();
        }
        if ballot != state.ballot || state.proposal.is_none() {
            trace!("{} ABORT for old ballot {} on instance {}", id, ballot, instance);
            return Vec::new();
        }
        if !state.schedule_retry(ballot) {
            return Vec::new();
        }

        info!("🔁 {} round aborted on instance {} (ballot {})", id, instance, ballot);
        tracing::info!(target: "consensus", "EVENT:ABORT process={} instance={} ballot={}", id, instance, ballot);

        vec![Outbound::ScheduleRetry { instance, ballot }]
    }

    /// Passive adoption of a value decided elsewhere.
    pub fn on_decide(&mut self, value: Value, instance: InstanceId) -> Vec<Outbound> {
        let state = self.instances.get_or_create(instance);
        if !state.mark_decided(value) {
            trace!("{} duplicate DECIDE on instance {}", self.id, instance);
            return Vec::new();
        }

        info!("📥 {} adopted {} on instance {}", self.id, value, instance);
        tracing::info!(target: "consensus", "EVENT:ADOPT process={} instance={} value={}", self.id, instance, value);

        vec![Outbound::Decided { instance, value }]
    }
}
