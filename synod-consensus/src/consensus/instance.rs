use std::collections::BTreeMap;

use serde::Serialize;
use synod_common::env::consensus::types::{ballot_for_round, initial_ballot};
use synod_common::{Ballot, InstanceId, ProcessId, Value};

/// Where an instance stands on this process, from the proposer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No round started here yet (the process may still act as acceptor).
    Idle,
    /// READ sent, collecting GATHER replies.
    Reading,
    /// IMPOSE sent, collecting ACK replies.
    Imposing,
    /// Terminal.
    Decided,
}

/// What an acceptor reported in its GATHER reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerState {
    pub est_ballot: Ballot,
    pub estimate: Option<Value>,
}

/// Mutable record of one consensus instance on one process.
#[derive(Debug, Clone)]
pub struct InstanceState {
    id: ProcessId,
    pub ballot: Ballot,
    pub read_ballot: Ballot,
    pub impose_ballot: Ballot,
    pub estimate: Option<Value>,
    pub proposal: Option<Value>,
    pub phase: Phase,
    /// Rounds this process started for the instance.
    pub rounds: u64,

    // One slot per process id, plus the order in which slots were filled.
    peer_states: Vec<Option<PeerState>>,
    arrivals: Vec<ProcessId>,

    acks: Vec<bool>,
    ack_count: usize,

    pending_retry: Option<Ballot>,
}

impl InstanceState {
    pub fn new(id: ProcessId, n: usize) -> Self {
        Self {
            id,
            ballot: initial_ballot(id, n),
            read_ballot: 0,
            impose_ballot: initial_ballot(id, n),
            estimate: None,
            proposal: None,
            phase: Phase::Idle,
            rounds: 0,
            peer_states: vec![None; n],
            arrivals: Vec::with_capacity(n),
            acks: vec![false; n],
            ack_count: 0,
            pending_retry: None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.phase == Phase::Decided
    }

    /// The decided value, if any.
    pub fn decided(&self) -> Option<Value> {
        if self.is_decided() {
            self.proposal
        } else {
            None
        }
    }

    /// True when this acceptor already promised or accepted something newer than `ballot`.
    pub fn is_outdated(&self, ballot: Ballot) -> bool {
        self.read_ballot > ballot || self.impose_ballot > ballot
    }

    /// Moves to the next ballot of this process and clears every per-round tally.
    pub fn start_round(&mut self, n: usize) -> Ballot {
        self.rounds += 1;
        self.ballot = ballot_for_round(self.id, n, self.rounds);
        self.reset_states();
        self.reset_acks();
        self.pending_retry = None;
        self.phase = Phase::Reading;
        self.ballot
    }

    /// Stores the GATHER of `sender` and returns how many distinct acceptors answered.
    ///
    /// A repeated GATHER from the same acceptor overwrites its slot.
    pub fn record_state(&mut self, sender: ProcessId, state: PeerState) -> usize {
        let slot = &mut self.peer_states[sender.index()];
        if slot.is_none() {
            self.arrivals.push(sender);
        }
        *slot = Some(state);
        self.states_count()
    }

    pub fn states_count(&self) -> usize {
        self.arrivals.len()
    }

    /// Entry with the strictly highest `est_ballot`; ties keep the first one recorded.
    pub fn highest_state(&self) -> Option<PeerState> {
        let mut highest: Option<PeerState> = None;
        for sender in &self.arrivals {
            let Some(state) = self.peer_states[sender.index()] else {
                continue;
            };
            if highest.map_or(true, |h| state.est_ballot > h.est_ballot) {
                highest = Some(state);
            }
        }
        highest
    }

    pub fn reset_states(&mut self) {
        self.peer_states.iter_mut().for_each(|s| *s = None);
        self.arrivals.clear();
    }

    /// Counts the ACK of `sender` once and returns the number of distinct ACKs.
    pub fn record_ack(&mut self, sender: ProcessId) -> usize {
        let seen = &mut self.acks[sender.index()];
        if !*seen {
            *seen = true;
            self.ack_count += 1;
        }
        self.ack_count
    }

    pub fn ack_count(&self) -> usize {
        self.ack_count
    }

    fn reset_acks(&mut self) {
        self.acks.iter_mut().for_each(|a| *a = false);
        self.ack_count = 0;
    }

    /// Marks a retry as scheduled for `ballot`. Returns false if one already is.
    pub fn schedule_retry(&mut self, ballot: Ballot) -> bool {
        if self.pending_retry == Some(ballot) {
            return false;
        }
        self.pending_retry = Some(ballot);
        true
    }

    pub fn clear_retry(&mut self) {
        self.pending_retry = None;
    }

    /// Freezes the instance on `value`. Returns false if it was already decided.
    pub fn mark_decided(&mut self, value: Value) -> bool {
        if self.is_decided() {
            return false;
        }
        self.proposal = Some(value);
        self.estimate = Some(value);
        self.phase = Phase::Decided;
        self.pending_retry = None;
        self.reset_states();
        true
    }
}

/// Per-process map of instance records, created on first reference and never removed.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    id: ProcessId,
    n: usize,
    instances: BTreeMap<InstanceId, InstanceState>,
}

impl InstanceStore {
    pub fn new(id: ProcessId, n: usize) -> Self {
        Self {
            id,
            n,
            instances: BTreeMap::new(),
        }
    }

    /// Returns the record of `instance`, creating a fresh one if this is its first mention.
    pub fn get_or_create(&mut self, instance: InstanceId) -> &mut InstanceState {
        let (id, n) = (self.id, self.n);
        self.instances
            .entry(instance)
            .or_insert_with(|| InstanceState::new(id, n))
    }

    pub fn get(&self, instance: InstanceId) -> Option<&InstanceState> {
        self.instances.get(&instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InstanceId, &InstanceState)> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
