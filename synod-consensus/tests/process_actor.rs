use std::sync::Arc;
use std::time::Duration;

use synod_common::{Decided, ProcessId, ProtocolMessage, Value};
use synod_consensus::{DecisionSink, Envelope, Message, Process, ProcessConfig, ProcessHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn fake_peer(id: usize) -> (ProcessHandle, UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProcessHandle::new(ProcessId(id), tx), rx)
}

async fn next_protocol(rx: &mut UnboundedReceiver<Envelope>) -> (Option<ProcessId>, ProtocolMessage) {
    let envelope = timeout(WAIT, rx.recv()).await.expect("timed out").expect("inbox closed");
    match envelope.message {
        Message::Protocol(message) => (envelope.from, message),
        other => panic!("expected protocol message, got {:?}", other),
    }
}

/// Spawns p0 of a 3-process run wired to two fake peers.
fn spawn_with_fakes() -> (
    ProcessHandle,
    Vec<UnboundedReceiver<Envelope>>,
    UnboundedReceiver<Decided>,
) {
    let (handle, _task) = Process::spawn(ProcessId(0), 3, ProcessConfig::default().with_seed(7));
    let (p1, rx1) = fake_peer(1);
    let (p2, rx2) = fake_peer(2);
    let (decisions_tx, decisions_rx) = mpsc::unbounded_channel::<Decided>();
    let collector: Arc<dyn DecisionSink> = Arc::new(decisions_tx);
    handle.wire(collector, vec![handle.clone(), p1, p2]).unwrap();
    (handle, vec![rx1, rx2], decisions_rx)
}

#[tokio::test]
async fn test_single_process_decides_alone() {
    let (handle, _task) = Process::spawn(ProcessId(0), 1, ProcessConfig::default());
    let (tx, mut decisions) = mpsc::unbounded_channel::<Decided>();
    handle.wire(Arc::new(tx), vec![]).unwrap();
    handle.launch().unwrap();

    let decided = timeout(WAIT, decisions.recv()).await.unwrap().unwrap();
    assert_eq!(decided.instance, 1);
    assert_eq!(decided.process, ProcessId(0));

    let status = handle.inspect().await.unwrap();
    assert_eq!(status.instance(1).and_then(|s| s.decided), Some(decided.value));
}

#[tokio::test]
async fn test_full_round_with_fake_acceptor() {
    let (handle, mut peers, mut decisions) = spawn_with_fakes();
    handle.launch().unwrap();

    let (from, read) = next_protocol(&mut peers[0]).await;
    assert_eq!(from, Some(ProcessId(0)));
    assert_eq!(read, ProtocolMessage::Read { ballot: 0, instance: 1 });

    // Together with p0's own GATHER this is a majority of 3.
    handle
        .send_protocol(
            ProcessId(1),
            ProtocolMessage::Gather { sender: ProcessId(1), ballot: 0, est_ballot: -2, estimate: None, instance: 1 },
        )
        .unwrap();

    let (_, impose) = next_protocol(&mut peers[0]).await;
    let value = match impose {
        ProtocolMessage::Impose { ballot: 0, value, instance: 1 } => value,
        other => panic!("expected IMPOSE, got {}", other),
    };

    handle.send_protocol(ProcessId(1), ProtocolMessage::Ack { ballot: 0, instance: 1 }).unwrap();

    // p2 also saw READ and IMPOSE before the decision
    let (_, first) = next_protocol(&mut peers[1]).await;
    assert!(matches!(first, ProtocolMessage::Read { .. }));
    let (_, second) = next_protocol(&mut peers[1]).await;
    assert!(matches!(second, ProtocolMessage::Impose { .. }));
    let (_, decide) = next_protocol(&mut peers[1]).await;
    assert_eq!(decide, ProtocolMessage::Decide { value, instance: 1 });

    let decided = timeout(WAIT, decisions.recv()).await.unwrap().unwrap();
    assert_eq!((decided.instance, decided.value), (1, value));
}

#[tokio::test]
async fn test_adopts_estimate_reported_by_acceptor() {
    let (handle, mut peers, _decisions) = spawn_with_fakes();
    handle.launch().unwrap();
    next_protocol(&mut peers[0]).await;

    handle
        .send_protocol(
            ProcessId(1),
            ProtocolMessage::Gather {
                sender: ProcessId(1),
                ballot: 0,
                est_ballot: 0,
                estimate: Some(Value::One),
                instance: 1,
            },
        )
        .unwrap();

    let (_, impose) = next_protocol(&mut peers[0]).await;
    assert_eq!(impose, ProtocolMessage::Impose { ballot: 0, value: Value::One, instance: 1 });
}

#[tokio::test]
async fn test_abort_triggers_retry_with_next_ballot() {
    let (handle, mut peers, _decisions) = spawn_with_fakes();
    handle.launch().unwrap();
    next_protocol(&mut peers[0]).await;

    handle.send_protocol(ProcessId(1), ProtocolMessage::Abort { ballot: 0, instance: 1 }).unwrap();
    // a second ABORT for the same ballot must not schedule another retry
    handle.send_protocol(ProcessId(2), ProtocolMessage::Abort { ballot: 0, instance: 1 }).unwrap();

    let (_, retry) = next_protocol(&mut peers[0]).await;
    assert_eq!(retry, ProtocolMessage::Read { ballot: 3, instance: 1 });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = handle.inspect().await.unwrap();
    assert_eq!(status.instance(1).map(|s| s.rounds), Some(2));
}

#[tokio::test]
async fn test_duplicate_decide_notifies_once() {
    let (handle, _peers, mut decisions) = spawn_with_fakes();
    for _ in 0..3 {
        handle
            .send_protocol(ProcessId(2), ProtocolMessage::Decide { value: Value::Zero, instance: 4 })
            .unwrap();
    }
    // inspect is handled after the three DECIDEs, so it works as a barrier
    let status = handle.inspect().await.unwrap();
    assert_eq!(status.instance(4).and_then(|s| s.decided), Some(Value::Zero));

    assert_eq!(decisions.recv().await.map(|d| d.value), Some(Value::Zero));
    assert!(decisions.try_recv().is_err());
}

#[tokio::test]
async fn test_crashed_process_stays_silent() {
    let (handle, mut peers, mut decisions) = spawn_with_fakes();
    handle.crash(1.0).unwrap();
    handle.send_protocol(ProcessId(1), ProtocolMessage::Read { ballot: 1, instance: 1 }).unwrap();
    handle.launch().unwrap();
    handle
        .send_protocol(ProcessId(1), ProtocolMessage::Decide { value: Value::One, instance: 1 })
        .unwrap();

    let status = handle.inspect().await.unwrap();
    assert!(status.crashed);
    assert_eq!(status.crash_probability, 1.0);
    assert!(status.instances.is_empty());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(peers[0].try_recv().is_err());
    assert!(peers[1].try_recv().is_err());
    assert!(decisions.try_recv().is_err());
}

#[tokio::test]
async fn test_crash_probability_is_set_once() {
    let (handle, mut peers, _decisions) = spawn_with_fakes();
    handle.crash(0.0).unwrap();
    handle.crash(1.0).unwrap();
    handle.send_protocol(ProcessId(1), ProtocolMessage::Read { ballot: 1, instance: 1 }).unwrap();

    let (_, reply) = next_protocol(&mut peers[0]).await;
    assert!(matches!(reply, ProtocolMessage::Gather { ballot: 1, .. }), "{:?}", reply);

    let status = handle.inspect().await.unwrap();
    assert!(!status.crashed);
    assert_eq!(status.crash_probability, 0.0);
}

#[tokio::test]
async fn test_held_process_still_answers_but_never_proposes() {
    let (handle, mut peers, _decisions) = spawn_with_fakes();
    handle.hold().unwrap();
    handle.launch().unwrap();
    handle.send_protocol(ProcessId(1), ProtocolMessage::Read { ballot: 1, instance: 1 }).unwrap();

    let (_, reply) = next_protocol(&mut peers[0]).await;
    assert_eq!(
        reply,
        ProtocolMessage::Gather { sender: ProcessId(0), ballot: 1, est_ballot: -3, estimate: None, instance: 1 }
    );

    let status = handle.inspect().await.unwrap();
    assert!(status.held);
    assert_eq!(status.rounds_started(), 0);
    assert!(peers[1].try_recv().is_err());
}

#[tokio::test]
async fn test_unwired_process_ignores_traffic() {
    let (handle, _task) = Process::spawn(ProcessId(1), 3, ProcessConfig::default());
    handle.launch().unwrap();
    handle.send_protocol(ProcessId(0), ProtocolMessage::Read { ballot: 0, instance: 1 }).unwrap();

    let status = handle.inspect().await.unwrap();
    assert!(!status.wired);
    assert!(status.instances.is_empty());
}

#[tokio::test]
async fn test_second_actor_list_is_ignored() {
    let (handle, mut peers, _decisions) = spawn_with_fakes();
    let (other, mut other_rx) = fake_peer(1);
    let (tx, _rx) = mpsc::unbounded_channel::<Decided>();
    handle.wire(Arc::new(tx), vec![other]).unwrap();

    handle.launch().unwrap();
    next_protocol(&mut peers[0]).await;
    assert!(other_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stop_ends_the_task() {
    let (handle, task) = Process::spawn(ProcessId(0), 3, ProcessConfig::default());
    handle.stop().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
    assert!(handle.launch().is_err());
}
