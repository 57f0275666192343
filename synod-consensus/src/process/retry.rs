use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::trace;
use synod_common::{Ballot, InstanceId};

use super::handle::{Envelope, Message};

/// Arms a one-shot timer that drops `RetryDue { instance, ballot }` into the
/// owner's inbox after `delay`.
///
/// The timer only keeps a weak sender, so it never keeps a stopped process
/// alive, and it does not block the owner while it waits. Staleness is
/// checked when the message is handled, not here.
pub fn arm(owner: WeakUnboundedSender<Envelope>, delay: Duration, instance: InstanceId, ballot: Ballot) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match owner.upgrade() {
            Some(tx) => {
                let _ = tx.send(Envelope {
                    from: None,
                    message: Message::RetryDue { instance, ballot },
                });
            }
            None => trace!("retry for instance {} dropped, owner gone", instance),
        }
    });
}
