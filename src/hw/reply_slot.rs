use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::trace;

use crate::error::QueryError;
use crate::utils::duration_ms;

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    sender: Option<oneshot::Sender<Vec<u8>>>,
}

/// Single-occupancy correlation slot for notification replies.
///
/// At most one exchange may be armed at a time. Each arm bumps a generation
/// counter so a stale guard never disarms a newer exchange.
#[derive(Debug, Default)]
pub(crate) struct ReplySlot {
    state: Mutex<SlotState>,
}

impl ReplySlot {
    /// Arms the slot and returns the guard that owns the receiving half.
    pub(crate) fn arm(self: &Arc<Self>) -> Result<PendingReply, QueryError> {
        let mut state = self.lock();
        if state.sender.is_some() {
            return Err(QueryError::Busy);
        }
        let (sender, receiver) = oneshot::channel();
        state.generation = state.generation.wrapping_add(1);
        state.sender = Some(sender);
        trace!(generation = state.generation, "armed reply slot");
        Ok(PendingReply {
            slot: Arc::clone(self),
            generation: state.generation,
            receiver: Some(receiver),
        })
    }

    /// Delivers a payload to the armed exchange.
    ///
    /// Returns `false` when nothing is waiting.
    pub(crate) fn fulfil(&self, payload: Vec<u8>) -> bool {
        let sender = self.lock().sender.take();
        match sender {
            Some(sender) => sender.send(payload).is_ok(),
            None => false,
        }
    }

    /// Drops any armed sender, waking the waiter with a closed channel.
    pub(crate) fn disarm(&self) {
        if self.lock().sender.take().is_some() {
            trace!("disarmed pending reply");
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.lock().sender.is_some()
    }

    fn disarm_generation(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.sender = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Guard for one armed reply exchange; disarms the slot when dropped.
#[derive(Debug)]
pub(crate) struct PendingReply {
    slot: Arc<ReplySlot>,
    generation: u64,
    receiver: Option<oneshot::Receiver<Vec<u8>>>,
}

impl PendingReply {
    /// Waits for the reply until `deadline` elapses.
    pub(crate) async fn wait(&mut self, deadline: Duration) -> Result<Vec<u8>, QueryError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(QueryError::ReplyChannelClosed);
        };
        let outcome = tokio::time::timeout(deadline, receiver).await;
        self.receiver = None;
        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_closed)) => Err(QueryError::ReplyChannelClosed),
            Err(_elapsed) => Err(QueryError::Timeout {
                timeout_ms: duration_ms(deadline),
            }),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.slot.disarm_generation(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn fulfil_delivers_to_waiter() {
        let slot = Arc::new(ReplySlot::default());
        let mut pending = slot.arm().expect("fresh slot should arm");

        assert!(slot.fulfil(vec![0x01, 0x02]));
        let reply = pending.wait(Duration::from_secs(1)).await;
        assert_eq!(vec![0x01, 0x02], reply.expect("reply should arrive"));
    }

    #[tokio::test]
    async fn second_arm_is_busy() {
        let slot = Arc::new(ReplySlot::default());
        let _pending = slot.arm().expect("fresh slot should arm");

        assert_matches!(slot.arm(), Err(QueryError::Busy));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_without_reply() {
        let slot = Arc::new(ReplySlot::default());
        let mut pending = slot.arm().expect("fresh slot should arm");

        let reply = pending.wait(Duration::from_millis(250)).await;
        assert_matches!(reply, Err(QueryError::Timeout { timeout_ms: 250 }));
    }

    #[tokio::test]
    async fn disarm_closes_waiter() {
        let slot = Arc::new(ReplySlot::default());
        let mut pending = slot.arm().expect("fresh slot should arm");

        slot.disarm();
        let reply = pending.wait(Duration::from_secs(1)).await;
        assert_matches!(reply, Err(QueryError::ReplyChannelClosed));
    }

    #[test]
    fn dropping_guard_frees_slot() {
        let slot = Arc::new(ReplySlot::default());
        let pending = slot.arm().expect("fresh slot should arm");
        assert!(slot.is_armed());

        drop(pending);
        assert!(!slot.is_armed());
        assert!(!slot.fulfil(vec![0xFF]));
    }

    #[test]
    fn stale_guard_does_not_disarm_newer_exchange() {
        let slot = Arc::new(ReplySlot::default());
        let stale = slot.arm().expect("fresh slot should arm");
        slot.disarm();
        let _fresh = slot.arm().expect("disarmed slot should re-arm");

        drop(stale);
        assert!(slot.is_armed());
    }
}
