use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, instrument, trace};

use super::link::{Link, Notification, NotificationStream, WriteMode};
use crate::codec::{FrameCodec, Opcode};
use crate::error::{FixtureError, InteractionError};
use crate::protocol::EndpointId;

const NOTIFICATION_CAPACITY: usize = 64;

/// Parsed fake hex payload.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub struct HexPayload {
    payload: Vec<u8>,
}

impl FromStr for HexPayload {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact: String = value
            .chars()
            .filter(|character| !character.is_ascii_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(FixtureError::EmptyHex);
        }
        let payload = hex::decode(compact)?;
        Ok(Self { payload })
    }
}

/// Settings for a scripted in-memory link.
#[derive(Debug, Clone, Default, Builder)]
pub struct FakeLinkConfig {
    /// Makes every `connect` call fail.
    #[builder(default)]
    connect_fails: bool,
    /// Makes every write fail after it is recorded.
    #[builder(default)]
    reject_writes: bool,
    /// Reply pushed on the notify characteristic after a time-sync write,
    /// while the notify characteristic is subscribed. `None` keeps the
    /// display silent.
    #[builder(into)]
    device_info_reply: Option<Vec<u8>>,
    /// Delay before the scripted reply is pushed.
    #[builder(default)]
    reply_delay: Duration,
}

#[derive(Debug, Default)]
struct FakeState {
    connected: bool,
    connect_count: usize,
    writes: Vec<(EndpointId, Vec<u8>)>,
    subscribe_count: usize,
    unsubscribe_count: usize,
    active_subscriptions: BTreeSet<EndpointId>,
}

/// Scripted link used in tests and by the `--fake` CLI mode.
///
/// Records every write and subscription change, and answers time-sync
/// writes with the configured device-info reply.
#[derive(Debug)]
pub struct FakeLink {
    config: FakeLinkConfig,
    state: Arc<Mutex<FakeState>>,
    notifications: broadcast::Sender<Notification>,
}

impl FakeLink {
    /// Creates a fake link from explicit settings.
    #[must_use]
    pub fn new(config: FakeLinkConfig) -> Self {
        let (notifications, _receiver) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            config,
            state: Arc::new(Mutex::new(FakeState::default())),
            notifications,
        }
    }

    /// Returns every payload written to the write characteristic, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock()
            .writes
            .iter()
            .filter(|(endpoint, _)| *endpoint == EndpointId::WriteCharacteristic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.lock().subscribe_count
    }

    #[must_use]
    pub fn unsubscribe_count(&self) -> usize {
        self.lock().unsubscribe_count
    }

    /// Returns endpoints that currently have notifications enabled.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<EndpointId> {
        self.lock().active_subscriptions.iter().copied().collect()
    }

    /// Pushes an unsolicited notification to every open stream.
    pub fn inject_notification(&self, endpoint: EndpointId, value: Vec<u8>) {
        let _ = self.notifications.send(Notification { endpoint, value });
    }

    /// Simulates the radio dropping the connection without a disconnect call.
    pub fn drop_connection(&self) {
        let mut state = self.lock();
        state.connected = false;
        state.active_subscriptions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_reply(&self, payload: &[u8]) {
        let Some(reply) = self.config.device_info_reply.clone() else {
            return;
        };
        let is_time_sync = FrameCodec::decode(payload)
            .is_ok_and(|frame| frame.opcode() == Opcode::TIME_SYNC);
        if !is_time_sync {
            return;
        }

        let state = Arc::clone(&self.state);
        let sender = self.notifications.clone();
        let delay = self.config.reply_delay;
        let deliver = move || {
            let subscribed = state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .active_subscriptions
                .contains(&EndpointId::NotifyCharacteristic);
            if subscribed {
                trace!(reply_len = reply.len(), "pushing scripted device-info reply");
                let _ = sender.send(Notification {
                    endpoint: EndpointId::NotifyCharacteristic,
                    value: reply,
                });
            }
        };

        if delay.is_zero() {
            deliver();
        } else {
            tokio::spawn(async move {
                sleep(delay).await;
                deliver();
            });
        }
    }
}

impl Default for FakeLink {
    fn default() -> Self {
        Self::new(FakeLinkConfig::default())
    }
}

#[async_trait]
impl Link for FakeLink {
    #[instrument(skip(self), level = "trace")]
    async fn connect(&self) -> Result<(), InteractionError> {
        let mut state = self.lock();
        state.connect_count += 1;
        if self.config.connect_fails {
            return Err(InteractionError::FakeConnectRefused);
        }
        state.connected = true;
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    async fn disconnect(&self) -> Result<(), InteractionError> {
        let mut state = self.lock();
        state.connected = false;
        state.active_subscriptions.clear();
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.lock().connected
    }

    #[instrument(skip(self, payload), level = "trace", fields(%endpoint, %mode, payload_len = payload.len()))]
    async fn write(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError> {
        {
            let mut state = self.lock();
            if !state.connected {
                return Err(InteractionError::NotConnected);
            }
            state.writes.push((endpoint, payload.to_vec()));
        }
        if self.config.reject_writes {
            return Err(InteractionError::FakeWriteRejected { endpoint });
        }
        self.schedule_reply(payload);
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn subscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(InteractionError::NotConnected);
        }
        state.subscribe_count += 1;
        state.active_subscriptions.insert(endpoint);
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn unsubscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let mut state = self.lock();
        state.unsubscribe_count += 1;
        if !state.connected {
            debug!("unsubscribe on a dropped fake link");
            return Err(InteractionError::NotConnected);
        }
        state.active_subscriptions.remove(&endpoint);
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationStream, InteractionError> {
        if !self.lock().connected {
            return Err(InteractionError::NotConnected);
        }
        let stream = BroadcastStream::new(self.notifications.subscribe())
            .filter_map(|notification| notification.ok());
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::codec::{Command, TimeSync};

    #[rstest]
    #[case("0c00018002", vec![0x0C, 0x00, 0x01, 0x80, 0x02])]
    #[case("0C 00 01 80", vec![0x0C, 0x00, 0x01, 0x80])]
    fn hex_payload_parses_with_or_without_spaces(#[case] input: &str, #[case] expected: Vec<u8>) {
        let payload: Vec<u8> = input.parse::<HexPayload>().expect("hex should parse").into();
        assert_eq!(expected, payload);
    }

    #[test]
    fn hex_payload_rejects_bad_input() {
        assert_matches!("  ".parse::<HexPayload>(), Err(FixtureError::EmptyHex));
        assert_matches!("zz".parse::<HexPayload>(), Err(FixtureError::InvalidHex(_)));
        assert_matches!("abc".parse::<HexPayload>(), Err(FixtureError::InvalidHex(_)));
    }

    #[tokio::test]
    async fn writes_require_connection() {
        let link = FakeLink::default();
        let result = link
            .write(EndpointId::WriteCharacteristic, &[0x01], WriteMode::default())
            .await;
        assert_matches!(result, Err(InteractionError::NotConnected));
        assert!(link.writes().is_empty());
    }

    #[tokio::test]
    async fn time_sync_write_pushes_reply_only_when_subscribed() {
        let link = FakeLink::new(
            FakeLinkConfig::builder()
                .device_info_reply(vec![0x06, 0x00, 0x01, 0x80, 0x00, 0x03])
                .build(),
        );
        link.connect().await.expect("fake connect should succeed");
        let mut stream = link.notifications().await.expect("stream should open");
        let query = Command::DeviceInfoQuery(
            TimeSync::new(1, 2, 3).expect("time should be valid"),
        )
        .encode();

        link.write(EndpointId::WriteCharacteristic, &query, WriteMode::default())
            .await
            .expect("write should succeed");
        link.subscribe(EndpointId::NotifyCharacteristic)
            .await
            .expect("subscribe should succeed");
        link.write(EndpointId::WriteCharacteristic, &query, WriteMode::default())
            .await
            .expect("write should succeed");

        let notification = stream.next().await.expect("reply should be pushed");
        assert_eq!(EndpointId::NotifyCharacteristic, notification.endpoint);
        assert_eq!(vec![0x06, 0x00, 0x01, 0x80, 0x00, 0x03], notification.value);
        assert_eq!(2, link.writes().len());
    }

    #[tokio::test]
    async fn disconnect_clears_subscriptions() {
        let link = FakeLink::default();
        link.connect().await.expect("fake connect should succeed");
        link.subscribe(EndpointId::NotifyCharacteristic)
            .await
            .expect("subscribe should succeed");
        assert_eq!(vec![EndpointId::NotifyCharacteristic], link.active_subscriptions());

        link.disconnect().await.expect("disconnect should succeed");
        assert!(link.active_subscriptions().is_empty());
        assert_matches!(
            link.unsubscribe(EndpointId::NotifyCharacteristic).await,
            Err(InteractionError::NotConnected)
        );
    }
}
