use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use bon::Builder;
use serde::Serialize;
use strum_macros::Display;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OnceCell, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::device_info::{DeviceInfo, ResolvedDeviceInfo};
use super::link::{Link, Notification, NotificationStream, WriteMode};
use super::reply_slot::{PendingReply, ReplySlot};
use crate::codec::{Command, FrameCodec, Opcode, ScreenPower, TimeSync};
use crate::error::{InteractionError, QueryError, SendError};
use crate::notification::NotificationHandler;
use crate::protocol::EndpointId;
use crate::utils::{duration_ms, format_hex};

/// Default deadline for the device-info reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Lifecycle state of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    #[strum(to_string = "disconnected")]
    Disconnected,
    #[strum(to_string = "connecting")]
    Connecting,
    #[strum(to_string = "connected")]
    Connected,
}

/// Per-session settings.
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    /// Deadline used by [`DeviceSession::query_device_info`].
    #[builder(default = DEFAULT_REPLY_TIMEOUT)]
    reply_timeout: Duration,
    /// Write mode for command frames.
    #[builder(default)]
    write_mode: WriteMode,
}

impl SessionConfig {
    #[must_use]
    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

struct Listener {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Connection to one iPIXEL display.
///
/// Writes are serialized through a write gate, and at most one device-info
/// exchange is outstanding at a time. Failures surface as `false` or a
/// fallback [`DeviceInfo`]; the `try_*` variants keep the error.
pub struct DeviceSession {
    link: Arc<dyn Link>,
    config: SessionConfig,
    state: watch::Sender<ConnectionState>,
    lifecycle: Mutex<Option<Listener>>,
    power: StdMutex<Option<ScreenPower>>,
    device_info: OnceCell<ResolvedDeviceInfo>,
    reply_slot: Arc<ReplySlot>,
    write_gate: Mutex<()>,
    query_gate: Mutex<()>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeviceSession")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .field("power", &self.power_state())
            .field("device_info", &self.device_info.get())
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Creates a disconnected session over `link`.
    #[must_use]
    pub fn new(link: Arc<dyn Link>, config: SessionConfig) -> Self {
        let (state, _receiver) = watch::channel(ConnectionState::Disconnected);
        Self {
            link,
            config,
            state,
            lifecycle: Mutex::new(None),
            power: StdMutex::new(None),
            device_info: OnceCell::new(),
            reply_slot: Arc::new(ReplySlot::default()),
            write_gate: Mutex::new(()),
            query_gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connects and starts the notification listener; `false` on failure.
    pub async fn connect(&self) -> bool {
        match self.try_connect().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "failed to connect to display");
                false
            }
        }
    }

    /// Connects and starts the notification listener.
    ///
    /// Calling this while connected is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the link error when connecting or opening the notification
    /// stream fails. The session is left disconnected.
    #[instrument(skip(self), level = "debug")]
    pub async fn try_connect(&self) -> Result<(), InteractionError> {
        let mut listener = self.lifecycle.lock().await;
        if self.is_connected() {
            if self.link.is_connected().await {
                trace!("already connected");
                return Ok(());
            }
            debug!("link dropped since the last connect; reconnecting");
            self.reply_slot.disarm();
            stop_listener(listener.take()).await;
        }

        self.state.send_replace(ConnectionState::Connecting);
        match self.open_link().await {
            Ok(started) => {
                *listener = Some(started);
                self.state.send_replace(ConnectionState::Connected);
                info!("connected to display");
                Ok(())
            }
            Err(error) => {
                self.state.send_replace(ConnectionState::Disconnected);
                Err(error)
            }
        }
    }

    async fn open_link(&self) -> Result<Listener, InteractionError> {
        self.link.connect().await?;
        let notifications = match self.link.notifications().await {
            Ok(notifications) => notifications,
            Err(error) => {
                if let Err(disconnect_error) = self.link.disconnect().await {
                    debug!(error = %disconnect_error, "failed to close link after stream error");
                }
                return Err(error);
            }
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_listener(
            notifications,
            Arc::clone(&self.reply_slot),
            cancel.clone(),
        ));
        Ok(Listener { cancel, task })
    }

    /// Stops the listener, wakes any pending query and closes the link.
    #[instrument(skip(self), level = "debug")]
    pub async fn disconnect(&self) {
        let mut listener = self.lifecycle.lock().await;
        self.state.send_replace(ConnectionState::Disconnected);
        self.reply_slot.disarm();
        stop_listener(listener.take()).await;
        if let Err(error) = self.link.disconnect().await {
            debug!(error = %error, "link disconnect failed");
        }
    }

    /// Sends every frame of `command`; `false` on any failure.
    pub async fn send_command(&self, command: &Command) -> bool {
        log_send_outcome(self.try_send_command(command).await, command.opcode())
    }

    /// Sends every frame of `command` while holding the write gate.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotConnected`] or the link failure.
    pub async fn try_send_command(&self, command: &Command) -> Result<(), SendError> {
        self.try_send_frames(&command.frames()).await
    }

    /// Writes one pre-encoded frame; `false` on failure.
    pub async fn send_frame(&self, frame: &[u8]) -> bool {
        log_send_outcome(self.try_send_frame(frame).await, frame_opcode(frame))
    }

    /// Writes one pre-encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotConnected`] or the link failure.
    pub async fn try_send_frame(&self, frame: &[u8]) -> Result<(), SendError> {
        let _gate = self.write_gate.lock().await;
        self.write_frame(frame).await
    }

    /// Writes several frames back to back; `false` on the first failure.
    pub async fn send_frames(&self, frames: &[Vec<u8>]) -> bool {
        let opcode = frames
            .first()
            .map_or(Opcode::from(0), |frame| frame_opcode(frame));
        log_send_outcome(self.try_send_frames(frames).await, opcode)
    }

    /// Writes several frames without interleaving other writers.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later frames are not sent.
    #[instrument(skip(self, frames), level = "debug", fields(frame_count = frames.len()))]
    pub async fn try_send_frames(&self, frames: &[Vec<u8>]) -> Result<(), SendError> {
        let _gate = self.write_gate.lock().await;
        for frame in frames {
            self.write_frame(frame).await?;
        }
        Ok(())
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<(), SendError> {
        if !self.is_connected() {
            return Err(SendError::NotConnected);
        }
        trace!(frame = %format_hex(frame), "writing frame");
        self.link
            .write(
                EndpointId::WriteCharacteristic,
                frame,
                self.config.write_mode,
            )
            .await
            .map_err(SendError::Link)
    }

    /// Returns the device info, asking the display on first use.
    pub async fn query_device_info(&self) -> DeviceInfo {
        self.query_device_info_with_timeout(self.config.reply_timeout)
            .await
    }

    /// Returns the device info, asking the display with `deadline` on first use.
    ///
    /// The first outcome, real or fallback, is cached for the session.
    pub async fn query_device_info_with_timeout(&self, deadline: Duration) -> DeviceInfo {
        self.device_info
            .get_or_init(|| self.resolve_device_info(deadline))
            .await
            .info()
            .clone()
    }

    /// Returns the cached device-info outcome, if a query has completed.
    #[must_use]
    pub fn resolved_device_info(&self) -> Option<&ResolvedDeviceInfo> {
        self.device_info.get()
    }

    async fn resolve_device_info(&self, deadline: Duration) -> ResolvedDeviceInfo {
        match self.exchange_device_info(deadline).await {
            Ok(info) => {
                info!(
                    width = info.width,
                    height = info.height,
                    led_type = info.led_type,
                    "display reported device info"
                );
                ResolvedDeviceInfo::reported(info)
            }
            Err(error) => {
                warn!(error = %error, "device-info query failed; using fallback profile");
                ResolvedDeviceInfo::fallback(error)
            }
        }
    }

    #[instrument(
        skip(self),
        level = "debug",
        fields(timeout_ms = duration_ms(deadline))
    )]
    async fn exchange_device_info(&self, deadline: Duration) -> Result<DeviceInfo, QueryError> {
        let _gate = self.query_gate.lock().await;
        if !self.is_connected() {
            return Err(QueryError::NotConnected);
        }

        let mut pending = self.reply_slot.arm()?;
        let subscription = NotifySubscription::new(Arc::clone(&self.link));
        let outcome = self.request_device_info(&subscription, &mut pending, deadline).await;
        subscription.release().await;
        drop(pending);

        let payload = outcome?;
        debug!(payload = %format_hex(&payload), "device-info reply");
        Ok(DeviceInfo::parse(&payload)?)
    }

    async fn request_device_info(
        &self,
        subscription: &NotifySubscription,
        pending: &mut PendingReply,
        deadline: Duration,
    ) -> Result<Vec<u8>, QueryError> {
        subscription.subscribe().await?;
        let query = Command::DeviceInfoQuery(TimeSync::at(OffsetDateTime::now_utc()));
        self.try_send_command(&query).await?;
        pending.wait(deadline).await
    }

    /// Returns the last power state sent successfully in this session.
    #[must_use]
    pub fn power_state(&self) -> Option<ScreenPower> {
        *self.power.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_power(&self, power: ScreenPower) {
        *self.power.lock().unwrap_or_else(PoisonError::into_inner) = Some(power);
    }
}

/// Notify subscription held for one device-info exchange.
///
/// Released explicitly on the normal path; a cancelled exchange releases it
/// from a spawned task.
struct NotifySubscription {
    link: Arc<dyn Link>,
    released: bool,
}

impl NotifySubscription {
    fn new(link: Arc<dyn Link>) -> Self {
        Self {
            link,
            released: false,
        }
    }

    async fn subscribe(&self) -> Result<(), InteractionError> {
        self.link.subscribe(EndpointId::NotifyCharacteristic).await
    }

    async fn release(mut self) {
        self.released = true;
        if let Err(error) = self.link.unsubscribe(EndpointId::NotifyCharacteristic).await {
            debug!(error = %error, "failed to release notify subscription");
        }
    }
}

impl Drop for NotifySubscription {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let link = Arc::clone(&self.link);
        runtime.spawn(async move {
            if let Err(error) = link.unsubscribe(EndpointId::NotifyCharacteristic).await {
                debug!(error = %error, "failed to release notify subscription after cancellation");
            }
        });
    }
}

async fn stop_listener(listener: Option<Listener>) {
    let Some(listener) = listener else {
        return;
    };
    listener.cancel.cancel();
    if let Err(error) = listener.task.await {
        debug!(error = %error, "notification listener ended abnormally");
    }
}

async fn run_listener(
    mut notifications: NotificationStream,
    reply_slot: Arc<ReplySlot>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            next = notifications.next() => match next {
                Some(notification) => route_notification(&reply_slot, notification),
                None => {
                    debug!("notification stream closed");
                    reply_slot.disarm();
                    break;
                }
            },
        }
    }
}

fn route_notification(reply_slot: &ReplySlot, notification: Notification) {
    let Notification { endpoint, value } = notification;
    match NotificationHandler::decode(&value) {
        Ok(event) => debug!(%endpoint, payload = %format_hex(&value), ?event, "notification"),
        Err(error) => debug!(%endpoint, error = %error, "undecodable notification"),
    }
    if endpoint == EndpointId::NotifyCharacteristic && reply_slot.fulfil(value) {
        trace!("routed notification to pending reply");
    }
}

fn log_send_outcome(result: Result<(), SendError>, opcode: Opcode) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!(
                error = %error,
                %opcode,
                family = opcode_family(opcode),
                "failed to send command"
            );
            false
        }
    }
}

fn opcode_family(opcode: Opcode) -> &'static str {
    if opcode.is_legacy() { "legacy" } else { "framed" }
}

fn frame_opcode(frame: &[u8]) -> Opcode {
    FrameCodec::decode(frame).map_or(Opcode::from(0), |decoded| decoded.opcode())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[0x05, 0x00, 0x07, 0x01, 0x01], "legacy")]
    #[case(&[0x05, 0x00, 0x04, 0x80, 0x32], "framed")]
    #[case(&[0x01], "framed")]
    fn failed_sends_are_tagged_with_the_frame_family(
        #[case] frame: &[u8],
        #[case] expected: &str,
    ) {
        assert_eq!(expected, opcode_family(frame_opcode(frame)));
    }
}
