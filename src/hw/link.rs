use std::pin::Pin;

use async_trait::async_trait;
use serde::Serialize;
use strum_macros::Display;
use tokio_stream::Stream;

use crate::error::InteractionError;
use crate::protocol::EndpointId;

/// Write mode for characteristic writes.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Request/acknowledge write.
    #[strum(to_string = "with_response")]
    WithResponse,
    /// Fire-and-forget write, the mode the display app uses.
    #[default]
    #[strum(to_string = "without_response")]
    WithoutResponse,
}

/// One value pushed by the display on a subscribed characteristic.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notification {
    /// Endpoint the value arrived on.
    pub endpoint: EndpointId,
    /// Raw notification bytes.
    pub value: Vec<u8>,
}

/// Stream of notifications from a connected link.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// Minimal BLE primitive a [`DeviceSession`](super::DeviceSession) drives.
///
/// Implementations must tolerate `unsubscribe` and `disconnect` on a link
/// that has already dropped.
#[async_trait]
pub trait Link: Send + Sync {
    /// Opens the connection and resolves the iPIXEL endpoints.
    async fn connect(&self) -> Result<(), InteractionError>;

    /// Closes the connection.
    async fn disconnect(&self) -> Result<(), InteractionError>;

    /// Returns whether the underlying connection is still up.
    async fn is_connected(&self) -> bool;

    /// Writes one payload to `endpoint`.
    async fn write(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError>;

    /// Enables notifications on `endpoint`.
    async fn subscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError>;

    /// Disables notifications on `endpoint`.
    async fn unsubscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError>;

    /// Opens a stream of every notification the link receives.
    async fn notifications(&self) -> Result<NotificationStream, InteractionError>;
}
