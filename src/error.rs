use thiserror::Error;

use crate::hw::DeviceInfoError;
use crate::protocol::{EndpointId, endpoint_metadata};

/// Errors returned by BLE link operations.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("no iPIXEL display matching {target} was found within {timeout_ms}ms")]
    DeviceNotFound { target: String, timeout_ms: u64 },
    #[error(
        "required endpoint `{name}` ({uuid}) was not found on the connected device",
        name = endpoint_metadata(*endpoint).name(),
        uuid = endpoint_metadata(*endpoint).uuid()
    )]
    MissingEndpoint { endpoint: EndpointId },
    #[error("the link is not connected")]
    NotConnected,
    #[error("the fake link refused to connect")]
    FakeConnectRefused,
    #[error("the fake link rejected a write to {endpoint}")]
    FakeWriteRejected { endpoint: EndpointId },
}

/// Errors returned when parsing fake link fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("hex payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("hex payload cannot be empty")]
    EmptyHex,
}

/// Errors returned by session writes.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session has no live link.
    #[error("session is not connected")]
    NotConnected,
    /// The link failed or rejected the write.
    #[error("link write failed")]
    Link(#[source] InteractionError),
}

/// Reasons a device-info exchange fell back to the default profile.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No reply arrived before the deadline.
    #[error("no device-info reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The session has no live link.
    #[error("session is not connected")]
    NotConnected,
    /// Another exchange already owns the reply slot.
    #[error("a device-info exchange is already in flight")]
    Busy,
    /// The reply slot was torn down while waiting, usually by a disconnect.
    #[error("reply slot closed before a reply arrived")]
    ReplyChannelClosed,
    /// Subscribing or writing the request failed.
    #[error(transparent)]
    Link(#[from] InteractionError),
    /// The reply could not be parsed.
    #[error(transparent)]
    Protocol(#[from] DeviceInfoError),
}

impl From<SendError> for QueryError {
    fn from(error: SendError) -> Self {
        match error {
            SendError::NotConnected => Self::NotConnected,
            SendError::Link(source) => Self::Link(source),
        }
    }
}

/// Errors returned when validating runtime CLI options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("could not connect to the display")]
    ConnectFailed,
    #[error("the display did not accept the {command} command")]
    CommandFailed { command: &'static str },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
