use thiserror::Error;
use tracing::instrument;

use crate::codec::{FrameCodec, Opcode};

/// Typed notification events emitted by iPIXEL displays.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NotifyEvent {
    /// Reply to the device-info query, to be parsed as device info.
    DeviceInfoReply(Vec<u8>),
    /// Other well-formed length/opcode frame.
    Frame { opcode: Opcode, payload: Vec<u8> },
    /// Unrecognised notification payload preserved as raw bytes.
    Unknown(Vec<u8>),
}

/// Errors returned while decoding notification payloads.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum NotificationDecodeError {
    #[error("notification payload was empty")]
    EmptyPayload,
}

/// Decodes raw `fa03` notification payloads into typed events.
pub struct NotificationHandler;

impl NotificationHandler {
    /// Decodes one notification payload.
    ///
    /// Device-info replies are recognised by their `01 80` marker alone,
    /// since some firmware reports a length that does not match the payload.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is empty.
    #[instrument(skip(payload), level = "trace", fields(payload_len = payload.len()))]
    pub fn decode(payload: &[u8]) -> Result<NotifyEvent, NotificationDecodeError> {
        if payload.is_empty() {
            return Err(NotificationDecodeError::EmptyPayload);
        }

        if payload.get(2..4) == Some(&[0x01, 0x80][..]) {
            return Ok(NotifyEvent::DeviceInfoReply(payload.to_vec()));
        }

        match FrameCodec::decode(payload) {
            Ok(frame) => Ok(NotifyEvent::Frame {
                opcode: frame.opcode(),
                payload: frame.payload().to_vec(),
            }),
            Err(_) => Ok(NotifyEvent::Unknown(payload.to_vec())),
        }
    }
}
