use serde::Serialize;
use thiserror::Error;

use crate::error::QueryError;
use crate::media::Canvas;

const REPLY_MARKER: [u8; 2] = [0x01, 0x80];
const MIN_REPLY_LEN: usize = 6;
const UNKNOWN_VERSION: &str = "Unknown";
const UNKNOWN_PASSWORD_FLAG: u8 = 255;

/// Panel size for each LED type index reported by the display.
const LED_TYPE_SIZES: [(u16, u16); 14] = [
    (64, 64),
    (96, 16),
    (32, 32),
    (64, 16),
    (32, 16),
    (64, 20),
    (128, 32),
    (144, 16),
    (192, 16),
    (48, 24),
    (64, 32),
    (96, 32),
    (128, 16),
    (96, 20),
];

/// Errors returned when a device-info reply cannot be parsed.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DeviceInfoError {
    #[error("device-info reply is too short: expected at least {MIN_REPLY_LEN} bytes, got {actual}")]
    TooShort { actual: usize },
    #[error("device-info reply has unexpected marker {found:02X?}")]
    UnexpectedMarker { found: [u8; 2] },
    #[error("unknown LED type {led_type}")]
    UnknownLedType { led_type: u8 },
}

/// Hardware description reported by the display.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub width: u16,
    pub height: u16,
    pub device_type: u8,
    pub led_type: u8,
    pub mcu_version: String,
    pub wifi_version: String,
    pub has_wifi: bool,
    pub password_flag: u8,
}

impl DeviceInfo {
    /// Profile used whenever the display cannot be asked.
    ///
    /// ```
    /// use ipixel::DeviceInfo;
    ///
    /// let info = DeviceInfo::fallback();
    /// assert_eq!((64, 16), (info.width, info.height));
    /// assert_eq!("Unknown", info.mcu_version);
    /// ```
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            width: 64,
            height: 16,
            device_type: 0,
            led_type: 0,
            mcu_version: UNKNOWN_VERSION.to_string(),
            wifi_version: UNKNOWN_VERSION.to_string(),
            has_wifi: false,
            password_flag: UNKNOWN_PASSWORD_FLAG,
        }
    }

    /// Parses a notify reply to the device-info query.
    ///
    /// # Errors
    ///
    /// Returns an error for short replies, a wrong marker or an LED type
    /// outside the known table.
    pub fn parse(payload: &[u8]) -> Result<Self, DeviceInfoError> {
        if payload.len() < MIN_REPLY_LEN {
            return Err(DeviceInfoError::TooShort {
                actual: payload.len(),
            });
        }
        let marker = [payload[2], payload[3]];
        if marker != REPLY_MARKER {
            return Err(DeviceInfoError::UnexpectedMarker { found: marker });
        }

        let device_type = payload[4];
        let led_type = payload[5];
        let (width, height) = LED_TYPE_SIZES
            .get(usize::from(led_type))
            .copied()
            .ok_or(DeviceInfoError::UnknownLedType { led_type })?;

        Ok(Self {
            width,
            height,
            device_type,
            led_type,
            mcu_version: version_at(payload, 6),
            wifi_version: version_at(payload, 9),
            has_wifi: payload.get(8).is_some_and(|flag| *flag != 0),
            password_flag: payload.get(11).copied().unwrap_or(UNKNOWN_PASSWORD_FLAG),
        })
    }

    /// Returns the panel size as a raster canvas.
    #[must_use]
    pub fn canvas(&self) -> Option<Canvas> {
        Canvas::new(self.width, self.height)
    }
}

fn version_at(payload: &[u8], offset: usize) -> String {
    match (payload.get(offset), payload.get(offset + 1)) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => UNKNOWN_VERSION.to_string(),
    }
}

/// Cached outcome of the first device-info exchange in a session.
#[derive(Debug)]
pub struct ResolvedDeviceInfo {
    info: DeviceInfo,
    fallback_reason: Option<QueryError>,
}

impl ResolvedDeviceInfo {
    pub(crate) fn reported(info: DeviceInfo) -> Self {
        Self {
            info,
            fallback_reason: None,
        }
    }

    pub(crate) fn fallback(reason: QueryError) -> Self {
        Self {
            info: DeviceInfo::fallback(),
            fallback_reason: Some(reason),
        }
    }

    /// Returns the device info, real or fallback.
    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Returns why the fallback profile was used, if it was.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&QueryError> {
        self.fallback_reason.as_ref()
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}
