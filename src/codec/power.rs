use serde::Serialize;

use super::frame_codec::{Opcode, encode_bounded};

/// Screen power state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScreenPower {
    /// Turn the panel off.
    Off,
    /// Turn the panel on.
    On,
}

impl ScreenPower {
    fn as_payload_byte(self) -> u8 {
        match self {
            Self::Off => 0x00,
            Self::On => 0x01,
        }
    }

    /// Encodes the legacy `05 00 07 01 <0|1>` frame.
    ///
    /// ```
    /// use ipixel::ScreenPower;
    ///
    /// assert_eq!(vec![0x05, 0x00, 0x07, 0x01, 0x00], ScreenPower::Off.frame());
    /// ```
    #[must_use]
    pub fn frame(self) -> Vec<u8> {
        encode_bounded(Opcode::POWER, &[self.as_payload_byte()])
    }
}

impl From<bool> for ScreenPower {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}
