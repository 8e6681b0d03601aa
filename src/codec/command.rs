use thiserror::Error;

use super::frame_codec::Opcode;
use super::{Brightness, ClockMode, ImageChunk, ScreenPower, TextCommand, TimeSync};

/// Errors raised while constructing commands, before any bytes exist.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CommandError {
    /// The brightness level was outside the accepted range.
    #[error("brightness {value} is out of range ({min}..={max})")]
    BrightnessOutOfRange { value: u8, min: u8, max: u8 },
    /// The clock style was outside the accepted range.
    #[error("clock style {value} is out of range (0..={max})")]
    ClockStyleOutOfRange { value: u8, max: u8 },
    /// The clock date did not parse as `DD/MM/YYYY`.
    #[error("clock date {value:?} is not a valid DD/MM/YYYY date")]
    InvalidClockDate { value: String },
    /// A text command was requested with no characters.
    #[error("text command cannot be empty")]
    EmptyText,
    /// A text command exceeded the on-device character limit.
    #[error("text command has {count} characters but the maximum is {max}")]
    TooManyCharacters { count: usize, max: usize },
    /// A text option byte was outside its accepted range.
    #[error("text {field} {value} is out of range (0..={max})")]
    TextOptionOutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },
    /// An image upload was requested with no bytes.
    #[error("image upload cannot be empty")]
    EmptyImage,
    /// An image upload was too large to describe with a 32-bit length.
    #[error("image upload of {len} bytes is too large")]
    ImageTooLarge { len: usize },
}

/// Closed set of commands understood by the display.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    /// Legacy screen power command.
    Power(ScreenPower),
    /// Brightness level.
    Brightness(Brightness),
    /// Clock face selection.
    ClockMode(ClockMode),
    /// Wall-clock synchronisation.
    TimeSync(TimeSync),
    /// Scrolling text upload.
    Text(TextCommand),
    /// One upload window of an image or GIF.
    ImageChunk(ImageChunk),
    /// Device-info request, answered on the notify characteristic.
    DeviceInfoQuery(TimeSync),
}

impl Command {
    /// Creates a validated brightness command.
    ///
    /// ```
    /// use ipixel::Command;
    ///
    /// let command = Command::brightness(50)?;
    /// assert_eq!(vec![0x05, 0x00, 0x04, 0x80, 0x32], command.encode());
    /// # Ok::<(), ipixel::CommandError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `level` is outside `1..=100`.
    pub fn brightness(level: u8) -> Result<Self, CommandError> {
        Ok(Self::Brightness(Brightness::new(level)?))
    }

    /// Creates a power command.
    #[must_use]
    pub fn power(on: bool) -> Self {
        Self::Power(ScreenPower::from(on))
    }

    /// Returns the opcode carried by every frame of this command.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Power(_) => Opcode::POWER,
            Self::Brightness(_) => Opcode::BRIGHTNESS,
            Self::ClockMode(_) => Opcode::CLOCK_MODE,
            Self::TimeSync(_) | Self::DeviceInfoQuery(_) => Opcode::TIME_SYNC,
            Self::Text(_) => Opcode::TEXT,
            Self::ImageChunk(chunk) => chunk.kind().opcode(),
        }
    }

    /// Encodes the command into one or more wire frames, in send order.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        match self {
            Self::Power(power) => vec![power.frame()],
            Self::Brightness(brightness) => vec![brightness.frame()],
            Self::ClockMode(clock) => vec![clock.frame()],
            Self::TimeSync(sync) | Self::DeviceInfoQuery(sync) => vec![sync.frame()],
            Self::Text(text) => text.frames(),
            Self::ImageChunk(chunk) => vec![chunk.frame()],
        }
    }

    /// Encodes the command as one contiguous byte stream.
    ///
    /// Each frame carries its own length prefix, so multi-frame commands are
    /// the concatenation of [`Command::frames`].
    ///
    /// ```
    /// use ipixel::Command;
    ///
    /// assert_eq!(vec![0x05, 0x00, 0x07, 0x01, 0x01], Command::power(true).encode());
    /// ```
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.frames().concat()
    }
}

impl From<ScreenPower> for Command {
    fn from(value: ScreenPower) -> Self {
        Self::Power(value)
    }
}

impl From<Brightness> for Command {
    fn from(value: Brightness) -> Self {
        Self::Brightness(value)
    }
}

impl From<ClockMode> for Command {
    fn from(value: ClockMode) -> Self {
        Self::ClockMode(value)
    }
}

impl From<TextCommand> for Command {
    fn from(value: TextCommand) -> Self {
        Self::Text(value)
    }
}

impl From<ImageChunk> for Command {
    fn from(value: ImageChunk) -> Self {
        Self::ImageChunk(value)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use time::macros::date;

    use super::*;
    use crate::codec::{ClockStyle, FrameCodec, MediaKind, TextOptions};
    use crate::media::Rgb;

    fn every_kind() -> Vec<Command> {
        let sync = TimeSync::new(13, 37, 5).expect("test time should be valid");
        let text = TextCommand::new(
            "Hi",
            TextOptions::default().with_colour(Rgb::new(255, 0, 0)),
        )
        .expect("test text should be valid");
        let chunks = ImageChunk::split(MediaKind::Gif, &[0x47, 0x49, 0x46], 0)
            .expect("small image should split");

        vec![
            Command::power(true),
            Command::power(false),
            Command::brightness(1).expect("minimum brightness should be valid"),
            Command::brightness(100).expect("maximum brightness should be valid"),
            Command::ClockMode(
                ClockMode::builder()
                    .style(ClockStyle::new(3).expect("style 3 should be valid"))
                    .date(date!(2026 - 10 - 19))
                    .build(),
            ),
            Command::TimeSync(sync),
            Command::Text(text),
            Command::ImageChunk(chunks[0].clone()),
            Command::DeviceInfoQuery(sync),
        ]
    }

    #[test]
    fn brightness_frames_carry_length_opcode_and_level() {
        for level in 1..=100 {
            let bytes = Command::brightness(level)
                .expect("level in range should construct")
                .encode();
            assert_eq!(5, u16::from_le_bytes([bytes[0], bytes[1]]));
            assert_eq!(0x8004, u16::from_le_bytes([bytes[2], bytes[3]]));
            assert_eq!(level, bytes[4]);
            assert_eq!(5, bytes.len());
        }
    }

    #[test]
    fn brightness_outside_range_produces_no_command() {
        assert_matches!(
            Command::brightness(0),
            Err(CommandError::BrightnessOutOfRange { value: 0, .. })
        );
        assert_matches!(
            Command::brightness(101),
            Err(CommandError::BrightnessOutOfRange { value: 101, .. })
        );
    }

    #[test]
    fn power_matches_legacy_literal() {
        assert_eq!(vec![5, 0, 7, 1, 1], Command::power(true).encode());
        assert_eq!(vec![5, 0, 7, 1, 0], Command::power(false).encode());
    }

    #[test]
    fn decoding_every_frame_recovers_opcode_and_payload() {
        for command in every_kind() {
            for frame in command.frames() {
                let decoded = FrameCodec::decode(&frame).expect("encoded frame should decode");
                assert_eq!(command.opcode(), decoded.opcode(), "{command:?}");
                assert_eq!(&frame[4..], decoded.payload());
                let rebuilt = FrameCodec::encode(decoded.opcode(), decoded.payload())
                    .expect("decoded payload should re-encode");
                assert_eq!(frame, rebuilt);
            }
        }
    }

    #[test]
    fn device_info_query_reuses_time_sync_frame() {
        let sync = TimeSync::new(8, 0, 0).expect("test time should be valid");
        assert_eq!(
            Command::TimeSync(sync).encode(),
            Command::DeviceInfoQuery(sync).encode()
        );
    }
}
