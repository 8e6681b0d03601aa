use thiserror::Error;

const HEADER_LEN: usize = 4;
const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - HEADER_LEN;

/// Errors returned by wire-frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The frame has fewer than the mandatory 4 header bytes.
    #[error("frame is too short: expected at least 4 bytes, got {actual}")]
    TooShort { actual: usize },
    /// The declared frame length does not match the provided byte slice length.
    #[error("frame length mismatch: declared {declared} bytes but frame has {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },
    /// The payload is too large to fit in the 16-bit length field.
    #[error("frame payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    PayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
}

/// 16-bit command selector carried in bytes `2..4` of every frame.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Display, derive_more::From, derive_more::Into,
)]
#[display("{_0:#06x}")]
pub struct Opcode(u16);

impl Opcode {
    /// Text upload window.
    pub const TEXT: Self = Self(0x0000);
    /// Still image upload window.
    pub const IMAGE: Self = Self(0x0002);
    /// GIF animation upload window.
    pub const GIF: Self = Self(0x0003);
    /// Legacy clock-mode command.
    pub const CLOCK_MODE: Self = Self(0x0106);
    /// Legacy screen power command.
    pub const POWER: Self = Self(0x0107);
    /// Wall-clock synchronisation; also answered with a device-info reply.
    pub const TIME_SYNC: Self = Self(0x8001);
    /// Brightness level.
    pub const BRIGHTNESS: Self = Self(0x8004);

    /// Returns the raw opcode value.
    ///
    /// ```
    /// use ipixel::Opcode;
    ///
    /// assert_eq!(0x8004, Opcode::BRIGHTNESS.value());
    /// ```
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns whether this opcode belongs to the legacy fixed-shape family.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.0 & 0xFF00 == 0x0100
    }
}

/// Decoded length/opcode/payload frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WireFrame<'a> {
    opcode: Opcode,
    payload: &'a [u8],
}

impl WireFrame<'_> {
    /// Returns the decoded opcode.
    ///
    /// ```
    /// use ipixel::{FrameCodec, Opcode};
    ///
    /// let frame = FrameCodec::decode(&[0x05, 0x00, 0x07, 0x01, 0x01])?;
    /// assert_eq!(Opcode::POWER, frame.opcode());
    /// # Ok::<(), ipixel::FrameCodecError>(())
    /// ```
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the decoded payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.payload
    }
}

/// Encoder and decoder for iPIXEL wire frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes `len16_le || opcode16_le || payload`.
    ///
    /// ```
    /// use ipixel::{FrameCodec, Opcode};
    ///
    /// let frame = FrameCodec::encode(Opcode::BRIGHTNESS, &[0x32])?;
    /// assert_eq!(vec![0x05, 0x00, 0x04, 0x80, 0x32], frame);
    /// # Ok::<(), ipixel::FrameCodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be described by a 16-bit length.
    pub fn encode(opcode: Opcode, payload: &[u8]) -> Result<Vec<u8>, FrameCodecError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameCodecError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            });
        }

        let total_len = u16::try_from(payload.len() + HEADER_LEN).map_err(|_overflow| {
            FrameCodecError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            }
        })?;

        let mut frame = Vec::with_capacity(payload.len() + HEADER_LEN);
        frame.extend_from_slice(&total_len.to_le_bytes());
        frame.extend_from_slice(&opcode.value().to_le_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Decodes one complete frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the header is truncated or the declared length
    /// disagrees with the slice length.
    pub fn decode(frame: &[u8]) -> Result<WireFrame<'_>, FrameCodecError> {
        if frame.len() < HEADER_LEN {
            return Err(FrameCodecError::TooShort {
                actual: frame.len(),
            });
        }

        let declared = usize::from(u16::from_le_bytes([frame[0], frame[1]]));
        if declared != frame.len() {
            return Err(FrameCodecError::LengthMismatch {
                declared,
                actual: frame.len(),
            });
        }

        Ok(WireFrame {
            opcode: Opcode(u16::from_le_bytes([frame[2], frame[3]])),
            payload: &frame[HEADER_LEN..],
        })
    }
}

/// Encodes a payload whose size is bounded by construction.
pub(crate) fn encode_bounded(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
    let total_len = u16::try_from(payload.len() + HEADER_LEN).unwrap_or(u16::MAX);

    let mut frame = Vec::with_capacity(payload.len() + HEADER_LEN);
    frame.extend_from_slice(&total_len.to_le_bytes());
    frame.extend_from_slice(&opcode.value().to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn encode_writes_length_and_opcode_little_endian() {
        let frame = FrameCodec::encode(Opcode::TIME_SYNC, &[0x0C, 0x1E, 0x2D, 0x00])
            .expect("small payload should encode");
        assert_eq!(vec![0x08, 0x00, 0x01, 0x80, 0x0C, 0x1E, 0x2D, 0x00], frame);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let result = FrameCodec::encode(Opcode::GIF, &payload);
        assert_matches!(
            result,
            Err(FrameCodecError::PayloadTooLarge {
                payload_len,
                max_payload_len: MAX_PAYLOAD_LEN,
            }) if payload_len == MAX_PAYLOAD_LEN + 1
        );
    }

    #[test]
    fn decode_rejects_short_input() {
        let result = FrameCodec::decode(&[0x05, 0x00, 0x07]);
        assert_matches!(result, Err(FrameCodecError::TooShort { actual: 3 }));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let result = FrameCodec::decode(&[0x06, 0x00, 0x07, 0x01, 0x01]);
        assert_matches!(
            result,
            Err(FrameCodecError::LengthMismatch {
                declared: 6,
                actual: 5,
            })
        );
    }

    #[test]
    fn decode_returns_fields() {
        let frame = FrameCodec::decode(&[0x05, 0x00, 0x04, 0x80, 0x40])
            .expect("well-formed frame should decode");
        assert_eq!(Opcode::BRIGHTNESS, frame.opcode());
        assert_eq!(&[0x40], frame.payload());
    }

    #[rstest]
    #[case(Opcode::POWER, true)]
    #[case(Opcode::CLOCK_MODE, true)]
    #[case(Opcode::BRIGHTNESS, false)]
    #[case(Opcode::GIF, false)]
    fn legacy_family_is_detected_from_high_byte(#[case] opcode: Opcode, #[case] expected: bool) {
        assert_eq!(expected, opcode.is_legacy());
    }

    #[test]
    fn opcode_displays_as_hex() {
        insta::assert_snapshot!(Opcode::BRIGHTNESS.to_string(), @"0x8004");
    }
}
