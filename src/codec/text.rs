use crc32fast::hash;
use font8x8::UnicodeFonts;

use super::CommandError;
use super::frame_codec::{Opcode, encode_bounded};
use super::upload::{UploadHeader, windows};
use crate::media::Rgb;

const MAX_TEXT_CHARS: usize = 512;
const MAX_ANIMATION: u8 = 7;
const MAX_SPEED: u8 = 100;
const MAX_RAINBOW_MODE: u8 = 9;
const GLYPH_MARKER: u8 = 0x80;
const GLYPH_ROWS: usize = 16;

/// Rendering options for a text upload.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TextOptions {
    colour: Rgb,
    background: Option<Rgb>,
    animation: u8,
    speed: u8,
    rainbow_mode: u8,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            colour: Rgb::new(0xFF, 0xFF, 0xFF),
            background: None,
            animation: 0,
            speed: 80,
            rainbow_mode: 0,
        }
    }
}

fn check_range(field: &'static str, value: u8, max: u8) -> Result<u8, CommandError> {
    if value > max {
        return Err(CommandError::TextOptionOutOfRange { field, value, max });
    }
    Ok(value)
}

impl TextOptions {
    /// Overrides the text colour.
    #[must_use]
    pub fn with_colour(mut self, colour: Rgb) -> Self {
        self.colour = colour;
        self
    }

    /// Paints a solid background behind the text.
    #[must_use]
    pub fn with_background(mut self, background: Rgb) -> Self {
        self.background = Some(background);
        self
    }

    /// Selects the scroll animation (`0..=7`).
    ///
    /// # Errors
    ///
    /// Returns an error when `animation` is out of range.
    pub fn with_animation(mut self, animation: u8) -> Result<Self, CommandError> {
        self.animation = check_range("animation", animation, MAX_ANIMATION)?;
        Ok(self)
    }

    /// Sets the scroll speed (`0..=100`).
    ///
    /// # Errors
    ///
    /// Returns an error when `speed` is out of range.
    pub fn with_speed(mut self, speed: u8) -> Result<Self, CommandError> {
        self.speed = check_range("speed", speed, MAX_SPEED)?;
        Ok(self)
    }

    /// Selects a rainbow colour mode (`0..=9`, `0` disables it).
    ///
    /// # Errors
    ///
    /// Returns an error when `mode` is out of range.
    pub fn with_rainbow_mode(mut self, mode: u8) -> Result<Self, CommandError> {
        self.rainbow_mode = check_range("rainbow mode", mode, MAX_RAINBOW_MODE)?;
        Ok(self)
    }
}

/// Validated text upload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextCommand {
    text: String,
    options: TextOptions,
    save_slot: u8,
}

impl TextCommand {
    /// Creates a text upload command.
    ///
    /// ```
    /// use ipixel::{TextCommand, TextOptions};
    ///
    /// let command = TextCommand::new("Hello", TextOptions::default())?;
    /// assert_eq!(1, command.frames().len());
    /// assert!(TextCommand::new("", TextOptions::default()).is_err());
    /// # Ok::<(), ipixel::CommandError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the text is empty or longer than 512 characters.
    pub fn new(text: impl Into<String>, options: TextOptions) -> Result<Self, CommandError> {
        let text = text.into();
        let count = text.chars().count();
        if count == 0 {
            return Err(CommandError::EmptyText);
        }
        if count > MAX_TEXT_CHARS {
            return Err(CommandError::TooManyCharacters {
                count,
                max: MAX_TEXT_CHARS,
            });
        }

        Ok(Self {
            text,
            options,
            save_slot: 0,
        })
    }

    /// Stores the text in a numbered device slot.
    #[must_use]
    pub fn with_save_slot(mut self, save_slot: u8) -> Self {
        self.save_slot = save_slot;
        self
    }

    /// Returns the text being uploaded.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn body(&self) -> Vec<u8> {
        let options = &self.options;
        let count = u16::try_from(self.text.chars().count()).unwrap_or(u16::MAX);
        let background = options.background.unwrap_or(Rgb::new(0, 0, 0));

        let mut body = Vec::with_capacity(12 + self.text.len() * (GLYPH_ROWS + 1));
        body.extend_from_slice(&count.to_le_bytes());
        body.extend_from_slice(&[
            options.animation,
            options.speed,
            options.rainbow_mode,
            options.colour.r,
            options.colour.g,
            options.colour.b,
            u8::from(options.background.is_some()),
            background.r,
            background.g,
            background.b,
        ]);
        for character in self.text.chars() {
            body.push(GLYPH_MARKER);
            body.extend_from_slice(&glyph_rows(character));
        }
        body
    }

    /// Encodes the upload frames, first window first.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let body = self.body();
        let total_len = u32::try_from(body.len()).unwrap_or(u32::MAX);
        let crc32 = hash(&body);

        windows(&body)
            .map(|(flag, window)| {
                let header = UploadHeader {
                    flag,
                    total_len,
                    crc32,
                    save_slot: self.save_slot,
                };
                let mut payload = Vec::with_capacity(UploadHeader::LEN + window.len());
                payload.extend_from_slice(&header.to_bytes());
                payload.extend_from_slice(window);
                encode_bounded(Opcode::TEXT, &payload)
            })
            .collect()
    }
}

/// Doubles each row of the 8x8 glyph to 8x16, most significant bit leftmost.
fn glyph_rows(character: char) -> [u8; GLYPH_ROWS] {
    let glyph = font8x8::BASIC_FONTS
        .get(character)
        .or_else(|| font8x8::BASIC_FONTS.get('?'))
        .unwrap_or([0; 8]);

    let mut rows = [0u8; GLYPH_ROWS];
    for (index, row) in glyph.iter().enumerate() {
        let row = row.reverse_bits();
        rows[index * 2] = row;
        rows[index * 2 + 1] = row;
    }
    rows
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::FrameCodec;
    use crate::codec::upload::UPLOAD_WINDOW_SIZE;

    #[test]
    fn body_starts_with_metadata() {
        let options = TextOptions::default()
            .with_colour(Rgb::new(1, 2, 3))
            .with_background(Rgb::new(4, 5, 6))
            .with_animation(2)
            .and_then(|options| options.with_speed(40))
            .and_then(|options| options.with_rainbow_mode(9))
            .expect("options in range");
        let command = TextCommand::new("AB", options).expect("text should be valid");
        let body = command.body();

        assert_eq!(&[2, 0, 2, 40, 9, 1, 2, 3, 1, 4, 5, 6], &body[..12]);
        assert_eq!(12 + 2 * (GLYPH_ROWS + 1), body.len());
        assert_eq!(GLYPH_MARKER, body[12]);
    }

    #[test]
    fn glyph_rows_are_doubled() {
        let rows = glyph_rows('A');
        for pair in rows.chunks(2) {
            assert_eq!(pair[0], pair[1]);
        }
        assert!(rows.iter().any(|row| *row != 0));
    }

    #[test]
    fn space_glyph_is_blank() {
        assert_eq!([0u8; GLYPH_ROWS], glyph_rows(' '));
    }

    #[test]
    fn single_frame_carries_header_and_crc() {
        let command = TextCommand::new("Hi", TextOptions::default())
            .expect("text should be valid")
            .with_save_slot(4);
        let body = command.body();
        let frames = command.frames();
        assert_eq!(1, frames.len());

        let frame = FrameCodec::decode(&frames[0]).expect("text frame should decode");
        assert_eq!(Opcode::TEXT, frame.opcode());
        let payload = frame.payload();
        assert_eq!(0x00, payload[0]);
        assert_eq!(
            u32::try_from(body.len()).expect("small body"),
            u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]])
        );
        assert_eq!(
            hash(&body),
            u32::from_le_bytes([payload[5], payload[6], payload[7], payload[8]])
        );
        assert_eq!(4, payload[10]);
        assert_eq!(&body[..], &payload[UploadHeader::LEN..]);
    }

    #[test]
    fn long_text_is_split_into_windows() {
        let text = "x".repeat(MAX_TEXT_CHARS);
        let command = TextCommand::new(text, TextOptions::default()).expect("text at limit");
        let frames = command.frames();
        let body_len = command.body().len();
        assert_eq!(body_len.div_ceil(UPLOAD_WINDOW_SIZE), frames.len());

        let continuation = FrameCodec::decode(&frames[1]).expect("continuation should decode");
        assert_eq!(0x02, continuation.payload()[0]);
    }

    #[test]
    fn rejects_empty_and_oversized_text() {
        assert_matches!(
            TextCommand::new("", TextOptions::default()),
            Err(CommandError::EmptyText)
        );
        assert_matches!(
            TextCommand::new("y".repeat(MAX_TEXT_CHARS + 1), TextOptions::default()),
            Err(CommandError::TooManyCharacters { count: 513, max: 512 })
        );
    }

    #[test]
    fn rejects_out_of_range_options() {
        assert_matches!(
            TextOptions::default().with_animation(8),
            Err(CommandError::TextOptionOutOfRange {
                field: "animation",
                value: 8,
                max: 7,
            })
        );
        assert_matches!(
            TextOptions::default().with_speed(101),
            Err(CommandError::TextOptionOutOfRange { field: "speed", .. })
        );
        assert_matches!(
            TextOptions::default().with_rainbow_mode(10),
            Err(CommandError::TextOptionOutOfRange {
                field: "rainbow mode",
                ..
            })
        );
    }
}
