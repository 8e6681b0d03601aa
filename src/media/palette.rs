use std::fmt::{self, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// Number of entries in an indexed palette.
pub const PALETTE_LEN: usize = 256;

/// Pixel index painted with the background colour.
pub const BACKGROUND_INDEX: u8 = 0;
/// Pixel index painted with the foreground colour.
pub const FOREGROUND_INDEX: u8 = 1;

/// Error returned when parsing a hex colour.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("invalid colour {value:?}: expected six hex digits such as 00ff00")]
pub struct RgbParseError {
    value: String,
}

/// RGB colour value.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);
    /// Pure green, the default countdown foreground.
    pub const GREEN: Self = Self::new(0x00, 0xFF, 0x00);

    /// Creates an RGB colour.
    ///
    /// ```
    /// use ipixel::Rgb;
    ///
    /// let colour = Rgb::new(255, 127, 0);
    /// assert_eq!(255, colour.r);
    /// ```
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = RgbParseError;

    /// Parses `rrggbb`, with or without a leading `#`.
    ///
    /// ```
    /// use ipixel::Rgb;
    ///
    /// assert_eq!(Rgb::new(0x12, 0xAB, 0xFF), "#12abff".parse()?);
    /// # Ok::<(), ipixel::RgbParseError>(())
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value.trim().trim_start_matches('#');
        let error = || RgbParseError {
            value: value.to_string(),
        };
        let bytes = hex::decode(digits).map_err(|_decode| error())?;
        match bytes.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(error()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Two-colour indexed palette padded to 256 entries.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Palette {
    background: Rgb,
    foreground: Rgb,
}

impl Palette {
    /// Creates a palette with `background` at index 0 and `foreground` at index 1.
    #[must_use]
    pub const fn new(background: Rgb, foreground: Rgb) -> Self {
        Self {
            background,
            foreground,
        }
    }

    /// Returns the palette with indices 0 and 1 swapped.
    ///
    /// ```
    /// use ipixel::{Palette, Rgb};
    ///
    /// let palette = Palette::new(Rgb::BLACK, Rgb::GREEN);
    /// assert_eq!(Rgb::GREEN, palette.inverted().background());
    /// ```
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self {
            background: self.foreground,
            foreground: self.background,
        }
    }

    /// Colour at index 0.
    #[must_use]
    pub const fn background(self) -> Rgb {
        self.background
    }

    /// Colour at index 1.
    #[must_use]
    pub const fn foreground(self) -> Rgb {
        self.foreground
    }

    /// Returns the colour for a pixel index; unused entries are black.
    #[must_use]
    pub fn colour(self, index: u8) -> Rgb {
        match index {
            BACKGROUND_INDEX => self.background,
            FOREGROUND_INDEX => self.foreground,
            _ => Rgb::BLACK,
        }
    }

    /// Flattens the palette into `256 * 3` RGB bytes.
    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        let mut bytes = vec![0u8; PALETTE_LEN * 3];
        bytes[..3].copy_from_slice(&[self.background.r, self.background.g, self.background.b]);
        bytes[3..6].copy_from_slice(&[self.foreground.r, self.foreground.g, self.foreground.b]);
        bytes
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(Rgb::BLACK, Rgb::GREEN)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn to_bytes_pads_with_black() {
        let bytes = Palette::new(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)).to_bytes();
        assert_eq!(PALETTE_LEN * 3, bytes.len());
        assert_eq!(&[1, 2, 3, 4, 5, 6], &bytes[..6]);
        assert!(bytes[6..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn inverted_swaps_first_two_entries_only() {
        let palette = Palette::default();
        let inverted = palette.inverted();
        assert_eq!(palette.foreground(), inverted.background());
        assert_eq!(palette.background(), inverted.foreground());
        assert_eq!(palette, inverted.inverted());
        assert_eq!(Rgb::BLACK, inverted.colour(7));
    }

    #[rstest]
    #[case("00ff00", Rgb::GREEN)]
    #[case("#FFFFFF", Rgb::new(255, 255, 255))]
    #[case(" 102030 ", Rgb::new(0x10, 0x20, 0x30))]
    fn parses_hex_colours(#[case] input: &str, #[case] expected: Rgb) {
        assert_eq!(expected, input.parse::<Rgb>().expect("colour should parse"));
    }

    #[rstest]
    #[case("fff")]
    #[case("gg0000")]
    #[case("00112233")]
    fn rejects_malformed_colours(#[case] input: &str) {
        assert_matches!(input.parse::<Rgb>(), Err(RgbParseError { .. }));
    }

    #[test]
    fn display_is_lower_hex() {
        insta::assert_snapshot!(Rgb::new(0xAB, 0x01, 0xFF).to_string(), @"ab01ff");
    }
}
