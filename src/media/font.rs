use font8x8::UnicodeFonts;

const BASE_GLYPH_SIZE: u32 = 8;

/// Glyph rasterization capability used by the frame renderer.
///
/// Ink coordinates are relative to the top-left corner of the glyph cell,
/// which is `advance(ch)` pixels wide and `line_height()` pixels tall.
pub trait GlyphFont {
    /// Horizontal distance from this glyph's cell to the next one.
    fn advance(&self, ch: char) -> u32;

    /// Height of every glyph cell.
    fn line_height(&self) -> u32;

    /// Pixels set for `ch`, relative to its cell origin.
    fn ink(&self, ch: char) -> Vec<(u32, u32)>;
}

/// Monospaced `font8x8` glyphs scaled by an integer factor.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    /// Creates a font with `8 * scale` pixel cells; a scale of zero is raised to one.
    #[must_use]
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
        }
    }

    /// Picks the largest scale that fits `chars` glyphs on the canvas.
    ///
    /// Mirrors the device rule of a glyph height of `height - 4` pixels.
    ///
    /// ```
    /// use ipixel::BitmapFont;
    ///
    /// assert_eq!(1, BitmapFont::fitting(64, 16, 4).scale());
    /// assert_eq!(3, BitmapFont::fitting(128, 32, 4).scale());
    /// ```
    #[must_use]
    pub fn fitting(width: u16, height: u16, chars: usize) -> Self {
        let by_height = u32::from(height).saturating_sub(4) / BASE_GLYPH_SIZE;
        let chars = u32::try_from(chars.max(1)).unwrap_or(u32::MAX);
        let by_width = u32::from(width) / chars.saturating_mul(BASE_GLYPH_SIZE);
        Self::new(by_height.min(by_width))
    }

    /// Returns the integer scale factor.
    #[must_use]
    pub fn scale(self) -> u32 {
        self.scale
    }

    fn glyph(ch: char) -> [u8; 8] {
        font8x8::BASIC_FONTS
            .get(ch)
            .or_else(|| font8x8::BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }
}

impl Default for BitmapFont {
    fn default() -> Self {
        Self::new(1)
    }
}

impl GlyphFont for BitmapFont {
    fn advance(&self, _ch: char) -> u32 {
        BASE_GLYPH_SIZE * self.scale
    }

    fn line_height(&self) -> u32 {
        BASE_GLYPH_SIZE * self.scale
    }

    fn ink(&self, ch: char) -> Vec<(u32, u32)> {
        let mut ink = Vec::new();
        for (row, bits) in (0u32..).zip(Self::glyph(ch)) {
            for column in 0..BASE_GLYPH_SIZE {
                if bits & (1 << column) == 0 {
                    continue;
                }
                for dy in 0..self.scale {
                    for dx in 0..self.scale {
                        ink.push((column * self.scale + dx, row * self.scale + dy));
                    }
                }
            }
        }
        ink
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn space_has_no_ink() {
        assert!(BitmapFont::default().ink(' ').is_empty());
    }

    #[test]
    fn scaling_multiplies_ink_area() {
        let single = BitmapFont::new(1).ink('8').len();
        let triple = BitmapFont::new(3).ink('8').len();
        assert_eq!(single * 9, triple);
    }

    #[test]
    fn ink_stays_inside_cell() {
        let font = BitmapFont::new(2);
        for (x, y) in font.ink('0') {
            assert!(x < font.advance('0'));
            assert!(y < font.line_height());
        }
    }

    #[test]
    fn colon_is_centered_column() {
        let ink = BitmapFont::default().ink(':');
        assert!(!ink.is_empty());
        assert!(ink.iter().all(|(x, _)| (1..7).contains(x)));
    }

    #[rstest]
    #[case(64, 16, 4, 1)]
    #[case(64, 64, 4, 2)]
    #[case(192, 64, 4, 6)]
    #[case(16, 16, 4, 1)]
    fn fitting_respects_both_dimensions(
        #[case] width: u16,
        #[case] height: u16,
        #[case] chars: usize,
        #[case] expected: u32,
    ) {
        assert_eq!(expected, BitmapFont::fitting(width, height, chars).scale());
    }
}
