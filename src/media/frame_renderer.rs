use thiserror::Error;

use super::font::GlyphFont;
use super::palette::{BACKGROUND_INDEX, FOREGROUND_INDEX};
use super::raster::{Canvas, IndexedFrame};

/// Errors returned by incremental rendering.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum RenderError {
    /// Incremental updates need both strings to have the same character count.
    #[error("cannot update {previous:?} to {next:?} in place: character counts differ")]
    LengthMismatch { previous: String, next: String },
}

/// Ink bounding box of a string drawn at the origin.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TextMetrics {
    /// Ink width in pixels.
    pub width: u32,
    /// Ink height in pixels.
    pub height: u32,
    /// Distance from the drawing origin to the first inked row.
    pub top_offset: i32,
    /// Distance from the drawing origin to the first inked column.
    pub left: i32,
}

/// Drawing origin of the text's first glyph cell.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Origin {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

/// Frame produced by a full redraw, with the origin later updates reuse.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RenderedFrame {
    /// Rendered pixels.
    pub frame: IndexedFrame,
    /// Origin the text was drawn at.
    pub origin: Origin,
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Two-colour text renderer over a [`GlyphFont`].
pub struct FrameRenderer<'f> {
    font: &'f dyn GlyphFont,
}

impl<'f> FrameRenderer<'f> {
    /// Creates a renderer drawing with `font`.
    #[must_use]
    pub fn new(font: &'f dyn GlyphFont) -> Self {
        Self { font }
    }

    /// Measures the ink bounding box of `text` drawn at the origin.
    ///
    /// ```
    /// use ipixel::{BitmapFont, FrameRenderer};
    ///
    /// let font = BitmapFont::default();
    /// let metrics = FrameRenderer::new(&font).measure("   ");
    /// assert_eq!(0, metrics.width);
    /// ```
    #[must_use]
    pub fn measure(&self, text: &str) -> TextMetrics {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        let mut cursor = 0i32;
        for ch in text.chars() {
            for (x, y) in self.font.ink(ch) {
                let x = cursor + to_i32(x);
                let y = to_i32(y);
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((left, top, right, bottom)) => {
                        (left.min(x), top.min(y), right.max(x), bottom.max(y))
                    }
                });
            }
            cursor = cursor.saturating_add(to_i32(self.font.advance(ch)));
        }

        bounds.map_or_else(TextMetrics::default, |(left, top, right, bottom)| TextMetrics {
            width: (right - left + 1).unsigned_abs(),
            height: (bottom - top + 1).unsigned_abs(),
            top_offset: top,
            left,
        })
    }

    /// Clears a frame and draws `text` centered on the ink bounding box.
    #[must_use]
    pub fn render_full(&self, text: &str, canvas: Canvas) -> RenderedFrame {
        let metrics = self.measure(text);
        let origin = Origin {
            x: (i32::from(canvas.width()) - to_i32(metrics.width)).div_euclid(2) - metrics.left,
            y: (i32::from(canvas.height()) - to_i32(metrics.height)).div_euclid(2)
                - metrics.top_offset,
        };

        let mut frame = IndexedFrame::blank(canvas);
        let mut cursor = origin.x;
        for ch in text.chars() {
            self.draw_glyph(&mut frame, ch, cursor, origin.y);
            cursor = cursor.saturating_add(to_i32(self.font.advance(ch)));
        }

        RenderedFrame { frame, origin }
    }

    /// Repaints only the glyph cells whose character changed.
    ///
    /// Each changed cell is erased to the background index before the new
    /// glyph is drawn; all other pixels are copied from `previous`.
    ///
    /// # Errors
    ///
    /// Returns an error when `previous_text` and `next_text` have different
    /// character counts.
    pub fn render_incremental(
        &self,
        previous: &IndexedFrame,
        previous_text: &str,
        next_text: &str,
        origin: Origin,
    ) -> Result<IndexedFrame, RenderError> {
        if previous_text.chars().count() != next_text.chars().count() {
            return Err(RenderError::LengthMismatch {
                previous: previous_text.to_string(),
                next: next_text.to_string(),
            });
        }

        let mut frame = previous.clone();
        let mut cursor = origin.x;
        for (old, new) in previous_text.chars().zip(next_text.chars()) {
            if old != new {
                let cell_width = self.font.advance(old).max(self.font.advance(new));
                frame.fill_rect(
                    cursor,
                    origin.y,
                    cell_width,
                    self.font.line_height(),
                    BACKGROUND_INDEX,
                );
                self.draw_glyph(&mut frame, new, cursor, origin.y);
            }
            cursor = cursor.saturating_add(to_i32(self.font.advance(old)));
        }

        Ok(frame)
    }

    fn draw_glyph(&self, frame: &mut IndexedFrame, ch: char, x: i32, y: i32) {
        for (dx, dy) in self.font.ink(ch) {
            frame.set(x + to_i32(dx), y + to_i32(dy), FOREGROUND_INDEX);
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::media::font::BitmapFont;

    fn canvas(width: u16, height: u16) -> Canvas {
        Canvas::new(width, height).expect("test canvas should be valid")
    }

    /// Fixed 3x5 cells with one inked pixel per digit.
    struct DotFont;

    impl GlyphFont for DotFont {
        fn advance(&self, _ch: char) -> u32 {
            3
        }

        fn line_height(&self) -> u32 {
            5
        }

        fn ink(&self, ch: char) -> Vec<(u32, u32)> {
            ch.to_digit(10).map_or_else(Vec::new, |digit| vec![(digit % 3, 1 + digit % 4)])
        }
    }

    #[test]
    fn measure_reports_ink_box() {
        let renderer = FrameRenderer::new(&DotFont);
        let metrics = renderer.measure("20");
        assert_eq!(
            TextMetrics {
                width: 2,
                height: 3,
                top_offset: 1,
                left: 2,
            },
            metrics
        );
    }

    #[test]
    fn render_full_centers_ink() {
        let font = BitmapFont::default();
        let renderer = FrameRenderer::new(&font);
        let metrics = renderer.measure("8");
        let rendered = renderer.render_full("8", canvas(20, 12));

        let frame = &rendered.frame;
        let mut left = i32::MAX;
        let mut top = i32::MAX;
        for y in 0..12 {
            for x in 0..20 {
                if frame.get(x, y) == Some(FOREGROUND_INDEX) {
                    left = left.min(x);
                    top = top.min(y);
                }
            }
        }
        assert_eq!((20 - i32::try_from(metrics.width).expect("small")).div_euclid(2), left);
        assert_eq!((12 - i32::try_from(metrics.height).expect("small")).div_euclid(2), top);
        assert_eq!(
            font.ink('8').len(),
            frame.count(FOREGROUND_INDEX)
        );
    }

    #[test]
    fn render_full_clips_oversized_text() {
        let font = BitmapFont::new(4);
        let rendered = FrameRenderer::new(&font).render_full("10:00", canvas(8, 8));
        assert_eq!(64, rendered.frame.pixels().len());
    }

    #[test]
    fn incremental_matches_redraw_at_same_origin_and_preserves_other_cells() {
        let font = BitmapFont::new(2);
        let renderer = FrameRenderer::new(&font);
        let size = canvas(96, 24);
        let previous = renderer.render_full("1:00", size);

        let updated = renderer
            .render_incremental(&previous.frame, "1:00", "0:59", previous.origin)
            .expect("equal-length update should succeed");
        let mut expected = IndexedFrame::blank(size);
        let mut cursor = previous.origin.x;
        for ch in "0:59".chars() {
            renderer.draw_glyph(&mut expected, ch, cursor, previous.origin.y);
            cursor += i32::try_from(font.advance(ch)).expect("small");
        }
        assert_eq!(expected, updated);

        let updated_colon = renderer
            .render_incremental(&previous.frame, "1:00", "1:09", previous.origin)
            .expect("equal-length update should succeed");
        let cell = i32::try_from(font.advance('0')).expect("small");
        let last_cell_start = previous.origin.x + 3 * cell;
        for y in 0..24 {
            for x in 0..last_cell_start {
                assert_eq!(previous.frame.get(x, y), updated_colon.get(x, y));
            }
        }
    }

    #[test]
    fn incremental_rejects_length_change() {
        let font = BitmapFont::default();
        let renderer = FrameRenderer::new(&font);
        let previous = renderer.render_full("10m", canvas(32, 16));
        let result = renderer.render_incremental(&previous.frame, "10m", "9:59", previous.origin);
        assert_matches!(result, Err(RenderError::LengthMismatch { .. }));
    }
}
