use std::fmt::{self, Formatter};

use super::palette::BACKGROUND_INDEX;

/// Canvas size in pixels; both sides are non-zero.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Canvas {
    width: u16,
    height: u16,
}

impl Canvas {
    /// Creates a canvas when both values are non-zero.
    ///
    /// ```
    /// use ipixel::Canvas;
    ///
    /// let canvas = Canvas::new(64, 16).expect("64x16 should be valid");
    /// assert_eq!("64x16", canvas.to_string());
    /// assert!(Canvas::new(0, 16).is_none());
    /// ```
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self { width, height })
    }

    /// Canvas width in pixels.
    #[must_use]
    pub const fn width(self) -> u16 {
        self.width
    }

    /// Canvas height in pixels.
    #[must_use]
    pub const fn height(self) -> u16 {
        self.height
    }

    fn pixel_count(self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row-major raster of palette indices.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IndexedFrame {
    canvas: Canvas,
    pixels: Vec<u8>,
}

impl IndexedFrame {
    /// Creates a frame cleared to the background index.
    #[must_use]
    pub fn blank(canvas: Canvas) -> Self {
        Self {
            canvas,
            pixels: vec![BACKGROUND_INDEX; canvas.pixel_count()],
        }
    }

    /// Returns the frame size.
    #[must_use]
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Returns the row-major pixel indices.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let width = usize::from(self.canvas.width);
        (x < width && y < usize::from(self.canvas.height)).then_some(y * width + x)
    }

    /// Returns the index at `(x, y)`, or `None` outside the canvas.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        self.offset(x, y).map(|offset| self.pixels[offset])
    }

    /// Paints one pixel; coordinates outside the canvas are ignored.
    pub fn set(&mut self, x: i32, y: i32, index: u8) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset] = index;
        }
    }

    /// Fills a rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, index: u8) {
        let right = x.saturating_add(i32::try_from(width).unwrap_or(i32::MAX));
        let bottom = y.saturating_add(i32::try_from(height).unwrap_or(i32::MAX));
        let x_start = x.max(0);
        let y_start = y.max(0);
        let x_end = right.min(i32::from(self.canvas.width));
        let y_end = bottom.min(i32::from(self.canvas.height));

        for row in y_start..y_end {
            for column in x_start..x_end {
                self.set(column, row, index);
            }
        }
    }

    /// Counts pixels carrying `index`.
    #[must_use]
    pub fn count(&self, index: u8) -> usize {
        self.pixels.iter().filter(|pixel| **pixel == index).count()
    }
}
