use bon::Builder;
use thiserror::Error;

use super::countdown::{countdown_extents, format_countdown};
use super::font::{BitmapFont, GlyphFont};
use super::frame_renderer::{FrameRenderer, RenderError};
use super::gif_animation::{GifAnimationError, GifFrame, encode_gif, encode_png};
use super::palette::{Palette, Rgb};
use super::raster::{Canvas, IndexedFrame};

/// Margin added on every side when the canvas is sized from the text.
pub const CANVAS_PADDING: u32 = 20;
/// Display time of every countdown frame except the last.
pub const STEP_DURATION_MS: u16 = 1000;
/// Display time of the terminal frame; the longest a GIF delay can express.
pub const HOLD_DURATION_MS: u16 = u16::MAX;

/// Errors returned while building a timer animation.
#[derive(Debug, Error)]
pub enum TimerAnimationError {
    /// A requested canvas side was zero.
    #[error("timer canvas {width}x{height} must have non-zero sides")]
    InvalidCanvas { width: u32, height: u32 },
    /// Incremental rendering was asked to change the text length.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Serializing the animation failed.
    #[error(transparent)]
    Encoding(#[from] GifAnimationError),
}

/// Countdown request.
///
/// ```
/// use ipixel::{Rgb, TimerSpec};
///
/// let spec = TimerSpec::builder()
///     .duration_seconds(90)
///     .foreground(Rgb::new(255, 0, 0))
///     .width(64)
///     .height(16)
///     .build();
/// assert_eq!(90, spec.duration_seconds());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TimerSpec {
    duration_seconds: u32,
    #[builder(default = Rgb::GREEN)]
    foreground: Rgb,
    #[builder(default = Rgb::BLACK)]
    background: Rgb,
    font: Option<BitmapFont>,
    width: Option<u16>,
    height: Option<u16>,
    #[builder(default)]
    static_frame: bool,
}

impl TimerSpec {
    /// Seconds the countdown starts from.
    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    /// Palette used by every frame but the terminal one.
    #[must_use]
    pub fn palette(&self) -> Palette {
        Palette::new(self.background, self.foreground)
    }

    /// Returns whether a single still frame is requested.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.static_frame
    }
}

/// How a frame's pixels were produced.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrameKind {
    /// The canvas was cleared and the whole text drawn.
    Full,
    /// Only changed glyph cells of the previous frame were repainted.
    Incremental,
}

/// Repeat directive attached to an animated countdown.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Repeat {
    /// Play through once and hold the last frame.
    Once,
}

/// One countdown frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AnimationFrame {
    text: String,
    pixels: IndexedFrame,
    palette: Palette,
    duration_ms: u16,
    kind: FrameKind,
}

impl AnimationFrame {
    /// Countdown text shown by this frame.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Indexed pixels.
    #[must_use]
    pub fn pixels(&self) -> &IndexedFrame {
        &self.pixels
    }

    /// Palette the pixels are shown with.
    #[must_use]
    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Display time in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    /// Whether the frame was fully redrawn.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }
}

/// Ordered countdown frames plus repeat metadata.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TimerAnimation {
    canvas: Canvas,
    palette: Palette,
    frames: Vec<AnimationFrame>,
    repeat: Option<Repeat>,
}

fn canvas_side(requested: Option<u16>, measured: u32) -> u32 {
    requested.map_or_else(
        || measured.saturating_add(2 * CANVAS_PADDING),
        u32::from,
    )
}

impl TimerAnimation {
    /// Builds the countdown with the spec's font, or a 1x bitmap font.
    ///
    /// ```
    /// use ipixel::{TimerAnimation, TimerSpec};
    ///
    /// let animation = TimerAnimation::build(&TimerSpec::builder().duration_seconds(3).build())?;
    /// assert_eq!(4, animation.frames().len());
    /// # Ok::<(), ipixel::TimerAnimationError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when a requested canvas side is zero.
    pub fn build(spec: &TimerSpec) -> Result<Self, TimerAnimationError> {
        let font = spec.font.unwrap_or_default();
        Self::build_with_font(spec, &font)
    }

    /// Builds the countdown with an arbitrary glyph font.
    ///
    /// # Errors
    ///
    /// Returns an error when a requested canvas side is zero.
    pub fn build_with_font(
        spec: &TimerSpec,
        font: &dyn GlyphFont,
    ) -> Result<Self, TimerAnimationError> {
        let renderer = FrameRenderer::new(font);
        let (ink_width, ink_height) = countdown_extents(spec.duration_seconds)
            .iter()
            .map(|text| renderer.measure(text))
            .fold((0, 0), |(width, height), metrics| {
                (width.max(metrics.width), height.max(metrics.height))
            });
        let width = canvas_side(spec.width, ink_width);
        let height = canvas_side(spec.height, ink_height);
        let canvas = u16::try_from(width)
            .ok()
            .zip(u16::try_from(height).ok())
            .and_then(|(width, height)| Canvas::new(width, height))
            .ok_or(TimerAnimationError::InvalidCanvas { width, height })?;

        let palette = spec.palette();
        if spec.static_frame {
            let text = format_countdown(spec.duration_seconds);
            let rendered = renderer.render_full(&text, canvas);
            return Ok(Self {
                canvas,
                palette,
                frames: vec![AnimationFrame {
                    text,
                    pixels: rendered.frame,
                    palette,
                    duration_ms: 0,
                    kind: FrameKind::Full,
                }],
                repeat: None,
            });
        }

        let capacity = usize::try_from(spec.duration_seconds).map_or(0, |d| d.saturating_add(1));
        let mut frames: Vec<AnimationFrame> = Vec::with_capacity(capacity);
        let mut origin = Default::default();
        for remaining in (0..=spec.duration_seconds).rev() {
            let text = format_countdown(remaining);
            let (pixels, kind) = match frames.last() {
                Some(previous) if previous.text.chars().count() == text.chars().count() => (
                    renderer.render_incremental(&previous.pixels, &previous.text, &text, origin)?,
                    FrameKind::Incremental,
                ),
                _ => {
                    let rendered = renderer.render_full(&text, canvas);
                    origin = rendered.origin;
                    (rendered.frame, FrameKind::Full)
                }
            };

            let terminal = remaining == 0;
            frames.push(AnimationFrame {
                text,
                pixels,
                palette: if terminal { palette.inverted() } else { palette },
                duration_ms: if terminal {
                    HOLD_DURATION_MS
                } else {
                    STEP_DURATION_MS
                },
                kind,
            });
        }

        Ok(Self {
            canvas,
            palette,
            frames,
            repeat: Some(Repeat::Once),
        })
    }

    /// Frame size.
    #[must_use]
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frames in display order.
    #[must_use]
    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    /// Repeat directive; `None` for a static frame.
    #[must_use]
    pub fn repeat(&self) -> Option<Repeat> {
        self.repeat
    }

    /// Serializes the frames as a GIF with per-frame palettes.
    ///
    /// # Errors
    ///
    /// Returns an error when the GIF encoder fails.
    pub fn encode_gif(&self) -> Result<Vec<u8>, TimerAnimationError> {
        let frames: Vec<GifFrame<'_>> = self
            .frames
            .iter()
            .map(|frame| GifFrame {
                pixels: &frame.pixels,
                palette: frame.palette,
                duration_ms: frame.duration_ms,
            })
            .collect();
        Ok(encode_gif(
            self.canvas,
            self.palette,
            &frames,
            self.repeat == Some(Repeat::Once),
        )?)
    }

    /// Serializes the first frame as an RGB PNG.
    ///
    /// # Errors
    ///
    /// Returns an error when the animation is empty or the PNG encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, TimerAnimationError> {
        let first = self.frames.first().ok_or(GifAnimationError::NoFrames)?;
        Ok(encode_png(&first.pixels, first.palette)?)
    }
}
