//! Raster rendering and countdown animation synthesis.

mod countdown;
mod font;
mod frame_renderer;
mod gif_animation;
mod palette;
mod raster;
mod timer_animation;

pub use self::countdown::{
    CountdownParseError, MAX_MINUTE_SECOND_SECONDS, countdown_extents, format_countdown,
    longest_countdown_chars, parse_countdown,
};
pub use self::font::{BitmapFont, GlyphFont};
pub use self::frame_renderer::{FrameRenderer, Origin, RenderError, RenderedFrame, TextMetrics};
pub use self::gif_animation::{GifAnimation, GifAnimationError};
pub use self::palette::{
    BACKGROUND_INDEX, FOREGROUND_INDEX, PALETTE_LEN, Palette, Rgb, RgbParseError,
};
pub use self::raster::{Canvas, IndexedFrame};
pub use self::timer_animation::{
    AnimationFrame, CANVAS_PADDING, FrameKind, HOLD_DURATION_MS, Repeat, STEP_DURATION_MS,
    TimerAnimation, TimerAnimationError, TimerSpec,
};
