use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, instrument};

use crate::codec::MediaKind;
use crate::media::{
    BitmapFont, Rgb, TimerAnimation, TimerSpec, longest_countdown_chars, parse_countdown,
};

/// File format written by `render-timer`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum RenderFormat {
    /// Animated countdown.
    #[default]
    Gif,
    /// First frame only.
    Png,
}

impl From<RenderFormat> for MediaKind {
    fn from(format: RenderFormat) -> Self {
        match format {
            RenderFormat::Gif => Self::Gif,
            RenderFormat::Png => Self::Png,
        }
    }
}

/// Arguments for `render-timer`.
#[derive(Debug, Clone, clap::Args)]
pub struct RenderTimerArgs {
    /// Countdown length: `30s`, `5m`, `2:30` or plain seconds.
    #[arg(value_parser = parse_countdown)]
    duration: u32,
    /// File to write.
    #[arg(long, short)]
    out: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = RenderFormat::Gif)]
    format: RenderFormat,
    /// Canvas width; fitted to the text with padding when omitted.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    width: Option<u16>,
    /// Canvas height; fitted to the text with padding when omitted.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    height: Option<u16>,
    /// Digit colour as `RRGGBB`.
    #[arg(long, default_value = "00ff00")]
    colour: Rgb,
    /// Background colour as `RRGGBB`.
    #[arg(long, default_value = "000000")]
    background: Rgb,
    /// Glyph scale; fitted to `--width`/`--height` when both are set, else 1.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    scale: Option<u32>,
    /// Renders the starting time as a single still frame.
    #[arg(long = "static")]
    static_frame: bool,
}

impl RenderTimerArgs {
    /// Creates render arguments writing a GIF with default colours.
    #[must_use]
    pub fn new(duration_seconds: u32, out: impl Into<PathBuf>) -> Self {
        Self {
            duration: duration_seconds,
            out: out.into(),
            format: RenderFormat::Gif,
            width: None,
            height: None,
            colour: Rgb::GREEN,
            background: Rgb::BLACK,
            scale: None,
            static_frame: false,
        }
    }

    /// Fixes the canvas size.
    #[must_use]
    pub fn with_canvas(mut self, width: u16, height: u16) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Switches the output to a PNG of the first frame.
    #[must_use]
    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    fn font(&self) -> BitmapFont {
        match (self.scale, self.width, self.height) {
            (Some(scale), _, _) => BitmapFont::new(scale),
            (None, Some(width), Some(height)) => {
                BitmapFont::fitting(width, height, longest_countdown_chars(self.duration))
            }
            _ => BitmapFont::default(),
        }
    }

    fn spec(&self) -> TimerSpec {
        TimerSpec::builder()
            .duration_seconds(self.duration)
            .foreground(self.colour)
            .background(self.background)
            .font(self.font())
            .maybe_width(self.width)
            .maybe_height(self.height)
            .static_frame(self.static_frame)
            .build()
    }
}

/// What `render-timer` wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RenderReport {
    path: PathBuf,
    format: String,
    width: u16,
    height: u16,
    frames: usize,
    bytes: usize,
}

impl RenderReport {
    pub(crate) fn pretty_line(&self) -> String {
        format!(
            "Rendered {} {}x{} with {} frame(s) to {} ({} bytes)",
            self.format.to_uppercase(),
            self.width,
            self.height,
            self.frames,
            self.path.display(),
            self.bytes
        )
    }
}

/// Renders the countdown and writes it to the requested file.
///
/// # Errors
///
/// Returns an error when the animation cannot be built or the file cannot be written.
#[instrument(skip(args), level = "debug", fields(duration = args.duration, out = %args.out.display()))]
pub(crate) fn render_timer(args: &RenderTimerArgs) -> Result<RenderReport> {
    let animation = TimerAnimation::build(&args.spec())?;
    let bytes = match args.format {
        RenderFormat::Gif => animation.encode_gif()?,
        RenderFormat::Png => animation.encode_png()?,
    };
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let canvas = animation.canvas();
    let frames = match args.format {
        RenderFormat::Gif => animation.frames().len(),
        RenderFormat::Png => 1,
    };
    info!(
        width = canvas.width(),
        height = canvas.height(),
        frames,
        bytes = bytes.len(),
        "countdown rendered"
    );

    Ok(RenderReport {
        path: args.out.clone(),
        format: MediaKind::from(args.format).to_string(),
        width: canvas.width(),
        height: canvas.height(),
        frames,
        bytes: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn explicit_scale_wins_over_canvas_fit() {
        let mut args = RenderTimerArgs::new(90, "timer.gif").with_canvas(128, 32);
        args.scale = Some(2);
        assert_eq!(2, args.font().scale());
    }

    #[test]
    fn fixed_canvas_picks_fitting_font() {
        let args = RenderTimerArgs::new(90, "timer.gif").with_canvas(128, 32);
        assert_eq!(BitmapFont::fitting(128, 32, 4).scale(), args.font().scale());
    }

    #[test]
    fn long_countdown_fits_minute_second_frames() {
        let args = RenderTimerArgs::new(600, "timer.gif").with_canvas(48, 24);
        assert_eq!(1, args.font().scale());
    }

    #[test]
    fn unsized_canvas_uses_unit_font() {
        let args = RenderTimerArgs::new(90, "timer.gif");
        assert_eq!(1, args.font().scale());
    }
}
