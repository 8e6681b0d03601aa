use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use super::command::{Command, OutputFormat};
use super::render;
use crate::codec::{Brightness, ClockMode, ClockStyle, ScreenPower, TextCommand, TextOptions};
use crate::error::CliConfigError;
use crate::handlers::{
    BrightnessHandler, ClockHandler, ImageUploadHandler, PowerHandler, TextHandler,
    TimeSyncHandler, TimerHandler, TimerRequest,
};
use crate::hw::{DeviceInfo, DeviceSession};
use crate::media::{GifAnimation, Rgb, format_countdown, parse_countdown};

/// Requested panel power state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

impl From<PowerState> for ScreenPower {
    fn from(state: PowerState) -> Self {
        match state {
            PowerState::On => Self::On,
            PowerState::Off => Self::Off,
        }
    }
}

/// Arguments for `power`.
#[derive(Debug, Clone, clap::Args)]
pub struct PowerArgs {
    #[arg(value_enum)]
    state: PowerState,
}

impl PowerArgs {
    /// Creates power arguments without CLI parsing.
    #[must_use]
    pub fn new(state: PowerState) -> Self {
        Self { state }
    }
}

/// Arguments for `brightness`.
#[derive(Debug, Clone, clap::Args)]
pub struct BrightnessArgs {
    /// Brightness percentage, 1 to 100.
    #[arg(value_parser = clap::value_parser!(u8).range(1..=100))]
    level: u8,
}

impl BrightnessArgs {
    /// Creates brightness arguments without CLI parsing.
    ///
    /// ```
    /// use ipixel::BrightnessArgs;
    ///
    /// let args = BrightnessArgs::new(40);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self { level }
    }
}

/// Arguments for `clock`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ClockArgs {
    /// Clock face style, 0 to 8.
    #[arg(long, default_value_t = 1)]
    style: u8,
    /// Date shown on the clock face as `DD/MM/YYYY`; today when omitted.
    #[arg(long)]
    date: Option<String>,
    /// Hides the date on the clock face.
    #[arg(long)]
    hide_date: bool,
    /// Uses a 12-hour clock.
    #[arg(long)]
    twelve_hour: bool,
}

impl ClockArgs {
    /// Creates clock arguments for a style, with the date shown in 24-hour mode.
    #[must_use]
    pub fn new(style: u8) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    fn clock_mode(&self, date: Date) -> Result<ClockMode> {
        Ok(ClockMode::builder()
            .style(ClockStyle::new(self.style)?)
            .date(date)
            .show_date(!self.hide_date)
            .use_24h(!self.twelve_hour)
            .build())
    }
}

/// Arguments for `sync-time`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SyncTimeArgs {
    /// Unix timestamp to send instead of the current time.
    #[arg(long)]
    unix: Option<i64>,
}

impl SyncTimeArgs {
    /// Creates arguments that send an explicit Unix timestamp.
    #[must_use]
    pub fn at_unix(unix: i64) -> Self {
        Self { unix: Some(unix) }
    }

    fn timestamp(&self) -> Result<OffsetDateTime> {
        match self.unix {
            Some(unix) => OffsetDateTime::from_unix_timestamp(unix)
                .with_context(|| format!("timestamp {unix} is out of range")),
            None => Ok(OffsetDateTime::now_utc()),
        }
    }
}

/// Arguments for `text`.
#[derive(Debug, Clone, clap::Args)]
pub struct TextArgs {
    /// Text to display.
    text: String,
    /// Text colour as `RRGGBB`.
    #[arg(long, default_value = "ffffff")]
    colour: Rgb,
    /// Solid background colour as `RRGGBB`.
    #[arg(long)]
    background: Option<Rgb>,
    /// Scroll animation, 0 to 7.
    #[arg(long, default_value_t = 0)]
    animation: u8,
    /// Scroll speed, 0 to 100.
    #[arg(long, default_value_t = 80)]
    speed: u8,
    /// Rainbow mode, 0 to 9.
    #[arg(long, default_value_t = 0)]
    rainbow: u8,
}

impl TextArgs {
    /// Creates text arguments with default styling.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colour: Rgb::new(0xFF, 0xFF, 0xFF),
            background: None,
            animation: 0,
            speed: 80,
            rainbow: 0,
        }
    }

    fn text_command(&self) -> Result<TextCommand> {
        let mut options = TextOptions::default()
            .with_colour(self.colour)
            .with_animation(self.animation)?
            .with_speed(self.speed)?
            .with_rainbow_mode(self.rainbow)?;
        if let Some(background) = self.background {
            options = options.with_background(background);
        }
        Ok(TextCommand::new(self.text.clone(), options)?)
    }
}

/// Arguments for `gif`.
#[derive(Debug, Clone, clap::Args)]
pub struct GifArgs {
    /// GIF file to upload.
    path: PathBuf,
}

impl GifArgs {
    /// Creates GIF upload arguments without CLI parsing.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Arguments for `timer`.
#[derive(Debug, Clone, clap::Args)]
pub struct TimerArgs {
    /// Countdown length: `30s`, `5m`, `2:30` or plain seconds.
    #[arg(value_parser = parse_countdown)]
    duration: u32,
    /// Digit colour as `RRGGBB`.
    #[arg(long, default_value = "00ff00")]
    colour: Rgb,
    /// Background colour as `RRGGBB`.
    #[arg(long, default_value = "000000")]
    background: Rgb,
    /// Glyph scale; picked from the panel size when omitted.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    scale: Option<u32>,
    /// Shows the starting time as a still frame.
    #[arg(long = "static")]
    static_frame: bool,
}

impl TimerArgs {
    /// Creates timer arguments with default colours.
    #[must_use]
    pub fn new(duration_seconds: u32) -> Self {
        Self {
            duration: duration_seconds,
            colour: Rgb::GREEN,
            background: Rgb::BLACK,
            scale: None,
            static_frame: false,
        }
    }

    fn request(&self) -> TimerRequest {
        TimerRequest::builder()
            .duration_seconds(self.duration)
            .foreground(self.colour)
            .background(self.background)
            .maybe_scale(self.scale)
            .static_frame(self.static_frame)
            .build()
    }
}

/// Device info plus the reason the fallback was used, if any.
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    #[serde(flatten)]
    info: DeviceInfo,
    fallback_reason: Option<String>,
}

/// Command result emitted in JSON mode.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlResult {
    Power {
        state: ScreenPower,
    },
    Brightness {
        level: u8,
    },
    Clock {
        style: u8,
        date: String,
        show_date: bool,
        use_24h: bool,
    },
    SyncTime {
        unix_timestamp: i64,
    },
    Text {
        text: String,
    },
    Gif {
        path: PathBuf,
        width: u16,
        height: u16,
        bytes: usize,
    },
    Timer {
        duration_seconds: u32,
        start: String,
        static_frame: bool,
    },
    Info(InfoReport),
    RenderTimer(render::RenderReport),
}

impl ControlResult {
    fn pretty_line(&self) -> String {
        match self {
            Self::Power { state } => format!("Power: {state}"),
            Self::Brightness { level } => format!("Brightness: {level}%"),
            Self::Clock {
                style,
                date,
                show_date,
                use_24h,
            } => format!(
                "Clock: style {style}, date {date}{}, {}",
                if *show_date { "" } else { " (hidden)" },
                if *use_24h { "24-hour" } else { "12-hour" }
            ),
            Self::SyncTime { unix_timestamp } => format!("Time synced: {unix_timestamp}"),
            Self::Text { text } => format!("Text sent: {text:?}"),
            Self::Gif {
                path,
                width,
                height,
                bytes,
            } => format!(
                "GIF sent: {} ({width}x{height}, {bytes} bytes)",
                path.display()
            ),
            Self::Timer {
                start,
                static_frame,
                ..
            } => format!(
                "Timer sent: {start}{}",
                if *static_frame { " (static)" } else { "" }
            ),
            Self::Info(report) => {
                let info = &report.info;
                let mut line = format!(
                    "Panel: {}x{} (type {}, LED type {}), MCU {}, WiFi {}",
                    info.width,
                    info.height,
                    info.device_type,
                    info.led_type,
                    info.mcu_version,
                    info.wifi_version
                );
                if let Some(reason) = &report.fallback_reason {
                    line.push_str(&format!(" {}", format!("[fallback: {reason}]").yellow()));
                }
                line
            }
            Self::RenderTimer(report) => report.pretty_line(),
        }
    }
}

/// Runs one command against a connected session and writes its result.
///
/// # Errors
///
/// Returns an error when arguments are invalid, the command is not
/// delivered, or output cannot be written.
#[instrument(skip(session, command, out), level = "debug", fields(command = command.name()))]
pub async fn run_with_session<W: Write>(
    session: &DeviceSession,
    command: Command,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()> {
    let result = execute(session, command).await?;
    emit(out, output_format, &result)
}

async fn execute(session: &DeviceSession, command: Command) -> Result<ControlResult> {
    match command {
        Command::Power(args) => {
            let power = ScreenPower::from(args.state);
            ensure_sent(PowerHandler::set_power(session, power).await, "power")?;
            Ok(ControlResult::Power { state: power })
        }
        Command::Brightness(args) => {
            let brightness = Brightness::new(args.level)?;
            ensure_sent(
                BrightnessHandler::set_brightness(session, brightness).await,
                "brightness",
            )?;
            Ok(ControlResult::Brightness {
                level: brightness.value(),
            })
        }
        Command::Clock(args) => {
            let date = ClockMode::parse_date(args.date.as_deref())?;
            let clock = args.clock_mode(date)?;
            ensure_sent(
                ClockHandler::set_clock_mode(session, clock, OffsetDateTime::now_utc()).await,
                "clock",
            )?;
            Ok(ControlResult::Clock {
                style: args.style,
                date: date.to_string(),
                show_date: !args.hide_date,
                use_24h: !args.twelve_hour,
            })
        }
        Command::SyncTime(args) => {
            let now = args.timestamp()?;
            ensure_sent(TimeSyncHandler::sync_time(session, now).await, "sync-time")?;
            Ok(ControlResult::SyncTime {
                unix_timestamp: now.unix_timestamp(),
            })
        }
        Command::Text(args) => {
            let text = args.text_command()?;
            let shown = text.text().to_string();
            ensure_sent(TextHandler::send_text(session, text).await, "text")?;
            Ok(ControlResult::Text { text: shown })
        }
        Command::Gif(args) => {
            let bytes = std::fs::read(&args.path)
                .with_context(|| format!("failed to read {}", args.path.display()))?;
            let gif = GifAnimation::try_from(bytes)
                .with_context(|| format!("{} is not a usable GIF", args.path.display()))?;
            let canvas = gif.canvas();
            let size = gif.payload().len();
            ensure_sent(
                ImageUploadHandler::send_gif(session, gif.payload().to_vec()).await,
                "gif",
            )?;
            Ok(ControlResult::Gif {
                path: args.path,
                width: canvas.width(),
                height: canvas.height(),
                bytes: size,
            })
        }
        Command::Timer(args) => {
            ensure_sent(
                TimerHandler::display_timer(session, args.request()).await,
                "timer",
            )?;
            Ok(ControlResult::Timer {
                duration_seconds: args.duration,
                start: format_countdown(args.duration),
                static_frame: args.static_frame,
            })
        }
        Command::Info => {
            let info = session.query_device_info().await;
            let fallback_reason = session
                .resolved_device_info()
                .and_then(|resolved| resolved.fallback_reason())
                .map(ToString::to_string);
            Ok(ControlResult::Info(InfoReport {
                info,
                fallback_reason,
            }))
        }
        Command::RenderTimer(args) => Ok(ControlResult::RenderTimer(render::render_timer(&args)?)),
    }
}

fn ensure_sent(sent: bool, command: &'static str) -> Result<(), CliConfigError> {
    if sent {
        Ok(())
    } else {
        Err(CliConfigError::CommandFailed { command })
    }
}

pub(crate) fn emit<W: Write>(
    out: &mut W,
    output_format: OutputFormat,
    result: &ControlResult,
) -> Result<()> {
    match output_format {
        OutputFormat::Pretty => {
            writeln!(out, "{}", result.pretty_line())?;
            Ok(())
        }
        OutputFormat::Json => write_json_line(out, result),
    }
}

fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
