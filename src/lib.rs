//! Driver and command-line tool for iPIXEL Color LED matrix displays over BLE.

mod app;
pub mod cli;
mod codec;
mod error;
mod handlers;
mod hw;
mod media;
mod notification;
mod protocol;
mod telemetry;
mod utils;

pub use app::{fake_link, real_link, run, run_with_link, run_with_log_level};
pub use cli::{
    Args, BrightnessArgs, ClockArgs, ConnectionArgs, ControlResult, FakeArgs, GifArgs,
    InfoReport, LogLevel, OutputFormat, PowerArgs, PowerState, RenderFormat, RenderReport,
    RenderTimerArgs, SyncTimeArgs, TextArgs, TimerArgs,
};
pub use codec::{
    Brightness, ChunkFlag, ClockMode, ClockStyle, Command, CommandError, FrameCodec,
    FrameCodecError, ImageChunk, MediaKind, Opcode, ScreenPower, TextCommand, TextOptions,
    TimeSync, UPLOAD_WINDOW_SIZE, WireFrame,
};
pub use error::{FixtureError, InteractionError, QueryError, SendError};
pub use handlers::{
    BrightnessHandler, ClockHandler, ImageUploadHandler, PowerHandler, TextHandler,
    TimeSyncHandler, TimerHandler, TimerRequest,
};
pub use hw::{
    BtleplugLink, BtleplugLinkConfig, ConnectionState, DEFAULT_REPLY_TIMEOUT, DeviceInfo,
    DeviceInfoError, DeviceSession, DeviceTarget, FakeLink, FakeLinkConfig, HexPayload, Link,
    Notification, NotificationStream, ResolvedDeviceInfo, SessionConfig, WriteMode,
};
pub use media::{
    AnimationFrame, BACKGROUND_INDEX, BitmapFont, CANVAS_PADDING, Canvas, CountdownParseError,
    FOREGROUND_INDEX, FrameKind, FrameRenderer, GifAnimation, GifAnimationError, GlyphFont,
    HOLD_DURATION_MS, IndexedFrame, MAX_MINUTE_SECOND_SECONDS, Origin, PALETTE_LEN, Palette,
    RenderError, RenderedFrame, Repeat, Rgb, RgbParseError, STEP_DURATION_MS, TextMetrics,
    TimerAnimation, TimerAnimationError, TimerSpec, countdown_extents, format_countdown,
    longest_countdown_chars, parse_countdown,
};
pub use notification::{NotificationDecodeError, NotificationHandler, NotifyEvent};
pub use protocol::{DEVICE_NAME_PREFIX, EndpointId};
