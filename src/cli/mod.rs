pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod render;

pub use self::command::{Args, Command, ConnectionArgs, FakeArgs, LogLevel, OutputFormat};
pub use self::control::{
    BrightnessArgs, ClockArgs, ControlResult, GifArgs, InfoReport, PowerArgs, PowerState,
    SyncTimeArgs, TextArgs, TimerArgs,
};
pub use self::render::{RenderFormat, RenderReport, RenderTimerArgs};
