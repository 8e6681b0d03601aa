//! Binary encoding of display commands.

mod brightness;
mod clock;
mod command;
mod frame_codec;
mod image;
mod power;
mod text;
mod time_sync;
mod upload;

pub use self::brightness::Brightness;
pub use self::clock::{ClockMode, ClockStyle};
pub use self::command::{Command, CommandError};
pub use self::frame_codec::{FrameCodec, FrameCodecError, Opcode, WireFrame};
pub use self::image::{ImageChunk, MediaKind};
pub use self::power::ScreenPower;
pub use self::text::{TextCommand, TextOptions};
pub use self::time_sync::TimeSync;
pub use self::upload::{ChunkFlag, UPLOAD_WINDOW_SIZE};
