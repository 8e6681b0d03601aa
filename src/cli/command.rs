use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::control::{
    BrightnessArgs, ClockArgs, GifArgs, PowerArgs, SyncTimeArgs, TextArgs, TimerArgs,
};
use crate::cli::render::RenderTimerArgs;
use crate::error::FixtureError;
use crate::hw::{
    BtleplugLinkConfig, DEFAULT_REPLY_TIMEOUT, DeviceTarget, FakeLinkConfig, HexPayload,
    SessionConfig,
};
use crate::protocol::DEVICE_NAME_PREFIX;

const DEFAULT_SCAN_TIMEOUT: &str = "15s";
const DEFAULT_REPLY_TIMEOUT_ARG: &str = "5s";

/// Command-line options for the iPIXEL BLE tool.
#[derive(Debug, Parser)]
#[command(name = "ipixel", about = "Drive iPIXEL Color LED displays over BLE.")]
pub struct Args {
    /// Bluetooth address (or platform peripheral id) of the display.
    #[arg(long, global = true, conflicts_with = "name_prefix")]
    address: Option<String>,
    /// Connect to the first display whose BLE name starts with this prefix.
    #[arg(long, global = true)]
    name_prefix: Option<String>,
    /// How long to scan for the display (e.g. `10s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = DEFAULT_SCAN_TIMEOUT)]
    scan_timeout: Duration,
    /// How long to wait for the device-info reply (e.g. `500ms`, `5s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = DEFAULT_REPLY_TIMEOUT_ARG)]
    reply_timeout: Duration,
    /// Log filter override; `RUST_LOG` is used when omitted.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; pretty on terminals and JSON otherwise when omitted.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Uses an in-memory fake display instead of the Bluetooth adapter.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake device-info reply as hexadecimal bytes; the fake stays silent when omitted.
    #[arg(long, global = true, requires = "fake")]
    fake_device_info: Option<HexPayload>,
    /// Makes the fake display reject every write.
    #[arg(long, global = true, requires = "fake")]
    fake_reject_writes: bool,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use ipixel::cli::{Args, Command};
    ///
    /// let args = Args::new(Command::Info);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            address: None,
            name_prefix: None,
            scan_timeout: Duration::from_secs(15),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            log_level: None,
            output: None,
            fake: false,
            fake_device_info: None,
            fake_reject_writes: false,
            command,
        }
    }

    /// Enables fake mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        self.fake = true;
        self.fake_device_info = fake.device_info;
        self.fake_reject_writes = fake.reject_writes;
        self
    }

    /// Returns the requested log-level override.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Splits parsed CLI arguments into the command and connection settings.
    #[must_use]
    pub fn into_command_and_connection(self) -> (Command, ConnectionArgs) {
        let Args {
            address,
            name_prefix,
            scan_timeout,
            reply_timeout,
            fake,
            fake_device_info,
            fake_reject_writes,
            command,
            ..
        } = self;

        let target = match address {
            Some(address) => DeviceTarget::Address(address),
            None => DeviceTarget::NamePrefix(
                name_prefix.unwrap_or_else(|| DEVICE_NAME_PREFIX.to_string()),
            ),
        };
        let fake = fake.then(|| FakeArgs {
            device_info: fake_device_info,
            reject_writes: fake_reject_writes,
        });

        (
            command,
            ConnectionArgs {
                target,
                scan_timeout,
                reply_timeout,
                fake,
            },
        )
    }
}

/// Fake display settings for programmatic and `--fake` runs.
#[derive(Debug, Clone, Default, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    device_info: Option<HexPayload>,
    #[builder(default)]
    reject_writes: bool,
}

impl FakeArgs {
    pub(crate) fn into_link_config(self) -> FakeLinkConfig {
        FakeLinkConfig::builder()
            .maybe_device_info_reply(self.device_info.map(Vec::<u8>::from))
            .reject_writes(self.reject_writes)
            .build()
    }
}

/// How to reach the display.
#[derive(Debug, Clone)]
pub struct ConnectionArgs {
    target: DeviceTarget,
    scan_timeout: Duration,
    reply_timeout: Duration,
    fake: Option<FakeArgs>,
}

impl ConnectionArgs {
    /// Returns the fake display settings when fake mode is on.
    #[must_use]
    pub fn fake(&self) -> Option<&FakeArgs> {
        self.fake.as_ref()
    }

    pub(crate) fn link_config(&self) -> BtleplugLinkConfig {
        BtleplugLinkConfig::builder()
            .target(self.target.clone())
            .scan_timeout(self.scan_timeout)
            .build()
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .reply_timeout(self.reply_timeout)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Turn the panel on or off.
    Power(PowerArgs),
    /// Set panel brightness (1..=100).
    Brightness(BrightnessArgs),
    /// Switch to the clock face and synchronise the time.
    Clock(ClockArgs),
    /// Synchronise the display clock.
    SyncTime(SyncTimeArgs),
    /// Upload scrolling text.
    Text(TextArgs),
    /// Upload a GIF file.
    Gif(GifArgs),
    /// Render a countdown sized to the panel and upload it.
    Timer(TimerArgs),
    /// Query and print the panel description.
    Info,
    /// Render a countdown GIF or PNG to a file without connecting.
    RenderTimer(RenderTimerArgs),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::Brightness(_) => "brightness",
            Self::Clock(_) => "clock",
            Self::SyncTime(_) => "sync-time",
            Self::Text(_) => "text",
            Self::Gif(_) => "gif",
            Self::Timer(_) => "timer",
            Self::Info => "info",
            Self::RenderTimer(_) => "render-timer",
        }
    }

    pub(crate) fn needs_device(&self) -> bool {
        !matches!(self, Self::RenderTimer(_))
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Pretty,
    /// Pretty-printed JSON documents.
    Json,
}

/// Log filter override.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_flags_require_fake_mode() {
        let result = Args::try_parse_from(["ipixel", "--fake-device-info", "0600018000", "info"]);

        let error = result.expect_err("fake payload flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn address_conflicts_with_name_prefix() {
        let result = Args::try_parse_from([
            "ipixel",
            "--address",
            "AA:BB:CC:DD:EE:FF",
            "--name-prefix",
            "LED_",
            "info",
        ]);

        let error = result.expect_err("address and prefix should conflict");
        assert_eq!(ErrorKind::ArgumentConflict, error.kind());
    }

    #[test]
    fn defaults_target_the_led_ble_prefix() {
        let args = Args::try_parse_from(["ipixel", "info"]).expect("bare info should parse");
        let (command, connection) = args.into_command_and_connection();

        assert_matches!(command, Command::Info);
        assert_eq!(
            DeviceTarget::NamePrefix("LED_BLE_".to_string()),
            connection.target
        );
        assert_eq!(Duration::from_secs(5), connection.reply_timeout);
        assert!(connection.fake().is_none());
    }

    #[test]
    fn fake_mode_carries_device_info_fixture() {
        let args = Args::try_parse_from([
            "ipixel",
            "--fake",
            "--fake-device-info",
            "06 00 01 80 00 03",
            "--reply-timeout",
            "250ms",
            "info",
        ])
        .expect("valid fake arguments should parse");
        let (_command, connection) = args.into_command_and_connection();

        assert_eq!(Duration::from_millis(250), connection.reply_timeout);
        let fake = connection.fake().expect("fake mode should be on");
        assert_eq!(
            Some(vec![0x06, 0x00, 0x01, 0x80, 0x00, 0x03]),
            fake.device_info.clone().map(Vec::<u8>::from)
        );
    }
}
