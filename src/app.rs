use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::cli::control::{self, ControlResult};
use crate::cli::render;
use crate::cli::{Command, ConnectionArgs, FakeArgs, LogLevel, OutputFormat};
use crate::error::CliConfigError;
use crate::hw::{BtleplugLink, DeviceSession, FakeLink, Link, SessionConfig};
use crate::telemetry;

const SERVICE_NAME: &str = "ipixel";

/// Creates a link backed by the host Bluetooth adapter.
///
/// # Errors
///
/// Returns an error when the platform Bluetooth manager is unavailable.
pub async fn real_link(connection: &ConnectionArgs) -> Result<Arc<dyn Link>> {
    let link = BtleplugLink::new(connection.link_config())
        .await
        .context("failed to open the Bluetooth manager")?;
    Ok(Arc::new(link))
}

/// Creates an in-memory fake display link.
///
/// ```
/// use ipixel::FakeArgs;
///
/// let link = ipixel::fake_link(FakeArgs::builder().device_info("06 00 01 80 00 03")?.build());
/// assert_eq!(0, link.connect_count());
/// # Ok::<(), ipixel::FixtureError>(())
/// ```
#[must_use]
pub fn fake_link(fake: FakeArgs) -> Arc<FakeLink> {
    Arc::new(FakeLink::new(fake.into_link_config()))
}

/// Runs the CLI command with the default log filter.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the display cannot be
/// reached, the command is rejected, or output writing fails.
pub async fn run<W>(
    command: Command,
    connection: ConnectionArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, connection, out, output_format, None).await
}

/// Runs the CLI command with an explicit telemetry log-level override.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = ipixel::Args::try_parse_from([
///     "ipixel",
///     "--fake",
///     "--fake-device-info",
///     "0600018000 03",
///     "--output",
///     "json",
///     "info",
/// ])?;
/// let log_level = args.log_level();
/// let output_format = args.output_format().unwrap_or(ipixel::OutputFormat::Json);
/// let (command, connection) = args.into_command_and_connection();
/// let mut out = Vec::new();
/// ipixel::run_with_log_level(command, connection, &mut out, output_format, log_level).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the display cannot be
/// reached, the command is rejected, or output writing fails.
#[instrument(
    skip(connection, out),
    level = "info",
    fields(command = command.name(), ?log_level)
)]
pub async fn run_with_log_level<W>(
    command: Command,
    connection: ConnectionArgs,
    out: &mut W,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(SERVICE_NAME, log_level.map(LogLevel::as_directive))?;

    if let Command::RenderTimer(args) = &command {
        let report = render::render_timer(args)?;
        return control::emit(out, output_format, &ControlResult::RenderTimer(report));
    }

    let link: Arc<dyn Link> = match connection.fake() {
        Some(fake) => fake_link(fake.clone()),
        None => real_link(&connection).await?,
    };
    run_with_link(command, link, connection.session_config(), out, output_format).await
}

/// Connects a session over `link`, runs one command, and disconnects.
///
/// # Errors
///
/// Returns an error if the display cannot be reached, the command is
/// rejected, or output writing fails.
pub async fn run_with_link<W>(
    command: Command,
    link: Arc<dyn Link>,
    config: SessionConfig,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = DeviceSession::new(link, config);
    if command.needs_device() {
        session
            .try_connect()
            .await
            .context(CliConfigError::ConnectFailed)?;
    }

    let result = control::run_with_session(&session, command, out, output_format).await;
    session.disconnect().await;
    debug!(ok = result.is_ok(), "session closed");
    result
}
