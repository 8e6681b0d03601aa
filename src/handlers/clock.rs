use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::TimeSyncHandler;
use crate::codec::{ClockMode, Command};
use crate::hw::DeviceSession;

/// Handler for the clock face.
pub struct ClockHandler;

impl ClockHandler {
    /// Switches to clock mode, then synchronises the time.
    ///
    /// Returns whether the clock-mode frame was sent; a failed time sync
    /// only logs a warning.
    #[instrument(skip(session, clock), level = "debug")]
    pub async fn set_clock_mode(
        session: &DeviceSession,
        clock: ClockMode,
        now: OffsetDateTime,
    ) -> bool {
        if !session.send_command(&Command::ClockMode(clock)).await {
            return false;
        }
        info!(?clock, "clock mode set");

        if !TimeSyncHandler::sync_time(session, now).await {
            warn!("clock mode set but time sync failed");
        }
        true
    }
}
