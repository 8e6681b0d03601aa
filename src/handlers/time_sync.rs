use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::codec::{Command, TimeSync};
use crate::hw::DeviceSession;

/// Handler for wall-clock synchronisation.
pub struct TimeSyncHandler;

impl TimeSyncHandler {
    /// Pushes the time of day from `now` to the display.
    #[instrument(skip(session), level = "debug")]
    pub async fn sync_time(session: &DeviceSession, now: OffsetDateTime) -> bool {
        let sent = session
            .send_command(&Command::TimeSync(TimeSync::at(now)))
            .await;
        if sent {
            debug!("time synchronised");
        }
        sent
    }
}
