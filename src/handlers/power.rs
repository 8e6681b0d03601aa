use tracing::{debug, instrument};

use crate::codec::{Command, ScreenPower};
use crate::hw::DeviceSession;

/// Handler for screen power commands.
pub struct PowerHandler;

impl PowerHandler {
    /// Turns the panel on or off and records the new state on success.
    ///
    /// ```
    /// # async fn demo(session: ipixel::DeviceSession) {
    /// use ipixel::{PowerHandler, ScreenPower};
    ///
    /// if PowerHandler::set_power(&session, ScreenPower::On).await {
    ///     assert_eq!(Some(ScreenPower::On), session.power_state());
    /// }
    /// # }
    /// ```
    #[instrument(skip(session), level = "debug", fields(%power))]
    pub async fn set_power(session: &DeviceSession, power: ScreenPower) -> bool {
        let sent = session.send_command(&Command::Power(power)).await;
        if sent {
            session.record_power(power);
            debug!(%power, "power state updated");
        }
        sent
    }
}
