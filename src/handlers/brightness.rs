use tracing::{debug, instrument};

use crate::codec::{Brightness, Command};
use crate::hw::DeviceSession;

/// Handler for brightness commands.
pub struct BrightnessHandler;

impl BrightnessHandler {
    /// Sets the panel brightness.
    ///
    /// ```
    /// # async fn demo(session: ipixel::DeviceSession) -> Result<(), ipixel::CommandError> {
    /// use ipixel::{Brightness, BrightnessHandler};
    ///
    /// BrightnessHandler::set_brightness(&session, Brightness::new(60)?).await;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(session), level = "debug", fields(level = brightness.value()))]
    pub async fn set_brightness(session: &DeviceSession, brightness: Brightness) -> bool {
        let sent = session.send_command(&Command::Brightness(brightness)).await;
        if sent {
            debug!(level = brightness.value(), "brightness updated");
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::test_support::connected_session;
    use crate::hw::FakeLinkConfig;

    #[tokio::test]
    async fn set_brightness_writes_generic_frame() {
        let (session, link) = connected_session(FakeLinkConfig::default()).await;
        let brightness = Brightness::new(42).expect("42 is in range");

        assert!(BrightnessHandler::set_brightness(&session, brightness).await);
        assert_eq!(vec![vec![0x05, 0x00, 0x04, 0x80, 42]], link.writes());
    }
}
