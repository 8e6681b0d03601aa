mod brightness;
mod clock;
mod image_upload;
mod power;
mod text_upload;
mod time_sync;
mod timer;

pub use self::brightness::BrightnessHandler;
pub use self::clock::ClockHandler;
pub use self::image_upload::ImageUploadHandler;
pub use self::power::PowerHandler;
pub use self::text_upload::TextHandler;
pub use self::time_sync::TimeSyncHandler;
pub use self::timer::{TimerHandler, TimerRequest};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::hw::{DeviceSession, FakeLink, FakeLinkConfig, SessionConfig};

    /// Connected session over a fake link, plus the link for assertions.
    pub(crate) async fn connected_session(config: FakeLinkConfig) -> (DeviceSession, Arc<FakeLink>) {
        let link = Arc::new(FakeLink::new(config));
        let session = DeviceSession::new(link.clone(), SessionConfig::default());
        assert!(session.connect().await, "fake session should connect");
        (session, link)
    }
}
