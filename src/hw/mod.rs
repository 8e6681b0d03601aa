mod btleplug_link;
mod device_info;
mod fake_link;
mod link;
mod reply_slot;
mod session;

pub use self::btleplug_link::{BtleplugLink, BtleplugLinkConfig, DeviceTarget};
pub use self::device_info::{DeviceInfo, DeviceInfoError, ResolvedDeviceInfo};
pub use self::fake_link::{FakeLink, FakeLinkConfig, HexPayload};
pub use self::link::{Link, Notification, NotificationStream, WriteMode};
pub use self::session::{ConnectionState, DEFAULT_REPLY_TIMEOUT, DeviceSession, SessionConfig};
