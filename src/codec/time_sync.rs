use time::{OffsetDateTime, Time};

use super::frame_codec::{Opcode, encode_bounded};

/// Wall-clock time of day pushed to the display.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TimeSync {
    time: Time,
}

impl TimeSync {
    /// Creates a time sync from hour, minute and second.
    ///
    /// # Errors
    ///
    /// Returns an error when any component is out of range.
    ///
    /// ```
    /// use ipixel::TimeSync;
    ///
    /// let sync = TimeSync::new(12, 30, 45)?;
    /// assert_eq!(vec![0x08, 0x00, 0x01, 0x80, 12, 30, 45, 0x00], sync.frame());
    /// # Ok::<(), time::error::ComponentRange>(())
    /// ```
    pub fn new(hour: u8, minute: u8, second: u8) -> Result<Self, time::error::ComponentRange> {
        Ok(Self {
            time: Time::from_hms(hour, minute, second)?,
        })
    }

    /// Captures the time of day from a timestamp.
    #[must_use]
    pub fn at(timestamp: OffsetDateTime) -> Self {
        Self {
            time: timestamp.time(),
        }
    }

    fn payload(self) -> [u8; 4] {
        [self.time.hour(), self.time.minute(), self.time.second(), 0x00]
    }

    /// Encodes the time sync frame.
    #[must_use]
    pub fn frame(self) -> Vec<u8> {
        encode_bounded(Opcode::TIME_SYNC, &self.payload())
    }
}
