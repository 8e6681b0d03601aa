use super::CommandError;
use super::frame_codec::{Opcode, encode_bounded};

const MIN_BRIGHTNESS: u8 = 1;
const MAX_BRIGHTNESS: u8 = 100;

/// Validated brightness value in the inclusive range `1..=100`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Brightness(u8);

impl Brightness {
    /// Creates a validated brightness value.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is outside `1..=100`.
    ///
    /// ```
    /// use ipixel::Brightness;
    ///
    /// let value = Brightness::new(42)?;
    /// assert_eq!(42, value.value());
    /// assert!(Brightness::new(0).is_err());
    /// # Ok::<(), ipixel::CommandError>(())
    /// ```
    pub fn new(value: u8) -> Result<Self, CommandError> {
        if !(MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&value) {
            return Err(CommandError::BrightnessOutOfRange {
                value,
                min: MIN_BRIGHTNESS,
                max: MAX_BRIGHTNESS,
            });
        }

        Ok(Self(value))
    }

    /// Returns the underlying brightness byte.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    pub(crate) fn frame(self) -> Vec<u8> {
        encode_bounded(Opcode::BRIGHTNESS, &[self.0])
    }
}
