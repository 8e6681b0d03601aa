use bon::Builder;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use super::CommandError;
use super::frame_codec::{Opcode, encode_bounded};

const MAX_CLOCK_STYLE: u8 = 8;

/// Validated clock face style in the inclusive range `0..=8`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ClockStyle(u8);

impl ClockStyle {
    /// Creates a validated clock style.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is greater than `8`.
    pub fn new(value: u8) -> Result<Self, CommandError> {
        if value > MAX_CLOCK_STYLE {
            return Err(CommandError::ClockStyleOutOfRange {
                value,
                max: MAX_CLOCK_STYLE,
            });
        }

        Ok(Self(value))
    }

    /// Returns the raw style byte.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for ClockStyle {
    fn default() -> Self {
        Self(1)
    }
}

/// Clock face command.
///
/// ```
/// use ipixel::{ClockMode, ClockStyle};
/// use time::macros::date;
///
/// let clock = ClockMode::builder()
///     .style(ClockStyle::new(2)?)
///     .date(date!(2026 - 10 - 19))
///     .show_date(false)
///     .build();
/// assert_eq!(
///     vec![0x0B, 0x00, 0x06, 0x01, 2, 1, 0, 26, 10, 19, 1],
///     clock.frame()
/// );
/// # Ok::<(), ipixel::CommandError>(())
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct ClockMode {
    #[builder(default)]
    style: ClockStyle,
    date: Date,
    #[builder(default = true)]
    show_date: bool,
    #[builder(default = true)]
    use_24h: bool,
}

impl ClockMode {
    /// Parses a `DD/MM/YYYY` date, or returns today's UTC date for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when the date is present but malformed.
    pub fn parse_date(value: Option<&str>) -> Result<Date, CommandError> {
        let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(OffsetDateTime::now_utc().date());
        };

        Date::parse(value, format_description!("[day]/[month]/[year]")).map_err(|_parse| {
            CommandError::InvalidClockDate {
                value: value.to_string(),
            }
        })
    }

    fn payload(&self) -> [u8; 7] {
        let year = u8::try_from(self.date.year().rem_euclid(100)).unwrap_or_default();
        [
            self.style.value(),
            u8::from(self.use_24h),
            u8::from(self.show_date),
            year,
            self.date.month() as u8,
            self.date.day(),
            self.date.weekday().number_from_monday(),
        ]
    }

    /// Encodes the legacy clock-mode frame.
    #[must_use]
    pub fn frame(&self) -> Vec<u8> {
        encode_bounded(Opcode::CLOCK_MODE, &self.payload())
    }
}
