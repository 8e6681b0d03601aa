use thiserror::Error;

/// Largest value still shown as `M:SS`.
pub const MAX_MINUTE_SECOND_SECONDS: u32 = 9 * 60 + 59;

/// Error returned when a countdown duration cannot be parsed.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("invalid countdown duration {value:?}: expected 30s, 5m, 2:30 or plain seconds")]
pub struct CountdownParseError {
    value: String,
}

/// Formats remaining seconds as `M:SS` up to 9:59 and `Xm` above.
///
/// ```
/// use ipixel::format_countdown;
///
/// assert_eq!("0:00", format_countdown(0));
/// assert_eq!("9:59", format_countdown(599));
/// assert_eq!("10m", format_countdown(600));
/// ```
#[must_use]
pub fn format_countdown(seconds: u32) -> String {
    let minutes = seconds / 60;
    if seconds <= MAX_MINUTE_SECOND_SECONDS {
        format!("{minutes}:{:02}", seconds % 60)
    } else {
        format!("{minutes}m")
    }
}

/// Texts whose sizes bound every frame of a countdown from `duration`.
///
/// `9:59` is always included: it is the widest `M:SS` shape, and any
/// countdown of ten minutes or more passes through it after its `Xm` frames.
///
/// ```
/// use ipixel::countdown_extents;
///
/// assert_eq!(vec!["9:59"], countdown_extents(30));
/// assert_eq!(vec!["9:59", "10m"], countdown_extents(600));
/// ```
#[must_use]
pub fn countdown_extents(duration: u32) -> Vec<String> {
    let mut texts = vec![format_countdown(MAX_MINUTE_SECOND_SECONDS)];
    if duration > MAX_MINUTE_SECOND_SECONDS {
        texts.push(format_countdown(duration));
    }
    texts
}

/// Largest number of characters any frame of the countdown shows.
#[must_use]
pub fn longest_countdown_chars(duration: u32) -> usize {
    countdown_extents(duration)
        .iter()
        .map(|text| text.chars().count())
        .max()
        .unwrap_or_default()
}

/// Parses `30s`, `5m`, `2:30` or a plain number of seconds.
///
/// # Errors
///
/// Returns an error for any other shape or for values that overflow.
pub fn parse_countdown(value: &str) -> Result<u32, CountdownParseError> {
    let normalized = value.trim().to_ascii_lowercase();
    let error = || CountdownParseError {
        value: value.to_string(),
    };
    let number = |digits: &str| digits.trim().parse::<u32>().map_err(|_parse| error());

    if let Some(seconds) = normalized.strip_suffix('s') {
        return number(seconds);
    }
    if let Some(minutes) = normalized.strip_suffix('m') {
        return number(minutes)?.checked_mul(60).ok_or_else(error);
    }
    if let Some((minutes, seconds)) = normalized.split_once(':') {
        return number(minutes)?
            .checked_mul(60)
            .and_then(|total| total.checked_add(number(seconds).ok()?))
            .ok_or_else(error);
    }
    number(&normalized)
}
