//! Elapsed-time labels for the position slider.

use std::time::Duration;

/// Formats a playback position for display.
///
/// Under a minute the label is plain seconds (`"42"`). From one minute it is
/// `MM:SS`, and from one hour `H:MM:SS`.
///
/// ```
/// use core_playback::format::format_elapsed;
/// use std::time::Duration;
///
/// assert_eq!(format_elapsed(Duration::from_secs(42)), "42");
/// assert_eq!(format_elapsed(Duration::from_secs(83)), "01:23");
/// assert_eq!(format_elapsed(Duration::from_secs(3723)), "1:02:03");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    if total < 60 {
        return total.to_string();
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute_is_plain_seconds() {
        assert_eq!(format_elapsed(Duration::ZERO), "0");
        assert_eq!(format_elapsed(Duration::from_millis(59_999)), "59");
    }

    #[test]
    fn minute_boundary_switches_format() {
        assert_eq!(format_elapsed(Duration::from_secs(60)), "01:00");
        assert_eq!(format_elapsed(Duration::from_secs(3599)), "59:59");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "1:00:00");
    }
}
