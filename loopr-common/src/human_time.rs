//! Human-readable time formatting
//!
//! Status lines show loop points in seconds ("Punto A: 2.0s"), the display
//! shows a clock ("01:05"), and exported regions are named with a compact
//! minute/second stamp ("0105").

/// Split a non-negative offset into whole minutes and whole seconds.
///
/// Negative and non-finite inputs are treated as zero.
pub fn minutes_seconds(seconds: f64) -> (u64, u64) {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    (whole / 60, whole % 60)
}

/// Format as `MM:SS`, zero-padded to two digits each.
///
/// # Examples
///
/// ```
/// use loopr_common::human_time::format_clock;
///
/// assert_eq!(format_clock(65.4), "01:05");
/// assert_eq!(format_clock(0.0), "00:00");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let (m, s) = minutes_seconds(seconds);
    format!("{:02}:{:02}", m, s)
}

/// Format as `MMSS` without a separator, for file names.
///
/// # Examples
///
/// ```
/// use loopr_common::human_time::format_compact_stamp;
///
/// assert_eq!(format_compact_stamp(2.0), "0002");
/// assert_eq!(format_compact_stamp(754.9), "1234");
/// ```
pub fn format_compact_stamp(seconds: f64) -> String {
    let (m, s) = minutes_seconds(seconds);
    format!("{:02}{:02}", m, s)
}

/// Format seconds with a fixed number of decimals and an `s` suffix.
pub fn format_seconds(seconds: f64, decimals: usize) -> String {
    format!("{:.*}s", decimals, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_seconds_truncates() {
        assert_eq!(minutes_seconds(59.99), (0, 59));
        assert_eq!(minutes_seconds(60.0), (1, 0));
        assert_eq!(minutes_seconds(3599.5), (59, 59));
    }

    #[test]
    fn test_invalid_inputs_are_zero() {
        assert_eq!(minutes_seconds(-3.0), (0, 0));
        assert_eq!(minutes_seconds(f64::NAN), (0, 0));
    }

    #[test]
    fn test_clock_beyond_hour_keeps_minutes() {
        assert_eq!(format_clock(3725.0), "62:05");
    }

    #[test]
    fn test_compact_stamp() {
        assert_eq!(format_compact_stamp(125.0), "0205");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(2.0, 1), "2.0s");
        assert_eq!(format_seconds(2.1, 3), "2.100s");
    }
}
