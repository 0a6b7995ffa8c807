//! Duration parsing utilities.
//!
//! The poll interval and ban duration knobs accept either raw seconds
//! ("300") or suffixed duration strings ("30s", "5m", "1h").

/// Suffixes checked longest-first so "mins" is not read as "s".
const UNIT_SUFFIXES: &[(&str, u64)] = &[
    ("hours", 3600),
    ("hour", 3600),
    ("hrs", 3600),
    ("hr", 3600),
    ("h", 3600),
    ("minutes", 60),
    ("minute", 60),
    ("mins", 60),
    ("min", 60),
    ("m", 60),
    ("seconds", 1),
    ("second", 1),
    ("secs", 1),
    ("sec", 1),
    ("s", 1),
];

/// Parse a duration string (e.g. "5", "30s", "5m", "1h") to seconds.
///
/// # Arguments
/// * `duration` - The duration string to parse
///
/// # Returns
/// * `Ok(u64)` - The duration in seconds if parsing succeeds
/// * `Err(String)` - An error message if parsing fails
pub fn parse_duration_to_seconds(duration: &str) -> Result<u64, String> {
    let duration = duration.trim();

    for (suffix, multiplier) in UNIT_SUFFIXES {
        if let Some(number) = duration.strip_suffix(suffix) {
            if let Ok(value) = number.parse::<u64>() {
                return Ok(value * multiplier);
            }
        }
    }

    // No unit suffix: treat the whole string as raw seconds
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    Err(format!("Invalid duration format: {}", duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_seconds() {
        assert_eq!(parse_duration_to_seconds("5"), Ok(5));
        assert_eq!(parse_duration_to_seconds("3600"), Ok(3600));
        assert_eq!(parse_duration_to_seconds("0"), Ok(0));
    }

    #[test]
    fn test_suffixed_durations() {
        assert_eq!(parse_duration_to_seconds("30s"), Ok(30));
        assert_eq!(parse_duration_to_seconds("90sec"), Ok(90));
        assert_eq!(parse_duration_to_seconds("5m"), Ok(300));
        assert_eq!(parse_duration_to_seconds("30mins"), Ok(1800));
        assert_eq!(parse_duration_to_seconds("1h"), Ok(3600));
        assert_eq!(parse_duration_to_seconds("2hours"), Ok(7200));
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(parse_duration_to_seconds(" 5m "), Ok(300));
    }

    #[test]
    fn test_invalid_formats() {
        assert!(parse_duration_to_seconds("").is_err());
        assert!(parse_duration_to_seconds("soon").is_err());
        assert!(parse_duration_to_seconds("5x").is_err());
        assert!(parse_duration_to_seconds("m5").is_err());
    }
}
