//! Free-text show durations
//!
//! Show lengths are written by hand in configuration files, e.g. `"55m"`,
//! `"2h"` or `"1h15m20"`. Parsing is lenient: everything up to the first
//! character that cannot continue the expression counts, the rest is ignored.

/// Parses a free-text duration into seconds
///
/// The input is a sequence of groups `<digits>[h|m|s]`. A group without a unit
/// is taken as seconds and ends the expression. Parsing stops at the first
/// character that does not fit, keeping what was summed so far, so `"12trara"`
/// is 12 seconds and `"trara"` or `"-50m"` are 0.
///
/// # Examples
///
/// ```
/// use radiotaper::parse_duration;
///
/// assert_eq!(parse_duration("1h15m20"), 4520);
/// assert_eq!(parse_duration("50m"), 3000);
/// assert_eq!(parse_duration("1h-15m20"), 3600);
/// ```
pub fn parse_duration(text: &str) -> u64 {
    let mut total: u64 = 0;
    let mut chars = text.trim().chars().peekable();

    loop {
        let mut value: u64 = 0;
        let mut has_digits = false;

        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(u64::from(digit));
            has_digits = true;
            chars.next();
        }

        if !has_digits {
            return total;
        }

        let multiplier = match chars.peek() {
            Some('h') => 3600,
            Some('m') => 60,
            Some('s') => 1,
            // Bare number: seconds, and nothing may follow it
            _ => return total.saturating_add(value),
        };
        chars.next();

        total = total.saturating_add(value.saturating_mul(multiplier));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_duration("10h"), 36000);
        assert_eq!(parse_duration("50m"), 3000);
        assert_eq!(parse_duration("300s"), 300);
        assert_eq!(parse_duration("300"), 300);
    }

    #[test]
    fn test_combined_groups() {
        assert_eq!(parse_duration("1h15m20"), 4520);
        assert_eq!(parse_duration("1h15m20s"), 4520);
        assert_eq!(parse_duration("2h30m"), 9000);
    }

    #[test]
    fn test_negative_values_are_ignored() {
        assert_eq!(parse_duration("-50m"), 0);
        assert_eq!(parse_duration("-300s"), 0);
        assert_eq!(parse_duration("-300"), 0);
        assert_eq!(parse_duration("1h-15m20"), 3600);
    }

    #[test]
    fn test_garbage() {
        assert_eq!(parse_duration("trara"), 0);
        assert_eq!(parse_duration("12trara"), 12);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("  45m  "), 2700);
    }
}
