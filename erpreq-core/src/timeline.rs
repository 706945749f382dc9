//! Parsing of free-form timeline strings such as "6 months" or "3 mo".

use once_cell::sync::Lazy;
use regex::Regex;
use std::num::IntErrorKind;

static MONTHS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:month|months|mo)").expect("month pattern is valid")
});

/// Number of months mentioned in a timeline string.
///
/// Returns `None` when nothing matches, so callers can tell an unparsable
/// timeline from an explicit "0 months". Counts too large for a `u32`
/// saturate to `u32::MAX`.
pub fn months_in(timeline: &str) -> Option<u32> {
    let digits = MONTHS_RE.captures(timeline)?.get(1)?.as_str();
    match digits.parse::<u32>() {
        Ok(months) => Some(months),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
        Err(_) => None,
    }
}

/// Months mentioned in a timeline, 0 when absent or unparsable
pub fn parse_months(timeline: Option<&str>) -> u32 {
    timeline.and_then(months_in).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_months() {
        assert_eq!(parse_months(Some("6 months")), 6);
        assert_eq!(parse_months(Some("3 mo")), 3);
        assert_eq!(parse_months(Some("soon")), 0);
        assert_eq!(parse_months(None), 0);
    }

    #[test]
    fn test_parse_months_variants() {
        assert_eq!(parse_months(Some("About 12 Months, ideally")), 12);
        assert_eq!(parse_months(Some("1month")), 1);
        assert_eq!(months_in("0 months"), Some(0));
        assert_eq!(months_in("two months"), None);
    }

    #[test]
    fn test_oversized_month_counts_saturate() {
        assert_eq!(months_in("5000000000 months"), Some(u32::MAX));
        assert_eq!(months_in("99999999999999999999999999 mo"), Some(u32::MAX));
        assert_eq!(parse_months(Some("4294967295 months")), u32::MAX);
    }
}
