//! Date normalization for the export's `Date` column.
//!
//! Dates arrive as `"<Www> <d> <Mmm> <yyyy> <HH:MM:SS> <+HHMM> (<TZ>)"`, e.g.
//! `"Tue, 14 Nov 2000 07:26:00 -0800 (PST)"`. The parenthesised zone name is
//! dropped and the rest parsed with its numeric offset. The stored value is the
//! wall-clock time at that offset, formatted `YYYY-MM-DD HH:MM:SS`.
//!
//! Unparseable dates are not errors: they normalize to `None` and the row is
//! still loaded.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Weekday};
use regex::Regex;

/// Format of the date once the weekday and zone name are removed.
const SOURCE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Format written to the `date` column.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static ZONE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches a trailing zone abbreviation such as ` (PDT)`.
fn zone_name_regex() -> &'static Regex {
    ZONE_NAME_REGEX.get_or_init(|| {
        Regex::new(r"\s+\([A-Za-z]+\)").expect("Invalid zone name regex")
    })
}

/// Parse a raw export date into a timestamp with offset.
///
/// The leading weekday is optional and is not checked against the calendar
/// date; exports are known to carry inconsistent weekdays.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let stripped = zone_name_regex().replace_all(raw, "");
    let stripped = stripped.trim();

    let remainder = match stripped.split_once(char::is_whitespace) {
        Some((first, rest)) if first.trim_end_matches(',').parse::<Weekday>().is_ok() => {
            rest.trim_start()
        }
        _ => stripped,
    };

    DateTime::parse_from_str(remainder, SOURCE_FORMAT).ok()
}

/// Normalize a raw export date into its storage form, or `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    match parse_date(raw) {
        Some(parsed) => Some(parsed.format(STORAGE_FORMAT).to_string()),
        None => {
            log::trace!("unparseable date `{}`, storing NULL", raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_utc_date() {
        assert_eq!(
            normalize_date("Mon 1 Jan 2020 10:00:00 +0000 (UTC)").as_deref(),
            Some("2020-01-01 10:00:00")
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(normalize_date("garbage"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("Mon 32 Jan 2020 10:00:00 +0000 (UTC)"), None);
    }

    #[test]
    fn keeps_wall_clock_time_and_drops_offset() {
        assert_eq!(
            normalize_date("Tue, 14 Nov 2000 07:26:00 -0800 (PST)").as_deref(),
            Some("2000-11-14 07:26:00")
        );
        let parsed = parse_date("Tue, 14 Nov 2000 07:26:00 -0800 (PST)").expect("parses");
        assert_eq!(parsed.offset().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn zone_name_is_optional() {
        assert_eq!(
            normalize_date("Fri 5 Jun 2015 23:59:59 +0530").as_deref(),
            Some("2015-06-05 23:59:59")
        );
    }

    #[test]
    fn weekday_is_optional() {
        assert_eq!(
            normalize_date("14 Nov 2000 07:26:00 -0800 (PST)").as_deref(),
            Some("2000-11-14 07:26:00")
        );
    }

    #[test]
    fn missing_offset_is_none() {
        assert_eq!(normalize_date("Mon 1 Jan 2020 10:00:00 (UTC)"), None);
    }
}
