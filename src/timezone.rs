//! Resolves canonical timezone names to UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// The current UTC offset of `canonical_timezone`, e.g. "Pacific/Auckland",
/// or `None` if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

#[cfg(test)]
mod timezone_tests {
    use super::get_local_offset;

    #[test]
    fn resolves_known_timezone() {
        assert!(get_local_offset("Etc/UTC").is_some());
        assert!(get_local_offset("Pacific/Auckland").is_some());
    }

    #[test]
    fn unknown_timezone_is_none() {
        assert!(get_local_offset("Mars/Olympus_Mons").is_none());
    }
}
