// ABOUTME: Timezone-naive timestamp handling shared by every chat component
// Parses backend timestamps as local wall-clock time and formats outbound ones the same way

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::Mutex;

/// Client and backend are assumed to read the same wall clock. Timestamps are
/// never shifted between zones: a trailing UTC designator or offset is dropped
/// and the remaining fields are taken as local time. When the assumption does
/// not hold, displayed times and session windows drift by the zone difference.
pub const SHARED_WALL_CLOCK: bool = true;

/// Format used for outbound `sentAt` values. No zone marker.
pub const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A local wall-clock instant, or the sentinel for an unparseable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalInstant(Option<NaiveDateTime>);

impl LocalInstant {
    pub const INVALID: Self = Self(None);

    pub fn new(value: NaiveDateTime) -> Self {
        Self(Some(value))
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        self.0
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.0.map(|dt| dt.date())
    }
}

impl From<NaiveDateTime> for LocalInstant {
    fn from(value: NaiveDateTime) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for LocalInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format(LOCAL_FORMAT)),
            None => f.write_str("<invalid>"),
        }
    }
}

/// Parse a timestamp as local time. Never fails: unparseable input yields
/// [`LocalInstant::INVALID`].
pub fn parse_local(raw: &str) -> LocalInstant {
    let trimmed = strip_zone_designator(raw.trim());

    for format in ACCEPTED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return LocalInstant::new(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(LocalInstant::INVALID, LocalInstant::new)
}

/// Drop a trailing `Z` or `±HH:MM` / `±HHMM` offset without converting.
fn strip_zone_designator(raw: &str) -> &str {
    if let Some(stripped) = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        return stripped;
    }

    // Offsets only ever follow the time part, so a date-only string is left alone.
    let Some(time_start) = raw.find(['T', ' ']) else {
        return raw;
    };
    let time_part = &raw[time_start..];
    if let Some(pos) = time_part.rfind(['+', '-']) {
        let offset = &time_part[pos + 1..];
        let digits = offset.chars().filter(char::is_ascii_digit).count();
        let well_formed = offset.chars().all(|c| c.is_ascii_digit() || c == ':');
        if well_formed && (digits == 4 || digits == 2) {
            return &raw[..time_start + pos];
        }
    }
    raw
}

/// Format an instant in the unmarked local format used on the wire.
pub fn format_local(value: NaiveDateTime) -> String {
    value.format(LOCAL_FORMAT).to_string()
}

/// Current moment as an unmarked local timestamp string.
pub fn now_local_string(clock: &dyn Clock) -> String {
    format_local(clock.now())
}

/// Compare year, month and day only.
pub fn is_same_calendar_day(a: LocalInstant, b: LocalInstant) -> bool {
    match (a.date(), b.date()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Source of "now". Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the device's local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn at(raw: &str) -> Option<Self> {
        parse_local(raw).value().map(Self::new)
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_utc_marker_is_dropped_not_converted() {
        let instant = parse_local("2024-01-01T10:00:00.000Z");
        let value = instant.value().unwrap();
        assert_eq!(value.hour(), 10);
        assert_eq!(value.day(), 1);
    }

    #[test]
    fn test_numeric_offsets_are_dropped() {
        let plus = parse_local("2024-03-05T23:30:00+07:00").value().unwrap();
        let minus = parse_local("2024-03-05T23:30:00-0500").value().unwrap();
        assert_eq!(plus.hour(), 23);
        assert_eq!(minus.hour(), 23);
        assert_eq!(plus, minus);
    }

    #[test]
    fn test_unmarked_and_spaced_forms_parse() {
        assert!(parse_local("2024-01-01T10:00:00").is_valid());
        assert!(parse_local("2024-01-01 10:00:00.123456").is_valid());
        assert!(parse_local("2024-01-01T10:00").is_valid());
        let date_only = parse_local("2024-01-01").value().unwrap();
        assert_eq!(date_only.hour(), 0);
    }

    #[test]
    fn test_garbage_yields_invalid_sentinel() {
        assert_eq!(parse_local("not a date"), LocalInstant::INVALID);
        assert_eq!(parse_local(""), LocalInstant::INVALID);
        assert!(!parse_local("2024-13-45T99:00:00").is_valid());
    }

    #[test]
    fn test_now_string_round_trips_without_marker() {
        let clock = FixedClock::at("2024-06-01T08:15:30").unwrap();
        let formatted = now_local_string(&clock);
        assert_eq!(formatted, "2024-06-01T08:15:30.000");
        assert!(!formatted.ends_with('Z'));
        assert_eq!(parse_local(&formatted).value(), Some(clock.now()));
    }

    #[test]
    fn test_same_calendar_day_ignores_time_of_day() {
        let morning = parse_local("2024-01-01T00:00:01");
        let night = parse_local("2024-01-01T23:59:59");
        let next = parse_local("2024-01-02T00:00:00");
        assert!(is_same_calendar_day(morning, night));
        assert!(!is_same_calendar_day(night, next));
        assert!(!is_same_calendar_day(morning, LocalInstant::INVALID));
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at("2024-01-01T10:00:00").unwrap();
        clock.advance(chrono::Duration::minutes(90));
        assert_eq!(clock.now().hour(), 11);
        assert_eq!(clock.now().minute(), 30);
    }
}
