use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── LocalTime ─────────────────────────────────────────────────────────────────

/// A parsed source date, with or without a time-of-day component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTime {
    /// Only a calendar date was present.
    Date(NaiveDate),
    /// A full local date-time (already converted into the handler's zone).
    DateTime(NaiveDateTime),
}

impl LocalTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            LocalTime::Date(d) => *d,
            LocalTime::DateTime(dt) => dt.date(),
        }
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Normalises the date formats found in receipt and offer exports into local
/// calendar dates.
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// Unrecognised names fall back to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// The zone that offset-carrying timestamps are converted into.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Parse a date-like string.
    ///
    /// Accepted, in order:
    /// * RFC 3339 with `Z` or a numeric offset → converted into the handler's zone.
    /// * Naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` → taken as already local.
    /// * `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` → date only.
    ///
    /// Returns `None` for empty or unrecognised input.
    pub fn parse_local(&self, s: &str) -> Option<LocalTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(LocalTime::DateTime(
                dt.with_timezone(&self.tz).naive_local(),
            ));
        }

        const DATETIME_FMTS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ];
        for fmt in DATETIME_FMTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(LocalTime::DateTime(naive));
            }
        }

        const DATE_FMTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
        for fmt in DATE_FMTS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(LocalTime::Date(date));
            }
        }

        warn!("TimezoneHandler: could not parse date \"{}\"", s);
        None
    }

    /// Convert Unix seconds into a local date-time in the handler's zone.
    pub fn from_unix_seconds(&self, secs: f64) -> Option<LocalTime> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
        let whole = whole as i64;
        let utc: DateTime<Utc> = DateTime::from_timestamp(whole, nanos.min(999_999_999))?;
        Some(LocalTime::DateTime(utc.with_timezone(&self.tz).naive_local()))
    }
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

/// The Sunday that begins the week containing `date`.
///
/// `day_of_week` is the record's derived 0 (Sunday) … 6 (Saturday) value.
pub fn week_start(date: NaiveDate, day_of_week: u8) -> NaiveDate {
    date - Duration::days(i64::from(day_of_week))
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Returns `true` for a well-formed `YYYY-MM` month key.
pub fn is_month_key(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit)
        && matches!(s[5..].parse::<u8>(), Ok(1..=12))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
