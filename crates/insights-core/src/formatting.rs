use chrono::{Datelike, Duration, NaiveDate};

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Format a number with thousands separators and a fixed number of decimals.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a monetary total as `$1,234.56`.
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${}", format_number(amount.abs(), 2))
    } else {
        format!("${}", format_number(amount, 2))
    }
}

/// `part / whole * 100`, unrounded. Zero when `whole` is zero.
pub fn share(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// [`share`] rounded to `decimal_places` for display.
///
/// ```
/// use insights_core::formatting::percentage;
///
/// assert!((percentage(1.0, 3.0, 1) - 33.3).abs() < 1e-9);
/// assert_eq!(percentage(5.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    let factor = 10_f64.powi(decimal_places as i32);
    (share(part, whole) * factor).round() / factor
}

// ── Bucket labels ─────────────────────────────────────────────────────────────

/// Human-readable range for the week beginning on `start`.
///
/// The year is printed once when both ends fall in the same year:
/// `"Jan 7 – Jan 13, 2024"`, otherwise on both ends.
pub fn format_week_label(start: NaiveDate) -> String {
    let end = start + Duration::days(6);
    if start.year() == end.year() {
        format!("{} – {}", start.format("%b %-d"), end.format("%b %-d, %Y"))
    } else {
        format!(
            "{} – {}",
            start.format("%b %-d, %Y"),
            end.format("%b %-d, %Y")
        )
    }
}

/// `"2024-01"` → `"January 2024"`. Malformed keys are returned unchanged.
pub fn format_month_label(month_key: &str) -> String {
    NaiveDate::parse_from_str(&format!("{}-01", month_key), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| month_key.to_string())
}

/// `9` → `"09:00"`.
pub fn format_hour_label(hour: u8) -> String {
    format!("{:02}:00", hour)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
