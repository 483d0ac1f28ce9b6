use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{InsightsError, Result};
use crate::models::{Record, RecordKind};
use crate::time_utils::{LocalTime, TimezoneHandler};

/// One flat key/value row as produced by parsing a delimited export.
pub type RawRow = Map<String, Value>;

// ── ValueExtractor ────────────────────────────────────────────────────────────

/// Reads scalar values out of a raw row, trying alternative key spellings in
/// order. The first key holding a non-null, non-blank value wins.
pub struct ValueExtractor;

impl ValueExtractor {
    /// Text value; numbers and booleans are rendered as strings.
    pub fn text(row: &RawRow, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match row.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Numeric value. Strings are accepted in currency notation
    /// (`"$1,234.50"`, `"12.00 USD"`).
    pub fn number(row: &RawRow, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| match row.get(*key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_amount(s),
            _ => None,
        })
    }

    /// Non-negative integer value, e.g. a rank.
    pub fn unsigned(row: &RawRow, keys: &[&str]) -> Option<u32> {
        let n = Self::number(row, keys)?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
            Some(n as u32)
        } else {
            None
        }
    }

    /// The first present, non-null value under any of `keys`.
    pub fn raw<'a>(row: &'a RawRow, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| row.get(*key))
            .find(|v| !v.is_null())
    }
}

/// Strip currency symbols and thousands separators, then parse.
fn parse_amount(s: &str) -> Option<f64> {
    static NON_NUMERIC: OnceLock<Regex> = OnceLock::new();
    let re = NON_NUMERIC.get_or_init(|| Regex::new(r"[^0-9.\-]").expect("regex is valid"));
    let cleaned = re.replace_all(s.trim(), "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Column names ──────────────────────────────────────────────────────────────

const RECEIPT_DATE_KEYS: &[&str] = &["receiptDate", "receipt_date", "date"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at", "timestamp"];
const PRODUCT_KEYS: &[&str] = &["productName", "product_name", "product"];
const CHAIN_KEYS: &[&str] = &["chain", "retailer", "chainName"];
const TOTAL_KEYS: &[&str] = &["receiptTotal", "receipt_total", "total"];
const OFFER_KEYS: &[&str] = &["offerName", "offer_name", "offer"];
const HIT_ID_KEYS: &[&str] = &["hitId", "hit_id", "id"];
const GENDER_KEYS: &[&str] = &["gender"];
const AGE_GROUP_KEYS: &[&str] = &["ageGroup", "age_group"];
const RANK_KEYS: &[&str] = &["rankForViewer", "rank_for_viewer", "rank"];
const RESPONSE_KEYS: &[&str] = &["response", "answer"];

/// Unix timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

// ── RecordConverter ───────────────────────────────────────────────────────────

/// Converts raw rows into [`Record`]s, deriving calendar fields once.
pub struct RecordConverter {
    tz: TimezoneHandler,
}

impl RecordConverter {
    /// `tz_name` is the IANA zone offset-carrying timestamps are converted into.
    pub fn new(tz_name: &str) -> Self {
        Self {
            tz: TimezoneHandler::new(tz_name),
        }
    }

    /// Decide whether a row describes an offer hit or a sale.
    ///
    /// Rows carrying `offerName` or `createdAt` are offer hits.
    pub fn detect_kind(row: &RawRow) -> RecordKind {
        if ValueExtractor::raw(row, OFFER_KEYS).is_some()
            || ValueExtractor::raw(row, &CREATED_AT_KEYS[..2]).is_some()
        {
            RecordKind::Offer
        } else {
            RecordKind::Sale
        }
    }

    /// Build a [`Record`] from `row`.
    ///
    /// Fails with [`InsightsError::MissingField`] when no date column is
    /// present and [`InsightsError::TimestampParse`] when it cannot be read.
    pub fn convert(&self, row: &RawRow) -> Result<Record> {
        let kind = Self::detect_kind(row);

        let date_keys: Vec<&str> = match kind {
            RecordKind::Offer => CREATED_AT_KEYS.iter().chain(RECEIPT_DATE_KEYS).copied().collect(),
            RecordKind::Sale => RECEIPT_DATE_KEYS.iter().chain(CREATED_AT_KEYS).copied().collect(),
        };
        let date_value = ValueExtractor::raw(row, &date_keys)
            .ok_or_else(|| InsightsError::MissingField(date_keys[0].to_string()))?;
        let local = self
            .parse_date_value(date_value)
            .ok_or_else(|| InsightsError::TimestampParse(date_value.to_string()))?;

        let mut record = match local {
            LocalTime::Date(date) => Record::on_date(kind, date),
            LocalTime::DateTime(dt) => Record::at_time(kind, dt),
        };

        if let Some(v) = ValueExtractor::text(row, PRODUCT_KEYS) {
            record = record.with_product(v);
        }
        if let Some(v) = ValueExtractor::text(row, CHAIN_KEYS) {
            record = record.with_chain(v);
        }
        if let Some(v) = ValueExtractor::number(row, TOTAL_KEYS) {
            record = record.with_total(v);
        }
        if let Some(v) = ValueExtractor::text(row, OFFER_KEYS) {
            record = record.with_offer(v);
        }
        if kind == RecordKind::Offer {
            if let Some(v) = ValueExtractor::text(row, HIT_ID_KEYS) {
                record = record.with_hit_id(v);
            }
        }
        if let Some(v) = ValueExtractor::text(row, GENDER_KEYS) {
            record = record.with_gender(v);
        }
        if let Some(v) = ValueExtractor::text(row, AGE_GROUP_KEYS) {
            record = record.with_age_group(v);
        }
        if let Some(v) = ValueExtractor::unsigned(row, RANK_KEYS) {
            record = record.with_rank(v);
        }
        if let Some(v) = ValueExtractor::text(row, RESPONSE_KEYS) {
            record = record.with_response(v);
        }

        Ok(record)
    }

    fn parse_date_value(&self, value: &Value) -> Option<LocalTime> {
        match value {
            Value::String(s) => self.tz.parse_local(s),
            Value::Number(n) => {
                let raw = n.as_f64()?;
                let secs = if raw.abs() >= MILLIS_THRESHOLD {
                    raw / 1000.0
                } else {
                    raw
                };
                self.tz.from_unix_seconds(secs)
            }
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
