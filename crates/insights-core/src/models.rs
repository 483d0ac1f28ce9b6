use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;

/// Whether a record is a retail sale or a promotional offer hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A redeemed receipt line (`receiptDate`, `productName`, `chain`).
    Sale,
    /// A promotional offer hit (`offerName`, `createdAt`, `hitId`).
    Offer,
}

/// A single normalised transactional row.
///
/// Records are immutable once built: the calendar fields (`month`,
/// `day_of_week`, `hour_of_day`) are derived in the constructor from the
/// record's local date/time and there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    kind: RecordKind,
    date: NaiveDate,
    month: String,
    day_of_week: u8,
    hour_of_day: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_for_viewer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
}

impl Record {
    /// Build a record observed on a calendar date with no time-of-day.
    pub fn on_date(kind: RecordKind, date: NaiveDate) -> Self {
        Self::build(kind, date, None)
    }

    /// Build a record observed at a local date-time.
    pub fn at_time(kind: RecordKind, local: NaiveDateTime) -> Self {
        Self::build(kind, local.date(), Some(local.hour() as u8))
    }

    fn build(kind: RecordKind, date: NaiveDate, hour_of_day: Option<u8>) -> Self {
        Self {
            kind,
            date,
            month: date.format("%Y-%m").to_string(),
            day_of_week: date.weekday().num_days_from_sunday() as u8,
            hour_of_day,
            product_name: None,
            chain: None,
            receipt_total: None,
            offer_name: None,
            hit_id: None,
            gender: None,
            age_group: None,
            rank_for_viewer: None,
            response: None,
        }
    }

    pub fn with_product(mut self, name: impl Into<String>) -> Self {
        self.product_name = non_blank(name.into());
        self
    }

    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = non_blank(chain.into());
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.receipt_total = total.is_finite().then_some(total);
        self
    }

    pub fn with_offer(mut self, offer: impl Into<String>) -> Self {
        self.offer_name = non_blank(offer.into());
        self
    }

    pub fn with_hit_id(mut self, hit_id: impl Into<String>) -> Self {
        self.hit_id = non_blank(hit_id.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = non_blank(gender.into());
        self
    }

    pub fn with_age_group(mut self, age_group: impl Into<String>) -> Self {
        self.age_group = non_blank(age_group.into());
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank_for_viewer = Some(rank);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = non_blank(response.into());
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Local calendar date of the record.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `YYYY-MM` of [`Record::date`].
    pub fn month(&self) -> &str {
        &self.month
    }

    /// 0 = Sunday … 6 = Saturday.
    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    /// Hour of day, present only when the source carried a time.
    pub fn hour_of_day(&self) -> Option<u8> {
        self.hour_of_day
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn chain(&self) -> Option<&str> {
        self.chain.as_deref()
    }

    pub fn receipt_total(&self) -> Option<f64> {
        self.receipt_total
    }

    pub fn offer_name(&self) -> Option<&str> {
        self.offer_name.as_deref()
    }

    pub fn hit_id(&self) -> Option<&str> {
        self.hit_id.as_deref()
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn age_group(&self) -> Option<&str> {
        self.age_group.as_deref()
    }

    pub fn rank_for_viewer(&self) -> Option<u32> {
        self.rank_for_viewer
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// Typed access to a grouping field.
    ///
    /// Returns `None` when the record does not carry the field; blank
    /// strings are never stored, so `Some` is always non-empty.
    pub fn field(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Product => self.product_name().map(Cow::Borrowed),
            Field::Retailer => self.chain().map(Cow::Borrowed),
            Field::Offer => self.offer_name().map(Cow::Borrowed),
            Field::HitId => self.hit_id().map(Cow::Borrowed),
            Field::Gender => self.gender().map(Cow::Borrowed),
            Field::AgeGroup => self.age_group().map(Cow::Borrowed),
            Field::Response => self.response().map(Cow::Borrowed),
            Field::Rank => self.rank_for_viewer.map(|r| Cow::Owned(r.to_string())),
            Field::Month => Some(Cow::Borrowed(self.month())),
            Field::Date => Some(Cow::Owned(self.date.format("%Y-%m-%d").to_string())),
            Field::DayOfWeek => Some(Cow::Owned(self.day_of_week.to_string())),
            Field::HourOfDay => self.hour_of_day.map(|h| Cow::Owned(h.to_string())),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Record fields that aggregations can group or filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "productName")]
    Product,
    #[serde(rename = "chain")]
    Retailer,
    #[serde(rename = "offerName")]
    Offer,
    #[serde(rename = "hitId")]
    HitId,
    #[serde(rename = "gender")]
    Gender,
    #[serde(rename = "ageGroup")]
    AgeGroup,
    #[serde(rename = "rankForViewer")]
    Rank,
    #[serde(rename = "response")]
    Response,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "receiptDate")]
    Date,
    #[serde(rename = "dayOfWeek")]
    DayOfWeek,
    #[serde(rename = "hourOfDay")]
    HourOfDay,
}

impl Field {
    /// The raw column name this field is read from.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Product => "productName",
            Field::Retailer => "chain",
            Field::Offer => "offerName",
            Field::HitId => "hitId",
            Field::Gender => "gender",
            Field::AgeGroup => "ageGroup",
            Field::Rank => "rankForViewer",
            Field::Response => "response",
            Field::Month => "month",
            Field::Date => "receiptDate",
            Field::DayOfWeek => "dayOfWeek",
            Field::HourOfDay => "hourOfDay",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = InsightsError;

    /// Accepts the raw column name or a short alias (`product`, `retailer`,
    /// `offer`, `age`, `rank`, `date`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "productName" | "product" => Field::Product,
            "chain" | "retailer" => Field::Retailer,
            "offerName" | "offer" => Field::Offer,
            "hitId" => Field::HitId,
            "gender" => Field::Gender,
            "ageGroup" | "age" => Field::AgeGroup,
            "rankForViewer" | "rank" => Field::Rank,
            "response" => Field::Response,
            "month" => Field::Month,
            "receiptDate" | "date" => Field::Date,
            "dayOfWeek" => Field::DayOfWeek,
            "hourOfDay" => Field::HourOfDay,
            other => return Err(InsightsError::InvalidField(other.to_string())),
        };
        Ok(field)
    }
}

/// Time-bucket width for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Granularity {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Granularity::Hourly),
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(InsightsError::Config(format!(
                "unknown granularity \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        };
        f.write_str(name)
    }
}
