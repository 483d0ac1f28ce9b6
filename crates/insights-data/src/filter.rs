//! Product / retailer / date-window predicates over the record set.
//!
//! A [`FilterSpec`] is a plain value; the primary and comparison specs are
//! evaluated by separate calls to [`RecordFilter::filter`] with nothing
//! shared between them.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use insights_core::error::{InsightsError, Result};
use insights_core::models::Record;
use insights_core::time_utils::{is_month_key, parse_iso_date};
use serde::{Deserialize, Serialize};

// ── Selection ─────────────────────────────────────────────────────────────────

/// Either every value, or an explicit set.
///
/// Serialised as the string `"all"` or an array of names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "SelectionRepr", into = "SelectionRepr")]
pub enum Selection {
    #[default]
    All,
    /// An empty set matches nothing.
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(values.into_iter().map(Into::into).collect())
    }

    /// An empty list means "no restriction".
    pub fn from_list(values: &[String]) -> Self {
        if values.is_empty() {
            Selection::All
        } else {
            Self::only(values.iter().cloned())
        }
    }

    /// Does `value` pass? A missing value passes only [`Selection::All`].
    pub fn admits(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => value.is_some_and(|v| set.contains(v)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Keyword(String),
    List(BTreeSet<String>),
}

impl TryFrom<SelectionRepr> for Selection {
    type Error = InsightsError;

    fn try_from(repr: SelectionRepr) -> Result<Self> {
        match repr {
            SelectionRepr::Keyword(k) if k == "all" => Ok(Selection::All),
            SelectionRepr::Keyword(k) => Err(InsightsError::InvalidFilter(format!(
                "selection must be \"all\" or a list, got \"{}\"",
                k
            ))),
            SelectionRepr::List(set) => Ok(Selection::Only(set)),
        }
    }
}

impl From<Selection> for SelectionRepr {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => SelectionRepr::Keyword("all".to_string()),
            Selection::Only(set) => SelectionRepr::List(set),
        }
    }
}

// ── DateWindow ────────────────────────────────────────────────────────────────

/// The date constraint of a [`FilterSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DateWindow {
    #[default]
    #[serde(rename = "all")]
    AllTime,
    /// Records whose derived `YYYY-MM` equals `month`.
    Month { month: String },
    /// Records dated within `start..=end`.
    Custom { start: NaiveDate, end: NaiveDate },
}

impl DateWindow {
    /// A validated single-month window.
    pub fn month(month: &str) -> Result<Self> {
        let window = DateWindow::Month {
            month: month.trim().to_string(),
        };
        window.validate()?;
        Ok(window)
    }

    /// A validated inclusive range from two `YYYY-MM-DD` strings.
    pub fn custom(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            parse_iso_date(s).ok_or_else(|| {
                InsightsError::InvalidFilter(format!("\"{}\" is not a YYYY-MM-DD date", s))
            })
        };
        let window = DateWindow::Custom {
            start: parse(start)?,
            end: parse(end)?,
        };
        window.validate()?;
        Ok(window)
    }

    /// Build a window from optional command-line parts.
    ///
    /// Nothing given → all time; `month` alone → month; `start` and `end`
    /// together → custom. Any other combination is rejected.
    pub fn from_parts(
        month: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self> {
        match (month, start, end) {
            (None, None, None) => Ok(DateWindow::AllTime),
            (Some(m), None, None) => Self::month(m),
            (None, Some(s), Some(e)) => Self::custom(s, e),
            _ => Err(InsightsError::InvalidFilter(
                "use either a month or both start and end".to_string(),
            )),
        }
    }

    /// Reject windows that cannot match as intended.
    pub fn validate(&self) -> Result<()> {
        match self {
            DateWindow::AllTime => Ok(()),
            DateWindow::Month { month } if is_month_key(month) => Ok(()),
            DateWindow::Month { month } => Err(InsightsError::InvalidFilter(format!(
                "\"{}\" is not a YYYY-MM month",
                month
            ))),
            DateWindow::Custom { start, end } if start <= end => Ok(()),
            DateWindow::Custom { start, end } => Err(InsightsError::InvalidFilter(format!(
                "start {} is after end {}",
                start, end
            ))),
        }
    }

    pub fn contains(&self, record: &Record) -> bool {
        match self {
            DateWindow::AllTime => true,
            DateWindow::Month { month } => record.month() == month,
            DateWindow::Custom { start, end } => (*start..=*end).contains(&record.date()),
        }
    }
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// Product, retailer and date constraints defining a queried subset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub products: Selection,
    #[serde(default)]
    pub retailers: Selection,
    #[serde(default)]
    pub date_window: DateWindow,
}

impl FilterSpec {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_products(mut self, products: Selection) -> Self {
        self.products = products;
        self
    }

    pub fn with_retailers(mut self, retailers: Selection) -> Self {
        self.retailers = retailers;
        self
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.date_window = window;
        self
    }

    /// Parse a spec from JSON, failing on unknown window kinds or bad values.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: FilterSpec = serde_json::from_str(json)
            .map_err(|e| InsightsError::InvalidFilter(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        self.date_window.validate()
    }

    /// Does `record` satisfy every constraint?
    pub fn matches(&self, record: &Record) -> bool {
        self.products.admits(record.product_name())
            && self.retailers.admits(record.chain())
            && self.date_window.contains(record)
    }
}

// ── RecordFilter ──────────────────────────────────────────────────────────────

/// Applies a [`FilterSpec`] to a record set.
pub struct RecordFilter;

impl RecordFilter {
    /// Records matching `spec`, in input order.
    ///
    /// Fails fast on a structurally invalid spec rather than matching
    /// everything or nothing.
    pub fn filter<'a>(records: &'a [Record], spec: &FilterSpec) -> Result<Vec<&'a Record>> {
        spec.validate()?;
        Ok(records.iter().filter(|r| spec.matches(r)).collect())
    }

    /// As [`RecordFilter::filter`] over an already-narrowed subset.
    pub fn refine<'a>(records: &[&'a Record], spec: &FilterSpec) -> Result<Vec<&'a Record>> {
        spec.validate()?;
        Ok(records.iter().copied().filter(|r| spec.matches(r)).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
