//! Grouped distributions, time-bucketed series and summary metrics over a
//! filtered record set.
//!
//! Every function here is total: empty input yields zeroed or empty output
//! and records lacking a grouping field are left out of that aggregate only.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use insights_core::formatting::{format_hour_label, format_month_label, format_week_label, share};
use insights_core::models::{Field, Granularity, Record};
use insights_core::time_utils::week_start;
use serde::Serialize;

use crate::brand::BrandMapping;
use crate::windowing::{group_by, group_by_date};

/// Bucket name for records missing the grouping field.
pub const UNKNOWN: &str = "Unknown";

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Summary-card figures for one filtered subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_count: usize,
    /// Distinct record dates, ascending.
    pub unique_dates: Vec<NaiveDate>,
    pub days_in_range: usize,
    /// Sum of `receiptTotal`; absent totals count as zero.
    pub total_value: f64,
    /// `total_count / days_in_range`, zero when there are no dates.
    pub avg_per_day: f64,
}

// ── DistributionEntry ─────────────────────────────────────────────────────────

/// One bucket of a grouped count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEntry {
    /// The raw field value (or [`UNKNOWN`]).
    pub name: String,
    /// Display text; differs from `name` for products, days and hours.
    pub label: String,
    pub count: usize,
    /// Share of the whole filtered set, unrounded.
    pub percentage: f64,
}

// ── TimeSeriesPoint ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Sortable bucket key: `"09"`, `"2024-01-07"` or `"2024-01"`.
    pub key: String,
    pub bucket_label: String,
    pub count: usize,
    pub sum_value: f64,
    pub avg_value: f64,
}

impl TimeSeriesPoint {
    fn from_bucket(key: String, bucket_label: String, records: &[&Record]) -> Self {
        let count = records.len();
        let sum_value = total_value(records);
        Self {
            key,
            bucket_label,
            count,
            sum_value,
            avg_value: if count == 0 {
                0.0
            } else {
                sum_value / count as f64
            },
        }
    }
}

// ── ComparisonSummary ─────────────────────────────────────────────────────────

/// How the primary subset moved relative to the comparison subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub count_delta: i64,
    pub count_change_pct: f64,
    pub value_delta: f64,
    pub value_change_pct: f64,
    pub avg_per_day_delta: f64,
}

impl ComparisonSummary {
    /// Deltas of `primary` over the `comparison` base.
    pub fn between(primary: &Metrics, comparison: &Metrics) -> Self {
        let count_delta = primary.total_count as i64 - comparison.total_count as i64;
        let value_delta = primary.total_value - comparison.total_value;
        Self {
            count_delta,
            count_change_pct: share(count_delta as f64, comparison.total_count as f64),
            value_delta,
            value_change_pct: share(value_delta, comparison.total_value),
            avg_per_day_delta: primary.avg_per_day - comparison.avg_per_day,
        }
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper computing aggregates over filtered records.
pub struct Aggregator;

impl Aggregator {
    pub fn metrics(records: &[&Record]) -> Metrics {
        let unique_dates: Vec<NaiveDate> = group_by_date(records).into_keys().collect();
        let days_in_range = unique_dates.len();
        let avg_per_day = if days_in_range == 0 {
            0.0
        } else {
            records.len() as f64 / days_in_range as f64
        };

        Metrics {
            total_count: records.len(),
            unique_dates,
            days_in_range,
            total_value: total_value(records),
            avg_per_day,
        }
    }

    /// Counts per value of `field`, largest first.
    ///
    /// Records missing the field are counted under [`UNKNOWN`], so the
    /// percentages of a non-empty result sum to 100.
    pub fn distribution_by(records: &[&Record], field: Field) -> Vec<DistributionEntry> {
        let groups = group_by(records, |r| {
            Some(
                r.field(field)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|| UNKNOWN.to_string()),
            )
        });
        Self::entries(groups, records.len(), |name| (name.clone(), field_label(field, name)))
    }

    /// Counts per value of `field`, leaving out records that lack it.
    ///
    /// Percentages stay relative to the full set, so they sum to less than
    /// 100 when anything was left out.
    pub fn distribution_present(records: &[&Record], field: Field) -> Vec<DistributionEntry> {
        let groups = group_by(records, |r| r.field(field).map(|v| v.into_owned()));
        Self::entries(groups, records.len(), |name| (name.clone(), field_label(field, name)))
    }

    /// Product counts labelled through `brands`.
    pub fn product_distribution(
        records: &[&Record],
        brands: &BrandMapping,
    ) -> Vec<DistributionEntry> {
        // Keyed on the Option so a product literally named "Unknown" stays
        // apart from the missing-name bucket.
        let groups = group_by(records, |r| Some(r.product_name().map(str::to_string)));
        Self::entries(groups, records.len(), |name| match name {
            Some(name) => (name.to_string(), product_label(name, brands)),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        })
    }

    /// Counts and value sums per time bucket, ascending by key.
    pub fn time_series(records: &[&Record], granularity: Granularity) -> Vec<TimeSeriesPoint> {
        match granularity {
            Granularity::Hourly => {
                let groups = group_by(records, Record::hour_of_day);
                (0..24u8)
                    .map(|hour| {
                        let bucket = groups.get(&hour).map(Vec::as_slice).unwrap_or(&[]);
                        TimeSeriesPoint::from_bucket(
                            format!("{:02}", hour),
                            format_hour_label(hour),
                            bucket,
                        )
                    })
                    .collect()
            }
            Granularity::Daily => group_by_date(records)
                .into_iter()
                .map(|(date, bucket)| {
                    let key = date.format("%Y-%m-%d").to_string();
                    TimeSeriesPoint::from_bucket(key.clone(), key, &bucket)
                })
                .collect(),
            Granularity::Weekly => {
                group_by(records, |r| Some(week_start(r.date(), r.day_of_week())))
                    .into_iter()
                    .map(|(start, bucket)| {
                        TimeSeriesPoint::from_bucket(
                            start.format("%Y-%m-%d").to_string(),
                            format_week_label(start),
                            &bucket,
                        )
                    })
                    .collect()
            }
            Granularity::Monthly => group_by(records, |r| Some(r.month().to_string()))
                .into_iter()
                .map(|(month, bucket)| {
                    let label = format_month_label(&month);
                    TimeSeriesPoint::from_bucket(month, label, &bucket)
                })
                .collect(),
        }
    }

    /// `name_fn` turns a group key into its `(name, label)` pair.
    fn entries<K, F>(
        groups: BTreeMap<K, Vec<&Record>>,
        total: usize,
        name_fn: F,
    ) -> Vec<DistributionEntry>
    where
        F: Fn(&K) -> (String, String),
    {
        let mut entries: Vec<DistributionEntry> = groups
            .into_iter()
            .map(|(key, bucket)| {
                let (name, label) = name_fn(&key);
                DistributionEntry {
                    name,
                    label,
                    count: bucket.len(),
                    percentage: share(bucket.len() as f64, total as f64),
                }
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        entries
    }
}

/// Display label for a product: the brand display name, or the shortened
/// name when no brand prefix was found.
pub fn product_label(name: &str, brands: &BrandMapping) -> String {
    let display = brands.display_name(name);
    if display == name {
        fallback_display_name(name)
    } else {
        display.to_string()
    }
}

/// Shorten a long name the brand detector left untouched.
///
/// Names of three or four words lose their first word, five or more lose
/// the first two.
pub fn fallback_display_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.len() {
        0..=2 => name.to_string(),
        3 | 4 => words[1..].join(" "),
        _ => words[2..].join(" "),
    }
}

fn field_label(field: Field, name: &str) -> String {
    if name == UNKNOWN {
        return name.to_string();
    }
    match field {
        Field::DayOfWeek => name
            .parse::<usize>()
            .ok()
            .and_then(|d| DAY_NAMES.get(d))
            .map(|d| d.to_string())
            .unwrap_or_else(|| name.to_string()),
        Field::HourOfDay => name
            .parse::<u8>()
            .map(format_hour_label)
            .unwrap_or_else(|_| name.to_string()),
        Field::Month => format_month_label(name),
        _ => name.to_string(),
    }
}

fn total_value(records: &[&Record]) -> f64 {
    records.iter().filter_map(|r| r.receipt_total()).sum()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
