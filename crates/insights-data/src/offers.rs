//! Per-offer performance after the exclusion window.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use insights_core::models::{Field, Record};
use serde::Serialize;

use crate::exclusion::{ExclusionWindow, ExclusionWindowProcessor, TrimmedGroup};
use crate::windowing::distinct_dates;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSummary {
    pub offer_name: String,
    pub hits: usize,
    /// Distinct `hitId` values among the kept hits.
    pub unique_hits: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub days_active: usize,
    pub avg_per_day: f64,
    pub excluded_dates: Vec<NaiveDate>,
}

impl OfferSummary {
    fn from_group(group: TrimmedGroup<'_>) -> Self {
        let dates = distinct_dates(&group.records);
        let unique_hits = group
            .records
            .iter()
            .filter_map(|r| r.hit_id())
            .collect::<BTreeSet<_>>()
            .len();
        let hits = group.records.len();
        let avg_per_day = if dates.is_empty() {
            0.0
        } else {
            hits as f64 / dates.len() as f64
        };

        Self {
            offer_name: group.key,
            hits,
            unique_hits,
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
            days_active: dates.len(),
            avg_per_day,
            excluded_dates: group.excluded_dates,
        }
    }
}

/// One summary per offer, most hits first, ties by name.
///
/// Records without an offer name are not summarised.
pub fn summarize_offers(records: &[&Record], window: ExclusionWindow) -> Vec<OfferSummary> {
    let mut summaries: Vec<OfferSummary> =
        ExclusionWindowProcessor::apply_by(records, Field::Offer, window)
            .into_iter()
            .map(OfferSummary::from_group)
            .collect();
    summaries.sort_by(|a, b| b.hits.cmp(&a.hits));
    summaries
}
