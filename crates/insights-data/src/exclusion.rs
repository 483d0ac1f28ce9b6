//! Burn-in / burn-out trimming of each group's first and last observed days.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use insights_core::models::{Field, Record};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::windowing::{distinct_dates, edges, group_by};

/// Leading distinct dates dropped by the burn-in rule.
pub const BURN_IN_DAYS: usize = 7;
/// Distinct dates a group needs before burn-in applies.
pub const BURN_IN_MIN_DATES: usize = BURN_IN_DAYS + 1;
/// Trailing distinct dates dropped by the burn-out rule.
pub const BURN_OUT_DAYS: usize = 3;
/// Distinct dates a group needs before burn-out applies.
pub const BURN_OUT_MIN_DATES: usize = BURN_OUT_DAYS + 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionWindow {
    pub exclude_first: bool,
    pub exclude_last: bool,
}

impl ExclusionWindow {
    pub fn new(exclude_first: bool, exclude_last: bool) -> Self {
        Self {
            exclude_first,
            exclude_last,
        }
    }

    pub fn is_active(&self) -> bool {
        self.exclude_first || self.exclude_last
    }
}

/// One group after trimming.
#[derive(Debug, Clone)]
pub struct TrimmedGroup<'a> {
    pub key: String,
    /// Records whose date survived, in input order. May be empty when both
    /// rules fire on a short group.
    pub records: Vec<&'a Record>,
    /// Every distinct date the group had before trimming, ascending.
    pub observed_dates: Vec<NaiveDate>,
    /// Dates removed by the window, ascending.
    pub excluded_dates: Vec<NaiveDate>,
}

pub struct ExclusionWindowProcessor;

impl ExclusionWindowProcessor {
    /// Dates to drop from a group's ascending distinct `dates`.
    ///
    /// Each rule fires only when its threshold is met; the two edges are
    /// unioned when they overlap.
    pub fn excluded_dates(dates: &[NaiveDate], window: ExclusionWindow) -> BTreeSet<NaiveDate> {
        let first = if window.exclude_first && dates.len() >= BURN_IN_MIN_DATES {
            BURN_IN_DAYS
        } else {
            0
        };
        let last = if window.exclude_last && dates.len() >= BURN_OUT_MIN_DATES {
            BURN_OUT_DAYS
        } else {
            0
        };

        let (head, tail) = edges(dates, first, last);
        head.iter().chain(tail).copied().collect()
    }

    /// Trim each pre-built group against its own date range.
    pub fn apply<'a>(
        groups: BTreeMap<String, Vec<&'a Record>>,
        window: ExclusionWindow,
    ) -> Vec<TrimmedGroup<'a>> {
        groups
            .into_iter()
            .map(|(key, records)| {
                let observed_dates = distinct_dates(&records);
                let excluded = Self::excluded_dates(&observed_dates, window);
                let kept: Vec<&Record> = if excluded.is_empty() {
                    records
                } else {
                    records
                        .into_iter()
                        .filter(|r| !excluded.contains(&r.date()))
                        .collect()
                };
                if !excluded.is_empty() {
                    debug!(
                        "Group {}: excluded {} of {} dates",
                        key,
                        excluded.len(),
                        observed_dates.len()
                    );
                }
                TrimmedGroup {
                    key,
                    records: kept,
                    observed_dates,
                    excluded_dates: excluded.into_iter().collect(),
                }
            })
            .collect()
    }

    /// Group `records` by `field` and trim each group.
    ///
    /// Records lacking `field` belong to no group and are left out.
    pub fn apply_by<'a>(
        records: &[&'a Record],
        field: Field,
        window: ExclusionWindow,
    ) -> Vec<TrimmedGroup<'a>> {
        let groups = group_by(records, |r| r.field(field).map(|v| v.into_owned()));
        Self::apply(groups, window)
    }

    /// Records surviving the window, flattened across groups.
    pub fn retain<'a>(
        records: &[&'a Record],
        field: Field,
        window: ExclusionWindow,
    ) -> Vec<&'a Record> {
        Self::apply_by(records, field, window)
            .into_iter()
            .flat_map(|g| g.records)
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
