//! Report pipeline.
//!
//! Runs the primary filter pass and, when requested, an independent
//! comparison pass over the same record set, returning an
//! [`InsightsReport`] ready for JSON output.

use std::collections::BTreeSet;

use chrono::Utc;
use insights_core::error::Result;
use insights_core::models::{Field, Granularity, Record, RecordKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{
    product_label, Aggregator, ComparisonSummary, DistributionEntry, Metrics, TimeSeriesPoint,
};
use crate::brand::{BrandMapping, BrandPrefixDetector};
use crate::crosstab::{CrossTabView, CrossTabulator, PercentBasis};
use crate::exclusion::{ExclusionWindow, ExclusionWindowProcessor};
use crate::filter::{FilterSpec, RecordFilter};
use crate::offers::{summarize_offers, OfferSummary};
use crate::reader::IngestSummary;
use crate::trend::{trend, DEFAULT_TREND_WINDOW};

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything a report run needs besides the records.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub primary: FilterSpec,
    pub comparison: Option<FilterSpec>,
    pub granularity: Granularity,
    pub trend_window: usize,
    /// Cross-tab rows shown; zero shows all.
    pub top_products: usize,
    /// Cross-tab columns shown; zero shows all.
    pub top_retailers: usize,
    pub percent_basis: PercentBasis,
    pub exclusion: ExclusionWindow,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            primary: FilterSpec::all(),
            comparison: None,
            granularity: Granularity::Daily,
            trend_window: DEFAULT_TREND_WINDOW,
            top_products: 10,
            top_retailers: 10,
            percent_basis: PercentBasis::Row,
            exclusion: ExclusionWindow::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: String,
    pub records_total: usize,
    pub granularity: Granularity,
    pub trend_window: usize,
    pub exclusion: ExclusionWindow,
}

/// Offer-hit aggregates for one filter pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferReport {
    /// Hits remaining after the exclusion window.
    pub hits: usize,
    pub gender_distribution: Vec<DistributionEntry>,
    pub age_group_distribution: Vec<DistributionEntry>,
    pub rank_distribution: Vec<DistributionEntry>,
    pub response_by_age_group: CrossTabView,
    pub offers: Vec<OfferSummary>,
}

/// Aggregates for the records matching one [`FilterSpec`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetReport {
    pub filter: FilterSpec,
    /// Over every matching record, sales and offer hits alike.
    pub metrics: Metrics,
    pub time_series: Vec<TimeSeriesPoint>,
    /// Moving average of `time_series` counts, aligned index for index.
    pub trend: Vec<Option<f64>>,
    pub day_of_week_distribution: Vec<DistributionEntry>,
    /// Over matching sales only.
    pub retailer_distribution: Vec<DistributionEntry>,
    pub product_distribution: Vec<DistributionEntry>,
    pub product_by_retailer: CrossTabView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<OfferReport>,
}

/// The complete output of [`build_report`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsReport {
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestSummary>,
    pub brands: BrandMapping,
    pub primary: SubsetReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<SubsetReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_summary: Option<ComparisonSummary>,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full report pipeline over `records`.
///
/// Fails only when a filter spec is structurally invalid.
pub fn build_report(records: &[Record], options: &ReportOptions) -> Result<InsightsReport> {
    // Validate both specs before doing any work.
    options.primary.validate()?;
    if let Some(spec) = &options.comparison {
        spec.validate()?;
    }

    let brands = detect_brands(records);

    let primary = build_subset(records, &options.primary, &brands, options)?;
    info!(
        "Primary pass: {} of {} records",
        primary.metrics.total_count,
        records.len()
    );

    let comparison = match &options.comparison {
        Some(spec) => {
            let subset = build_subset(records, spec, &brands, options)?;
            info!(
                "Comparison pass: {} of {} records",
                subset.metrics.total_count,
                records.len()
            );
            Some(subset)
        }
        None => None,
    };
    let comparison_summary = comparison
        .as_ref()
        .map(|c| ComparisonSummary::between(&primary.metrics, &c.metrics));

    Ok(InsightsReport {
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339(),
            records_total: records.len(),
            granularity: options.granularity,
            trend_window: options.trend_window,
            exclusion: options.exclusion,
        },
        ingest: None,
        brands,
        primary,
        comparison,
        comparison_summary,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Brand labels over the distinct product names of the whole record set.
fn detect_brands(records: &[Record]) -> BrandMapping {
    let names: BTreeSet<&str> = records.iter().filter_map(|r| r.product_name()).collect();
    let names: Vec<&str> = names.into_iter().collect();
    let brands = BrandPrefixDetector::detect(&names);
    debug!(
        "Brand detection: {} names, {} mapped",
        names.len(),
        brands.len()
    );
    brands
}

fn build_subset(
    records: &[Record],
    spec: &FilterSpec,
    brands: &BrandMapping,
    options: &ReportOptions,
) -> Result<SubsetReport> {
    let matching = RecordFilter::filter(records, spec)?;
    let (sales, hits): (Vec<&Record>, Vec<&Record>) = matching
        .iter()
        .copied()
        .partition(|r| r.kind() == RecordKind::Sale);

    let time_series = Aggregator::time_series(&matching, options.granularity);
    let trend = trend(&time_series, options.trend_window);

    let product_by_retailer = CrossTabulator::tabulate(&sales, Field::Product, Field::Retailer)
        .view(
            options.top_products,
            options.top_retailers,
            options.percent_basis,
        )
        .label_rows(|name| product_label(name, brands));

    let offers = if hits.is_empty() {
        None
    } else {
        Some(build_offer_report(&hits, options))
    };

    Ok(SubsetReport {
        filter: spec.clone(),
        metrics: Aggregator::metrics(&matching),
        time_series,
        trend,
        day_of_week_distribution: Aggregator::distribution_by(&matching, Field::DayOfWeek),
        retailer_distribution: Aggregator::distribution_by(&sales, Field::Retailer),
        product_distribution: Aggregator::product_distribution(&sales, brands),
        product_by_retailer,
        offers,
    })
}

fn build_offer_report(hits: &[&Record], options: &ReportOptions) -> OfferReport {
    let kept: Vec<&Record> = if options.exclusion.is_active() {
        ExclusionWindowProcessor::retain(hits, Field::Offer, options.exclusion)
    } else {
        hits.to_vec()
    };
    debug!(
        "Exclusion window kept {} of {} offer hits",
        kept.len(),
        hits.len()
    );

    OfferReport {
        hits: kept.len(),
        gender_distribution: Aggregator::distribution_present(&kept, Field::Gender),
        age_group_distribution: Aggregator::distribution_present(&kept, Field::AgeGroup),
        rank_distribution: Aggregator::distribution_present(&kept, Field::Rank),
        response_by_age_group: CrossTabulator::tabulate(&kept, Field::Response, Field::AgeGroup)
            .view(0, 0, options.percent_basis),
        offers: summarize_offers(hits, options.exclusion),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DateWindow, Selection};
    use chrono::{Duration, NaiveDate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sale(d: &str, product: &str, chain: &str, total: f64) -> Record {
        Record::on_date(RecordKind::Sale, date(d))
            .with_product(product)
            .with_chain(chain)
            .with_total(total)
    }

    fn hit(offer: &str, day: i64, hit_id: &str, gender: &str) -> Record {
        Record::on_date(RecordKind::Offer, date("2024-02-01") + Duration::days(day))
            .with_offer(offer)
            .with_hit_id(hit_id)
            .with_gender(gender)
            .with_age_group("25-34")
            .with_response("Yes")
    }

    fn sample() -> Vec<Record> {
        vec![
            sale("2024-01-01", "Acme Choco Bar", "A", 10.0),
            sale("2024-01-02", "Acme Choco Drink", "B", 5.0),
            sale("2024-01-02", "Acme Choco Drink", "A", 5.0),
            sale("2024-02-03", "Zeta Cola", "B", 2.0),
        ]
    }

    #[test]
    fn test_build_report_primary_only() {
        let records = sample();
        let report = build_report(&records, &ReportOptions::default()).unwrap();

        assert_eq!(report.metadata.records_total, 4);
        assert_eq!(report.primary.metrics.total_count, 4);
        assert!(report.comparison.is_none());
        assert!(report.comparison_summary.is_none());
        assert!(report.primary.offers.is_none());

        assert_eq!(report.brands.brand_prefix("Acme Choco Bar"), "Acme");
        let drink = &report.primary.product_distribution[0];
        assert_eq!(drink.name, "Acme Choco Drink");
        assert_eq!(drink.label, "Choco Drink");

        assert_eq!(report.primary.time_series.len(), 3);
        assert_eq!(report.primary.trend.len(), 3);
        assert!(report.primary.trend.iter().all(Option::is_none));
    }

    #[test]
    fn test_build_report_with_comparison() {
        let records = sample();
        let options = ReportOptions {
            primary: FilterSpec::all().with_window(DateWindow::month("2024-01").unwrap()),
            comparison: Some(
                FilterSpec::all().with_window(DateWindow::month("2024-02").unwrap()),
            ),
            ..ReportOptions::default()
        };
        let report = build_report(&records, &options).unwrap();

        assert_eq!(report.primary.metrics.total_count, 3);
        let comparison = report.comparison.as_ref().unwrap();
        assert_eq!(comparison.metrics.total_count, 1);

        let summary = report.comparison_summary.unwrap();
        assert_eq!(summary.count_delta, 2);
        assert!((summary.count_change_pct - 200.0).abs() < 1e-9);
        assert!((summary.value_delta - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_report_crosstab_uses_display_labels() {
        let records = sample();
        let options = ReportOptions {
            top_products: 1,
            ..ReportOptions::default()
        };
        let report = build_report(&records, &options).unwrap();
        let view = &report.primary.product_by_retailer;
        assert_eq!(view.rows, vec!["Acme Choco Drink"]);
        assert_eq!(view.row_labels, vec!["Choco Drink"]);
        assert_eq!(view.hidden_rows, 2);
        assert_eq!(view.grand_total, 4);
    }

    #[test]
    fn test_build_report_offers_with_exclusion() {
        let mut records = sample();
        for d in 0..12 {
            records.push(hit("Promo", d, &format!("h{}", d), if d % 2 == 0 { "F" } else { "M" }));
        }
        let options = ReportOptions {
            exclusion: ExclusionWindow::new(true, true),
            ..ReportOptions::default()
        };
        let report = build_report(&records, &options).unwrap();

        let offers = report.primary.offers.as_ref().unwrap();
        assert_eq!(offers.hits, 2);
        assert_eq!(offers.offers.len(), 1);
        assert_eq!(offers.offers[0].hits, 2);
        let genders: usize = offers.gender_distribution.iter().map(|e| e.count).sum();
        assert_eq!(genders, 2);
        assert_eq!(offers.response_by_age_group.grand_total, 2);

        // Sales figures ignore offer hits.
        let retail: usize = report
            .primary
            .retailer_distribution
            .iter()
            .map(|e| e.count)
            .sum();
        assert_eq!(retail, 4);
        assert_eq!(report.primary.metrics.total_count, 16);
    }

    #[test]
    fn test_build_report_rejects_invalid_comparison() {
        let records = sample();
        let options = ReportOptions {
            comparison: Some(FilterSpec::all().with_window(DateWindow::Month {
                month: "2024-13".to_string(),
            })),
            ..ReportOptions::default()
        };
        assert!(build_report(&records, &options).is_err());
    }

    #[test]
    fn test_build_report_empty_subset_is_zeroed() {
        let records = sample();
        let options = ReportOptions {
            primary: FilterSpec::all().with_products(Selection::only(["Nothing"])),
            granularity: Granularity::Hourly,
            ..ReportOptions::default()
        };
        let report = build_report(&records, &options).unwrap();
        assert_eq!(report.primary.metrics, Metrics::default());
        assert!(report.primary.product_distribution.is_empty());
        assert_eq!(report.primary.time_series.len(), 24);
        assert!(report.primary.product_by_retailer.rows.is_empty());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let records = sample();
        let report = build_report(&records, &ReportOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["primary"]["metrics"]["avgPerDay"].is_number());
        assert!(json["primary"]["productByRetailer"]["rowTotals"].is_array());
        assert!(json.get("comparison").is_none());
        assert_eq!(json["brands"]["Zeta Cola"]["displayName"], "Zeta Cola");
    }
}
