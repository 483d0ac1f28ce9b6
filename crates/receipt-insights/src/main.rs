mod bootstrap;

use std::io::Write;

use anyhow::{Context, Result};
use insights_core::formatting::{format_currency, format_number, percentage};
use insights_core::models::Granularity;
use insights_core::settings::Settings;
use insights_data::aggregator::{ComparisonSummary, Metrics};
use insights_data::analysis::{build_report, ReportOptions};
use insights_data::crosstab::PercentBasis;
use insights_data::exclusion::ExclusionWindow;
use insights_data::filter::{DateWindow, FilterSpec, Selection};
use insights_data::reader::load_records;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Receipt Insights v{} starting", env!("CARGO_PKG_VERSION"));

    let input = settings
        .input
        .clone()
        .context("no input given; pass --input <file or directory>")?;
    let options = report_options(&settings)?;
    tracing::info!(
        "Input: {}, granularity: {}, timezone: {}",
        input.display(),
        options.granularity,
        settings.timezone
    );

    let (records, ingest) = load_records(&input, &settings.timezone)?;
    let mut report = build_report(&records, &options)?;
    report.ingest = Some(ingest);
    tracing::info!(
        "{}",
        summary_line(&report.primary.metrics, report.comparison_summary.as_ref())
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &settings.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }

    Ok(())
}

/// Translate command-line settings into pipeline options.
fn report_options(settings: &Settings) -> Result<ReportOptions> {
    let products = Selection::from_list(&settings.products);
    let retailers = Selection::from_list(&settings.retailers);

    let primary_window = DateWindow::from_parts(
        settings.month.as_deref(),
        settings.start.as_deref(),
        settings.end.as_deref(),
    )?;
    let comparison_window = DateWindow::from_parts(
        settings.compare_month.as_deref(),
        settings.compare_start.as_deref(),
        settings.compare_end.as_deref(),
    )?;

    let primary = FilterSpec::all()
        .with_products(products.clone())
        .with_retailers(retailers.clone())
        .with_window(primary_window);
    // The comparison pass keeps the product and retailer selection and
    // swaps only the date window.
    let comparison = match comparison_window {
        DateWindow::AllTime => None,
        window => Some(
            FilterSpec::all()
                .with_products(products)
                .with_retailers(retailers)
                .with_window(window),
        ),
    };

    Ok(ReportOptions {
        primary,
        comparison,
        granularity: settings.granularity.parse::<Granularity>()?,
        trend_window: settings.trend_window as usize,
        top_products: settings.top_products,
        top_retailers: settings.top_retailers,
        percent_basis: settings.percent_basis.parse::<PercentBasis>()?,
        exclusion: ExclusionWindow::new(settings.exclude_first, settings.exclude_last),
    })
}

/// One-line digest of the primary pass for the log.
fn summary_line(metrics: &Metrics, change: Option<&ComparisonSummary>) -> String {
    let mut line = format!(
        "{} records over {} days, {} total, {} per day",
        format_number(metrics.total_count as f64, 0),
        metrics.days_in_range,
        format_currency(metrics.total_value),
        format_number(metrics.avg_per_day, 1)
    );
    if let Some(change) = change {
        let base = metrics.total_count as i64 - change.count_delta;
        line.push_str(&format!(
            ", {:+} records ({:+.1}%) vs comparison",
            change.count_delta,
            percentage(change.count_delta as f64, base as f64, 1)
        ));
    }
    line
}
