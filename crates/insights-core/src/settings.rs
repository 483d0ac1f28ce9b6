use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::time_utils::TimezoneHandler;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Aggregate receipt redemptions and offer hits into report data
#[derive(Parser, Debug, Clone)]
#[command(
    name = "receipt-insights",
    about = "Aggregate receipt redemptions and offer hits into report data",
    version
)]
pub struct Settings {
    /// Record file (.json / .jsonl) or directory to scan
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Restrict to a product (repeatable; default all)
    #[arg(long = "product")]
    pub products: Vec<String>,

    /// Restrict to a retailer chain (repeatable; default all)
    #[arg(long = "retailer")]
    pub retailers: Vec<String>,

    /// Primary window: a single month (YYYY-MM)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub month: Option<String>,

    /// Primary window: first day (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Primary window: last day (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Comparison window: a single month (YYYY-MM)
    #[arg(long, conflicts_with_all = ["compare_start", "compare_end"])]
    pub compare_month: Option<String>,

    /// Comparison window: first day (YYYY-MM-DD)
    #[arg(long, requires = "compare_end")]
    pub compare_start: Option<String>,

    /// Comparison window: last day (YYYY-MM-DD)
    #[arg(long, requires = "compare_start")]
    pub compare_end: Option<String>,

    /// Time-series bucket width
    #[arg(long, default_value = "daily", value_parser = ["hourly", "daily", "weekly", "monthly"])]
    pub granularity: String,

    /// Trailing moving-average window (points)
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(u32).range(1..=365))]
    pub trend_window: u32,

    /// Products kept in the cross-tab view
    #[arg(long, default_value = "10")]
    pub top_products: usize,

    /// Retailers kept in the cross-tab view
    #[arg(long, default_value = "10")]
    pub top_retailers: usize,

    /// Cross-tab percentage basis
    #[arg(long, default_value = "row", value_parser = ["row", "column"])]
    pub percent_basis: String,

    /// Drop each offer's first 7 observed days
    #[arg(long)]
    pub exclude_first: bool,

    /// Drop each offer's last 3 observed days
    #[arg(long)]
    pub exclude_last: bool,

    /// Timezone for timestamp conversion (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Write the JSON report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.receipt-insights/last_used.json`.
///
/// Filters and windows are deliberately not persisted: each run states its
/// own subset.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_window: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_products: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_retailers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_basis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl LastUsedParams {
    /// Default location of the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".receipt-insights").join("last_used.json")
    }

    /// Load persisted params; `Default` when absent or unreadable.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, merge last-used params and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit args and path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if settings.input.is_none() {
            settings.input = last.input;
        }
        if !is_arg_explicitly_set(&matches, "granularity") {
            if let Some(v) = last.granularity {
                settings.granularity = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "trend_window") {
            if let Some(v) = last.trend_window.filter(|w| *w >= 1) {
                settings.trend_window = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_products") {
            if let Some(v) = last.top_products {
                settings.top_products = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_retailers") {
            if let Some(v) = last.top_retailers {
                settings.top_retailers = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "percent_basis") {
            if let Some(v) = last.percent_basis {
                settings.percent_basis = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolve the `"auto"` timezone, replace an unknown one with UTC and
    /// apply `--debug`.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        } else if !TimezoneHandler::validate_timezone(&settings.timezone) {
            warn!(
                "Settings: unknown timezone \"{}\", using UTC",
                settings.timezone
            );
            settings.timezone = "UTC".to_string();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            input: s.input.clone(),
            granularity: Some(s.granularity.clone()),
            trend_window: Some(s.trend_window),
            top_products: Some(s.top_products),
            top_retailers: Some(s.top_retailers),
            percent_basis: Some(s.percent_basis.clone()),
            timezone: Some(s.timezone.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied on the command line.
///
/// clap keys args by field name (underscores), not by flag spelling.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| (*s).into()).collect()
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            input: Some(PathBuf::from("/data/receipts")),
            granularity: Some("weekly".to_string()),
            trend_window: Some(14),
            top_products: Some(5),
            top_retailers: Some(8),
            percent_basis: Some("column".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.input, Some(PathBuf::from("/data/receipts")));
        assert_eq!(loaded.granularity, Some("weekly".to_string()));
        assert_eq!(loaded.trend_window, Some(14));
        assert_eq!(loaded.top_products, Some(5));
        assert_eq!(loaded.top_retailers, Some(8));
        assert_eq!(loaded.percent_basis, Some("column".to_string()));
        assert_eq!(loaded.timezone, Some("Europe/Berlin".to_string()));
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.input.is_none());
        assert!(loaded.granularity.is_none());
        assert!(loaded.timezone.is_none());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(LastUsedParams::load_from(&path).granularity.is_none());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());
        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    // ── Settings parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["receipt-insights"]);
        assert!(settings.input.is_none());
        assert!(settings.products.is_empty());
        assert!(settings.retailers.is_empty());
        assert!(settings.month.is_none());
        assert_eq!(settings.granularity, "daily");
        assert_eq!(settings.trend_window, 7);
        assert_eq!(settings.top_products, 10);
        assert_eq!(settings.top_retailers, 10);
        assert_eq!(settings.percent_basis, "row");
        assert!(!settings.exclude_first);
        assert!(!settings.exclude_last);
        assert_eq!(settings.timezone, "auto");
        assert_eq!(settings.log_level, "INFO");
    }

    #[test]
    fn test_settings_repeatable_filters() {
        let settings = Settings::parse_from([
            "receipt-insights",
            "--product",
            "Acme Bar",
            "--product",
            "Acme Drink",
            "--retailer",
            "Mart",
        ]);
        assert_eq!(settings.products, vec!["Acme Bar", "Acme Drink"]);
        assert_eq!(settings.retailers, vec!["Mart"]);
    }

    #[test]
    fn test_settings_month_conflicts_with_range() {
        let result = Settings::try_parse_from([
            "receipt-insights",
            "--month",
            "2024-01",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_start_requires_end() {
        let result = Settings::try_parse_from(["receipt-insights", "--start", "2024-01-01"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_rejects_zero_trend_window() {
        let result = Settings::try_parse_from(["receipt-insights", "--trend-window", "0"]);
        assert!(result.is_err());
    }

    // ── load_with_last_used_impl ──────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            input: Some(PathBuf::from("/data/offers.jsonl")),
            granularity: Some("monthly".to_string()),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["receipt-insights"]), &config_path);
        assert_eq!(settings.input, Some(PathBuf::from("/data/offers.jsonl")));
        assert_eq!(settings.granularity, "monthly");
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            granularity: Some("monthly".to_string()),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["receipt-insights", "--granularity", "hourly"]),
            &config_path,
        );
        assert_eq!(settings.granularity, "hourly");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(
            args(&["receipt-insights", "--clear", "--timezone", "UTC"]),
            &config_path,
        );
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            args(&["receipt-insights", "--debug", "--timezone", "UTC"]),
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["receipt-insights", "--granularity", "weekly", "--timezone", "UTC"]),
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.granularity, Some("weekly".to_string()));
        assert_eq!(loaded.timezone, Some("UTC".to_string()));
    }

    #[test]
    fn test_load_with_last_used_resolves_auto_timezone() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            args(&["receipt-insights"]),
            &tmp_config_path(&tmp),
        );
        assert_ne!(settings.timezone, "auto");
        assert!(!settings.timezone.is_empty());
    }

    #[test]
    fn test_load_with_last_used_unknown_timezone_falls_back_to_utc() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        let settings = Settings::load_with_last_used_impl(
            args(&["receipt-insights", "--timezone", "Mars/Olympus"]),
            &config_path,
        );
        assert_eq!(settings.timezone, "UTC");

        let persisted = LastUsedParams::load_from(&config_path);
        assert_eq!(persisted.timezone, Some("UTC".to_string()));
    }
}
