//! Two-dimensional count matrices between categorical record fields.
//!
//! Totals always come from the full matrix. A truncated [`CrossTabView`]
//! keeps those totals so percentages show true share rather than share of
//! the visible cells.

use std::collections::HashMap;

use insights_core::error::{InsightsError, Result};
use insights_core::formatting::share;
use insights_core::models::{Field, Record};
use serde::{Deserialize, Serialize};

/// Which total a cell percentage is relative to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentBasis {
    /// Share of the row's total captured by each column.
    #[default]
    Row,
    /// Share of the column's total captured by each row.
    Column,
}

impl std::str::FromStr for PercentBasis {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "row" => Ok(PercentBasis::Row),
            "column" | "col" => Ok(PercentBasis::Column),
            other => Err(InsightsError::Config(format!(
                "percent basis must be row or column, got {}",
                other
            ))),
        }
    }
}

// ── CrossTabMatrix ────────────────────────────────────────────────────────────

/// Full, untruncated counts. Rows and columns are ordered by total
/// descending, then by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabMatrix {
    pub row_field: Field,
    pub column_field: Field,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `counts[row][column]`.
    pub counts: Vec<Vec<usize>>,
    pub row_totals: Vec<usize>,
    pub column_totals: Vec<usize>,
    pub grand_total: usize,
}

impl CrossTabMatrix {
    pub fn is_empty(&self) -> bool {
        self.grand_total == 0
    }

    /// Cell percentages relative to the row or column totals.
    pub fn percentages(&self, basis: PercentBasis) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, &n)| self.cell_share(r, c, n, basis))
                    .collect()
            })
            .collect()
    }

    /// The `top_rows` × `top_columns` corner of the matrix. Zero keeps every
    /// row or column.
    pub fn view(&self, top_rows: usize, top_columns: usize, basis: PercentBasis) -> CrossTabView {
        let nr = limit(top_rows, self.rows.len());
        let nc = limit(top_columns, self.columns.len());

        let counts: Vec<Vec<usize>> = self.counts[..nr]
            .iter()
            .map(|row| row[..nc].to_vec())
            .collect();
        let percentages = (0..nr)
            .map(|r| {
                (0..nc)
                    .map(|c| self.cell_share(r, c, self.counts[r][c], basis))
                    .collect()
            })
            .collect();

        CrossTabView {
            basis,
            rows: self.rows[..nr].to_vec(),
            row_labels: self.rows[..nr].to_vec(),
            columns: self.columns[..nc].to_vec(),
            counts,
            percentages,
            row_totals: self.row_totals[..nr].to_vec(),
            column_totals: self.column_totals[..nc].to_vec(),
            grand_total: self.grand_total,
            hidden_rows: self.rows.len() - nr,
            hidden_columns: self.columns.len() - nc,
        }
    }

    fn cell_share(&self, r: usize, c: usize, n: usize, basis: PercentBasis) -> f64 {
        let base = match basis {
            PercentBasis::Row => self.row_totals[r],
            PercentBasis::Column => self.column_totals[c],
        };
        share(n as f64, base as f64)
    }
}

fn limit(top: usize, len: usize) -> usize {
    if top == 0 {
        len
    } else {
        top.min(len)
    }
}

// ── CrossTabView ──────────────────────────────────────────────────────────────

/// A display-ready slice of a [`CrossTabMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabView {
    pub basis: PercentBasis,
    pub rows: Vec<String>,
    pub row_labels: Vec<String>,
    pub columns: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    pub percentages: Vec<Vec<f64>>,
    /// Totals of the visible rows, taken from the full matrix.
    pub row_totals: Vec<usize>,
    pub column_totals: Vec<usize>,
    pub grand_total: usize,
    pub hidden_rows: usize,
    pub hidden_columns: usize,
}

impl CrossTabView {
    /// Replace row labels, e.g. with brand display names.
    pub fn label_rows<F>(mut self, label: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        self.row_labels = self.rows.iter().map(|r| label(r)).collect();
        self
    }
}

// ── CrossTabulator ────────────────────────────────────────────────────────────

pub struct CrossTabulator;

impl CrossTabulator {
    /// Count records by (`row_field`, `column_field`).
    ///
    /// Records missing either value are not counted.
    pub fn tabulate(records: &[&Record], row_field: Field, column_field: Field) -> CrossTabMatrix {
        let mut cells: HashMap<(String, String), usize> = HashMap::new();
        let mut row_sums: HashMap<String, usize> = HashMap::new();
        let mut col_sums: HashMap<String, usize> = HashMap::new();

        for record in records {
            let (Some(r), Some(c)) = (record.field(row_field), record.field(column_field)) else {
                continue;
            };
            let (r, c) = (r.into_owned(), c.into_owned());
            *row_sums.entry(r.clone()).or_default() += 1;
            *col_sums.entry(c.clone()).or_default() += 1;
            *cells.entry((r, c)).or_default() += 1;
        }

        let (rows, row_totals) = ranked(row_sums);
        let (columns, column_totals) = ranked(col_sums);

        let counts = rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| {
                        cells
                            .get(&(r.clone(), c.clone()))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        CrossTabMatrix {
            row_field,
            column_field,
            grand_total: row_totals.iter().sum(),
            rows,
            columns,
            counts,
            row_totals,
            column_totals,
        }
    }
}

fn ranked(sums: HashMap<String, usize>) -> (Vec<String>, Vec<usize>) {
    let mut pairs: Vec<(String, usize)> = sums.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.into_iter().unzip()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
