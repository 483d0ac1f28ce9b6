//! Aggregation and brand-normalisation engine for receipt insights.
//!
//! Loads flat redemption records, infers brand prefixes over product names
//! and computes filtered distributions, time series, cross-tabulations and
//! per-offer summaries. Everything past [`reader`] is a pure function of the
//! in-memory record set.

pub mod aggregator;
pub mod analysis;
pub mod brand;
pub mod crosstab;
pub mod exclusion;
pub mod filter;
pub mod offers;
pub mod reader;
pub mod trend;
pub mod windowing;

pub use insights_core as core;
