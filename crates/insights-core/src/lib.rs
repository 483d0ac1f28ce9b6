//! Shared types for the receipt insights engine.
//!
//! Holds the record schema, the error taxonomy, raw-row conversion, date
//! helpers, display formatting and the command-line settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{InsightsError, Result};
pub use models::{Field, Granularity, Record, RecordKind};
