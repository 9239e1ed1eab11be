//! Shared utilities for cohort crates.
//!
//! This crate provides common utilities used across the cohort workspace,
//! including Polars `AnyValue` helpers and timestamp parsing.

pub mod polars;
pub mod time;

// Re-export commonly used functions at crate root for convenience
pub use polars::{
    any_to_bool, any_to_f64, any_to_i64, any_to_string, format_numeric, parse_bool, parse_f64,
    parse_i64,
};
pub use time::{TIMESTAMP_FORMAT, any_to_datetime, format_timestamp, parse_timestamp};
