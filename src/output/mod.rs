//! Output module for printing run results
//!
//! This module handles:
//! - Per-page statistics with their component fetches
//! - The totals line across all pages
//! - The connection trace table

pub mod stats;

pub use stats::{
    string_max_len, write_conn_trace, write_report, write_stats_header, Stat, URL_LENGTH,
};
