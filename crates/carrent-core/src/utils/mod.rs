//! Utility functions for display formatting.

pub mod format;

pub use format::{format_eth, format_timestamp, maps_url, shorten_address};
