//! Shared utilities.
//!
//! - Date/time helpers for the `Control` freshness timestamp
//! - Great-circle distance used by the in-memory backend

pub mod datetime;
pub mod geo;

pub use datetime::{format_local_datetime, parse_local_datetime};
pub use geo::point_distance;
