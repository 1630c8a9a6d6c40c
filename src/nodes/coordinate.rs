//! Coordinate: a WGS-84 position in decimal degrees.

use serde::{Deserialize, Serialize};

/// Longitude/latitude pair. Equality is by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}
