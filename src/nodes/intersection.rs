//! Intersection: a road-network node keyed by its OpenStreetMap id.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edges::street::Street;
use crate::nodes::coordinate::Coordinate;

/// An intersection as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intersection {
    pub coordinate: Coordinate,
    /// Category of the node within the road network (e.g. `traffic_signals`).
    pub highway: String,
    /// OpenStreetMap id; unique, never reused.
    pub osmid: i64,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub betweenness: f64,
    pub parking: bool,
    pub hospital: bool,
    pub bus_stop: bool,
    pub museum: bool,
    /// Outgoing streets keyed by street id; only populated by full reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streets: Option<BTreeMap<i64, Street>>,
}

/// Request to create (or merge) an intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntersection {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub highway: String,
    pub osmid: i64,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub hospital: bool,
    #[serde(default)]
    pub bus_stop: bool,
    #[serde(default)]
    pub museum: bool,
}

impl NewIntersection {
    /// Untagged intersection at `coordinate`.
    pub fn new(osmid: i64, coordinate: Coordinate, highway: impl Into<String>) -> Self {
        Self {
            coordinate,
            highway: highway.into(),
            osmid,
            reference: None,
            parking: false,
            hospital: false,
            bus_stop: false,
            museum: false,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_tag(mut self, category: PoiCategory) -> Self {
        match category {
            PoiCategory::Parking => self.parking = true,
            PoiCategory::Hospital => self.hospital = true,
            PoiCategory::BusStop => self.bus_stop = true,
            PoiCategory::Museum => self.museum = true,
        }
        self
    }
}

/// Boolean point-of-interest tags carried by intersections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoiCategory {
    Parking,
    Hospital,
    BusStop,
    Museum,
}

impl PoiCategory {
    /// Name of the boolean property holding this tag.
    pub fn property(self) -> &'static str {
        match self {
            PoiCategory::Parking => "parking",
            PoiCategory::Hospital => "hospital",
            PoiCategory::BusStop => "busStop",
            PoiCategory::Museum => "museum",
        }
    }
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}
