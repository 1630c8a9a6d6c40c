//! Street: the STREET relationship (Intersection → Intersection).

use serde::{Deserialize, Serialize};

use crate::nodes::coordinate::Coordinate;

/// A directed street between two intersections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    /// Polyline geometry, ordered from `osmid_start` to `osmid_dest`.
    pub coordinates: Vec<Coordinate>,
    /// Locally unique street id.
    pub id: i64,
    pub access: Option<String>,
    pub area: Option<String>,
    pub bridge: Option<String>,
    pub osmid_start: i64,
    pub osmid_dest: i64,
    pub highway: String,
    pub junction: Option<String>,
    /// Parallel-edge key from the source dataset.
    pub key: i64,
    pub array_lanes: Vec<i64>,
    pub length: f64,
    pub max_speed: Option<String>,
    pub name: Option<String>,
    pub one_way: bool,
    pub osmid_edges: Vec<i64>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub transport_service: bool,
    pub tunnel: Option<String>,
    pub width: Option<String>,
    pub orig_id: i64,
    pub weight: f64,
    pub flow: f64,
    pub average_travel_time: f64,
    /// The street is currently impassable.
    pub interrupted: bool,
}

/// Request to create (or merge) a street.
///
/// Collection fields are optional because loaders frequently omit them; an
/// absent collection is stored as an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStreet {
    #[serde(default)]
    pub coordinates: Option<Vec<Coordinate>>,
    pub id: i64,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub bridge: Option<String>,
    pub osmid_start: i64,
    pub osmid_dest: i64,
    #[serde(default)]
    pub highway: String,
    #[serde(default)]
    pub junction: Option<String>,
    #[serde(default)]
    pub key: i64,
    #[serde(default)]
    pub array_lanes: Option<Vec<i64>>,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub max_speed: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default)]
    pub osmid_edges: Option<Vec<i64>>,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub transport_service: bool,
    #[serde(default)]
    pub tunnel: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub orig_id: i64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub flow: f64,
    #[serde(default)]
    pub average_travel_time: f64,
    #[serde(default)]
    pub interrupted: bool,
}

fn default_weight() -> f64 {
    1.0
}

impl NewStreet {
    /// Minimal passable street with unit weight.
    pub fn new(id: i64, osmid_start: i64, osmid_dest: i64) -> Self {
        Self {
            coordinates: None,
            id,
            access: None,
            area: None,
            bridge: None,
            osmid_start,
            osmid_dest,
            highway: String::new(),
            junction: None,
            key: 0,
            array_lanes: None,
            length: 0.0,
            max_speed: None,
            name: None,
            one_way: false,
            osmid_edges: None,
            reference: None,
            transport_service: false,
            tunnel: None,
            width: None,
            orig_id: 0,
            weight: default_weight(),
            flow: 0.0,
            average_travel_time: 0.0,
            interrupted: false,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<Coordinate>) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn interrupted(mut self, interrupted: bool) -> Self {
        self.interrupted = interrupted;
        self
    }
}
