//! Node types for the road-network graph.
//!
//! - [`Intersection`]: a junction keyed by its OpenStreetMap id
//! - [`Coordinate`]: WGS-84 position shared by nodes and street geometry

pub mod coordinate;
pub mod intersection;

pub use coordinate::Coordinate;
pub use intersection::{Intersection, NewIntersection, PoiCategory};
