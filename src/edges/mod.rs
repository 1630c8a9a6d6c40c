//! Edge types for the road-network graph.
//!
//! One relationship type: [`Street`], a directed `STREET` edge between two
//! intersections, identified by a locally unique integer id.

pub mod street;

pub use street::{NewStreet, Street};
