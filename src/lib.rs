//! # roadgraph
//!
//! Graph access layer for a road-network digital twin stored in Neo4j.
//!
//! ## Architecture
//!
//! - **Dual pools**: reads go to a replica, writes to the primary inside an
//!   explicit transaction ([`connection::StoreHandle`])
//! - **Parameterized statements**: every operation renders to fixed Cypher
//!   plus bound parameters ([`query`])
//! - **Typed results**: property maps decode into intersections and streets
//!   with documented defaults ([`mapper`])
//! - **Façade**: CRUD, betweenness maintenance, shortest paths and proximity
//!   queries ([`store::GraphStore`]), served over HTTP by [`server`]

pub mod edges;
pub mod errors;
pub mod nodes;
pub mod types;

pub mod connection;
pub mod driver;
pub mod mapper;
pub mod query;

pub mod server;
pub mod store;
pub mod utils;

pub use connection::StoreHandle;
pub use errors::{Result, RoadGraphError};
pub use store::GraphStore;
pub use types::RoadGraphConfig;
