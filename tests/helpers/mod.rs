#![allow(dead_code)]

use std::sync::Arc;

use roadgraph::driver::memory::{MemoryConnector, MemoryDriver};
use roadgraph::driver::{AccessMode, Connector, EndpointConfig};
use roadgraph::edges::NewStreet;
use roadgraph::nodes::{Coordinate, NewIntersection};
use roadgraph::{GraphStore, Result, StoreHandle};

pub type MemoryStore = GraphStore<MemoryConnector>;

fn endpoint(uri: &str) -> EndpointConfig {
    EndpointConfig {
        uri: uri.to_string(),
        user: "neo4j".to_string(),
        password: "test".to_string(),
        database: "neo4j".to_string(),
        fetch_size: 200,
        max_connections: 4,
        access_mode: AccessMode::Read,
    }
}

/// Open store over a fresh in-memory graph with reproducible sampling.
pub async fn open_store() -> MemoryStore {
    open_store_with(MemoryConnector::seeded(42)).await
}

pub async fn open_store_with(connector: MemoryConnector) -> MemoryStore {
    let handle = StoreHandle::new(
        connector,
        endpoint("memory://replica"),
        endpoint("memory://primary"),
    );
    handle.open().await.expect("open in-memory store");
    GraphStore::new(Arc::new(handle))
}

/// Reads land on a graph that writes never reach, like a replica that has
/// not caught up with the primary yet.
#[derive(Clone, Default)]
pub struct StaleReplica {
    primary: MemoryConnector,
    replica: MemoryConnector,
}

impl Connector for StaleReplica {
    type Driver = MemoryDriver;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<MemoryDriver> {
        match endpoint.access_mode {
            AccessMode::Read => self.replica.connect(endpoint).await,
            AccessMode::Write => self.primary.connect(endpoint).await,
        }
    }
}

pub async fn open_stale_replica_store() -> GraphStore<StaleReplica> {
    let handle = StoreHandle::new(
        StaleReplica::default(),
        endpoint("memory://replica"),
        endpoint("memory://primary"),
    );
    handle.open().await.expect("open in-memory store");
    GraphStore::new(Arc::new(handle))
}

/// Intersection `osmid` on a small grid around Naples.
pub fn intersection(osmid: i64) -> NewIntersection {
    NewIntersection::new(osmid, position(osmid), "traffic_signals")
}

pub fn position(osmid: i64) -> Coordinate {
    Coordinate::new(14.25 + osmid as f64 * 0.001, 40.85)
}

/// Diamond `1 → 2 → 4`, `1 → 3 → 4`.
///
/// Street ids: `12` (1→2), `24` (2→4), `13` (1→3), `34` (3→4). The upper
/// route costs 2, the lower 4, so the shortest path runs through 2.
pub async fn diamond(store: &MemoryStore) {
    for osmid in 1..=4 {
        store
            .add_intersection(intersection(osmid))
            .await
            .expect("add intersection");
    }
    for (id, start, dest, weight) in [(12, 1, 2, 1.0), (24, 2, 4, 1.0), (13, 1, 3, 2.0), (34, 3, 4, 2.0)] {
        let street = NewStreet::new(id, start, dest)
            .with_weight(weight)
            .with_coordinates(vec![position(start), position(dest)]);
        store.add_street(street).await.expect("add street");
    }
}
