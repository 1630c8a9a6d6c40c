//! Dual-pool connection handle.
//!
//! [`StoreHandle`] owns one driver for the read replica and one for the write
//! primary. The lock only guards swapping the pair in and out; statements run
//! on an `Arc` clone of the driver, so `close()` never waits for in-flight
//! queries and never holds the lock across an await.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::driver::value::Row;
use crate::driver::{AccessMode, Connector, EndpointConfig, GraphDriver};
use crate::errors::{Result, RoadGraphError};
use crate::query::Statement;

struct Pools<D> {
    read: Arc<D>,
    write: Arc<D>,
}

/// Read/write pool pair behind an open/close lifecycle.
pub struct StoreHandle<C: Connector> {
    connector: C,
    read_endpoint: EndpointConfig,
    write_endpoint: EndpointConfig,
    pools: RwLock<Option<Pools<C::Driver>>>,
}

impl<C: Connector> StoreHandle<C> {
    /// A closed handle; call [`open`](Self::open) before issuing statements.
    ///
    /// The endpoints' access modes are forced to match their role.
    pub fn new(connector: C, mut read: EndpointConfig, mut write: EndpointConfig) -> Self {
        read.access_mode = AccessMode::Read;
        write.access_mode = AccessMode::Write;
        Self {
            connector,
            read_endpoint: read,
            write_endpoint: write,
            pools: RwLock::new(None),
        }
    }

    /// Connect both pools. Fails with `AlreadyConnected` when already open;
    /// if either endpoint is unreachable the handle stays closed.
    pub async fn open(&self) -> Result<()> {
        if self.is_connected() {
            return Err(RoadGraphError::AlreadyConnected);
        }

        let read = self.connector.connect(&self.read_endpoint).await?;
        let write = self.connector.connect(&self.write_endpoint).await?;

        let mut slot = self.pools.write();
        if slot.is_some() {
            return Err(RoadGraphError::AlreadyConnected);
        }
        *slot = Some(Pools {
            read: Arc::new(read),
            write: Arc::new(write),
        });
        info!(
            read = %self.read_endpoint.uri,
            write = %self.write_endpoint.uri,
            "graph store opened"
        );
        Ok(())
    }

    /// Release both pools. In-flight statements finish on their own clone.
    pub fn close(&self) {
        if self.pools.write().take().is_some() {
            info!("graph store closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pools.read().is_some()
    }

    fn reader(&self) -> Result<Arc<C::Driver>> {
        self.pools
            .read()
            .as_ref()
            .map(|p| Arc::clone(&p.read))
            .ok_or(RoadGraphError::NotConnected)
    }

    fn writer(&self) -> Result<Arc<C::Driver>> {
        self.pools
            .read()
            .as_ref()
            .map(|p| Arc::clone(&p.write))
            .ok_or(RoadGraphError::NotConnected)
    }

    /// Auto-commit statement on the read pool.
    pub async fn read(&self, statement: &Statement) -> Result<Vec<Row>> {
        let driver = self.reader()?;
        debug!(kind = ?statement.kind, "read");
        driver.run(statement).await
    }

    /// Transactional statement on the write pool.
    pub async fn write(&self, statement: &Statement) -> Result<Vec<Row>> {
        let driver = self.writer()?;
        debug!(kind = ?statement.kind, "write");
        driver.run_in_transaction(statement).await
    }

    /// Round-trip on the read pool.
    pub async fn ping(&self) -> Result<()> {
        let driver = self.reader()?;
        driver.ping().await
    }
}

impl<C: Connector> Drop for StoreHandle<C> {
    fn drop(&mut self) {
        self.close();
    }
}
