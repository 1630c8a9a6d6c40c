//! Graph database driver abstraction.
//!
//! A [`Connector`] opens one [`GraphDriver`] per endpoint; the driver executes
//! rendered [`Statement`]s and hands rows back in the backend-neutral
//! [`value`] model. Two backends ship with the crate:
//!
//! - [`neo4j`]: Bolt via `neo4rs`, pooled per endpoint
//! - [`memory`]: an in-process graph interpreting statements by kind

pub mod memory;
pub mod neo4j;
pub mod value;

use std::fmt;
use std::future::Future;

use crate::errors::Result;
use crate::query::Statement;
use value::Row;

/// Routing intent of an endpoint's sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}

/// Address, credentials and session defaults for one endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub fetch_size: usize,
    pub max_connections: usize,
    pub access_mode: AccessMode,
}

// Hand-written so credentials never reach the logs.
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("fetch_size", &self.fetch_size)
            .field("max_connections", &self.max_connections)
            .field("access_mode", &self.access_mode)
            .finish()
    }
}

/// A connected backend endpoint.
///
/// Futures are `Send` so callers can be spawned on a multi-threaded runtime.
pub trait GraphDriver: Send + Sync + 'static {
    /// Run a statement in an auto-commit session.
    fn run(&self, statement: &Statement) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Run a statement inside an explicit transaction, committed before
    /// returning and rolled back on failure.
    fn run_in_transaction(
        &self,
        statement: &Statement,
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Health check: verify connectivity to the database.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Factory for drivers; one `connect` per endpoint.
pub trait Connector: Send + Sync + 'static {
    type Driver: GraphDriver;

    fn connect(
        &self,
        endpoint: &EndpointConfig,
    ) -> impl Future<Output = Result<Self::Driver>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let cfg = EndpointConfig {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "hunter2".into(),
            database: "neo4j".into(),
            fetch_size: 200,
            max_connections: 16,
            access_mode: AccessMode::Read,
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("bolt://localhost:7687"));
    }
}
