//! Service configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::driver::{AccessMode, EndpointConfig};
use crate::errors::{Result, RoadGraphError};
use crate::store::ProximityLimits;

/// Central configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoadGraphConfig {
    /// Write primary (e.g. `bolt://localhost:7687`).
    #[validate(length(min = 1))]
    pub write_uri: String,

    /// Read replica; defaults to the write primary.
    #[validate(length(min = 1))]
    pub read_uri: String,

    pub user: String,

    #[serde(skip_serializing)]
    #[validate(length(min = 1))]
    pub password: String,

    /// Session default database.
    #[validate(length(min = 1))]
    pub database: String,

    #[validate(range(min = 1))]
    pub fetch_size: usize,

    /// Pool size per endpoint.
    #[validate(range(min = 1))]
    pub max_connections: usize,

    /// Cutoff for `nearest_intersection`, in metres.
    #[validate(range(exclusive_min = 0.0))]
    pub nearest_intersection_max_distance: f64,

    /// Cutoff for `nearest_parking` / `nearest_hospital`, in metres.
    #[validate(range(exclusive_min = 0.0))]
    pub nearest_poi_max_distance: f64,

    pub bind_addr: SocketAddr,
}

impl Default for RoadGraphConfig {
    fn default() -> Self {
        Self {
            write_uri: "bolt://localhost:7687".to_string(),
            read_uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            fetch_size: 200,
            max_connections: 16,
            nearest_intersection_max_distance: 10_000.0,
            nearest_poi_max_distance: 1_000.0,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl RoadGraphConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent).
    /// `NEO4J_PASSWORD` is required; everything else has a default. Parse and
    /// validation failures are [`RoadGraphError::Validation`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let write_uri = lookup("NEO4J_WRITE_URI").unwrap_or(defaults.write_uri);
        let read_uri = lookup("NEO4J_READ_URI").unwrap_or_else(|| write_uri.clone());
        let user = lookup("NEO4J_USER").unwrap_or(defaults.user);
        let password = lookup("NEO4J_PASSWORD").ok_or_else(|| {
            RoadGraphError::Validation("NEO4J_PASSWORD is required".to_string())
        })?;
        let database = lookup("NEO4J_DATABASE").unwrap_or(defaults.database);

        let config = Self {
            write_uri,
            read_uri,
            user,
            password,
            database,
            fetch_size: parse_var(&lookup, "NEO4J_FETCH_SIZE", defaults.fetch_size)?,
            max_connections: parse_var(&lookup, "NEO4J_MAX_CONNECTIONS", defaults.max_connections)?,
            nearest_intersection_max_distance: parse_var(
                &lookup,
                "NEAREST_INTERSECTION_MAX_DISTANCE",
                defaults.nearest_intersection_max_distance,
            )?,
            nearest_poi_max_distance: parse_var(
                &lookup,
                "NEAREST_POI_MAX_DISTANCE",
                defaults.nearest_poi_max_distance,
            )?,
            bind_addr: parse_var(&lookup, "BIND_ADDR", defaults.bind_addr)?,
        };

        config
            .validate()
            .map_err(|e| RoadGraphError::Validation(e.to_string()))?;

        Ok(config)
    }

    pub fn read_endpoint(&self) -> EndpointConfig {
        self.endpoint(&self.read_uri, AccessMode::Read)
    }

    pub fn write_endpoint(&self) -> EndpointConfig {
        self.endpoint(&self.write_uri, AccessMode::Write)
    }

    fn endpoint(&self, uri: &str, access_mode: AccessMode) -> EndpointConfig {
        EndpointConfig {
            uri: uri.to_string(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            fetch_size: self.fetch_size,
            max_connections: self.max_connections,
            access_mode,
        }
    }

    pub fn proximity_limits(&self) -> ProximityLimits {
        ProximityLimits {
            intersection: self.nearest_intersection_max_distance,
            poi: self.nearest_poi_max_distance,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| RoadGraphError::Validation(format!("Invalid {name} '{raw}': {e}"))),
        None => Ok(default),
    }
}
