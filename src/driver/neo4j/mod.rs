//! Neo4j graph driver implementation.
//!
//! Uses `neo4rs` 0.8 for async, pooled Bolt connections: one [`Graph`] pool
//! per endpoint. Auto-commit statements go through [`Graph::execute`];
//! transactional ones open a [`Txn`] that is committed on success and rolled
//! back on any failure.

use std::collections::HashMap;

use neo4rs::{
    BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query, Txn,
};
use tracing::{debug, info, warn};

use super::value::{PropertyMap, Row, Value};
use super::{AccessMode, Connector, EndpointConfig, GraphDriver};
use crate::errors::{Result, RoadGraphError};
use crate::query::Statement;

/// Opens Bolt connection pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neo4jConnector;

impl Connector for Neo4jConnector {
    type Driver = Neo4jDriver;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Neo4jDriver> {
        let config = ConfigBuilder::default()
            .uri(endpoint.uri.as_str())
            .user(endpoint.user.as_str())
            .password(endpoint.password.as_str())
            .db(endpoint.database.as_str())
            .fetch_size(endpoint.fetch_size)
            .max_connections(endpoint.max_connections)
            .build()
            .map_err(|e| RoadGraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| RoadGraphError::Connection(format!("{}: {e}", endpoint.uri)))?;

        info!(uri = %endpoint.uri, mode = %endpoint.access_mode, "neo4j pool ready");
        Ok(Neo4jDriver {
            graph,
            mode: endpoint.access_mode,
        })
    }
}

/// One pooled endpoint.
#[derive(Clone)]
pub struct Neo4jDriver {
    graph: Graph,
    mode: AccessMode,
}

impl GraphDriver for Neo4jDriver {
    async fn run(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(kind = ?statement.kind, mode = %self.mode, "run");
        let mut stream = self.graph.execute(to_query(statement)).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(decode_row(&row, statement.returns)?);
        }
        Ok(rows)
    }

    async fn run_in_transaction(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(kind = ?statement.kind, mode = %self.mode, "run_in_transaction");
        let mut txn = self.graph.start_txn().await?;
        match collect_in_txn(&mut txn, statement).await {
            Ok(rows) => {
                txn.commit().await?;
                Ok(rows)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(kind = ?statement.kind, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        self.run(&crate::query::cypher::ping()).await.map(|_| ())
    }
}

async fn collect_in_txn(txn: &mut Txn, statement: &Statement) -> Result<Vec<Row>> {
    let mut stream = txn.execute(to_query(statement)).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(decode_row(&row, statement.returns)?);
    }
    Ok(rows)
}

fn to_query(statement: &Statement) -> Query {
    statement
        .params
        .iter()
        .fold(neo4rs::query(&statement.cypher), |q, (key, value)| {
            q.param(key, BoltType::from(value.clone()))
        })
}

fn decode_row(row: &neo4rs::Row, columns: &[&str]) -> Result<Row> {
    let mut decoded = Row::new();
    for &column in columns {
        let bolt: BoltType = row
            .get(column)
            .map_err(|e| RoadGraphError::decode(column, e.to_string()))?;
        decoded.insert(column, from_bolt(column, bolt)?);
    }
    Ok(decoded)
}

/// Bolt → [`Value`]. Nodes and relationships collapse to their property maps.
fn from_bolt(column: &str, bolt: BoltType) -> Result<Value> {
    Ok(match bolt {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Boolean(b.value),
        BoltType::Integer(i) => Value::Integer(i.value),
        BoltType::Float(f) => Value::Float(f.value),
        BoltType::String(s) => Value::String(s.value),
        BoltType::List(list) => Value::List(
            list.value
                .into_iter()
                .map(|item| from_bolt(column, item))
                .collect::<Result<_>>()?,
        ),
        BoltType::Map(map) => Value::Map(from_bolt_map(column, map)?),
        BoltType::Node(node) => Value::Map(from_bolt_map(column, node.properties)?),
        BoltType::Relation(rel) => Value::Map(from_bolt_map(column, rel.properties)?),
        other => {
            return Err(RoadGraphError::decode(
                column,
                format!("unsupported Bolt value {other:?}"),
            ))
        }
    })
}

fn from_bolt_map(column: &str, map: BoltMap) -> Result<PropertyMap> {
    map.value
        .into_iter()
        .map(|(key, value)| -> Result<(String, Value)> {
            Ok((key.value, from_bolt(column, value)?))
        })
        .collect()
}

impl From<Value> for BoltType {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => BoltType::Null(BoltNull),
            Value::Boolean(b) => BoltType::from(b),
            Value::Integer(i) => BoltType::from(i),
            Value::Float(f) => BoltType::from(f),
            Value::String(s) => BoltType::String(BoltString::from(s)),
            Value::List(items) => BoltType::List(BoltList {
                value: items.into_iter().map(BoltType::from).collect(),
            }),
            Value::Map(map) => BoltType::Map(BoltMap {
                value: map
                    .into_iter()
                    .map(|(k, v)| (BoltString::from(k), BoltType::from(v)))
                    .collect::<HashMap<_, _>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_convert_to_bolt() {
        let mut map = PropertyMap::new();
        map.insert("name".into(), Value::from("Via Roma"));
        map.insert("lanes".into(), Value::from(vec![1_i64, 2]));
        map.insert("ref".into(), Value::Null);

        let BoltType::Map(bolt) = BoltType::from(Value::Map(map)) else {
            panic!("expected a Bolt map");
        };
        assert_eq!(bolt.value.len(), 3);
        assert!(matches!(
            bolt.value.get(&BoltString::from("ref")),
            Some(BoltType::Null(_))
        ));
    }

    #[test]
    fn bolt_maps_convert_back() {
        let bolt = BoltType::from(Value::Map(
            [("osmid".to_string(), Value::Integer(5)), ("busStop".to_string(), Value::Boolean(true))]
                .into_iter()
                .collect(),
        ));
        let value = from_bolt("props", bolt).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["osmid"], Value::Integer(5));
        assert_eq!(map["busStop"], Value::Boolean(true));
    }

    #[test]
    fn query_binds_every_parameter() {
        let stmt = crate::query::cypher::set_street_weight(3, 2.5);
        let q = to_query(&stmt);
        assert!(q.has_param_key("id"));
        assert!(q.has_param_key("weight"));
    }
}
