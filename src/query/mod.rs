//! Query rendering.
//!
//! Every store operation is rendered by a pure function in [`cypher`] into a
//! [`Statement`]: fixed Cypher template text, the bound parameters, the
//! columns the caller reads back, and a [`QueryKind`] tag. Domain values only
//! ever travel as parameters.

pub mod cypher;
pub mod params;

use crate::driver::value::{PropertyMap, Value};
use crate::nodes::intersection::PoiCategory;

/// What a statement does, independent of its Cypher text.
///
/// Backends that do not speak Cypher (the in-memory store) dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Ping,
    MergeIntersection,
    MergeStreet,
    IntersectionById,
    OutgoingStreetIds,
    StreetById,
    StreetsBetween,
    StreetGeometry,
    IntersectionOsmids,
    StreetIds,
    Tagged(PoiCategory),
    SetStreetWeight,
    SetBetweenness,
    SetStreetInterrupted,
    SetStreetInterruptedBetween,
    DeleteIntersection,
    DeleteStreet,
    CountIntersections,
    BetweennessExact,
    BetweennessSampled,
    TouchControl,
    ReadControl,
    ShortestPath,
    ShortestPathIgnoringInterruptions,
    CriticalTop,
    CriticalThreshold,
    /// Nearest intersection, optionally restricted to a tag.
    Nearest(Option<PoiCategory>),
}

impl QueryKind {
    /// `true` when the statement mutates the store and must go to the write pool.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            QueryKind::MergeIntersection
                | QueryKind::MergeStreet
                | QueryKind::SetStreetWeight
                | QueryKind::SetBetweenness
                | QueryKind::SetStreetInterrupted
                | QueryKind::SetStreetInterruptedBetween
                | QueryKind::DeleteIntersection
                | QueryKind::DeleteStreet
                | QueryKind::BetweennessExact
                | QueryKind::BetweennessSampled
                | QueryKind::TouchControl
        )
    }
}

/// A rendered, parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: QueryKind,
    pub cypher: String,
    pub params: PropertyMap,
    /// Columns read back from each result row.
    pub returns: &'static [&'static str],
}

impl Statement {
    pub fn new(kind: QueryKind, cypher: impl Into<String>) -> Self {
        Self {
            kind,
            cypher: cypher.into(),
            params: PropertyMap::new(),
            returns: &[],
        }
    }

    /// Bind a parameter (`$key` in the Cypher text).
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_owned(), value.into());
        self
    }

    pub fn returning(mut self, columns: &'static [&'static str]) -> Self {
        self.returns = columns;
        self
    }

    pub fn is_write(&self) -> bool {
        self.kind.is_write()
    }

    pub fn param_value(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}
