//! Graph store façade.
//!
//! [`GraphStore`] is the entry point for every domain operation: it renders
//! the statement, routes it to the read or write pool of its
//! [`StoreHandle`], and maps rows back into entities. Mutations decode the
//! entity returned by the write statement itself, since the read replica may
//! lag the primary.
//!
//! Centrality maintenance lives in [`centrality`], routing and proximity
//! queries in [`routing`].

pub mod centrality;
pub mod routing;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::StoreHandle;
use crate::driver::value::Value;
use crate::driver::Connector;
use crate::edges::street::{NewStreet, Street};
use crate::errors::{Result, RoadGraphError};
use crate::mapper::{self, geometry::decode_geometry};
use crate::nodes::coordinate::Coordinate;
use crate::nodes::intersection::{Intersection, NewIntersection, PoiCategory};
use crate::query::cypher;

pub use centrality::CentralityAlgorithm;

/// Distance cutoffs for the nearest-node queries, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityLimits {
    pub intersection: f64,
    pub poi: f64,
}

impl Default for ProximityLimits {
    fn default() -> Self {
        Self {
            intersection: 10_000.0,
            poi: 1_000.0,
        }
    }
}

/// Domain operations over a road-network graph.
pub struct GraphStore<C: Connector> {
    handle: Arc<StoreHandle<C>>,
    limits: ProximityLimits,
}

impl<C: Connector> Clone for GraphStore<C> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            limits: self.limits,
        }
    }
}

impl<C: Connector> GraphStore<C> {
    pub fn new(handle: Arc<StoreHandle<C>>) -> Self {
        Self {
            handle,
            limits: ProximityLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ProximityLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn handle(&self) -> &Arc<StoreHandle<C>> {
        &self.handle
    }

    pub fn limits(&self) -> ProximityLimits {
        self.limits
    }

    // ── Intersections ─────────────────────────────────────────────────────────

    /// Create or update an intersection keyed by `osmid`.
    pub async fn add_intersection(&self, req: NewIntersection) -> Result<Intersection> {
        let rows = self.handle.write(&cypher::merge_intersection(&req)).await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::Driver("merge returned no intersection".into()))?;
        let stored = mapper::intersection_from_row(row, "props")?;
        if stored.osmid != req.osmid {
            return Err(RoadGraphError::write_conflict(
                "intersection",
                req.osmid,
                stored.osmid,
            ));
        }
        debug!(osmid = stored.osmid, "intersection merged");
        Ok(stored)
    }

    /// Intersection with its outgoing streets.
    ///
    /// Issues one extra read per outgoing street.
    pub async fn get_intersection(&self, osmid: i64) -> Result<Intersection> {
        let mut intersection = self.get_intersection_light(osmid).await?;
        intersection.streets = Some(self.get_streets(osmid).await?);
        Ok(intersection)
    }

    /// Intersection without its streets.
    pub async fn get_intersection_light(&self, osmid: i64) -> Result<Intersection> {
        let rows = self.handle.read(&cypher::intersection_by_id(osmid)).await?;
        match rows.first() {
            Some(row) => mapper::intersection_from_row(row, "props"),
            None => Err(RoadGraphError::not_found("intersection", osmid)),
        }
    }

    /// Outgoing streets of `osmid` keyed by street id; empty when there are none.
    pub async fn get_streets(&self, osmid: i64) -> Result<BTreeMap<i64, Street>> {
        let rows = self.handle.read(&cypher::outgoing_street_ids(osmid)).await?;
        let mut streets = BTreeMap::new();
        for row in &rows {
            let id = mapper::i64_column(row, "id")?;
            match self.get_street(id).await {
                Ok(street) => {
                    streets.insert(id, street);
                }
                // deleted between the two reads
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(streets)
    }

    pub async fn intersection_osmids(&self) -> Result<Vec<i64>> {
        let rows = self.handle.read(&cypher::intersection_osmids()).await?;
        rows.iter().map(|r| mapper::i64_column(r, "osmid")).collect()
    }

    /// Current betweenness of an intersection.
    pub async fn node_flow(&self, osmid: i64) -> Result<f64> {
        Ok(self.get_intersection_light(osmid).await?.betweenness)
    }

    pub async fn all_parkings(&self) -> Result<Vec<Intersection>> {
        self.tagged(PoiCategory::Parking).await
    }

    pub async fn all_hospitals(&self) -> Result<Vec<Intersection>> {
        self.tagged(PoiCategory::Hospital).await
    }

    async fn tagged(&self, category: PoiCategory) -> Result<Vec<Intersection>> {
        let rows = self.handle.read(&cypher::tagged_intersections(category)).await?;
        rows.iter()
            .map(|r| mapper::intersection_from_row(r, "props"))
            .collect()
    }

    pub async fn set_betweenness_intersection(&self, osmid: i64, value: f64) -> Result<Intersection> {
        let rows = self.handle.write(&cypher::set_betweenness(osmid, value)).await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::not_found("intersection", osmid))?;
        let updated = mapper::intersection_from_row(row, "props")?;
        if updated.osmid != osmid {
            return Err(RoadGraphError::write_conflict("intersection", osmid, updated.osmid));
        }
        Ok(updated)
    }

    /// Detach-delete an intersection; absent ids are a no-op.
    pub async fn delete_intersection(&self, osmid: i64) -> Result<()> {
        self.handle.write(&cypher::delete_intersection(osmid)).await?;
        debug!(osmid, "intersection deleted");
        Ok(())
    }

    // ── Streets ───────────────────────────────────────────────────────────────

    /// Create or update a street between two existing intersections.
    ///
    /// Street ids are unique across the graph: reusing one for a different
    /// pair of endpoints is a `WriteConflict` and writes nothing.
    pub async fn add_street(&self, req: NewStreet) -> Result<Street> {
        check_weight(req.weight)?;
        let rows = self.handle.write(&cypher::merge_street(&req)).await?;
        let Some(row) = rows.first() else {
            return Err(RoadGraphError::not_found(
                "intersection",
                format!("{} or {}", req.osmid_start, req.osmid_dest),
            ));
        };
        let taken_start = row.get("takenStart").and_then(Value::as_i64);
        let taken_dest = row.get("takenDest").and_then(Value::as_i64);
        if let (Some(taken_start), Some(taken_dest)) = (taken_start, taken_dest) {
            warn!(id = req.id, taken_start, taken_dest, "street id already in use");
            return Err(RoadGraphError::write_conflict(
                "street",
                format!("{} on {}->{}", req.id, req.osmid_start, req.osmid_dest),
                format!("{} on {}->{}", req.id, taken_start, taken_dest),
            ));
        }
        let stored = mapper::street_from_row(row, "props")?;
        if stored.id != req.id {
            return Err(RoadGraphError::write_conflict("street", req.id, stored.id));
        }
        debug!(id = stored.id, "street merged");
        Ok(stored)
    }

    pub async fn get_street(&self, id: i64) -> Result<Street> {
        let rows = self.handle.read(&cypher::street_by_id(id)).await?;
        match rows.first() {
            Some(row) => mapper::street_from_row(row, "props"),
            None => Err(RoadGraphError::not_found("street", id)),
        }
    }

    /// Street `start → dest`; the lowest id wins when several exist.
    pub async fn get_street_between(&self, osmid_start: i64, osmid_dest: i64) -> Result<Street> {
        let rows = self
            .handle
            .read(&cypher::streets_between(osmid_start, osmid_dest))
            .await?;
        if rows.len() > 1 {
            warn!(
                osmid_start,
                osmid_dest,
                count = rows.len(),
                "parallel streets, returning lowest id"
            );
        }
        match rows.first() {
            Some(row) => mapper::street_from_row(row, "props"),
            None => Err(RoadGraphError::not_found(
                "street",
                format!("{osmid_start}->{osmid_dest}"),
            )),
        }
    }

    /// Id of the street `start → dest`.
    pub async fn link_key(&self, osmid_start: i64, osmid_dest: i64) -> Result<i64> {
        Ok(self.get_street_between(osmid_start, osmid_dest).await?.id)
    }

    /// Geometry of the cheapest street `start → dest`.
    pub async fn get_street_geometry(
        &self,
        osmid_start: i64,
        osmid_dest: i64,
    ) -> Result<Vec<Coordinate>> {
        self.hop_geometry(osmid_start, osmid_dest, true)
            .await?
            .ok_or_else(|| {
                RoadGraphError::not_found("street", format!("{osmid_start}->{osmid_dest}"))
            })
    }

    /// `None` when no street matches the interruption rule.
    pub(crate) async fn hop_geometry(
        &self,
        osmid_start: i64,
        osmid_dest: i64,
        ignore_interrupted: bool,
    ) -> Result<Option<Vec<Coordinate>>> {
        let stmt = cypher::street_geometry(osmid_start, osmid_dest, ignore_interrupted);
        let rows = self.handle.read(&stmt).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        match row.get("coordinates").and_then(|v| v.as_str()) {
            Some(encoded) => decode_geometry(encoded).map(Some),
            None => Ok(Some(Vec::new())),
        }
    }

    pub async fn street_ids(&self) -> Result<Vec<i64>> {
        let rows = self.handle.read(&cypher::street_ids()).await?;
        rows.iter().map(|r| mapper::i64_column(r, "id")).collect()
    }

    pub async fn set_street_weight(&self, id: i64, weight: f64) -> Result<Street> {
        check_weight(weight)?;
        let rows = self.handle.write(&cypher::set_street_weight(id, weight)).await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::not_found("street", id))?;
        let updated = mapper::street_from_row(row, "props")?;
        if updated.id != id {
            return Err(RoadGraphError::write_conflict("street", id, updated.id));
        }
        Ok(updated)
    }

    pub async fn set_street_interrupted(&self, id: i64, interrupted: bool) -> Result<()> {
        let rows = self
            .handle
            .write(&cypher::set_street_interrupted(id, interrupted))
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::not_found("street", id))?;
        let returned = mapper::i64_column(row, "id")?;
        if returned != id {
            return Err(RoadGraphError::write_conflict("street", id, returned));
        }
        debug!(id, interrupted, "street interruption set");
        Ok(())
    }

    /// Flag every street `start → dest`; `false` when none exists.
    pub async fn set_street_interrupted_between(
        &self,
        osmid_start: i64,
        osmid_dest: i64,
        interrupted: bool,
    ) -> Result<bool> {
        let stmt = cypher::set_street_interrupted_between(osmid_start, osmid_dest, interrupted);
        let rows = self.handle.write(&stmt).await?;
        Ok(!rows.is_empty())
    }

    /// Delete a street; absent ids are a no-op.
    pub async fn delete_street(&self, id: i64) -> Result<()> {
        self.handle.write(&cypher::delete_street(id)).await?;
        debug!(id, "street deleted");
        Ok(())
    }
}

/// Routing relies on finite, non-negative street costs.
fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(RoadGraphError::Validation(format!(
            "street weight must be finite and non-negative, got {weight}"
        )))
    }
}
