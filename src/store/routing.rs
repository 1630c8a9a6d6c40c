//! Shortest paths, critical-node rankings and proximity queries.

use tracing::debug;

use super::GraphStore;
use crate::driver::value::Row;
use crate::driver::Connector;
use crate::errors::{Result, RoadGraphError};
use crate::mapper;
use crate::nodes::coordinate::Coordinate;
use crate::nodes::intersection::{Intersection, PoiCategory};
use crate::query::cypher;
use crate::query::Statement;

/// One path step: the intersection and the cumulative cost to reach it.
type Hop = (Intersection, f64);

impl<C: Connector> GraphStore<C> {
    /// Cheapest path over passable streets; empty when none exists.
    pub async fn shortest_path(&self, start: i64, dest: i64) -> Result<Vec<Intersection>> {
        let hops = self.path(&cypher::shortest_path(start, dest)).await?;
        Ok(hops.into_iter().map(|(i, _)| i).collect())
    }

    /// Cheapest path over every street, interrupted or not.
    pub async fn shortest_path_ignore_interrupted(
        &self,
        start: i64,
        dest: i64,
    ) -> Result<Vec<Intersection>> {
        let stmt = cypher::shortest_path_ignoring_interruptions(start, dest);
        let hops = self.path(&stmt).await?;
        Ok(hops.into_iter().map(|(i, _)| i).collect())
    }

    /// Geometry of [`shortest_path`](Self::shortest_path), street by street.
    pub async fn shortest_path_coordinates(&self, start: i64, dest: i64) -> Result<Vec<Coordinate>> {
        let path = self.shortest_path(start, dest).await?;
        self.path_geometry(&path, false).await
    }

    /// Geometry of [`shortest_path_ignore_interrupted`](Self::shortest_path_ignore_interrupted).
    pub async fn shortest_path_coordinates_ignore_interrupted(
        &self,
        start: i64,
        dest: i64,
    ) -> Result<Vec<Coordinate>> {
        let path = self.shortest_path_ignore_interrupted(start, dest).await?;
        self.path_geometry(&path, true).await
    }

    /// Total cost of the interruption-aware shortest path; `None` when
    /// `dest` is unreachable.
    pub async fn distance_shortest_path_bus(&self, start: i64, dest: i64) -> Result<Option<f64>> {
        let hops = self.path(&cypher::shortest_path(start, dest)).await?;
        Ok(hops.last().map(|(_, cost)| *cost))
    }

    /// Snap two positions to their nearest intersections, as `(start, dest)`
    /// osmids. `NotFound` when either has no intersection within the
    /// intersection cutoff.
    pub async fn snap_endpoints(
        &self,
        source: Coordinate,
        destination: Coordinate,
    ) -> Result<(i64, i64)> {
        let mut osmids = [0; 2];
        for (slot, position) in osmids.iter_mut().zip([source, destination]) {
            let nearest = self.nearest_intersection(position).await?.ok_or_else(|| {
                RoadGraphError::not_found(
                    "intersection",
                    format!("near ({}, {})", position.longitude, position.latitude),
                )
            })?;
            *slot = nearest.osmid;
        }
        debug!(start = osmids[0], dest = osmids[1], "endpoints snapped");
        Ok((osmids[0], osmids[1]))
    }

    /// The `top` intersections by betweenness, highest first.
    pub async fn top_critical_nodes(&self, top: u32) -> Result<Vec<Intersection>> {
        let rows = self
            .handle
            .read(&cypher::critical_top(i64::from(top)))
            .await?;
        decode_intersections(&rows)
    }

    /// Intersections with betweenness strictly above `threshold`, highest first.
    pub async fn threshold_critical_nodes(&self, threshold: f64) -> Result<Vec<Intersection>> {
        let rows = self
            .handle
            .read(&cypher::critical_threshold(threshold))
            .await?;
        decode_intersections(&rows)
    }

    pub async fn nearest_intersection(&self, position: Coordinate) -> Result<Option<Intersection>> {
        self.nearest(position, None, self.limits.intersection).await
    }

    pub async fn nearest_parking(&self, position: Coordinate) -> Result<Option<Intersection>> {
        self.nearest(position, Some(PoiCategory::Parking), self.limits.poi)
            .await
    }

    pub async fn nearest_hospital(&self, position: Coordinate) -> Result<Option<Intersection>> {
        self.nearest(position, Some(PoiCategory::Hospital), self.limits.poi)
            .await
    }

    async fn nearest(
        &self,
        position: Coordinate,
        category: Option<PoiCategory>,
        max_distance: f64,
    ) -> Result<Option<Intersection>> {
        let stmt = cypher::nearest(position, category, max_distance);
        let rows = self.handle.read(&stmt).await?;
        rows.first()
            .map(|row| mapper::intersection_from_row(row, "props"))
            .transpose()
    }

    async fn path(&self, stmt: &Statement) -> Result<Vec<Hop>> {
        let rows = self.handle.read(stmt).await?;
        let hops = rows
            .iter()
            .map(|row| -> Result<Hop> {
                Ok((
                    mapper::intersection_from_row(row, "props")?,
                    mapper::f64_column(row, "cost")?,
                ))
            })
            .collect::<Result<Vec<Hop>>>()?;
        debug!(kind = ?stmt.kind, hops = hops.len(), "path resolved");
        Ok(hops)
    }

    async fn path_geometry(
        &self,
        path: &[Intersection],
        ignore_interrupted: bool,
    ) -> Result<Vec<Coordinate>> {
        let mut coordinates = Vec::new();
        for pair in path.windows(2) {
            let (from, to) = (pair[0].osmid, pair[1].osmid);
            let hop = self
                .hop_geometry(from, to, ignore_interrupted)
                .await?
                // edge removed between the path read and this one
                .ok_or_else(|| RoadGraphError::not_found("street", format!("{from}->{to}")))?;
            coordinates.extend(hop);
        }
        Ok(coordinates)
    }
}

fn decode_intersections(rows: &[Row]) -> Result<Vec<Intersection>> {
    rows.iter()
        .map(|r| mapper::intersection_from_row(r, "props"))
        .collect()
}
