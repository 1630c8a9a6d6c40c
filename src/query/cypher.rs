//! Statement builders, one per store operation.

use crate::edges::street::NewStreet;
use crate::nodes::coordinate::Coordinate;
use crate::nodes::intersection::{NewIntersection, PoiCategory};

use super::params::{intersection_props, street_props};
use super::{QueryKind, Statement};

const PROPS: &[&str] = &["props"];
const ID: &[&str] = &["id"];

// ── Intersections ─────────────────────────────────────────────────────────────

pub fn merge_intersection(req: &NewIntersection) -> Statement {
    Statement::new(
        QueryKind::MergeIntersection,
        "MERGE (a:Intersection {osmid: $osmid}) \
         ON CREATE SET a.betweenness = 0.0 \
         SET a += $props \
         RETURN properties(a) AS props",
    )
    .param("osmid", req.osmid)
    .param("props", intersection_props(req))
    .returning(PROPS)
}

pub fn intersection_by_id(osmid: i64) -> Statement {
    Statement::new(
        QueryKind::IntersectionById,
        "MATCH (a:Intersection {osmid: $osmid}) RETURN properties(a) AS props",
    )
    .param("osmid", osmid)
    .returning(PROPS)
}

pub fn outgoing_street_ids(osmid: i64) -> Statement {
    Statement::new(
        QueryKind::OutgoingStreetIds,
        "MATCH (:Intersection {osmid: $osmid})-[r:STREET]->(:Intersection) \
         RETURN r.id AS id ORDER BY id",
    )
    .param("osmid", osmid)
    .returning(ID)
}

pub fn intersection_osmids() -> Statement {
    Statement::new(
        QueryKind::IntersectionOsmids,
        "MATCH (a:Intersection) RETURN a.osmid AS osmid ORDER BY osmid",
    )
    .returning(&["osmid"])
}

pub fn tagged_intersections(category: PoiCategory) -> Statement {
    let cypher = format!(
        "MATCH (a:Intersection) WHERE a.{} = true \
         RETURN properties(a) AS props ORDER BY a.osmid",
        category.property()
    );
    Statement::new(QueryKind::Tagged(category), cypher).returning(PROPS)
}

pub fn set_betweenness(osmid: i64, value: f64) -> Statement {
    Statement::new(
        QueryKind::SetBetweenness,
        "MATCH (a:Intersection {osmid: $osmid}) \
         SET a.betweenness = $betweenness \
         RETURN properties(a) AS props",
    )
    .param("osmid", osmid)
    .param("betweenness", value)
    .returning(PROPS)
}

pub fn delete_intersection(osmid: i64) -> Statement {
    Statement::new(
        QueryKind::DeleteIntersection,
        "MATCH (a:Intersection {osmid: $osmid}) DETACH DELETE a",
    )
    .param("osmid", osmid)
}

pub fn count_intersections() -> Statement {
    Statement::new(
        QueryKind::CountIntersections,
        "MATCH (a:Intersection) RETURN count(a) AS count",
    )
    .returning(&["count"])
}

// ── Streets ───────────────────────────────────────────────────────────────────

/// Matches both endpoints first, so a missing endpoint yields no row and
/// nothing is written. When `$id` already names a street between another
/// pair of intersections, nothing is written either and `takenStart` /
/// `takenDest` report that pair.
pub fn merge_street(req: &NewStreet) -> Statement {
    Statement::new(
        QueryKind::MergeStreet,
        "MATCH (a:Intersection {osmid: $osmidStart}), (b:Intersection {osmid: $osmidDest}) \
         OPTIONAL MATCH (x:Intersection)-[:STREET {id: $id}]->(y:Intersection) \
         WHERE x <> a OR y <> b \
         WITH a, b, head(collect(x.osmid)) AS takenStart, head(collect(y.osmid)) AS takenDest \
         FOREACH (_ IN CASE WHEN takenStart IS NULL THEN [1] ELSE [] END | \
           MERGE (a)-[r:STREET {id: $id}]->(b) SET r += $props) \
         WITH a, b, takenStart, takenDest \
         OPTIONAL MATCH (a)-[r:STREET {id: $id}]->(b) \
         RETURN properties(r) AS props, takenStart, takenDest",
    )
    .param("osmidStart", req.osmid_start)
    .param("osmidDest", req.osmid_dest)
    .param("id", req.id)
    .param("props", street_props(req))
    .returning(&["props", "takenStart", "takenDest"])
}

pub fn street_by_id(id: i64) -> Statement {
    Statement::new(
        QueryKind::StreetById,
        "MATCH (:Intersection)-[r:STREET {id: $id}]->(:Intersection) \
         RETURN properties(r) AS props LIMIT 1",
    )
    .param("id", id)
    .returning(PROPS)
}

/// All streets `start → dest`, lowest id first.
pub fn streets_between(osmid_start: i64, osmid_dest: i64) -> Statement {
    Statement::new(
        QueryKind::StreetsBetween,
        "MATCH (:Intersection {osmid: $osmidStart})-[r:STREET]->(:Intersection {osmid: $osmidDest}) \
         RETURN properties(r) AS props ORDER BY r.id",
    )
    .param("osmidStart", osmid_start)
    .param("osmidDest", osmid_dest)
    .returning(PROPS)
}

/// Geometry of the cheapest street `start → dest`.
pub fn street_geometry(osmid_start: i64, osmid_dest: i64, ignore_interrupted: bool) -> Statement {
    Statement::new(
        QueryKind::StreetGeometry,
        "MATCH (:Intersection {osmid: $osmidStart})-[r:STREET]->(:Intersection {osmid: $osmidDest}) \
         WHERE $ignoreInterrupted OR coalesce(r.interrupted, false) = false \
         RETURN r.coordinates AS coordinates \
         ORDER BY coalesce(r.weight, 1.0), r.id LIMIT 1",
    )
    .param("osmidStart", osmid_start)
    .param("osmidDest", osmid_dest)
    .param("ignoreInterrupted", ignore_interrupted)
    .returning(&["coordinates"])
}

pub fn street_ids() -> Statement {
    Statement::new(
        QueryKind::StreetIds,
        "MATCH (:Intersection)-[r:STREET]->(:Intersection) RETURN r.id AS id ORDER BY id",
    )
    .returning(ID)
}

pub fn set_street_weight(id: i64, weight: f64) -> Statement {
    Statement::new(
        QueryKind::SetStreetWeight,
        "MATCH (:Intersection)-[r:STREET {id: $id}]->(:Intersection) \
         SET r.weight = $weight \
         RETURN properties(r) AS props",
    )
    .param("id", id)
    .param("weight", weight)
    .returning(PROPS)
}

pub fn set_street_interrupted(id: i64, interrupted: bool) -> Statement {
    Statement::new(
        QueryKind::SetStreetInterrupted,
        "MATCH (:Intersection)-[r:STREET {id: $id}]->(:Intersection) \
         SET r.interrupted = $interrupted \
         RETURN r.id AS id",
    )
    .param("id", id)
    .param("interrupted", interrupted)
    .returning(ID)
}

pub fn set_street_interrupted_between(
    osmid_start: i64,
    osmid_dest: i64,
    interrupted: bool,
) -> Statement {
    Statement::new(
        QueryKind::SetStreetInterruptedBetween,
        "MATCH (:Intersection {osmid: $osmidStart})-[r:STREET]->(:Intersection {osmid: $osmidDest}) \
         SET r.interrupted = $interrupted \
         RETURN r.id AS id",
    )
    .param("osmidStart", osmid_start)
    .param("osmidDest", osmid_dest)
    .param("interrupted", interrupted)
    .returning(ID)
}

pub fn delete_street(id: i64) -> Statement {
    Statement::new(
        QueryKind::DeleteStreet,
        "MATCH (:Intersection)-[r:STREET {id: $id}]->(:Intersection) DELETE r",
    )
    .param("id", id)
}

// ── Centrality ────────────────────────────────────────────────────────────────

/// Sampling strategy understood by `algo.betweenness.sampled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    Random,
    Degree,
}

impl SamplingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplingStrategy::Random => "random",
            SamplingStrategy::Degree => "degree",
        }
    }
}

pub fn betweenness_exact() -> Statement {
    Statement::new(
        QueryKind::BetweennessExact,
        "CALL algo.betweenness('Intersection', 'STREET', \
         {direction: 'out', write: true, writeProperty: 'betweenness', weightProperty: 'weight'}) \
         YIELD nodes RETURN nodes",
    )
    .returning(&["nodes"])
}

pub fn betweenness_sampled(strategy: SamplingStrategy, probability: f64) -> Statement {
    Statement::new(
        QueryKind::BetweennessSampled,
        "CALL algo.betweenness.sampled('Intersection', 'STREET', \
         {strategy: $strategy, probability: $probability, direction: 'out', \
          write: true, writeProperty: 'betweenness', weightProperty: 'weight'}) \
         YIELD nodes RETURN nodes",
    )
    .param("strategy", strategy.as_str())
    .param("probability", probability)
    .returning(&["nodes"])
}

pub fn touch_control() -> Statement {
    Statement::new(
        QueryKind::TouchControl,
        "MERGE (c:Control) SET c.timestamp = localdatetime() \
         RETURN toString(c.timestamp) AS timestamp",
    )
    .returning(&["timestamp"])
}

pub fn read_control() -> Statement {
    Statement::new(
        QueryKind::ReadControl,
        "MATCH (c:Control) WHERE c.timestamp IS NOT NULL \
         RETURN toString(c.timestamp) AS timestamp LIMIT 1",
    )
    .returning(&["timestamp"])
}

// ── Routing and proximity ─────────────────────────────────────────────────────

const PATH_COLUMNS: &[&str] = &["props", "cost"];

/// Weighted shortest path over passable streets only.
pub fn shortest_path(osmid_start: i64, osmid_dest: i64) -> Statement {
    Statement::new(
        QueryKind::ShortestPath,
        "MATCH (start:Intersection {osmid: $osmidStart}), (end:Intersection {osmid: $osmidDest}) \
         CALL algo.shortestPath.stream(start, end, 'weight', { \
           nodeQuery: 'MATCH (n:Intersection) RETURN id(n) AS id', \
           relationshipQuery: 'MATCH (a:Intersection)-[r:STREET]->(b:Intersection) \
             WHERE coalesce(r.interrupted, false) = false \
             RETURN id(a) AS source, id(b) AS target, coalesce(r.weight, 1.0) AS weight', \
           graph: 'cypher', direction: 'OUTGOING'}) \
         YIELD nodeId, cost \
         RETURN properties(algo.asNode(nodeId)) AS props, cost",
    )
    .param("osmidStart", osmid_start)
    .param("osmidDest", osmid_dest)
    .returning(PATH_COLUMNS)
}

/// Weighted shortest path over every street.
pub fn shortest_path_ignoring_interruptions(osmid_start: i64, osmid_dest: i64) -> Statement {
    Statement::new(
        QueryKind::ShortestPathIgnoringInterruptions,
        "MATCH (start:Intersection {osmid: $osmidStart}), (end:Intersection {osmid: $osmidDest}) \
         CALL algo.shortestPath.stream(start, end, 'weight', \
           {nodeQuery: 'Intersection', relationshipQuery: 'STREET', \
            defaultValue: 1.0, direction: 'OUTGOING'}) \
         YIELD nodeId, cost \
         RETURN properties(algo.asNode(nodeId)) AS props, cost",
    )
    .param("osmidStart", osmid_start)
    .param("osmidDest", osmid_dest)
    .returning(PATH_COLUMNS)
}

pub fn critical_top(limit: i64) -> Statement {
    Statement::new(
        QueryKind::CriticalTop,
        "MATCH (a:Intersection) \
         RETURN properties(a) AS props \
         ORDER BY coalesce(a.betweenness, 0.0) DESC, a.osmid LIMIT $limit",
    )
    .param("limit", limit)
    .returning(PROPS)
}

pub fn critical_threshold(threshold: f64) -> Statement {
    Statement::new(
        QueryKind::CriticalThreshold,
        "MATCH (a:Intersection) WHERE a.betweenness > $threshold \
         RETURN properties(a) AS props \
         ORDER BY a.betweenness DESC, a.osmid",
    )
    .param("threshold", threshold)
    .returning(PROPS)
}

/// Closest intersection within `max_distance` of `position`, optionally
/// restricted to a point-of-interest tag.
pub fn nearest(position: Coordinate, category: Option<PoiCategory>, max_distance: f64) -> Statement {
    let filter = category
        .map(|c| format!("WHERE a.{} = true ", c.property()))
        .unwrap_or_default();
    let cypher = format!(
        "MATCH (a:Intersection) {filter}\
         WITH a, distance(point({{longitude: a.longitude, latitude: a.latitude}}), \
                          point({{longitude: $longitude, latitude: $latitude}})) AS dist \
         WHERE dist <= $maxDistance \
         RETURN properties(a) AS props, dist ORDER BY dist, a.osmid LIMIT 1"
    );
    Statement::new(QueryKind::Nearest(category), cypher)
        .param("longitude", position.longitude)
        .param("latitude", position.latitude)
        .param("maxDistance", max_distance)
        .returning(&["props", "dist"])
}

pub fn ping() -> Statement {
    Statement::new(QueryKind::Ping, "RETURN 1 AS ok").returning(&["ok"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::value::Value;

    #[test]
    fn string_values_are_never_interpolated() {
        let req = NewIntersection::new(1, Coordinate::new(0.0, 0.0), "x' }) DETACH DELETE n //")
            .with_reference("O'Connell");
        let stmt = merge_intersection(&req);
        assert!(!stmt.cypher.contains("O'Connell"));
        assert!(!stmt.cypher.contains("DETACH"));
        let props = stmt.param_value("props").and_then(Value::as_map).unwrap();
        assert_eq!(props["ref"], Value::from("O'Connell"));
        assert!(stmt.is_write());
    }

    #[test]
    fn merge_street_binds_endpoints_and_id() {
        let stmt = merge_street(&NewStreet::new(9, 1, 2));
        assert_eq!(stmt.param_value("osmidStart"), Some(&Value::Integer(1)));
        assert_eq!(stmt.param_value("osmidDest"), Some(&Value::Integer(2)));
        assert_eq!(stmt.param_value("id"), Some(&Value::Integer(9)));
        assert!(stmt.cypher.contains("MERGE (a)-[r:STREET {id: $id}]->(b)"));
        assert!(stmt.cypher.contains("WHERE x <> a OR y <> b"));
        assert_eq!(stmt.returns, &["props", "takenStart", "takenDest"]);
    }

    #[test]
    fn reads_are_not_writes() {
        for stmt in [
            intersection_by_id(1),
            street_by_id(1),
            streets_between(1, 2),
            shortest_path(1, 2),
            shortest_path_ignoring_interruptions(1, 2),
            critical_top(3),
            read_control(),
            ping(),
        ] {
            assert!(!stmt.is_write(), "{:?} classified as write", stmt.kind);
        }
    }

    #[test]
    fn only_the_default_path_filters_interruptions() {
        assert!(shortest_path(1, 2).cypher.contains("interrupted"));
        assert!(!shortest_path_ignoring_interruptions(1, 2)
            .cypher
            .contains("interrupted"));
    }

    #[test]
    fn nearest_filters_on_the_tag_property() {
        let stmt = nearest(Coordinate::new(14.0, 40.0), Some(PoiCategory::Hospital), 1000.0);
        assert!(stmt.cypher.contains("WHERE a.hospital = true"));
        assert_eq!(stmt.kind, QueryKind::Nearest(Some(PoiCategory::Hospital)));
        assert_eq!(stmt.param_value("maxDistance"), Some(&Value::Float(1000.0)));

        let plain = nearest(Coordinate::new(14.0, 40.0), None, 10.0);
        assert!(!plain.cypher.contains("= true"));
        assert!(plain.cypher.contains("point({longitude: $longitude"));
    }

    #[test]
    fn sampled_betweenness_binds_strategy() {
        let stmt = betweenness_sampled(SamplingStrategy::Degree, 1.0);
        assert_eq!(stmt.param_value("strategy"), Some(&Value::from("degree")));
        assert!(stmt.is_write());
    }
}
