//! Result mapping: property maps and rows → domain entities.
//!
//! Required properties raise [`RoadGraphError::Decode`] naming the property
//! when absent or mistyped. Optional properties fall back to fixed defaults:
//! empty strings/lists, `0`/`0.0`, `false`, and a street `weight` of `1.0`.

pub mod geometry;

use crate::driver::value::{PropertyMap, Row, Value};
use crate::edges::street::Street;
use crate::errors::{Result, RoadGraphError};
use crate::nodes::coordinate::Coordinate;
use crate::nodes::intersection::Intersection;

pub use geometry::{decode_geometry, encode_geometry};

/// Default street weight when the property is absent.
pub const DEFAULT_STREET_WEIGHT: f64 = 1.0;

// ── Rows ──────────────────────────────────────────────────────────────────────

/// Fetch a column that must be present and non-null.
pub fn column<'a>(row: &'a Row, name: &str) -> Result<&'a Value> {
    match row.get(name) {
        Some(Value::Null) | None => Err(RoadGraphError::decode(name, "missing result column")),
        Some(value) => Ok(value),
    }
}

/// Fetch a map-valued column (e.g. `properties(a) AS props`).
pub fn map_column<'a>(row: &'a Row, name: &str) -> Result<&'a PropertyMap> {
    let value = column(row, name)?;
    value
        .as_map()
        .ok_or_else(|| type_mismatch(name, "map", value))
}

pub fn i64_column(row: &Row, name: &str) -> Result<i64> {
    let value = column(row, name)?;
    value
        .as_i64()
        .ok_or_else(|| type_mismatch(name, "integer", value))
}

pub fn f64_column(row: &Row, name: &str) -> Result<f64> {
    let value = column(row, name)?;
    value
        .as_f64()
        .ok_or_else(|| type_mismatch(name, "float", value))
}

pub fn string_column(row: &Row, name: &str) -> Result<String> {
    let value = column(row, name)?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| type_mismatch(name, "string", value))
}

pub fn intersection_from_row(row: &Row, name: &str) -> Result<Intersection> {
    intersection_from_props(map_column(row, name)?)
}

pub fn street_from_row(row: &Row, name: &str) -> Result<Street> {
    street_from_props(map_column(row, name)?)
}

// ── Entities ──────────────────────────────────────────────────────────────────

/// Decode an `Intersection` node's properties. `streets` is left unset.
pub fn intersection_from_props(props: &PropertyMap) -> Result<Intersection> {
    Ok(Intersection {
        coordinate: coordinate_from_props(props)?,
        highway: optional_string(props, "highway")?.unwrap_or_default(),
        osmid: required_i64(props, "osmid")?,
        reference: optional_string(props, "ref")?,
        betweenness: optional_f64(props, "betweenness", 0.0)?,
        parking: optional_bool(props, "parking")?,
        hospital: optional_bool(props, "hospital")?,
        bus_stop: optional_bool(props, "busStop")?,
        museum: optional_bool(props, "museum")?,
        streets: None,
    })
}

/// Decode a `STREET` relationship's properties, including its geometry.
pub fn street_from_props(props: &PropertyMap) -> Result<Street> {
    let coordinates = match optional_string(props, geometry::GEOMETRY_PROPERTY)? {
        Some(encoded) => decode_geometry(&encoded)?,
        None => Vec::new(),
    };

    Ok(Street {
        coordinates,
        id: required_i64(props, "id")?,
        access: optional_string(props, "access")?,
        area: optional_string(props, "area")?,
        bridge: optional_string(props, "bridge")?,
        osmid_start: required_i64(props, "osmidStart")?,
        osmid_dest: required_i64(props, "osmidDest")?,
        highway: optional_string(props, "highway")?.unwrap_or_default(),
        junction: optional_string(props, "junction")?,
        key: optional_i64(props, "key")?.unwrap_or(0),
        array_lanes: optional_i64_list(props, "arrayLanes")?,
        length: optional_f64(props, "length", 0.0)?,
        max_speed: optional_string(props, "maxSpeed")?,
        name: optional_string(props, "name")?,
        one_way: optional_bool(props, "oneWay")?,
        osmid_edges: optional_i64_list(props, "osmidEdges")?,
        reference: optional_string(props, "ref")?,
        transport_service: optional_bool(props, "transportService")?,
        tunnel: optional_string(props, "tunnel")?,
        width: optional_string(props, "width")?,
        orig_id: optional_i64(props, "origId")?.unwrap_or(0),
        weight: optional_f64(props, "weight", DEFAULT_STREET_WEIGHT)?,
        flow: optional_f64(props, "flow", 0.0)?,
        average_travel_time: optional_f64(props, "averageTravelTime", 0.0)?,
        interrupted: optional_bool(props, "interrupted")?,
    })
}

pub fn coordinate_from_props(props: &PropertyMap) -> Result<Coordinate> {
    Ok(Coordinate::new(
        required_f64(props, "longitude")?,
        required_f64(props, "latitude")?,
    ))
}

// ── Property helpers ──────────────────────────────────────────────────────────

fn present<'a>(props: &'a PropertyMap, key: &str) -> Option<&'a Value> {
    props.get(key).filter(|v| !v.is_null())
}

fn type_mismatch(key: &str, expected: &str, found: &Value) -> RoadGraphError {
    RoadGraphError::decode(
        key,
        format!("expected {expected}, found {}", found.type_name()),
    )
}

fn required<'a>(props: &'a PropertyMap, key: &str) -> Result<&'a Value> {
    present(props, key).ok_or_else(|| RoadGraphError::decode(key, "missing required property"))
}

fn required_i64(props: &PropertyMap, key: &str) -> Result<i64> {
    let value = required(props, key)?;
    value
        .as_i64()
        .ok_or_else(|| type_mismatch(key, "integer", value))
}

fn required_f64(props: &PropertyMap, key: &str) -> Result<f64> {
    let value = required(props, key)?;
    value
        .as_f64()
        .ok_or_else(|| type_mismatch(key, "float", value))
}

fn optional_i64(props: &PropertyMap, key: &str) -> Result<Option<i64>> {
    present(props, key)
        .map(|v| v.as_i64().ok_or_else(|| type_mismatch(key, "integer", v)))
        .transpose()
}

fn optional_f64(props: &PropertyMap, key: &str, default: f64) -> Result<f64> {
    present(props, key)
        .map(|v| v.as_f64().ok_or_else(|| type_mismatch(key, "float", v)))
        .transpose()
        .map(|v| v.unwrap_or(default))
}

fn optional_bool(props: &PropertyMap, key: &str) -> Result<bool> {
    present(props, key)
        .map(|v| v.as_bool().ok_or_else(|| type_mismatch(key, "boolean", v)))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn optional_string(props: &PropertyMap, key: &str) -> Result<Option<String>> {
    present(props, key)
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| type_mismatch(key, "string", v))
        })
        .transpose()
}

fn optional_i64_list(props: &PropertyMap, key: &str) -> Result<Vec<i64>> {
    let Some(value) = present(props, key) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_list()
        .ok_or_else(|| type_mismatch(key, "list", value))?;
    items
        .iter()
        .map(|item| item.as_i64().ok_or_else(|| type_mismatch(key, "integer", item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Value)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn full_intersection_props() -> PropertyMap {
        props(&[
            ("osmid", Value::Integer(13445152)),
            ("longitude", Value::Float(14.25)),
            ("latitude", Value::Float(40.85)),
            ("highway", Value::from("traffic_signals")),
            ("ref", Value::from("12")),
            ("betweenness", Value::Float(3.5)),
            ("parking", Value::Boolean(true)),
            ("hospital", Value::Boolean(false)),
            ("busStop", Value::Boolean(true)),
            ("museum", Value::Boolean(false)),
        ])
    }

    #[test]
    fn decodes_full_intersection() {
        let i = intersection_from_props(&full_intersection_props()).unwrap();
        assert_eq!(i.osmid, 13445152);
        assert_eq!(i.coordinate, Coordinate::new(14.25, 40.85));
        assert_eq!(i.highway, "traffic_signals");
        assert_eq!(i.reference.as_deref(), Some("12"));
        assert_eq!(i.betweenness, 3.5);
        assert!(i.parking && i.bus_stop && !i.hospital && !i.museum);
        assert!(i.streets.is_none());
    }

    #[test]
    fn intersection_optional_fields_default() {
        let p = props(&[
            ("osmid", Value::Integer(1)),
            ("longitude", Value::Integer(14)),
            ("latitude", Value::Float(40.0)),
            ("ref", Value::Null),
        ]);
        let i = intersection_from_props(&p).unwrap();
        assert_eq!(i.highway, "");
        assert!(i.reference.is_none());
        assert_eq!(i.betweenness, 0.0);
        assert!(!i.parking && !i.hospital && !i.bus_stop && !i.museum);
        assert_eq!(i.coordinate.longitude, 14.0);
    }

    #[test]
    fn missing_osmid_is_named() {
        let mut p = full_intersection_props();
        p.remove("osmid");
        match intersection_from_props(&p).unwrap_err() {
            RoadGraphError::Decode { property, .. } => assert_eq!(property, "osmid"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn mistyped_flag_is_a_decode_error() {
        let mut p = full_intersection_props();
        p.insert("parking".into(), Value::from("yes"));
        let err = intersection_from_props(&p).unwrap_err();
        assert!(err.to_string().contains("`parking`"));
        assert!(err.to_string().contains("expected boolean, found string"));
    }

    #[test]
    fn decodes_street_with_geometry_and_lists() {
        let p = props(&[
            ("id", Value::Integer(7)),
            ("osmidStart", Value::Integer(1)),
            ("osmidDest", Value::Integer(2)),
            ("coordinates", Value::from("14.1,40.1;14.2,40.2")),
            ("arrayLanes", Value::from(vec![2_i64, 3])),
            ("osmidEdges", Value::from(vec![100_i64, 101, 102])),
            ("name", Value::from("Via Chiaia")),
            ("weight", Value::Float(4.0)),
            ("interrupted", Value::Boolean(true)),
            ("length", Value::Integer(120)),
        ]);
        let s = street_from_props(&p).unwrap();
        assert_eq!(s.id, 7);
        assert_eq!(s.coordinates.len(), 2);
        assert_eq!(s.coordinates[1], Coordinate::new(14.2, 40.2));
        assert_eq!(s.array_lanes, vec![2, 3]);
        assert_eq!(s.osmid_edges, vec![100, 101, 102]);
        assert_eq!(s.name.as_deref(), Some("Via Chiaia"));
        assert_eq!(s.weight, 4.0);
        assert_eq!(s.length, 120.0);
        assert!(s.interrupted);
    }

    #[test]
    fn street_optional_fields_default() {
        let p = props(&[
            ("id", Value::Integer(7)),
            ("osmidStart", Value::Integer(1)),
            ("osmidDest", Value::Integer(2)),
        ]);
        let s = street_from_props(&p).unwrap();
        assert!(s.coordinates.is_empty());
        assert!(s.array_lanes.is_empty());
        assert!(s.osmid_edges.is_empty());
        assert_eq!(s.weight, DEFAULT_STREET_WEIGHT);
        assert_eq!(s.flow, 0.0);
        assert_eq!(s.key, 0);
        assert!(s.name.is_none());
        assert!(!s.interrupted && !s.one_way && !s.transport_service);
    }

    #[test]
    fn street_missing_endpoint_is_named() {
        let p = props(&[("id", Value::Integer(7)), ("osmidStart", Value::Integer(1))]);
        let err = street_from_props(&p).unwrap_err();
        assert!(err.to_string().contains("`osmidDest`"));
    }

    #[test]
    fn row_helpers_report_missing_columns() {
        let row = Row::new().with("count", 3_i64);
        assert_eq!(i64_column(&row, "count").unwrap(), 3);
        assert!(map_column(&row, "props").is_err());
        assert!(string_column(&row, "count").is_err());
    }
}
