//! Street geometry codec.
//!
//! Geometry is persisted as a single string property: `lon,lat` pairs joined
//! by `;`. Older loaders wrote the debug rendering of a coordinate list
//! (`Coordinate [longitude=X, latitude=Y], Coordinate [...]`); both forms are
//! accepted on read, only the compact form is written.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{Result, RoadGraphError};
use crate::nodes::coordinate::Coordinate;

/// Property name holding the encoded geometry.
pub const GEOMETRY_PROPERTY: &str = "coordinates";

static LEGACY_POINT_RE: OnceLock<Regex> = OnceLock::new();

fn legacy_point_re() -> &'static Regex {
    LEGACY_POINT_RE.get_or_init(|| {
        Regex::new(r"longitude\s*=\s*([^,\]\s]+)\s*,\s*latitude\s*=\s*([^,\]\s]+)")
            .expect("static regex is valid")
    })
}

/// Encode a coordinate sequence as `lon,lat;lon,lat;...`.
///
/// Numbers use Rust's shortest round-trip formatting, so decoding restores
/// the exact `f64` values.
pub fn encode_geometry(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{},{}", c.longitude, c.latitude))
        .collect::<Vec<_>>()
        .join(";")
}

/// Decode a persisted geometry string. Empty input yields an empty sequence.
pub fn decode_geometry(encoded: &str) -> Result<Vec<Coordinate>> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    if encoded.contains("longitude") {
        return decode_legacy(encoded);
    }

    encoded
        .split(';')
        .map(str::trim)
        .filter(|point| !point.is_empty())
        .map(decode_point)
        .collect()
}

fn decode_point(point: &str) -> Result<Coordinate> {
    let mut parts = point.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lon), Some(lat), None) => Ok(Coordinate::new(
            parse_component(lon, point)?,
            parse_component(lat, point)?,
        )),
        _ => Err(RoadGraphError::decode(
            GEOMETRY_PROPERTY,
            format!("expected `longitude,latitude`, got `{point}`"),
        )),
    }
}

fn decode_legacy(encoded: &str) -> Result<Vec<Coordinate>> {
    let points: Vec<Coordinate> = legacy_point_re()
        .captures_iter(encoded)
        .map(|caps| -> Result<Coordinate> {
            Ok(Coordinate::new(
                parse_component(&caps[1], encoded)?,
                parse_component(&caps[2], encoded)?,
            ))
        })
        .collect::<Result<_>>()?;

    if points.is_empty() {
        return Err(RoadGraphError::decode(
            GEOMETRY_PROPERTY,
            format!("unrecognised geometry `{encoded}`"),
        ));
    }
    Ok(points)
}

fn parse_component(raw: &str, context: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|e| {
        RoadGraphError::decode(
            GEOMETRY_PROPERTY,
            format!("invalid number `{raw}` in `{context}`: {e}"),
        )
    })
}
