//! Entity → parameter map rendering.
//!
//! Absent collections become empty lists; numbers and booleans keep their
//! native type; geometry is bound in its persisted string encoding.

use crate::driver::value::{PropertyMap, Value};
use crate::edges::street::NewStreet;
use crate::mapper::geometry::{encode_geometry, GEOMETRY_PROPERTY};
use crate::nodes::intersection::NewIntersection;

fn put(map: &mut PropertyMap, key: &str, value: impl Into<Value>) {
    map.insert(key.to_owned(), value.into());
}

/// Properties written onto an `Intersection` node.
///
/// `betweenness` is deliberately absent: it is initialised on creation and
/// otherwise owned by the centrality procedures.
pub fn intersection_props(req: &NewIntersection) -> PropertyMap {
    let mut map = PropertyMap::new();
    put(&mut map, "osmid", req.osmid);
    put(&mut map, "longitude", req.coordinate.longitude);
    put(&mut map, "latitude", req.coordinate.latitude);
    put(&mut map, "highway", req.highway.as_str());
    put(&mut map, "ref", req.reference.clone());
    put(&mut map, "parking", req.parking);
    put(&mut map, "hospital", req.hospital);
    put(&mut map, "busStop", req.bus_stop);
    put(&mut map, "museum", req.museum);
    map
}

/// Properties written onto a `STREET` relationship.
pub fn street_props(req: &NewStreet) -> PropertyMap {
    let geometry = req
        .coordinates
        .as_deref()
        .map(encode_geometry)
        .unwrap_or_default();

    let mut map = PropertyMap::new();
    put(&mut map, GEOMETRY_PROPERTY, geometry);
    put(&mut map, "id", req.id);
    put(&mut map, "access", req.access.clone());
    put(&mut map, "area", req.area.clone());
    put(&mut map, "bridge", req.bridge.clone());
    put(&mut map, "osmidStart", req.osmid_start);
    put(&mut map, "osmidDest", req.osmid_dest);
    put(&mut map, "highway", req.highway.as_str());
    put(&mut map, "junction", req.junction.clone());
    put(&mut map, "key", req.key);
    put(&mut map, "arrayLanes", req.array_lanes.clone().unwrap_or_default());
    put(&mut map, "length", req.length);
    put(&mut map, "maxSpeed", req.max_speed.clone());
    put(&mut map, "name", req.name.clone());
    put(&mut map, "oneWay", req.one_way);
    put(&mut map, "osmidEdges", req.osmid_edges.clone().unwrap_or_default());
    put(&mut map, "ref", req.reference.clone());
    put(&mut map, "transportService", req.transport_service);
    put(&mut map, "tunnel", req.tunnel.clone());
    put(&mut map, "width", req.width.clone());
    put(&mut map, "origId", req.orig_id);
    put(&mut map, "weight", req.weight);
    put(&mut map, "flow", req.flow);
    put(&mut map, "averageTravelTime", req.average_travel_time);
    put(&mut map, "interrupted", req.interrupted);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::coordinate::Coordinate;
    use crate::nodes::intersection::PoiCategory;

    #[test]
    fn intersection_props_keep_native_types() {
        let req = NewIntersection::new(11, Coordinate::new(14.5, 40.25), "crossing")
            .with_tag(PoiCategory::BusStop);
        let map = intersection_props(&req);
        assert_eq!(map["osmid"], Value::Integer(11));
        assert_eq!(map["longitude"], Value::Float(14.5));
        assert_eq!(map["busStop"], Value::Boolean(true));
        assert_eq!(map["ref"], Value::Null);
        assert!(!map.contains_key("betweenness"));
    }

    #[test]
    fn absent_collections_render_as_empty_lists() {
        let map = street_props(&NewStreet::new(1, 2, 3));
        assert_eq!(map["arrayLanes"], Value::List(vec![]));
        assert_eq!(map["osmidEdges"], Value::List(vec![]));
        assert_eq!(map["coordinates"], Value::from(""));
        assert_eq!(map["weight"], Value::Float(1.0));
    }

    #[test]
    fn geometry_is_bound_encoded() {
        let req = NewStreet::new(1, 2, 3).with_coordinates(vec![
            Coordinate::new(1.5, 2.5),
            Coordinate::new(3.0, 4.0),
        ]);
        let map = street_props(&req);
        assert_eq!(map["coordinates"], Value::from("1.5,2.5;3,4"));
    }
}
