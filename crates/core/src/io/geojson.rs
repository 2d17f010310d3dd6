//! GeoJSON flood polygon reader
//!
//! Accepts a bare `Polygon` / `MultiPolygon` geometry, a `Feature`, a
//! `FeatureCollection` or a `GeometryCollection`. All polygonal parts are
//! merged into one [`FloodPolygon`]. The legacy (2008) `crs` member is
//! honoured when present; RFC 7946 files carry no CRS.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::FloodPolygon;
use geo_types::{MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, JsonObject, Value};
use std::path::Path;

/// Read a GeoJSON file into a [`FloodPolygon`]
pub fn read_flood_polygon<P: AsRef<Path>>(path: P) -> Result<FloodPolygon> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_flood_polygon(&text)
}

/// Parse GeoJSON text into a [`FloodPolygon`]
pub fn parse_flood_polygon(text: &str) -> Result<FloodPolygon> {
    let root: GeoJson = text.parse()?;
    let mut polygons = Vec::new();

    let crs = match root {
        GeoJson::FeatureCollection(collection) => {
            for feature in collection.features {
                // Null geometries carry nothing to rasterize
                if let Some(geometry) = feature.geometry {
                    collect_polygons(geometry, &mut polygons)?;
                }
            }
            legacy_crs(collection.foreign_members.as_ref())
        }
        GeoJson::Feature(feature) => {
            let crs = legacy_crs(feature.foreign_members.as_ref());
            if let Some(geometry) = feature.geometry {
                collect_polygons(geometry, &mut polygons)?;
            }
            crs
        }
        GeoJson::Geometry(geometry) => {
            let crs = legacy_crs(geometry.foreign_members.as_ref());
            collect_polygons(geometry, &mut polygons)?;
            crs
        }
    };

    if polygons.is_empty() {
        return Err(Error::InvalidGeometry(
            "GeoJSON contains no polygon geometry".into(),
        ));
    }

    Ok(FloodPolygon::new(MultiPolygon::new(polygons), crs))
}

/// CRS named by a 2008-style `crs` member, e.g.
/// `{"type": "name", "properties": {"name": "EPSG:32617"}}`
fn legacy_crs(foreign_members: Option<&JsonObject>) -> Option<CRS> {
    foreign_members?
        .get("crs")?
        .pointer("/properties/name")?
        .as_str()
        .map(CRS::parse)
}

fn collect_polygons(geometry: Geometry, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match geometry.value {
        Value::Polygon(rings) => out.push(Polygon::try_from(Value::Polygon(rings))?),
        Value::MultiPolygon(parts) => {
            let multi = MultiPolygon::<f64>::try_from(Value::MultiPolygon(parts))?;
            out.extend(multi.0);
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_polygons(geometry, out)?;
            }
        }
        other => {
            return Err(Error::InvalidGeometry(format!(
                "flood extent must be polygonal, found {}",
                kind_name(&other)
            )));
        }
    }
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_feature_collection_with_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32617"}},
            "features": [
                {"type": "Feature", "properties": {"id": 1}, "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                        [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
                    ]
                }},
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[20, 0], [30, 0], [30, 10], [20, 0]]],
                        [[[40, 0], [50, 0], [50, 10], [40, 0]]]
                    ]
                }},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        }"#;

        let flood = parse_flood_polygon(text).unwrap();
        assert_eq!(flood.len(), 3);
        assert_eq!(flood.polygons.0[0].interiors().len(), 1);
        assert_eq!(flood.crs.as_ref().and_then(CRS::epsg), Some(32617));
    }

    #[test]
    fn test_parse_bare_polygon_without_crs() {
        let text = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        let flood = parse_flood_polygon(text).unwrap();
        assert_eq!(flood.len(), 1);
        assert!(flood.crs.is_none());
    }

    #[test]
    fn test_parse_geometry_with_legacy_crs() {
        let text = r#"{
            "type": "MultiPolygon",
            "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
            "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]
        }"#;
        let flood = parse_flood_polygon(text).unwrap();
        assert_eq!(flood.len(), 1);
        assert_eq!(flood.crs.as_ref().and_then(CRS::epsg), Some(4326));
    }

    #[test]
    fn test_reject_non_polygonal() {
        let text = r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#;
        let err = parse_flood_polygon(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
        assert!(err.to_string().contains("LineString"));

        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        let err = parse_flood_polygon(empty).unwrap_err();
        assert!(err.to_string().contains("no polygon"));
    }

    #[test]
    fn test_reject_malformed_json() {
        assert_eq!(parse_flood_polygon("{").unwrap_err().kind(), ErrorKind::Io);
        let bad_position = r#"{"type": "Polygon", "coordinates": [[["a", 0], [1, 0], [1, 1]]]}"#;
        assert!(parse_flood_polygon(bad_position).is_err());
    }
}
