//! GeoJSON persistence for polygon sets
//!
//! One FeatureCollection per set, one feature per polygon, attribute
//! columns as feature properties. The CRS identifier rides along as a
//! legacy `crs` foreign member so it survives the round trip (the
//! pipeline propagates it; it never reprojects).

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::PolygonSet;
use geo_types::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::{json, Map as JsonMap};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Write a polygon set to a GeoJSON file
pub fn write_polygon_set<P: AsRef<Path>>(set: &PolygonSet, path: P) -> Result<()> {
    let mut features = Vec::with_capacity(set.len());

    for (idx, geom) in set.geometries().iter().enumerate() {
        let value = match geom {
            Geometry::Polygon(p) => geojson::Value::from(p),
            Geometry::MultiPolygon(mp) => geojson::Value::from(mp),
            other => {
                return Err(Error::Geometry(format!(
                    "polygon set holds non-polygon geometry: {:?}",
                    geometry_kind(other)
                )))
            }
        };

        let mut properties = JsonMap::new();
        for (name, vals) in set.columns() {
            properties.insert(name.clone(), json!(vals[idx]));
        }

        features.push(Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(value)),
            id: Some(geojson::feature::Id::Number(idx.into())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let foreign_members = set.crs().map(|crs| {
        let mut members = JsonMap::new();
        members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": crs.identifier() } }),
        );
        members
    });

    let fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };

    fs::write(path.as_ref(), GeoJson::FeatureCollection(fc).to_string())?;
    Ok(())
}

/// Read a polygon set from a GeoJSON file.
///
/// Column alignment is re-validated: every feature must carry every
/// numeric property present in the file.
pub fn read_polygon_set<P: AsRef<Path>>(path: P) -> Result<PolygonSet> {
    let text = fs::read_to_string(path.as_ref())?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| Error::Vector(format!("{}: {}", path.as_ref().display(), e)))?;

    let fc = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(Error::Vector(format!(
                "{}: expected a FeatureCollection",
                path.as_ref().display()
            )))
        }
    };

    let crs = read_crs(&fc);

    let mut geoms = Vec::with_capacity(fc.features.len());
    let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (idx, feature) in fc.features.iter().enumerate() {
        let geometry = feature.geometry.as_ref().ok_or_else(|| {
            Error::Vector(format!("feature {} has no geometry", idx))
        })?;

        let geom = Geometry::<f64>::try_from(geometry.value.clone())
            .map_err(|e| Error::Geometry(format!("feature {}: {}", idx, e)))?;

        match geom {
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => geoms.push(geom),
            other => {
                return Err(Error::Geometry(format!(
                    "feature {} is not a polygon: {:?}",
                    idx,
                    geometry_kind(&other)
                )))
            }
        }

        if let Some(props) = &feature.properties {
            for (name, value) in props {
                if let Some(v) = value.as_f64() {
                    columns.entry(name.clone()).or_default().push(v);
                }
            }
        }
    }

    let mut set = PolygonSet::from_geometries(geoms, crs);
    for (name, vals) in columns {
        set.attach_column(name, vals)?;
    }
    Ok(set)
}

/// Append attribute columns to an existing GeoJSON file, aligned by record
/// order. Existing columns of the same name are replaced.
pub fn attach_attributes<P: AsRef<Path>>(
    path: P,
    values: &BTreeMap<String, Vec<f64>>,
) -> Result<()> {
    let mut set = read_polygon_set(path.as_ref())?;
    for (name, vals) in values {
        set.attach_column(name.clone(), vals.clone())?;
    }
    write_polygon_set(&set, path)
}

/// Check whether a vector file carries a given attribute field
pub fn has_field<P: AsRef<Path>>(path: P, field: &str) -> Result<bool> {
    let set = read_polygon_set(path)?;
    Ok(set.column(field).is_some() && !set.is_empty())
}

/// Copy a vector file to a new location
pub fn copy_vector_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<()> {
    fs::copy(src.as_ref(), dst.as_ref())?;
    Ok(())
}

fn read_crs(fc: &FeatureCollection) -> Option<CRS> {
    let members = fc.foreign_members.as_ref()?;
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    if let Some(code) = name.strip_prefix("EPSG:") {
        if let Ok(epsg) = code.parse::<u32>() {
            return Some(CRS::from_epsg(epsg));
        }
    }
    Some(CRS::from_wkt(name))
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
