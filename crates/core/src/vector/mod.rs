//! Polygon-set vector model
//!
//! A `PolygonSet` is an ordered collection of polygon geometries with a
//! parallel attribute table: every column maps an attribute name to one
//! scalar value per geometry, in geometry order. The alignment invariant
//! (`column.len() == geometries.len()`) is enforced on attach and on load;
//! filters produce new sets that keep surviving rows in insertion order.

mod geojson_io;

pub use geojson_io::{
    attach_attributes, copy_vector_file, has_field, read_polygon_set, write_polygon_set,
};

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::Geometry;
use std::collections::BTreeMap;

/// Ordered polygons plus a parallel attribute table.
///
/// Geometries are `Polygon` or `MultiPolygon`; composite records survive
/// only until the area filter decomposes them.
#[derive(Debug, Clone, Default)]
pub struct PolygonSet {
    geoms: Vec<Geometry<f64>>,
    columns: BTreeMap<String, Vec<f64>>,
    crs: Option<CRS>,
}

impl PolygonSet {
    /// Create a set from geometries, with no attributes yet
    pub fn from_geometries(geoms: Vec<Geometry<f64>>, crs: Option<CRS>) -> Self {
        Self {
            geoms,
            columns: BTreeMap::new(),
            crs,
        }
    }

    /// Number of geometries
    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    /// Whether the set holds no geometries
    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    /// All geometries, in insertion order
    pub fn geometries(&self) -> &[Geometry<f64>] {
        &self.geoms
    }

    /// Geometry at index
    pub fn geometry(&self, idx: usize) -> Option<&Geometry<f64>> {
        self.geoms.get(idx)
    }

    /// The coordinate reference system, if known
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Attach an attribute column, replacing any column of the same name.
    ///
    /// Fails if the column length does not match the geometry count.
    pub fn attach_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.geoms.len() {
            return Err(Error::ColumnLengthMismatch {
                column: name,
                expected: self.geoms.len(),
                got: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Get an attribute column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// All attribute columns
    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    /// Build a new set containing the rows at `indices`, in the given order,
    /// with all attribute columns sliced accordingly.
    pub fn subset(&self, indices: &[usize]) -> PolygonSet {
        let geoms = indices
            .iter()
            .filter_map(|&i| self.geoms.get(i).cloned())
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, vals)| {
                let sliced = indices
                    .iter()
                    .filter_map(|&i| vals.get(i).copied())
                    .collect();
                (name.clone(), sliced)
            })
            .collect();
        PolygonSet {
            geoms,
            columns,
            crs: self.crs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry};

    fn unit_square(offset: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: offset, y: 0.0),
            (x: offset + 1.0, y: 0.0),
            (x: offset + 1.0, y: 1.0),
            (x: offset, y: 1.0),
            (x: offset, y: 0.0),
        ])
    }

    #[test]
    fn test_attach_column_alignment() {
        let mut set = PolygonSet::from_geometries(vec![unit_square(0.0), unit_square(2.0)], None);
        assert!(set.attach_column("WIDTH", vec![1.0, 2.0]).is_ok());
        assert!(set.attach_column("BAD", vec![1.0]).is_err());
        assert_eq!(set.column("WIDTH"), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_subset_keeps_order_and_columns() {
        let mut set = PolygonSet::from_geometries(
            vec![unit_square(0.0), unit_square(2.0), unit_square(4.0)],
            None,
        );
        set.attach_column("v", vec![10.0, 20.0, 30.0]).unwrap();

        let sub = set.subset(&[2, 0]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.column("v"), Some(&[30.0, 10.0][..]));
    }
}
