//! Binary slope mask
//!
//! Thresholds a slope surface (degrees) into a {0, 255} mask. Slopes above
//! the artifact ceiling are forced to 0: values that steep come from DEM
//! artifacts (mosaic seams, interpolation spikes), not real terrain, and
//! must never be classified as headwall regardless of the threshold.

use crate::maybe_rayon::*;
use headwall_core::raster::Raster;
use headwall_core::{Algorithm, Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Mask cell value for cells above the slope threshold
pub const FOREGROUND: u8 = 255;

/// Parameters for mask generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskParams {
    /// Slope threshold in degrees; cells strictly above become foreground
    pub threshold: f64,
    /// Slopes strictly above this are treated as artifacts and zeroed
    pub artifact_ceiling: f64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            artifact_ceiling: 88.0,
        }
    }
}

/// Slope-mask algorithm
#[derive(Debug, Clone, Default)]
pub struct SlopeMask;

impl Algorithm for SlopeMask {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = MaskParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SlopeMask"
    }

    fn description(&self) -> &'static str {
        "Threshold a slope raster into a binary headwall-candidate mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope_to_mask(&input, &params)
    }
}

/// Build the binary mask from a slope raster.
///
/// `slope > threshold → 255`, everything else 0; nodata cells and slopes
/// above `artifact_ceiling` are always 0. The output carries the source's
/// transform and CRS with nodata 0.
pub fn slope_to_mask(slope: &Raster<f64>, params: &MaskParams) -> Result<Raster<u8>> {
    let (rows, cols) = slope.shape();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];

            for col in 0..cols {
                let v = slope.data()[(row, col)];
                if slope.is_nodata(v) {
                    continue;
                }
                if v > params.threshold && v <= params.artifact_ceiling {
                    row_data[col] = FOREGROUND;
                }
            }

            row_data
        })
        .collect();

    let mut output = slope.with_same_meta::<u8>();
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slope_raster(values: &[(usize, usize, f64)]) -> Raster<f64> {
        let mut r: Raster<f64> = Raster::new(10, 10);
        r.set_nodata(Some(-9999.0));
        for &(row, col, v) in values {
            r.set(row, col, v).unwrap();
        }
        r
    }

    #[test]
    fn test_threshold() {
        let slope = slope_raster(&[(2, 2, 25.0), (3, 3, 19.9), (4, 4, 20.0)]);
        let mask = slope_to_mask(&slope, &MaskParams::default()).unwrap();

        assert_eq!(mask.get(2, 2).unwrap(), FOREGROUND);
        // Strictly-above semantics: exactly at the threshold stays 0
        assert_eq!(mask.get(4, 4).unwrap(), 0);
        assert_eq!(mask.get(3, 3).unwrap(), 0);
    }

    #[test]
    fn test_artifact_ceiling() {
        // Above 88 degrees is an artifact no matter the threshold
        let slope = slope_raster(&[(1, 1, 89.5), (2, 2, 88.0), (3, 3, 45.0)]);
        let mask = slope_to_mask(&slope, &MaskParams::default()).unwrap();

        assert_eq!(mask.get(1, 1).unwrap(), 0);
        assert_eq!(mask.get(2, 2).unwrap(), FOREGROUND);
        assert_eq!(mask.get(3, 3).unwrap(), FOREGROUND);

        let low = slope_to_mask(
            &slope,
            &MaskParams {
                threshold: 1.0,
                ..MaskParams::default()
            },
        )
        .unwrap();
        assert_eq!(low.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_nodata_is_background() {
        let mut slope = slope_raster(&[(5, 5, 30.0)]);
        slope.set(6, 6, -9999.0).unwrap();
        let mask = slope_to_mask(&slope, &MaskParams::default()).unwrap();

        assert_eq!(mask.get(6, 6).unwrap(), 0);
        assert_eq!(mask.get(5, 5).unwrap(), FOREGROUND);
        assert_eq!(mask.nodata(), Some(0));
    }

    #[test]
    fn test_algorithm_interface() {
        let slope = slope_raster(&[(2, 2, 25.0)]);
        let mask = SlopeMask.execute_default(slope).unwrap();
        assert_eq!(mask.get(2, 2).unwrap(), FOREGROUND);
    }

    #[test]
    fn test_metadata_propagation() {
        let mut slope = slope_raster(&[]);
        slope.set_transform(headwall_core::GeoTransform::new(1000.0, 2000.0, 2.0, -2.0));
        slope.set_crs(Some(headwall_core::CRS::from_epsg(32606)));

        let mask = slope_to_mask(&slope, &MaskParams::default()).unwrap();
        assert_eq!(mask.transform().origin_x, 1000.0);
        assert_eq!(mask.crs().and_then(|c| c.epsg()), Some(32606));
    }
}
