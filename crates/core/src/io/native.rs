//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate for TIFF I/O. Slope surfaces and other float
//! rasters are written as 32-bit grayscale; binary masks (and any other
//! integer raster) as 8-bit grayscale. Georeferencing travels in the
//! ModelPixelScale/ModelTiepoint tags, the no-data value in the
//! GDAL_NODATA ASCII tag. For full GeoTIFF support (projection metadata,
//! compression options), enable the `gdal` feature.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// Options for writing GeoTIFF files
///
/// The native writer records these but only the `gdal` feature honors
/// compression, tiling and BigTIFF.
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression type: "DEFLATE", "LZW", "ZSTD", "NONE"
    pub compression: String,
    /// Tile size for tiled TIFFs (0 for strips)
    pub tile_size: usize,
    /// BigTIFF for files > 4GB
    pub bigtiff: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "LZW".to_string(),
            tile_size: 256,
            bigtiff: false,
        }
    }
}

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, _band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    if let Ok(text) = decoder.get_tag_ascii_string(Tag::GdalNodata) {
        if let Ok(nd) = text.trim().trim_end_matches('\0').parse::<f64>() {
            raster.set_nodata(num_traits::cast(nd));
        }
    }

    Ok(raster)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Attempt to read GeoTransform from TIFF tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Write a Raster to a GeoTIFF file.
///
/// Integer rasters (the binary mask) are encoded as 8-bit grayscale,
/// everything else as 32-bit float grayscale.
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    _options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let gt = *raster.transform();
    let nodata = raster.nodata().and_then(|nd| nd.to_f64());

    // The tiff encoder types carry generics we'd rather not name; a local
    // macro keeps the two colortype paths identical in structure.
    macro_rules! encode {
        ($color:ty, $pixel:ty, $fallback:expr) => {{
            let data: Vec<$pixel> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or($fallback))
                .collect();

            let mut image = encoder
                .new_image::<$color>(cols as u32, rows as u32)
                .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

            let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])
                .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

            let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])
                .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

            // Minimal GeoKey directory so downstream tools recognize a
            // projected, pixel-is-area GeoTIFF.
            let geokeys: [u16; 12] = [
                1, 1, 0, 2, // Version 1.1.0, 2 keys
                1024, 0, 1, 1, // GTModelTypeGeoKey = ModelTypeProjected
                1025, 0, 1, 1, // GTRasterTypeGeoKey = RasterPixelIsArea
            ];
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &geokeys[..])
                .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

            if let Some(nd) = nodata {
                let text = if nd.fract() == 0.0 {
                    format!("{}", nd as i64)
                } else {
                    format!("{}", nd)
                };
                image
                    .encoder()
                    .write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())
                    .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
            }

            image
                .write_data(&data)
                .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
        }};
    }

    if T::is_float() {
        encode!(Gray32Float, f32, f32::NAN);
    } else {
        encode!(Gray8, u8, 0u8);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_roundtrip() {
        let mut raster: Raster<f64> = Raster::new(20, 30);
        raster.set_transform(GeoTransform::new(500000.0, 7000000.0, 2.0, -2.0));
        raster.set_nodata(Some(-9999.0));
        for r in 0..20 {
            for c in 0..30 {
                raster.set(r, c, (r * 30 + c) as f64).unwrap();
            }
        }

        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();

        let loaded: Raster<f64> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(loaded.shape(), raster.shape());
        assert_eq!(loaded.get(10, 15).unwrap(), raster.get(10, 15).unwrap());
        assert_eq!(loaded.nodata(), Some(-9999.0));
        assert_eq!(loaded.transform().origin_x, 500000.0);
        assert_eq!(loaded.cell_size(), 2.0);
    }

    #[test]
    fn test_mask_roundtrip_u8() {
        let mut mask: Raster<u8> = Raster::new(8, 8);
        mask.set_nodata(Some(0));
        mask.set(3, 3, 255).unwrap();
        mask.set(3, 4, 255).unwrap();

        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&mask, tmp.path(), None).unwrap();

        let loaded: Raster<u8> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(loaded.get(3, 3).unwrap(), 255);
        assert_eq!(loaded.get(0, 0).unwrap(), 0);
        assert_eq!(loaded.count_value(255), 2);
    }
}
