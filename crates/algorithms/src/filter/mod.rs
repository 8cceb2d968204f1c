//! Polygon filtering stages
//!
//! Progressive candidate elimination:
//! - **area**: drop polygons outside the accepted area window, decompose
//!   composite survivors, drop decomposition slivers
//! - **shape**: drop polygons whose rotated-bounding-box long side is too long
//! - **width**: drop polygons whose estimated medial-axis width is too large

mod area;
mod shape;
mod width;

pub use area::{decompose_multipart, filter_by_area, AreaParams};
pub use shape::{
    filter_by_box, polygon_shape_info, ShapeInfo, ShapeParams, HEIGHT_FIELD, WIDTH_FIELD,
};
pub use width::{correct_widths, remove_larger, WidthParams, E_MAX_DIS, POLY_ID};
