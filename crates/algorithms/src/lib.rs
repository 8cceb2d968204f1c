//! # Headwall Algorithms
//!
//! The geometric stages of the headwall-extraction pipeline:
//!
//! - **mask**: threshold a slope raster into a binary mask
//! - **vectorize**: connected-component extraction into polygons
//! - **filter**: area, shape (rotated-rectangle) and medial-axis-width filters
//! - **buffer**: outward polygon buffering used to regularize narrow shapes
//! - **retreat**: the retreat-distance width estimator behind the width filter

pub mod buffer;
pub mod filter;
pub mod mask;
mod maybe_rayon;
pub mod retreat;
pub mod vectorize;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::{buffer_polygon, BufferParams};
    pub use crate::filter::{
        decompose_multipart, filter_by_area, filter_by_box, polygon_shape_info, remove_larger,
        AreaParams, ShapeInfo, ShapeParams, WidthParams,
    };
    pub use crate::mask::{slope_to_mask, MaskParams, SlopeMask};
    pub use crate::retreat::{RetreatDistance, WidthEstimator, WidthStats};
    pub use crate::vectorize::{vectorize_mask, Connectivity};
    pub use headwall_core::prelude::*;
}
