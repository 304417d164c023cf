//! # Solarsite Core
//!
//! Geometry, raster access and error types shared by the solarsite crates.
//!
//! This crate provides:
//! - [`Ring`]: validated query polygon with bounding box and point-in-polygon test
//! - [`RasterExtent`]: the pixel <-> geographic mapping of a north-up raster
//! - [`RasterSource`]: windowed access to a single-band raster, implemented by
//!   the GeoTIFF-backed [`RasterHandle`] and the in-memory [`GridRaster`]
//! - [`Error`]: the error taxonomy used across the workspace

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use io::RasterHandle;
pub use raster::{GridRaster, PixelWindow, RasterExtent, RasterSource, RasterWindow};
pub use vector::{normalize_ring, point_in_polygon, BoundingBox, Ring};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::RasterHandle;
    pub use crate::raster::{GridRaster, PixelWindow, RasterExtent, RasterSource};
    pub use crate::vector::{normalize_ring, BoundingBox, Ring};
}
