//! Georeferencing of a north-up raster and the pixel <-> geographic mapping
//!
//! This is the only place the coordinate mapping is written down. Row 0 is
//! the northern edge of the raster (top-left origin), so the row axis runs
//! opposite to latitude:
//!
//! ```text
//! col = round((x - min_x) / (max_x - min_x) * (width  - 1))
//! row = round((max_y - y) / (max_y - min_y) * (height - 1))
//! ```
//!
//! The inverse returns the centre of a cell, `(index + 0.5) / size` along
//! each axis, which maps back onto the same index through the forward
//! formula for every pixel of the raster.

use super::PixelWindow;
use crate::error::{Error, Result};
use crate::vector::BoundingBox;
use serde::{Deserialize, Serialize};

/// Bounding box and pixel dimensions of a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterExtent {
    /// Western edge (minimum longitude)
    pub min_x: f64,
    /// Southern edge (minimum latitude)
    pub min_y: f64,
    /// Eastern edge (maximum longitude)
    pub max_x: f64,
    /// Northern edge (maximum latitude)
    pub max_y: f64,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl RasterExtent {
    /// Create an extent, validating dimensions and bounds
    pub fn new(bounds: BoundingBox, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_parameter(
                "dimensions",
                format!("{}x{}", width, height),
                "raster must have at least one pixel",
            ));
        }
        let finite = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || bounds.max_x <= bounds.min_x || bounds.max_y <= bounds.min_y {
            return Err(Error::invalid_parameter(
                "bounds",
                format!("{:?}", bounds),
                "bounds must be finite with max > min on both axes",
            ));
        }

        Ok(Self {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            max_x: bounds.max_x,
            max_y: bounds.max_y,
            width,
            height,
        })
    }

    /// Create from an upper-left origin and cell size (GeoTIFF tiepoint + pixel scale)
    pub fn from_origin(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let pixel_height = pixel_height.abs();
        Self::new(
            BoundingBox::new(
                origin_x,
                origin_y - pixel_height * height as f64,
                origin_x + pixel_width * width as f64,
                origin_y,
            ),
            width,
            height,
        )
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Cell size as (x, y)
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            (self.max_x - self.min_x) / self.width as f64,
            (self.max_y - self.min_y) / self.height as f64,
        )
    }

    /// Geographic coordinates to integer pixel indices (may fall outside the raster)
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let fx = (x - self.min_x) / (self.max_x - self.min_x) * (self.width - 1) as f64;
        let fy = (self.max_y - y) / (self.max_y - self.min_y) * (self.height - 1) as f64;
        (fx.round() as i64, fy.round() as i64)
    }

    /// Pixel indices to the geographic coordinates of the cell centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.min_x + (col as f64 + 0.5) / self.width as f64 * (self.max_x - self.min_x);
        let y = self.max_y - (row as f64 + 0.5) / self.height as f64 * (self.max_y - self.min_y);
        (x, y)
    }

    /// Unclamped pixel window covering a geographic bounding box
    pub fn window_for(&self, bbox: &BoundingBox) -> PixelWindow {
        // north edge maps to the smallest row
        let (col_min, row_min) = self.geo_to_pixel(bbox.min_x, bbox.max_y);
        let (col_max, row_max) = self.geo_to_pixel(bbox.max_x, bbox.min_y);
        PixelWindow::new(col_min, col_max, row_min, row_max)
    }

    /// Window covering every pixel of the raster
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::new(0, self.width as i64 - 1, 0, self.height as i64 - 1)
    }
}
