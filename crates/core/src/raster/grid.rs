//! In-memory raster grid

use crate::error::{Error, Result};
use crate::raster::{PixelWindow, RasterExtent, RasterSource, RasterWindow};
use ndarray::{s, Array2};

/// A georeferenced single-band raster held in memory.
///
/// Implements [`RasterSource`] so it can be sampled exactly like a file-backed
/// [`RasterHandle`](crate::io::RasterHandle). Also the input type of
/// [`write_geotiff`](crate::io::write_geotiff).
///
/// # Example
///
/// ```ignore
/// use solarsite_core::{BoundingBox, GridRaster, RasterExtent};
///
/// let extent = RasterExtent::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 100, 100)?;
/// let mut grid = GridRaster::filled(extent, 5.2);
/// grid.set(10, 20, 6.1)?;
/// ```
#[derive(Debug, Clone)]
pub struct GridRaster {
    /// Samples in row-major order (row, col); row 0 is the northern edge
    data: Array2<f64>,
    extent: RasterExtent,
    nodata: Option<f64>,
    units: Option<String>,
}

impl GridRaster {
    /// Create a grid filled with a constant value
    pub fn filled(extent: RasterExtent, value: f64) -> Self {
        Self {
            data: Array2::from_elem((extent.height, extent.width), value),
            extent,
            nodata: None,
            units: None,
        }
    }

    /// Create a grid from row-major samples
    pub fn from_vec(extent: RasterExtent, data: Vec<f64>) -> Result<Self> {
        if data.len() != extent.width * extent.height {
            return Err(Error::invalid_parameter(
                "data",
                data.len(),
                format!("expected {} samples", extent.width * extent.height),
            ));
        }
        let array = Array2::from_shape_vec((extent.height, extent.width), data)
            .map_err(|e| Error::invalid_parameter("data", "shape", e.to_string()))?;
        Ok(Self {
            data: array,
            extent,
            nodata: None,
            units: None,
        })
    }

    /// Create a grid by evaluating `f(col, row)` for every pixel
    pub fn from_fn(extent: RasterExtent, f: impl Fn(usize, usize) -> f64) -> Self {
        Self {
            data: Array2::from_shape_fn((extent.height, extent.width), |(row, col)| f(col, row)),
            extent,
            nodata: None,
            units: None,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Get value at (col, row)
    pub fn get(&self, col: usize, row: usize) -> Result<f64> {
        self.data.get((row, col)).copied().ok_or_else(|| {
            Error::invalid_parameter(
                "index",
                format!("({}, {})", col, row),
                format!("outside {}x{} grid", self.cols(), self.rows()),
            )
        })
    }

    /// Set value at (col, row)
    pub fn set(&mut self, col: usize, row: usize, value: f64) -> Result<()> {
        let (cols, rows) = (self.cols(), self.rows());
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::invalid_parameter(
                "index",
                format!("({}, {})", col, row),
                format!("outside {}x{} grid", cols, rows),
            )),
        }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }
}

impl RasterSource for GridRaster {
    fn extent(&self) -> &RasterExtent {
        &self.extent
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    fn read_window(&mut self, window: PixelWindow) -> Result<RasterWindow> {
        let w = window.clamp_non_empty(self.extent.width, self.extent.height)?;
        let view = self.data.slice(s![
            w.row_min as usize..=w.row_max as usize,
            w.col_min as usize..=w.col_max as usize
        ]);
        RasterWindow::new(w, view.to_owned())
    }
}
