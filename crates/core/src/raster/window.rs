//! Pixel rectangles and the sample buffers read for them

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Inclusive pixel rectangle `[col_min..=col_max] x [row_min..=row_max]`.
///
/// Indices are signed so that windows derived from geographic bounds may
/// extend past the raster before being clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub col_min: i64,
    pub col_max: i64,
    pub row_min: i64,
    pub row_max: i64,
}

impl PixelWindow {
    pub fn new(col_min: i64, col_max: i64, row_min: i64, row_max: i64) -> Self {
        Self { col_min, col_max, row_min, row_max }
    }

    /// Clamp to `[0, width-1] x [0, height-1]`. The result may be empty.
    pub fn clamp(&self, width: usize, height: usize) -> Self {
        Self {
            col_min: self.col_min.max(0),
            col_max: self.col_max.min(width as i64 - 1),
            row_min: self.row_min.max(0),
            row_max: self.row_max.min(height as i64 - 1),
        }
    }

    /// Clamp, failing with [`Error::InvalidWindow`] when nothing is left
    pub fn clamp_non_empty(&self, width: usize, height: usize) -> Result<Self> {
        let clamped = self.clamp(width, height);
        if clamped.is_empty() {
            return Err(Error::InvalidWindow {
                col_min: clamped.col_min,
                col_max: clamped.col_max,
                row_min: clamped.row_min,
                row_max: clamped.row_max,
            });
        }
        Ok(clamped)
    }

    pub fn is_empty(&self) -> bool {
        self.col_min > self.col_max || self.row_min > self.row_max
    }

    /// Number of columns (0 when empty)
    pub fn width(&self) -> usize {
        if self.is_empty() { 0 } else { (self.col_max - self.col_min + 1) as usize }
    }

    /// Number of rows (0 when empty)
    pub fn height(&self) -> usize {
        if self.is_empty() { 0 } else { (self.row_max - self.row_min + 1) as usize }
    }

    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, col: i64, row: i64) -> bool {
        col >= self.col_min && col <= self.col_max && row >= self.row_min && row <= self.row_max
    }
}

/// Samples read for a (clamped, non-empty) pixel window, indexed `(row, col)`
/// relative to the window origin.
#[derive(Debug, Clone)]
pub struct RasterWindow {
    window: PixelWindow,
    data: Array2<f64>,
}

impl RasterWindow {
    pub fn new(window: PixelWindow, data: Array2<f64>) -> Result<Self> {
        if data.dim() != (window.height(), window.width()) {
            return Err(Error::invalid_parameter(
                "window data",
                format!("{:?}", data.dim()),
                format!("expected {}x{} samples", window.height(), window.width()),
            ));
        }
        Ok(Self { window, data })
    }

    pub fn window(&self) -> PixelWindow {
        self.window
    }

    /// Sample at absolute raster indices, `None` outside the window
    pub fn get(&self, col: i64, row: i64) -> Option<f64> {
        if !self.window.contains(col, row) {
            return None;
        }
        let r = (row - self.window.row_min) as usize;
        let c = (col - self.window.col_min) as usize;
        self.data.get((r, c)).copied()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Flat row-major sample buffer
    pub fn into_vec(self) -> Vec<f64> {
        self.data.into_iter().collect()
    }
}
