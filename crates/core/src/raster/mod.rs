//! Raster georeferencing, pixel windows and sample sources

mod extent;
mod grid;
mod window;

pub use extent::RasterExtent;
pub use grid::GridRaster;
pub use window::{PixelWindow, RasterWindow};

use crate::error::Result;

/// A single-band geo-referenced raster that can be read one window at a time.
///
/// Implementations expose their georeferencing up front and only touch the
/// pixels a window asks for.
pub trait RasterSource {
    /// Bounding box and pixel dimensions
    fn extent(&self) -> &RasterExtent;

    /// Declared no-data sentinel, if any
    fn nodata(&self) -> Option<f64>;

    /// Units of the stored values, if the source declares them
    fn units(&self) -> Option<&str>;

    /// Read the samples of `window`, clamped to the raster.
    ///
    /// Fails with [`Error::InvalidWindow`](crate::Error::InvalidWindow) when
    /// the clamped window is empty.
    fn read_window(&mut self, window: PixelWindow) -> Result<RasterWindow>;
}

impl<S: RasterSource + ?Sized> RasterSource for &mut S {
    fn extent(&self) -> &RasterExtent {
        (**self).extent()
    }

    fn nodata(&self) -> Option<f64> {
        (**self).nodata()
    }

    fn units(&self) -> Option<&str> {
        (**self).units()
    }

    fn read_window(&mut self, window: PixelWindow) -> Result<RasterWindow> {
        (**self).read_window(window)
    }
}
