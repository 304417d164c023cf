//! Zonal statistics of a raster layer inside a query polygon
//!
//! The polygon's bounding box is mapped to a pixel window and only that window
//! is read. Pixel centres inside the window are visited at an adaptive stride
//! so the number of candidates stays near 500 x 500 however large the polygon
//! is; every pixel is visited for small polygons. Candidates inside the
//! polygon contribute their value unless it is nodata, non-finite or below
//! [`NODATA_FLOOR`].
//!
//! When no candidate qualifies (typically a polygon smaller than one pixel),
//! the pixel nearest the polygon centroid is used on its own.

use crate::maybe_rayon::*;
use serde::{Deserialize, Serialize};
use solarsite_core::io::RasterHandle;
use solarsite_core::raster::{PixelWindow, RasterSource, RasterWindow};
use solarsite_core::vector::{normalize_ring, Ring};
use solarsite_core::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Target number of sampled pixels along each axis of the window
pub const SAMPLES_PER_AXIS: f64 = 500.0;

/// Values below this are treated as nodata even when they differ from the
/// declared sentinel (some products encode gaps as huge negative numbers).
pub const NODATA_FLOOR: f64 = -1.0e20;

/// Summary statistics of one layer inside one polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalStatistics {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Number of valid samples
    pub count: usize,
    pub units: Option<String>,
    /// True when the value came from the centroid pixel alone
    pub centroid_fallback: bool,
    /// Pixel stride used while sampling
    pub stride: usize,
}

/// Sampling stride for a window: `max(1, floor(sqrt(w * h) / 500))`
pub fn sampling_stride(window: &PixelWindow) -> usize {
    let cells = window.width() as f64 * window.height() as f64;
    ((cells.sqrt() / SAMPLES_PER_AXIS).floor() as usize).max(1)
}

/// Whether a raw sample counts as data
pub fn is_valid_sample(value: f64, nodata: Option<f64>) -> bool {
    if !value.is_finite() || value < NODATA_FLOOR {
        return false;
    }
    match nodata {
        Some(nd) if nd.is_finite() => (value - nd).abs() > f64::EPSILON * 100.0 * nd.abs().max(1.0),
        _ => true,
    }
}

/// Zonal statistics of the raster at `path` inside `polygon`.
///
/// Opens the raster, samples it and releases it before returning, on success
/// and on every error path.
pub fn zonal_statistics_from_path(
    path: impl AsRef<Path>,
    polygon: &[[f64; 2]],
) -> Result<ZonalStatistics> {
    let ring = polygon_ring(polygon)?;
    zonal_statistics_for_path_ring(path, &ring)
}

/// Same as [`zonal_statistics_from_path`] for an already validated ring
pub fn zonal_statistics_for_path_ring(
    path: impl AsRef<Path>,
    ring: &Ring,
) -> Result<ZonalStatistics> {
    let mut handle = RasterHandle::open(path)?;
    zonal_statistics_for_ring(&mut handle, ring)
}

/// Zonal statistics of `source` inside `polygon` (a ring of `[lon, lat]` pairs).
///
/// # Errors
/// - [`Error::InvalidPolygon`] when the ring cannot be normalized
/// - [`Error::OutOfCoverage`] when the polygon does not overlap the raster
/// - [`Error::NoValidData`] when no valid sample is found, centroid included
pub fn zonal_statistics<S: RasterSource>(
    source: &mut S,
    polygon: &[[f64; 2]],
) -> Result<ZonalStatistics> {
    let ring = polygon_ring(polygon)?;
    zonal_statistics_for_ring(source, &ring)
}

/// Normalize a caller polygon, reporting failures as [`Error::InvalidPolygon`]
pub fn polygon_ring(polygon: &[[f64; 2]]) -> Result<Ring> {
    normalize_ring(polygon).map_err(|e| match e {
        Error::Geometry(msg) => Error::InvalidPolygon(msg),
        other => other,
    })
}

/// Zonal statistics of `source` inside a validated ring
pub fn zonal_statistics_for_ring<S: RasterSource>(
    source: &mut S,
    ring: &Ring,
) -> Result<ZonalStatistics> {
    let extent = *source.extent();
    let nodata = source.nodata();
    let bbox = ring.bounding_box();

    let outside = || Error::OutOfCoverage {
        min_x: bbox.min_x,
        min_y: bbox.min_y,
        max_x: bbox.max_x,
        max_y: bbox.max_y,
    };

    if !bbox.intersects(&extent.bounds()) {
        return Err(outside());
    }
    let window = extent.window_for(&bbox).clamp(extent.width, extent.height);
    if window.is_empty() {
        return Err(outside());
    }

    let samples = source.read_window(window)?;
    let stride = sampling_stride(&window);

    let (mut values, candidates) = sample_inside(&samples, ring, stride, nodata, |col, row| {
        extent.pixel_to_geo(col, row)
    });

    debug!(
        cols = window.width(),
        rows = window.height(),
        stride,
        candidates,
        valid = values.len(),
        "sampled polygon window"
    );

    let mut centroid_fallback = false;
    if values.is_empty() {
        let (cx, cy) = ring.centroid();
        let (col, row) = extent.geo_to_pixel(cx, cy);
        let col = col.clamp(window.col_min, window.col_max);
        let row = row.clamp(window.row_min, window.row_max);
        if let Some(v) = samples.get(col, row).filter(|&v| is_valid_sample(v, nodata)) {
            warn!(col, row, "no pixel centre inside polygon, using centroid pixel");
            values.push(v);
            centroid_fallback = true;
        }
    }

    let units = source.units().map(str::to_string);
    let mut stats =
        compute_statistics(&mut values, units).ok_or(Error::NoValidData { candidates })?;
    stats.centroid_fallback = centroid_fallback;
    stats.stride = stride;
    Ok(stats)
}

/// Collect valid values at pixel centres inside the ring, row-parallel.
/// Returns the values and the number of centres that fell inside the ring.
fn sample_inside<F>(
    samples: &RasterWindow,
    ring: &Ring,
    stride: usize,
    nodata: Option<f64>,
    to_geo: F,
) -> (Vec<f64>, usize)
where
    F: Fn(usize, usize) -> (f64, f64) + Sync,
{
    let w = samples.window();
    let rows: Vec<i64> = (w.row_min..=w.row_max).step_by(stride).collect();

    let per_row: Vec<(Vec<f64>, usize)> = rows
        .into_par_iter()
        .map(|row| {
            let mut row_values = Vec::new();
            let mut inside = 0usize;
            for col in (w.col_min..=w.col_max).step_by(stride) {
                let (x, y) = to_geo(col as usize, row as usize);
                if !ring.contains(x, y) {
                    continue;
                }
                inside += 1;
                if let Some(v) = samples.get(col, row).filter(|&v| is_valid_sample(v, nodata)) {
                    row_values.push(v);
                }
            }
            (row_values, inside)
        })
        .collect();

    let candidates = per_row.iter().map(|(_, n)| n).sum();
    let values = per_row.into_iter().flat_map(|(v, _)| v).collect();
    (values, candidates)
}

/// Mean, median, min, max and population standard deviation of `values`.
///
/// Sorts `values` in place. Returns `None` for an empty slice.
pub fn compute_statistics(values: &mut [f64], units: Option<String>) -> Option<ZonalStatistics> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;

    values.sort_by(|a, b| a.total_cmp(b));
    let median = if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    };

    Some(ZonalStatistics {
        mean,
        median,
        min: values[0],
        max: values[count - 1],
        std_dev: var.sqrt(),
        count,
        units,
        centroid_fallback: false,
        stride: 1,
    })
}
