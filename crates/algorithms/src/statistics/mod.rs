//! Raster statistics inside query polygons
//!
//! - **zonal**: statistics of one layer inside one polygon
//! - **layers**: independent sampling of several layers for one polygon

pub mod layers;
pub mod zonal;

pub use layers::{
    sample_layers, sample_layers_with, LayerKind, LayerRequest, LayerSamples, LayerWarning,
};
pub use zonal::{
    compute_statistics, polygon_ring, sampling_stride, zonal_statistics, zonal_statistics_for_ring,
    zonal_statistics_from_path, ZonalStatistics,
};
