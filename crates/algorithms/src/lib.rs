//! # Solarsite Algorithms
//!
//! Rooftop photovoltaic yield estimation from irradiance rasters.
//!
//! ## Modules
//!
//! - **statistics**: zonal statistics of raster layers inside a polygon
//! - **solar**: sun position, Erbs decomposition, Hay-Davies transposition
//! - **pv**: sizing, reference-yield resolution, technology and grid
//!   corrections, monthly distribution
//! - **site**: the end-to-end pipeline from a request to an estimate

pub(crate) mod maybe_rayon;

pub mod pv;
pub mod site;
pub mod solar;
pub mod statistics;

pub use site::{estimate_from_samples, estimate_site, SiteEstimate, SiteRequest};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::pv::{
        estimate_energy, size_system, EnergyInputs, EnergyResult, EstimateWarning, ProfileCatalog,
        ReferenceYield, SystemConfiguration,
    };
    pub use crate::site::{estimate_site, SiteEstimate, SiteRequest};
    pub use crate::solar::{hay_davies, PanelOrientation, PlaneOfArray, TranspositionInput};
    pub use crate::statistics::{
        sample_layers, zonal_statistics, zonal_statistics_from_path, LayerKind, LayerRequest,
        ZonalStatistics,
    };
    pub use solarsite_core::prelude::*;
}
