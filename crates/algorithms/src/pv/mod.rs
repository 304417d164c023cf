//! Photovoltaic energy model
//!
//! - **config**: system configuration and technology / grid tables
//! - **sizing**: panel layout and capacity
//! - **reference_yield**: annual specific yield from reference data
//! - **seasonal**: monthly distribution
//! - **energy**: the full estimate

pub mod config;
pub mod energy;
pub mod reference_yield;
pub mod seasonal;
pub mod sizing;
pub mod warnings;

pub use config::{
    normalize_key, GridProfile, ProfileCatalog, SystemConfiguration, TechnologyProfile,
};
pub use energy::{
    cell_temperature, estimate_energy, technology_factor, EnergyInputs, EnergyResult,
    MonthlyDistribution, PLAUSIBLE_YIELD_RANGE, TECHNOLOGY_FACTOR_RANGE,
};
pub use reference_yield::{resolve_annual_yield, ReferenceYield, ResolvedYield, YieldSource};
pub use seasonal::{latitude_shares, reference_shares};
pub use sizing::{size_system, SystemSize};
pub use warnings::EstimateWarning;
