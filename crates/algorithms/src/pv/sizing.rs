//! Geometric system sizing

use super::config::SystemConfiguration;
use serde::{Deserialize, Serialize};
use solarsite_core::{Error, Result};

/// Panel layout and capacity for a roof area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSize {
    pub area_m2: f64,
    /// Area usable for modules (`area * packing factor`)
    pub effective_area_m2: f64,
    pub panel_count: u64,
    /// Capacity of the geometric layout, kWp
    pub geometric_dc_kw: f64,
    /// Capacity used downstream (override when given), kWp
    pub dc_capacity_kw: f64,
    pub ac_capacity_kw: f64,
    pub capacity_overridden: bool,
}

/// Lay out modules on `area_m2` and derive DC/AC capacity.
///
/// An installed-capacity override (kWp) replaces the derived DC capacity; the
/// panel count and areas are still reported from the geometric layout.
///
/// # Errors
/// [`Error::InsufficientArea`] when the area is not positive, no module fits,
/// or the capacity is zero.
pub fn size_system(
    area_m2: f64,
    config: &SystemConfiguration,
    capacity_override_kw: Option<f64>,
) -> Result<SystemSize> {
    if !area_m2.is_finite() || area_m2 <= 0.0 {
        return Err(Error::InsufficientArea(format!(
            "roof area must be positive, got {} m²",
            area_m2
        )));
    }

    let effective_area_m2 = area_m2 * config.packing_factor;
    let panels = (effective_area_m2 / config.module_area_m2).floor();
    if !panels.is_finite() || panels < 1.0 {
        return Err(Error::InsufficientArea(format!(
            "{:.2} m² usable cannot hold one {:.2} m² module",
            effective_area_m2, config.module_area_m2
        )));
    }
    let panel_count = panels as u64;

    let geometric_dc_kw = panel_count as f64 * config.module_rated_power_w() / 1000.0;
    let (dc_capacity_kw, capacity_overridden) = match capacity_override_kw {
        Some(kw) => (kw, true),
        None => (geometric_dc_kw, false),
    };
    if !dc_capacity_kw.is_finite() || dc_capacity_kw <= 0.0 {
        return Err(Error::InsufficientArea(format!("DC capacity is {} kWp", dc_capacity_kw)));
    }

    Ok(SystemSize {
        area_m2,
        effective_area_m2,
        panel_count,
        geometric_dc_kw,
        dc_capacity_kw,
        ac_capacity_kw: dc_capacity_kw / config.dc_ac_ratio,
        capacity_overridden,
    })
}
