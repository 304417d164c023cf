//! System configuration and the technology / grid lookup tables

use serde::{Deserialize, Serialize};
use solarsite_core::{Error, Result};
use std::collections::BTreeMap;

/// Irradiance at standard test conditions, W/m²
pub const STC_IRRADIANCE: f64 = 1000.0;

/// Photovoltaic system parameters supplied with each request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfiguration {
    /// Module efficiency as a fraction (0.20 = 20%)
    pub efficiency: f64,
    /// Tilt from horizontal in degrees
    pub tilt_deg: f64,
    /// Facing direction, degrees clockwise from north (180 = south)
    pub azimuth_deg: f64,
    pub performance_ratio: f64,
    /// Footprint of one module in m²
    pub module_area_m2: f64,
    /// Rated module power in W. Zero derives it from footprint and efficiency.
    pub module_power_w: f64,
    /// Fraction of the roof area that can hold modules
    pub packing_factor: f64,
    pub dc_ac_ratio: f64,
    /// Power temperature coefficient, 1/°C
    pub temperature_coefficient: f64,
    /// Nominal operating cell temperature, °C
    pub noct_c: f64,
}

impl Default for SystemConfiguration {
    fn default() -> Self {
        Self {
            efficiency: 0.20,
            tilt_deg: 20.0,
            azimuth_deg: 180.0,
            performance_ratio: 0.80,
            module_area_m2: 1.7,
            module_power_w: 420.0,
            packing_factor: 0.8,
            dc_ac_ratio: 1.2,
            temperature_coefficient: -0.0035,
            noct_c: 45.0,
        }
    }
}

fn check(name: &'static str, value: f64, ok: bool, reason: &str) -> Result<()> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value, reason))
    }
}

impl SystemConfiguration {
    /// Reject values no physical system can have
    pub fn validate(&self) -> Result<()> {
        check(
            "efficiency",
            self.efficiency,
            self.efficiency > 0.0 && self.efficiency <= 1.0,
            "must be in (0, 1]",
        )?;
        check(
            "tilt",
            self.tilt_deg,
            (0.0..=90.0).contains(&self.tilt_deg),
            "must be in [0, 90] degrees",
        )?;
        check("azimuth", self.azimuth_deg, true, "must be finite")?;
        check(
            "performance_ratio",
            self.performance_ratio,
            self.performance_ratio > 0.0 && self.performance_ratio <= 1.0,
            "must be in (0, 1]",
        )?;
        check("module_area", self.module_area_m2, self.module_area_m2 > 0.0, "must be positive")?;
        check(
            "module_power",
            self.module_power_w,
            self.module_power_w >= 0.0,
            "must not be negative",
        )?;
        check(
            "packing_factor",
            self.packing_factor,
            self.packing_factor > 0.0 && self.packing_factor <= 1.0,
            "must be in (0, 1]",
        )?;
        check("dc_ac_ratio", self.dc_ac_ratio, self.dc_ac_ratio > 0.0, "must be positive")?;
        check("temperature_coefficient", self.temperature_coefficient, true, "must be finite")?;
        check("noct", self.noct_c, true, "must be finite")?;
        Ok(())
    }

    /// Rated power of one module in W
    pub fn module_rated_power_w(&self) -> f64 {
        if self.module_power_w > 0.0 {
            self.module_power_w
        } else {
            self.module_area_m2 * STC_IRRADIANCE * self.efficiency
        }
    }

    /// A copy with the temperature behaviour of `technology`
    pub fn with_technology(&self, technology: &TechnologyProfile) -> Self {
        Self {
            temperature_coefficient: technology.temperature_coefficient,
            noct_c: technology.noct_c,
            ..self.clone()
        }
    }
}

/// Temperature behaviour of a cell technology
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnologyProfile {
    /// Power temperature coefficient, 1/°C
    pub temperature_coefficient: f64,
    /// Nominal operating cell temperature, °C
    pub noct_c: f64,
}

/// Share of produced energy that a grid configuration can use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridProfile {
    pub usable_fraction: f64,
}

/// Immutable technology and grid tables, loaded once and shared by requests.
///
/// Keys match case-insensitively, with `_` and spaces accepted for `-`
/// (`Thin_Film` finds `thin-film`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCatalog {
    /// Technology whose coefficient is the reference for temperature correction
    pub baseline_technology: String,
    pub default_grid_mode: String,
    pub technologies: BTreeMap<String, TechnologyProfile>,
    pub grid_modes: BTreeMap<String, GridProfile>,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        let technologies = [
            ("mono", -0.0035, 45.0),
            ("poly", -0.0040, 46.0),
            ("thin-film", -0.0025, 44.0),
        ]
        .into_iter()
        .map(|(key, temperature_coefficient, noct_c)| {
            (key.to_string(), TechnologyProfile { temperature_coefficient, noct_c })
        })
        .collect();

        let grid_modes = [("on-grid", 1.0), ("hybrid", 0.95), ("off-grid", 0.85)]
            .into_iter()
            .map(|(key, usable_fraction)| (key.to_string(), GridProfile { usable_fraction }))
            .collect();

        Self {
            baseline_technology: "mono".into(),
            default_grid_mode: "on-grid".into(),
            technologies,
            grid_modes,
        }
    }
}

/// Canonical form of a profile key
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

fn lookup<'a, T>(table: &'a BTreeMap<String, T>, key: &str) -> Option<&'a T> {
    let wanted = normalize_key(key);
    table.iter().find(|(k, _)| normalize_key(k) == wanted).map(|(_, v)| v)
}

fn known_keys<T>(table: &BTreeMap<String, T>) -> String {
    table.keys().cloned().collect::<Vec<_>>().join(", ")
}

impl ProfileCatalog {
    /// Check that the default keys resolve and the fractions are usable
    pub fn validate(&self) -> Result<()> {
        self.baseline()?;
        self.grid(None)?;
        for (key, grid) in &self.grid_modes {
            if !(grid.usable_fraction > 0.0 && grid.usable_fraction <= 1.0) {
                return Err(Error::invalid_parameter(
                    "usable_fraction",
                    grid.usable_fraction,
                    format!("grid mode '{}' must use a fraction in (0, 1]", key),
                ));
            }
        }
        for (key, tech) in &self.technologies {
            if !tech.temperature_coefficient.is_finite() || !tech.noct_c.is_finite() {
                return Err(Error::invalid_parameter(
                    "technology",
                    key,
                    "coefficient and NOCT must be finite",
                ));
            }
        }
        Ok(())
    }

    pub fn baseline(&self) -> Result<&TechnologyProfile> {
        self.technology(Some(&self.baseline_technology))
    }

    /// Technology profile for `key`, or the baseline when `None`
    pub fn technology(&self, key: Option<&str>) -> Result<&TechnologyProfile> {
        let key = key.unwrap_or(&self.baseline_technology);
        lookup(&self.technologies, key).ok_or_else(|| {
            Error::invalid_parameter(
                "technology",
                key,
                format!("known: {}", known_keys(&self.technologies)),
            )
        })
    }

    /// Grid profile for `key`, or the default grid mode when `None`
    pub fn grid(&self, key: Option<&str>) -> Result<&GridProfile> {
        let key = key.unwrap_or(&self.default_grid_mode);
        lookup(&self.grid_modes, key).ok_or_else(|| {
            Error::invalid_parameter(
                "grid_mode",
                key,
                format!("known: {}", known_keys(&self.grid_modes)),
            )
        })
    }
}
