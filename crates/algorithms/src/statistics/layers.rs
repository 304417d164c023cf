//! Sampling several raster layers for one polygon
//!
//! Each layer is opened, sampled and released independently, so layers run
//! in parallel with no ordering between them. A failing optional layer is
//! dropped with a [`LayerWarning`]; the primary irradiance layer (`GHI`) is
//! required and its failure fails the whole request.

use super::zonal::{zonal_statistics_for_path_ring, ZonalStatistics};
use crate::maybe_rayon::*;
use serde::{Deserialize, Serialize};
use solarsite_core::vector::Ring;
use solarsite_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Identifier of a sampled raster layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerKind {
    /// Global horizontal irradiance, daily mean (kWh/m²/day)
    Ghi,
    /// Direct normal irradiance, daily mean
    Dni,
    /// Diffuse horizontal irradiance, daily mean
    Dif,
    /// Ambient air temperature (°C)
    Temp,
    /// Reference specific yield, annual total or daily mean
    ReferenceYield,
    /// Reference specific yield for one month (1..=12)
    MonthlyReferenceYield(u8),
}

impl LayerKind {
    /// Layers without which no estimate can be produced
    pub fn is_required(&self) -> bool {
        matches!(self, LayerKind::Ghi)
    }

    /// The twelve monthly reference-yield layers in calendar order
    pub fn monthly() -> impl Iterator<Item = LayerKind> {
        (1..=12).map(LayerKind::MonthlyReferenceYield)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Ghi => write!(f, "GHI"),
            LayerKind::Dni => write!(f, "DNI"),
            LayerKind::Dif => write!(f, "DIF"),
            LayerKind::Temp => write!(f, "TEMP"),
            LayerKind::ReferenceYield => write!(f, "PVOUT"),
            LayerKind::MonthlyReferenceYield(m) => write!(f, "PVOUT_{:02}", m),
        }
    }
}

impl FromStr for LayerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_uppercase();
        let kind = match key.as_str() {
            "GHI" => LayerKind::Ghi,
            "DNI" => LayerKind::Dni,
            "DIF" | "DHI" => LayerKind::Dif,
            "TEMP" => LayerKind::Temp,
            "PVOUT" => LayerKind::ReferenceYield,
            _ => {
                let month = key
                    .strip_prefix("PVOUT_")
                    .and_then(|m| m.parse::<u8>().ok())
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| {
                        Error::invalid_parameter(
                            "layer",
                            s,
                            "expected GHI, DNI, DIF, TEMP, PVOUT or PVOUT_01..PVOUT_12",
                        )
                    })?;
                LayerKind::MonthlyReferenceYield(month)
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for LayerKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LayerKind> for String {
    fn from(kind: LayerKind) -> Self {
        kind.to_string()
    }
}

/// One layer to sample and the raster that holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRequest {
    pub layer: LayerKind,
    pub path: PathBuf,
}

impl LayerRequest {
    pub fn new(layer: LayerKind, path: impl Into<PathBuf>) -> Self {
        Self { layer, path: path.into() }
    }
}

/// An optional layer that was dropped from the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWarning {
    pub layer: LayerKind,
    pub message: String,
}

/// Per-layer statistics for one polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSamples {
    pub statistics: BTreeMap<LayerKind, ZonalStatistics>,
    pub warnings: Vec<LayerWarning>,
}

impl LayerSamples {
    pub fn get(&self, layer: LayerKind) -> Option<&ZonalStatistics> {
        self.statistics.get(&layer)
    }

    /// Mean of a layer, if it was sampled
    pub fn mean(&self, layer: LayerKind) -> Option<f64> {
        self.get(layer).map(|s| s.mean)
    }
}

/// Sample every requested layer from its GeoTIFF inside `ring`.
///
/// # Errors
/// - [`Error::InvalidParameter`] when a layer is requested twice or `GHI` is
///   not requested
/// - the sampling error of the `GHI` layer, if it fails
pub fn sample_layers(ring: &Ring, requests: &[LayerRequest]) -> Result<LayerSamples> {
    sample_layers_with(ring, requests, |path, ring| zonal_statistics_for_path_ring(path, ring))
}

/// [`sample_layers`] with a caller-supplied per-layer sampler
pub fn sample_layers_with<F>(
    ring: &Ring,
    requests: &[LayerRequest],
    sampler: F,
) -> Result<LayerSamples>
where
    F: Fn(&Path, &Ring) -> Result<ZonalStatistics> + Sync,
{
    let mut seen = BTreeSet::new();
    for request in requests {
        if !seen.insert(request.layer) {
            return Err(Error::invalid_parameter(
                "layers",
                request.layer,
                "layer requested more than once",
            ));
        }
    }
    if !seen.contains(&LayerKind::Ghi) {
        return Err(Error::invalid_parameter(
            "layers",
            "GHI",
            "primary irradiance layer is required",
        ));
    }

    let outcomes: Vec<(LayerKind, Result<ZonalStatistics>)> = requests
        .par_iter()
        .map(|request| (request.layer, sampler(&request.path, ring)))
        .collect();

    let mut samples = LayerSamples::default();
    for (layer, outcome) in outcomes {
        match outcome {
            Ok(stats) => {
                samples.statistics.insert(layer, stats);
            }
            Err(e) if layer.is_required() => return Err(e),
            Err(e) => {
                warn!(%layer, error = %e, "dropping layer");
                samples.warnings.push(LayerWarning {
                    layer,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(samples)
}
