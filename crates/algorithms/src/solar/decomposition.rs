//! Splitting horizontal irradiance into beam and diffuse parts
//!
//! Missing components are derived from the closure relation
//! `GHI = DNI * cos z + DIF`. When neither is supplied the diffuse share
//! comes from the Erbs et al. (1982) correlation on the clearness index.

use super::position::{clear_sky_ghi, SolarPosition};
use serde::{Deserialize, Serialize};

/// Zenith angle beyond which beam irradiance is taken as zero
pub const MAX_BEAM_ZENITH_DEG: f64 = 85.0;

/// Instantaneous irradiance components on the horizontal, W/m²
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub ghi: f64,
    pub dni: f64,
    pub dif: f64,
    /// `DIF / GHI` (1 when GHI is zero)
    pub diffuse_fraction: f64,
    /// Clearness index, present when the Erbs correlation was used
    pub clearness_index: Option<f64>,
}

/// Erbs diffuse fraction for a clearness index
pub fn erbs_diffuse_fraction(kt: f64) -> f64 {
    if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.8 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    }
}

/// `GHI / clear-sky GHI`, floored at zero. Zero when the sun is down.
pub fn clearness_index(ghi: f64, position: &SolarPosition) -> f64 {
    let clear = clear_sky_ghi(position);
    if clear <= 0.0 {
        0.0
    } else {
        (ghi / clear).max(0.0)
    }
}

/// Complete the (GHI, DNI, DIF) triple from whatever components are known.
///
/// Supplied values are used as given, except that DNI is forced to zero
/// when the sun is lower than [`MAX_BEAM_ZENITH_DEG`]. With neither component
/// supplied and the beam hidden, all of GHI is diffuse.
pub fn decompose(
    ghi: f64,
    dni: Option<f64>,
    dif: Option<f64>,
    position: &SolarPosition,
) -> Decomposition {
    let ghi = ghi.max(0.0);
    let beam_visible = position.zenith_deg <= MAX_BEAM_ZENITH_DEG;
    let cos_z = position.cos_zenith();

    let beam_from = |dif: f64| {
        if beam_visible {
            ((ghi - dif) / cos_z).max(0.0)
        } else {
            0.0
        }
    };

    let (dni, dif, kt) = match (dni, dif) {
        (Some(dni), Some(dif)) => (dni.max(0.0), dif.max(0.0), None),
        (None, Some(dif)) => {
            let dif = dif.clamp(0.0, ghi);
            (beam_from(dif), dif, None)
        }
        (Some(dni), None) => {
            let dni = if beam_visible { dni.max(0.0) } else { 0.0 };
            (dni, (ghi - dni * cos_z).max(0.0), None)
        }
        (None, None) => {
            let kt = clearness_index(ghi, position);
            let dif = if beam_visible {
                ghi * erbs_diffuse_fraction(kt)
            } else {
                ghi
            };
            (beam_from(dif), dif, Some(kt))
        }
    };

    let dni = if beam_visible { dni } else { 0.0 };
    Decomposition {
        ghi,
        dni,
        dif,
        diffuse_fraction: if ghi > 0.0 { dif / ghi } else { 1.0 },
        clearness_index: kt,
    }
}
