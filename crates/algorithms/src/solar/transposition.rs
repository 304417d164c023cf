//! Hay-Davies transposition of horizontal irradiance onto a tilted plane
//!
//! The model works on instantaneous irradiance at the representative instant
//! (see [`super::position`]). Daily means enter and leave through a fixed
//! divisor, [`EQUIVALENT_SUN_HOURS`] = 24/π, which is the ratio of a daily
//! total to the noon peak for a sinusoidal 12-hour day. The returned gain is
//! therefore the POA/GHI ratio at the representative instant applied to the
//! daily mean, a stated approximation and not a daily integral.
//!
//! Tilted-plane components:
//!
//! ```text
//! beam   = DNI * max(0, cos θi)
//! sky    = DIF * [AI * Rb + (1 - AI) * (1 + cos β) / 2]
//! ground = GHI * ρ * (1 - cos β) / 2
//! ```
//!
//! with `AI = clamp(DNI / I0n, 0, 1)` and `Rb = max(0, cos θi) / max(0.087, cos z)`.

use super::decomposition::decompose;
use super::position::{extraterrestrial_normal, representative_position, SolarPosition};
use serde::{Deserialize, Serialize};
use solarsite_core::{Error, Result};

/// Ground reflectance
pub const ALBEDO: f64 = 0.2;

/// Daily total (Wh) per unit of instantaneous irradiance (W) at the representative instant
pub const EQUIVALENT_SUN_HOURS: f64 = 24.0 / std::f64::consts::PI;

/// Floor on `cos z` in the beam transposition factor
const MIN_COS_ZENITH: f64 = 0.087;

/// Orientation of a flat panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelOrientation {
    /// Tilt from horizontal in degrees, `[0, 90]`
    pub tilt_deg: f64,
    /// Direction the panel faces, degrees clockwise from north (180 = south)
    pub azimuth_deg: f64,
}

impl PanelOrientation {
    pub fn new(tilt_deg: f64, azimuth_deg: f64) -> Result<Self> {
        if !(0.0..=90.0).contains(&tilt_deg) {
            return Err(Error::invalid_parameter(
                "tilt",
                tilt_deg,
                "must be within [0, 90] degrees",
            ));
        }
        if !azimuth_deg.is_finite() {
            return Err(Error::invalid_parameter("azimuth", azimuth_deg, "must be finite"));
        }
        Ok(Self {
            tilt_deg,
            azimuth_deg: azimuth_deg.rem_euclid(360.0),
        })
    }

    /// Unit normal in (east, north, up) coordinates
    pub fn normal(&self) -> [f64; 3] {
        let t = self.tilt_deg.to_radians();
        let a = self.azimuth_deg.to_radians();
        [t.sin() * a.sin(), t.sin() * a.cos(), t.cos()]
    }

    pub fn cos_tilt(&self) -> f64 {
        self.tilt_deg.to_radians().cos()
    }
}

/// Cosine of the angle between the panel normal and the sun, in `[-1, 1]`
pub fn cos_incidence(orientation: &PanelOrientation, sun: &SolarPosition) -> f64 {
    let n = orientation.normal();
    let s = sun.direction();
    (n[0] * s[0] + n[1] * s[1] + n[2] * s[2]).clamp(-1.0, 1.0)
}

/// Angle of incidence in degrees
pub fn angle_of_incidence(orientation: &PanelOrientation, sun: &SolarPosition) -> f64 {
    cos_incidence(orientation, sun).acos().to_degrees()
}

/// Site, orientation and daily-mean horizontal irradiance (kWh/m²/day)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranspositionInput {
    pub latitude: f64,
    pub longitude: f64,
    pub orientation: PanelOrientation,
    pub ghi_daily: f64,
    /// Daily-mean direct normal irradiance, when a DNI layer was sampled
    pub dni_daily: Option<f64>,
    /// Daily-mean diffuse horizontal irradiance, when a DIF layer was sampled
    pub dif_daily: Option<f64>,
}

/// Plane-of-array irradiance and the intermediate quantities that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneOfArray {
    /// Daily-mean plane-of-array irradiance, kWh/m²/day
    pub poa_daily: f64,
    /// `POA / GHI` at the representative instant (1 when GHI is zero)
    pub gain: f64,
    /// Instantaneous components, W/m²
    pub beam: f64,
    pub sky_diffuse: f64,
    pub ground_reflected: f64,
    pub dni: f64,
    pub dif: f64,
    pub diffuse_fraction: f64,
    pub clearness_index: Option<f64>,
    pub incidence_deg: f64,
    pub solar: SolarPosition,
}

fn daily_to_instant(kwh_per_day: f64) -> f64 {
    kwh_per_day * 1000.0 / EQUIVALENT_SUN_HOURS
}

fn instant_to_daily(watts: f64) -> f64 {
    watts * EQUIVALENT_SUN_HOURS / 1000.0
}

/// Hay-Davies plane-of-array irradiance at the representative instant
pub fn hay_davies(input: &TranspositionInput) -> Result<PlaneOfArray> {
    validate_site(input)?;
    let sun = representative_position(input.latitude, input.longitude);
    hay_davies_at(input, &sun)
}

/// Hay-Davies plane-of-array irradiance for an explicit sun position
pub fn hay_davies_at(input: &TranspositionInput, sun: &SolarPosition) -> Result<PlaneOfArray> {
    if !input.ghi_daily.is_finite() || input.ghi_daily < 0.0 {
        return Err(Error::invalid_parameter(
            "ghi",
            input.ghi_daily,
            "must be a non-negative daily mean",
        ));
    }

    let ghi = daily_to_instant(input.ghi_daily);
    let parts = decompose(
        ghi,
        input.dni_daily.map(daily_to_instant),
        input.dif_daily.map(daily_to_instant),
        sun,
    );

    let cos_beta = input.orientation.cos_tilt();
    let cos_i = cos_incidence(&input.orientation, sun);
    let cos_i_pos = cos_i.max(0.0);

    let anisotropy = (parts.dni / extraterrestrial_normal(sun.day_of_year)).clamp(0.0, 1.0);
    let rb = cos_i_pos / sun.cos_zenith().max(MIN_COS_ZENITH);

    let beam = parts.dni * cos_i_pos;
    let sky_diffuse = parts.dif * (anisotropy * rb + (1.0 - anisotropy) * (1.0 + cos_beta) / 2.0);
    let ground_reflected = parts.ghi * ALBEDO * (1.0 - cos_beta) / 2.0;
    let poa = (beam + sky_diffuse + ground_reflected).max(0.0);

    Ok(PlaneOfArray {
        poa_daily: instant_to_daily(poa),
        gain: if ghi > 0.0 { poa / ghi } else { 1.0 },
        beam,
        sky_diffuse,
        ground_reflected,
        dni: parts.dni,
        dif: parts.dif,
        diffuse_fraction: parts.diffuse_fraction,
        clearness_index: parts.clearness_index,
        incidence_deg: cos_i.acos().to_degrees(),
        solar: *sun,
    })
}

fn validate_site(input: &TranspositionInput) -> Result<()> {
    if !(-90.0..=90.0).contains(&input.latitude) {
        return Err(Error::invalid_parameter(
            "latitude",
            input.latitude,
            "must be within [-90, 90]",
        ));
    }
    if !input.longitude.is_finite() {
        return Err(Error::invalid_parameter("longitude", input.longitude, "must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn input(lat: f64, tilt: f64, azimuth: f64, ghi: f64) -> TranspositionInput {
        TranspositionInput {
            latitude: lat,
            longitude: 0.0,
            orientation: PanelOrientation::new(tilt, azimuth).unwrap(),
            ghi_daily: ghi,
            dni_daily: None,
            dif_daily: None,
        }
    }

    #[test]
    fn test_horizontal_panel_matches_ghi() {
        let poa = hay_davies(&input(45.0, 0.0, 180.0, 4.2)).unwrap();
        assert_relative_eq!(poa.poa_daily, 4.2, epsilon = 1e-9);
        assert_relative_eq!(poa.gain, 1.0, epsilon = 1e-9);
        assert_relative_eq!(poa.ground_reflected, 0.0);
    }

    #[test]
    fn test_south_facing_gain_at_mid_latitude() {
        let poa = hay_davies(&input(45.0, 35.0, 180.0, 5.5)).unwrap();
        assert!(poa.gain > 1.2 && poa.gain < 1.5, "gain {}", poa.gain);
        assert!(poa.incidence_deg < 15.0);
        assert_relative_eq!(poa.poa_daily, 5.5 * poa.gain, epsilon = 1e-9);
    }

    #[test]
    fn test_north_facing_loses_in_northern_hemisphere() {
        let poa = hay_davies(&input(45.0, 35.0, 0.0, 5.5)).unwrap();
        assert!(poa.poa_daily < 5.5);
        assert!(poa.poa_daily >= 0.0);
    }

    #[test]
    fn test_north_facing_gains_in_southern_hemisphere() {
        let poa = hay_davies(&input(-33.9, 30.0, 0.0, 5.0)).unwrap();
        assert!(poa.gain > 1.0, "gain {}", poa.gain);
    }

    #[test]
    fn test_vertical_panel_never_negative() {
        for azimuth in [0.0, 90.0, 180.0, 270.0] {
            for lat in [-60.0, 0.0, 60.0] {
                let poa = hay_davies(&input(lat, 90.0, azimuth, 3.0)).unwrap();
                assert!(poa.poa_daily >= 0.0);
                assert!(poa.beam >= 0.0 && poa.sky_diffuse >= 0.0 && poa.ground_reflected >= 0.0);
            }
        }
    }

    #[test]
    fn test_supplied_components_are_used() {
        let mut with_parts = input(40.0, 30.0, 180.0, 5.0);
        with_parts.dni_daily = Some(6.0);
        with_parts.dif_daily = Some(1.5);
        let poa = hay_davies(&with_parts).unwrap();

        assert!(poa.clearness_index.is_none());
        assert_relative_eq!(poa.dni, 6000.0 / EQUIVALENT_SUN_HOURS, epsilon = 1e-9);
        assert_relative_eq!(poa.dif, 1500.0 / EQUIVALENT_SUN_HOURS, epsilon = 1e-9);
    }

    #[test]
    fn test_incidence_angle_geometry() {
        let sun = representative_position(45.0, 0.0);
        let flat = PanelOrientation::new(0.0, 180.0).unwrap();
        assert_relative_eq!(angle_of_incidence(&flat, &sun), sun.zenith_deg, epsilon = 1e-9);

        // panel tilted to the sun's zenith angle and facing it is normal to the beam
        let facing = PanelOrientation::new(sun.zenith_deg, sun.azimuth_deg).unwrap();
        assert!(angle_of_incidence(&facing, &sun) < 1e-4);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(PanelOrientation::new(95.0, 180.0).is_err());
        assert!(PanelOrientation::new(10.0, f64::NAN).is_err());
        assert_relative_eq!(PanelOrientation::new(10.0, -90.0).unwrap().azimuth_deg, 270.0);
        assert!(hay_davies(&input(91.0, 10.0, 180.0, 5.0)).is_err());
        assert!(hay_davies(&input(45.0, 10.0, 180.0, -1.0)).is_err());
    }
}
