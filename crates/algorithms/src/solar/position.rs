//! Solar geometry for a single instant
//!
//! Declination and equation of time follow Spencer (1971); air mass follows
//! Kasten & Young (1989). Azimuth is measured clockwise from north
//! (0 = N, 90 = E, 180 = S, 270 = W).
//!
//! Annual-average transposition evaluates the sun at one representative
//! instant: the March equinox (day 80) at 12:00 local zone time. This is an
//! approximation for long-term averages, not an hourly simulation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Solar constant in W/m²
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Day of year of the representative instant (March equinox)
pub const REPRESENTATIVE_DAY: u32 = 80;

/// Zone clock time of the representative instant, in hours
pub const REPRESENTATIVE_HOUR: f64 = 12.0;

/// Sun position at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    pub day_of_year: u32,
    /// Elevation above the horizon in degrees (negative at night)
    pub elevation_deg: f64,
    /// Zenith angle in degrees (`90 - elevation`)
    pub zenith_deg: f64,
    /// Azimuth in degrees clockwise from north, in `[0, 360)`
    pub azimuth_deg: f64,
    /// Hour angle in degrees (negative before solar noon)
    pub hour_angle_deg: f64,
    pub declination_deg: f64,
}

impl SolarPosition {
    /// Unit vector pointing at the sun in (east, north, up) coordinates
    pub fn direction(&self) -> [f64; 3] {
        let alt = self.elevation_deg.to_radians();
        let az = self.azimuth_deg.to_radians();
        [alt.cos() * az.sin(), alt.cos() * az.cos(), alt.sin()]
    }

    pub fn cos_zenith(&self) -> f64 {
        self.zenith_deg.to_radians().cos()
    }

    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }
}

fn day_angle(day: u32) -> f64 {
    2.0 * PI * (day as f64 - 1.0) / 365.0
}

/// Solar declination in radians (Spencer 1971)
pub fn declination(day: u32) -> f64 {
    let g = day_angle(day);
    0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin() - 0.006758 * (2.0 * g).cos()
        + 0.000907 * (2.0 * g).sin()
        - 0.002697 * (3.0 * g).cos()
        + 0.00148 * (3.0 * g).sin()
}

/// Equation of time in minutes (Spencer 1971)
pub fn equation_of_time_minutes(day: u32) -> f64 {
    let g = day_angle(day);
    229.18
        * (0.000075 + 0.001868 * g.cos()
            - 0.032077 * g.sin()
            - 0.014615 * (2.0 * g).cos()
            - 0.040849 * (2.0 * g).sin())
}

/// Extraterrestrial irradiance on a surface normal to the sun, W/m²
pub fn extraterrestrial_normal(day: u32) -> f64 {
    let g = day_angle(day);
    SOLAR_CONSTANT
        * (1.000110 + 0.034221 * g.cos() + 0.001280 * g.sin() + 0.000719 * (2.0 * g).cos()
            + 0.000077 * (2.0 * g).sin())
}

/// Relative optical air mass (Kasten & Young 1989). `None` below the horizon.
pub fn air_mass(elevation_deg: f64) -> Option<f64> {
    if elevation_deg <= 0.0 {
        return None;
    }
    let sin_alt = elevation_deg.to_radians().sin();
    Some(1.0 / (sin_alt + 0.50572 * (elevation_deg + 6.07995).powf(-1.6364)))
}

/// Sun position at `clock_hour` zone time on `day` for a site.
///
/// The zone meridian is the nearest multiple of 15° to `lon`; longitude
/// offset and equation of time convert clock time to apparent solar time.
pub fn solar_position(lat: f64, lon: f64, day: u32, clock_hour: f64) -> SolarPosition {
    let meridian = 15.0 * (lon / 15.0).round();
    let solar_time = clock_hour + (4.0 * (lon - meridian) + equation_of_time_minutes(day)) / 60.0;
    let omega = (15.0 * (solar_time - 12.0)).to_radians();

    let phi = lat.to_radians();
    let delta = declination(day);

    let sin_alt =
        (phi.sin() * delta.sin() + phi.cos() * delta.cos() * omega.cos()).clamp(-1.0, 1.0);
    let elevation_deg = sin_alt.asin().to_degrees();

    let azimuth = (-delta.cos() * omega.sin())
        .atan2(delta.sin() * phi.cos() - delta.cos() * phi.sin() * omega.cos());
    let azimuth_deg = azimuth.to_degrees().rem_euclid(360.0);

    SolarPosition {
        day_of_year: day,
        elevation_deg,
        zenith_deg: 90.0 - elevation_deg,
        azimuth_deg,
        hour_angle_deg: omega.to_degrees(),
        declination_deg: delta.to_degrees(),
    }
}

/// Sun position at the representative instant used for annual averages
pub fn representative_position(lat: f64, lon: f64) -> SolarPosition {
    solar_position(lat, lon, REPRESENTATIVE_DAY, REPRESENTATIVE_HOUR)
}

/// Clear-sky global horizontal irradiance in W/m².
///
/// Meinel-type beam attenuation `1.1 * I0n * 0.7^(AM^0.678) * cos z`, with the
/// extra 10% standing in for the diffuse share. Zero with the sun down.
pub fn clear_sky_ghi(position: &SolarPosition) -> f64 {
    match air_mass(position.elevation_deg) {
        Some(am) => {
            1.1 * extraterrestrial_normal(position.day_of_year) * 0.7_f64.powf(am.powf(0.678))
                * position.cos_zenith()
        }
        None => 0.0,
    }
}
