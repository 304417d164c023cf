//! Annual and monthly energy estimate for a sized system
//!
//! Pipeline: size the array, resolve the annual specific yield, apply the
//! technology temperature correction, check the result against a plausible
//! band, apply the grid usable fraction and split the total across months.

use super::config::{ProfileCatalog, SystemConfiguration};
use super::reference_yield::{resolve_annual_yield, ReferenceYield, YieldSource};
use super::seasonal::{distribute, latitude_shares, reference_shares};
use super::sizing::size_system;
use super::warnings::EstimateWarning;
use crate::solar::transposition::{
    hay_davies, PanelOrientation, PlaneOfArray, TranspositionInput,
};
use serde::{Deserialize, Serialize};
use solarsite_core::{Error, Result};
use tracing::{debug, warn};

/// Bounds of the technology temperature factor
pub const TECHNOLOGY_FACTOR_RANGE: (f64, f64) = (0.90, 1.05);

/// Plausible calibrated specific yield, kWh/kWp/year
pub const PLAUSIBLE_YIELD_RANGE: (f64, f64) = (900.0, 2200.0);

/// Cell temperature at standard test conditions, °C
const STC_CELL_TEMPERATURE: f64 = 25.0;

/// Ambient temperature at which NOCT is specified, °C
const NOCT_AMBIENT: f64 = 20.0;

/// Everything the energy model needs for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyInputs {
    pub area_m2: f64,
    pub config: SystemConfiguration,
    pub latitude: f64,
    pub longitude: f64,
    /// Daily-mean GHI, kWh/m²/day
    pub ghi_daily: f64,
    pub dni_daily: Option<f64>,
    pub dif_daily: Option<f64>,
    /// Long-term mean ambient temperature, °C
    pub ambient_temp_c: Option<f64>,
    pub reference: ReferenceYield,
    pub use_tilt_correction: bool,
    /// Technology key; `None` keeps the configuration's own coefficient and NOCT
    pub technology: Option<String>,
    /// Grid mode key; `None` uses the catalog default
    pub grid_mode: Option<String>,
    /// Installed DC capacity in kWp replacing the geometric one
    pub capacity_override_kw: Option<f64>,
}

impl EnergyInputs {
    /// Inputs with default configuration and no optional data
    pub fn new(area_m2: f64, ghi_daily: f64, latitude: f64, longitude: f64) -> Self {
        Self {
            area_m2,
            config: SystemConfiguration::default(),
            latitude,
            longitude,
            ghi_daily,
            dni_daily: None,
            dif_daily: None,
            ambient_temp_c: None,
            reference: ReferenceYield::None,
            use_tilt_correction: false,
            technology: None,
            grid_mode: None,
            capacity_override_kw: None,
        }
    }
}

/// Where the monthly split came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyDistribution {
    Reference,
    LatitudeModel,
}

/// Energy estimate for one site. Energies in kWh, yields in kWh/kWp/year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyResult {
    pub area_m2: f64,
    pub effective_area_m2: f64,
    pub panel_count: u64,
    pub dc_capacity_kw: f64,
    pub ac_capacity_kw: f64,
    pub geometric_dc_kw: f64,
    pub capacity_overridden: bool,

    pub ghi_daily: f64,
    pub dni_daily: Option<f64>,
    pub dif_daily: Option<f64>,
    pub ambient_temp_c: Option<f64>,
    pub poa_daily: Option<f64>,
    pub transposition_gain: Option<f64>,

    pub yield_source: YieldSource,
    pub raw_specific_yield: f64,
    pub raw_annual_energy_kwh: f64,
    pub cell_temperature_c: Option<f64>,
    pub technology_factor: f64,
    pub calibrated_annual_energy_kwh: f64,
    pub calibrated_specific_yield: f64,

    pub usable_fraction: f64,
    pub usable_annual_energy_kwh: f64,
    pub monthly_energy_kwh: [f64; 12],
    pub monthly_distribution: MonthlyDistribution,

    /// Calibrated specific yield outside [`PLAUSIBLE_YIELD_RANGE`]
    pub suspicious: bool,
    pub warnings: Vec<EstimateWarning>,
}

/// Average cell temperature from ambient temperature and NOCT
pub fn cell_temperature(ambient_c: f64, noct_c: f64) -> f64 {
    ambient_c + (noct_c - NOCT_AMBIENT)
}

/// Relative yield of a technology against the baseline at a cell temperature,
/// clamped to [`TECHNOLOGY_FACTOR_RANGE`]
pub fn technology_factor(coefficient: f64, reference_coefficient: f64, cell_temp_c: f64) -> f64 {
    let (lo, hi) = TECHNOLOGY_FACTOR_RANGE;
    let f = 1.0 + (coefficient - reference_coefficient) * (cell_temp_c - STC_CELL_TEMPERATURE);
    if f.is_finite() {
        f.clamp(lo, hi)
    } else {
        1.0
    }
}

/// Produce the energy estimate for `inputs` using the tables in `catalog`.
///
/// # Errors
/// - [`Error::InvalidParameter`] for an invalid configuration, unknown
///   technology or grid key, or a negative / non-finite GHI
/// - [`Error::InsufficientArea`] when no module fits or capacity is zero
pub fn estimate_energy(inputs: &EnergyInputs, catalog: &ProfileCatalog) -> Result<EnergyResult> {
    inputs.config.validate()?;
    if !inputs.ghi_daily.is_finite() || inputs.ghi_daily < 0.0 {
        return Err(Error::invalid_parameter(
            "ghi",
            inputs.ghi_daily,
            "must be a non-negative daily mean",
        ));
    }

    let config = match inputs.technology.as_deref() {
        Some(key) => inputs.config.with_technology(catalog.technology(Some(key))?),
        None => inputs.config.clone(),
    };
    let reference_coefficient = catalog.baseline()?.temperature_coefficient;
    let grid = catalog.grid(inputs.grid_mode.as_deref())?;

    let size = size_system(inputs.area_m2, &config, inputs.capacity_override_kw)?;
    let mut warnings = Vec::new();

    let plane = if inputs.use_tilt_correction && config.tilt_deg > 0.0 {
        match transpose(inputs, &config) {
            Ok(poa) => Some(poa),
            Err(e) => {
                warn!(error = %e, "tilt correction skipped");
                warnings.push(EstimateWarning::TiltCorrectionSkipped { reason: e.to_string() });
                None
            }
        }
    } else {
        None
    };
    let irradiance = plane.map_or(inputs.ghi_daily, |p| p.poa_daily);

    // a monthly reference that cannot be normalized is treated as absent
    let monthly_shares = inputs.reference.monthly().map(reference_shares);
    let reference = match monthly_shares {
        Some(None) => {
            warn!("monthly reference yield unusable, using the irradiance model");
            warnings.push(EstimateWarning::UnusableMonthlyReference);
            &ReferenceYield::None
        }
        _ => &inputs.reference,
    };

    let resolved = resolve_annual_yield(reference, irradiance, config.performance_ratio);
    let raw_annual_energy_kwh = size.dc_capacity_kw * resolved.annual_specific_yield;
    debug!(
        source = ?resolved.source,
        specific_yield = resolved.annual_specific_yield,
        dc_kw = size.dc_capacity_kw,
        "resolved annual yield"
    );

    let cell_temperature_c = inputs.ambient_temp_c.map(|t| cell_temperature(t, config.noct_c));
    let technology_factor = match cell_temperature_c {
        Some(t) => technology_factor(config.temperature_coefficient, reference_coefficient, t),
        None => {
            warnings.push(EstimateWarning::MissingTemperature);
            1.0
        }
    };

    let calibrated_annual_energy_kwh = raw_annual_energy_kwh * technology_factor;
    let calibrated_specific_yield = calibrated_annual_energy_kwh / size.dc_capacity_kw;

    let (min, max) = PLAUSIBLE_YIELD_RANGE;
    let suspicious = !(min..=max).contains(&calibrated_specific_yield);
    if suspicious {
        warn!(specific_yield = calibrated_specific_yield, "specific yield outside plausible range");
        warnings.push(EstimateWarning::SuspiciousYield {
            specific_yield: calibrated_specific_yield,
            min,
            max,
        });
    }

    let usable_annual_energy_kwh = calibrated_annual_energy_kwh * grid.usable_fraction;

    let (shares, monthly_distribution) = match monthly_shares.flatten() {
        Some(shares) => (shares, MonthlyDistribution::Reference),
        None => (latitude_shares(inputs.latitude), MonthlyDistribution::LatitudeModel),
    };

    Ok(EnergyResult {
        area_m2: size.area_m2,
        effective_area_m2: size.effective_area_m2,
        panel_count: size.panel_count,
        dc_capacity_kw: size.dc_capacity_kw,
        ac_capacity_kw: size.ac_capacity_kw,
        geometric_dc_kw: size.geometric_dc_kw,
        capacity_overridden: size.capacity_overridden,
        ghi_daily: inputs.ghi_daily,
        dni_daily: inputs.dni_daily,
        dif_daily: inputs.dif_daily,
        ambient_temp_c: inputs.ambient_temp_c,
        poa_daily: plane.map(|p| p.poa_daily),
        transposition_gain: plane.map(|p| p.gain),
        yield_source: resolved.source,
        raw_specific_yield: resolved.annual_specific_yield,
        raw_annual_energy_kwh,
        cell_temperature_c,
        technology_factor,
        calibrated_annual_energy_kwh,
        calibrated_specific_yield,
        usable_fraction: grid.usable_fraction,
        usable_annual_energy_kwh,
        monthly_energy_kwh: distribute(usable_annual_energy_kwh, &shares),
        monthly_distribution,
        suspicious,
        warnings,
    })
}

fn transpose(inputs: &EnergyInputs, config: &SystemConfiguration) -> Result<PlaneOfArray> {
    hay_davies(&TranspositionInput {
        latitude: inputs.latitude,
        longitude: inputs.longitude,
        orientation: PanelOrientation::new(config.tilt_deg, config.azimuth_deg)?,
        ghi_daily: inputs.ghi_daily,
        dni_daily: inputs.dni_daily,
        dif_daily: inputs.dif_daily,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn catalog() -> ProfileCatalog {
        ProfileCatalog::default()
    }

    #[test]
    fn test_ghi_fallback_scenario() {
        let mut inputs = EnergyInputs::new(100.0, 5.5, 45.0, 7.0);
        inputs.config.performance_ratio = 0.75;
        let result = estimate_energy(&inputs, &catalog()).unwrap();

        assert_eq!(result.panel_count, 47);
        assert_relative_eq!(result.dc_capacity_kw, 19.74, epsilon = 1e-9);
        assert_eq!(result.yield_source, YieldSource::IrradianceFallback);
        assert_relative_eq!(result.raw_specific_yield, 1505.625, epsilon = 1e-9);
        assert_relative_eq!(result.raw_annual_energy_kwh, 19.74 * 1505.625, epsilon = 1e-6);
        assert_relative_eq!(result.technology_factor, 1.0);
        assert!(result.warnings.contains(&EstimateWarning::MissingTemperature));
        assert!(!result.suspicious);
    }

    #[test]
    fn test_factor_clamped_at_extreme_temperature() {
        let mut inputs = EnergyInputs::new(100.0, 5.0, 30.0, 0.0);
        inputs.ambient_temp_c = Some(60.0);

        inputs.config.temperature_coefficient = -0.02;
        let low = estimate_energy(&inputs, &catalog()).unwrap();
        assert_relative_eq!(low.technology_factor, 0.90);

        inputs.config.temperature_coefficient = 0.01;
        let high = estimate_energy(&inputs, &catalog()).unwrap();
        assert_relative_eq!(high.technology_factor, 1.05);

        for t in [-40.0, 0.0, 25.0, 60.0, 80.0] {
            let f = technology_factor(-0.0040, -0.0035, cell_temperature(t, 46.0));
            assert!((0.90..=1.05).contains(&f));
        }
    }

    #[test]
    fn test_thin_film_gains_when_hot() {
        let mut inputs = EnergyInputs::new(100.0, 5.0, 30.0, 0.0);
        inputs.ambient_temp_c = Some(25.0);
        inputs.technology = Some("thin-film".into());
        let result = estimate_energy(&inputs, &catalog()).unwrap();

        // cell at 49 °C, (−0.0025 + 0.0035) * 24 = 0.024
        assert_relative_eq!(result.cell_temperature_c.unwrap(), 49.0);
        assert_relative_eq!(result.technology_factor, 1.024, epsilon = 1e-12);
        assert_relative_eq!(
            result.calibrated_specific_yield,
            result.raw_specific_yield * 1.024,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_monthly_sums_to_usable_on_both_paths() {
        let mut inputs = EnergyInputs::new(250.0, 4.8, -33.0, 151.0);
        inputs.grid_mode = Some("hybrid".into());
        let latitude_path = estimate_energy(&inputs, &catalog()).unwrap();
        assert_eq!(latitude_path.monthly_distribution, MonthlyDistribution::LatitudeModel);
        assert_relative_eq!(
            latitude_path.monthly_energy_kwh.iter().sum::<f64>(),
            latitude_path.usable_annual_energy_kwh,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            latitude_path.usable_annual_energy_kwh,
            latitude_path.calibrated_annual_energy_kwh * 0.95,
            epsilon = 1e-9
        );

        inputs.reference =
            ReferenceYield::Monthly([5.9, 5.5, 4.8, 3.9, 3.1, 2.7, 2.9, 3.6, 4.5, 5.2, 5.7, 6.0]);
        let reference_path = estimate_energy(&inputs, &catalog()).unwrap();
        assert_eq!(reference_path.monthly_distribution, MonthlyDistribution::Reference);
        assert_eq!(reference_path.yield_source, YieldSource::MonthlyDailyMeans);
        assert_relative_eq!(
            reference_path.monthly_energy_kwh.iter().sum::<f64>(),
            reference_path.usable_annual_energy_kwh,
            epsilon = 1e-6
        );
        assert!(reference_path.monthly_energy_kwh[11] > reference_path.monthly_energy_kwh[5]);
    }

    #[test]
    fn test_unusable_monthly_reference_falls_back_entirely() {
        let mut inputs = EnergyInputs::new(100.0, 5.5, 45.0, 7.0);
        inputs.config.performance_ratio = 0.75;
        let mut months = [120.0; 12];
        months[3] = -40.0;
        inputs.reference = ReferenceYield::Monthly(months);
        let result = estimate_energy(&inputs, &catalog()).unwrap();

        assert_eq!(result.yield_source, YieldSource::IrradianceFallback);
        assert_relative_eq!(result.raw_specific_yield, 1505.625, epsilon = 1e-9);
        assert_eq!(result.monthly_distribution, MonthlyDistribution::LatitudeModel);
        assert!(result.warnings.contains(&EstimateWarning::UnusableMonthlyReference));

        inputs.reference = ReferenceYield::Monthly([f64::NAN; 12]);
        let result = estimate_energy(&inputs, &catalog()).unwrap();
        assert_eq!(result.yield_source, YieldSource::IrradianceFallback);
        assert!(result.raw_specific_yield.is_finite());
    }

    #[test]
    fn test_suspicious_yield_is_flagged_not_rejected() {
        let mut inputs = EnergyInputs::new(100.0, 5.0, 45.0, 0.0);
        inputs.reference = ReferenceYield::Scalar(3000.0);
        let result = estimate_energy(&inputs, &catalog()).unwrap();

        assert!(result.suspicious);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, EstimateWarning::SuspiciousYield { .. })));
    }

    #[test]
    fn test_tilt_correction_raises_fallback_yield() {
        let mut inputs = EnergyInputs::new(100.0, 4.0, 45.0, 0.0);
        inputs.config.tilt_deg = 35.0;
        let flat = estimate_energy(&inputs, &catalog()).unwrap();
        assert!(flat.poa_daily.is_none());

        inputs.use_tilt_correction = true;
        let tilted = estimate_energy(&inputs, &catalog()).unwrap();
        let gain = tilted.transposition_gain.unwrap();
        assert!(gain > 1.0);
        assert_relative_eq!(
            tilted.raw_specific_yield,
            flat.raw_specific_yield * gain,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_reference_yield_ignores_tilt_gain() {
        let mut inputs = EnergyInputs::new(100.0, 4.0, 45.0, 0.0);
        inputs.reference = ReferenceYield::Scalar(1350.0);
        inputs.use_tilt_correction = true;
        let result = estimate_energy(&inputs, &catalog()).unwrap();

        assert!(result.poa_daily.is_some());
        assert_relative_eq!(result.raw_specific_yield, 1350.0);
    }

    #[test]
    fn test_errors() {
        let inputs = EnergyInputs::new(1.0, 5.0, 45.0, 0.0);
        assert!(matches!(estimate_energy(&inputs, &catalog()), Err(Error::InsufficientArea(_))));

        let mut inputs = EnergyInputs::new(100.0, 5.0, 45.0, 0.0);
        inputs.technology = Some("perovskite".into());
        assert!(matches!(
            estimate_energy(&inputs, &catalog()),
            Err(Error::InvalidParameter { .. })
        ));

        let inputs = EnergyInputs::new(100.0, f64::NAN, 45.0, 0.0);
        assert!(estimate_energy(&inputs, &catalog()).is_err());
    }
}
