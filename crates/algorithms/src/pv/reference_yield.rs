//! Annual specific yield from reference data of uncertain units
//!
//! Reference yield rasters come either as an annual total or as a daily mean
//! (kWh/kWp), and monthly series either as monthly totals or as daily means
//! per month. Nothing in the data says which, so magnitude decides:
//!
//! - twelve monthly values summing below [`MONTHLY_DAILY_THRESHOLD`] are daily
//!   means; the sum is scaled by [`DAYS_PER_MONTH`]
//! - a scalar below [`SCALAR_DAILY_THRESHOLD`] is a daily mean; it is scaled
//!   by 365
//! - anything else is already annual
//!
//! These are heuristics. A layer whose units are declared in its metadata
//! would make them unnecessary.

use serde::{Deserialize, Serialize};

pub const MONTHLY_DAILY_THRESHOLD: f64 = 100.0;
pub const SCALAR_DAILY_THRESHOLD: f64 = 10.0;
pub const DAYS_PER_MONTH: f64 = 30.4375;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Reference yield as it was sampled
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReferenceYield {
    #[default]
    None,
    /// Single value, annual total or daily mean
    Scalar(f64),
    /// January..December values, monthly totals or daily means
    Monthly([f64; 12]),
}

/// How the annual specific yield was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldSource {
    MonthlyDailyMeans,
    MonthlyTotals,
    ScalarDailyMean,
    ScalarAnnual,
    /// `irradiance * 365 * performance ratio`
    IrradianceFallback,
}

/// Annual specific yield in kWh/kWp/year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedYield {
    pub annual_specific_yield: f64,
    pub source: YieldSource,
}

impl ReferenceYield {
    /// Monthly values, when the reference carries them
    pub fn monthly(&self) -> Option<&[f64; 12]> {
        match self {
            ReferenceYield::Monthly(values) => Some(values),
            _ => None,
        }
    }
}

/// Resolve the annual specific yield.
///
/// `irradiance` is the daily-mean irradiance (kWh/m²/day) used when there is
/// no reference yield: horizontal GHI, or plane-of-array when tilt correction
/// is on.
pub fn resolve_annual_yield(
    reference: &ReferenceYield,
    irradiance: f64,
    performance_ratio: f64,
) -> ResolvedYield {
    let (annual_specific_yield, source) = match reference {
        ReferenceYield::Monthly(values) => {
            let sum: f64 = values.iter().sum();
            if sum < MONTHLY_DAILY_THRESHOLD {
                (sum * DAYS_PER_MONTH, YieldSource::MonthlyDailyMeans)
            } else {
                (sum, YieldSource::MonthlyTotals)
            }
        }
        ReferenceYield::Scalar(value) if *value < SCALAR_DAILY_THRESHOLD => {
            (value * DAYS_PER_YEAR, YieldSource::ScalarDailyMean)
        }
        ReferenceYield::Scalar(value) => (*value, YieldSource::ScalarAnnual),
        ReferenceYield::None => (
            irradiance * DAYS_PER_YEAR * performance_ratio,
            YieldSource::IrradianceFallback,
        ),
    };

    ResolvedYield { annual_specific_yield, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monthly_daily_means() {
        let mut months = [4.0; 12];
        months[0] = 6.0; // sum = 50
        let r = resolve_annual_yield(&ReferenceYield::Monthly(months), 5.0, 0.8);
        assert_eq!(r.source, YieldSource::MonthlyDailyMeans);
        assert_relative_eq!(r.annual_specific_yield, 50.0 * 30.4375);
    }

    #[test]
    fn test_monthly_totals() {
        let r = resolve_annual_yield(&ReferenceYield::Monthly([100.0; 12]), 5.0, 0.8);
        assert_eq!(r.source, YieldSource::MonthlyTotals);
        assert_relative_eq!(r.annual_specific_yield, 1200.0);
    }

    #[test]
    fn test_scalar() {
        let daily = resolve_annual_yield(&ReferenceYield::Scalar(4.2), 5.0, 0.8);
        assert_eq!(daily.source, YieldSource::ScalarDailyMean);
        assert_relative_eq!(daily.annual_specific_yield, 4.2 * 365.0);

        let annual = resolve_annual_yield(&ReferenceYield::Scalar(1450.0), 5.0, 0.8);
        assert_eq!(annual.source, YieldSource::ScalarAnnual);
        assert_relative_eq!(annual.annual_specific_yield, 1450.0);
    }

    #[test]
    fn test_irradiance_fallback() {
        let r = resolve_annual_yield(&ReferenceYield::None, 5.5, 0.75);
        assert_eq!(r.source, YieldSource::IrradianceFallback);
        assert_relative_eq!(r.annual_specific_yield, 1505.625, epsilon = 1e-9);
    }
}
