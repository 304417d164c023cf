//! Non-fatal findings attached to an energy estimate

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateWarning {
    /// Calibrated specific yield outside the plausible band
    SuspiciousYield { specific_yield: f64, min: f64, max: f64 },
    /// No ambient temperature; the technology factor was left at 1
    MissingTemperature,
    /// Monthly reference values could not be normalized; the latitude model was used
    UnusableMonthlyReference,
    /// Tilt correction was requested but not applied
    TiltCorrectionSkipped { reason: String },
    /// An optional raster layer was dropped during sampling
    LayerOmitted { layer: String, message: String },
}

impl fmt::Display for EstimateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateWarning::SuspiciousYield { specific_yield, min, max } => write!(
                f,
                "specific yield {:.0} kWh/kWp/yr is outside the plausible range {:.0}-{:.0}",
                specific_yield, min, max
            ),
            EstimateWarning::MissingTemperature => {
                write!(f, "no ambient temperature, technology correction not applied")
            }
            EstimateWarning::UnusableMonthlyReference => {
                write!(f, "monthly reference values unusable, using latitude seasonal model")
            }
            EstimateWarning::TiltCorrectionSkipped { reason } => {
                write!(f, "tilt correction skipped: {}", reason)
            }
            EstimateWarning::LayerOmitted { layer, message } => {
                write!(f, "layer {} omitted: {}", layer, message)
            }
        }
    }
}
