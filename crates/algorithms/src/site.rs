//! End-to-end estimate for one site: polygon and layers in, statistics and
//! energy out.

use crate::pv::{
    estimate_energy, EnergyInputs, EnergyResult, EstimateWarning, ProfileCatalog, ReferenceYield,
    SystemConfiguration,
};
use crate::statistics::{
    polygon_ring, sample_layers, LayerKind, LayerRequest, LayerSamples, ZonalStatistics,
};
use serde::{Deserialize, Serialize};
use solarsite_core::vector::Ring;
use solarsite_core::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// A site estimation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRequest {
    /// Closed or open ring of `[longitude, latitude]` pairs
    pub polygon: Vec<[f64; 2]>,
    pub area_m2: f64,
    pub layers: Vec<LayerRequest>,
    #[serde(default)]
    pub config: SystemConfiguration,
    /// Site latitude; the polygon centroid when absent
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub use_tilt_correction: bool,
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default)]
    pub grid_mode: Option<String>,
    /// Installed DC capacity in kWp
    #[serde(default)]
    pub capacity_override_kw: Option<f64>,
}

/// Per-layer statistics and the energy estimate for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEstimate {
    pub latitude: f64,
    pub longitude: f64,
    pub layers: BTreeMap<LayerKind, ZonalStatistics>,
    pub energy: EnergyResult,
}

/// Sample the request's layers and estimate energy.
///
/// # Errors
/// Polygon, sampling (of the `GHI` layer), configuration and sizing errors;
/// failures of optional layers become warnings on the result.
pub fn estimate_site(request: &SiteRequest, catalog: &ProfileCatalog) -> Result<SiteEstimate> {
    let ring = polygon_ring(&request.polygon)?;
    let samples = sample_layers(&ring, &request.layers)?;
    estimate_from_samples(request, &ring, samples, catalog)
}

/// Energy estimate from layers that were already sampled
pub fn estimate_from_samples(
    request: &SiteRequest,
    ring: &Ring,
    samples: LayerSamples,
    catalog: &ProfileCatalog,
) -> Result<SiteEstimate> {
    let ghi = samples.mean(LayerKind::Ghi).ok_or_else(|| {
        Error::invalid_parameter("layers", "GHI", "primary irradiance layer was not sampled")
    })?;

    let (cx, cy) = ring.centroid();
    let latitude = request.latitude.unwrap_or(cy);
    let longitude = request.longitude.unwrap_or(cx);

    let reference = reference_yield(&samples);
    debug!(ghi, latitude, longitude, ?reference, "estimating site energy");

    let inputs = EnergyInputs {
        area_m2: request.area_m2,
        config: request.config.clone(),
        latitude,
        longitude,
        ghi_daily: ghi,
        dni_daily: samples.mean(LayerKind::Dni),
        dif_daily: samples.mean(LayerKind::Dif),
        ambient_temp_c: samples.mean(LayerKind::Temp),
        reference,
        use_tilt_correction: request.use_tilt_correction,
        technology: request.technology.clone(),
        grid_mode: request.grid_mode.clone(),
        capacity_override_kw: request.capacity_override_kw,
    };

    let mut energy = estimate_energy(&inputs, catalog)?;
    let omitted = samples.warnings.into_iter().map(|w| EstimateWarning::LayerOmitted {
        layer: w.layer.to_string(),
        message: w.message,
    });
    energy.warnings.splice(0..0, omitted);

    Ok(SiteEstimate {
        latitude,
        longitude,
        layers: samples.statistics,
        energy,
    })
}

/// Monthly reference when all twelve months were sampled, else the scalar layer
fn reference_yield(samples: &LayerSamples) -> ReferenceYield {
    let mut months = [0.0; 12];
    let complete = LayerKind::monthly()
        .zip(months.iter_mut())
        .all(|(layer, slot)| match samples.mean(layer) {
            Some(v) => {
                *slot = v;
                true
            }
            None => false,
        });

    if complete {
        ReferenceYield::Monthly(months)
    } else {
        samples
            .mean(LayerKind::ReferenceYield)
            .map_or(ReferenceYield::None, ReferenceYield::Scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::LayerWarning;
    use approx::assert_relative_eq;
    use solarsite_core::normalize_ring;

    fn stats(mean: f64) -> ZonalStatistics {
        ZonalStatistics {
            mean,
            median: mean,
            min: mean,
            max: mean,
            std_dev: 0.0,
            count: 4,
            units: None,
            centroid_fallback: false,
            stride: 1,
        }
    }

    fn request() -> SiteRequest {
        SiteRequest {
            polygon: vec![[10.0, 44.0], [10.001, 44.0], [10.001, 44.001], [10.0, 44.001]],
            area_m2: 100.0,
            layers: Vec::new(),
            config: SystemConfiguration::default(),
            latitude: None,
            longitude: None,
            use_tilt_correction: false,
            technology: None,
            grid_mode: None,
            capacity_override_kw: None,
        }
    }

    fn samples(entries: &[(LayerKind, f64)]) -> LayerSamples {
        LayerSamples {
            statistics: entries.iter().map(|&(k, v)| (k, stats(v))).collect(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_centroid_defaults_site_location() {
        let req = request();
        let ring = normalize_ring(&req.polygon).unwrap();
        let ghi = samples(&[(LayerKind::Ghi, 4.5)]);
        let est = estimate_from_samples(&req, &ring, ghi, &ProfileCatalog::default()).unwrap();
        assert_relative_eq!(est.latitude, 44.0005, epsilon = 1e-9);
        assert_relative_eq!(est.longitude, 10.0005, epsilon = 1e-9);
    }

    #[test]
    fn test_monthly_layers_take_precedence() {
        let req = request();
        let ring = normalize_ring(&req.polygon).unwrap();
        let mut entries: Vec<(LayerKind, f64)> =
            LayerKind::monthly().map(|k| (k, 100.0)).collect();
        entries.push((LayerKind::Ghi, 4.5));
        entries.push((LayerKind::ReferenceYield, 4.0));

        let est =
            estimate_from_samples(&req, &ring, samples(&entries), &ProfileCatalog::default())
                .unwrap();
        assert_relative_eq!(est.energy.raw_specific_yield, 1200.0);
    }

    #[test]
    fn test_incomplete_monthly_falls_back_to_scalar() {
        let req = request();
        let ring = normalize_ring(&req.polygon).unwrap();
        let entries = [
            (LayerKind::Ghi, 4.5),
            (LayerKind::MonthlyReferenceYield(1), 100.0),
            (LayerKind::ReferenceYield, 4.0),
        ];
        let est =
            estimate_from_samples(&req, &ring, samples(&entries), &ProfileCatalog::default())
                .unwrap();
        assert_relative_eq!(est.energy.raw_specific_yield, 1460.0);
    }

    #[test]
    fn test_layer_warnings_are_carried() {
        let req = request();
        let ring = normalize_ring(&req.polygon).unwrap();
        let mut s = samples(&[(LayerKind::Ghi, 4.5)]);
        s.warnings.push(LayerWarning {
            layer: LayerKind::Temp,
            message: "raster not found".into(),
        });

        let est = estimate_from_samples(&req, &ring, s, &ProfileCatalog::default()).unwrap();
        assert!(matches!(
            &est.energy.warnings[0],
            EstimateWarning::LayerOmitted { layer, .. } if layer == "TEMP"
        ));
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "polygon": [[10.0, 44.0], [10.001, 44.0], [10.001, 44.001], [10.0, 44.001]],
            "area_m2": 120.0,
            "layers": [
                {"layer": "GHI", "path": "ghi.tif"},
                {"layer": "PVOUT_07", "path": "jul.tif"}
            ],
            "config": {"tilt_deg": 30.0},
            "technology": "poly",
            "use_tilt_correction": true
        }"#;
        let req: SiteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.layers[1].layer, LayerKind::MonthlyReferenceYield(7));
        assert_relative_eq!(req.config.tilt_deg, 30.0);
        assert_relative_eq!(req.config.packing_factor, 0.8);
        assert!(req.latitude.is_none());
        assert!(req.use_tilt_correction);
    }
}
