//! Monthly distribution of an annual energy total
//!
//! With twelve reference values the shares follow them directly. Otherwise a
//! fixed seasonal curve (summer peak, winter trough) is weighted by month
//! length and scaled by an amplitude that grows from 0.05 at the equator to
//! 0.90 at the poles. The curve is shifted six months south of the equator.

/// Northern-hemisphere seasonal shape, January..December, in `[-1, 1]`
pub const SEASONAL_CURVE: [f64; 12] = [
    -0.914, -0.588, -0.105, 0.407, 0.809, 0.995, 0.914, 0.588, 0.105, -0.407, -0.809, -0.995,
];

pub const DAYS_IN_MONTH: [f64; 12] = [
    31.0, 28.0, 31.0, 30.0, 31.0, 30.0, 31.0, 31.0, 30.0, 31.0, 30.0, 31.0,
];

const MIN_AMPLITUDE: f64 = 0.05;
const AMPLITUDE_RANGE: f64 = 0.85;

/// Seasonal amplitude for a latitude
pub fn seasonal_amplitude(latitude: f64) -> f64 {
    MIN_AMPLITUDE + AMPLITUDE_RANGE * (latitude.abs() / 90.0).min(1.0)
}

/// Monthly shares from the latitude model; they sum to 1
pub fn latitude_shares(latitude: f64) -> [f64; 12] {
    let amplitude = seasonal_amplitude(latitude);
    let offset = if latitude < 0.0 { 6 } else { 0 };

    let mut weights = [0.0; 12];
    for (month, weight) in weights.iter_mut().enumerate() {
        let shape = SEASONAL_CURVE[(month + offset) % 12];
        *weight = DAYS_IN_MONTH[month] * (1.0 + amplitude * shape);
    }
    normalize(weights).unwrap_or([1.0 / 12.0; 12])
}

/// Shares proportional to twelve reference values, `None` when they cannot
/// be normalized (non-finite, negative, or summing to zero)
pub fn reference_shares(values: &[f64; 12]) -> Option<[f64; 12]> {
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    normalize(*values)
}

fn normalize(mut values: [f64; 12]) -> Option<[f64; 12]> {
    let sum: f64 = values.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    values.iter_mut().for_each(|v| *v /= sum);
    Some(values)
}

/// Split `annual` across months by `shares`
pub fn distribute(annual: f64, shares: &[f64; 12]) -> [f64; 12] {
    shares.map(|s| annual * s)
}
