//! Solar geometry and irradiance transposition
//!
//! - **position**: sun position, extraterrestrial and clear-sky irradiance
//! - **decomposition**: Erbs split of GHI into beam and diffuse
//! - **transposition**: Hay-Davies plane-of-array irradiance

pub mod decomposition;
pub mod position;
pub mod transposition;

pub use decomposition::{clearness_index, decompose, erbs_diffuse_fraction, Decomposition};
pub use position::{
    clear_sky_ghi, representative_position, solar_position, SolarPosition, REPRESENTATIVE_DAY,
    REPRESENTATIVE_HOUR,
};
pub use transposition::{
    angle_of_incidence, hay_davies, hay_davies_at, PanelOrientation, PlaneOfArray,
    TranspositionInput, ALBEDO, EQUIVALENT_SUN_HOURS,
};
