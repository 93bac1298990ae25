//! Atmospheric density models behind `AtmosphericDrag`
//!
//! - **NRLMSISE-00**: satkit's empirical model, needs satkit's data files
//! - **Exponential**: closed form, no external data

mod exponential;
mod nrlmsise00;

pub use exponential::Exponential;
pub use nrlmsise00::Nrlmsise00;

use std::sync::Arc;

use nalgebra::Vector3;
use satkit::Instant;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::propagation::constants::EARTH_RADIUS_M;
use crate::propagation::frame::Frame;

/// Output from an atmosphere model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereDensity {
    /// Total atmospheric mass density in kg/m³
    pub rho: f64,

    /// Exospheric temperature in Kelvin (if available)
    pub temperature: Option<f64>,
}

impl AtmosphereDensity {
    /// Density-only result
    pub fn new(rho: f64) -> Self {
        Self {
            rho,
            temperature: None,
        }
    }

    /// Density with temperature
    pub fn with_temperature(rho: f64, temperature: f64) -> Self {
        Self {
            rho,
            temperature: Some(temperature),
        }
    }

    /// Zero density (above the atmosphere)
    pub fn zero() -> Self {
        Self::new(0.0)
    }
}

/// Atmospheric density model
///
/// Implementations must be thread-safe so dynamics can be shared between
/// propagators.
pub trait AtmosphereModel: std::fmt::Debug + Send + Sync {
    /// Density at a GCRF position (meters) and instant
    fn density(&self, position: &Vector3<f64>, epoch: &Instant) -> Result<AtmosphereDensity>;

    /// Model name for logging and display
    fn name(&self) -> &'static str;
}

/// Runtime model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AtmosphereModelType {
    /// NRLMSISE-00 empirical model
    #[default]
    Nrlmsise00,

    /// Simple exponential model
    Exponential,
}

impl AtmosphereModelType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nrlmsise00 => "NRLMSISE-00",
            Self::Exponential => "Exponential",
        }
    }

    /// Shared model instance
    pub fn create(&self) -> Arc<dyn AtmosphereModel> {
        match self {
            Self::Nrlmsise00 => Arc::new(Nrlmsise00::new()),
            Self::Exponential => Arc::new(Exponential::default()),
        }
    }
}

/// Geodetic latitude, longitude (degrees) and height (meters) of a GCRF position
pub(crate) fn gcrf_to_geodetic(
    position: &Vector3<f64>,
    epoch: &Instant,
) -> Result<(f64, f64, f64)> {
    let to_itrf = Frame::Gcrf.transform_to(Frame::Itrf, epoch)?;
    let pos_itrf = to_itrf.apply_to_vector(position);

    let coord = satkit::itrfcoord::ITRFCoord::from_slice(&[pos_itrf.x, pos_itrf.y, pos_itrf.z])
        .unwrap_or_else(|_| {
            // Spherical approximation
            let r = pos_itrf.norm();
            satkit::itrfcoord::ITRFCoord::from_geodetic_deg(
                (pos_itrf.z / r).asin().to_degrees(),
                pos_itrf.y.atan2(pos_itrf.x).to_degrees(),
                r - EARTH_RADIUS_M,
            )
        });

    let mut lon = coord.longitude_deg();
    if lon > 180.0 {
        lon -= 360.0;
    } else if lon < -180.0 {
        lon += 360.0;
    }

    Ok((coord.latitude_deg(), lon, coord.hae()))
}
