//! Celestial body ephemerides for third-body perturbations
//!
//! # Ephemeris Options
//!
//! - **Low (lpephem)**: analytical approximations, no external data needed
//! - **High (jplephem)**: JPL DE440, requires the ephemeris data files

use nalgebra::Vector3;
use satkit::{jplephem, lpephem, Instant, SolarSystem};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::propagation::constants::{MU_MOON, MU_SUN};
use crate::propagation::frame::require_satkit_data;

/// Perturbing body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CelestialBody {
    Sun,
    Moon,
}

impl CelestialBody {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sun => "Sun",
            Self::Moon => "Moon",
        }
    }

    /// Gravitational parameter (m³/s²)
    pub fn gravitational_parameter(&self) -> f64 {
        match self {
            Self::Sun => MU_SUN,
            Self::Moon => MU_MOON,
        }
    }
}

/// Source of geocentric body positions
pub trait Ephemeris: std::fmt::Debug + Send + Sync {
    /// Geocentric GCRF position of `body` (meters)
    fn position(&self, body: CelestialBody, instant: &Instant) -> Result<Vector3<f64>>;

    fn name(&self) -> &'static str;
}

/// Ephemeris precision level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EphemerisType {
    /// Accuracy: ~0.1° for Sun, ~0.3° for Moon
    #[default]
    LowPrecision,

    /// Accuracy: sub-arcsecond
    HighPrecision,
}

impl EphemerisType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LowPrecision => "Low-Precision (lpephem)",
            Self::HighPrecision => "High-Precision (jplephem/DE440)",
        }
    }
}

/// Sun and Moon positions from satkit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SatkitEphemeris {
    precision: EphemerisType,
}

impl SatkitEphemeris {
    pub fn new(precision: EphemerisType) -> Self {
        Self { precision }
    }

    pub fn low_precision() -> Self {
        Self::new(EphemerisType::LowPrecision)
    }

    pub fn high_precision() -> Self {
        Self::new(EphemerisType::HighPrecision)
    }

    pub fn precision(&self) -> EphemerisType {
        self.precision
    }
}

impl Ephemeris for SatkitEphemeris {
    fn position(&self, body: CelestialBody, instant: &Instant) -> Result<Vector3<f64>> {
        match self.precision {
            EphemerisType::LowPrecision => {
                let pos = match body {
                    CelestialBody::Sun => lpephem::sun::pos_gcrf(instant),
                    CelestialBody::Moon => lpephem::moon::pos_gcrf(instant),
                };
                Ok(Vector3::new(pos[0], pos[1], pos[2]))
            }
            EphemerisType::HighPrecision => {
                require_satkit_data("JPL ephemeris")?;
                let target = match body {
                    CelestialBody::Sun => SolarSystem::Sun,
                    CelestialBody::Moon => SolarSystem::Moon,
                };
                let pos = jplephem::geocentric_pos(target, instant).map_err(|e| {
                    Error::Environment(format!("JPL ephemeris failed for {}: {}", body.name(), e))
                })?;
                Ok(Vector3::new(pos[0], pos[1], pos[2]))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.precision.name()
    }
}
