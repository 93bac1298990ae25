//! Exponential atmosphere
//!
//! Needs no satkit data files, which makes it the drag model of choice for
//! tests and for quick runs on machines without the IERS and space weather
//! tables. Altitude is measured above a spherical Earth.

use nalgebra::Vector3;
use satkit::Instant;

use super::{AtmosphereDensity, AtmosphereModel};
use crate::error::{Error, Result};
use crate::propagation::constants::EARTH_RADIUS_M;

/// Reference bands (base altitude km, base density kg/m³, scale height km)
const BANDS: [(f64, f64, f64); 12] = [
    (0.0, 1.225, 7.249),
    (100.0, 5.297e-7, 5.877),
    (150.0, 2.070e-9, 22.523),
    (200.0, 2.789e-10, 37.105),
    (300.0, 1.916e-11, 53.628),
    (400.0, 2.803e-12, 58.515),
    (500.0, 5.215e-13, 60.828),
    (600.0, 1.137e-13, 63.822),
    (700.0, 3.070e-14, 71.835),
    (800.0, 1.136e-14, 88.667),
    (900.0, 5.759e-15, 124.64),
    (1000.0, 3.561e-15, 181.05),
];

/// ρ(h) = ρ_ref · exp(-(h - h_ref) / H), zero above `ceiling`
#[derive(Debug, Clone, PartialEq)]
pub struct Exponential {
    /// Altitude the reference density is given at (m)
    pub reference_altitude: f64,
    /// Density at the reference altitude (kg/m³)
    pub reference_density: f64,
    /// Scale height (m)
    pub scale_height: f64,
    /// Altitude above which density is zero (m)
    pub ceiling: f64,
}

impl Default for Exponential {
    fn default() -> Self {
        Self::standard()
    }
}

impl Exponential {
    /// Sea-level density with an 8.5 km scale height
    pub fn standard() -> Self {
        Self {
            reference_altitude: 0.0,
            reference_density: 1.225,
            scale_height: 8500.0,
            ceiling: 1_000_000.0,
        }
    }

    /// Sea-level anchored model
    pub fn new(sea_level_density: f64, scale_height: f64, ceiling: f64) -> Result<Self> {
        Self::anchored(0.0, sea_level_density, scale_height, ceiling)
    }

    /// Model anchored at `reference_altitude` instead of sea level
    pub fn anchored(
        reference_altitude: f64,
        reference_density: f64,
        scale_height: f64,
        ceiling: f64,
    ) -> Result<Self> {
        if !(reference_density >= 0.0 && reference_density.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "reference density must be finite and non-negative, got {}",
                reference_density
            )));
        }
        if !(scale_height > 0.0 && scale_height.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "scale height must be positive, got {}",
                scale_height
            )));
        }

        Ok(Self {
            reference_altitude,
            reference_density,
            scale_height,
            ceiling,
        })
    }

    /// Band of the reference table covering `altitude_km`
    ///
    /// Exact at the band base, and a far better fit than the sea-level model
    /// for an orbit that stays near one altitude.
    pub fn at_altitude(altitude_km: f64) -> Self {
        let (base, density, scale_height) = BANDS
            .iter()
            .rev()
            .find(|(base, _, _)| altitude_km >= *base)
            .copied()
            .unwrap_or(BANDS[0]);

        Self {
            reference_altitude: base * 1000.0,
            reference_density: density,
            scale_height: scale_height * 1000.0,
            ceiling: 1_000_000.0_f64.max(base * 1000.0),
        }
    }
}

impl AtmosphereModel for Exponential {
    fn density(&self, position: &Vector3<f64>, _epoch: &Instant) -> Result<AtmosphereDensity> {
        let altitude = position.norm() - EARTH_RADIUS_M;
        if altitude > self.ceiling {
            return Ok(AtmosphereDensity::zero());
        }

        // Below the reference the profile is held at the reference density
        let height = (altitude - self.reference_altitude).max(0.0);
        Ok(AtmosphereDensity::new(
            self.reference_density * (-height / self.scale_height).exp(),
        ))
    }

    fn name(&self) -> &'static str {
        "Exponential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn at_height(meters: f64) -> Vector3<f64> {
        Vector3::new(EARTH_RADIUS_M + meters, 0.0, 0.0)
    }

    #[test]
    fn test_one_scale_height_above_sea_level() {
        let density = Exponential::standard().density(&at_height(8500.0), &epoch()).unwrap();
        assert!((density.rho - 1.225 * (-1.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_above_ceiling() {
        let model = Exponential::new(1.225, 8500.0, 500_000.0).unwrap();
        assert_eq!(model.density(&at_height(600_000.0), &epoch()).unwrap().rho, 0.0);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(matches!(
            Exponential::new(1.225, 0.0, 1.0e6),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Exponential::anchored(400_000.0, -1.0, 58_515.0, 1.0e6),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_band_reproduces_reference_density() {
        let model = Exponential::at_altitude(420.0);
        assert_eq!(model.reference_altitude, 400_000.0);

        let rho = model.density(&at_height(400_000.0), &epoch()).unwrap().rho;
        assert!((rho - 2.803e-12).abs() < 1e-18);

        let higher = model.density(&at_height(450_000.0), &epoch()).unwrap().rho;
        assert!(higher < rho);
    }

    #[test]
    fn test_below_first_band_uses_sea_level() {
        let model = Exponential::at_altitude(-5.0);
        assert_eq!(model.reference_density, 1.225);
    }
}
