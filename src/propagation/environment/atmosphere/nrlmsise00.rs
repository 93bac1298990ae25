//! NRLMSISE-00 through satkit
//!
//! The position is converted to geodetic coordinates through ITRF first, so
//! this model needs satkit's data files even with space weather disabled.
//! Without them every query fails with `Error::Environment`.

use nalgebra::Vector3;
use satkit::Instant;

use super::{gcrf_to_geodetic, AtmosphereDensity, AtmosphereModel};
use crate::error::Result;
use crate::propagation::constants::EARTH_RADIUS_M;
use crate::propagation::frame::require_satkit_data;

/// Top of the model; density is zero above it (m)
const MODEL_CEILING: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Nrlmsise00 {
    use_space_weather: bool,
}

impl Default for Nrlmsise00 {
    fn default() -> Self {
        Self::new()
    }
}

impl Nrlmsise00 {
    /// F10.7 and Ap looked up by satkit for each query instant
    pub fn new() -> Self {
        Self {
            use_space_weather: true,
        }
    }

    /// Fixed moderate solar and geomagnetic activity; results do not depend on the date
    pub fn without_space_weather() -> Self {
        Self {
            use_space_weather: false,
        }
    }

    pub fn uses_space_weather(&self) -> bool {
        self.use_space_weather
    }
}

impl AtmosphereModel for Nrlmsise00 {
    fn density(&self, position: &Vector3<f64>, epoch: &Instant) -> Result<AtmosphereDensity> {
        let altitude = position.norm() - EARTH_RADIUS_M;
        if altitude > MODEL_CEILING {
            return Ok(AtmosphereDensity::zero());
        }
        if altitude < 0.0 {
            return Ok(AtmosphereDensity::new(1.225));
        }

        require_satkit_data("NRLMSISE-00")?;
        let (lat_deg, lon_deg, alt_m) = gcrf_to_geodetic(position, epoch)?;

        let (rho, temperature) = satkit::nrlmsise::nrlmsise(
            alt_m / 1000.0,
            Some(lat_deg),
            Some(lon_deg),
            self.use_space_weather.then_some(epoch),
            self.use_space_weather,
        );

        Ok(AtmosphereDensity::with_temperature(rho, temperature))
    }

    fn name(&self) -> &'static str {
        "NRLMSISE-00"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    /// Needs satkit's data files
    #[test]
    fn test_nrlmsise_leo_density() {
        if !satkit::utils::data_found() {
            eprintln!("skipping: satkit data files not installed");
            return;
        }
        let model = Nrlmsise00::without_space_weather();
        let position = Vector3::new(EARTH_RADIUS_M + 400_000.0, 0.0, 0.0);

        let density = model.density(&position, &epoch()).unwrap();

        // Roughly 1e-12 to 1e-11 kg/m³ at 400 km
        assert!(density.rho > 1e-14);
        assert!(density.rho < 1e-10);
        assert!(density.temperature.is_some());
    }

    #[test]
    fn test_missing_data_is_environment_error() {
        if satkit::utils::data_found() {
            return;
        }
        let position = Vector3::new(EARTH_RADIUS_M + 400_000.0, 0.0, 0.0);
        assert!(matches!(
            Nrlmsise00::new().density(&position, &epoch()),
            Err(Error::Environment(_))
        ));
    }

    #[test]
    fn test_above_ceiling_needs_no_data() {
        let position = Vector3::new(EARTH_RADIUS_M + 2_000_000.0, 0.0, 0.0);
        assert_eq!(Nrlmsise00::new().density(&position, &epoch()).unwrap().rho, 0.0);
    }
}
