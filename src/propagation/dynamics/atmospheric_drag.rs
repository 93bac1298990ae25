//! Atmospheric drag
//!
//! a = -½ ρ (Cd × A / m) |v_rel| v_rel
//!
//! where:
//! - ρ is atmospheric density from the configured atmosphere model
//! - v_rel is velocity relative to the co-rotating atmosphere
//! - Cd, A and m come from the state when it carries them, otherwise from the satellite

use std::sync::Arc;

use nalgebra::{DVector, Vector3};
use satkit::Instant;

use super::{accumulate, gcrf_to_working, read_vector3, Dynamics};
use crate::error::Result;
use crate::propagation::constants::OMEGA_EARTH;
use crate::propagation::environment::{AtmosphereModel, SatelliteSystem};
use crate::propagation::frame::Frame;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, CoordinateBroker, SharedSubset, CARTESIAN_POSITION,
    CARTESIAN_VELOCITY, DRAG_COEFFICIENT, MASS, SURFACE_AREA,
};

#[derive(Debug, Clone)]
pub struct AtmosphericDrag {
    atmosphere: Arc<dyn AtmosphereModel>,
    satellite: SatelliteSystem,
}

impl AtmosphericDrag {
    pub fn new(atmosphere: Arc<dyn AtmosphereModel>, satellite: SatelliteSystem) -> Self {
        Self {
            atmosphere,
            satellite,
        }
    }

    pub fn atmosphere(&self) -> &Arc<dyn AtmosphereModel> {
        &self.atmosphere
    }

    pub fn satellite(&self) -> &SatelliteSystem {
        &self.satellite
    }

    /// The atmosphere co-rotates with the Earth: v_rel = v - ω × r
    fn relative_velocity(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector3<f64> {
        let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
        velocity - omega.cross(position)
    }

    fn scalar_or(coordinates: &[f64], broker: &CoordinateBroker, name: &str, fallback: f64) -> Result<f64> {
        if broker.has_subset(name) {
            Ok(broker.extract(coordinates, name)?[0])
        } else {
            Ok(fallback)
        }
    }
}

impl Dynamics for AtmosphericDrag {
    fn name(&self) -> &str {
        "Atmospheric Drag"
    }

    fn read_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_position(), cartesian_velocity()]
    }

    fn write_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_velocity()]
    }

    fn contribution(
        &self,
        instant: &Instant,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        frame: Frame,
    ) -> Result<DVector<f64>> {
        let mut derivative = DVector::zeros(broker.total_size());

        let rotation = gcrf_to_working(frame, instant)?;
        let position = rotation.transpose() * read_vector3(coordinates, broker, CARTESIAN_POSITION)?;
        let velocity = rotation.transpose() * read_vector3(coordinates, broker, CARTESIAN_VELOCITY)?;

        let density = self.atmosphere.density(&position, instant)?;
        if density.rho <= 0.0 {
            return Ok(derivative);
        }

        let mass = Self::scalar_or(coordinates, broker, MASS, self.satellite.mass)?;
        let area = Self::scalar_or(coordinates, broker, SURFACE_AREA, self.satellite.surface_area)?;
        let drag_coefficient =
            Self::scalar_or(coordinates, broker, DRAG_COEFFICIENT, self.satellite.drag_coefficient)?;
        if mass <= 0.0 {
            return Ok(derivative);
        }

        let v_rel = Self::relative_velocity(&position, &velocity);
        let acceleration =
            -0.5 * density.rho * drag_coefficient * (area / mass) * v_rel.norm() * v_rel;

        accumulate(
            &mut derivative,
            broker,
            CARTESIAN_VELOCITY,
            (rotation * acceleration).as_slice(),
        )?;
        Ok(derivative)
    }
}
