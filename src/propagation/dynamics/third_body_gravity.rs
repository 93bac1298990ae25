//! Third-body gravitational perturbations (Sun, Moon)

use std::sync::Arc;

use nalgebra::{DVector, Vector3};
use satkit::Instant;

use super::{accumulate, gcrf_to_working, read_vector3, Dynamics};
use crate::error::Result;
use crate::propagation::environment::{CelestialBody, Ephemeris};
use crate::propagation::frame::Frame;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, CoordinateBroker, SharedSubset, CARTESIAN_POSITION,
    CARTESIAN_VELOCITY,
};

/// Differential attraction of one perturbing body
///
/// Subtracting the body's pull on the Earth keeps the acceleration relative
/// to the geocentric frame.
#[derive(Debug, Clone)]
pub struct ThirdBodyGravity {
    body: CelestialBody,
    ephemeris: Arc<dyn Ephemeris>,
    name: String,
}

impl ThirdBodyGravity {
    pub fn new(body: CelestialBody, ephemeris: Arc<dyn Ephemeris>) -> Self {
        Self {
            body,
            name: format!("Third Body Gravity [{}]", body.name()),
            ephemeris,
        }
    }

    pub fn body(&self) -> CelestialBody {
        self.body
    }

    /// a = μ_body × (r_sat_body/|r_sat_body|³ - r_earth_body/|r_earth_body|³)
    fn third_body_accel(
        sat_pos: &Vector3<f64>,
        body_pos: &Vector3<f64>,
        mu_body: f64,
    ) -> Vector3<f64> {
        let r_sat_body = body_pos - sat_pos;
        let r_sat_body_mag = r_sat_body.norm();
        let r_earth_body_mag = body_pos.norm();

        if r_sat_body_mag < 1.0 || r_earth_body_mag < 1.0 {
            return Vector3::zeros();
        }

        mu_body * (r_sat_body / r_sat_body_mag.powi(3) - body_pos / r_earth_body_mag.powi(3))
    }
}

impl Dynamics for ThirdBodyGravity {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_position()]
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
        let rotation = gcrf_to_working(frame, instant)?;
        let position = rotation.transpose() * read_vector3(coordinates, broker, CARTESIAN_POSITION)?;
        let body_position = self.ephemeris.position(self.body, instant)?;

        let acceleration = rotation
            * Self::third_body_accel(&position, &body_position, self.body.gravitational_parameter());

        let mut derivative = DVector::zeros(broker.total_size());
        accumulate(&mut derivative, broker, CARTESIAN_VELOCITY, acceleration.as_slice())?;
        Ok(derivative)
    }
}
