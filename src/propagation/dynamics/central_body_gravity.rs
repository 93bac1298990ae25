//! Gravitational acceleration of the orbited body

use std::sync::Arc;

use nalgebra::DVector;
use satkit::Instant;

use super::{accumulate, gcrf_to_working, read_vector3, Dynamics};
use crate::error::Result;
use crate::propagation::environment::GravityField;
use crate::propagation::frame::Frame;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, CoordinateBroker, SharedSubset, CARTESIAN_POSITION,
    CARTESIAN_VELOCITY,
};

/// Central body gravity evaluated by a shared field model
#[derive(Debug, Clone)]
pub struct CentralBodyGravity {
    field: Arc<dyn GravityField>,
}

impl CentralBodyGravity {
    pub fn new(field: Arc<dyn GravityField>) -> Self {
        Self { field }
    }

    pub fn field(&self) -> &Arc<dyn GravityField> {
        &self.field
    }
}

impl Dynamics for CentralBodyGravity {
    fn name(&self) -> &str {
        self.field.name()
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

        let acceleration = rotation * self.field.acceleration(&position, instant)?;

        let mut derivative = DVector::zeros(broker.total_size());
        accumulate(&mut derivative, broker, CARTESIAN_VELOCITY, acceleration.as_slice())?;
        Ok(derivative)
    }
}
