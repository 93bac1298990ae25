//! Kinematic identity: the derivative of position is velocity

use nalgebra::DVector;
use satkit::Instant;

use super::{accumulate, Dynamics};
use crate::error::Result;
use crate::propagation::frame::Frame;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, CoordinateBroker, SharedSubset, CARTESIAN_POSITION,
    CARTESIAN_VELOCITY,
};

#[derive(Debug, Clone, Default)]
pub struct PositionDerivative;

impl PositionDerivative {
    pub fn new() -> Self {
        Self
    }
}

impl Dynamics for PositionDerivative {
    fn name(&self) -> &str {
        "Position Derivative"
    }

    fn read_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_velocity()]
    }

    fn write_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_position()]
    }

    fn contribution(
        &self,
        _instant: &Instant,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        _frame: Frame,
    ) -> Result<DVector<f64>> {
        let mut derivative = DVector::zeros(broker.total_size());
        let velocity = broker.extract(coordinates, CARTESIAN_VELOCITY)?;
        accumulate(&mut derivative, broker, CARTESIAN_POSITION, velocity)?;
        Ok(derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_position_rate_is_velocity() {
        let broker = position_velocity_mass();
        let coordinates = [7.0e6, 1.0, 2.0, 10.0, 20.0, 30.0, 500.0];

        let derivative = PositionDerivative::new()
            .contribution(&epoch(), &coordinates, &broker, Frame::Gcrf)
            .unwrap();

        assert_eq!(derivative.as_slice(), &[10.0, 20.0, 30.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
