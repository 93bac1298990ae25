//! Dynamics: contributions to the time derivative of a state vector
//!
//! # Architecture
//!
//! Each dynamics declares the subsets it reads and the subsets it writes, and
//! returns a derivative vector laid out by the caller's broker. Subsets it does
//! not write are zero. The total derivative is the elementwise sum over all
//! dynamics bound to a propagator.
//!
//! # Available Dynamics
//!
//! - **PositionDerivative**: kinematic identity ṙ = v
//! - **CentralBodyGravity**: point mass or spherical harmonics field
//! - **ThirdBodyGravity**: differential Sun/Moon attraction
//! - **AtmosphericDrag**: drag against the co-rotating atmosphere
//! - **Thruster**: guided thrust with propellant consumption

mod atmospheric_drag;
mod central_body_gravity;
mod position_derivative;
mod third_body_gravity;
mod thruster;

pub use atmospheric_drag::AtmosphericDrag;
pub use central_body_gravity::CentralBodyGravity;
pub use position_derivative::PositionDerivative;
pub use third_body_gravity::ThirdBodyGravity;
pub use thruster::Thruster;

use std::fmt;
use std::sync::Arc;

use nalgebra::{DVector, Matrix3, Vector3};
use satkit::Instant;

use crate::error::{Error, Result};
use crate::propagation::frame::Frame;
use crate::propagation::state::coordinate_subset::vector3;
use crate::propagation::state::{CoordinateBroker, SharedSubset};

/// Shared handle to a dynamics instance
pub type SharedDynamics = Arc<dyn Dynamics>;

/// Contribution to the time derivative of a state vector
///
/// Implementations must be thread-safe and are never mutated once bound to a
/// propagator.
pub trait Dynamics: fmt::Debug + Send + Sync {
    /// Name for logging and display
    fn name(&self) -> &str;

    /// Subsets whose values this dynamics needs
    fn read_subsets(&self) -> Vec<SharedSubset>;

    /// Subsets whose derivatives this dynamics contributes to
    fn write_subsets(&self) -> Vec<SharedSubset>;

    /// Derivative contribution, same length and layout as `broker`
    fn contribution(
        &self,
        instant: &Instant,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        frame: Frame,
    ) -> Result<DVector<f64>>;
}

/// Sum of all contributions at one point
pub fn total_derivative(
    dynamics: &[SharedDynamics],
    instant: &Instant,
    coordinates: &[f64],
    broker: &CoordinateBroker,
    frame: Frame,
) -> Result<DVector<f64>> {
    let mut derivative = DVector::zeros(broker.total_size());
    for item in dynamics {
        derivative += item.contribution(instant, coordinates, broker, frame)?;
    }
    Ok(derivative)
}

/// Check that `broker` carries everything each dynamics reads or writes
pub fn validate_subsets(dynamics: &[SharedDynamics], broker: &CoordinateBroker) -> Result<()> {
    for item in dynamics {
        for subset in item.read_subsets().iter().chain(item.write_subsets().iter()) {
            if !broker.has_subset(subset.name()) {
                log::debug!(
                    "Dynamics [{}] needs [{}], missing from {}",
                    item.name(),
                    subset.name(),
                    broker
                );
                return Err(Error::UnknownSubset(subset.name().to_string()));
            }
        }
    }
    Ok(())
}

/// Add `values` into the block of `derivative` that holds the named subset
pub(crate) fn accumulate(
    derivative: &mut DVector<f64>,
    broker: &CoordinateBroker,
    name: &str,
    values: &[f64],
) -> Result<()> {
    let offset = broker.offset_of(name)?;
    for (index, value) in values.iter().enumerate() {
        derivative[offset + index] += value;
    }
    Ok(())
}

/// Read a three-component subset
pub(crate) fn read_vector3(
    coordinates: &[f64],
    broker: &CoordinateBroker,
    name: &str,
) -> Result<Vector3<f64>> {
    broker.extract(coordinates, name).map(vector3)
}

/// Rotation from GCRF into the working frame
///
/// Force models are evaluated in GCRF; rotating frames would need fictitious
/// accelerations and are rejected.
pub(crate) fn gcrf_to_working(frame: Frame, instant: &Instant) -> Result<Matrix3<f64>> {
    if frame == Frame::Gcrf {
        return Ok(Matrix3::identity());
    }
    if !frame.is_quasi_inertial() {
        return Err(Error::FrameMismatch {
            expected: Frame::Gcrf,
            found: frame,
        });
    }
    Ok(Frame::Gcrf.transform_to(frame, instant)?.rotation)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::propagation::state::{cartesian_position, cartesian_velocity, mass};

    pub fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    pub fn position_velocity() -> CoordinateBroker {
        CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity()]).unwrap()
    }

    pub fn position_velocity_mass() -> CoordinateBroker {
        CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity(), mass()])
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::propagation::environment::EarthGravity;
    use crate::propagation::state::{mass, CoordinateBroker};

    #[test]
    fn test_total_derivative_sums_contributions() {
        let broker = position_velocity();
        let dynamics: Vec<SharedDynamics> = vec![
            Arc::new(PositionDerivative::new()),
            Arc::new(CentralBodyGravity::new(Arc::new(EarthGravity::point_mass()))),
        ];
        let coordinates = [7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0];

        let derivative =
            total_derivative(&dynamics, &epoch(), &coordinates, &broker, Frame::Gcrf).unwrap();

        assert_eq!(derivative.len(), 6);
        assert_eq!(derivative[1], 7500.0);
        assert!(derivative[3] < -8.0);
    }

    #[test]
    fn test_validate_subsets_reports_missing() {
        let broker = CoordinateBroker::from_subsets([mass()]).unwrap();
        let dynamics: Vec<SharedDynamics> = vec![Arc::new(PositionDerivative::new())];

        assert!(matches!(
            validate_subsets(&dynamics, &broker),
            Err(Error::UnknownSubset(_))
        ));
    }

    #[test]
    fn test_rotating_working_frame_rejected() {
        assert!(matches!(
            gcrf_to_working(Frame::Itrf, &epoch()),
            Err(Error::FrameMismatch { .. })
        ));
        assert_eq!(gcrf_to_working(Frame::Gcrf, &epoch()).unwrap(), Matrix3::identity());
    }
}
