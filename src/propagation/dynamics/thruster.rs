//! Guided thrust with propellant consumption

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::DVector;
use satkit::Instant;

use super::{accumulate, gcrf_to_working, read_vector3, Dynamics};
use crate::error::{Error, Result};
use crate::propagation::environment::{GuidanceLaw, PropulsionSystem, SatelliteSystem};
use crate::propagation::frame::Frame;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, mass, CoordinateBroker, SharedSubset,
    CARTESIAN_POSITION, CARTESIAN_VELOCITY, MASS,
};
use crate::propagation::time::format_instant;

/// Thrust along a guidance-selected direction
///
/// Acceleration is thrust / mass; mass decreases at thrust / (Isp × g0).
/// Once the mass reaches the dry mass, both contributions are zero.
#[derive(Debug)]
pub struct Thruster {
    satellite: SatelliteSystem,
    propulsion: PropulsionSystem,
    guidance: Arc<dyn GuidanceLaw>,
    name: String,
    exhaustion_reported: AtomicBool,
}

impl Thruster {
    /// Thruster for a satellite that carries a propulsion system
    pub fn new(satellite: SatelliteSystem, guidance: Arc<dyn GuidanceLaw>) -> Result<Self> {
        let propulsion = satellite.propulsion.ok_or_else(|| {
            Error::InvalidArgument("satellite system has no propulsion".to_string())
        })?;
        if propulsion.thrust < 0.0 || propulsion.specific_impulse <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "thrust {} N / Isp {} s out of range",
                propulsion.thrust, propulsion.specific_impulse
            )));
        }

        Ok(Self {
            name: format!("Thruster [{}]", guidance.name()),
            satellite,
            propulsion,
            guidance,
            exhaustion_reported: AtomicBool::new(false),
        })
    }

    pub fn satellite(&self) -> &SatelliteSystem {
        &self.satellite
    }

    pub fn guidance(&self) -> &Arc<dyn GuidanceLaw> {
        &self.guidance
    }
}

impl Dynamics for Thruster {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_position(), cartesian_velocity(), mass()]
    }

    fn write_subsets(&self) -> Vec<SharedSubset> {
        vec![cartesian_velocity(), mass()]
    }

    fn contribution(
        &self,
        instant: &Instant,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        frame: Frame,
    ) -> Result<DVector<f64>> {
        let mut derivative = DVector::zeros(broker.total_size());

        let current_mass = broker.extract(coordinates, MASS)?[0];
        if current_mass <= self.satellite.dry_mass {
            if !self.exhaustion_reported.swap(true, Ordering::Relaxed) {
                log::warn!(
                    "{}: propellant exhausted at {} (mass {:.3} kg, dry mass {:.3} kg)",
                    self.name,
                    format_instant(instant),
                    current_mass,
                    self.satellite.dry_mass
                );
            }
            return Ok(derivative);
        }

        let rotation = gcrf_to_working(frame, instant)?;
        let position = rotation.transpose() * read_vector3(coordinates, broker, CARTESIAN_POSITION)?;
        let velocity = rotation.transpose() * read_vector3(coordinates, broker, CARTESIAN_VELOCITY)?;

        let commanded = self.guidance.thrust_direction(instant, &position, &velocity)?;
        if !commanded.iter().all(|value| value.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "{}: non-finite thrust direction",
                self.name
            )));
        }

        // Throttle saturates at full thrust
        let throttle = commanded.norm().min(1.0);
        let direction = if throttle < 1.0 {
            commanded
        } else {
            commanded.normalize()
        };
        let acceleration = rotation * direction * (self.propulsion.thrust / current_mass);

        accumulate(&mut derivative, broker, CARTESIAN_VELOCITY, acceleration.as_slice())?;
        accumulate(
            &mut derivative,
            broker,
            MASS,
            &[-self.propulsion.mass_flow_rate() * throttle],
        )?;
        Ok(derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::propagation::environment::ConstantThrust;

    fn satellite() -> SatelliteSystem {
        SatelliteSystem::new(110.0, 1.0, 2.2)
            .with_propulsion(PropulsionSystem::new(10.0, 300.0), 100.0)
    }

    #[test]
    fn test_prograde_thrust_and_mass_flow() {
        let thruster = Thruster::new(satellite(), Arc::new(ConstantThrust::prograde())).unwrap();
        let coordinates = [7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0, 110.0];

        let derivative = thruster
            .contribution(&epoch(), &coordinates, &position_velocity_mass(), Frame::Gcrf)
            .unwrap();

        assert!((derivative[4] - 10.0 / 110.0).abs() < 1e-12);
        assert!(derivative[3].abs() < 1e-12);
        assert!((derivative[6] + 10.0 / (300.0 * 9.80665)).abs() < 1e-15);
    }

    #[derive(Debug)]
    struct Overdriven;

    impl GuidanceLaw for Overdriven {
        fn thrust_direction(
            &self,
            _instant: &Instant,
            _position: &nalgebra::Vector3<f64>,
            _velocity: &nalgebra::Vector3<f64>,
        ) -> Result<nalgebra::Vector3<f64>> {
            Ok(nalgebra::Vector3::new(0.0, 3.0, 0.0))
        }

        fn name(&self) -> &'static str {
            "Overdriven"
        }
    }

    #[test]
    fn test_command_above_full_throttle_saturates() {
        let thruster = Thruster::new(satellite(), Arc::new(Overdriven)).unwrap();
        let coordinates = [7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0, 110.0];

        let derivative = thruster
            .contribution(&epoch(), &coordinates, &position_velocity_mass(), Frame::Gcrf)
            .unwrap();

        assert!((derivative[4] - 10.0 / 110.0).abs() < 1e-12);
        assert!((derivative[6] + 10.0 / (300.0 * 9.80665)).abs() < 1e-15);
    }

    #[test]
    fn test_no_thrust_without_propellant() {
        let thruster = Thruster::new(satellite(), Arc::new(ConstantThrust::prograde())).unwrap();
        let coordinates = [7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0, 100.0];

        let derivative = thruster
            .contribution(&epoch(), &coordinates, &position_velocity_mass(), Frame::Gcrf)
            .unwrap();

        assert!(derivative.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn test_requires_propulsion() {
        let result = Thruster::new(
            SatelliteSystem::default(),
            Arc::new(ConstantThrust::prograde()),
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_requires_mass_subset() {
        let thruster = Thruster::new(satellite(), Arc::new(ConstantThrust::prograde())).unwrap();
        let result = thruster.contribution(
            &epoch(),
            &[7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0],
            &position_velocity(),
            Frame::Gcrf,
        );
        assert!(matches!(result, Err(Error::UnknownSubset(_))));
    }
}
