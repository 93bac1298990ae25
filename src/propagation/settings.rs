//! Serializable propagation configuration
//!
//! Settings describe which dynamics to bind and how to integrate them; the
//! `build_*` helpers turn them into live objects.

use std::sync::Arc;

use nalgebra::{DVector, Vector3};
use satkit::Instant;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::propagation::dynamics::{
    AtmosphericDrag, CentralBodyGravity, PositionDerivative, SharedDynamics, ThirdBodyGravity,
    Thruster,
};
use crate::propagation::environment::{
    AtmosphereModelType, CelestialBody, ConstantThrust, Ephemeris, EphemerisType, EarthGravity,
    GravityModel, LocalOrbitalFrame, SatelliteSystem, SatkitEphemeris,
};
use crate::propagation::frame::Frame;
use crate::propagation::propagator::Propagator;
use crate::propagation::solver::NumericalSolver;
use crate::propagation::state::{
    cartesian_position, cartesian_velocity, mass, CoordinateBroker, State, MASS,
};

/// Constant thrust along a fixed direction of a local orbital frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrustSettings {
    pub local_frame: LocalOrbitalFrame,
    /// Unit direction in the local frame
    pub direction: [f64; 3],
}

impl ThrustSettings {
    /// Along-track thrust in the velocity-aligned frame
    pub fn prograde() -> Self {
        Self {
            local_frame: LocalOrbitalFrame::Vnc,
            direction: [1.0, 0.0, 0.0],
        }
    }
}

/// Swappable model selection for one propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationSettings {
    pub gravity: GravityModel,
    /// Drag is off when `None`
    pub atmosphere: Option<AtmosphereModelType>,
    pub third_bodies: Vec<CelestialBody>,
    pub ephemeris: EphemerisType,
    pub satellite: SatelliteSystem,
    /// Needs a satellite with propulsion
    pub thrust: Option<ThrustSettings>,
    pub solver: NumericalSolver,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self::point_mass()
    }
}

impl PropagationSettings {
    /// Two-body motion only
    pub fn point_mass() -> Self {
        Self {
            gravity: GravityModel::PointMass,
            atmosphere: None,
            third_bodies: Vec::new(),
            ephemeris: EphemerisType::LowPrecision,
            satellite: SatelliteSystem::default(),
            thrust: None,
            solver: NumericalSolver::default(),
        }
    }

    /// J2 and NRLMSISE-00 drag
    pub fn leo_basic() -> Self {
        Self {
            gravity: GravityModel::J2Only,
            atmosphere: Some(AtmosphereModelType::Nrlmsise00),
            ..Self::point_mass()
        }
    }

    /// 20×20 field, drag, Sun and Moon with a 7(8) stepper
    pub fn leo_high_fidelity() -> Self {
        Self {
            gravity: GravityModel::FullField {
                degree: 20,
                order: 20,
            },
            atmosphere: Some(AtmosphereModelType::Nrlmsise00),
            third_bodies: vec![CelestialBody::Sun, CelestialBody::Moon],
            solver: NumericalSolver::high_precision(),
            ..Self::point_mass()
        }
    }

    pub fn build_dynamics(&self) -> Result<Vec<SharedDynamics>> {
        let mut dynamics: Vec<SharedDynamics> = vec![
            Arc::new(PositionDerivative::new()),
            Arc::new(CentralBodyGravity::new(Arc::new(EarthGravity::from_model(
                self.gravity,
            )))),
        ];

        if let Some(atmosphere) = self.atmosphere {
            dynamics.push(Arc::new(AtmosphericDrag::new(
                atmosphere.create(),
                self.satellite.clone(),
            )));
        }

        if !self.third_bodies.is_empty() {
            let ephemeris: Arc<dyn Ephemeris> = Arc::new(SatkitEphemeris::new(self.ephemeris));
            for body in &self.third_bodies {
                dynamics.push(Arc::new(ThirdBodyGravity::new(*body, Arc::clone(&ephemeris))));
            }
        }

        if let Some(thrust) = self.thrust {
            let guidance = ConstantThrust::new(thrust.local_frame, Vector3::from(thrust.direction))?;
            dynamics.push(Arc::new(Thruster::new(self.satellite.clone(), Arc::new(guidance))?));
        }

        log::debug!(
            "Built {} dynamics ({:?} gravity, drag: {}, third bodies: {}, thrust: {})",
            dynamics.len(),
            self.gravity,
            self.atmosphere.map_or("off", |model| model.name()),
            self.third_bodies.len(),
            self.thrust.is_some()
        );

        Ok(dynamics)
    }

    pub fn build_solver(&self) -> NumericalSolver {
        self.solver.clone()
    }

    pub fn build_propagator(&self) -> Result<Propagator> {
        Ok(Propagator::new(self.build_solver(), self.build_dynamics()?))
    }

    /// Layout the built dynamics need: position and velocity, plus mass when thrusting
    pub fn build_broker(&self) -> Result<CoordinateBroker> {
        let mut broker = CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity()])?;
        if self.thrust.is_some() {
            broker.add_subset(mass())?;
        }
        Ok(broker)
    }

    /// Seed state in the layout of `build_broker`, mass taken from the satellite
    pub fn build_state(
        &self,
        instant: Instant,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        frame: Frame,
    ) -> Result<State> {
        let broker = self.build_broker()?;
        let mut values: Vec<f64> = position.iter().chain(velocity.iter()).copied().collect();
        if broker.has_subset(MASS) {
            values.push(self.satellite.mass);
        }
        State::new(instant, DVector::from_vec(values), frame, Arc::new(broker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::propagation::environment::PropulsionSystem;

    #[test]
    fn test_presets_build_expected_dynamics() {
        assert_eq!(PropagationSettings::point_mass().build_dynamics().unwrap().len(), 2);
        assert_eq!(PropagationSettings::leo_basic().build_dynamics().unwrap().len(), 3);
        assert_eq!(
            PropagationSettings::leo_high_fidelity().build_dynamics().unwrap().len(),
            5
        );
    }

    #[test]
    fn test_thrust_requires_propulsion() {
        let settings = PropagationSettings {
            thrust: Some(ThrustSettings::prograde()),
            ..PropagationSettings::point_mass()
        };
        assert!(matches!(settings.build_dynamics(), Err(Error::InvalidArgument(_))));

        let settings = PropagationSettings {
            satellite: SatelliteSystem::new(120.0, 1.0, 2.2)
                .with_propulsion(PropulsionSystem::new(1.0, 220.0), 100.0),
            ..settings
        };
        assert_eq!(settings.build_dynamics().unwrap().len(), 3);
        assert_eq!(settings.build_broker().unwrap().total_size(), 7);
    }

    #[test]
    fn test_json_with_missing_fields_uses_defaults() {
        let settings: PropagationSettings =
            serde_json::from_str(r#"{ "gravity": "J2Only", "third_bodies": ["Moon"] }"#).unwrap();

        assert_eq!(settings.gravity, GravityModel::J2Only);
        assert_eq!(settings.third_bodies, vec![CelestialBody::Moon]);
        assert_eq!(settings.solver, NumericalSolver::default());
        assert!(settings.atmosphere.is_none());
    }

    #[test]
    fn test_high_fidelity_survives_json() {
        let settings = PropagationSettings::leo_high_fidelity();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: PropagationSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
