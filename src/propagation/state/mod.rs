//! Spacecraft state representation
//!
//! A `State` is an immutable snapshot: an instant, a reference frame and a flat
//! coordinate vector whose layout is described by a shared `CoordinateBroker`.

pub mod coordinate_broker;
pub mod coordinate_subset;

use std::fmt;
use std::sync::Arc;

use nalgebra::{DVector, Vector3};
use satkit::Instant;

pub use coordinate_broker::CoordinateBroker;
pub use coordinate_subset::{
    angular_velocity, attitude_quaternion, cartesian_position, cartesian_velocity,
    drag_coefficient, mass, reserved_size, surface_area, AngularVelocity, AttitudeQuaternion,
    CartesianPosition, CartesianVelocity, CoordinateSubset, RealSubset, SharedSubset, ANGULAR_VELOCITY,
    ATTITUDE_QUATERNION, CARTESIAN_POSITION, CARTESIAN_VELOCITY, DRAG_COEFFICIENT, MASS,
    SURFACE_AREA,
};

use crate::error::{Error, Result};
use crate::propagation::frame::Frame;
use crate::propagation::time::format_instant;
use coordinate_subset::vector3;

/// Position vector tagged with its frame (m)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Coordinates in meters
    pub coordinates: Vector3<f64>,
    /// Frame the coordinates are expressed in
    pub frame: Frame,
}

impl Position {
    /// Position from coordinates in meters
    pub fn meters(coordinates: Vector3<f64>, frame: Frame) -> Self {
        Self { coordinates, frame }
    }
}

/// Velocity vector tagged with its frame (m/s)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    /// Coordinates in meters per second
    pub coordinates: Vector3<f64>,
    /// Frame the coordinates are expressed in
    pub frame: Frame,
}

impl Velocity {
    /// Velocity from coordinates in meters per second
    pub fn meters_per_second(coordinates: Vector3<f64>, frame: Frame) -> Self {
        Self { coordinates, frame }
    }
}

/// Snapshot of a spacecraft at one instant
#[derive(Debug, Clone)]
pub struct State {
    instant: Instant,
    frame: Frame,
    coordinates: DVector<f64>,
    broker: Arc<CoordinateBroker>,
}

impl State {
    /// Create a state, checking the vector length against the broker layout
    pub fn new(
        instant: Instant,
        coordinates: DVector<f64>,
        frame: Frame,
        broker: Arc<CoordinateBroker>,
    ) -> Result<Self> {
        if coordinates.len() != broker.total_size() {
            return Err(Error::IncompatibleLayout(format!(
                "{} coordinates for a layout of {} ({})",
                coordinates.len(),
                broker.total_size(),
                broker
            )));
        }

        Ok(Self {
            instant,
            frame,
            coordinates,
            broker,
        })
    }

    /// Position/velocity state; both vectors must share a frame
    pub fn from_position_velocity(
        instant: Instant,
        position: Position,
        velocity: Velocity,
    ) -> Result<Self> {
        if position.frame != velocity.frame {
            return Err(Error::FrameMismatch {
                expected: position.frame,
                found: velocity.frame,
            });
        }

        let broker = CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity()])?;
        let coordinates = DVector::from_iterator(
            6,
            position
                .coordinates
                .iter()
                .chain(velocity.coordinates.iter())
                .copied(),
        );

        Self::new(instant, coordinates, position.frame, Arc::new(broker))
    }

    /// Same layout and frame, new instant and coordinates
    pub fn with_coordinates(&self, instant: Instant, coordinates: DVector<f64>) -> Result<Self> {
        Self::new(instant, coordinates, self.frame, Arc::clone(&self.broker))
    }

    pub fn instant(&self) -> Instant {
        self.instant
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn coordinates(&self) -> &DVector<f64> {
        &self.coordinates
    }

    pub fn broker(&self) -> &Arc<CoordinateBroker> {
        &self.broker
    }

    /// Length of the coordinate vector
    pub fn size(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether the state carries the named subset
    pub fn has_subset(&self, name: &str) -> bool {
        self.broker.has_subset(name)
    }

    /// Values of one subset
    pub fn extract(&self, name: &str) -> Result<&[f64]> {
        self.broker.extract(self.coordinates.as_slice(), name)
    }

    /// Concatenated values of several subsets, in the requested order
    pub fn extract_many(&self, names: &[&str]) -> Result<DVector<f64>> {
        self.broker.extract_many(self.coordinates.as_slice(), names)
    }

    /// Cartesian position (m)
    pub fn position(&self) -> Result<Vector3<f64>> {
        self.extract(CARTESIAN_POSITION).map(vector3)
    }

    /// Cartesian velocity (m/s)
    pub fn velocity(&self) -> Result<Vector3<f64>> {
        self.extract(CARTESIAN_VELOCITY).map(vector3)
    }

    /// Same physical state expressed in another frame
    ///
    /// Each subset converts itself; the layout is preserved.
    pub fn in_frame(&self, frame: Frame) -> Result<State> {
        if frame == self.frame {
            return Ok(self.clone());
        }

        let transform = self.frame.transform_to(frame, &self.instant)?;
        let mut values = Vec::with_capacity(self.size());
        for subset in self.broker.subsets() {
            let converted = subset.in_frame(self.coordinates.as_slice(), &self.broker, &transform)?;
            values.extend(converted.iter().copied());
        }

        Self::new(
            self.instant,
            DVector::from_vec(values),
            frame,
            Arc::clone(&self.broker),
        )
    }

    /// Subset-wise sum, keeping this state's layout
    pub fn try_add(&self, other: &State) -> Result<State> {
        self.combine(other, |subset, lhs, rhs| subset.add(lhs, rhs))
    }

    /// Subset-wise difference, keeping this state's layout
    pub fn try_sub(&self, other: &State) -> Result<State> {
        self.combine(other, |subset, lhs, rhs| subset.subtract(lhs, rhs))
    }

    /// Whether `other` is at the same instant and frame with every component within `tolerance`
    pub fn is_near(&self, other: &State, tolerance: f64) -> bool {
        if self.instant != other.instant
            || self.frame != other.frame
            || !self.broker.has_same_subsets(&other.broker)
        {
            return false;
        }

        self.broker.subsets().iter().all(|subset| {
            match (self.extract(subset.name()), other.extract(subset.name())) {
                (Ok(lhs), Ok(rhs)) => lhs
                    .iter()
                    .zip(rhs)
                    .all(|(a, b)| (a - b).abs() <= tolerance),
                _ => false,
            }
        })
    }

    /// Distance from the frame origin (m)
    pub fn radius(&self) -> Result<f64> {
        Ok(self.position()?.norm())
    }

    /// Speed (m/s)
    pub fn speed(&self) -> Result<f64> {
        Ok(self.velocity()?.norm())
    }

    /// Specific orbital energy (vis-viva) in J/kg
    pub fn specific_energy(&self, gravitational_parameter: f64) -> Result<f64> {
        let r = self.radius()?;
        let v = self.speed()?;
        Ok(0.5 * v * v - gravitational_parameter / r)
    }

    /// Keplerian period in seconds, `None` for unbound trajectories
    pub fn period(&self, gravitational_parameter: f64) -> Result<Option<f64>> {
        let energy = self.specific_energy(gravitational_parameter)?;
        if energy >= 0.0 {
            return Ok(None);
        }

        let a = -gravitational_parameter / (2.0 * energy);
        Ok(Some(
            2.0 * std::f64::consts::PI * (a.powi(3) / gravitational_parameter).sqrt(),
        ))
    }

    fn combine(
        &self,
        other: &State,
        operation: impl Fn(&dyn CoordinateSubset, &[f64], &[f64]) -> DVector<f64>,
    ) -> Result<State> {
        if self.frame != other.frame {
            return Err(Error::FrameMismatch {
                expected: self.frame,
                found: other.frame,
            });
        }
        if self.instant != other.instant {
            return Err(Error::InstantMismatch(self.instant, other.instant));
        }
        if !self.broker.has_same_subsets(&other.broker) {
            return Err(Error::IncompatibleLayout(format!(
                "{} vs {}",
                self.broker, other.broker
            )));
        }

        let mut values = Vec::with_capacity(self.size());
        for subset in self.broker.subsets() {
            let lhs = self.extract(subset.name())?;
            let rhs = other.extract(subset.name())?;
            values.extend(operation(subset.as_ref(), lhs, rhs).iter().copied());
        }

        self.with_coordinates(self.instant, DVector::from_vec(values))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
            && self.frame == other.frame
            && self.broker.is_equivalent(&other.broker)
            && self.coordinates == other.coordinates
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State @ {} [{}]", format_instant(&self.instant), self.frame)?;
        for subset in self.broker.subsets() {
            let values = self
                .extract(subset.name())
                .map_err(|_| fmt::Error)?
                .iter()
                .map(|value| format!("{:.6}", value))
                .collect::<Vec<_>>();
            writeln!(f, "  {:<20} [{}]", subset.name(), values.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::constants::{EARTH_RADIUS_M, MU_EARTH};

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn leo_state(frame: Frame) -> State {
        State::from_position_velocity(
            epoch(),
            Position::meters(Vector3::new(7_000_000.0, 0.0, 0.0), frame),
            Velocity::meters_per_second(Vector3::new(0.0, 5335.865450622126, 5335.865450622126), frame),
        )
        .unwrap()
    }

    #[test]
    fn test_position_velocity_state() {
        let state = leo_state(Frame::Gcrf);

        assert_eq!(state.size(), 6);
        assert_eq!(state.position().unwrap(), Vector3::new(7_000_000.0, 0.0, 0.0));
        assert_eq!(state.extract(CARTESIAN_VELOCITY).unwrap()[2], 5335.865450622126);
        assert!(matches!(state.extract(MASS), Err(Error::UnknownSubset(_))));
    }

    #[test]
    fn test_frame_mismatch_on_construction() {
        let result = State::from_position_velocity(
            epoch(),
            Position::meters(Vector3::new(7_000_000.0, 0.0, 0.0), Frame::Gcrf),
            Velocity::meters_per_second(Vector3::new(0.0, 7500.0, 0.0), Frame::Itrf),
        );

        assert_eq!(
            result.unwrap_err(),
            Error::FrameMismatch {
                expected: Frame::Gcrf,
                found: Frame::Itrf
            }
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let broker = Arc::new(CoordinateBroker::from_subsets([cartesian_position()]).unwrap());
        let result = State::new(epoch(), DVector::zeros(4), Frame::Gcrf, broker);
        assert!(matches!(result, Err(Error::IncompatibleLayout(_))));
    }

    /// Needs satkit's data files for ITRF
    #[test]
    fn test_in_frame_round_trip() {
        if !satkit::utils::data_found() {
            eprintln!("skipping: satkit data files not installed");
            return;
        }
        let state = leo_state(Frame::Gcrf);
        let itrf = state.in_frame(Frame::Itrf).unwrap();
        let back = itrf.in_frame(Frame::Gcrf).unwrap();

        assert_eq!(itrf.frame(), Frame::Itrf);
        assert!((itrf.radius().unwrap() - state.radius().unwrap()).abs() < 1e-6);
        assert!(back.is_near(&state, 1e-6));
    }

    #[test]
    fn test_add_and_subtract() {
        let state = leo_state(Frame::Gcrf);
        let doubled = state.try_add(&state).unwrap();
        let zero = state.try_sub(&state).unwrap();

        assert_eq!(doubled.position().unwrap().x, 14_000_000.0);
        assert!(zero.coordinates().iter().all(|value| *value == 0.0));
    }

    #[test]
    fn test_subtract_rejects_mismatches() {
        let gcrf = leo_state(Frame::Gcrf);
        let teme = leo_state(Frame::Teme);
        assert!(matches!(gcrf.try_sub(&teme), Err(Error::FrameMismatch { .. })));

        let later = gcrf
            .with_coordinates(epoch() + satkit::Duration::from_seconds(1.0), gcrf.coordinates().clone())
            .unwrap();
        assert!(matches!(gcrf.try_sub(&later), Err(Error::InstantMismatch(_, _))));

        let broker = Arc::new(
            CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity(), mass()])
                .unwrap(),
        );
        let mut values = gcrf.coordinates().as_slice().to_vec();
        values.push(100.0);
        let with_mass = State::new(epoch(), DVector::from_vec(values), Frame::Gcrf, broker).unwrap();
        assert!(matches!(gcrf.try_sub(&with_mass), Err(Error::IncompatibleLayout(_))));
    }

    /// Needs satkit's data files for ITRF
    #[test]
    fn test_mass_survives_frame_change() {
        if !satkit::utils::data_found() {
            eprintln!("skipping: satkit data files not installed");
            return;
        }
        let broker = Arc::new(
            CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity(), mass()])
                .unwrap(),
        );
        let coordinates =
            DVector::from_vec(vec![7.0e6, 0.0, 0.0, 0.0, 7500.0, 0.0, 250.0]);
        let state = State::new(epoch(), coordinates, Frame::Gcrf, broker).unwrap();

        let itrf = state.in_frame(Frame::Itrf).unwrap();
        assert_eq!(itrf.extract(MASS).unwrap(), &[250.0]);
    }

    #[test]
    fn test_orbital_helpers() {
        let r = EARTH_RADIUS_M + 420_000.0;
        let v = (MU_EARTH / r).sqrt();
        let state = State::from_position_velocity(
            epoch(),
            Position::meters(Vector3::new(r, 0.0, 0.0), Frame::Gcrf),
            Velocity::meters_per_second(Vector3::new(0.0, v, 0.0), Frame::Gcrf),
        )
        .unwrap();

        let period = state.period(MU_EARTH).unwrap().unwrap();
        assert!((period / 60.0 - 92.0).abs() < 2.0);
    }
}
