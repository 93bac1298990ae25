//! spaceprop - numerical satellite trajectory propagation
//!
//! Computes satellite trajectories under configurable force models and derives
//! orbital bookkeeping (revolution numbers, passes) from them.
//!
//! # Architecture
//!
//! - **State**: an immutable snapshot whose flat coordinate vector is laid out by a
//!   shared `CoordinateBroker` of named coordinate subsets
//! - **Dynamics**: force models contributing time derivatives to that vector
//! - **NumericalSolver**: fixed-step and embedded adaptive Runge-Kutta steppers
//! - **Propagator**: binds a solver to a dynamics list
//! - **Propagated**: a chronologically sorted trajectory cache over a propagator
//! - **Orbit**: revolution numbers and passes over any trajectory model
//!
//! # Example
//!
//! ```ignore
//! use spaceprop::propagation::*;
//!
//! let state = State::from_position_velocity(
//!     epoch,
//!     Position::meters(Vector3::new(7_000_000.0, 0.0, 0.0), Frame::Gcrf),
//!     Velocity::meters_per_second(Vector3::new(0.0, 5335.9, 5335.9), Frame::Gcrf),
//! )?;
//!
//! let propagator = PropagationSettings::point_mass().build_propagator()?;
//! let mut trajectory = Propagated::new(propagator, state);
//! let later = trajectory.calculate_state_at(&(epoch + Duration::from_seconds(3600.0)))?;
//!
//! let mut orbit = Orbit::new(trajectory);
//! let revolution = orbit.revolution_number_at(&later.instant())?;
//! ```

pub mod error;
pub mod propagation;

pub use error::{Error, Result};
