//! Orbital propagation module
//!
//! ## Building blocks
//!
//! - `state`: coordinate subsets, brokers and immutable states
//! - `dynamics`: force models contributing to the state derivative
//! - `solver`: Runge-Kutta steppers and Brent root finding
//! - `environment`: gravity, atmosphere, ephemeris and guidance collaborators
//!
//! ## Propagation
//!
//! `Propagator` integrates a seed state to any set of instants. `Propagated`
//! wraps one in a sorted state cache, and `Orbit` numbers revolutions and
//! resolves passes over any `TrajectoryModel`.
//!
//! # Example
//!
//! ```ignore
//! use spaceprop::propagation::*;
//!
//! let settings = PropagationSettings::leo_basic();
//! let propagator = settings.build_propagator()?;
//! let seed = settings.build_state(epoch, position, velocity, Frame::Gcrf)?;
//! let states = propagator.calculate_states_at(&seed, &instants)?;
//! ```

pub mod constants;
pub mod dynamics;
pub mod environment;
pub mod frame;
pub mod orbit;
pub mod propagator;
pub mod settings;
pub mod solver;
pub mod state;
pub mod time;
pub mod trajectory;

pub use dynamics::{Dynamics, SharedDynamics};
pub use frame::{Frame, Transform};
pub use orbit::{Orbit, Pass, PassPhase};
pub use propagator::Propagator;
pub use settings::{PropagationSettings, ThrustSettings};
pub use solver::{LogType, NumericalSolver, StepperType};
pub use state::{CoordinateBroker, CoordinateSubset, Position, State, Velocity};
pub use trajectory::{Propagated, TrajectoryModel};

pub use nalgebra::Vector3;
pub use satkit::{Duration, Instant};
