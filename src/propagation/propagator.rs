//! Numerical propagation of states under a list of dynamics
//!
//! Seeds are converted to GCRF, integrated with the bound solver and converted
//! back, so results come out in the seed's frame with the seed's layout.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;
use satkit::Instant;

use crate::error::{Error, Result};
use crate::propagation::dynamics::{total_derivative, validate_subsets, SharedDynamics};
use crate::propagation::frame::Frame;
use crate::propagation::solver::NumericalSolver;
use crate::propagation::state::State;
use crate::propagation::time::{compare, format_instant, offset_by, seconds_between};

/// Solver plus the dynamics it integrates
///
/// The dynamics list is owned per propagator; the dynamics themselves are
/// shared and immutable.
#[derive(Debug, Clone)]
pub struct Propagator {
    solver: NumericalSolver,
    dynamics: Vec<SharedDynamics>,
}

impl Propagator {
    pub fn new(solver: NumericalSolver, dynamics: Vec<SharedDynamics>) -> Self {
        Self { solver, dynamics }
    }

    pub fn solver(&self) -> &NumericalSolver {
        &self.solver
    }

    pub fn dynamics(&self) -> &[SharedDynamics] {
        &self.dynamics
    }

    pub fn set_dynamics(&mut self, dynamics: Vec<SharedDynamics>) {
        self.dynamics = dynamics;
    }

    pub fn add_dynamics(&mut self, dynamics: SharedDynamics) {
        self.dynamics.push(dynamics);
    }

    pub fn clear_dynamics(&mut self) {
        self.dynamics.clear();
    }

    /// State at `instant`, integrated from `seed`
    pub fn calculate_state_at(&self, seed: &State, instant: &Instant) -> Result<State> {
        self.calculate_states_at(seed, std::slice::from_ref(instant))?
            .pop()
            .ok_or(Error::UndefinedOperand("propagation output"))
    }

    /// States at strictly increasing `instants`, integrated from `seed`
    ///
    /// Instants before the seed are reached by one backward leg and the rest
    /// by one forward leg. Results follow the input order.
    pub fn calculate_states_at(&self, seed: &State, instants: &[Instant]) -> Result<Vec<State>> {
        if let Some(index) = instants
            .windows(2)
            .position(|pair| compare(&pair[0], &pair[1]) != Ordering::Less)
        {
            return Err(Error::UnsortedInput(index + 1));
        }
        if instants.is_empty() {
            return Ok(Vec::new());
        }
        if self.dynamics.is_empty() {
            return Err(Error::UndefinedOperand("propagator has no dynamics"));
        }
        validate_subsets(&self.dynamics, seed.broker())?;

        let epoch = seed.instant();
        let split = instants.partition_point(|instant| compare(instant, &epoch) == Ordering::Less);
        let (before, after) = instants.split_at(split);

        log::debug!(
            "Propagating from {} to {} instant(s) ({} backward, {} forward)",
            format_instant(&epoch),
            instants.len(),
            before.len(),
            after.len()
        );

        let inertial = seed.in_frame(Frame::Gcrf)?;
        let broker = Arc::clone(inertial.broker());
        let dynamics = &self.dynamics;
        let system = |t: f64, y: &DVector<f64>| {
            total_derivative(
                dynamics,
                &offset_by(&epoch, t),
                y.as_slice(),
                &broker,
                Frame::Gcrf,
            )
        };

        let mut coordinates = Vec::with_capacity(instants.len());

        if !before.is_empty() {
            // Backward leg walks away from the seed, so latest first
            let times: Vec<f64> = before
                .iter()
                .rev()
                .map(|instant| seconds_between(&epoch, instant))
                .collect();
            let mut leg = self
                .solver
                .integrate_times(inertial.coordinates(), 0.0, &times, system)?;
            leg.reverse();
            coordinates.extend(leg);
        }

        if !after.is_empty() {
            let times: Vec<f64> = after
                .iter()
                .map(|instant| seconds_between(&epoch, instant))
                .collect();
            coordinates.extend(
                self.solver
                    .integrate_times(inertial.coordinates(), 0.0, &times, system)?,
            );
        }

        instants
            .iter()
            .zip(coordinates)
            .map(|(instant, values)| {
                inertial
                    .with_coordinates(*instant, values)?
                    .in_frame(seed.frame())
            })
            .collect()
    }
}

impl PartialEq for Propagator {
    fn eq(&self, other: &Self) -> bool {
        self.solver == other.solver
            && self.dynamics.len() == other.dynamics.len()
            && self
                .dynamics
                .iter()
                .zip(&other.dynamics)
                .all(|(lhs, rhs)| same_dynamics(lhs, rhs))
    }
}

/// Identity comparison on the data pointer only
fn same_dynamics(lhs: &SharedDynamics, rhs: &SharedDynamics) -> bool {
    Arc::as_ptr(lhs) as *const () == Arc::as_ptr(rhs) as *const ()
}

impl fmt::Display for Propagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Propagator")?;
        writeln!(f, "  solver:   {}", self.solver)?;
        let names: Vec<&str> = self.dynamics.iter().map(|item| item.name()).collect();
        write!(f, "  dynamics: [{}]", names.join(", "))
    }
}
