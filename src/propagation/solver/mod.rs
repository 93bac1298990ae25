//! Numerical integration of coordinate vectors
//!
//! # Available Steppers
//!
//! - **RungeKutta4**: classic fixed step, deterministic step count
//! - **RungeKuttaCashKarp54**: embedded 5(4) pair with adaptive stepping
//! - **RungeKuttaDopri5**: Dormand-Prince 5(4) with adaptive stepping (default)
//! - **RungeKuttaFehlberg78**: 13-stage 7(8) pair for high-precision work
//!
//! The independent variable is seconds relative to an arbitrary reference.
//! Backward integration is forward integration with a negated step.

pub mod root;
pub mod tableau;

use std::fmt;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use tableau::ButcherTableau;

/// Smallest step magnitude an adaptive stepper may shrink to (seconds)
const MIN_STEP: f64 = 1e-9;

/// Stepper family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepperType {
    RungeKutta4,
    RungeKuttaCashKarp54,
    #[default]
    RungeKuttaDopri5,
    RungeKuttaFehlberg78,
}

impl StepperType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RungeKutta4 => "Runge-Kutta 4 (fixed)",
            Self::RungeKuttaCashKarp54 => "Runge-Kutta Cash-Karp 5(4)",
            Self::RungeKuttaDopri5 => "Runge-Kutta Dormand-Prince 5(4)",
            Self::RungeKuttaFehlberg78 => "Runge-Kutta-Fehlberg 7(8)",
        }
    }

    pub fn is_adaptive(&self) -> bool {
        !matches!(self, Self::RungeKutta4)
    }

    fn tableau(&self) -> &'static ButcherTableau {
        match self {
            Self::RungeKutta4 => &tableau::RK4,
            Self::RungeKuttaCashKarp54 => &tableau::CASH_KARP_54,
            Self::RungeKuttaDopri5 => &tableau::DOPRI_5,
            Self::RungeKuttaFehlberg78 => &tableau::FEHLBERG_78,
        }
    }
}

/// Step logging verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogType {
    #[default]
    NoLog,
    /// Log each requested output time
    LogConstant,
    /// Log every accepted step
    LogAdaptive,
}

/// Step-size controller
///
/// h_new = safety * h * error^(-1/(q+1)), q being the embedded order
#[derive(Debug, Clone)]
struct StepController {
    safety: f64,
    max_factor: f64,
    min_factor: f64,
    exponent: f64,
}

impl StepController {
    fn for_order(error_order: u8) -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / (f64::from(error_order) + 1.0),
        }
    }

    fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Numerical solver configuration
///
/// Error is measured per component as |err| / (atol + rtol × |y|) and a step
/// is accepted when the largest ratio is at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalSolver {
    pub stepper_type: StepperType,
    pub log_type: LogType,
    /// Fixed step, or initial step for adaptive steppers (seconds)
    pub time_step: f64,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    /// Step budget per integration call
    pub max_steps: usize,
}

impl Default for NumericalSolver {
    fn default() -> Self {
        Self {
            stepper_type: StepperType::RungeKuttaDopri5,
            log_type: LogType::NoLog,
            time_step: 60.0,
            relative_tolerance: 1e-12,
            absolute_tolerance: 1e-12,
            max_steps: 1_000_000,
        }
    }
}

impl NumericalSolver {
    pub fn new(
        log_type: LogType,
        stepper_type: StepperType,
        time_step: f64,
        relative_tolerance: f64,
        absolute_tolerance: f64,
    ) -> Self {
        Self {
            stepper_type,
            log_type,
            time_step,
            relative_tolerance,
            absolute_tolerance,
            ..Self::default()
        }
    }

    /// Quick propagation settings (lower accuracy, faster)
    pub fn fast() -> Self {
        Self {
            stepper_type: StepperType::RungeKuttaCashKarp54,
            time_step: 120.0,
            relative_tolerance: 1e-8,
            absolute_tolerance: 1e-8,
            max_steps: 100_000,
            ..Self::default()
        }
    }

    /// High-precision settings
    pub fn high_precision() -> Self {
        Self {
            stepper_type: StepperType::RungeKuttaFehlberg78,
            time_step: 30.0,
            relative_tolerance: 1e-13,
            absolute_tolerance: 1e-13,
            max_steps: 10_000_000,
            ..Self::default()
        }
    }

    /// Fixed-step RK4
    pub fn fixed_step(time_step: f64) -> Self {
        Self {
            stepper_type: StepperType::RungeKutta4,
            time_step,
            ..Self::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    /// Integrate `state` from `t0` to `t1`
    ///
    /// `system` returns dy/dt at (t, y); its errors abort the integration.
    pub fn integrate_time<F>(&self, state: &DVector<f64>, t0: f64, t1: f64, system: F) -> Result<DVector<f64>>
    where
        F: FnMut(f64, &DVector<f64>) -> Result<DVector<f64>>,
    {
        let mut outputs = self.integrate_times(state, t0, &[t1], system)?;
        outputs
            .pop()
            .ok_or_else(|| Error::NonConvergent("integration produced no output".to_string()))
    }

    /// Integrate through a monotone sequence of output times in one pass
    ///
    /// Every time must lie on the same side of `t0` and the sequence must move
    /// away from `t0` (non-decreasing forward, non-increasing backward).
    pub fn integrate_times<F>(
        &self,
        state: &DVector<f64>,
        t0: f64,
        times: &[f64],
        mut system: F,
    ) -> Result<Vec<DVector<f64>>>
    where
        F: FnMut(f64, &DVector<f64>) -> Result<DVector<f64>>,
    {
        self.validate(state, t0, times)?;

        let mut outputs = Vec::with_capacity(times.len());
        let mut y = state.clone();
        let mut t = t0;
        let mut h = self.time_step.abs();
        let mut steps = 0usize;

        for &target in times {
            if target != t {
                if self.stepper_type.is_adaptive() {
                    let (y_next, h_next) = self.adaptive_leg(&y, t, target, h, &mut steps, &mut system)?;
                    y = y_next;
                    h = h_next;
                } else {
                    y = self.fixed_leg(&y, t, target, &mut steps, &mut system)?;
                }
                t = target;
            }

            if self.log_type == LogType::LogConstant {
                log::info!("{}: t = {:.3} s, |y| = {:.6e}", self.stepper_type.name(), t, y.norm());
            }
            outputs.push(y.clone());
        }

        log::trace!(
            "{} finished {} output(s) in {} step(s)",
            self.stepper_type.name(),
            outputs.len(),
            steps
        );

        Ok(outputs)
    }

    fn validate(&self, state: &DVector<f64>, t0: f64, times: &[f64]) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "time step must be positive and finite, got {}",
                self.time_step
            )));
        }
        if self.stepper_type.is_adaptive()
            && !(self.absolute_tolerance > 0.0 && self.relative_tolerance >= 0.0)
        {
            return Err(Error::InvalidArgument(format!(
                "tolerances out of range: rtol {} / atol {}",
                self.relative_tolerance, self.absolute_tolerance
            )));
        }
        if !t0.is_finite() || times.iter().any(|t| !t.is_finite()) {
            return Err(Error::InvalidArgument("integration times must be finite".to_string()));
        }
        if let Some(index) = state.iter().position(|value| !value.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "initial state component {} is not finite",
                index
            )));
        }

        let direction = times
            .iter()
            .find(|t| **t != t0)
            .map_or(1.0, |t| (t - t0).signum());

        let mut previous = t0;
        for (index, &time) in times.iter().enumerate() {
            if (time - previous) * direction < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "output time {} at index {} reverses the integration direction",
                    time, index
                )));
            }
            previous = time;
        }

        Ok(())
    }

    fn fixed_leg<F>(
        &self,
        y0: &DVector<f64>,
        t0: f64,
        t1: f64,
        steps: &mut usize,
        system: &mut F,
    ) -> Result<DVector<f64>>
    where
        F: FnMut(f64, &DVector<f64>) -> Result<DVector<f64>>,
    {
        let tableau = self.stepper_type.tableau();
        let span = t1 - t0;
        let direction = span.signum();
        let h = self.time_step * direction;

        // Equal steps measured from t0, last one truncated onto t1
        let full_steps = (span.abs() / self.time_step).floor() as usize;
        let needs_partial = t0 + h * full_steps as f64 != t1;

        let mut y = y0.clone();
        let mut t = t0;
        for index in 0..full_steps + usize::from(needs_partial) {
            let t_next = if index < full_steps {
                t0 + h * (index + 1) as f64
            } else {
                t1
            };

            *steps += 1;
            if *steps > self.max_steps {
                return Err(Error::NonConvergent(format!(
                    "step budget of {} exhausted at t = {:.3} s",
                    self.max_steps, t
                )));
            }

            let (y_next, _) = Self::step(tableau, t, &y, t_next - t, system)?;
            Self::ensure_finite(&y_next, t_next)?;

            if self.log_type == LogType::LogAdaptive {
                log::info!("{}: t = {:.3} s, h = {:.3} s", self.stepper_type.name(), t_next, t_next - t);
            }

            y = y_next;
            t = t_next;
        }

        Ok(y)
    }

    fn adaptive_leg<F>(
        &self,
        y0: &DVector<f64>,
        t0: f64,
        t1: f64,
        h0: f64,
        steps: &mut usize,
        system: &mut F,
    ) -> Result<(DVector<f64>, f64)>
    where
        F: FnMut(f64, &DVector<f64>) -> Result<DVector<f64>>,
    {
        let tableau = self.stepper_type.tableau();
        let controller = StepController::for_order(tableau.error_order);
        let direction = (t1 - t0).signum();

        let mut y = y0.clone();
        let mut t = t0;
        let mut h = h0.abs().max(MIN_STEP);

        while t != t1 {
            // Don't overshoot the endpoint
            let remaining = (t1 - t).abs();
            let is_last = h >= remaining;
            let h_step = if is_last { remaining } else { h };

            let (y_next, error_vector) = Self::step(tableau, t, &y, h_step * direction, system)?;
            let error = self.scaled_error(&y_next, error_vector.as_ref());
            let accepted = error <= 1.0;

            if accepted {
                t = if is_last { t1 } else { t + h_step * direction };
                Self::ensure_finite(&y_next, t)?;
                y = y_next;

                if self.log_type == LogType::LogAdaptive {
                    log::info!(
                        "{}: t = {:.3} s, h = {:.3} s, error = {:.3e}",
                        self.stepper_type.name(),
                        t,
                        h_step,
                        error
                    );
                }
            }

            let factor = controller.compute_factor(error);
            // A truncated final step says nothing about the next leg's step
            h = if accepted && is_last {
                h.max(h_step * factor)
            } else {
                (h_step * factor).max(MIN_STEP)
            };

            *steps += 1;
            if *steps > self.max_steps {
                return Err(Error::NonConvergent(format!(
                    "step budget of {} exhausted at t = {:.3} s",
                    self.max_steps, t
                )));
            }
            if !accepted && h_step <= MIN_STEP {
                return Err(Error::NonConvergent(format!(
                    "step size underflow at t = {:.3} s (error {:.3e})",
                    t, error
                )));
            }
        }

        Ok((y, h))
    }

    /// One explicit Runge-Kutta step; returns the new state and the embedded error estimate
    fn step<F>(
        tableau: &ButcherTableau,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        system: &mut F,
    ) -> Result<(DVector<f64>, Option<DVector<f64>>)>
    where
        F: FnMut(f64, &DVector<f64>) -> Result<DVector<f64>>,
    {
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(tableau.stages());

        for (i, row) in tableau.a.iter().enumerate() {
            let mut y_stage = y.clone();
            for (j, a_ij) in row.iter().enumerate() {
                if *a_ij != 0.0 {
                    y_stage.axpy(h * a_ij, &k[j], 1.0);
                }
            }

            let derivative = system(t + tableau.c[i] * h, &y_stage)?;
            if derivative.len() != y.len() {
                return Err(Error::IncompatibleLayout(format!(
                    "derivative of length {} for a state of length {}",
                    derivative.len(),
                    y.len()
                )));
            }
            k.push(derivative);
        }

        let mut y_next = y.clone();
        for (b_i, k_i) in tableau.b.iter().zip(&k) {
            if *b_i != 0.0 {
                y_next.axpy(h * b_i, k_i, 1.0);
            }
        }

        let error = tableau.b_hat.map(|b_hat| {
            let mut error = DVector::zeros(y.len());
            for ((b_i, b_hat_i), k_i) in tableau.b.iter().zip(b_hat).zip(&k) {
                let weight = b_i - b_hat_i;
                if weight != 0.0 {
                    error.axpy(h * weight, k_i, 1.0);
                }
            }
            error
        });

        Ok((y_next, error))
    }

    /// Infinity norm of the tolerance-scaled error
    fn scaled_error(&self, y_next: &DVector<f64>, error: Option<&DVector<f64>>) -> f64 {
        let Some(error) = error else {
            return 0.0;
        };

        error
            .iter()
            .zip(y_next.iter())
            .map(|(e, y)| {
                let scale = self.absolute_tolerance + self.relative_tolerance * y.abs();
                e.abs() / scale
            })
            .fold(0.0, |max: f64, value| if value.is_nan() { f64::INFINITY } else { max.max(value) })
    }

    fn ensure_finite(y: &DVector<f64>, t: f64) -> Result<()> {
        if y.iter().all(|value| value.is_finite()) {
            Ok(())
        } else {
            Err(Error::NonConvergent(format!("non-finite state at t = {:.3} s", t)))
        }
    }
}

impl fmt::Display for NumericalSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [h = {} s", self.stepper_type.name(), self.time_step)?;
        if self.stepper_type.is_adaptive() {
            write!(
                f,
                ", rtol = {:e}, atol = {:e}",
                self.relative_tolerance, self.absolute_tolerance
            )?;
        }
        write!(f, ", max steps = {}]", self.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// y'' = -y as a first-order system
    fn oscillator(_t: f64, y: &DVector<f64>) -> Result<DVector<f64>> {
        Ok(DVector::from_vec(vec![y[1], -y[0]]))
    }

    fn initial() -> DVector<f64> {
        DVector::from_vec(vec![1.0, 0.0])
    }

    #[test]
    fn test_adaptive_steppers_hit_period() {
        for stepper_type in [
            StepperType::RungeKuttaCashKarp54,
            StepperType::RungeKuttaDopri5,
            StepperType::RungeKuttaFehlberg78,
        ] {
            let solver = NumericalSolver::new(LogType::NoLog, stepper_type, 0.1, 1e-12, 1e-12);
            let y = solver.integrate_time(&initial(), 0.0, 2.0 * PI, oscillator).unwrap();

            assert!((y[0] - 1.0).abs() < 1e-9, "{:?}: {}", stepper_type, y[0]);
            assert!(y[1].abs() < 1e-9, "{:?}: {}", stepper_type, y[1]);
        }
    }

    #[test]
    fn test_backward_integration_mirrors_forward() {
        let solver = NumericalSolver::default();
        let forward = solver.integrate_time(&initial(), 0.0, 1.5, oscillator).unwrap();
        let back = solver.integrate_time(&forward, 1.5, 0.0, oscillator).unwrap();

        assert!((back - initial()).norm() < 1e-9);

        let backward = solver.integrate_time(&initial(), 0.0, -1.5, oscillator).unwrap();
        assert!((backward[0] - 1.5_f64.cos()).abs() < 1e-9);
        assert!((backward[1] - 1.5_f64.sin()).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_step_count_and_truncation() {
        let solver = NumericalSolver::fixed_step(0.3);
        let mut evaluations = Vec::new();

        solver
            .integrate_time(&initial(), 0.0, 1.0, |t, y| {
                evaluations.push(t);
                oscillator(t, y)
            })
            .unwrap();

        // Three full steps and one truncated step, four stages each
        assert_eq!(evaluations.len(), 16);
        assert!((evaluations[12] - 0.9).abs() < 1e-12);
        assert!((evaluations[15] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_integrate_times_matches_individual_calls() {
        let solver = NumericalSolver::default();
        let times = [0.5, 1.0, 2.5];

        let batch = solver.integrate_times(&initial(), 0.0, &times, oscillator).unwrap();
        for (time, y) in times.iter().zip(&batch) {
            assert!((y[0] - time.cos()).abs() < 1e-9);
            assert!((y[1] + time.sin()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_integrate_times_rejects_direction_change() {
        let solver = NumericalSolver::default();
        let result = solver.integrate_times(&initial(), 0.0, &[1.0, 0.5], oscillator);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = solver.integrate_times(&initial(), 0.0, &[1.0, -1.0], oscillator);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_step_budget_exhaustion() {
        let solver = NumericalSolver::default().with_max_steps(3);
        let result = solver.integrate_time(&initial(), 0.0, 1000.0, oscillator);
        assert!(matches!(result, Err(Error::NonConvergent(_))));
    }

    #[test]
    fn test_non_finite_state_detected() {
        let solver = NumericalSolver::fixed_step(1.0);
        let result = solver.integrate_time(&initial(), 0.0, 10.0, |_, y| {
            Ok(DVector::from_vec(vec![f64::INFINITY, y[0]]))
        });
        assert!(matches!(result, Err(Error::NonConvergent(_))));
    }

    #[test]
    fn test_zero_span_returns_input() {
        let solver = NumericalSolver::default();
        let y = solver
            .integrate_time(&initial(), 3.0, 3.0, |_, _| {
                Err(Error::Environment("must not be called".to_string()))
            })
            .unwrap();
        assert_eq!(y, initial());
    }
}
