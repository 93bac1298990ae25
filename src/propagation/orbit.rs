//! Revolution numbering and passes over a trajectory model
//!
//! # Conventions
//!
//! - A revolution runs from one ascending-node crossing (GCRF z going from
//!   negative to non-negative) up to, but excluding, the next one.
//! - The revolution containing the model epoch has the initial revolution
//!   number (1 unless configured). Its start is the last crossing at or before
//!   the epoch.
//! - Numbers grow by one per forward crossing and shrink by one per backward
//!   crossing, skipping 0: ... -2, -1, 1, 2 ...
//! - A crossing instant belongs to the revolution it begins.
//!
//! Crossings are bracketed by coarse steps of a twelfth of the osculating
//! period and refined with Brent's method. Every resolved crossing is kept, so
//! walking back and forth never searches the same span twice.

use std::collections::HashMap;
use std::fmt;

use satkit::Instant;

use crate::error::{Error, Result};
use crate::propagation::constants::MU_EARTH;
use crate::propagation::frame::Frame;
use crate::propagation::solver::root::BrentSolver;
use crate::propagation::time::{format_instant, offset_by, seconds_between};
use crate::propagation::trajectory::{is_before, TrajectoryModel};

/// Coarse step used when the epoch state is not on a bound orbit (s)
const FALLBACK_PERIOD: f64 = 5400.0;

/// Coarse samples per orbital period
const STEPS_PER_PERIOD: f64 = 12.0;

/// Whether both revolution boundaries were resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPhase {
    Complete,
    Partial,
}

/// One revolution of a trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub revolution_number: i64,
    /// Ascending node opening the revolution
    pub start: Option<Instant>,
    /// Ascending node opening the next revolution
    pub end: Option<Instant>,
    pub descending_node: Option<Instant>,
    pub phase: PassPhase,
}

impl Pass {
    pub fn is_complete(&self) -> bool {
        self.phase == PassPhase::Complete
    }

    /// Pass length in seconds, when both ends are known
    pub fn duration(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(seconds_between(&start, &end)),
            _ => None,
        }
    }

    /// Whether `instant` lies in `[start, end)`, treating unknown ends as open
    pub fn contains(&self, instant: &Instant) -> bool {
        let after_start = self.start.map_or(true, |start| !is_before(instant, &start));
        let before_end = self.end.map_or(true, |end| is_before(instant, &end));
        after_start && before_end
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |instant: Option<Instant>| {
            instant.map_or_else(|| "unresolved".to_string(), |i| format_instant(&i))
        };

        write!(
            f,
            "Pass #{} [{:?}]: {} -> {}",
            self.revolution_number,
            self.phase,
            describe(self.start),
            describe(self.end)
        )?;
        if let Some(node) = self.descending_node {
            write!(f, " (descending node {})", format_instant(&node))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Ascending,
    Descending,
}

/// Resolved node crossing
///
/// `instant` is the first sample on the non-negative side of the crossing
/// condition, `before` the last sample on the negative side.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    instant: Instant,
    before: Instant,
}

/// Revolution bookkeeping over a trajectory model
pub struct Orbit<M: TrajectoryModel> {
    model: M,
    epoch: Instant,
    initial_revolution_number: i64,
    gravitational_parameter: f64,
    /// Horizon of a single crossing search, in periods
    search_horizon: f64,
    root_solver: BrentSolver,

    coarse_step: Option<f64>,
    origin: Option<Option<Crossing>>,
    forward: Vec<Crossing>,
    backward: Vec<Crossing>,
    forward_exhausted: bool,
    backward_exhausted: bool,
    passes: HashMap<i64, Pass>,
}

impl<M: TrajectoryModel> Orbit<M> {
    pub fn new(model: M) -> Self {
        let epoch = model.epoch();
        Self {
            model,
            epoch,
            initial_revolution_number: 1,
            gravitational_parameter: MU_EARTH,
            search_horizon: 2.0,
            root_solver: BrentSolver::new(1e-3, 100),
            coarse_step: None,
            origin: None,
            forward: Vec::new(),
            backward: Vec::new(),
            forward_exhausted: false,
            backward_exhausted: false,
            passes: HashMap::new(),
        }
    }

    /// Number of the revolution containing the epoch; must not be 0
    pub fn with_initial_revolution_number(mut self, number: i64) -> Result<Self> {
        if number == 0 {
            return Err(Error::InvalidArgument(
                "revolution number 0 is never used".to_string(),
            ));
        }
        self.initial_revolution_number = number;
        self.passes.clear();
        Ok(self)
    }

    /// Central body μ used for the coarse step (m³/s²)
    pub fn with_gravitational_parameter(mut self, gravitational_parameter: f64) -> Self {
        self.gravitational_parameter = gravitational_parameter;
        self.reset();
        self
    }

    /// Width of the time bracket at which crossing refinement stops (s)
    pub fn with_time_tolerance(mut self, tolerance: f64) -> Self {
        self.root_solver.tol = tolerance;
        self.reset();
        self
    }

    /// How many periods a single crossing search may span
    pub fn with_search_horizon(mut self, periods: f64) -> Self {
        self.search_horizon = periods;
        self.reset();
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    pub fn initial_revolution_number(&self) -> i64 {
        self.initial_revolution_number
    }

    /// Signed revolution number at `instant`
    pub fn revolution_number_at(&mut self, instant: &Instant) -> Result<i64> {
        let offset = self.offset_at(instant)?;
        Ok(self.number_for_offset(offset))
    }

    /// The pass containing `instant`
    pub fn pass_at(&mut self, instant: &Instant) -> Result<Pass> {
        let offset = self.offset_at(instant)?;
        self.pass_for_offset(offset)
    }

    /// The pass carrying revolution number `number`
    pub fn pass_with_revolution_number(&mut self, number: i64) -> Result<Pass> {
        if number == 0 {
            return Err(Error::InvalidArgument(
                "revolution number 0 is never used".to_string(),
            ));
        }

        let offset = ordinal(number) - ordinal(self.initial_revolution_number);
        if offset != 0 && self.crossing(offset)?.is_none() {
            return Err(Error::UnreachableRevolution(number));
        }
        self.pass_for_offset(offset)
    }

    fn reset(&mut self) {
        self.coarse_step = None;
        self.origin = None;
        self.forward.clear();
        self.backward.clear();
        self.forward_exhausted = false;
        self.backward_exhausted = false;
        self.passes.clear();
    }

    fn number_for_offset(&self, offset: i64) -> i64 {
        let shifted = ordinal(self.initial_revolution_number) + offset;
        if shifted > 0 {
            shifted
        } else {
            shifted - 1
        }
    }

    /// Revolution offset from the epoch revolution
    fn offset_at(&mut self, instant: &Instant) -> Result<i64> {
        let mut offset = 0;

        if !is_before(instant, &self.epoch) {
            while let Some(next) = self.crossing(offset + 1)? {
                if is_before(instant, &next.instant) {
                    break;
                }
                offset += 1;
            }
        } else {
            while let Some(start) = self.crossing(offset)? {
                if !is_before(instant, &start.instant) {
                    break;
                }
                offset -= 1;
            }
        }

        Ok(offset)
    }

    fn pass_for_offset(&mut self, offset: i64) -> Result<Pass> {
        if let Some(pass) = self.passes.get(&offset) {
            return Ok(pass.clone());
        }

        let start = self.crossing(offset)?.map(|crossing| crossing.instant);
        let end = self.crossing(offset + 1)?.map(|crossing| crossing.instant);

        let descending_node = match (start, end) {
            (Some(start), Some(end)) => {
                let span = seconds_between(&start, &end);
                self.search(start, 1.0, Node::Descending, span)?
                    .map(|crossing| crossing.instant)
                    .filter(|node| is_before(node, &end))
            }
            _ => None,
        };

        let phase = if start.is_some() && end.is_some() {
            PassPhase::Complete
        } else {
            PassPhase::Partial
        };

        let pass = Pass {
            revolution_number: self.number_for_offset(offset),
            start,
            end,
            descending_node,
            phase,
        };
        log::debug!("Resolved {}", pass);

        self.passes.insert(offset, pass.clone());
        Ok(pass)
    }

    /// Ascending node opening the revolution at `offset`
    fn crossing(&mut self, offset: i64) -> Result<Option<Crossing>> {
        if offset == 0 {
            return self.origin();
        }

        let index = (offset.unsigned_abs() - 1) as usize;
        if offset > 0 {
            while self.forward.len() <= index {
                if self.forward_exhausted {
                    return Ok(None);
                }
                let from = match self.forward.last() {
                    Some(previous) => previous.instant,
                    None => self.origin()?.map_or(self.epoch, |origin| origin.instant),
                };
                let horizon = self.horizon()?;
                match self.search(from, 1.0, Node::Ascending, horizon)? {
                    Some(crossing) => self.forward.push(crossing),
                    None => self.forward_exhausted = true,
                }
            }
            Ok(Some(self.forward[index]))
        } else {
            while self.backward.len() <= index {
                if self.backward_exhausted {
                    return Ok(None);
                }
                let previous = match self.backward.last() {
                    Some(previous) => *previous,
                    None => match self.origin()? {
                        Some(origin) => origin,
                        None => {
                            self.backward_exhausted = true;
                            return Ok(None);
                        }
                    },
                };
                let from = self.strictly_before(&previous);
                let horizon = self.horizon()?;
                match self.search(from, -1.0, Node::Ascending, horizon)? {
                    Some(crossing) => self.backward.push(crossing),
                    None => self.backward_exhausted = true,
                }
            }
            Ok(Some(self.backward[index]))
        }
    }

    /// Last ascending node at or before the epoch
    fn origin(&mut self) -> Result<Option<Crossing>> {
        if let Some(origin) = self.origin {
            return Ok(origin);
        }

        let horizon = self.horizon()?;
        let origin = self.search(self.epoch, -1.0, Node::Ascending, horizon)?;
        match &origin {
            Some(crossing) => log::debug!(
                "Epoch revolution starts at {}",
                format_instant(&crossing.instant)
            ),
            None => log::debug!(
                "No ascending node within the search horizon before {}",
                format_instant(&self.epoch)
            ),
        }

        self.origin = Some(origin);
        Ok(origin)
    }

    /// A sample on the negative side of `crossing`, so a backward search
    /// cannot find the same node again
    fn strictly_before(&self, crossing: &Crossing) -> Instant {
        if is_before(&crossing.before, &crossing.instant) {
            crossing.before
        } else {
            offset_by(&crossing.instant, -self.root_solver.tol)
        }
    }

    fn coarse_step(&mut self) -> Result<f64> {
        if let Some(step) = self.coarse_step {
            return Ok(step);
        }

        let state = self.model.calculate_state_at(&self.epoch)?.in_frame(Frame::Gcrf)?;
        let period = state
            .period(self.gravitational_parameter)?
            .unwrap_or(FALLBACK_PERIOD);
        let step = period / STEPS_PER_PERIOD;

        self.coarse_step = Some(step);
        Ok(step)
    }

    fn horizon(&mut self) -> Result<f64> {
        Ok(self.coarse_step()? * STEPS_PER_PERIOD * self.search_horizon)
    }

    /// Node condition: negative before the node, non-negative from it on
    fn node_value(&mut self, instant: &Instant, node: Node) -> Result<f64> {
        let z = self
            .model
            .calculate_state_at(instant)?
            .in_frame(Frame::Gcrf)?
            .position()?
            .z;
        Ok(match node {
            Node::Ascending => z,
            Node::Descending => -z,
        })
    }

    fn within_interval(&self, instant: &Instant) -> bool {
        match self.model.interval() {
            Some((start, end)) => !is_before(instant, &start) && !is_before(&end, instant),
            None => true,
        }
    }

    /// Find the first node crossing from `from` in `direction` within `span` seconds
    fn search(&mut self, from: Instant, direction: f64, node: Node, span: f64) -> Result<Option<Crossing>> {
        if !self.within_interval(&from) {
            return Ok(None);
        }

        let step = self.coarse_step()?;
        let mut t_prev: f64 = 0.0;
        let mut g_prev = self.node_value(&from, node)?;

        while t_prev.abs() < span {
            let t_next = direction * (t_prev.abs() + step).min(span);
            let sample = offset_by(&from, t_next);
            if !self.within_interval(&sample) {
                return Ok(None);
            }
            let g_next = self.node_value(&sample, node)?;

            let (early, g_early, late, g_late) = if direction > 0.0 {
                (t_prev, g_prev, t_next, g_next)
            } else {
                (t_next, g_next, t_prev, g_prev)
            };

            if g_early < 0.0 && g_late >= 0.0 {
                let root_solver = self.root_solver.clone();
                let bracket = root_solver.find_root(
                    |t| self.node_value(&offset_by(&from, t), node),
                    early,
                    late,
                    Some(g_early),
                    Some(g_late),
                )?;

                let non_negative = bracket.non_negative_side();
                let negative = if non_negative == bracket.b { bracket.a } else { bracket.b };
                let crossing = Crossing {
                    instant: offset_by(&from, non_negative),
                    before: offset_by(&from, negative),
                };
                log::trace!(
                    "{:?} node at {}",
                    node,
                    format_instant(&crossing.instant)
                );
                return Ok(Some(crossing));
            }

            t_prev = t_next;
            g_prev = g_next;
        }

        Ok(None)
    }
}

impl<M: TrajectoryModel + fmt::Debug> fmt::Debug for Orbit<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orbit")
            .field("model", &self.model)
            .field("epoch", &self.epoch)
            .field("initial_revolution_number", &self.initial_revolution_number)
            .field("resolved_crossings", &(self.forward.len() + self.backward.len()))
            .finish()
    }
}

impl<M: TrajectoryModel> fmt::Display for Orbit<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Orbit @ {} (revolution {}, {} crossing(s) resolved)",
            format_instant(&self.epoch),
            self.initial_revolution_number,
            self.forward.len() + self.backward.len() + usize::from(matches!(self.origin, Some(Some(_))))
        )
    }
}

/// Position of a revolution number on the 0-free number line
fn ordinal(number: i64) -> i64 {
    if number > 0 {
        number
    } else {
        number + 1
    }
}
