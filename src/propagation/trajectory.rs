//! Trajectory models and the propagated state cache
//!
//! `Propagated` keeps every state it has ever computed in a sorted,
//! duplicate-free vector. Lookups binary-search it; misses propagate from the
//! closest cached state and insert the result. Nothing is ever evicted.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use satkit::Instant;

use crate::error::{Error, Result};
use crate::propagation::propagator::Propagator;
use crate::propagation::state::State;
use crate::propagation::time::{compare, format_instant, seconds_between};

/// Anything that can produce states over time
///
/// Queries take `&mut self` so implementations are free to memoize.
pub trait TrajectoryModel {
    /// Reference instant of the model
    fn epoch(&self) -> Instant;

    /// Span over which the model is defined, `None` when unbounded
    fn interval(&self) -> Option<(Instant, Instant)> {
        None
    }

    fn calculate_state_at(&mut self, instant: &Instant) -> Result<State>;

    /// States at `instants`, in input order
    fn calculate_states_at(&mut self, instants: &[Instant]) -> Result<Vec<State>> {
        instants
            .iter()
            .map(|instant| self.calculate_state_at(instant))
            .collect()
    }
}

/// Numerically propagated trajectory with an unbounded state cache
#[derive(Debug, Clone)]
pub struct Propagated {
    propagator: Propagator,
    epoch: Instant,
    states: Vec<State>,
}

impl Propagated {
    /// Cache seeded with a single state
    pub fn new(propagator: Propagator, state: State) -> Self {
        Self {
            propagator,
            epoch: state.instant(),
            states: vec![state],
        }
    }

    /// Cache seeded with several states, in any order
    ///
    /// All states must share one frame and one layout, so every query answers
    /// in that frame. Exact duplicates collapse; two different states at one
    /// instant fail with `ContradictoryState`. The earliest state sets the epoch.
    pub fn from_states(propagator: Propagator, states: Vec<State>) -> Result<Self> {
        let states = Self::normalize(states)?;
        Ok(Self {
            propagator,
            epoch: states[0].instant(),
            states,
        })
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Cached states in chronological order
    pub fn cached_states(&self) -> &[State] {
        &self.states
    }

    /// Replace the cache, with the same validation as `from_states`
    pub fn set_cached_states(&mut self, states: Vec<State>) -> Result<()> {
        let states = Self::normalize(states)?;
        self.epoch = states[0].instant();
        self.states = states;
        Ok(())
    }

    fn normalize(mut states: Vec<State>) -> Result<Vec<State>> {
        if states.is_empty() {
            return Err(Error::UndefinedOperand("trajectory cache needs at least one state"));
        }

        let (frame, broker) = (states[0].frame(), Arc::clone(states[0].broker()));
        for state in &states[1..] {
            if state.frame() != frame {
                return Err(Error::FrameMismatch {
                    expected: frame,
                    found: state.frame(),
                });
            }
            if !state.broker().is_equivalent(&broker) {
                return Err(Error::IncompatibleLayout(format!(
                    "cached states use {} and {}",
                    broker,
                    state.broker()
                )));
            }
        }

        states.sort_by(|lhs, rhs| compare(&lhs.instant(), &rhs.instant()));

        let mut normalized: Vec<State> = Vec::with_capacity(states.len());
        for state in states {
            match normalized.last() {
                Some(last) if last.instant() == state.instant() => {
                    if *last != state {
                        return Err(Error::ContradictoryState(state.instant()));
                    }
                }
                _ => normalized.push(state),
            }
        }

        Ok(normalized)
    }

    fn search(&self, instant: &Instant) -> std::result::Result<usize, usize> {
        self.states
            .binary_search_by(|state| compare(&state.instant(), instant))
    }

    /// Index of the cached state closest in time to a miss at `insertion`
    fn nearest(&self, insertion: usize, instant: &Instant) -> usize {
        if insertion == 0 {
            return 0;
        }
        if insertion == self.states.len() {
            return insertion - 1;
        }

        let before = seconds_between(&self.states[insertion - 1].instant(), instant).abs();
        let after = seconds_between(instant, &self.states[insertion].instant()).abs();
        if after < before {
            insertion
        } else {
            insertion - 1
        }
    }
}

impl TrajectoryModel for Propagated {
    fn epoch(&self) -> Instant {
        self.epoch
    }

    fn calculate_state_at(&mut self, instant: &Instant) -> Result<State> {
        let insertion = match self.search(instant) {
            Ok(index) => {
                log::trace!("Cache hit at {}", format_instant(instant));
                return Ok(self.states[index].clone());
            }
            Err(insertion) => insertion,
        };

        let seed = &self.states[self.nearest(insertion, instant)];
        log::trace!(
            "Cache miss at {}, propagating from {}",
            format_instant(instant),
            format_instant(&seed.instant())
        );

        let state = self.propagator.calculate_state_at(seed, instant)?;
        self.states.insert(insertion, state.clone());
        Ok(state)
    }

    /// Misses are grouped by the cache gap they fall into and each group is
    /// integrated in a single leg from the state opening the gap (the first
    /// cached state for instants before the cache). Results follow the input
    /// order; repeated instants are computed once.
    fn calculate_states_at(&mut self, instants: &[Instant]) -> Result<Vec<State>> {
        let mut requested: Vec<Instant> = instants.to_vec();
        requested.sort_by(compare);
        requested.dedup();

        let mut gaps: Vec<(usize, Vec<Instant>)> = Vec::new();
        for instant in requested {
            if let Err(insertion) = self.search(&instant) {
                match gaps.last_mut() {
                    Some((gap, group)) if *gap == insertion => group.push(instant),
                    _ => gaps.push((insertion, vec![instant])),
                }
            }
        }

        // Later gaps first, so earlier insertion points stay valid
        for (insertion, group) in gaps.into_iter().rev() {
            let seed = &self.states[insertion.saturating_sub(1)];
            log::trace!(
                "Filling {} cache miss(es) from {}",
                group.len(),
                format_instant(&seed.instant())
            );
            let computed = self.propagator.calculate_states_at(seed, &group)?;
            self.states.splice(insertion..insertion, computed);
        }

        instants
            .iter()
            .map(|instant| match self.search(instant) {
                Ok(index) => Ok(self.states[index].clone()),
                Err(_) => Err(Error::UndefinedOperand("cached state")),
            })
            .collect()
    }
}

impl PartialEq for Propagated {
    fn eq(&self, other: &Self) -> bool {
        self.propagator == other.propagator && self.states == other.states
    }
}

impl fmt::Display for Propagated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Propagated trajectory")?;
        writeln!(f, "  epoch:  {}", format_instant(&self.epoch))?;
        match (self.states.first(), self.states.last()) {
            (Some(first), Some(last)) if self.states.len() > 1 => writeln!(
                f,
                "  cache:  {} states from {} to {}",
                self.states.len(),
                format_instant(&first.instant()),
                format_instant(&last.instant())
            )?,
            _ => writeln!(f, "  cache:  {} state", self.states.len())?,
        }
        write!(f, "{}", self.propagator)
    }
}

/// Chronological ordering helper shared with the orbit logic
pub(crate) fn is_before(lhs: &Instant, rhs: &Instant) -> bool {
    compare(lhs, rhs) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::dynamics::{CentralBodyGravity, PositionDerivative};
    use crate::propagation::environment::EarthGravity;
    use crate::propagation::frame::Frame;
    use crate::propagation::solver::NumericalSolver;
    use crate::propagation::state::{Position, Velocity};
    use crate::propagation::time::offset_by;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn propagator() -> Propagator {
        Propagator::new(
            NumericalSolver::default(),
            vec![
                Arc::new(PositionDerivative::new()),
                Arc::new(CentralBodyGravity::new(Arc::new(EarthGravity::point_mass()))),
            ],
        )
    }

    fn state_at(instant: Instant, x: f64) -> State {
        State::from_position_velocity(
            instant,
            Position::meters(Vector3::new(x, 0.0, 0.0), Frame::Gcrf),
            Velocity::meters_per_second(Vector3::new(0.0, 7546.05, 0.0), Frame::Gcrf),
        )
        .unwrap()
    }

    #[test]
    fn test_from_states_sorts_and_collapses_duplicates() {
        let later = offset_by(&epoch(), 60.0);
        let cache = Propagated::from_states(
            propagator(),
            vec![
                state_at(later, 7.0e6),
                state_at(epoch(), 7.0e6),
                state_at(later, 7.0e6),
            ],
        )
        .unwrap();

        assert_eq!(cache.cached_states().len(), 2);
        assert_eq!(cache.cached_states()[0].instant(), epoch());
        assert_eq!(cache.epoch(), epoch());
    }

    #[test]
    fn test_contradictory_states_rejected() {
        let result = Propagated::from_states(
            propagator(),
            vec![state_at(epoch(), 7.0e6), state_at(epoch(), 7.1e6)],
        );
        assert_eq!(result, Err(Error::ContradictoryState(epoch())));
    }

    #[test]
    fn test_mixed_frames_and_layouts_rejected() {
        let seed = state_at(epoch(), 7.0e6);
        let teme = propagator()
            .calculate_state_at(&seed, &offset_by(&epoch(), 600.0))
            .unwrap()
            .in_frame(Frame::Teme)
            .unwrap();

        let result = Propagated::from_states(propagator(), vec![seed.clone(), teme]);
        assert_eq!(
            result,
            Err(Error::FrameMismatch {
                expected: Frame::Gcrf,
                found: Frame::Teme
            })
        );

        let broker = Arc::new(
            crate::propagation::state::CoordinateBroker::from_subsets([
                crate::propagation::state::cartesian_position(),
                crate::propagation::state::cartesian_velocity(),
                crate::propagation::state::mass(),
            ])
            .unwrap(),
        );
        let mut values = seed.coordinates().as_slice().to_vec();
        values.push(250.0);
        let with_mass = State::new(
            offset_by(&epoch(), 60.0),
            nalgebra::DVector::from_vec(values),
            Frame::Gcrf,
            broker,
        )
        .unwrap();

        let mut cache = Propagated::new(propagator(), seed);
        assert!(matches!(
            cache.set_cached_states(vec![state_at(epoch(), 7.0e6), with_mass]),
            Err(Error::IncompatibleLayout(_))
        ));
        assert_eq!(cache.cached_states().len(), 1);
    }

    #[test]
    fn test_empty_cache_rejected() {
        let result = Propagated::from_states(propagator(), Vec::new());
        assert!(matches!(result, Err(Error::UndefinedOperand(_))));

        let mut cache = Propagated::new(propagator(), state_at(epoch(), 7.0e6));
        assert!(cache.set_cached_states(Vec::new()).is_err());
        assert_eq!(cache.cached_states().len(), 1);
    }

    #[test]
    fn test_miss_inserts_in_order() {
        let mut cache = Propagated::new(propagator(), state_at(epoch(), 7.0e6));

        cache.calculate_state_at(&offset_by(&epoch(), 120.0)).unwrap();
        cache.calculate_state_at(&offset_by(&epoch(), -120.0)).unwrap();
        cache.calculate_state_at(&offset_by(&epoch(), 60.0)).unwrap();

        let instants: Vec<Instant> = cache.cached_states().iter().map(|s| s.instant()).collect();
        assert_eq!(instants.len(), 4);
        assert!(instants.windows(2).all(|pair| is_before(&pair[0], &pair[1])));
        assert_eq!(cache.epoch(), epoch());
    }

    #[test]
    fn test_batch_preserves_order_and_duplicates() {
        let mut cache = Propagated::new(propagator(), state_at(epoch(), 7.0e6));
        let instants = [
            offset_by(&epoch(), 300.0),
            offset_by(&epoch(), -300.0),
            offset_by(&epoch(), 300.0),
            epoch(),
            offset_by(&epoch(), 100.0),
        ];

        let states = cache.calculate_states_at(&instants).unwrap();

        assert_eq!(states.len(), instants.len());
        for (state, instant) in states.iter().zip(&instants) {
            assert_eq!(state.instant(), *instant);
        }
        assert_eq!(states[0], states[2]);
        assert_eq!(cache.cached_states().len(), 4);
    }

    #[test]
    fn test_display_summarizes_cache() {
        let cache = Propagated::new(propagator(), state_at(epoch(), 7.0e6));
        let text = cache.to_string();
        assert!(text.contains("1 state"));
        assert!(text.contains("Propagator"));
    }
}
