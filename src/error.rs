//! Error taxonomy shared by every propagation component

use satkit::Instant;

use crate::propagation::frame::Frame;

/// Errors raised by the propagation core
///
/// All variants are unrecoverable at the point of detection: the requested
/// operation is aborted and nothing partial is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A coordinate subset was added twice to the same broker
    #[error("duplicate coordinate subset [{0}]")]
    DuplicateSubset(String),

    /// A coordinate subset was looked up in a broker that does not hold it
    #[error("unknown coordinate subset [{0}]")]
    UnknownSubset(String),

    /// Vector length or subset set does not match the expected layout
    #[error("incompatible coordinate layout: {0}")]
    IncompatibleLayout(String),

    /// Two states share an instant but carry different coordinates
    #[error("contradictory states at {0:?}")]
    ContradictoryState(Instant),

    /// Operands are expressed in different frames
    #[error("frame mismatch: expected {expected}, found {found}")]
    FrameMismatch {
        /// Frame required by the operation
        expected: Frame,
        /// Frame actually supplied
        found: Frame,
    },

    /// Operands are defined at different instants
    #[error("instant mismatch: {0:?} vs {1:?}")]
    InstantMismatch(Instant, Instant),

    /// An empty or uninitialized operand was used where a defined one is required
    #[error("undefined operand: {0}")]
    UndefinedOperand(&'static str),

    /// A strictly increasing instant sequence was required
    #[error("instants are not strictly increasing (index {0})")]
    UnsortedInput(usize),

    /// The numerical solver could not satisfy its tolerances within its step budget
    #[error("integration did not converge: {0}")]
    NonConvergent(String),

    /// An environment collaborator (ephemeris, atmosphere, gravity field) failed
    #[error("environment model failure: {0}")]
    Environment(String),

    /// An argument is outside the accepted domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A revolution lies behind a node crossing that cannot be resolved
    #[error("revolution {0} cannot be reached from the reference epoch")]
    UnreachableRevolution(i64),
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
