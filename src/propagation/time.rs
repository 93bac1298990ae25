//! Conversions between satkit instants and the f64 seconds used by the solver

use std::cmp::Ordering;

use satkit::{Duration, Instant};

/// Seconds elapsed from `from` to `to` (negative when `to` is earlier)
pub fn seconds_between(from: &Instant, to: &Instant) -> f64 {
    (*to - *from).as_seconds()
}

/// Instant `seconds` after `reference` (before it when negative)
pub fn offset_by(reference: &Instant, seconds: f64) -> Instant {
    *reference + Duration::from_seconds(seconds)
}

/// Total order over instants, used for sorting and binary searches
pub fn compare(lhs: &Instant, rhs: &Instant) -> Ordering {
    lhs.partial_cmp(rhs).unwrap_or(Ordering::Equal)
}

/// Human readable UTC timestamp
pub fn format_instant(instant: &Instant) -> String {
    let (year, month, day, hour, min, sec) = instant.as_datetime();
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:06.3} UTC",
        year, month, day, hour, min, sec
    )
}
