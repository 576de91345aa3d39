//! Constraints over the time family.

use chrono::{DateTime, TimeDelta, Utc};

use super::Constraint;
use crate::error::ConstraintViolation;
use crate::types::Duration;

/// Time values that map onto a UTC instant. Implemented by the temporal
/// primitive types that identify a point on the timeline.
pub trait Timestamped {
    fn timestamp_utc(&self) -> DateTime<Utc>;
}

/// Equality against an anchor instant.
pub fn time_equal<T: Timestamped>(anchor: DateTime<Utc>) -> Constraint<T> {
    Constraint::new("time-equal", move |value: &T| {
        let at = value.timestamp_utc();
        if at == anchor {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!("{at} does not equal {anchor}")))
        }
    })
}

/// Inclusive range over instants.
pub fn time_point_range<T: Timestamped>(lo: DateTime<Utc>, hi: DateTime<Utc>) -> Constraint<T> {
    Constraint::new("time-point-range", move |value: &T| {
        let at = value.timestamp_utc();
        if at < lo || at > hi {
            return Err(ConstraintViolation::new(format!("{at} outside {lo}..{hi}")));
        }
        Ok(())
    })
}

/// Inclusive range over durations, compared by their approximate length
/// in seconds (see [`Duration::approx_seconds`]).
pub fn duration_range(lo: Duration, hi: Duration) -> Constraint<Duration> {
    Constraint::new("duration-range", move |value: &Duration| {
        let n = value.approx_seconds();
        if n < lo.approx_seconds() || n > hi.approx_seconds() {
            return Err(ConstraintViolation::new(format!("duration {value} outside {lo}..{hi}")));
        }
        Ok(())
    })
}

/// A recurring acceptance window: the value must land inside
/// `[window_start, window_end]` shifted by any whole number of periods.
pub fn recurrence<T: Timestamped>(
    period: TimeDelta,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Constraint<T> {
    Constraint::new("recurrence", move |value: &T| {
        let at = value.timestamp_utc();
        let period_secs = period.num_seconds();
        let window_secs = (window_end - window_start).num_seconds();
        if period_secs <= 0 || window_secs < 0 {
            return Err(ConstraintViolation::new("degenerate recurrence window"));
        }
        let from_start = (at - window_start).num_seconds();
        if from_start < 0 {
            return Err(ConstraintViolation::new(format!("{at} precedes the first window")));
        }
        if from_start % period_secs <= window_secs {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!("{at} outside every recurrence window")))
        }
    })
}

/// A predicate over one component of a duration.
pub fn duration_component(
    name: impl Into<String>,
    pred: impl Fn(&Duration) -> bool + Send + Sync + 'static,
) -> Constraint<Duration> {
    super::property(name, pred)
}
