//! Built-in comparison policies, keyed by method id.
//!
//! | id | channel | tuner |
//! |----|---------|-------|
//! | 1  | [`Heartbeat`] | [`Heartbeat`] |
//! | 2  | [`AnyChange`] | [`AnyChange`] |
//! | 3  | [`EpsilonChange`] | [`EpsilonChange`] |
//! | 4  | [`AvailabilityOnly`] | - |

pub mod any_change;
pub mod availability;
pub mod epsilon;
pub mod heartbeat;

pub use any_change::AnyChange;
pub use availability::AvailabilityOnly;
pub use epsilon::EpsilonChange;
pub use heartbeat::Heartbeat;

use crate::{ChannelPolicy, TunerPolicy};

/// Accumulated CC/PES error counters above this value are reset to zero
/// before an availability-only comparison, so low-volume integrations
/// never see unbounded counts.
pub const ERROR_COUNTER_CEILING: u64 = 1000;

/// Relative difference between two readings.
///
/// `0.0` when both are exactly zero, `1.0` when exactly one is zero,
/// otherwise `|a - b| / max(|a|, |b|)`.
///
/// # Examples
///
/// ```
/// use tvmon_monitor::rules::ratio;
///
/// assert_eq!(ratio(0.0, 0.0), 0.0);
/// assert_eq!(ratio(0.0, 5.0), 1.0);
/// assert_eq!(ratio(5.0, 0.0), 1.0);
/// assert!((ratio(1_000_000.0, 1_200_000.0) - 0.1667).abs() < 1e-3);
/// ```
pub fn ratio(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    if a == 0.0 || b == 0.0 {
        return 1.0;
    }
    (a - b).abs() / a.abs().max(b.abs())
}

pub fn channel_policy(method: u8) -> Option<Box<dyn ChannelPolicy>> {
    match method {
        1 => Some(Box::new(Heartbeat)),
        2 => Some(Box::new(AnyChange)),
        3 => Some(Box::new(EpsilonChange)),
        4 => Some(Box::new(AvailabilityOnly)),
        _ => None,
    }
}

pub fn tuner_policy(method: u8) -> Option<Box<dyn TunerPolicy>> {
    match method {
        1 => Some(Box::new(Heartbeat)),
        2 => Some(Box::new(AnyChange)),
        3 => Some(Box::new(EpsilonChange)),
        _ => None,
    }
}
