//! Change-detection and monitor-lifecycle engine.
//!
//! A [`monitor::Monitor`] ingests the sample stream of one channel or tuner,
//! throttles it to the configured check interval, asks its comparison
//! policy whether the observed state is worth reporting, and pushes a
//! compact snapshot to the configured collectors. The
//! [`registry::MonitorRegistry`] owns monitor lifetimes and enforces name
//! uniqueness and a capacity limit.

pub mod channel;
pub mod error;
pub mod monitor;
pub mod params;
pub mod registry;
pub mod rules;
pub mod throttle;
pub mod tuner;


use tvmon_common::types::{ChannelSnapshot, TunerSnapshot};

/// The channel state observed at an evaluation point: flags and bitrate
/// from the current sample, error counters accumulated since the last
/// emission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelObservation {
    pub on_air: bool,
    pub scrambled: bool,
    pub bitrate: i64,
    pub cc_error: u64,
    pub pes_error: u64,
}

/// The tuner frontend state observed at an evaluation point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunerObservation {
    pub lock: bool,
    pub signal: i32,
    pub snr: i32,
    pub ber: i64,
    pub unc: i64,
}

/// Decides whether a channel observation differs enough from the last
/// emitted snapshot to be reported.
///
/// Implementations are selected by the monitor's configured comparison
/// method id (see [`rules::channel_policy`]) and must be pure: the same
/// inputs always give the same answer.
pub trait ChannelPolicy: Send + Sync {
    /// The comparison method id this policy is registered under.
    fn method(&self) -> u8;

    /// Returns `true` when the observation should be emitted. `rate` is the
    /// fractional tolerance used by ratio-based policies.
    fn should_emit(&self, prev: &ChannelSnapshot, obs: &ChannelObservation, rate: f64) -> bool;

    /// Whether the monitor should cap its error counters at
    /// [`rules::ERROR_COUNTER_CEILING`] before evaluating this policy.
    fn bounds_error_counters(&self) -> bool {
        false
    }
}

/// Tuner analog of [`ChannelPolicy`], comparing signal and SNR.
pub trait TunerPolicy: Send + Sync {
    fn method(&self) -> u8;

    fn should_emit(&self, prev: &TunerSnapshot, obs: &TunerObservation, rate: f64) -> bool;
}
