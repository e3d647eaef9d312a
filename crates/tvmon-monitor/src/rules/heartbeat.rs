use crate::{ChannelObservation, ChannelPolicy, TunerObservation, TunerPolicy};
use tvmon_common::types::{ChannelSnapshot, TunerSnapshot};

/// Emits at every evaluation point; the check interval alone drives
/// reporting.
pub struct Heartbeat;

impl ChannelPolicy for Heartbeat {
    fn method(&self) -> u8 {
        1
    }

    fn should_emit(&self, _prev: &ChannelSnapshot, _obs: &ChannelObservation, _rate: f64) -> bool {
        true
    }
}

impl TunerPolicy for Heartbeat {
    fn method(&self) -> u8 {
        1
    }

    fn should_emit(&self, _prev: &TunerSnapshot, _obs: &TunerObservation, _rate: f64) -> bool {
        true
    }
}
