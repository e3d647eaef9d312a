use crate::{ChannelObservation, ChannelPolicy};
use tvmon_common::types::ChannelSnapshot;

/// Emits only when the on-air flag flips. Used by low-volume integrations
/// that care about availability, not quality; the monitor caps its error
/// counters for this policy.
pub struct AvailabilityOnly;

impl ChannelPolicy for AvailabilityOnly {
    fn method(&self) -> u8 {
        4
    }

    fn should_emit(&self, prev: &ChannelSnapshot, obs: &ChannelObservation, _rate: f64) -> bool {
        prev.ready != obs.on_air
    }

    fn bounds_error_counters(&self) -> bool {
        true
    }
}
