use crate::{ChannelObservation, ChannelPolicy, TunerObservation, TunerPolicy};
use tvmon_common::types::{ChannelSnapshot, TunerSnapshot};

/// Emits on any flag change, any accumulated error, or any exact change
/// of the numeric readings.
pub struct AnyChange;

impl ChannelPolicy for AnyChange {
    fn method(&self) -> u8 {
        2
    }

    fn should_emit(&self, prev: &ChannelSnapshot, obs: &ChannelObservation, _rate: f64) -> bool {
        prev.ready != obs.on_air
            || prev.scrambled != obs.scrambled
            || obs.cc_error > 0
            || obs.pes_error > 0
            || prev.bitrate != obs.bitrate
    }
}

impl TunerPolicy for AnyChange {
    fn method(&self) -> u8 {
        2
    }

    fn should_emit(&self, prev: &TunerSnapshot, obs: &TunerObservation, _rate: f64) -> bool {
        prev.lock != obs.lock
            || prev.signal != obs.signal
            || prev.snr != obs.snr
            || obs.ber > 0
            || obs.unc > 0
    }
}
