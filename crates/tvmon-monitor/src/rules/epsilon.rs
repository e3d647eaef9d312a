use super::ratio;
use crate::{ChannelObservation, ChannelPolicy, TunerObservation, TunerPolicy};
use tvmon_common::types::{ChannelSnapshot, TunerSnapshot};

/// Like [`AnyChange`](super::AnyChange), but numeric readings only count
/// as changed when their [`ratio`] exceeds the configured rate.
pub struct EpsilonChange;

impl ChannelPolicy for EpsilonChange {
    fn method(&self) -> u8 {
        3
    }

    fn should_emit(&self, prev: &ChannelSnapshot, obs: &ChannelObservation, rate: f64) -> bool {
        prev.ready != obs.on_air
            || prev.scrambled != obs.scrambled
            || obs.cc_error > 0
            || obs.pes_error > 0
            || ratio(prev.bitrate as f64, obs.bitrate as f64) > rate
    }
}

impl TunerPolicy for EpsilonChange {
    fn method(&self) -> u8 {
        3
    }

    fn should_emit(&self, prev: &TunerSnapshot, obs: &TunerObservation, rate: f64) -> bool {
        prev.lock != obs.lock
            || ratio(prev.signal as f64, obs.signal as f64) > rate
            || ratio(prev.snr as f64, obs.snr as f64) > rate
            || obs.ber > 0
            || obs.unc > 0
    }
}
