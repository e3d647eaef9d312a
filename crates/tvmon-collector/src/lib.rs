//! OS resource sampling for the tvmon sidecar.
//!
//! A [`CounterSource`] reads raw cumulative counters (CPU ticks, interface
//! byte counts, memory and disk figures). The [`ResourceSampler`] keeps the
//! previous readings, turns them into point-in-time percentages and rates,
//! and serves the result from a short-lived cache.

pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod network;
pub mod sampler;
pub mod source;


pub use error::{CollectorError, Result};
pub use sampler::{ProcessSnapshot, ResourceSampler, SamplerStats, SystemSnapshot};
pub use source::{CounterSource, ProcessCounters, ProcfsSource, SystemCounters};
