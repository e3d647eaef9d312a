//! Per-interface throughput from cumulative byte counters.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Shortest window a rate is computed over, so two readings taken close
/// together do not produce spikes.
pub const MIN_RATE_WINDOW: Duration = Duration::from_secs(1);

/// Cumulative byte counters of one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceBytes {
    pub received: u64,
    pub transmitted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceRate {
    pub interface: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

#[derive(Debug, Default)]
pub struct NetworkTracker {
    prev: HashMap<String, InterfaceBytes>,
    last: Option<Instant>,
}

impl NetworkTracker {
    /// Computes `Δbytes / Δt` for every interface in `current`.
    ///
    /// Interfaces without a previous reading report 0. Interfaces missing
    /// from `current` are dropped from the baseline.
    pub fn update(
        &mut self,
        now: Instant,
        current: &BTreeMap<String, InterfaceBytes>,
    ) -> Vec<InterfaceRate> {
        let window = self
            .last
            .map(|last| now.saturating_duration_since(last).max(MIN_RATE_WINDOW))
            .unwrap_or(MIN_RATE_WINDOW)
            .as_secs_f64();

        let rates = current
            .iter()
            .map(|(name, bytes)| {
                let (rx, tx) = match self.prev.get(name) {
                    Some(prev) => (
                        bytes.received.saturating_sub(prev.received),
                        bytes.transmitted.saturating_sub(prev.transmitted),
                    ),
                    None => (0, 0),
                };
                InterfaceRate {
                    interface: name.clone(),
                    rx_bytes_per_sec: rx as f64 / window,
                    tx_bytes_per_sec: tx as f64 / window,
                }
            })
            .collect();

        self.prev.retain(|name, _| current.contains_key(name));
        for (name, bytes) in current {
            self.prev.insert(name.clone(), *bytes);
        }
        self.last = Some(now);
        rates
    }

    pub fn tracked(&self) -> usize {
        self.prev.len()
    }
}
