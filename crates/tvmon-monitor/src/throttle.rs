use crate::rules::ERROR_COUNTER_CEILING;

/// A monitor that has gone this many telemetry samples without emitting
/// emits at its next evaluation point regardless of its policy.
pub const FORCE_SEND_AFTER: u32 = 300;

/// What the throttle decided for one telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still inside the check interval; skip evaluation.
    Wait,
    /// Evaluate the policy. `force` is set once the silence bound is
    /// exceeded.
    Evaluate { force: bool },
}

/// Per-monitor tick state: `time` counts samples since the last
/// evaluation, `force_timer` counts samples since the last emission.
#[derive(Debug, Default, Clone)]
pub struct Throttle {
    time: u32,
    force_timer: u32,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, check_interval: u32) -> Tick {
        self.force_timer = self.force_timer.saturating_add(1);
        if self.time < check_interval {
            self.time += 1;
            return Tick::Wait;
        }
        self.time = 0;
        Tick::Evaluate {
            force: self.force_timer > FORCE_SEND_AFTER,
        }
    }

    /// Called after every emission.
    pub fn emitted(&mut self) {
        self.force_timer = 0;
    }

    pub fn reset(&mut self) {
        self.time = 0;
        self.force_timer = 0;
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn force_timer(&self) -> u32 {
        self.force_timer
    }
}

/// CC/PES errors accumulated between emissions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounters {
    pub cc: u64,
    pub pes: u64,
}

impl ErrorCounters {
    pub fn add(&mut self, cc: u64, pes: u64) {
        self.cc = self.cc.saturating_add(cc);
        self.pes = self.pes.saturating_add(pes);
    }

    /// Resets both counters when either exceeds [`ERROR_COUNTER_CEILING`].
    pub fn bound(&mut self) {
        if self.cc > ERROR_COUNTER_CEILING || self.pes > ERROR_COUNTER_CEILING {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
