use crate::error::{MonitorError, Result};
use crate::monitor::{lock_core, MonitorState, SampleOutcome};
use crate::params::MonitorConfig;
use crate::rules::channel_policy;
use crate::throttle::{ErrorCounters, Throttle, Tick};
use crate::{ChannelObservation, ChannelPolicy};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use tvmon_common::feed::{Feed, Publisher};
use tvmon_common::host::{AnalyzerHandle, HostEngine, SampleSink, UpstreamHandle};
use tvmon_common::types::{ChannelSnapshot, EntityKind, PidStats, Sample, TotalStats};

#[derive(Serialize)]
struct ChannelReport<'a> {
    channel: &'a str,
    #[serde(flatten)]
    snapshot: &'a ChannelSnapshot,
}

#[derive(Serialize)]
struct ChannelErrorReport<'a> {
    channel: &'a str,
    format: Option<&'a str>,
    source: Option<&'a str>,
    error: &'a str,
}

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    channel: &'a str,
    analyze: Vec<&'a PidStats>,
}

pub(crate) struct ChannelCore {
    config: MonitorConfig,
    policy: Option<Box<dyn ChannelPolicy>>,
    state: MonitorState,
    snapshot: ChannelSnapshot,
    counters: ErrorCounters,
    throttle: Throttle,
    cached: Option<String>,
    psi: BTreeMap<String, Value>,
    upstream: Option<UpstreamHandle>,
    analyzer: Option<AnalyzerHandle>,
}

impl ChannelCore {
    fn on_sample(
        &mut self,
        sample: Sample,
        host: &dyn HostEngine,
        publisher: &dyn Publisher,
    ) -> SampleOutcome {
        if self.state != MonitorState::Running {
            return SampleOutcome::Ignored;
        }
        match sample {
            Sample::Error { message } => {
                self.report_error(&message, host, publisher);
                SampleOutcome::ErrorReported
            }
            Sample::Psi { psi, data } => {
                self.psi.insert(psi, data);
                SampleOutcome::PsiCached
            }
            Sample::Total {
                total,
                on_air,
                analyze,
            } => {
                let outcome = self.on_total(&total, on_air, host, publisher);
                if self.config.analyze {
                    self.report_analyze(&analyze, publisher);
                }
                outcome
            }
            Sample::Frontend(_) => SampleOutcome::Ignored,
        }
    }

    fn on_total(
        &mut self,
        total: &TotalStats,
        on_air: bool,
        host: &dyn HostEngine,
        publisher: &dyn Publisher,
    ) -> SampleOutcome {
        self.counters.add(total.cc_errors, total.pes_errors);

        let Tick::Evaluate { force } = self.throttle.tick(self.config.time_check) else {
            return SampleOutcome::Throttled;
        };
        let Some(policy) = self.policy.as_ref() else {
            return SampleOutcome::Ignored;
        };
        if policy.bounds_error_counters() {
            self.counters.bound();
        }

        let obs = ChannelObservation {
            on_air,
            scrambled: total.scrambled,
            bitrate: i64::try_from(total.bitrate).unwrap_or(i64::MAX),
            cc_error: self.counters.cc,
            pes_error: self.counters.pes,
        };
        if !(policy.should_emit(&self.snapshot, &obs, self.config.rate) || force) {
            return SampleOutcome::Unchanged;
        }
        self.emit(obs, host, publisher)
    }

    fn emit(
        &mut self,
        obs: ChannelObservation,
        host: &dyn HostEngine,
        publisher: &dyn Publisher,
    ) -> SampleOutcome {
        if let Some(source) = host.active_source(&self.config.name) {
            self.snapshot.format = Some(source.format);
            self.snapshot.source = Some(source.address);
        }
        self.snapshot.ready = obs.on_air;
        self.snapshot.scrambled = obs.scrambled;
        self.snapshot.bitrate = obs.bitrate;
        self.snapshot.cc_error = obs.cc_error;
        self.snapshot.pes_error = obs.pes_error;

        let report = ChannelReport {
            channel: &self.config.name,
            snapshot: &self.snapshot,
        };
        let pushed = match serde_json::to_string(&report) {
            Ok(payload) if self.cached.as_deref() != Some(payload.as_str()) => {
                publisher.publish(Feed::Channels, payload.clone());
                self.cached = Some(payload);
                true
            }
            Ok(_) => {
                tracing::debug!(monitor = %self.config.name, "Snapshot unchanged, push skipped");
                false
            }
            Err(e) => {
                tracing::warn!(monitor = %self.config.name, error = %e, "Failed to serialize snapshot");
                false
            }
        };

        self.counters.reset();
        self.throttle.emitted();
        SampleOutcome::Emitted { pushed }
    }

    fn report_error(&self, message: &str, host: &dyn HostEngine, publisher: &dyn Publisher) {
        let source = host.active_source(&self.config.name);
        let report = ChannelErrorReport {
            channel: &self.config.name,
            format: source.as_ref().map(|s| s.format.as_str()),
            source: source.as_ref().map(|s| s.address.as_str()),
            error: message,
        };
        match serde_json::to_string(&report) {
            Ok(payload) => publisher.publish(Feed::Errors, payload),
            Err(e) => {
                tracing::warn!(monitor = %self.config.name, error = %e, "Failed to serialize error report")
            }
        }
    }

    fn report_analyze(&self, pids: &[PidStats], publisher: &dyn Publisher) {
        let offending: Vec<&PidStats> = pids.iter().filter(|p| p.has_errors()).collect();
        if offending.is_empty() {
            return;
        }
        let report = AnalyzeReport {
            channel: &self.config.name,
            analyze: offending,
        };
        match serde_json::to_string(&report) {
            Ok(payload) => publisher.publish(Feed::Analyze, payload),
            Err(e) => {
                tracing::warn!(monitor = %self.config.name, error = %e, "Failed to serialize analyze report")
            }
        }
    }

    fn clear(&mut self) {
        self.snapshot = ChannelSnapshot::default();
        self.counters.reset();
        self.throttle.reset();
        self.cached = None;
        self.psi.clear();
        self.analyzer = None;
    }
}

/// Watches one channel's analyzer output.
pub struct ChannelMonitor {
    core: Arc<Mutex<ChannelCore>>,
    host: Arc<dyn HostEngine>,
    publisher: Arc<dyn Publisher>,
}

impl ChannelMonitor {
    pub fn new(
        config: MonitorConfig,
        upstream: UpstreamHandle,
        host: Arc<dyn HostEngine>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let core = ChannelCore {
            config,
            policy: None,
            state: MonitorState::Created,
            snapshot: ChannelSnapshot::default(),
            counters: ErrorCounters::default(),
            throttle: Throttle::new(),
            cached: None,
            psi: BTreeMap::new(),
            upstream: Some(upstream),
            analyzer: None,
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            host,
            publisher,
        }
    }

    /// Registers the decision loop with the host analyzer on this
    /// monitor's upstream.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Start`] if the comparison method id has no
    /// policy, the monitor was already started, or the host rejects the
    /// analyzer. The monitor stays in `Created` on failure.
    pub fn start(&self) -> Result<AnalyzerHandle> {
        let upstream = {
            let mut core = lock_core(&self.core);
            let name = core.config.name.clone();
            if core.state != MonitorState::Created {
                return Err(MonitorError::Start {
                    name,
                    reason: format!("monitor is {}", core.state),
                });
            }
            let policy = channel_policy(core.config.method_comparison).ok_or_else(|| {
                MonitorError::Start {
                    name: name.clone(),
                    reason: format!(
                        "unsupported comparison method {}",
                        core.config.method_comparison
                    ),
                }
            })?;
            let upstream = core.upstream.clone().ok_or_else(|| MonitorError::Start {
                name,
                reason: "no upstream".to_string(),
            })?;
            core.policy = Some(policy);
            core.state = MonitorState::Running;
            upstream
        };

        let sink: Arc<dyn SampleSink> = Arc::new(ChannelSink {
            core: Arc::downgrade(&self.core),
            host: Arc::clone(&self.host),
            publisher: Arc::clone(&self.publisher),
        });
        let attached = self.host.analyze(&upstream, sink);

        let mut core = lock_core(&self.core);
        match attached {
            Ok(handle) => {
                core.analyzer = Some(handle);
                tracing::info!(monitor = %core.config.name, upstream = upstream.id, "Channel monitor started");
                Ok(handle)
            }
            Err(e) => {
                core.state = MonitorState::Created;
                core.policy = None;
                Err(MonitorError::Start {
                    name: core.config.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Feeds one sample through the decision loop.
    pub fn on_sample(&self, sample: Sample) -> SampleOutcome {
        lock_core(&self.core).on_sample(sample, self.host.as_ref(), self.publisher.as_ref())
    }

    /// Stops the monitor: releases the upstream and clears all cached
    /// state. A second call only logs.
    pub fn kill(&self) {
        let upstream = {
            let mut core = lock_core(&self.core);
            if core.state == MonitorState::Stopped {
                tracing::warn!(monitor = %core.config.name, "Channel monitor already stopped");
                return;
            }
            core.state = MonitorState::Stopped;
            core.clear();
            core.upstream.take()
        };
        if let Some(upstream) = upstream {
            self.host.release(&upstream);
        }
        tracing::info!(monitor = %self.name(), "Channel monitor stopped");
    }

    pub fn update_parameters(&self, params: &Map<String, Value>) -> Result<()> {
        let mut core = lock_core(&self.core);
        let updated = core.config.with_updates(EntityKind::Channel, params)?;
        if updated.method_comparison != core.config.method_comparison
            && core.state == MonitorState::Running
        {
            core.policy = Some(channel_policy(updated.method_comparison).ok_or_else(|| {
                MonitorError::Start {
                    name: updated.name.clone(),
                    reason: format!(
                        "unsupported comparison method {}",
                        updated.method_comparison
                    ),
                }
            })?);
        }
        core.config = updated;
        Ok(())
    }

    pub fn name(&self) -> String {
        lock_core(&self.core).config.name.clone()
    }

    pub fn config(&self) -> MonitorConfig {
        lock_core(&self.core).config.clone()
    }

    pub fn state(&self) -> MonitorState {
        lock_core(&self.core).state
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        lock_core(&self.core).snapshot.clone()
    }

    pub fn cached_payload(&self) -> Option<String> {
        lock_core(&self.core).cached.clone()
    }

    /// Handle of the attached analyzer while the monitor is running.
    pub fn analyzer(&self) -> Option<AnalyzerHandle> {
        lock_core(&self.core).analyzer
    }

    pub fn psi(&self) -> BTreeMap<String, Value> {
        lock_core(&self.core).psi.clone()
    }
}

/// The callback handed to the host analyzer. Holds the monitor weakly so
/// a dropped monitor turns late samples into no-ops.
struct ChannelSink {
    core: Weak<Mutex<ChannelCore>>,
    host: Arc<dyn HostEngine>,
    publisher: Arc<dyn Publisher>,
}

impl SampleSink for ChannelSink {
    fn deliver(&self, sample: Sample) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let mut core = lock_core(&core);
        let result = catch_unwind(AssertUnwindSafe(|| {
            core.on_sample(sample, self.host.as_ref(), self.publisher.as_ref())
        }));
        match result {
            Ok(outcome) => {
                tracing::trace!(monitor = %core.config.name, ?outcome, "Sample processed")
            }
            Err(_) => {
                tracing::error!(monitor = %core.config.name, "Sample handling panicked, sample dropped")
            }
        }
    }
}
