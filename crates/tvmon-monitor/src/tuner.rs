use crate::error::{MonitorError, Result};
use crate::monitor::{lock_core, MonitorState, SampleOutcome};
use crate::params::MonitorConfig;
use crate::rules::tuner_policy;
use crate::throttle::{Throttle, Tick};
use crate::{TunerObservation, TunerPolicy};
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use tvmon_common::feed::{Feed, Publisher};
use tvmon_common::host::{AnalyzerHandle, HostEngine, SampleSink, UpstreamHandle};
use tvmon_common::types::{EntityKind, FrontendStatus, Sample, TunerSnapshot};

#[derive(Serialize)]
struct TunerReport<'a> {
    dvb: &'a str,
    #[serde(flatten)]
    snapshot: &'a TunerSnapshot,
}

#[derive(Serialize)]
struct TunerErrorReport<'a> {
    dvb: &'a str,
    error: &'a str,
}

pub(crate) struct TunerCore {
    config: MonitorConfig,
    policy: Option<Box<dyn TunerPolicy>>,
    state: MonitorState,
    snapshot: TunerSnapshot,
    throttle: Throttle,
    cached: Option<String>,
    upstream: Option<UpstreamHandle>,
    analyzer: Option<AnalyzerHandle>,
}

impl TunerCore {
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
                let report = TunerErrorReport {
                    dvb: &self.config.name,
                    error: &message,
                };
                match serde_json::to_string(&report) {
                    Ok(payload) => publisher.publish(Feed::Errors, payload),
                    Err(e) => {
                        tracing::warn!(monitor = %self.config.name, error = %e, "Failed to serialize error report")
                    }
                }
                SampleOutcome::ErrorReported
            }
            Sample::Frontend(status) => self.on_frontend(&status, host, publisher),
            Sample::Psi { .. } | Sample::Total { .. } => SampleOutcome::Ignored,
        }
    }

    fn on_frontend(
        &mut self,
        status: &FrontendStatus,
        host: &dyn HostEngine,
        publisher: &dyn Publisher,
    ) -> SampleOutcome {
        let Tick::Evaluate { force } = self.throttle.tick(self.config.time_check) else {
            return SampleOutcome::Throttled;
        };
        let Some(policy) = self.policy.as_ref() else {
            return SampleOutcome::Ignored;
        };

        let obs = TunerObservation {
            lock: status.lock,
            signal: status.signal,
            snr: status.snr,
            ber: status.ber,
            unc: status.unc,
        };
        if !(policy.should_emit(&self.snapshot, &obs, self.config.rate) || force) {
            return SampleOutcome::Unchanged;
        }

        if let Some(source) = host.active_source(&self.config.name) {
            self.snapshot.format = Some(source.format);
            self.snapshot.source = Some(source.address);
        }
        self.snapshot.lock = obs.lock;
        self.snapshot.signal = obs.signal;
        self.snapshot.snr = obs.snr;
        self.snapshot.ber = obs.ber;
        self.snapshot.unc = obs.unc;

        let report = TunerReport {
            dvb: &self.config.name,
            snapshot: &self.snapshot,
        };
        let pushed = match serde_json::to_string(&report) {
            Ok(payload) if self.cached.as_deref() != Some(payload.as_str()) => {
                publisher.publish(Feed::Dvb, payload.clone());
                self.cached = Some(payload);
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(monitor = %self.config.name, error = %e, "Failed to serialize snapshot");
                false
            }
        };
        self.throttle.emitted();
        SampleOutcome::Emitted { pushed }
    }

    fn clear(&mut self) {
        self.snapshot = TunerSnapshot::default();
        self.throttle.reset();
        self.cached = None;
        self.analyzer = None;
    }
}

/// Watches one DVB tuner's frontend status.
pub struct TunerMonitor {
    core: Arc<Mutex<TunerCore>>,
    host: Arc<dyn HostEngine>,
    publisher: Arc<dyn Publisher>,
}

impl TunerMonitor {
    pub fn new(
        config: MonitorConfig,
        upstream: UpstreamHandle,
        host: Arc<dyn HostEngine>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let core = TunerCore {
            config,
            policy: None,
            state: MonitorState::Created,
            snapshot: TunerSnapshot::default(),
            throttle: Throttle::new(),
            cached: None,
            upstream: Some(upstream),
            analyzer: None,
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            host,
            publisher,
        }
    }

    /// Registers the decision loop with the host's tuning primitive.
    ///
    /// # Errors
    ///
    /// Same contract as [`ChannelMonitor::start`](crate::channel::ChannelMonitor::start).
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
            let policy = tuner_policy(core.config.method_comparison).ok_or_else(|| {
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

        let sink: Arc<dyn SampleSink> = Arc::new(TunerSink {
            core: Arc::downgrade(&self.core),
            host: Arc::clone(&self.host),
            publisher: Arc::clone(&self.publisher),
        });
        let attached = self.host.tune(&upstream, sink);

        let mut core = lock_core(&self.core);
        match attached {
            Ok(handle) => {
                core.analyzer = Some(handle);
                tracing::info!(monitor = %core.config.name, upstream = upstream.id, "Tuner monitor started");
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

    pub fn on_sample(&self, sample: Sample) -> SampleOutcome {
        lock_core(&self.core).on_sample(sample, self.host.as_ref(), self.publisher.as_ref())
    }

    pub fn kill(&self) {
        let upstream = {
            let mut core = lock_core(&self.core);
            if core.state == MonitorState::Stopped {
                tracing::warn!(monitor = %core.config.name, "Tuner monitor already stopped");
                return;
            }
            core.state = MonitorState::Stopped;
            core.clear();
            core.upstream.take()
        };
        if let Some(upstream) = upstream {
            self.host.release(&upstream);
        }
        tracing::info!(monitor = %self.name(), "Tuner monitor stopped");
    }

    pub fn update_parameters(&self, params: &Map<String, Value>) -> Result<()> {
        let mut core = lock_core(&self.core);
        let updated = core.config.with_updates(EntityKind::Tuner, params)?;
        if updated.method_comparison != core.config.method_comparison
            && core.state == MonitorState::Running
        {
            core.policy = Some(tuner_policy(updated.method_comparison).ok_or_else(|| {
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

    pub fn snapshot(&self) -> TunerSnapshot {
        lock_core(&self.core).snapshot.clone()
    }

    pub fn cached_payload(&self) -> Option<String> {
        lock_core(&self.core).cached.clone()
    }

    /// Handle of the attached analyzer while the monitor is running.
    pub fn analyzer(&self) -> Option<AnalyzerHandle> {
        lock_core(&self.core).analyzer
    }
}

struct TunerSink {
    core: Weak<Mutex<TunerCore>>,
    host: Arc<dyn HostEngine>,
    publisher: Arc<dyn Publisher>,
}

impl SampleSink for TunerSink {
    fn deliver(&self, sample: Sample) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let mut core = lock_core(&core);
        let result = catch_unwind(AssertUnwindSafe(|| {
            core.on_sample(sample, self.host.as_ref(), self.publisher.as_ref())
        }));
        if result.is_err() {
            tracing::error!(monitor = %core.config.name, "Sample handling panicked, sample dropped");
        }
    }
}
