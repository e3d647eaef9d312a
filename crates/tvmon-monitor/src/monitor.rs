use crate::channel::ChannelMonitor;
use crate::error::Result;
use crate::params::MonitorConfig;
use crate::tuner::TunerMonitor;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tvmon_common::host::AnalyzerHandle;
use tvmon_common::types::{EntityKind, Sample};

/// Monitor lifecycle: `Created` → `Running` → `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Created,
    Running,
    Stopped,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Created => write!(f, "created"),
            MonitorState::Running => write!(f, "running"),
            MonitorState::Stopped => write!(f, "stopped"),
        }
    }
}

/// What the decision loop did with one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Inside the check interval; not evaluated.
    Throttled,
    /// Evaluated; the policy saw nothing worth reporting.
    Unchanged,
    /// Evaluated and emitted. `pushed` is false when the serialized
    /// snapshot matched the last one sent.
    Emitted { pushed: bool },
    PsiCached,
    ErrorReported,
    /// Not applicable to this monitor kind, or the monitor is not running.
    Ignored,
}

pub(crate) fn lock_core<T>(core: &Mutex<T>) -> MutexGuard<'_, T> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read-only view of a registered monitor.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorView {
    pub name: String,
    pub kind: EntityKind,
    pub state: MonitorState,
    /// Id of the host analyzer feeding this monitor.
    pub analyzer: Option<u64>,
    pub config: MonitorConfig,
}

pub enum Monitor {
    Channel(ChannelMonitor),
    Tuner(TunerMonitor),
}

impl Monitor {
    pub fn kind(&self) -> EntityKind {
        match self {
            Monitor::Channel(_) => EntityKind::Channel,
            Monitor::Tuner(_) => EntityKind::Tuner,
        }
    }

    pub fn start(&self) -> Result<AnalyzerHandle> {
        match self {
            Monitor::Channel(m) => m.start(),
            Monitor::Tuner(m) => m.start(),
        }
    }

    pub fn on_sample(&self, sample: Sample) -> SampleOutcome {
        match self {
            Monitor::Channel(m) => m.on_sample(sample),
            Monitor::Tuner(m) => m.on_sample(sample),
        }
    }

    pub fn kill(&self) {
        match self {
            Monitor::Channel(m) => m.kill(),
            Monitor::Tuner(m) => m.kill(),
        }
    }

    /// Applies a partial parameter update, all-or-nothing.
    pub fn update_parameters(&self, params: &Map<String, Value>) -> Result<()> {
        match self {
            Monitor::Channel(m) => m.update_parameters(params),
            Monitor::Tuner(m) => m.update_parameters(params),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Monitor::Channel(m) => m.name(),
            Monitor::Tuner(m) => m.name(),
        }
    }

    pub fn config(&self) -> MonitorConfig {
        match self {
            Monitor::Channel(m) => m.config(),
            Monitor::Tuner(m) => m.config(),
        }
    }

    pub fn state(&self) -> MonitorState {
        match self {
            Monitor::Channel(m) => m.state(),
            Monitor::Tuner(m) => m.state(),
        }
    }

    /// The last serialized snapshot pushed to collectors.
    pub fn cached_payload(&self) -> Option<String> {
        match self {
            Monitor::Channel(m) => m.cached_payload(),
            Monitor::Tuner(m) => m.cached_payload(),
        }
    }

    /// Cached PSI tables keyed by table kind. Tuners have none.
    pub fn psi(&self) -> BTreeMap<String, Value> {
        match self {
            Monitor::Channel(m) => m.psi(),
            Monitor::Tuner(_) => BTreeMap::new(),
        }
    }

    pub fn analyzer(&self) -> Option<AnalyzerHandle> {
        match self {
            Monitor::Channel(m) => m.analyzer(),
            Monitor::Tuner(m) => m.analyzer(),
        }
    }

    pub fn view(&self) -> MonitorView {
        let config = self.config();
        MonitorView {
            name: config.name.clone(),
            kind: self.kind(),
            state: self.state(),
            analyzer: self.analyzer().map(|handle| handle.0),
            config,
        }
    }
}
