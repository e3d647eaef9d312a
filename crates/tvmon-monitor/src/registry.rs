use crate::channel::ChannelMonitor;
use crate::error::{MonitorError, Result};
use crate::monitor::{lock_core, Monitor, MonitorView};
use crate::params::MonitorConfig;
use crate::tuner::TunerMonitor;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tvmon_common::feed::Publisher;
use tvmon_common::host::{AnalyzerHandle, HostEngine, UpstreamHandle};
use tvmon_common::types::EntityKind;

pub const DEFAULT_CHANNEL_LIMIT: usize = 50;
pub const DEFAULT_TUNER_LIMIT: usize = 20;

/// Owns every monitor of one entity kind.
///
/// All mutations take the same lock, so create, remove and lookup are
/// linearizable with respect to each other. No other component keeps a
/// monitor past its removal.
pub struct MonitorRegistry {
    kind: EntityKind,
    limit: usize,
    host: Arc<dyn HostEngine>,
    publisher: Arc<dyn Publisher>,
    monitors: Mutex<HashMap<String, Monitor>>,
}

impl MonitorRegistry {
    pub fn new(
        kind: EntityKind,
        limit: usize,
        host: Arc<dyn HostEngine>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            kind,
            limit,
            host,
            publisher,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        lock_core(&self.monitors).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates, starts and registers a monitor.
    ///
    /// Without an explicit `upstream` the host resolves the entity's
    /// target address and opens the input. Any failure leaves nothing
    /// registered and releases an upstream acquired here.
    pub fn create_and_register(
        &self,
        config: MonitorConfig,
        upstream: Option<UpstreamHandle>,
    ) -> Result<AnalyzerHandle> {
        let mut monitors = lock_core(&self.monitors);
        let name = config.name.clone();

        if monitors.contains_key(&name) {
            return Err(MonitorError::Duplicate(name));
        }
        if monitors.len() >= self.limit {
            tracing::warn!(kind = %self.kind, limit = self.limit, monitor = %name, "Monitor limit reached");
            return Err(MonitorError::Capacity {
                kind: self.kind,
                limit: self.limit,
            });
        }

        let (upstream, acquired) = match upstream {
            Some(upstream) => (upstream, false),
            None => (self.acquire_upstream(&name)?, true),
        };

        let monitor = match self.kind {
            EntityKind::Channel => Monitor::Channel(ChannelMonitor::new(
                config,
                upstream.clone(),
                Arc::clone(&self.host),
                Arc::clone(&self.publisher),
            )),
            EntityKind::Tuner => Monitor::Tuner(TunerMonitor::new(
                config,
                upstream.clone(),
                Arc::clone(&self.host),
                Arc::clone(&self.publisher),
            )),
        };

        match monitor.start() {
            Ok(handle) => {
                monitors.insert(name.clone(), monitor);
                tracing::info!(kind = %self.kind, monitor = %name, count = monitors.len(), "Monitor registered");
                Ok(handle)
            }
            Err(e) => {
                if acquired {
                    self.host.release(&upstream);
                }
                tracing::warn!(kind = %self.kind, monitor = %name, error = %e, "Monitor failed to start");
                Err(e)
            }
        }
    }

    fn acquire_upstream(&self, name: &str) -> Result<UpstreamHandle> {
        let start_error = |e: tvmon_common::host::HostError| MonitorError::Start {
            name: name.to_string(),
            reason: e.to_string(),
        };
        let address = self
            .host
            .resolve_target(self.kind, name)
            .map_err(start_error)?;
        self.host.open_input(name, &address).map_err(start_error)
    }

    /// Kills and unregisters a monitor.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut monitors = lock_core(&self.monitors);
        let monitor = monitors
            .get(name)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
        monitor.kill();
        monitors.remove(name);
        tracing::info!(kind = %self.kind, monitor = %name, count = monitors.len(), "Monitor removed");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<MonitorView> {
        lock_core(&self.monitors).get(name).map(Monitor::view)
    }

    /// All registered monitors, ordered by name.
    pub fn get_all(&self) -> Vec<MonitorView> {
        let mut views: Vec<MonitorView> = lock_core(&self.monitors)
            .values()
            .map(Monitor::view)
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    /// The last snapshot payload pushed for `name`, if any was pushed yet.
    pub fn cached_payload(&self, name: &str) -> Result<Option<String>> {
        self.with_monitor(name, Monitor::cached_payload)
    }

    pub fn psi(&self, name: &str) -> Result<BTreeMap<String, Value>> {
        self.with_monitor(name, Monitor::psi)
    }

    /// Forwards a partial parameter update. A panicking monitor is turned
    /// into [`MonitorError::Internal`] and never unwinds into the caller.
    pub fn update_monitor_parameters(&self, name: &str, params: &Map<String, Value>) -> Result<()> {
        let monitors = lock_core(&self.monitors);
        let monitor = monitors
            .get(name)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
        guard_panic(name, || monitor.update_parameters(params))
    }

    /// Kills `name` now and re-creates it from the same config after
    /// `delay`, resolving a fresh upstream through the host.
    ///
    /// Fails with [`MonitorError::Start`] and leaves the monitor running
    /// when the host has no target for `name` to re-create it from.
    pub fn reboot(self: &Arc<Self>, name: &str, delay: Duration) -> Result<()> {
        let config = self
            .get(name)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?
            .config;
        self.host
            .resolve_target(self.kind, name)
            .map_err(|e| MonitorError::Start {
                name: name.to_string(),
                reason: format!("cannot reboot: {e}"),
            })?;
        self.remove(name)?;

        let registry = Arc::clone(self);
        self.host.schedule_once(
            delay,
            Box::new(move || {
                let name = config.name.clone();
                match registry.create_and_register(config, None) {
                    Ok(_) => tracing::info!(monitor = %name, "Monitor rebooted"),
                    Err(e) => tracing::warn!(monitor = %name, error = %e, "Monitor reboot failed"),
                }
            }),
        );
        Ok(())
    }

    /// Removes `name` after `delay`; a zero delay removes immediately.
    pub fn kill_after(self: &Arc<Self>, name: &str, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return self.remove(name);
        }
        if self.get(name).is_none() {
            return Err(MonitorError::NotFound(name.to_string()));
        }
        let registry = Arc::clone(self);
        let name = name.to_string();
        self.host.schedule_once(
            delay,
            Box::new(move || {
                if let Err(e) = registry.remove(&name) {
                    tracing::warn!(monitor = %name, error = %e, "Scheduled kill failed");
                }
            }),
        );
        Ok(())
    }

    /// Kills every monitor. Used at shutdown.
    pub fn clear(&self) {
        let mut monitors = lock_core(&self.monitors);
        for (_, monitor) in monitors.drain() {
            monitor.kill();
        }
    }

    fn with_monitor<T>(&self, name: &str, f: impl FnOnce(&Monitor) -> T) -> Result<T> {
        lock_core(&self.monitors)
            .get(name)
            .map(f)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))
    }
}

pub(crate) fn guard_panic<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        tracing::error!(monitor = %name, reason = %reason, "Monitor panicked");
        Err(MonitorError::Internal {
            name: name.to_string(),
            reason,
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
