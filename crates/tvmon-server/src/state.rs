use crate::config::ServerConfig;
use crate::host::LoopbackHost;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tvmon_collector::{CounterSource, ResourceSampler};
use tvmon_common::feed::Publisher;
use tvmon_common::host::HostEngine;
use tvmon_common::types::EntityKind;
use tvmon_monitor::registry::MonitorRegistry;
use tvmon_notify::WebhookPublisher;

#[derive(Clone)]
pub struct AppState {
    pub channels: Arc<MonitorRegistry>,
    pub tuners: Arc<MonitorRegistry>,
    pub sampler: Arc<Mutex<ResourceSampler>>,
    pub publisher: Arc<WebhookPublisher>,
    pub host: Arc<LoopbackHost>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires publisher, host, registries and sampler from `config`.
    /// `config_path` is what `reload` re-reads.
    pub fn new(
        config: ServerConfig,
        config_path: Option<PathBuf>,
        source: Box<dyn CounterSource>,
    ) -> anyhow::Result<Self> {
        let publisher = Arc::new(WebhookPublisher::new(config.recipients.clone())?);
        let host = Arc::new(LoopbackHost::new(
            config.targets.clone(),
            Arc::clone(&publisher),
            config_path,
        ));

        let engine: Arc<dyn HostEngine> = host.clone();
        let sink: Arc<dyn Publisher> = publisher.clone();
        let channels = Arc::new(MonitorRegistry::new(
            EntityKind::Channel,
            config.channel_limit,
            Arc::clone(&engine),
            Arc::clone(&sink),
        ));
        let tuners = Arc::new(MonitorRegistry::new(
            EntityKind::Tuner,
            config.tuner_limit,
            engine,
            sink,
        ));
        let sampler = Arc::new(Mutex::new(ResourceSampler::new(
            source,
            config.sampler_cache_secs,
        )));

        Ok(Self {
            channels,
            tuners,
            sampler,
            publisher,
            host,
            start_time: Utc::now(),
            config: Arc::new(config),
        })
    }

    pub fn registry(&self, kind: EntityKind) -> &Arc<MonitorRegistry> {
        match kind {
            EntityKind::Channel => &self.channels,
            EntityKind::Tuner => &self.tuners,
        }
    }

    pub fn sampler(&self) -> MutexGuard<'_, ResourceSampler> {
        self.sampler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
