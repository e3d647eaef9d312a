//! Standalone host engine.
//!
//! When tvmon runs as its own process the stream analyzer lives elsewhere
//! and pushes samples over HTTP. [`LoopbackHost`] keeps track of the
//! inputs monitors have opened and routes ingested samples to the sink
//! attached to each of them.

use crate::config::ServerConfig;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tvmon_common::host::{
    AnalyzerHandle, HostEngine, HostError, SampleSink, SourceInfo, Task, UpstreamHandle,
};
use tvmon_common::types::{EntityKind, Sample};
use tvmon_notify::WebhookPublisher;
use url::Url;

struct Input {
    name: String,
    source: SourceInfo,
    attached: Option<(EntityKind, Arc<dyn SampleSink>)>,
}

pub struct LoopbackHost {
    targets: RwLock<BTreeMap<String, String>>,
    inputs: Mutex<HashMap<u64, Input>>,
    next_id: AtomicU64,
    publisher: Arc<WebhookPublisher>,
    config_path: Option<PathBuf>,
    shutdown: Arc<Notify>,
}

impl LoopbackHost {
    pub fn new(
        targets: BTreeMap<String, String>,
        publisher: Arc<WebhookPublisher>,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            targets: RwLock::new(targets),
            inputs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            publisher,
            config_path,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Completes once [`HostEngine::exit`] has been called.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Hands a sample to the monitor attached to `kind`/`name`.
    pub fn ingest(&self, kind: EntityKind, name: &str, sample: Sample) -> Result<(), HostError> {
        let sink = self
            .lock_inputs()
            .values()
            .filter(|input| input.name == name)
            .find_map(|input| match &input.attached {
                Some((k, sink)) if *k == kind => Some(Arc::clone(sink)),
                _ => None,
            })
            .ok_or_else(|| HostError::TargetNotFound {
                kind,
                name: name.to_string(),
            })?;
        sink.deliver(sample);
        Ok(())
    }

    pub fn input_count(&self) -> usize {
        self.lock_inputs().len()
    }

    pub fn targets(&self) -> BTreeMap<String, String> {
        self.targets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace_targets(&self, targets: BTreeMap<String, String>) {
        *self
            .targets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = targets;
    }

    /// Re-reads the config file and swaps recipients and targets. Running
    /// monitors keep their inputs.
    pub fn reload_config(&self) -> anyhow::Result<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no config file to reload"))?;
        let config = ServerConfig::load(path)?;
        self.publisher.replace_recipients(config.recipients)?;
        let count = config.targets.len();
        self.replace_targets(config.targets);
        tracing::info!(path = %path.display(), targets = count, "Configuration reloaded");
        Ok(())
    }

    fn lock_inputs(&self) -> MutexGuard<'_, HashMap<u64, Input>> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn attach(
        &self,
        kind: EntityKind,
        upstream: &UpstreamHandle,
        sink: Arc<dyn SampleSink>,
    ) -> Result<AnalyzerHandle, HostError> {
        let mut inputs = self.lock_inputs();
        let input = inputs
            .get_mut(&upstream.id)
            .ok_or_else(|| HostError::AnalyzerRejected {
                upstream: upstream.id,
                reason: "input not open".to_string(),
            })?;
        if input.attached.is_some() {
            return Err(HostError::AnalyzerRejected {
                upstream: upstream.id,
                reason: "analyzer already attached".to_string(),
            });
        }
        input.attached = Some((kind, sink));
        Ok(AnalyzerHandle(upstream.id))
    }
}

/// Splits an input address into the format (URL scheme) and the
/// host/port or path part reported as the source.
pub fn parse_source(address: &str) -> Result<SourceInfo, HostError> {
    let url = Url::parse(address).map_err(|e| HostError::InputRejected {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    let location = match (url.host_str().filter(|h| !h.is_empty()), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => url.path().to_string(),
    };
    if location.is_empty() {
        return Err(HostError::InputRejected {
            address: address.to_string(),
            reason: "no host or path".to_string(),
        });
    }
    Ok(SourceInfo {
        format: url.scheme().to_string(),
        address: location,
    })
}

impl HostEngine for LoopbackHost {
    fn resolve_target(&self, kind: EntityKind, name: &str) -> Result<String, HostError> {
        self.targets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::TargetNotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn open_input(&self, name: &str, address: &str) -> Result<UpstreamHandle, HostError> {
        let source = parse_source(address)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock_inputs().insert(
            id,
            Input {
                name: name.to_string(),
                source,
                attached: None,
            },
        );
        tracing::debug!(input = %name, address = %address, id, "Input opened");
        Ok(UpstreamHandle {
            id,
            name: name.to_string(),
            address: address.to_string(),
        })
    }

    fn analyze(
        &self,
        upstream: &UpstreamHandle,
        sink: Arc<dyn SampleSink>,
    ) -> Result<AnalyzerHandle, HostError> {
        self.attach(EntityKind::Channel, upstream, sink)
    }

    fn tune(
        &self,
        upstream: &UpstreamHandle,
        sink: Arc<dyn SampleSink>,
    ) -> Result<AnalyzerHandle, HostError> {
        self.attach(EntityKind::Tuner, upstream, sink)
    }

    fn release(&self, upstream: &UpstreamHandle) {
        if self.lock_inputs().remove(&upstream.id).is_some() {
            tracing::debug!(input = %upstream.name, id = upstream.id, "Input released");
        }
    }

    fn active_source(&self, name: &str) -> Option<SourceInfo> {
        self.lock_inputs()
            .values()
            .find(|input| input.name == name && input.attached.is_some())
            .map(|input| input.source.clone())
    }

    fn schedule_once(&self, delay: Duration, task: Task) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                });
            }
            Err(_) => tracing::warn!(?delay, "No async runtime available, scheduled task dropped"),
        }
    }

    fn reload(&self) {
        if let Err(e) = self.reload_config() {
            tracing::warn!(error = %e, "Configuration reload failed");
        }
    }

    fn exit(&self) {
        tracing::info!("Exit requested");
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink(Mutex<Vec<Sample>>);

    impl SampleSink for CountingSink {
        fn deliver(&self, sample: Sample) {
            self.0.lock().unwrap().push(sample);
        }
    }

    fn host(targets: &[(&str, &str)]) -> LoopbackHost {
        let targets = targets
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoopbackHost::new(targets, Arc::new(WebhookPublisher::new(vec![]).unwrap()), None)
    }

    #[test]
    fn source_format_comes_from_scheme() {
        let source = parse_source("udp://239.255.1.1:1234").unwrap();
        assert_eq!(source.format, "udp");
        assert_eq!(source.address, "239.255.1.1:1234");

        let source = parse_source("file:///srv/media/loop.ts").unwrap();
        assert_eq!(source.format, "file");
        assert_eq!(source.address, "/srv/media/loop.ts");

        assert!(parse_source("not a url").is_err());
    }

    #[test]
    fn resolves_configured_targets_only() {
        let host = host(&[("news", "udp://239.255.1.1:1234")]);
        assert_eq!(
            host.resolve_target(EntityKind::Channel, "news").unwrap(),
            "udp://239.255.1.1:1234"
        );
        assert!(matches!(
            host.resolve_target(EntityKind::Channel, "sport"),
            Err(HostError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn ingest_reaches_attached_sink_of_matching_kind() {
        let host = host(&[]);
        let upstream = host.open_input("news", "udp://239.255.1.1:1234").unwrap();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        host.analyze(&upstream, sink.clone()).unwrap();

        let sample = Sample::Error {
            message: "no data".to_string(),
        };
        host.ingest(EntityKind::Channel, "news", sample.clone()).unwrap();
        assert!(host.ingest(EntityKind::Tuner, "news", sample).is_err());
        assert_eq!(sink.0.lock().unwrap().len(), 1);
        assert_eq!(host.active_source("news").unwrap().format, "udp");
    }

    #[test]
    fn second_analyzer_on_same_input_is_rejected() {
        let host = host(&[]);
        let upstream = host.open_input("a0", "dvb://adapter0").unwrap();
        let sink: Arc<dyn SampleSink> = Arc::new(CountingSink(Mutex::new(Vec::new())));
        host.tune(&upstream, Arc::clone(&sink)).unwrap();
        assert!(host.tune(&upstream, sink).is_err());
    }

    #[test]
    fn release_forgets_input() {
        let host = host(&[]);
        let upstream = host.open_input("news", "udp://239.255.1.1:1234").unwrap();
        assert_eq!(host.input_count(), 1);
        host.release(&upstream);
        host.release(&upstream);
        assert_eq!(host.input_count(), 0);
        assert!(host.active_source("news").is_none());
    }

    #[test]
    fn reload_without_config_file_fails() {
        let host = host(&[]);
        assert!(host.reload_config().is_err());
    }
}
