use crate::cpu::{CpuTracker, ProcessCpuTracker};
use crate::disk::DiskUsage;
use crate::error::Result;
use crate::memory::{percent, MemoryUsage};
use crate::network::{InterfaceRate, NetworkTracker};
use crate::source::CounterSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_CACHE_SECS: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub timestamp: DateTime<Utc>,
    /// System-wide CPU utilisation since the previous computation.
    pub usage_percent: f64,
    pub cores: usize,
    pub memory: MemoryUsage,
    pub disks: Vec<DiskUsage>,
    pub network: Vec<InterfaceRate>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub timestamp: DateTime<Utc>,
    pub pid: u32,
    /// Multi-core utilisation: one fully busy core reads 100.
    pub usage_percent: f64,
    pub cores: usize,
    pub rss_bytes: u64,
    /// Resident set size as a share of total memory, when known.
    pub memory_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerStats {
    pub collections: u64,
    pub cache_interval_secs: u64,
    pub since: DateTime<Utc>,
}

struct Cached<T> {
    at: Instant,
    value: T,
}

impl<T: Clone> Cached<T> {
    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.at.elapsed() < ttl).then(|| self.value.clone())
    }
}

/// Derives resource snapshots from a [`CounterSource`].
///
/// Each `collect_*` call returns the cached snapshot while it is younger
/// than the cache interval; otherwise it reads the source, computes deltas
/// against the previous reading and refreshes the cache.
pub struct ResourceSampler {
    source: Box<dyn CounterSource>,
    cache_interval: Duration,
    system_cache: Option<Cached<SystemSnapshot>>,
    process_cache: Option<Cached<ProcessSnapshot>>,
    cpu: CpuTracker,
    process_cpu: ProcessCpuTracker,
    network: NetworkTracker,
    memory_total: Option<u64>,
    collections: u64,
    since: DateTime<Utc>,
}

impl ResourceSampler {
    pub fn new(source: Box<dyn CounterSource>, cache_secs: u64) -> Self {
        Self {
            source,
            cache_interval: Duration::from_secs(cache_secs),
            system_cache: None,
            process_cache: None,
            cpu: CpuTracker::default(),
            process_cpu: ProcessCpuTracker::default(),
            network: NetworkTracker::default(),
            memory_total: None,
            collections: 0,
            since: Utc::now(),
        }
    }

    pub fn collect_system(&mut self) -> Result<SystemSnapshot> {
        if let Some(hit) = self
            .system_cache
            .as_ref()
            .and_then(|c| c.fresh(self.cache_interval))
        {
            return Ok(hit);
        }

        let counters = self.source.read_system()?;
        let now = Instant::now();
        self.memory_total = Some(counters.memory_total);
        let snapshot = SystemSnapshot {
            timestamp: Utc::now(),
            usage_percent: self.cpu.update(counters.cpu),
            cores: counters.cores,
            memory: MemoryUsage::new(counters.memory_total, counters.memory_used),
            disks: counters.disks,
            network: self.network.update(now, &counters.interfaces),
            uptime_secs: counters.uptime_secs,
        };
        self.collections += 1;
        tracing::debug!(
            source = self.source.name(),
            cpu = snapshot.usage_percent,
            interfaces = self.network.tracked(),
            "System snapshot computed"
        );
        self.system_cache = Some(Cached {
            at: now,
            value: snapshot.clone(),
        });
        Ok(snapshot)
    }

    pub fn collect_process(&mut self) -> Result<ProcessSnapshot> {
        if let Some(hit) = self
            .process_cache
            .as_ref()
            .and_then(|c| c.fresh(self.cache_interval))
        {
            return Ok(hit);
        }

        let counters = self.source.read_process()?;
        let snapshot = ProcessSnapshot {
            timestamp: Utc::now(),
            pid: counters.pid,
            usage_percent: self.process_cpu.update(
                counters.ticks,
                counters.system_total,
                counters.cores,
            ),
            cores: counters.cores,
            rss_bytes: counters.rss_bytes,
            memory_percent: self
                .memory_total
                .map(|total| percent(counters.rss_bytes, total)),
        };
        self.collections += 1;
        self.process_cache = Some(Cached {
            at: Instant::now(),
            value: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Drops both cached snapshots and restarts the statistics window. CPU
    /// and network baselines are kept.
    pub fn clear_cache(&mut self) {
        self.system_cache = None;
        self.process_cache = None;
        self.collections = 0;
        self.since = Utc::now();
    }

    pub fn set_cache_interval(&mut self, secs: u64) {
        self.cache_interval = Duration::from_secs(secs);
        tracing::info!(secs, "Sampler cache interval changed");
    }

    pub fn get_stats(&self) -> SamplerStats {
        SamplerStats {
            collections: self.collections,
            cache_interval_secs: self.cache_interval.as_secs(),
            since: self.since,
        }
    }
}
