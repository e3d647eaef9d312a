use crate::cpu::{parse_cpu_count, parse_process_ticks, parse_proc_stat, CpuTicks};
use crate::disk::DiskUsage;
use crate::error::{CollectorError, Result};
use crate::network::InterfaceBytes;
use std::collections::BTreeMap;
use std::path::Path;
use sysinfo::{Disks, Networks, Pid, System};

/// Raw system-wide readings. Everything cumulative stays cumulative here;
/// deltas are the sampler's job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemCounters {
    pub cpu: CpuTicks,
    pub cores: usize,
    pub memory_total: u64,
    pub memory_used: u64,
    pub disks: Vec<DiskUsage>,
    pub interfaces: BTreeMap<String, InterfaceBytes>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessCounters {
    pub pid: u32,
    /// utime + stime of this process.
    pub ticks: u64,
    /// System-wide total ticks read alongside `ticks`, summed over
    /// `cores` CPUs.
    pub system_total: u64,
    pub cores: usize,
    pub rss_bytes: u64,
}

/// A source of raw OS counters.
///
/// The production source reads procfs and `sysinfo`; tests script their
/// own readings.
pub trait CounterSource: Send {
    /// Source name used in logs.
    fn name(&self) -> &str;

    fn read_system(&mut self) -> Result<SystemCounters>;

    fn read_process(&mut self) -> Result<ProcessCounters>;
}

/// Reads `/proc/stat` and `/proc/self/stat` for CPU ticks and `sysinfo`
/// for memory, disks and interfaces. Linux only.
pub struct ProcfsSource {
    system: System,
    disks: Disks,
    networks: Networks,
    pid: Option<Pid>,
}

impl ProcfsSource {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot determine own pid");
                None
            }
        };
        Self {
            system: System::new(),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            pid,
        }
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CollectorError::Read {
        path: Path::new(path).to_path_buf(),
        source,
    })
}

/// Aggregate ticks and the number of CPUs they were summed over, from one
/// read of `/proc/stat`.
fn read_proc_stat() -> Result<(CpuTicks, usize)> {
    let stat = read_file("/proc/stat")?;
    Ok((parse_proc_stat(&stat)?, parse_cpu_count(&stat)))
}

impl CounterSource for ProcfsSource {
    fn name(&self) -> &str {
        "procfs"
    }

    fn read_system(&mut self) -> Result<SystemCounters> {
        let (cpu, cores) = read_proc_stat()?;

        self.system.refresh_memory();
        self.disks.refresh();
        self.networks.refresh();

        let disks = self
            .disks
            .list()
            .iter()
            .map(|disk| {
                DiskUsage::new(
                    disk.mount_point().to_string_lossy(),
                    disk.total_space(),
                    disk.available_space(),
                )
            })
            .collect();
        let interfaces = self
            .networks
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    InterfaceBytes {
                        received: data.total_received(),
                        transmitted: data.total_transmitted(),
                    },
                )
            })
            .collect();

        Ok(SystemCounters {
            cpu,
            cores,
            memory_total: self.system.total_memory(),
            memory_used: self.system.used_memory(),
            disks,
            interfaces,
            uptime_secs: System::uptime(),
        })
    }

    fn read_process(&mut self) -> Result<ProcessCounters> {
        let pid = self
            .pid
            .ok_or_else(|| CollectorError::Process("own pid unknown".to_string()))?;
        let (system, cores) = read_proc_stat()?;
        let ticks = parse_process_ticks(&read_file("/proc/self/stat")?)?;

        self.system.refresh_process(pid);
        let rss_bytes = self
            .system
            .process(pid)
            .map(|p| p.memory())
            .ok_or_else(|| CollectorError::Process(format!("pid {pid} not found")))?;

        Ok(ProcessCounters {
            pid: pid.as_u32(),
            ticks,
            system_total: system.total,
            cores,
            rss_bytes,
        })
    }
}
