//! CPU tick parsing and delta-based utilisation.

use crate::error::{CollectorError, Result};
use std::path::Path;

/// Cumulative system-wide CPU ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    /// user + nice + system + idle + iowait + irq + softirq + steal
    pub total: u64,
    /// `total` minus idle and iowait.
    pub active: u64,
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// # Examples
///
/// ```
/// use tvmon_collector::cpu::parse_proc_stat;
///
/// let ticks = parse_proc_stat("cpu  10 0 5 80 5 0 0 0 0 0\ncpu0 1 0 1 1 1 0 0 0\n").unwrap();
/// assert_eq!(ticks.total, 100);
/// assert_eq!(ticks.active, 15);
/// ```
pub fn parse_proc_stat(content: &str) -> Result<CpuTicks> {
    let parse_error = |reason: &str| CollectorError::Parse {
        path: Path::new("/proc/stat").to_path_buf(),
        reason: reason.to_string(),
    };
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| parse_error("missing aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| parse_error(&e.to_string()))?;
    if fields.len() < 5 {
        return Err(parse_error("too few cpu fields"));
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields[4];
    Ok(CpuTicks {
        total,
        active: total.saturating_sub(idle),
    })
}

/// Number of per-CPU `cpuN` lines in `/proc/stat`: the CPUs whose ticks
/// make up the aggregate line. At least 1.
///
/// # Examples
///
/// ```
/// use tvmon_collector::cpu::parse_cpu_count;
///
/// let stat = "cpu  4 0 0 4 0 0 0 0\ncpu0 2 0 0 2 0 0 0 0\ncpu1 2 0 0 2 0 0 0 0\nintr 0\n";
/// assert_eq!(parse_cpu_count(stat), 2);
/// ```
pub fn parse_cpu_count(content: &str) -> usize {
    content
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .filter(|tag| {
            tag.strip_prefix("cpu")
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        })
        .count()
        .max(1)
}

/// Parses utime + stime from a `/proc/<pid>/stat` line.
///
/// The command name may itself contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_process_ticks(content: &str) -> Result<u64> {
    let parse_error = |reason: &str| CollectorError::Parse {
        path: Path::new("/proc/self/stat").to_path_buf(),
        reason: reason.to_string(),
    };
    let rest = content
        .rfind(')')
        .map(|i| &content[i + 1..])
        .ok_or_else(|| parse_error("missing command name"))?;
    // Field 3 (state) is the first one after the command name.
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let tick = |idx: usize| -> Result<u64> {
        fields
            .get(idx)
            .ok_or_else(|| parse_error("too few fields"))?
            .parse::<u64>()
            .map_err(|e| parse_error(&e.to_string()))
    };
    Ok(tick(11)? + tick(12)?)
}

/// Percentage of `Δactive / Δtotal`. Zero when the window is empty or the
/// counters went backwards.
pub fn usage_percent(prev: CpuTicks, current: CpuTicks) -> f64 {
    let delta_total = current.total as i128 - prev.total as i128;
    if delta_total <= 0 {
        return 0.0;
    }
    let delta_active = (current.active as i128 - prev.active as i128).max(0);
    (100.0 * delta_active as f64 / delta_total as f64).clamp(0.0, 100.0)
}

/// System CPU utilisation between successive readings.
#[derive(Debug, Default)]
pub struct CpuTracker {
    prev: Option<CpuTicks>,
}

impl CpuTracker {
    /// Records `current` and returns the utilisation since the previous
    /// reading, or 0 when there is no baseline yet.
    pub fn update(&mut self, current: CpuTicks) -> f64 {
        let usage = self
            .prev
            .map(|prev| usage_percent(prev, current))
            .unwrap_or(0.0);
        self.prev = Some(current);
        usage
    }
}

/// Utilisation of this process, normalised against the system-wide tick
/// delta and scaled by core count (one fully busy core reads 100%).
#[derive(Debug, Default)]
pub struct ProcessCpuTracker {
    prev: Option<(u64, u64)>,
}

impl ProcessCpuTracker {
    pub fn update(&mut self, process_ticks: u64, system_total: u64, cores: usize) -> f64 {
        let usage = match self.prev {
            Some((prev_proc, prev_total)) if system_total > prev_total => {
                let delta_proc = process_ticks.saturating_sub(prev_proc) as f64;
                let delta_total = (system_total - prev_total) as f64;
                (100.0 * delta_proc / delta_total * cores.max(1) as f64).max(0.0)
            }
            _ => 0.0,
        };
        self.prev = Some((process_ticks, system_total));
        usage
    }
}
