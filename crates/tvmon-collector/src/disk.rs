use crate::memory::percent;
use serde::Serialize;

/// Space usage of one mounted filesystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub mount: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub usage_percent: f64,
}

impl DiskUsage {
    pub fn new(mount: impl Into<String>, total_bytes: u64, available_bytes: u64) -> Self {
        let used = total_bytes.saturating_sub(available_bytes);
        Self {
            mount: mount.into(),
            total_bytes,
            available_bytes,
            usage_percent: percent(used, total_bytes),
        }
    }
}
