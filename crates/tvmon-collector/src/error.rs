use std::path::PathBuf;

/// Errors raised while reading OS counters.
///
/// # Examples
///
/// ```rust
/// use tvmon_collector::CollectorError;
///
/// let err = CollectorError::Parse {
///     path: "/proc/stat".into(),
///     reason: "missing cpu line".to_string(),
/// };
/// assert!(err.to_string().contains("/proc/stat"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("process information unavailable: {0}")]
    Process(String),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
