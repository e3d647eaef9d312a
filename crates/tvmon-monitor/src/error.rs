use crate::params::ValidationError;
use tvmon_common::types::EntityKind;

/// Errors returned by monitor and registry operations. All of them are
/// local to the operation that produced them.
///
/// # Examples
///
/// ```rust
/// use tvmon_monitor::error::MonitorError;
///
/// let err = MonitorError::NotFound("news-hd".to_string());
/// assert!(err.to_string().contains("news-hd"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A parameter failed schema validation; nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("monitor '{0}' not found")]
    NotFound(String),

    #[error("{kind} monitor limit reached ({limit})")]
    Capacity { kind: EntityKind, limit: usize },

    #[error("monitor '{0}' already exists")]
    Duplicate(String),

    /// Upstream acquisition, analyzer attachment, or policy selection
    /// failed while starting a monitor.
    #[error("failed to start monitor '{name}': {reason}")]
    Start { name: String, reason: String },

    /// A monitor panicked while handling a request.
    #[error("internal error in monitor '{name}': {reason}")]
    Internal { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MonitorError>;
