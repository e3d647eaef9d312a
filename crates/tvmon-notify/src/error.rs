/// Errors raised by the outbound delivery path.
///
/// Transport failures never reach the monitor that produced the payload;
/// the publisher logs them and moves on.
///
/// # Examples
///
/// ```rust
/// use tvmon_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidRecipient("empty host".to_string());
/// assert!(err.to_string().contains("empty host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A configured recipient cannot be turned into a request URL.
    #[error("Notify: invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The HTTP client could not be constructed.
    #[error("Notify: HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Delivery to one recipient failed.
    #[error("Notify: delivery to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, NotifyError>;
