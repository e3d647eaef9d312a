use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tvmon_common::feed::Feed;
use url::Url;

/// One collector endpoint subscribed to a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub feed: Feed,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl Recipient {
    /// The `http://host:port/path` URL payloads are POSTed to. The host
    /// goes through the URL host parser, so anything that is not a bare
    /// domain or IP address is rejected.
    pub fn url(&self) -> Result<String> {
        let host = self.host.trim();
        if self.port == 0 {
            return Err(NotifyError::InvalidRecipient(format!(
                "port 0 for host '{host}'"
            )));
        }
        // `set_host` would quietly drop a `:port` suffix.
        if host.contains(':') && !host.starts_with('[') {
            return Err(NotifyError::InvalidRecipient(format!(
                "host '{host}' must not carry a port"
            )));
        }
        let mut url = Url::parse("http://localhost/")
            .map_err(|e| NotifyError::InvalidRecipient(e.to_string()))?;
        url.set_host(Some(host)).map_err(|e| {
            NotifyError::InvalidRecipient(format!("host '{host}' for feed '{}': {e}", self.feed))
        })?;
        url.set_port(Some(self.port)).map_err(|()| {
            NotifyError::InvalidRecipient(format!("port {} for host '{host}'", self.port))
        })?;
        url.set_path(self.path.trim());
        Ok(url.to_string())
    }
}

/// Feed → recipient URLs. Feeds without recipients are valid; payloads for
/// them are discarded.
#[derive(Debug, Default)]
pub struct RoutingTable {
    recipients: Vec<Recipient>,
    urls: HashMap<Feed, Vec<String>>,
}

impl RoutingTable {
    /// Builds the table, rejecting it whole if any recipient is malformed.
    pub fn new(recipients: Vec<Recipient>) -> Result<Self> {
        let mut urls: HashMap<Feed, Vec<String>> = HashMap::new();
        for recipient in &recipients {
            if recipient.feed == Feed::Psi {
                tracing::warn!(host = %recipient.host, "Recipient subscribed to the psi feed, which is never published");
            }
            urls.entry(recipient.feed)
                .or_default()
                .push(recipient.url()?);
        }
        Ok(Self { recipients, urls })
    }

    pub fn urls(&self, feed: Feed) -> &[String] {
        self.urls.get(&feed).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}
