use crate::error::{NotifyError, Result};
use crate::routing::{Recipient, RoutingTable};
use crate::utils::{truncate_string, MAX_LOGGED_PAYLOAD};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tvmon_common::feed::{Feed, Publisher};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget HTTP publisher.
///
/// [`publish`](Publisher::publish) returns immediately: each POST runs as
/// a task on the current tokio runtime, is attempted once, and failures
/// are only logged.
pub struct WebhookPublisher {
    client: reqwest::Client,
    routes: RwLock<Arc<RoutingTable>>,
}

impl WebhookPublisher {
    pub fn new(recipients: Vec<Recipient>) -> Result<Self> {
        Self::with_timeout(recipients, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(recipients: Vec<Recipient>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            routes: RwLock::new(Arc::new(RoutingTable::new(recipients)?)),
        })
    }

    /// Swaps the routing table. On error the current table stays in place.
    pub fn replace_recipients(&self, recipients: Vec<Recipient>) -> Result<()> {
        let table = Arc::new(RoutingTable::new(recipients)?);
        tracing::info!(recipients = table.len(), "Publisher recipients replaced");
        *self
            .routes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = table;
        Ok(())
    }

    pub fn routes(&self) -> Arc<RoutingTable> {
        Arc::clone(
            &self
                .routes
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl Publisher for WebhookPublisher {
    fn publish(&self, feed: Feed, payload: String) {
        let routes = self.routes();
        let urls = routes.urls(feed);
        if urls.is_empty() {
            tracing::debug!(
                feed = %feed,
                payload = %truncate_string(&payload, MAX_LOGGED_PAYLOAD),
                "No recipients, payload discarded"
            );
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(feed = %feed, "No async runtime available, payload dropped");
            return;
        };
        for url in urls {
            let client = self.client.clone();
            let url = url.clone();
            let payload = payload.clone();
            handle.spawn(async move {
                if let Err(e) = deliver(&client, &url, payload).await {
                    tracing::warn!(feed = %feed, error = %e, "Payload delivery failed");
                }
            });
        }
    }
}

/// POSTs one JSON payload. Non-2xx responses count as failures.
pub(crate) async fn deliver(client: &reqwest::Client, url: &str, payload: String) -> Result<()> {
    let transport = |reason: String| NotifyError::Transport {
        url: url.to_string(),
        reason,
    };
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await
        .map_err(|e| transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(transport(format!(
            "HTTP {status}: {}",
            truncate_string(&body, MAX_LOGGED_PAYLOAD)
        )));
    }
    tracing::trace!(url = %url, status = %status, "Payload delivered");
    Ok(())
}
