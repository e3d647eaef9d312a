use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tvmon_collector::sampler::DEFAULT_CACHE_SECS;
use tvmon_monitor::registry::{DEFAULT_CHANNEL_LIMIT, DEFAULT_TUNER_LIMIT};
use tvmon_notify::Recipient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Pre-shared key expected in the `x-api-key` header. Control routes
    /// are open when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_channel_limit")]
    pub channel_limit: usize,
    #[serde(default = "default_tuner_limit")]
    pub tuner_limit: usize,

    #[serde(default = "default_sampler_cache_secs")]
    pub sampler_cache_secs: u64,

    /// Entity name → input address, e.g. `udp://239.255.1.1:1234`.
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            api_key: None,
            channel_limit: default_channel_limit(),
            tuner_limit: default_tuner_limit(),
            sampler_cache_secs: default_sampler_cache_secs(),
            targets: BTreeMap::new(),
            recipients: Vec::new(),
        }
    }
}

fn default_http_port() -> u16 {
    8000
}

fn default_channel_limit() -> usize {
    DEFAULT_CHANNEL_LIMIT
}

fn default_tuner_limit() -> usize {
    DEFAULT_TUNER_LIMIT
}

fn default_sampler_cache_secs() -> u64 {
    DEFAULT_CACHE_SECS
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{}': {e}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvmon_common::feed::Feed;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.channel_limit, 50);
        assert_eq!(config.tuner_limit, 20);
        assert_eq!(config.sampler_cache_secs, 2);
        assert!(config.api_key.is_none());
        assert!(config.recipients.is_empty());
    }

    #[test]
    fn parses_targets_and_recipients() {
        let config = ServerConfig::parse(
            r#"
            http_port = 9100
            api_key = "s3cret"
            channel_limit = 8

            [targets]
            news = "udp://239.255.1.1:1234"
            a0 = "dvb://adapter0"

            [[recipients]]
            feed = "channels"
            host = "collector"
            port = 7000
            path = "/channels"

            [[recipients]]
            feed = "errors"
            host = "collector"
            port = 7000
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9100);
        assert_eq!(config.api_key.as_deref(), Some("s3cret"));
        assert_eq!(config.channel_limit, 8);
        assert_eq!(config.tuner_limit, 20);
        assert_eq!(config.targets["a0"], "dvb://adapter0");
        assert_eq!(config.recipients.len(), 2);
        assert_eq!(config.recipients[1].feed, Feed::Errors);
        assert_eq!(config.recipients[1].path, "/");
    }

    #[test]
    fn rejects_unknown_feed() {
        let result = ServerConfig::parse(
            r#"
            [[recipients]]
            feed = "metrics"
            host = "collector"
            port = 7000
            "#,
        );
        assert!(result.is_err());
    }
}
