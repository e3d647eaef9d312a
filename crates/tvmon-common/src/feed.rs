use serde::{Deserialize, Serialize};

/// Outbound collector feed. Recipients are configured per feed.
///
/// # Examples
///
/// ```
/// use tvmon_common::feed::Feed;
///
/// let feed: Feed = "dvb".parse().unwrap();
/// assert_eq!(feed, Feed::Dvb);
/// assert_eq!(Feed::Channels.to_string(), "channels");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Channels,
    Analyze,
    Errors,
    Dvb,
    /// Accepted in recipient configs for compatibility only. PSI tables are
    /// cached per monitor and served over HTTP; nothing is published here.
    Psi,
}

impl Feed {
    pub const ALL: [Feed; 5] = [
        Feed::Channels,
        Feed::Analyze,
        Feed::Errors,
        Feed::Dvb,
        Feed::Psi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Channels => "channels",
            Feed::Analyze => "analyze",
            Feed::Errors => "errors",
            Feed::Dvb => "dvb",
            Feed::Psi => "psi",
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feed::ALL
            .into_iter()
            .find(|f| f.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown feed: {s}"))
    }
}

/// Delivers serialized payloads to the collectors configured for a feed.
///
/// Delivery is fire-and-forget: implementations must not block the caller
/// on I/O, must not retry, and report failures only through logging.
pub trait Publisher: Send + Sync {
    fn publish(&self, feed: Feed, payload: String);
}
