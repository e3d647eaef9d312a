use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of entity a monitor watches.
///
/// # Examples
///
/// ```
/// use tvmon_common::types::EntityKind;
///
/// let kind: EntityKind = "tuner".parse().unwrap();
/// assert_eq!(kind, EntityKind::Tuner);
/// assert_eq!(kind.to_string(), "tuner");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Channel,
    Tuner,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Channel => write!(f, "channel"),
            EntityKind::Tuner => write!(f, "tuner"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(EntityKind::Channel),
            "tuner" | "dvb" => Ok(EntityKind::Tuner),
            _ => Err(format!("unknown entity kind: {s}")),
        }
    }
}

/// One callback invocation from the host's stream analyzer or tuner
/// frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Sample {
    /// The analyzer or input reported an error condition.
    Error { message: String },
    /// A PSI table (PAT, PMT, SDT, ...) decoded from the stream.
    Psi { psi: String, data: Value },
    /// Periodic stream totals, optionally with per-PID detail.
    Total {
        total: TotalStats,
        #[serde(default)]
        on_air: bool,
        #[serde(default)]
        analyze: Vec<PidStats>,
    },
    /// DVB frontend status report.
    Frontend(FrontendStatus),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalStats {
    /// Stream bitrate in Kbit/s.
    pub bitrate: u64,
    /// CC errors observed since the previous sample.
    #[serde(default)]
    pub cc_errors: u64,
    /// PES errors observed since the previous sample.
    #[serde(default)]
    pub pes_errors: u64,
    #[serde(default)]
    pub scrambled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PidStats {
    pub pid: u16,
    #[serde(default)]
    pub bitrate: u64,
    #[serde(default)]
    pub cc_error: u64,
    #[serde(default)]
    pub pes_error: u64,
    #[serde(default)]
    pub sc_error: u64,
}

impl PidStats {
    pub fn has_errors(&self) -> bool {
        self.cc_error > 0 || self.pes_error > 0 || self.sc_error > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontendStatus {
    #[serde(default)]
    pub lock: bool,
    /// Signal strength, percent.
    #[serde(default)]
    pub signal: i32,
    /// Signal-to-noise ratio, percent.
    #[serde(default)]
    pub snr: i32,
    #[serde(default)]
    pub ber: i64,
    /// Uncorrected blocks.
    #[serde(default)]
    pub unc: i64,
}

/// Last emitted state of a channel.
///
/// Fields start at the "unknown" sentinels (`-1` / `false`) and are
/// overwritten wholesale on each emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub ready: bool,
    pub scrambled: bool,
    pub bitrate: i64,
    pub cc_error: u64,
    pub pes_error: u64,
    pub format: Option<String>,
    pub source: Option<String>,
}

impl Default for ChannelSnapshot {
    fn default() -> Self {
        Self {
            ready: false,
            scrambled: false,
            bitrate: -1,
            cc_error: 0,
            pes_error: 0,
            format: None,
            source: None,
        }
    }
}

/// Last emitted state of a DVB tuner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerSnapshot {
    pub lock: bool,
    pub signal: i32,
    pub snr: i32,
    pub ber: i64,
    pub unc: i64,
    pub format: Option<String>,
    pub source: Option<String>,
}

impl Default for TunerSnapshot {
    fn default() -> Self {
        Self {
            lock: false,
            signal: -1,
            snr: -1,
            ber: -1,
            unc: -1,
            format: None,
            source: None,
        }
    }
}
