//! Shared data model for the tvmon telemetry sidecar.
//!
//! Samples delivered by the host's stream analyzer, the snapshots monitors
//! emit, the outbound feed names, and the collaborator traits
//! ([`host::HostEngine`], [`host::SampleSink`], [`feed::Publisher`]) that
//! decouple the monitoring core from the host engine and the transport.

pub mod feed;
pub mod host;
pub mod types;
