//! Interface to the host media engine.
//!
//! The monitoring core never reaches for ambient host globals; every
//! interaction (input acquisition, analyzer attachment, teardown, timers)
//! goes through a [`HostEngine`] handed to it at construction.

use crate::types::{EntityKind, Sample};
use std::sync::Arc;
use std::time::Duration;

/// An input opened by the host engine. The host owns the underlying
/// resource; holders keep the handle only to release it on teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamHandle {
    pub id: u64,
    pub name: String,
    pub address: String,
}

/// Identifies an analyzer (or tuner frontend) callback registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerHandle(pub u64);

/// The source an entity is currently consuming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub format: String,
    pub address: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no monitoring target configured for {kind} '{name}'")]
    TargetNotFound { kind: EntityKind, name: String },

    #[error("input '{address}' rejected: {reason}")]
    InputRejected { address: String, reason: String },

    #[error("analyzer rejected upstream {upstream}: {reason}")]
    AnalyzerRejected { upstream: u64, reason: String },
}

/// Receives samples from the host analyzer for one monitored entity.
///
/// The host calls [`deliver`](SampleSink::deliver) once per sample, in
/// arrival order, until the upstream is released.
pub trait SampleSink: Send + Sync {
    fn deliver(&self, sample: Sample);
}

/// A deferred unit of work for [`HostEngine::schedule_once`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait HostEngine: Send + Sync {
    /// Resolves the input address to monitor for the named entity.
    fn resolve_target(&self, kind: EntityKind, name: &str) -> Result<String, HostError>;

    /// Opens an input and returns a consumable upstream handle.
    fn open_input(&self, name: &str, address: &str) -> Result<UpstreamHandle, HostError>;

    /// Attaches a stream analyzer to `upstream`; samples flow into `sink`.
    fn analyze(
        &self,
        upstream: &UpstreamHandle,
        sink: Arc<dyn SampleSink>,
    ) -> Result<AnalyzerHandle, HostError>;

    /// Attaches a tuner frontend status callback to `upstream`.
    fn tune(
        &self,
        upstream: &UpstreamHandle,
        sink: Arc<dyn SampleSink>,
    ) -> Result<AnalyzerHandle, HostError>;

    /// Releases an upstream and any analyzer attached to it. Releasing an
    /// unknown handle is a no-op.
    fn release(&self, upstream: &UpstreamHandle);

    /// The source the named entity is currently consuming, if any.
    fn active_source(&self, name: &str) -> Option<SourceInfo>;

    /// Runs `task` once after `delay`. There is no cancellation.
    fn schedule_once(&self, delay: Duration, task: Task);

    fn reload(&self);

    fn exit(&self);
}
