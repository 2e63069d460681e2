//! Ports the reconciliation core calls through.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use driftguard_domain::{AppIdentity, DriftReport, WatchScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
}

/// One watch notification carrying the full current object.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub object: Value,
}

impl ChangeEvent {
    pub fn modified(object: Value) -> Self {
        Self {
            kind: ChangeKind::Modified,
            object,
        }
    }
}

/// A subscription ends normally when the stream finishes (idle timeout) and
/// abnormally when it yields an `Err`.
pub type ChangeStream = BoxStream<'static, Result<ChangeEvent>>;

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, scope: &WatchScope, idle_timeout: Duration) -> Result<ChangeStream>;
}

#[async_trait]
impl<T: ChangeFeed + ?Sized> ChangeFeed for Arc<T> {
    async fn subscribe(&self, scope: &WatchScope, idle_timeout: Duration) -> Result<ChangeStream> {
        (**self).subscribe(scope, idle_timeout).await
    }
}

/// Mutation sent to the Sync Gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Pin the sync to this revision; `None` syncs to the tracked target.
    pub revision: Option<String>,
    pub prune: bool,
    pub force: bool,
}

impl SyncRequest {
    pub fn forced() -> Self {
        Self {
            revision: None,
            prune: true,
            force: true,
        }
    }

    pub fn forced_to(revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..Self::forced()
        }
    }
}

#[async_trait]
pub trait SyncGateway: Send + Sync {
    async fn trigger_sync(&self, app: &AppIdentity, request: &SyncRequest) -> Result<()>;
}

#[async_trait]
impl<T: SyncGateway + ?Sized> SyncGateway for Arc<T> {
    async fn trigger_sync(&self, app: &AppIdentity, request: &SyncRequest) -> Result<()> {
        (**self).trigger_sync(app, request).await
    }
}

/// Audit and notification fan-out. Delivery is at-least-once.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &DriftReport) -> Result<()>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for Arc<T> {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        (**self).deliver(report).await
    }
}
