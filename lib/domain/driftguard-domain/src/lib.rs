//! Domain models and invariants.

pub mod config;
pub mod handoff;
pub mod policy;
pub mod report;
pub mod severity;
pub mod snapshot;

pub use config::{
    AuditConfig, ClusterConfig, ClusterMode, ConfigError, ControllerConfig, HandoffConfig,
    HealthConfig, NotificationsConfig, NtfyConfig, WatchConfig, WatchScope,
};
pub use handoff::HandoffDocument;
pub use policy::{PolicyConstraint, PolicyTable, RemediationAction, RemediationPolicy};
pub use report::{AffectedResource, DriftReport, RemediationOutcome};
pub use severity::{RiskScore, SeverityLevel};
pub use snapshot::{
    AppIdentity, ApplicationSnapshot, HealthStatus, ResourceStatus, ResourceSyncState,
    RevisionRecord, SyncStatus,
};
