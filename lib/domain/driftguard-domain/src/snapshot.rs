//! Typed view of one watched Application.
//!
//! Watch payloads arrive untyped. [`ApplicationSnapshot::from_object`] reads
//! them field by field with explicit defaults so that a malformed object still
//! yields a snapshot instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const SEVERITY_LABEL: &str = "drift-severity";
pub const CRITICALITY_LABEL: &str = "criticality";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppIdentity {
    pub name: String,
    pub namespace: String,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// A mutation can only target an object that has a name.
    pub fn is_addressable(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Synced,
    OutOfSync,
    Unknown,
}

impl SyncStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Synced") => SyncStatus::Synced,
            Some("OutOfSync") => SyncStatus::OutOfSync,
            _ => SyncStatus::Unknown,
        }
    }

    /// Reads `status.sync.status` without building a full snapshot.
    pub fn of_object(object: &Value) -> Self {
        Self::parse(str_at(object, &["status", "sync", "status"]))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unknown,
}

impl HealthStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Healthy") => HealthStatus::Healthy,
            Some("Degraded") => HealthStatus::Degraded,
            _ => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceSyncState {
    Synced,
    OutOfSync,
    Degraded,
    Missing,
    Unknown,
}

impl ResourceSyncState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Synced") => ResourceSyncState::Synced,
            Some("OutOfSync") => ResourceSyncState::OutOfSync,
            Some("Degraded") => ResourceSyncState::Degraded,
            Some("Missing") => ResourceSyncState::Missing,
            _ => ResourceSyncState::Unknown,
        }
    }

    pub const fn is_affected(self) -> bool {
        matches!(
            self,
            ResourceSyncState::OutOfSync | ResourceSyncState::Degraded | ResourceSyncState::Missing
        )
    }
}

impl fmt::Display for ResourceSyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub status: ResourceSyncState,
}

impl ResourceStatus {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
        status: ResourceSyncState,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
            status,
        }
    }

    // Argo CD reports sync state in `status` and liveness in `health.status`;
    // a synced resource with a degraded or missing health is still affected.
    fn from_entry(entry: &Value) -> Self {
        let synced = ResourceSyncState::parse(str_at(entry, &["status"]));
        let health = ResourceSyncState::parse(str_at(entry, &["health", "status"]));
        let status = match (synced, health) {
            (
                ResourceSyncState::Synced | ResourceSyncState::Unknown,
                ResourceSyncState::Degraded | ResourceSyncState::Missing,
            ) => health,
            _ => synced,
        };
        Self {
            kind: string_at(entry, &["kind"]),
            name: str_at(entry, &["name"]).unwrap_or("unknown").to_string(),
            namespace: string_at(entry, &["namespace"]),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub revision: String,
    pub deployed_at: Option<String>,
    pub id: Option<i64>,
}

impl RevisionRecord {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            deployed_at: None,
            id: None,
        }
    }

    // Multi-source applications record `revisions` instead of `revision`.
    fn from_entry(entry: &Value) -> Option<Self> {
        let revision = str_at(entry, &["revision"])
            .or_else(|| {
                entry
                    .get("revisions")
                    .and_then(Value::as_array)
                    .and_then(|revisions| revisions.first())
                    .and_then(Value::as_str)
            })
            .filter(|revision| !revision.is_empty())?;
        Some(Self {
            revision: revision.to_string(),
            deployed_at: str_at(entry, &["deployedAt"]).map(str::to_string),
            id: entry.get("id").and_then(Value::as_i64),
        })
    }
}

/// Drift-relevant state of one Application, built fresh per watch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub identity: AppIdentity,
    pub destination_namespace: String,
    pub labels: BTreeMap<String, String>,
    pub sync_status: SyncStatus,
    pub health_status: HealthStatus,
    pub resources: Vec<ResourceStatus>,
    /// Oldest first.
    pub history: Vec<RevisionRecord>,
}

impl ApplicationSnapshot {
    /// Total: missing or mistyped fields fall back to `Unknown`, empty strings
    /// or empty collections. History entries without a revision are dropped.
    pub fn from_object(object: &Value) -> Self {
        let labels = object
            .pointer("/metadata/labels")
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|value| (key.clone(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let resources = array_at(object, &["status", "resources"])
            .iter()
            .map(ResourceStatus::from_entry)
            .collect();

        let history = array_at(object, &["status", "history"])
            .iter()
            .filter_map(RevisionRecord::from_entry)
            .collect();

        Self {
            identity: AppIdentity {
                name: string_at(object, &["metadata", "name"]),
                namespace: string_at(object, &["metadata", "namespace"]),
            },
            destination_namespace: string_at(object, &["spec", "destination", "namespace"]),
            labels,
            sync_status: SyncStatus::of_object(object),
            health_status: HealthStatus::parse(str_at(object, &["status", "health", "status"])),
            resources,
            history,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// The last known-good revision before the current one.
    pub fn rollback_target(&self) -> Option<&RevisionRecord> {
        let len = self.history.len();
        if len < 2 {
            return None;
        }
        self.history.get(len - 2)
    }
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.get(*segment))
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(value, path).and_then(Value::as_str)
}

fn string_at(value: &Value, path: &[&str]) -> String {
    str_at(value, path).unwrap_or_default().to_string()
}

fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    value_at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn application() -> Value {
        json!({
            "metadata": {
                "name": "payments",
                "namespace": "argocd",
                "labels": { "criticality": "high", "team": "core" }
            },
            "spec": { "destination": { "namespace": "prod-payments" } },
            "status": {
                "sync": { "status": "OutOfSync" },
                "health": { "status": "Degraded" },
                "resources": [
                    { "kind": "Secret", "name": "db", "namespace": "prod-payments", "status": "OutOfSync" },
                    { "kind": "Deployment", "name": "api", "status": "Synced", "health": { "status": "Missing" } }
                ],
                "history": [
                    { "id": 1, "revision": "aaa", "deployedAt": "2024-01-01T00:00:00Z" },
                    { "id": 2, "revision": "bbb" },
                    { "id": 3, "revision": "ccc" }
                ]
            }
        })
    }

    #[test]
    fn test_from_object_reads_all_fields() {
        let snapshot = ApplicationSnapshot::from_object(&application());
        assert_eq!(snapshot.identity, AppIdentity::new("payments", "argocd"));
        assert_eq!(snapshot.destination_namespace, "prod-payments");
        assert_eq!(snapshot.label(CRITICALITY_LABEL), Some("high"));
        assert_eq!(snapshot.sync_status, SyncStatus::OutOfSync);
        assert_eq!(snapshot.health_status, HealthStatus::Degraded);
        assert_eq!(snapshot.resources.len(), 2);
        assert_eq!(snapshot.resources[0].status, ResourceSyncState::OutOfSync);
        assert_eq!(snapshot.resources[1].namespace, "");
        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.history[0].deployed_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_resource_health_overrides_synced_state() {
        let snapshot = ApplicationSnapshot::from_object(&application());
        assert_eq!(snapshot.resources[1].status, ResourceSyncState::Missing);
        let affected = snapshot
            .resources
            .iter()
            .filter(|resource| resource.status.is_affected())
            .count();
        assert_eq!(affected, 2);
    }

    #[test]
    fn test_malformed_object_degrades_to_defaults() {
        let snapshot = ApplicationSnapshot::from_object(&json!({
            "metadata": { "labels": { "drift-severity": 7 } },
            "status": { "health": "Degraded", "resources": "nope", "history": [ {}, { "revision": "" } ] }
        }));
        assert!(!snapshot.identity.is_addressable());
        assert!(snapshot.labels.is_empty());
        assert_eq!(snapshot.sync_status, SyncStatus::Unknown);
        assert_eq!(snapshot.health_status, HealthStatus::Unknown);
        assert!(snapshot.resources.is_empty());
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn test_rollback_target_is_second_to_last() {
        let snapshot = ApplicationSnapshot::from_object(&application());
        assert_eq!(snapshot.rollback_target().map(|r| r.revision.as_str()), Some("bbb"));

        let mut short = snapshot.clone();
        short.history.truncate(1);
        assert!(short.rollback_target().is_none());
    }

    #[test]
    fn test_multi_source_history_uses_first_revision() {
        let record = RevisionRecord::from_entry(&json!({ "revisions": ["r1", "r2"] }));
        assert_eq!(record.map(|r| r.revision), Some("r1".to_string()));
    }

    #[test]
    fn test_sync_status_of_object() {
        assert_eq!(
            SyncStatus::of_object(&json!({ "status": { "sync": { "status": "Synced" } } })),
            SyncStatus::Synced
        );
        assert_eq!(SyncStatus::of_object(&json!({})), SyncStatus::Unknown);
    }
}
