//! Drift severity classification.
//!
//! [`classify`] is total: whatever the snapshot holds, it returns a severity,
//! a risk score and a human-readable detail.

use driftguard_domain::snapshot::{CRITICALITY_LABEL, SEVERITY_LABEL};
use driftguard_domain::{
    AffectedResource, ApplicationSnapshot, HealthStatus, RiskScore, SeverityLevel, SyncStatus,
};

/// Resource-kind keywords, highest severity first. The first category with a
/// keyword contained in the lowercased kind wins.
const KIND_KEYWORDS: [(SeverityLevel, &[&str]); 4] = [
    (
        SeverityLevel::Critical,
        &["secret", "rbac", "security", "serviceaccount"],
    ),
    (
        SeverityLevel::High,
        &["deployment", "service", "ingress", "statefulset"],
    ),
    (
        SeverityLevel::Medium,
        &["configmap", "persistentvolumeclaim", "pvc", "job", "cronjob"],
    ),
    (SeverityLevel::Low, &["labels", "annotations", "metadata"]),
];

const ESCALATION_AFFECTED_THRESHOLD: usize = 5;
const LARGE_APP_RESOURCES: usize = 10;
const VERY_LARGE_APP_RESOURCES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub severity: SeverityLevel,
    pub risk_score: RiskScore,
    pub detail: String,
    pub affected: Vec<AffectedResource>,
}

pub fn severity_for_kind(kind: &str) -> SeverityLevel {
    let kind = kind.to_ascii_lowercase();
    KIND_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| kind.contains(keyword)))
        .map(|(severity, _)| *severity)
        .unwrap_or(SeverityLevel::Low)
}

pub fn classify(snapshot: &ApplicationSnapshot) -> Classification {
    let affected = affected_resources(snapshot);

    if let Some(severity) = explicit_severity(snapshot) {
        return Classification {
            severity,
            risk_score: risk_score(snapshot, severity),
            detail: format!("explicit override via {SEVERITY_LABEL} label: {severity}"),
            affected,
        };
    }

    if snapshot.resources.is_empty() {
        return Classification {
            severity: SeverityLevel::Low,
            risk_score: risk_score(snapshot, SeverityLevel::Low),
            detail: "no resources identified".to_string(),
            affected,
        };
    }

    let mut highest = snapshot
        .resources
        .iter()
        .map(|resource| severity_for_kind(&resource.kind))
        .max()
        .unwrap_or(SeverityLevel::Low);

    if snapshot.health_status == HealthStatus::Degraded && highest == SeverityLevel::Low {
        highest = SeverityLevel::Medium;
    }

    if snapshot.sync_status == SyncStatus::OutOfSync
        && affected.len() > ESCALATION_AFFECTED_THRESHOLD
    {
        highest = highest.escalate();
    }

    let detail = format!(
        "analyzed {} resources, {} affected; health: {}, sync: {}",
        snapshot.resources.len(),
        affected.len(),
        snapshot.health_status,
        snapshot.sync_status,
    );

    Classification {
        severity: highest,
        risk_score: risk_score(snapshot, highest),
        detail,
        affected,
    }
}

fn explicit_severity(snapshot: &ApplicationSnapshot) -> Option<SeverityLevel> {
    snapshot.label(SEVERITY_LABEL)?.parse().ok()
}

fn affected_resources(snapshot: &ApplicationSnapshot) -> Vec<AffectedResource> {
    snapshot
        .resources
        .iter()
        .filter(|resource| resource.status.is_affected())
        .map(|resource| AffectedResource {
            kind: resource.kind.clone(),
            name: resource.name.clone(),
            namespace: resource.namespace.clone(),
            status: resource.status,
            severity: severity_for_kind(&resource.kind),
        })
        .collect()
}

fn risk_score(snapshot: &ApplicationSnapshot, severity: SeverityLevel) -> RiskScore {
    let mut score = u32::from(severity.weight());

    let resources = snapshot.resources.len();
    if resources > VERY_LARGE_APP_RESOURCES {
        score += 2;
    } else if resources > LARGE_APP_RESOURCES {
        score += 1;
    }

    // "prod" also covers "production".
    if snapshot
        .destination_namespace
        .to_ascii_lowercase()
        .contains("prod")
    {
        score += 1;
    }

    if snapshot.label(CRITICALITY_LABEL) == Some("high") {
        score += 1;
    }

    RiskScore::clamped(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftguard_domain::{AppIdentity, ResourceStatus, ResourceSyncState};
    use std::collections::BTreeMap;

    fn snapshot(resources: Vec<ResourceStatus>) -> ApplicationSnapshot {
        ApplicationSnapshot {
            identity: AppIdentity::new("shop", "argocd"),
            destination_namespace: "staging".to_string(),
            labels: BTreeMap::new(),
            sync_status: SyncStatus::OutOfSync,
            health_status: HealthStatus::Healthy,
            resources,
            history: Vec::new(),
        }
    }

    fn resource(kind: &str, status: ResourceSyncState) -> ResourceStatus {
        ResourceStatus::new(kind, format!("{}-1", kind.to_lowercase()), "staging", status)
    }

    fn many(kind: &str, count: usize, status: ResourceSyncState) -> Vec<ResourceStatus> {
        (0..count).map(|_| resource(kind, status)).collect()
    }

    #[test]
    fn test_kind_keywords_pick_first_matching_category() {
        assert_eq!(severity_for_kind("Secret"), SeverityLevel::Critical);
        assert_eq!(severity_for_kind("ServiceAccount"), SeverityLevel::Critical);
        assert_eq!(severity_for_kind("StatefulSet"), SeverityLevel::High);
        assert_eq!(severity_for_kind("Ingress"), SeverityLevel::High);
        assert_eq!(severity_for_kind("CronJob"), SeverityLevel::Medium);
        assert_eq!(severity_for_kind("PersistentVolumeClaim"), SeverityLevel::Medium);
        assert_eq!(severity_for_kind("HorizontalPodAutoscaler"), SeverityLevel::Low);
        assert_eq!(severity_for_kind(""), SeverityLevel::Low);
    }

    #[test]
    fn test_plain_rbac_object_kinds_are_low() {
        for kind in ["Role", "RoleBinding", "ClusterRole", "ClusterRoleBinding"] {
            assert_eq!(severity_for_kind(kind), SeverityLevel::Low, "{kind}");
        }
    }

    #[test]
    fn test_explicit_label_short_circuits_any_resources() {
        let resource_sets = vec![
            Vec::new(),
            many("Secret", 30, ResourceSyncState::Missing),
            vec![ResourceStatus::new("", "", "", ResourceSyncState::Unknown)],
        ];
        for resources in resource_sets {
            let mut app = snapshot(resources);
            app.labels
                .insert(SEVERITY_LABEL.to_string(), "Medium".to_string());
            let result = classify(&app);
            assert_eq!(result.severity, SeverityLevel::Medium);
            assert!(result.detail.contains("explicit override"));
        }
    }

    #[test]
    fn test_unknown_label_value_falls_through_to_analysis() {
        let mut app = snapshot(vec![resource("Deployment", ResourceSyncState::OutOfSync)]);
        app.labels
            .insert(SEVERITY_LABEL.to_string(), "urgent".to_string());
        let result = classify(&app);
        assert_eq!(result.severity, SeverityLevel::High);
        assert!(!result.detail.contains("explicit override"));
    }

    #[test]
    fn test_empty_resources_is_low() {
        let result = classify(&snapshot(Vec::new()));
        assert_eq!(result.severity, SeverityLevel::Low);
        assert_eq!(result.detail, "no resources identified");
        assert_eq!(result.risk_score.value(), 2);
    }

    #[test]
    fn test_degraded_health_lifts_low_to_medium_only() {
        let mut app = snapshot(vec![resource("Lease", ResourceSyncState::Synced)]);
        app.health_status = HealthStatus::Degraded;
        assert_eq!(classify(&app).severity, SeverityLevel::Medium);

        let mut app = snapshot(vec![resource("Deployment", ResourceSyncState::Synced)]);
        app.health_status = HealthStatus::Degraded;
        assert_eq!(classify(&app).severity, SeverityLevel::High);
    }

    #[test]
    fn test_more_than_five_affected_escalates_once() {
        let app = snapshot(many("ConfigMap", 5, ResourceSyncState::OutOfSync));
        assert_eq!(classify(&app).severity, SeverityLevel::Medium);

        let app = snapshot(many("ConfigMap", 6, ResourceSyncState::OutOfSync));
        assert_eq!(classify(&app).severity, SeverityLevel::High);

        let mut app = snapshot(many("ConfigMap", 6, ResourceSyncState::OutOfSync));
        app.sync_status = SyncStatus::Unknown;
        assert_eq!(classify(&app).severity, SeverityLevel::Medium);
    }

    #[test]
    fn test_escalation_saturates_at_critical() {
        let app = snapshot(many("Secret", 8, ResourceSyncState::Missing));
        assert_eq!(classify(&app).severity, SeverityLevel::Critical);
    }

    #[test]
    fn test_resource_count_bonus_does_not_stack() {
        let app = snapshot(many("Lease", 11, ResourceSyncState::Synced));
        assert_eq!(classify(&app).risk_score.value(), 3);

        let app = snapshot(many("Lease", 21, ResourceSyncState::Synced));
        assert_eq!(classify(&app).risk_score.value(), 4);
    }

    #[test]
    fn test_risk_score_clamps_to_ten() {
        let mut app = snapshot(many("Secret", 25, ResourceSyncState::Synced));
        app.destination_namespace = "Production".to_string();
        app.labels
            .insert(CRITICALITY_LABEL.to_string(), "high".to_string());
        let result = classify(&app);
        assert_eq!(result.severity, SeverityLevel::Critical);
        assert_eq!(result.risk_score.value(), 10);
    }

    #[test]
    fn test_risk_score_adjustments() {
        let mut app = snapshot(vec![resource("ConfigMap", ResourceSyncState::OutOfSync)]);
        app.destination_namespace = "prod-eu".to_string();
        app.labels
            .insert(CRITICALITY_LABEL.to_string(), "high".to_string());
        assert_eq!(classify(&app).risk_score.value(), 7);
    }

    #[test]
    fn test_risk_score_always_in_range() {
        for count in [0, 1, 11, 21, 40] {
            for kind in ["Secret", "Service", "Job", "Lease"] {
                let mut app = snapshot(many(kind, count, ResourceSyncState::Degraded));
                app.destination_namespace = "prod".to_string();
                let score = classify(&app).risk_score.value();
                assert!((1..=10).contains(&score), "{kind} x{count} gave {score}");
            }
        }
    }

    #[test]
    fn test_detail_and_affected_list() {
        let app = snapshot(vec![
            resource("Secret", ResourceSyncState::Missing),
            resource("Service", ResourceSyncState::Synced),
        ]);
        let result = classify(&app);
        assert_eq!(
            result.detail,
            "analyzed 2 resources, 1 affected; health: Healthy, sync: OutOfSync"
        );
        assert_eq!(result.affected.len(), 1);
        assert_eq!(result.affected[0].kind, "Secret");
        assert_eq!(result.affected[0].severity, SeverityLevel::Critical);
    }
}
