//! Audit trail persisted as ConfigMaps next to the Applications.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Client;
use kube::api::{Api, ObjectMeta, PostParams};
use std::collections::BTreeMap;
use tracing::info;

use driftguard_domain::{DriftReport, RemediationOutcome};
use driftguard_ports::ReportSink;

const OPERATOR: &str = "driftguard-controller";
const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Clone)]
pub struct ConfigMapAuditSink {
    client: Client,
    namespace: String,
}

impl ConfigMapAuditSink {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    async fn create(&self, config_map: ConfigMap) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let name = config_map.metadata.name.clone().unwrap_or_default();
        api.create(&PostParams::default(), &config_map)
            .await
            .with_context(|| format!("failed to create ConfigMap {}/{name}", self.namespace))?;
        info!(namespace = %self.namespace, %name, "audit record created");
        Ok(())
    }
}

#[async_trait]
impl ReportSink for ConfigMapAuditSink {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        self.create(audit_record(report, &self.namespace)?).await?;
        if let Some(alert) = emergency_alert(report, &self.namespace) {
            self.create(alert).await?;
        }
        Ok(())
    }
}

pub fn audit_record(report: &DriftReport, namespace: &str) -> Result<ConfigMap> {
    let app = &report.application.name;
    let labels = BTreeMap::from([
        ("app".to_string(), label_value(app)),
        ("audit-type".to_string(), "drift-remediation".to_string()),
        ("severity".to_string(), report.severity.to_string()),
        ("outcome".to_string(), report.outcome.label().to_string()),
    ]);
    let annotations = BTreeMap::from([
        ("drift-detection.argocd.io/app-name".to_string(), app.clone()),
        (
            "drift-detection.argocd.io/remediation-time".to_string(),
            report.timestamp.to_rfc3339(),
        ),
    ]);
    let remediation_status = if report.outcome.is_failure() {
        "failed"
    } else {
        "success"
    };
    let data = BTreeMap::from([
        ("application".to_string(), app.clone()),
        ("namespace".to_string(), report.destination_namespace.clone()),
        ("severity".to_string(), report.severity.to_string()),
        ("risk_score".to_string(), report.risk_score.value().to_string()),
        ("action".to_string(), report.recommended_action.to_string()),
        ("outcome".to_string(), report.outcome.to_string()),
        ("remediation_status".to_string(), remediation_status.to_string()),
        ("timestamp".to_string(), report.timestamp.to_rfc3339()),
        ("operator".to_string(), OPERATOR.to_string()),
        (
            "report".to_string(),
            serde_json::to_string(report).context("failed to encode drift report")?,
        ),
    ]);

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(object_name("audit", app, report)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..ConfigMap::default()
    })
}

/// Only successful rollbacks raise an emergency alert.
pub fn emergency_alert(report: &DriftReport, namespace: &str) -> Option<ConfigMap> {
    let RemediationOutcome::RolledBack { revision } = &report.outcome else {
        return None;
    };
    let app = &report.application.name;
    let labels = BTreeMap::from([
        ("alert-type".to_string(), "emergency-rollback".to_string()),
        ("severity".to_string(), report.severity.to_string()),
        ("app".to_string(), label_value(app)),
    ]);
    let data = BTreeMap::from([
        ("alert".to_string(), format!("Emergency rollback executed for {app}")),
        ("details".to_string(), format!("Rolled back to {revision}")),
        ("timestamp".to_string(), report.timestamp.to_rfc3339()),
    ]);
    Some(ConfigMap {
        metadata: ObjectMeta {
            name: Some(object_name("emergency-alert", app, report)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..ConfigMap::default()
    })
}

fn object_name(prefix: &str, app: &str, report: &DriftReport) -> String {
    let raw = format!("{prefix}-{app}-{}", report.timestamp.timestamp());
    let mut name: String = raw
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect();
    name.truncate(MAX_NAME_LEN);
    name
}

fn label_value(raw: &str) -> String {
    let mut value: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    value.truncate(MAX_LABEL_LEN);
    value
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use driftguard_domain::{AppIdentity, RemediationAction, RiskScore, SeverityLevel};

    fn report(outcome: RemediationOutcome) -> DriftReport {
        DriftReport {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            application: AppIdentity::new("Payments_API", "argocd"),
            destination_namespace: "prod-payments".into(),
            severity: SeverityLevel::Critical,
            risk_score: RiskScore::clamped(10),
            detail: "analyzed 1 resources, 1 affected".into(),
            recommended_action: RemediationAction::ImmediateRollback,
            approval_required: false,
            affected_resources: Vec::new(),
            outcome,
        }
    }

    #[test]
    fn test_audit_record_shape() {
        let config_map = audit_record(
            &report(RemediationOutcome::RolledBack {
                revision: "v2".into(),
            }),
            "argocd",
        )
        .unwrap();

        assert_eq!(
            config_map.metadata.name.as_deref(),
            Some("audit-payments-api-1714564800")
        );
        let labels = config_map.metadata.labels.unwrap();
        assert_eq!(labels["audit-type"], "drift-remediation");
        assert_eq!(labels["severity"], "critical");
        assert_eq!(labels["app"], "Payments_API");
        let data = config_map.data.unwrap();
        assert_eq!(data["remediation_status"], "success");
        assert_eq!(data["risk_score"], "10");
        assert!(data["report"].contains("\"outcome\":\"rolled_back\""));
    }

    #[test]
    fn test_failed_mutation_is_recorded_as_failed() {
        let config_map = audit_record(
            &report(RemediationOutcome::MutationFailed {
                action: RemediationAction::ImmediateRollback,
                error: "forbidden".into(),
            }),
            "argocd",
        )
        .unwrap();
        assert_eq!(config_map.data.unwrap()["remediation_status"], "failed");
    }

    #[test]
    fn test_emergency_alert_only_for_rollbacks() {
        let alert = emergency_alert(
            &report(RemediationOutcome::RolledBack {
                revision: "v2".into(),
            }),
            "argocd",
        )
        .unwrap();
        assert_eq!(
            alert.metadata.labels.unwrap()["alert-type"],
            "emergency-rollback"
        );
        assert_eq!(alert.data.unwrap()["details"], "Rolled back to v2");

        assert!(emergency_alert(&report(RemediationOutcome::NoPriorRevision { available: 1 }), "argocd").is_none());
    }
}
