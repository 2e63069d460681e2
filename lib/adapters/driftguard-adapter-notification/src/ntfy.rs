//! Push notifications through an ntfy server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use driftguard_domain::{DriftReport, NtfyConfig, RemediationOutcome, SeverityLevel};
use driftguard_ports::ReportSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtfyMessage {
    pub title: String,
    pub body: String,
    pub priority: u8,
    pub tags: Vec<&'static str>,
}

impl NtfyMessage {
    pub fn from_report(report: &DriftReport) -> Self {
        let app = &report.application.name;
        let (title, mut tags) = match &report.outcome {
            RemediationOutcome::RolledBack { .. } => (
                format!("Emergency rollback: {app}"),
                vec!["rotating_light", "rewind"],
            ),
            RemediationOutcome::MutationFailed { .. } => {
                (format!("Remediation failed: {app}"), vec!["x"])
            }
            RemediationOutcome::AwaitingApproval { .. } => {
                (format!("Approval needed: {app}"), vec!["hourglass"])
            }
            _ => (format!("Drift detected: {app}"), vec!["warning"]),
        };
        tags.push(report.severity.as_str());

        let mut body = format!(
            "{} drift in {} (namespace {}), risk {}.\n{}\nAction: {} ({})",
            report.severity,
            report.application,
            report.destination_namespace,
            report.risk_score,
            report.detail,
            report.recommended_action,
            report.outcome,
        );
        if report.approval_required {
            body.push_str("\nManual approval required.");
        }

        Self {
            title,
            body,
            priority: priority_for(report.severity),
            tags,
        }
    }
}

pub const fn priority_for(severity: SeverityLevel) -> u8 {
    match severity {
        SeverityLevel::Low => 2,
        SeverityLevel::Medium => 3,
        SeverityLevel::High => 4,
        SeverityLevel::Critical => 5,
    }
}

#[derive(Debug, Clone)]
pub struct NtfySink {
    client: Client,
    endpoint: String,
    min_severity: SeverityLevel,
}

impl NtfySink {
    pub fn new(config: &NtfyConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &NtfyConfig) -> Self {
        let endpoint = format!(
            "{}/{}",
            config.url.trim_end_matches('/'),
            config.topic.trim_start_matches('/')
        );
        Self {
            client,
            endpoint,
            min_severity: config.min_severity,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn wants(&self, report: &DriftReport) -> bool {
        report.severity >= self.min_severity
    }
}

#[async_trait]
impl ReportSink for NtfySink {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        if !self.wants(report) {
            debug!(app = %report.application, severity = %report.severity, "below ntfy threshold");
            return Ok(());
        }
        let message = NtfyMessage::from_report(report);
        self.client
            .post(&self.endpoint)
            .header("Title", &message.title)
            .header("Priority", message.priority.to_string())
            .header("Tags", message.tags.join(","))
            .body(message.body)
            .send()
            .await
            .with_context(|| format!("failed to reach ntfy at {}", self.endpoint))?
            .error_for_status()
            .context("ntfy rejected notification")?;
        info!(app = %report.application, endpoint = %self.endpoint, "ntfy notification sent");
        Ok(())
    }
}
