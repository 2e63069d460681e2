use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use driftguard_domain::{DriftReport, SeverityLevel};
use driftguard_ports::ReportSink;

/// Writes every report to the structured log. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        let affected = report.affected_resources.len();
        if report.severity >= SeverityLevel::High || report.outcome.is_failure() {
            warn!(
                app = %report.application,
                severity = %report.severity,
                risk = report.risk_score.value(),
                action = %report.recommended_action,
                outcome = report.outcome.label(),
                affected,
                "{}",
                report.summary()
            );
        } else {
            info!(
                app = %report.application,
                severity = %report.severity,
                risk = report.risk_score.value(),
                action = %report.recommended_action,
                outcome = report.outcome.label(),
                affected,
                "{}",
                report.summary()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::report;
    use driftguard_domain::RemediationOutcome;

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        for severity in SeverityLevel::ALL {
            LogSink
                .deliver(&report(severity, RemediationOutcome::Synced))
                .await
                .unwrap();
        }
    }
}
