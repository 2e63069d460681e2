//! Keeps the latest analysis document on disk for downstream jobs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use driftguard_domain::{DriftReport, HandoffDocument};
use driftguard_ports::ReportSink;

#[derive(Debug, Clone)]
pub struct HandoffFileSink {
    path: PathBuf,
}

impl HandoffFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for HandoffFileSink {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        let document = HandoffDocument::from_report(report);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || document.write_to(&path))
            .await
            .context("handoff writer panicked")??;
        debug!(path = %self.path.display(), app = %report.application, "handoff document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::report;
    use driftguard_domain::{RemediationOutcome, SeverityLevel};

    #[tokio::test]
    async fn test_latest_report_wins() {
        let dir = tempfile::tempdir().unwrap();
        let sink = HandoffFileSink::new(dir.path().join("results").join("analysis.json"));

        sink.deliver(&report(SeverityLevel::Low, RemediationOutcome::Synced))
            .await
            .unwrap();
        sink.deliver(&report(
            SeverityLevel::High,
            RemediationOutcome::NoPriorRevision { available: 1 },
        ))
        .await
        .unwrap();

        let document = HandoffDocument::read_from(sink.path()).unwrap().unwrap();
        assert_eq!(document.app_name, "web");
        assert_eq!(document.severity, "high");
        assert_eq!(document.recommended_action, "immediate_rollback");
        assert!(document.drift_detected);
    }
}
