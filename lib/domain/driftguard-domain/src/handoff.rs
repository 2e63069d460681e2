//! JSON analysis document shared with later remediation steps.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::report::{AffectedResource, DriftReport};

pub const DEFAULT_HANDOFF_PATH: &str = "/results/analysis.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDocument {
    pub app_name: String,
    pub namespace: String,
    /// Kept as a plain string so older producers still parse.
    pub severity: String,
    pub risk_score: u8,
    pub timestamp: DateTime<Utc>,
    pub drift_detected: bool,
    pub recommended_action: String,
    #[serde(default)]
    pub affected_resources: Vec<AffectedResource>,
}

impl HandoffDocument {
    pub fn from_report(report: &DriftReport) -> Self {
        Self {
            app_name: report.application.name.clone(),
            namespace: report.destination_namespace.clone(),
            severity: report.severity.to_string(),
            risk_score: report.risk_score.value(),
            timestamp: report.timestamp,
            drift_detected: true,
            recommended_action: report.recommended_action.to_string(),
            affected_resources: report.affected_resources.clone(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_vec_pretty(self).context("failed to encode handoff document")?;
        fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
    }

    /// `Ok(None)` when no document has been written yet.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let document = serde_json::from_slice(&raw)
            .with_context(|| format!("malformed handoff document at {}", path.display()))?;
        Ok(Some(document))
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_HANDOFF_PATH)
    }
}
