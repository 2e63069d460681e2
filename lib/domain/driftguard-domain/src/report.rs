use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::RemediationAction;
use crate::severity::{RiskScore, SeverityLevel};
use crate::snapshot::{AppIdentity, ResourceSyncState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedResource {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub status: ResourceSyncState,
    pub severity: SeverityLevel,
}

/// What happened to one processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemediationOutcome {
    Synced,
    AwaitingApproval { deadline: DateTime<Utc> },
    RolledBack { revision: String },
    NoPriorRevision { available: usize },
    MutationFailed { action: RemediationAction, error: String },
    Skipped { reason: String },
}

impl RemediationOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, RemediationOutcome::MutationFailed { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            RemediationOutcome::Synced => "synced",
            RemediationOutcome::AwaitingApproval { .. } => "awaiting_approval",
            RemediationOutcome::RolledBack { .. } => "rolled_back",
            RemediationOutcome::NoPriorRevision { .. } => "no_prior_revision",
            RemediationOutcome::MutationFailed { .. } => "mutation_failed",
            RemediationOutcome::Skipped { .. } => "skipped",
        }
    }
}

impl fmt::Display for RemediationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationOutcome::Synced => f.write_str("sync triggered"),
            RemediationOutcome::AwaitingApproval { deadline } => {
                write!(f, "awaiting approval until {}", deadline.to_rfc3339())
            }
            RemediationOutcome::RolledBack { revision } => {
                write!(f, "rolled back to revision {revision}")
            }
            RemediationOutcome::NoPriorRevision { available } => {
                write!(f, "no prior revision to roll back to ({available} in history)")
            }
            RemediationOutcome::MutationFailed { action, error } => {
                write!(f, "{action} failed: {error}")
            }
            RemediationOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Result of one reconciliation cycle, handed to the sink and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub timestamp: DateTime<Utc>,
    pub application: AppIdentity,
    pub destination_namespace: String,
    pub severity: SeverityLevel,
    pub risk_score: RiskScore,
    pub detail: String,
    pub recommended_action: RemediationAction,
    pub approval_required: bool,
    pub affected_resources: Vec<AffectedResource>,
    pub outcome: RemediationOutcome,
}

impl DriftReport {
    pub fn summary(&self) -> String {
        format!(
            "{} drift in {} (risk {}): {}",
            self.severity, self.application, self.risk_score, self.outcome
        )
    }
}
