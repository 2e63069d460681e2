//! Severity-indexed remediation policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::severity::SeverityLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    AutoSync,
    NotifyAndTimeout,
    ImmediateRollback,
}

impl RemediationAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            RemediationAction::AutoSync => "auto_sync",
            RemediationAction::NotifyAndTimeout => "notify_and_timeout",
            RemediationAction::ImmediateRollback => "immediate_rollback",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy carries either a cooldown or an approval timeout, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyConstraint {
    Cooldown(Duration),
    Timeout(Duration),
}

impl PolicyConstraint {
    pub const fn cooldown(self) -> Option<Duration> {
        match self {
            PolicyConstraint::Cooldown(duration) => Some(duration),
            PolicyConstraint::Timeout(_) => None,
        }
    }

    pub const fn timeout(self) -> Option<Duration> {
        match self {
            PolicyConstraint::Timeout(duration) => Some(duration),
            PolicyConstraint::Cooldown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPolicy {
    pub action: RemediationAction,
    pub approval_required: bool,
    pub constraint: PolicyConstraint,
    pub max_retries: u32,
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Read-only table with one entry per [`SeverityLevel`], indexed by the enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    entries: [RemediationPolicy; 4],
}

pub static STANDARD_POLICIES: PolicyTable = PolicyTable::standard();

impl PolicyTable {
    pub const fn standard() -> Self {
        Self {
            entries: [
                RemediationPolicy {
                    action: RemediationAction::AutoSync,
                    approval_required: false,
                    constraint: PolicyConstraint::Cooldown(Duration::from_secs(5 * MINUTE)),
                    max_retries: 3,
                },
                RemediationPolicy {
                    action: RemediationAction::NotifyAndTimeout,
                    approval_required: true,
                    constraint: PolicyConstraint::Timeout(Duration::from_secs(24 * HOUR)),
                    max_retries: 2,
                },
                RemediationPolicy {
                    action: RemediationAction::ImmediateRollback,
                    approval_required: false,
                    constraint: PolicyConstraint::Cooldown(Duration::ZERO),
                    max_retries: 1,
                },
                // Critical takes the High rollback path.
                RemediationPolicy {
                    action: RemediationAction::ImmediateRollback,
                    approval_required: false,
                    constraint: PolicyConstraint::Cooldown(Duration::ZERO),
                    max_retries: 1,
                },
            ],
        }
    }

    pub const fn resolve(&self, severity: SeverityLevel) -> &RemediationPolicy {
        &self.entries[severity.index()]
    }

    /// Resolves an untyped severity name; unrecognized names get the Low entry.
    pub fn resolve_named(&self, severity: &str) -> &RemediationPolicy {
        let level = severity.parse().unwrap_or(SeverityLevel::Low);
        self.resolve(level)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}
