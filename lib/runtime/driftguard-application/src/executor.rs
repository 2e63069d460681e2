use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use driftguard_domain::{ApplicationSnapshot, RemediationAction, RemediationOutcome, RemediationPolicy};
use driftguard_ports::{SyncGateway, SyncRequest};

/// Turns a resolved policy into at most one Sync Gateway mutation.
///
/// Mutation failures are reported, never retried here: the next watch event
/// for the application re-evaluates it.
pub struct ActionExecutor<G> {
    gateway: G,
}

impl<G: SyncGateway> ActionExecutor<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn execute(
        &self,
        snapshot: &ApplicationSnapshot,
        policy: &RemediationPolicy,
        now: DateTime<Utc>,
    ) -> RemediationOutcome {
        match policy.action {
            RemediationAction::AutoSync => self.auto_sync(snapshot).await,
            RemediationAction::NotifyAndTimeout => Self::await_approval(snapshot, policy, now),
            RemediationAction::ImmediateRollback => self.rollback(snapshot).await,
        }
    }

    async fn auto_sync(&self, snapshot: &ApplicationSnapshot) -> RemediationOutcome {
        let app = &snapshot.identity;
        match self.gateway.trigger_sync(app, &SyncRequest::forced()).await {
            Ok(()) => {
                info!(app = %app, "triggered sync operation");
                RemediationOutcome::Synced
            }
            Err(err) => {
                error!(app = %app, error = %format!("{err:#}"), "auto-sync failed");
                RemediationOutcome::MutationFailed {
                    action: RemediationAction::AutoSync,
                    error: format!("{err:#}"),
                }
            }
        }
    }

    fn await_approval(
        snapshot: &ApplicationSnapshot,
        policy: &RemediationPolicy,
        now: DateTime<Utc>,
    ) -> RemediationOutcome {
        let timeout = policy.constraint.timeout().unwrap_or_default();
        let deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|timeout| now.checked_add_signed(timeout))
            .unwrap_or(now);
        info!(
            app = %snapshot.identity,
            deadline = %deadline.to_rfc3339(),
            "drift awaiting approval"
        );
        RemediationOutcome::AwaitingApproval { deadline }
    }

    async fn rollback(&self, snapshot: &ApplicationSnapshot) -> RemediationOutcome {
        let app = &snapshot.identity;
        let Some(target) = snapshot.rollback_target() else {
            warn!(
                app = %app,
                available = snapshot.history.len(),
                "no previous revision to roll back to"
            );
            return RemediationOutcome::NoPriorRevision {
                available: snapshot.history.len(),
            };
        };

        info!(app = %app, revision = %target.revision, "executing immediate rollback");
        let request = SyncRequest::forced_to(target.revision.clone());
        match self.gateway.trigger_sync(app, &request).await {
            Ok(()) => {
                info!(app = %app, revision = %target.revision, "rollback triggered");
                RemediationOutcome::RolledBack {
                    revision: target.revision.clone(),
                }
            }
            Err(err) => {
                error!(app = %app, error = %format!("{err:#}"), "rollback failed");
                RemediationOutcome::MutationFailed {
                    action: RemediationAction::ImmediateRollback,
                    error: format!("{err:#}"),
                }
            }
        }
    }
}
