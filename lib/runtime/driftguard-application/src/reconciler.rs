//! The reconciliation loop.
//!
//! One [`Reconciler`] owns the watch subscription. Each OutOfSync event is
//! classified, resolved against the policy table, executed and reported
//! before the next event is read. Subscription terminations are retried with
//! capped exponential backoff; running out of retries is the only fatal
//! condition.

use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use driftguard_domain::policy::STANDARD_POLICIES;
use driftguard_domain::{
    ApplicationSnapshot, DriftReport, PolicyTable, RemediationOutcome, SyncStatus, WatchConfig,
};
use driftguard_ports::{ChangeFeed, ChangeStream, ReportSink, SyncGateway};

use crate::classifier::classify;
use crate::executor::ActionExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Watching,
    Reconnecting,
    /// Terminal; recovery is a process restart.
    Failed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("watch retry budget exhausted after {attempts} consecutive terminations: {last_error}")]
    RetryBudgetExhausted { attempts: u32, last_error: String },
}

/// `min(2^retry_count, cap)` seconds.
pub fn backoff_delay(retry_count: u32, cap: Duration) -> Duration {
    let secs = 2_u64.checked_pow(retry_count).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(cap)
}

enum Termination {
    IdleTimeout,
    Fault(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::IdleTimeout => f.write_str("subscription closed after idle timeout"),
            Termination::Fault(reason) => f.write_str(reason),
        }
    }
}

pub struct Reconciler<F, G, S> {
    feed: F,
    executor: ActionExecutor<G>,
    sink: S,
    policies: &'static PolicyTable,
    watch: WatchConfig,
    state: LoopState,
    retry_count: u32,
}

impl<F, G, S> Reconciler<F, G, S>
where
    F: ChangeFeed,
    G: SyncGateway,
    S: ReportSink,
{
    pub fn new(feed: F, gateway: G, sink: S, watch: WatchConfig) -> Self {
        Self {
            feed,
            executor: ActionExecutor::new(gateway),
            sink,
            policies: &STANDARD_POLICIES,
            watch,
            state: LoopState::Idle,
            retry_count: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn gateway(&self) -> &G {
        self.executor.gateway()
    }

    /// Watches until the retry budget is exhausted. Only returns with an error.
    pub async fn run(&mut self) -> Result<(), ReconcileError> {
        loop {
            let termination = match self
                .feed
                .subscribe(&self.watch.scope, self.watch.idle_timeout())
                .await
            {
                Ok(stream) => {
                    self.state = LoopState::Watching;
                    info!(scope = %self.watch.scope, "watching applications");
                    self.drain(stream).await
                }
                Err(err) => Termination::Fault(format!("failed to open subscription: {err:#}")),
            };

            self.retry_count = self.retry_count.saturating_add(1);
            if self.retry_count > self.watch.max_retries {
                self.state = LoopState::Failed;
                error!(
                    attempts = self.retry_count,
                    reason = %termination,
                    "max retries reached, giving up on watch"
                );
                return Err(ReconcileError::RetryBudgetExhausted {
                    attempts: self.retry_count,
                    last_error: termination.to_string(),
                });
            }

            self.state = LoopState::Reconnecting;
            let delay = backoff_delay(self.retry_count, self.watch.backoff_cap());
            match &termination {
                Termination::IdleTimeout => info!(
                    attempt = self.retry_count,
                    delay_secs = delay.as_secs(),
                    "watch closed, reconnecting"
                ),
                Termination::Fault(reason) => warn!(
                    attempt = self.retry_count,
                    max = self.watch.max_retries,
                    delay_secs = delay.as_secs(),
                    %reason,
                    "watch error, reconnecting"
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn drain(&mut self, mut stream: ChangeStream) -> Termination {
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    self.retry_count = 0;
                    self.handle_object(&event.object).await;
                }
                Err(err) => return Termination::Fault(format!("{err:#}")),
            }
        }
        Termination::IdleTimeout
    }

    /// Processes one watched object. Objects that are not OutOfSync are
    /// ignored and yield `None`; everything else yields exactly one report,
    /// which is also delivered to the sink.
    pub async fn handle_object(&self, object: &Value) -> Option<DriftReport> {
        let sync = SyncStatus::of_object(object);
        if sync != SyncStatus::OutOfSync {
            debug!(%sync, "ignoring event without drift");
            return None;
        }

        let snapshot = ApplicationSnapshot::from_object(object);
        let report = self.reconcile(&snapshot).await;
        if let Err(err) = self.sink.deliver(&report).await {
            warn!(
                app = %report.application,
                error = %format!("{err:#}"),
                "failed to deliver drift report"
            );
        }
        Some(report)
    }

    /// Classify, decide and execute for one snapshot.
    pub async fn reconcile(&self, snapshot: &ApplicationSnapshot) -> DriftReport {
        let now = Utc::now();
        let classification = classify(snapshot);
        let policy = self.policies.resolve(classification.severity);

        info!(
            app = %snapshot.identity,
            severity = %classification.severity,
            risk = %classification.risk_score,
            action = %policy.action,
            "detected drift"
        );

        let outcome = if snapshot.identity.is_addressable() {
            self.executor.execute(snapshot, policy, now).await
        } else {
            warn!(detail = %classification.detail, "drifted object has no name, skipping remediation");
            RemediationOutcome::Skipped {
                reason: "application object has no metadata.name".to_string(),
            }
        };

        DriftReport {
            timestamp: now,
            application: snapshot.identity.clone(),
            destination_namespace: snapshot.destination_namespace.clone(),
            severity: classification.severity,
            risk_score: classification.risk_score,
            detail: classification.detail,
            recommended_action: policy.action,
            approval_required: policy.approval_required,
            affected_resources: classification.affected,
            outcome,
        }
    }
}
