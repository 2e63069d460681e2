//! Drift classification, remediation dispatch and the reconciliation loop.

pub mod classifier;
pub mod dry_run;
pub mod executor;
pub mod reconciler;

pub use classifier::{Classification, classify};
pub use dry_run::{DryRunGateway, FixtureFeed};
pub use executor::ActionExecutor;
pub use reconciler::{LoopState, ReconcileError, Reconciler, backoff_delay};
