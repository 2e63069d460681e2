//! Builds the controller from configuration and runs it.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};

use driftguard_adapter_argocd::{ApplicationFeed, ArgoCdSyncGateway, ConfigMapAuditSink};
use driftguard_adapter_notification::{FanoutSink, HandoffFileSink, LogSink, NtfySink};
use driftguard_application::{DryRunGateway, FixtureFeed, Reconciler};
use driftguard_domain::{ClusterMode, ControllerConfig, WatchScope};
use driftguard_ports::{ChangeFeed, ReportSink, SyncGateway};

use crate::health;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub offline: bool,
    pub namespace: Option<String>,
    pub cluster_wide: bool,
    pub health_bind: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut ControllerConfig) {
        if self.offline {
            config.cluster.mode = ClusterMode::Offline;
        }
        if self.cluster_wide {
            config.watch.scope = WatchScope::Cluster;
        } else if let Some(namespace) = &self.namespace {
            config.watch.scope = WatchScope::Namespaced {
                namespace: namespace.clone(),
            };
        }
        if let Some(bind) = &self.health_bind {
            config.health.bind = bind.clone();
        }
    }
}

/// `explicit` (from `--config` or `DRIFTGUARD_CONFIG_PATH`), else
/// `$HOME/.driftguard/config.yaml`.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    resolve_config_path(explicit, env::var_os("HOME").map(PathBuf::from))
}

fn resolve_config_path(explicit: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Some(home) = home {
        return home.join(".driftguard").join("config.yaml");
    }
    PathBuf::from("driftguard-config.yaml")
}

pub fn report_sinks(config: &ControllerConfig, audit: Option<ConfigMapAuditSink>) -> FanoutSink {
    let mut sinks = FanoutSink::new().with("log", LogSink);
    if let Some(ntfy) = &config.notifications.ntfy {
        sinks = sinks.with("ntfy", NtfySink::new(ntfy));
    }
    if let Some(path) = &config.handoff.path {
        sinks = sinks.with("handoff", HandoffFileSink::new(path.clone()));
    }
    if let Some(audit) = audit {
        sinks = sinks.with("audit", audit);
    }
    sinks
}

pub fn offline_reconciler(
    config: &ControllerConfig,
) -> Result<Reconciler<FixtureFeed, DryRunGateway, FanoutSink>> {
    let feed = match &config.cluster.fixtures {
        Some(path) => FixtureFeed::load(path)?,
        None => {
            warn!("offline mode without fixtures, nothing will be replayed");
            FixtureFeed::new(Vec::new())
        }
    };
    if config.audit.configmap_namespace.is_some() {
        warn!("ConfigMap audit records are not written in offline mode");
    }
    Ok(Reconciler::new(
        feed,
        DryRunGateway::default(),
        report_sinks(config, None),
        config.watch.clone(),
    ))
}

pub async fn live_reconciler(
    config: &ControllerConfig,
) -> Result<Reconciler<ApplicationFeed, ArgoCdSyncGateway, FanoutSink>> {
    let client = driftguard_adapter_argocd::connect().await?;

    let mut gateway = ArgoCdSyncGateway::new(client.clone());
    if let WatchScope::Namespaced { namespace } = &config.watch.scope {
        gateway = gateway.with_default_namespace(namespace.clone());
    }
    let audit = config
        .audit
        .configmap_namespace
        .as_ref()
        .map(|namespace| ConfigMapAuditSink::new(client.clone(), namespace.clone()));

    Ok(Reconciler::new(
        ApplicationFeed::new(client),
        gateway,
        report_sinks(config, audit),
        config.watch.clone(),
    ))
}

/// Runs until ctrl-c or until the watch retry budget is exhausted, which is
/// returned as an error.
pub async fn run(config: ControllerConfig) -> Result<()> {
    let listener = health::bind(&config.health.bind).await?;
    let health_task = tokio::spawn(async move {
        if let Err(err) = health::serve(listener).await {
            error!(error = %format!("{err:#}"), "health listener failed");
        }
    });

    info!(
        mode = ?config.cluster.mode,
        scope = %config.watch.scope,
        max_retries = config.watch.max_retries,
        "starting drift controller"
    );
    let result = match config.cluster.mode {
        ClusterMode::Live => drive(live_reconciler(&config).await?).await,
        ClusterMode::Offline => drive(offline_reconciler(&config)?).await,
    };
    health_task.abort();
    result
}

async fn drive<F, G, S>(mut reconciler: Reconciler<F, G, S>) -> Result<()>
where
    F: ChangeFeed,
    G: SyncGateway,
    S: ReportSink,
{
    tokio::select! {
        result = reconciler.run() => {
            result?;
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
            Ok(())
        }
    }
}
