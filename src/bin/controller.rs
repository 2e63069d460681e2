use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use driftguard::telemetry;
use driftguard::{LogFormat, Overrides, config_path};
use driftguard_domain::ControllerConfig;

/// Watches Argo CD Applications and remediates configuration drift.
#[derive(Debug, Parser)]
#[command(name = "driftguard", version)]
struct Args {
    /// YAML configuration file.
    #[arg(long, env = "DRIFTGUARD_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Replay fixtures without contacting a cluster; mutations are only logged.
    #[arg(long)]
    offline: bool,

    /// Namespace holding the Application objects.
    #[arg(long, conflicts_with = "cluster_wide")]
    namespace: Option<String>,

    /// Watch Applications in every namespace.
    #[arg(long)]
    cluster_wide: bool,

    #[arg(long)]
    health_bind: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.log_format)?;

    let path = config_path(args.config);
    let mut config = ControllerConfig::load_or_default(&path)?;
    Overrides {
        offline: args.offline,
        namespace: args.namespace,
        cluster_wide: args.cluster_wide,
        health_bind: args.health_bind,
    }
    .apply(&mut config);
    config.validate()?;
    info!(config = %path.display(), "configuration loaded");

    driftguard::run(config).await
}
