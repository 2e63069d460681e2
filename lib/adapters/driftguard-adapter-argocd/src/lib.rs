//! Argo CD adapters: Application watch feed, sync gateway and ConfigMap audit.

pub mod audit;
pub mod feed;
pub mod gateway;

use anyhow::{Context, Result};
use kube::Client;
use kube::api::{ApiResource, GroupVersionKind};

pub use audit::ConfigMapAuditSink;
pub use feed::ApplicationFeed;
pub use gateway::{ArgoCdSyncGateway, sync_patch};

pub const GROUP: &str = "argoproj.io";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "Application";
pub const PLURAL: &str = "applications";

pub fn application_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(GROUP, VERSION, KIND), PLURAL)
}

/// Infers settings from the local kubeconfig or the in-cluster environment.
pub async fn connect() -> Result<Client> {
    Client::try_default()
        .await
        .context("failed to create kube client from in-cluster or kubeconfig settings")
}
