use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use serde_json::{Value, json};
use tracing::debug;

use driftguard_domain::AppIdentity;
use driftguard_domain::config::DEFAULT_APPLICATION_NAMESPACE;
use driftguard_ports::{SyncGateway, SyncRequest};

use crate::application_resource;

const INITIATOR: &str = "driftguard";

/// Merge patch that starts an Argo CD sync operation.
///
/// This is the only request shape the controller sends; it does not touch
/// `spec.syncPolicy`.
pub fn sync_patch(request: &SyncRequest) -> Value {
    let mut sync = json!({
        "prune": request.prune,
        "syncStrategy": { "apply": { "force": request.force } }
    });
    if let Some(revision) = &request.revision {
        sync["revision"] = Value::String(revision.clone());
    }
    json!({
        "operation": {
            "initiatedBy": { "username": INITIATOR, "automated": true },
            "sync": sync
        }
    })
}

#[derive(Clone)]
pub struct ArgoCdSyncGateway {
    client: Client,
    resource: ApiResource,
    default_namespace: String,
}

impl ArgoCdSyncGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: application_resource(),
            default_namespace: DEFAULT_APPLICATION_NAMESPACE.to_string(),
        }
    }

    /// Namespace used for applications whose identity carries none.
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    fn namespace_for<'a>(&'a self, app: &'a AppIdentity) -> &'a str {
        if app.namespace.is_empty() {
            &self.default_namespace
        } else {
            &app.namespace
        }
    }
}

#[async_trait]
impl SyncGateway for ArgoCdSyncGateway {
    async fn trigger_sync(&self, app: &AppIdentity, request: &SyncRequest) -> Result<()> {
        let namespace = self.namespace_for(app);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.resource);
        let patch = sync_patch(request);
        debug!(app = %app, %patch, "patching application");
        api.patch(&app.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("failed to trigger sync for {namespace}/{}", app.name))?;
        Ok(())
    }
}
