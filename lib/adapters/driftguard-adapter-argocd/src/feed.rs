use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{StreamExt, future};
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, WatchParams};
use kube::core::WatchEvent;
use std::time::Duration;
use tracing::debug;

use driftguard_domain::WatchScope;
use driftguard_domain::config::MAX_IDLE_TIMEOUT_SECS;
use driftguard_ports::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};

use crate::application_resource;

/// List-and-watch over Argo CD Applications. Starting from resource version
/// "0" replays the current objects as `Added` before live changes.
#[derive(Clone)]
pub struct ApplicationFeed {
    client: Client,
    resource: ApiResource,
}

impl ApplicationFeed {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: application_resource(),
        }
    }

    fn api(&self, scope: &WatchScope) -> Api<DynamicObject> {
        match scope {
            WatchScope::Namespaced { namespace } => {
                Api::namespaced_with(self.client.clone(), namespace, &self.resource)
            }
            WatchScope::Cluster => Api::all_with(self.client.clone(), &self.resource),
        }
    }
}

#[async_trait]
impl ChangeFeed for ApplicationFeed {
    async fn subscribe(&self, scope: &WatchScope, idle_timeout: Duration) -> Result<ChangeStream> {
        let timeout = u32::try_from(idle_timeout.as_secs())
            .unwrap_or(MAX_IDLE_TIMEOUT_SECS)
            .clamp(1, MAX_IDLE_TIMEOUT_SECS);
        let params = WatchParams::default().timeout(timeout);
        let events = self
            .api(scope)
            .watch(&params, "0")
            .await
            .with_context(|| format!("failed to watch applications in {scope}"))?;

        let changes = events.filter_map(|event| future::ready(into_change(event)));
        Ok(changes.boxed())
    }
}

fn into_change(event: kube::Result<WatchEvent<DynamicObject>>) -> Option<Result<ChangeEvent>> {
    let (kind, object) = match event {
        Ok(WatchEvent::Added(object)) => (ChangeKind::Added, object),
        Ok(WatchEvent::Modified(object)) => (ChangeKind::Modified, object),
        Ok(WatchEvent::Deleted(object)) => {
            debug!(name = ?object.metadata.name, "application deleted");
            return None;
        }
        Ok(WatchEvent::Bookmark(_)) => return None,
        Ok(WatchEvent::Error(status)) => return Some(Err(anyhow!("watch error: {status:?}"))),
        Err(err) => return Some(Err(anyhow::Error::new(err).context("watch stream failed"))),
    };
    Some(
        serde_json::to_value(&object)
            .map(|object| ChangeEvent { kind, object })
            .context("failed to encode watched application"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use serde_json::json;

    fn application(name: &str) -> DynamicObject {
        let mut object = DynamicObject::new(name, &application_resource());
        object.metadata = ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("argocd".to_string()),
            ..ObjectMeta::default()
        };
        object.data = json!({ "status": { "sync": { "status": "OutOfSync" } } });
        object
    }

    #[test]
    fn test_added_and_modified_become_changes() {
        let change = into_change(Ok(WatchEvent::Modified(application("web"))))
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, ChangeKind::Modified);
        assert_eq!(change.object["metadata"]["name"], "web");
        assert_eq!(change.object["status"]["sync"]["status"], "OutOfSync");
        assert_eq!(change.object["kind"], "Application");

        let change = into_change(Ok(WatchEvent::Added(application("api"))))
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, ChangeKind::Added);
    }

    fn watch_event(raw: serde_json::Value) -> WatchEvent<DynamicObject> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_deleted_events_are_dropped() {
        assert!(into_change(Ok(WatchEvent::Deleted(application("web")))).is_none());
    }

    #[test]
    fn test_bookmark_events_are_dropped() {
        let bookmark = watch_event(json!({
            "type": "BOOKMARK",
            "object": {
                "apiVersion": "argoproj.io/v1alpha1",
                "kind": "Application",
                "metadata": { "resourceVersion": "4711" }
            }
        }));
        assert!(matches!(bookmark, WatchEvent::Bookmark(_)));
        assert!(into_change(Ok(bookmark)).is_none());
    }

    #[test]
    fn test_error_event_is_a_fault() {
        let expired = watch_event(json!({
            "type": "ERROR",
            "object": {
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": "too old resource version: 1 (4711)",
                "reason": "Expired",
                "code": 410
            }
        }));
        assert!(matches!(expired, WatchEvent::Error(_)));

        let err = into_change(Ok(expired)).unwrap().unwrap_err();
        assert!(err.to_string().starts_with("watch error"));
    }
}
