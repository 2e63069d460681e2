//! Offline mode: no cluster connection, nothing is mutated.
//!
//! [`FixtureFeed`] replays recorded Application objects once and then stays
//! open; [`DryRunGateway`] records the mutations it would have sent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

use driftguard_domain::{AppIdentity, WatchScope};
use driftguard_ports::{ChangeEvent, ChangeFeed, ChangeStream, SyncGateway, SyncRequest};

#[derive(Debug, Default)]
pub struct DryRunGateway {
    requests: Mutex<Vec<(AppIdentity, SyncRequest)>>,
}

impl DryRunGateway {
    pub fn requests(&self) -> Vec<(AppIdentity, SyncRequest)> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SyncGateway for DryRunGateway {
    async fn trigger_sync(&self, app: &AppIdentity, request: &SyncRequest) -> Result<()> {
        info!(
            app = %app,
            revision = request.revision.as_deref().unwrap_or("<target>"),
            "dry run: would trigger sync"
        );
        if let Ok(mut guard) = self.requests.lock() {
            guard.push((app.clone(), request.clone()));
        }
        Ok(())
    }
}

pub struct FixtureFeed {
    objects: Vec<Value>,
    replayed: AtomicBool,
}

impl FixtureFeed {
    pub fn new(objects: Vec<Value>) -> Self {
        Self {
            objects,
            replayed: AtomicBool::new(false),
        }
    }

    /// Reads a YAML or JSON file holding either a list of Application objects
    /// or a `List` object with `items`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures at {}", path.display()))?;
        let parsed: Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid fixtures at {}", path.display()))?;
        let objects = match parsed {
            Value::Array(objects) => objects,
            Value::Object(mut list) => match list.remove("items") {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(list)],
            },
            Value::Null => Vec::new(),
            other => anyhow::bail!(
                "fixtures at {} must be a list of objects, found {other}",
                path.display()
            ),
        };
        Ok(Self::new(objects))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ChangeFeed for FixtureFeed {
    async fn subscribe(&self, scope: &WatchScope, _idle_timeout: Duration) -> Result<ChangeStream> {
        let replay = if self.replayed.swap(true, Ordering::SeqCst) {
            Vec::new()
        } else {
            info!(%scope, objects = self.objects.len(), "replaying offline fixtures");
            self.objects.clone()
        };
        let events = stream::iter(replay.into_iter().map(|object| Ok(ChangeEvent::modified(object))));
        Ok(events.chain(stream::pending()).boxed())
    }
}
