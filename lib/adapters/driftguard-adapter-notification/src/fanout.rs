use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

use driftguard_domain::DriftReport;
use driftguard_ports::ReportSink;

/// Delivers each report to every inner sink. One failing sink does not stop
/// the others; their errors are joined into one.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<(&'static str, Arc<dyn ReportSink>)>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push((name, Arc::new(sink)));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ReportSink for FanoutSink {
    async fn deliver(&self, report: &DriftReport) -> Result<()> {
        let results = join_all(
            self.sinks
                .iter()
                .map(|(name, sink)| async move { (*name, sink.deliver(report).await) }),
        )
        .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|(name, result)| {
                result.err().map(|err| {
                    warn!(sink = name, app = %report.application, error = %format!("{err:#}"), "sink delivery failed");
                    format!("{name}: {err:#}")
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{} sink(s) failed: {}", failures.len(), failures.join("; ")))
        }
    }
}
