use super::reader::{ResourceReader, SysinfoReader};
use super::types::{ApplicationMetrics, MetricsSnapshot, ProcessMetrics, SystemMetrics};
use crate::error::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Takes on-demand resource snapshots
#[derive(Clone)]
pub struct MetricsCollector {
    reader: Arc<dyn ResourceReader>,
}

impl MetricsCollector {
    pub fn new(reader: Arc<dyn ResourceReader>) -> Self {
        Self { reader }
    }

    /// Collector over the live host
    pub fn system() -> Self {
        Self::new(Arc::new(SysinfoReader::new()))
    }

    /// Read every resource independently; a failed read only marks its own field
    pub async fn snapshot(&self, application: ApplicationMetrics) -> Result<MetricsSnapshot> {
        let reader = Arc::clone(&self.reader);

        let (system, process) = tokio::task::spawn_blocking(move || {
            let system = SystemMetrics {
                cpu_percent: reader.cpu_percent().into(),
                load_average: reader.load_average().into(),
                memory: reader.memory().into(),
                disk: reader.disk().into(),
            };
            let process = ProcessMetrics {
                resources: reader.process().into(),
                threads: reader.thread_count().into(),
            };
            (system, process)
        })
        .await
        .map_err(|e| AppError::system(format!("metrics collection task failed: {}", e)))?;

        debug!("Collected metrics snapshot");

        Ok(MetricsSnapshot {
            timestamp: Utc::now(),
            system,
            process,
            application,
        })
    }
}
