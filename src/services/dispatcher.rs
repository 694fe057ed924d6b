use crate::models::ScanRequest;
use crate::services::pipeline::{ScanOutcome, ScanPipeline};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("scan capacity reached ({0} scans in flight)")]
    AtCapacity(usize),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InFlightScan {
    pub id: Uuid,
    pub bucket_key: String,
    pub backend_file_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub in_flight: u64,
    pub clean: u64,
    pub detected: u64,
    pub fetch_failed: u64,
    pub scan_failed: u64,
}

#[derive(Debug, Default)]
struct ScanStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    clean: AtomicU64,
    detected: AtomicU64,
    fetch_failed: AtomicU64,
    scan_failed: AtomicU64,
}

impl ScanStats {
    fn record(&self, outcome: &ScanOutcome) {
        let counter = match outcome {
            ScanOutcome::Clean => &self.clean,
            ScanOutcome::Detected { .. } => &self.detected,
            ScanOutcome::FetchFailed => &self.fetch_failed,
            ScanOutcome::ScanFailed => &self.scan_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Removes a scan from the registry when its task ends, including on panic.
struct InFlightGuard {
    id: Uuid,
    registry: Arc<DashMap<Uuid, InFlightScan>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

/// A scan handed off to the background.
#[derive(Debug)]
pub struct DispatchedScan {
    pub id: Uuid,
    pub handle: JoinHandle<ScanOutcome>,
}

/// Runs pipelines in the background with a hard cap on how many run at once.
///
/// When every permit is taken new scans are rejected instead of queued.
#[derive(Clone)]
pub struct ScanDispatcher {
    pipeline: ScanPipeline,
    permits: Arc<Semaphore>,
    capacity: usize,
    registry: Arc<DashMap<Uuid, InFlightScan>>,
    stats: Arc<ScanStats>,
}

impl ScanDispatcher {
    pub fn new(pipeline: ScanPipeline, capacity: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            registry: Arc::new(DashMap::new()),
            stats: Arc::new(ScanStats::default()),
        }
    }

    pub fn dispatch(&self, request: ScanRequest) -> Result<DispatchedScan, DispatchError> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    bucket_key = %request.bucket_key,
                    capacity = self.capacity,
                    "rejecting scan, dispatcher at capacity"
                );
                return Err(DispatchError::AtCapacity(self.capacity));
            }
        };

        let id = Uuid::new_v4();
        self.registry.insert(
            id,
            InFlightScan {
                id,
                bucket_key: request.bucket_key.clone(),
                backend_file_id: request.backend_file_id.clone(),
                started_at: Utc::now(),
            },
        );
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);

        let guard = InFlightGuard {
            id,
            registry: self.registry.clone(),
        };
        let pipeline = self.pipeline.clone();
        let stats = self.stats.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;

            let outcome = pipeline.run(&request).await;
            stats.record(&outcome);
            tracing::debug!(scan_id = %id, outcome = outcome.label(), "scan finished");
            outcome
        });

        Ok(DispatchedScan { id, handle })
    }

    pub fn in_flight(&self) -> Vec<InFlightScan> {
        let mut scans: Vec<InFlightScan> =
            self.registry.iter().map(|entry| entry.value().clone()).collect();
        scans.sort_by_key(|s| s.started_at);
        scans
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            accepted: self.stats.accepted.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            in_flight: self.registry.len() as u64,
            clean: self.stats.clean.load(Ordering::Relaxed),
            detected: self.stats.detected.load(Ordering::Relaxed),
            fetch_failed: self.stats.fetch_failed.load(Ordering::Relaxed),
            scan_failed: self.stats.scan_failed.load(Ordering::Relaxed),
        }
    }
}
