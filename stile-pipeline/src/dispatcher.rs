use crate::metrics::PipelineMetrics;
use crate::producer::BrokerProducer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use stile_core::{AccessRecord, StileError};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Admission result for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Accepted,
    /// No free slot, or the dispatcher is shut down. The record is gone.
    Dropped,
}

/// Point-in-time dispatcher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub accepted: u64,
    pub dropped: u64,
    pub running: usize,
    pub capacity: usize,
}

/// Bounded, non-blocking hand-off from request tasks to the producer.
///
/// At most `capacity` publishes run at once. There is no queue: a record
/// submitted while every slot is busy is dropped on the spot.
pub struct Dispatcher {
    slots: Arc<Semaphore>,
    capacity: usize,
    producer: Arc<BrokerProducer>,
    metrics: Arc<PipelineMetrics>,
    runtime: Handle,
    closed: AtomicBool,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl Dispatcher {
    /// Must be called inside a tokio runtime; publish tasks are spawned on it.
    pub fn new(
        capacity: usize,
        producer: Arc<BrokerProducer>,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, StileError> {
        if capacity == 0 {
            return Err(StileError::Config("dispatcher capacity must be > 0".into()));
        }
        if capacity > u32::MAX as usize {
            return Err(StileError::Config(format!(
                "dispatcher capacity must be <= {}",
                u32::MAX
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|e| StileError::Internal(format!("dispatcher needs a tokio runtime: {e}")))?;

        info!(capacity, "Dispatcher started");
        Ok(Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            producer,
            metrics,
            runtime,
            closed: AtomicBool::new(false),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Offer a record for publishing. Never blocks.
    pub fn submit(&self, record: Arc<AccessRecord>) -> Dispatch {
        if self.closed.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_dispatch("dropped");
            warn!(request_id = %record.request_id, "Dispatcher closed, access record dropped");
            return Dispatch::Dropped;
        }

        let permit = match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_dispatch("dropped");
                warn!(
                    running = self.running(),
                    capacity = self.capacity,
                    request_id = %record.request_id,
                    "Dispatcher saturated, access record dropped"
                );
                return Dispatch::Dropped;
            }
        };

        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_dispatch("accepted");
        self.metrics.set_running(self.running());

        let producer = Arc::clone(&self.producer);
        let metrics = Arc::clone(&self.metrics);
        let slots = Arc::clone(&self.slots);
        let capacity = self.capacity;
        self.runtime.spawn(async move {
            producer.publish(record).await;
            drop(permit);
            metrics.set_running(capacity.saturating_sub(slots.available_permits()));
        });

        Dispatch::Accepted
    }

    /// Publishes currently holding a slot.
    pub fn running(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            running: self.running(),
            capacity: self.capacity,
        }
    }

    /// Stop admitting records and wait up to `timeout` for in-flight
    /// publishes. Returns whether everything drained in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.closed.store(true, Ordering::Release);

        // Bounded by u32::MAX in new().
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        let drained = match tokio::time::timeout(timeout, self.slots.acquire_many(all)).await {
            Ok(Ok(permits)) => {
                drop(permits);
                true
            }
            Ok(Err(_)) => true,
            Err(_) => false,
        };
        self.slots.close();

        if drained {
            info!("Dispatcher drained");
        } else {
            warn!(running = self.running(), "Dispatcher shutdown timed out with publishes in flight");
        }
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
