use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::metrics::PipelineMetrics;
use crate::producer::BrokerProducer;
use crate::request_logger::RequestLogger;
use std::sync::Arc;
use std::time::Duration;
use stile_core::StileError;
use stile_core::config::DispatcherConfig;
use tracing::info;

/// Dispatcher and producer wired together, with one start/stop lifecycle.
pub struct AccessPipeline {
    dispatcher: Arc<Dispatcher>,
    producer: Arc<BrokerProducer>,
    metrics: Arc<PipelineMetrics>,
    shutdown_timeout: Duration,
}

impl AccessPipeline {
    pub fn start(
        config: &DispatcherConfig,
        producer: BrokerProducer,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, StileError> {
        let producer = Arc::new(producer);
        let dispatcher = Dispatcher::new(config.capacity, Arc::clone(&producer), Arc::clone(&metrics))?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            producer,
            metrics,
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
        })
    }

    /// Handle for the interceptor.
    pub fn request_logger(&self) -> Arc<dyn RequestLogger> {
        Arc::clone(&self.dispatcher) as Arc<dyn RequestLogger>
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Drain in-flight publishes, then flush the broker client. Both steps
    /// share the configured shutdown timeout.
    pub async fn stop(self) -> DispatchStats {
        let started = tokio::time::Instant::now();
        self.dispatcher.shutdown(self.shutdown_timeout).await;

        let remaining = self.shutdown_timeout.saturating_sub(started.elapsed());
        self.producer.flush(remaining).await;

        let stats = self.dispatcher.stats();
        info!(
            accepted = stats.accepted,
            dropped = stats.dropped,
            running = stats.running,
            "Access pipeline stopped"
        );
        stats
    }
}
