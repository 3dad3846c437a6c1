use crate::encoder::AccessEncoder;
use crate::metrics::PipelineMetrics;
use crate::sink::{self, BrokerSink, ErrorReporter, OutboundMessage, SinkError};
use std::sync::Arc;
use std::time::Duration;
use stile_core::AccessRecord;
use stile_core::config::BrokerConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What happened to one record handed to [`BrokerProducer::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Enqueued with the sink. Delivery errors surface later through the
    /// error drain.
    Published,
    /// Path under the public-storage prefix; never sent.
    Filtered,
    /// No sink was initialized.
    Disabled,
    EncodeFailed,
    /// The sink refused the message.
    Rejected,
}

impl PublishOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishOutcome::Published => "published",
            PublishOutcome::Filtered => "filtered",
            PublishOutcome::Disabled => "disabled",
            PublishOutcome::EncodeFailed => "encode_failed",
            PublishOutcome::Rejected => "rejected",
        }
    }
}

/// Fire-and-forget publisher of access records.
///
/// Owns a background task that drains broker errors for the producer's
/// lifetime. The task ends once the producer and its sink are dropped.
pub struct BrokerProducer {
    sink: Option<Arc<dyn BrokerSink>>,
    reporter: Option<ErrorReporter>,
    topic: String,
    public_storage_prefix: String,
    metrics: Arc<PipelineMetrics>,
}

impl BrokerProducer {
    /// Build the producer. `connect` receives the error reporter the sink
    /// must use for asynchronous delivery failures.
    ///
    /// Must be called inside a tokio runtime when `config.enabled` is set.
    /// A failed connect is logged and yields a disabled producer.
    pub fn start<F>(config: &BrokerConfig, metrics: Arc<PipelineMetrics>, connect: F) -> Self
    where
        F: FnOnce(ErrorReporter) -> Result<Arc<dyn BrokerSink>, SinkError>,
    {
        if !config.enabled {
            info!("Broker publishing disabled");
            return Self::disabled(config, metrics);
        }

        let (reporter, errors) = sink::error_channel();
        let sink = match connect(reporter.clone()) {
            Ok(sink) => sink,
            Err(e) => {
                error!(error = %e, brokers = ?config.brokers, "Broker producer init failed, publishing disabled");
                return Self::disabled(config, metrics);
            }
        };

        tokio::spawn(drain_errors(errors, Arc::clone(&metrics)));
        info!(
            sink = sink.name(),
            topic = %config.topic,
            brokers = ?config.brokers,
            "Broker producer started"
        );

        Self {
            sink: Some(sink),
            reporter: Some(reporter),
            topic: config.topic.clone(),
            public_storage_prefix: config.public_storage_prefix.clone(),
            metrics,
        }
    }

    /// Producer without a sink: every publish is a silent no-op.
    pub fn disabled(config: &BrokerConfig, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            sink: None,
            reporter: None,
            topic: config.topic.clone(),
            public_storage_prefix: config.public_storage_prefix.clone(),
            metrics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub async fn publish(&self, record: Arc<AccessRecord>) -> PublishOutcome {
        let outcome = self.publish_inner(record).await;
        self.metrics.record_publish(outcome.as_str());
        outcome
    }

    async fn publish_inner(&self, record: Arc<AccessRecord>) -> PublishOutcome {
        let Some(sink) = &self.sink else {
            return PublishOutcome::Disabled;
        };

        if !self.public_storage_prefix.is_empty()
            && record.request.path.starts_with(&self.public_storage_prefix)
        {
            debug!(path = %record.request.path, "Skipping public storage request");
            return PublishOutcome::Filtered;
        }

        let key = record.request_id.clone();
        let encoder = AccessEncoder::new(record);
        let payload = match encoder.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, request_id = %key, "Access record encode failed, dropped");
                return PublishOutcome::EncodeFailed;
            }
        };

        let message = OutboundMessage {
            topic: self.topic.clone(),
            key,
            payload,
        };
        match sink.send(message).await {
            Ok(()) => PublishOutcome::Published,
            Err(e) => {
                if let Some(ref reporter) = self.reporter {
                    reporter.report(e);
                }
                PublishOutcome::Rejected
            }
        }
    }

    /// Flush the sink, waiting at most `timeout`.
    pub async fn flush(&self, timeout: Duration) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.flush(timeout).await {
            warn!(error = %e, "Broker flush incomplete");
        }
    }
}

async fn drain_errors(mut errors: mpsc::Receiver<SinkError>, metrics: Arc<PipelineMetrics>) {
    while let Some(err) = errors.recv().await {
        metrics.record_broker_error();
        error!(error = %err, "Broker publish failed");
    }
    debug!("Broker error drain stopped");
}
