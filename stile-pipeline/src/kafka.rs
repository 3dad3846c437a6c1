use crate::sink::{BrokerSink, ErrorReporter, OutboundMessage, SinkError};
use async_trait::async_trait;
use rdkafka::ClientContext;
use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::Duration;
use stile_core::config::BrokerConfig;
use tokio::time::Instant;
use tracing::debug;

/// Pause between enqueue attempts while the client queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(10);

/// Routes delivery failures into the producer's error drain.
struct ReportingContext {
    reporter: ErrorReporter,
}

impl ClientContext for ReportingContext {}

impl ProducerContext for ReportingContext {
    type DeliveryOpaque = ();

    fn delivery(&self, result: &DeliveryResult<'_>, _opaque: Self::DeliveryOpaque) {
        if let Err((err, message)) = result {
            let key = message
                .key()
                .map(String::from_utf8_lossy)
                .unwrap_or_default()
                .into_owned();
            self.reporter.report(SinkError::Delivery {
                key,
                reason: err.to_string(),
            });
        }
    }
}

/// Kafka sink on librdkafka's threaded producer.
///
/// Batching, compression and acks are left to the client: messages linger
/// up to `flush_interval_ms` or until `flush_messages` are queued.
pub struct KafkaSink {
    producer: Arc<ThreadedProducer<ReportingContext>>,
    enqueue_timeout: Duration,
}

impl KafkaSink {
    pub fn connect(
        config: &BrokerConfig,
        reporter: ErrorReporter,
    ) -> Result<Arc<dyn BrokerSink>, SinkError> {
        let producer: ThreadedProducer<ReportingContext> = client_config(config)
            .create_with_context(ReportingContext { reporter })
            .map_err(|e| SinkError::Connect(e.to_string()))?;

        debug!(brokers = ?config.brokers, "Kafka producer created");
        Ok(Arc::new(Self {
            producer: Arc::new(producer),
            enqueue_timeout: Duration::from_millis(config.message_timeout_ms),
        }))
    }
}

fn client_config(config: &BrokerConfig) -> ClientConfig {
    let mut cc = ClientConfig::new();
    cc.set("bootstrap.servers", config.brokers.join(","))
        .set("acks", config.required_acks.as_kafka_str())
        .set("compression.type", config.compression.as_kafka_str())
        .set("queue.buffering.max.ms", config.flush_interval_ms.to_string())
        .set("batch.num.messages", config.flush_messages.to_string())
        .set("message.timeout.ms", config.message_timeout_ms.to_string());
    cc
}

#[async_trait]
impl BrokerSink for KafkaSink {
    /// Enqueue with librdkafka. A full local queue is retried until the
    /// message timeout, which holds the dispatcher slot as backpressure.
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        let deadline = Instant::now() + self.enqueue_timeout;
        loop {
            let record = BaseRecord::<str, [u8]>::to(&message.topic)
                .key(message.key.as_str())
                .payload(&message.payload[..]);
            match self.producer.send(record) {
                Ok(()) => return Ok(()),
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                    if Instant::now() >= deadline {
                        return Err(SinkError::QueueFull);
                    }
                }
                Err((e, _)) => return Err(SinkError::Broker(e.to_string())),
            }
            tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<(), SinkError> {
        let producer = Arc::clone(&self.producer);
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| SinkError::Flush(e.to_string()))?
            .map_err(|e| SinkError::Flush(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stile_core::config::{Compression, RequiredAcks};

    #[test]
    fn client_config_carries_batching_settings() {
        let config = BrokerConfig {
            enabled: true,
            brokers: vec!["k1:9092".into(), "k2:9092".into()],
            ..Default::default()
        };
        let cc = client_config(&config);
        assert_eq!(cc.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
        assert_eq!(cc.get("acks"), Some("1"));
        assert_eq!(cc.get("compression.type"), Some("snappy"));
        assert_eq!(cc.get("queue.buffering.max.ms"), Some("3000"));
        assert_eq!(cc.get("batch.num.messages"), Some("1000"));
    }

    #[test]
    fn acks_and_compression_follow_config() {
        let config = BrokerConfig {
            required_acks: RequiredAcks::All,
            compression: Compression::Zstd,
            ..Default::default()
        };
        let cc = client_config(&config);
        assert_eq!(cc.get("acks"), Some("all"));
        assert_eq!(cc.get("compression.type"), Some("zstd"));
    }

    #[tokio::test]
    async fn connect_builds_without_reachable_broker() {
        let (reporter, _rx) = crate::sink::error_channel();
        let config = BrokerConfig {
            enabled: true,
            brokers: vec!["127.0.0.1:1".into()],
            ..Default::default()
        };
        let sink = KafkaSink::connect(&config, reporter).unwrap();
        assert_eq!(sink.name(), "kafka");
    }
}
