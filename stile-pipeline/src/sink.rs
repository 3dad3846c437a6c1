use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Depth of the error channel between sinks and the producer's drain task.
const ERROR_CHANNEL_CAPACITY: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("broker connect failed: {0}")]
    Connect(String),

    #[error("broker queue full")]
    QueueFull,

    #[error("delivery failed for key {key}: {reason}")]
    Delivery { key: String, reason: String },

    #[error("flush failed: {0}")]
    Flush(String),

    #[error("broker error: {0}")]
    Broker(String),
}

/// One message bound for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: String,
    pub payload: Bytes,
}

/// Destination for encoded access records.
///
/// `send` enqueues; delivery is asynchronous and later failures are pushed
/// through the [`ErrorReporter`] the sink was built with.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError>;

    /// Wait up to `timeout` for queued messages to be delivered.
    async fn flush(&self, timeout: Duration) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// Cloneable handle for reporting asynchronous broker errors.
///
/// Never blocks: when the drain task falls behind, errors are discarded.
#[derive(Clone)]
pub struct ErrorReporter {
    tx: mpsc::Sender<SinkError>,
}

impl ErrorReporter {
    pub fn report(&self, err: SinkError) {
        let _ = self.tx.try_send(err);
    }
}

pub(crate) fn error_channel() -> (ErrorReporter, mpsc::Receiver<SinkError>) {
    let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
    (ErrorReporter { tx }, rx)
}

/// In-process sink that keeps every message it is sent.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.messages.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BrokerSink for MemorySink {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
