pub mod dispatcher;
pub mod encoder;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod request_logger;
pub mod sink;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use dispatcher::{Dispatch, Dispatcher, DispatchStats};
pub use encoder::{AccessEncoder, EncodeError, LazyEncoder};
pub use metrics::PipelineMetrics;
pub use pipeline::AccessPipeline;
pub use producer::{BrokerProducer, PublishOutcome};
pub use request_logger::RequestLogger;
pub use sink::{BrokerSink, ErrorReporter, MemorySink, OutboundMessage, SinkError};
