pub mod context;
pub mod handler;
pub mod interceptor;
pub mod logger;
pub mod options;
pub mod transport;

pub use context::{ServerContext, UserIdentity};
pub use handler::{AccessError, Handler};
pub use interceptor::{AccessLog, access_log};
pub use logger::{Level, Logger, TracingLogger};
pub use options::{HideBodyFn, Options};
pub use transport::{GrpcTransport, HttpRequest, HttpTransport, Transport, TransportKind};
