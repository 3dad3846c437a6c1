use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for the interceptor's own diagnostic lines.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Forwards to `tracing` under the `stile::access` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => debug!(target: "stile::access", "{message}"),
            Level::Info => info!(target: "stile::access", "{message}"),
            Level::Warn => warn!(target: "stile::access", "{message}"),
            Level::Error => error!(target: "stile::access", "{message}"),
        }
    }
}
