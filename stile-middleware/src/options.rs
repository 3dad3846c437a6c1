use crate::logger::{Logger, TracingLogger};
use http::HeaderMap;
use std::sync::Arc;
use stile_core::config::{AccessLogConfig, ServerConfig};
use stile_pipeline::RequestLogger;
use stile_track::DEFAULT_SESSION_COOKIES;

/// Decides from the request headers whether the body is replaced by
/// `"[ignored]"` in the access record.
pub type HideBodyFn = Arc<dyn Fn(&HeaderMap) -> bool + Send + Sync>;

/// Interceptor options.
#[derive(Clone)]
pub struct Options {
    /// Echo every record through `logger` at debug level.
    pub debug: bool,
    /// Paths with this prefix are passed through uninstrumented. Empty
    /// disables the check.
    pub ignore_prefix: String,
    /// Accepted for config compatibility; never consulted.
    pub ignore_content_types: Vec<String>,
    pub hide_request_body: Option<HideBodyFn>,
    /// Records are built but go nowhere when unset.
    pub request_logger: Option<Arc<dyn RequestLogger>>,
    pub logger: Arc<dyn Logger>,
    pub request_id_header: String,
    /// Cookies read for the session id, in priority order.
    pub session_cookies: Vec<String>,
    pub server_id: String,
    pub server_port: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            debug: false,
            ignore_prefix: String::new(),
            ignore_content_types: Vec::new(),
            hide_request_body: None,
            request_logger: None,
            logger: Arc::new(TracingLogger),
            request_id_header: "trace.id".to_string(),
            session_cookies: DEFAULT_SESSION_COOKIES.iter().map(|c| c.to_string()).collect(),
            server_id: String::new(),
            server_port: String::new(),
        }
    }
}

impl Options {
    pub fn from_config(server: &ServerConfig, access: &AccessLogConfig) -> Self {
        let hide_request_body = if access.hide_body_headers.is_empty() {
            None
        } else {
            Some(hide_when_any_header(access.hide_body_headers.clone()))
        };
        Self {
            debug: access.debug,
            ignore_prefix: access.ignore_prefix.clone(),
            ignore_content_types: access.ignore_content_types.clone(),
            hide_request_body,
            request_id_header: access.request_id_header.clone(),
            session_cookies: access.session_cookies.clone(),
            server_id: server.id.clone(),
            server_port: server.port(),
            ..Self::default()
        }
    }

    pub fn with_request_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.request_logger = Some(logger);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_hide_request_body<F>(mut self, f: F) -> Self
    where
        F: Fn(&HeaderMap) -> bool + Send + Sync + 'static,
    {
        self.hide_request_body = Some(Arc::new(f));
        self
    }

    pub(crate) fn hides_body(&self, headers: &HeaderMap) -> bool {
        self.hide_request_body
            .as_ref()
            .is_some_and(|hide| hide(headers))
    }
}

/// Hide the body whenever any of `names` is present on the request.
pub fn hide_when_any_header(names: Vec<String>) -> HideBodyFn {
    Arc::new(move |headers: &HeaderMap| names.iter().any(|n| headers.contains_key(n.as_str())))
}
