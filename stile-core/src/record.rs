use crate::latency;
use crate::profile::TrackingProfile;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Substituted for the request body when body logging is suppressed.
pub const IGNORED_BODY: &str = "[ignored]";

/// Inbound request as captured by the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub uri: String,
    pub header: BTreeMap<String, String>,
    pub body: String,
}

/// Handler outcome as seen by the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub header: BTreeMap<String, String>,
    pub body: String,
}

/// One completed request/response cycle.
///
/// Built by the interceptor on the request task, then shared read-only
/// (`Arc<AccessRecord>`) with the dispatcher, encoder, and producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    pub server_id: String,
    pub server_port: String,
    pub request_id: String,
    pub request: Request,
    pub response: Response,
    /// Go-style duration string, e.g. `"1.5ms"`.
    pub latency: String,
    pub latency_ns: i64,
    #[serde(rename = "user_track_feature")]
    pub profile: TrackingProfile,
}

impl AccessRecord {
    /// Create a record stamped at `timestamp`; fill the remaining fields
    /// before handing it off.
    pub fn new(timestamp: DateTime<Utc>, request_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            server_id: String::new(),
            server_port: String::new(),
            request_id: request_id.into(),
            request: Request::default(),
            response: Response::default(),
            latency: latency::format_duration(Duration::ZERO),
            latency_ns: 0,
            profile: TrackingProfile::default(),
        }
    }

    /// Set both latency fields from the same measurement.
    pub fn set_latency(&mut self, elapsed: Duration) {
        self.latency = latency::format_duration(elapsed);
        self.latency_ns = latency::duration_nanos(elapsed);
    }

    /// Serialise to a compact JSON line.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Flatten a header map to one string per key; repeated values are joined
/// with a single space.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push(' ');
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

/// Request id fallback when no trace header is present: current Unix time
/// in nanoseconds.
pub fn fallback_request_id(now: DateTime<Utc>) -> String {
    let mut buf = itoa::Buffer::new();
    match now.timestamp_nanos_opt() {
        Some(ns) => buf.format(ns).to_owned(),
        None => buf.format(now.timestamp_micros()).to_owned(),
    }
}
