use http::{HeaderMap, Method, Uri};
use std::net::{IpAddr, SocketAddr};
use stile_track::SignalSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Grpc,
}

/// Server-side transport of one call.
///
/// Only HTTP transports expose a request; everything else is passed through
/// the interceptor without instrumentation.
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Fully qualified operation name, e.g. `/orders.v1.Orders/Create`.
    fn operation(&self) -> &str;

    fn http_request(&self) -> Option<&HttpRequest> {
        None
    }
}

/// The inbound HTTP request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    peer: Option<SocketAddr>,
    cookies: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, peer: Option<SocketAddr>) -> Self {
        let cookies = parse_cookies(&headers);
        let query = uri.query().map(parse_query).unwrap_or_default();
        Self {
            method,
            uri,
            headers,
            peer,
            cookies,
            query,
        }
    }

    pub fn from_parts(parts: &http::request::Parts, peer: Option<SocketAddr>) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            peer,
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn peer_ip(&self) -> Option<IpAddr> {
        self.peer.map(|addr| addr.ip())
    }
}

impl SignalSource for HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// `Cookie` headers split into name/value pairs, in header order.
fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (form_decode(k), form_decode(v))
        })
        .collect()
}

fn form_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(s) => s.into_owned(),
        Err(_) => spaced,
    }
}

pub struct HttpTransport {
    request: HttpRequest,
    operation: String,
}

impl HttpTransport {
    pub fn new(request: HttpRequest) -> Self {
        let operation = format!("{} {}", request.method(), request.path());
        Self { request, operation }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }
}

impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    fn http_request(&self) -> Option<&HttpRequest> {
        Some(&self.request)
    }
}

pub struct GrpcTransport {
    operation: String,
    metadata: HeaderMap,
}

impl GrpcTransport {
    pub fn new(operation: impl Into<String>, metadata: HeaderMap) -> Self {
        Self {
            operation: operation.into(),
            metadata,
        }
    }

    pub fn metadata(&self) -> &HeaderMap {
        &self.metadata
    }
}

impl Transport for GrpcTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Grpc
    }

    fn operation(&self) -> &str {
        &self.operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn request(uri: &str, headers: &[(&'static str, &str)]) -> HttpRequest {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.append(*k, HeaderValue::from_str(v).unwrap());
        }
        HttpRequest::new(
            Method::GET,
            uri.parse().unwrap(),
            map,
            Some("10.1.2.3:40000".parse().unwrap()),
        )
    }

    #[test]
    fn cookies_parsed_across_headers() {
        let req = request(
            "/",
            &[("cookie", "a=1; SESSIONID=abc"), ("cookie", "Device-Id=\"D9\"")],
        );
        assert_eq!(req.cookie("SESSIONID"), Some("abc"));
        assert_eq!(req.cookie("Device-Id"), Some("D9"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn query_values_are_form_decoded() {
        let req = request("/api?access_token=t%2B1&name=a+b&flag", &[]);
        assert_eq!(req.query("access_token"), Some("t+1"));
        assert_eq!(req.query("name"), Some("a b"));
        assert_eq!(req.query("flag"), Some(""));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request("/", &[("x-device-id", "D1")]);
        assert_eq!(req.header("X-Device-Id"), Some("D1"));
    }

    #[test]
    fn http_transport_exposes_request() {
        let t = HttpTransport::new(request("/api/orders?x=1", &[]));
        assert_eq!(t.kind(), TransportKind::Http);
        assert_eq!(t.operation(), "GET /api/orders");
        let req = t.http_request().unwrap();
        assert_eq!(req.path(), "/api/orders");
        assert_eq!(req.peer_ip().unwrap().to_string(), "10.1.2.3");
    }

    #[test]
    fn grpc_transport_has_no_http_request() {
        let t = GrpcTransport::new("/orders.v1.Orders/Create", HeaderMap::new());
        assert_eq!(t.kind(), TransportKind::Grpc);
        assert!(t.http_request().is_none());
    }
}
