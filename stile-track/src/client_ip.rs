use crate::signals::SignalSource;
use std::net::IpAddr;

/// Forwarding headers consulted for the client IP, in priority order.
pub const FORWARDED_HEADERS: &[&str] = &[
    "X-Original-Forwarded-For",
    "X-Forwarded-For",
    "X-Client-Ip",
    "Cdn-Src-Ip",
    "X-Real-Ip",
];

/// Resolve the client IP behind proxies and CDNs.
///
/// The first forwarding header with a non-empty first entry wins; list
/// valued headers contribute only their first comma-separated entry.
/// Falls back to the peer socket address.
pub fn resolve<S: SignalSource + ?Sized>(source: &S, peer: Option<IpAddr>) -> Option<String> {
    FORWARDED_HEADERS
        .iter()
        .find_map(|name| source.header(name).and_then(first_addr))
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}

fn first_addr(value: &str) -> Option<&str> {
    let first = match value.find(',') {
        Some(idx) => &value[..idx],
        None => value,
    };
    let first = first.trim();
    (!first.is_empty()).then_some(first)
}
