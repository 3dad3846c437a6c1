use crate::geo;
use ipnet::Ipv6Net;
use std::net::{IpAddr, Ipv6Addr};
use stile_core::GeoLocation;

/// WebRTC candidate addresses split by reachability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebrtcAddrs {
    pub all: Vec<String>,
    pub public: Vec<GeoLocation>,
    pub private: Vec<String>,
}

/// Split a comma-separated address list reported by the client.
///
/// Entries that do not parse as IP addresses are kept in `all` only.
pub fn classify(raw: &str) -> WebrtcAddrs {
    let mut out = WebrtcAddrs::default();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        out.all.push(entry.to_string());
        match entry.parse::<IpAddr>() {
            Ok(ip) if is_private(&ip) => out.private.push(entry.to_string()),
            Ok(_) => {
                let mut loc = geo::locate_ip(entry).or_placeholder();
                loc.ip_addr = Some(entry.to_string());
                out.public.push(loc);
            }
            Err(_) => {}
        }
    }
    out
}

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || in_net(v6, Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7)
                || in_net(v6, Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10)
        }
    }
}

fn in_net(ip: &Ipv6Addr, base: Ipv6Addr, prefix: u8) -> bool {
    Ipv6Net::new(base, prefix)
        .map(|net| net.contains(ip))
        .unwrap_or(false)
}
