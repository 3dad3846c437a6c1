use crate::geo;
use crate::signals::TrackingSignals;
use crate::webrtc;
use stile_core::{GeoLocation, TrackingProfile};
use tracing::debug;

/// Normalize raw signals into a tracking profile.
///
/// Total: never fails. Missing or malformed signals leave the matching
/// profile field unset.
pub fn parse(signals: &TrackingSignals) -> TrackingProfile {
    let ip_addr = non_empty(&signals.client_ip);
    let webrtc = signals
        .webrtc_addrs
        .as_deref()
        .map(webrtc::classify)
        .unwrap_or_default();

    let bundle_id = non_empty(&signals.app_bundle_id).or_else(|| non_empty(&signals.bundle_id));

    // Plain concatenation: an absent port still yields "<ip>:".
    let remote_addr = format!(
        "{}:{}",
        ip_addr.as_deref().unwrap_or_default(),
        signals.remote_port.as_deref().unwrap_or_default()
    );

    let ip_addr_location = geo::locate_ip(ip_addr.as_deref().unwrap_or_default()).or_placeholder();

    TrackingProfile {
        http_request_id: non_empty(&signals.request_id),

        ip_addr,
        remote_addr: Some(remote_addr),
        webrtc_addrs: webrtc.all,
        webrtc_public_addrs: webrtc.public,
        webrtc_private_addrs: webrtc.private,
        mac_addr: non_empty(&signals.client_mac),
        wifi_ssid: non_empty(&signals.wifi_ssid),
        wifi_bssid: non_empty(&signals.wifi_bssid),

        app_version: non_empty(&signals.app_version),
        app_bundle_id: bundle_id,
        app_bundle_name: non_empty(&signals.app_bundle_name),

        device_id: non_empty(&signals.device_id),
        device_name: signals.device_name.as_deref().and_then(query_unescape),
        device_model: non_empty(&signals.device_model),
        device_locale: non_empty(&signals.device_locale),
        device_private_ip_addr: non_empty(&signals.device_private_ip_addr),
        canvas_fingerprint: non_empty(&signals.canvas_fingerprint),

        session_id: non_empty(&signals.session_id),
        access_token: non_empty(&signals.access_token),
        user_id: None,
        username: None,
        user_node_id: None,

        user_agent: non_empty(&signals.user_agent),
        user_agent_name: None,
        user_agent_version: None,
        user_agent_plugins: signals
            .user_agent_plugins
            .as_deref()
            .map(split_plugins)
            .unwrap_or_default(),
        screen_resolution: non_empty(&signals.screen_resolution),
        platform_name: non_empty(&signals.platform_name),
        platform_version: non_empty(&signals.platform_version),

        ip_addr_location: Some(ip_addr_location),
        device_location: signals.device_location.as_deref().and_then(|raw| {
            let loc = parse_device_location(raw);
            if loc.is_none() {
                debug!(raw, "Ignoring malformed device location");
            }
            loc
        }),
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

/// `"lat,lon"` → location. Anything but exactly two finite numbers is
/// rejected as a whole.
fn parse_device_location(raw: &str) -> Option<GeoLocation> {
    let mut parts = raw.split(',');
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat.trim(), lon.trim()),
        _ => return None,
    };
    let lat: f64 = lat.parse().ok().filter(|v: &f64| v.is_finite())?;
    let lon: f64 = lon.parse().ok().filter(|v: &f64| v.is_finite())?;
    Some(GeoLocation::from_coordinates(lat, lon))
}

/// Query-string unescape: `+` is a space, then percent-decoding.
fn query_unescape(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .ok()
        .map(|s| s.into_owned())
        .filter(|s| !s.is_empty())
}

/// Path-unescape, then split on `;`, dropping empty segments.
fn split_plugins(raw: &str) -> Vec<String> {
    let decoded = match urlencoding::decode(raw) {
        Ok(s) => s.into_owned(),
        Err(_) => return Vec::new(),
    };
    decoded
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
