use crate::client_ip;
use std::net::IpAddr;

/// Header names read as tracking signals. When a header is absent, the
/// cookie with the same name minus its `X-` prefix is consulted.
pub mod headers {
    pub const REMOTE_PORT: &str = "X-Remote-Port";
    pub const CLIENT_MAC: &str = "X-Client-Mac";

    pub const WIFI_SSID: &str = "X-Device-Wifi-Ssid";
    pub const WIFI_BSSID: &str = "X-Device-Wifi-Bssid";

    pub const DEVICE_ID: &str = "X-Device-Id";
    pub const DEVICE_NAME: &str = "X-Device-Name";
    pub const DEVICE_MODEL: &str = "X-Device-Model";
    pub const DEVICE_LOCALE: &str = "X-Device-Locale";
    pub const DEVICE_LOCATION: &str = "X-Device-Location";
    pub const DEVICE_PRIVATE_IP_ADDR: &str = "X-Device-Private-Ip-Addr";

    pub const PLATFORM_NAME: &str = "X-Platform-Name";
    pub const PLATFORM_VERSION: &str = "X-Platform-Version";

    pub const BUNDLE_ID: &str = "X-Bundle-Id";
    pub const APP_VERSION: &str = "X-App-Version";
    pub const APP_BUNDLE_ID: &str = "X-App-Bundle-Id";
    pub const APP_BUNDLE_NAME: &str = "X-App-Bundle-Name";

    pub const CANVAS_FINGERPRINT: &str = "X-Canvas-Fingerprint";

    pub const USER_AGENT: &str = "User-Agent";
    pub const USER_AGENT_PLUGINS: &str = "X-User-Agent-Plugins";
    pub const SCREEN_RESOLUTION: &str = "X-Screen-Resolution";
    pub const WEBRTC_ADDRS: &str = "X-Webrtc-Addrs";

    pub const ACCESS_TOKEN: &str = "X-Access-Token";

    pub const SIGN_TIMESTAMP: &str = "X-Sign-Timestamp";
    pub const SIGN: &str = "X-Sign";

    pub const ALL: &[&str] = &[
        REMOTE_PORT,
        CLIENT_MAC,
        WIFI_SSID,
        WIFI_BSSID,
        DEVICE_ID,
        DEVICE_NAME,
        DEVICE_MODEL,
        DEVICE_LOCALE,
        DEVICE_LOCATION,
        DEVICE_PRIVATE_IP_ADDR,
        PLATFORM_NAME,
        PLATFORM_VERSION,
        BUNDLE_ID,
        APP_VERSION,
        APP_BUNDLE_ID,
        APP_BUNDLE_NAME,
        CANVAS_FINGERPRINT,
        USER_AGENT,
        USER_AGENT_PLUGINS,
        SCREEN_RESOLUTION,
        WEBRTC_ADDRS,
        ACCESS_TOKEN,
        SIGN_TIMESTAMP,
        SIGN,
    ];
}

/// Session cookies consulted by [`TrackingSignals::collect`], in priority order.
pub const DEFAULT_SESSION_COOKIES: [&str; 2] = ["SESSIONID", "com.zto.sessionId"];

/// Query parameter used when no access-token header or cookie is sent.
pub const ACCESS_TOKEN_QUERY: &str = "access_token";

/// Read access to the raw client signals of one request.
///
/// Header lookups are case-insensitive; cookie and query lookups are exact.
pub trait SignalSource {
    fn header(&self, name: &str) -> Option<&str>;

    fn cookie(&self, name: &str) -> Option<&str>;

    fn query(&self, name: &str) -> Option<&str> {
        let _ = name;
        None
    }
}

/// Raw tracking signals for one request, one field per recognized key.
///
/// Values are kept exactly as sent; all normalization happens in
/// [`crate::parse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingSignals {
    pub request_id: Option<String>,
    pub client_ip: Option<String>,

    pub remote_port: Option<String>,
    pub client_mac: Option<String>,
    pub wifi_ssid: Option<String>,
    pub wifi_bssid: Option<String>,

    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub device_model: Option<String>,
    pub device_locale: Option<String>,
    pub device_location: Option<String>,
    pub device_private_ip_addr: Option<String>,

    pub platform_name: Option<String>,
    pub platform_version: Option<String>,

    pub bundle_id: Option<String>,
    pub app_version: Option<String>,
    pub app_bundle_id: Option<String>,
    pub app_bundle_name: Option<String>,

    pub canvas_fingerprint: Option<String>,

    pub user_agent: Option<String>,
    pub user_agent_plugins: Option<String>,
    pub screen_resolution: Option<String>,
    pub webrtc_addrs: Option<String>,

    pub access_token: Option<String>,
    pub session_id: Option<String>,

    /// Request-signing material. Collected with the other signals but not
    /// part of the tracking profile.
    pub sign_timestamp: Option<String>,
    pub sign: Option<String>,
}

impl TrackingSignals {
    /// Collect every recognized signal from `source`. The client IP is
    /// resolved from forwarding headers, falling back to `peer`.
    pub fn collect<S: SignalSource + ?Sized>(source: &S, peer: Option<IpAddr>) -> Self {
        Self::collect_with_sessions(source, peer, &DEFAULT_SESSION_COOKIES)
    }

    /// Like [`collect`](Self::collect), reading the session id from the
    /// first non-empty cookie in `session_cookies`.
    pub fn collect_with_sessions<S, C>(source: &S, peer: Option<IpAddr>, session_cookies: &[C]) -> Self
    where
        S: SignalSource + ?Sized,
        C: AsRef<str>,
    {
        let get = |name: &str| lookup(source, name);

        let access_token = get(headers::ACCESS_TOKEN).or_else(|| {
            source
                .query(ACCESS_TOKEN_QUERY)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        });

        let session_id = session_cookies.iter().find_map(|name| {
            source
                .cookie(name.as_ref())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        });

        Self {
            request_id: None,
            client_ip: client_ip::resolve(source, peer),

            remote_port: get(headers::REMOTE_PORT),
            client_mac: get(headers::CLIENT_MAC),
            wifi_ssid: get(headers::WIFI_SSID),
            wifi_bssid: get(headers::WIFI_BSSID),

            device_id: get(headers::DEVICE_ID),
            device_name: get(headers::DEVICE_NAME),
            device_model: get(headers::DEVICE_MODEL),
            device_locale: get(headers::DEVICE_LOCALE),
            device_location: get(headers::DEVICE_LOCATION),
            device_private_ip_addr: get(headers::DEVICE_PRIVATE_IP_ADDR),

            platform_name: get(headers::PLATFORM_NAME),
            platform_version: get(headers::PLATFORM_VERSION),

            bundle_id: get(headers::BUNDLE_ID),
            app_version: get(headers::APP_VERSION),
            app_bundle_id: get(headers::APP_BUNDLE_ID),
            app_bundle_name: get(headers::APP_BUNDLE_NAME),

            canvas_fingerprint: get(headers::CANVAS_FINGERPRINT),

            user_agent: get(headers::USER_AGENT),
            user_agent_plugins: get(headers::USER_AGENT_PLUGINS),
            screen_resolution: get(headers::SCREEN_RESOLUTION),
            webrtc_addrs: get(headers::WEBRTC_ADDRS),

            access_token,
            session_id,

            sign_timestamp: get(headers::SIGN_TIMESTAMP),
            sign: get(headers::SIGN),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Header value if non-empty, otherwise the cookie named after the header
/// without its `X-` prefix.
fn lookup<S: SignalSource + ?Sized>(source: &S, header: &str) -> Option<String> {
    if let Some(v) = source.header(header).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    let cookie = header.strip_prefix("X-").unwrap_or(header);
    source
        .cookie(cookie)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::test_support::MapSource;
    use super::*;

    #[test]
    fn header_list_has_every_feature_key() {
        assert_eq!(headers::ALL.len(), 24);
        assert!(headers::ALL.contains(&"User-Agent"));
        assert!(headers::ALL.iter().all(|h| *h == "User-Agent" || h.starts_with("X-")));
    }

    #[test]
    fn header_wins_over_cookie() {
        let src = MapSource::default()
            .header("X-Device-Id", "from-header")
            .cookie("Device-Id", "from-cookie");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.device_id.as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_without_x_prefix_is_fallback() {
        let src = MapSource::default().cookie("Device-Model", "Pixel 8");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.device_model.as_deref(), Some("Pixel 8"));
    }

    #[test]
    fn empty_header_falls_through_to_cookie() {
        let src = MapSource::default()
            .header("X-App-Version", "")
            .cookie("App-Version", "3.1.0");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.app_version.as_deref(), Some("3.1.0"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let src = MapSource::default().header("x-device-id", "D1");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.device_id.as_deref(), Some("D1"));
    }

    #[test]
    fn session_cookies_checked_in_order() {
        let src = MapSource::default()
            .cookie("com.zto.sessionId", "second")
            .cookie("SESSIONID", "first");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.session_id.as_deref(), Some("first"));

        let src = MapSource::default()
            .cookie("SESSIONID", "")
            .cookie("com.zto.sessionId", "second");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.session_id.as_deref(), Some("second"));

        let src = MapSource::default().cookie("JSESSIONID", "other");
        let s = TrackingSignals::collect(&src, None);
        assert!(s.session_id.is_none());
    }

    #[test]
    fn configured_session_cookies_replace_defaults() {
        let src = MapSource::default()
            .cookie("SESSIONID", "default")
            .cookie("sid", "custom");
        let names = vec!["sid".to_string()];
        let s = TrackingSignals::collect_with_sessions(&src, None, &names);
        assert_eq!(s.session_id.as_deref(), Some("custom"));
    }

    #[test]
    fn access_token_query_is_fallback() {
        let src = MapSource::default().query("access_token", "q-token");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.access_token.as_deref(), Some("q-token"));

        let src = MapSource::default()
            .header("X-Access-Token", "h-token")
            .query("access_token", "q-token");
        let s = TrackingSignals::collect(&src, None);
        assert_eq!(s.access_token.as_deref(), Some("h-token"));
    }

    #[test]
    fn missing_signals_stay_none() {
        let s = TrackingSignals::collect(&MapSource::default(), None);
        assert_eq!(s, TrackingSignals::default());
    }

    #[test]
    fn with_request_id_sets_id() {
        let s = TrackingSignals::default().with_request_id("r-1");
        assert_eq!(s.request_id.as_deref(), Some("r-1"));
    }
}
