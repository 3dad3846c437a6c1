use serde::{Deserialize, Serialize};

/// Country reported for IP locations until an IP database is wired in.
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Normalized client/device/user signals extracted from one request.
///
/// Every field is optional: `None` (or an empty list) means the signal was
/// not observed, and unset fields are omitted from the JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_request_id: Option<String>,

    // ── Network ───────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addr: Option<String>,
    /// `"<ip>:<port>"`, built by plain concatenation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    /// Addresses reported by the client's WebRTC stack (not proxied).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webrtc_addrs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webrtc_public_addrs: Vec<GeoLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webrtc_private_addrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_bssid: Option<String>,

    // ── App ───────────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_bundle_name: Option<String>,

    // ── Device ────────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_private_ip_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_fingerprint: Option<String>,

    // ── Session & user ────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_node_id: Option<i64>,

    // ── Browser / platform ────────────────────────────────────────
    #[serde(rename = "useragent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "useragent_name", skip_serializing_if = "Option::is_none")]
    pub user_agent_name: Option<String>,
    #[serde(rename = "useragent_version", skip_serializing_if = "Option::is_none")]
    pub user_agent_version: Option<String>,
    #[serde(rename = "useragent_plugins", skip_serializing_if = "Vec::is_empty")]
    pub user_agent_plugins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,

    // ── Locations ─────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addr_location: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_location: Option<GeoLocation>,
}

impl TrackingProfile {
    /// Attach the authenticated user. Zero ids and empty names are
    /// treated as "not observed".
    pub fn set_user(&mut self, user_id: i64, username: impl Into<String>, user_node_id: i64) {
        let username = username.into();
        self.user_id = (user_id != 0).then_some(user_id);
        self.username = (!username.is_empty()).then_some(username);
        self.user_node_id = (user_node_id != 0).then_some(user_node_id);
    }
}

/// Location record for an IP address or a device-reported coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addr: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Administrative region code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dma_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoLocation {
    /// Placeholder returned for every IP lookup.
    pub fn unknown() -> Self {
        Self {
            country: Some(UNKNOWN_COUNTRY.to_string()),
            ..Self::default()
        }
    }

    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_serializes_to_empty_object() {
        let json = serde_json::to_string(&TrackingProfile::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn user_agent_fields_use_wire_names() {
        let p = TrackingProfile {
            user_agent: Some("curl/8.0".into()),
            user_agent_plugins: vec!["pdf".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["useragent"], "curl/8.0");
        assert_eq!(json["useragent_plugins"][0], "pdf");
        assert!(json.get("user_agent").is_none());
    }

    #[test]
    fn set_user_fills_identity() {
        let mut p = TrackingProfile::default();
        p.set_user(42, "alice", 7);
        assert_eq!(p.user_id, Some(42));
        assert_eq!(p.username.as_deref(), Some("alice"));
        assert_eq!(p.user_node_id, Some(7));
    }

    #[test]
    fn set_user_zero_values_are_unset() {
        let mut p = TrackingProfile::default();
        p.set_user(0, "", 0);
        assert!(p.user_id.is_none());
        assert!(p.username.is_none());
        assert!(p.user_node_id.is_none());
    }

    #[test]
    fn unknown_location_only_has_country() {
        let json = serde_json::to_value(GeoLocation::unknown()).unwrap();
        assert_eq!(json, serde_json::json!({"country": "unknown"}));
    }

    #[test]
    fn coordinates_location() {
        let loc = GeoLocation::from_coordinates(12.5, 45.2);
        assert_eq!(loc.latitude, Some(12.5));
        assert_eq!(loc.longitude, Some(45.2));
        assert!(loc.country.is_none());
    }
}
