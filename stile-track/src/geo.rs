use stile_core::GeoLocation;

/// Result of an IP-to-location lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum IpLookup {
    Resolved(GeoLocation),
    /// No IP database is wired in.
    NotImplemented,
}

impl IpLookup {
    /// The resolved location, or the `{country: "unknown"}` placeholder.
    pub fn or_placeholder(self) -> GeoLocation {
        match self {
            IpLookup::Resolved(loc) => loc,
            IpLookup::NotImplemented => GeoLocation::unknown(),
        }
    }
}

/// Look up the location of `ip`.
///
/// IP geolocation is not implemented; this is the single place a database
/// lookup would plug in.
pub fn locate_ip(ip: &str) -> IpLookup {
    let _ = ip;
    IpLookup::NotImplemented
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_not_implemented() {
        assert_eq!(locate_ip("8.8.8.8"), IpLookup::NotImplemented);
        assert_eq!(locate_ip(""), IpLookup::NotImplemented);
    }

    #[test]
    fn not_implemented_maps_to_unknown_country() {
        let loc = IpLookup::NotImplemented.or_placeholder();
        assert_eq!(loc.country.as_deref(), Some("unknown"));
        assert!(loc.latitude.is_none());
    }

    #[test]
    fn resolved_location_passes_through() {
        let loc = GeoLocation {
            country: Some("NZ".into()),
            ..Default::default()
        };
        assert_eq!(IpLookup::Resolved(loc.clone()).or_placeholder(), loc);
    }
}
