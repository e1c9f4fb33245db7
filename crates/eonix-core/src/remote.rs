//! Hosts and ports of service URLs and connection strings.

use url::{Host, Url};

/// Where an absolute URL such as `https://api.stripe.com/v1` or `redis://:pw@cache:6380/0` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// `scheme://host[:port]` without credentials, path or query.
    pub origin: String,
    /// Lowercased host; IPv6 addresses come without brackets.
    pub host: String,
    /// Explicit port, or the scheme's well-known one.
    pub port: Option<u16>,
}

impl RemoteTarget {
    /// Parse an absolute URL. Returns `None` for relative references and host-less URLs.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        let host = match url.host()? {
            Host::Domain(domain) if domain.is_empty() => return None,
            // Hosts of non-special schemes such as redis:// keep their case in `Url`.
            Host::Domain(domain) => domain.to_ascii_lowercase(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };

        let authority = match url.host()? {
            Host::Ipv6(_) => format!("[{host}]"),
            _ => host.clone(),
        };
        let origin = match url.port() {
            Some(port) => format!("{}://{authority}:{port}", url.scheme()),
            None => format!("{}://{authority}", url.scheme()),
        };

        Some(Self {
            origin,
            host,
            port: url.port_or_known_default(),
        })
    }
}

/// Host and port of a connection URL, `(None, None)` when it does not parse.
pub fn host_and_port(raw: &str) -> (Option<String>, Option<u16>) {
    match RemoteTarget::parse(raw) {
        Some(target) => (Some(target.host), target.port),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_drops_path_and_query() {
        let target = RemoteTarget::parse("https://api.stripe.com/v1/charges?limit=3").unwrap();
        assert_eq!(target.origin, "https://api.stripe.com");
        assert_eq!(target.host, "api.stripe.com");
        assert_eq!(target.port, Some(443));
    }

    #[test]
    fn test_host_is_lowercased() {
        let target = RemoteTarget::parse("https://API.STRIPE.COM/v1").unwrap();
        assert_eq!(target.host, "api.stripe.com");
        assert_eq!(target.origin, "https://api.stripe.com");

        assert_eq!(
            host_and_port("redis://Cache.Internal:6380"),
            (Some("cache.internal".to_string()), Some(6380))
        );
    }

    #[test]
    fn test_credentials_are_not_part_of_host() {
        let target = RemoteTarget::parse("redis://:secret@cache.internal:6380/0").unwrap();
        assert_eq!(target.host, "cache.internal");
        assert_eq!(target.port, Some(6380));
        assert_eq!(target.origin, "redis://cache.internal:6380");
    }

    #[test]
    fn test_ipv6_hosts() {
        assert_eq!(host_and_port("redis://[::1]"), (Some("::1".to_string()), None));
        assert_eq!(
            host_and_port("redis://[::1]:6379/0"),
            (Some("::1".to_string()), Some(6379))
        );
        let target = RemoteTarget::parse("http://[::1]:8080/health").unwrap();
        assert_eq!(target.origin, "http://[::1]:8080");
    }

    #[test]
    fn test_unparseable_urls() {
        assert_eq!(RemoteTarget::parse("not a url"), None);
        assert_eq!(host_and_port("localhost"), (None, None));
        assert_eq!(host_and_port("redis://"), (None, None));
        assert_eq!(host_and_port("redis://localhost"), (Some("localhost".to_string()), None));
    }
}
