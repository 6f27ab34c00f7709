use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::{Host, Url};

/// Reasons a configured feed URL is refused.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(IpAddr),
    #[error("Localhost not allowed")]
    Localhost,
}

/// Parse `url_str` and check that it names a public HTTP(S) feed.
///
/// # Examples
///
/// ```
/// use feedmail::util::validate_url;
///
/// assert!(validate_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_url("http://localhost/feed").is_err());
/// assert!(validate_url("http://192.168.1.1/feed").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    validate_feed_url(url_str, false)
}

/// Like [`validate_url`], but `allow_private` lifts only the localhost and
/// private-address checks. The scheme and host checks always apply.
pub fn validate_feed_url(url_str: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }
    if url.host().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    if allow_private {
        return Ok(url);
    }

    let ip = match url.host() {
        None => return Err(UrlValidationError::MissingHost),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.');
            if domain.eq_ignore_ascii_case("localhost") || domain.ends_with(".localhost") {
                return Err(UrlValidationError::Localhost);
            }
            return Ok(url);
        }
        Some(Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(Host::Ipv6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
    };

    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }
    let private = match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    };
    if private {
        return Err(UrlValidationError::PrivateIp(ip));
    }

    Ok(url)
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 is carrier-grade NAT shared space
    let shared = a == 100 && (b & 0xc0) == 64;
    ip.is_private() || ip.is_link_local() || ip.is_unspecified() || shared
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00; // fc00::/7
    let link_local = (first & 0xffc0) == 0xfe80; // fe80::/10
    ip.is_unspecified() || unique_local || link_local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_accepted() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://news.example.org").is_ok());
        assert!(validate_url("https://example.com:8443/rss").is_ok());
        assert!(validate_url("http://93.184.216.34/rss").is_ok());
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            validate_url("ftp://example.com/feed"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_localhost_variants_rejected() {
        for url in [
            "http://localhost/feed",
            "http://LOCALHOST./feed",
            "http://app.localhost/feed",
            "http://127.0.0.1/feed",
            "http://127.8.8.8/feed",
            "http://[::1]/feed",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlValidationError::Localhost)),
                "{url} should be rejected as localhost"
            );
        }
    }

    #[test]
    fn test_private_ranges_rejected() {
        for url in [
            "http://10.0.0.1/feed",
            "http://172.16.0.1/feed",
            "http://192.168.1.1:8080/feed",
            "http://169.254.1.1/feed",
            "http://100.64.0.1/feed",
            "http://0.0.0.0/feed",
            "http://[fe80::1]/feed",
            "http://[fd00::1]/feed",
            "http://[::ffff:192.168.0.1]/feed",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlValidationError::PrivateIp(_))),
                "{url} should be rejected as private"
            );
        }
    }

    #[test]
    fn test_allow_private_still_enforces_scheme() {
        assert!(validate_feed_url("http://127.0.0.1:8080/rss", true).is_ok());
        assert!(validate_feed_url("http://[fd00::1]/feed", true).is_ok());
        assert!(matches!(
            validate_feed_url("file:///etc/passwd", true),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "file"
        ));
        assert!(matches!(
            validate_feed_url("ftp://example.com/rss", true),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_unparseable_url_rejected() {
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
