use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Browsers and common server defaults cap URLs around this length.
const MAX_URL_LENGTH: usize = 2048;

/// A syntactically valid http(s) URL with a host, normalized for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    pub fn parse(input: &str) -> Result<TargetUrl, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err("URL must not be empty".to_string());
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(format!(
                "URL exceeds the maximum length of {} characters",
                MAX_URL_LENGTH
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(format!("{} is not a valid URL: contains whitespace", trimmed));
        }

        let normalized = match trimmed.split_once("://") {
            Some((scheme, _)) => match scheme.to_ascii_lowercase().as_str() {
                "http" | "https" => trimmed.to_string(),
                other => return Err(format!("Unsupported URL scheme '{}'", other)),
            },
            None => {
                if trimmed.contains(':') && !has_port_after_host(trimmed) {
                    return Err(format!("{} is not a valid URL", trimmed));
                }
                format!("https://{}", trimmed)
            }
        };
        if normalized.len() > MAX_URL_LENGTH {
            return Err(format!(
                "URL exceeds the maximum length of {} characters",
                MAX_URL_LENGTH
            ));
        }

        let url = Url::parse(&normalized)
            .map_err(|e| format!("{} is not a valid URL: {}", trimmed, e))?;

        match url.host() {
            Some(Host::Domain(domain)) => {
                if domain.is_empty() {
                    return Err(format!("{} has no host", trimmed));
                }
                if !domain.contains('.') && !domain.eq_ignore_ascii_case("localhost") {
                    return Err(format!("{} has no valid domain name", trimmed));
                }
                if domain.starts_with('.') || domain.contains("..") {
                    return Err(format!("{} has no valid domain name", trimmed));
                }
            }
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
            None => return Err(format!("{} has no host", trimmed)),
        }

        Ok(TargetUrl(url))
    }

    /// Rejects loopback, private, link-local and unspecified hosts.
    pub fn ensure_public_host(&self) -> Result<(), String> {
        ensure_public_url(&self.0)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }
}

impl AsRef<str> for TargetUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Host check shared by submitted URLs, redirect hops and asset downloads.
pub fn ensure_public_url(url: &Url) -> Result<(), String> {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err(format!("Host '{}' is not allowed", domain));
            }
            Ok(())
        }
        Some(Host::Ipv4(ip)) if is_private_ip(IpAddr::V4(ip)) => {
            Err(format!("Private address '{}' is not allowed", ip))
        }
        Some(Host::Ipv6(ip)) if is_private_ip(IpAddr::V6(ip)) => {
            Err(format!("Private address '{}' is not allowed", ip))
        }
        Some(_) => Ok(()),
        None => Err("URL has no host".to_string()),
    }
}

// "example.com:8080/path" has a colon but no scheme.
fn has_port_after_host(input: &str) -> bool {
    let authority = input.split(['/', '?', '#']).next().unwrap_or_default();
    match authority.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_private_ipv4(ip),
        IpAddr::V6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::TargetUrl;

    #[test]
    fn adds_https_when_scheme_missing() {
        let url = TargetUrl::parse("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
        assert!(url.is_https());
    }

    #[test]
    fn keeps_http_scheme() {
        let url = TargetUrl::parse("http://example.com/path?q=1").unwrap();
        assert_eq!(url.as_str(), "http://example.com/path?q=1");
        assert!(!url.is_https());
    }

    #[test]
    fn accepts_host_with_port_and_no_scheme() {
        let url = TargetUrl::parse("example.com:8080/status").unwrap();
        assert_eq!(url.as_str(), "https://example.com:8080/status");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let url = TargetUrl::parse("  https://example.com  ").unwrap();
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn rejects_invalid_input() {
        let invalid = [
            "",
            "   ",
            "not a url",
            "ftp://example.com",
            "file:///etc/passwd",
            "javascript:alert(1)",
            "mailto:someone@example.com",
            "https://",
            "http://nodot",
            "https://exa mple.com",
        ];
        for input in invalid {
            assert!(TargetUrl::parse(input).is_err(), "{} should be rejected", input);
        }
    }

    #[test]
    fn rejects_overlong_urls() {
        let path = "a".repeat(2100);
        assert!(TargetUrl::parse(&format!("https://example.com/{}", path)).is_err());

        // Fits before the scheme is added, does not fit after.
        let path = "a".repeat(2040);
        assert!(TargetUrl::parse(&format!("example.com/{}", path)).is_err());
    }

    #[test]
    fn public_hosts_pass_the_ssrf_guard() {
        for input in ["https://example.com", "http://93.184.216.34", "https://[2606:4700::1111]"] {
            let url = TargetUrl::parse(input).unwrap();
            assert!(url.ensure_public_host().is_ok(), "{} should be public", input);
        }
    }

    #[test]
    fn private_hosts_fail_the_ssrf_guard() {
        for input in [
            "http://localhost:8000",
            "http://127.0.0.1",
            "http://10.1.2.3",
            "http://192.168.0.10",
            "http://172.16.5.4",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0",
            "http://[::1]",
            "http://[fd00::1]",
        ] {
            let url = TargetUrl::parse(input).unwrap();
            assert!(url.ensure_public_host().is_err(), "{} should be private", input);
        }
    }
}
