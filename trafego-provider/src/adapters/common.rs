//! Utilities shared by the concrete adapters.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;

// ============ HTTP Client ============

/// Default connection timeout (seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Globally shared HTTP client.
static SHARED_HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Get the shared HTTP client (lazy initialization, thread-safe).
pub fn create_http_client() -> Client {
    SHARED_HTTP_CLIENT
        .get_or_init(|| {
            // Client::builder() only fails if the TLS backend cannot
            // initialize, which is a fatal configuration error: silently
            // falling back to a client with no timeouts would be worse.
            #[allow(clippy::expect_used)]
            Client::builder()
                .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
                .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client: TLS backend unavailable")
        })
        .clone()
}

// ============ Name handling ============

/// Remove any trailing dots from a domain name.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// Convert a full domain name to a zone-relative name.
/// `"www.example.com"` + `"example.com"` -> `"www"`; the apex becomes `"@"`.
pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
    let full = normalize_domain_name(full_name);
    let zone = normalize_domain_name(zone_name);

    if full == zone {
        "@".to_string()
    } else if let Some(subdomain) = full.strip_suffix(&format!(".{zone}")) {
        subdomain.to_string()
    } else {
        full
    }
}

/// Convert a zone-relative name to a full domain name.
/// `"www"` + `"example.com"` -> `"www.example.com"`; `"@"` maps to the apex.
pub fn relative_to_full_name(relative_name: &str, zone_name: &str) -> String {
    let zone = normalize_domain_name(zone_name);

    if relative_name == "@" || relative_name.is_empty() {
        zone
    } else {
        format!("{}.{zone}", normalize_domain_name(relative_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_trailing_dot() {
        assert_eq!(normalize_domain_name("example.com."), "example.com");
        assert_eq!(normalize_domain_name("example.com"), "example.com");
    }

    #[test]
    fn full_to_relative_subdomain() {
        assert_eq!(
            full_name_to_relative("www.example.com", "example.com"),
            "www"
        );
    }

    #[test]
    fn full_to_relative_apex() {
        assert_eq!(full_name_to_relative("example.com", "example.com"), "@");
    }

    #[test]
    fn full_to_relative_deep_subdomain() {
        assert_eq!(
            full_name_to_relative("a.b.c.example.com", "example.com"),
            "a.b.c"
        );
    }

    #[test]
    fn full_to_relative_unrelated_domain() {
        // Not inside the zone: passed through untouched.
        assert_eq!(
            full_name_to_relative("www.other.com", "example.com"),
            "www.other.com"
        );
    }

    #[test]
    fn relative_to_full_subdomain() {
        assert_eq!(
            relative_to_full_name("www", "example.com"),
            "www.example.com"
        );
    }

    #[test]
    fn relative_to_full_apex() {
        assert_eq!(relative_to_full_name("@", "example.com"), "example.com");
        assert_eq!(relative_to_full_name("", "example.com"), "example.com");
    }

    #[test]
    fn relative_to_full_strips_trailing_dots() {
        assert_eq!(
            relative_to_full_name("www.", "example.com."),
            "www.example.com"
        );
    }
}
