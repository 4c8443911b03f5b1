//! HTTP client helper with native-tls support.

use std::time::Duration;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

use crate::error::{StoreError, StoreOp};

/// `User-Agent` sent with every store request.
pub const USER_AGENT: &str = concat!("fontpress/", env!("CARGO_PKG_VERSION"));

/// Maximum response body size read for GET and error bodies (64 MB).
pub const MAX_RESPONSE_SIZE: u64 = 64 * 1024 * 1024;

/// Hosts allowed to use plain HTTP (local S3-compatible servers).
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Validate a storage endpoint or public base URL.
///
/// Enforces HTTPS, except for loopback hosts where local test servers
/// (MinIO and friends) commonly run without TLS.
pub fn validate_endpoint(url: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))?;
    let host = parsed.host_str().unwrap_or("");
    if host.is_empty() {
        return Err(format!("URL '{}' has no host", url));
    }

    match parsed.scheme() {
        "https" => {}
        "http" if LOCAL_HOSTS.contains(&host) => {}
        scheme => {
            return Err(format!(
                "Insecure URL scheme '{}' rejected; only HTTPS is allowed for non-local hosts. \
                 URL: {}",
                scheme, url
            ));
        }
    }
    Ok(parsed)
}

/// Create a pooled HTTP agent configured with native-tls and a global timeout.
///
/// Non-2xx responses are returned as responses so callers can classify them.
pub fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Map a transport-level failure to a store error.
pub fn classify_transport_error(op: StoreOp, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed => StoreError::transient(op, err.to_string()),
        other => StoreError::permanent(op, other.to_string()),
    }
}

/// Summarize an S3 error body: `Code: Message` when the XML carries them,
/// otherwise a short byte preview.
pub fn error_detail(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let code = xml_element(&text, "Code");
    let message = xml_element(&text, "Message");
    match (code, message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.to_string(),
        _ if body.is_empty() => String::new(),
        _ => format_bytes_preview(body),
    }
}

fn xml_element<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(text[start..end].trim())
}

/// Format the first few bytes of a buffer as a human-readable hex + ASCII preview.
fn format_bytes_preview(data: &[u8]) -> String {
    let take = data.len().min(16);
    let hex: Vec<String> = data[..take].iter().map(|b| format!("{:02x}", b)).collect();
    let ascii: String = data[..take]
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect();
    format!("[{}] \"{}\"", hex.join(" "), ascii)
}
