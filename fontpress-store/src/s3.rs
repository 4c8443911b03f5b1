//! S3 REST client: HEAD, PUT and GET object with SigV4 signing.
//!
//! Works against AWS S3 and S3-compatible stores (custom endpoint, optional
//! path-style addressing). Public URLs point at the object itself unless a
//! public base URL such as a CDN origin is configured.

use std::time::Duration;

use chrono::Utc;
use ureq::Agent;
use url::Url;

use crate::error::{StoreError, StoreOp};
use crate::http::{
    MAX_RESPONSE_SIZE, USER_AGENT, agent, classify_transport_error, error_detail, validate_endpoint,
};
use crate::sigv4::{
    Credentials, EMPTY_PAYLOAD_SHA256, SigningRequest, authorization, encode_key, sha256_hex,
};
use crate::store::{ObjectMeta, ObjectStore, PutOptions};

/// User metadata header carrying the content hash.
pub const SHA256_META_HEADER: &str = "x-amz-meta-sha256";

/// Connection settings shared by every regional store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Custom endpoint for S3-compatible stores, e.g. `https://minio.local:9000`.
    pub endpoint: Option<String>,
    /// Address buckets as `/{bucket}/{key}` instead of `{bucket}.{host}`.
    pub path_style: bool,
    /// Base URL for public object links (CDN), keys are appended to it.
    pub public_base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            path_style: false,
            public_base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct S3Store {
    agent: Agent,
    region: String,
    endpoint: Option<Url>,
    path_style: bool,
    public_base_url: Option<String>,
    credentials: Credentials,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("path_style", &self.path_style)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl S3Store {
    pub fn new(
        region: &str,
        settings: &S3Settings,
        credentials: Credentials,
    ) -> Result<Self, StoreError> {
        if region.trim().is_empty() {
            return Err(StoreError::Config("region must not be empty".to_string()));
        }
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(validate_endpoint)
            .transpose()
            .map_err(StoreError::Config)?;
        let public_base_url = match settings.public_base_url.as_deref() {
            Some(base) => {
                validate_endpoint(base).map_err(StoreError::Config)?;
                Some(base.trim_end_matches('/').to_string())
            }
            None => None,
        };
        log::info!(
            "S3 store for region {} ({})",
            region,
            endpoint.as_ref().map(Url::as_str).unwrap_or("aws")
        );
        Ok(Self {
            agent: agent(settings.timeout),
            region: region.to_string(),
            endpoint,
            path_style: settings.path_style,
            public_base_url,
            credentials,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Request URL for an object.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StoreError> {
        let key = encode_key(key.trim_start_matches('/'));
        // Dotted bucket names break virtual-host TLS certificates.
        let path_style = self.path_style || bucket.contains('.');
        let raw = match &self.endpoint {
            None if path_style => {
                format!("https://s3.{}.amazonaws.com/{}/{}", self.region, bucket, key)
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
            Some(endpoint) => {
                let base = endpoint.as_str().trim_end_matches('/');
                if path_style {
                    format!("{}/{}/{}", base, bucket, key)
                } else {
                    format!(
                        "{}://{}.{}/{}",
                        endpoint.scheme(),
                        bucket,
                        host_header(endpoint),
                        key
                    )
                }
            }
        };
        Url::parse(&raw).map_err(|e| StoreError::Config(format!("invalid object URL {raw}: {e}")))
    }

    /// Headers for a request, `Authorization` included. `host` is signed but
    /// left to the HTTP client to send.
    fn signed_headers(
        &self,
        method: &str,
        url: &Url,
        mut headers: Vec<(String, String)>,
        payload_sha256: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let now = Utc::now();
        headers.push(("host".to_string(), host_header(url)));
        headers.push(("x-amz-content-sha256".to_string(), payload_sha256.to_string()));
        headers.push(("x-amz-date".to_string(), now.format("%Y%m%dT%H%M%SZ").to_string()));
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        let request = SigningRequest {
            method,
            path: url.path(),
            headers: &headers,
            payload_sha256,
        };
        let auth = authorization(&request, &self.credentials, &self.region, "s3", now)?;
        headers.retain(|(name, _)| name != "host");
        headers.push(("authorization".to_string(), auth));
        headers.push(("user-agent".to_string(), USER_AGENT.to_string()));
        Ok(headers)
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn header_value<'a>(response: &'a ureq::http::Response<ureq::Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn failure(op: StoreOp, response: ureq::http::Response<ureq::Body>) -> StoreError {
    let status = response.status().as_u16();
    let body = response
        .into_body()
        .with_config()
        .limit(MAX_RESPONSE_SIZE)
        .read_to_vec()
        .unwrap_or_default();
    StoreError::from_status(op, status, &error_detail(&body))
}

impl ObjectStore for S3Store {
    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        let url = self.object_url(bucket, key)?;
        let headers = self.signed_headers("HEAD", &url, Vec::new(), EMPTY_PAYLOAD_SHA256)?;
        let mut request = self.agent.head(url.as_str());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .call()
            .map_err(|e| classify_transport_error(StoreOp::Head, e))?;

        match response.status().as_u16() {
            200..=299 => {
                let size = header_value(&response, "content-length")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                Ok(Some(ObjectMeta {
                    size,
                    sha256: header_value(&response, SHA256_META_HEADER).map(str::to_string),
                    content_type: header_value(&response, "content-type").map(str::to_string),
                }))
            }
            404 => Ok(None),
            _ => Err(failure(StoreOp::Head, response)),
        }
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        options: &PutOptions,
    ) -> Result<(), StoreError> {
        let url = self.object_url(bucket, key)?;
        let mut extra = vec![
            ("content-type".to_string(), options.content_type.clone()),
            (SHA256_META_HEADER.to_string(), options.sha256.clone()),
        ];
        if let Some(cache_control) = &options.cache_control {
            extra.push(("cache-control".to_string(), cache_control.clone()));
        }
        if options.public {
            extra.push(("x-amz-acl".to_string(), "public-read".to_string()));
        }
        let headers = self.signed_headers("PUT", &url, extra, &sha256_hex(body))?;
        let mut request = self.agent.put(url.as_str());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send(body)
            .map_err(|e| classify_transport_error(StoreOp::Put, e))?;

        if response.status().is_success() {
            log::debug!("PUT {} ({} bytes)", url, body.len());
            Ok(())
        } else {
            Err(failure(StoreOp::Put, response))
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(bucket, key)?;
        let headers = self.signed_headers("GET", &url, Vec::new(), EMPTY_PAYLOAD_SHA256)?;
        let mut request = self.agent.get(url.as_str());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .call()
            .map_err(|e| classify_transport_error(StoreOp::Get, e))?;

        match response.status().as_u16() {
            200..=299 => response
                .into_body()
                .with_config()
                .limit(MAX_RESPONSE_SIZE)
                .read_to_vec()
                .map_err(|e| classify_transport_error(StoreOp::Get, e)),
            404 => Err(StoreError::NotFound(format!("{bucket}/{key}"))),
            _ => Err(failure(StoreOp::Get, response)),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, encode_key(key.trim_start_matches('/'))),
            None => self
                .object_url(bucket, key)
                .map(String::from)
                .unwrap_or_else(|_| format!("s3://{bucket}/{key}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(settings: S3Settings) -> S3Store {
        S3Store::new("eu-west-1", &settings, Credentials::new("AKID", "secret")).unwrap()
    }

    #[test]
    fn test_virtual_hosted_url() {
        let store = store(S3Settings::default());
        assert_eq!(
            store.object_url("fonts", "web/abc.woff2").unwrap().as_str(),
            "https://fonts.s3.eu-west-1.amazonaws.com/web/abc.woff2"
        );
    }

    #[test]
    fn test_path_style_and_dotted_bucket() {
        let path_style = store(S3Settings {
            path_style: true,
            ..S3Settings::default()
        });
        assert_eq!(
            path_style.object_url("fonts", "abc.woff2").unwrap().as_str(),
            "https://s3.eu-west-1.amazonaws.com/fonts/abc.woff2"
        );
        let dotted = store(S3Settings::default());
        assert_eq!(
            dotted.object_url("fonts.example.com", "abc.woff2").unwrap().as_str(),
            "https://s3.eu-west-1.amazonaws.com/fonts.example.com/abc.woff2"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let minio = store(S3Settings {
            endpoint: Some("http://localhost:9000".to_string()),
            path_style: true,
            ..S3Settings::default()
        });
        assert_eq!(
            minio.object_url("fonts", "abc.woff2").unwrap().as_str(),
            "http://localhost:9000/fonts/abc.woff2"
        );

        let virtual_host = store(S3Settings {
            endpoint: Some("https://storage.example.com".to_string()),
            ..S3Settings::default()
        });
        assert_eq!(
            virtual_host.object_url("fonts", "abc.woff2").unwrap().as_str(),
            "https://fonts.storage.example.com/abc.woff2"
        );
    }

    #[test]
    fn test_insecure_endpoint_rejected() {
        let result = S3Store::new(
            "us-east-1",
            &S3Settings {
                endpoint: Some("http://storage.example.com".to_string()),
                ..S3Settings::default()
            },
            Credentials::new("AKID", "secret"),
        );
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_public_url_prefers_base_url() {
        let cdn = store(S3Settings {
            public_base_url: Some("https://cdn.example.com/".to_string()),
            ..S3Settings::default()
        });
        assert_eq!(
            cdn.public_url("fonts", "web/abc.woff2"),
            "https://cdn.example.com/web/abc.woff2"
        );
        let plain = store(S3Settings::default());
        assert_eq!(
            plain.public_url("fonts", "abc.woff2"),
            "https://fonts.s3.eu-west-1.amazonaws.com/abc.woff2"
        );
    }

    #[test]
    fn test_signed_headers() {
        let store = store(S3Settings::default());
        let url = store.object_url("fonts", "abc.woff2").unwrap();
        let headers = store
            .signed_headers("HEAD", &url, Vec::new(), EMPTY_PAYLOAD_SHA256)
            .unwrap();
        let names: Vec<&str> = headers.iter().map(|(n, _)| n.as_str()).collect();
        assert!(!names.contains(&"host"));
        assert!(names.contains(&"x-amz-date"));
        let auth = &headers.iter().find(|(n, _)| n == "authorization").unwrap().1;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(auth.contains("/eu-west-1/s3/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    }
}
