//! The object-store seam.
//!
//! Calls are blocking; the publish pipeline drives them from the blocking
//! thread pool. One store instance serves every bucket in its region.

use crate::error::StoreError;

/// Object metadata returned by HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    /// Content hash stored as user metadata at upload time.
    pub sha256: Option<String>,
    pub content_type: Option<String>,
}

/// Headers and metadata for a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    /// Full `Cache-Control` header value.
    pub cache_control: Option<String>,
    /// Grant `public-read`.
    pub public: bool,
    /// Lowercase hex SHA-256 of the body, stored as object metadata.
    pub sha256: String,
}

pub trait ObjectStore: Send + Sync {
    /// `Ok(None)` when the key does not exist.
    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, StoreError>;

    fn put(&self, bucket: &str, key: &str, body: &[u8], options: &PutOptions)
    -> Result<(), StoreError>;

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// URL under which a stored object is served.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}
