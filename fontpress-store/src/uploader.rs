//! Content-addressed uploads.
//!
//! The object key is derived from the content hash alone, so identical bytes
//! land on the same key and upload at most once. The upload runs as an
//! explicit state machine:
//!
//! ```text
//! CHECK_EXISTING ──exists──────────────────────────────▶ DONE (skipped)
//!       │ missing / transient HEAD failure
//!       ▼
//!      PUT ──transient──▶ backoff ──▶ PUT  (up to max_attempts PUTs)
//!       │ ok
//!       ▼
//!    VERIFY ──mismatch / transient──▶ backoff ──▶ PUT
//!       │ ok
//!       ▼
//!     DONE
//! ```
//!
//! Backoff and sleeping are injectable so tests run without real delays.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, UploadError};
use crate::store::{ObjectStore, PutOptions};

/// Where and how a published artifact is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub bucket: String,
    /// Key prefix, without leading or trailing slashes.
    pub prefix: String,
    pub region: String,
    /// Upload with a `public-read` ACL.
    pub public: bool,
    /// `Cache-Control: public, max-age=N, immutable` when set.
    pub cache_seconds: Option<u64>,
    /// Re-upload even when the key already holds an object of the same size.
    pub overwrite: bool,
}

impl Destination {
    /// `{prefix}/{sha256}.{extension}`.
    pub fn object_key(&self, sha256: &str, extension: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{sha256}.{extension}")
        } else {
            format!("{prefix}/{sha256}.{extension}")
        }
    }

    pub fn cache_control(&self) -> Option<String> {
        self.cache_seconds
            .map(|secs| format!("public, max-age={secs}, immutable"))
    }
}

/// Bytes to upload plus their identity.
#[derive(Debug, Clone, Copy)]
pub struct Blob<'a> {
    pub bytes: &'a [u8],
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: &'a str,
    pub extension: &'a str,
    pub content_type: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub key: String,
    pub url: String,
    pub sha256: String,
    pub size: u64,
    /// The object already existed and no PUT was made.
    pub skipped: bool,
    /// PUT attempts made.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total PUT attempts, including the first.
    pub max_attempts: u32,
    /// HEAD the object after each PUT and compare size and hash.
    pub verify: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            verify: true,
        }
    }
}

/// Delay before retry number `attempt` (1 = first retry).
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
    /// Pick uniformly in `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_millis(8000),
            jitter: true,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        let delay = self.base.saturating_mul(factor).min(self.max);
        if self.jitter && !delay.is_zero() {
            let millis = delay.as_millis() as u64;
            Duration::from_millis(rand::thread_rng().gen_range(millis / 2..=millis))
        } else {
            delay
        }
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current (blocking-pool) thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    CheckExisting,
    Put,
    Verify,
    Done { skipped: bool },
}

#[derive(Clone)]
pub struct Uploader {
    policy: RetryPolicy,
    backoff: Arc<dyn Backoff>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Uploader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            backoff: Arc::new(ExponentialBackoff::default()),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Upload a blob under its content-addressed key. Blocking.
    pub fn upload(
        &self,
        store: &dyn ObjectStore,
        blob: Blob<'_>,
        destination: &Destination,
    ) -> Result<UploadResult, UploadError> {
        let key = destination.object_key(blob.sha256, blob.extension);
        let size = blob.bytes.len() as u64;
        let options = PutOptions {
            content_type: blob.content_type.to_string(),
            cache_control: destination.cache_control(),
            public: destination.public,
            sha256: blob.sha256.to_string(),
        };
        let fail = |attempts: u32, cause: StoreError| UploadError {
            key: key.clone(),
            attempts,
            cause,
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0u32;
        let mut state = State::CheckExisting;
        loop {
            state = match state {
                State::CheckExisting => match store.head(&destination.bucket, &key) {
                    Ok(Some(meta)) if meta.size == size && !destination.overwrite => {
                        log::info!("{} already stored, skipping upload", key);
                        State::Done { skipped: true }
                    }
                    Ok(_) => State::Put,
                    Err(err) if err.is_transient() => {
                        log::warn!("HEAD {} failed ({}), uploading anyway", key, err);
                        State::Put
                    }
                    Err(err) => return Err(fail(0, err)),
                },
                State::Put => {
                    attempts += 1;
                    match store.put(&destination.bucket, &key, blob.bytes, &options) {
                        Ok(()) if self.policy.verify => State::Verify,
                        Ok(()) => State::Done { skipped: false },
                        Err(err) => self.retry_or_fail(&key, attempts, max_attempts, err)
                            .map_err(|err| fail(attempts, err))?,
                    }
                }
                State::Verify => {
                    let mismatch = match store.head(&destination.bucket, &key) {
                        Ok(Some(meta)) if meta.size != size => {
                            format!("stored size {} differs from {}", meta.size, size)
                        }
                        Ok(Some(meta))
                            if meta.sha256.as_deref().is_some_and(|h| h != blob.sha256) =>
                        {
                            "stored hash metadata differs".to_string()
                        }
                        Ok(Some(_)) => String::new(),
                        Ok(None) => "object missing after PUT".to_string(),
                        Err(err) if err.is_transient() => err.to_string(),
                        Err(err) => return Err(fail(attempts, err)),
                    };
                    if mismatch.is_empty() {
                        State::Done { skipped: false }
                    } else {
                        let err = StoreError::Verify {
                            key: key.clone(),
                            reason: mismatch,
                        };
                        self.retry_or_fail(&key, attempts, max_attempts, err)
                            .map_err(|err| fail(attempts, err))?
                    }
                }
                State::Done { skipped } => {
                    if !skipped {
                        log::info!("Uploaded {} ({} bytes, {} attempt(s))", key, size, attempts);
                    }
                    return Ok(UploadResult {
                        url: store.public_url(&destination.bucket, &key),
                        key: key.clone(),
                        sha256: blob.sha256.to_string(),
                        size,
                        skipped,
                        attempts,
                    });
                }
            };
        }
    }

    /// Sleep and go back to PUT, or give up with `err`.
    fn retry_or_fail(
        &self,
        key: &str,
        attempts: u32,
        max_attempts: u32,
        err: StoreError,
    ) -> Result<State, StoreError> {
        if !err.is_transient() || attempts >= max_attempts {
            return Err(err);
        }
        let delay = self.backoff.delay(attempts);
        log::warn!(
            "Upload of {} failed (attempt {}/{}): {}; retrying in {:?}",
            key,
            attempts,
            max_attempts,
            err,
            delay
        );
        self.sleeper.sleep(delay);
        Ok(State::Put)
    }
}
