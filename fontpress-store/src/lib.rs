//! Object storage for fontpress.
//!
//! Provides:
//! - `store`: the blocking [`ObjectStore`] trait (head, put, get, public URL)
//! - `s3`: S3 REST client with SigV4 signing over a pooled `ureq` agent
//! - `memory`: in-memory store with scriptable failures
//! - `provider`: one store per region, created lazily
//! - `uploader`: the content-addressed upload state machine with retry/backoff
//! - `http`: agent construction, endpoint validation, error classification

pub mod error;
pub mod http;
pub mod memory;
pub mod provider;
pub mod s3;
pub mod sigv4;
pub mod store;
pub mod uploader;

pub use error::{StoreError, StoreOp, UploadError};
pub use memory::MemoryStore;
pub use provider::{StoreBackend, StoreProvider};
pub use s3::{S3Settings, S3Store};
pub use sigv4::{Credentials, sha256_hex};
pub use store::{ObjectMeta, ObjectStore, PutOptions};
pub use uploader::{
    Backoff, Blob, Destination, ExponentialBackoff, RetryPolicy, Sleeper, ThreadSleeper,
    UploadResult, Uploader,
};
