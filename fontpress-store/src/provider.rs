//! Regional store cache.
//!
//! Each region gets one store, and with it one pooled HTTP agent, created on
//! first use and reused for every later upload to that region.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::s3::{S3Settings, S3Store};
use crate::sigv4::Credentials;
use crate::store::ObjectStore;

/// How stores are created.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    S3 {
        settings: S3Settings,
        /// Explicit credentials; the AWS environment variables otherwise.
        credentials: Option<Credentials>,
    },
    /// One shared in-memory store for every region.
    Memory(Arc<MemoryStore>),
}

pub struct StoreProvider {
    backend: StoreBackend,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl std::fmt::Debug for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreProvider")
            .field("backend", &self.backend)
            .field("regions", &self.stores.lock().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

impl StoreProvider {
    pub fn new(backend: StoreBackend) -> Self {
        Self {
            backend,
            stores: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }

    /// The store for a region, creating it on first use.
    pub fn store_for(&self, region: &str) -> Result<Arc<dyn ObjectStore>, StoreError> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(region) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<dyn ObjectStore> = match &self.backend {
            StoreBackend::Memory(memory) => memory.clone(),
            StoreBackend::S3 {
                settings,
                credentials,
            } => {
                let credentials = credentials
                    .clone()
                    .or_else(Credentials::from_env)
                    .ok_or_else(|| {
                        StoreError::Config(
                            "no storage credentials configured and AWS_ACCESS_KEY_ID / \
                             AWS_SECRET_ACCESS_KEY are not set"
                                .to_string(),
                        )
                    })?;
                Arc::new(S3Store::new(region, settings, credentials)?)
            }
        };
        stores.insert(region.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_cached_per_region() {
        let provider = StoreProvider::new(StoreBackend::S3 {
            settings: S3Settings::default(),
            credentials: Some(Credentials::new("AKID", "secret")),
        });
        let a = provider.store_for("us-east-1").unwrap();
        let b = provider.store_for("us-east-1").unwrap();
        let c = provider.store_for("eu-west-1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(
            c.public_url("fonts", "x.woff2"),
            "https://fonts.s3.eu-west-1.amazonaws.com/x.woff2"
        );
    }

    #[test]
    fn test_memory_backend_shares_one_store() {
        let memory = Arc::new(MemoryStore::default());
        let provider = StoreProvider::new(StoreBackend::Memory(memory.clone()));
        let store = provider.store_for("anywhere").unwrap();
        store
            .put(
                "b",
                "k",
                b"x",
                &crate::store::PutOptions {
                    content_type: "font/woff2".into(),
                    cache_control: None,
                    public: false,
                    sha256: String::new(),
                },
            )
            .unwrap();
        assert_eq!(memory.put_calls(), 1);
    }

    #[test]
    fn test_bad_region_is_config_error() {
        let provider = StoreProvider::new(StoreBackend::S3 {
            settings: S3Settings::default(),
            credentials: Some(Credentials::new("AKID", "secret")),
        });
        assert!(matches!(provider.store_for(" "), Err(StoreError::Config(_))));
    }
}
