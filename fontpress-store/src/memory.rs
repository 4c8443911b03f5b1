//! In-memory object store for dry runs and tests.
//!
//! Failures can be scripted per operation: each queued error is returned by
//! the next call of that operation instead of touching the stored objects.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{ObjectMeta, ObjectStore, PutOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    options: PutOptions,
}

#[derive(Debug, Default)]
struct Script {
    head_failures: VecDeque<StoreError>,
    put_failures: VecDeque<StoreError>,
    /// PUTs that succeed but store a truncated body.
    corrupt_puts: usize,
}

#[derive(Debug)]
pub struct MemoryStore {
    base_url: String,
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    script: Mutex<Script>,
    head_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory://")
    }
}

impl MemoryStore {
    /// Public URLs are `{base_url}{bucket}/{key}`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
            script: Mutex::new(Script::default()),
            head_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Store an object directly, bypassing the call counters.
    pub fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>, sha256: Option<&str>) {
        let options = PutOptions {
            content_type: "application/octet-stream".to_string(),
            cache_control: None,
            public: false,
            sha256: sha256.unwrap_or_default().to_string(),
        };
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), StoredObject { bytes, options });
    }

    pub fn fail_next_head(&self, error: StoreError) {
        self.script.lock().head_failures.push_back(error);
    }

    pub fn fail_next_put(&self, error: StoreError) {
        self.script.lock().put_failures.push_back(error);
    }

    /// The next `count` successful PUTs store a truncated body.
    pub fn corrupt_next_puts(&self, count: usize) {
        self.script.lock().corrupt_puts += count;
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.bytes.clone())
    }

    /// Options of the last PUT for a key.
    pub fn put_options(&self, bucket: &str, key: &str) -> Option<PutOptions> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.options.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.script.lock().head_failures.pop_front() {
            return Err(error);
        }
        Ok(self
            .objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| ObjectMeta {
                size: object.bytes.len() as u64,
                sha256: Some(object.options.sha256.clone()).filter(|s| !s.is_empty()),
                content_type: Some(object.options.content_type.clone()),
            }))
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        options: &PutOptions,
    ) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let corrupt = {
            let mut script = self.script.lock();
            if let Some(error) = script.put_failures.pop_front() {
                return Err(error);
            }
            let corrupt = script.corrupt_puts > 0;
            if corrupt {
                script.corrupt_puts -= 1;
            }
            corrupt
        };
        let stored = if corrupt {
            body[..body.len() / 2].to_vec()
        } else {
            body.to_vec()
        };
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes: stored,
                options: options.clone(),
            },
        );
        log::debug!("memory store: put {}/{} ({} bytes)", bucket, key, body.len());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.object(bucket, key)
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}{}/{}", self.base_url, bucket, key)
    }
}
