//! Face index and family cache.
//!
//! [`FontLibrary`] owns the current [`FamilySnapshot`]: a sorted map of family
//! names to face records plus a PostScript-name index, built by one full
//! catalog enumeration. Snapshots expire after a TTL; concurrent refreshes
//! are coalesced so exactly one enumeration is in flight. When a refresh
//! fails the previous snapshot keeps being served.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::catalog::{FaceDescriptor, FontCatalog};
use crate::error::CatalogError;
use crate::face::{FaceRecord, file_format};
use crate::singleflight::SingleFlight;

/// Cache behaviour of a [`FontLibrary`].
#[derive(Debug, Clone)]
pub struct LibraryOptions {
    /// How long a snapshot is served before the next access re-enumerates.
    pub ttl: Duration,
    /// Unknown identifiers force one refresh when the snapshot is at least
    /// this old. `None` disables refresh-on-miss.
    pub refresh_on_miss: Option<Duration>,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            refresh_on_miss: Some(Duration::from_secs(30)),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable result of one catalog enumeration.
#[derive(Debug)]
pub struct FamilySnapshot {
    families: BTreeMap<String, Vec<FaceRecord>>,
    index: HashMap<String, (String, usize)>,
    created_at: DateTime<Utc>,
    built: Instant,
    generation: u64,
}

impl FamilySnapshot {
    /// Index catalog entries. Faces without a file are skipped; for duplicate
    /// PostScript names the face with the first source path wins.
    pub fn build(
        mut entries: Vec<(String, FaceDescriptor)>,
        catalog: &dyn FontCatalog,
        generation: u64,
    ) -> Self {
        let now = Utc::now();
        let mut located: Vec<(String, FaceDescriptor, std::path::PathBuf)> = entries
            .drain(..)
            .filter_map(|(family, descriptor)| {
                let path = catalog.face_path(&descriptor);
                if path.is_none() {
                    log::debug!(
                        "Skipping face {} with no file on disk",
                        descriptor.post_script_name
                    );
                }
                path.map(|p| (family, descriptor, p))
            })
            .collect();
        located.sort_by(|a, b| (&a.2, a.1.face_index).cmp(&(&b.2, b.1.face_index)));

        let mut seen = std::collections::HashSet::new();
        let mut families: BTreeMap<String, Vec<FaceRecord>> = BTreeMap::new();
        for (family, descriptor, path) in located {
            let name = descriptor.post_script_name.trim().to_string();
            if name.is_empty() || family.trim().is_empty() {
                continue;
            }
            if !seen.insert(name.clone()) {
                log::debug!(
                    "Duplicate PostScript name {} in {}, keeping first",
                    name,
                    path.display()
                );
                continue;
            }
            let record = FaceRecord {
                post_script_name: name,
                family: family.clone(),
                subfamily: descriptor.subfamily,
                style: descriptor.style,
                file_format: file_format(&path),
                path,
                face_index: descriptor.face_index,
                format: descriptor.format,
                last_verified: now,
            };
            families.entry(family).or_default().push(record);
        }

        let mut index = HashMap::new();
        for (family, faces) in families.iter_mut() {
            faces.sort_by(|a, b| {
                (a.style.weight, a.style.width, a.style.italic, &a.post_script_name).cmp(&(
                    b.style.weight,
                    b.style.width,
                    b.style.italic,
                    &b.post_script_name,
                ))
            });
            for (position, face) in faces.iter().enumerate() {
                index.insert(face.post_script_name.clone(), (family.clone(), position));
            }
        }

        Self {
            families,
            index,
            created_at: now,
            built: Instant::now(),
            generation,
        }
    }

    /// Look up a face by PostScript name.
    pub fn face(&self, post_script_name: &str) -> Option<&FaceRecord> {
        let (family, position) = self.index.get(post_script_name)?;
        self.families.get(family)?.get(*position)
    }

    pub fn faces(&self, family: &str) -> Option<&[FaceRecord]> {
        self.families.get(family).map(Vec::as_slice)
    }

    /// Family names in sorted order.
    pub fn family_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.families.keys().map(String::as_str)
    }

    pub fn families(&self) -> &BTreeMap<String, Vec<FaceRecord>> {
        &self.families
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn face_count(&self) -> usize {
        self.index.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn age(&self) -> Duration {
        self.built.elapsed()
    }

    /// Increases by one with every enumeration the library performs.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

struct CachedSnapshot {
    snapshot: Arc<FamilySnapshot>,
    expires_at: Instant,
}

type RefreshResult = Result<Arc<FamilySnapshot>, CatalogError>;

/// Lazily populated, TTL-bound face index over a [`FontCatalog`].
pub struct FontLibrary {
    catalog: Arc<dyn FontCatalog>,
    options: LibraryOptions,
    current: RwLock<Option<CachedSnapshot>>,
    refresh: SingleFlight<(), RefreshResult>,
    generation: AtomicU64,
}

impl FontLibrary {
    pub fn new(catalog: Arc<dyn FontCatalog>, options: LibraryOptions) -> Self {
        Self {
            catalog,
            options,
            current: RwLock::new(None),
            refresh: SingleFlight::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Current snapshot, refreshing it when expired or when forced.
    pub async fn list_families(&self, force_refresh: bool) -> RefreshResult {
        if !force_refresh && let Some(fresh) = self.fresh() {
            log::debug!("Family cache hit (generation {})", fresh.generation());
            return Ok(fresh);
        }

        match self.refresh.run((), || self.enumerate()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => match self.cached() {
                Some(stale) => {
                    log::warn!(
                        "Font enumeration failed ({}), serving snapshot from {}",
                        err,
                        stale.created_at()
                    );
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    /// Resolve a PostScript name to its face record.
    pub async fn resolve(&self, post_script_name: &str) -> Result<FaceRecord, CatalogError> {
        let snapshot = self.list_families(false).await?;
        if let Some(face) = snapshot.face(post_script_name) {
            return Ok(face.clone());
        }

        if let Some(window) = self.options.refresh_on_miss
            && snapshot.age() >= window
        {
            log::debug!(
                "{} not in snapshot aged {:?}, refreshing once",
                post_script_name,
                snapshot.age()
            );
            let refreshed = self.list_families(true).await?;
            if let Some(face) = refreshed.face(post_script_name) {
                return Ok(face.clone());
            }
        }
        Err(CatalogError::NotFound(post_script_name.to_string()))
    }

    /// All faces of one family, ordered by weight, width and slant.
    pub async fn faces_for_family(&self, family: &str) -> Result<Vec<FaceRecord>, CatalogError> {
        let snapshot = self.list_families(false).await?;
        snapshot
            .faces(family)
            .or_else(|| {
                // Case-insensitive fallback for hand-typed family names.
                snapshot
                    .families()
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(family))
                    .map(|(_, faces)| faces.as_slice())
            })
            .map(<[FaceRecord]>::to_vec)
            .ok_or_else(|| CatalogError::FamilyNotFound(family.to_string()))
    }

    /// Expire the current snapshot; it stays available as a stale fallback.
    pub fn invalidate(&self) {
        if let Some(cached) = self.current.write().as_mut() {
            cached.expires_at = Instant::now();
        }
    }

    /// The last successfully built snapshot, regardless of expiry.
    pub fn cached(&self) -> Option<Arc<FamilySnapshot>> {
        self.current
            .read()
            .as_ref()
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    fn fresh(&self) -> Option<Arc<FamilySnapshot>> {
        let current = self.current.read();
        let cached = current.as_ref()?;
        (Instant::now() < cached.expires_at).then(|| Arc::clone(&cached.snapshot))
    }

    async fn enumerate(&self) -> RefreshResult {
        let catalog = Arc::clone(&self.catalog);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        log::info!("Enumerating font catalog (generation {})", generation);

        let joined = tokio::task::spawn_blocking(move || {
            let entries = catalog.enumerate_families()?;
            Ok::<_, CatalogError>(FamilySnapshot::build(entries, catalog.as_ref(), generation))
        })
        .await;

        let snapshot = match joined {
            Ok(Ok(snapshot)) => Arc::new(snapshot),
            Ok(Err(err)) => return Err(err),
            Err(join_err) => {
                return Err(CatalogError::Enumeration(format!(
                    "enumeration task failed: {join_err}"
                )));
            }
        };

        log::info!(
            "Indexed {} faces in {} families in {:?}",
            snapshot.face_count(),
            snapshot.family_count(),
            started.elapsed()
        );
        *self.current.write() = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            expires_at: Instant::now() + self.options.ttl,
        });
        Ok(snapshot)
    }
}
