//! The font service behind the MCP tools and CLI subcommands.
//!
//! Owns the face index, the store provider and the publisher, and renders
//! their results as tool JSON.

use std::sync::Arc;

use anyhow::Result;
use fontpress_config::{Config, StorageBackendKind, UploadConfig};
use fontpress_fonts::{
    CatalogError, ConverterOptions, FaceRecord, FontCatalog, FontLibrary, LibraryOptions,
    SystemCatalog, overview,
};
use fontpress_mcp::{
    FacesForFamilyRequest, FontOverviewRequest, PublishFontRequest, ToolBackend, ToolFailure,
};
use fontpress_store::{
    Credentials, ExponentialBackoff, MemoryStore, RetryPolicy, S3Settings, StoreBackend,
    StoreProvider, Uploader,
};
use serde_json::{Value, json};

use crate::publish::{
    ArtifactGenerator, PublishError, PublishResult, Publisher, PublisherSettings, build_request,
};

pub struct FontService {
    config: Arc<Config>,
    library: Arc<FontLibrary>,
    publisher: Arc<Publisher>,
}

impl FontService {
    /// Wire the service from configuration: system catalog, S3 or in-memory
    /// store, retry policy and converter settings.
    pub fn from_config(config: Config) -> Result<Self> {
        let catalog = SystemCatalog::new(config.catalog.include_system_fonts, config.font_dirs());
        if let Some(endpoint) = &config.storage.endpoint {
            fontpress_store::http::validate_endpoint(endpoint)
                .map_err(|e| anyhow::anyhow!("storage.endpoint: {e}"))?;
        }
        let backend = match config.storage.backend {
            StorageBackendKind::S3 => StoreBackend::S3 {
                settings: S3Settings {
                    endpoint: config.storage.endpoint.clone(),
                    path_style: config.storage.path_style,
                    public_base_url: config.storage.public_base_url.clone(),
                    timeout: config.storage.timeout(),
                },
                credentials: config.storage.credentials.as_ref().map(|c| Credentials {
                    access_key_id: c.access_key_id.clone(),
                    secret_access_key: c.secret_access_key.clone(),
                    session_token: c.session_token.clone(),
                }),
            },
            StorageBackendKind::Memory => {
                log::warn!("Using the in-memory store; published objects are not persisted");
                StoreBackend::Memory(Arc::new(MemoryStore::default()))
            }
        };
        let uploader = uploader_from_config(&config.upload);
        Ok(Self::new(
            config,
            Arc::new(catalog),
            Arc::new(StoreProvider::new(backend)),
            uploader,
        ))
    }

    pub fn new(
        config: Config,
        catalog: Arc<dyn FontCatalog>,
        stores: Arc<StoreProvider>,
        uploader: Uploader,
    ) -> Self {
        let library = Arc::new(FontLibrary::new(
            catalog,
            LibraryOptions {
                ttl: config.catalog.ttl(),
                refresh_on_miss: config.catalog.refresh_on_miss(),
            },
        ));
        let settings = PublisherSettings {
            scratch_root: config.scratch_root(),
            max_concurrent: config.convert.max_concurrent,
            converter: ConverterOptions {
                quality: config.convert.brotli_quality,
                window: config.convert.brotli_window,
            },
            artifacts: ArtifactGenerator::new(
                config.artifacts.font_display.clone(),
                config.artifacts.sample_text.clone(),
            ),
        };
        let publisher = Arc::new(Publisher::new(
            Arc::clone(&library),
            stores,
            uploader,
            settings,
        ));
        Self {
            config: Arc::new(config),
            library,
            publisher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &Arc<FontLibrary> {
        &self.library
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Run a validated publish request through the pipeline.
    pub async fn publish(
        &self,
        request: PublishFontRequest,
    ) -> Result<Arc<PublishResult>, PublishError> {
        let request = build_request(request, &self.config.publish)?;
        self.publisher.publish(request).await
    }
}

/// Retry policy and backoff from the `upload` config section.
pub fn uploader_from_config(upload: &UploadConfig) -> Uploader {
    Uploader::new(RetryPolicy {
        max_attempts: upload.max_attempts,
        verify: upload.verify,
    })
    .with_backoff(Arc::new(ExponentialBackoff {
        base: upload.base_delay(),
        max: upload.max_delay(),
        jitter: upload.jitter,
    }))
}

fn resolve_failure(err: CatalogError) -> ToolFailure {
    ToolFailure::new("resolve", err.kind(), err.to_string())
}

/// Face record merged with file details, or the bare record plus an error
/// when the file can no longer be read.
fn face_json(face: &FaceRecord) -> Value {
    match overview(face) {
        Ok(overview) => serde_json::to_value(overview).unwrap_or(Value::Null),
        Err(err) => {
            log::warn!("Cannot inspect {}: {}", face.post_script_name, err);
            let mut value = serde_json::to_value(face).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                map.insert("error".to_string(), Value::String(err.to_string()));
            }
            value
        }
    }
}

impl ToolBackend for FontService {
    async fn list_families(&self) -> Result<Value, ToolFailure> {
        let snapshot = self
            .library
            .list_families(false)
            .await
            .map_err(resolve_failure)?;
        let families: Vec<Value> = snapshot
            .families()
            .iter()
            .map(|(family, faces)| json!({"family": family, "faceCount": faces.len()}))
            .collect();
        Ok(json!({
            "familyCount": snapshot.family_count(),
            "faceCount": snapshot.face_count(),
            "generatedAt": snapshot.created_at(),
            "families": families,
        }))
    }

    async fn faces_for_family(&self, request: FacesForFamilyRequest) -> Result<Value, ToolFailure> {
        let faces = self
            .library
            .faces_for_family(&request.family)
            .await
            .map_err(resolve_failure)?;
        let family = faces
            .first()
            .map(|f| f.family.clone())
            .unwrap_or(request.family);
        let faces = tokio::task::spawn_blocking(move || faces.iter().map(face_json).collect::<Vec<_>>())
            .await
            .map_err(|e| ToolFailure::new("inspect", "internal", e.to_string()))?;
        Ok(json!({"family": family, "faces": faces}))
    }

    async fn font_overview(&self, request: FontOverviewRequest) -> Result<Value, ToolFailure> {
        let face = self
            .library
            .resolve(&request.post_script_name)
            .await
            .map_err(resolve_failure)?;
        let overview = tokio::task::spawn_blocking(move || overview(&face))
            .await
            .map_err(|e| ToolFailure::new("inspect", "internal", e.to_string()))?
            .map_err(|e| ToolFailure::new("inspect", "unreadable_font", e.to_string()))?;
        serde_json::to_value(overview)
            .map_err(|e| ToolFailure::new("inspect", "internal", e.to_string()))
    }

    async fn publish_font(&self, request: PublishFontRequest) -> Result<Value, ToolFailure> {
        let result = self.publish(request).await?;
        serde_json::to_value(result.as_ref())
            .map_err(|e| ToolFailure::new("generate", "internal", e.to_string()))
    }
}
