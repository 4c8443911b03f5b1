//! Sequences resolve → transform → convert → upload → generate.
//!
//! Transform and convert share one blocking task and one scratch directory,
//! bounded by a semaphore so conversions cannot occupy every blocking
//! thread. Uploads run on their own blocking task. Neither task is aborted
//! when the caller's future is dropped, so verification and scratch cleanup
//! always finish.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fontpress_fonts::{
    ConvertedArtifact, Converter, ConverterOptions, FaceRecord, FontLibrary, SingleFlight,
    SubsetSpec, TransformSpec, Transformer,
};
use fontpress_store::{Blob, Destination, StoreProvider, UploadResult, Uploader};
use tokio::sync::Semaphore;

use super::artifacts::ArtifactGenerator;
use super::{PublishError, PublishRequest, PublishResult, Stage};

/// Prefix of per-request scratch directories under the scratch root.
pub const SCRATCH_PREFIX: &str = "publish-";

type FlightResult = Result<Arc<PublishResult>, PublishError>;

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub scratch_root: PathBuf,
    /// Concurrent transform+convert jobs.
    pub max_concurrent: usize,
    pub converter: ConverterOptions,
    pub artifacts: ArtifactGenerator,
}

/// Output of the CPU stage.
struct Converted {
    artifact: Arc<ConvertedArtifact>,
    warnings: Vec<String>,
    instance: Option<BTreeMap<String, f32>>,
}

pub struct Publisher {
    library: Arc<FontLibrary>,
    stores: Arc<StoreProvider>,
    uploader: Uploader,
    transformer: Transformer,
    converter: Converter,
    artifacts: ArtifactGenerator,
    scratch_root: PathBuf,
    cpu_slots: Arc<Semaphore>,
    in_flight: SingleFlight<String, FlightResult>,
}

impl Publisher {
    pub fn new(
        library: Arc<FontLibrary>,
        stores: Arc<StoreProvider>,
        uploader: Uploader,
        settings: PublisherSettings,
    ) -> Self {
        Self {
            library,
            stores,
            uploader,
            transformer: Transformer::new(),
            converter: Converter::new(settings.converter),
            artifacts: settings.artifacts,
            scratch_root: settings.scratch_root,
            cpu_slots: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            in_flight: SingleFlight::new(),
        }
    }

    pub fn scratch_root(&self) -> &std::path::Path {
        &self.scratch_root
    }

    /// Publishes currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.in_flight()
    }

    /// Publish one face. Identical concurrent requests share one run.
    pub async fn publish(&self, request: PublishRequest) -> FlightResult {
        let key = request.flight_key();
        self.in_flight.run(key, || self.run(request)).await
    }

    async fn run(&self, request: PublishRequest) -> FlightResult {
        let started = Instant::now();
        let destination = &request.destination;
        log::info!(
            "Publishing {} to {}/{} ({})",
            request.post_script_name,
            destination.bucket,
            destination.prefix,
            destination.region
        );

        let face = self.library.resolve(&request.post_script_name).await?;
        log::info!(
            "Resolved {} to {} (face {})",
            face.post_script_name,
            face.path.display(),
            face.face_index
        );

        let converted = self.transform_and_convert(&face, &request.transform).await?;
        let warnings = converted.warnings;

        let upload = self
            .upload(Arc::clone(&converted.artifact), destination)
            .await
            .map_err(|e| e.with_warnings(warnings.clone()))?;

        let sample = request
            .transform
            .subset
            .as_ref()
            .and_then(SubsetSpec::sample_text);
        let artifacts = self
            .artifacts
            .generate(&upload, &face, converted.instance.as_ref(), sample)
            .map_err(|e| PublishError::from(e).with_warnings(warnings.clone()))?;

        log::info!(
            "Published {} as {} ({} bytes, {} attempt(s), skipped={}) in {:?}",
            face.post_script_name,
            upload.url,
            upload.size,
            upload.attempts,
            upload.skipped,
            started.elapsed()
        );

        Ok(Arc::new(PublishResult {
            post_script_name: face.post_script_name,
            woff2_url: upload.url.clone(),
            css: artifacts.css,
            sample_html: artifacts.html,
            size_bytes: upload.size,
            sha256: upload.sha256.clone(),
            source_size_bytes: converted.artifact.source_size,
            upload,
            instance: converted.instance,
            warnings,
        }))
    }

    async fn transform_and_convert(
        &self,
        face: &FaceRecord,
        spec: &TransformSpec,
    ) -> Result<Converted, PublishError> {
        let permit = Arc::clone(&self.cpu_slots)
            .acquire_owned()
            .await
            .map_err(|e| PublishError::internal(Stage::Transform, e.to_string()))?;

        let transformer = self.transformer.clone();
        let converter = self.converter.clone();
        let root = self.scratch_root.clone();
        let spec = spec.clone();
        let source = face.path.clone();
        let face_index = face.face_index;
        let stem = face.post_script_name.clone();

        tokio::task::spawn_blocking(move || -> Result<Converted, PublishError> {
            let _permit = permit;
            std::fs::create_dir_all(&root).map_err(|e| {
                PublishError::new(
                    Stage::Transform,
                    "scratch",
                    format!("cannot create scratch root {}: {e}", root.display()),
                )
            })?;
            let scratch = tempfile::Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempdir_in(&root)
                .map_err(|e| {
                    PublishError::new(
                        Stage::Transform,
                        "scratch",
                        format!("cannot create scratch directory: {e}"),
                    )
                })?;

            let outcome = transformer.apply(&source, face_index, &spec, scratch.path())?;
            for warning in &outcome.warnings {
                log::warn!("{}: {}", stem, warning);
            }

            let artifact = converter
                .convert(&outcome.path, outcome.face_index, &stem)
                .map_err(|e| PublishError::from(e).with_warnings(outcome.warnings.clone()))?;

            if let Err(e) = scratch.close() {
                log::warn!("Failed to remove scratch directory: {}", e);
            }

            Ok(Converted {
                artifact: Arc::new(artifact),
                warnings: outcome.warnings,
                instance: outcome.instance,
            })
        })
        .await
        .map_err(|e| PublishError::internal(Stage::Convert, format!("conversion task failed: {e}")))?
    }

    async fn upload(
        &self,
        artifact: Arc<ConvertedArtifact>,
        destination: &Destination,
    ) -> Result<UploadResult, PublishError> {
        let store = self.stores.store_for(&destination.region)?;
        let uploader = self.uploader.clone();
        let destination = destination.clone();

        tokio::task::spawn_blocking(move || {
            let blob = Blob {
                bytes: &artifact.bytes,
                sha256: &artifact.sha256,
                extension: artifact.format.extension(),
                content_type: artifact.format.mime_type(),
            };
            uploader.upload(store.as_ref(), blob, &destination)
        })
        .await
        .map_err(|e| PublishError::internal(Stage::Upload, format!("upload task failed: {e}")))?
        .map_err(PublishError::from)
    }
}
