//! Font discovery, inspection and web-font conversion for fontpress.
//!
//! This crate provides:
//! - A blocking [`FontCatalog`] over installed fonts (fontdb backed)
//! - [`FontLibrary`], a TTL cache of family snapshots with single-flight refresh
//! - Face enrichment for tool results (axes, instances, license, color formats)
//! - [`Transformer`]: subset, variable instancing and hint removal on sfnt tables
//! - [`Converter`]: deterministic WOFF2 encoding with content hashing
//!
//! # Architecture
//!
//! Catalog enumeration produces [`FaceDescriptor`]s which a [`FamilySnapshot`]
//! turns into immutable [`FaceRecord`]s indexed by PostScript name. Publishing
//! reads the face's source file, optionally rewrites it through the
//! transformer into a scratch file, then encodes the result.

pub mod catalog;
pub mod error;
pub mod face;
pub mod fvar;
pub mod glyf;
pub mod library;
pub mod overview;
pub mod sfnt;
pub mod singleflight;
#[cfg(any(test, feature = "test-fonts"))]
pub mod testing;
pub mod transform;
pub mod unicode;
pub mod woff2;

// Re-export main types for convenience
pub use catalog::{FaceDescriptor, FontCatalog, SystemCatalog};
pub use error::{CatalogError, ConversionError, FontFileError, SfntError, TransformError, TransformStep};
pub use face::{FaceRecord, FaceStyle, FormatKind};
pub use library::{FamilySnapshot, FontLibrary, LibraryOptions};
pub use overview::{AxisInfo, FaceDetails, FaceOverview, NamedInstanceInfo, overview};
pub use singleflight::SingleFlight;
pub use transform::{InstanceSpec, SubsetSpec, TransformOutcome, TransformSpec, Transformer};
pub use woff2::{ConvertedArtifact, Converter, ConverterOptions, WebFontFormat, content_hash};
