//! Font catalog: the blocking source of installed faces.
//!
//! [`SystemCatalog`] discovers fonts through `fontdb` (system directories plus
//! configured extra directories). The face index only sees the
//! [`FontCatalog`] trait so tests can substitute their own catalogs.

use std::path::PathBuf;

use fontdb::Database;

use crate::error::CatalogError;
use crate::face::{FaceStyle, FormatKind};
use crate::fvar::find_name;

/// A face as reported by the catalog, before indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDescriptor {
    pub post_script_name: String,
    pub subfamily: Option<String>,
    pub style: FaceStyle,
    pub source: Option<PathBuf>,
    pub face_index: u32,
    pub format: FormatKind,
}

/// Source of installed font faces. Calls may block on disk I/O; callers run
/// them on the blocking thread pool.
pub trait FontCatalog: Send + Sync {
    /// Every face known to the catalog, paired with its family name.
    fn enumerate_families(&self) -> Result<Vec<(String, FaceDescriptor)>, CatalogError>;

    /// Location of the file holding a face, if it lives on disk.
    fn face_path(&self, descriptor: &FaceDescriptor) -> Option<PathBuf> {
        descriptor.source.clone()
    }
}

/// Catalog backed by `fontdb` system font discovery.
#[derive(Debug, Clone)]
pub struct SystemCatalog {
    include_system_fonts: bool,
    font_dirs: Vec<PathBuf>,
}

impl SystemCatalog {
    pub fn new(include_system_fonts: bool, font_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_system_fonts,
            font_dirs,
        }
    }

    fn load_database(&self) -> Database {
        let mut db = Database::new();
        if self.include_system_fonts {
            db.load_system_fonts();
            log::info!("Loaded {} system font faces", db.len());
        }
        for dir in &self.font_dirs {
            if dir.is_dir() {
                let before = db.len();
                db.load_fonts_dir(dir);
                log::info!(
                    "Loaded {} font faces from {}",
                    db.len() - before,
                    dir.display()
                );
            } else {
                log::warn!("Font directory {} does not exist, skipping", dir.display());
            }
        }
        db
    }
}

impl FontCatalog for SystemCatalog {
    fn enumerate_families(&self) -> Result<Vec<(String, FaceDescriptor)>, CatalogError> {
        let db = self.load_database();
        if db.is_empty() {
            return Err(CatalogError::Enumeration(
                "no font faces found in system or configured directories".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(db.len());
        for face in db.faces() {
            let Some((family, _)) = face.families.first() else {
                log::debug!("Skipping face {:?} without a family name", face.id);
                continue;
            };
            let source = match &face.source {
                fontdb::Source::File(path) => Some(path.clone()),
                fontdb::Source::SharedFile(path, _) => Some(path.clone()),
                fontdb::Source::Binary(_) => None,
            };
            let extra = db
                .with_face_data(face.id, read_face_extras)
                .unwrap_or_default();
            let style = FaceStyle {
                weight: face.weight.0,
                width: face.stretch.to_number(),
                italic: !matches!(face.style, fontdb::Style::Normal),
            };
            entries.push((
                family.clone(),
                FaceDescriptor {
                    post_script_name: face.post_script_name.clone(),
                    subfamily: extra.subfamily,
                    style,
                    source,
                    face_index: face.index,
                    format: extra.format,
                },
            ));
        }
        Ok(entries)
    }
}

#[derive(Debug, Default)]
struct FaceExtras {
    subfamily: Option<String>,
    format: FormatKind,
}

/// Read the subfamily name and variable axes fontdb does not expose.
fn read_face_extras(data: &[u8], index: u32) -> FaceExtras {
    let Ok(face) = ttf_parser::Face::parse(data, index) else {
        return FaceExtras::default();
    };
    // Typographic subfamily (17) before the legacy one (2).
    let subfamily = find_name(&face, 17).or_else(|| find_name(&face, 2));
    let format = if face.is_variable() {
        let weight_range = face
            .variation_axes()
            .into_iter()
            .find(|axis| axis.tag == ttf_parser::Tag::from_bytes(b"wght"))
            .map(|axis| (axis.min_value.round() as u16, axis.max_value.round() as u16));
        FormatKind::Variable { weight_range }
    } else {
        FormatKind::Static
    };
    FaceExtras { subfamily, format }
}
