//! Optional font preprocessing ahead of conversion.
//!
//! Steps always run in the order subset → instance → drop-hints. Each step
//! edits the in-memory table map and the result is written once, to the
//! request's scratch directory. An identity spec returns the source file
//! untouched without reading it.

mod hints;
mod instance;
mod subset;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TransformError, TransformStep};
use crate::sfnt::SfntFont;
use crate::unicode::{language_codepoints, parse_codepoint, parse_range};

/// Which characters a subset keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SubsetSpec {
    /// Every character of the text.
    Text(String),
    /// Explicit code points: `U+0041`, `0041`.
    Unicodes(Vec<String>),
    /// Inclusive ranges: `U+0000-00FF`.
    Ranges(Vec<String>),
    /// A language or script tag: `latin`, `cyrillic`, `de`, `ru`.
    Language(String),
}

impl SubsetSpec {
    /// Resolve to the set of requested code points.
    pub fn codepoints(&self) -> Result<BTreeSet<u32>, String> {
        match self {
            SubsetSpec::Text(text) => Ok(text.chars().map(u32::from).collect()),
            SubsetSpec::Unicodes(values) => values.iter().map(|v| parse_codepoint(v)).collect(),
            SubsetSpec::Ranges(values) => {
                let mut out = BTreeSet::new();
                for value in values {
                    let (start, end) = parse_range(value)?;
                    out.extend(start..=end);
                }
                Ok(out)
            }
            SubsetSpec::Language(tag) => language_codepoints(tag),
        }
    }

    /// Sample text for previews when the subset is text based.
    pub fn sample_text(&self) -> Option<&str> {
        match self {
            SubsetSpec::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Where to pin a variable font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum InstanceSpec {
    /// An `fvar` named instance, matched case-insensitively.
    Named(String),
    /// Axis values keyed by tag (`wght`) or axis name (`Weight`).
    Coordinates(BTreeMap<String, f32>),
}

fn default_retain_layout() -> bool {
    true
}

/// Requested preprocessing. The default is the identity transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(default)]
    pub subset: Option<SubsetSpec>,
    #[serde(default)]
    pub instance: Option<InstanceSpec>,
    #[serde(default)]
    pub drop_hints: bool,
    /// Keep GSUB/GPOS/GDEF when subsetting.
    #[serde(default = "default_retain_layout")]
    pub retain_layout: bool,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            subset: None,
            instance: None,
            drop_hints: false,
            retain_layout: true,
        }
    }
}

impl TransformSpec {
    pub fn is_identity(&self) -> bool {
        self.subset.is_none() && self.instance.is_none() && !self.drop_hints
    }
}

/// Result of [`Transformer::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// File to convert: the source itself for identity transforms.
    pub path: PathBuf,
    pub face_index: u32,
    pub warnings: Vec<String>,
    /// Axis coordinates the font was pinned at, keyed by tag.
    pub instance: Option<BTreeMap<String, f32>>,
}

/// Applies a [`TransformSpec`] to a font file.
#[derive(Debug, Clone, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        source: &Path,
        face_index: u32,
        spec: &TransformSpec,
        scratch: &Path,
    ) -> Result<TransformOutcome, TransformError> {
        if spec.is_identity() {
            return Ok(TransformOutcome {
                path: source.to_path_buf(),
                face_index,
                warnings: Vec::new(),
                instance: None,
            });
        }

        let data = std::fs::read(source).map_err(|e| {
            TransformError::new(
                TransformStep::Read,
                format!("cannot read {}: {e}", source.display()),
            )
        })?;
        let mut font = SfntFont::parse(&data, face_index)
            .map_err(|e| TransformError::new(TransformStep::Read, e.to_string()))?;

        let (warnings, instance) = self.apply_to_font(&mut font, spec)?;

        let extension = if font.is_cff() { "otf" } else { "ttf" };
        let path = scratch.join(format!("transformed.{extension}"));
        std::fs::write(&path, font.to_bytes()).map_err(|e| {
            TransformError::new(
                TransformStep::Write,
                format!("cannot write {}: {e}", path.display()),
            )
        })?;
        log::debug!(
            "Transformed {} into {} ({} warnings)",
            source.display(),
            path.display(),
            warnings.len()
        );

        Ok(TransformOutcome {
            path,
            face_index: 0,
            warnings,
            instance,
        })
    }

    /// Run the configured steps on an in-memory font.
    pub fn apply_to_font(
        &self,
        font: &mut SfntFont,
        spec: &TransformSpec,
    ) -> Result<(Vec<String>, Option<BTreeMap<String, f32>>), TransformError> {
        let mut warnings = Vec::new();

        if let Some(subset) = &spec.subset {
            subset::apply(font, subset, spec.retain_layout, &mut warnings)
                .map_err(|reason| TransformError::new(TransformStep::Subset, reason))?;
        }

        let instance = match &spec.instance {
            Some(instance) => instance::apply(font, instance, &mut warnings)
                .map_err(|reason| TransformError::new(TransformStep::Instance, reason))?,
            None => None,
        };

        if spec.drop_hints {
            hints::apply(font, &mut warnings)
                .map_err(|reason| TransformError::new(TransformStep::DropHints, reason))?;
        }

        Ok((warnings, instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfnt::tags;
    use crate::testing::{GLYPH_A, TestFont};

    fn write_font(dir: &Path, font: TestFont) -> PathBuf {
        font.write_to(dir).unwrap()
    }

    #[test]
    fn test_identity_passes_source_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_font(dir.path(), TestFont::new("Test Sans", "Regular"));
        let outcome = Transformer::new()
            .apply(&source, 0, &TransformSpec::default(), dir.path())
            .unwrap();
        assert_eq!(outcome.path, source);
        assert!(outcome.warnings.is_empty());
        assert!(!dir.path().join("transformed.ttf").exists());
    }

    #[test]
    fn test_apply_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_font(dir.path(), TestFont::new("Test Sans", "Regular").variable());
        let spec = TransformSpec {
            subset: Some(SubsetSpec::Text("AC".into())),
            instance: Some(InstanceSpec::Named("bold".into())),
            drop_hints: true,
            retain_layout: true,
        };
        let a_dir = tempfile::tempdir().unwrap();
        let b_dir = tempfile::tempdir().unwrap();
        let a = Transformer::new()
            .apply(&source, 0, &spec, a_dir.path())
            .unwrap();
        let b = Transformer::new()
            .apply(&source, 0, &spec, b_dir.path())
            .unwrap();
        assert_eq!(
            std::fs::read(&a.path).unwrap(),
            std::fs::read(&b.path).unwrap()
        );
        assert_eq!(a.instance.unwrap().get("wght"), Some(&700.0));
    }

    #[test]
    fn test_failed_step_names_step_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_font(dir.path(), TestFont::new("Test Sans", "Regular"));
        let scratch = tempfile::tempdir().unwrap();
        let spec = TransformSpec {
            subset: Some(SubsetSpec::Text("xyz".into())),
            ..TransformSpec::default()
        };
        let err = Transformer::new()
            .apply(&source, 0, &spec, scratch.path())
            .unwrap_err();
        assert_eq!(err.step, TransformStep::Subset);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_source_is_read_error() {
        let scratch = tempfile::tempdir().unwrap();
        let spec = TransformSpec {
            drop_hints: true,
            ..TransformSpec::default()
        };
        let err = Transformer::new()
            .apply(Path::new("/missing.ttf"), 0, &spec, scratch.path())
            .unwrap_err();
        assert_eq!(err.step, TransformStep::Read);
    }

    #[test]
    fn test_steps_compose_in_order() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let spec = TransformSpec {
            subset: Some(SubsetSpec::Unicodes(vec!["U+0041".into()])),
            instance: Some(InstanceSpec::Coordinates(BTreeMap::from([(
                "wght".to_string(),
                900.0,
            )]))),
            drop_hints: true,
            retain_layout: false,
        };
        let (_, instance) = Transformer::new().apply_to_font(&mut font, &spec).unwrap();
        assert_eq!(instance.unwrap().get("wght"), Some(&900.0));
        assert!(!font.has_table(tags::FVAR));
        assert!(!font.has_table(tags::FPGM));

        let bytes = font.to_bytes();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        assert_eq!(face.glyph_index('A').map(|g| g.0), Some(GLYPH_A));
        assert_eq!(face.glyph_index('B'), None);
        let bbox = face
            .glyph_bounding_box(ttf_parser::GlyphId(GLYPH_A))
            .unwrap();
        assert_eq!(bbox.x_min, 50);
    }

    #[test]
    fn test_spec_serde_defaults() {
        let spec: TransformSpec = serde_json::from_str("{}").unwrap();
        assert!(spec.is_identity());
        assert!(spec.retain_layout);

        let spec: TransformSpec =
            serde_json::from_str(r#"{"subset":{"mode":"text","value":"Hi"}}"#).unwrap();
        assert_eq!(spec.subset, Some(SubsetSpec::Text("Hi".into())));
    }

    #[test]
    fn test_subset_codepoints() {
        let ranges = SubsetSpec::Ranges(vec!["U+0041-0043".into(), "U+0061".into()]);
        assert_eq!(
            ranges.codepoints().unwrap().into_iter().collect::<Vec<_>>(),
            vec![0x41, 0x42, 0x43, 0x61]
        );
        assert!(SubsetSpec::Unicodes(vec!["nope".into()]).codepoints().is_err());
        assert_eq!(SubsetSpec::Text("Hi".into()).sample_text(), Some("Hi"));
    }
}
