//! Detailed face inspection for `font_overview` and `faces_for_family`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use write_fonts::read::{FontRef, TableProvider};
use write_fonts::types::Tag;

use crate::error::FontFileError;
use crate::face::FaceRecord;
use crate::fvar::{FvarTable, find_name};
use crate::sfnt::{tag_name, tags};

/// Tables whose presence marks a color font, with the format label reported.
const COLOR_TABLES: [(Tag, &str); 6] = [
    (tags::COLR, "COLR"),
    (tags::CPAL, "CPAL"),
    (tags::SBIX, "sbix"),
    (tags::CBDT, "CBDT"),
    (tags::CBLC, "CBLC"),
    (tags::SVG, "SVG"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisInfo {
    pub tag: String,
    pub name: Option<String>,
    pub min: f32,
    pub default: f32,
    pub max: f32,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedInstanceInfo {
    pub name: Option<String>,
    pub coordinates: BTreeMap<String, f32>,
}

/// Metadata read from the font file itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetails {
    pub version: Option<String>,
    pub license: Option<String>,
    pub copyright: Option<String>,
    /// OS/2 embedding permissions.
    pub fs_type: Option<u16>,
    pub glyph_count: u16,
    pub is_variable: bool,
    pub axes: Vec<AxisInfo>,
    pub named_instances: Vec<NamedInstanceInfo>,
    pub tables: Vec<String>,
    pub color_formats: Vec<String>,
}

/// A face record merged with its file details.
#[derive(Debug, Clone, Serialize)]
pub struct FaceOverview {
    #[serde(flatten)]
    pub face: FaceRecord,
    #[serde(flatten)]
    pub details: FaceDetails,
}

/// Read details for one face of a font file.
pub fn inspect(path: &Path, face_index: u32) -> Result<FaceDetails, FontFileError> {
    let data = std::fs::read(path).map_err(|source| FontFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    inspect_bytes(&data, face_index).map_err(|reason| FontFileError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Build the face overview for a record.
pub fn overview(face: &FaceRecord) -> Result<FaceOverview, FontFileError> {
    let details = inspect(&face.path, face.face_index)?;
    Ok(FaceOverview {
        face: face.clone(),
        details,
    })
}

pub fn inspect_bytes(data: &[u8], face_index: u32) -> Result<FaceDetails, String> {
    let font = FontRef::from_index(data, face_index).map_err(|e| e.to_string())?;
    let face = ttf_parser::Face::parse(data, face_index).map_err(|e| e.to_string())?;
    let has_table = |tag: Tag| font.data_for_tag(tag).is_some();

    let fs_type = font.os2().ok().map(|os2| os2.fs_type());
    let fvar = FvarTable::read(font.clone()).map_err(|e| e.to_string())?;

    let axes = fvar
        .axes
        .iter()
        .map(|axis| AxisInfo {
            tag: tag_name(axis.tag),
            name: find_name(&face, axis.name_id),
            min: axis.min,
            default: axis.default,
            max: axis.max,
            hidden: axis.hidden,
        })
        .collect();
    let named_instances = fvar
        .instances
        .iter()
        .map(|instance| NamedInstanceInfo {
            name: find_name(&face, instance.subfamily_name_id),
            coordinates: fvar
                .axes
                .iter()
                .zip(&instance.coordinates)
                .map(|(axis, value)| (tag_name(axis.tag), *value))
                .collect(),
        })
        .collect();

    let color_formats = COLOR_TABLES
        .iter()
        .filter(|(tag, _)| has_table(*tag))
        .map(|(_, label)| label.to_string())
        .collect();

    Ok(FaceDetails {
        version: find_name(&face, ttf_parser::name_id::VERSION),
        license: find_name(&face, ttf_parser::name_id::LICENSE),
        copyright: find_name(&face, ttf_parser::name_id::COPYRIGHT_NOTICE),
        fs_type,
        glyph_count: face.number_of_glyphs(),
        is_variable: fvar.is_variable(),
        axes,
        named_instances,
        tables: font
            .table_directory()
            .table_records()
            .iter()
            .map(|record| tag_name(record.tag()))
            .collect(),
        color_formats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFont;

    #[test]
    fn test_inspect_static_face() {
        let bytes = TestFont::new("Test Sans", "Regular").fs_type(8).build();
        let details = inspect_bytes(&bytes, 0).unwrap();
        assert_eq!(details.version.as_deref(), Some("Version 1.000"));
        assert_eq!(details.license.as_deref(), Some("SIL Open Font License 1.1"));
        assert!(details.copyright.unwrap().starts_with("Copyright"));
        assert_eq!(details.fs_type, Some(8));
        assert_eq!(details.glyph_count, 4);
        assert!(!details.is_variable);
        assert!(details.axes.is_empty());
        assert!(details.tables.contains(&"glyf".to_string()));
        assert!(details.tables.contains(&"cvt".to_string()));
        assert!(details.color_formats.is_empty());
    }

    #[test]
    fn test_inspect_variable_face() {
        let bytes = TestFont::new("Test Sans", "Regular").variable().build();
        let details = inspect_bytes(&bytes, 0).unwrap();
        assert!(details.is_variable);
        assert_eq!(details.axes.len(), 1);
        assert_eq!(details.axes[0].tag, "wght");
        assert_eq!(details.axes[0].name.as_deref(), Some("Weight"));
        assert_eq!(details.axes[0].max, 900.0);
        let bold = &details.named_instances[1];
        assert_eq!(bold.name.as_deref(), Some("Bold"));
        assert_eq!(bold.coordinates.get("wght"), Some(&700.0));
    }

    #[test]
    fn test_inspect_missing_file() {
        let err = inspect(Path::new("/definitely/not/here.ttf"), 0).unwrap_err();
        assert!(matches!(err, FontFileError::Io { .. }));
    }

    #[test]
    fn test_inspect_garbage() {
        assert!(inspect_bytes(b"not a font at all", 0).is_err());
    }
}
