//! Face metadata records served by the face index.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight, width and slant of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceStyle {
    /// CSS / OS/2 weight, 1-1000.
    pub weight: u16,
    /// OS/2 width class, 1-9 (5 is normal).
    pub width: u16,
    pub italic: bool,
}

impl Default for FaceStyle {
    fn default() -> Self {
        Self {
            weight: 400,
            width: 5,
            italic: false,
        }
    }
}

impl FaceStyle {
    /// Common name of the weight, rounded to the nearest hundred.
    pub fn weight_name(&self) -> &'static str {
        match (self.weight + 50) / 100 {
            0 | 1 => "thin",
            2 => "extra-light",
            3 => "light",
            4 => "regular",
            5 => "medium",
            6 => "semibold",
            7 => "bold",
            8 => "extra-bold",
            _ => "black",
        }
    }

    /// CSS `font-stretch` percentage for the width class.
    pub fn width_percent(&self) -> f32 {
        match self.width {
            0 | 1 => 50.0,
            2 => 62.5,
            3 => 75.0,
            4 => 87.5,
            5 => 100.0,
            6 => 112.5,
            7 => 125.0,
            8 => 150.0,
            _ => 200.0,
        }
    }

    /// CSS `font-style` keyword.
    pub fn css_style(&self) -> &'static str {
        if self.italic { "italic" } else { "normal" }
    }
}

/// Static or variable outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FormatKind {
    #[default]
    Static,
    Variable {
        /// `wght` axis range when the face has one.
        #[serde(rename = "weightRange")]
        weight_range: Option<(u16, u16)>,
    },
}

impl FormatKind {
    pub fn is_variable(&self) -> bool {
        matches!(self, FormatKind::Variable { .. })
    }
}

/// An installed font face. Immutable; rebuilt with each family snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    /// PostScript name, unique within a snapshot.
    pub post_script_name: String,
    pub family: String,
    pub subfamily: Option<String>,
    pub style: FaceStyle,
    /// Font file holding the face.
    pub path: PathBuf,
    /// Index of the face within a collection file.
    pub face_index: u32,
    pub format: FormatKind,
    /// File container derived from the extension (`ttf`, `otf`, `ttc`, ...).
    pub file_format: String,
    pub last_verified: DateTime<Utc>,
}

impl FaceRecord {
    /// Human-readable style label, e.g. `"bold italic"`.
    pub fn style_label(&self) -> String {
        if let Some(subfamily) = &self.subfamily {
            return subfamily.clone();
        }
        let weight = self.style.weight_name();
        if self.style.italic {
            format!("{weight} italic")
        } else {
            weight.to_string()
        }
    }
}

/// Container format name from a font file path.
pub fn file_format(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_names() {
        let style = |weight| FaceStyle {
            weight,
            ..FaceStyle::default()
        };
        assert_eq!(style(700).weight_name(), "bold");
        assert_eq!(style(400).weight_name(), "regular");
        assert_eq!(style(100).weight_name(), "thin");
        assert_eq!(style(950).weight_name(), "black");
        assert_eq!(style(640).weight_name(), "semibold");
    }

    #[test]
    fn test_width_percent() {
        let condensed = FaceStyle {
            width: 3,
            ..FaceStyle::default()
        };
        assert_eq!(condensed.width_percent(), 75.0);
        assert_eq!(FaceStyle::default().width_percent(), 100.0);
    }

    #[test]
    fn test_format_kind_serializes_tagged() {
        let kind = FormatKind::Variable {
            weight_range: Some((100, 900)),
        };
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json["kind"], "variable");
        assert_eq!(json["weightRange"][1], 900);
    }

    #[test]
    fn test_file_format_from_extension() {
        assert_eq!(file_format(Path::new("/f/Helvetica.TTC")), "ttc");
        assert_eq!(file_format(Path::new("/f/noext")), "unknown");
    }
}
