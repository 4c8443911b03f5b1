//! `@font-face` rule and HTML preview for a published face.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use fontpress_fonts::{FaceRecord, FaceStyle, FormatKind, WebFontFormat};
use fontpress_store::UploadResult;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("uploaded object has no URL")]
    EmptyUrl,
    #[error("face has no family name")]
    EmptyFamily,
}

/// Generated snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub css: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactGenerator {
    font_display: String,
    sample_text: String,
}

impl ArtifactGenerator {
    pub fn new(font_display: impl Into<String>, sample_text: impl Into<String>) -> Self {
        Self {
            font_display: font_display.into(),
            sample_text: sample_text.into(),
        }
    }

    /// Build the rule and preview. `instance` holds the axis location a
    /// variable face was pinned at; `sample` overrides the preview line.
    pub fn generate(
        &self,
        upload: &UploadResult,
        face: &FaceRecord,
        instance: Option<&BTreeMap<String, f32>>,
        sample: Option<&str>,
    ) -> Result<Artifacts, GenerateError> {
        if upload.url.trim().is_empty() {
            return Err(GenerateError::EmptyUrl);
        }
        if face.family.trim().is_empty() {
            return Err(GenerateError::EmptyFamily);
        }

        let descriptors = Descriptors::for_face(face, instance);
        let css = self.font_face_rule(&upload.url, &face.family, &descriptors);
        let sample = sample
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.sample_text);
        let html = preview_document(&css, face, &descriptors, sample);
        Ok(Artifacts { css, html })
    }

    fn font_face_rule(&self, url: &str, family: &str, d: &Descriptors) -> String {
        let format = WebFontFormat::Woff2.css_format();
        let mut css = String::new();
        let _ = writeln!(css, "@font-face {{");
        let _ = writeln!(css, "  font-family: {};", css_string(family));
        let _ = writeln!(css, "  src: url({}) format(\"{format}\");", css_string(url));
        let _ = writeln!(css, "  font-weight: {};", d.weight);
        let _ = writeln!(css, "  font-style: {};", d.style);
        let _ = writeln!(css, "  font-stretch: {};", d.stretch);
        let _ = writeln!(css, "  font-display: {};", self.font_display);
        css.push('}');
        css
    }
}

/// CSS descriptor values for one face.
struct Descriptors {
    weight: String,
    /// Single weight for the preview's inline style.
    sample_weight: String,
    style: &'static str,
    stretch: String,
}

impl Descriptors {
    fn for_face(face: &FaceRecord, instance: Option<&BTreeMap<String, f32>>) -> Self {
        let style = face.style.css_style();
        if let Some(coords) = instance {
            let weight = coords
                .get("wght")
                .map(|w| format_number(*w))
                .unwrap_or_else(|| face.style.weight.to_string());
            let stretch = coords
                .get("wdth")
                .map(|w| format!("{}%", format_number(*w)))
                .unwrap_or_else(|| stretch_percent(&face.style));
            return Self {
                sample_weight: weight.clone(),
                weight,
                style,
                stretch,
            };
        }

        let weight = match face.format {
            FormatKind::Variable {
                weight_range: Some((min, max)),
            } if min < max => format!("{min} {max}"),
            _ => face.style.weight.to_string(),
        };
        Self {
            weight,
            sample_weight: face.style.weight.to_string(),
            style,
            stretch: stretch_percent(&face.style),
        }
    }
}

fn stretch_percent(style: &FaceStyle) -> String {
    format!("{}%", format_number(style.width_percent()))
}

/// `700` rather than `700.0`, `62.5` kept as is.
fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn preview_document(css: &str, face: &FaceRecord, d: &Descriptors, sample: &str) -> String {
    let title = format!("{} {}", face.family, face.style_label());
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"en\">");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{}</title>", escape_html(&title));
    let _ = writeln!(html, "<style>");
    let _ = writeln!(html, "{css}");
    let _ = writeln!(
        html,
        ".sample {{ font-family: {}, sans-serif; font-weight: {}; font-style: {}; font-size: 48px; }}",
        css_string(&face.family),
        d.sample_weight,
        d.style
    );
    let _ = writeln!(html, "</style>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<p class=\"sample\">{}</p>", escape_html(sample));
    let _ = writeln!(html, "</body>");
    html.push_str("</html>\n");
    html
}

/// Double-quoted CSS string. `<` is escaped so the value cannot close the
/// surrounding `<style>` element.
fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '<' => out.push_str("\\3c "),
            '\n' => out.push_str("\\a "),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn face(family: &str, weight: u16, format: FormatKind) -> FaceRecord {
        FaceRecord {
            post_script_name: "Helvetica-Bold".to_string(),
            family: family.to_string(),
            subfamily: Some("Bold".to_string()),
            style: FaceStyle {
                weight,
                width: 5,
                italic: false,
            },
            path: PathBuf::from("/fonts/Helvetica.ttc"),
            face_index: 1,
            format,
            file_format: "ttc".to_string(),
            last_verified: Utc::now(),
        }
    }

    fn upload(url: &str) -> UploadResult {
        UploadResult {
            key: "fonts/abc.woff2".to_string(),
            url: url.to_string(),
            sha256: "abc".to_string(),
            size: 1024,
            skipped: false,
            attempts: 1,
        }
    }

    fn generator() -> ArtifactGenerator {
        ArtifactGenerator::new("swap", "Sphinx of black quartz")
    }

    #[test]
    fn test_static_face_rule() {
        let artifacts = generator()
            .generate(
                &upload("https://cdn.example.com/fonts/abc.woff2"),
                &face("Helvetica", 700, FormatKind::Static),
                None,
                None,
            )
            .unwrap();
        assert!(artifacts.css.starts_with("@font-face {"));
        assert!(artifacts.css.contains("font-family: \"Helvetica\";"));
        assert!(artifacts.css.contains(
            "src: url(\"https://cdn.example.com/fonts/abc.woff2\") format(\"woff2\");"
        ));
        assert!(artifacts.css.contains("font-weight: 700;"));
        assert!(artifacts.css.contains("font-style: normal;"));
        assert!(artifacts.css.contains("font-stretch: 100%;"));
        assert!(artifacts.css.contains("font-display: swap;"));
        assert!(artifacts.html.contains(&artifacts.css));
        assert!(artifacts.html.contains("Sphinx of black quartz"));
        assert!(artifacts.html.contains("<title>Helvetica Bold</title>"));
    }

    #[test]
    fn test_variable_face_weight_range() {
        let css = generator()
            .generate(
                &upload("https://x/abc.woff2"),
                &face(
                    "Flex",
                    400,
                    FormatKind::Variable {
                        weight_range: Some((100, 900)),
                    },
                ),
                None,
                None,
            )
            .unwrap()
            .css;
        assert!(css.contains("font-weight: 100 900;"));
    }

    #[test]
    fn test_instanced_face_uses_pinned_coordinates() {
        let coords = BTreeMap::from([("wght".to_string(), 650.0), ("wdth".to_string(), 87.5)]);
        let css = generator()
            .generate(
                &upload("https://x/abc.woff2"),
                &face(
                    "Flex",
                    400,
                    FormatKind::Variable {
                        weight_range: Some((100, 900)),
                    },
                ),
                Some(&coords),
                None,
            )
            .unwrap()
            .css;
        assert!(css.contains("font-weight: 650;"));
        assert!(css.contains("font-stretch: 87.5%;"));
    }

    #[test]
    fn test_sample_and_names_are_escaped() {
        let html = generator()
            .generate(
                &upload("https://x/abc.woff2"),
                &face("Evil</style>\"Font", 400, FormatKind::Static),
                None,
                Some("<b>&</b>"),
            )
            .unwrap()
            .html;
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!html.contains("Evil</style>"));
        assert!(html.contains("Evil\\3c /style>\\\"Font"));
    }

    #[test]
    fn test_malformed_input_rejected() {
        let g = generator();
        assert_eq!(
            g.generate(&upload(" "), &face("Helvetica", 700, FormatKind::Static), None, None),
            Err(GenerateError::EmptyUrl)
        );
        assert_eq!(
            g.generate(&upload("https://x/a.woff2"), &face("", 700, FormatKind::Static), None, None),
            Err(GenerateError::EmptyFamily)
        );
    }
}
