//! Tool argument validation.
//!
//! Raw JSON arguments are deserialized strictly (unknown fields rejected) and
//! then checked for cross-field consistency, producing typed requests. Tool
//! handlers never see unvalidated JSON.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments: {0}")]
pub struct ArgumentError(pub String);

fn invalid(message: impl Into<String>) -> ArgumentError {
    ArgumentError(message.into())
}

/// Deserialize tool arguments, treating a missing object as `{}`.
fn parse<T: for<'de> Deserialize<'de>>(arguments: Option<&Value>) -> Result<T, ArgumentError> {
    let empty = Value::Object(Default::default());
    serde_json::from_value(arguments.unwrap_or(&empty).clone()).map_err(|e| invalid(e.to_string()))
}

fn non_empty(field: &str, value: String) -> Result<String, ArgumentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(format!("'{field}' must not be empty")));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// faces_for_family / font_overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacesForFamilyRequest {
    pub family: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFacesForFamily {
    family: String,
}

impl FacesForFamilyRequest {
    pub fn from_arguments(arguments: Option<&Value>) -> Result<Self, ArgumentError> {
        let raw: RawFacesForFamily = parse(arguments)?;
        Ok(Self {
            family: non_empty("family", raw.family)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontOverviewRequest {
    pub post_script_name: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawFontOverview {
    post_script_name: String,
}

impl FontOverviewRequest {
    pub fn from_arguments(arguments: Option<&Value>) -> Result<Self, ArgumentError> {
        let raw: RawFontOverview = parse(arguments)?;
        Ok(Self {
            post_script_name: non_empty("postScriptName", raw.post_script_name)?,
        })
    }
}

// ---------------------------------------------------------------------------
// publish_font
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetRequest {
    Text(String),
    Unicodes(Vec<String>),
    Ranges(Vec<String>),
    Language(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceRequest {
    Named(String),
    Axes(BTreeMap<String, f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub subset: Option<SubsetRequest>,
    pub instance: Option<InstanceRequest>,
    pub drop_hints: bool,
    pub retain_layout: bool,
}

/// Destination overrides; unset fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishOptions {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub cache_seconds: Option<u64>,
    #[serde(default)]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishFontRequest {
    pub post_script_name: String,
    pub convert: Option<ConvertRequest>,
    pub publish: PublishOptions,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConvert {
    #[serde(default)]
    subset_mode: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    unicodes: Option<Vec<String>>,
    #[serde(default)]
    ranges: Option<Vec<String>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    drop_hints: bool,
    #[serde(default)]
    retain_gsub_gpos: Option<bool>,
    #[serde(default)]
    target_axes: Option<BTreeMap<String, f32>>,
    #[serde(default)]
    named_instance: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPublishFont {
    #[serde(rename = "postScriptName")]
    post_script_name: String,
    #[serde(default)]
    convert: Option<RawConvert>,
    publish: PublishOptions,
}

impl PublishFontRequest {
    pub fn from_arguments(arguments: Option<&Value>) -> Result<Self, ArgumentError> {
        let raw: RawPublishFont = parse(arguments)?;
        let publish = validate_publish(raw.publish)?;
        Ok(Self {
            post_script_name: non_empty("postScriptName", raw.post_script_name)?,
            convert: raw.convert.map(validate_convert).transpose()?,
            publish,
        })
    }
}

fn validate_convert(raw: RawConvert) -> Result<ConvertRequest, ArgumentError> {
    let provided: Vec<&str> = [
        raw.text.as_ref().map(|_| "text"),
        raw.unicodes.as_ref().map(|_| "unicodes"),
        raw.ranges.as_ref().map(|_| "ranges"),
        raw.language.as_ref().map(|_| "language"),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mode = match (raw.subset_mode.as_deref(), provided.as_slice()) {
        (Some(mode), _) => Some(mode.trim().to_ascii_lowercase()),
        (None, []) => None,
        (None, [single]) => Some(single.to_string()),
        (None, _) => {
            return Err(invalid(format!(
                "several subset inputs given ({}); set 'subset_mode'",
                provided.join(", ")
            )));
        }
    };

    let subset = match mode.as_deref() {
        None | Some("none") => None,
        Some("text") => {
            let text = raw.text.unwrap_or_default();
            if text.is_empty() {
                return Err(invalid("subset_mode 'text' requires non-empty 'text'"));
            }
            Some(SubsetRequest::Text(text))
        }
        Some("unicodes") => match raw.unicodes {
            Some(values) if !values.is_empty() => Some(SubsetRequest::Unicodes(values)),
            _ => return Err(invalid("subset_mode 'unicodes' requires a non-empty 'unicodes' list")),
        },
        Some("ranges") => match raw.ranges {
            Some(values) if !values.is_empty() => Some(SubsetRequest::Ranges(values)),
            _ => return Err(invalid("subset_mode 'ranges' requires a non-empty 'ranges' list")),
        },
        Some("language") => Some(SubsetRequest::Language(non_empty(
            "language",
            raw.language.unwrap_or_default(),
        )?)),
        Some(other) => {
            return Err(invalid(format!(
                "unknown subset_mode '{other}' (expected text, unicodes, ranges or language)"
            )));
        }
    };

    let instance = match (raw.named_instance, raw.target_axes) {
        (Some(_), Some(_)) => {
            return Err(invalid("'named_instance' and 'target_axes' are mutually exclusive"));
        }
        (Some(name), None) => Some(InstanceRequest::Named(non_empty("named_instance", name)?)),
        (None, Some(axes)) if axes.is_empty() => None,
        (None, Some(axes)) => {
            if let Some((axis, value)) = axes.iter().find(|(_, v)| !v.is_finite()) {
                return Err(invalid(format!("axis '{axis}' has non-finite value {value}")));
            }
            Some(InstanceRequest::Axes(axes))
        }
        (None, None) => None,
    };

    Ok(ConvertRequest {
        subset,
        instance,
        drop_hints: raw.drop_hints,
        retain_layout: raw.retain_gsub_gpos.unwrap_or(true),
    })
}

fn validate_publish(mut publish: PublishOptions) -> Result<PublishOptions, ArgumentError> {
    if let Some(bucket) = publish.bucket.take() {
        publish.bucket = Some(non_empty("bucket", bucket)?);
    }
    if let Some(region) = publish.region.take() {
        publish.region = Some(non_empty("region", region)?);
    }
    if let Some(prefix) = &publish.prefix
        && prefix.split('/').any(|segment| segment == "..")
    {
        return Err(invalid("'prefix' must not contain '..' segments"));
    }
    Ok(publish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn publish(args: Value) -> Result<PublishFontRequest, ArgumentError> {
        PublishFontRequest::from_arguments(Some(&args))
    }

    #[test]
    fn test_minimal_publish() {
        let request = publish(json!({"postScriptName": "Helvetica-Bold", "publish": {}})).unwrap();
        assert_eq!(request.post_script_name, "Helvetica-Bold");
        assert!(request.convert.is_none());
        assert_eq!(request.publish, PublishOptions::default());
    }

    #[test]
    fn test_publish_requires_publish_object() {
        let err = publish(json!({"postScriptName": "X"})).unwrap_err();
        assert!(err.0.contains("publish"), "{err}");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(publish(json!({"postScriptName": "X", "publish": {"bukket": "a"}})).is_err());
        assert!(publish(json!({"postScriptName": "X", "publish": {}, "extra": 1})).is_err());
    }

    #[test]
    fn test_convert_text_subset_and_axes() {
        let request = publish(json!({
            "postScriptName": "Inter",
            "convert": {
                "subset_mode": "text",
                "text": "Hello",
                "target_axes": {"wght": 650},
                "retain_gsub_gpos": false,
                "drop_hints": true
            },
            "publish": {"bucket": "fonts", "cache_seconds": 60}
        }))
        .unwrap();
        let convert = request.convert.unwrap();
        assert_eq!(convert.subset, Some(SubsetRequest::Text("Hello".into())));
        assert_eq!(
            convert.instance,
            Some(InstanceRequest::Axes(BTreeMap::from([("wght".into(), 650.0)])))
        );
        assert!(!convert.retain_layout);
        assert!(convert.drop_hints);
        assert_eq!(request.publish.cache_seconds, Some(60));
    }

    #[test]
    fn test_subset_mode_inferred_from_single_input() {
        let request = publish(json!({
            "postScriptName": "Inter",
            "convert": {"language": "cyrillic"},
            "publish": {}
        }))
        .unwrap();
        assert_eq!(
            request.convert.unwrap().subset,
            Some(SubsetRequest::Language("cyrillic".into()))
        );
    }

    #[test]
    fn test_ambiguous_or_incomplete_subset_rejected() {
        let ambiguous = publish(json!({
            "postScriptName": "Inter",
            "convert": {"text": "a", "ranges": ["U+0000-00FF"]},
            "publish": {}
        }));
        assert!(ambiguous.unwrap_err().0.contains("subset_mode"));

        let missing = publish(json!({
            "postScriptName": "Inter",
            "convert": {"subset_mode": "unicodes"},
            "publish": {}
        }));
        assert!(missing.is_err());

        let unknown = publish(json!({
            "postScriptName": "Inter",
            "convert": {"subset_mode": "emoji"},
            "publish": {}
        }));
        assert!(unknown.unwrap_err().0.contains("emoji"));
    }

    #[test]
    fn test_instance_options_exclusive() {
        let err = publish(json!({
            "postScriptName": "Inter",
            "convert": {"named_instance": "Bold", "target_axes": {"wght": 700}},
            "publish": {}
        }))
        .unwrap_err();
        assert!(err.0.contains("mutually exclusive"));
    }

    #[test]
    fn test_prefix_traversal_rejected() {
        assert!(publish(json!({"postScriptName": "X", "publish": {"prefix": "a/../b"}})).is_err());
        assert!(publish(json!({"postScriptName": "X", "publish": {"bucket": "  "}})).is_err());
    }

    #[test]
    fn test_family_and_overview_arguments() {
        let family = FacesForFamilyRequest::from_arguments(Some(&json!({"family": " Helvetica "})))
            .unwrap();
        assert_eq!(family.family, "Helvetica");
        assert!(FacesForFamilyRequest::from_arguments(None).is_err());
        assert!(FontOverviewRequest::from_arguments(Some(&json!({"postScriptName": ""}))).is_err());
    }
}
