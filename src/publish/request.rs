//! Validated tool arguments to core publish requests.

use fontpress_config::PublishDefaults;
use fontpress_fonts::{InstanceSpec, SubsetSpec, TransformSpec};
use fontpress_mcp::{ConvertRequest, InstanceRequest, PublishFontRequest, SubsetRequest};
use fontpress_store::Destination;

use super::PublishError;

/// A publish ready for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub post_script_name: String,
    pub transform: TransformSpec,
    pub destination: Destination,
}

impl PublishRequest {
    /// Coalescing key: identical face, transform and destination.
    pub(crate) fn flight_key(&self) -> String {
        format!(
            "{}|{:?}|{:?}",
            self.post_script_name, self.transform, self.destination
        )
    }
}

/// Fill unset destination fields from the configured defaults.
pub fn build_request(
    request: PublishFontRequest,
    defaults: &PublishDefaults,
) -> Result<PublishRequest, PublishError> {
    let options = request.publish;
    let bucket = options
        .bucket
        .or_else(|| defaults.bucket.clone())
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| {
            PublishError::arguments(
                "no bucket given and publish.bucket is not configured",
            )
        })?;

    let cache_seconds = options.cache_seconds.unwrap_or(defaults.cache_seconds);
    let destination = Destination {
        bucket,
        prefix: options
            .prefix
            .unwrap_or_else(|| defaults.prefix.clone())
            .trim_matches('/')
            .to_string(),
        region: options.region.unwrap_or_else(|| defaults.region.clone()),
        public: options.public.unwrap_or(defaults.public),
        cache_seconds: (cache_seconds > 0).then_some(cache_seconds),
        overwrite: options.overwrite.unwrap_or(defaults.overwrite),
    };

    Ok(PublishRequest {
        post_script_name: request.post_script_name,
        transform: request.convert.map(transform_spec).unwrap_or_default(),
        destination,
    })
}

fn transform_spec(convert: ConvertRequest) -> TransformSpec {
    TransformSpec {
        subset: convert.subset.map(|subset| match subset {
            SubsetRequest::Text(text) => SubsetSpec::Text(text),
            SubsetRequest::Unicodes(values) => SubsetSpec::Unicodes(values),
            SubsetRequest::Ranges(values) => SubsetSpec::Ranges(values),
            SubsetRequest::Language(tag) => SubsetSpec::Language(tag),
        }),
        instance: convert.instance.map(|instance| match instance {
            InstanceRequest::Named(name) => InstanceSpec::Named(name),
            InstanceRequest::Axes(axes) => InstanceSpec::Coordinates(axes),
        }),
        drop_hints: convert.drop_hints,
        retain_layout: convert.retain_layout,
    }
}
