//! Variation axes and named instances from `fvar`, plus `name` table lookups
//! for their labels.

use write_fonts::read::TableProvider;
use write_fonts::types::Tag;

use crate::error::SfntError;
use crate::sfnt::tags;

const HIDDEN_AXIS: u16 = 0x0001;
const WINDOWS_ENGLISH_US: u16 = 0x0409;

/// One `fvar` axis record, values in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct FvarAxis {
    pub tag: Tag,
    pub min: f32,
    pub default: f32,
    pub max: f32,
    pub hidden: bool,
    pub name_id: u16,
}

impl FvarAxis {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// One `fvar` named instance with a coordinate per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FvarInstance {
    pub subfamily_name_id: u16,
    pub coordinates: Vec<f32>,
}

/// Owned summary of `fvar`; empty for static fonts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FvarTable {
    pub axes: Vec<FvarAxis>,
    pub instances: Vec<FvarInstance>,
}

impl FvarTable {
    pub fn read<'a>(font: impl TableProvider<'a>) -> Result<Self, SfntError> {
        if font.data_for_tag(tags::FVAR).is_none() {
            return Ok(Self::default());
        }
        let malformed = |_| SfntError::Malformed(tags::FVAR);
        let fvar = font.fvar().map_err(malformed)?;

        let axes = fvar
            .axes()
            .map_err(malformed)?
            .iter()
            .map(|axis| FvarAxis {
                tag: axis.axis_tag(),
                min: axis.min_value().to_f64() as f32,
                default: axis.default_value().to_f64() as f32,
                max: axis.max_value().to_f64() as f32,
                hidden: axis.flags() & HIDDEN_AXIS != 0,
                name_id: axis.axis_name_id().to_u16(),
            })
            .collect();

        let instances = fvar
            .instances()
            .map_err(malformed)?
            .iter()
            .map(|record| {
                record.map(|instance| FvarInstance {
                    subfamily_name_id: instance.subfamily_name_id.to_u16(),
                    coordinates: instance
                        .coordinates
                        .iter()
                        .map(|value| value.get().to_f64() as f32)
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        Ok(Self { axes, instances })
    }

    pub fn axis(&self, tag: Tag) -> Option<&FvarAxis> {
        self.axes.iter().find(|axis| axis.tag == tag)
    }

    pub fn is_variable(&self) -> bool {
        !self.axes.is_empty()
    }
}

/// Best English string for a name ID: Windows en-US first, then any decodable
/// Unicode record.
pub fn find_name(face: &ttf_parser::Face<'_>, name_id: u16) -> Option<String> {
    let records = || face.names().into_iter().filter(move |n| n.name_id == name_id);
    records()
        .filter(|n| n.language_id == WINDOWS_ENGLISH_US)
        .find_map(|n| n.to_string())
        .or_else(|| records().find_map(|n| n.to_string()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFont;

    #[test]
    fn test_axes_and_instances() {
        let font = TestFont::new("Flex Sans", "Regular").variable().sfnt();
        let fvar = FvarTable::read(&font).unwrap();
        assert_eq!(fvar.axes.len(), 1);
        let wght = fvar.axis(Tag::new(b"wght")).unwrap();
        assert_eq!((wght.min, wght.default, wght.max), (100.0, 400.0, 900.0));
        assert!(!wght.hidden);
        assert_eq!(wght.name_id, 256);
        assert_eq!(wght.clamp(1200.0), 900.0);
        assert_eq!(fvar.instances.len(), 2);
        assert_eq!(fvar.instances[1].subfamily_name_id, 258);
        assert_eq!(fvar.instances[1].coordinates, vec![700.0]);
    }

    #[test]
    fn test_static_font_has_no_axes() {
        let font = TestFont::new("Test Sans", "Regular").sfnt();
        let fvar = FvarTable::read(&font).unwrap();
        assert!(!fvar.is_variable());
        assert!(fvar.instances.is_empty());
    }

    #[test]
    fn test_truncated_fvar_is_malformed() {
        let mut font = TestFont::new("Flex Sans", "Regular").variable().sfnt();
        let bytes = font.table(tags::FVAR).unwrap()[..12].to_vec();
        font.set_table(tags::FVAR, bytes);
        assert_eq!(
            FvarTable::read(&font),
            Err(SfntError::Malformed(tags::FVAR))
        );
    }

    #[test]
    fn test_find_name_prefers_english() {
        let data = TestFont::new("Test Sans", "Bold").build();
        let face = ttf_parser::Face::parse(&data, 0).unwrap();
        assert_eq!(find_name(&face, 1).as_deref(), Some("Test Sans"));
        assert_eq!(find_name(&face, 999), None);
    }
}
