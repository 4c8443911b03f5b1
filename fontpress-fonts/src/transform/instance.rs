//! Static instancing of TrueType variable fonts.
//!
//! Outlines are evaluated at the requested location with `ttf-parser` and
//! re-encoded as plain simple glyphs (composites are flattened). Metrics
//! tables are rebuilt from the new outlines and every variation table is
//! dropped.

use std::collections::BTreeMap;

use ttf_parser::{GlyphId, OutlineBuilder};
use write_fonts::from_obj::ToOwnedTable;
use write_fonts::read::TableProvider;
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::glyf::{Bbox, Glyph};
use write_fonts::tables::head::Head;
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::{Hmtx, LongMetric};
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::os2::Os2;
use write_fonts::types::{FWord, Tag, UfWord};

use super::InstanceSpec;
use crate::error::SfntError;
use crate::fvar::{FvarTable, find_name};
use crate::glyf::{GlyphTable, simple_glyph};
use crate::sfnt::{SfntFont, tag_name, tags};

const VARIATION_TABLES: [Tag; 8] = [
    tags::FVAR,
    tags::GVAR,
    tags::AVAR,
    tags::CVAR,
    tags::HVAR,
    tags::VVAR,
    tags::MVAR,
    tags::STAT,
];

const WGHT: Tag = Tag::new(b"wght");
const WDTH: Tag = Tag::new(b"wdth");

pub(super) fn apply(
    font: &mut SfntFont,
    spec: &InstanceSpec,
    warnings: &mut Vec<String>,
) -> Result<Option<BTreeMap<String, f32>>, String> {
    if !font.has_table(tags::FVAR) {
        warnings.push("instance: font is not variable; instancing skipped".to_string());
        return Ok(None);
    }
    if font.has_table(tags::CFF2) {
        return Err("CFF2 variable outlines cannot be instanced".to_string());
    }
    if !font.has_table(tags::GLYF) {
        return Err("font has no TrueType outlines to instance".to_string());
    }
    let fvar = FvarTable::read(&*font).map_err(|e| e.to_string())?;

    let bytes = font.to_bytes();
    let mut face =
        ttf_parser::Face::parse(&bytes, 0).map_err(|e| format!("cannot parse font: {e}"))?;

    let location = resolve_location(&face, &fvar, spec, warnings)?;
    for (tag, value) in &location {
        face.set_variation(ttf_parser::Tag::from_bytes(&tag.to_be_bytes()), *value)
            .ok_or_else(|| format!("axis '{}' rejected by the variation engine", tag_name(*tag)))?;
    }

    if !font.has_table(tags::HVAR) {
        warnings.push(
            "instance: font has no HVAR table; advance widths kept from the default master"
                .to_string(),
        );
    }
    if has_gdef_variation_store(font) {
        warnings.push(
            "instance: GDEF variation store kept; layout positioning uses default master values"
                .to_string(),
        );
    }

    let num_glyphs = face.number_of_glyphs();
    let mut glyphs = Vec::with_capacity(num_glyphs as usize);
    let mut metrics = Metrics::default();
    for gid in 0..num_glyphs {
        let mut pen = GlyphPen::default();
        face.outline_glyph(GlyphId(gid), &mut pen);
        let contours = pen.finish().map_err(|reason| format!("glyph {gid}: {reason}"))?;
        let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        let glyph = simple_glyph(contours, Vec::new());
        metrics.add(advance, &glyph);
        glyphs.push(glyph);
    }
    drop(face);

    GlyphTable::from_glyphs(glyphs)
        .write_to(font)
        .map_err(|e| e.to_string())?;
    metrics
        .write_to(font, &location)
        .map_err(|e| e.to_string())?;
    for tag in VARIATION_TABLES {
        font.remove_table(tag);
    }

    let applied = location
        .into_iter()
        .map(|(tag, value)| (tag_name(tag), value))
        .collect();
    Ok(Some(applied))
}

/// A value for every axis: requested, clamped, or the axis default.
fn resolve_location(
    face: &ttf_parser::Face<'_>,
    fvar: &FvarTable,
    spec: &InstanceSpec,
    warnings: &mut Vec<String>,
) -> Result<Vec<(Tag, f32)>, String> {
    let mut location: Vec<(Tag, f32)> = fvar.axes.iter().map(|a| (a.tag, a.default)).collect();

    match spec {
        InstanceSpec::Named(name) => {
            let wanted = name.trim();
            let instance = fvar
                .instances
                .iter()
                .find(|instance| {
                    find_name(face, instance.subfamily_name_id)
                        .is_some_and(|n| n.eq_ignore_ascii_case(wanted))
                })
                .ok_or_else(|| {
                    let available: Vec<String> = fvar
                        .instances
                        .iter()
                        .filter_map(|i| find_name(face, i.subfamily_name_id))
                        .collect();
                    format!(
                        "unknown named instance '{wanted}' (available: {})",
                        available.join(", ")
                    )
                })?;
            for (slot, value) in location.iter_mut().zip(&instance.coordinates) {
                slot.1 = *value;
            }
        }
        InstanceSpec::Coordinates(values) => {
            for (key, value) in values {
                let position = fvar
                    .axes
                    .iter()
                    .position(|axis| {
                        tag_name(axis.tag) == key.trim()
                            || find_name(face, axis.name_id)
                                .is_some_and(|n| n.eq_ignore_ascii_case(key.trim()))
                    })
                    .ok_or_else(|| format!("unknown axis '{key}'"))?;
                let axis = &fvar.axes[position];
                let clamped = axis.clamp(*value);
                if clamped != *value {
                    warnings.push(format!(
                        "instance: {} value {} clamped to {}",
                        tag_name(axis.tag),
                        value,
                        clamped
                    ));
                }
                location[position].1 = clamped;
            }
        }
    }
    Ok(location)
}

/// GDEF 1.3 can carry an item variation store.
fn has_gdef_variation_store(font: &SfntFont) -> bool {
    font.gdef()
        .ok()
        .and_then(|gdef| gdef.item_var_store())
        .is_some()
}

/// OS/2 width class for a `wdth` percentage.
fn width_class(percent: f32) -> u16 {
    const STEPS: [(f32, u16); 9] = [
        (50.0, 1),
        (62.5, 2),
        (75.0, 3),
        (87.5, 4),
        (100.0, 5),
        (112.5, 6),
        (125.0, 7),
        (150.0, 8),
        (200.0, 9),
    ];
    STEPS
        .iter()
        .min_by(|a, b| (a.0 - percent).abs().total_cmp(&(b.0 - percent).abs()))
        .map_or(5, |(_, class)| *class)
}

// ---------------------------------------------------------------------------
// Outline capture
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GlyphPen {
    contours: Vec<Vec<CurvePoint>>,
    current: Vec<CurvePoint>,
    cubic: bool,
}

fn to_unit(v: f32) -> i16 {
    v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl GlyphPen {
    fn flush(&mut self) {
        if self.current.len() > 1 && self.current.first() == self.current.last() {
            self.current.pop();
        }
        if !self.current.is_empty() {
            self.contours.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> Result<Vec<Vec<CurvePoint>>, String> {
        if self.cubic {
            return Err("cubic outline segments cannot be stored in glyf".to_string());
        }
        self.flush();
        Ok(self.contours)
    }
}

impl OutlineBuilder for GlyphPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.flush();
        self.current.push(CurvePoint::on_curve(to_unit(x), to_unit(y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.current.push(CurvePoint::on_curve(to_unit(x), to_unit(y)));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.current.push(CurvePoint::off_curve(to_unit(x1), to_unit(y1)));
        self.current.push(CurvePoint::on_curve(to_unit(x), to_unit(y)));
    }

    fn curve_to(&mut self, _x1: f32, _y1: f32, _x2: f32, _y2: f32, _x: f32, _y: f32) {
        self.cubic = true;
    }

    fn close(&mut self) {
        self.flush();
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Metrics {
    h_metrics: Vec<LongMetric>,
    bounds: Option<Bbox>,
    advance_max: u16,
    min_lsb: Option<i16>,
    min_rsb: Option<i16>,
    max_extent: Option<i16>,
    max_points: u16,
    max_contours: u16,
}

impl Metrics {
    fn add(&mut self, advance: u16, glyph: &Glyph) {
        self.advance_max = self.advance_max.max(advance);
        let Glyph::Simple(simple) = glyph else {
            self.h_metrics.push(LongMetric {
                advance,
                side_bearing: 0,
            });
            return;
        };
        let bbox = simple.bbox;
        self.h_metrics.push(LongMetric {
            advance,
            side_bearing: bbox.x_min,
        });
        self.bounds = Some(self.bounds.map_or(bbox, |b| b.union(bbox)));
        let rsb = (advance as i32 - bbox.x_max as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        self.min_lsb = Some(self.min_lsb.map_or(bbox.x_min, |v| v.min(bbox.x_min)));
        self.min_rsb = Some(self.min_rsb.map_or(rsb, |v| v.min(rsb)));
        self.max_extent = Some(self.max_extent.map_or(bbox.x_max, |v| v.max(bbox.x_max)));
        let points: usize = simple.contours.iter().map(|c| c.len()).sum();
        self.max_points = self.max_points.max(points as u16);
        self.max_contours = self.max_contours.max(simple.contours.len() as u16);
    }

    /// Rewrite `hmtx` with one full metric per glyph and patch the summary
    /// fields of `hhea`, `head`, `maxp` and `OS/2`.
    fn write_to(&self, font: &mut SfntFont, location: &[(Tag, f32)]) -> Result<(), SfntError> {
        let (mut head, mut hhea, mut maxp, os2) = {
            let reader: &SfntFont = font;
            let head: Head = reader.head()?.to_owned_table();
            let hhea: Hhea = reader.hhea()?.to_owned_table();
            let maxp: Maxp = reader.maxp()?.to_owned_table();
            let os2: Option<Os2> = reader.os2().ok().map(|os2| os2.to_owned_table());
            (head, hhea, maxp, os2)
        };

        font.set_typed(&Hmtx {
            h_metrics: self.h_metrics.clone(),
            left_side_bearings: Vec::new(),
        })?;

        hhea.advance_width_max = UfWord::new(self.advance_max);
        hhea.min_left_side_bearing = FWord::new(self.min_lsb.unwrap_or(0));
        hhea.min_right_side_bearing = FWord::new(self.min_rsb.unwrap_or(0));
        hhea.x_max_extent = FWord::new(self.max_extent.unwrap_or(0));
        hhea.number_of_h_metrics = self.h_metrics.len() as u16;
        font.set_typed(&hhea)?;

        let bounds = self.bounds.unwrap_or_default();
        head.x_min = bounds.x_min;
        head.y_min = bounds.y_min;
        head.x_max = bounds.x_max;
        head.y_max = bounds.y_max;
        font.set_typed(&head)?;

        if maxp.max_points.is_some() {
            maxp.max_points = Some(self.max_points);
            maxp.max_contours = Some(self.max_contours);
            // Composites were flattened.
            maxp.max_composite_points = Some(0);
            maxp.max_composite_contours = Some(0);
            maxp.max_component_elements = Some(0);
            maxp.max_component_depth = Some(0);
            font.set_typed(&maxp)?;
        }

        if let Some(mut os2) = os2 {
            if let Some((_, weight)) = location.iter().find(|(tag, _)| *tag == WGHT) {
                os2.us_weight_class = weight.round().clamp(1.0, 1000.0) as u16;
            }
            if let Some((_, width)) = location.iter().find(|(tag, _)| *tag == WDTH) {
                os2.us_width_class = width_class(*width);
            }
            font.set_typed(&os2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GLYPH_A, GLYPH_C, TestFont, WGHT_MAX_X_DELTA};

    fn instance(font: &mut SfntFont, spec: InstanceSpec) -> (Vec<String>, BTreeMap<String, f32>) {
        let mut warnings = Vec::new();
        let applied = apply(font, &spec, &mut warnings).unwrap().unwrap();
        (warnings, applied)
    }

    fn coords(pairs: &[(&str, f32)]) -> InstanceSpec {
        InstanceSpec::Coordinates(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    fn x_min(font: &SfntFont, gid: u16) -> i16 {
        let bytes = font.to_bytes();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        face.glyph_bounding_box(GlyphId(gid)).unwrap().x_min
    }

    #[test]
    fn test_instance_at_max_weight_moves_outline() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let (warnings, applied) = instance(&mut font, coords(&[("wght", 900.0)]));
        assert_eq!(applied.get("wght"), Some(&900.0));
        assert!(warnings.iter().any(|w| w.contains("HVAR")));
        assert_eq!(x_min(&font, GLYPH_A), WGHT_MAX_X_DELTA);
        // The flattened composite carries the component's variation too.
        assert_eq!(x_min(&font, GLYPH_C), 20 + WGHT_MAX_X_DELTA);

        for tag in VARIATION_TABLES {
            assert!(!font.has_table(tag));
        }
        let reader = &font;
        assert_eq!(reader.os2().unwrap().us_weight_class(), 900);
        assert_eq!(reader.head().unwrap().x_max(), 520 + WGHT_MAX_X_DELTA);
        assert_eq!(reader.hhea().unwrap().number_of_h_metrics(), crate::testing::NUM_GLYPHS);
        assert_eq!(reader.maxp().unwrap().max_component_elements(), Some(0));
    }

    #[test]
    fn test_named_instance_by_name() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let (_, applied) = instance(&mut font, InstanceSpec::Named("BOLD".into()));
        assert_eq!(applied.get("wght"), Some(&700.0));
    }

    #[test]
    fn test_axis_by_name_and_clamping() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let (warnings, applied) = instance(&mut font, coords(&[("Weight", 1500.0)]));
        assert_eq!(applied.get("wght"), Some(&900.0));
        assert!(warnings.iter().any(|w| w.contains("clamped")));
    }

    #[test]
    fn test_unspecified_axes_pin_to_default() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let (_, applied) = instance(&mut font, coords(&[]));
        assert_eq!(applied.get("wght"), Some(&400.0));
        assert_eq!(x_min(&font, GLYPH_A), 0);
    }

    #[test]
    fn test_unknown_axis_and_instance_are_errors() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        let mut warnings = Vec::new();
        let err = apply(&mut font, &coords(&[("slnt", 5.0)]), &mut warnings).unwrap_err();
        assert!(err.contains("unknown axis"));
        let err = apply(&mut font, &InstanceSpec::Named("Hairline".into()), &mut warnings)
            .unwrap_err();
        assert!(err.contains("Bold"));
    }

    #[test]
    fn test_static_font_is_warning() {
        let mut font = TestFont::new("Test Sans", "Regular").sfnt();
        let before = font.clone();
        let mut warnings = Vec::new();
        let applied = apply(&mut font, &coords(&[("wght", 700.0)]), &mut warnings).unwrap();
        assert!(applied.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(font, before);
    }

    #[test]
    fn test_cff2_is_error() {
        let mut font = TestFont::new("Test Sans", "Regular").variable().sfnt();
        font.set_table(tags::CFF2, vec![2, 0, 5, 0, 0]);
        let mut warnings = Vec::new();
        let err = apply(&mut font, &coords(&[]), &mut warnings).unwrap_err();
        assert!(err.contains("CFF2"));
    }

    #[test]
    fn test_width_class_mapping() {
        assert_eq!(width_class(100.0), 5);
        assert_eq!(width_class(75.0), 3);
        assert_eq!(width_class(130.0), 7);
    }
}
