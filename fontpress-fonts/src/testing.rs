//! Synthetic TrueType fonts for tests.
//!
//! Every font has four glyphs:
//! - 0 `.notdef`: a box
//! - 1 `A`: a triangle
//! - 2 `B` (and `Ж`): a square carrying TrueType instructions
//! - 3 `C`: a composite referencing `A`
//!
//! The variable variant adds a `wght` axis (100..400..900) with a `Bold`
//! named instance at 700; at `wght=900` every point of `A` moves right by 50.

use std::path::{Path, PathBuf};

use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::fvar::{AxisInstanceArrays, Fvar, InstanceRecord, VariationAxisRecord};
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::glyf::{
    Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, Glyph, Transform,
};
use write_fonts::tables::gvar::{GlyphDelta, GlyphDeltas, GlyphVariations, Gvar, Tent};
use write_fonts::tables::head::{Flags, Head, MacStyle};
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::{Hmtx, LongMetric};
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::{Os2, SelectionFlags};
use write_fonts::tables::post::Post;
use write_fonts::types::{
    F2Dot14, FWord, Fixed, GlyphId, GlyphId16, NameId, Tag, UfWord, Version16Dot16,
};

use crate::glyf::{GlyphTable, simple_glyph};
use crate::sfnt::{SfntFont, tags};

pub const GLYPH_NOTDEF: u16 = 0;
pub const GLYPH_A: u16 = 1;
pub const GLYPH_B: u16 = 2;
pub const GLYPH_C: u16 = 3;
pub const NUM_GLYPHS: u16 = 4;

/// Horizontal shift applied to `A` at the maximum `wght`.
pub const WGHT_MAX_X_DELTA: i16 = 50;

const ADVANCES: [u16; 4] = [500, 500, 550, 520];
const LEFT_SIDE_BEARINGS: [i16; 4] = [50, 0, 50, 20];
const B_INSTRUCTIONS: [u8; 4] = [0xB0, 0x00, 0x2C, 0x2D];
const WINDOWS_ENGLISH_US: u16 = 0x0409;

/// Builder for a small synthetic face.
#[derive(Debug, Clone)]
pub struct TestFont {
    family: String,
    subfamily: String,
    post_script_name: String,
    weight: u16,
    width: u16,
    italic: bool,
    variable: bool,
    fs_type: u16,
}

impl TestFont {
    /// A face named `{family}-{subfamily}` with spaces removed. The weight
    /// follows the subfamily (`Bold` is 700, anything else 400).
    pub fn new(family: &str, subfamily: &str) -> Self {
        let post_script_name = format!("{family}-{subfamily}").replace(' ', "");
        let lower = subfamily.to_ascii_lowercase();
        Self {
            family: family.to_string(),
            subfamily: subfamily.to_string(),
            post_script_name,
            weight: if lower.contains("bold") { 700 } else { 400 },
            width: 5,
            italic: lower.contains("italic"),
            variable: false,
            fs_type: 0,
        }
    }

    pub fn post_script_name(mut self, name: &str) -> Self {
        self.post_script_name = name.to_string();
        self
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn fs_type(mut self, fs_type: u16) -> Self {
        self.fs_type = fs_type;
        self
    }

    /// Add `fvar`/`gvar` with a single `wght` axis.
    pub fn variable(mut self) -> Self {
        self.variable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.post_script_name
    }

    /// Write `{PostScriptName}.ttf` into `dir`.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(format!("{}.ttf", self.post_script_name));
        std::fs::write(&path, self.build())?;
        Ok(path)
    }

    pub fn build(&self) -> Vec<u8> {
        self.sfnt().to_bytes()
    }

    /// The face as an editable table map.
    pub fn sfnt(&self) -> SfntFont {
        let mut font = SfntFont::new();
        self.compile(&mut font)
            .expect("synthetic font tables compile");
        font.set_table(tags::FPGM, vec![0xB0, 0x00, 0x2C, 0x2D]);
        font.set_table(tags::PREP, vec![0xB0, 0x01]);
        font.set_table(tags::CVT, vec![0, 10, 0, 20]);
        font
    }

    fn compile(&self, font: &mut SfntFont) -> Result<(), crate::error::SfntError> {
        font.set_typed(&self.head())?;
        glyphs().write_to(font)?;

        let cmap = Cmap::from_mappings([
            ('A', GlyphId::from(GLYPH_A)),
            ('B', GlyphId::from(GLYPH_B)),
            ('C', GlyphId::from(GLYPH_C)),
            ('Ж', GlyphId::from(GLYPH_B)),
        ])
        .expect("fixture cmap has no conflicts");
        font.set_typed(&cmap)?;
        font.set_typed(&hhea())?;
        font.set_typed(&maxp())?;
        font.set_typed(&self.os2())?;
        font.set_typed(&hmtx())?;
        font.set_typed(&self.name_table())?;
        font.set_typed(&post(self.italic))?;

        if self.variable {
            font.set_typed(&fvar())?;
            font.set_typed(&gvar())?;
        }
        Ok(())
    }

    fn head(&self) -> Head {
        let mut mac_style = MacStyle::empty();
        if self.weight >= 700 {
            mac_style |= MacStyle::BOLD;
        }
        if self.italic {
            mac_style |= MacStyle::ITALIC;
        }
        Head {
            font_revision: Fixed::from_f64(1.0),
            flags: Flags::from_bits_truncate(0x000B),
            units_per_em: 1000,
            x_min: 0,
            y_min: 0,
            x_max: 520,
            y_max: 700,
            mac_style,
            lowest_rec_ppem: 8,
            ..Default::default()
        }
    }

    fn os2(&self) -> Os2 {
        let mut fs_selection = SelectionFlags::empty();
        if self.italic {
            fs_selection |= SelectionFlags::ITALIC;
        }
        if self.weight >= 700 {
            fs_selection |= SelectionFlags::BOLD;
        }
        if fs_selection == SelectionFlags::empty() {
            fs_selection = SelectionFlags::REGULAR;
        }
        Os2 {
            x_avg_char_width: 500,
            us_weight_class: self.weight,
            us_width_class: self.width,
            fs_type: self.fs_type,
            y_subscript_x_size: 650,
            y_subscript_y_size: 600,
            y_subscript_y_offset: 75,
            y_superscript_x_size: 650,
            y_superscript_y_size: 600,
            y_superscript_y_offset: 350,
            y_strikeout_size: 50,
            y_strikeout_position: 250,
            ach_vend_id: Tag::new(b"NONE"),
            fs_selection,
            us_first_char_index: 'A' as u16,
            us_last_char_index: 'Ж' as u16,
            s_typo_ascender: 800,
            s_typo_descender: -200,
            us_win_ascent: 800,
            us_win_descent: 200,
            ul_code_page_range_1: Some(1),
            ul_code_page_range_2: Some(0),
            sx_height: Some(500),
            s_cap_height: Some(700),
            us_default_char: Some(0),
            us_break_char: Some(32),
            us_max_context: Some(1),
            ..Default::default()
        }
    }

    fn name_table(&self) -> Name {
        let full_name = format!("{} {}", self.family, self.subfamily);
        let mut records: Vec<(u16, String)> = vec![
            (0, "Copyright 2026 fontpress test fixtures".to_string()),
            (1, self.family.clone()),
            (2, self.subfamily.clone()),
            (4, full_name),
            (5, "Version 1.000".to_string()),
            (6, self.post_script_name.clone()),
            (13, "SIL Open Font License 1.1".to_string()),
        ];
        if self.variable {
            records.push((256, "Weight".to_string()));
            records.push((257, "Regular".to_string()));
            records.push((258, "Bold".to_string()));
        }
        Name::new(
            records
                .into_iter()
                .map(|(name_id, text)| {
                    NameRecord::new(3, 1, WINDOWS_ENGLISH_US, NameId::new(name_id), text.into())
                })
                .collect(),
        )
    }
}

fn square(min: i16, max: i16) -> Vec<CurvePoint> {
    vec![
        CurvePoint::on_curve(min, 0),
        CurvePoint::on_curve(min, 700),
        CurvePoint::on_curve(max, 700),
        CurvePoint::on_curve(max, 0),
    ]
}

fn triangle() -> Vec<CurvePoint> {
    vec![
        CurvePoint::on_curve(0, 0),
        CurvePoint::on_curve(250, 700),
        CurvePoint::on_curve(500, 0),
    ]
}

fn glyphs() -> GlyphTable {
    GlyphTable::from_glyphs(vec![
        simple_glyph(vec![square(50, 450)], Vec::new()),
        simple_glyph(vec![triangle()], Vec::new()),
        simple_glyph(vec![square(50, 450)], B_INSTRUCTIONS.to_vec()),
        composite_of_a(),
    ])
}

/// `C`: glyph `A` shifted right by 20 units.
fn composite_of_a() -> Glyph {
    let component = Component::new(
        GlyphId16::new(GLYPH_A),
        Anchor::Offset { x: 20, y: 0 },
        Transform::default(),
        ComponentFlags::default(),
    );
    let bbox = Bbox {
        x_min: 20,
        y_min: 0,
        x_max: 520,
        y_max: 700,
    };
    Glyph::Composite(CompositeGlyph::new(component, bbox))
}

fn hhea() -> Hhea {
    Hhea {
        ascender: FWord::new(800),
        descender: FWord::new(-200),
        advance_width_max: UfWord::new(550),
        x_max_extent: FWord::new(520),
        caret_slope_rise: 1,
        number_of_h_metrics: NUM_GLYPHS,
        ..Default::default()
    }
}

fn maxp() -> Maxp {
    Maxp {
        num_glyphs: NUM_GLYPHS,
        max_points: Some(4),
        max_contours: Some(1),
        max_composite_points: Some(3),
        max_composite_contours: Some(1),
        max_zones: Some(2),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(1),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(8),
        max_size_of_instructions: Some(4),
        max_component_elements: Some(1),
        max_component_depth: Some(1),
    }
}

fn hmtx() -> Hmtx {
    Hmtx {
        h_metrics: ADVANCES
            .iter()
            .zip(LEFT_SIDE_BEARINGS)
            .map(|(&advance, side_bearing)| LongMetric {
                advance,
                side_bearing,
            })
            .collect(),
        left_side_bearings: Vec::new(),
    }
}

fn post(italic: bool) -> Post {
    Post {
        version: Version16Dot16::VERSION_3_0,
        italic_angle: Fixed::from_f64(if italic { -12.0 } else { 0.0 }),
        underline_position: FWord::new(-100),
        underline_thickness: FWord::new(50),
        ..Default::default()
    }
}

fn fvar() -> Fvar {
    let wght = VariationAxisRecord::new(
        Tag::new(b"wght"),
        Fixed::from_f64(100.0),
        Fixed::from_f64(400.0),
        Fixed::from_f64(900.0),
        0,
        NameId::new(256),
    );
    let instances = [(257, 400.0), (258, 700.0)]
        .into_iter()
        .map(|(name_id, weight)| InstanceRecord {
            subfamily_name_id: NameId::new(name_id),
            flags: 0,
            coordinates: vec![Fixed::from_f64(weight)],
            post_script_name_id: None,
        })
        .collect();
    Fvar::new(AxisInstanceArrays::new(vec![wght], instances))
}

/// One peak tuple at `wght=1.0` moving the three points of `A` by +50 in x;
/// the four phantom points stay put.
fn gvar() -> Gvar {
    let mut deltas = vec![GlyphDelta::required(WGHT_MAX_X_DELTA, 0); 3];
    deltas.extend([GlyphDelta::required(0, 0); 4]);
    let a = GlyphDeltas::new(vec![Tent::new(F2Dot14::from_f32(1.0), None)], deltas);

    let variations = (0..NUM_GLYPHS)
        .map(|gid| {
            let tuples = if gid == GLYPH_A { vec![a.clone()] } else { Vec::new() };
            GlyphVariations::new(GlyphId::from(gid), tuples)
        })
        .collect();
    Gvar::new(variations, 1).expect("fixture gvar is consistent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_font_parses() {
        let bytes = TestFont::new("Test Sans", "Bold").build();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        assert_eq!(face.number_of_glyphs(), NUM_GLYPHS);
        assert_eq!(face.glyph_index('A').map(|g| g.0), Some(GLYPH_A));
        assert_eq!(face.glyph_index('Ж').map(|g| g.0), Some(GLYPH_B));
        assert_eq!(face.weight().to_number(), 700);
        assert!(!face.is_variable());
        assert_eq!(
            crate::fvar::find_name(&face, 6).as_deref(),
            Some("TestSans-Bold")
        );
    }

    #[test]
    fn test_composite_bounds_follow_offset() {
        let bytes = TestFont::new("Test Sans", "Regular").build();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        let bounds = face
            .glyph_bounding_box(ttf_parser::GlyphId(GLYPH_C))
            .unwrap();
        assert_eq!((bounds.x_min, bounds.x_max), (20, 520));
        assert!(face.glyph_index('D').is_none());
        assert_eq!(face.glyph_hor_advance(ttf_parser::GlyphId(GLYPH_NOTDEF)), Some(500));
    }

    #[test]
    fn test_variable_font_moves_a_at_max_weight() {
        let bytes = TestFont::new("Test Sans", "Regular").variable().build();
        let mut face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        assert!(face.is_variable());

        let default = face.glyph_bounding_box(ttf_parser::GlyphId(GLYPH_A)).unwrap();
        face.set_variation(ttf_parser::Tag::from_bytes(b"wght"), 900.0)
            .unwrap();
        let mut sink = Sink::default();
        face.outline_glyph(ttf_parser::GlyphId(GLYPH_A), &mut sink)
            .unwrap();
        assert_eq!(default.x_min, 0);
        assert_eq!(sink.min_x, f32::from(WGHT_MAX_X_DELTA));
    }

    #[derive(Default)]
    struct Sink {
        min_x: f32,
        started: bool,
    }

    impl Sink {
        fn point(&mut self, x: f32) {
            if !self.started || x < self.min_x {
                self.min_x = x;
                self.started = true;
            }
        }
    }

    impl ttf_parser::OutlineBuilder for Sink {
        fn move_to(&mut self, x: f32, _y: f32) {
            self.point(x);
        }
        fn line_to(&mut self, x: f32, _y: f32) {
            self.point(x);
        }
        fn quad_to(&mut self, _x1: f32, _y1: f32, x: f32, _y: f32) {
            self.point(x);
        }
        fn curve_to(&mut self, _x1: f32, _y1: f32, _x2: f32, _y2: f32, x: f32, _y: f32) {
            self.point(x);
        }
        fn close(&mut self) {}
    }
}
