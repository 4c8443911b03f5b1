//! TrueType outlines as `write-fonts` glyphs: loading from `glyf`/`loca`,
//! composite closure, instruction removal and rebuilding the table pair.

use write_fonts::from_obj::ToOwnedTable;
use write_fonts::read::TableProvider;
use write_fonts::read::tables::glyf::CurvePoint;
use write_fonts::tables::glyf::{
    Bbox, CompositeGlyph, Contour, GlyfLocaBuilder, Glyph, SimpleGlyph,
};
use write_fonts::tables::head::Head;
use write_fonts::types::GlyphId;

use crate::error::SfntError;
use crate::sfnt::{SfntFont, tags};

/// Every glyph of a TrueType font, indexed by glyph ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    glyphs: Vec<Glyph>,
}

impl GlyphTable {
    pub fn from_glyphs(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    /// Decode every glyph listed in `loca`; the offset width comes from `head`.
    pub fn from_font(font: &SfntFont) -> Result<Self, SfntError> {
        let glyf = font.glyf()?;
        let loca = font.loca(None::<bool>)?;
        let num_glyphs = font.num_glyphs()?;

        let mut glyphs = Vec::with_capacity(num_glyphs as usize);
        for gid in 0..num_glyphs {
            let glyph = loca
                .get_glyf(GlyphId::from(gid), &glyf)
                .map_err(|_| SfntError::Malformed(tags::GLYF))?
                .map_or(Glyph::Empty, |raw| raw.to_owned_table());
            glyphs.push(glyph);
        }
        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph(&self, gid: u16) -> &Glyph {
        self.glyphs.get(gid as usize).unwrap_or(&Glyph::Empty)
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> + '_ {
        self.glyphs.iter()
    }

    pub fn set_glyph(&mut self, gid: u16, glyph: Glyph) {
        if let Some(slot) = self.glyphs.get_mut(gid as usize) {
            *slot = glyph;
        }
    }

    pub fn clear_glyph(&mut self, gid: u16) {
        self.set_glyph(gid, Glyph::Empty);
    }

    /// Compile `glyf` and `loca` into the font and record the chosen offset
    /// width in `head`.
    pub fn write_to(&self, font: &mut SfntFont) -> Result<(), SfntError> {
        let mut builder = GlyfLocaBuilder::new();
        for glyph in &self.glyphs {
            builder.add_glyph(glyph).map_err(|e| SfntError::Write {
                tag: tags::GLYF,
                reason: e.to_string(),
            })?;
        }
        let (glyf, loca, format) = builder.build();

        let mut head: Head = {
            let reader: &SfntFont = font;
            reader.head()?.to_owned_table()
        };
        head.index_to_loc_format = format as i16;

        font.set_typed(&glyf)?;
        font.set_typed(&loca)?;
        font.set_typed(&head)
    }
}

/// Glyph IDs referenced by a composite glyph; empty for simple glyphs.
pub fn components(glyph: &Glyph) -> Vec<u16> {
    match glyph {
        Glyph::Composite(composite) => composite
            .components()
            .iter()
            .map(|component| component.glyph.to_u16())
            .collect(),
        _ => Vec::new(),
    }
}

/// The glyph without TrueType instructions.
///
/// Composites are rebuilt from their components, which drops any trailing
/// instruction block while keeping offsets, transforms and the bounding box.
pub fn strip_instructions(glyph: &Glyph) -> Glyph {
    match glyph {
        Glyph::Empty => Glyph::Empty,
        Glyph::Simple(simple) => Glyph::Simple(SimpleGlyph {
            instructions: Vec::new(),
            ..simple.clone()
        }),
        Glyph::Composite(composite) => {
            let bbox = composite.bbox;
            CompositeGlyph::try_from_iter(composite.components().iter().cloned().map(|c| (c, bbox)))
                .map_or_else(|_| glyph.clone(), Glyph::Composite)
        }
    }
}

/// A simple glyph from closed contours. Empty contours are skipped; no points
/// at all gives an empty glyph.
pub fn simple_glyph(contours: Vec<Vec<CurvePoint>>, instructions: Vec<u8>) -> Glyph {
    let contours: Vec<Contour> = contours
        .into_iter()
        .filter(|points| !points.is_empty())
        .map(Contour::from)
        .collect();
    if contours.is_empty() {
        return Glyph::Empty;
    }
    let mut glyph = SimpleGlyph {
        bbox: Bbox::default(),
        contours,
        instructions,
    };
    glyph.recompute_bounding_box();
    Glyph::Simple(glyph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GLYPH_A, GLYPH_B, GLYPH_C, TestFont};
    use write_fonts::read::{FontData, FontRead};

    fn triangle() -> Vec<Vec<CurvePoint>> {
        vec![vec![
            CurvePoint::on_curve(0, 0),
            CurvePoint::on_curve(250, 700),
            CurvePoint::on_curve(500, 0),
        ]]
    }

    /// A raw composite record referencing glyph 1 at (20, 0), optionally
    /// followed by a two byte instruction block.
    fn raw_composite(instructions: bool) -> Vec<u8> {
        // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES
        let mut flags: u16 = 0x0003;
        if instructions {
            flags |= 0x0100;
        }
        let mut out = Vec::new();
        out.extend_from_slice(&(-1i16).to_be_bytes());
        for v in [20i16, 0, 520, 700] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&20i16.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        if instructions {
            out.extend_from_slice(&2u16.to_be_bytes());
            out.extend_from_slice(&[0xB0, 0x00]);
        }
        out
    }

    fn read_composite(bytes: &[u8]) -> Glyph {
        Glyph::Composite(CompositeGlyph::read(FontData::new(bytes)).unwrap())
    }

    #[test]
    fn test_simple_glyph_bounds() {
        let glyph = simple_glyph(triangle(), Vec::new());
        assert_eq!(
            glyph.bbox(),
            Some(Bbox {
                x_min: 0,
                y_min: 0,
                x_max: 500,
                y_max: 700
            })
        );
        assert!(components(&glyph).is_empty());
    }

    #[test]
    fn test_empty_contours_give_empty_glyph() {
        assert_eq!(simple_glyph(Vec::new(), Vec::new()), Glyph::Empty);
        assert_eq!(simple_glyph(vec![Vec::new()], Vec::new()), Glyph::Empty);
    }

    #[test]
    fn test_strip_simple_instructions() {
        let glyph = simple_glyph(triangle(), vec![0xB0, 0x01, 0x2C]);
        assert_eq!(
            strip_instructions(&glyph),
            simple_glyph(triangle(), Vec::new())
        );
    }

    #[test]
    fn test_composite_components_and_strip() {
        let with = read_composite(&raw_composite(true));
        assert_eq!(components(&with), vec![1]);
        assert_ne!(with, read_composite(&raw_composite(false)));

        let stripped = strip_instructions(&with);
        assert_eq!(stripped, read_composite(&raw_composite(false)));
        assert_eq!(stripped.bbox(), with.bbox());
    }

    #[test]
    fn test_font_glyphs_round_trip() {
        let mut font = TestFont::new("Test Sans", "Regular").sfnt();
        let table = GlyphTable::from_font(&font).unwrap();
        assert_eq!(table.len(), crate::testing::NUM_GLYPHS as usize);
        assert_eq!(components(table.glyph(GLYPH_C)), vec![GLYPH_A]);
        assert!(matches!(table.glyph(GLYPH_B), Glyph::Simple(g) if !g.instructions.is_empty()));

        let mut edited = table.clone();
        edited.clear_glyph(GLYPH_B);
        edited.write_to(&mut font).unwrap();
        let reread = GlyphTable::from_font(&font).unwrap();
        assert_eq!(reread.glyph(GLYPH_B), &Glyph::Empty);
        assert_eq!(reread.glyph(GLYPH_A), table.glyph(GLYPH_A));
        assert_eq!(reread.len(), table.len());
    }

    #[test]
    fn test_out_of_range_glyph_is_empty() {
        let table = GlyphTable::from_glyphs(vec![Glyph::Empty]);
        assert_eq!(table.glyph(40), &Glyph::Empty);
    }
}
