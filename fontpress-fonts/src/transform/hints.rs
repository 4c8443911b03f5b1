//! TrueType hint removal.

use write_fonts::from_obj::ToOwnedTable;
use write_fonts::read::TableProvider;
use write_fonts::tables::maxp::Maxp;

use crate::glyf::{GlyphTable, strip_instructions};
use crate::sfnt::{SfntFont, tags};

pub(super) fn apply(font: &mut SfntFont, warnings: &mut Vec<String>) -> Result<(), String> {
    if !font.has_table(tags::GLYF) {
        warnings.push("drop_hints: hint removal is not supported for CFF outlines; hints kept".to_string());
        return Ok(());
    }

    let mut glyphs = GlyphTable::from_font(font).map_err(|e| e.to_string())?;
    let mut stripped = 0usize;
    for gid in 0..glyphs.len() as u16 {
        let without = strip_instructions(glyphs.glyph(gid));
        if &without != glyphs.glyph(gid) {
            stripped += 1;
            glyphs.set_glyph(gid, without);
        }
    }
    glyphs.write_to(font).map_err(|e| e.to_string())?;

    for tag in [
        tags::FPGM,
        tags::PREP,
        tags::CVT,
        tags::CVAR,
        tags::HDMX,
        tags::LTSH,
        tags::VDMX,
    ] {
        font.remove_table(tag);
    }

    let mut maxp: Maxp = {
        let reader: &SfntFont = font;
        reader.maxp().map_err(|e| e.to_string())?.to_owned_table()
    };
    // Version 1.0 only; the 0.5 header has no program limits.
    if maxp.max_zones.is_some() {
        maxp.max_zones = Some(1);
        maxp.max_twilight_points = Some(0);
        maxp.max_storage = Some(0);
        maxp.max_function_defs = Some(0);
        maxp.max_instruction_defs = Some(0);
        maxp.max_stack_elements = Some(0);
        maxp.max_size_of_instructions = Some(0);
        font.set_typed(&maxp).map_err(|e| e.to_string())?;
    }
    log::debug!("Dropped hints from {} glyphs", stripped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GLYPH_A, GLYPH_B, GLYPH_C, TestFont};
    use write_fonts::tables::glyf::Glyph;

    #[test]
    fn test_hints_removed() {
        let mut font = TestFont::new("Test Sans", "Regular").sfnt();
        let before = GlyphTable::from_font(&font).unwrap();
        let mut warnings = Vec::new();
        apply(&mut font, &mut warnings).unwrap();
        assert!(warnings.is_empty());

        for tag in [tags::FPGM, tags::PREP, tags::CVT] {
            assert!(!font.has_table(tag));
        }
        let after = GlyphTable::from_font(&font).unwrap();
        assert!(matches!(before.glyph(GLYPH_B), Glyph::Simple(g) if !g.instructions.is_empty()));
        assert!(matches!(after.glyph(GLYPH_B), Glyph::Simple(g) if g.instructions.is_empty()));
        assert_eq!(after.glyph(GLYPH_A), before.glyph(GLYPH_A));
        assert_eq!(after.glyph(GLYPH_C), before.glyph(GLYPH_C));

        let maxp = (&font).maxp().unwrap();
        assert_eq!(maxp.max_size_of_instructions(), Some(0));
        assert_eq!(maxp.max_function_defs(), Some(0));
        assert_eq!(maxp.max_zones(), Some(1));

        // Still a valid font.
        let bytes = font.to_bytes();
        let face = ttf_parser::Face::parse(&bytes, 0).unwrap();
        assert!(face.glyph_bounding_box(ttf_parser::GlyphId(GLYPH_C)).is_some());
    }

    #[test]
    fn test_cff_gets_warning() {
        let mut font = TestFont::new("Test Sans", "Regular").sfnt();
        font.remove_table(tags::GLYF);
        font.remove_table(tags::LOCA);
        font.set_table(tags::CFF, vec![1, 0, 4, 1]);
        let mut warnings = Vec::new();
        apply(&mut font, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(font.has_table(tags::FPGM));
    }
}
