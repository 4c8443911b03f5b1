//! Glyph-ID-preserving subsetting.

use std::collections::{BTreeMap, BTreeSet};

use write_fonts::from_obj::ToOwnedTable;
use write_fonts::read::TableProvider;
use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::os2::Os2;
use write_fonts::types::GlyphId;

use super::SubsetSpec;
use crate::glyf::{GlyphTable, components};
use crate::sfnt::{SfntFont, tags};

pub(super) fn apply(
    font: &mut SfntFont,
    spec: &SubsetSpec,
    retain_layout: bool,
    warnings: &mut Vec<String>,
) -> Result<(), String> {
    let wanted = spec.codepoints()?;
    if wanted.is_empty() {
        return Err("subset request selects no code points".to_string());
    }

    let mapping: BTreeMap<u32, u16> = {
        let reader: &SfntFont = font;
        let cmap = reader.cmap().map_err(|e| format!("cannot read cmap: {e}"))?;
        wanted
            .iter()
            .filter_map(|cp| {
                let gid = u16::try_from(cmap.map_codepoint(*cp)?.to_u32()).ok()?;
                (gid != 0).then_some((*cp, gid))
            })
            .collect()
    };
    if mapping.is_empty() {
        return Err("none of the requested code points are present in the font".to_string());
    }
    let missing = wanted.len() - mapping.len();
    if missing > 0 {
        log::debug!("Subset: {} requested code points have no glyph", missing);
    }

    if font.has_table(tags::GLYF) {
        let mut glyphs = GlyphTable::from_font(font).map_err(|e| e.to_string())?;
        let keep = glyph_closure(&glyphs, mapping.values().copied());
        for gid in 0..glyphs.len() as u16 {
            if !keep.contains(&gid) {
                glyphs.clear_glyph(gid);
            }
        }
        glyphs.write_to(font).map_err(|e| e.to_string())?;
        log::debug!("Subset kept {} of {} glyphs", keep.len(), glyphs.len());
    } else {
        warnings.push(
            "subset: CFF outlines are kept in full; only the character map was reduced"
                .to_string(),
        );
    }

    let cmap = Cmap::from_mappings(mapping.iter().filter_map(|(cp, gid)| {
        Some((char::from_u32(*cp)?, GlyphId::from(*gid)))
    }))
    .map_err(|e| e.to_string())?;
    font.set_typed(&cmap).map_err(|e| e.to_string())?;

    if font.has_table(tags::OS2) {
        let mut os2: Os2 = {
            let reader: &SfntFont = font;
            reader.os2().map_err(|e| e.to_string())?.to_owned_table()
        };
        let first = mapping.keys().next().copied().unwrap_or(0).min(0xFFFF);
        let last = mapping.keys().next_back().copied().unwrap_or(0).min(0xFFFF);
        os2.us_first_char_index = first as u16;
        os2.us_last_char_index = last as u16;
        font.set_typed(&os2).map_err(|e| e.to_string())?;
    }

    if !retain_layout {
        for tag in [tags::GSUB, tags::GPOS, tags::GDEF] {
            font.remove_table(tag);
        }
    }
    Ok(())
}

/// `.notdef`, the mapped glyphs and every component they reference.
fn glyph_closure(glyphs: &GlyphTable, roots: impl Iterator<Item = u16>) -> BTreeSet<u16> {
    let mut keep = BTreeSet::from([0u16]);
    let mut pending: Vec<u16> = roots.collect();
    while let Some(gid) = pending.pop() {
        if gid as usize >= glyphs.len() || !keep.insert(gid) {
            continue;
        }
        pending.extend(components(glyphs.glyph(gid)));
    }
    keep
}
