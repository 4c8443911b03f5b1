//! Editable sfnt (TrueType / OpenType) fonts.
//!
//! A font is held as a map from table tag to raw table bytes. Reading goes
//! through `read-fonts` ([`FontRef`] for the container, [`TableProvider`] for
//! typed table views) and writing through `write-fonts`: typed tables are
//! compiled with [`SfntFont::set_typed`] and [`SfntFont::to_bytes`] assembles
//! the container with [`FontBuilder`], which computes table checksums and the
//! `head` checksum adjustment. Table order is fixed by the builder, so
//! identical tables serialize to identical bytes.

use std::collections::BTreeMap;

use write_fonts::read::{FontData, FontRef, TableProvider, TopLevelTable};
use write_fonts::types::Tag;
use write_fonts::validate::Validate;
use write_fonts::{FontBuilder, FontWrite};

use crate::error::SfntError;

const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;
const SFNT_VERSION_CFF: u32 = 0x4F54_544F; // 'OTTO'

/// Table tags used across the crate.
pub mod tags {
    use write_fonts::types::Tag;

    pub const AVAR: Tag = Tag::new(b"avar");
    pub const CBDT: Tag = Tag::new(b"CBDT");
    pub const CBLC: Tag = Tag::new(b"CBLC");
    pub const CFF: Tag = Tag::new(b"CFF ");
    pub const CFF2: Tag = Tag::new(b"CFF2");
    pub const COLR: Tag = Tag::new(b"COLR");
    pub const CPAL: Tag = Tag::new(b"CPAL");
    pub const CVAR: Tag = Tag::new(b"cvar");
    pub const CVT: Tag = Tag::new(b"cvt ");
    pub const FPGM: Tag = Tag::new(b"fpgm");
    pub const FVAR: Tag = Tag::new(b"fvar");
    pub const GDEF: Tag = Tag::new(b"GDEF");
    pub const GLYF: Tag = Tag::new(b"glyf");
    pub const GPOS: Tag = Tag::new(b"GPOS");
    pub const GSUB: Tag = Tag::new(b"GSUB");
    pub const GVAR: Tag = Tag::new(b"gvar");
    pub const HDMX: Tag = Tag::new(b"hdmx");
    pub const HEAD: Tag = Tag::new(b"head");
    pub const HVAR: Tag = Tag::new(b"HVAR");
    pub const LOCA: Tag = Tag::new(b"loca");
    pub const LTSH: Tag = Tag::new(b"LTSH");
    pub const MVAR: Tag = Tag::new(b"MVAR");
    pub const OS2: Tag = Tag::new(b"OS/2");
    pub const PREP: Tag = Tag::new(b"prep");
    pub const SBIX: Tag = Tag::new(b"sbix");
    pub const STAT: Tag = Tag::new(b"STAT");
    pub const SVG: Tag = Tag::new(b"SVG ");
    pub const VDMX: Tag = Tag::new(b"VDMX");
    pub const VVAR: Tag = Tag::new(b"VVAR");
}

/// Tag text with trailing padding removed (`"cvt "` becomes `"cvt"`).
pub fn tag_name(tag: Tag) -> String {
    tag.to_string().trim_end().to_string()
}

/// An sfnt font as an editable table map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfntFont {
    tables: BTreeMap<Tag, Vec<u8>>,
}

impl SfntFont {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every table of one face out of a font file or collection.
    pub fn parse(data: &[u8], face_index: u32) -> Result<Self, SfntError> {
        let font = FontRef::from_index(data, face_index)?;
        let mut tables = BTreeMap::new();
        for record in font.table_directory().table_records() {
            let tag = record.tag();
            let table = font.table_data(tag).ok_or(SfntError::Malformed(tag))?;
            tables.insert(tag, table.as_bytes().to_vec());
        }
        if tables.is_empty() {
            return Err(SfntError::Empty);
        }
        Ok(Self { tables })
    }

    /// `0x00010000` for TrueType outlines, `OTTO` for CFF.
    pub fn sfnt_version(&self) -> u32 {
        if self.has_table(tags::CFF) {
            SFNT_VERSION_CFF
        } else {
            SFNT_VERSION_TRUETYPE
        }
    }

    pub fn table(&self, tag: Tag) -> Option<&[u8]> {
        self.tables.get(&tag).map(Vec::as_slice)
    }

    pub fn set_table(&mut self, tag: Tag, data: Vec<u8>) {
        self.tables.insert(tag, data);
    }

    /// Compile a `write-fonts` table and store it under its own tag.
    pub fn set_typed<T>(&mut self, table: &T) -> Result<(), SfntError>
    where
        T: FontWrite + Validate + TopLevelTable,
    {
        let data = write_fonts::dump_table(table).map_err(|e| SfntError::Write {
            tag: T::TAG,
            reason: e.to_string(),
        })?;
        self.tables.insert(T::TAG, data);
        Ok(())
    }

    pub fn remove_table(&mut self, tag: Tag) -> Option<Vec<u8>> {
        self.tables.remove(&tag)
    }

    pub fn has_table(&self, tag: Tag) -> bool {
        self.tables.contains_key(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tables.keys().copied()
    }

    pub fn tables(&self) -> impl Iterator<Item = (Tag, &[u8])> + '_ {
        self.tables.iter().map(|(tag, data)| (*tag, data.as_slice()))
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// True for PostScript-flavored outlines.
    pub fn is_cff(&self) -> bool {
        self.has_table(tags::CFF) || self.has_table(tags::CFF2)
    }

    pub fn num_glyphs(&self) -> Result<u16, SfntError> {
        Ok(self.maxp()?.num_glyphs())
    }

    /// Assemble the container.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut builder = FontBuilder::new();
        for (tag, data) in &self.tables {
            builder.add_raw(*tag, data.as_slice());
        }
        builder.build()
    }
}

impl<'a> TableProvider<'a> for &'a SfntFont {
    fn data_for_tag(&self, tag: Tag) -> Option<FontData<'a>> {
        let font: &'a SfntFont = *self;
        font.tables.get(&tag).map(|data| FontData::new(data))
    }
}
