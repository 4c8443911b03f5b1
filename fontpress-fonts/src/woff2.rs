//! WOFF2 encoding.
//!
//! Tables are stored untransformed (`glyf`/`loca` use the null transform,
//! version 3) and compressed as a single Brotli stream. Output depends only on
//! the input tables and the Brotli settings.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::ConversionError;
use write_fonts::types::Tag;

use crate::sfnt::{SfntFont, tags};

const WOFF2_SIGNATURE: u32 = 0x774F_4632; // 'wOF2'
const WOFF2_HEADER_SIZE: usize = 48;
const NULL_TRANSFORM: u8 = 3 << 6;
const ARBITRARY_TAG: u8 = 63;

/// Known-table index from the WOFF2 directory format.
const KNOWN_TAGS: [&[u8; 4]; 63] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
    b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC",
    b"JSTF", b"MATH", b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
    b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar", b"gvar", b"hsty",
    b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop", b"trak", b"Zapf", b"Silf", b"Glat",
    b"Gloc", b"Feat", b"Sill",
];

/// Output web font format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebFontFormat {
    Woff2,
}

impl WebFontFormat {
    pub fn extension(&self) -> &'static str {
        "woff2"
    }

    pub fn mime_type(&self) -> &'static str {
        "font/woff2"
    }

    /// Value for the CSS `format()` hint.
    pub fn css_format(&self) -> &'static str {
        "woff2"
    }
}

/// Brotli settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// 0-11.
    pub quality: u32,
    /// Log2 of the window size, 10-24.
    pub window: u32,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            quality: 11,
            window: 22,
        }
    }
}

/// A converted web font held in memory for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedArtifact {
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
    pub format: WebFontFormat,
    pub suggested_filename: String,
    pub source_size: u64,
}

impl ConvertedArtifact {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Lowercase hex SHA-256 digest.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ConverterOptions {
        self.options
    }

    /// Convert one face of a font file to WOFF2.
    pub fn convert(
        &self,
        input: &Path,
        face_index: u32,
        name_stem: &str,
    ) -> Result<ConvertedArtifact, ConversionError> {
        let data = std::fs::read(input).map_err(|source| ConversionError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let font = SfntFont::parse(&data, face_index)?;
        ttf_parser::Face::parse(&font.to_bytes(), 0)
            .map_err(|e| ConversionError::InvalidFont(e.to_string()))?;

        let bytes = self.encode(&font)?;
        let sha256 = content_hash(&bytes);
        log::debug!(
            "Converted {} ({} bytes) to WOFF2 ({} bytes, sha256 {})",
            input.display(),
            data.len(),
            bytes.len(),
            sha256
        );
        Ok(ConvertedArtifact {
            bytes,
            sha256,
            format: WebFontFormat::Woff2,
            suggested_filename: format!("{}.woff2", sanitize_stem(name_stem)),
            source_size: data.len() as u64,
        })
    }

    /// Encode an in-memory font.
    pub fn encode(&self, font: &SfntFont) -> Result<Vec<u8>, ConversionError> {
        if font.num_tables() == 0 {
            return Err(ConversionError::InvalidFont("font has no tables".to_string()));
        }
        if font.table(tags::HEAD).is_none() {
            return Err(ConversionError::InvalidFont("missing head table".to_string()));
        }

        let order = table_order(font);
        let mut directory = Vec::new();
        let mut stream = Vec::new();
        let mut sfnt_size = 12 + 16 * order.len();
        for tag in &order {
            let data = font.table(*tag).unwrap_or_default();
            let transform = if *tag == tags::GLYF || *tag == tags::LOCA {
                NULL_TRANSFORM
            } else {
                0
            };
            match KNOWN_TAGS.iter().position(|known| **known == tag.to_be_bytes()) {
                Some(index) => directory.push(index as u8 | transform),
                None => {
                    directory.push(ARBITRARY_TAG | transform);
                    directory.extend_from_slice(&tag.to_be_bytes());
                }
            }
            write_base128(&mut directory, data.len() as u32);
            stream.extend_from_slice(data);
            sfnt_size += pad4(data.len());
        }

        let compressed = self.compress(&stream)?;
        let length = pad4(WOFF2_HEADER_SIZE + directory.len() + compressed.len());

        let mut out = Vec::with_capacity(length);
        out.extend_from_slice(&WOFF2_SIGNATURE.to_be_bytes());
        out.extend_from_slice(&font.sfnt_version().to_be_bytes());
        out.extend_from_slice(&(length as u32).to_be_bytes());
        out.extend_from_slice(&(order.len() as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(sfnt_size as u32).to_be_bytes());
        out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        // metadata and private blocks: offset, length, orig length / offset, length
        out.extend_from_slice(&[0; 20]);
        out.extend_from_slice(&directory);
        out.extend_from_slice(&compressed);
        out.resize(length, 0);
        Ok(out)
    }

    fn compress(&self, stream: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let params = brotli::enc::BrotliEncoderParams {
            quality: self.options.quality as i32,
            lgwin: self.options.window as i32,
            size_hint: stream.len(),
            ..Default::default()
        };
        let mut input = stream;
        let mut out = Vec::new();
        brotli::BrotliCompress(&mut input, &mut out, &params)
            .map_err(|e| ConversionError::Codec(e.to_string()))?;
        Ok(out)
    }
}

/// Sorted tags with `loca` directly after `glyf`.
fn table_order(font: &SfntFont) -> Vec<Tag> {
    let mut order: Vec<Tag> = font.tags().filter(|t| *t != tags::LOCA).collect();
    if font.has_table(tags::LOCA) {
        match order.iter().position(|t| *t == tags::GLYF) {
            Some(glyf) => order.insert(glyf + 1, tags::LOCA),
            None => order.push(tags::LOCA),
        }
    }
    order
}

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

/// WOFF2 `UIntBase128`.
fn write_base128(out: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut len = 0;
    loop {
        bytes[len] = (value & 0x7F) as u8;
        len += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..len).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(bytes[i] | continuation);
    }
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "font".to_string()
    } else {
        cleaned
    }
}
