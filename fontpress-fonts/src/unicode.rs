//! Code point selection for subset requests: explicit code points, ranges and
//! language or script tags.

use std::collections::BTreeSet;

/// Inclusive code point range.
pub type CodepointRange = (u32, u32);

const BASIC_LATIN: &[CodepointRange] = &[(0x0020, 0x007E)];

const LATIN: &[CodepointRange] = &[
    (0x0000, 0x00FF),
    (0x0131, 0x0131),
    (0x0152, 0x0153),
    (0x02BB, 0x02BC),
    (0x02C6, 0x02C6),
    (0x02DA, 0x02DA),
    (0x02DC, 0x02DC),
    (0x2000, 0x206F),
    (0x2074, 0x2074),
    (0x20AC, 0x20AC),
    (0x2122, 0x2122),
    (0x2191, 0x2191),
    (0x2193, 0x2193),
    (0x2212, 0x2212),
    (0x2215, 0x2215),
    (0xFEFF, 0xFEFF),
    (0xFFFD, 0xFFFD),
];

const LATIN_EXT: &[CodepointRange] = &[
    (0x0100, 0x024F),
    (0x0259, 0x0259),
    (0x1E00, 0x1EFF),
    (0x2020, 0x2020),
    (0x20A0, 0x20AB),
    (0x20AD, 0x20CF),
    (0x2113, 0x2113),
    (0x2C60, 0x2C7F),
    (0xA720, 0xA7FF),
];

const CYRILLIC: &[CodepointRange] = &[
    (0x0301, 0x0301),
    (0x0400, 0x045F),
    (0x0490, 0x0491),
    (0x04B0, 0x04B1),
    (0x2116, 0x2116),
];

const CYRILLIC_EXT: &[CodepointRange] = &[
    (0x0460, 0x052F),
    (0x1C80, 0x1C88),
    (0x20B4, 0x20B4),
    (0x2DE0, 0x2DFF),
    (0xA640, 0xA69F),
    (0xFE2E, 0xFE2F),
];

const GREEK: &[CodepointRange] = &[(0x0370, 0x03FF)];

const GREEK_EXT: &[CodepointRange] = &[(0x1F00, 0x1FFF)];

const VIETNAMESE: &[CodepointRange] = &[
    (0x0102, 0x0103),
    (0x0110, 0x0111),
    (0x0128, 0x0129),
    (0x0168, 0x0169),
    (0x01A0, 0x01A1),
    (0x01AF, 0x01B0),
    (0x1EA0, 0x1EF9),
    (0x20AB, 0x20AB),
];

/// Range tables making up a language or script tag, case-insensitive.
fn language_ranges(tag: &str) -> Option<Vec<&'static [CodepointRange]>> {
    let ranges = match tag.to_ascii_lowercase().as_str() {
        "latin" | "en" | "de" | "fr" | "es" | "it" | "pt" | "nl" | "sv" | "da" | "no"
        | "nb" | "fi" | "is" | "ga" => vec![LATIN],
        "latin-ext" => vec![LATIN_EXT],
        "pl" | "cs" | "sk" | "sl" | "hr" | "hu" | "ro" | "tr" | "lt" | "lv" | "et" => {
            vec![LATIN, LATIN_EXT]
        }
        "cyrillic" => vec![CYRILLIC],
        "cyrillic-ext" => vec![CYRILLIC_EXT],
        "ru" | "uk" | "be" | "bg" | "sr" | "mk" | "kk" => vec![BASIC_LATIN, CYRILLIC],
        "greek" => vec![GREEK],
        "greek-ext" => vec![GREEK_EXT],
        "el" => vec![BASIC_LATIN, GREEK],
        "vietnamese" => vec![VIETNAMESE],
        "vi" => vec![LATIN, VIETNAMESE],
        _ => return None,
    };
    Some(ranges)
}

/// Code points for a language or script tag such as `latin` or `ru`.
pub fn language_codepoints(tag: &str) -> Result<BTreeSet<u32>, String> {
    let tables = language_ranges(tag.trim())
        .ok_or_else(|| format!("unknown language or script tag '{tag}'"))?;
    Ok(tables
        .into_iter()
        .flatten()
        .flat_map(|(start, end)| *start..=*end)
        .collect())
}

/// Parse `U+0041`, `u+41`, `0x41` or bare hex `0041`.
pub fn parse_codepoint(text: &str) -> Result<u32, String> {
    let trimmed = text.trim();
    let hex = trimmed
        .strip_prefix("U+")
        .or_else(|| trimmed.strip_prefix("u+"))
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let value = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid code point '{text}'"))?;
    if value > 0x10FFFF {
        return Err(format!("code point '{text}' is beyond U+10FFFF"));
    }
    Ok(value)
}

/// Parse `U+0000-00FF`, `U+0000-U+00FF` or a single code point.
pub fn parse_range(text: &str) -> Result<CodepointRange, String> {
    let trimmed = text.trim();
    let Some((start, end)) = trimmed.split_once('-') else {
        let single = parse_codepoint(trimmed)?;
        return Ok((single, single));
    };
    let start = parse_codepoint(start)?;
    let end = parse_codepoint(end)?;
    if end < start {
        return Err(format!("range '{text}' ends before it starts"));
    }
    Ok((start, end))
}
