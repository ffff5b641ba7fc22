//! ---
//! insight_section: "05-reporting"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Feedback aggregation, PDF rendering, and the report pipeline."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! WinAnsi (code page 1252) encoding used by the standard base fonts.

/// Character written in place of anything the fonts cannot show.
pub const REPLACEMENT: char = '?';

/// Code points that WinAnsi places in 0x80..=0x9F.
const HIGH_PUNCTUATION: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

pub fn encode_char(ch: char) -> Option<u8> {
    match ch as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => HIGH_PUNCTUATION
            .iter()
            .find(|(candidate, _)| *candidate == ch)
            .map(|(_, byte)| *byte),
    }
}

/// Encode `text`, returning the first character that has no WinAnsi byte.
pub fn encode(text: &str) -> Result<Vec<u8>, char> {
    text.chars()
        .map(|ch| encode_char(ch).ok_or(ch))
        .collect()
}

pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if encode_char(ch).is_some() {
                ch
            } else {
                REPLACEMENT
            }
        })
        .collect()
}
