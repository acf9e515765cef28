//! Code-point and visible width helpers.
//!
//! Widths are resolved per code point:
//! - ASCII is always one column.
//! - Variation selectors, zero-width (non-)joiners and the BOM take no columns.
//! - Emoji-range code points use whatever the terminal reported during probing
//!   (see [`crate::core::probe`]), falling back to one column.
//! - Everything else uses the East Asian width tables, clamped to one or two.
//!
//! The render path only reads the width cache; it never probes.

use emojis::get as emoji_get;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ansi::{segments, Segment};
use crate::core::probe::{width_cache, CapabilityProbe, DEFAULT_PROBE_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthClass {
    Ascii,
    ZeroWidth,
    /// Rendered width depends on the terminal; probed and cached.
    Emoji,
    Standard,
}

const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1FAFF),
    (0x1F000, 0x1F2FF),
    (0x2600, 0x27BF),
    (0x2300, 0x23FF),
    (0x2B00, 0x2BFF),
];

pub fn is_zero_width(ch: char) -> bool {
    matches!(
        ch as u32,
        0xFE00..=0xFE0F | 0xE0100..=0xE01EF | 0x200B | 0x200C | 0x200D | 0xFEFF
    )
}

fn in_emoji_range(ch: char) -> bool {
    let cp = ch as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

pub fn classify(ch: char) -> WidthClass {
    if ch.is_ascii() {
        return WidthClass::Ascii;
    }
    if is_zero_width(ch) {
        return WidthClass::ZeroWidth;
    }
    if in_emoji_range(ch) {
        return WidthClass::Emoji;
    }
    let mut buf = [0u8; 4];
    if emoji_get(ch.encode_utf8(&mut buf)).is_some() {
        return WidthClass::Emoji;
    }
    WidthClass::Standard
}

/// True when the glyph's width can only be learned from the terminal.
pub fn needs_probe(ch: char) -> bool {
    classify(ch) == WidthClass::Emoji
}

fn standard_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1).clamp(1, 2)
}

/// Width of `ch` from static rules and the width cache, without probing.
pub fn char_width(ch: char) -> usize {
    match classify(ch) {
        WidthClass::Ascii => 1,
        WidthClass::ZeroWidth => 0,
        WidthClass::Emoji => width_cache()
            .get(ch)
            .map(usize::from)
            .unwrap_or(usize::from(DEFAULT_PROBE_WIDTH)),
        WidthClass::Standard => standard_width(ch),
    }
}

/// Width of `ch`, probing and caching emoji-range glyphs on first sight.
///
/// Blocks for up to the probe timeout on a cache miss; never call this from
/// the session event loop.
pub fn resolve_char_width(ch: char, probe: &dyn CapabilityProbe) -> usize {
    match classify(ch) {
        WidthClass::Emoji => usize::from(width_cache().resolve(ch, probe)),
        _ => char_width(ch),
    }
}

/// Width of a grapheme cluster (sum of its code points).
pub fn grapheme_width(grapheme: &str) -> usize {
    grapheme.chars().map(char_width).sum()
}

/// Display width of `input`, ignoring escape sequences.
pub fn visible_width(input: &str) -> usize {
    segments(input)
        .map(|segment| match segment {
            Segment::Text(text) => text.graphemes(true).map(grapheme_width).sum(),
            Segment::Escape(_) => 0,
        })
        .sum()
}
