//! Font metrics port (§1): an external collaborator supplying text and
//! glyph measurements the engine itself has no way to compute (it has no
//! font-rendering code of its own, only layout code that needs to know how
//! wide things are once drawn).

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `(width, right-to-left adjustment, height)` for a measured string.
pub type TextMetrics = (f64, f64, f64);

/// Virtual-glyph-id → SMuFL code point table for the handful of glyphs the
/// engine itself names (noteheads, clefs, common accidentals). Ids outside
/// this table fall back to the font's private-use area, for backends that
/// haven't been taught the full SMuFL range.
static SMUFL_GLYPHS: Lazy<HashMap<u32, char>> = Lazy::new(|| {
    HashMap::from([
        (1, '\u{E0A4}'), // noteheadBlack
        (2, '\u{E0A3}'), // noteheadHalf
        (3, '\u{E0A2}'), // noteheadWhole
        (10, '\u{E050}'), // gClef
        (11, '\u{E062}'), // fClef
        (12, '\u{E05C}'), // cClef
        (20, '\u{E262}'), // accidentalSharp
        (21, '\u{E260}'), // accidentalFlat
        (22, '\u{E261}'), // accidentalNatural
    ])
});

pub trait FontMetrics {
    /// Measure `text` set in `font` at `size` (in layout units).
    fn width(&self, text: &str, font: &str, size: f64) -> TextMetrics;

    /// Map a virtual (engine-internal) glyph id to the font's own
    /// character code, so the backend can ask the font for the right
    /// glyph without the engine needing to know the font's private
    /// encoding.
    fn glyph_char(&self, virtual_id: u32) -> Option<char>;
}

/// A fixed-width stand-in used by tests and by any backend that hasn't
/// wired up real font metrics yet: every character counts as `em_width`
/// wide, and glyph ids resolve through [`SMUFL_GLYPHS`] or else fall back
/// to the Unicode private-use area.
pub struct FixedWidthMetrics {
    pub em_width: f64,
    pub em_height: f64,
}

impl FontMetrics for FixedWidthMetrics {
    fn width(&self, text: &str, _font: &str, size: f64) -> TextMetrics {
        let scale = size / 1000.0;
        let width = text.chars().count() as f64 * self.em_width * scale;
        (width, 0.0, self.em_height * scale)
    }

    fn glyph_char(&self, virtual_id: u32) -> Option<char> {
        SMUFL_GLYPHS
            .get(&virtual_id)
            .copied()
            .or_else(|| char::from_u32(0xE000 + virtual_id))
    }
}
