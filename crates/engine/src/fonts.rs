//! Built-in fallback fonts
//!
//! Overlay text rendering uses the standard Type1 base fonts so no font
//! program has to be embedded. Candidates are tried in order; a session
//! whose whole chain fails still supports every non-text draw.

use lopdf::{dictionary, Dictionary};

/// Ordered fallback chain for overlay text.
pub const FALLBACK_FONTS: &[&str] = &["Helvetica", "Times-Roman"];

/// Advance width used for code points outside the metrics table,
/// in 1/1000 em.
const DEFAULT_WIDTH: u16 = 500;

/// A standard base font with its AFM advance widths.
#[derive(Debug)]
pub struct BuiltinFont {
    pub base_font: &'static str,
    /// Widths for the printable ASCII range (0x20..=0x7E), 1/1000 em.
    widths: &'static [u16; 95],
}

impl BuiltinFont {
    /// Advance width of one character at the given size, in page units.
    pub fn char_width(&self, c: char, size: f32) -> f32 {
        let code = c as u32;
        let width = if (0x20..=0x7E).contains(&code) {
            self.widths[(code - 0x20) as usize]
        } else {
            DEFAULT_WIDTH
        };
        f32::from(width) / 1000.0 * size
    }

    /// Advance width of a whole string at the given size.
    pub fn string_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, size)).sum()
    }

    /// Resource dictionary entry for this font.
    pub fn resource_dictionary(&self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font,
        }
    }
}

/// Look a base font up by its PostScript name.
pub fn by_base_name(name: &str) -> Option<&'static BuiltinFont> {
    match name {
        "Helvetica" => Some(&HELVETICA),
        "Times-Roman" => Some(&TIMES_ROMAN),
        _ => None,
    }
}

/// Resolve the first usable candidate of the fallback chain.
pub fn resolve_fallback() -> Option<&'static BuiltinFont> {
    FALLBACK_FONTS.iter().find_map(|name| by_base_name(name))
}

pub static HELVETICA: BuiltinFont = BuiltinFont {
    base_font: "Helvetica",
    widths: &[
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // !"#$%&'()*+,-./
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
        278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // A-P
        778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // Q-Z
        278, 278, 278, 469, 556, 333, // [\]^_`
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // a-p
        556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // q-z
        334, 260, 334, 584, // {|}~
    ],
};

pub static TIMES_ROMAN: BuiltinFont = BuiltinFont {
    base_font: "Times-Roman",
    widths: &[
        250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
        278, 278, 564, 564, 564, 444, 921,
        722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556,
        722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
        333, 278, 333, 469, 500, 333,
        444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500,
        500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
        480, 200, 480, 541,
    ],
};
