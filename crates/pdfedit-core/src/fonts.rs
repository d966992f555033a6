//! Closed font lookup shared by the live preview and the compositor
//!
//! Three families times four styles gives the twelve variants we can bake.
//! Each variant is a PDF standard-14 font, so nothing needs to be embedded
//! beyond a font dictionary, and the preview side gets the matching CSS stack
//! from the very same enum.

use serde::{Deserialize, Serialize};

/// Deserializes from any font name through [`FontFamily::normalize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

impl From<String> for FontFamily {
    fn from(name: String) -> Self {
        FontFamily::normalize(&name)
    }
}

impl FontFamily {
    /// Fold an arbitrary font name (CSS generic family, PDF.js font name,
    /// subset-prefixed PostScript name...) into one of the three families.
    pub fn normalize(name: &str) -> FontFamily {
        let lower = name.to_lowercase();

        match lower.trim() {
            "serif" => return FontFamily::Serif,
            "sans" | "sans-serif" => return FontFamily::Sans,
            "mono" | "monospace" => return FontFamily::Mono,
            _ => {}
        }

        // "sans" must win over "serif" for names like "Noto Sans Serif Display"
        if lower.contains("sans") {
            return FontFamily::Sans;
        }

        if lower.contains("times")
            || lower.contains("serif")
            || lower.contains("georgia")
            || lower.contains("garamond")
            || lower.contains("cambria")
        {
            return FontFamily::Serif;
        }

        if lower.contains("courier")
            || lower.contains("mono")
            || lower.contains("consolas")
            || lower.contains("monaco")
        {
            return FontFamily::Mono;
        }

        FontFamily::Sans
    }

    /// CSS font stack for the live editor
    pub fn css_stack(self) -> &'static str {
        match self {
            FontFamily::Sans => "Helvetica, Arial, sans-serif",
            FontFamily::Serif => "\"Times New Roman\", Times, serif",
            FontFamily::Mono => "\"Courier New\", Courier, monospace",
        }
    }
}

/// One of the twelve bakeable font variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontVariant {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

/// What the preview needs to render a run in the same face the compositor bakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssFont {
    pub family: &'static str,
    pub weight: u16,
    pub style: &'static str,
}

impl FontVariant {
    pub const ALL: [FontVariant; 12] = [
        FontVariant::Helvetica,
        FontVariant::HelveticaBold,
        FontVariant::HelveticaOblique,
        FontVariant::HelveticaBoldOblique,
        FontVariant::TimesRoman,
        FontVariant::TimesBold,
        FontVariant::TimesItalic,
        FontVariant::TimesBoldItalic,
        FontVariant::Courier,
        FontVariant::CourierBold,
        FontVariant::CourierOblique,
        FontVariant::CourierBoldOblique,
    ];

    pub fn resolve(family: FontFamily, bold: bool, italic: bool) -> FontVariant {
        match family {
            FontFamily::Sans => match (bold, italic) {
                (true, true) => FontVariant::HelveticaBoldOblique,
                (true, false) => FontVariant::HelveticaBold,
                (false, true) => FontVariant::HelveticaOblique,
                (false, false) => FontVariant::Helvetica,
            },
            FontFamily::Serif => match (bold, italic) {
                (true, true) => FontVariant::TimesBoldItalic,
                (true, false) => FontVariant::TimesBold,
                (false, true) => FontVariant::TimesItalic,
                (false, false) => FontVariant::TimesRoman,
            },
            FontFamily::Mono => match (bold, italic) {
                (true, true) => FontVariant::CourierBoldOblique,
                (true, false) => FontVariant::CourierBold,
                (false, true) => FontVariant::CourierOblique,
                (false, false) => FontVariant::Courier,
            },
        }
    }

    pub fn family(self) -> FontFamily {
        match self {
            FontVariant::Helvetica
            | FontVariant::HelveticaBold
            | FontVariant::HelveticaOblique
            | FontVariant::HelveticaBoldOblique => FontFamily::Sans,
            FontVariant::TimesRoman
            | FontVariant::TimesBold
            | FontVariant::TimesItalic
            | FontVariant::TimesBoldItalic => FontFamily::Serif,
            FontVariant::Courier
            | FontVariant::CourierBold
            | FontVariant::CourierOblique
            | FontVariant::CourierBoldOblique => FontFamily::Mono,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(
            self,
            FontVariant::HelveticaBold
                | FontVariant::HelveticaBoldOblique
                | FontVariant::TimesBold
                | FontVariant::TimesBoldItalic
                | FontVariant::CourierBold
                | FontVariant::CourierBoldOblique
        )
    }

    pub fn is_italic(self) -> bool {
        matches!(
            self,
            FontVariant::HelveticaOblique
                | FontVariant::HelveticaBoldOblique
                | FontVariant::TimesItalic
                | FontVariant::TimesBoldItalic
                | FontVariant::CourierOblique
                | FontVariant::CourierBoldOblique
        )
    }

    /// PDF standard-14 `BaseFont` name
    pub fn base_font(self) -> &'static str {
        match self {
            FontVariant::Helvetica => "Helvetica",
            FontVariant::HelveticaBold => "Helvetica-Bold",
            FontVariant::HelveticaOblique => "Helvetica-Oblique",
            FontVariant::HelveticaBoldOblique => "Helvetica-BoldOblique",
            FontVariant::TimesRoman => "Times-Roman",
            FontVariant::TimesBold => "Times-Bold",
            FontVariant::TimesItalic => "Times-Italic",
            FontVariant::TimesBoldItalic => "Times-BoldItalic",
            FontVariant::Courier => "Courier",
            FontVariant::CourierBold => "Courier-Bold",
            FontVariant::CourierOblique => "Courier-Oblique",
            FontVariant::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Name under which the variant is registered in a page's `/Font` resources
    pub fn resource_name(self) -> String {
        format!("PE{}", self.base_font().replace('-', ""))
    }

    pub fn css_font(self) -> CssFont {
        CssFont {
            family: self.family().css_stack(),
            weight: if self.is_bold() { 700 } else { 400 },
            style: if self.is_italic() { "italic" } else { "normal" },
        }
    }

    /// Advance width in 1/1000 em
    pub fn char_width(self, c: char) -> u16 {
        let code = c as u32;
        if !(32..=126).contains(&code) {
            return self.fallback_width();
        }
        let idx = (code - 32) as usize;
        match self {
            FontVariant::Helvetica | FontVariant::HelveticaOblique => HELVETICA[idx],
            FontVariant::HelveticaBold | FontVariant::HelveticaBoldOblique => HELVETICA_BOLD[idx],
            FontVariant::TimesRoman => TIMES_ROMAN[idx],
            FontVariant::TimesBold => TIMES_BOLD[idx],
            FontVariant::TimesItalic => TIMES_ITALIC[idx],
            FontVariant::TimesBoldItalic => TIMES_BOLD_ITALIC[idx],
            FontVariant::Courier
            | FontVariant::CourierBold
            | FontVariant::CourierOblique
            | FontVariant::CourierBoldOblique => 600,
        }
    }

    fn fallback_width(self) -> u16 {
        match self.family() {
            FontFamily::Sans => 556,
            FontFamily::Serif => 500,
            FontFamily::Mono => 600,
        }
    }

    /// Rendered width of `text` in points at `font_size`
    pub fn text_width(self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 * font_size / 1000.0
    }
}

/// Encode text for a simple font using `WinAnsiEncoding`.
/// Characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

// Standard AFM advance widths for codes 32..=126.

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667,
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556,
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667,
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611,
    611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556,
    722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500,
    500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, 611,
    778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, 556,
    556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

#[rustfmt::skip]
const TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 675, 675, 675, 500, 920,
    611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722, 611,
    722, 611, 500, 556, 722, 611, 833, 611, 556, 556,
    389, 278, 389, 422, 500, 333,
    500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500, 500,
    500, 389, 389, 278, 500, 444, 667, 444, 444, 389,
    400, 275, 400, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 832,
    667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722, 611,
    722, 667, 556, 611, 722, 667, 889, 667, 611, 611,
    333, 278, 333, 570, 500, 333,
    500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500, 500,
    500, 389, 389, 278, 556, 444, 667, 500, 444, 389,
    348, 220, 348, 570,
];
