//! Standard-14 font metrics needed to right-align text on the PDF page.

/// Fonts referenced by the report page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PdfFont {
    Helvetica,
    HelveticaBold,
    /// Only used for the Greek lambda
    Symbol,
}

impl PdfFont {
    pub const ALL: [Self; 3] = [Self::Helvetica, Self::HelveticaBold, Self::Symbol];

    pub const fn base_font(self) -> &'static [u8] {
        match self {
            Self::Helvetica => b"Helvetica",
            Self::HelveticaBold => b"Helvetica-Bold",
            Self::Symbol => b"Symbol",
        }
    }

    /// Resource name inside the page
    pub const fn resource_name(self) -> &'static [u8] {
        match self {
            Self::Helvetica => b"F1",
            Self::HelveticaBold => b"F2",
            Self::Symbol => b"F3",
        }
    }

    /// Width of `text` at `size` points
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.glyph_width(c)).sum();
        units as f32 * size / 1000.0
    }

    fn glyph_width(self, c: char) -> u32 {
        let table = match self {
            Self::Helvetica => &HELVETICA,
            Self::HelveticaBold => &HELVETICA_BOLD,
            Self::Symbol => return if c == SYMBOL_LAMBDA { 549 } else { 250 },
        };
        match c {
            ' '..='~' => u32::from(table[c as usize - 0x20]),
            _ => 556,
        }
    }
}

/// Symbol font code point rendering a lowercase lambda
pub const SYMBOL_LAMBDA: char = 'l';

/// Advance widths for 0x20..=0x7E, in 1/1000 em
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_minus_sign_is_wider_than_nothing() {
        assert!(close(PdfFont::Helvetica.text_width("0.30", 10.0), 19.46));
        assert!(close(PdfFont::Helvetica.text_width("-0.60", 10.0), 22.79));
    }

    #[test]
    fn test_bold_widths() {
        assert!(close(PdfFont::HelveticaBold.text_width("Value / ", 10.0), 35.02));
        assert!(close(PdfFont::HelveticaBold.text_width("-0.60", 10.0), 22.79));
    }
}
