// ABOUTME: Page canvas over lopdf content operations for A4 documents
// ABOUTME: Helvetica metrics, WinAnsi text encoding, page flow, and final assembly

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 50.0;
/// Content never flows below this line; the footer lives underneath
pub const CONTENT_BOTTOM: f32 = 80.0;

pub const LOGO_RESOURCE: &str = "Logo";

pub type Rgb = (f32, f32, f32);

pub const BLACK: Rgb = (0.0, 0.0, 0.0);
pub const WHITE: Rgb = (1.0, 1.0, 1.0);
pub const GREY: Rgb = (0.45, 0.45, 0.45);
pub const LIGHT_GREY: Rgb = (0.93, 0.93, 0.93);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Accumulates drawing operations page by page
pub struct Canvas {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    /// Current baseline, measured from the bottom of the page
    pub y: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Start a new page if `height` points would cross the content bottom.
    /// Returns true when a page break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.y - height < CONTENT_BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.push_fill(color);
        self.ops.push(Operation::new(
            "Tf",
            vec![font.resource().into(), size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Draw text whose right edge sits at `right`
    pub fn text_right(&mut self, right: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let x = right - text_width(text, font, size);
        self.text(x, y, font, size, color, text);
    }

    /// Draw text with a horizontal rule through its middle
    pub fn text_struck_right(&mut self, right: f32, y: f32, size: f32, color: Rgb, text: &str) {
        let width = text_width(text, Font::Regular, size);
        self.text(right - width, y, Font::Regular, size, color, text);
        let mid = y + size * 0.3;
        self.line(right - width, mid, right, mid, 0.7, color);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Rgb) {
        self.ops.push(Operation::new(
            "RG",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.push_fill(color);
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.ops.push(Operation::new("f", vec![]));
    }

    /// Paint the logo XObject into the given box
    pub fn image(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ));
        self.ops.push(Operation::new(
            "Do",
            vec![Object::Name(LOGO_RESOURCE.as_bytes().to_vec())],
        ));
        self.ops.push(Operation::new("Q", vec![]));
    }

    pub fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }

    fn push_fill(&mut self, color: Rgb) {
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
    }
}

/// Build the final document: shared fonts, optional logo, one content stream per page
pub fn assemble(pages: Vec<Vec<Operation>>, logo: Option<Stream>) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource() => regular,
            Font::Bold.resource() => bold,
        },
    };
    if let Some(stream) = logo {
        let logo_id = doc.add_object(stream);
        resources.set(
            "XObject",
            dictionary! {
                LOGO_RESOURCE => logo_id,
            },
        );
    }
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Map text to WinAnsi bytes; characters outside the code page become '?'
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Helvetica advance widths for printable ASCII, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold advance widths for printable ASCII, in 1/1000 em
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Accented Latin-1 letters share their base letter's advance width
fn width_base(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'Á' | 'À' | 'Â' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        _ => c,
    }
}

/// Rendered width of `text` in points
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let widths = match font {
        Font::Regular => &HELVETICA_WIDTHS,
        Font::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = width_base(c) as u32;
            if (0x20..=0x7e).contains(&code) {
                u32::from(widths[(code - 0x20) as usize])
            } else {
                556
            }
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap; words longer than the line are kept whole
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, font, size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_keeps_spanish_characters() {
        assert_eq!(encode_win_ansi("Año"), vec![b'A', 0xf1, b'o']);
        assert_eq!(encode_win_ansi("Página"), vec![b'P', 0xe1, b'g', b'i', b'n', b'a']);
        assert_eq!(encode_win_ansi("€ ✓"), vec![0x80, b' ', b'?']);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let small = text_width("Total", Font::Regular, 10.0);
        let large = text_width("Total", Font::Regular, 20.0);
        assert!((large - 2.0 * small).abs() < 0.01);
        assert!(text_width("Total", Font::Bold, 10.0) > small);
        // "0" is 556 units wide
        assert!((text_width("0", Font::Regular, 10.0) - 5.56).abs() < 0.001);
    }

    #[test]
    fn test_bold_uses_its_own_metrics() {
        // T o t a l: 611 + 611 + 333 + 556 + 278 in Helvetica-Bold
        assert!((text_width("Total", Font::Bold, 10.0) - 23.89).abs() < 0.001);
        assert!((text_width("Total", Font::Regular, 10.0) - 22.23).abs() < 0.001);
        // Narrow glyphs widen far more than a flat scale factor would give
        let ratio = text_width("iiii", Font::Bold, 10.0) / text_width("iiii", Font::Regular, 10.0);
        assert!((ratio - 278.0 / 222.0).abs() < 0.001);
    }

    #[test]
    fn test_accented_letters_measure_like_their_base() {
        assert_eq!(
            text_width("Añadir módulo", Font::Regular, 12.0),
            text_width("Anadir modulo", Font::Regular, 12.0)
        );
        assert_eq!(
            text_width("CAPACITACIÓN", Font::Bold, 12.0),
            text_width("CAPACITACION", Font::Bold, 12.0)
        );
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "Gestión de inventario con alertas de stock y reportes por bodega";
        let lines = wrap_text(text, Font::Regular, 10.0, 120.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 120.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_canvas_breaks_pages() {
        let mut canvas = Canvas::new();
        assert!(!canvas.ensure_space(100.0));
        canvas.text(MARGIN, canvas.y, Font::Regular, 10.0, BLACK, "uno");
        canvas.y = CONTENT_BOTTOM + 5.0;
        assert!(canvas.ensure_space(10.0));
        canvas.text(MARGIN, canvas.y, Font::Regular, 10.0, BLACK, "dos");

        assert_eq!(canvas.finish().len(), 2);
    }

    #[test]
    fn test_empty_canvas_still_has_one_page() {
        assert_eq!(Canvas::new().finish().len(), 1);
    }
}
