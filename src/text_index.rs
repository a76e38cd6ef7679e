//! Positioned-text index over one page's content streams.
//!
//! The scanner replays the text-positioning subset of the content stream
//! (BT/ET, Tf, Td, TD, Tm, T*, TL, Tc, Tw, Tz, Tj, TJ, ', ", and the
//! graphics-state operators cm/q/Q) and records one bounding box per
//! decoded character. Simple fonts only: bytes are decoded as WinAnsi and
//! advanced by `/Widths`, which covers the base-14 output of the document
//! generators this annotator is pointed at. Anything it cannot decode is
//! skipped rather than failed, since a partial index still lets most
//! targets match.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use once_cell::sync::Lazy;

use crate::layout::Rect;

/// Large negative TJ adjustments are inter-word gaps, in thousandths of
/// an em. The usual threshold in extractors.
const WORD_GAP_THRESHOLD: f32 = 120.0;

/// One decoded character and where it landed on the page.
#[derive(Debug, Clone, Copy)]
struct CharBox {
    rect: Rect,
}

/// Searchable index of a page's text.
///
/// `text` and the per-character boxes stay strictly parallel: the i-th
/// char of `text` owns the i-th box. Synthetic whitespace (word gaps,
/// line breaks) gets a degenerate box at the pen position.
pub struct TextIndex {
    text: String,
    chars: Vec<CharBox>,
}

impl TextIndex {
    /// Scan one page of `doc` into an index.
    pub fn from_page(doc: &Document, page_id: ObjectId) -> Result<Self, lopdf::Error> {
        let content_data = doc.get_page_content(page_id)?;
        let content = Content::decode(&content_data)?;
        let fonts = page_fonts(doc, page_id);

        let mut scanner = Scanner::new(fonts);
        for operation in &content.operations {
            scanner.apply(&operation.operator, &operation.operands);
        }
        Ok(scanner.finish())
    }

    /// Index for text laid out as a single monospaced line. Test helper
    /// for the layout stages, which only care about rectangles.
    pub fn from_plain_text(text: &str, x: f32, baseline: f32, font_size: f32) -> Self {
        let advance = font_size * 0.6;
        let mut index = TextIndex {
            text: String::new(),
            chars: Vec::new(),
        };
        let mut pen = x;
        for ch in text.chars() {
            index.push_char(
                ch,
                Rect::new(
                    pen,
                    baseline - 0.2 * font_size,
                    pen + advance,
                    baseline + 0.8 * font_size,
                ),
            );
            pen += advance;
        }
        index
    }

    fn push_char(&mut self, ch: char, rect: Rect) {
        self.text.push(ch);
        self.chars.push(CharBox { rect });
    }

    /// Full decoded text of the page, with synthetic spaces and newlines.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Union bounding box of the first literal occurrence of `needle`.
    ///
    /// Whitespace characters inside the match carry degenerate boxes and
    /// are excluded from the union, so a quote spanning a line break gets
    /// the union of its visible glyphs.
    pub fn find_first(&self, needle: &str) -> Option<Rect> {
        if needle.is_empty() {
            return None;
        }
        let byte_start = self.text.find(needle)?;
        let start = self.text[..byte_start].chars().count();
        let len = needle.chars().count();

        let mut union: Option<Rect> = None;
        for (ch, cbox) in needle.chars().zip(&self.chars[start..start + len]) {
            if ch.is_whitespace() {
                continue;
            }
            union = Some(match union {
                Some(u) => u.union(&cbox.rect),
                None => cbox.rect,
            });
        }
        union
    }
}

/// Width table for one simple font.
struct FontMetrics {
    first_char: i64,
    widths: Vec<f32>,
    missing_width: f32,
}

impl FontMetrics {
    /// Glyph advance in thousandths of an em.
    fn width(&self, code: u8) -> f32 {
        let idx = code as i64 - self.first_char;
        if idx >= 0 {
            if let Some(w) = self.widths.get(idx as usize) {
                return *w;
            }
        }
        self.missing_width
    }
}

const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

fn metrics_from_dict(doc: &Document, font: &Dictionary) -> FontMetrics {
    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(|o| resolve_i64(doc, o))
        .unwrap_or(0);
    let widths = font
        .get(b"Widths")
        .ok()
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_array().ok().cloned())
        .map(|arr| {
            arr.iter()
                .map(|w| resolve_f32(doc, w).unwrap_or(DEFAULT_GLYPH_WIDTH))
                .collect()
        })
        .unwrap_or_default();
    let missing_width = font
        .get(b"FontDescriptor")
        .ok()
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"MissingWidth").ok())
        .and_then(|o| resolve_f32(doc, o))
        .unwrap_or(DEFAULT_GLYPH_WIDTH);
    FontMetrics {
        first_char,
        widths,
        missing_width,
    }
}

/// Walk the page's /Parent chain for an inheritable attribute.
pub(crate) fn resolve_inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontMetrics> {
    let mut fonts = HashMap::new();
    let font_dict = resolve_inherited(doc, page_id, b"Resources")
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|resources| resources.get(b"Font").ok())
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_dict().ok());
    if let Some(font_dict) = font_dict {
        for (name, entry) in font_dict.iter() {
            if let Ok(font) = resolve_ref(doc, entry).as_dict() {
                fonts.insert(name.clone(), metrics_from_dict(doc, font));
            }
        }
    }
    fonts
}

fn resolve_ref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn resolve_f32(doc: &Document, object: &Object) -> Option<f32> {
    match resolve_ref(doc, object) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn resolve_i64(doc: &Document, object: &Object) -> Option<i64> {
    match resolve_ref(doc, object) {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

/// 2D affine transform, row form `[a b c d e f]` as in PDF.
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// self, then other.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Approximate uniform scale, good enough for glyph heights under
    /// the translation/scale transforms these documents use.
    fn scale(&self) -> f32 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

fn operand_f32(operands: &[Object], idx: usize) -> Option<f32> {
    match operands.get(idx)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

struct Scanner {
    fonts: HashMap<Vec<u8>, FontMetrics>,
    index: TextIndex,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
}

impl Scanner {
    fn new(fonts: HashMap<Vec<u8>, FontMetrics>) -> Self {
        Self {
            fonts,
            index: TextIndex {
                text: String::new(),
                chars: Vec::new(),
            },
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if operands.len() == 6 {
                    let m = Matrix {
                        a: operand_f32(operands, 0).unwrap_or(1.0),
                        b: operand_f32(operands, 1).unwrap_or(0.0),
                        c: operand_f32(operands, 2).unwrap_or(0.0),
                        d: operand_f32(operands, 3).unwrap_or(1.0),
                        e: operand_f32(operands, 4).unwrap_or(0.0),
                        f: operand_f32(operands, 5).unwrap_or(0.0),
                    };
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.font = Some(name.clone());
                }
                self.font_size = operand_f32(operands, 1).unwrap_or(self.font_size);
            }
            "Td" => {
                let tx = operand_f32(operands, 0).unwrap_or(0.0);
                let ty = operand_f32(operands, 1).unwrap_or(0.0);
                self.move_line(tx, ty);
            }
            "TD" => {
                let tx = operand_f32(operands, 0).unwrap_or(0.0);
                let ty = operand_f32(operands, 1).unwrap_or(0.0);
                self.leading = -ty;
                self.move_line(tx, ty);
            }
            "Tm" => {
                if operands.len() == 6 {
                    let m = Matrix {
                        a: operand_f32(operands, 0).unwrap_or(1.0),
                        b: operand_f32(operands, 1).unwrap_or(0.0),
                        c: operand_f32(operands, 2).unwrap_or(0.0),
                        d: operand_f32(operands, 3).unwrap_or(1.0),
                        e: operand_f32(operands, 4).unwrap_or(0.0),
                        f: operand_f32(operands, 5).unwrap_or(0.0),
                    };
                    // Repositioning runs along the same baseline is not a
                    // line break, or matches spanning the runs would be lost.
                    let moved_vertically = m.f != self.text_matrix.f;
                    self.line_matrix = m;
                    self.text_matrix = m;
                    if moved_vertically {
                        self.break_line();
                    }
                }
            }
            "T*" => self.move_line(0.0, -self.leading),
            "TL" => self.leading = operand_f32(operands, 0).unwrap_or(self.leading),
            "Tc" => self.char_spacing = operand_f32(operands, 0).unwrap_or(self.char_spacing),
            "Tw" => self.word_spacing = operand_f32(operands, 0).unwrap_or(self.word_spacing),
            "Tz" => {
                if let Some(scale) = operand_f32(operands, 0) {
                    self.horizontal_scale = scale / 100.0;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_text(bytes);
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_text(bytes);
                }
            }
            "\"" => {
                self.word_spacing = operand_f32(operands, 0).unwrap_or(self.word_spacing);
                self.char_spacing = operand_f32(operands, 1).unwrap_or(self.char_spacing);
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show_text(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show_text(bytes),
                            Object::Integer(i) => self.adjust(*i as f32),
                            Object::Real(r) => self.adjust(*r),
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
        if ty != 0.0 {
            self.break_line();
        }
    }

    /// Record a synthetic newline so a needle cannot match across what
    /// the page renders as separate lines without whitespace between.
    fn break_line(&mut self) {
        if matches!(self.index.text.chars().last(), Some(c) if !c.is_whitespace()) {
            let (x, y) = self.text_matrix.then(&self.ctm).apply(0.0, 0.0);
            self.index.push_char('\n', Rect::new(x, y, x, y));
        }
    }

    /// TJ adjustment, in thousandths of an em of the current font size.
    fn adjust(&mut self, amount: f32) {
        let dx = -amount / 1000.0 * self.font_size * self.horizontal_scale;
        if amount < -WORD_GAP_THRESHOLD
            && matches!(self.index.text.chars().last(), Some(c) if !c.is_whitespace())
        {
            let (x, y) = self.text_matrix.then(&self.ctm).apply(0.0, 0.0);
            self.index.push_char(' ', Rect::new(x, y, x, y));
        }
        self.text_matrix = Matrix::translation(dx, 0.0).then(&self.text_matrix);
    }

    fn show_text(&mut self, bytes: &[u8]) {
        let font = self.font.as_ref().and_then(|name| self.fonts.get(name));
        for &code in bytes {
            let glyph_width = font.map_or(DEFAULT_GLYPH_WIDTH, |f| f.width(code));
            let mut advance =
                glyph_width / 1000.0 * self.font_size * self.horizontal_scale + self.char_spacing;
            if code == b' ' {
                advance += self.word_spacing;
            }
            let trm = self.text_matrix.then(&self.ctm);
            let (x, y) = trm.apply(0.0, 0.0);
            let scale = trm.scale();
            let ch = WINANSI[code as usize];
            if ch != '\u{0}' {
                self.index.push_char(
                    ch,
                    Rect::new(
                        x,
                        y - 0.2 * self.font_size * scale,
                        x + advance * scale,
                        y + 0.8 * self.font_size * scale,
                    ),
                );
            }
            self.text_matrix = Matrix::translation(advance, 0.0).then(&self.text_matrix);
        }
    }

    fn finish(self) -> TextIndex {
        self.index
    }
}

/// WinAnsiEncoding code -> char. Unmapped codes are NUL and get skipped.
static WINANSI: Lazy<[char; 256]> = Lazy::new(|| {
    let mut table = ['\u{0}'; 256];
    for (code, slot) in table.iter_mut().enumerate().take(0x7F).skip(0x20) {
        *slot = code as u8 as char;
    }
    let high: [(u8, char); 27] = [
        (0x80, '\u{20AC}'),
        (0x82, '\u{201A}'),
        (0x83, '\u{0192}'),
        (0x84, '\u{201E}'),
        (0x85, '\u{2026}'),
        (0x86, '\u{2020}'),
        (0x87, '\u{2021}'),
        (0x88, '\u{02C6}'),
        (0x89, '\u{2030}'),
        (0x8A, '\u{0160}'),
        (0x8B, '\u{2039}'),
        (0x8C, '\u{0152}'),
        (0x8E, '\u{017D}'),
        (0x91, '\u{2018}'),
        (0x92, '\u{2019}'),
        (0x93, '\u{201C}'),
        (0x94, '\u{201D}'),
        (0x95, '\u{2022}'),
        (0x96, '\u{2013}'),
        (0x97, '\u{2014}'),
        (0x98, '\u{02DC}'),
        (0x99, '\u{2122}'),
        (0x9A, '\u{0161}'),
        (0x9B, '\u{203A}'),
        (0x9C, '\u{0153}'),
        (0x9E, '\u{017E}'),
        (0x9F, '\u{0178}'),
    ];
    for (code, ch) in high {
        table[code as usize] = ch;
    }
    for code in 0xA0..=0xFF_usize {
        table[code] = char::from_u32(code as u32).unwrap_or('\u{0}');
    }
    table
});

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{Stream, dictionary};

    fn single_page_doc(content: Content) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_id)
    }

    fn text_content(lines: &[&str]) -> Content {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(*line)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));
        Content { operations }
    }

    #[test]
    fn finds_text_on_a_line() {
        let (doc, page_id) = single_page_doc(text_content(&["performed at Lincoln Center"]));
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        assert!(index.text().contains("Lincoln Center"));
        let rect = index.find_first("Lincoln Center").expect("match");
        assert!(rect.x0 > 72.0);
        assert!(rect.y1 > rect.y0);
        // baseline at 700, ascent 0.8 em of a 12pt font
        assert!((rect.y1 - 709.6).abs() < 0.1);
    }

    #[test]
    fn first_occurrence_wins() {
        let (doc, page_id) = single_page_doc(text_content(&["echo echo"]));
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        let rect = index.find_first("echo").expect("match");
        let page_mid = 72.0 + index.find_first("echo echo").expect("both").width() / 2.0;
        assert!(rect.x1 < page_mid);
    }

    #[test]
    fn line_break_separates_lines() {
        let (doc, page_id) = single_page_doc(text_content(&["end of", "line two"]));
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        assert!(index.find_first("ofline").is_none());
        assert!(index.find_first("of\nline").is_some());
    }

    #[test]
    fn multiline_match_unions_both_lines() {
        let (doc, page_id) = single_page_doc(text_content(&["alpha", "beta"]));
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        let rect = index.find_first("alpha\nbeta").expect("match");
        let top = index.find_first("alpha").expect("alpha");
        let bottom = index.find_first("beta").expect("beta");
        assert_eq!(rect.y1, top.y1);
        assert_eq!(rect.y0, bottom.y0);
    }

    fn tm(x: f32, y: f32) -> Operation {
        Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(x),
                Object::Real(y),
            ],
        )
    }

    #[test]
    fn same_baseline_tm_runs_stay_joined() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                tm(72.0, 700.0),
                Operation::new("Tj", vec![Object::string_literal("Lincoln ")]),
                tm(150.0, 700.0),
                Operation::new("Tj", vec![Object::string_literal("Center")]),
                tm(72.0, 686.0),
                Operation::new("Tj", vec![Object::string_literal("next line")]),
                Operation::new("ET", vec![]),
            ],
        };
        let (doc, page_id) = single_page_doc(content);
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        assert!(index.find_first("Lincoln Center").is_some());
        assert!(index.find_first("Centernext").is_none());
        assert!(index.find_first("Center\nnext line").is_some());
    }

    #[test]
    fn tj_gap_becomes_a_space() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Lincoln"),
                        (-300).into(),
                        Object::string_literal("Center"),
                    ])],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let (doc, page_id) = single_page_doc(content);
        let index = TextIndex::from_page(&doc, page_id).expect("index");
        assert!(index.find_first("Lincoln Center").is_some());
    }

    #[test]
    fn winansi_quotes_decode() {
        assert_eq!(WINANSI[0x93], '\u{201C}');
        assert_eq!(WINANSI[0x41], 'A');
        assert_eq!(WINANSI[0xE9], 'é');
    }
}
