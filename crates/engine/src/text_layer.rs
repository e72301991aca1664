//! Structured text extraction
//!
//! Walks a page's decoded content stream, tracking the graphics state
//! (`q`/`Q`/`cm`) and the text state (`BT`..`ET` and the positioning
//! operators between them), and yields the page's text as blocks of
//! lines of positioned characters. Character quads are axis-aligned
//! boxes in native page space.
//!
//! The walker is deliberately tolerant: unknown operators are skipped,
//! unknown fonts fall back to a default advance width, and string bytes
//! decode as Latin-1 so every byte maps to exactly one character.

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};
use tracing::trace;

use crate::document::{inherited_page_attr, page_object_id, resolve};
use crate::error::TextError;
use crate::fonts::{self, BuiltinFont};
use crate::transform::{Matrix, Point};

/// Em-fraction advance used for glyphs whose font metrics are unknown.
const DEFAULT_ADVANCE: f32 = 0.5;

/// Axis-aligned bounding box in native page space (Y-up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Quad {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Tightest box enclosing a set of points.
    pub fn enclosing(points: &[Point]) -> Quad {
        let mut quad = Quad::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for p in points {
            quad.min_x = quad.min_x.min(p.x);
            quad.min_y = quad.min_y.min(p.y);
            quad.max_x = quad.max_x.max(p.x);
            quad.max_y = quad.max_y.max(p.y);
        }
        quad
    }

    pub fn union(&self, other: &Quad) -> Quad {
        Quad {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Corners in upper-left, upper-right, lower-right, lower-left
    /// order. Native space is Y-up, so "upper" is the larger Y.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.max_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.min_x, self.min_y),
        ]
    }
}

/// One positioned character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextChar {
    pub code: char,
    pub quad: Quad,
}

/// A run of characters sharing one baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub chars: Vec<TextChar>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.code).collect()
    }
}

/// One `BT`..`ET` text object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

/// All structured text on one page, in content-stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub blocks: Vec<TextBlock>,
}

impl PageText {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate every line on the page in document order.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|block| block.lines.iter())
    }

    /// Total character count across all blocks.
    pub fn char_count(&self) -> usize {
        self.lines().map(|line| line.chars.len()).sum()
    }

    /// Characters above the space code point; whitespace and control
    /// bytes carry no evidence of a real text layer.
    pub fn visible_char_count(&self) -> usize {
        self.lines()
            .flat_map(|line| line.chars.iter())
            .filter(|c| c.code > ' ')
            .count()
    }
}

/// Extract the structured text of one page.
pub fn extract_page_text(doc: &Document, page_index: u32) -> Result<PageText, TextError> {
    let page_id = page_object_id(doc, page_index).ok_or(TextError::PageMissing(page_index))?;
    let content = doc.get_and_decode_page_content(page_id)?;
    let font_map = page_font_map(doc, page_id);

    let mut walker = TextWalker::new(font_map);
    for operation in &content.operations {
        walker.step(operation.operator.as_str(), &operation.operands);
    }
    let page_text = walker.finish();
    trace!(page_index, chars = page_text.char_count(), "extracted page text");
    Ok(page_text)
}

/// Map a page's font resource names to built-in metrics, where the
/// `BaseFont` (minus any subset prefix) matches a standard base font.
fn page_font_map(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, &'static BuiltinFont> {
    let mut map = BTreeMap::new();

    let Some(resources) =
        inherited_page_attr(doc, page_id, b"Resources").and_then(|r| r.as_dict().ok())
    else {
        return map;
    };
    let Some(font_category) = resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve(doc, f))
        .and_then(|f| f.as_dict().ok())
    else {
        return map;
    };

    for (name, value) in font_category.iter() {
        let Some(font_dict) = resolve(doc, value).and_then(|v| v.as_dict().ok()) else {
            continue;
        };
        let Some(base_font) = font_dict
            .get(b"BaseFont")
            .ok()
            .and_then(|b| b.as_name().ok())
            .and_then(|b| std::str::from_utf8(b).ok())
        else {
            continue;
        };
        // Subset tags look like "ABCDEF+Helvetica".
        let base_name = base_font.rsplit('+').next().unwrap_or(base_font);
        if let Some(builtin) = fonts::by_base_name(base_name) {
            map.insert(name.clone(), builtin);
        }
    }
    map
}

/// Graphics plus text state for one content stream walk.
struct TextWalker {
    font_map: BTreeMap<Vec<u8>, &'static BuiltinFont>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: Option<&'static BuiltinFont>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    leading: f32,
    in_text: bool,
    blocks: Vec<TextBlock>,
    block: TextBlock,
    line: TextLine,
}

impl TextWalker {
    fn new(font_map: BTreeMap<Vec<u8>, &'static BuiltinFont>) -> Self {
        Self {
            font_map,
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
            in_text: false,
            blocks: Vec::new(),
            block: TextBlock::default(),
            line: TextLine::default(),
        }
    }

    fn step(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(saved) = self.ctm_stack.pop() {
                    self.ctm = saved;
                }
            }
            "cm" => {
                if let Some(m) = operand_matrix(operands) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {
                self.in_text = false;
                self.flush_block();
            }
            _ if !self.in_text => {}
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(|o| o.as_float().ok()))
                {
                    self.font = self.font_map.get(name).copied();
                    self.font_size = size;
                }
            }
            "Tc" => self.char_spacing = float_operand(operands, 0),
            "Tw" => self.word_spacing = float_operand(operands, 0),
            "TL" => self.leading = float_operand(operands, 0),
            "Td" => self.move_line(float_operand(operands, 0), float_operand(operands, 1)),
            "TD" => {
                let ty = float_operand(operands, 1);
                self.leading = -ty;
                self.move_line(float_operand(operands, 0), ty);
            }
            "Tm" => {
                if let Some(m) = operand_matrix(operands) {
                    self.flush_line();
                    self.line_matrix = m;
                    self.text_matrix = m;
                }
            }
            "T*" => self.move_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_bytes(bytes);
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_bytes(bytes);
                }
            }
            "\"" => {
                self.word_spacing = float_operand(operands, 0);
                self.char_spacing = float_operand(operands, 1);
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show_bytes(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show_bytes(bytes),
                            // Positioning adjustments are in thousandths
                            // of text space, applied against the advance.
                            _ => {
                                if let Ok(adjust) = item.as_float() {
                                    let shift = -adjust / 1000.0 * self.font_size;
                                    self.text_matrix =
                                        Matrix::translation(shift, 0.0).then(&self.text_matrix);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// `Td` semantics: offset the line matrix and start a new line.
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.flush_line();
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn show_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            // Latin-1: every byte is exactly one code point.
            let code = char::from(byte);
            let advance = self.glyph_advance(byte);

            let device = |p: Point| self.ctm.apply(self.text_matrix.apply(p));
            let corners = [
                device(Point::new(0.0, 0.0)),
                device(Point::new(advance, 0.0)),
                device(Point::new(advance, self.font_size)),
                device(Point::new(0.0, self.font_size)),
            ];
            self.line.chars.push(TextChar { code, quad: Quad::enclosing(&corners) });

            self.text_matrix = Matrix::translation(advance, 0.0).then(&self.text_matrix);
        }
    }

    /// Advance of one glyph in text space, including character and
    /// word spacing.
    fn glyph_advance(&self, byte: u8) -> f32 {
        let glyph = match self.font {
            Some(font) => font.char_width(char::from(byte), self.font_size),
            None => DEFAULT_ADVANCE * self.font_size,
        };
        let word = if byte == b' ' { self.word_spacing } else { 0.0 };
        glyph + self.char_spacing + word
    }

    fn flush_line(&mut self) {
        if !self.line.chars.is_empty() {
            self.block.lines.push(std::mem::take(&mut self.line));
        }
    }

    fn flush_block(&mut self) {
        self.flush_line();
        if !self.block.lines.is_empty() {
            self.blocks.push(std::mem::take(&mut self.block));
        }
    }

    fn finish(mut self) -> PageText {
        self.flush_block();
        PageText { blocks: self.blocks }
    }
}

fn operand_matrix(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut values = [0.0f32; 6];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = operand.as_float().ok()?;
    }
    Some(Matrix::new(values[0], values[1], values[2], values[3], values[4], values[5]))
}

fn float_operand(operands: &[Object], index: usize) -> f32 {
    operands.get(index).and_then(|o| o.as_float().ok()).unwrap_or(0.0)
}
