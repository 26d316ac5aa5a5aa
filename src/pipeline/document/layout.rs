//! Page text rebuilt from positioned text runs.
//!
//! The content stream is walked operator by operator while the text and
//! transformation matrices are tracked, so every shown string gets a
//! user-space origin. Runs sharing a baseline become one line, left to
//! right. When a line holds several cells (runs split by a wide horizontal
//! gap), each cell is written at a character column proportional to its x
//! position. Cells drawn one by one therefore come out as whitespace-aligned
//! rows, and blank cells keep their place.

use std::collections::BTreeMap;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Glyph advance in ems for fonts without a `Widths` array.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Baselines closer than this many ems share a line.
const BASELINE_TOLERANCE: f32 = 0.5;

/// Horizontal gap in ems that separates two cells rather than two words.
const CELL_GAP: f32 = 1.0;

/// Horizontal gap in ems below which two runs belong to one word.
const WORD_GAP: f32 = 0.15;

/// Vertical gap in ems written out as a blank line.
const BLANK_LINE_GAP: f32 = 2.5;

/// Spaces written between two cells at the least.
const MIN_CELL_SPACES: usize = 2;

/// `TJ` adjustment, in thousandths of an em, that reads as a space.
const KERN_SPACE: f32 = 200.0;

/// One shown string, placed in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    /// Rendered font size.
    pub size: f32,
    /// Rendered advance width.
    pub width: f32,
    pub text: String,
}

/// Text of one page, laid out line by line from glyph positions.
pub fn page_text(doc: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    Ok(layout_text(page_runs(doc, page_id)?))
}

// ═══════════════════════════════════════════════════════════
// Content stream walk
// ═══════════════════════════════════════════════════════════

struct FontInfo<'a> {
    encoding: Option<Encoding<'a>>,
    first_char: i64,
    widths: Vec<f32>,
}

impl<'a> FontInfo<'a> {
    fn new(doc: &'a Document, font: &'a Dictionary) -> Self {
        let widths = font
            .get(b"Widths")
            .map(|w| resolve(doc, w))
            .and_then(Object::as_array)
            .map(|array| array.iter().map(|w| number(resolve(doc, w)).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        Self {
            encoding: font.get_font_encoding(doc).ok(),
            first_char: font.get(b"FirstChar").and_then(Object::as_i64).unwrap_or(0),
            widths,
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.encoding
            .as_ref()
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| bytes.iter().map(|&b| char::from(b)).collect())
    }

    /// Advance of a shown string at font size 1.
    fn advance(&self, bytes: &[u8], text: &str) -> f32 {
        if self.widths.is_empty() {
            return text.chars().count() as f32 * AVG_GLYPH_WIDTH;
        }
        bytes
            .iter()
            .map(|&b| {
                usize::try_from(i64::from(b) - self.first_char)
                    .ok()
                    .and_then(|i| self.widths.get(i))
                    .map_or(AVG_GLYPH_WIDTH, |w| w / 1000.0)
            })
            .sum()
    }
}

#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    leading: f32,
}

struct TextWalker<'a> {
    fonts: BTreeMap<Vec<u8>, FontInfo<'a>>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    runs: Vec<TextRun>,
}

impl<'a> TextWalker<'a> {
    fn new(fonts: BTreeMap<Vec<u8>, FontInfo<'a>>) -> Self {
        Self {
            fonts,
            state: GraphicsState {
                ctm: IDENTITY,
                font: None,
                font_size: 1.0,
                leading: 0.0,
            },
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            runs: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let [Object::Name(name), size] = operands {
                    self.state.font = Some(name.clone());
                    self.state.font_size = number(size).unwrap_or(self.state.font_size);
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.state.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = operands {
                    let (tx, ty) = (number(tx).unwrap_or(0.0), number(ty).unwrap_or(0.0));
                    if op.operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.next_line(tx, ty);
                }
            }
            "T*" => self.next_line(0.0, -self.state.leading),
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Tj" => self.show(operands.first().map(std::slice::from_ref).unwrap_or_default()),
            "TJ" => {
                if let Some(Ok(items)) = operands.first().map(Object::as_array) {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line(0.0, -self.state.leading);
                self.show(operands.first().map(std::slice::from_ref).unwrap_or_default());
            }
            "\"" => {
                self.next_line(0.0, -self.state.leading);
                self.show(operands.get(2).map(std::slice::from_ref).unwrap_or_default());
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translate(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn origin(&self) -> (f32, f32) {
        let m = multiply(&self.text_matrix, &self.state.ctm);
        (m[4], m[5])
    }

    fn rendered_size(&self) -> f32 {
        let m = multiply(&self.text_matrix, &self.state.ctm);
        let scale = m[2].hypot(m[3]);
        let size = if scale > 0.0 {
            self.state.font_size * scale
        } else {
            self.state.font_size
        };
        size.abs().max(1.0)
    }

    fn show(&mut self, items: &[Object]) {
        let font = self.state.font.as_ref().and_then(|name| self.fonts.get(name));
        let font_size = self.state.font_size;
        let mut text = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = match font {
                        Some(font) => font.decode(bytes),
                        None => bytes.iter().map(|&b| char::from(b)).collect(),
                    };
                    let width = match font {
                        Some(font) => font.advance(bytes, &decoded),
                        None => decoded.chars().count() as f32 * AVG_GLYPH_WIDTH,
                    };
                    advance += width * font_size;
                    text.push_str(&decoded);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        advance -= adjust / 1000.0 * font_size;
                        if adjust <= -KERN_SPACE && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    }
                }
            }
        }

        let (x, y) = self.origin();
        let size = self.rendered_size();
        self.text_matrix = multiply(&translate(advance, 0.0), &self.text_matrix);
        let (end_x, _) = self.origin();

        if !text.trim().is_empty() {
            self.runs.push(TextRun {
                x,
                y,
                size,
                width: (end_x - x).abs(),
                text,
            });
        }
    }
}

/// Every shown string on a page, in content stream order.
pub fn page_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, lopdf::Error> {
    let content = doc.get_and_decode_page_content(page_id)?;
    let fonts = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .map(|(name, font)| (name, FontInfo::new(doc, font)))
        .collect();

    let mut walker = TextWalker::new(fonts);
    for op in &content.operations {
        walker.apply(op);
    }
    Ok(walker.runs)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f32> = operands.iter().filter_map(number).collect();
    values.try_into().ok()
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// `a × b` for PDF affine matrices.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

// ═══════════════════════════════════════════════════════════
// Line layout
// ═══════════════════════════════════════════════════════════

struct Line {
    y: f32,
    size: f32,
    runs: Vec<TextRun>,
}

/// Lay runs out as text lines, top of the page first.
pub fn layout_text(mut runs: Vec<TextRun>) -> String {
    if runs.is_empty() {
        return String::new();
    }
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let origin = runs.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
    let unit = (runs.iter().map(|r| r.size).fold(f32::INFINITY, f32::min) * AVG_GLYPH_WIDTH).max(1.0);

    let mut lines: Vec<Line> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line.y - run.y).abs() <= line.size.max(run.size) * BASELINE_TOLERANCE => {
                line.size = line.size.max(run.size);
                line.runs.push(run);
            }
            _ => lines.push(Line {
                y: run.y,
                size: run.size,
                runs: vec![run],
            }),
        }
    }

    let mut out = String::new();
    let mut previous: Option<&Line> = None;
    for line in &lines {
        if let Some(above) = previous {
            if above.y - line.y > above.size.max(line.size) * BLANK_LINE_GAP {
                out.push('\n');
            }
        }
        out.push_str(&render_line(line, origin, unit));
        out.push('\n');
        previous = Some(line);
    }
    out
}

fn render_line(line: &Line, origin: f32, unit: f32) -> String {
    let mut runs: Vec<&TextRun> = line.runs.iter().collect();
    runs.sort_by(|a, b| a.x.total_cmp(&b.x));

    let gap = |left: &TextRun, right: &TextRun| right.x - (left.x + left.width);
    let column = |run: &TextRun| ((run.x - origin) / unit).round().max(0.0) as usize;
    let multi_cell = runs.windows(2).any(|pair| gap(pair[0], pair[1]) >= line.size * CELL_GAP);

    let mut out = String::new();
    let mut len = 0;
    let mut previous: Option<&TextRun> = None;
    for run in runs {
        let pad = match previous {
            None if multi_cell => column(run),
            // Indented prose keeps a single leading space.
            None => usize::from(run.x - origin >= line.size * CELL_GAP),
            Some(left) => {
                let gap = gap(left, run);
                if gap >= line.size * CELL_GAP {
                    column(run).saturating_sub(len).max(MIN_CELL_SPACES)
                } else if gap > line.size * WORD_GAP && !out.ends_with(' ') && !run.text.starts_with(' ') {
                    1
                } else {
                    0
                }
            }
        };
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(&run.text);
        len += pad + run.text.chars().count();
        previous = Some(run);
    }
    out
}
