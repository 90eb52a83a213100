//! Content-stream text layout
//!
//! Walks a page's operators with the graphics and text state machine and
//! places every shown glyph in user space. Extraction and removal both work
//! from the same placement, so a glyph the extractor reports inside a run is
//! exactly the glyph the removal pass can see.

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use super::fonts::{DecodedGlyph, FontMetrics, GLYPH_UNITS};
use super::number;
use crate::geometry::{Matrix, Point, Rect};
use crate::layout::{TextBlock, TextLine, TextRun};

/// Font resources of a page keyed by resource name
pub(crate) type FontSet = HashMap<Vec<u8>, FontMetrics>;

/// Glyph box extent below and above the baseline, in em
const DESCENT: f64 = 0.2;
const ASCENT: f64 = 0.8;

/// Baselines closer than this belong to the same line
const LINE_TOLERANCE: f64 = 1.0;

/// Strings closer than this (in em) continue the previous run
const RUN_JOIN_GAP: f64 = 0.3;
/// A join gap at least this wide (in em) reads as a word break
const WORD_GAP: f64 = 0.15;

/// A glyph positioned on the page
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedGlyph {
    pub glyph: DecodedGlyph,
    /// Horizontal displacement in text space, spacing and scaling included
    pub advance: f64,
    pub bbox: Rect,
    pub origin: Point,
}

/// Element of a text-showing operator, in operand order
#[derive(Debug, Clone)]
pub(crate) enum Piece {
    Glyph(PlacedGlyph),
    /// A `TJ` positioning number, kept verbatim
    Adjust(Object),
}

/// Everything one text-showing operator put on the page
#[derive(Debug, Clone)]
pub(crate) struct ShownText {
    pub op_index: usize,
    /// Index of the enclosing `BT … ET` object
    pub block: usize,
    /// Font resource name selected by `Tf`
    pub font: Option<Vec<u8>>,
    pub pieces: Vec<Piece>,
    pub format: StringFormat,
    pub font_size: f64,
    pub h_scale: f64,
}

impl ShownText {
    pub fn glyphs(&self) -> impl Iterator<Item = &PlacedGlyph> {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Glyph(g) => Some(g),
            Piece::Adjust(_) => None,
        })
    }

    pub fn text(&self) -> String {
        self.glyphs().map(|g| g.glyph.text.as_str()).collect()
    }

    /// Union of the glyph boxes, `None` when nothing was shown
    pub fn bbox(&self) -> Option<Rect> {
        self.glyphs()
            .map(|g| g.bbox)
            .reduce(|acc, bbox| acc.union(&bbox))
    }
}

#[derive(Debug, Clone)]
struct TextParams {
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Graphics state saved by `q` and restored by `Q`
#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextParams,
}

struct TextWalker<'a> {
    fonts: &'a FontSet,
    fallback: FontMetrics,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    block: usize,
    shown: Vec<ShownText>,
}

impl<'a> TextWalker<'a> {
    fn new(fonts: &'a FontSet) -> Self {
        Self {
            fonts,
            fallback: FontMetrics::default(),
            state: GraphicsState::default(),
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            block: 0,
            shown: Vec::new(),
        }
    }

    fn step(&mut self, index: usize, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);
        let text = &mut self.state.text;

        match op.operator.as_str() {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.saved.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
                self.block += 1;
            }
            "Tf" => {
                text.font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| n.to_vec());
                text.size = num(1).unwrap_or(0.0);
            }
            "Tc" => text.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => text.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => text.h_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => text.leading = num(0).unwrap_or(0.0),
            "Ts" => text.rise = num(0).unwrap_or(0.0),
            "Td" => self.next_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                text.leading = -ty;
                self.next_line(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(0.0, -self.state.text.leading),
            "Tj" | "TJ" => self.show(index, operands.first()),
            "'" => {
                self.next_line(0.0, -self.state.text.leading);
                self.show(index, operands.first());
            }
            "\"" => {
                text.word_spacing = num(0).unwrap_or(0.0);
                text.char_spacing = num(1).unwrap_or(0.0);
                self.next_line(0.0, -self.state.text.leading);
                self.show(index, operands.get(2));
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn font(&self) -> &FontMetrics {
        self.state
            .text
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&self.fallback)
    }

    fn show(&mut self, op_index: usize, operand: Option<&Object>) {
        let Some(operand) = operand else {
            return;
        };
        let items: Vec<&Object> = match operand {
            Object::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let params = self.state.text.clone();
        let mut format = StringFormat::Literal;
        let mut pieces = Vec::new();

        for item in items {
            match item {
                Object::String(bytes, string_format) => {
                    format = string_format.clone();
                    for glyph in self.font().decode(bytes) {
                        pieces.push(Piece::Glyph(self.place(glyph, &params)));
                    }
                }
                other => {
                    if let Some(n) = number(other) {
                        let tx = -n / GLYPH_UNITS * params.size * params.h_scale;
                        self.tm = Matrix::translate(tx, 0.0).multiply(&self.tm);
                        pieces.push(Piece::Adjust(other.clone()));
                    }
                }
            }
        }

        self.shown.push(ShownText {
            op_index,
            block: self.block,
            font: params.font.clone(),
            pieces,
            format,
            font_size: params.size,
            h_scale: params.h_scale,
        });
    }

    /// Position `glyph` at the current text matrix and advance past it
    fn place(&mut self, glyph: DecodedGlyph, params: &TextParams) -> PlacedGlyph {
        let rendering = Matrix::new(
            params.size * params.h_scale,
            0.0,
            0.0,
            params.size,
            0.0,
            params.rise,
        )
        .multiply(&self.tm)
        .multiply(&self.state.ctm);

        let em_width = glyph.width / GLYPH_UNITS;
        let bbox = rendering.transform_rect(&Rect::new(0.0, -DESCENT, em_width, ASCENT));
        let origin = rendering.transform(0.0, 0.0);

        let spacing = params.char_spacing
            + if glyph.is_word_space() {
                params.word_spacing
            } else {
                0.0
            };
        let advance = (em_width * params.size + spacing) * params.h_scale;
        self.tm = Matrix::translate(advance, 0.0).multiply(&self.tm);

        PlacedGlyph {
            glyph,
            advance,
            bbox,
            origin,
        }
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f64> = operands.iter().filter_map(number).collect();
    match values.as_slice() {
        [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

/// Place every glyph shown by `ops`, one entry per text-showing operator
pub(crate) fn layout_operations(ops: &[Operation], fonts: &FontSet) -> Vec<ShownText> {
    let mut walker = TextWalker::new(fonts);
    for (index, op) in ops.iter().enumerate() {
        walker.step(index, op);
    }
    walker.shown
}

/// End of the run most recently added by [`group_runs`]
struct RunTail<'a> {
    font: Option<&'a [u8]>,
    font_size: f64,
    baseline: f64,
    end_x: f64,
    em: f64,
    ends_with_space: bool,
}

impl<'a> RunTail<'a> {
    fn new(item: &'a ShownText, last: &PlacedGlyph) -> Self {
        Self {
            font: item.font.as_deref(),
            font_size: item.font_size,
            baseline: last.origin.y,
            end_x: last.bbox.x1,
            em: last.bbox.height(),
            ends_with_space: last.glyph.text.ends_with(char::is_whitespace),
        }
    }

    /// Separator for appending `item` to this run, `None` when `item`
    /// starts a new run
    fn joiner(&self, item: &ShownText, first: &PlacedGlyph) -> Option<&'static str> {
        if self.font != item.font.as_deref()
            || (self.font_size - item.font_size).abs() > f64::EPSILON
            || (first.origin.y - self.baseline).abs() > LINE_TOLERANCE
            || self.em <= 0.0
        {
            return None;
        }
        let gap = (first.bbox.x0 - self.end_x) / self.em;
        if gap.abs() > RUN_JOIN_GAP {
            None
        } else if gap >= WORD_GAP
            && !self.ends_with_space
            && !first.glyph.text.starts_with(char::is_whitespace)
        {
            Some(" ")
        } else {
            Some("")
        }
    }
}

/// Group shown text into blocks (one per text object), lines (by baseline)
/// and runs.
///
/// Consecutive strings of one text object continue the same run when they
/// share font, size and baseline and the gap between them is under
/// [`RUN_JOIN_GAP`] em, so text split across several operators is scanned
/// as a whole.
pub(crate) fn group_runs(shown: &[ShownText]) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current_block = None;
    let mut baseline = f64::NAN;
    let mut tail: Option<RunTail<'_>> = None;

    for item in shown {
        let Some(bbox) = item.bbox() else {
            continue;
        };
        let (Some(first), Some(last)) = (item.glyphs().next(), item.glyphs().last()) else {
            continue;
        };
        let text = item.text();

        if current_block != Some(item.block) {
            current_block = Some(item.block);
            baseline = first.origin.y;
            blocks.push(TextBlock {
                lines: vec![TextLine {
                    runs: vec![TextRun::new(text, bbox)],
                }],
            });
            tail = Some(RunTail::new(item, last));
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            continue;
        };
        if (first.origin.y - baseline).abs() > LINE_TOLERANCE {
            baseline = first.origin.y;
            block.lines.push(TextLine {
                runs: vec![TextRun::new(text, bbox)],
            });
        } else if let Some(line) = block.lines.last_mut() {
            let joiner = tail.as_ref().and_then(|t| t.joiner(item, first));
            match (joiner, line.runs.last_mut()) {
                (Some(separator), Some(run)) => {
                    run.text.push_str(separator);
                    run.text.push_str(&text);
                    run.bbox = run.bbox.union(&bbox);
                }
                _ => line.runs.push(TextRun::new(text, bbox)),
            }
        }
        tail = Some(RunTail::new(item, last));
    }

    blocks
}
