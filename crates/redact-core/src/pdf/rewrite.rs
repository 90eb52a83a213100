//! Glyph removal by content-stream rewriting
//!
//! Every glyph whose box touches a removal rectangle is dropped from its
//! text-showing operator. The space it occupied is replaced by a `TJ`
//! positioning number, so glyphs after it stay where they were.

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::Object;

use super::fonts::GLYPH_UNITS;
use super::text::{Piece, ShownText};
use crate::geometry::Rect;

/// Horizontal overlap a glyph needs before it counts as covered
const MIN_OVERLAP: f64 = 0.01;

fn is_covered(bbox: &Rect, rects: &[Rect]) -> bool {
    rects
        .iter()
        .any(|r| bbox.horizontal_overlap(r) > MIN_OVERLAP && bbox.vertical_overlap(r) > 0.0)
}

/// Result of a removal pass over one page
#[derive(Debug)]
pub(crate) struct Rewrite {
    pub operations: Vec<Operation>,
    pub removed_glyphs: usize,
}

/// Drop every glyph of `shown` covered by one of `rects` from `ops`
pub(crate) fn remove_glyphs(ops: &[Operation], shown: &[ShownText], rects: &[Rect]) -> Rewrite {
    let by_op: HashMap<usize, &ShownText> = shown.iter().map(|s| (s.op_index, s)).collect();
    let mut operations = Vec::with_capacity(ops.len());
    let mut removed_glyphs = 0;

    for (index, op) in ops.iter().enumerate() {
        let Some(text) = by_op.get(&index) else {
            operations.push(op.clone());
            continue;
        };

        let covered: Vec<bool> = text.glyphs().map(|g| is_covered(&g.bbox, rects)).collect();
        let count = covered.iter().filter(|c| **c).count();
        if count == 0 {
            operations.push(op.clone());
            continue;
        }

        removed_glyphs += count;
        operations.extend(rewrite_operation(op, text, &covered));
    }

    Rewrite {
        operations,
        removed_glyphs,
    }
}

/// Replacement operators for `op` with the `covered` glyphs removed
fn rewrite_operation(op: &Operation, text: &ShownText, covered: &[bool]) -> Vec<Operation> {
    let show = Operation::new("TJ", vec![Object::Array(kept_items(text, covered))]);

    match op.operator.as_str() {
        "'" => vec![Operation::new("T*", vec![]), show],
        "\"" => {
            let word_spacing = op.operands.first().cloned().unwrap_or(Object::Integer(0));
            let char_spacing = op.operands.get(1).cloned().unwrap_or(Object::Integer(0));
            vec![
                Operation::new("Tw", vec![word_spacing]),
                Operation::new("Tc", vec![char_spacing]),
                Operation::new("T*", vec![]),
                show,
            ]
        }
        _ => vec![show],
    }
}

/// `TJ` array items: kept glyph bytes, original adjustments, and a
/// positioning number in place of every removed stretch
fn kept_items(text: &ShownText, covered: &[bool]) -> Vec<Object> {
    let scale = text.font_size * text.h_scale;
    let mut items = Vec::new();
    let mut kept: Vec<u8> = Vec::new();
    let mut gap = 0.0;
    let mut glyph_index = 0;

    let flush_kept = |kept: &mut Vec<u8>, items: &mut Vec<Object>| {
        if !kept.is_empty() {
            items.push(Object::String(std::mem::take(kept), text.format.clone()));
        }
    };
    // With a zero scale no number can encode the gap; removed glyphs advance
    // nothing visible anyway
    let flush_gap = |gap: &mut f64, items: &mut Vec<Object>| {
        if *gap != 0.0 && scale != 0.0 {
            items.push(Object::Real((-*gap * GLYPH_UNITS / scale) as f32));
        }
        *gap = 0.0;
    };

    for piece in &text.pieces {
        match piece {
            Piece::Glyph(glyph) => {
                if covered.get(glyph_index).copied().unwrap_or(false) {
                    flush_kept(&mut kept, &mut items);
                    gap += glyph.advance;
                } else {
                    flush_gap(&mut gap, &mut items);
                    kept.extend_from_slice(&glyph.glyph.bytes);
                }
                glyph_index += 1;
            }
            Piece::Adjust(adjust) => {
                flush_kept(&mut kept, &mut items);
                flush_gap(&mut gap, &mut items);
                items.push(adjust.clone());
            }
        }
    }
    flush_kept(&mut kept, &mut items);
    flush_gap(&mut gap, &mut items);

    items
}
