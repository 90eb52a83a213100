//! Character span → page rectangle
//!
//! Uses a monospace-proportional approximation: every character of a run is
//! assumed to be `run_width / char_count` wide. For proportional fonts the
//! rectangle drifts from the real glyph positions; the removal pass
//! compensates by clearing every glyph the rectangle touches.

use crate::detect::Match;
use crate::geometry::Rect;
use crate::layout::TextRun;

/// Rectangle covering characters `span.start..span.end` of `run`.
///
/// Returns `None` for empty runs and for spans outside the run text.
/// The result keeps the run's vertical extent and stays inside its box.
pub fn span_to_rect(run: &TextRun, span: &Match) -> Option<Rect> {
    let len = run.char_len();
    if len == 0 || !span.is_valid_for(len) {
        return None;
    }

    let bbox = &run.bbox;
    let char_width = (bbox.x1 - bbox.x0) / len as f64;

    Some(Rect {
        x0: bbox.x0 + span.start as f64 * char_width,
        y0: bbox.y0,
        x1: bbox.x0 + span.end as f64 * char_width,
        y1: bbox.y1,
    })
}
