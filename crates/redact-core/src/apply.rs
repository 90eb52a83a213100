//! Apply a page plan to a drawing surface
//!
//! The applicator is the only phase with side effects. It talks to the page
//! through [`RedactionSurface`], so tests can record calls instead of
//! editing a PDF.

use tracing::debug;

use crate::config::{RedactionConfig, RenderStyle};
use crate::error::Result;
use crate::geometry::{Color, Point, Rect};
use crate::plan::PagePlan;

/// Placeholder glyph for the star style
pub const STAR_GLYPH: char = '*';
/// Font size of the placeholder glyphs
pub const STAR_FONT_SIZE: f64 = 12.0;
/// One placeholder glyph per this many units of region width
pub const STAR_SPACING: f64 = 10.0;
/// Baseline of the placeholder glyphs, as a fraction of region height above the lower edge
pub const STAR_BASELINE_RATIO: f64 = 0.2;

pub const FRAME_COLOR: Color = Color::RED;
pub const FRAME_WIDTH: f64 = 1.0;
pub const BLACKOUT_COLOR: Color = Color::BLACK;

/// Page operations the applicator needs
pub trait RedactionSurface {
    /// Queue destructive removal of everything under `rect`
    fn remove_content(&mut self, rect: Rect) -> Result<()>;

    fn fill(&mut self, rect: Rect, color: Color) -> Result<()>;

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) -> Result<()>;

    fn draw_text(&mut self, origin: Point, text: &str, font_size: f64) -> Result<()>;

    /// Execute every queued removal as one batch
    fn commit_removals(&mut self) -> Result<()>;
}

/// Outcome of applying one page plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub removed: usize,
    pub skipped_degenerate: usize,
}

/// Number of placeholder glyphs for a region `width` units wide
pub fn star_count(width: f64) -> usize {
    ((width / STAR_SPACING).floor() as usize).max(1)
}

/// Apply `plan` to `surface`.
///
/// Regions are processed in plan order. Blackout and Star (and Frame when
/// `secure_frame` is set) queue a removal; all removals are committed
/// together once the page's regions are drawn. A region without a style
/// is removed without any visual marking.
pub fn apply_plan<S: RedactionSurface + ?Sized>(
    surface: &mut S,
    plan: &PagePlan,
    config: &RedactionConfig,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();

    for region in &plan.regions {
        let rect = region.rect;
        if rect.is_degenerate() {
            debug!(page = plan.page_number, ?rect, "Skipping degenerate region");
            summary.skipped_degenerate += 1;
            continue;
        }

        if config.removes_content(region.style) {
            surface.remove_content(rect)?;
            summary.removed += 1;
        }

        match region.style {
            Some(RenderStyle::Blackout) => surface.fill(rect, BLACKOUT_COLOR)?,
            Some(RenderStyle::Frame) => surface.stroke_rect(rect, FRAME_COLOR, FRAME_WIDTH)?,
            Some(RenderStyle::Star) => {
                let stars: String = std::iter::repeat(STAR_GLYPH)
                    .take(star_count(rect.width()))
                    .collect();
                let origin = Point::new(rect.x0, rect.y0 + rect.height() * STAR_BASELINE_RATIO);
                surface.draw_text(origin, &stars, STAR_FONT_SIZE)?;
            }
            None => {}
        }

        summary.applied += 1;
    }

    if summary.removed > 0 {
        surface.commit_removals()?;
    }

    Ok(summary)
}
