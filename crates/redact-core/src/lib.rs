//! Sensitive-text redaction for PDF documents
//!
//! Pages are processed in two phases:
//! - planning is pure: detectors scan each text run, matched character spans
//!   are mapped to rectangles proportionally to the run's bounding box
//! - applying is the only phase with side effects: the glyphs under each
//!   rectangle are removed from the content stream and the region is marked
//!   with a solid fill, an outline or a row of `*` placeholders
//!
//! ```no_run
//! use std::path::Path;
//! use redact_core::{redact_file, RedactionOptions};
//!
//! let options = RedactionOptions {
//!     mask_email: true,
//!     mask_phone: true,
//!     style_black: true,
//!     ..Default::default()
//! };
//! let report = redact_file(Path::new("in.pdf"), Path::new("out.pdf"), &options)?;
//! println!("{} regions redacted", report.total_regions);
//! # Ok::<(), redact_core::RedactError>(())
//! ```

pub mod apply;
pub mod config;
pub mod detect;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod mapper;
pub mod pdf;
pub mod plan;
pub mod report;

use std::path::Path;

pub use apply::{apply_plan, ApplySummary, RedactionSurface};
pub use config::{Category, CategorySet, RedactionConfig, RedactionOptions, RenderStyle};
pub use detect::{
    Detector, DetectorSet, Entity, EntityRecognizer, GazetteerRecognizer, Match,
};
pub use driver::Redactor;
pub use error::{RedactError, Result};
pub use geometry::{Color, Point, Rect};
pub use layout::{TextBlock, TextLine, TextRun};
pub use mapper::span_to_rect;
pub use pdf::{PdfDocument, PdfPage};
pub use plan::{plan_page, PagePlan, RedactionRegion};
pub use report::{PageReport, RedactionReport};

/// Redact `input` into `output` with the pattern detectors only.
///
/// Entity categories need a recognizer; use [`Redactor::from_config`] for those.
pub fn redact_file(
    input: &Path,
    output: &Path,
    options: &RedactionOptions,
) -> Result<RedactionReport> {
    Redactor::from_config(RedactionConfig::from(options), None)?.redact_file(input, output)
}

/// In-memory variant of [`redact_file`]
pub fn redact_bytes(input: &[u8], options: &RedactionOptions) -> Result<Vec<u8>> {
    let (output, _) =
        Redactor::from_config(RedactionConfig::from(options), None)?.redact_bytes(input)?;
    Ok(output)
}

/// Number of pages in a PDF
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    Ok(PdfDocument::from_bytes(bytes)?.page_count() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_categories_need_recognizer() {
        let options = RedactionOptions {
            mask_person: true,
            ..Default::default()
        };
        let err = redact_bytes(b"%PDF-1.7", &options).unwrap_err();
        assert!(matches!(err, RedactError::Config(_)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = get_page_count(b"not a pdf").unwrap_err();
        assert!(err.is_open_error());
    }
}
