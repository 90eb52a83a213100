//! Document driver
//!
//! Runs every page through extract → plan → apply, then persists the
//! document once. Pages are processed strictly in order. Any error aborts
//! the whole document; since nothing is written until the last page is
//! done, a failed run never leaves an output file behind.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::apply::apply_plan;
use crate::config::RedactionConfig;
use crate::detect::{DetectorSet, EntityRecognizer};
use crate::error::{RedactError, Result};
use crate::layout::page_runs;
use crate::pdf::{PdfDocument, PdfPage};
use crate::plan::plan_page;
use crate::report::{PageReport, RedactionReport};

/// A configured redaction engine, reusable across documents
pub struct Redactor {
    config: RedactionConfig,
    detectors: DetectorSet,
}

impl Redactor {
    pub fn new(config: RedactionConfig, detectors: DetectorSet) -> Self {
        Self { config, detectors }
    }

    /// Build the detectors `config` asks for
    pub fn from_config(
        config: RedactionConfig,
        recognizer: Option<Box<dyn EntityRecognizer>>,
    ) -> Result<Self> {
        let detectors = DetectorSet::from_config(&config, recognizer)?;
        Ok(Self::new(config, detectors))
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Redact `input` into `output`. `output` is only created on success.
    pub fn redact_file(&self, input: &Path, output: &Path) -> Result<RedactionReport> {
        let started = Instant::now();
        let mut document = PdfDocument::open(input)?;
        if is_same_file(input, output) {
            return Err(RedactError::Config(format!(
                "Output path {} would overwrite the input",
                output.display()
            )));
        }
        let input_size = std::fs::metadata(input)?.len();

        let pages = self.redact_document(&mut document)?;
        let output_size = document.save(output)?;
        document.close();

        let mut report = RedactionReport::new(pages);
        report.input_size_bytes = input_size;
        report.output_size_bytes = output_size;
        report.processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            input = %input.display(),
            output = %output.display(),
            regions = report.total_regions,
            ms = report.processing_time_ms,
            "Redacted document"
        );
        Ok(report)
    }

    /// In-memory variant of [`Redactor::redact_file`]
    pub fn redact_bytes(&self, input: &[u8]) -> Result<(Vec<u8>, RedactionReport)> {
        let started = Instant::now();
        let mut document = PdfDocument::from_bytes(input)?;
        let pages = self.redact_document(&mut document)?;
        let output = document.to_bytes()?;

        let mut report = RedactionReport::new(pages);
        report.input_size_bytes = input.len() as u64;
        report.output_size_bytes = output.len() as u64;
        report.processing_time_ms = started.elapsed().as_millis() as u64;
        Ok((output, report))
    }

    /// Redact every page of an open document in place
    pub fn redact_document(&self, document: &mut PdfDocument) -> Result<Vec<PageReport>> {
        let mut reports = Vec::with_capacity(document.page_count());
        for number in document.page_numbers() {
            let mut page = document.page(number)?;
            reports.push(self.redact_page(&mut page)?);
        }
        Ok(reports)
    }

    fn redact_page(&self, page: &mut PdfPage<'_>) -> Result<PageReport> {
        let number = page.number();

        let blocks = page.text_structure()?;
        debug!(page = number, runs = page_runs(&blocks).count(), "Extracted");

        let plan = plan_page(number, &blocks, &self.detectors, &self.config)?;
        debug!(page = number, regions = plan.len(), "Planned");

        let summary = apply_plan(page, &plan, &self.config)?;
        debug!(
            page = number,
            applied = summary.applied,
            removed = summary.removed,
            skipped = summary.skipped_degenerate,
            "Applied"
        );

        Ok(PageReport::new(&plan, &summary))
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
