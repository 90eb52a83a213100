use std::collections::BTreeMap;

use serde::Serialize;

use crate::apply::ApplySummary;
use crate::config::Category;
use crate::plan::PagePlan;

/// What happened on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub page_number: u32,
    /// Regions planned on the page, degenerate ones included
    pub regions: usize,
    pub skipped_degenerate: usize,
    pub by_category: BTreeMap<Category, usize>,
}

impl PageReport {
    pub fn new(plan: &PagePlan, summary: &ApplySummary) -> Self {
        Self {
            page_number: plan.page_number,
            regions: plan.len(),
            skipped_degenerate: summary.skipped_degenerate,
            by_category: plan.count_by_category(),
        }
    }
}

/// Outcome of one document transformation
#[derive(Debug, Clone, Serialize)]
pub struct RedactionReport {
    pub input_size_bytes: u64,
    pub output_size_bytes: u64,
    pub page_count: u32,
    pub processing_time_ms: u64,
    pub total_regions: usize,
    pub pages: Vec<PageReport>,
}

impl RedactionReport {
    pub fn new(pages: Vec<PageReport>) -> Self {
        Self {
            input_size_bytes: 0,
            output_size_bytes: 0,
            page_count: pages.len() as u32,
            processing_time_ms: 0,
            total_regions: pages.iter().map(|p| p.regions).sum(),
            pages,
        }
    }

    pub fn page(&self, page_number: u32) -> Option<&PageReport> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    /// Region counts per category across all pages
    pub fn totals_by_category(&self) -> BTreeMap<Category, usize> {
        let mut totals = BTreeMap::new();
        for page in &self.pages {
            for (category, count) in &page.by_category {
                *totals.entry(*category).or_insert(0) += count;
            }
        }
        totals
    }
}
