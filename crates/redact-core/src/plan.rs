//! Per-page redaction planning
//!
//! Planning is pure: it reads runs, asks the detectors for spans, maps each
//! span to a rectangle and records it. Nothing touches the document until
//! the plan is handed to the applicator.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{Category, RedactionConfig, RenderStyle};
use crate::detect::DetectorSet;
use crate::error::Result;
use crate::geometry::Rect;
use crate::layout::{page_runs, TextBlock};
use crate::mapper::span_to_rect;

/// A rectangle scheduled for removal and/or marking
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionRegion {
    pub rect: Rect,
    /// Matched length in characters
    pub span_length: usize,
    pub category: Category,
    pub style: Option<RenderStyle>,
}

/// Every region found on one page, in run encounter order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub page_number: u32,
    pub regions: Vec<RedactionRegion>,
}

impl PagePlan {
    pub fn new(page_number: u32) -> Self {
        Self {
            page_number,
            regions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn count_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for region in &self.regions {
            *counts.entry(region.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Build the plan for one page.
///
/// Regions are neither merged nor deduplicated; overlapping regions from
/// different detectors are all kept.
pub fn plan_page(
    page_number: u32,
    blocks: &[TextBlock],
    detectors: &DetectorSet,
    config: &RedactionConfig,
) -> Result<PagePlan> {
    let mut plan = PagePlan::new(page_number);

    if config.categories().is_empty() {
        return Ok(plan);
    }

    for run in page_runs(blocks) {
        if run.text.is_empty() {
            continue;
        }

        for span in detectors.detect(&run.text, config.categories())? {
            let Some(rect) = span_to_rect(run, &span) else {
                continue;
            };
            debug!(
                page = page_number,
                category = %span.category,
                start = span.start,
                end = span.end,
                "Planned region"
            );
            plan.regions.push(RedactionRegion {
                rect,
                span_length: span.len(),
                category: span.category,
                style: config.style(),
            });
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionOptions;
    use crate::detect::{EmailDetector, Entity, EntityDetector, EntityRecognizer, PhoneDetector};
    use crate::layout::{TextLine, TextRun};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct EveryWord;

    impl EntityRecognizer for EveryWord {
        fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
            let mut entities = Vec::new();
            let mut offset = 0;
            for word in text.split(' ') {
                let len = word.chars().count();
                entities.push(Entity::new(offset, offset + len, "PERSON"));
                offset += len + 1;
            }
            Ok(entities)
        }
    }

    struct Fixed(Vec<Entity>);

    impl EntityRecognizer for Fixed {
        fn recognize(&self, _text: &str) -> Result<Vec<Entity>> {
            Ok(self.0.clone())
        }
    }

    fn single_run_page(text: &str, bbox: Rect) -> Vec<TextBlock> {
        vec![TextBlock {
            lines: vec![TextLine {
                runs: vec![TextRun::new(text, bbox)],
            }],
        }]
    }

    fn email_phone_setup(options: RedactionOptions) -> (DetectorSet, RedactionConfig) {
        let config = RedactionConfig::from(&options);
        let detectors = DetectorSet::from_config(&config, None).unwrap();
        (detectors, config)
    }

    #[test]
    fn test_email_and_phone_regions() {
        let text = "Email: john.doe@example.com Phone: +1-555-123-4567";
        // 50 characters over 500 units: 10 units per character
        let blocks = single_run_page(text, Rect::new(0.0, 100.0, 500.0, 112.0));
        let (detectors, config) = email_phone_setup(RedactionOptions {
            mask_email: true,
            mask_phone: true,
            style_black: true,
            ..Default::default()
        });

        let plan = plan_page(1, &blocks, &detectors, &config).unwrap();

        assert_eq!(
            plan.regions,
            vec![
                RedactionRegion {
                    rect: Rect::new(70.0, 100.0, 270.0, 112.0),
                    span_length: 20,
                    category: Category::Email,
                    style: Some(RenderStyle::Blackout),
                },
                RedactionRegion {
                    rect: Rect::new(350.0, 100.0, 500.0, 112.0),
                    span_length: 15,
                    category: Category::Phone,
                    style: Some(RenderStyle::Blackout),
                },
            ]
        );
    }

    #[test]
    fn test_no_categories_no_regions() {
        let blocks = single_run_page("a@b.co", Rect::new(0.0, 0.0, 60.0, 10.0));
        let (detectors, config) = email_phone_setup(RedactionOptions::default());
        let plan = plan_page(1, &blocks, &detectors, &config).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_empty_runs_are_skipped() {
        let blocks = single_run_page("", Rect::new(0.0, 0.0, 0.0, 10.0));
        let (detectors, config) = email_phone_setup(RedactionOptions {
            mask_email: true,
            ..Default::default()
        });
        let plan = plan_page(1, &blocks, &detectors, &config).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_entity_regions_never_single_char() {
        let options = RedactionOptions {
            mask_person: true,
            ..Default::default()
        };
        let config = RedactionConfig::from(&options);
        let mut detectors = DetectorSet::new();
        detectors.push(Box::new(EntityDetector::new(Box::new(EveryWord))));

        let blocks = single_run_page("A Bob C Dee", Rect::new(0.0, 0.0, 110.0, 10.0));
        let plan = plan_page(2, &blocks, &detectors, &config).unwrap();

        let lengths: Vec<usize> = plan.regions.iter().map(|r| r.span_length).collect();
        assert_eq!(lengths, vec![3, 3]);
        assert!(plan.regions.iter().all(|r| r.rect.width() > 10.0));
    }

    #[test]
    fn test_overlapping_regions_are_kept() {
        let options = RedactionOptions {
            mask_email: true,
            ..Default::default()
        };
        let config = RedactionConfig::from(&options);
        let mut detectors = DetectorSet::new();
        detectors.push(Box::new(EmailDetector::new()));
        detectors.push(Box::new(EmailDetector::new()));
        detectors.push(Box::new(PhoneDetector::new()));

        let blocks = single_run_page("x@y.org", Rect::new(0.0, 0.0, 70.0, 10.0));
        let plan = plan_page(1, &blocks, &detectors, &config).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.regions[0], plan.regions[1]);
    }

    #[test]
    fn test_regions_follow_run_order() {
        let rect_a = Rect::new(0.0, 700.0, 60.0, 710.0);
        let rect_b = Rect::new(0.0, 680.0, 60.0, 690.0);
        let blocks = vec![
            TextBlock {
                lines: vec![TextLine {
                    runs: vec![TextRun::new("b@c.de", rect_a)],
                }],
            },
            TextBlock {
                lines: vec![TextLine {
                    runs: vec![TextRun::new("e@f.gh", rect_b)],
                }],
            },
        ];
        let (detectors, config) = email_phone_setup(RedactionOptions {
            mask_email: true,
            style_star: true,
            ..Default::default()
        });
        let plan = plan_page(1, &blocks, &detectors, &config).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.regions[0].rect, rect_a);
        assert_eq!(plan.regions[1].rect, rect_b);
        assert_eq!(plan.count_by_category().get(&Category::Email), Some(&2));
    }

    proptest! {
        /// Property: an entity covering at most one character never becomes a region
        #[test]
        fn short_entities_never_planned(
            spans in proptest::collection::vec((0usize..40, 0usize..4), 0..20),
        ) {
            let text = "x".repeat(40);
            let entities: Vec<Entity> = spans
                .iter()
                .map(|(start, len)| Entity::new(*start, start + len, "PERSON"))
                .collect();
            let expected = spans
                .iter()
                .filter(|(start, len)| *len > 1 && start + len <= 40)
                .count();

            let options = RedactionOptions {
                mask_person: true,
                ..Default::default()
            };
            let config = RedactionConfig::from(&options);
            let mut detectors = DetectorSet::new();
            detectors.push(Box::new(EntityDetector::new(Box::new(Fixed(entities)))));

            let blocks = single_run_page(&text, Rect::new(0.0, 0.0, 400.0, 10.0));
            let plan = plan_page(1, &blocks, &detectors, &config).unwrap();

            prop_assert_eq!(plan.len(), expected);
            prop_assert!(plan.regions.iter().all(|r| r.span_length > 1));
        }
    }
}
