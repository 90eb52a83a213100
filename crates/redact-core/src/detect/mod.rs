//! Sensitive-text detectors
//!
//! Every detector scans the text of a single run and reports character
//! spans. Three kinds exist:
//! - pattern detectors (email, street address): every non-overlapping regex match
//! - the validated phone detector: pattern candidates that pass a plausibility check
//! - the entity detector: spans reported by an [`EntityRecognizer`] model
//!
//! Spans are non-overlapping within one detector but may overlap across
//! detectors; nothing downstream depends on them being disjoint.

mod entity;
mod patterns;
mod phone;

pub use entity::{Entity, EntityDetector, EntityRecognizer, GazetteerRecognizer};
pub use patterns::{AddressDetector, EmailDetector, NationalIdDetector};
pub use phone::PhoneDetector;

use tracing::warn;

use crate::config::{Category, CategorySet, RedactionConfig};
use crate::error::{RedactError, Result};

/// A detected span within a run's text, in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

impl Match {
    pub fn new(start: usize, end: usize, category: Category) -> Self {
        Self {
            start,
            end,
            category,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `0 <= start < end <= text_len`
    pub fn is_valid_for(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }
}

/// Trait for sensitive-text finders
pub trait Detector: Send + Sync {
    /// Detector identifier, used in logs and errors
    fn name(&self) -> &'static str;

    /// Categories this detector can report
    fn categories(&self) -> &[Category];

    /// Scan `text`, reporting spans only for categories in `enabled`
    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>>;

    /// Whether the detector calls out to an external model
    fn is_model_backed(&self) -> bool {
        false
    }
}

/// Convert a byte range of `text` into a character range
pub(crate) fn char_span(text: &str, byte_start: usize, byte_end: usize) -> (usize, usize) {
    let start = text[..byte_start].chars().count();
    let len = text[byte_start..byte_end].chars().count();
    (start, start + len)
}

/// Ordered collection of detectors run against each text run
#[derive(Default)]
pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
    isolate_model_failures: bool,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the detectors `config` enables, in the order email, phone,
    /// address, national id, entities.
    pub fn from_config(
        config: &RedactionConfig,
        recognizer: Option<Box<dyn EntityRecognizer>>,
    ) -> Result<Self> {
        let mut set = DetectorSet::new().with_isolation(config.isolate_entity_failures());

        if config.is_enabled(Category::Email) {
            set.push(Box::new(EmailDetector::new()));
        }
        if config.is_enabled(Category::Phone) {
            set.push(Box::new(PhoneDetector::new()));
        }
        if config.is_enabled(Category::Address) {
            set.push(Box::new(AddressDetector::new()));
        }
        if config.is_enabled(Category::NationalId) {
            set.push(Box::new(NationalIdDetector::new()));
        }
        if config.needs_entity_recognizer() {
            let recognizer = recognizer.ok_or_else(|| {
                RedactError::Config(
                    "entity categories enabled but no entity recognizer configured".into(),
                )
            })?;
            set.push(Box::new(EntityDetector::new(recognizer)));
        } else if let Some(recognizer) = recognizer {
            // An address-labelling model still contributes when only addresses are on
            if config.is_enabled(Category::Address) {
                set.push(Box::new(EntityDetector::new(recognizer)));
            }
        }

        Ok(set)
    }

    pub fn with_isolation(mut self, isolate: bool) -> Self {
        self.isolate_model_failures = isolate;
        self
    }

    pub fn push(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run every detector over `text`, concatenating results in detector order
    pub fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        let mut matches = Vec::new();

        for detector in &self.detectors {
            if !detector.categories().iter().any(|c| enabled.contains(c)) {
                continue;
            }

            match detector.detect(text, enabled) {
                Ok(found) => matches.extend(found),
                Err(err) if self.isolate_model_failures && detector.is_model_backed() => {
                    warn!(
                        detector = detector.name(),
                        error = %err,
                        "Skipping entity detection for run"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionOptions;

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn recognize(&self, _text: &str) -> Result<Vec<Entity>> {
            Err(RedactError::Detector {
                detector: "failing",
                message: "model crashed".into(),
            })
        }
    }

    fn categories(list: &[Category]) -> CategorySet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_char_span_multibyte() {
        let text = "Zürich: a@b.co";
        let byte_start = text.find('a').unwrap();
        assert_eq!(char_span(text, byte_start, text.len()), (8, 14));
    }

    #[test]
    fn test_from_config_builds_enabled_detectors_in_order() {
        let options = RedactionOptions {
            mask_email: true,
            mask_phone: true,
            mask_address: true,
            mask_tc: true,
            ..Default::default()
        };
        let set = DetectorSet::from_config(&RedactionConfig::from(&options), None).unwrap();
        assert_eq!(set.names(), vec!["email", "phone", "address", "national_id"]);
    }

    #[test]
    fn test_from_config_requires_recognizer_for_entities() {
        let options = RedactionOptions {
            mask_person: true,
            ..Default::default()
        };
        let result = DetectorSet::from_config(&RedactionConfig::from(&options), None);
        assert!(matches!(result, Err(RedactError::Config(_))));
    }

    #[test]
    fn test_results_are_concatenated_not_merged() {
        let mut set = DetectorSet::new();
        set.push(Box::new(EmailDetector::new()));
        set.push(Box::new(EmailDetector::new()));
        let found = set
            .detect("mail a.b@example.com now", &categories(&[Category::Email]))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], found[1]);
    }

    #[test]
    fn test_disabled_categories_skip_detectors() {
        let mut set = DetectorSet::new();
        set.push(Box::new(EmailDetector::new()));
        let found = set
            .detect("a.b@example.com", &categories(&[Category::Phone]))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_model_failure_propagates_by_default() {
        let mut set = DetectorSet::new();
        set.push(Box::new(EntityDetector::new(Box::new(FailingRecognizer))));
        let err = set
            .detect("John Doe", &categories(&[Category::Person]))
            .unwrap_err();
        assert!(matches!(err, RedactError::Detector { .. }));
    }

    #[test]
    fn test_model_failure_isolated_when_enabled() {
        let mut set = DetectorSet::new().with_isolation(true);
        set.push(Box::new(EmailDetector::new()));
        set.push(Box::new(EntityDetector::new(Box::new(FailingRecognizer))));
        let found = set
            .detect(
                "John Doe a.b@example.com",
                &categories(&[Category::Email, Category::Person]),
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Email);
    }
}
