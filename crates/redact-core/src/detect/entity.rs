//! Named-entity detection
//!
//! The language model itself lives behind [`EntityRecognizer`]; this module
//! only filters what it reports. [`GazetteerRecognizer`] is a lexicon-backed
//! recognizer for running without a model.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use super::{char_span, Detector, Match};
use crate::config::{Category, CategorySet};
use crate::error::{RedactError, Result};

/// Entities shorter than this (in characters) are ignored
const MIN_ENTITY_CHARS: usize = 2;

/// An entity reported by a recognizer, in character offsets
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    pub start_char: usize,
    pub end_char: usize,
    pub label: String,
}

impl Entity {
    pub fn new(start_char: usize, end_char: usize, label: impl Into<String>) -> Self {
        Self {
            start_char,
            end_char,
            label: label.into(),
        }
    }
}

/// External entity model (NER). Errors propagate to the caller.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>>;
}

/// Turns recognizer output into matches for the enabled entity categories
pub struct EntityDetector {
    recognizer: Box<dyn EntityRecognizer>,
}

impl EntityDetector {
    pub fn new(recognizer: Box<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl Detector for EntityDetector {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn categories(&self) -> &[Category] {
        &[
            Category::Person,
            Category::Gpe,
            Category::Location,
            Category::Organization,
            Category::Address,
        ]
    }

    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        let text_len = text.chars().count();
        let entities = self.recognizer.recognize(text)?;

        let matches = entities
            .into_iter()
            .filter_map(|entity| {
                let category = Category::from_entity_label(&entity.label)?;
                if !enabled.contains(&category) {
                    return None;
                }
                let candidate = Match::new(entity.start_char, entity.end_char, category);
                if !candidate.is_valid_for(text_len) {
                    warn!(
                        start = entity.start_char,
                        end = entity.end_char,
                        text_len,
                        "Dropping out-of-bounds entity span"
                    );
                    return None;
                }
                (candidate.len() >= MIN_ENTITY_CHARS).then_some(candidate)
            })
            .collect();

        Ok(matches)
    }

    fn is_model_backed(&self) -> bool {
        true
    }
}

/// Lexicon-backed recognizer: exact, case-sensitive, whole-word lookups
///
/// Lexicon JSON maps a label to its terms:
/// ```json
/// { "PERSON": ["John Doe"], "ORG": ["Acme Corporation"], "GPE": ["New York"] }
/// ```
/// Longer terms win when terms overlap.
pub struct GazetteerRecognizer {
    regex: Option<Regex>,
    labels: HashMap<String, String>,
}

impl GazetteerRecognizer {
    pub fn new(lexicon: HashMap<String, Vec<String>>) -> Result<Self> {
        let mut labels = HashMap::new();
        for (label, terms) in lexicon {
            for term in terms {
                let term = term.trim().to_string();
                if !term.is_empty() {
                    labels.insert(term, label.clone());
                }
            }
        }

        let mut terms: Vec<&String> = labels.keys().collect();
        // Longest first so alternation prefers "New York City" over "New York"
        terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        let regex = if terms.is_empty() {
            None
        } else {
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"\b(?:{})\b", alternation);
            Some(
                Regex::new(&pattern)
                    .map_err(|e| RedactError::Config(format!("Invalid lexicon: {}", e)))?,
            )
        };

        Ok(Self { regex, labels })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let lexicon: HashMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| RedactError::Config(format!("Invalid lexicon JSON: {}", e)))?;
        Self::new(lexicon)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn term_count(&self) -> usize {
        self.labels.len()
    }
}

impl EntityRecognizer for GazetteerRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let Some(regex) = &self.regex else {
            return Ok(Vec::new());
        };

        let entities = regex
            .find_iter(text)
            .filter_map(|m| {
                let label = self.labels.get(m.as_str())?;
                let (start, end) = char_span(text, m.start(), m.end());
                Some(Entity::new(start, end, label.clone()))
            })
            .collect();

        Ok(entities)
    }
}
