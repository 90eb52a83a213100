//! Regex-backed pattern detectors

use lazy_static::lazy_static;
use regex::Regex;

use super::{char_span, Detector, Match};
use crate::config::{Category, CategorySet};
use crate::error::Result;

lazy_static! {
    // Email - RFC 5322 shaped local part, dotted domain
    pub(crate) static ref EMAIL_REGEX: Regex = Regex::new(
        r"(?i)\b[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?"
    ).unwrap();

    // Street address - house number, a few words, street suffix
    static ref ADDRESS_REGEX: Regex = Regex::new(
        r"\b\d{1,6}\s+(?:[A-Za-z]+\s+){0,4}?(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr)\b\.?"
    ).unwrap();

    // Turkish identification number - exactly 11 digits
    static ref NATIONAL_ID_REGEX: Regex = Regex::new(r"\b\d{11}\b").unwrap();
}

fn find_all(regex: &Regex, text: &str, category: Category) -> Vec<Match> {
    regex
        .find_iter(text)
        .map(|m| {
            let (start, end) = char_span(text, m.start(), m.end());
            Match::new(start, end, category)
        })
        .collect()
}

/// Email addresses
#[derive(Debug, Default)]
pub struct EmailDetector;

impl EmailDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for EmailDetector {
    fn name(&self) -> &'static str {
        "email"
    }

    fn categories(&self) -> &[Category] {
        &[Category::Email]
    }

    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        if !enabled.contains(&Category::Email) {
            return Ok(Vec::new());
        }
        Ok(find_all(&EMAIL_REGEX, text, Category::Email))
    }
}

/// Street addresses such as "123 Main Street"
#[derive(Debug, Default)]
pub struct AddressDetector;

impl AddressDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for AddressDetector {
    fn name(&self) -> &'static str {
        "address"
    }

    fn categories(&self) -> &[Category] {
        &[Category::Address]
    }

    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        if !enabled.contains(&Category::Address) {
            return Ok(Vec::new());
        }
        Ok(find_all(&ADDRESS_REGEX, text, Category::Address))
    }
}

/// Turkish identification numbers (T.C. Kimlik No)
#[derive(Debug, Default)]
pub struct NationalIdDetector;

impl NationalIdDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for NationalIdDetector {
    fn name(&self) -> &'static str {
        "national_id"
    }

    fn categories(&self) -> &[Category] {
        &[Category::NationalId]
    }

    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        if !enabled.contains(&Category::NationalId) {
            return Ok(Vec::new());
        }
        Ok(find_all(&NATIONAL_ID_REGEX, text, Category::NationalId))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(category: Category) -> CategorySet {
        [category].into_iter().collect()
    }

    fn spans(text: &str, matches: &[Match]) -> Vec<String> {
        matches
            .iter()
            .map(|m| text.chars().skip(m.start).take(m.len()).collect())
            .collect()
    }

    #[test]
    fn test_email_basic() {
        let text = "Contact: john.doe@example.com";
        let found = EmailDetector::new()
            .detect(text, &enabled(Category::Email))
            .unwrap();
        assert_eq!(found, vec![Match::new(9, 29, Category::Email)]);
    }

    #[test]
    fn test_email_multiple_non_overlapping() {
        let text = "a@x.io, B.Smith+tag@Mail.Example.ORG";
        let found = EmailDetector::new()
            .detect(text, &enabled(Category::Email))
            .unwrap();
        assert_eq!(spans(text, &found), vec!["a@x.io", "B.Smith+tag@Mail.Example.ORG"]);
    }

    #[test]
    fn test_email_ignores_bare_at() {
        let found = EmailDetector::new()
            .detect("meet @ noon, user@", &enabled(Category::Email))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_email_disabled_category() {
        let found = EmailDetector::new()
            .detect("a@x.io", &enabled(Category::Phone))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_email_offsets_are_characters() {
        let text = "Müller: m@x.de";
        let found = EmailDetector::new()
            .detect(text, &enabled(Category::Email))
            .unwrap();
        assert_eq!(found, vec![Match::new(8, 14, Category::Email)]);
    }

    #[test]
    fn test_address_street() {
        let text = "Address: 123 Main Street, New York, NY 10001";
        let found = AddressDetector::new()
            .detect(text, &enabled(Category::Address))
            .unwrap();
        assert_eq!(spans(text, &found), vec!["123 Main Street"]);
    }

    #[test]
    fn test_address_abbreviated_suffix() {
        let text = "Ship to 42 Old Mill Rd. today";
        let found = AddressDetector::new()
            .detect(text, &enabled(Category::Address))
            .unwrap();
        assert_eq!(spans(text, &found), vec!["42 Old Mill Rd."]);
    }

    #[test]
    fn test_address_requires_suffix() {
        let found = AddressDetector::new()
            .detect("I have 3 apples", &enabled(Category::Address))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_national_id_exactly_eleven_digits() {
        let text = "TC: 12345678901, short 1234567890, long 123456789012";
        let found = NationalIdDetector::new()
            .detect(text, &enabled(Category::NationalId))
            .unwrap();
        assert_eq!(spans(text, &found), vec!["12345678901"]);
        assert_eq!(found[0].start, 4);
    }

    #[test]
    fn test_national_id_disabled_category() {
        let found = NationalIdDetector::new()
            .detect("12345678901", &enabled(Category::Phone))
            .unwrap();
        assert!(found.is_empty());
    }
}
