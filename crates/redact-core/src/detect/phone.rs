//! Validated phone-number detector
//!
//! Pattern-shaped candidates are only reported when they also look like a
//! dialable number. Anything failing validation is dropped even though it
//! matched the pattern.

use lazy_static::lazy_static;
use regex::Regex;

use super::{char_span, Detector, Match};
use crate::config::{Category, CategorySet};
use crate::error::Result;

lazy_static! {
    // International (+CC and 2-5 digit groups) or North American shapes
    static ref PHONE_CANDIDATE_REGEX: Regex = Regex::new(
        r"\+\d{1,3}(?:[-.\s]?\(?\d{1,4}\)?){2,5}|(?:1[-.\s]?)?(?:\(\d{3}\)|\d{3})[-.\s]?\d{3}[-.\s]?\d{4}"
    ).unwrap();
}

/// E.164 caps numbers at 15 digits
const MAX_DIGITS: usize = 15;
const MIN_INTERNATIONAL_DIGITS: usize = 8;

#[derive(Debug, Default)]
pub struct PhoneDetector;

impl PhoneDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for PhoneDetector {
    fn name(&self) -> &'static str {
        "phone"
    }

    fn categories(&self) -> &[Category] {
        &[Category::Phone]
    }

    fn detect(&self, text: &str, enabled: &CategorySet) -> Result<Vec<Match>> {
        if !enabled.contains(&Category::Phone) {
            return Ok(Vec::new());
        }

        let matches = PHONE_CANDIDATE_REGEX
            .find_iter(text)
            .filter(|m| is_isolated(text, m.start(), m.end()))
            .filter(|m| is_plausible_number(m.as_str()))
            .map(|m| {
                let (start, end) = char_span(text, m.start(), m.end());
                Match::new(start, end, Category::Phone)
            })
            .collect();

        Ok(matches)
    }
}

/// Reject candidates glued to surrounding letters or digits
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Plausibility check for a phone-number candidate
pub(crate) fn is_plausible_number(candidate: &str) -> bool {
    if candidate.matches('(').count() != candidate.matches(')').count() {
        return false;
    }

    let digits: Vec<u8> = candidate
        .bytes()
        .filter(u8::is_ascii_digit)
        .collect();

    if digits.is_empty() || digits.len() > MAX_DIGITS {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    if candidate.starts_with('+') {
        if digits[0] == b'1' {
            return digits.len() == 11 && is_nanp_national(&digits[1..]);
        }
        return digits.len() >= MIN_INTERNATIONAL_DIGITS;
    }

    match digits.len() {
        10 => is_nanp_national(&digits),
        11 if digits[0] == b'1' => is_nanp_national(&digits[1..]),
        _ => false,
    }
}

/// Ten-digit North American number whose area code starts with 2-9
fn is_nanp_national(digits: &[u8]) -> bool {
    digits.len() == 10 && (b'2'..=b'9').contains(&digits[0])
}
