//! Redaction options and the resolved configuration the driver consumes
//!
//! `RedactionOptions` is the flat boolean record callers fill in (CLI flags,
//! a JSON options file). `RedactionConfig` is the immutable value derived
//! from it: enabled categories plus exactly one resolved render style.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RedactError, Result};

/// Category of sensitive text a detector can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Email,
    Phone,
    Person,
    Gpe,
    Location,
    Organization,
    Address,
    /// Turkish national identification number (T.C. Kimlik No)
    NationalId,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Email,
        Category::Phone,
        Category::Person,
        Category::Gpe,
        Category::Location,
        Category::Organization,
        Category::Address,
        Category::NationalId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Email => "email",
            Category::Phone => "phone",
            Category::Person => "person",
            Category::Gpe => "gpe",
            Category::Location => "location",
            Category::Organization => "organization",
            Category::Address => "address",
            Category::NationalId => "national_id",
        }
    }

    /// Map an entity-recognizer label to a category.
    ///
    /// Labels follow the OntoNotes names used by common NER models
    /// (`PERSON`, `GPE`, `LOC`, `ORG`), plus `ADDRESS` for recognizers
    /// that emit street addresses.
    pub fn from_entity_label(label: &str) -> Option<Category> {
        match label.to_ascii_uppercase().as_str() {
            "PERSON" | "PER" => Some(Category::Person),
            "GPE" => Some(Category::Gpe),
            "LOC" | "LOCATION" => Some(Category::Location),
            "ORG" | "ORGANIZATION" => Some(Category::Organization),
            "ADDRESS" => Some(Category::Address),
            _ => None,
        }
    }

    /// Categories that come from the entity recognizer
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            Category::Person | Category::Gpe | Category::Location | Category::Organization
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type CategorySet = BTreeSet<Category>;

/// Visual treatment applied to every region of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    /// Remove content, overlay `*` glyphs
    Star,
    /// Remove content, fill with solid black
    Blackout,
    /// Outline only. Content stays in place unless `secure_frame` is set.
    Frame,
}

impl RenderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStyle::Star => "star",
            RenderStyle::Blackout => "blackout",
            RenderStyle::Frame => "frame",
        }
    }
}

/// Flat option record, one boolean per toggle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionOptions {
    pub mask_email: bool,
    pub mask_phone: bool,
    pub mask_address: bool,
    pub mask_person: bool,
    pub mask_gpe: bool,
    pub mask_loc: bool,
    pub mask_org: bool,
    /// 11-digit Turkish identification numbers
    pub mask_tc: bool,
    pub style_star: bool,
    pub style_black: bool,
    pub style_frame: bool,
    /// Frame style also removes the framed content
    pub secure_frame: bool,
    /// Log and skip entity-recognizer failures instead of aborting
    pub isolate_entity_failures: bool,
}

impl RedactionOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RedactError::Config(format!("Invalid options JSON: {}", e)))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Logical OR of two option records
    pub fn merge(&self, other: &RedactionOptions) -> RedactionOptions {
        RedactionOptions {
            mask_email: self.mask_email || other.mask_email,
            mask_phone: self.mask_phone || other.mask_phone,
            mask_address: self.mask_address || other.mask_address,
            mask_person: self.mask_person || other.mask_person,
            mask_gpe: self.mask_gpe || other.mask_gpe,
            mask_loc: self.mask_loc || other.mask_loc,
            mask_org: self.mask_org || other.mask_org,
            mask_tc: self.mask_tc || other.mask_tc,
            style_star: self.style_star || other.style_star,
            style_black: self.style_black || other.style_black,
            style_frame: self.style_frame || other.style_frame,
            secure_frame: self.secure_frame || other.secure_frame,
            isolate_entity_failures: self.isolate_entity_failures
                || other.isolate_entity_failures,
        }
    }

    pub fn categories(&self) -> CategorySet {
        let toggles = [
            (self.mask_email, Category::Email),
            (self.mask_phone, Category::Phone),
            (self.mask_address, Category::Address),
            (self.mask_person, Category::Person),
            (self.mask_gpe, Category::Gpe),
            (self.mask_loc, Category::Location),
            (self.mask_org, Category::Organization),
            (self.mask_tc, Category::NationalId),
        ];
        toggles
            .into_iter()
            .filter(|(on, _)| *on)
            .map(|(_, category)| category)
            .collect()
    }

    /// Resolve the style flags. Precedence is Blackout > Frame > Star.
    pub fn style(&self) -> Option<RenderStyle> {
        if self.style_black {
            Some(RenderStyle::Blackout)
        } else if self.style_frame {
            Some(RenderStyle::Frame)
        } else if self.style_star {
            Some(RenderStyle::Star)
        } else {
            None
        }
    }
}

/// Immutable configuration for one redaction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionConfig {
    categories: CategorySet,
    style: Option<RenderStyle>,
    secure_frame: bool,
    isolate_entity_failures: bool,
}

impl RedactionConfig {
    pub fn new(categories: CategorySet, style: Option<RenderStyle>) -> Self {
        Self {
            categories,
            style,
            secure_frame: false,
            isolate_entity_failures: false,
        }
    }

    pub fn with_secure_frame(mut self, secure_frame: bool) -> Self {
        self.secure_frame = secure_frame;
        self
    }

    pub fn with_entity_isolation(mut self, isolate: bool) -> Self {
        self.isolate_entity_failures = isolate;
        self
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    pub fn style(&self) -> Option<RenderStyle> {
        self.style
    }

    pub fn secure_frame(&self) -> bool {
        self.secure_frame
    }

    pub fn isolate_entity_failures(&self) -> bool {
        self.isolate_entity_failures
    }

    pub fn needs_entity_recognizer(&self) -> bool {
        self.categories.iter().any(Category::is_entity)
    }

    /// Whether regions drawn with the active style remove underlying content.
    /// With no style selected regions are still cleared, just not marked.
    pub fn is_destructive(&self) -> bool {
        self.removes_content(self.style)
    }

    /// Whether a region drawn with `style` removes underlying content
    pub fn removes_content(&self, style: Option<RenderStyle>) -> bool {
        match style {
            Some(RenderStyle::Frame) => self.secure_frame,
            Some(RenderStyle::Star) | Some(RenderStyle::Blackout) | None => true,
        }
    }
}

impl From<&RedactionOptions> for RedactionConfig {
    fn from(options: &RedactionOptions) -> Self {
        RedactionConfig::new(options.categories(), options.style())
            .with_secure_frame(options.secure_frame)
            .with_entity_isolation(options.isolate_entity_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_precedence_black_over_star() {
        let options = RedactionOptions {
            style_star: true,
            style_black: true,
            ..Default::default()
        };
        assert_eq!(options.style(), Some(RenderStyle::Blackout));
    }

    #[test]
    fn test_style_precedence_frame_over_star() {
        let options = RedactionOptions {
            style_star: true,
            style_frame: true,
            ..Default::default()
        };
        assert_eq!(options.style(), Some(RenderStyle::Frame));
    }

    #[test]
    fn test_style_precedence_all_set() {
        let options = RedactionOptions {
            style_star: true,
            style_frame: true,
            style_black: true,
            ..Default::default()
        };
        assert_eq!(options.style(), Some(RenderStyle::Blackout));
    }

    #[test]
    fn test_no_style_selected() {
        assert_eq!(RedactionOptions::default().style(), None);
        let config = RedactionConfig::from(&RedactionOptions::default());
        assert!(config.is_destructive());
    }

    #[test]
    fn test_frame_is_not_destructive_unless_secure() {
        let options = RedactionOptions {
            style_frame: true,
            ..Default::default()
        };
        assert!(!RedactionConfig::from(&options).is_destructive());

        let secure = RedactionOptions {
            secure_frame: true,
            ..options
        };
        assert!(RedactionConfig::from(&secure).is_destructive());
    }

    #[test]
    fn test_categories_from_flags() {
        let options = RedactionOptions {
            mask_email: true,
            mask_loc: true,
            mask_address: true,
            ..Default::default()
        };
        let categories: Vec<_> = options.categories().into_iter().collect();
        assert_eq!(
            categories,
            vec![Category::Email, Category::Location, Category::Address]
        );
    }

    #[test]
    fn test_needs_entity_recognizer() {
        let regex_only = RedactionOptions {
            mask_email: true,
            mask_phone: true,
            mask_address: true,
            ..Default::default()
        };
        assert!(!RedactionConfig::from(&regex_only).needs_entity_recognizer());

        let with_person = RedactionOptions {
            mask_person: true,
            ..Default::default()
        };
        assert!(RedactionConfig::from(&with_person).needs_entity_recognizer());
    }

    #[test]
    fn test_options_json_missing_keys_default_false() {
        let options = RedactionOptions::from_json(r#"{"mask_email": true, "style_black": true}"#)
            .unwrap();
        assert!(options.mask_email);
        assert!(options.style_black);
        assert!(!options.mask_phone);
        assert!(!options.secure_frame);
    }

    #[test]
    fn test_options_json_rejects_garbage() {
        let err = RedactionOptions::from_json("not json").unwrap_err();
        assert!(matches!(err, RedactError::Config(_)));
    }

    #[test]
    fn test_merge_is_logical_or() {
        let a = RedactionOptions {
            mask_email: true,
            ..Default::default()
        };
        let b = RedactionOptions {
            mask_phone: true,
            style_frame: true,
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert!(merged.mask_email && merged.mask_phone && merged.style_frame);
        assert!(!merged.mask_org);
    }

    #[test]
    fn test_tc_option_enables_national_id() {
        let options = RedactionOptions::from_json(r#"{"mask_tc": true}"#).unwrap();
        let config = RedactionConfig::from(&options);
        assert!(config.is_enabled(Category::NationalId));
        assert!(!config.needs_entity_recognizer());
        assert_eq!(Category::NationalId.to_string(), "national_id");
    }

    #[test]
    fn test_entity_labels() {
        assert_eq!(Category::from_entity_label("PERSON"), Some(Category::Person));
        assert_eq!(Category::from_entity_label("gpe"), Some(Category::Gpe));
        assert_eq!(Category::from_entity_label("LOC"), Some(Category::Location));
        assert_eq!(
            Category::from_entity_label("ORG"),
            Some(Category::Organization)
        );
        assert_eq!(Category::from_entity_label("DATE"), None);
    }
}
