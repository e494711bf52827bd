//! Input sanitizing and field validation.
//!
//! [`Validator::validate`] never stops at the first problem: every rule runs
//! and all messages are returned together, so the user can fix the whole
//! form in one round trip.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::core::fields::{names, DEFAULT_DESCRIPTION, DEFAULT_REQUIRES_PHP, DEFAULT_VERSION};
use crate::core::FieldSet;

/// Maximum length (in characters) per known field.
pub const FIELD_LIMITS: [(&str, usize); 11] = [
    (names::PLUGIN_NAME, 100),
    (names::PLUGIN_SLUG, 50),
    (names::TEXT_DOMAIN, 50),
    (names::PLUGIN_NAMESPACE, 50),
    (names::VENDOR_NAMESPACE, 50),
    (names::AUTHOR_NAME, 100),
    (names::AUTHOR_URI, 200),
    (names::PLUGIN_URI, 200),
    (names::PLUGIN_DESCRIPTION, 500),
    (names::VERSION, 20),
    (names::REQUIRES_PHP, 10),
];

/// Fields that must be non-blank, with their display labels.
pub const REQUIRED_FIELDS: [(&str, &str); 6] = [
    (names::PLUGIN_NAME, "Plugin name"),
    (names::PLUGIN_SLUG, "Plugin slug"),
    (names::TEXT_DOMAIN, "Text domain"),
    (names::PLUGIN_NAMESPACE, "Plugin namespace"),
    (names::VENDOR_NAMESPACE, "Vendor namespace"),
    (names::AUTHOR_NAME, "Author"),
];

/// PHP versions a generated plugin may declare.
pub const ALLOWED_PHP_VERSIONS: [&str; 4] = ["8.1", "8.2", "8.3", "8.4"];

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());
static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").unwrap());
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").unwrap());

// Comments first: a '>' inside a comment must not end the match early.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?(?:-->|\z)|<[A-Za-z!/?][^>]*(?:>|\z)").unwrap()
});

/// Accumulated validation messages, in rule order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, message: String) {
        self.0.push(message);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("\n"))
    }
}

/// Remove tags and comments, repeating until nothing tag-like is left.
pub fn strip_markup(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let stripped = MARKUP_RE.replace_all(&current, "");
        if stripped == current {
            return current;
        }
        current = stripped.into_owned();
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Strip markup and trim every value, then fill defaults for the
    /// optional fields that came back empty.
    pub fn sanitize(&self, raw: &FieldSet) -> FieldSet {
        let mut clean: FieldSet = raw
            .iter()
            .map(|(key, value)| (key, strip_markup(value).trim().to_string()))
            .collect();

        for (key, default) in [
            (names::VERSION, DEFAULT_VERSION),
            (names::REQUIRES_PHP, DEFAULT_REQUIRES_PHP),
            (names::PLUGIN_DESCRIPTION, DEFAULT_DESCRIPTION),
        ] {
            if clean.value(key).is_empty() {
                clean.set(key, default);
            }
        }

        clean
    }

    /// Run every rule against an already sanitized field set.
    pub fn validate(&self, fields: &FieldSet) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for (key, max) in FIELD_LIMITS {
            if fields.value(key).chars().count() > max {
                errors.push(format!(
                    "Field \"{}\" may be at most {} characters.",
                    key, max
                ));
            }
        }

        for (key, label) in REQUIRED_FIELDS {
            if fields.is_blank(key) {
                errors.push(format!("Field \"{}\" is required.", label));
            }
        }

        for (key, label) in [
            (names::PLUGIN_SLUG, "Plugin slug"),
            (names::TEXT_DOMAIN, "Text domain"),
        ] {
            let value = fields.value(key);
            if !value.is_empty() && !SLUG_RE.is_match(value) {
                errors.push(format!(
                    "Field \"{}\" may only contain lowercase letters, digits and hyphens.",
                    label
                ));
            }
        }

        for (key, label) in [
            (names::PLUGIN_NAMESPACE, "Plugin namespace"),
            (names::VENDOR_NAMESPACE, "Vendor namespace"),
        ] {
            let value = fields.value(key);
            if !value.is_empty() && !NAMESPACE_RE.is_match(value) {
                errors.push(format!(
                    "Field \"{}\" must start with a letter and contain only letters and digits (PascalCase).",
                    label
                ));
            }
        }

        for (key, label) in [
            (names::PLUGIN_URI, "Plugin URI"),
            (names::AUTHOR_URI, "Author URI"),
        ] {
            let value = fields.value(key);
            if !value.is_empty() && !is_valid_url(value) {
                errors.push(format!("Field \"{}\" must be a valid URL.", label));
            }
        }

        let version = fields.value(names::VERSION);
        if !version.is_empty() && !VERSION_RE.is_match(version) {
            errors.push(
                "Field \"Version\" must use the X.Y.Z format (e.g. 1.0.0).".to_string(),
            );
        }

        let requires_php = fields.value(names::REQUIRES_PHP);
        if !requires_php.is_empty() && !ALLOWED_PHP_VERSIONS.contains(&requires_php) {
            errors.push("Unsupported PHP version.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Absolute URL with a scheme and a host.
fn is_valid_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> FieldSet {
        FieldSet::new()
            .with(names::PLUGIN_NAME, "My Plugin")
            .with(names::PLUGIN_SLUG, "my-plug")
            .with(names::TEXT_DOMAIN, "my-plug")
            .with(names::PLUGIN_NAMESPACE, "MyPlug")
            .with(names::VENDOR_NAMESPACE, "Acme")
            .with(names::AUTHOR_NAME, "Jane Doe")
            .with(names::AUTHOR_URI, "https://acme.example")
            .with(names::PLUGIN_URI, "https://acme.example/my-plug")
    }

    #[test]
    fn test_valid_fields_pass() {
        let validator = Validator::new();
        let clean = validator.sanitize(&valid_fields());
        assert_eq!(validator.validate(&clean), Ok(()));
    }

    #[test]
    fn test_sanitize_fills_defaults() {
        let clean = Validator::new().sanitize(&valid_fields().with(names::VERSION, "  "));
        assert_eq!(clean.value(names::VERSION), DEFAULT_VERSION);
        assert_eq!(clean.value(names::REQUIRES_PHP), DEFAULT_REQUIRES_PHP);
        assert_eq!(clean.value(names::PLUGIN_DESCRIPTION), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_sanitize_strips_markup_and_trims() {
        let raw = FieldSet::new()
            .with(names::PLUGIN_NAME, "  <b>Bold</b> <!-- x > y --> Plugin<script ")
            .with(names::AUTHOR_NAME, "a < b");
        let clean = Validator::new().sanitize(&raw);
        assert_eq!(clean.value(names::PLUGIN_NAME), "Bold  Plugin");
        // A lone '<' followed by a space is not a tag
        assert_eq!(clean.value(names::AUTHOR_NAME), "a < b");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let validator = Validator::new();
        let inputs = [
            "<<a>b>c",
            "  <i>x</i>  ",
            "<!-- open comment",
            "plain",
            "<<<<p>>>>",
            "",
        ];

        for input in inputs {
            let raw = valid_fields().with(names::PLUGIN_DESCRIPTION, input);
            let once = validator.sanitize(&raw);
            let twice = validator.sanitize(&once);
            assert_eq!(once, twice, "sanitize not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_each_missing_required_field_is_named() {
        let validator = Validator::new();
        for (key, label) in REQUIRED_FIELDS {
            let mut fields = valid_fields();
            fields.remove(key);
            let errors = validator
                .validate(&validator.sanitize(&fields))
                .expect_err("missing required field must fail");
            let expected = format!("Field \"{}\" is required.", label);
            assert!(
                errors.messages().contains(&expected),
                "{:?} missing from {:?}",
                expected,
                errors
            );
        }
    }

    #[test]
    fn test_all_rules_reported_in_one_pass() {
        let fields = FieldSet::new()
            .with(names::PLUGIN_SLUG, "Bad Slug")
            .with(names::PLUGIN_NAMESPACE, "1abc")
            .with(names::PLUGIN_URI, "not a url")
            .with(names::VERSION, "1.0")
            .with(names::REQUIRES_PHP, "7.4");
        let errors = Validator::new().validate(&fields).unwrap_err();

        // 4 required + slug format + namespace + url + version + php
        assert_eq!(errors.len(), 9, "{}", errors);
        assert!(errors.to_string().contains("Unsupported PHP version."));
    }

    #[test]
    fn test_description_length_boundary() {
        let validator = Validator::new();

        let at_limit = valid_fields().with(names::PLUGIN_DESCRIPTION, "d".repeat(500));
        assert_eq!(validator.validate(&validator.sanitize(&at_limit)), Ok(()));

        let over = valid_fields().with(names::PLUGIN_DESCRIPTION, "d".repeat(501));
        let errors = validator.validate(&validator.sanitize(&over)).unwrap_err();
        assert_eq!(
            errors.messages(),
            ["Field \"plugin_description\" may be at most 500 characters.".to_string()]
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let validator = Validator::new();
        let fields = valid_fields().with(names::PLUGIN_NAME, "ż".repeat(100));
        assert_eq!(validator.validate(&fields), Ok(()));
    }

    #[test]
    fn test_url_requires_host() {
        assert!(is_valid_url("https://example.com/path"));
        assert!(is_valid_url("ftp://files.example.com"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("mailto:someone@example.com"));
    }
}
