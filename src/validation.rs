//! Validation System - Allow-List Filtering and Shape Rules
//!
//! Rules produce structured violations.
//! Policy (`ShapeCheck`) decides whether error violations block.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::content::{is_recognized_key, DisplayMode, ManifestContent, ICONS_KEY, RECOGNIZED_KEYS};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationViolation {
    pub rule: String,
    pub key: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl ValidationViolation {
    fn error(rule: &str, key: &str, message: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            key: key.to_string(),
            severity: ViolationSeverity::Error,
            message: message.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub content: ManifestContent,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// A recognized key held a value of the wrong shape.
#[derive(Debug, Error)]
#[error("invalid manifest content: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<ValidationViolation>,
}

fn summarize(violations: &[ValidationViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.key, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// How shape violations on recognized keys are treated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeCheck {
    /// Any error violation fails validation.
    #[default]
    Strict,
    /// Malformed values pass through and are logged.
    Lenient,
}

/// Validation rule trait - produces violations for one recognized key
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn key(&self) -> &'static str;
    fn validate(&self, value: &Value) -> Vec<ValidationViolation>;
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- Concrete Rules ---

pub struct StringFieldRule {
    pub key: &'static str,
}

impl ValidationRule for StringFieldRule {
    fn name(&self) -> &'static str { "string_field" }

    fn key(&self) -> &'static str { self.key }

    fn validate(&self, value: &Value) -> Vec<ValidationViolation> {
        if value.is_string() {
            return vec![];
        }
        vec![ValidationViolation::error(
            self.name(),
            self.key,
            "Expected a string",
            "string",
            json_kind(value),
        )]
    }
}

pub struct BooleanFieldRule {
    pub key: &'static str,
}

impl ValidationRule for BooleanFieldRule {
    fn name(&self) -> &'static str { "boolean_field" }

    fn key(&self) -> &'static str { self.key }

    fn validate(&self, value: &Value) -> Vec<ValidationViolation> {
        if value.is_boolean() {
            return vec![];
        }
        vec![ValidationViolation::error(
            self.name(),
            self.key,
            "Expected a boolean",
            "boolean",
            json_kind(value),
        )]
    }
}

pub struct DisplayModeRule;

impl ValidationRule for DisplayModeRule {
    fn name(&self) -> &'static str { "display_mode" }

    fn key(&self) -> &'static str { "display" }

    fn validate(&self, value: &Value) -> Vec<ValidationViolation> {
        if value.as_str().and_then(DisplayMode::parse).is_some() {
            return vec![];
        }
        let expected = DisplayMode::ALL
            .iter()
            .map(DisplayMode::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        let actual = match value {
            Value::String(s) => format!("\"{}\"", s),
            other => json_kind(other).to_string(),
        };
        vec![ValidationViolation::error(
            self.name(),
            self.key(),
            "Unknown display mode",
            expected,
            actual,
        )]
    }
}

/// Ordered list of objects, each carrying one required string field.
pub struct ResourceListRule {
    pub key: &'static str,
    pub required_field: &'static str,
}

impl ValidationRule for ResourceListRule {
    fn name(&self) -> &'static str { "resource_list" }

    fn key(&self) -> &'static str { self.key }

    fn validate(&self, value: &Value) -> Vec<ValidationViolation> {
        let Some(entries) = value.as_array() else {
            return vec![ValidationViolation::error(
                self.name(),
                self.key,
                "Expected an array of resources",
                "array",
                json_kind(value),
            )];
        };

        entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let field = entry.as_object().and_then(|o| o.get(self.required_field));
                match field {
                    Some(Value::String(_)) => None,
                    Some(other) => Some(ValidationViolation::error(
                        self.name(),
                        self.key,
                        format!("Entry {} has a non-string `{}`", index, self.required_field),
                        "string",
                        json_kind(other),
                    )),
                    None => Some(ValidationViolation::error(
                        self.name(),
                        self.key,
                        format!("Entry {} is missing `{}`", index, self.required_field),
                        format!("object with `{}`", self.required_field),
                        json_kind(entry),
                    )),
                }
            })
            .collect()
    }
}

/// Validator filters content to the allow-list and applies shape policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    shape_check: ShapeCheck,
}

impl Validator {
    pub fn new() -> Self {
        Self::with_shape_check(ShapeCheck::Strict)
    }

    pub fn with_shape_check(shape_check: ShapeCheck) -> Self {
        Self {
            rules: vec![
                Box::new(StringFieldRule { key: "name" }),
                Box::new(StringFieldRule { key: "short_name" }),
                Box::new(StringFieldRule { key: "start_url" }),
                Box::new(DisplayModeRule),
                Box::new(StringFieldRule { key: "background_color" }),
                Box::new(StringFieldRule { key: "theme_color" }),
                Box::new(StringFieldRule { key: "description" }),
                Box::new(ResourceListRule { key: "icons", required_field: "src" }),
                Box::new(BooleanFieldRule { key: "prefer_related_applications" }),
                Box::new(ResourceListRule { key: "related_applications", required_field: "platform" }),
            ],
            shape_check,
        }
    }

    pub fn shape_check(&self) -> ShapeCheck {
        self.shape_check
    }

    /// Filter `content` to recognized, defined keys and check their shapes.
    pub fn validate(&self, content: &ManifestContent) -> ValidationResult {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let mut filtered = ManifestContent::new();
        let mut all_violations = vec![];

        for key in RECOGNIZED_KEYS {
            let Some(value) = content.defined(key) else {
                continue;
            };
            for rule in self.rules.iter().filter(|r| r.key() == key) {
                all_violations.extend(rule.validate(value));
            }
            // Shape-checked, but icons always come from build output.
            if key != ICONS_KEY {
                filtered.insert(key, value.clone());
            }
        }

        for key in content.keys().filter(|k| !is_recognized_key(k)) {
            debug!(key, "dropping unrecognized manifest key");
            all_violations.push(ValidationViolation {
                rule: "recognized_key".to_string(),
                key: key.to_string(),
                severity: ViolationSeverity::Info,
                message: "Unrecognized key dropped".to_string(),
                expected: None,
                actual: None,
            });
        }

        let has_errors = all_violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        match self.shape_check {
            ShapeCheck::Strict => ValidationResult {
                valid: !has_errors,
                violations: all_violations,
                content: filtered,
            },
            ShapeCheck::Lenient => {
                // Never block, just record
                for v in all_violations.iter().filter(|v| v.severity == ViolationSeverity::Error) {
                    warn!(key = %v.key, rule = %v.rule, "{}", v.message);
                }
                ValidationResult {
                    valid: true,
                    violations: all_violations,
                    content: filtered,
                }
            }
        }
    }

    /// Validated content, or the error violations when policy blocks.
    pub fn validated(&self, content: &ManifestContent) -> Result<ManifestContent, ValidationError> {
        let result = self.validate(content);
        if result.valid {
            Ok(result.content)
        } else {
            Err(ValidationError {
                violations: result.errors().cloned().collect(),
            })
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("shape_check", &self.shape_check)
            .finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Strict validation with the default rule set.
pub fn validate(content: &ManifestContent) -> Result<ManifestContent, ValidationError> {
    Validator::new().validated(content)
}
