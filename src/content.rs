//! Manifest Content - Recognized Keys and Shapes
//!
//! The web app manifest accepts a fixed vocabulary. Anything outside
//! [`RECOGNIZED_KEYS`] never reaches the emitted file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Recognized manifest keys, in the order validation visits them.
///
/// Emitted manifests list validated keys in this order, followed by `icons`.
pub const RECOGNIZED_KEYS: [&str; 10] = [
    "name",
    "short_name",
    "start_url",
    "display",
    "background_color",
    "theme_color",
    "description",
    "icons",
    "prefer_related_applications",
    "related_applications",
];

/// Key holding the icon list. Always derived from build output.
pub const ICONS_KEY: &str = "icons";

pub fn is_recognized_key(key: &str) -> bool {
    RECOGNIZED_KEYS.contains(&key)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    Fullscreen,
    Standalone,
    MinimalUi,
    Browser,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 4] = [
        DisplayMode::Fullscreen,
        DisplayMode::Standalone,
        DisplayMode::MinimalUi,
        DisplayMode::Browser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Fullscreen => "fullscreen",
            DisplayMode::Standalone => "standalone",
            DisplayMode::MinimalUi => "minimal-ui",
            DisplayMode::Browser => "browser",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

/// Manifest fields as a JSON object whose key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestContent(Map<String, Value>);

impl ManifestContent {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value. Anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value for `key`, treating `null` as absent.
    pub fn defined(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ManifestContent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
