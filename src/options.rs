//! Plugin Options - Construction-Time Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::content::ManifestContent;
use crate::validation::ShapeCheck;

pub const DEFAULT_DESTINATION: &str = "manifest";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Failed to read options file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serializable plugin options. Icon functions are set in code on
/// [`crate::icons::IconClassifier`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(default)]
    pub content: ManifestContent,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub shape_check: ShapeCheck,
}

fn default_destination() -> String { DEFAULT_DESTINATION.to_string() }

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            content: ManifestContent::new(),
            destination: default_destination(),
            shape_check: ShapeCheck::default(),
        }
    }
}

impl PluginOptions {
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let json = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let options = PluginOptions::from_json("{}").unwrap();
        assert_eq!(options, PluginOptions::default());
        assert_eq!(options.destination, "manifest");
        assert_eq!(options.shape_check, ShapeCheck::Strict);
    }

    #[test]
    fn test_camel_case_fields() {
        let options = PluginOptions::from_json(
            r#"{"content": {"name": "Tumblr"}, "destination": "/pwa/", "shapeCheck": "lenient"}"#,
        )
        .unwrap();
        assert_eq!(options.content.get("name"), Some(&json!("Tumblr")));
        assert_eq!(options.destination, "/pwa/");
        assert_eq!(options.shape_check, ShapeCheck::Lenient);
    }

    #[test]
    fn test_content_must_be_object() {
        assert!(matches!(
            PluginOptions::from_json(r#"{"content": ["name"]}"#),
            Err(OptionsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"destination": "icons"}}"#).unwrap();
        let options = PluginOptions::load(file.path()).unwrap();
        assert_eq!(options.destination, "icons");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PluginOptions::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, OptionsError::Io { .. }));
    }
}
