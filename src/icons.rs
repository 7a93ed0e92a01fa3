//! Icon Classification - Which Build Outputs Are Manifest Icons
//!
//! Three independently replaceable functions decide membership, size and
//! MIME type. The defaults read everything from the file name:
//! `.../icon_<size>-<hash>.<png|jpeg|jpg>`.
//!
//! Replacing only the predicate keeps the default extractors, which fail on
//! any name they cannot parse. That failure is surfaced, not hidden.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// Default icon file convention, matched against the last path segment
    static ref ICON_FILE_REGEX: Regex = Regex::new(
        r"(?:^|/)icon_0*([1-9][0-9]*)-\w*\.(png|jpeg|jpg)$"
    ).unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IconError {
    #[error("`{file_name}` was classified as a manifest icon but the {extractor} extractor cannot parse it")]
    ClassificationMismatch {
        file_name: String,
        extractor: &'static str,
    },

    #[error("icon `{file_name}`: {message}")]
    Custom { file_name: String, message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

impl IconSize {
    pub fn square(edge: u32) -> Self {
        Self { width: edge, height: edge }
    }
}

impl fmt::Display for IconSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One entry of the manifest `icons` array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Icon {
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub src: String,
}

/// Classification report for a single output name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IconMatch {
    pub file: String,
    pub icon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type IconPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type IconSizeFn = Arc<dyn Fn(&str) -> Result<IconSize, IconError> + Send + Sync>;
pub type IconTypeFn = Arc<dyn Fn(&str) -> Result<String, IconError> + Send + Sync>;

/// Default predicate: the name follows the `icon_<size>-<hash>.<ext>` convention.
pub fn is_manifest_icon(file_name: &str) -> bool {
    ICON_FILE_REGEX.is_match(file_name)
}

/// Default size extractor. Icons are assumed square.
pub fn icon_size(file_name: &str) -> Result<IconSize, IconError> {
    ICON_FILE_REGEX
        .captures(file_name)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(IconSize::square)
        .ok_or_else(|| IconError::ClassificationMismatch {
            file_name: file_name.to_string(),
            extractor: "size",
        })
}

/// Default type extractor: `image/<ext>`, extension taken verbatim.
pub fn icon_type(file_name: &str) -> Result<String, IconError> {
    ICON_FILE_REGEX
        .captures(file_name)
        .map(|caps| format!("image/{}", &caps[2]))
        .ok_or_else(|| IconError::ClassificationMismatch {
            file_name: file_name.to_string(),
            extractor: "type",
        })
}

/// Predicate plus describers, captured once at plugin construction
#[derive(Clone)]
pub struct IconClassifier {
    predicate: IconPredicate,
    size: IconSizeFn,
    mime_type: IconTypeFn,
}

impl IconClassifier {
    pub fn new() -> Self {
        Self {
            predicate: Arc::new(is_manifest_icon),
            size: Arc::new(icon_size),
            mime_type: Arc::new(icon_type),
        }
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn with_size<F>(mut self, size: F) -> Self
    where
        F: Fn(&str) -> Result<IconSize, IconError> + Send + Sync + 'static,
    {
        self.size = Arc::new(size);
        self
    }

    pub fn with_type<F>(mut self, mime_type: F) -> Self
    where
        F: Fn(&str) -> Result<String, IconError> + Send + Sync + 'static,
    {
        self.mime_type = Arc::new(mime_type);
        self
    }

    pub fn is_icon(&self, file_name: &str) -> bool {
        (self.predicate)(file_name)
    }

    pub fn size_of(&self, file_name: &str) -> Result<IconSize, IconError> {
        (self.size)(file_name)
    }

    pub fn type_of(&self, file_name: &str) -> Result<String, IconError> {
        (self.mime_type)(file_name)
    }

    /// How this classifier treats `file_name`, with extractor failures kept.
    pub fn inspect(&self, file_name: &str) -> IconMatch {
        let mut report = IconMatch {
            file: file_name.to_string(),
            icon: self.is_icon(file_name),
            sizes: None,
            mime_type: None,
            error: None,
        };
        if !report.icon {
            return report;
        }
        match self.size_of(file_name).and_then(|size| Ok((size, self.type_of(file_name)?))) {
            Ok((size, mime_type)) => {
                report.sizes = Some(size.to_string());
                report.mime_type = Some(mime_type);
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        report
    }

    /// Build the icon entry for a name that already passed [`Self::is_icon`].
    ///
    /// `src` is `public_path` without one trailing slash, then `/`, then the name.
    pub fn describe(&self, file_name: &str, public_path: &str) -> Result<Icon, IconError> {
        let size = self.size_of(file_name)?;
        let mime_type = self.type_of(file_name)?;
        let prefix = public_path.strip_suffix('/').unwrap_or(public_path);
        Ok(Icon {
            sizes: size.to_string(),
            mime_type,
            src: format!("{}/{}", prefix, file_name),
        })
    }
}

impl Default for IconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IconClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconClassifier").finish_non_exhaustive()
    }
}
