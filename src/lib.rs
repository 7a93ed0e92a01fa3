//! WebManifest Core - Web App Manifest Synthesis for Build Pipelines
//!
//! At the end of a build pass the plugin scans the final output names,
//! picks out the manifest icons, merges them into validated manifest
//! content and emits `<destination>/manifest-<hash8>.json` together with
//! an `app-manifest` output group.
//!
//! # Guarantees
//! 1. Only recognized keys reach the manifest
//! 2. `icons` always comes from build output, never from user content
//! 3. Identical inputs produce identical bytes and file names
//! 4. Either the manifest is emitted and registered, or nothing is

pub mod content;
pub mod validation;
pub mod icons;
pub mod hashing;
pub mod options;
pub mod pipeline;

pub use content::{DisplayMode, ManifestContent, RECOGNIZED_KEYS};
pub use validation::{validate, ShapeCheck, ValidationError, ValidationResult, ValidationRule, ValidationViolation, Validator, ViolationSeverity};
pub use icons::{Icon, IconClassifier, IconError, IconMatch, IconSize};
pub use hashing::{content_hash, manifest_json, sha256_hex};
pub use options::{OptionsError, PluginOptions};
pub use pipeline::{synthesize, Compilation, ManifestPlugin, MemoryCompilation, OutputGroup, PipelineError, SynthesizedManifest, OUTPUT_GROUP_NAME};
