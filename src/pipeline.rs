//! Manifest Pipeline - Single Entry Point
//!
//! CRITICAL: synthesize MUST validate content internally. No bypass.
//!
//! One pass: classify output names -> validate content -> merge icons ->
//! serialize -> hash -> name. Nothing reaches the host until every step
//! has succeeded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::content::{ManifestContent, ICONS_KEY};
use crate::hashing::{content_hash, manifest_json};
use crate::icons::{Icon, IconClassifier, IconError};
use crate::options::PluginOptions;
use crate::validation::{ValidationError, Validator};

/// Name of the output group holding the emitted manifest.
pub const OUTPUT_GROUP_NAME: &str = "app-manifest";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Icon classification failed: {0}")]
    IconClassification(#[from] IconError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Named collection of output files, for reporting layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputGroup {
    pub name: String,
    pub files: Vec<String>,
}

/// Result of one pass: the artifact to emit plus its group registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedManifest {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub output_group: OutputGroup,
}

/// The build pipeline as seen from the plugin.
///
/// Adapters call [`ManifestPlugin::apply`] once every other asset has been
/// produced and before output is flushed.
pub trait Compilation {
    /// Final output file names, in emission order.
    fn asset_names(&self) -> Vec<String>;

    /// URL prefix for output files. `None` when unset or not a string.
    fn public_path(&self) -> Option<&str>;

    fn emit_asset(&mut self, filename: String, bytes: Vec<u8>);

    fn register_output_group(&mut self, group: OutputGroup);
}

/// Strip one leading and one trailing `/`.
pub fn normalize_destination(destination: &str) -> &str {
    let trimmed = destination.strip_prefix('/').unwrap_or(destination);
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}

/// `<destination>/manifest-<hash>.json`; no leading slash when destination is empty.
pub fn manifest_filename(destination: &str, hash: &str) -> String {
    match normalize_destination(destination) {
        "" => format!("manifest-{}.json", hash),
        dir => format!("{}/manifest-{}.json", dir, hash),
    }
}

/// Icons for every output name the classifier accepts, in input order.
pub fn collect_icons<S: AsRef<str>>(
    output_file_names: &[S],
    public_path: &str,
    classifier: &IconClassifier,
) -> Result<Vec<Icon>, IconError> {
    output_file_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| classifier.is_icon(name))
        .map(|name| -> Result<Icon, IconError> {
            let icon = classifier.describe(name, public_path)?;
            debug!(file = name, sizes = %icon.sizes, mime_type = %icon.mime_type, "manifest icon");
            Ok(icon)
        })
        .collect()
}

/// Synthesize a manifest with strict validation.
pub fn synthesize<S: AsRef<str>>(
    output_file_names: &[S],
    public_path: &str,
    content: &ManifestContent,
    classifier: &IconClassifier,
    destination: &str,
) -> Result<SynthesizedManifest, PipelineError> {
    synthesize_with(
        &Validator::new(),
        output_file_names,
        public_path,
        content,
        classifier,
        destination,
    )
}

fn synthesize_with<S: AsRef<str>>(
    validator: &Validator,
    output_file_names: &[S],
    public_path: &str,
    content: &ManifestContent,
    classifier: &IconClassifier,
    destination: &str,
) -> Result<SynthesizedManifest, PipelineError> {
    let icons = collect_icons(output_file_names, public_path, classifier)?;

    // MANDATORY: content is always validated, even when empty.
    let validated = validator.validated(content)?;

    // Derived icons always replace any user-supplied list and come last.
    let mut manifest: Map<String, Value> = validated
        .into_map()
        .into_iter()
        .filter(|(key, _)| key != ICONS_KEY)
        .collect();
    manifest.insert(ICONS_KEY.to_string(), serde_json::to_value(&icons)?);

    let json = manifest_json(&manifest)?;
    let hash = content_hash(json.as_bytes());
    let filename = manifest_filename(destination, &hash);

    Ok(SynthesizedManifest {
        output_group: OutputGroup {
            name: OUTPUT_GROUP_NAME.to_string(),
            files: vec![filename.clone()],
        },
        filename,
        bytes: json.into_bytes(),
    })
}

/// The plugin - immutable configuration captured at construction
#[derive(Debug)]
pub struct ManifestPlugin {
    content: ManifestContent,
    destination: String,
    classifier: IconClassifier,
    validator: Validator,
}

impl ManifestPlugin {
    pub fn new(options: PluginOptions) -> Self {
        Self::with_classifier(options, IconClassifier::default())
    }

    pub fn with_classifier(options: PluginOptions, classifier: IconClassifier) -> Self {
        Self {
            content: options.content,
            destination: options.destination,
            classifier,
            validator: Validator::with_shape_check(options.shape_check),
        }
    }

    pub fn classifier(&self) -> &IconClassifier {
        &self.classifier
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn synthesize<S: AsRef<str>>(
        &self,
        output_file_names: &[S],
        public_path: &str,
    ) -> Result<SynthesizedManifest, PipelineError> {
        synthesize_with(
            &self.validator,
            output_file_names,
            public_path,
            &self.content,
            &self.classifier,
            &self.destination,
        )
    }

    /// Run one pass against the host: exactly one emission and one group
    /// registration on success, nothing on failure. Returns the filename.
    pub fn apply<C: Compilation + ?Sized>(&self, compilation: &mut C) -> Result<String, PipelineError> {
        let public_path = compilation
            .public_path()
            .ok_or_else(|| PipelineError::Configuration("publicPath must be set to a string".to_string()))?
            .to_string();
        let asset_names = compilation.asset_names();

        let SynthesizedManifest { filename, bytes, output_group } =
            self.synthesize(asset_names.as_slice(), &public_path)?;

        info!(file = %filename, bytes = bytes.len(), "emitting web app manifest");
        compilation.emit_asset(filename.clone(), bytes);
        compilation.register_output_group(output_group);
        Ok(filename)
    }
}

/// In-memory host, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryCompilation {
    asset_names: Vec<String>,
    public_path: Option<String>,
    emitted: Vec<(String, Vec<u8>)>,
    output_groups: Vec<OutputGroup>,
}

impl MemoryCompilation {
    pub fn new<I, S>(asset_names: I, public_path: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            asset_names: asset_names.into_iter().map(Into::into).collect(),
            public_path: public_path.map(str::to_string),
            emitted: vec![],
            output_groups: vec![],
        }
    }

    pub fn emitted(&self) -> &[(String, Vec<u8>)] {
        &self.emitted
    }

    pub fn output_group(&self, name: &str) -> Option<&OutputGroup> {
        self.output_groups.iter().find(|g| g.name == name)
    }

    pub fn output_groups(&self) -> &[OutputGroup] {
        &self.output_groups
    }
}

impl Compilation for MemoryCompilation {
    fn asset_names(&self) -> Vec<String> {
        self.asset_names.clone()
    }

    fn public_path(&self) -> Option<&str> {
        self.public_path.as_deref()
    }

    fn emit_asset(&mut self, filename: String, bytes: Vec<u8>) {
        self.asset_names.push(filename.clone());
        self.emitted.push((filename, bytes));
    }

    fn register_output_group(&mut self, group: OutputGroup) {
        self.output_groups.push(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconSize;
    use serde_json::json;

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("/manifest/"), "manifest");
        assert_eq!(normalize_destination("manifest"), "manifest");
        assert_eq!(normalize_destination("/manifest"), "manifest");
        assert_eq!(normalize_destination("//a/b//"), "/a/b/");
        assert_eq!(normalize_destination("/"), "");
    }

    #[test]
    fn test_manifest_filename() {
        assert_eq!(manifest_filename("/pwa/", "0123abcd"), "pwa/manifest-0123abcd.json");
        assert_eq!(manifest_filename("", "0123abcd"), "manifest-0123abcd.json");
    }

    #[test]
    fn test_default_icons_scenario() {
        let names = ["icon_192-abcd1234.png", "icon_512-abcd1234.png", "logo.png"];
        let out = synthesize(&names, "/", &ManifestContent::new(), &IconClassifier::new(), "manifest").unwrap();
        let manifest = parse(&out.bytes);
        let icons = manifest["icons"].as_array().unwrap();
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0], json!({"sizes": "192x192", "type": "image/png", "src": "/icon_192-abcd1234.png"}));
        assert_eq!(icons[1]["sizes"], "512x512");
        assert_eq!(icons[1]["type"], "image/png");
        assert!(out.filename.starts_with("manifest/manifest-"));
        assert!(out.filename.ends_with(".json"));
    }

    #[test]
    fn test_icons_keep_input_order() {
        let names = ["icon_512-b.png", "icon_48-a.png", "icon_192-c.png"];
        let icons = collect_icons(&names, "/", &IconClassifier::new()).unwrap();
        let sizes: Vec<_> = icons.iter().map(|i| i.sizes.as_str()).collect();
        assert_eq!(sizes, vec!["512x512", "48x48", "192x192"]);
    }

    #[test]
    fn test_user_icons_overwritten_and_last() {
        let content = ManifestContent::new()
            .with("icons", json!([{"src": "/user.png"}]))
            .with("theme_color", "#000")
            .with("name", "Tumblr");
        let out = synthesize(&["icon_48-a.png"], "/", &content, &IconClassifier::new(), "m").unwrap();
        let manifest = parse(&out.bytes);
        let keys: Vec<_> = manifest.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "theme_color", "icons"]);
        assert_eq!(manifest["icons"][0]["src"], "/icon_48-a.png");
    }

    #[test]
    fn test_filename_hash_matches_bytes() {
        let out = synthesize(&["icon_48-a.png"], "/", &ManifestContent::new(), &IconClassifier::new(), "/manifest/").unwrap();
        let expected = format!("manifest/manifest-{}.json", content_hash(&out.bytes));
        assert_eq!(out.filename, expected);
        assert_eq!(out.output_group, OutputGroup {
            name: "app-manifest".to_string(),
            files: vec![expected],
        });
    }

    #[test]
    fn test_custom_predicate_with_custom_describers() {
        let classifier = IconClassifier::new()
            .with_predicate(|name| name == "this_is_a_manifest_icon.png")
            .with_size(|_| Ok(IconSize { width: 120, height: 90 }))
            .with_type(|_| Ok("image/png".to_string()));
        let names = ["this_is_a_manifest_icon.png", "icon_192-abcd.png"];
        let out = synthesize(&names, "/", &ManifestContent::new(), &classifier, "manifest").unwrap();
        let manifest = parse(&out.bytes);
        assert_eq!(manifest["icons"], json!([{
            "sizes": "120x90",
            "type": "image/png",
            "src": "/this_is_a_manifest_icon.png",
        }]));
    }

    #[test]
    fn test_custom_predicate_with_default_describers_fails() {
        let classifier = IconClassifier::new().with_predicate(|name| name.ends_with(".png"));
        let err = synthesize(&["logo.png"], "/", &ManifestContent::new(), &classifier, "manifest").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::IconClassification(IconError::ClassificationMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_content_blocks_synthesis() {
        let content = ManifestContent::new().with("display", "kiosk");
        let err = synthesize(&["icon_48-a.png"], "/", &content, &IconClassifier::new(), "m").unwrap_err();
        assert!(err.to_string().contains("Validation failed"));
    }

    #[test]
    fn test_apply_emits_and_registers_once() {
        let plugin = ManifestPlugin::new(PluginOptions {
            content: ManifestContent::new().with("name", "Tumblr"),
            ..PluginOptions::default()
        });
        let mut compilation = MemoryCompilation::new(["manifest/icon_192-h.png", "main.js"], Some("/assets/"));
        let filename = plugin.apply(&mut compilation).unwrap();

        assert_eq!(compilation.emitted().len(), 1);
        assert_eq!(compilation.emitted()[0].0, filename);
        assert_eq!(compilation.output_groups().len(), 1);
        assert_eq!(compilation.output_group(OUTPUT_GROUP_NAME).unwrap().files, vec![filename.clone()]);
        assert!(compilation.asset_names().contains(&filename));

        let manifest = parse(&compilation.emitted()[0].1);
        assert_eq!(manifest["name"], "Tumblr");
        assert_eq!(manifest["icons"][0]["src"], "/assets/manifest/icon_192-h.png");
    }

    #[test]
    fn test_apply_without_public_path_is_configuration_error() {
        let plugin = ManifestPlugin::new(PluginOptions::default());
        let mut compilation = MemoryCompilation::new(["icon_48-a.png"], None);
        let err = plugin.apply(&mut compilation).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(compilation.emitted().is_empty());
        assert!(compilation.output_groups().is_empty());
    }

    #[test]
    fn test_apply_failure_emits_nothing() {
        let plugin = ManifestPlugin::with_classifier(
            PluginOptions::default(),
            IconClassifier::new().with_predicate(|_| true),
        );
        let mut compilation = MemoryCompilation::new(["main.js"], Some("/"));
        assert!(plugin.apply(&mut compilation).is_err());
        assert!(compilation.emitted().is_empty());
        assert!(compilation.output_groups().is_empty());
    }
}
