//! WebManifest CLI - Standalone host for the manifest plugin
//!
//! Commands: synthesize, validate, match
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or synthesis failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webmanifest_core::{
    Compilation, IconClassifier, ManifestContent, ManifestPlugin, MemoryCompilation,
    PluginOptions, ShapeCheck, Validator, OUTPUT_GROUP_NAME,
};

#[derive(Parser)]
#[command(name = "webmanifest-cli")]
#[command(about = "WebManifest CLI - Web App Manifest synthesis from build output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a manifest from a list of output file names
    Synthesize {
        /// Plugin options file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// URL prefix output files are served under
        #[arg(short, long)]
        public_path: Option<String>,

        /// Directory to write the manifest into
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// File listing output names, one per line
        #[arg(long)]
        assets_file: Option<PathBuf>,

        /// Output file names
        assets: Vec<String>,
    },

    /// Validate manifest content
    Validate {
        /// JSON object with manifest fields
        #[arg(short, long)]
        content: String,

        /// Report shape violations without failing
        #[arg(long)]
        lenient: bool,
    },

    /// Show how the default classifier treats output names
    Match {
        /// Output file names
        assets: Vec<String>,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webmanifest_cli=info,webmanifest_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            true
        }
        Err(e) => {
            error!("failed to render output: {}", e);
            false
        }
    }
}

fn failure(message: impl std::fmt::Display) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": message.to_string(),
    });
    print_json(&output);
    ExitCode::from(2)
}

fn read_asset_names(assets_file: Option<&Path>, mut assets: Vec<String>) -> std::io::Result<Vec<String>> {
    if let Some(path) = assets_file {
        let listing = fs::read_to_string(path)?;
        assets.extend(
            listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    Ok(assets)
}

fn write_manifest(out_dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let target = out_dir.join(filename);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;
    Ok(target)
}

fn run_synthesize(
    config: Option<PathBuf>,
    public_path: Option<String>,
    out_dir: Option<PathBuf>,
    assets_file: Option<PathBuf>,
    assets: Vec<String>,
) -> ExitCode {
    let options = match config {
        Some(path) => match PluginOptions::load(&path) {
            Ok(o) => o,
            Err(e) => return failure(e),
        },
        None => PluginOptions::default(),
    };

    let asset_names = match read_asset_names(assets_file.as_deref(), assets) {
        Ok(a) => a,
        Err(e) => return failure(format!("Failed to read assets file: {}", e)),
    };

    let plugin = ManifestPlugin::new(options);
    let mut compilation = MemoryCompilation::new(asset_names, public_path.as_deref());

    let filename = match plugin.apply(&mut compilation) {
        Ok(f) => f,
        Err(e) => return failure(e),
    };

    let Some((_, bytes)) = compilation.emitted().iter().find(|(name, _)| *name == filename) else {
        return failure("manifest was not emitted");
    };

    if let Some(dir) = out_dir {
        match write_manifest(&dir, &filename, bytes) {
            Ok(path) => info!(path = %path.display(), "wrote manifest"),
            Err(e) => return failure(format!("Failed to write manifest: {}", e)),
        }
    }

    let manifest: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(m) => m,
        Err(e) => return failure(e),
    };
    let output = serde_json::json!({
        "success": true,
        "filename": filename,
        "outputGroup": compilation.output_group(OUTPUT_GROUP_NAME),
        "assets": compilation.asset_names(),
        "manifest": manifest,
    });
    if print_json(&output) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Synthesize { config, public_path, out_dir, assets_file, assets } => {
            run_synthesize(config, public_path, out_dir, assets_file, assets)
        }

        Commands::Validate { content, lenient } => {
            let content: ManifestContent = match serde_json::from_str(&content) {
                Ok(c) => c,
                Err(e) => return failure(format!("Invalid content: {}", e)),
            };

            let shape_check = if lenient { ShapeCheck::Lenient } else { ShapeCheck::Strict };
            let result = Validator::with_shape_check(shape_check).validate(&content);
            if !print_json(&result) {
                return ExitCode::FAILURE;
            }
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Validation failure
            }
        }

        Commands::Match { assets } => {
            let classifier = IconClassifier::default();
            let matches: Vec<_> = assets.iter().map(|name| classifier.inspect(name)).collect();

            if print_json(&matches) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
