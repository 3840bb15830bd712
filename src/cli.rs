use crate::config::Configuration;
use crate::extension::ExtensionRegistry;
use crate::manifest::Manifest;
use crate::serializer::write_document;
use crate::swagger::Swagger;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "config/swagger_bake.yml";

/// OpenAPI Bake - Bake an OpenAPI document from an application's routes, tables and annotations
#[derive(Parser, Debug)]
#[command(name = "openapi-bake")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the application manifest directory
    #[arg(value_name = "APP_PATH")]
    pub app_path: PathBuf,

    /// Configuration file (default: <APP_PATH>/config/swagger_bake.yml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Output path relative to APP_PATH, overrides `json` from the configuration
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.app_path.join(DEFAULT_CONFIG))
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.app_path.exists() {
        anyhow::bail!("Application path does not exist: {}", args.app_path.display());
    }
    if !args.app_path.is_dir() {
        anyhow::bail!("Application path is not a directory: {}", args.app_path.display());
    }

    info!("Application path: {}", args.app_path.display());
    info!("Configuration: {}", args.config_file().display());
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output);
    }

    Ok(args)
}

/// Run the main workflow. Returns the path of the written document.
///
/// Library errors pass through unwrapped so callers can downcast to
/// [`crate::error::Error`] and report its kind.
pub fn run(args: CliArgs) -> Result<PathBuf> {
    info!("Starting OpenAPI document generation...");

    let mut config = Configuration::from_file(&args.config_file(), &args.app_path)?;
    if let Some(output) = args.output_path {
        config = config.with_json(output);
    }

    let manifest = Manifest::load(&args.app_path).context("Failed to load application manifest")?;
    let extensions = ExtensionRegistry::with_defaults();
    let swagger = Swagger::new(&config, &manifest, &manifest, &manifest, &extensions);

    let document = swagger.build()?;

    let output = config.json();
    write_document(&document, &output)?;
    info!("OpenAPI document written to: {}", output.display());
    Ok(output)
}
