//! Resolved run settings and their preconditions.
//!
//! A [`Configuration`] is built once per run from a YAML settings file and is shared
//! read-only by every other stage of the pipeline.

use crate::error::{ConfigError, Error, Result};
use log::debug;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Raw settings as they appear in the settings file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// URL prefix routes must live under
    #[serde(default)]
    pub prefix: String,
    /// Seed document path, relative to the application root
    #[serde(default)]
    pub yml: String,
    /// Output document path, relative to the application root
    #[serde(default)]
    pub json: String,
    #[serde(default = "default_web_path")]
    pub web_path: String,
    #[serde(default)]
    pub hot_reload: bool,
    /// Name of the schema error responses reference
    #[serde(default = "default_exception_schema")]
    pub exception_schema: String,
    #[serde(default = "default_request_accepts")]
    pub request_accepts: Vec<String>,
    #[serde(default = "default_response_content_types")]
    pub response_content_types: Vec<String>,
    #[serde(default)]
    pub namespaces: Namespaces,
}

/// Namespace prefixes used to turn short names into fully qualified class names
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Namespaces {
    #[serde(default = "default_namespace")]
    pub controllers: Vec<String>,
    #[serde(default = "default_namespace")]
    pub entities: Vec<String>,
    #[serde(default = "default_namespace")]
    pub tables: Vec<String>,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            controllers: default_namespace(),
            entities: default_namespace(),
            tables: default_namespace(),
        }
    }
}

fn default_web_path() -> String {
    "/swagger.json".to_string()
}

fn default_exception_schema() -> String {
    "Exception".to_string()
}

fn default_request_accepts() -> Vec<String> {
    vec![
        "application/x-www-form-urlencoded".to_string(),
        "application/json".to_string(),
    ]
}

fn default_response_content_types() -> Vec<String> {
    vec!["application/json".to_string()]
}

fn default_namespace() -> Vec<String> {
    vec!["\\App\\".to_string()]
}

/// Settings bound to an application root
#[derive(Debug, Clone)]
pub struct Configuration {
    settings: Settings,
    root: PathBuf,
}

impl Configuration {
    pub fn new(settings: Settings, root: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            root: root.into(),
        }
    }

    /// Load settings from a YAML file and bind them to `root`
    pub fn from_file(path: &Path, root: impl Into<PathBuf>) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(Self::new(settings, root))
    }

    /// Replace the output path, keeping everything else
    pub fn with_json(mut self, json: impl Into<String>) -> Self {
        self.settings.json = json.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.settings.prefix
    }

    /// Seed document path resolved against the application root
    pub fn yml(&self) -> PathBuf {
        self.resolve(&self.settings.yml)
    }

    /// Output document path resolved against the application root
    pub fn json(&self) -> PathBuf {
        self.resolve(&self.settings.json)
    }

    pub fn web_path(&self) -> &str {
        &self.settings.web_path
    }

    pub fn hot_reload(&self) -> bool {
        self.settings.hot_reload
    }

    pub fn exception_schema(&self) -> &str {
        &self.settings.exception_schema
    }

    pub fn request_accepts(&self) -> &[String] {
        &self.settings.request_accepts
    }

    pub fn response_content_types(&self) -> &[String] {
        &self.settings.response_content_types
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.settings.namespaces
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Check the preconditions every run depends on.
    ///
    /// Checks run in a fixed order: seed file name, seed file existence, prefix, output.
    /// A missing output file is created empty so a later write cannot fail on permissions.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let yml = &self.settings.yml;
        let yaml_like = Path::new(yml)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if yml.is_empty() || !yaml_like {
            return Err(ConfigError::InvalidSeedFile(yml.clone()));
        }

        let seed = self.yml();
        if !seed.is_file() {
            return Err(ConfigError::MissingSeedFile(seed));
        }

        if self.settings.prefix.is_empty() {
            return Err(ConfigError::MissingPrefix);
        }

        let output = self.json();
        if self.settings.json.is_empty() || !touch(&output) {
            return Err(ConfigError::OutputNotWritable(output));
        }

        debug!("Configuration validated for prefix {}", self.settings.prefix);
        Ok(())
    }
}

fn touch(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    if path.is_dir() {
        return false;
    }
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .is_ok()
}
