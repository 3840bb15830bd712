//! File-backed application description.
//!
//! A manifest directory stands in for a live host application:
//!
//! ```text
//! app/
//! ├── routes.yml        controllers and routes
//! ├── attributes.yml    annotations, by target declaration
//! └── tables/**/*.yml   one table per file
//! ```

use crate::annotation::AnnotationRecord;
use crate::provider::{
    AttributeProvider, ControllerRecord, Declaration, EntityMetadata, ModelProvider, RouteProvider,
    RouteRecord,
};
use crate::scanner::FileScanner;
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const ROUTES_FILE: &str = "routes.yml";
const ATTRIBUTES_FILE: &str = "attributes.yml";
const TABLES_DIR: &str = "tables";

#[derive(Debug, Default, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    controllers: Vec<ControllerRecord>,
    #[serde(default)]
    routes: Vec<RouteRecord>,
}

#[derive(Debug, Deserialize)]
struct AttributeEntry {
    target: Target,
    #[serde(default)]
    attributes: Vec<AnnotationRecord>,
}

/// Exactly one of the keys names the declaration
#[derive(Debug, Default, Deserialize)]
struct Target {
    #[serde(default)]
    controller: Option<String>,
    /// `Class::action`
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    entity: Option<String>,
}

impl Target {
    fn into_declaration(self) -> Result<Declaration> {
        match (self.controller, self.action, self.entity) {
            (Some(class), None, None) => Ok(Declaration::Controller(class)),
            (None, None, Some(class)) => Ok(Declaration::Entity(class)),
            (None, Some(target), None) => {
                let Some((controller, action)) = target.split_once("::") else {
                    bail!("action target `{}` must look like `Class::action`", target);
                };
                Ok(Declaration::Action {
                    controller: controller.to_string(),
                    action: action.to_string(),
                })
            }
            _ => bail!("attribute target must name exactly one of controller, action or entity"),
        }
    }
}

/// Routes, tables and annotations loaded from a manifest directory
#[derive(Debug, Default)]
pub struct Manifest {
    controllers: Vec<ControllerRecord>,
    routes: Vec<RouteRecord>,
    tables: IndexMap<String, EntityMetadata>,
    attributes: HashMap<Declaration, Vec<AnnotationRecord>>,
}

impl Manifest {
    /// Load a manifest rooted at `root`. `routes.yml` is required, the rest is optional.
    pub fn load(root: &Path) -> Result<Self> {
        info!("Loading application manifest from {}", root.display());
        let mut manifest = Manifest::default();

        let routes_path = root.join(ROUTES_FILE);
        let content = fs::read_to_string(&routes_path)
            .with_context(|| format!("Failed to read {}", routes_path.display()))?;
        let routes: RoutesFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", routes_path.display()))?;
        manifest.controllers = routes.controllers;
        manifest.routes = routes.routes;

        let attributes_path = root.join(ATTRIBUTES_FILE);
        if attributes_path.is_file() {
            manifest.load_attributes(&attributes_path)?;
        } else {
            debug!("No {} found, no annotations loaded", ATTRIBUTES_FILE);
        }

        let tables_dir = root.join(TABLES_DIR);
        if tables_dir.is_dir() {
            manifest.load_tables(&tables_dir)?;
        } else {
            warn!("No {} directory under {}", TABLES_DIR, root.display());
        }

        info!(
            "Manifest has {} routes, {} controllers and {} tables",
            manifest.routes.len(),
            manifest.controllers.len(),
            manifest.tables.len()
        );
        Ok(manifest)
    }

    fn load_attributes(&mut self, path: &Path) -> Result<()> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let entries: Option<Vec<AttributeEntry>> = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        for entry in entries.unwrap_or_default() {
            let declaration = entry.target.into_declaration()?;
            self.attributes
                .entry(declaration)
                .or_default()
                .extend(entry.attributes);
        }
        Ok(())
    }

    fn load_tables(&mut self, dir: &Path) -> Result<()> {
        let files = FileScanner::new(dir.to_path_buf())
            .scan()?
            .into_files()
            .with_context(|| format!("Failed to scan {}", dir.display()))?;
        for path in files {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let table: EntityMetadata = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse table file {}", path.display()))?;
            debug!("Loaded table {} from {}", table.class, path.display());
            if self.tables.contains_key(&table.class) {
                bail!("table class `{}` is described twice", table.class);
            }
            self.tables.insert(table.class.clone(), table);
        }
        Ok(())
    }
}

impl RouteProvider for Manifest {
    fn list_routes(&self) -> Vec<RouteRecord> {
        self.routes.clone()
    }

    fn controller(&self, class: &str) -> Option<&ControllerRecord> {
        self.controllers.iter().find(|c| c.class == class)
    }
}

impl ModelProvider for Manifest {
    fn describe_table(&self, class: &str) -> Option<&EntityMetadata> {
        self.tables.get(class)
    }
}

impl AttributeProvider for Manifest {
    fn read(&self, declaration: &Declaration) -> Vec<AnnotationRecord> {
        self.attributes.get(declaration).cloned().unwrap_or_default()
    }
}
