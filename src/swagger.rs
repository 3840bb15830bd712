//! Document assembly: merges generated schemas and paths into the seed document and
//! checks the result is internally consistent.

use crate::annotation::AnnotationRegistry;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::extension::ExtensionRegistry;
use crate::model::ModelScanner;
use crate::operation::{OperationBuilder, PathItem};
use crate::provider::{AttributeProvider, ModelProvider, RouteProvider};
use crate::route::RouteScanner;
use crate::schema::{Schema, SchemaRegistry};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const DEFAULT_OPENAPI_VERSION: &str = "3.0.0";

const OPERATION_KEYS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// A merged, validated OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SwaggerDocument {
    value: Value,
}

impl SwaggerDocument {
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Look up a JSON pointer, e.g. `/paths/~1employees/get`
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.value.pointer(pointer)
    }

    /// Whether the document has an operation for `path` and `method` (lowercase)
    pub fn has_operation(&self, path: &str, method: &str) -> bool {
        self.value
            .get("paths")
            .and_then(|paths| paths.get(path))
            .and_then(|item| item.get(method))
            .is_some()
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.value
            .pointer("/components/schemas")
            .and_then(Value::as_object)
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Read the seed YAML into a JSON value, keeping key order
pub fn read_seed(path: &Path) -> Result<Value> {
    debug!("Reading seed document {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;
    if yaml.is_null() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::to_value(yaml)?)
}

/// Merge generated schemas and paths into the seed.
///
/// Seed keys are kept in place. On a collision inside `components.schemas` or `paths`
/// the generated entry replaces the seed entry. Both maps come out sorted by key.
pub fn assemble(
    seed: Value,
    schemas: &BTreeMap<String, Schema>,
    paths: &BTreeMap<String, PathItem>,
) -> Result<SwaggerDocument> {
    let Value::Object(seed) = seed else {
        return Err(Error::Assembly("seed document must be a mapping".to_string()));
    };

    let mut document = Map::new();
    if !seed.contains_key("openapi") {
        document.insert("openapi".to_string(), Value::from(DEFAULT_OPENAPI_VERSION));
    }
    document.extend(seed);

    let generated_paths = serde_json::to_value(paths)?;
    let seed_paths = document.get_mut("paths").map(Value::take);
    let merged_paths = merge_sorted(seed_paths, generated_paths, "paths")?;
    document.insert("paths".to_string(), merged_paths);

    let components = document
        .entry("components")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(components) = components else {
        return Err(Error::Assembly("`components` must be a mapping".to_string()));
    };
    let generated_schemas = serde_json::to_value(schemas)?;
    let merged_schemas = merge_sorted(
        components.get_mut("schemas").map(Value::take),
        generated_schemas,
        "components.schemas",
    )?;
    components.insert("schemas".to_string(), merged_schemas);

    let value = Value::Object(document);
    check_references(&value, &value)?;
    check_operation_ids(&value)?;

    Ok(SwaggerDocument { value })
}

fn merge_sorted(seed: Option<Value>, generated: Value, section: &str) -> Result<Value> {
    let mut merged: BTreeMap<String, Value> = BTreeMap::new();
    match seed {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => merged.extend(entries),
        Some(_) => return Err(Error::Assembly(format!("`{}` must be a mapping", section))),
    }
    if let Value::Object(entries) = generated {
        for (key, value) in entries {
            if merged.insert(key.clone(), value).is_some() {
                debug!("Generated {} entry {} replaces the seed entry", section, key);
            }
        }
    }
    Ok(Value::Object(merged.into_iter().collect()))
}

fn check_references(node: &Value, document: &Value) -> Result<()> {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let pointer = reference.strip_prefix('#').ok_or_else(|| {
                    Error::Assembly(format!("reference `{}` is not a local reference", reference))
                })?;
                let segments: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
                if !matches!(segments.as_slice(), ["components", section, key] if !section.is_empty() && !key.is_empty())
                {
                    return Err(Error::Assembly(format!(
                        "reference `{}` must name an entry of a components section",
                        reference
                    )));
                }
                if document.pointer(pointer).is_none() {
                    return Err(Error::Assembly(format!("unresolved reference `{}`", reference)));
                }
            }
            map.values().try_for_each(|child| check_references(child, document))
        }
        Value::Array(items) => items.iter().try_for_each(|child| check_references(child, document)),
        _ => Ok(()),
    }
}

fn check_operation_ids(document: &Value) -> Result<()> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Ok(());
    };
    let mut seen: HashMap<&str, String> = HashMap::new();
    for (path, item) in paths {
        for method in OPERATION_KEYS {
            let Some(id) = item.pointer(&format!("/{}/operationId", method)).and_then(Value::as_str) else {
                continue;
            };
            let location = format!("{} {}", method.to_uppercase(), path);
            if let Some(first) = seen.insert(id, location.clone()) {
                return Err(Error::Assembly(format!(
                    "duplicate operationId `{}` on {} and {}",
                    id, first, location
                )));
            }
        }
    }
    Ok(())
}

/// Runs the whole pipeline: routes, operations, schemas, extensions, assembly
pub struct Swagger<'s> {
    config: &'s Configuration,
    routes: &'s dyn RouteProvider,
    models: &'s dyn ModelProvider,
    attributes: &'s dyn AttributeProvider,
    extensions: &'s ExtensionRegistry,
}

impl<'s> Swagger<'s> {
    pub fn new(
        config: &'s Configuration,
        routes: &'s dyn RouteProvider,
        models: &'s dyn ModelProvider,
        attributes: &'s dyn AttributeProvider,
        extensions: &'s ExtensionRegistry,
    ) -> Self {
        Self {
            config,
            routes,
            models,
            attributes,
            extensions,
        }
    }

    /// Validate the configuration and build the document. Nothing is written.
    pub fn build(&self) -> Result<SwaggerDocument> {
        self.config.validate()?;

        let routes = RouteScanner::new(self.routes, self.config).scan()?;
        info!("Building operations for {} routes", routes.len());

        let models = ModelScanner::new(self.models, self.config);
        let annotations = AnnotationRegistry::load(self.attributes);
        let mut schemas = SchemaRegistry::new(&models, &annotations, self.extensions);
        let mut builder = OperationBuilder::new(self.config, &models, &annotations, self.extensions);

        let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
        for route in &routes {
            if let Some(operation) = builder.build_operation(route, &mut schemas)? {
                paths.entry(route.path.clone()).or_default().set(operation);
            }
        }
        info!(
            "Generated {} paths and {} schemas",
            paths.len(),
            schemas.get_schemas().len()
        );

        let seed = read_seed(&self.config.yml())?;
        assemble(seed, schemas.get_schemas(), &paths)
    }
}
