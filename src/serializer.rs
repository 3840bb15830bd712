//! Serialization of assembled documents to JSON and writing them to disk.

use crate::swagger::SwaggerDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a document to pretty-printed JSON.
///
/// Key order is the document's own: seed keys first as written, generated
/// `paths` and `components.schemas` sorted. Serializing the same document twice
/// yields byte-identical output.
///
/// # Example
///
/// ```
/// use openapi_bake::serializer::serialize_json;
/// use openapi_bake::swagger::assemble;
/// use std::collections::BTreeMap;
///
/// let seed = serde_json::json!({"info": {"title": "API", "version": "1.0.0"}});
/// let doc = assemble(seed, &BTreeMap::new(), &BTreeMap::new()).unwrap();
/// let json = serialize_json(&doc).unwrap();
/// assert!(json.starts_with("{\n  \"openapi\": \"3.0.0\""));
/// ```
pub fn serialize_json(doc: &SwaggerDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    let mut json =
        serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")?;
    json.push('\n');
    Ok(json)
}

/// Writes string content to a file, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Serializes a document and writes it to `path`
pub fn write_document(doc: &SwaggerDocument, path: &Path) -> Result<()> {
    let json = serialize_json(doc)?;
    write_to_file(&json, path)
}
