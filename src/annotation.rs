//! Developer-supplied annotations and the registry that reads them.
//!
//! Annotations are sparse overrides: every field is optional and only the fields a
//! developer actually sets take part in a merge.

use crate::provider::{AttributeProvider, Declaration};
use crate::route::ActionRef;
use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One annotation attached to a controller, action or entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "attribute")]
pub enum AnnotationRecord {
    /// Entity-level schema metadata
    OpenApiSchema {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    /// Override for one entity property
    OpenApiSchemaProperty(PropertyOverride),
    /// Operation metadata on an action
    OpenApiOperation(OperationOverride),
    OpenApiPathParam(ParamAnnotation),
    OpenApiQueryParam(ParamAnnotation),
    /// Response override for one status code
    OpenApiResponse(ResponseAnnotation),
    /// Security requirement on a controller or action
    OpenApiSecurity {
        name: String,
        #[serde(default)]
        scopes: Vec<String>,
    },
    /// Search filters to expose as query parameters
    #[serde(rename_all = "camelCase")]
    OpenApiSearch {
        table_class: String,
        #[serde(default)]
        collection: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyOverride {
    pub name: String,
    #[serde(rename = "type", default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default)]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub write_only: Option<bool>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationOverride {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    /// `false` keeps the operation out of the document
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamAnnotation {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default)]
    pub example: Option<Value>,
}

fn default_param_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseAnnotation {
    /// `statusCode`, written either as `200` or `'200'`
    #[serde(rename = "statusCode", deserialize_with = "status_code")]
    pub status: String,
    /// Component schema the response body references
    #[serde(default)]
    pub schema: Option<String>,
    /// Render the body as an array of `schema`
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusCode {
    Number(u16),
    Text(String),
}

fn status_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StatusCode::deserialize(deserializer)? {
        StatusCode::Number(code) => code.to_string(),
        StatusCode::Text(code) => code,
    })
}

/// Process-scoped view over an [`AttributeProvider`].
///
/// Built once by [`AnnotationRegistry::load`] and passed by reference to every stage
/// that needs annotations.
pub struct AnnotationRegistry<'a> {
    provider: &'a dyn AttributeProvider,
}

impl<'a> AnnotationRegistry<'a> {
    pub fn load(provider: &'a dyn AttributeProvider) -> Self {
        debug!("Loading annotation registry");
        Self { provider }
    }

    pub fn controller(&self, class: &str) -> Vec<AnnotationRecord> {
        self.provider.read(&Declaration::Controller(class.to_string()))
    }

    pub fn action(&self, action: &ActionRef) -> Vec<AnnotationRecord> {
        self.provider.read(&action.declaration())
    }

    pub fn entity(&self, class: &str) -> Vec<AnnotationRecord> {
        self.provider.read(&Declaration::Entity(class.to_string()))
    }

    /// Property overrides declared on an entity, in declaration order
    pub fn property_overrides(&self, entity_class: &str) -> Vec<PropertyOverride> {
        self.entity(entity_class)
            .into_iter()
            .filter_map(|record| match record {
                AnnotationRecord::OpenApiSchemaProperty(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    /// Title and description declared on an entity
    pub fn schema_info(&self, entity_class: &str) -> (Option<String>, Option<String>) {
        self.entity(entity_class)
            .into_iter()
            .find_map(|record| match record {
                AnnotationRecord::OpenApiSchema { title, description } => Some((title, description)),
                _ => None,
            })
            .unwrap_or((None, None))
    }
}
