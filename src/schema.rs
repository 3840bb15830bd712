use crate::annotation::{AnnotationRegistry, PropertyOverride};
use crate::error::{Error, Result};
use crate::extension::{ExtensionRegistry, SchemaContext};
use crate::model::ModelScanner;
use crate::naming::association_property;
use crate::provider::{ColumnDef, EntityMetadata, ValidationRule};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Prefix of every component schema reference
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Reference to a component schema
pub fn schema_ref(name: &str) -> String {
    format!("{}{}", SCHEMA_REF_PREFIX, name)
}

/// OpenAPI Schema definition for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required property names, in property order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    pub properties: IndexMap<String, SchemaProperty>,
}

impl Schema {
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            title: None,
            description: None,
            required: Vec::new(),
            properties: IndexMap::new(),
        }
    }

    /// Copy of this schema without read-only properties, for request bodies
    pub fn writable(&self) -> Schema {
        let properties: IndexMap<String, SchemaProperty> = self
            .properties
            .iter()
            .filter(|(_, p)| p.read_only != Some(true))
            .map(|(name, p)| (name.clone(), p.clone()))
            .collect();
        let required = self
            .required
            .iter()
            .filter(|name| properties.contains_key(*name))
            .cloned()
            .collect();
        Schema {
            schema_type: self.schema_type.clone(),
            title: self.title.clone(),
            description: None,
            required,
            properties,
        }
    }
}

/// Property definition for object schemas, also used for parameter schemas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Items schema for array properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl SchemaProperty {
    pub fn of_type(property_type: &str) -> Self {
        Self {
            property_type: Some(property_type.to_string()),
            ..Default::default()
        }
    }

    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(schema_ref(name)),
            ..Default::default()
        }
    }

    pub fn array_of(items: SchemaProperty) -> Self {
        Self {
            property_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }
}

/// Where a field's final value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Inferred,
    Annotated,
}

/// One entity column after merging column type, validation rules and annotations
#[derive(Debug, Clone, PartialEq)]
pub struct EntityField {
    pub name: String,
    pub field_type: String,
    pub format: Option<String>,
    pub nullable: bool,
    pub default: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    /// Explicit required flag from a rule or annotation
    pub required: Option<bool>,
    pub source: FieldSource,
}

impl EntityField {
    /// Infer a field from its column definition
    pub fn infer(column: &ColumnDef, entity: &EntityMetadata) -> Result<Self> {
        let (field_type, format) = map_column_type(&column.column_type).ok_or_else(|| {
            Error::schema_build(
                &entity.entity,
                format!(
                    "unmappable column type `{}` for `{}`",
                    column.column_type, column.name
                ),
            )
        })?;
        let max_length = if field_type == "string" && format.is_none() {
            column.length
        } else {
            None
        };
        let read_only = entity.primary_key.contains(&column.name)
            || matches!(column.name.as_str(), "created" | "modified");

        Ok(Self {
            name: column.name.clone(),
            field_type: field_type.to_string(),
            format: format.map(|f| f.to_string()),
            nullable: column.nullable,
            default: column.default.clone(),
            min_length: None,
            max_length,
            minimum: None,
            maximum: None,
            pattern: None,
            enum_values: None,
            description: column.comment.clone(),
            example: None,
            read_only,
            write_only: entity.hidden.contains(&column.name),
            deprecated: false,
            required: None,
            source: FieldSource::Inferred,
        })
    }

    /// Apply validation rules, overriding column-derived values
    pub fn apply_rules(&mut self, rules: &[ValidationRule]) {
        for rule in rules {
            match rule {
                ValidationRule::MinLength { value } => self.min_length = Some(*value),
                ValidationRule::MaxLength { value } => self.max_length = Some(*value),
                ValidationRule::LengthBetween { min, max } => {
                    self.min_length = Some(*min);
                    self.max_length = Some(*max);
                }
                ValidationRule::Regex { pattern } => self.pattern = Some(pattern.clone()),
                ValidationRule::InList { values } => self.enum_values = Some(values.clone()),
                ValidationRule::GreaterThanOrEqual { value } => self.minimum = Some(*value),
                ValidationRule::LessThanOrEqual { value } => self.maximum = Some(*value),
                ValidationRule::Range { min, max } => {
                    self.minimum = Some(*min);
                    self.maximum = Some(*max);
                }
                ValidationRule::Email => self.format = Some("email".to_string()),
                ValidationRule::Url => self.format = Some("uri".to_string()),
                ValidationRule::Uuid => self.format = Some("uuid".to_string()),
                ValidationRule::RequirePresence => self.required = Some(true),
                ValidationRule::AllowEmpty => self.nullable = true,
            }
        }
    }

    /// Apply an annotation. Only the attributes it sets are overridden.
    pub fn apply_override(&mut self, o: &PropertyOverride) {
        if let Some(v) = &o.property_type {
            self.field_type = v.clone();
        }
        if let Some(v) = &o.format {
            self.format = Some(v.clone());
        }
        if let Some(v) = &o.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = &o.example {
            self.example = Some(v.clone());
        }
        if let Some(v) = &o.enum_values {
            self.enum_values = Some(v.clone());
        }
        if let Some(v) = o.read_only {
            self.read_only = v;
        }
        if let Some(v) = o.write_only {
            self.write_only = v;
        }
        if let Some(v) = o.deprecated {
            self.deprecated = v;
        }
        if let Some(v) = o.required {
            self.required = Some(v);
        }
        if let Some(v) = o.nullable {
            self.nullable = v;
        }
        if let Some(v) = &o.default {
            self.default = Some(v.clone());
        }
        if let Some(v) = o.min_length {
            self.min_length = Some(v);
        }
        if let Some(v) = o.max_length {
            self.max_length = Some(v);
        }
        if let Some(v) = &o.pattern {
            self.pattern = Some(v.clone());
        }
        if let Some(v) = o.minimum {
            self.minimum = Some(v);
        }
        if let Some(v) = o.maximum {
            self.maximum = Some(v);
        }
        self.source = FieldSource::Annotated;
    }

    /// Non-nullable fields without a default are required unless a rule or
    /// annotation says otherwise
    pub fn is_required(&self) -> bool {
        self.required
            .unwrap_or(!self.nullable && self.default.is_none())
    }

    pub fn to_property(&self) -> SchemaProperty {
        SchemaProperty {
            reference: None,
            property_type: Some(self.field_type.clone()),
            format: self.format.clone(),
            description: self.description.clone(),
            items: None,
            enum_values: self.enum_values.clone(),
            example: self.example.clone(),
            default: self.default.clone(),
            nullable: self.nullable.then_some(true),
            read_only: self.read_only.then_some(true),
            write_only: self.write_only.then_some(true),
            deprecated: self.deprecated.then_some(true),
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            minimum: self.minimum,
            maximum: self.maximum,
        }
    }
}

/// Map an ORM column type to an OpenAPI type and format
pub fn map_column_type(column_type: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapped = match column_type.to_ascii_lowercase().as_str() {
        "string" | "char" | "text" => ("string", None),
        "uuid" | "binaryuuid" => ("string", Some("uuid")),
        "integer" | "smallinteger" | "tinyinteger" => ("integer", Some("int32")),
        "biginteger" => ("integer", Some("int64")),
        "float" | "decimal" => ("number", Some("float")),
        "boolean" => ("boolean", None),
        "date" => ("string", Some("date")),
        "datetime" | "datetimefractional" | "timestamp" | "timestampfractional"
        | "timestamptimezone" => ("string", Some("date-time")),
        "time" => ("string", Some("time")),
        "json" => ("object", None),
        "binary" => ("string", Some("binary")),
        _ => return None,
    };
    Some(mapped)
}

/// Merge an entity's columns with its validation rules and property annotations.
///
/// Yields exactly one field per column, in column order.
pub fn merge_fields(entity: &EntityMetadata, overrides: &[PropertyOverride]) -> Result<Vec<EntityField>> {
    let mut fields = Vec::with_capacity(entity.columns.len());
    for column in &entity.columns {
        let mut field = EntityField::infer(column, entity)?;
        if let Some(rules) = entity.validation.get(&column.name) {
            field.apply_rules(rules);
        }
        for o in overrides.iter().filter(|o| o.name == column.name) {
            field.apply_override(o);
        }
        fields.push(field);
    }
    for o in overrides {
        if entity.column(&o.name).is_none() {
            debug!("{}: annotation for unknown property {} ignored", entity.entity, o.name);
        }
    }
    Ok(fields)
}

/// Schema generator - builds and caches one component schema per entity
pub struct SchemaRegistry<'r> {
    models: &'r ModelScanner<'r>,
    annotations: &'r AnnotationRegistry<'r>,
    extensions: &'r ExtensionRegistry,
    /// Cache of generated schemas, keyed by schema name
    schemas: BTreeMap<String, Schema>,
    /// Table class each schema name was built from
    owners: HashMap<String, String>,
}

impl<'r> SchemaRegistry<'r> {
    pub fn new(
        models: &'r ModelScanner<'r>,
        annotations: &'r AnnotationRegistry<'r>,
        extensions: &'r ExtensionRegistry,
    ) -> Self {
        debug!("Initializing SchemaRegistry");
        Self {
            models,
            annotations,
            extensions,
            schemas: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Build the schema for an entity, and every entity it associates with, unless it
    /// is already cached. Returns the schema name.
    pub fn build_schema(&mut self, entity: &EntityMetadata) -> Result<String> {
        let mut visited = HashSet::new();
        self.build_visiting(entity, &mut visited)
    }

    fn build_visiting(&mut self, entity: &EntityMetadata, visited: &mut HashSet<String>) -> Result<String> {
        let name = entity.entity.clone();
        if let Some(owner) = self.owners.get(&name) {
            if owner != &entity.class {
                return Err(Error::schema_build(
                    &name,
                    format!("schema name is already used by `{}`", owner),
                ));
            }
            if self.schemas.contains_key(&name) {
                debug!("Schema for {} already exists", name);
                return Ok(name);
            }
        }
        self.owners.insert(name.clone(), entity.class.clone());
        visited.insert(entity.class.clone());

        debug!("Generating schema for: {}", name);
        let overrides = self.annotations.property_overrides(&entity.entity_class);
        let fields = merge_fields(entity, &overrides)?;

        let mut schema = Schema::object();
        let (title, description) = self.annotations.schema_info(&entity.entity_class);
        schema.title = title;
        schema.description = description;
        for field in &fields {
            if field.is_required() {
                schema.required.push(field.name.clone());
            }
            schema.properties.insert(field.name.clone(), field.to_property());
        }

        for association in &entity.associations {
            let target = self.models.association_target(association).ok_or_else(|| {
                Error::schema_build(
                    &name,
                    format!(
                        "association `{}` points at unknown table class `{}`",
                        association.alias,
                        association.target()
                    ),
                )
            })?;
            if visited.contains(&target.class) {
                debug!("{} -> {} closes a cycle, rendering a reference", name, target.entity);
            } else {
                self.build_visiting(target, visited)?;
            }

            let collection = association.kind.is_collection();
            let property_name = association
                .property
                .clone()
                .unwrap_or_else(|| association_property(&association.alias, collection));
            if schema.properties.contains_key(&property_name) {
                return Err(Error::schema_build(
                    &name,
                    format!(
                        "association property `{}` for `{}` conflicts with a column",
                        property_name, association.alias
                    ),
                ));
            }
            let reference = SchemaProperty::reference(&target.entity);
            let property = if collection {
                SchemaProperty::array_of(reference)
            } else {
                reference
            };
            schema.properties.insert(property_name, property);
        }

        let context = SchemaContext {
            entity,
            annotations: self.annotations,
        };
        let schema = self.extensions.dispatch_schema(schema, &context)?;
        self.schemas.insert(name.clone(), schema);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.schemas
    }
}
