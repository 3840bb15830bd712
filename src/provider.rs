//! Narrow interfaces to the host application, and the records they hand back.
//!
//! The generator never talks to the host router, ORM or reflection layer directly. It
//! asks three providers:
//!
//! - [`RouteProvider`] lists registered routes and the controllers behind them
//! - [`ModelProvider`] describes tables: columns, validation rules, associations
//! - [`AttributeProvider`] returns the annotations attached to a declaration
//!
//! [`crate::manifest::Manifest`] implements all three from YAML files. Tests supply
//! their own doubles.

use crate::annotation::AnnotationRecord;
use indexmap::IndexMap;
use serde::Deserialize;

/// Enumerates the host router's registered routes.
pub trait RouteProvider {
    /// All routes, in registration order
    fn list_routes(&self) -> Vec<RouteRecord>;

    /// Look up a controller by fully qualified class name
    fn controller(&self, class: &str) -> Option<&ControllerRecord>;
}

/// Describes tables from the host ORM's metadata layer.
pub trait ModelProvider {
    /// Look up a table by fully qualified class name
    fn describe_table(&self, class: &str) -> Option<&EntityMetadata>;
}

/// Reads declarative metadata attached to a declaration.
pub trait AttributeProvider {
    fn read(&self, declaration: &Declaration) -> Vec<AnnotationRecord>;
}

/// A declaration annotations can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    Controller(String),
    Action { controller: String, action: String },
    Entity(String),
}

/// HTTP methods a route can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Key of this method inside an OpenAPI path item
    pub fn path_item_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Whether requests with this method carry a body
    pub fn is_mutating(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route as the host router registered it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRecord {
    pub method: HttpMethod,
    /// URL template, `:param` or `{param}` placeholders
    pub template: String,
    /// Short controller name, e.g. `Employees`
    pub controller: String,
    pub action: String,
    #[serde(default)]
    pub plugin: Option<String>,
}

impl RouteRecord {
    pub fn new(method: HttpMethod, template: &str, controller: &str, action: &str) -> Self {
        Self {
            method,
            template: template.to_string(),
            controller: controller.to_string(),
            action: action.to_string(),
            plugin: None,
        }
    }
}

/// A controller class and the actions it declares
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerRecord {
    pub class: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// ORM metadata for one table and its entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    /// Fully qualified table class
    pub class: String,
    /// Table alias, e.g. `Employees`
    pub alias: String,
    /// Fully qualified entity class
    pub entity_class: String,
    /// Schema name, e.g. `Employee`
    pub entity: String,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Entity fields hidden from serialized output
    #[serde(default)]
    pub hidden: Vec<String>,
    /// Validation rules keyed by column name
    #[serde(default)]
    pub validation: IndexMap<String, Vec<ValidationRule>>,
    #[serde(default)]
    pub associations: Vec<Association>,
    /// Search filter collections keyed by collection name
    #[serde(default)]
    pub search_filters: IndexMap<String, Vec<SearchFilter>>,
}

impl EntityMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.alias == alias)
    }
}

/// One column definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A validation rule attached to a column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum ValidationRule {
    MinLength { value: u64 },
    MaxLength { value: u64 },
    LengthBetween { min: u64, max: u64 },
    Regex { pattern: String },
    InList { values: Vec<serde_json::Value> },
    GreaterThanOrEqual { value: f64 },
    LessThanOrEqual { value: f64 },
    Range { min: f64, max: f64 },
    Email,
    Url,
    Uuid,
    RequirePresence,
    AllowEmpty,
}

/// An association from one table to another
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub kind: AssociationKind,
    /// Association alias, e.g. `Departments`
    pub alias: String,
    /// Target table short name when it differs from the alias
    #[serde(default)]
    pub class_name: Option<String>,
    /// Entity property the association hydrates into
    #[serde(default)]
    pub property: Option<String>,
}

impl Association {
    /// Short name of the target table
    pub fn target(&self) -> &str {
        self.class_name.as_deref().unwrap_or(&self.alias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl AssociationKind {
    /// Whether the association hydrates a list of entities
    pub fn is_collection(&self) -> bool {
        matches!(self, AssociationKind::HasMany | AssociationKind::BelongsToMany)
    }
}

/// A filter declared in a table's search manager
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchFilter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FilterKind,
    /// Target field, optionally qualified with a table alias
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    Value,
    Like,
    Boolean,
    Exists,
    Compare,
    Finder,
    Callback,
}
