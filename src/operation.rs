//! Path/operation building: turns one route into one OpenAPI operation.

use crate::annotation::{AnnotationRecord, AnnotationRegistry, OperationOverride, ParamAnnotation, ResponseAnnotation};
use crate::config::Configuration;
use crate::error::{ClassKind, Error, Result};
use crate::extension::{ExtensionRegistry, OperationContext};
use crate::model::ModelScanner;
use crate::naming;
use crate::provider::{EntityMetadata, HttpMethod};
use crate::route::Route;
use crate::schema::{map_column_type, Schema, SchemaProperty, SchemaRegistry};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// OpenAPI PathItem object - all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// Put an operation in the slot for its method
    pub fn set(&mut self, operation: Operation) {
        let slot = match operation.method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        };
        if let Some(previous) = slot.replace(operation) {
            warn!("{} {} registered twice, keeping the last route", previous.method, previous.path);
        }
    }

    pub fn get_operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }
}

/// OpenAPI Operation object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    #[serde(skip)]
    pub method: HttpMethod,
    /// OpenAPI path the operation is mounted on
    #[serde(skip)]
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IndexMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl Operation {
    pub fn new(operation_id: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            method,
            path: String::new(),
            tags: Vec::new(),
            summary: None,
            description: None,
            operation_id: operation_id.into(),
            parameters: Vec::new(),
            request_body: None,
            responses: BTreeMap::new(),
            security: Vec::new(),
            deprecated: false,
        }
    }

    /// Add a parameter, replacing one with the same name.
    ///
    /// Names are unique within an operation, so a name already taken in another
    /// location is a conflict.
    pub fn add_parameter(&mut self, parameter: Parameter) -> std::result::Result<(), ParameterConflict> {
        match self.parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) if existing.location != parameter.location => Err(ParameterConflict {
                name: parameter.name,
                existing: existing.location,
                requested: parameter.location,
            }),
            Some(existing) => {
                *existing = parameter;
                Ok(())
            }
            None => {
                self.parameters.push(parameter);
                Ok(())
            }
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
        }
    }
}

/// A parameter name reused in a second location
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parameter `{name}` is already a {existing} parameter, cannot add it as a {requested} parameter")]
pub struct ParameterConflict {
    pub name: String,
    pub existing: ParameterLocation,
    pub requested: ParameterLocation,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaProperty,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        required: bool,
        schema: SchemaProperty,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            required,
            description: None,
            schema,
        }
    }
}

/// Schema of a media type: a reference (or array of references), or an inline object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Property(SchemaProperty),
    Inline(Schema),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    pub schema: SchemaRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// Conventional controller actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Index,
    View,
    Add,
    Edit,
    Delete,
    Search,
    Custom,
}

impl ActionKind {
    pub fn classify(action: &str) -> Self {
        match action {
            "index" => ActionKind::Index,
            "view" => ActionKind::View,
            "add" => ActionKind::Add,
            "edit" => ActionKind::Edit,
            "delete" => ActionKind::Delete,
            "search" => ActionKind::Search,
            _ => ActionKind::Custom,
        }
    }

    /// Status codes the action answers with, success first
    fn statuses(&self) -> &'static [&'static str] {
        match self {
            ActionKind::Index | ActionKind::Search | ActionKind::Custom => &["200"],
            ActionKind::View => &["200", "404"],
            ActionKind::Add => &["201", "422"],
            ActionKind::Edit => &["200", "404", "422"],
            ActionKind::Delete => &["204", "404"],
        }
    }

    fn returns_collection(&self) -> bool {
        matches!(self, ActionKind::Index | ActionKind::Search)
    }
}

fn status_description(status: &str) -> &'static str {
    match status {
        "200" => "OK",
        "201" => "Created",
        "204" => "No Content",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "422" => "Unprocessable Entity",
        _ => "Response",
    }
}

/// Builds operations for routes, tracking operation ids across the run
pub struct OperationBuilder<'b> {
    config: &'b Configuration,
    models: &'b ModelScanner<'b>,
    annotations: &'b AnnotationRegistry<'b>,
    extensions: &'b ExtensionRegistry,
    seen_ids: HashSet<String>,
}

impl<'b> OperationBuilder<'b> {
    pub fn new(
        config: &'b Configuration,
        models: &'b ModelScanner<'b>,
        annotations: &'b AnnotationRegistry<'b>,
        extensions: &'b ExtensionRegistry,
    ) -> Self {
        Self {
            config,
            models,
            annotations,
            extensions,
            seen_ids: HashSet::new(),
        }
    }

    /// Build the operation for a route.
    ///
    /// Returns `None` when an `OpenApiOperation` annotation hides the action.
    pub fn build_operation(&mut self, route: &Route, schemas: &mut SchemaRegistry) -> Result<Option<Operation>> {
        let action_annotations = route
            .action_ref
            .as_ref()
            .map(|action| self.annotations.action(action))
            .unwrap_or_default();

        let overrides = action_annotations.iter().find_map(|record| match record {
            AnnotationRecord::OpenApiOperation(o) => Some(o),
            _ => None,
        });
        if overrides.and_then(|o| o.visible) == Some(false) {
            debug!("{} is hidden", route);
            return Ok(None);
        }

        let responses: Vec<&ResponseAnnotation> = action_annotations
            .iter()
            .filter_map(|record| match record {
                AnnotationRecord::OpenApiResponse(r) => Some(r),
                _ => None,
            })
            .collect();

        let entity = self.models.entity_for(route)?;
        if entity.is_none() && !responses.iter().any(|r| r.schema.is_some()) {
            return Err(Error::resolution(
                ClassKind::Table,
                format!("{}Table", route.controller),
            ));
        }
        let schema_name = match entity {
            Some(entity) => Some(schemas.build_schema(entity)?),
            None => None,
        };

        let kind = ActionKind::classify(&route.action);
        let mut operation = Operation::new(self.next_operation_id(route), route.method);
        operation.path = route.path.clone();
        operation.tags = vec![route.controller.clone()];
        if let Some(o) = overrides {
            apply_operation_override(&mut operation, o);
        }

        let mut parameters = Vec::new();
        for name in route.path_parameters() {
            let schema = path_parameter_schema(&name, entity);
            parameters.push(Parameter::new(name, ParameterLocation::Path, true, schema));
        }
        if let (ActionKind::Index, Some(entity)) = (kind, entity) {
            parameters.extend(paginator_parameters(entity));
        }
        for record in &action_annotations {
            match record {
                AnnotationRecord::OpenApiPathParam(p) => {
                    parameters.push(annotated_parameter(p, ParameterLocation::Path))
                }
                AnnotationRecord::OpenApiQueryParam(p) => {
                    parameters.push(annotated_parameter(p, ParameterLocation::Query))
                }
                _ => {}
            }
        }
        for parameter in parameters {
            operation
                .add_parameter(parameter)
                .map_err(|conflict| Error::Assembly(format!("{}: {}", route, conflict)))?;
        }

        if route.method.is_mutating() {
            if let Some((name, schema)) = schema_name
                .as_deref()
                .and_then(|name| schemas.get(name).map(|schema| (name, schema)))
            {
                operation.request_body = Some(self.request_body(name, schema));
            }
        }

        if let Some(name) = schema_name.as_deref() {
            for status in kind.statuses() {
                let response = self.default_response(status, name, kind);
                operation.responses.insert(status.to_string(), response);
            }
        }
        for annotation in responses {
            let response = self.annotated_response(annotation);
            operation.responses.insert(annotation.status.clone(), response);
        }

        let controller_annotations = self.annotations.controller(&route.controller_class);
        for record in controller_annotations.iter().chain(action_annotations.iter()) {
            if let AnnotationRecord::OpenApiSecurity { name, scopes } = record {
                let mut requirement = IndexMap::new();
                requirement.insert(name.clone(), scopes.clone());
                operation.security.push(requirement);
            }
        }

        let context = OperationContext {
            route,
            entity,
            annotations: self.annotations,
            models: self.models,
        };
        let operation = self.extensions.dispatch_operation(operation, &context)?;
        debug!("Built operation {} for {}", operation.operation_id, route);
        Ok(Some(operation))
    }

    fn next_operation_id(&mut self, route: &Route) -> String {
        let mut id = naming::operation_id(&route.controller, &route.action);
        if self.seen_ids.contains(&id) {
            id = format!("{}:{}", id, route.method.path_item_key());
        }
        self.seen_ids.insert(id.clone());
        id
    }

    fn request_body(&self, title: &str, schema: &Schema) -> RequestBody {
        let mut writable = schema.writable();
        writable.title = Some(title.to_string());
        let content = self
            .config
            .request_accepts()
            .iter()
            .map(|mime| {
                (
                    mime.clone(),
                    MediaType {
                        schema: SchemaRef::Inline(writable.clone()),
                    },
                )
            })
            .collect();
        RequestBody {
            description: None,
            required: true,
            content,
        }
    }

    fn default_response(&self, status: &str, schema_name: &str, kind: ActionKind) -> Response {
        let body = if status.starts_with('2') {
            if status == "204" {
                None
            } else if kind.returns_collection() {
                Some(SchemaProperty::array_of(SchemaProperty::reference(schema_name)))
            } else {
                Some(SchemaProperty::reference(schema_name))
            }
        } else {
            Some(SchemaProperty::reference(self.config.exception_schema()))
        };
        Response {
            description: status_description(status).to_string(),
            content: body.map(|schema| self.response_content(schema)),
        }
    }

    fn annotated_response(&self, annotation: &ResponseAnnotation) -> Response {
        let body = annotation.schema.as_deref().map(|name| {
            let reference = SchemaProperty::reference(name);
            if annotation.array {
                SchemaProperty::array_of(reference)
            } else {
                reference
            }
        });
        Response {
            description: annotation
                .description
                .clone()
                .unwrap_or_else(|| status_description(&annotation.status).to_string()),
            content: body.map(|schema| self.response_content(schema)),
        }
    }

    fn response_content(&self, schema: SchemaProperty) -> IndexMap<String, MediaType> {
        self.config
            .response_content_types()
            .iter()
            .map(|mime| {
                (
                    mime.clone(),
                    MediaType {
                        schema: SchemaRef::Property(schema.clone()),
                    },
                )
            })
            .collect()
    }
}

fn apply_operation_override(operation: &mut Operation, o: &OperationOverride) {
    if let Some(summary) = &o.summary {
        operation.summary = Some(summary.clone());
    }
    if let Some(description) = &o.description {
        operation.description = Some(description.clone());
    }
    if let Some(tags) = &o.tags {
        operation.tags = tags.clone();
    }
    if let Some(deprecated) = o.deprecated {
        operation.deprecated = deprecated;
    }
}

/// `id` follows the primary key column, everything else is a string
fn path_parameter_schema(name: &str, entity: Option<&EntityMetadata>) -> SchemaProperty {
    let mapped = entity
        .filter(|_| name == "id")
        .and_then(|entity| entity.primary_key.first().and_then(|pk| entity.column(pk)))
        .and_then(|column| map_column_type(&column.column_type));
    match mapped {
        Some((property_type, format)) => SchemaProperty {
            format: format.map(|f| f.to_string()),
            ..SchemaProperty::of_type(property_type)
        },
        None => SchemaProperty::of_type("string"),
    }
}

fn paginator_parameters(entity: &EntityMetadata) -> Vec<Parameter> {
    let sort_fields: Vec<Value> = entity
        .columns
        .iter()
        .map(|c| Value::from(c.name.clone()))
        .collect();
    let sort = SchemaProperty {
        enum_values: (!sort_fields.is_empty()).then_some(sort_fields),
        ..SchemaProperty::of_type("string")
    };
    let direction = SchemaProperty {
        enum_values: Some(vec![Value::from("asc"), Value::from("desc")]),
        ..SchemaProperty::of_type("string")
    };
    vec![
        Parameter::new("page", ParameterLocation::Query, false, SchemaProperty::of_type("integer")),
        Parameter::new("limit", ParameterLocation::Query, false, SchemaProperty::of_type("integer")),
        Parameter::new("sort", ParameterLocation::Query, false, sort),
        Parameter::new("direction", ParameterLocation::Query, false, direction),
    ]
}

fn annotated_parameter(annotation: &ParamAnnotation, location: ParameterLocation) -> Parameter {
    let schema = SchemaProperty {
        format: annotation.format.clone(),
        enum_values: annotation.enum_values.clone(),
        example: annotation.example.clone(),
        ..SchemaProperty::of_type(&annotation.param_type)
    };
    // path parameters are always required
    let required = location == ParameterLocation::Path || annotation.required.unwrap_or(false);
    let mut parameter = Parameter::new(annotation.name.clone(), location, required, schema);
    parameter.description = annotation.description.clone();
    parameter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::extension::{Extension, ExtensionFailure};
    use crate::provider::{AttributeProvider, ColumnDef, Declaration, ModelProvider};
    use crate::route::ActionRef;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const CONTROLLER: &str = "\\App\\Controller\\EmployeesController";

    struct Tables(Vec<EntityMetadata>);

    impl ModelProvider for Tables {
        fn describe_table(&self, class: &str) -> Option<&EntityMetadata> {
            self.0.iter().find(|t| t.class == class)
        }
    }

    #[derive(Default)]
    struct Attributes(HashMap<Declaration, Vec<AnnotationRecord>>);

    impl Attributes {
        fn on_action(mut self, action: &str, records: Vec<AnnotationRecord>) -> Self {
            self.0.insert(
                Declaration::Action {
                    controller: CONTROLLER.to_string(),
                    action: action.to_string(),
                },
                records,
            );
            self
        }
    }

    impl AttributeProvider for Attributes {
        fn read(&self, declaration: &Declaration) -> Vec<AnnotationRecord> {
            self.0.get(declaration).cloned().unwrap_or_default()
        }
    }

    fn column(name: &str, column_type: &str) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            column_type: column_type.to_string(),
            nullable: false,
            length: None,
            default: None,
            comment: None,
        }
    }

    fn tables() -> Tables {
        Tables(vec![EntityMetadata {
            class: "\\App\\Model\\Table\\EmployeesTable".to_string(),
            alias: "Employees".to_string(),
            entity_class: "\\App\\Model\\Entity\\Employee".to_string(),
            entity: "Employee".to_string(),
            columns: vec![
                column("id", "integer"),
                column("first_name", "string"),
                column("created", "datetime"),
            ],
            primary_key: vec!["id".to_string()],
            hidden: Vec::new(),
            validation: IndexMap::new(),
            associations: Vec::new(),
            search_filters: IndexMap::new(),
        }])
    }

    fn config() -> Configuration {
        let settings: Settings =
            serde_yaml::from_str("prefix: /\nyml: /swagger.yml\njson: /swagger.json\n").unwrap();
        Configuration::new(settings, "/app")
    }

    fn route(method: HttpMethod, template: &str, controller: &str, action: &str) -> Route {
        let controller_class = format!("\\App\\Controller\\{}Controller", controller);
        Route {
            method,
            template: template.to_string(),
            path: template.replace(":id", "{id}"),
            controller: controller.to_string(),
            action: action.to_string(),
            plugin: None,
            action_ref: Some(ActionRef {
                controller: controller_class.clone(),
                action: action.to_string(),
            }),
            controller_class,
        }
    }

    fn build_all(
        attributes: &Attributes,
        extensions: &ExtensionRegistry,
        routes: &[Route],
    ) -> Result<Vec<Option<Operation>>> {
        let config = config();
        let tables = tables();
        let models = ModelScanner::new(&tables, &config);
        let annotations = AnnotationRegistry::load(attributes);
        let mut schemas = SchemaRegistry::new(&models, &annotations, extensions);
        let mut builder = OperationBuilder::new(&config, &models, &annotations, extensions);
        routes
            .iter()
            .map(|route| builder.build_operation(route, &mut schemas))
            .collect()
    }

    fn build_one(attributes: &Attributes, route: Route) -> Result<Option<Operation>> {
        let extensions = ExtensionRegistry::new();
        Ok(build_all(attributes, &extensions, &[route])?.remove(0))
    }

    fn to_json(operation: &Operation) -> Value {
        serde_json::to_value(operation).unwrap()
    }

    #[test]
    fn test_classify_actions() {
        assert_eq!(ActionKind::classify("index"), ActionKind::Index);
        assert_eq!(ActionKind::classify("search"), ActionKind::Search);
        assert_eq!(ActionKind::classify("promote"), ActionKind::Custom);
    }

    #[test]
    fn test_index_operation() {
        let operation = build_one(&Attributes::default(), route(HttpMethod::Get, "/employees", "Employees", "index"))
            .unwrap()
            .unwrap();

        assert_eq!(operation.operation_id, "employees:index");
        assert_eq!(operation.tags, vec!["Employees"]);
        let names: Vec<_> = operation.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["page", "limit", "sort", "direction"]);
        assert!(operation.request_body.is_none());

        let json = to_json(&operation);
        let schema = &json["responses"]["200"]["content"]["application/json"]["schema"];
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["$ref"], "#/components/schemas/Employee");
        assert_eq!(json["parameters"][2]["schema"]["enum"][1], "first_name");
    }

    #[test]
    fn test_view_operation_path_parameter_follows_primary_key() {
        let operation = build_one(&Attributes::default(), route(HttpMethod::Get, "/employees/:id", "Employees", "view"))
            .unwrap()
            .unwrap();

        let id = operation.parameter("id").unwrap();
        assert_eq!(id.location, ParameterLocation::Path);
        assert!(id.required);
        assert_eq!(id.schema.property_type.as_deref(), Some("integer"));

        let statuses: Vec<_> = operation.responses.keys().cloned().collect();
        assert_eq!(statuses, vec!["200", "404"]);
        let json = to_json(&operation);
        assert_eq!(
            json["responses"]["404"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Exception"
        );
    }

    #[test]
    fn test_add_operation_request_body() {
        let operation = build_one(&Attributes::default(), route(HttpMethod::Post, "/employees", "Employees", "add"))
            .unwrap()
            .unwrap();

        let body = operation.request_body.as_ref().unwrap();
        let media_types: Vec<_> = body.content.keys().cloned().collect();
        assert_eq!(media_types, vec!["application/x-www-form-urlencoded", "application/json"]);

        let json = to_json(&operation);
        let schema = &json["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["title"], "Employee");
        assert!(schema["properties"].get("id").is_none());
        assert!(schema["properties"].get("created").is_none());
        assert_eq!(schema["required"], serde_json::json!(["first_name"]));

        let statuses: Vec<_> = operation.responses.keys().cloned().collect();
        assert_eq!(statuses, vec!["201", "422"]);
    }

    #[test]
    fn test_delete_has_no_success_body() {
        let operation = build_one(&Attributes::default(), route(HttpMethod::Delete, "/employees/:id", "Employees", "delete"))
            .unwrap()
            .unwrap();
        assert!(operation.responses["204"].content.is_none());
        assert!(operation.responses["404"].content.is_some());
    }

    #[test]
    fn test_hidden_operation() {
        let attributes = Attributes::default().on_action(
            "index",
            vec![AnnotationRecord::OpenApiOperation(OperationOverride {
                visible: Some(false),
                ..Default::default()
            })],
        );
        let operation = build_one(&attributes, route(HttpMethod::Get, "/employees", "Employees", "index")).unwrap();
        assert!(operation.is_none());
    }

    #[test]
    fn test_operation_and_parameter_annotations() {
        let attributes = Attributes::default().on_action(
            "index",
            vec![
                AnnotationRecord::OpenApiOperation(OperationOverride {
                    summary: Some("List employees".to_string()),
                    tags: Some(vec!["Staff".to_string()]),
                    deprecated: Some(true),
                    ..Default::default()
                }),
                AnnotationRecord::OpenApiQueryParam(ParamAnnotation {
                    name: "limit".to_string(),
                    param_type: "integer".to_string(),
                    format: None,
                    description: Some("Page size".to_string()),
                    required: None,
                    enum_values: None,
                    example: Some(Value::from(20)),
                }),
            ],
        );
        let operation = build_one(&attributes, route(HttpMethod::Get, "/employees", "Employees", "index"))
            .unwrap()
            .unwrap();

        assert_eq!(operation.summary.as_deref(), Some("List employees"));
        assert_eq!(operation.tags, vec!["Staff"]);
        assert!(operation.deprecated);
        assert_eq!(operation.parameters.len(), 4);
        let limit = operation.parameter("limit").unwrap();
        assert_eq!(limit.description.as_deref(), Some("Page size"));
        assert_eq!(limit.schema.example, Some(Value::from(20)));
    }

    #[test]
    fn test_security_from_controller_and_action() {
        let mut attributes = Attributes::default().on_action(
            "view",
            vec![AnnotationRecord::OpenApiSecurity {
                name: "OAuth".to_string(),
                scopes: vec!["read".to_string()],
            }],
        );
        attributes.0.insert(
            Declaration::Controller(CONTROLLER.to_string()),
            vec![AnnotationRecord::OpenApiSecurity {
                name: "BearerAuth".to_string(),
                scopes: Vec::new(),
            }],
        );
        let operation = build_one(&attributes, route(HttpMethod::Get, "/employees/:id", "Employees", "view"))
            .unwrap()
            .unwrap();

        let json = to_json(&operation);
        assert_eq!(
            json["security"],
            serde_json::json!([{"BearerAuth": []}, {"OAuth": ["read"]}])
        );
    }

    #[test]
    fn test_duplicate_operation_ids_get_method_suffix() {
        let extensions = ExtensionRegistry::new();
        let operations = build_all(
            &Attributes::default(),
            &extensions,
            &[
                route(HttpMethod::Put, "/employees/:id", "Employees", "edit"),
                route(HttpMethod::Patch, "/employees/:id", "Employees", "edit"),
            ],
        )
        .unwrap();

        let ids: Vec<_> = operations
            .iter()
            .map(|o| o.as_ref().unwrap().operation_id.clone())
            .collect();
        assert_eq!(ids, vec!["employees:edit", "employees:edit:patch"]);
    }

    #[test]
    fn test_controller_without_table_fails() {
        let err = build_one(&Attributes::default(), route(HttpMethod::Get, "/reports", "Reports", "index")).unwrap_err();
        assert_eq!(err.kind(), "ResolutionError");
        assert!(err.to_string().contains("ReportsTable"));
    }

    #[test]
    fn test_controller_without_table_uses_response_annotation() {
        let attributes = Attributes(HashMap::from([(
            Declaration::Action {
                controller: "\\App\\Controller\\ReportsController".to_string(),
                action: "summary".to_string(),
            },
            vec![AnnotationRecord::OpenApiResponse(ResponseAnnotation {
                status: "200".to_string(),
                schema: Some("Employee".to_string()),
                array: true,
                description: None,
            })],
        )]));
        let operation = build_one(&attributes, route(HttpMethod::Get, "/reports/summary", "Reports", "summary"))
            .unwrap()
            .unwrap();

        let json = to_json(&operation);
        assert_eq!(json["responses"]["200"]["description"], "OK");
        assert_eq!(
            json["responses"]["200"]["content"]["application/json"]["schema"]["items"]["$ref"],
            "#/components/schemas/Employee"
        );
    }

    struct Stamp;

    impl Extension for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn on_operation_created(
            &self,
            mut operation: Operation,
            _context: &OperationContext<'_>,
        ) -> std::result::Result<Operation, ExtensionFailure> {
            operation.description = Some("stamped".to_string());
            Ok(operation)
        }
    }

    #[test]
    fn test_operation_passes_through_extensions() {
        let mut extensions = ExtensionRegistry::new();
        extensions.subscribe(crate::extension::BuildEvent::OperationCreated, Box::new(Stamp));
        let operations = build_all(
            &Attributes::default(),
            &extensions,
            &[route(HttpMethod::Get, "/employees", "Employees", "index")],
        )
        .unwrap();

        assert_eq!(
            operations[0].as_ref().unwrap().description.as_deref(),
            Some("stamped")
        );
    }

    #[test]
    fn test_parameter_names_are_unique() {
        let mut operation = Operation::new("employees:view", HttpMethod::Get);
        let id = |location| Parameter::new("id", location, true, SchemaProperty::of_type("integer"));

        operation.add_parameter(id(ParameterLocation::Path)).unwrap();
        operation.add_parameter(id(ParameterLocation::Path)).unwrap();
        let err = operation.add_parameter(id(ParameterLocation::Query)).unwrap_err();

        assert_eq!(operation.parameters.len(), 1);
        assert_eq!(operation.parameters[0].location, ParameterLocation::Path);
        assert_eq!(err.existing, ParameterLocation::Path);
        assert!(err.to_string().contains("`id` is already a path parameter"));
    }

    #[test]
    fn test_query_annotation_reusing_path_name_fails() {
        let attributes = Attributes::default().on_action(
            "view",
            vec![AnnotationRecord::OpenApiQueryParam(ParamAnnotation {
                name: "id".to_string(),
                param_type: "string".to_string(),
                format: None,
                description: None,
                required: None,
                enum_values: None,
                example: None,
            })],
        );
        let err = build_one(&attributes, route(HttpMethod::Get, "/employees/:id", "Employees", "view")).unwrap_err();

        assert_eq!(err.kind(), "AssemblyError");
        assert!(err.to_string().contains("GET /employees/:id"));
        assert!(err.to_string().contains("`id`"));
    }

    #[test]
    fn test_path_item_slots() {
        let mut item = PathItem::default();
        item.set(Operation::new("employees:view", HttpMethod::Get));
        item.set(Operation::new("employees:delete", HttpMethod::Delete));

        assert_eq!(item.get_operation(HttpMethod::Get).unwrap().operation_id, "employees:view");
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("post").is_none());
        assert_eq!(json["delete"]["operationId"], "employees:delete");
    }
}
