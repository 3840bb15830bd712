use openapi_bake::{
    cli::{self, CliArgs},
    config::Configuration,
    error::Error,
    extension::ExtensionRegistry,
    manifest::Manifest,
    serializer::serialize_json,
    swagger::{Swagger, SwaggerDocument},
};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const APP_FILES: [(&str, &str); 7] = [
    ("config/swagger_bake.yml", include_str!("fixtures/employees_app/config/swagger_bake.yml")),
    ("config/swagger.yml", include_str!("fixtures/employees_app/config/swagger.yml")),
    ("routes.yml", include_str!("fixtures/employees_app/routes.yml")),
    ("attributes.yml", include_str!("fixtures/employees_app/attributes.yml")),
    ("tables/employees.yml", include_str!("fixtures/employees_app/tables/employees.yml")),
    ("tables/departments.yml", include_str!("fixtures/employees_app/tables/departments.yml")),
    ("tables/salaries.yml", include_str!("fixtures/employees_app/tables/salaries.yml")),
];

/// Helper function to create a temporary copy of the employees application
fn create_test_app() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in APP_FILES {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn build(root: &Path) -> openapi_bake::Result<SwaggerDocument> {
    let config = Configuration::from_file(&root.join("config/swagger_bake.yml"), root)?;
    let manifest = Manifest::load(root).expect("Failed to load manifest");
    let extensions = ExtensionRegistry::with_defaults();
    Swagger::new(&config, &manifest, &manifest, &manifest, &extensions).build()
}

fn cli_args(root: &Path, extra: &[&str]) -> CliArgs {
    let mut argv = vec![OsString::from("openapi-bake"), root.as_os_str().to_os_string()];
    argv.extend(extra.iter().map(OsString::from));
    CliArgs::try_parse_from(argv).expect("Failed to parse arguments")
}

fn run_cli(root: &Path) -> anyhow::Result<PathBuf> {
    cli::run(cli_args(root, &[]))
}

fn collect_refs<'a>(node: &'a Value, refs: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                refs.push(reference);
            }
            map.values().for_each(|child| collect_refs(child, refs));
        }
        Value::Array(items) => items.iter().for_each(|child| collect_refs(child, refs)),
        _ => {}
    }
}

#[test]
fn test_employees_end_to_end() {
    let app = create_test_app();
    let document = build(app.path()).expect("Failed to build document");

    assert_eq!(document.schema_names(), vec!["Department", "Employee", "Exception", "Salary"]);

    let employee = document.pointer("/components/schemas/Employee").unwrap();
    assert_eq!(employee["description"], "A person on the payroll");
    assert!(!employee["properties"]["gender"]["enum"].as_array().unwrap().is_empty());
    assert_eq!(employee["properties"]["gender"]["example"], "female");
    assert_eq!(employee["properties"]["last_name"]["minLength"], 3);
    assert_eq!(employee["properties"]["last_name"]["maxLength"], 59);
    assert_eq!(employee["properties"]["last_name"]["pattern"], "/\\W/");
    assert_eq!(employee["properties"]["ssn"]["writeOnly"], true);
    assert_eq!(employee["properties"]["id"]["readOnly"], true);
    assert_eq!(employee["properties"]["department"]["$ref"], "#/components/schemas/Department");
    assert_eq!(employee["properties"]["salaries"]["items"]["$ref"], "#/components/schemas/Salary");
    assert_eq!(
        employee["required"],
        json!(["id", "birth_date", "first_name", "last_name", "gender", "hire_date"])
    );

    let salary = document.pointer("/components/schemas/Salary").unwrap();
    assert_eq!(salary["properties"]["salary"]["minimum"], 0.0);
    assert_eq!(salary["properties"]["employee"]["$ref"], "#/components/schemas/Employee");

    // seed content survives the merge
    assert_eq!(document.pointer("/info/title"), Some(&json!("Employees API")));
    assert!(document.has_operation("/api/status", "get"));
    assert!(document.pointer("/components/securitySchemes/BearerAuth").is_some());

    assert!(!document.has_operation("/pages/home", "get"));
    let paths: Vec<_> = document.as_value()["paths"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        paths,
        vec![
            "/api/departments",
            "/api/departments/{id}",
            "/api/employees",
            "/api/employees/search",
            "/api/employees/{id}",
            "/api/status",
        ]
    );
}

#[test]
fn test_employees_operations() {
    let app = create_test_app();
    let document = build(app.path()).unwrap();

    let index = document.pointer("/paths/~1api~1employees/get").unwrap();
    assert_eq!(index["operationId"], "employees:index");
    assert_eq!(index["summary"], "List employees");
    assert_eq!(index["tags"], json!(["Employees"]));
    assert_eq!(index["security"], json!([{"BearerAuth": []}]));

    let add = document.pointer("/paths/~1api~1employees/post").unwrap();
    let body = &add["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(body["title"], "Employee");
    assert!(body["properties"].get("id").is_none());
    assert!(add["responses"].get("201").is_some());

    let patch = document.pointer("/paths/~1api~1employees~1{id}/patch").unwrap();
    assert_eq!(patch["operationId"], "employees:edit:patch");

    let view = document.pointer("/paths/~1api~1departments~1{id}/get").unwrap();
    assert_eq!(view["parameters"][0]["name"], "id");
    assert_eq!(view["parameters"][0]["in"], "path");
    assert_eq!(view["parameters"][0]["schema"]["type"], "integer");
    assert_eq!(
        view["responses"]["404"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Exception"
    );
}

#[test]
fn test_search_filters_become_query_parameters() {
    let app = create_test_app();
    let document = build(app.path()).unwrap();

    let search = document.pointer("/paths/~1api~1employees~1search/get").unwrap();
    let parameters = search["parameters"].as_array().unwrap();
    assert_eq!(parameters[0]["name"], "first_name");
    assert_eq!(parameters[0]["in"], "query");

    let names: Vec<_> = parameters.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["first_name", "last_name", "gender", "department"]);
    assert_eq!(parameters[3]["description"], "Department name");
}

#[test]
fn test_every_reference_resolves() {
    let app = create_test_app();
    let document = build(app.path()).unwrap();

    let mut refs = Vec::new();
    collect_refs(document.as_value(), &mut refs);

    assert!(!refs.is_empty());
    for reference in refs {
        let pointer = reference.strip_prefix('#').unwrap();
        assert!(document.pointer(pointer).is_some(), "dangling {}", reference);
    }
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let app = create_test_app();

    let output = run_cli(app.path()).expect("First run failed");
    let first = fs::read_to_string(&output).unwrap();
    run_cli(app.path()).expect("Second run failed");
    let second = fs::read_to_string(&output).unwrap();

    assert_eq!(output, app.path().join("webroot/swagger.json"));
    assert_eq!(first, second);
    assert_eq!(first, serialize_json(&build(app.path()).unwrap()).unwrap());
}

#[test]
fn test_failed_build_writes_nothing() {
    let app = create_test_app();
    let output = app.path().join("webroot/swagger.json");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, "previous").unwrap();
    fs::remove_file(app.path().join("tables/departments.yml")).unwrap();

    let err = run_cli(app.path()).unwrap_err();

    let err = err.downcast_ref::<Error>().expect("library error");
    assert_eq!(err.kind(), "SchemaBuildError");
    assert!(err.to_string().contains("Departments"));
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn test_unknown_search_table_names_the_class() {
    let app = create_test_app();
    let attributes = fs::read_to_string(app.path().join("attributes.yml")).unwrap();
    fs::write(
        app.path().join("attributes.yml"),
        attributes.replace("\\App\\Model\\Table\\EmployeesTable", "\\App\\Model\\Table\\NopeTable"),
    )
    .unwrap();

    let err = build(app.path()).unwrap_err();

    assert_eq!(err.kind(), "ExtensionError");
    let message = err.to_string();
    assert!(message.contains("\\App\\Model\\Table\\NopeTable"));
    assert!(message.contains("GET /api/employees/search"));
}

#[test]
fn test_missing_controller_fails_resolution() {
    let app = create_test_app();
    let routes = fs::read_to_string(app.path().join("routes.yml")).unwrap();
    fs::write(
        app.path().join("routes.yml"),
        format!(
            "{}  - {{ method: GET, template: /api/titles, controller: Titles, action: index }}\n",
            routes
        ),
    )
    .unwrap();

    let err = build(app.path()).unwrap_err();
    assert_eq!(err.kind(), "ResolutionError");
    assert!(err.to_string().contains("TitlesController"));
}

#[test]
fn test_missing_seed_is_a_configuration_error() {
    let app = create_test_app();
    fs::remove_file(app.path().join("config/swagger.yml")).unwrap();

    let err = build(app.path()).unwrap_err();
    assert_eq!(err.kind(), "ConfigurationError");
    assert!(err.to_string().contains("swagger.yml"));
}

#[test]
fn test_output_override() {
    let app = create_test_app();
    let args = cli_args(app.path(), &["-o", "/docs/api.json"]);

    let output = cli::run(args).unwrap();

    assert_eq!(output, app.path().join("docs/api.json"));
    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["openapi"], "3.0.0");
}
