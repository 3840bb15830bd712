//! OpenAPI Bake - OpenAPI documents baked from an MVC application's own metadata.
//!
//! The generator reads what the application already knows about itself, the routes it
//! registers, the tables behind its controllers, and the annotations its developers
//! attach, and merges that into a hand-written seed document.
//!
//! # Architecture
//!
//! 1. [`config`] - Loads settings and checks run preconditions
//! 2. [`provider`] - Interfaces to the host router, ORM and attribute reader
//! 3. [`route`] - Lists routes under the prefix and resolves their controllers
//! 4. [`model`] - Finds the tables behind controllers and associations
//! 5. [`annotation`] - Reads developer annotations
//! 6. [`schema`] - Merges columns, validation rules and annotations into schemas
//! 7. [`operation`] - Builds one operation per route
//! 8. [`extension`] - Hooks that enrich operations and schemas as they are built
//! 9. [`swagger`] - Merges everything into the seed and validates the result
//! 10. [`serializer`] - Writes the document as JSON
//!
//! [`manifest`] implements the three providers from YAML files, [`scanner`] finds them.
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_bake::{
//!     config::Configuration,
//!     extension::ExtensionRegistry,
//!     manifest::Manifest,
//!     serializer::write_document,
//!     swagger::Swagger,
//! };
//! use std::path::Path;
//!
//! let root = Path::new("./app");
//! let config = Configuration::from_file(&root.join("config/swagger_bake.yml"), root).unwrap();
//! let manifest = Manifest::load(root).unwrap();
//! let extensions = ExtensionRegistry::with_defaults();
//!
//! let swagger = Swagger::new(&config, &manifest, &manifest, &manifest, &extensions);
//! let document = swagger.build().unwrap();
//! write_document(&document, &config.json()).unwrap();
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod config;
pub mod error;
pub mod extension;
pub mod manifest;
pub mod model;
pub mod naming;
pub mod operation;
pub mod provider;
pub mod route;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod swagger;

pub use error::{Error, Result};
