//! Extension hooks invoked while operations and schemas are being built.
//!
//! Extensions subscribe to a [`BuildEvent`] on an [`ExtensionRegistry`]. Dispatch is
//! synchronous and follows registration order. Each handler receives the object being
//! built by value and hands back the updated object, or an [`ExtensionFailure`] which
//! aborts the whole build. A failed object is dropped before it reaches the document.
//!
//! # Example
//!
//! ```
//! use openapi_bake::extension::{BuildEvent, ExtensionRegistry, search::SearchExtension};
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.subscribe(BuildEvent::OperationCreated, Box::new(SearchExtension));
//! assert_eq!(registry.len(), 1);
//! ```

pub mod search;

use crate::annotation::AnnotationRegistry;
use crate::error::{Error, Result};
use crate::model::ModelScanner;
use crate::operation::{Operation, ParameterConflict};
use crate::provider::EntityMetadata;
use crate::route::{ActionRef, Route};
use crate::schema::Schema;
use log::debug;
use thiserror::Error;

/// Events extensions can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    /// An operation is built and about to be added to its path
    OperationCreated,
    /// An entity schema is built and about to be registered
    SchemaCreated,
}

/// Why an extension refused to enrich an operation or schema
#[derive(Error, Debug)]
pub enum ExtensionFailure {
    #[error("unable to build OpenApiSearch, table class `{0}` could not be found")]
    UnresolvedTable(String),

    #[error(transparent)]
    ParameterConflict(#[from] ParameterConflict),

    #[error("{0}")]
    Rejected(String),
}

/// What an extension can see while an operation is built
pub struct OperationContext<'c> {
    pub route: &'c Route,
    /// Table behind the route's controller, if any
    pub entity: Option<&'c EntityMetadata>,
    pub annotations: &'c AnnotationRegistry<'c>,
    pub models: &'c ModelScanner<'c>,
}

impl OperationContext<'_> {
    /// Handle to the action the route dispatches to
    pub fn action(&self) -> Option<&ActionRef> {
        self.route.action_ref.as_ref()
    }
}

/// What an extension can see while a schema is built
pub struct SchemaContext<'c> {
    pub entity: &'c EntityMetadata,
    pub annotations: &'c AnnotationRegistry<'c>,
}

pub trait Extension {
    /// Name used when reporting failures
    fn name(&self) -> &str;

    fn on_operation_created(
        &self,
        operation: Operation,
        _context: &OperationContext<'_>,
    ) -> std::result::Result<Operation, ExtensionFailure> {
        Ok(operation)
    }

    fn on_schema_created(
        &self,
        schema: Schema,
        _context: &SchemaContext<'_>,
    ) -> std::result::Result<Schema, ExtensionFailure> {
        Ok(schema)
    }
}

/// Ordered list of subscribed extensions
#[derive(Default)]
pub struct ExtensionRegistry {
    subscriptions: Vec<(BuildEvent, Box<dyn Extension>)>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in extensions subscribed
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.subscribe(BuildEvent::OperationCreated, Box::new(search::SearchExtension));
        registry
    }

    pub fn subscribe(&mut self, event: BuildEvent, extension: Box<dyn Extension>) {
        debug!("Subscribing extension {} to {:?}", extension.name(), event);
        self.subscriptions.push((event, extension));
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    fn subscribers(&self, event: BuildEvent) -> impl Iterator<Item = &dyn Extension> {
        self.subscriptions
            .iter()
            .filter(move |(e, _)| *e == event)
            .map(|(_, extension)| extension.as_ref())
    }

    pub fn dispatch_operation(
        &self,
        mut operation: Operation,
        context: &OperationContext<'_>,
    ) -> Result<Operation> {
        for extension in self.subscribers(BuildEvent::OperationCreated) {
            debug!("Dispatching {} to {}", context.route, extension.name());
            operation = extension
                .on_operation_created(operation, context)
                .map_err(|source| Error::Extension {
                    extension: extension.name().to_string(),
                    target: context.route.to_string(),
                    source,
                })?;
        }
        Ok(operation)
    }

    pub fn dispatch_schema(&self, mut schema: Schema, context: &SchemaContext<'_>) -> Result<Schema> {
        for extension in self.subscribers(BuildEvent::SchemaCreated) {
            debug!("Dispatching schema {} to {}", context.entity.entity, extension.name());
            schema = extension
                .on_schema_created(schema, context)
                .map_err(|source| Error::Extension {
                    extension: extension.name().to_string(),
                    target: format!("schema {}", context.entity.entity),
                    source,
                })?;
        }
        Ok(schema)
    }
}
