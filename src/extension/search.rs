//! Search-filter extension.
//!
//! Exposes the filters a table's search manager declares as query parameters on GET
//! actions annotated with `OpenApiSearch`.

use super::{Extension, ExtensionFailure, OperationContext};
use crate::annotation::AnnotationRecord;
use crate::operation::{Operation, Parameter, ParameterLocation};
use crate::provider::{EntityMetadata, FilterKind, HttpMethod, SearchFilter};
use crate::schema::SchemaProperty;
use log::debug;

const DEFAULT_COLLECTION: &str = "default";

pub struct SearchExtension;

impl Extension for SearchExtension {
    fn name(&self) -> &str {
        "search"
    }

    fn on_operation_created(
        &self,
        mut operation: Operation,
        context: &OperationContext<'_>,
    ) -> Result<Operation, ExtensionFailure> {
        if operation.method != HttpMethod::Get {
            return Ok(operation);
        }
        let Some(action) = context.action() else {
            return Ok(operation);
        };
        let search = context
            .annotations
            .action(action)
            .into_iter()
            .find_map(|record| match record {
                AnnotationRecord::OpenApiSearch {
                    table_class,
                    collection,
                } => Some((table_class, collection)),
                _ => None,
            });
        let Some((table_class, collection)) = search else {
            return Ok(operation);
        };

        let table = context
            .models
            .resolve_table(&table_class)
            .ok_or_else(|| ExtensionFailure::UnresolvedTable(table_class.clone()))?;

        let collection = collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
        let Some(filters) = table.search_filters.get(collection) else {
            debug!("{} has no search collection {}", table.class, collection);
            return Ok(operation);
        };

        for filter in filters {
            check_filter_target(filter, table, context)?;
            operation.add_parameter(filter_parameter(filter))?;
        }
        Ok(operation)
    }
}

/// A filter qualified with a table alias must point at the table or one of its
/// associations, and the association's table must exist
fn check_filter_target(
    filter: &SearchFilter,
    table: &EntityMetadata,
    context: &OperationContext<'_>,
) -> Result<(), ExtensionFailure> {
    let Some((alias, _)) = filter.field.as_deref().and_then(|f| f.split_once('.')) else {
        return Ok(());
    };
    if alias == table.alias {
        return Ok(());
    }
    let association = table
        .association(alias)
        .ok_or_else(|| ExtensionFailure::UnresolvedTable(alias.to_string()))?;
    if context.models.association_target(association).is_none() {
        return Err(ExtensionFailure::UnresolvedTable(association.target().to_string()));
    }
    Ok(())
}

fn filter_parameter(filter: &SearchFilter) -> Parameter {
    let schema_type = match filter.kind {
        FilterKind::Boolean | FilterKind::Exists => "boolean",
        _ => "string",
    };
    let mut parameter = Parameter::new(
        filter.name.clone(),
        ParameterLocation::Query,
        false,
        SchemaProperty::of_type(schema_type),
    );
    parameter.description = filter.description.clone();
    parameter
}
