//! Model scanning: finds the table behind a route and the tables behind associations.

use crate::config::Configuration;
use crate::error::{ClassKind, Error, Result};
use crate::provider::{Association, EntityMetadata, ModelProvider};
use crate::route::{normalize_namespace, Route};
use log::debug;

/// Resolves table classes through the configured table namespaces
pub struct ModelScanner<'a> {
    provider: &'a dyn ModelProvider,
    config: &'a Configuration,
}

impl<'a> ModelScanner<'a> {
    pub fn new(provider: &'a dyn ModelProvider, config: &'a Configuration) -> Self {
        Self { provider, config }
    }

    /// Resolve a table from a fully qualified class or a short name like `Departments`
    pub fn resolve_table(&self, class: &str) -> Option<&'a EntityMetadata> {
        if let Some(table) = self.provider.describe_table(class) {
            return Some(table);
        }
        if class.contains('\\') {
            return None;
        }
        let short = class.strip_suffix("Table").unwrap_or(class);
        table_candidates(&self.config.namespaces().tables, None, short)
            .iter()
            .find_map(|candidate| self.provider.describe_table(candidate))
    }

    /// The table a route's controller maps to, if any.
    ///
    /// A table whose entity class lives outside the entity namespaces is a resolution
    /// failure rather than a miss.
    pub fn entity_for(&self, route: &Route) -> Result<Option<&'a EntityMetadata>> {
        let table = table_candidates(
            &self.config.namespaces().tables,
            route.plugin.as_deref(),
            &route.controller,
        )
        .iter()
        .find_map(|candidate| self.provider.describe_table(candidate));

        let Some(table) = table else {
            debug!("No table found for controller {}", route.controller);
            return Ok(None);
        };

        if !self.is_known_entity(&table.entity_class, route.plugin.as_deref()) {
            return Err(Error::resolution(ClassKind::Entity, table.entity_class.clone()));
        }
        Ok(Some(table))
    }

    /// The table an association points at
    pub fn association_target(&self, association: &Association) -> Option<&'a EntityMetadata> {
        self.resolve_table(association.target())
    }

    fn is_known_entity(&self, entity_class: &str, plugin: Option<&str>) -> bool {
        let plugin_namespace = plugin.map(|p| format!("\\{}\\", p.replace('/', "\\")));
        self.config
            .namespaces()
            .entities
            .iter()
            .map(|ns| normalize_namespace(ns))
            .chain(plugin_namespace)
            .any(|ns| entity_class.starts_with(&format!("{}Model\\Entity\\", ns)))
    }
}

fn table_candidates(namespaces: &[String], plugin: Option<&str>, short: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(plugin) = plugin {
        candidates.push(format!(
            "\\{}\\Model\\Table\\{}Table",
            plugin.replace('/', "\\"),
            short
        ));
    }
    for namespace in namespaces {
        candidates.push(format!(
            "{}Model\\Table\\{}Table",
            normalize_namespace(namespace),
            short
        ));
    }
    candidates
}
