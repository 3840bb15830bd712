//! Route scanning: turns the host router's routes into resolved [`Route`]s.

use crate::config::Configuration;
use crate::error::{ClassKind, Error, Result};
use crate::provider::{Declaration, HttpMethod, RouteProvider, RouteRecord};
use log::{debug, info};

/// Handle to a controller action, standing in for a reflection handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionRef {
    /// Fully qualified controller class
    pub controller: String,
    pub action: String,
}

impl ActionRef {
    pub fn declaration(&self) -> Declaration {
        Declaration::Action {
            controller: self.controller.clone(),
            action: self.action.clone(),
        }
    }
}

/// A route under the configured prefix, with its controller resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    /// Template as registered, e.g. `/employees/:id`
    pub template: String,
    /// Template in OpenAPI form, e.g. `/employees/{id}`
    pub path: String,
    /// Short controller name, e.g. `Employees`
    pub controller: String,
    pub action: String,
    pub plugin: Option<String>,
    /// Fully qualified controller class
    pub controller_class: String,
    /// Present when the controller declares the action
    pub action_ref: Option<ActionRef>,
}

impl Route {
    /// Names of the placeholders in the path, in order
    pub fn path_parameters(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter_map(|part| {
                part.strip_prefix('{')
                    .and_then(|p| p.strip_suffix('}'))
                    .map(|p| p.to_string())
            })
            .collect()
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

/// Enumerates routes under the configured prefix
pub struct RouteScanner<'a> {
    provider: &'a dyn RouteProvider,
    config: &'a Configuration,
}

impl<'a> RouteScanner<'a> {
    pub fn new(provider: &'a dyn RouteProvider, config: &'a Configuration) -> Self {
        Self { provider, config }
    }

    /// Resolve every route under the prefix, keeping the router's order.
    ///
    /// A route whose controller cannot be found under the controller namespaces fails
    /// the scan.
    pub fn scan(&self) -> Result<Vec<Route>> {
        let prefix = self.config.prefix();
        let mut routes = Vec::new();

        for record in self.provider.list_routes() {
            if !is_under_prefix(&record.template, prefix) {
                debug!("Skipping route outside prefix {}: {}", prefix, record.template);
                continue;
            }
            routes.push(self.resolve(record)?);
        }

        info!("Scanned {} routes under {}", routes.len(), prefix);
        Ok(routes)
    }

    fn resolve(&self, record: RouteRecord) -> Result<Route> {
        let candidates = controller_candidates(
            &self.config.namespaces().controllers,
            record.plugin.as_deref(),
            &record.controller,
        );
        let controller = candidates
            .iter()
            .find_map(|class| self.provider.controller(class))
            .ok_or_else(|| {
                Error::resolution(ClassKind::Controller, format!("{}Controller", record.controller))
            })?;

        let action_ref = controller
            .actions
            .iter()
            .any(|a| a == &record.action)
            .then(|| ActionRef {
                controller: controller.class.clone(),
                action: record.action.clone(),
            });
        if action_ref.is_none() {
            debug!("{} declares no action {}", controller.class, record.action);
        }

        Ok(Route {
            method: record.method,
            path: convert_path_format(&record.template),
            template: record.template,
            controller: record.controller,
            action: record.action,
            plugin: record.plugin,
            controller_class: controller.class.clone(),
            action_ref,
        })
    }
}

/// Whether `template` is `prefix` itself or lives below it
pub fn is_under_prefix(template: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match template.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Convert path format from :param or {param} to OpenAPI {param} format
pub fn convert_path_format(path: &str) -> String {
    path.split('/')
        .map(|part| match part.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Make a namespace prefix end with exactly one separator
pub fn normalize_namespace(namespace: &str) -> String {
    format!("{}\\", namespace.trim_end_matches('\\'))
}

fn controller_candidates(namespaces: &[String], plugin: Option<&str>, controller: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(plugin) = plugin {
        candidates.push(format!(
            "\\{}\\Controller\\{}Controller",
            plugin.replace('/', "\\"),
            controller
        ));
    }
    for namespace in namespaces {
        candidates.push(format!(
            "{}Controller\\{}Controller",
            normalize_namespace(namespace),
            controller
        ));
    }
    candidates
}
