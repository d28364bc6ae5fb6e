//! Plugin Schema Registry
//!
//! In-memory store of plugin-contributed config scopes, keyed by plugin
//! name and version. The registry is pre-populated by an external
//! fetcher; the analysis core only reads it.

use std::collections::HashMap;

use crate::error::Result;

use super::definitions::{parse_document, SchemaNode};

#[derive(Debug, Clone)]
pub struct PluginSpec {
    pub name: String,
    pub version: Option<String>,
    pub scopes: Vec<(String, SchemaNode)>,
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    specs: HashMap<String, Vec<PluginSpec>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry { specs: HashMap::new() }
    }

    /// Register a plugin schema document (same shape as the built-in
    /// definitions).
    pub fn register(&mut self, name: &str, version: Option<&str>, document: &str) -> Result<()> {
        let scopes = parse_document(document)?
            .into_iter()
            .collect::<Vec<(String, SchemaNode)>>();
        self.specs.entry(name.to_string()).or_default().push(PluginSpec {
            name: name.to_string(),
            version: version.map(|v| v.to_string()),
            scopes,
        });
        Ok(())
    }

    /// Look up a plugin ref `name` or `name@version`.
    pub fn find(&self, reference: &str) -> Option<&PluginSpec> {
        let (name, version) = match reference.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (reference, None),
        };
        let versions = self.specs.get(name)?;
        match version {
            Some(version) => versions
                .iter()
                .find(|spec| spec.version.as_deref() == Some(version))
                .or_else(|| versions.last()),
            None => versions.last(),
        }
    }
}
