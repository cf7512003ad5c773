use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::endpoint::Endpoint;
use crate::config::CompilerConfig;
use crate::view_catalog::{ViewConfigDocument, ViewSpecError, ViewStore};

/// All endpoints of one configuration document, sharing one view store
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    store: Arc<ViewStore>,
    endpoints: BTreeMap<String, Endpoint>,
}

impl EndpointCatalog {
    pub fn from_document(document: &ViewConfigDocument, config: &CompilerConfig) -> Result<Self, ViewSpecError> {
        let store = Arc::new(document.build_store()?);
        let mut endpoints = BTreeMap::new();
        for definition in &document.endpoints {
            let endpoint = Endpoint::from_definition(definition, store.clone(), config)?;
            endpoints.insert(definition.name.clone(), endpoint);
        }
        log::info!(
            "Loaded {} view(s) and {} endpoint(s){}",
            store.names().len(),
            endpoints.len(),
            document
                .name
                .as_ref()
                .map(|n| format!(" from '{}'", n))
                .unwrap_or_default()
        );
        Ok(EndpointCatalog { store, endpoints })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P, config: &CompilerConfig) -> Result<Self, ViewSpecError> {
        Self::from_document(&ViewConfigDocument::from_yaml_file(path)?, config)
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn store(&self) -> &Arc<ViewStore> {
        &self.store
    }
}
