use crate::config::{PortalConfig, PortalCredentials, StoreEndpoints};
use crate::document_store::DocumentStore;
use crate::sheet_mirror::SheetMirror;

/// Everything one mirror run needs, bundled.
pub struct MirrorContext {
    pub portal_config: PortalConfig,
    pub credentials: PortalCredentials,
    pub store: DocumentStore,
    pub sheets: SheetMirror,
}

impl MirrorContext {
    pub fn new(portal_config: PortalConfig, database: &str) -> anyhow::Result<Self> {
        let credentials = PortalCredentials::from_env()?;
        let endpoints = StoreEndpoints::from_env()?;
        let store = DocumentStore::new(endpoints.candidates.clone(), database)?;
        let sheets = SheetMirror::new(endpoints.candidates)?;
        Ok(MirrorContext {
            portal_config,
            credentials,
            store,
            sheets,
        })
    }
}
