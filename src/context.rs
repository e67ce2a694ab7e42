//! Process-wide client handles.
//!
//! The document store and index clients are built once at startup and shared by
//! every handler afterwards through axum `Extension` layers. `init` may succeed
//! only once per process.

use crate::error::{Result, SyncError};
use crate::projection::types::SchemaCatalog;
use crate::search::engine::SearchService;
use crate::storage::provider::{DocumentStore, SearchIndex};

use std::sync::{Arc, OnceLock};

static CONTEXT: OnceLock<Arc<AppContext>> = OnceLock::new();

pub struct AppContext {
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn SearchIndex>,
    pub catalog: SchemaCatalog,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        catalog: SchemaCatalog,
    ) -> Self {
        Self {
            store,
            index,
            catalog,
        }
    }

    pub fn search_service(&self) -> SearchService {
        SearchService::new(self.index.clone(), self.store.clone(), self.catalog.clone())
    }
}

/// Installs the shared context. Fails if one is already installed.
pub fn init(context: AppContext) -> Result<Arc<AppContext>> {
    if context.catalog.is_empty() {
        return Err(SyncError::Configuration(
            "no collections configured".to_string(),
        ));
    }

    let context = Arc::new(context);
    CONTEXT
        .set(context.clone())
        .map_err(|_| SyncError::Configuration("context already initialized".to_string()))?;

    tracing::info!(
        "Initialized context with {} collections",
        context.catalog.len()
    );
    Ok(context)
}
