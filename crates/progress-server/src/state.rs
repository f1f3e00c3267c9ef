use std::sync::Arc;

use progress_core::DocumentStore;

use crate::security::Perimeter;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub perimeter: Arc<Perimeter>,
}

impl AppState {
    pub fn new(store: DocumentStore, perimeter: Perimeter) -> Self {
        Self {
            store,
            perimeter: Arc::new(perimeter),
        }
    }
}
