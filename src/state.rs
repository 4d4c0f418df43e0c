//! Shared application state: one `Store`, one `Config`, one `Indexer`, one
//! `Authenticator`, wired up once at startup and handed to both the HTTP
//! surface and the MCP tool surface.

use crate::auth::Authenticator;
use crate::config::Config;
use crate::indexer::Indexer;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub indexer: Arc<Indexer>,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: Arc<Config>) -> Self {
        let indexer = Arc::new(Indexer::new(store.clone(), config.clone()));
        let authenticator = Arc::new(Authenticator::new(store.clone(), &config));
        AppState {
            store,
            config,
            indexer,
            authenticator,
        }
    }
}
