//! Shared application state.

use crate::config::Config;
use slate_core::{
    BoardStore, PersistenceThrottle, RelayEngine, Resolver, SessionFactory, SessionRegistry,
};
use std::sync::Arc;

/// Shared application state: the board store, the session registry, and the
/// serialized resolver in front of it.
pub struct AppState {
    pub store: Arc<BoardStore>,
    pub registry: Arc<SessionRegistry>,
    pub resolver: Resolver,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> slate_core::Result<Self> {
        let store = Arc::new(BoardStore::open(&config.teams_dir).await?);
        let factory = SessionFactory::new(Arc::new(RelayEngine), config.client_timeout());
        let throttle = PersistenceThrottle::new(store.clone(), config.flush_interval());
        let registry = SessionRegistry::new(store.clone(), factory, throttle);
        let resolver = Resolver::spawn(registry.clone());

        Ok(Self {
            store,
            registry,
            resolver,
            config,
        })
    }
}
