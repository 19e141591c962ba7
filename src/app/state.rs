//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::store::AccountStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub account_store: AccountStore,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let account_store = AccountStore::new(&config);
        Self::with_store(config, account_store)
    }

    pub fn with_store(config: Config, account_store: AccountStore) -> Self {
        Self {
            config: Arc::new(config),
            account_store,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }
}
