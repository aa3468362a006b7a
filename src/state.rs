use std::sync::Arc;

use super::{config::Config, store::Store};

pub struct AppState {
    pub config: Config,
    pub store: Store,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        let config = Config::load();
        let store = Store::new(&config.store_url, &config.store_key);

        Arc::new(Self { config, store })
    }
}
