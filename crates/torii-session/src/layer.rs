use crate::{AnySessionStore, SessionService};
use torii_config::session::Configuration;
use torii_error::Result;
use tower_layer::Layer;
use triomphe::Arc;

#[derive(Clone)]
pub struct SessionLayer {
    config: Arc<Configuration>,
    store: AnySessionStore,
}

impl SessionLayer {
    #[must_use]
    pub fn new(config: Configuration, store: AnySessionStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Set up the configured store and wrap it into a layer
    pub async fn from_config(config: Configuration) -> Result<Self> {
        let store = AnySessionStore::from_config(&config).await?;
        Ok(Self::new(config, store))
    }

    #[must_use]
    pub fn store(&self) -> &AnySessionStore {
        &self.store
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService::new(inner, Arc::clone(&self.config), self.store.clone())
    }
}
