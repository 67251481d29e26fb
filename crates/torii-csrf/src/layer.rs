use crate::{guard::Settings, CsrfService};
use http::header::InvalidHeaderName;
use torii_config::csrf::Configuration;
use tower_layer::Layer;
use triomphe::Arc;

#[derive(Clone)]
pub struct CsrfLayer {
    settings: Arc<Settings>,
}

impl CsrfLayer {
    /// Fails if the configured header name isn't a valid HTTP header name
    pub fn new(config: Configuration) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            settings: Arc::new(Settings::new(config)?),
        })
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfService::new(inner, Arc::clone(&self.settings))
    }
}
