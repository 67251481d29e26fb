use crate::{CsrfGuard, Token};
use http::HeaderMap;
use std::sync::Mutex;
use triomphe::Arc;

/// Request-scoped access to the CSRF state
///
/// Inserted into the request extensions by [`CsrfService`](crate::CsrfService).
#[derive(Clone)]
pub struct CsrfHandle {
    pub(crate) inner: Arc<Mutex<CsrfGuard>>,
}

impl CsrfHandle {
    pub(crate) fn new(guard: CsrfGuard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(guard)),
        }
    }

    /// Get a freshly salted token for the current secret, creating the secret if necessary
    #[inline]
    #[must_use]
    pub fn get_token(&self) -> Token {
        self.inner.lock().unwrap().get_token()
    }

    /// Switch to a brand new secret
    ///
    /// **Important**: Call this after every change of the authentication state (login, logout).
    /// Otherwise a token captured before the login remains valid after it.
    #[inline]
    pub fn rotate_token(&self) {
        self.inner.lock().unwrap().rotate_token();
    }

    /// Hidden form input carrying a token, ready to be embedded into a template
    #[must_use]
    pub fn hidden_input(&self) -> String {
        let mut guard = self.inner.lock().unwrap();
        let token = guard.get_token();
        format!(
            r#"<input type="hidden" name="{}" value="{token}"/>"#,
            guard.field_name()
        )
    }

    pub(crate) fn finish(&self, headers: &mut HeaderMap) {
        self.inner.lock().unwrap().finish(headers);
    }
}

#[cfg(feature = "axum")]
mod axum_impl {
    use super::CsrfHandle;
    use axum_core::extract::FromRequestParts;
    use http::request::Parts;
    use torii_error::{Error, ErrorType};

    /// Rejects with a `500` when the CSRF layer isn't installed on the route
    impl<S> FromRequestParts<S> for CsrfHandle
    where
        S: Sync,
    {
        type Rejection = Error;

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<Self>().cloned().ok_or_else(|| {
                Error::with_body(ErrorType::Other, "CSRF middleware missing.")
            })
        }
    }
}
