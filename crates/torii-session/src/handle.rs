use crate::{record::CookieExpiry, SessionId, SessionRecord};
use serde::{de::DeserializeOwned, Serialize};
use sonic_rs::Value;
use std::{sync::Mutex, time::Duration};
use torii_error::Result;
use triomphe::Arc;

/// Request-scoped access to the session
///
/// Inserted into the request extensions by [`SessionService`](crate::SessionService).
/// Changes made through any clone end up in the same record.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionRecord>>,
}

impl Session {
    pub(crate) fn new(record: SessionRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.lock().unwrap().id().clone()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().contains(key)
    }

    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.inner.lock().unwrap().get(key)
    }

    pub fn insert<T>(&self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.inner.lock().unwrap().insert(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.lock().unwrap().remove(key)
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn expire_cookie(&self, max_age: Option<Duration>) {
        self.inner.lock().unwrap().expire_cookie(max_age);
    }

    #[must_use]
    pub fn cookie_expiry(&self) -> CookieExpiry {
        self.inner.lock().unwrap().cookie_expiry()
    }

    /// Copy of the current state of the record
    #[must_use]
    pub fn snapshot(&self) -> SessionRecord {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(feature = "axum")]
mod axum_impl {
    use super::Session;
    use axum_core::extract::FromRequestParts;
    use http::request::Parts;
    use torii_error::{Error, ErrorType};

    /// Rejects with a `500` when the Session layer isn't installed on the route
    impl<S> FromRequestParts<S> for Session
    where
        S: Sync,
    {
        type Rejection = Error;

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<Self>().cloned().ok_or_else(|| {
                Error::with_body(ErrorType::Other, "Session middleware missing.")
            })
        }
    }
}
