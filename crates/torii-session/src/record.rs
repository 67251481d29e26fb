use crate::SessionId;
use serde::{de::DeserializeOwned, Serialize};
use sonic_rs::Value;
use std::{collections::HashMap, time::Duration};
use torii_error::{Error, Result};

/// Key/value data persisted for a session
pub type SessionData = HashMap<String, Value>;

/// Lifetime of the session cookie emitted with the response
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CookieExpiry {
    /// Whatever the configuration says
    #[default]
    Configured,
    /// No max-age, the cookie goes away with the browser session
    BrowserSession,
    MaxAge(Duration),
}

/// Server-side state bound to a single request
///
/// Tracks its own mutations so the store knows whether anything has to be written back.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    id: SessionId,
    data: SessionData,
    is_new: bool,
    is_modified: bool,
    is_cleared: bool,
    needs_cookie: bool,
    cookie_expiry: CookieExpiry,
}

impl SessionRecord {
    /// Record without a backing entry
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            data: SessionData::new(),
            is_new: true,
            is_modified: false,
            is_cleared: false,
            needs_cookie: true,
            cookie_expiry: CookieExpiry::Configured,
        }
    }

    /// Record restored from a backing entry
    #[must_use]
    pub fn loaded(id: SessionId, data: SessionData) -> Self {
        Self {
            id,
            data,
            is_new: false,
            is_modified: false,
            is_cleared: false,
            needs_cookie: false,
            cookie_expiry: CookieExpiry::Configured,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Deserialise the value stored under `key`
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.data
            .get(key)
            .map(sonic_rs::from_value::<T>)
            .transpose()
            .map_err(Error::from)
    }

    pub fn insert<T>(&mut self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = sonic_rs::to_value(value)?;
        self.data.insert(key.into(), value);
        self.is_modified = true;
        self.needs_cookie = true;

        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.is_modified = true;
            self.needs_cookie = true;
        }

        removed
    }

    /// Drop all data. On save the backing entry is deleted and the session is moved to a fresh identifier
    pub fn clear(&mut self) {
        self.data.clear();
        self.is_cleared = true;
        self.needs_cookie = true;
        self.cookie_expiry = CookieExpiry::Configured;
    }

    /// Re-send the cookie with the given max-age. `None` turns it into a browser-session cookie
    pub fn expire_cookie(&mut self, max_age: Option<Duration>) {
        self.cookie_expiry = max_age.map_or(CookieExpiry::BrowserSession, CookieExpiry::MaxAge);
        self.needs_cookie = true;
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.is_cleared
    }

    #[must_use]
    pub fn needs_cookie(&self) -> bool {
        self.needs_cookie
    }

    #[must_use]
    pub fn cookie_expiry(&self) -> CookieExpiry {
        self.cookie_expiry
    }

    /// Whether the store has to write the entry
    #[must_use]
    pub fn needs_write(&self) -> bool {
        self.is_new || self.is_modified || self.is_cleared
    }

    /// Move a cleared record onto a fresh identifier, returning the one it had before
    pub(crate) fn rotate_id(&mut self) -> SessionId {
        std::mem::replace(&mut self.id, SessionId::generate())
    }
}
