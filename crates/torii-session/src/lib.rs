//! Server-side sessions for tower services
//!
//! [`SessionLayer`] resolves the session named by the session cookie before the request reaches the
//! wrapped service and hands it over as a [`Session`] request extension. Once the response is ready
//! the session is written back to its [`SessionStore`] and the cookie is (re-)issued when needed.
//! Failed requests (server errors and responses rendered from a `torii_error::Error`) leave the
//! store untouched.
//!
//! Two stores are available: [`InMemory`](store::InMemory) keeps the sessions inside of the
//! process, [`Redis`](store::Redis) keeps them in a Redis server.

#[macro_use]
extern crate tracing;

pub use self::{
    handle::Session,
    id::{SessionId, SessionIdRef},
    layer::SessionLayer,
    record::{CookieExpiry, SessionData, SessionRecord},
    service::SessionService,
    store::{AnySessionStore, SessionStore},
};

pub mod store;

mod handle;
mod id;
mod layer;
mod record;
mod service;
