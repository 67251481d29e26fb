use crate::{SessionId, SessionIdRef, SessionRecord};
use enum_dispatch::enum_dispatch;
use torii_config::session::{Configuration, StoreConfiguration};
use torii_error::Result;

pub use self::{in_memory::InMemory, redis::Redis};

pub mod in_memory;
pub mod redis;

#[derive(Clone)]
#[enum_dispatch(SessionStore)]
pub enum AnySessionStore {
    InMemory(InMemory),
    Redis(Redis),
}

impl AnySessionStore {
    /// Construct the backend selected in the configuration
    ///
    /// Connects to Redis if that's the configured backend.
    pub async fn from_config(config: &Configuration) -> Result<Self> {
        let store = match config.store {
            StoreConfiguration::InMemory(ref in_memory_config) => {
                InMemory::from_config(in_memory_config).into()
            }
            StoreConfiguration::Redis(ref redis_config) => {
                Redis::connect(redis_config, config.cookie_age())
                    .await?
                    .into()
            }
        };

        Ok(store)
    }
}

#[enum_dispatch]
pub trait SessionStore {
    /// Fresh record under a newly generated identifier. Nothing is written until it is saved
    fn new_session(&self) -> SessionRecord {
        SessionRecord::new(SessionId::generate())
    }

    /// Restore the record stored under `id`, or a fresh one if there is none
    async fn load(&self, id: &SessionIdRef) -> Result<SessionRecord>;

    /// Persist the record
    ///
    /// A cleared record has its old entry deleted and is moved to a new identifier first.
    /// The entry is then written if the record is new, modified or cleared. Saving a clean record is a no-op.
    async fn save(&self, record: &mut SessionRecord) -> Result<()>;
}
