use super::SessionStore;
use crate::{record::SessionData, SessionId, SessionIdRef, SessionRecord};
use moka::future::Cache;
use std::time::Duration;
use torii_config::session::InMemoryConfiguration;
use torii_error::Result;

/// Process-local store
///
/// Clones share the same map.
#[derive(Clone)]
pub struct InMemory {
    inner: Cache<SessionId, SessionData>,
}

impl InMemory {
    /// Store without any eviction
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&InMemoryConfiguration::default())
    }

    #[must_use]
    pub fn from_config(config: &InMemoryConfiguration) -> Self {
        let mut builder = Cache::builder();
        if let Some(max_capacity) = config.max_capacity {
            builder = builder.max_capacity(max_capacity);
        }
        if let Some(time_to_idle_secs) = config.time_to_idle_secs {
            builder = builder.time_to_idle(Duration::from_secs(time_to_idle_secs));
        }

        Self {
            inner: builder.build(),
        }
    }

    /// Drop every stored session
    pub async fn flush(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    #[must_use]
    pub fn contains(&self, id: &SessionIdRef) -> bool {
        self.inner.contains_key(id)
    }
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemory {
    async fn load(&self, id: &SessionIdRef) -> Result<SessionRecord> {
        let record = match self.inner.get(id).await {
            Some(data) => SessionRecord::loaded(id.to_owned(), data),
            None => self.new_session(),
        };

        Ok(record)
    }

    async fn save(&self, record: &mut SessionRecord) -> Result<()> {
        if record.is_cleared() {
            let old_id = record.rotate_id();
            self.inner.invalidate(&old_id).await;
        }

        if record.needs_write() {
            self.inner
                .insert(record.id().clone(), record.data().clone())
                .await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::InMemory;
    use crate::{SessionIdRef, SessionStore};

    #[tokio::test]
    async fn unknown_id_yields_new_session() {
        let store = InMemory::new();
        let record = store.load(SessionIdRef::from_str("nonexistent")).await.unwrap();

        assert!(record.is_new());
        assert_ne!(record.id().as_str(), "nonexistent");
    }

    #[tokio::test]
    async fn new_session_is_not_stored_until_saved() {
        let store = InMemory::new();
        let mut record = store.new_session();
        assert!(!store.contains(record.id()));

        store.save(&mut record).await.unwrap();
        assert!(store.contains(record.id()));
    }

    #[tokio::test]
    async fn roundtrip() {
        let store = InMemory::new();

        let mut record = store.new_session();
        record.insert("foo", "bar").unwrap();
        store.save(&mut record).await.unwrap();

        let loaded = store.load(record.id()).await.unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.id(), record.id());
        assert_eq!(loaded.get::<String>("foo").unwrap().as_deref(), Some("bar"));
    }

    #[tokio::test]
    async fn clean_record_is_not_written() {
        let store = InMemory::new();

        let mut record = store.new_session();
        record.insert("foo", "bar").unwrap();
        store.save(&mut record).await.unwrap();

        // Two requests loading the same session. Only the second one changes anything
        let mut reader = store.load(record.id()).await.unwrap();
        let mut writer = store.load(record.id()).await.unwrap();
        writer.insert("foo", "baz").unwrap();
        store.save(&mut writer).await.unwrap();
        store.save(&mut reader).await.unwrap();

        let loaded = store.load(record.id()).await.unwrap();
        assert_eq!(loaded.get::<String>("foo").unwrap().as_deref(), Some("baz"));
    }

    #[tokio::test]
    async fn clear_moves_to_new_id() {
        let store = InMemory::new();

        let mut record = store.new_session();
        record.insert("foo", "bar").unwrap();
        store.save(&mut record).await.unwrap();
        let old_id = record.id().clone();

        let mut record = store.load(&old_id).await.unwrap();
        record.clear();
        store.save(&mut record).await.unwrap();

        assert_ne!(*record.id(), old_id);
        assert!(!store.contains(&old_id));
        assert!(store.contains(record.id()));

        let stale = store.load(&old_id).await.unwrap();
        assert!(stale.is_new());
        assert!(stale.data().is_empty());
    }

    #[tokio::test]
    async fn flush() {
        let store = InMemory::new();
        let mut record = store.new_session();
        store.save(&mut record).await.unwrap();

        store.flush().await;
        assert!(!store.contains(record.id()));
    }
}
