use super::SessionStore;
use crate::{record::SessionData, SessionIdRef, SessionRecord};
use fred::{
    clients::RedisPool,
    error::RedisError,
    interfaces::{ClientLike, KeysInterface},
    types::{Expiration, RedisConfig},
};
use smol_str::SmolStr;
use std::{future::Future, time::Duration};
use tokio::time;
use torii_config::session::RedisConfiguration;
use torii_error::{Error, ErrorType, Result, ResultExt};
use typed_builder::TypedBuilder;

/// Store keeping the sessions as JSON strings in Redis
#[derive(Clone, TypedBuilder)]
pub struct Redis {
    pool: RedisPool,
    #[builder(default = SmolStr::new_static("session"), setter(into))]
    namespace: SmolStr,
    /// Expiry of the entries. Unset means they live until deleted
    #[builder(default)]
    ttl: Option<Duration>,
    #[builder(default = Duration::from_secs(5))]
    timeout: Duration,
}

impl Redis {
    /// Build the connection pool and wait for it to come up
    pub async fn connect(config: &RedisConfiguration, ttl: Option<Duration>) -> Result<Self> {
        let redis_config = RedisConfig::from_url(config.url.as_str())?;
        let pool = RedisPool::new(redis_config, None, None, None, config.pool_size)?;
        pool.init().await?;

        Ok(Self::builder()
            .pool(pool)
            .namespace(config.namespace.clone())
            .ttl(ttl)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build())
    }

    #[inline]
    fn format_key(&self, id: &SessionIdRef) -> String {
        format!("{}:{id}", self.namespace)
    }

    /// Run a Redis command, bounded by the request timeout
    ///
    /// Every failure is reported as the store being unavailable.
    async fn bounded<F, T>(&self, command: F) -> Result<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match time::timeout(self.timeout, command).await {
            Ok(result) => result.with_error_type(ErrorType::StoreUnavailable),
            Err(elapsed) => Err(Error::new(ErrorType::StoreUnavailable, elapsed)),
        }
    }

    /// Check that the server is reachable
    pub async fn ping(&self) -> Result<()> {
        let () = self.bounded(self.pool.next().ping()).await?;
        Ok(())
    }
}

impl SessionStore for Redis {
    #[instrument(skip_all, fields(%id))]
    async fn load(&self, id: &SessionIdRef) -> Result<SessionRecord> {
        let key = self.format_key(id);

        debug!(%key, "fetching session");
        let Some(serialised) = self
            .bounded(self.pool.get::<Option<String>, _>(&key))
            .await?
        else {
            return Ok(self.new_session());
        };

        let data: SessionData = sonic_rs::from_str(&serialised)?;
        Ok(SessionRecord::loaded(id.to_owned(), data))
    }

    #[instrument(skip_all, fields(id = %record.id()))]
    async fn save(&self, record: &mut SessionRecord) -> Result<()> {
        if record.is_cleared() {
            let old_key = self.format_key(&record.rotate_id());

            debug!(key = %old_key, "deleting cleared session");
            self.bounded(self.pool.del::<(), _>(old_key)).await?;
        }

        if record.needs_write() {
            let key = self.format_key(record.id());
            let serialised = sonic_rs::to_string(record.data())?;
            let expiration = self
                .ttl
                .map(|ttl| Expiration::EX(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)));

            debug!(%key, ttl = ?self.ttl, "writing session");
            self.bounded(
                self.pool
                    .set::<(), _, _>(key, serialised, expiration, None, false),
            )
            .await?;
        }

        Ok(())
    }
}
