use self::catch_panic::CatchPanic;
use fred::{clients::RedisPool, interfaces::ClientLike, types::RedisConfig};
use std::{env, future::Future, panic};

mod catch_panic;

/// Run a test against the Redis server at `REDIS_URL`
///
/// The database is flushed afterwards, even if the test panicked.
pub async fn redis_test<F, Fut>(func: F) -> Fut::Output
where
    F: FnOnce(RedisPool) -> Fut,
    Fut: Future,
{
    let redis_url = env::var("REDIS_URL").expect("Missing redis URL");
    let config = RedisConfig::from_url(&redis_url).expect("Invalid redis URL");
    let pool = RedisPool::new(config, None, None, None, 5).expect("Failed to create redis pool");
    pool.init().await.expect("Failed to connect to redis");

    let out = CatchPanic::new(func(pool.clone())).await;

    let () = pool
        .next()
        .flushall(false)
        .await
        .expect("Failed to flush redis");

    match out {
        Ok(out) => out,
        Err(err) => panic::resume_unwind(err),
    }
}
