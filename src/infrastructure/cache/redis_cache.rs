//! Redis-backed cache implementation.

use super::service::{CacheEntry, CacheError, CacheResult, CacheService, LockToken};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult, Script, aio::ConnectionManager};
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

/// Deletes the lock key only if it still holds our token.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Sent as `EVALSHA`; loaded on the first `NOSCRIPT` reply.
static RELEASE_LOCK: LazyLock<Script> = LazyLock::new(|| Script::new(RELEASE_LOCK_SCRIPT));

/// Redis cache for slug resolutions and fill locks.
///
/// Uses `ConnectionManager` for automatic reconnection. Every command is
/// bounded by `op_timeout`; a timeout surfaces as [`CacheError::Timeout`] and
/// the caller treats it as a miss.
///
/// # Keys
///
/// - `url:{slug}` - JSON-encoded [`CacheEntry`]
/// - `lock:{slug}` - random lock token, `SET NX PX`
pub struct RedisCache {
    client: ConnectionManager,
    op_timeout: Duration,
    key_prefix: String,
    lock_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection
    /// cannot be established, or the PING fails.
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let manager = connect_manager(redis_url).await?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            op_timeout,
            key_prefix: "url:".to_string(),
            lock_prefix: "lock:".to_string(),
        })
    }

    fn build_key(&self, slug: &str) -> String {
        format!("{}{}", self.key_prefix, slug)
    }

    fn build_lock_key(&self, slug: &str) -> String {
        format!("{}{}", self.lock_prefix, slug)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_timeout() => Err(CacheError::Timeout(self.op_timeout)),
            Ok(Err(e)) => Err(map_redis_error(operation, e)),
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }
}

/// Opens a `ConnectionManager` and checks it with a PING.
///
/// Shared with the Redis click queue so both use the same connection setup.
pub async fn connect_manager(redis_url: &str) -> CacheResult<ConnectionManager> {
    info!("Connecting to Redis at {}", redis_url);

    let client = Client::open(redis_url)
        .map_err(|e| CacheError::Connection(format!("Failed to create Redis client: {}", e)))?;

    let manager = ConnectionManager::new(client)
        .await
        .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

    let mut test_conn = manager.clone();
    test_conn
        .ping::<()>()
        .await
        .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))?;

    Ok(manager)
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        CacheError::Connection(format!("{operation}: {err}"))
    } else {
        CacheError::Operation(format!("{operation}: {err}"))
    }
}

fn millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, slug: &str) -> CacheResult<Option<CacheEntry>> {
        let key = self.build_key(slug);
        let mut conn = self.client.clone();

        let raw: Option<String> = self.bounded("GET", conn.get(&key)).await?;

        match raw {
            Some(payload) => {
                let entry = serde_json::from_str(&payload)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                debug!(slug, "Cache HIT");
                Ok(Some(entry))
            }
            None => {
                debug!(slug, "Cache MISS");
                Ok(None)
            }
        }
    }

    async fn set(&self, slug: &str, entry: &CacheEntry, ttl: Duration) -> CacheResult<()> {
        let key = self.build_key(slug);
        let payload =
            serde_json::to_string(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let mut conn = self.client.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(payload).arg("PX").arg(millis(ttl));

        self.bounded("SET", cmd.query_async::<()>(&mut conn)).await?;
        debug!(slug, ttl_ms = millis(ttl), "Cache SET");

        Ok(())
    }

    async fn delete(&self, slug: &str) -> CacheResult<()> {
        let key = self.build_key(slug);
        let mut conn = self.client.clone();

        let deleted: i64 = self.bounded("DEL", conn.del(&key)).await?;
        if deleted > 0 {
            debug!(slug, "Cache INVALIDATE");
        }

        Ok(())
    }

    async fn acquire_lock(&self, slug: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        let key = self.build_lock_key(slug);
        let token = LockToken::random();
        let mut conn = self.client.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key)
            .arg(&token.0)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl));

        let reply: redis::Value = self
            .bounded("SET NX", cmd.query_async(&mut conn))
            .await?;

        // Nil means the key already exists.
        if matches!(reply, redis::Value::Nil) {
            return Ok(None);
        }

        Ok(Some(token))
    }

    async fn release_lock(&self, slug: &str, token: &LockToken) -> CacheResult<()> {
        let key = self.build_lock_key(slug);
        let mut conn = self.client.clone();

        let mut invocation = RELEASE_LOCK.prepare_invoke();
        invocation.key(&key).arg(&token.0);

        let released: i64 = self
            .bounded("EVALSHA", invocation.invoke_async(&mut conn))
            .await?;
        if released == 0 {
            debug!(slug, "lock expired before release");
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        self.bounded("PING", conn.ping::<()>()).await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
