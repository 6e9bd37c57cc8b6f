//! Redis-backed cache driver.
//!
//! TTL is delegated to the store (`SET ... EX`), so the read path has no
//! expiration logic of its own: a key the store already expired is a
//! plain miss. A per-namespace membership set
//! (`cache:folder:<md5(folder)>:<name>:keys`) records every entry key so
//! `clear` can remove exactly one namespace.
//!
//! Connection and command failures propagate; they indicate a
//! misconfigured deployment, not a cache-state condition.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use redis::AsyncCommands;
use serde_json::Value;

use dotapp_cache::key;
use dotapp_cache::{
    CacheDriver, CacheError, CacheResult, ExistsOutcome, InstanceAccessor, MemoryShadow,
    RedisCacheConfig,
};

/// Redis cache driver over a deadpool connection pool.
pub struct RedisDriver {
    pool: Pool,
    prefix: String,
    default_lifetime: u64,
    shadow: Arc<MemoryShadow>,
}

impl RedisDriver {
    /// Builds the pool and verifies a connection can be established.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` when the pool cannot be created or
    /// no connection can be obtained.
    pub async fn connect(
        config: &RedisCacheConfig,
        prefix: impl Into<String>,
        default_lifetime: u64,
        shadow: Arc<MemoryShadow>,
    ) -> CacheResult<Self> {
        let mut pool_config = deadpool_redis::Config::from_url(&config.url);
        let mut sizing = deadpool_redis::PoolConfig::default();
        sizing.max_size = config.pool_size;
        let timeout = Duration::from_millis(config.timeout_ms);
        sizing.timeouts.wait = Some(timeout);
        sizing.timeouts.create = Some(timeout);
        sizing.timeouts.recycle = Some(timeout);
        pool_config.pool = Some(sizing);

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::connection(format!("failed to create redis pool: {e}")))?;
        pool.get()
            .await
            .map_err(|e| CacheError::connection(format!("failed to connect to redis: {e}")))?;
        tracing::info!(url = %config.url, "connected to redis");

        Ok(Self {
            pool,
            prefix: prefix.into(),
            default_lifetime,
            shadow,
        })
    }

    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::connection(e.to_string()))
    }

    fn location(
        &self,
        key_name: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> (String, String, String) {
        let id = key::derive_id(&self.prefix, instance.name(), key_name, context);
        let entry = key::entry_key(instance.folder(), instance.name(), &id);
        let set = key::member_set_key(instance.folder(), instance.name());
        (id, entry, set)
    }

    /// Removes one entry from the store, the membership set and the shadow.
    async fn discard(&self, id: &str, entry: &str, set: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(entry)
            .await
            .map_err(|e| CacheError::backend(format!("DEL failed: {e}")))?;
        conn.srem::<_, _, ()>(set, entry)
            .await
            .map_err(|e| CacheError::backend(format!("SREM failed: {e}")))?;
        self.shadow.remove(id);
        Ok(())
    }
}

#[async_trait]
impl CacheDriver for RedisDriver {
    async fn save(
        &self,
        key: &str,
        data: &Value,
        lifetime: Option<u64>,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<bool, CacheError> {
        let (id, entry, set) = self.location(key, context, instance);
        let payload =
            serde_json::to_string(data).map_err(|e| CacheError::encoding(e.to_string()))?;
        // the store rejects EX 0; a zero lifetime becomes the shortest one
        let ttl = lifetime.unwrap_or(self.default_lifetime).max(1);

        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(&entry, payload, ttl)
            .await
            .map_err(|e| CacheError::backend(format!("SET failed: {e}")))?;
        conn.sadd::<_, _, ()>(&set, &entry)
            .await
            .map_err(|e| CacheError::backend(format!("SADD failed: {e}")))?;

        self.shadow.put(
            id,
            Arc::new(data.clone()),
            Some(SystemTime::now() + Duration::from_secs(ttl)),
        );
        tracing::debug!(key = %entry, ttl, "cache set");
        Ok(true)
    }

    async fn load(
        &self,
        key: &str,
        context: &Value,
        destroy: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<Option<Arc<Value>>, CacheError> {
        let (id, entry, set) = self.location(key, context, instance);

        if let Some(hit) = self.shadow.get(&id) {
            tracing::debug!(key = %entry, "cache hit (shadow)");
            if destroy {
                self.discard(&id, &entry, &set).await?;
            }
            return Ok(Some(hit));
        }

        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(&entry)
            .await
            .map_err(|e| CacheError::backend(format!("GET failed: {e}")))?;
        let Some(raw) = raw else {
            tracing::debug!(key = %entry, "cache miss");
            return Ok(None);
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %entry, error = %e, "corrupt cache entry");
                return Ok(None);
            }
        };

        let payload = Arc::new(value);
        if destroy {
            drop(conn);
            self.discard(&id, &entry, &set).await?;
        } else {
            // mirror the store's remaining TTL so the shadow cannot
            // outlive the durable entry
            let remaining: i64 = conn
                .ttl(&entry)
                .await
                .map_err(|e| CacheError::backend(format!("TTL failed: {e}")))?;
            let expires_at =
                (remaining > 0).then(|| SystemTime::now() + Duration::from_secs(remaining as u64));
            self.shadow.put(id, Arc::clone(&payload), expires_at);
        }
        Ok(Some(payload))
    }

    async fn exists(
        &self,
        key: &str,
        context: &Value,
        load: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<ExistsOutcome, CacheError> {
        if load {
            return Ok(match self.load(key, context, false, instance).await? {
                Some(payload) => ExistsOutcome::Loaded(payload),
                None => ExistsOutcome::Missing,
            });
        }

        let (id, entry, _) = self.location(key, context, instance);
        if self.shadow.get(&id).is_some() {
            return Ok(ExistsOutcome::Present);
        }

        let mut conn = self.conn().await?;
        let found: bool = conn
            .exists(&entry)
            .await
            .map_err(|e| CacheError::backend(format!("EXISTS failed: {e}")))?;
        Ok(if found {
            ExistsOutcome::Present
        } else {
            ExistsOutcome::Missing
        })
    }

    async fn delete(
        &self,
        key: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<(), CacheError> {
        let (id, entry, set) = self.location(key, context, instance);
        self.discard(&id, &entry, &set).await
    }

    /// Removes exactly the keys registered for this namespace.
    async fn clear(&self, instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        let set = key::member_set_key(instance.folder(), instance.name());
        let mut conn = self.conn().await?;

        let members: Vec<String> = conn
            .smembers(&set)
            .await
            .map_err(|e| CacheError::backend(format!("SMEMBERS failed: {e}")))?;
        for member in &members {
            conn.del::<_, ()>(member)
                .await
                .map_err(|e| CacheError::backend(format!("DEL failed: {e}")))?;
            if let Some(id) = key::derived_id_of_entry_key(member) {
                self.shadow.remove(id);
            }
        }
        conn.del::<_, ()>(&set)
            .await
            .map_err(|e| CacheError::backend(format!("DEL failed: {e}")))?;

        tracing::debug!(
            instance = instance.name(),
            removed = members.len(),
            "cache namespace cleared"
        );
        Ok(())
    }

    /// The store expires keys itself; nothing to sweep.
    async fn gc(&self, _instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
