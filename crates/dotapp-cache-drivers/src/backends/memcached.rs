//! Memcached-backed cache driver.
//!
//! Key derivation is identical to the Redis driver, but the protocol
//! offers no way to enumerate keys, so there is no membership tracking:
//! `clear` flushes the entire store. That is the documented behavior of
//! this backend, not a defect to paper over; deployments that need
//! namespace-scoped clearing use the Redis or file backend.
//!
//! The client is synchronous (internally pooled), so every call runs on
//! the blocking thread pool.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;

use dotapp_cache::key;
use dotapp_cache::{
    CacheDriver, CacheError, CacheResult, ExistsOutcome, InstanceAccessor, MemcachedCacheConfig,
    MemoryShadow,
};

use super::unix_now;

/// Expirations above this are sent as absolute unix timestamps; the
/// protocol interprets larger relative values that way on its own, so the
/// driver converts explicitly.
const RELATIVE_TTL_MAX: u64 = 60 * 60 * 24 * 30;

/// Memcached cache driver.
pub struct MemcachedDriver {
    client: Arc<memcache::Client>,
    prefix: String,
    default_lifetime: u64,
    shadow: Arc<MemoryShadow>,
}

impl MemcachedDriver {
    /// Connects to the configured server.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` when the server is unreachable.
    pub async fn connect(
        config: &MemcachedCacheConfig,
        prefix: impl Into<String>,
        default_lifetime: u64,
        shadow: Arc<MemoryShadow>,
    ) -> CacheResult<Self> {
        let url = config.url.clone();
        let client = tokio::task::spawn_blocking(move || memcache::connect(url.as_str()))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))?
            .map_err(|e| CacheError::connection(format!("failed to connect to memcached: {e}")))?;
        tracing::info!(url = %config.url, "connected to memcached");

        Ok(Self {
            client: Arc::new(client),
            prefix: prefix.into(),
            default_lifetime,
            shadow,
        })
    }

    async fn blocking<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(&memcache::Client) -> Result<T, memcache::MemcacheError> + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || op(&client))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))?
            .map_err(|e| CacheError::backend(e.to_string()))
    }

    fn location(
        &self,
        key_name: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> (String, String) {
        let id = key::derive_id(&self.prefix, instance.name(), key_name, context);
        let entry = key::entry_key(instance.folder(), instance.name(), &id);
        (id, entry)
    }

    async fn discard(&self, id: &str, entry: &str) -> CacheResult<()> {
        let entry = entry.to_string();
        self.blocking(move |client| client.delete(&entry)).await?;
        self.shadow.remove(id);
        Ok(())
    }
}

#[async_trait]
impl CacheDriver for MemcachedDriver {
    async fn save(
        &self,
        key: &str,
        data: &Value,
        lifetime: Option<u64>,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<bool, CacheError> {
        let (id, entry) = self.location(key, context, instance);
        let payload =
            serde_json::to_string(data).map_err(|e| CacheError::encoding(e.to_string()))?;
        // an expiration of 0 means "never expire" on the wire; a zero
        // lifetime becomes the shortest one instead
        let ttl = lifetime.unwrap_or(self.default_lifetime).max(1);

        let exp_secs = if ttl > RELATIVE_TTL_MAX {
            unix_now().saturating_add(ttl)
        } else {
            ttl
        };
        let exp = u32::try_from(exp_secs).map_err(|_| {
            CacheError::configuration("lifetime exceeds the memcached expiration range")
        })?;

        let store_key = entry.clone();
        self.blocking(move |client| client.set(&store_key, payload.as_str(), exp))
            .await?;

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
        let (id, entry) = self.location(key, context, instance);

        if let Some(hit) = self.shadow.get(&id) {
            tracing::debug!(key = %entry, "cache hit (shadow)");
            if destroy {
                self.discard(&id, &entry).await?;
            }
            return Ok(Some(hit));
        }

        let store_key = entry.clone();
        let raw: Option<String> = self
            .blocking(move |client| client.get::<String>(&store_key))
            .await?;
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
            self.discard(&id, &entry).await?;
        } else {
            // the protocol exposes no remaining TTL; the default lifetime
            // bounds how long the shadow may trust this entry
            let expires_at = SystemTime::now() + Duration::from_secs(self.default_lifetime);
            self.shadow.put(id, Arc::clone(&payload), Some(expires_at));
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

        let (id, entry) = self.location(key, context, instance);
        if self.shadow.get(&id).is_some() {
            return Ok(ExistsOutcome::Present);
        }

        let store_key = entry;
        let raw: Option<String> = self
            .blocking(move |client| client.get::<String>(&store_key))
            .await?;
        Ok(if raw.is_some() {
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
        let (id, entry) = self.location(key, context, instance);
        self.discard(&id, &entry).await
    }

    /// Flushes the entire store; the protocol cannot scope to a namespace.
    async fn clear(&self, instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        self.blocking(|client| client.flush()).await?;
        self.shadow.clear();
        tracing::debug!(
            instance = instance.name(),
            "memcached cleared (store-wide flush)"
        );
        Ok(())
    }

    /// The store expires keys itself; nothing to sweep.
    async fn gc(&self, _instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memcached"
    }
}
