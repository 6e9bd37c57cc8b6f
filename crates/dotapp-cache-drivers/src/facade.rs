//! The cache facade: one active driver per process, instances on demand.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use dotapp_cache::{
    CacheBackendKind, CacheDriver, CacheError, CacheInstance, CacheResult, CacheSettings,
    CacheStats, DynCacheDriver, ExistsOutcome, MemoryShadow, NullDriver,
};

use crate::backends::{FileDriver, MemcachedDriver, RedisDriver};

/// Entry point to the cache subsystem.
///
/// Binds the one active driver for the process (selected by
/// configuration), owns the shared [`MemoryShadow`], and creates named
/// instances lazily on first use.
pub struct Cache {
    settings: CacheSettings,
    driver: DynCacheDriver,
    shadow: Arc<MemoryShadow>,
    instances: DashMap<String, Arc<CacheInstance>>,
}

impl Cache {
    /// Builds the configured driver and wires it to a fresh shadow.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Configuration` for unusable settings and
    /// `CacheError::Connection`/`CacheError::Io` when the selected backend
    /// cannot be reached; a misconfigured deployment fails loudly here
    /// instead of degrading silently.
    pub async fn from_settings(settings: CacheSettings) -> CacheResult<Self> {
        settings.validate().map_err(CacheError::configuration)?;
        let shadow = Arc::new(MemoryShadow::new());

        let driver: DynCacheDriver = match settings.backend {
            CacheBackendKind::File => Arc::new(FileDriver::new(
                &settings.file,
                settings.prefix.clone(),
                settings.lifetime,
                Arc::clone(&shadow),
            )?),
            CacheBackendKind::Redis => Arc::new(
                RedisDriver::connect(
                    &settings.redis,
                    settings.prefix.clone(),
                    settings.lifetime,
                    Arc::clone(&shadow),
                )
                .await?,
            ),
            CacheBackendKind::Memcached => Arc::new(
                MemcachedDriver::connect(
                    &settings.memcached,
                    settings.prefix.clone(),
                    settings.lifetime,
                    Arc::clone(&shadow),
                )
                .await?,
            ),
            CacheBackendKind::Null => Arc::new(NullDriver::new()),
        };
        tracing::info!(backend = driver.backend_name(), "cache driver initialized");

        Ok(Self {
            settings,
            driver,
            shadow,
            instances: DashMap::new(),
        })
    }

    /// Wires an externally constructed driver (tests, embedding).
    #[must_use]
    pub fn with_driver(
        settings: CacheSettings,
        driver: DynCacheDriver,
        shadow: Arc<MemoryShadow>,
    ) -> Self {
        Self {
            settings,
            driver,
            shadow,
            instances: DashMap::new(),
        }
    }

    /// Returns the handle for a named instance whose folder equals its
    /// name, creating it on first use.
    pub fn instance(&self, name: &str) -> CacheResult<CacheHandle> {
        self.instance_in(name, name)
    }

    /// Returns the handle for a named instance with an explicit folder.
    ///
    /// An instance is identified by name; the folder is bound on first use
    /// and later calls reuse it.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidName` for names or folders outside
    /// `[A-Za-z0-9._-]+`.
    pub fn instance_in(&self, name: &str, folder: &str) -> CacheResult<CacheHandle> {
        let instance = if let Some(existing) = self.instances.get(name) {
            Arc::clone(&existing)
        } else {
            let created = Arc::new(CacheInstance::new(name, folder)?);
            self.instances
                .insert(name.to_string(), Arc::clone(&created));
            created
        };
        Ok(CacheHandle {
            instance,
            driver: Arc::clone(&self.driver),
        })
    }

    /// Default lifetime applied when a save passes `None`.
    #[must_use]
    pub fn default_lifetime(&self) -> u64 {
        self.settings.lifetime
    }

    /// Shadow statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.shadow.stats()
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.driver.backend_name()
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.driver.backend_name())
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// Operations of one cache instance, bound to the active driver.
#[derive(Clone)]
pub struct CacheHandle {
    instance: Arc<CacheInstance>,
    driver: DynCacheDriver,
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("backend", &self.driver.backend_name())
            .field("instance", &dotapp_cache::InstanceAccessor::name(self.instance.as_ref()))
            .finish()
    }
}

impl CacheHandle {
    /// Persists `data` under `key`; `None` lifetime means the configured
    /// default.
    pub async fn save(
        &self,
        key: &str,
        data: &Value,
        lifetime: Option<u64>,
        context: &Value,
    ) -> CacheResult<bool> {
        self.driver
            .save(key, data, lifetime, context, self.instance.as_ref())
            .await
    }

    /// Returns the live payload for `key`, or `None` on a miss. With
    /// `destroy` the entry is removed after being read.
    pub async fn load(
        &self,
        key: &str,
        context: &Value,
        destroy: bool,
    ) -> CacheResult<Option<Arc<Value>>> {
        self.driver
            .load(key, context, destroy, self.instance.as_ref())
            .await
    }

    /// Probes for a live entry; with `load` the payload comes back too.
    pub async fn exists(
        &self,
        key: &str,
        context: &Value,
        load: bool,
    ) -> CacheResult<ExistsOutcome> {
        self.driver
            .exists(key, context, load, self.instance.as_ref())
            .await
    }

    /// Removes the entry for `key`; removing an absent entry is fine.
    pub async fn delete(&self, key: &str, context: &Value) -> CacheResult<()> {
        self.driver
            .delete(key, context, self.instance.as_ref())
            .await
    }

    /// Clears this instance's namespace (backend-specific scoping).
    pub async fn clear(&self) -> CacheResult<()> {
        self.driver.clear(self.instance.as_ref()).await
    }

    /// Sweeps expired entries out of the durable store.
    pub async fn gc(&self) -> CacheResult<()> {
        self.driver.gc(self.instance.as_ref()).await
    }

    /// Name of the instance.
    #[must_use]
    pub fn name(&self) -> &str {
        dotapp_cache::InstanceAccessor::name(self.instance.as_ref())
    }

    /// Folder of the instance.
    #[must_use]
    pub fn folder(&self) -> &str {
        dotapp_cache::InstanceAccessor::folder(self.instance.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn null_settings() -> CacheSettings {
        CacheSettings {
            backend: CacheBackendKind::Null,
            ..CacheSettings::default()
        }
    }

    #[tokio::test]
    async fn test_null_backend_via_facade() {
        let cache = Cache::from_settings(null_settings()).await.unwrap();
        assert_eq!(cache.backend_name(), "null");

        let views = cache.instance("views").unwrap();
        assert!(views.save("k", &json!(1), None, &Value::Null).await.unwrap());
        assert!(views.load("k", &Value::Null, false).await.unwrap().is_none());
        assert!(
            !views
                .exists("k", &Value::Null, false)
                .await
                .unwrap()
                .is_hit()
        );
    }

    #[tokio::test]
    async fn test_instances_are_memoized_by_name() {
        let cache = Cache::from_settings(null_settings()).await.unwrap();
        let a = cache.instance_in("views", "render").unwrap();
        let b = cache.instance("views").unwrap();
        // folder was bound on first use
        assert_eq!(a.folder(), "render");
        assert_eq!(b.folder(), "render");
    }

    #[tokio::test]
    async fn test_invalid_instance_name_fails_fast() {
        let cache = Cache::from_settings(null_settings()).await.unwrap();
        let err = cache.instance("../etc").unwrap_err();
        assert!(err.is_invalid_name());
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_loudly() {
        let mut settings = null_settings();
        settings.prefix.clear();
        let err = Cache::from_settings(settings).await.unwrap_err();
        assert_eq!(
            err.category(),
            dotapp_cache::ErrorCategory::Configuration
        );
    }

    #[tokio::test]
    async fn test_with_driver_injection() {
        let shadow = Arc::new(MemoryShadow::new());
        let cache = Cache::with_driver(
            null_settings(),
            Arc::new(NullDriver::new()),
            Arc::clone(&shadow),
        );
        assert_eq!(cache.backend_name(), "null");
        assert_eq!(cache.stats().size, 0);
    }
}
