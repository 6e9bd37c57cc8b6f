//! Configuration surface consumed by the cache facade.
//!
//! The subsystem does not load files itself; the host application
//! deserializes these structs from whatever source it uses and hands them
//! over.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which backend the facade binds for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Self-expiring storage units on the local filesystem.
    #[default]
    File,
    /// Redis with store-native TTL and namespace-scoped clearing.
    Redis,
    /// Memcached with store-native TTL; `clear` flushes the whole store.
    Memcached,
    /// Caching disabled; every read misses.
    Null,
}

/// Settings for the whole cache subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Active backend for the process.
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Prefix mixed into every derived identifier.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Default entry lifetime in seconds.
    #[serde(default = "default_lifetime")]
    pub lifetime: u64,
    /// File backend settings.
    #[serde(default)]
    pub file: FileCacheConfig,
    /// Redis backend settings.
    #[serde(default)]
    pub redis: RedisCacheConfig,
    /// Memcached backend settings.
    #[serde(default)]
    pub memcached: MemcachedCacheConfig,
}

fn default_prefix() -> String {
    "dotapp_".to_string()
}

fn default_lifetime() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            prefix: default_prefix(),
            lifetime: default_lifetime(),
            file: FileCacheConfig::default(),
            redis: RedisCacheConfig::default(),
            memcached: MemcachedCacheConfig::default(),
        }
    }
}

impl CacheSettings {
    /// Validates the settings for the selected backend.
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.is_empty() {
            return Err("cache.prefix must not be empty".into());
        }
        if self.lifetime == 0 {
            return Err("cache.lifetime must be > 0".into());
        }
        match self.backend {
            CacheBackendKind::File => {
                if self.file.dir.as_os_str().is_empty() {
                    return Err("cache.file.dir must not be empty".into());
                }
            }
            CacheBackendKind::Redis => {
                if self.redis.url.is_empty() {
                    return Err("cache.redis.url must not be empty".into());
                }
                if self.redis.pool_size == 0 {
                    return Err("cache.redis.pool_size must be > 0".into());
                }
                if self.redis.timeout_ms == 0 {
                    return Err("cache.redis.timeout_ms must be > 0".into());
                }
            }
            CacheBackendKind::Memcached => {
                if self.memcached.url.is_empty() {
                    return Err("cache.memcached.url must not be empty".into());
                }
            }
            CacheBackendKind::Null => {}
        }
        Ok(())
    }
}

/// File backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCacheConfig {
    /// Root directory for storage units; instance folders nest under it.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

/// Redis backend configuration.
///
/// Password and database selection travel in the URL
/// (`redis://:secret@host:6379/2`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Connection pool size.
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    16
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Memcached backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemcachedCacheConfig {
    /// Connection URL (`memcache://host:11211`).
    #[serde(default = "default_memcached_url")]
    pub url: String,
}

fn default_memcached_url() -> String {
    "memcache://localhost:11211".to_string()
}

impl Default for MemcachedCacheConfig {
    fn default() -> Self {
        Self {
            url: default_memcached_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: CacheSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.backend, CacheBackendKind::File);
        assert_eq!(settings.prefix, "dotapp_");
        assert_eq!(settings.lifetime, 3600);
        assert_eq!(settings.file.dir, PathBuf::from("cache"));
        assert_eq!(settings.redis.url, "redis://localhost:6379");
        assert_eq!(settings.memcached.url, "memcache://localhost:11211");
        settings.validate().unwrap();
    }

    #[test]
    fn test_backend_kind_serde_names() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{"backend": "memcached"}"#).unwrap();
        assert_eq!(settings.backend, CacheBackendKind::Memcached);

        let settings: CacheSettings = serde_json::from_str(r#"{"backend": "null"}"#).unwrap();
        assert_eq!(settings.backend, CacheBackendKind::Null);
    }

    #[test]
    fn test_validation_failures() {
        let mut settings = CacheSettings::default();
        settings.prefix.clear();
        assert!(settings.validate().is_err());

        let mut settings = CacheSettings::default();
        settings.lifetime = 0;
        assert!(settings.validate().is_err());

        let mut settings = CacheSettings {
            backend: CacheBackendKind::Redis,
            ..CacheSettings::default()
        };
        settings.redis.pool_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = CacheSettings {
            backend: CacheBackendKind::Memcached,
            ..CacheSettings::default()
        };
        settings.memcached.url.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_null_backend_needs_nothing() {
        let settings = CacheSettings {
            backend: CacheBackendKind::Null,
            ..CacheSettings::default()
        };
        settings.validate().unwrap();
    }
}
