//! Driver traits for the cache abstraction layer.
//!
//! This module defines the contract every cache backend must satisfy.
//! Implementations must be thread-safe (`Send + Sync`) and must behave
//! identically from the caller's point of view: a miss is a miss whether
//! the entry never existed, expired, or could not be decoded.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheError;

/// Exposes the identity of the calling cache instance to a driver.
///
/// Drivers never hold instances themselves; the facade passes the accessor
/// with every call so a single driver serves every namespace.
pub trait InstanceAccessor: Send + Sync {
    /// Logical name of the instance.
    fn name(&self) -> &str;

    /// Namespace/folder the instance stores under.
    fn folder(&self) -> &str;
}

/// Result of an existence probe.
///
/// `exists` can be asked to return the payload along with the probe, so
/// the answer has three shapes, each an explicit variant.
#[derive(Debug, Clone)]
pub enum ExistsOutcome {
    /// No live entry.
    Missing,
    /// A live entry exists; payload not requested.
    Present,
    /// A live entry exists and its payload was loaded.
    Loaded(Arc<Value>),
}

impl ExistsOutcome {
    /// Returns `true` for `Present` and `Loaded`.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// Returns the payload if it was loaded.
    #[must_use]
    pub fn into_value(self) -> Option<Arc<Value>> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// The contract every cache backend implements.
///
/// All six operations take the calling instance as an accessor; lifetimes
/// are in seconds with `None` meaning the configured default.
///
/// # Example
///
/// ```ignore
/// use dotapp_cache::{CacheDriver, CacheResult};
///
/// async fn warm(driver: &dyn CacheDriver, instance: &dyn InstanceAccessor) -> CacheResult<()> {
///     driver
///         .save("home", &serde_json::json!({"title": "Home"}), None, &Value::Null, instance)
///         .await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// Persists `data` under `key`, replacing any previous entry with the
    /// same derived identifier.
    ///
    /// Returns `Ok(true)` when the entry was accepted (the null backend
    /// accepts without persisting).
    ///
    /// # Errors
    ///
    /// Returns an error only for environment failures (connection lost,
    /// filesystem denied), never for cache-state conditions.
    async fn save(
        &self,
        key: &str,
        data: &Value,
        lifetime: Option<u64>,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<bool, CacheError>;

    /// Returns the live payload for `key`, or `None` on any kind of miss.
    ///
    /// With `destroy` set, the entry is removed from the shadow and the
    /// durable store after being read (load-once semantics).
    async fn load(
        &self,
        key: &str,
        context: &Value,
        destroy: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<Option<Arc<Value>>, CacheError>;

    /// Probes for a live entry; with `load` set the payload is returned
    /// alongside the probe.
    ///
    /// The probe itself performs lazy expiration on backends without
    /// native TTL.
    async fn exists(
        &self,
        key: &str,
        context: &Value,
        load: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<ExistsOutcome, CacheError>;

    /// Removes the entry for `key`. Removing an absent entry is not an
    /// error.
    async fn delete(
        &self,
        key: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<(), CacheError>;

    /// Removes every entry belonging to the calling instance's namespace.
    ///
    /// Scoping is backend-specific: the memcached backend can only flush
    /// the entire store and documents that.
    async fn clear(&self, instance: &dyn InstanceAccessor) -> Result<(), CacheError>;

    /// Sweeps expired entries out of the durable store.
    ///
    /// A no-op on backends whose store enforces TTL natively. Idempotent;
    /// concurrent sweeps must not fail each other.
    async fn gc(&self, instance: &dyn InstanceAccessor) -> Result<(), CacheError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared driver trait object.
pub type DynCacheDriver = Arc<dyn CacheDriver>;
