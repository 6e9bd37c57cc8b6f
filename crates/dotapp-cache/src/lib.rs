//! # dotapp-cache
//!
//! Cache abstraction layer for the DotApp platform.
//!
//! This crate defines the traits and types that all cache backends must
//! implement, plus the pieces every backend shares: deterministic key
//! derivation, the process-local memory shadow, the configuration surface
//! and the always-miss null backend. Concrete backends (file, Redis,
//! Memcached) live in `dotapp-cache-drivers`.
//!
//! ## Overview
//!
//! The main trait is [`CacheDriver`], which defines the six-operation
//! contract:
//! - `save` / `load` / `exists`
//! - `delete` / `clear` / `gc`
//!
//! All backends behave identically at this boundary: entries are addressed
//! by an identifier derived from `(prefix, instance name, key, context)`,
//! entries are never observable past their expiration, and every read-path
//! data failure collapses into a miss.
//!
//! ## Example
//!
//! ```ignore
//! use dotapp_cache::{CacheDriver, CacheInstance, CacheResult};
//! use serde_json::{Value, json};
//!
//! async fn render_cached(
//!     driver: &dyn dotapp_cache::CacheDriver,
//!     instance: &CacheInstance,
//! ) -> CacheResult<Value> {
//!     let ctx = json!({"locale": "en"});
//!     if let Some(hit) = driver.load("home", &ctx, false, instance).await? {
//!         return Ok((*hit).clone());
//!     }
//!     let page = json!({"title": "Home"});
//!     driver.save("home", &page, None, &ctx, instance).await?;
//!     Ok(page)
//! }
//! ```
//!
//! ## Cache Backends
//!
//! To implement a backend, implement the [`CacheDriver`] trait and consult
//! the shared [`MemoryShadow`] before and after every durable operation.

mod config;
mod error;
mod instance;
pub mod key;
mod null;
mod shadow;
mod traits;

pub use config::{
    CacheBackendKind, CacheSettings, FileCacheConfig, MemcachedCacheConfig, RedisCacheConfig,
};
pub use error::{CacheError, ErrorCategory};
pub use instance::CacheInstance;
pub use null::NullDriver;
pub use shadow::{CacheStats, MemoryShadow};
pub use traits::{CacheDriver, DynCacheDriver, ExistsOutcome, InstanceAccessor};

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use dotapp_cache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        CacheBackendKind, CacheSettings, FileCacheConfig, MemcachedCacheConfig, RedisCacheConfig,
    };
    pub use crate::error::{CacheError, ErrorCategory};
    pub use crate::instance::CacheInstance;
    pub use crate::null::NullDriver;
    pub use crate::shadow::{CacheStats, MemoryShadow};
    pub use crate::traits::{CacheDriver, DynCacheDriver, ExistsOutcome, InstanceAccessor};
    pub use crate::{CacheResult, key};
}
