//! # dotapp-cache-drivers
//!
//! Concrete cache backends for the DotApp platform, plus the [`Cache`]
//! facade that binds one of them per process.
//!
//! ## Backends
//!
//! | Backend | Durable TTL | `clear` scope |
//! |-----------|----------------------|---------------------|
//! | file | embedded per unit | instance folder |
//! | redis | store-native | instance namespace |
//! | memcached | store-native | entire store |
//! | null | nothing persisted | no-op |
//!
//! All four expose identical behavior through the
//! [`dotapp_cache::CacheDriver`] contract; callers cannot tell them apart
//! except where documented above.
//!
//! ## Example
//!
//! ```ignore
//! use dotapp_cache::CacheSettings;
//! use dotapp_cache_drivers::Cache;
//! use serde_json::{Value, json};
//!
//! # async fn run() -> dotapp_cache::CacheResult<()> {
//! let cache = Cache::from_settings(CacheSettings::default()).await?;
//! let views = cache.instance("views")?;
//!
//! views.save("home", &json!({"title": "Home"}), None, &Value::Null).await?;
//! if let Some(page) = views.load("home", &Value::Null, false).await? {
//!     println!("{page}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
mod facade;

pub use backends::{FileDriver, MemcachedDriver, RedisDriver};
pub use facade::{Cache, CacheHandle};
