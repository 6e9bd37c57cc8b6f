//! Concrete cache backends.
//!
//! Every backend satisfies the same [`dotapp_cache::CacheDriver`] contract
//! and shares the process-local memory shadow handed to it at
//! construction.

pub mod file;
pub mod memcached;
pub mod redis;

pub use file::FileDriver;
pub use memcached::MemcachedDriver;
pub use redis::RedisDriver;

/// Seconds since the unix epoch; a pre-epoch clock reads as zero.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
