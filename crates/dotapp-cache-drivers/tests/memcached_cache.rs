//! Memcached backend integration tests.
//!
//! These talk to a real server and are ignored by default:
//!
//! ```text
//! docker run --rm -p 11211:11211 memcached:1
//! cargo test -p dotapp-cache-drivers --test memcached_cache -- --ignored
//! ```

use serde_json::{Value, json};

use dotapp_cache::{CacheBackendKind, CacheSettings};
use dotapp_cache_drivers::Cache;

fn memcached_settings() -> CacheSettings {
    CacheSettings {
        backend: CacheBackendKind::Memcached,
        ..CacheSettings::default()
    }
}

fn scoped(name: &str) -> String {
    format!("it-{name}-{}", std::process::id())
}

#[tokio::test]
#[ignore = "requires a running memcached"]
async fn round_trip_and_delete() {
    let cache = Cache::from_settings(memcached_settings()).await.unwrap();
    let views = cache.instance(&scoped("views")).unwrap();

    views
        .save("k", &json!({"a": 1}), Some(60), &Value::Null)
        .await
        .unwrap();
    assert_eq!(
        *views.load("k", &Value::Null, false).await.unwrap().unwrap(),
        json!({"a": 1})
    );

    views.delete("k", &Value::Null).await.unwrap();
    views.delete("k", &Value::Null).await.unwrap();
    assert!(views.load("k", &Value::Null, false).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running memcached"]
async fn store_enforces_expiration() {
    let cache = Cache::from_settings(memcached_settings()).await.unwrap();
    let views = cache.instance(&scoped("ttl")).unwrap();

    views.save("k", &json!(1), Some(1), &Value::Null).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    assert!(views.load("k", &Value::Null, false).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running memcached"]
async fn clear_flushes_the_entire_store() {
    // The protocol cannot enumerate keys, so clearing one instance flushes
    // everything. This asserts the documented behavior.
    let cache = Cache::from_settings(memcached_settings()).await.unwrap();
    let x = cache.instance(&scoped("x")).unwrap();
    let y = cache.instance(&scoped("y")).unwrap();

    x.save("k", &json!("x-data"), Some(60), &Value::Null)
        .await
        .unwrap();
    y.save("k", &json!("y-data"), Some(60), &Value::Null)
        .await
        .unwrap();

    x.clear().await.unwrap();

    assert!(x.load("k", &Value::Null, false).await.unwrap().is_none());
    assert!(
        y.load("k", &Value::Null, false).await.unwrap().is_none(),
        "memcached clear is store-wide by design"
    );
}

#[tokio::test]
#[ignore = "requires a running memcached"]
async fn destroy_removes_the_store_key() {
    let cache = Cache::from_settings(memcached_settings()).await.unwrap();
    let views = cache.instance(&scoped("once")).unwrap();

    views.save("k", &json!(42), Some(60), &Value::Null).await.unwrap();
    assert_eq!(
        *views.load("k", &Value::Null, true).await.unwrap().unwrap(),
        json!(42)
    );
    assert!(views.load("k", &Value::Null, false).await.unwrap().is_none());
}
