//! Always-miss driver used to disable caching without touching call sites.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheError;
use crate::traits::{CacheDriver, ExistsOutcome, InstanceAccessor};

/// No-op backend: saves succeed without persisting, reads always miss.
///
/// The shadow is deliberately left untouched so nothing saved through this
/// driver ever becomes observable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDriver;

impl NullDriver {
    /// Creates the no-op driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheDriver for NullDriver {
    async fn save(
        &self,
        _key: &str,
        _data: &Value,
        _lifetime: Option<u64>,
        _context: &Value,
        _instance: &dyn InstanceAccessor,
    ) -> Result<bool, CacheError> {
        Ok(true)
    }

    async fn load(
        &self,
        _key: &str,
        _context: &Value,
        _destroy: bool,
        _instance: &dyn InstanceAccessor,
    ) -> Result<Option<Arc<Value>>, CacheError> {
        Ok(None)
    }

    async fn exists(
        &self,
        _key: &str,
        _context: &Value,
        _load: bool,
        _instance: &dyn InstanceAccessor,
    ) -> Result<ExistsOutcome, CacheError> {
        Ok(ExistsOutcome::Missing)
    }

    async fn delete(
        &self,
        _key: &str,
        _context: &Value,
        _instance: &dyn InstanceAccessor,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear(&self, _instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        Ok(())
    }

    async fn gc(&self, _instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::CacheInstance;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_succeeds_but_nothing_is_observable() {
        let driver = NullDriver::new();
        let instance = CacheInstance::named("views").unwrap();

        let saved = driver
            .save("home", &json!({"a": 1}), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        assert!(saved);

        assert!(
            driver
                .load("home", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !driver
                .exists("home", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_hit()
        );
    }

    #[tokio::test]
    async fn test_maintenance_ops_are_noops() {
        let driver = NullDriver::new();
        let instance = CacheInstance::named("views").unwrap();

        driver
            .delete("home", &Value::Null, &instance)
            .await
            .unwrap();
        driver.clear(&instance).await.unwrap();
        driver.gc(&instance).await.unwrap();
    }
}
