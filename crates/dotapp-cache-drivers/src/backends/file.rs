//! Self-expiring storage units on the local filesystem.
//!
//! One file per entry under `<dir>/<folder>/`, named
//! `cache_<derivedId>_<sha256Prefix8>.cache`. Each unit is a JSON record
//! carrying its own absolute expiration; the read path checks it and
//! deletes the unit when it has lapsed, so expiry works without a
//! background timer and survives process restarts.
//!
//! Writes go through a temp file in the target directory followed by an
//! atomic rename, with owner-only permissions; a concurrent reader sees a
//! unit either fully or not at all. Deletes are delete-if-exists, so two
//! sweeps racing over the same expired unit both succeed.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use dotapp_cache::key;
use dotapp_cache::{
    CacheDriver, CacheError, CacheResult, ExistsOutcome, FileCacheConfig, InstanceAccessor,
    MemoryShadow,
};

use super::unix_now;

/// One storage unit: absolute expiration plus the encoded payload.
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    expires_at: u64,
    payload: Value,
}

/// Filesystem-backed cache driver.
pub struct FileDriver {
    root: PathBuf,
    prefix: String,
    default_lifetime: u64,
    shadow: Arc<MemoryShadow>,
}

impl FileDriver {
    /// Creates the driver and its root directory.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` when the root directory cannot be created;
    /// that is a deployment problem, not a cache-state condition.
    pub fn new(
        config: &FileCacheConfig,
        prefix: impl Into<String>,
        default_lifetime: u64,
        shadow: Arc<MemoryShadow>,
    ) -> CacheResult<Self> {
        std::fs::create_dir_all(&config.dir)
            .map_err(|e| CacheError::io(config.dir.display().to_string(), e))?;
        Ok(Self {
            root: config.dir.clone(),
            prefix: prefix.into(),
            default_lifetime,
            shadow,
        })
    }

    fn unit_location(
        &self,
        key_name: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> (String, PathBuf) {
        let id = key::derive_id(&self.prefix, instance.name(), key_name, context);
        let stem = key::file_stem(&self.prefix, instance.name(), key_name, context);
        let path = self
            .root
            .join(instance.folder())
            .join(format!("{stem}.{}", key::FILE_UNIT_EXT));
        (id, path)
    }

    /// Shared read path: shadow first, then the durable unit.
    ///
    /// Reading a unit enforces its expiration; every data-level failure
    /// (absent, expired, corrupt, mid-write) collapses into `None`.
    async fn fetch(
        &self,
        key_name: &str,
        context: &Value,
        destroy: bool,
        instance: &dyn InstanceAccessor,
    ) -> CacheResult<Option<Arc<Value>>> {
        let (id, path) = self.unit_location(key_name, context, instance);

        if let Some(hit) = self.shadow.get(&id) {
            tracing::debug!(key = %id, "cache hit (shadow)");
            if destroy {
                self.shadow.remove(&id);
                remove_unit(&path).await?;
            }
            return Ok(Some(hit));
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.shadow.remove(&id);
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache unit");
                return Ok(None);
            }
        };

        let record: FileRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache unit");
                return Ok(None);
            }
        };

        if unix_now() > record.expires_at {
            self.shadow.remove(&id);
            remove_unit(&path).await?;
            tracing::debug!(key = %id, "cache miss (expired)");
            return Ok(None);
        }

        let payload = Arc::new(record.payload);
        if destroy {
            self.shadow.remove(&id);
            remove_unit(&path).await?;
        } else {
            let expires_at = UNIX_EPOCH + Duration::from_secs(record.expires_at);
            self.shadow
                .put(id, Arc::clone(&payload), Some(expires_at));
        }
        Ok(Some(payload))
    }

    async fn sweep_unit(&self, path: &Path) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cache unit");
                return;
            }
        };
        let record: FileRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping corrupt cache unit");
                return;
            }
        };
        if unix_now() > record.expires_at {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove expired cache unit");
                }
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(key::parse_file_stem)
            {
                self.shadow.remove(id);
            }
            tracing::debug!(path = %path.display(), "expired cache unit removed");
        }
    }
}

#[async_trait]
impl CacheDriver for FileDriver {
    async fn save(
        &self,
        key: &str,
        data: &Value,
        lifetime: Option<u64>,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<bool, CacheError> {
        let (id, path) = self.unit_location(key, context, instance);
        let dir = self.root.join(instance.folder());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(dir.display().to_string(), e))?;

        let ttl = lifetime.unwrap_or(self.default_lifetime);
        let expires_at = unix_now().saturating_add(ttl);
        let record = FileRecord {
            expires_at,
            payload: data.clone(),
        };
        let encoded =
            serde_json::to_vec(&record).map_err(|e| CacheError::encoding(e.to_string()))?;

        let write_path = path.clone();
        tokio::task::spawn_blocking(move || write_unit(&dir, &write_path, &encoded))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))??;

        self.shadow.put(
            id,
            Arc::new(data.clone()),
            Some(UNIX_EPOCH + Duration::from_secs(expires_at)),
        );
        tracing::debug!(path = %path.display(), ttl, "cache unit written");
        Ok(true)
    }

    async fn load(
        &self,
        key: &str,
        context: &Value,
        destroy: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<Option<Arc<Value>>, CacheError> {
        self.fetch(key, context, destroy, instance).await
    }

    async fn exists(
        &self,
        key: &str,
        context: &Value,
        load: bool,
        instance: &dyn InstanceAccessor,
    ) -> Result<ExistsOutcome, CacheError> {
        match self.fetch(key, context, false, instance).await? {
            None => Ok(ExistsOutcome::Missing),
            Some(payload) if load => Ok(ExistsOutcome::Loaded(payload)),
            Some(_) => Ok(ExistsOutcome::Present),
        }
    }

    async fn delete(
        &self,
        key: &str,
        context: &Value,
        instance: &dyn InstanceAccessor,
    ) -> Result<(), CacheError> {
        let (id, path) = self.unit_location(key, context, instance);
        remove_unit(&path).await?;
        self.shadow.remove(&id);
        Ok(())
    }

    /// Removes every storage unit in the instance's folder.
    ///
    /// The shadow is reset wholesale, not per instance; entries of other
    /// instances are reloaded from disk on their next access.
    async fn clear(&self, instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        let dir = self.root.join(instance.folder());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.shadow.clear();
                return Ok(());
            }
            Err(e) => return Err(CacheError::io(dir.display().to_string(), e)),
        };

        let mut removed = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_unit(&path) {
                remove_unit(&path).await?;
                removed += 1;
            }
        }
        self.shadow.clear();
        tracing::debug!(folder = instance.folder(), removed, "cache namespace cleared");
        Ok(())
    }

    /// Store-wide sweep: reads every unit, which triggers each one's own
    /// expiration check. Corrupt units are skipped; live units untouched.
    async fn gc(&self, _instance: &dyn InstanceAccessor) -> Result<(), CacheError> {
        let mut folders = match tokio::fs::read_dir(&self.root).await {
            Ok(folders) => folders,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(self.root.display().to_string(), e)),
        };

        while let Ok(Some(folder)) = folders.next_entry().await {
            let is_dir = matches!(folder.file_type().await, Ok(t) if t.is_dir());
            if !is_dir {
                continue;
            }
            let mut units = match tokio::fs::read_dir(folder.path()).await {
                Ok(units) => units,
                Err(_) => continue,
            };
            while let Ok(Some(unit)) = units.next_entry().await {
                let path = unit.path();
                if is_unit(&path) {
                    self.sweep_unit(&path).await;
                }
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

fn is_unit(path: &Path) -> bool {
    let has_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == key::FILE_UNIT_EXT);
    has_ext
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(key::parse_file_stem)
            .is_some()
}

/// Removes a unit; an already-missing unit is not an error.
async fn remove_unit(path: &Path) -> CacheResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path.display().to_string(), e)),
    }
}

/// Writes a unit exclusively: temp file in the target directory, owner-only
/// permissions, then an atomic rename over the final name.
fn write_unit(dir: &Path, path: &Path, encoded: &[u8]) -> CacheResult<()> {
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir.display().to_string(), e))?;
    tmp.write_all(encoded)
        .map_err(|e| CacheError::io(path.display().to_string(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CacheError::io(path.display().to_string(), e))?;
    }
    tmp.persist(path)
        .map_err(|e| CacheError::io(path.display().to_string(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotapp_cache::CacheInstance;
    use serde_json::json;

    fn driver_in(dir: &Path) -> FileDriver {
        let config = FileCacheConfig {
            dir: dir.to_path_buf(),
        };
        FileDriver::new(&config, "dotapp_", 3600, Arc::new(MemoryShadow::new())).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        assert!(
            driver
                .save("k", &json!({"a": 1}), Some(60), &Value::Null, &instance)
                .await
                .unwrap()
        );
        let hit = driver
            .load("k", &Value::Null, false, &instance)
            .await
            .unwrap()
            .expect("entry should be present");
        assert_eq!(*hit, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_durable_across_shadows() {
        // Two drivers over the same directory with separate shadows model
        // two processes sharing the store.
        let dir = tempfile::tempdir().unwrap();
        let writer = driver_in(dir.path());
        let reader = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        writer
            .save("k", &json!("payload"), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        let hit = reader
            .load("k", &Value::Null, false, &instance)
            .await
            .unwrap()
            .expect("durable entry should be readable");
        assert_eq!(*hit, json!("payload"));
    }

    #[tokio::test]
    async fn test_destroy_removes_durable_unit() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        driver
            .save("once", &json!(42), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        let taken = driver
            .load("once", &Value::Null, true, &instance)
            .await
            .unwrap();
        assert_eq!(*taken.unwrap(), json!(42));

        assert!(
            driver
                .load("once", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_none()
        );
        // the unit is gone from disk, not just from the shadow
        let reader = driver_in(dir.path());
        assert!(
            reader
                .load("once", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_corrupt_unit_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        driver
            .save("k", &json!(1), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        let (_, path) = driver.unit_location("k", &Value::Null, &instance);
        std::fs::write(&path, b"not json").unwrap();

        let fresh = driver_in(dir.path());
        assert!(
            fresh
                .load("k", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        driver
            .delete("never-saved", &Value::Null, &instance)
            .await
            .unwrap();

        driver
            .save("k", &json!(1), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        driver.delete("k", &Value::Null, &instance).await.unwrap();
        driver.delete("k", &Value::Null, &instance).await.unwrap();
        assert!(
            driver
                .load("k", &Value::Null, false, &instance)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unit_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver_in(dir.path());
        let instance = CacheInstance::named("views").unwrap();

        driver
            .save("k", &json!(1), Some(60), &Value::Null, &instance)
            .await
            .unwrap();
        let (_, path) = driver.unit_location("k", &Value::Null, &instance);
        assert!(path.exists());
        assert!(is_unit(&path));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
