//! Named cache instances.

use crate::error::CacheError;
use crate::traits::InstanceAccessor;

/// A named logical cache scope.
///
/// Created lazily by the facade on first use and identified by name; the
/// folder scopes bulk operations on backends that support it. Both
/// components double as path and key material, so they are validated at
/// construction: letters, digits, `.`, `_` and `-` only. Rejection is a
/// hard failure, not a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInstance {
    name: String,
    folder: String,
}

impl CacheInstance {
    /// Creates an instance with an explicit folder.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidName` when either component is empty,
    /// contains a character outside `[A-Za-z0-9._-]`, or is a dot-only
    /// path component.
    pub fn new(name: impl Into<String>, folder: impl Into<String>) -> Result<Self, CacheError> {
        let name = name.into();
        let folder = folder.into();
        validate_component(&name)?;
        validate_component(&folder)?;
        Ok(Self { name, folder })
    }

    /// Creates an instance whose folder equals its name.
    pub fn named(name: impl Into<String>) -> Result<Self, CacheError> {
        let name = name.into();
        let folder = name.clone();
        Self::new(name, folder)
    }
}

impl InstanceAccessor for CacheInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn folder(&self) -> &str {
        &self.folder
    }
}

fn validate_component(component: &str) -> Result<(), CacheError> {
    if component.is_empty() {
        return Err(CacheError::invalid_name(component, "must not be empty"));
    }
    if component.chars().all(|c| c == '.') {
        return Err(CacheError::invalid_name(
            component,
            "must not be a dot-only path component",
        ));
    }
    if let Some(bad) = component
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(CacheError::invalid_name(
            component,
            format!("contains forbidden character {bad:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_binds_folder_to_name() {
        let instance = CacheInstance::named("views").unwrap();
        assert_eq!(instance.name(), "views");
        assert_eq!(instance.folder(), "views");
    }

    #[test]
    fn test_explicit_folder() {
        let instance = CacheInstance::new("views", "render-cache").unwrap();
        assert_eq!(instance.folder(), "render-cache");
    }

    #[test]
    fn test_rejects_path_separators() {
        assert!(CacheInstance::named("a/b").is_err());
        assert!(CacheInstance::named("a\\b").is_err());
        assert!(CacheInstance::new("ok", "../escape").is_err());
    }

    #[test]
    fn test_rejects_empty_and_dot_components() {
        assert!(CacheInstance::named("").is_err());
        assert!(CacheInstance::named(".").is_err());
        assert!(CacheInstance::named("..").is_err());
        assert!(CacheInstance::named("v1.2_ok-name").is_ok());
    }
}
