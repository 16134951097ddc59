//! Store path resolution.
//!
//! A store location is configured with a single data path. The platform
//! keeps store caches in a sibling tree whose layout mirrors the data tree,
//! with the `files` folder component substituted by `cache`:
//!
//! ```text
//! /data/app/files/store   # data path (as configured)
//! /data/app/cache/store   # cache path (derived)
//! ```
//!
//! The substitution token is fixed; a configured path that does not contain
//! it cannot be resolved and is rejected up front.

use crate::error::{StoreError, StoreResult};
use std::path::PathBuf;

/// Folder name expected inside every configured data path.
pub const DATA_FOLDER_NAME: &str = "files";
/// Folder name substituted in to derive the cache path.
pub const CACHE_FOLDER_NAME: &str = "cache";

/// Resolved store locations: the configured data path and the derived
/// cache path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Directory holding store data.
    pub data: PathBuf,
    /// Directory holding temporary/cache files.
    pub cache: PathBuf,
}

impl StorePaths {
    /// Derives the pair of store locations from a configured data path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the path is empty or
    /// does not contain the [`DATA_FOLDER_NAME`] component.
    pub fn derive(path: &str) -> StoreResult<Self> {
        if path.is_empty() {
            return Err(StoreError::invalid_configuration("store path is empty"));
        }

        let Some(at) = path.find(DATA_FOLDER_NAME) else {
            return Err(StoreError::invalid_configuration(format!(
                "store path {path:?} does not contain the {DATA_FOLDER_NAME:?} folder"
            )));
        };

        let mut cache = String::with_capacity(path.len());
        cache.push_str(&path[..at]);
        cache.push_str(CACHE_FOLDER_NAME);
        cache.push_str(&path[at + DATA_FOLDER_NAME.len()..]);

        Ok(Self {
            data: PathBuf::from(path),
            cache: PathBuf::from(cache),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_cache_path() {
        let paths = StorePaths::derive("/data/app/files/store").unwrap();
        assert_eq!(paths.data, PathBuf::from("/data/app/files/store"));
        assert_eq!(paths.cache, PathBuf::from("/data/app/cache/store"));
    }

    #[test]
    fn empty_path_rejected() {
        let err = StorePaths::derive("").unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn missing_token_rejected() {
        let err = StorePaths::derive("/data/app/documents/store").unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn first_occurrence_substituted() {
        let paths = StorePaths::derive("/srv/files/files/db").unwrap();
        assert_eq!(paths.cache, PathBuf::from("/srv/cache/files/db"));
    }
}
