//! Derivation of object keys from local paths.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use sluice_common::ObjectKey;

/// Strip the first matching prefix from `path`.
///
/// Prefixes are tried in order and compared as plain strings, so `/home/us`
/// matches `/home/user/a`. The first match wins even when a later prefix is
/// longer. Without a match the path is returned unchanged.
pub fn derive_key<S: AsRef<str>>(path: &str, prefixes: &[S]) -> ObjectKey {
    let key = prefixes
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix.as_ref()))
        .unwrap_or(path);
    ObjectKey::new(key)
}

/// Maps local paths to object keys using an ordered prefix list.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefixes: Arc<[String]>,
}

impl KeyDeriver {
    /// Create a deriver for the given ordered prefixes.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// Key for `path`. Non UTF-8 bytes are replaced lossily.
    pub fn derive(&self, path: &Path) -> ObjectKey {
        let path = path.to_string_lossy();
        let key = derive_key(&path, &self.prefixes[..]);
        debug!("Derived key {} for {}", key, path);
        key
    }

    /// The configured prefixes, in match order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
