use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Floor applied to every entry's `min_count` when pools are pre-warmed.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Registry-wide pool settings.
///
/// Read from the `[registry]` table of a catalog file; missing keys keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Minimum number of instances pre-warmed per kind, whatever the entry's
    /// own `min_count` says.
    pub default_pool_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    registry: RegistryConfig,
}

impl RegistryConfig {
    /// Number of instances to pre-warm for an entry asking for `min_count`.
    pub fn prewarm_count(&self, min_count: usize) -> usize {
        min_count.max(self.default_pool_size)
    }

    /// Parses the `[registry]` table of a TOML catalog. Other tables are
    /// ignored.
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.registry)
    }

    /// Reads the `[registry]` table of a TOML catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
