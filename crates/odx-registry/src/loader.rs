use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::RegistryError;
use crate::types::Registry;

struct Cached {
    mtime: SystemTime,
    registry: Arc<Registry>,
}

/// Loads a registry document from a path, caching the parsed-and-validated
/// result by `(path, mtime)` so repeated `load()` calls against an unchanged
/// file are free. `force_reload` bypasses the cache for tests that need to
/// observe a fresh instance.
pub struct RegistryLoader {
    path: PathBuf,
    cache: Mutex<Option<Cached>>,
}

impl RegistryLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Load the registry, reusing the cached instance when the file's mtime
    /// has not changed since the last successful load.
    pub fn load(&self) -> Result<Arc<Registry>, RegistryError> {
        self.load_inner(false)
    }

    /// Load the registry, always re-reading and re-validating the file.
    pub fn load_force_reload(&self) -> Result<Arc<Registry>, RegistryError> {
        self.load_inner(true)
    }

    fn load_inner(&self, force_reload: bool) -> Result<Arc<Registry>, RegistryError> {
        let mtime = file_mtime(&self.path)?;

        if !force_reload {
            let guard = self.cache.lock().expect("registry cache poisoned");
            if let Some(cached) = guard.as_ref() {
                if cached.mtime == mtime {
                    return Ok(Arc::clone(&cached.registry));
                }
            }
        }

        let yaml = std::fs::read_to_string(&self.path)?;
        let registry = Arc::new(Registry::from_yaml_str(&yaml)?);

        let mut guard = self.cache.lock().expect("registry cache poisoned");
        *guard = Some(Cached {
            mtime,
            registry: Arc::clone(&registry),
        });
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn file_mtime(path: &Path) -> Result<SystemTime, RegistryError> {
    Ok(std::fs::metadata(path)?.modified()?)
}
