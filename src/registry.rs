use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// The host process's record of which modules are currently loaded, keyed by
/// import name.
///
/// Injected into the dependency descriptors rather than reached as a process
/// global, so hosts can back it with their real module system and tests can
/// assert on its mutations directly. The crate performs no locking around it;
/// a concurrent host must add its own mutual exclusion.
pub trait ModuleRegistry: Send {
    /// Membership test by name only. Does not verify the module is usable.
    fn is_loaded(&self, name: &str) -> bool;

    /// Locate `name` on the module search path and materialize it into the
    /// registry. Returns false when the module cannot be found.
    fn load(&mut self, name: &str) -> bool;

    /// Remove `name` from the registry. Returns false when it was not loaded.
    fn unload(&mut self, name: &str) -> bool;

    /// Re-execute an already-loaded module in place. Returns false when
    /// `name` is not currently loaded.
    fn reload(&mut self, name: &str) -> bool;

    /// Drop any cached view of the module search path. Called after the
    /// installed set changes.
    fn invalidate_caches(&mut self);
}

/// A module materialized into a [`DirectoryRegistry`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoadedModule {
    pub name: String,
    /// Where the module was found on the search path.
    pub origin: PathBuf,
    /// Bumped every time the module is re-executed.
    pub generation: u64,
}

/// Registry for hosts whose loadable units live under module search roots,
/// such as the `--target` directories packages are installed into.
///
/// Locating a module scans the roots once and caches the result; the cache
/// stays in effect until [`ModuleRegistry::invalidate_caches`], so modules
/// that appear on disk after a scan are not discoverable before invalidation.
#[derive(Debug, Default)]
pub struct DirectoryRegistry {
    search_roots: Vec<PathBuf>,
    modules: HashMap<String, LoadedModule>,
    scan_cache: Option<HashMap<String, PathBuf>>,
}

impl DirectoryRegistry {
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self {
            search_roots,
            modules: HashMap::new(),
            scan_cache: None,
        }
    }

    pub fn add_search_root(&mut self, root: impl Into<PathBuf>) {
        self.search_roots.push(root.into());
        self.scan_cache = None;
    }

    pub fn loaded_module(&self, name: &str) -> Option<&LoadedModule> {
        self.modules.get(name)
    }

    fn locate(&mut self, name: &str) -> Option<PathBuf> {
        if self.scan_cache.is_none() {
            self.scan_cache = Some(scan_roots(&self.search_roots));
        }
        self.scan_cache
            .as_ref()
            .and_then(|cache| cache.get(name))
            .cloned()
    }
}

impl ModuleRegistry for DirectoryRegistry {
    fn is_loaded(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    fn load(&mut self, name: &str) -> bool {
        let origin = match self.locate(name) {
            Some(origin) => origin,
            None => {
                debug!("Module '{}' not found on the search path", name);
                return false;
            }
        };
        self.modules.insert(
            name.to_string(),
            LoadedModule {
                name: name.to_string(),
                origin,
                generation: 0,
            },
        );
        true
    }

    fn unload(&mut self, name: &str) -> bool {
        self.modules.remove(name).is_some()
    }

    fn reload(&mut self, name: &str) -> bool {
        match self.modules.get_mut(name) {
            Some(module) => {
                module.generation += 1;
                true
            }
            None => false,
        }
    }

    fn invalidate_caches(&mut self) {
        self.scan_cache = None;
    }
}

fn scan_roots(roots: &[PathBuf]) -> HashMap<String, PathBuf> {
    let mut found = HashMap::new();
    for root in roots {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            // Unreadable roots are skipped, matching the silent not-found
            // contract of module lookup.
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(name) = module_name(&path) {
                found.entry(name).or_insert(path);
            }
        }
    }
    found
}

fn module_name(path: &Path) -> Option<String> {
    if path.is_dir() {
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    } else {
        path.file_stem().map(|n| n.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locates_modules_under_search_roots() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("widget")).unwrap();
        let mut registry = DirectoryRegistry::new(vec![temp.path().to_path_buf()]);

        assert!(registry.load("widget"));
        assert!(registry.is_loaded("widget"));
        assert_eq!(
            registry.loaded_module("widget").unwrap().origin,
            temp.path().join("widget")
        );
    }

    #[test]
    fn test_file_stem_counts_as_module_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("single.py"), "").unwrap();
        let mut registry = DirectoryRegistry::new(vec![temp.path().to_path_buf()]);

        assert!(registry.load("single"));
        assert!(registry.is_loaded("single"));
    }

    #[test]
    fn test_load_of_unknown_module_returns_false() {
        let temp = TempDir::new().unwrap();
        let mut registry = DirectoryRegistry::new(vec![temp.path().to_path_buf()]);

        assert!(!registry.load("ghost"));
        assert!(!registry.is_loaded("ghost"));
    }

    #[test]
    fn test_reload_bumps_generation() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("widget")).unwrap();
        let mut registry = DirectoryRegistry::new(vec![temp.path().to_path_buf()]);

        registry.load("widget");
        assert_eq!(registry.loaded_module("widget").unwrap().generation, 0);
        assert!(registry.reload("widget"));
        assert_eq!(registry.loaded_module("widget").unwrap().generation, 1);
    }

    #[test]
    fn test_unload_of_absent_module_returns_false() {
        let mut registry = DirectoryRegistry::default();
        assert!(!registry.unload("ghost"));
    }

    #[test]
    fn test_unreadable_root_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("widget")).unwrap();
        let mut registry = DirectoryRegistry::new(vec![
            PathBuf::from("/nonexistent/roots/are/fine"),
            temp.path().to_path_buf(),
        ]);

        assert!(registry.load("widget"));
    }
}
