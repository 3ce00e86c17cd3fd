//! Shared-library handling for plugins.
//!
//! One library may host several plugins. [`LibraryArena`] counts how many
//! live plugins each library backs and drops the handle with the last one.

use super::Plugin;
use crate::error::PluginError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Symbol every plugin library exports.
///
/// Its type is [`PluginFactory`]. Host and plugin must be built with the same
/// compiler since the signature uses the Rust ABI.
pub const FACTORY_SYMBOL: &[u8] = b"cbp_create_plugin\0";

pub type PluginFactory = fn(name: &str) -> Option<Box<dyn Plugin>>;

/// A loaded library that can instantiate plugins by name.
pub trait PluginLibrary {
    fn create_plugin(&self, name: &str) -> Option<Box<dyn Plugin>>;
}

/// Opens plugin libraries.
pub trait LibraryLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn PluginLibrary>, PluginError>;
}

/// [`LibraryLoader`] for real shared objects, through `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

struct Dylib {
    library: libloading::Library,
}

impl PluginLibrary for Dylib {
    fn create_plugin(&self, name: &str) -> Option<Box<dyn Plugin>> {
        // SAFETY: FACTORY_SYMBOL is declared with the PluginFactory type by
        // every plugin library; the symbol lives as long as `self.library`
        // and is not retained past this call.
        let factory = unsafe { self.library.get::<PluginFactory>(FACTORY_SYMBOL) }.ok()?;
        factory(name)
    }
}

impl LibraryLoader for DylibLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn PluginLibrary>, PluginError> {
        // SAFETY: loading runs the library's initializers. Plugin libraries
        // are trusted the same way the host executable is.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| PluginError::Library {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Box::new(Dylib { library }))
    }
}

struct Entry {
    library: Box<dyn PluginLibrary>,
    refs: usize,
}

/// Path-keyed table of open libraries with reference counts.
#[derive(Default)]
pub struct LibraryArena {
    libraries: HashMap<PathBuf, Entry>,
}

impl LibraryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the library at `path`, opening it on first use. Each call
    /// must be balanced by a [`release`](Self::release).
    pub fn acquire(
        &mut self,
        path: &Path,
        loader: &dyn LibraryLoader,
    ) -> Result<&dyn PluginLibrary, PluginError> {
        let entry = match self.libraries.entry(path.to_path_buf()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                log::debug!("opening plugin library {}", path.display());
                let library = loader.open(path)?;
                v.insert(Entry { library, refs: 0 })
            }
        };
        entry.refs += 1;
        Ok(entry.library.as_ref())
    }

    /// Drops one reference. At zero the library is unloaded, unless the
    /// application is shutting down, in which case the handle is leaked and
    /// process teardown unmaps it.
    pub fn release(&mut self, path: &Path, app_shutting_down: bool) {
        let Some(entry) = self.libraries.get_mut(path) else {
            log::warn!("release of unknown library {}", path.display());
            return;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return;
        }
        if let Some(entry) = self.libraries.remove(path) {
            if app_shutting_down {
                std::mem::forget(entry.library);
            } else {
                log::debug!("unloading plugin library {}", path.display());
                drop(entry.library);
            }
        }
    }

    pub fn ref_count(&self, path: &Path) -> usize {
        self.libraries.get(path).map_or(0, |e| e.refs)
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.libraries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Nop;
    impl Plugin for Nop {}

    struct CountingLib(Rc<Cell<usize>>);
    impl PluginLibrary for CountingLib {
        fn create_plugin(&self, _: &str) -> Option<Box<dyn Plugin>> {
            Some(Box::new(Nop))
        }
    }
    impl Drop for CountingLib {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct Loader {
        opened: Cell<usize>,
        dropped: Rc<Cell<usize>>,
    }
    impl LibraryLoader for Loader {
        fn open(&self, _: &Path) -> Result<Box<dyn PluginLibrary>, PluginError> {
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(CountingLib(self.dropped.clone())))
        }
    }

    #[test]
    fn test_refcount_unloads_after_last_release() {
        let loader = Loader {
            opened: Cell::new(0),
            dropped: Rc::new(Cell::new(0)),
        };
        let mut arena = LibraryArena::new();
        let path = Path::new("/plugins/libtools.so");

        assert!(arena.acquire(path, &loader).unwrap().create_plugin("a").is_some());
        arena.acquire(path, &loader).unwrap();
        assert_eq!(loader.opened.get(), 1);
        assert_eq!(arena.ref_count(path), 2);

        arena.release(path, false);
        assert!(arena.is_loaded(path));
        assert_eq!(loader.dropped.get(), 0);

        arena.release(path, false);
        assert!(!arena.is_loaded(path));
        assert_eq!(loader.dropped.get(), 1);
    }

    #[test]
    fn test_shutdown_leaks_handle() {
        let loader = Loader {
            opened: Cell::new(0),
            dropped: Rc::new(Cell::new(0)),
        };
        let mut arena = LibraryArena::new();
        let path = Path::new("/plugins/libtools.so");
        arena.acquire(path, &loader).unwrap();
        arena.release(path, true);
        assert!(arena.is_empty());
        assert_eq!(loader.dropped.get(), 0);
    }

    #[test]
    fn test_dylib_loader_reports_missing_file() {
        let err = DylibLoader
            .open(Path::new("/nonexistent/libnothing.so"))
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Library { .. }));
    }
}
