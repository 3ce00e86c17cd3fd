//! Plugin discovery, loading and lifetime.
//!
//! ## Layout on disk
//!
//! A plugin library `libastyle.so` (or `astyle.dll`) is paired with a
//! resource archive `astyle.zip` holding its `manifest.xml`. The archive is
//! looked up in the resource directory when one is configured, otherwise
//! next to the library.
//!
//! ## Crash tracking
//!
//! Before a plugin is attached its name is written to
//! `/plugins/try_to_activate` and the key is cleared once attach returns.
//! If the process dies in between, the next [`PluginManager`] sees the name
//! through [`PluginManager::crashed_plugin`].

mod library;
pub mod manifest;

pub use library::{
    DylibLoader, FACTORY_SYMBOL, LibraryArena, LibraryLoader, PluginFactory, PluginLibrary,
};
pub use manifest::{
    Manifest, PLUGIN_SDK_VERSION, PluginInfo, read_manifest, read_manifest_from_archive,
};

use crate::config::ConfigStore;
use crate::error::PluginError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

pub const TRY_TO_ACTIVATE_KEY: &str = "/plugins/try_to_activate";

/// A plugin instance created by its library.
pub trait Plugin {
    fn on_attach(&mut self) {}
    fn on_release(&mut self, app_shutting_down: bool) {
        let _ = app_shutting_down;
    }
}

/// A loaded plugin together with where it came from.
pub struct PluginElement {
    pub info: PluginInfo,
    pub library_path: PathBuf,
    /// File name of the library, e.g. `libastyle.so`.
    pub file_name: String,
    pub resource_archive: PathBuf,
    plugin: Box<dyn Plugin>,
    attached: bool,
}

impl PluginElement {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn plugin_mut(&mut self) -> &mut dyn Plugin {
        self.plugin.as_mut()
    }
}

impl std::fmt::Debug for PluginElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginElement")
            .field("info", &self.info)
            .field("library_path", &self.library_path)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// `libastyle.so` -> `astyle`.
fn plugin_stem(library: &Path) -> String {
    let stem = library
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match stem.strip_prefix("lib") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}

pub struct PluginManager {
    // Declared before `arena`: plugins must drop before their libraries.
    elements: Vec<PluginElement>,
    arena: LibraryArena,
    loader: Box<dyn LibraryLoader>,
    config: ConfigStore,
    settings_path: Option<PathBuf>,
    resource_dir: Option<PathBuf>,
    safe_mode: bool,
    crashed: Option<String>,
}

impl PluginManager {
    /// Creates a manager and picks up a crash marker left by a previous run.
    pub fn new(loader: Box<dyn LibraryLoader>, config: ConfigStore) -> Self {
        let crashed = config
            .read_string(TRY_TO_ACTIVATE_KEY)
            .filter(|name| !name.is_empty());
        if let Some(name) = &crashed {
            log::warn!("plugin '{}' crashed during the last attach", name);
        }
        Self {
            elements: Vec::new(),
            arena: LibraryArena::new(),
            loader,
            config,
            settings_path: None,
            resource_dir: None,
            safe_mode: false,
            crashed,
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    /// Saves the config store to `path` whenever the crash marker changes,
    /// so a plugin that takes the whole process down is still recorded.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    fn persist(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.config.save(path) {
            log::warn!("failed to save plugin state to {}: {}", path.display(), e);
        }
    }

    /// In safe mode no plugin is loaded.
    pub fn set_safe_mode(&mut self, safe: bool) {
        self.safe_mode = safe;
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    /// Plugin whose attach did not return during the previous run.
    pub fn crashed_plugin(&self) -> Option<&str> {
        self.crashed.as_deref()
    }

    pub fn clear_crash_marker(&mut self) {
        self.crashed = None;
        self.config.delete(TRY_TO_ACTIVATE_KEY);
        self.persist();
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn elements(&self) -> &[PluginElement] {
        &self.elements
    }

    pub fn find_element(&self, name: &str) -> Option<&PluginElement> {
        self.elements.iter().find(|e| e.info.name == name)
    }

    pub fn find_element_mut(&mut self, name: &str) -> Option<&mut PluginElement> {
        self.elements.iter_mut().find(|e| e.info.name == name)
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.config
            .read_bool(&format!("/plugins/{name}"))
            .unwrap_or(true)
    }

    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) {
        self.config.write(&format!("/plugins/{name}"), enabled);
    }

    pub fn resource_archive_for(&self, library: &Path) -> PathBuf {
        let dir = match &self.resource_dir {
            Some(dir) => dir.clone(),
            None => library.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        dir.join(format!("{}.zip", plugin_stem(library)))
    }

    /// Loads every plugin library in `dir`. Libraries that fail to load are
    /// logged and skipped. Returns the number of plugins loaded.
    pub fn scan_for_plugins(&mut self, dir: &Path) -> usize {
        if self.safe_mode {
            log::info!("safe mode: not scanning {}", dir.display());
            return 0;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot scan {} for plugins: {}", dir.display(), e);
                return 0;
            }
        };
        let mut libraries: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
            })
            .collect();
        libraries.sort();

        let mut loaded = 0;
        for library in libraries {
            match self.load_plugin(&library) {
                Ok(count) => loaded += count,
                Err(e) => log::warn!("{}: {}", library.display(), e),
            }
        }
        log::info!("loaded {} plugin(s) from {}", loaded, dir.display());
        loaded
    }

    /// Reads the library's manifest, checks its SDK version and creates every
    /// plugin it lists. Returns how many were created.
    pub fn load_plugin(&mut self, library: &Path) -> Result<usize, PluginError> {
        if self.safe_mode {
            return Ok(0);
        }
        let archive = self.resource_archive_for(library);
        let manifest = read_manifest_from_archive(&archive)?;
        let first = manifest
            .plugins
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        manifest.check_sdk(&first)?;

        let file_name = library
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut created = 0;
        for info in &manifest.plugins {
            if self.find_element(&info.name).is_some() {
                log::warn!("plugin '{}' is already loaded, skipping", info.name);
                continue;
            }
            let lib = self.arena.acquire(library, self.loader.as_ref())?;
            let Some(plugin) = lib.create_plugin(&info.name) else {
                log::warn!("{} does not provide plugin '{}'", file_name, info.name);
                self.arena.release(library, false);
                continue;
            };
            log::debug!("created plugin '{}' from {}", info.name, file_name);
            self.elements.push(PluginElement {
                info: info.clone(),
                library_path: library.to_path_buf(),
                file_name: file_name.clone(),
                resource_archive: archive.clone(),
                plugin,
                attached: false,
            });
            created += 1;
        }

        if created == 0 && self.elements.iter().all(|e| e.library_path != library) {
            return Err(PluginError::MissingFactory {
                path: library.to_path_buf(),
                name: first,
            });
        }
        Ok(created)
    }

    /// Attaches a loaded plugin. A panic inside the plugin is caught,
    /// logged and reported as [`PluginError::Attach`]; the crash marker then
    /// stays set.
    pub fn attach_plugin(&mut self, name: &str) -> Result<(), PluginError> {
        let Some(index) = self.elements.iter().position(|e| e.info.name == name) else {
            return Err(PluginError::NotLoaded(name.to_string()));
        };
        if self.elements[index].attached {
            return Ok(());
        }

        self.config.write(TRY_TO_ACTIVATE_KEY, name);
        self.persist();
        let element = &mut self.elements[index];
        let result = panic::catch_unwind(AssertUnwindSafe(|| element.plugin.on_attach()));
        match result {
            Ok(()) => {
                element.attached = true;
                self.config.write(TRY_TO_ACTIVATE_KEY, "");
                self.persist();
                log::debug!("attached plugin '{}'", name);
                Ok(())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("plugin '{}' panicked while attaching: {}", name, message);
                Err(PluginError::Attach {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Attaches every loaded plugin that is enabled. Returns how many
    /// attached.
    pub fn attach_enabled_plugins(&mut self) -> usize {
        let names: Vec<String> = self
            .elements
            .iter()
            .filter(|e| !e.attached)
            .map(|e| e.info.name.clone())
            .collect();
        let mut attached = 0;
        for name in names {
            if !self.is_plugin_enabled(&name) {
                log::debug!("plugin '{}' is disabled", name);
                continue;
            }
            if self.attach_plugin(&name).is_ok() {
                attached += 1;
            }
        }
        attached
    }

    fn release(&mut self, mut element: PluginElement, app_shutting_down: bool) {
        if element.attached {
            let plugin = &mut element.plugin;
            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| plugin.on_release(app_shutting_down)))
            {
                log::error!(
                    "plugin '{}' panicked while releasing: {}",
                    element.info.name,
                    panic_message(payload.as_ref())
                );
            }
        }
        let PluginElement {
            plugin,
            library_path,
            ..
        } = element;
        drop(plugin);
        self.arena.release(&library_path, app_shutting_down);
    }

    /// Releases one plugin; its library is unloaded with its last plugin.
    pub fn unload_plugin(&mut self, name: &str) -> Result<(), PluginError> {
        let Some(index) = self.elements.iter().position(|e| e.info.name == name) else {
            return Err(PluginError::NotLoaded(name.to_string()));
        };
        let element = self.elements.remove(index);
        self.release(element, false);
        Ok(())
    }

    /// Releases every plugin, most recently loaded first.
    pub fn unload_all_plugins(&mut self, app_shutting_down: bool) {
        while let Some(element) = self.elements.pop() {
            self.release(element, app_shutting_down);
        }
    }

    /// Extracts the extra resource files a plugin's manifest lists.
    pub fn extract_extra_files(&self, name: &str, dest: &Path) -> Result<Vec<PathBuf>, PluginError> {
        let element = self
            .find_element(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        let manifest = read_manifest_from_archive(&element.resource_archive)?;
        manifest::extract_extra_files(&element.resource_archive, &manifest, dest)
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.unload_all_plugins(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        log: Log,
    }

    impl Plugin for Recorder {
        fn on_attach(&mut self) {
            if self.name == "Crashy" {
                panic!("boom");
            }
            self.log.borrow_mut().push(format!("attach {}", self.name));
        }
        fn on_release(&mut self, _: bool) {
            self.log.borrow_mut().push(format!("release {}", self.name));
        }
    }

    struct FakeLibrary(Log);

    impl PluginLibrary for FakeLibrary {
        fn create_plugin(&self, name: &str) -> Option<Box<dyn Plugin>> {
            (name != "Missing").then(|| {
                Box::new(Recorder {
                    name: name.to_string(),
                    log: self.0.clone(),
                }) as Box<dyn Plugin>
            })
        }
    }

    impl Drop for FakeLibrary {
        fn drop(&mut self) {
            self.0.borrow_mut().push("unload".into());
        }
    }

    struct FakeLoader(Log);

    impl LibraryLoader for FakeLoader {
        fn open(&self, _: &Path) -> Result<Box<dyn PluginLibrary>, PluginError> {
            Ok(Box::new(FakeLibrary(self.0.clone())))
        }
    }

    fn manifest(sdk: &str, plugins: &[&str]) -> String {
        let entries: String = plugins
            .iter()
            .map(|p| format!(r#"<Plugin name="{p}"><Value title="{p} plugin" /></Plugin>"#))
            .collect();
        format!(
            r#"<CodeBlocks_plugin_manifest_file>{sdk}{entries}<Extra file="icons/{first}.png" /></CodeBlocks_plugin_manifest_file>"#,
            first = plugins[0]
        )
    }

    fn current_sdk() -> String {
        format!(
            r#"<SdkVersion major="{}" minor="{}" release="{}" />"#,
            PLUGIN_SDK_VERSION.major, PLUGIN_SDK_VERSION.minor, PLUGIN_SDK_VERSION.patch
        )
    }

    fn install(dir: &Path, stem: &str, manifest_xml: &str) -> PathBuf {
        let library = dir.join(format!("lib{stem}.{}", std::env::consts::DLL_EXTENSION));
        std::fs::write(&library, b"").unwrap();

        let file = std::fs::File::create(dir.join(format!("{stem}.zip"))).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default;
        zip.start_file("manifest.xml", options()).unwrap();
        zip.write_all(manifest_xml.as_bytes()).unwrap();
        zip.start_file(format!("icons/{stem}.png"), options()).unwrap();
        zip.write_all(b"png").unwrap();
        zip.finish().unwrap();
        library
    }

    fn manager(log: &Log) -> PluginManager {
        PluginManager::new(Box::new(FakeLoader(log.clone())), ConfigStore::new())
    }

    #[test]
    fn test_scan_attach_and_shared_library_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "tools", &manifest(&current_sdk(), &["Astyle", "Todo"]));
        let log = Log::default();
        let mut pm = manager(&log);

        assert_eq!(pm.scan_for_plugins(dir.path()), 2);
        assert_eq!(pm.attach_enabled_plugins(), 2);
        assert!(pm.find_element("Todo").unwrap().is_attached());
        assert_eq!(pm.config().read_string(TRY_TO_ACTIVATE_KEY).as_deref(), Some(""));

        pm.unload_plugin("Astyle").unwrap();
        assert!(!log.borrow().contains(&"unload".to_string()));
        pm.unload_plugin("Todo").unwrap();
        assert_eq!(log.borrow().last().map(String::as_str), Some("unload"));
        assert!(matches!(pm.unload_plugin("Todo"), Err(PluginError::NotLoaded(_))));
    }

    #[test]
    fn test_sdk_mismatch_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let old = r#"<SdkVersion major="1" minor="0" release="0" />"#;
        let lib = install(dir.path(), "old", &manifest(old, &["Old"]));
        let log = Log::default();
        let mut pm = manager(&log);
        assert!(matches!(pm.load_plugin(&lib), Err(PluginError::SdkMismatch { .. })));
        assert!(pm.elements().is_empty());
    }

    #[test]
    fn test_panicking_attach_leaves_crash_marker() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "crashy", &manifest(&current_sdk(), &["Crashy"]));
        let log = Log::default();
        let mut pm = manager(&log);
        pm.scan_for_plugins(dir.path());

        let err = pm.attach_plugin("Crashy").unwrap_err();
        assert!(matches!(err, PluginError::Attach { ref message, .. } if message == "boom"));
        assert!(!pm.find_element("Crashy").unwrap().is_attached());

        let config = pm.config().clone();
        let next = PluginManager::new(Box::new(FakeLoader(log.clone())), config);
        assert_eq!(next.crashed_plugin(), Some("Crashy"));
    }

    #[test]
    fn test_crash_marker_reaches_disk_before_attach_returns() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "crashy", &manifest(&current_sdk(), &["Crashy"]));
        install(dir.path(), "tools", &manifest(&current_sdk(), &["Todo"]));
        let settings = dir.path().join("settings.toml");
        let log = Log::default();
        let mut pm = manager(&log).with_settings_path(&settings);
        pm.scan_for_plugins(dir.path());

        pm.attach_plugin("Todo").unwrap();
        let on_disk = ConfigStore::load(&settings).unwrap();
        assert_eq!(on_disk.read_string(TRY_TO_ACTIVATE_KEY).as_deref(), Some(""));

        assert!(pm.attach_plugin("Crashy").is_err());
        let on_disk = ConfigStore::load(&settings).unwrap();
        let next = PluginManager::new(Box::new(FakeLoader(log.clone())), on_disk);
        assert_eq!(next.crashed_plugin(), Some("Crashy"));

        let mut next = next.with_settings_path(&settings);
        next.clear_crash_marker();
        let on_disk = ConfigStore::load(&settings).unwrap();
        assert!(!on_disk.exists(TRY_TO_ACTIVATE_KEY));
    }

    #[test]
    fn test_disabled_and_safe_mode() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "tools", &manifest(&current_sdk(), &["Astyle", "Todo"]));
        let log = Log::default();

        let mut safe = manager(&log);
        safe.set_safe_mode(true);
        assert_eq!(safe.scan_for_plugins(dir.path()), 0);

        let mut pm = manager(&log);
        pm.set_plugin_enabled("Todo", false);
        pm.scan_for_plugins(dir.path());
        assert_eq!(pm.attach_enabled_plugins(), 1);
        assert!(!pm.is_plugin_enabled("Todo"));
        assert!(!pm.find_element("Todo").unwrap().is_attached());
    }

    #[test]
    fn test_missing_factory_and_extra_files() {
        let dir = tempfile::tempdir().unwrap();
        let lib = install(dir.path(), "empty", &manifest(&current_sdk(), &["Missing"]));
        let log = Log::default();
        let mut pm = manager(&log);
        assert!(matches!(pm.load_plugin(&lib), Err(PluginError::MissingFactory { .. })));

        install(dir.path(), "tools", &manifest(&current_sdk(), &["tools"]));
        pm.scan_for_plugins(dir.path());
        let out = dir.path().join("share");
        let files = pm.extract_extra_files("tools", &out).unwrap();
        assert_eq!(files, vec![out.join("icons/tools.png")]);
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"png");
    }
}
