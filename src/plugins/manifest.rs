//! Plugin manifests.
//!
//! Every plugin library ships a zip resource archive that holds a
//! `manifest.xml`:
//!
//! ```xml
//! <CodeBlocks_plugin_manifest_file>
//!     <SdkVersion major="2" minor="25" release="0" />
//!     <Plugin name="Astyle">
//!         <Value title="Source code formatter" version="1.0" license="GPL" />
//!     </Plugin>
//!     <Extra file="astyle.png" />
//! </CodeBlocks_plugin_manifest_file>
//! ```

use crate::error::PluginError;
use crate::xml::{child_elements, first_child, int_attr};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const MANIFEST_ROOT: &str = "CodeBlocks_plugin_manifest_file";
pub const MANIFEST_FILE: &str = "manifest.xml";

/// SDK version this host was built against. Plugins must match it exactly.
pub const PLUGIN_SDK_VERSION: semver::Version = semver::Version::new(2, 25, 0);

/// Metadata of one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub title: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub author_email: String,
    pub author_website: String,
    pub thanks_to: String,
    pub license: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub sdk_version: semver::Version,
    pub plugins: Vec<PluginInfo>,
    /// Resource files to extract on install.
    pub extra_files: Vec<String>,
}

impl Manifest {
    /// Fails unless the declared SDK version equals [`PLUGIN_SDK_VERSION`].
    pub fn check_sdk(&self, name: &str) -> Result<(), PluginError> {
        if self.sdk_version == PLUGIN_SDK_VERSION {
            return Ok(());
        }
        log::warn!(
            "plugin '{}' targets SDK {}, host is {}; not loading",
            name,
            self.sdk_version,
            PLUGIN_SDK_VERSION
        );
        Err(PluginError::SdkMismatch {
            name: name.to_string(),
            found: self.sdk_version.clone(),
            expected: PLUGIN_SDK_VERSION,
        })
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.name == name)
    }
}

/// Parses manifest XML.
pub fn read_manifest(xml: &str) -> Result<Manifest, PluginError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != MANIFEST_ROOT {
        return Err(PluginError::Manifest(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let sdk = first_child(root, "SdkVersion")
        .ok_or_else(|| PluginError::Manifest("missing <SdkVersion>".into()))?;
    let part = |name: &str| {
        int_attr(sdk, name)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| PluginError::Manifest(format!("<SdkVersion> lacks a valid '{name}'")))
    };
    let sdk_version = semver::Version::new(part("major")?, part("minor")?, part("release")?);

    let mut plugins = Vec::new();
    for node in child_elements(root, "Plugin") {
        let name = node.attribute("name").unwrap_or_default().trim();
        if name.is_empty() {
            log::warn!("manifest entry without a plugin name ignored");
            continue;
        }
        let mut info = PluginInfo {
            name: name.to_string(),
            ..PluginInfo::default()
        };
        for value in child_elements(node, "Value") {
            for attr in value.attributes() {
                let field = match attr.name() {
                    "title" => &mut info.title,
                    "version" => &mut info.version,
                    "description" => &mut info.description,
                    "author" => &mut info.author,
                    "authorEmail" => &mut info.author_email,
                    "authorWebsite" => &mut info.author_website,
                    "thanksTo" => &mut info.thanks_to,
                    "license" => &mut info.license,
                    _ => continue,
                };
                *field = attr.value().to_string();
            }
        }
        plugins.push(info);
    }
    if plugins.is_empty() {
        return Err(PluginError::Manifest("no <Plugin> entries".into()));
    }

    let extra_files = child_elements(root, "Extra")
        .filter_map(|e| e.attribute("file"))
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Manifest {
        sdk_version,
        plugins,
        extra_files,
    })
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>, PluginError> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|source| PluginError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `manifest.xml` out of a plugin's resource archive.
pub fn read_manifest_from_archive(path: &Path) -> Result<Manifest, PluginError> {
    let mut archive = open_archive(path)?;
    let mut entry = archive
        .by_name(MANIFEST_FILE)
        .map_err(|source| PluginError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    read_manifest(&xml)
}

/// Copies the manifest's extra files from `archive_path` into `dest`.
/// Entries missing from the archive are skipped with a warning.
pub fn extract_extra_files(
    archive_path: &Path,
    manifest: &Manifest,
    dest: &Path,
) -> Result<Vec<std::path::PathBuf>, PluginError> {
    let mut archive = open_archive(archive_path)?;
    std::fs::create_dir_all(dest)?;
    let mut written = Vec::new();
    for name in &manifest.extra_files {
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("{}: extra file '{}' not found: {}", archive_path.display(), name, e);
                continue;
            }
        };
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("{}: refusing to extract '{}'", archive_path.display(), name);
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        written.push(target);
    }
    Ok(written)
}
