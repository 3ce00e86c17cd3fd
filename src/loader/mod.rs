//! Reading and writing `.cbp` project files.
//!
//! ## Format versions
//!
//! The current format is `1.6`. Older files are upgraded while loading:
//!
//! - no `<FileVersion>`: pre-1.1; linker options may be converted to link
//!   libraries and the project is marked modified
//! - before 1.2: PCH files default to the source directory, targets default
//!   to being part of the virtual `All` target
//! - before 1.6: per-file `compile`, `link` and `compilerVar` default from
//!   the file type
//!
//! Newer files are loaded anyway, after a warning.

mod read;
mod save;

pub use read::ProjectLoader;
pub use save::{ProjectSaver, export_target_as_project, to_xml_string};

use crate::project::Project;
use crate::xml::XmlElement;

pub const PROJECT_FILE_VERSION_MAJOR: u32 = 1;
pub const PROJECT_FILE_VERSION_MINOR: u32 = 6;

pub const ROOT_ELEMENT: &str = "CodeBlocks_project_file";
/// Accepted on read only.
pub const LEGACY_ROOT_ELEMENT: &str = "Code::Blocks_project_file";

/// `(major, minor)` of a project file. Files without `<FileVersion>` read as
/// `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileVersion {
    pub major: u32,
    pub minor: u32,
}

impl FileVersion {
    pub const CURRENT: FileVersion = FileVersion {
        major: PROJECT_FILE_VERSION_MAJOR,
        minor: PROJECT_FILE_VERSION_MINOR,
    };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for FileVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Something the loader wants the user to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadNotice {
    /// The file was written by a newer version; loading continues.
    NewerFormat { found: FileVersion },
    /// The file uses an older format; each entry describes what changed.
    OlderFormat {
        found: FileVersion,
        changes: Vec<&'static str>,
    },
    /// A pre-1.1 file was converted and will be saved in the new layout.
    Upgraded,
    /// A compiler ID was replaced.
    CompilerSubstituted { from: String, to: String },
}

/// Decisions and notifications the loader delegates to its host.
pub trait LoadObserver {
    fn notify(&mut self, notice: &LoadNotice) {
        log::info!("{:?}", notice);
    }

    /// Asked once for pre-1.1 files: move linker options that look like
    /// libraries into the link-library list?
    fn convert_link_libraries(&mut self) -> bool {
        true
    }

    /// Asked once per unknown compiler ID. `None` keeps the ID.
    fn substitute_compiler(&mut self, unknown_id: &str) -> Option<String> {
        let _ = unknown_id;
        None
    }
}

/// Accepts every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl LoadObserver for SilentObserver {}

/// Extension point for the `<Extensions>` element.
///
/// `on_load` sees the element as read; `on_save` may add or replace
/// children. Children are sorted by tag name (stable) before writing.
pub trait ProjectLoaderHook {
    fn on_load(&self, project: &mut Project, extensions: &XmlElement);
    fn on_save(&self, project: &Project, extensions: &mut XmlElement);
}

/// Notes shown for files older than the current format, by minor version.
pub(crate) fn format_changes(found: FileVersion) -> Vec<&'static str> {
    let mut changes = Vec::new();
    if found.major != PROJECT_FILE_VERSION_MAJOR {
        return changes;
    }
    for minor in (found.minor + 1)..=PROJECT_FILE_VERSION_MINOR {
        match minor {
            2 => changes.push(
                "precompiled headers now go to the object directory by default, \
                 and the \"All\" target became a virtual target",
            ),
            6 => changes.push(
                "per-file compile, link and compilerVar settings are stored only \
                 when they differ from the file type's defaults",
            ),
            _ => {}
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(FileVersion::new(1, 1) < FileVersion::new(1, 2));
        assert!(FileVersion::new(2, 0) > FileVersion::CURRENT);
        assert_eq!(FileVersion::CURRENT.to_string(), "1.6");
    }

    #[test]
    fn test_format_changes() {
        assert_eq!(format_changes(FileVersion::new(1, 1)).len(), 2);
        assert_eq!(format_changes(FileVersion::new(1, 5)).len(), 1);
        assert!(format_changes(FileVersion::CURRENT).is_empty());
    }
}
