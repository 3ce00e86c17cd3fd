use crate::filetypes::FileTypes;
use std::collections::BTreeMap;

pub type GlobId = i64;

/// The `glob` attribute value meaning "not managed by a glob".
pub const INVALID_GLOB_ID: GlobId = -1;

pub const DEFAULT_WEIGHT: u16 = 50;

/// A custom build command for one compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomBuild {
    pub use_custom: bool,
    pub command: String,
}

/// A file reference inside a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    /// Path relative to the project directory, `/`-separated.
    pub relative_filename: String,
    /// Build targets the file belongs to, in insertion order.
    pub targets: Vec<String>,
    pub compile: bool,
    pub link: bool,
    pub weight: u16,
    pub compiler_var: String,
    pub virtual_folder: String,
    pub glob_id: Option<GlobId>,
    pub custom_builds: BTreeMap<String, CustomBuild>,
    /// Set for files produced by a build step of another file; never saved.
    pub auto_generated_by: Option<String>,
}

impl ProjectFile {
    /// A file with the compile/link defaults of its type.
    pub fn new(relative_filename: impl Into<String>, file_types: &FileTypes) -> Self {
        let relative_filename = relative_filename.into();
        let ft = file_types.classify(&relative_filename);
        Self {
            compile: ft.default_compile(),
            link: ft.default_link(),
            relative_filename,
            targets: Vec::new(),
            weight: DEFAULT_WEIGHT,
            compiler_var: "CPP".to_string(),
            virtual_folder: String::new(),
            glob_id: None,
            custom_builds: BTreeMap::new(),
            auto_generated_by: None,
        }
    }

    pub fn belongs_to(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }

    pub fn add_build_target(&mut self, target: &str) {
        if !self.belongs_to(target) {
            self.targets.push(target.to_string());
        }
    }

    pub fn remove_build_target(&mut self, target: &str) {
        self.targets.retain(|t| t != target);
    }

    pub fn rename_build_target(&mut self, old: &str, new: &str) {
        for t in self.targets.iter_mut().filter(|t| *t == old) {
            *t = new.to_string();
        }
    }
}
