//! In-memory project document model.
//!
//! A [`Project`] owns its build targets, files, globs and virtual targets.
//! The loader builds it from XML, the saver walks it back out; everything in
//! between is plain data plus the invariants enforced by the mutators here.

pub mod file;
pub mod glob;
pub mod options;
pub mod target;

pub use file::{CustomBuild, DEFAULT_WEIGHT, GlobId, INVALID_GLOB_ID, ProjectFile};
pub use glob::ProjectGlob;
pub use options::{
    CompileOptions, MakeCommand, MakeCommands, OptionsRelation, OptionsRelationType, Platforms,
};
pub use target::{BuildTarget, LinkerExecutable, TargetType};

use crate::filetypes::FileTypes;
use crate::paths::unix_filename;
use crate::xml::XmlElement;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Where precompiled headers are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PchMode {
    SourceDir = 0,
    #[default]
    ObjectDir = 1,
    SourceFile = 2,
}

impl PchMode {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::SourceDir),
            1 => Some(Self::ObjectDir),
            2 => Some(Self::SourceFile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub filename: PathBuf,
    pub title: String,
    pub platforms: Platforms,
    pub compiler_id: String,
    pub makefile: String,
    pub makefile_is_custom: bool,
    pub execution_dir: String,
    pub default_execute_target: String,
    pub pch_mode: PchMode,
    pub virtual_folders: Vec<String>,
    pub notes: String,
    pub show_notes_on_load: bool,
    pub extended_obj_names: bool,
    pub scripts: Vec<String>,
    pub make_commands: MakeCommands,
    pub options: CompileOptions,
    /// The `<Extensions>` subtree as loaded, re-emitted on save.
    pub extensions: Option<XmlElement>,
    pub modified: bool,
    pub file_types: FileTypes,
    targets: Vec<BuildTarget>,
    files: Vec<ProjectFile>,
    file_index: HashMap<String, usize>,
    bulk_depth: u32,
    globs: Vec<ProjectGlob>,
    virtual_targets: BTreeMap<String, Vec<String>>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

impl Project {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        let filename = filename.into();
        let title = filename
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            filename,
            title,
            platforms: Platforms::ALL,
            compiler_id: String::new(),
            makefile: "Makefile".to_string(),
            makefile_is_custom: false,
            execution_dir: ".".to_string(),
            default_execute_target: String::new(),
            pch_mode: PchMode::default(),
            virtual_folders: Vec::new(),
            notes: String::new(),
            show_notes_on_load: false,
            extended_obj_names: false,
            scripts: Vec::new(),
            make_commands: MakeCommands::new(),
            options: CompileOptions::default(),
            extensions: None,
            modified: false,
            file_types: FileTypes::default(),
            targets: Vec::new(),
            files: Vec::new(),
            file_index: HashMap::new(),
            bulk_depth: 0,
            globs: Vec::new(),
            virtual_targets: BTreeMap::new(),
        }
    }

    /// Directory that relative file names are resolved against.
    pub fn base_path(&self) -> PathBuf {
        self.filename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    // --- Build targets ---

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut [BuildTarget] {
        &mut self.targets
    }

    pub fn target_titles(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.title.clone()).collect()
    }

    /// Adds a target. Returns `None` if the title is already taken.
    pub fn add_build_target(&mut self, title: &str) -> Option<&mut BuildTarget> {
        if title.is_empty() || self.build_target(title).is_some() {
            return None;
        }
        self.targets.push(BuildTarget::new(title));
        self.modified = true;
        self.targets.last_mut()
    }

    pub fn build_target(&self, title: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.title == title)
    }

    pub fn build_target_mut(&mut self, title: &str) -> Option<&mut BuildTarget> {
        self.targets.iter_mut().find(|t| t.title == title)
    }

    /// Removes a target and every reference to it.
    pub fn remove_build_target(&mut self, title: &str) -> bool {
        let Some(pos) = self.targets.iter().position(|t| t.title == title) else {
            return false;
        };
        self.targets.remove(pos);
        for file in &mut self.files {
            file.remove_build_target(title);
        }
        for members in self.virtual_targets.values_mut() {
            members.retain(|m| m != title);
        }
        self.virtual_targets.retain(|_, members| !members.is_empty());
        if self.default_execute_target == title {
            self.default_execute_target.clear();
        }
        self.modified = true;
        true
    }

    /// Renames a target, updating file memberships and virtual targets.
    pub fn rename_build_target(&mut self, old: &str, new: &str) -> bool {
        if new.is_empty() || self.build_target(new).is_some() || self.has_virtual_build_target(new)
        {
            return false;
        }
        let Some(target) = self.build_target_mut(old) else {
            return false;
        };
        target.title = new.to_string();
        for file in &mut self.files {
            file.rename_build_target(old, new);
        }
        for members in self.virtual_targets.values_mut() {
            for m in members.iter_mut().filter(|m| *m == old) {
                *m = new.to_string();
            }
        }
        if self.default_execute_target == old {
            self.default_execute_target = new.to_string();
        }
        self.modified = true;
        true
    }

    // --- Files ---

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut ProjectFile> {
        self.files.iter_mut()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn rebuild_index(&mut self) {
        self.file_index = self
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.relative_filename.clone(), i))
            .collect();
    }

    /// Starts a bulk insertion. Files added until the matching
    /// [`end_add_files`](Self::end_add_files) are appended unsorted.
    pub fn begin_add_files(&mut self) {
        self.bulk_depth += 1;
    }

    /// Ends a bulk insertion; the outermost call sorts the file list.
    pub fn end_add_files(&mut self) {
        if self.bulk_depth == 0 {
            log::warn!("end_add_files() called without begin_add_files()");
            return;
        }
        self.bulk_depth -= 1;
        if self.bulk_depth == 0 {
            self.files
                .sort_by(|a, b| a.relative_filename.cmp(&b.relative_filename));
            self.rebuild_index();
        }
    }

    /// Adds a file with the defaults of its type and no target membership.
    /// Returns `None` if the path is already part of the project.
    pub fn add_file(&mut self, relative_filename: &str) -> Option<&mut ProjectFile> {
        let name = unix_filename(relative_filename);
        if name.is_empty() || self.file_index.contains_key(&name) {
            return None;
        }
        let file = ProjectFile::new(name.clone(), &self.file_types);
        let pos = if self.bulk_depth > 0 {
            self.files.len()
        } else {
            self.files
                .partition_point(|f| f.relative_filename.as_str() < name.as_str())
        };
        self.files.insert(pos, file);
        if self.bulk_depth > 0 {
            self.file_index.insert(name, pos);
        } else {
            self.rebuild_index();
        }
        self.modified = true;
        self.files.get_mut(pos)
    }

    pub fn remove_file(&mut self, relative_filename: &str) -> Option<ProjectFile> {
        let name = unix_filename(relative_filename);
        let pos = *self.file_index.get(&name)?;
        let removed = self.files.remove(pos);
        self.rebuild_index();
        self.modified = true;
        Some(removed)
    }

    pub fn file_by_name(&self, relative_filename: &str) -> Option<&ProjectFile> {
        let pos = *self.file_index.get(&unix_filename(relative_filename))?;
        self.files.get(pos)
    }

    pub fn file_by_name_mut(&mut self, relative_filename: &str) -> Option<&mut ProjectFile> {
        let pos = *self.file_index.get(&unix_filename(relative_filename))?;
        self.files.get_mut(pos)
    }

    /// True if the file is a member of every build target.
    pub fn belongs_to_all_targets(&self, file: &ProjectFile) -> bool {
        self.targets.iter().all(|t| file.belongs_to(&t.title))
    }

    // --- Virtual targets ---

    pub fn virtual_build_targets(&self) -> &BTreeMap<String, Vec<String>> {
        &self.virtual_targets
    }

    /// Defines (or redefines) an alias for a group of targets.
    ///
    /// Fails if `alias` names a real target or none of `targets` exists.
    /// Unknown member names are dropped.
    pub fn define_virtual_build_target(&mut self, alias: &str, targets: &[String]) -> bool {
        if alias.is_empty() || self.build_target(alias).is_some() {
            log::warn!("cannot define virtual target '{}': name is taken", alias);
            return false;
        }
        let mut members: Vec<String> = Vec::new();
        for name in targets {
            let known = self.build_target(name).is_some()
                || (name != alias && self.virtual_targets.contains_key(name));
            if known {
                if !members.contains(name) {
                    members.push(name.clone());
                }
            } else {
                log::warn!(
                    "virtual target '{}' references unknown target '{}'",
                    alias,
                    name
                );
            }
        }
        if members.is_empty() {
            return false;
        }
        self.virtual_targets.insert(alias.to_string(), members);
        self.modified = true;
        true
    }

    pub fn has_virtual_build_target(&self, alias: &str) -> bool {
        self.virtual_targets.contains_key(alias)
    }

    pub fn virtual_build_target(&self, alias: &str) -> Option<&[String]> {
        self.virtual_targets.get(alias).map(Vec::as_slice)
    }

    pub fn remove_virtual_build_target(&mut self, alias: &str) -> bool {
        let removed = self.virtual_targets.remove(alias).is_some();
        if removed {
            self.modified = true;
        }
        removed
    }

    /// Resolves an alias to real target names, following nested aliases.
    pub fn expanded_virtual_build_target(&self, alias: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        self.expand_into(alias, &mut visited, &mut result);
        result
    }

    fn expand_into(&self, alias: &str, visited: &mut HashSet<String>, out: &mut Vec<String>) {
        if !visited.insert(alias.to_string()) {
            return;
        }
        let Some(members) = self.virtual_targets.get(alias) else {
            return;
        };
        for name in members {
            if self.build_target(name).is_some() {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            } else {
                self.expand_into(name, visited, out);
            }
        }
    }

    // --- Globs ---

    pub fn globs(&self) -> &[ProjectGlob] {
        &self.globs
    }

    fn next_glob_id(&self) -> GlobId {
        self.globs.iter().map(ProjectGlob::id).max().map_or(0, |m| m + 1)
    }

    /// Adds a glob with a fresh id.
    pub fn add_glob(&mut self, directory: &str, wildcard: &str, recursive: bool) -> GlobId {
        self.add_glob_with_id(INVALID_GLOB_ID, directory, wildcard, recursive)
    }

    /// Adds a glob keeping `id` when it is valid and unused, otherwise
    /// assigning a fresh one. Returns the id in use.
    pub fn add_glob_with_id(
        &mut self,
        id: GlobId,
        directory: &str,
        wildcard: &str,
        recursive: bool,
    ) -> GlobId {
        let id = if id < 0 || self.search_glob(id).is_some() {
            self.next_glob_id()
        } else {
            id
        };
        self.globs
            .push(ProjectGlob::new(id, unix_filename(directory), wildcard, recursive));
        self.modified = true;
        id
    }

    pub fn search_glob(&self, id: GlobId) -> Option<&ProjectGlob> {
        self.globs.iter().find(|g| g.id() == id)
    }

    /// Removes a glob and the files it owns.
    pub fn remove_glob(&mut self, id: GlobId) -> bool {
        let Some(pos) = self.globs.iter().position(|g| g.id() == id) else {
            return false;
        };
        self.globs.remove(pos);
        self.files.retain(|f| f.glob_id != Some(id));
        self.rebuild_index();
        self.modified = true;
        true
    }
}
