//! Reconciles glob rules against the files on disk.

use crate::paths::files_in_dir;
use crate::project::{GlobId, Project};

/// Rescans one glob and brings the project's files in line with the disk.
///
/// Files tagged with the glob that disappeared are removed first, then new
/// matches are added with the defaults of their type and membership in every
/// target. Paths already in the project under another owner are left alone.
/// Returns whether the project changed.
pub fn update_glob(project: &mut Project, id: GlobId) -> bool {
    let Some(glob) = project.search_glob(id).cloned() else {
        log::warn!("update_glob: no glob with id {}", id);
        return false;
    };

    let mut on_disk = files_in_dir(
        &glob.directory,
        &glob.wildcard,
        glob.recursive,
        &project.base_path(),
        &project.file_types,
    );
    on_disk.sort();

    let mut tracked: Vec<String> = project
        .files()
        .iter()
        .filter(|f| f.glob_id == Some(id))
        .map(|f| f.relative_filename.clone())
        .collect();
    tracked.sort();

    let mut changed = false;

    for name in &tracked {
        if on_disk.binary_search(name).is_err() {
            log::debug!("glob {}: '{}' is gone, removing", id, name);
            project.remove_file(name);
            changed = true;
        }
    }

    let targets = project.target_titles();
    for name in &on_disk {
        if tracked.binary_search(name).is_ok() || project.file_by_name(name).is_some() {
            continue;
        }
        if let Some(file) = project.add_file(name) {
            file.glob_id = Some(id);
            file.targets = targets.clone();
            log::debug!("glob {}: added '{}'", id, name);
            changed = true;
        }
    }

    changed
}

impl Project {
    /// Rescans every glob. Returns whether anything changed.
    pub fn update_globs(&mut self) -> bool {
        let ids: Vec<GlobId> = self.globs().iter().map(|g| g.id()).collect();
        let mut changed = false;
        for id in ids {
            changed |= update_glob(self, id);
        }
        changed
    }
}
