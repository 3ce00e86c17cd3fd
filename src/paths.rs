//! Path helpers used by the glob engine and the project loader.

use crate::filetypes::{FileTypes, case_insensitive};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Converts backslashes to forward slashes.
pub fn unix_filename(path: &str) -> String {
    path.replace('\\', "/")
}

fn is_absolute_str(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn split_components(path: &str) -> (String, Vec<&str>) {
    let (root, rest) = match path.as_bytes() {
        [drive, b':', ..] if drive.is_ascii_alphabetic() => {
            (path[..2].to_ascii_lowercase(), &path[2..])
        }
        _ => (String::new(), path),
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    (root, parts)
}

/// Makes `path` relative to `base` without touching the filesystem.
///
/// Relative inputs are returned unchanged (apart from separator
/// normalization). Paths on different drives stay absolute. The result uses
/// `/` and is `.` when both paths are the same.
pub fn make_relative(path: &str, base: &str) -> String {
    if !is_absolute_str(path) {
        return unix_filename(path);
    }

    let (path_root, path_parts) = split_components(path);
    let (base_root, base_parts) = split_components(base);
    if path_root != base_root || !is_absolute_str(base) {
        return unix_filename(path);
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result: Vec<&str> = Vec::new();
    for _ in common..base_parts.len() {
        result.push("..");
    }
    result.extend_from_slice(&path_parts[common..]);

    if result.is_empty() {
        ".".to_string()
    } else {
        result.join("/")
    }
}

/// Compiles a `;`-separated wildcard list into patterns.
pub fn wildcard_patterns(wildcard: &str) -> Vec<Pattern> {
    wildcard
        .to_lowercase()
        .split(';')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .filter_map(|w| match Pattern::new(w) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("ignoring invalid wildcard '{}': {}", w, e);
                None
            }
        })
        .collect()
}

/// Lists the files of `directory` matching `wildcard`, relative to `base`.
///
/// `directory` is resolved against `base` when relative. An empty wildcard
/// means "all source and header files" per `file_types`. Only regular files
/// are returned, sorted; a missing directory yields an empty list.
pub fn files_in_dir(
    directory: &str,
    wildcard: &str,
    recursive: bool,
    base: &Path,
    file_types: &FileTypes,
) -> Vec<String> {
    // Walk entries are made relative to `base`, which only works on absolute paths.
    let base = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::path::absolute(base)
            .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(base)))
            .unwrap_or_else(|_| base.to_path_buf())
    };
    let dir = PathBuf::from(unix_filename(directory));
    let dir = if dir.is_absolute() || is_absolute_str(directory) {
        dir
    } else {
        base.join(dir)
    };

    if !dir.is_dir() {
        log::debug!("glob directory {} does not exist", dir.display());
        return Vec::new();
    }

    let wildcard = if wildcard.trim().is_empty() {
        file_types.source_and_header_masks()
    } else {
        wildcard.to_string()
    };
    let patterns = wildcard_patterns(&wildcard);
    let options = case_insensitive();

    let mut walker = WalkDir::new(&dir).min_depth(1).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let base_str = base.to_string_lossy();
    let mut files: Vec<String> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            patterns.iter().any(|p| p.matches_with(&name, options))
        })
        .map(|e| make_relative(&e.path().to_string_lossy(), &base_str))
        .collect();

    files.sort();
    files
}
