//! File type registry.
//!
//! Classifies project files by extension. The classification drives the
//! per-file compile/link defaults and the fallback wildcard of globs that
//! do not specify one.

use glob::{MatchOptions, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Source,
    Header,
    Resource,
    Object,
    StaticLib,
    DynamicLib,
    Other,
}

impl FileType {
    /// Whether files of this type are compiled by default.
    pub fn default_compile(self) -> bool {
        matches!(self, FileType::Source | FileType::Resource)
    }

    /// Whether files of this type are passed to the linker by default.
    pub fn default_link(self) -> bool {
        matches!(
            self,
            FileType::Source
                | FileType::Resource
                | FileType::Object
                | FileType::StaticLib
                | FileType::DynamicLib
        )
    }
}

#[derive(Debug, Clone)]
pub struct FileTypes {
    groups: Vec<(FileType, Vec<String>)>,
}

const SOURCE_MASKS: &str = "*.c;*.cc;*.cpp;*.cxx;*.c++;*.cp;*.d;*.f;*.f77;*.f90;*.f95;*.for;*.s;*.S;*.asm";
const HEADER_MASKS: &str = "*.h;*.hh;*.hpp;*.hxx;*.h++;*.tcc;*.tpp;*.inl";
const RESOURCE_MASKS: &str = "*.rc";
const OBJECT_MASKS: &str = "*.o;*.obj";
const STATIC_LIB_MASKS: &str = "*.a;*.lib";
const DYNAMIC_LIB_MASKS: &str = "*.so;*.dll;*.dylib";

fn split_masks(masks: &str) -> Vec<String> {
    masks
        .split(';')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn case_insensitive() -> MatchOptions {
    MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

impl Default for FileTypes {
    fn default() -> Self {
        Self {
            groups: vec![
                (FileType::Source, split_masks(SOURCE_MASKS)),
                (FileType::Header, split_masks(HEADER_MASKS)),
                (FileType::Resource, split_masks(RESOURCE_MASKS)),
                (FileType::Object, split_masks(OBJECT_MASKS)),
                (FileType::StaticLib, split_masks(STATIC_LIB_MASKS)),
                (FileType::DynamicLib, split_masks(DYNAMIC_LIB_MASKS)),
            ],
        }
    }
}

impl FileTypes {
    /// Replaces the masks of one category (`;`-separated).
    pub fn set_masks(&mut self, file_type: FileType, masks: &str) {
        let masks = split_masks(masks);
        match self.groups.iter_mut().find(|(ft, _)| *ft == file_type) {
            Some((_, existing)) => *existing = masks,
            None => self.groups.push((file_type, masks)),
        }
    }

    pub fn masks(&self, file_type: FileType) -> &[String] {
        self.groups
            .iter()
            .find(|(ft, _)| *ft == file_type)
            .map(|(_, m)| m.as_slice())
            .unwrap_or(&[])
    }

    /// The union of source and header masks, `;`-separated.
    pub fn source_and_header_masks(&self) -> String {
        let mut all: Vec<&str> = Vec::new();
        for ft in [FileType::Source, FileType::Header] {
            for mask in self.masks(ft) {
                if !all.contains(&mask.as_str()) {
                    all.push(mask);
                }
            }
        }
        all.join(";")
    }

    /// Classifies a path by its file name. Matching is case-insensitive and
    /// the first matching category wins.
    pub fn classify(&self, path: &str) -> FileType {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let options = case_insensitive();
        for (ft, masks) in &self.groups {
            for mask in masks {
                if let Ok(pattern) = Pattern::new(mask)
                    && pattern.matches_with(name, options)
                {
                    return *ft;
                }
            }
        }
        FileType::Other
    }

    /// The compiler variable a file of this name uses by default:
    /// `CC` for C sources, `WINDRES` for resources, otherwise `CPP`.
    pub fn compiler_var_for(&self, path: &str) -> &'static str {
        match self.classify(path) {
            FileType::Resource => "WINDRES",
            FileType::Source if path.to_lowercase().ends_with(".c") => "CC",
            _ => "CPP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        let types = FileTypes::default();
        assert_eq!(types.classify("src/main.cpp"), FileType::Source);
        assert_eq!(types.classify("include\\Foo.HPP"), FileType::Header);
        assert_eq!(types.classify("app.rc"), FileType::Resource);
        assert_eq!(types.classify("libz.a"), FileType::StaticLib);
        assert_eq!(types.classify("README"), FileType::Other);
    }

    #[test]
    fn test_defaults_follow_type() {
        assert!(FileType::Source.default_compile());
        assert!(FileType::StaticLib.default_link());
        assert!(!FileType::StaticLib.default_compile());
        assert!(!FileType::Header.default_link());
    }

    #[test]
    fn test_compiler_var_for() {
        let types = FileTypes::default();
        assert_eq!(types.compiler_var_for("x.c"), "CC");
        assert_eq!(types.compiler_var_for("x.cpp"), "CPP");
        assert_eq!(types.compiler_var_for("res/app.rc"), "WINDRES");
    }

    #[test]
    fn test_source_and_header_masks() {
        let mut types = FileTypes::default();
        types.set_masks(FileType::Source, "*.c");
        types.set_masks(FileType::Header, "*.h;*.c");
        assert_eq!(types.source_and_header_masks(), "*.c;*.h");
    }
}
