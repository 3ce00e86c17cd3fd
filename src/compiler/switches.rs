//! Command-line conventions of a toolchain.

/// How much of each build command is echoed to the build log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStyle {
    Full,
    #[default]
    Simple,
    None,
}

impl LogStyle {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "full" => Some(Self::Full),
            "simple" | "default" => Some(Self::Simple),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Simple => "simple",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSwitches {
    pub include_dirs: String,
    pub lib_dirs: String,
    pub link_libs: String,
    pub defines: String,
    pub generic_switch: String,
    pub object_extension: String,
    pub need_dependencies: bool,
    pub force_fwd_slashes: bool,
    pub force_compiler_use_quotes: bool,
    pub force_linker_use_quotes: bool,
    pub logging: LogStyle,
    pub lib_prefix: String,
    pub lib_extension: String,
    pub linker_needs_lib_prefix: bool,
    pub linker_needs_lib_extension: bool,
    pub linker_needs_path_resolved: bool,
    pub supports_pch: bool,
    pub pch_extension: String,
    pub use_flat_objects: bool,
    pub use_full_source_paths: bool,
    pub include_dir_separator: char,
    pub lib_dir_separator: char,
    pub object_separator: char,
    pub status_success: i64,
    pub use_8_3: bool,
}

impl Default for CompilerSwitches {
    fn default() -> Self {
        Self {
            include_dirs: "-I".to_string(),
            lib_dirs: "-L".to_string(),
            link_libs: "-l".to_string(),
            defines: "-D".to_string(),
            generic_switch: "-".to_string(),
            object_extension: "o".to_string(),
            need_dependencies: true,
            force_fwd_slashes: false,
            force_compiler_use_quotes: false,
            force_linker_use_quotes: false,
            logging: LogStyle::default(),
            lib_prefix: "lib".to_string(),
            lib_extension: "a".to_string(),
            linker_needs_lib_prefix: false,
            linker_needs_lib_extension: false,
            linker_needs_path_resolved: false,
            supports_pch: true,
            pch_extension: "gch".to_string(),
            use_flat_objects: false,
            use_full_source_paths: false,
            include_dir_separator: ' ',
            lib_dir_separator: ' ',
            object_separator: ' ',
            status_success: 0,
            use_8_3: false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_separator(value: &str) -> Option<char> {
    value.chars().next().or(Some(' '))
}

impl CompilerSwitches {
    /// Names of every switch, as used in option files and settings keys.
    pub const NAMES: [&'static str; 25] = [
        "includeDirs",
        "libDirs",
        "linkLibs",
        "defines",
        "genericSwitch",
        "objectExtension",
        "needDependencies",
        "forceFwdSlashes",
        "forceCompilerUseQuotes",
        "forceLinkerUseQuotes",
        "logging",
        "libPrefix",
        "libExtension",
        "linkerNeedsLibPrefix",
        "linkerNeedsLibExtension",
        "linkerNeedsPathResolved",
        "supportsPCH",
        "PCHExtension",
        "UseFlatObjects",
        "UseFullSourcePaths",
        "includeDirSeparator",
        "libDirSeparator",
        "objectSeparator",
        "statusSuccess",
        "Use83Paths",
    ];

    /// Sets a switch by name. Returns `false` for unknown names or values
    /// that do not parse.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        macro_rules! set_parsed {
            ($field:expr, $parsed:expr) => {
                match $parsed {
                    Some(v) => {
                        $field = v;
                        true
                    }
                    None => false,
                }
            };
        }

        match name {
            "includeDirs" => set_parsed!(self.include_dirs, Some(value.to_string())),
            "libDirs" => set_parsed!(self.lib_dirs, Some(value.to_string())),
            "linkLibs" => set_parsed!(self.link_libs, Some(value.to_string())),
            "defines" => set_parsed!(self.defines, Some(value.to_string())),
            "genericSwitch" => set_parsed!(self.generic_switch, Some(value.to_string())),
            "objectExtension" => set_parsed!(self.object_extension, Some(value.to_string())),
            "needDependencies" => set_parsed!(self.need_dependencies, parse_bool(value)),
            "forceFwdSlashes" => set_parsed!(self.force_fwd_slashes, parse_bool(value)),
            "forceCompilerUseQuotes" => {
                set_parsed!(self.force_compiler_use_quotes, parse_bool(value))
            }
            "forceLinkerUseQuotes" => set_parsed!(self.force_linker_use_quotes, parse_bool(value)),
            "logging" => set_parsed!(self.logging, LogStyle::parse(value)),
            "libPrefix" => set_parsed!(self.lib_prefix, Some(value.to_string())),
            "libExtension" => set_parsed!(self.lib_extension, Some(value.to_string())),
            "linkerNeedsLibPrefix" => set_parsed!(self.linker_needs_lib_prefix, parse_bool(value)),
            "linkerNeedsLibExtension" => {
                set_parsed!(self.linker_needs_lib_extension, parse_bool(value))
            }
            "linkerNeedsPathResolved" => {
                set_parsed!(self.linker_needs_path_resolved, parse_bool(value))
            }
            "supportsPCH" => set_parsed!(self.supports_pch, parse_bool(value)),
            "PCHExtension" => set_parsed!(self.pch_extension, Some(value.to_string())),
            "UseFlatObjects" => set_parsed!(self.use_flat_objects, parse_bool(value)),
            "UseFullSourcePaths" => set_parsed!(self.use_full_source_paths, parse_bool(value)),
            "includeDirSeparator" => {
                set_parsed!(self.include_dir_separator, parse_separator(value))
            }
            "libDirSeparator" => set_parsed!(self.lib_dir_separator, parse_separator(value)),
            "objectSeparator" => set_parsed!(self.object_separator, parse_separator(value)),
            "statusSuccess" => set_parsed!(self.status_success, value.trim().parse().ok()),
            "Use83Paths" => set_parsed!(self.use_8_3, parse_bool(value)),
            _ => false,
        }
    }

    /// Reads a switch by name in its textual form.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "includeDirs" => self.include_dirs.clone(),
            "libDirs" => self.lib_dirs.clone(),
            "linkLibs" => self.link_libs.clone(),
            "defines" => self.defines.clone(),
            "genericSwitch" => self.generic_switch.clone(),
            "objectExtension" => self.object_extension.clone(),
            "needDependencies" => self.need_dependencies.to_string(),
            "forceFwdSlashes" => self.force_fwd_slashes.to_string(),
            "forceCompilerUseQuotes" => self.force_compiler_use_quotes.to_string(),
            "forceLinkerUseQuotes" => self.force_linker_use_quotes.to_string(),
            "logging" => self.logging.name().to_string(),
            "libPrefix" => self.lib_prefix.clone(),
            "libExtension" => self.lib_extension.clone(),
            "linkerNeedsLibPrefix" => self.linker_needs_lib_prefix.to_string(),
            "linkerNeedsLibExtension" => self.linker_needs_lib_extension.to_string(),
            "linkerNeedsPathResolved" => self.linker_needs_path_resolved.to_string(),
            "supportsPCH" => self.supports_pch.to_string(),
            "PCHExtension" => self.pch_extension.clone(),
            "UseFlatObjects" => self.use_flat_objects.to_string(),
            "UseFullSourcePaths" => self.use_full_source_paths.to_string(),
            "includeDirSeparator" => self.include_dir_separator.to_string(),
            "libDirSeparator" => self.lib_dir_separator.to_string(),
            "objectSeparator" => self.object_separator.to_string(),
            "statusSuccess" => self.status_success.to_string(),
            "Use83Paths" => self.use_8_3.to_string(),
            _ => return None,
        };
        Some(value)
    }
}
