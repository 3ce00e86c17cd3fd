//! Compiler option model.
//!
//! A [`Compiler`] describes one toolchain: its programs, command-line
//! conventions ([`CompilerSwitches`]), command templates, diagnostic regexes
//! and the catalog of custom options offered to the user.
//!
//! ## Lifecycle
//!
//! 1. [`Compiler::new`] reserves a sanitized ID in a [`CompilerIdRegistry`].
//! 2. [`Compiler::load_default_options`] reads `options_<id>.xml`.
//! 3. [`Compiler::load_settings`] mirrors the defaults, then applies the
//!    user's overrides from the [`ConfigStore`](crate::config::ConfigStore).
//! 4. [`Compiler::save_settings`] writes back only what differs from the
//!    mirror.

pub mod commands;
pub mod condition;
pub mod defaults;
pub mod diagnostics;
pub mod options;
pub mod registry;
mod settings;
pub mod switches;
pub mod version;

pub use commands::{CommandTable, CommandType, CompilerTool};
pub use condition::{CommandRunner, Condition, ConditionEvaluator, Predicate, SystemRunner};
pub use defaults::{ApplyMode, DirSource, MemorySource, OptionsLoader, OptionsNode, OptionsSource};
pub use diagnostics::{CompilerLineType, DiagnosticState, RegExStruct};
pub use options::{CompOption, CompilerOptions};
pub use registry::{CompilerIdRegistry, is_valid_id, sanitize_id};
pub use switches::{CompilerSwitches, LogStyle};
pub use version::{VersionOp, cmp_version};

use crate::error::CompilerError;
use crate::macros::MacroExpander;
use crate::project::CompileOptions;
use std::path::Path;

/// The programs a toolchain is made of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Programs {
    pub c: String,
    pub cpp: String,
    pub ld: String,
    pub lib: String,
    pub windres: String,
    pub make: String,
    pub dbg_config: String,
}

impl Programs {
    pub const NAMES: [&'static str; 7] = ["C", "CPP", "LD", "LIB", "WINDRES", "MAKE", "DBGconfig"];

    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "C" => &self.c,
            "CPP" => &self.cpp,
            "LD" => &self.ld,
            "LIB" => &self.lib,
            "WINDRES" => &self.windres,
            "MAKE" => &self.make,
            "DBGconfig" => &self.dbg_config,
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            "C" => &mut self.c,
            "CPP" => &mut self.cpp,
            "LD" => &mut self.ld,
            "LIB" => &mut self.lib,
            "WINDRES" => &mut self.windres,
            "MAKE" => &mut self.make,
            "DBGconfig" => &mut self.dbg_config,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

/// Result of the last installation probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    id: String,
    pub parent_id: String,
    pub name: String,
    pub master_path: String,
    pub extra_paths: Vec<String>,
    pub programs: Programs,
    pub switches: CompilerSwitches,
    pub commands: CommandTable,
    pub regexes: Vec<RegExStruct>,
    pub multi_line_messages: bool,
    pub custom_options: CompilerOptions,
    pub c_only_flags: Vec<String>,
    pub cpp_only_flags: Vec<String>,
    pub options: CompileOptions,
    mirror: Option<Box<settings::Mirror>>,
    validity: Validity,
    needs_validity_check: bool,
    diagnostics: DiagnosticState,
}

impl Compiler {
    /// Creates a compiler and reserves its ID. `id` is sanitized first; an
    /// empty `id` is derived from `name`.
    pub fn new(
        name: &str,
        id: &str,
        registry: &mut CompilerIdRegistry,
    ) -> Result<Self, CompilerError> {
        let id = sanitize_id(if id.trim().is_empty() { name } else { id });
        registry.reserve(&id)?;
        Ok(Self {
            id,
            parent_id: String::new(),
            name: name.to_string(),
            master_path: String::new(),
            extra_paths: Vec::new(),
            programs: Programs::default(),
            switches: CompilerSwitches::default(),
            commands: CommandTable::default(),
            regexes: Vec::new(),
            multi_line_messages: false,
            custom_options: CompilerOptions::default(),
            c_only_flags: Vec::new(),
            cpp_only_flags: Vec::new(),
            options: CompileOptions::default(),
            mirror: None,
            validity: Validity::Unknown,
            needs_validity_check: true,
            diagnostics: DiagnosticState::default(),
        })
    }

    /// A user copy of this compiler. The copy starts without a mirror, so its
    /// first `load_settings` takes the inherited state as its defaults.
    pub fn copy_as(
        &self,
        name: &str,
        registry: &mut CompilerIdRegistry,
    ) -> Result<Self, CompilerError> {
        let mut copy = Self::new(name, "", registry)?;
        copy.parent_id = self.id.clone();
        copy.master_path = self.master_path.clone();
        copy.extra_paths = self.extra_paths.clone();
        copy.programs = self.programs.clone();
        copy.switches = self.switches.clone();
        copy.commands = self.commands.clone();
        copy.regexes = self.regexes.clone();
        copy.multi_line_messages = self.multi_line_messages;
        copy.custom_options = self.custom_options.clone();
        copy.c_only_flags = self.c_only_flags.clone();
        copy.cpp_only_flags = self.cpp_only_flags.clone();
        copy.options = self.options.clone();
        Ok(copy)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // --- installation validity ---

    pub fn set_master_path(&mut self, path: impl Into<String>) {
        self.master_path = path.into();
        self.invalidate_validity();
    }

    pub fn set_extra_paths(&mut self, paths: Vec<String>) {
        self.extra_paths = paths;
        self.invalidate_validity();
    }

    pub fn invalidate_validity(&mut self) {
        self.needs_validity_check = true;
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// Whether the C compiler can be found. Probes the filesystem only when
    /// the paths changed since the last probe.
    pub fn is_valid(&mut self, macros: &dyn MacroExpander) -> bool {
        if self.needs_validity_check {
            let valid = self.probe_installation(macros);
            self.validity = if valid {
                Validity::Valid
            } else {
                Validity::Invalid
            };
            // Keep probing while the master path is unset.
            self.needs_validity_check = self.master_path.is_empty();
        }
        self.validity == Validity::Valid
    }

    fn probe_installation(&self, macros: &dyn MacroExpander) -> bool {
        if self.master_path.is_empty() || self.programs.c.is_empty() {
            return true;
        }
        let c = &self.programs.c;
        let mut candidates = vec![
            format!("{}/bin/{}", self.master_path, c),
            format!("{}/{}", self.master_path, c),
        ];
        candidates.extend(self.extra_paths.iter().map(|p| format!("{p}/{c}")));

        candidates.iter().any(|candidate| {
            let expanded = macros.expand(candidate);
            let found = Path::new(&expanded).exists();
            log::debug!("probing {} -> {}", expanded, found);
            found
        })
    }

    // --- option files ---

    /// Loads `options_<id>.xml` (and whatever it extends) from `source`.
    pub fn load_default_options(
        &mut self,
        source: &dyn OptionsSource,
        runner: &dyn CommandRunner,
    ) -> Result<(), CompilerError> {
        let id = self.id.clone();
        let evaluator = self.evaluator(runner);
        OptionsLoader::new(source, &evaluator, false, ApplyMode::Everything).load(self, &id)
    }

    /// Reloads only the diagnostic regexes from the option files.
    pub fn load_regex_array(
        &mut self,
        source: &dyn OptionsSource,
        global_precedence: bool,
        runner: &dyn CommandRunner,
    ) -> Result<(), CompilerError> {
        let id = self.id.clone();
        let evaluator = self.evaluator(runner);
        self.regexes.clear();
        OptionsLoader::new(source, &evaluator, global_precedence, ApplyMode::RegexOnly)
            .load(self, &id)
    }

    fn evaluator<'a>(&self, runner: &'a dyn CommandRunner) -> ConditionEvaluator<'a> {
        let mut evaluator = ConditionEvaluator::new(runner);
        for alias in condition::PROGRAM_ALIASES {
            if let Some(value) = self.programs.get(alias) {
                evaluator = evaluator.with_program(alias, value);
            }
        }
        if !self.master_path.is_empty() {
            evaluator = evaluator.with_bin_dir(Path::new(&self.master_path).join("bin"));
        }
        evaluator
    }

    // --- diagnostics ---

    /// Classifies one line of build output with the first matching regex.
    pub fn check_for_warnings_and_errors(&mut self, line: &str) -> CompilerLineType {
        diagnostics::check_line(
            &self.regexes,
            self.multi_line_messages,
            &mut self.diagnostics,
            line,
        )
    }

    pub fn error_filename(&self) -> &str {
        &self.diagnostics.filename
    }

    pub fn error_line(&self) -> &str {
        &self.diagnostics.line
    }

    pub fn error(&self) -> &str {
        &self.diagnostics.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::EnvMacros;

    fn gcc(registry: &mut CompilerIdRegistry) -> Compiler {
        let mut c = Compiler::new("GNU GCC Compiler", "gcc", registry).unwrap();
        c.programs.c = "gcc".into();
        c
    }

    #[test]
    fn test_new_reserves_sanitized_id() {
        let mut registry = CompilerIdRegistry::new();
        let c = Compiler::new("My Compiler 1", "", &mut registry).unwrap();
        assert_eq!(c.id(), "my_compiler_1");
        assert!(registry.contains("my_compiler_1"));
        assert!(matches!(
            Compiler::new("Other", "My Compiler 1", &mut registry),
            Err(CompilerError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_copy_keeps_parent() {
        let mut registry = CompilerIdRegistry::new();
        let base = gcc(&mut registry);
        let copy = base.copy_as("Copy of GNU GCC", &mut registry).unwrap();
        assert_eq!(copy.parent_id, "gcc");
        assert_eq!(copy.id(), "copy_of_gnu_gcc");
        assert_eq!(copy.programs.c, "gcc");
    }

    #[test]
    fn test_empty_master_path_is_valid() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = gcc(&mut registry);
        assert!(c.is_valid(&EnvMacros::isolated()));
        assert_eq!(c.validity(), Validity::Valid);
    }

    #[test]
    fn test_probe_order_and_caching() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = CompilerIdRegistry::new();
        let mut c = gcc(&mut registry);
        let macros = EnvMacros::isolated().with_var("TC", dir.path().to_string_lossy());

        c.set_master_path("$(TC)");
        assert!(!c.is_valid(&macros));

        // No re-probe until the paths change.
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin").join("gcc"), "").unwrap();
        assert!(!c.is_valid(&macros));

        c.invalidate_validity();
        assert!(c.is_valid(&macros));
    }

    #[test]
    fn test_extra_paths_are_probed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gcc"), "").unwrap();
        let mut registry = CompilerIdRegistry::new();
        let mut c = gcc(&mut registry);
        c.set_master_path("/nonexistent/toolchain");
        c.set_extra_paths(vec![dir.path().to_string_lossy().into_owned()]);
        assert!(c.is_valid(&EnvMacros::isolated()));
    }

    #[test]
    fn test_load_regex_array_only_touches_regexes() {
        let source = MemorySource::new().with_file(
            "options_gcc.xml",
            r#"<CodeBlocks_compiler_options>
                <Program name="C" value="other-gcc"/>
                <RegEx name="err" type="error" msg1="3" file="1" line="2"><![CDATA[^(.+):([0-9]+): (.*)]]></RegEx>
            </CodeBlocks_compiler_options>"#,
        );
        let runner = |_: &[String], _: Option<&Path>| -> std::io::Result<Vec<String>> { Ok(vec![]) };
        let mut registry = CompilerIdRegistry::new();
        let mut c = gcc(&mut registry);
        c.load_regex_array(&source, true, &runner).unwrap();
        assert_eq!(c.programs.c, "gcc");
        assert_eq!(c.regexes.len(), 1);

        assert_eq!(
            c.check_for_warnings_and_errors("main.c:3: oops"),
            CompilerLineType::Error
        );
        assert_eq!(c.error_filename(), "main.c");
        assert_eq!(c.error_line(), "3");
        assert_eq!(c.error(), "oops");
    }
}
