//! Persisting a compiler's user overrides.
//!
//! The first [`Compiler::load_settings`] call snapshots the current state
//! (normally the freshly loaded defaults) into a mirror. Saving deletes the
//! compiler's subtree and writes each field only when it differs from that
//! mirror, so the store holds just the user's customizations.
//!
//! ## Layout below `/user_sets/<id>`
//!
//! ```text
//! name, parent                         always written
//! compiler_options, linker_options ... string lists
//! custom_variables/count, custom_variables/<n>/{name,value}
//! master_path, extra_paths
//! programs/{c,cpp,ld,lib,res,make,dbgconfig}
//! switches/<switchName>
//! commands/<CommandType>/count, commands/<CommandType>/<n>/{command,extensions,generated_files}
//! regex/count, regex/<n>/{name,type,pattern,msg1,msg2,msg3,filename,line}
//! c_only_flags, cpp_only_flags
//! checked_options
//! multi_line_messages
//! ```

use super::diagnostics::{CompilerLineType, RegExStruct};
use super::{CommandTable, CommandType, Compiler, CompilerSwitches, CompilerTool, Programs};
use crate::config::ConfigStore;
use crate::project::CompileOptions;

const USER_SETS: &str = "/user_sets";
const LEGACY_SETS: &str = "/sets";

const PROGRAM_KEYS: [(&str, &str); 7] = [
    ("C", "c"),
    ("CPP", "cpp"),
    ("LD", "ld"),
    ("LIB", "lib"),
    ("WINDRES", "res"),
    ("MAKE", "make"),
    ("DBGconfig", "dbgconfig"),
];

/// Snapshot of every persisted field.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Mirror {
    options: CompileOptions,
    master_path: String,
    extra_paths: Vec<String>,
    programs: Programs,
    switches: CompilerSwitches,
    commands: CommandTable,
    regexes: Vec<RegExStruct>,
    c_only_flags: Vec<String>,
    cpp_only_flags: Vec<String>,
    checked_options: Vec<String>,
    multi_line_messages: bool,
}

impl Mirror {
    fn of(c: &Compiler) -> Self {
        Self {
            options: c.options.clone(),
            master_path: c.master_path.clone(),
            extra_paths: c.extra_paths.clone(),
            programs: c.programs.clone(),
            switches: c.switches.clone(),
            commands: c.commands.clone(),
            regexes: c.regexes.clone(),
            c_only_flags: c.c_only_flags.clone(),
            cpp_only_flags: c.cpp_only_flags.clone(),
            checked_options: c.custom_options.checked_names(),
            multi_line_messages: c.multi_line_messages,
        }
    }
}

/// True when there is no mirror or the mirrored value differs.
fn differs<T: PartialEq + ?Sized>(mirrored: Option<&T>, current: &T) -> bool {
    mirrored != Some(current)
}

const OPTION_LIST_KEYS: [&str; 9] = [
    "compiler_options",
    "resource_compiler_options",
    "linker_options",
    "include_dirs",
    "res_include_dirs",
    "library_dirs",
    "libraries",
    "commands_before",
    "commands_after",
];

/// The string-list fields of [`CompileOptions`], in `OPTION_LIST_KEYS` order.
fn option_lists(options: &CompileOptions) -> [(&'static str, &Vec<String>); 9] {
    [
        (OPTION_LIST_KEYS[0], &options.compiler_options),
        (OPTION_LIST_KEYS[1], &options.resource_compiler_options),
        (OPTION_LIST_KEYS[2], &options.linker_options),
        (OPTION_LIST_KEYS[3], &options.include_dirs),
        (OPTION_LIST_KEYS[4], &options.resource_include_dirs),
        (OPTION_LIST_KEYS[5], &options.lib_dirs),
        (OPTION_LIST_KEYS[6], &options.link_libs),
        (OPTION_LIST_KEYS[7], &options.commands_before_build),
        (OPTION_LIST_KEYS[8], &options.commands_after_build),
    ]
}

fn option_list_mut<'a>(options: &'a mut CompileOptions, key: &str) -> Option<&'a mut Vec<String>> {
    let list = match key {
        "compiler_options" => &mut options.compiler_options,
        "resource_compiler_options" => &mut options.resource_compiler_options,
        "linker_options" => &mut options.linker_options,
        "include_dirs" => &mut options.include_dirs,
        "res_include_dirs" => &mut options.resource_include_dirs,
        "library_dirs" => &mut options.lib_dirs,
        "libraries" => &mut options.link_libs,
        "commands_before" => &mut options.commands_before_build,
        "commands_after" => &mut options.commands_after_build,
        _ => return None,
    };
    Some(list)
}

impl Compiler {
    fn settings_path(&self) -> String {
        format!("{USER_SETS}/{}", self.id)
    }

    /// Takes the mirror (first call only), then applies the overrides stored
    /// under `/user_sets/<id>`, or the legacy `/sets/<id>`.
    pub fn load_settings(&mut self, store: &ConfigStore) {
        if self.mirror.is_none() {
            self.mirror = Some(Box::new(Mirror::of(self)));
        }

        let base = [USER_SETS, LEGACY_SETS]
            .iter()
            .map(|root| format!("{root}/{}", self.id))
            .find(|path| store.exists(path));
        let Some(base) = base else {
            log::debug!("no stored settings for compiler {}", self.id);
            return;
        };
        let key = |name: &str| format!("{base}/{name}");

        if let Some(name) = store.read_string(&key("name")) {
            self.name = name;
        }
        if let Some(parent) = store.read_string(&key("parent")) {
            self.parent_id = parent;
        }

        for name in OPTION_LIST_KEYS {
            if let Some(values) = store.read_list(&key(name))
                && let Some(list) = option_list_mut(&mut self.options, name)
            {
                *list = values;
            }
        }
        if let Some(always) = store.read_bool(&key("always_run_post_build")) {
            self.options.always_run_post_build = always;
        }
        if let Some(count) = store.read_int(&key("custom_variables/count")) {
            self.options.vars.clear();
            for n in 0..count {
                let entry = |field: &str| store.read_string(&key(&format!("custom_variables/{n}/{field}")));
                if let (Some(name), Some(value)) = (entry("name"), entry("value")) {
                    self.options.vars.insert(name, value);
                }
            }
        }

        if let Some(master) = store.read_string(&key("master_path")) {
            self.set_master_path(master);
        }
        if let Some(extra) = store.read_list(&key("extra_paths")) {
            self.set_extra_paths(extra);
        }

        for (program, short) in PROGRAM_KEYS {
            if let Some(value) = store.read_string(&key(&format!("programs/{short}"))) {
                self.programs.set(program, &value);
            }
        }

        for name in CompilerSwitches::NAMES {
            if let Some(value) = store.read_string(&key(&format!("switches/{name}")))
                && !self.switches.set(name, &value)
            {
                log::warn!("ignoring stored switch {}='{}'", name, value);
            }
        }

        for kind in CommandType::ALL {
            let cmd_base = key(&format!("commands/{}", kind.name()));
            let Some(count) = store.read_int(&format!("{cmd_base}/count")) else {
                continue;
            };
            let tools = (0..count.max(0))
                .map(|i| CompilerTool {
                    command: store
                        .read_string(&format!("{cmd_base}/{i}/command"))
                        .unwrap_or_default(),
                    extensions: store
                        .read_list(&format!("{cmd_base}/{i}/extensions"))
                        .unwrap_or_default(),
                    generated_files: store
                        .read_list(&format!("{cmd_base}/{i}/generated_files"))
                        .unwrap_or_default(),
                })
                .collect();
            self.commands.set(kind, tools);
        }

        if let Some(count) = store.read_int(&key("regex/count")) {
            self.regexes = (0..count.max(0))
                .map(|i| read_regex(store, &key(&format!("regex/{i}"))))
                .collect();
        }

        if let Some(flags) = store.read_list(&key("c_only_flags")) {
            self.c_only_flags = flags;
        }
        if let Some(flags) = store.read_list(&key("cpp_only_flags")) {
            self.cpp_only_flags = flags;
        }
        if let Some(checked) = store.read_list(&key("checked_options")) {
            let names: Vec<String> = self.custom_options.iter().map(|o| o.name.clone()).collect();
            for name in names {
                self.custom_options.set_checked(&name, checked.contains(&name));
            }
        }
        if let Some(multi) = store.read_bool(&key("multi_line_messages")) {
            self.multi_line_messages = multi;
        }
    }

    /// Writes the fields that differ from the mirror. Without a mirror every
    /// field is written.
    pub fn save_settings(&self, store: &mut ConfigStore) {
        let base = self.settings_path();
        store.delete_sub_path(&base);
        let key = |name: &str| format!("{base}/{name}");
        let mirror = self.mirror.as_deref();

        store.write(&key("name"), &self.name);
        store.write(&key("parent"), &self.parent_id);

        let mirrored_lists = mirror.map(|m| option_lists(&m.options));
        for (i, (name, list)) in option_lists(&self.options).into_iter().enumerate() {
            if differs(mirrored_lists.as_ref().map(|m| m[i].1), list) {
                store.write(&key(name), list.as_slice());
            }
        }
        if differs(
            mirror.map(|m| &m.options.always_run_post_build),
            &self.options.always_run_post_build,
        ) {
            store.write(&key("always_run_post_build"), self.options.always_run_post_build);
        }
        // Written as a whole so removed defaults stay removed.
        if differs(mirror.map(|m| &m.options.vars), &self.options.vars) {
            store.write(
                &key("custom_variables/count"),
                self.options.vars.len() as i64,
            );
            for (n, (name, value)) in self.options.vars.iter().enumerate() {
                store.write(&key(&format!("custom_variables/{n}/name")), name);
                store.write(&key(&format!("custom_variables/{n}/value")), value);
            }
        }

        if differs(mirror.map(|m| &m.master_path), &self.master_path) {
            store.write(&key("master_path"), &self.master_path);
        }
        if differs(mirror.map(|m| &m.extra_paths), &self.extra_paths) {
            store.write(&key("extra_paths"), self.extra_paths.as_slice());
        }

        for (program, short) in PROGRAM_KEYS {
            let current = self.programs.get(program).unwrap_or_default();
            if differs(mirror.and_then(|m| m.programs.get(program)), current) {
                store.write(&key(&format!("programs/{short}")), current);
            }
        }

        for name in CompilerSwitches::NAMES {
            let current = self.switches.get(name).unwrap_or_default();
            if differs(mirror.and_then(|m| m.switches.get(name)).as_ref(), &current) {
                store.write(&key(&format!("switches/{name}")), current);
            }
        }

        for kind in CommandType::ALL {
            let tools = self.commands.tools(kind);
            if !differs(mirror.map(|m| m.commands.tools(kind)), tools) {
                continue;
            }
            let cmd_base = key(&format!("commands/{}", kind.name()));
            store.write(&format!("{cmd_base}/count"), tools.len() as i64);
            for (i, tool) in tools.iter().enumerate() {
                store.write(&format!("{cmd_base}/{i}/command"), &tool.command);
                if !tool.extensions.is_empty() {
                    store.write(&format!("{cmd_base}/{i}/extensions"), tool.extensions.as_slice());
                }
                if !tool.generated_files.is_empty() {
                    store.write(
                        &format!("{cmd_base}/{i}/generated_files"),
                        tool.generated_files.as_slice(),
                    );
                }
            }
        }

        if differs(mirror.map(|m| m.regexes.as_slice()), self.regexes.as_slice()) {
            store.write(&key("regex/count"), self.regexes.len() as i64);
            for (i, rs) in self.regexes.iter().enumerate() {
                write_regex(store, &key(&format!("regex/{i}")), rs);
            }
        }

        if differs(mirror.map(|m| &m.c_only_flags), &self.c_only_flags) {
            store.write(&key("c_only_flags"), self.c_only_flags.as_slice());
        }
        if differs(mirror.map(|m| &m.cpp_only_flags), &self.cpp_only_flags) {
            store.write(&key("cpp_only_flags"), self.cpp_only_flags.as_slice());
        }
        let checked = self.custom_options.checked_names();
        if differs(mirror.map(|m| &m.checked_options), &checked) {
            store.write(&key("checked_options"), checked);
        }
        if differs(mirror.map(|m| &m.multi_line_messages), &self.multi_line_messages) {
            store.write(&key("multi_line_messages"), self.multi_line_messages);
        }
    }

    /// Restores the mirrored defaults. Returns `false` if no mirror exists.
    pub fn reset_to_mirror(&mut self) -> bool {
        let Some(m) = self.mirror.as_deref().cloned() else {
            return false;
        };
        self.options = m.options;
        self.set_master_path(m.master_path);
        self.set_extra_paths(m.extra_paths);
        self.programs = m.programs;
        self.switches = m.switches;
        self.commands = m.commands;
        self.regexes = m.regexes;
        self.c_only_flags = m.c_only_flags;
        self.cpp_only_flags = m.cpp_only_flags;
        let names: Vec<String> = self.custom_options.iter().map(|o| o.name.clone()).collect();
        for name in names {
            self.custom_options
                .set_checked(&name, m.checked_options.contains(&name));
        }
        self.multi_line_messages = m.multi_line_messages;
        true
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }
}

fn write_regex(store: &mut ConfigStore, base: &str, rs: &RegExStruct) {
    store.write(&format!("{base}/name"), &rs.desc);
    store.write(&format!("{base}/type"), rs.line_type.name());
    store.write(&format!("{base}/pattern"), rs.pattern());
    for (i, index) in rs.msg.iter().enumerate() {
        store.write(&format!("{base}/msg{}", i + 1), *index as i64);
    }
    store.write(&format!("{base}/filename"), rs.filename as i64);
    store.write(&format!("{base}/line"), rs.line as i64);
}

fn read_regex(store: &ConfigStore, base: &str) -> RegExStruct {
    let index = |name: &str| {
        store
            .read_int(&format!("{base}/{name}"))
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(0)
    };
    RegExStruct::new(
        store.read_string(&format!("{base}/name")).unwrap_or_default(),
        store
            .read_string(&format!("{base}/type"))
            .and_then(|t| CompilerLineType::parse(&t))
            .unwrap_or_default(),
        store.read_string(&format!("{base}/pattern")).unwrap_or_default(),
        [index("msg1"), index("msg2"), index("msg3")],
        index("filename"),
        index("line"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompOption, CompilerIdRegistry};

    fn loaded_compiler(registry: &mut CompilerIdRegistry) -> Compiler {
        let mut c = Compiler::new("GNU GCC Compiler", "gcc", registry).unwrap();
        c.programs.c = "gcc".into();
        c.programs.cpp = "g++".into();
        c.commands
            .add(CommandType::CompileObject, CompilerTool::new("$compiler -c $file"));
        c.regexes.push(RegExStruct::new(
            "err",
            CompilerLineType::Error,
            r"^(.+):(\d+): (.*)$",
            [3, 0, 0],
            1,
            2,
        ));
        c.custom_options.add(CompOption {
            name: "wall".into(),
            option: "-Wall".into(),
            category: "Warnings".into(),
            ..Default::default()
        });
        c
    }

    #[test]
    fn test_unchanged_compiler_writes_only_identity() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.save_settings(&mut store);
        let mut keys: Vec<&str> = store.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["/user_sets/gcc/name", "/user_sets/gcc/parent"]);
    }

    #[test]
    fn test_single_change_writes_single_field() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.switches.set("objectExtension", "obj");
        c.save_settings(&mut store);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.read_string("/user_sets/gcc/switches/objectExtension").as_deref(),
            Some("obj")
        );
    }

    #[test]
    fn test_save_then_load_restores_overrides() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.programs.c = "gcc-12".into();
        c.options.include_dirs.push("/opt/include".into());
        c.regexes.clear();
        c.commands.clear(CommandType::CompileObject);
        c.custom_options.set_checked("wall", true);
        c.save_settings(&mut store);
        // Stale keys disappear on the next save.
        store.write("/user_sets/gcc/switches/bogus", "x");
        c.save_settings(&mut store);
        assert!(!store.exists("/user_sets/gcc/switches/bogus"));

        let mut other = CompilerIdRegistry::new();
        let mut fresh = loaded_compiler(&mut other);
        fresh.load_settings(&store);
        assert_eq!(fresh.programs.c, "gcc-12");
        assert_eq!(fresh.options.include_dirs, vec!["/opt/include"]);
        assert!(fresh.regexes.is_empty());
        assert!(fresh.commands.tools(CommandType::CompileObject).is_empty());
        assert_eq!(fresh.custom_options.checked_names(), vec!["wall"]);

        assert!(fresh.reset_to_mirror());
        assert_eq!(fresh.programs.c, "gcc");
        assert_eq!(fresh.regexes.len(), 1);
    }

    #[test]
    fn test_removed_custom_variable_stays_removed() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        c.options.vars.insert("FOO".into(), "1".into());
        c.options.vars.insert("BAR".into(), "2".into());
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.options.vars.remove("FOO");
        c.save_settings(&mut store);
        assert_eq!(store.read_int("/user_sets/gcc/custom_variables/count"), Some(1));

        let mut other = CompilerIdRegistry::new();
        let mut fresh = loaded_compiler(&mut other);
        fresh.options.vars.insert("FOO".into(), "1".into());
        fresh.options.vars.insert("BAR".into(), "2".into());
        fresh.load_settings(&store);
        assert_eq!(fresh.options.vars.len(), 1);
        assert_eq!(fresh.options.vars.get("BAR").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_unchanged_custom_variables_are_not_written() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        c.options.vars.insert("FOO".into(), "1".into());
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.save_settings(&mut store);
        assert!(!store.exists("/user_sets/gcc/custom_variables/count"));
    }

    #[test]
    fn test_legacy_sets_path_is_read() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        let mut store = ConfigStore::new();
        store.write("/sets/gcc/programs/make", "mingw32-make");
        c.load_settings(&store);
        assert_eq!(c.programs.make, "mingw32-make");
    }

    #[test]
    fn test_regex_order_change_is_saved() {
        let mut registry = CompilerIdRegistry::new();
        let mut c = loaded_compiler(&mut registry);
        c.regexes.push(RegExStruct::new(
            "warn",
            CompilerLineType::Warning,
            "warning",
            [0, 0, 0],
            0,
            0,
        ));
        let mut store = ConfigStore::new();
        c.load_settings(&store);
        c.regexes.swap(0, 1);
        c.save_settings(&mut store);
        assert_eq!(store.read_int("/user_sets/gcc/regex/count"), Some(2));
        assert_eq!(store.read_string("/user_sets/gcc/regex/0/name").as_deref(), Some("warn"));
    }
}
