//! Loading of compiler option files (`options_<id>.xml`).
//!
//! A file is first parsed into a list of [`OptionsNode`]s, then folded into
//! the [`Compiler`] by [`apply_nodes`]. `extends="<base>"` and
//! `<Common name="X"/>` references are walked as a graph: every file is
//! visited at most once per load, and chains deeper than
//! [`MAX_INHERITANCE_DEPTH`] are cut off with a warning.
//!
//! ## Element reference
//!
//! | Element | Effect |
//! |---|---|
//! | `<Program name value>` | sets a program (`C`, `CPP`, `LD`, `LIB`, `WINDRES`, `MAKE`, `DBGconfig`) |
//! | `<Switch name value>` | sets a [`CompilerSwitches`](super::CompilerSwitches) field |
//! | `<Path add/master>` | adds an extra path or sets the master path |
//! | `<Add cflags/lflags/lib/...>` | appends to the compiler's build options |
//! | `<Category name exclusive>` | groups `<Option>` children |
//! | `<Option name option ...>` | adds a custom option |
//! | `<Command name value ext gen>` | adds a command template |
//! | `<Sort CFlags/CPPFlags>` | C-only / C++-only flags |
//! | `<Common name>` | splices in `common_<name>.xml` |
//! | `<RegEx name type msg file line>` | adds a diagnostic rule |
//! | `<if ...>` / `<else>` | conditional block |

use super::Compiler;
use super::commands::{CommandType, CompilerTool};
use super::condition::{Condition, ConditionEvaluator};
use super::diagnostics::{CompilerLineType, RegExStruct};
use super::options::CompOption;
use crate::error::CompilerError;
use crate::xml::{bool_attr, text_of};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

pub const MAX_INHERITANCE_DEPTH: usize = 5;

/// Root element of option files and common fragments.
pub const OPTIONS_ROOT: &str = "CodeBlocks_compiler_options";

/// Supplies the text of option files by file name.
pub trait OptionsSource {
    /// Reads `name` (e.g. `options_gcc.xml`). With `global_first` the global
    /// location is tried before the user one.
    fn read(&self, name: &str, global_first: bool) -> Option<String>;
}

/// Option files on disk: a per-user directory and a global one.
#[derive(Debug, Clone, Default)]
pub struct DirSource {
    pub user_dir: Option<PathBuf>,
    pub global_dir: Option<PathBuf>,
}

impl DirSource {
    pub fn new(user_dir: Option<PathBuf>, global_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            global_dir,
        }
    }
}

impl OptionsSource for DirSource {
    fn read(&self, name: &str, global_first: bool) -> Option<String> {
        let mut dirs = [self.user_dir.as_ref(), self.global_dir.as_ref()];
        if global_first {
            dirs.reverse();
        }
        dirs.into_iter()
            .flatten()
            .map(|d| d.join(name))
            .find(|p| p.is_file())
            .and_then(|p| std::fs::read_to_string(p).ok())
    }
}

/// In-memory option files, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }
}

impl OptionsSource for MemorySource {
    fn read(&self, name: &str, _global_first: bool) -> Option<String> {
        self.files.get(name).cloned()
    }
}

pub fn options_file_name(id: &str) -> String {
    format!("options_{id}.xml")
}

pub fn common_file_name(name: &str) -> String {
    format!("common_{name}.xml")
}

/// One element of an option file.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsNode {
    Program { name: String, value: String },
    Switch { name: String, value: String },
    Path(PathDecl),
    Add(AddDecl),
    Category {
        name: String,
        exclusive: bool,
        options: Vec<CompOption>,
    },
    Option(CompOption),
    Command {
        kind: CommandType,
        tool: CompilerTool,
    },
    Sort { c_flags: Vec<String>, cpp_flags: Vec<String> },
    Common(String),
    RegEx(RegExStruct),
    Conditional {
        condition: Condition,
        then: Vec<OptionsNode>,
        otherwise: Vec<OptionsNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathDecl {
    Master(String),
    Extra(String),
}

/// Additions to the compiler's own build options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddDecl {
    CompilerFlag(String),
    LinkerFlag(String),
    Lib(String),
    IncludeDir(String),
    LibDir(String),
    ResourceIncludeDir(String),
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([';', ' '])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_option(node: roxmltree::Node<'_, '_>, category: &str, exclusive: bool) -> CompOption {
    let attr = |name: &str| node.attribute(name).unwrap_or_default().to_string();
    CompOption {
        name: attr("name"),
        option: attr("option"),
        linker_option: node
            .attribute("additionalLinkerOption")
            .or_else(|| node.attribute("linkerOption"))
            .unwrap_or_default()
            .to_string(),
        additional_libs: attr("additionalLibs"),
        category: node
            .attribute("category")
            .map(str::to_string)
            .unwrap_or_else(|| category.to_string()),
        check_against: split_list(&attr("checkAgainst")),
        check_message: attr("checkMessage"),
        supersedes: split_list(&attr("supersedes")),
        exclusive: bool_attr(node, "exclusive").unwrap_or(exclusive),
        checked: bool_attr(node, "checked").unwrap_or(false),
    }
}

fn parse_index(node: roxmltree::Node<'_, '_>, name: &str) -> usize {
    node.attribute(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn parse_regex(node: roxmltree::Node<'_, '_>) -> Option<RegExStruct> {
    let line_type = match node.attribute("type") {
        Some(t) => match CompilerLineType::parse(t) {
            Some(lt) => lt,
            None => {
                log::warn!("unknown regex type '{}'", t);
                return None;
            }
        },
        None => CompilerLineType::Normal,
    };
    let pattern = text_of(node);
    Some(RegExStruct::new(
        node.attribute("name").unwrap_or_default(),
        line_type,
        pattern.trim(),
        [
            parse_index(node, "msg1"),
            parse_index(node, "msg2"),
            parse_index(node, "msg3"),
        ],
        parse_index(node, "file"),
        parse_index(node, "line"),
    ))
}

/// Converts the children of `parent` into typed nodes. Unknown elements are
/// logged and skipped.
pub fn parse_nodes(parent: roxmltree::Node<'_, '_>) -> Vec<OptionsNode> {
    let mut nodes = Vec::new();
    let mut children = parent.children().filter(|n| n.is_element()).peekable();

    while let Some(node) = children.next() {
        let attr = |name: &str| node.attribute(name).unwrap_or_default().to_string();
        match node.tag_name().name() {
            "Program" => nodes.push(OptionsNode::Program {
                name: attr("name"),
                value: attr("value"),
            }),
            "Switch" => nodes.push(OptionsNode::Switch {
                name: attr("name"),
                value: attr("value"),
            }),
            "Path" => {
                if let Some(master) = node.attribute("master") {
                    nodes.push(OptionsNode::Path(PathDecl::Master(master.to_string())));
                }
                if let Some(extra) = node.attribute("add") {
                    nodes.push(OptionsNode::Path(PathDecl::Extra(extra.to_string())));
                }
            }
            "Add" => {
                for a in node.attributes() {
                    let value = a.value().to_string();
                    let decl = match a.name() {
                        "cFlags" | "cflags" => AddDecl::CompilerFlag(value),
                        "lFlags" | "lflags" => AddDecl::LinkerFlag(value),
                        "lib" => AddDecl::Lib(value),
                        "includeDirs" => AddDecl::IncludeDir(value),
                        "libDirs" => AddDecl::LibDir(value),
                        "resIncludeDirs" => AddDecl::ResourceIncludeDir(value),
                        other => {
                            log::debug!("ignoring <Add {}>", other);
                            continue;
                        }
                    };
                    nodes.push(OptionsNode::Add(decl));
                }
            }
            "Category" => {
                let name = attr("name");
                let exclusive = bool_attr(node, "exclusive").unwrap_or(false);
                let options = node
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "Option")
                    .map(|n| parse_option(n, &name, exclusive))
                    .collect();
                nodes.push(OptionsNode::Category {
                    name,
                    exclusive,
                    options,
                });
            }
            "Option" => nodes.push(OptionsNode::Option(parse_option(node, "General", false))),
            "Command" => {
                let name = attr("name");
                let Some(kind) = CommandType::from_name(&name) else {
                    log::warn!("unknown command type '{}'", name);
                    continue;
                };
                nodes.push(OptionsNode::Command {
                    kind,
                    tool: CompilerTool {
                        command: attr("value"),
                        extensions: split_list(&attr("ext")),
                        generated_files: attr("gen")
                            .split(';')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    },
                });
            }
            "Sort" => nodes.push(OptionsNode::Sort {
                c_flags: split_list(&attr("CFlags")),
                cpp_flags: split_list(&attr("CPPFlags")),
            }),
            "Common" => nodes.push(OptionsNode::Common(attr("name"))),
            "RegEx" => {
                if let Some(rs) = parse_regex(node) {
                    nodes.push(OptionsNode::RegEx(rs));
                }
            }
            "if" => {
                let Some(condition) = Condition::from_node(node) else {
                    log::warn!("<if> without platform or exec attribute");
                    continue;
                };
                let otherwise = match children.peek() {
                    Some(next) if next.tag_name().name() == "else" => {
                        let else_node = *next;
                        children.next();
                        parse_nodes(else_node)
                    }
                    _ => Vec::new(),
                };
                nodes.push(OptionsNode::Conditional {
                    condition,
                    then: parse_nodes(node),
                    otherwise,
                });
            }
            "else" => log::warn!("<else> without a preceding <if>"),
            other => log::debug!("ignoring unknown element <{}>", other),
        }
    }

    nodes
}

/// A parsed option file.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsFile {
    pub extends: Option<String>,
    pub nodes: Vec<OptionsNode>,
}

impl OptionsFile {
    pub fn parse(name: &str, text: &str) -> Result<Self, CompilerError> {
        let doc = roxmltree::Document::parse(text).map_err(|source| CompilerError::Xml {
            file: name.to_string(),
            source,
        })?;
        let root = doc.root_element();
        if root.tag_name().name() != OPTIONS_ROOT {
            return Err(CompilerError::NotAnOptionsFile(name.to_string()));
        }
        Ok(Self {
            extends: root
                .attribute("extends")
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            nodes: parse_nodes(root),
        })
    }
}

/// Which parts of a file the reducer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Everything,
    RegexOnly,
}

/// Graph walk over option files for one load.
pub struct OptionsLoader<'a> {
    source: &'a dyn OptionsSource,
    evaluator: &'a ConditionEvaluator<'a>,
    global_first: bool,
    mode: ApplyMode,
    visited: HashSet<String>,
}

impl<'a> OptionsLoader<'a> {
    pub fn new(
        source: &'a dyn OptionsSource,
        evaluator: &'a ConditionEvaluator<'a>,
        global_first: bool,
        mode: ApplyMode,
    ) -> Self {
        Self {
            source,
            evaluator,
            global_first,
            mode,
            visited: HashSet::new(),
        }
    }

    /// Loads `options_<id>.xml` and everything it references into `compiler`.
    /// Only the top-level file is required to exist.
    pub fn load(&mut self, compiler: &mut Compiler, id: &str) -> Result<(), CompilerError> {
        let name = options_file_name(id);
        let text = self
            .source
            .read(&name, self.global_first)
            .ok_or_else(|| CompilerError::OptionsNotFound(name.clone()))?;
        let file = OptionsFile::parse(&name, &text)?;
        self.visited.insert(name);
        self.apply_file(compiler, &file, 0);
        Ok(())
    }

    fn apply_file(&mut self, compiler: &mut Compiler, file: &OptionsFile, depth: usize) {
        if let Some(base) = &file.extends {
            self.follow(compiler, &options_file_name(base), depth + 1);
        }
        let defines_regexes = has_regexes(&file.nodes);
        if defines_regexes && file.extends.is_some() {
            compiler.regexes.clear();
        }
        self.apply_nodes(compiler, &file.nodes, depth);
    }

    fn follow(&mut self, compiler: &mut Compiler, name: &str, depth: usize) {
        if depth > MAX_INHERITANCE_DEPTH {
            log::warn!("{} exceeds the maximum inheritance depth, skipped", name);
            return;
        }
        if !self.visited.insert(name.to_string()) {
            log::warn!("{} is referenced more than once (cycle?), skipped", name);
            return;
        }
        let Some(text) = self.source.read(name, self.global_first) else {
            log::warn!("options file {} not found", name);
            return;
        };
        match OptionsFile::parse(name, &text) {
            Ok(file) => self.apply_file(compiler, &file, depth),
            Err(e) => log::warn!("{}", e),
        }
    }

    fn apply_nodes(&mut self, compiler: &mut Compiler, nodes: &[OptionsNode], depth: usize) {
        for node in nodes {
            match node {
                OptionsNode::Common(name) => {
                    self.follow(compiler, &common_file_name(name), depth + 1);
                }
                OptionsNode::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    let branch = if self.evaluator.evaluate(condition) {
                        then
                    } else {
                        otherwise
                    };
                    self.apply_nodes(compiler, branch, depth);
                }
                OptionsNode::RegEx(rs) => compiler.regexes.push(rs.clone()),
                other if self.mode == ApplyMode::Everything => apply_node(compiler, other),
                _ => {}
            }
        }
    }
}

fn has_regexes(nodes: &[OptionsNode]) -> bool {
    nodes.iter().any(|n| match n {
        OptionsNode::RegEx(_) => true,
        OptionsNode::Conditional {
            then, otherwise, ..
        } => has_regexes(then) || has_regexes(otherwise),
        _ => false,
    })
}

/// Applies a single leaf node to `compiler`.
pub fn apply_node(compiler: &mut Compiler, node: &OptionsNode) {
    match node {
        OptionsNode::Program { name, value } => {
            if !compiler.programs.set(name, value) {
                log::warn!("unknown program '{}' in compiler {}", name, compiler.id());
            }
        }
        OptionsNode::Switch { name, value } => {
            if !compiler.switches.set(name, value) {
                log::warn!("invalid switch {}='{}' in compiler {}", name, value, compiler.id());
            }
        }
        OptionsNode::Path(PathDecl::Master(path)) => compiler.master_path = path.clone(),
        OptionsNode::Path(PathDecl::Extra(path)) => {
            if !compiler.extra_paths.contains(path) {
                compiler.extra_paths.push(path.clone());
            }
        }
        OptionsNode::Add(decl) => {
            let (list, value) = match decl {
                AddDecl::CompilerFlag(v) => (&mut compiler.options.compiler_options, v),
                AddDecl::LinkerFlag(v) => (&mut compiler.options.linker_options, v),
                AddDecl::Lib(v) => (&mut compiler.options.link_libs, v),
                AddDecl::IncludeDir(v) => (&mut compiler.options.include_dirs, v),
                AddDecl::LibDir(v) => (&mut compiler.options.lib_dirs, v),
                AddDecl::ResourceIncludeDir(v) => (&mut compiler.options.resource_include_dirs, v),
            };
            if !list.contains(value) {
                list.push(value.clone());
            }
        }
        OptionsNode::Category { options, .. } => {
            for option in options {
                compiler.custom_options.add(option.clone());
            }
        }
        OptionsNode::Option(option) => compiler.custom_options.add(option.clone()),
        OptionsNode::Command { kind, tool } => compiler.commands.add(*kind, tool.clone()),
        OptionsNode::Sort { c_flags, cpp_flags } => {
            for flag in c_flags {
                if !compiler.c_only_flags.contains(flag) {
                    compiler.c_only_flags.push(flag.clone());
                }
            }
            for flag in cpp_flags {
                if !compiler.cpp_only_flags.contains(flag) {
                    compiler.cpp_only_flags.push(flag.clone());
                }
            }
        }
        OptionsNode::RegEx(rs) => compiler.regexes.push(rs.clone()),
        OptionsNode::Common(_) | OptionsNode::Conditional { .. } => {
            log::debug!("structural node reached apply_node, ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerIdRegistry;
    use std::path::Path;

    fn no_exec(_: &[String], _: Option<&Path>) -> std::io::Result<Vec<String>> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "disabled"))
    }

    fn compiler(id: &str) -> Compiler {
        let mut registry = CompilerIdRegistry::new();
        Compiler::new("Test", id, &mut registry).unwrap()
    }

    #[test]
    fn test_parse_typed_nodes() {
        let file = OptionsFile::parse(
            "options_x.xml",
            r#"<CodeBlocks_compiler_options extends="gcc">
                <Program name="C" value="clang"/>
                <Category name="Warnings" exclusive="true">
                    <Option name="all" option="-Wall"/>
                </Category>
                <if platform="windows"><Switch name="objectExtension" value="obj"/></if>
                <else><Switch name="objectExtension" value="o"/></else>
                <Common name="sort"/>
            </CodeBlocks_compiler_options>"#,
        )
        .unwrap();
        assert_eq!(file.extends.as_deref(), Some("gcc"));
        assert_eq!(file.nodes.len(), 4);
        match &file.nodes[1] {
            OptionsNode::Category { options, .. } => {
                assert_eq!(options[0].category, "Warnings");
                assert!(options[0].exclusive);
            }
            other => panic!("unexpected node {other:?}"),
        }
        assert!(matches!(&file.nodes[2], OptionsNode::Conditional { otherwise, .. } if otherwise.len() == 1));
        assert_eq!(file.nodes[3], OptionsNode::Common("sort".into()));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(matches!(
            OptionsFile::parse("options_x.xml", "<Something/>"),
            Err(CompilerError::NotAnOptionsFile(_))
        ));
    }

    #[test]
    fn test_extends_and_common() {
        let source = MemorySource::new()
            .with_file(
                "options_gcc.xml",
                r#"<CodeBlocks_compiler_options>
                    <Program name="C" value="gcc"/>
                    <Program name="CPP" value="g++"/>
                    <Common name="sort"/>
                </CodeBlocks_compiler_options>"#,
            )
            .with_file(
                "common_sort.xml",
                r#"<CodeBlocks_compiler_options><Sort CFlags="-std=c99"/></CodeBlocks_compiler_options>"#,
            )
            .with_file(
                "options_clang.xml",
                r#"<CodeBlocks_compiler_options extends="gcc">
                    <Program name="C" value="clang"/>
                </CodeBlocks_compiler_options>"#,
            );
        let mut c = compiler("clang");
        let runner = no_exec;
        let eval = ConditionEvaluator::new(&runner);
        OptionsLoader::new(&source, &eval, false, ApplyMode::Everything)
            .load(&mut c, "clang")
            .unwrap();
        assert_eq!(c.programs.c, "clang");
        assert_eq!(c.programs.cpp, "g++");
        assert_eq!(c.c_only_flags, vec!["-std=c99"]);
    }

    #[test]
    fn test_extends_cycle_terminates() {
        let source = MemorySource::new()
            .with_file(
                "options_a.xml",
                r#"<CodeBlocks_compiler_options extends="b"><Program name="LD" value="a-ld"/></CodeBlocks_compiler_options>"#,
            )
            .with_file(
                "options_b.xml",
                r#"<CodeBlocks_compiler_options extends="a"><Program name="LIB" value="b-ar"/></CodeBlocks_compiler_options>"#,
            );
        let mut c = compiler("a");
        let runner = no_exec;
        let eval = ConditionEvaluator::new(&runner);
        OptionsLoader::new(&source, &eval, false, ApplyMode::Everything)
            .load(&mut c, "a")
            .unwrap();
        assert_eq!(c.programs.ld, "a-ld");
        assert_eq!(c.programs.lib, "b-ar");
    }

    #[test]
    fn test_depth_cap() {
        let mut source = MemorySource::new();
        for i in 0..8 {
            source = source.with_file(
                options_file_name(&format!("l{i}")),
                format!(
                    r#"<CodeBlocks_compiler_options extends="l{}"><Path add="/p{}"/></CodeBlocks_compiler_options>"#,
                    i + 1,
                    i
                ),
            );
        }
        let mut c = compiler("l0");
        let runner = no_exec;
        let eval = ConditionEvaluator::new(&runner);
        OptionsLoader::new(&source, &eval, false, ApplyMode::Everything)
            .load(&mut c, "l0")
            .unwrap();
        assert_eq!(c.extra_paths.len(), MAX_INHERITANCE_DEPTH + 1);
    }

    #[test]
    fn test_missing_file() {
        let mut c = compiler("nope");
        let runner = no_exec;
        let eval = ConditionEvaluator::new(&runner);
        let err = OptionsLoader::new(&MemorySource::new(), &eval, false, ApplyMode::Everything)
            .load(&mut c, "nope")
            .unwrap_err();
        assert!(matches!(err, CompilerError::OptionsNotFound(_)));
    }
}
