//! Build command templates.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandType {
    CompileObject,
    GenDependencies,
    CompileResource,
    LinkExe,
    LinkConsoleExe,
    LinkDynamic,
    LinkStatic,
    LinkNative,
}

impl CommandType {
    pub const ALL: [CommandType; 8] = [
        Self::CompileObject,
        Self::GenDependencies,
        Self::CompileResource,
        Self::LinkExe,
        Self::LinkConsoleExe,
        Self::LinkDynamic,
        Self::LinkStatic,
        Self::LinkNative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CompileObject => "CompileObject",
            Self::GenDependencies => "GenDependencies",
            Self::CompileResource => "CompileResource",
            Self::LinkExe => "LinkExe",
            Self::LinkConsoleExe => "LinkConsoleExe",
            Self::LinkDynamic => "LinkDynamic",
            Self::LinkStatic => "LinkStatic",
            Self::LinkNative => "LinkNative",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One command template, optionally restricted to some source extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerTool {
    pub command: String,
    /// Extensions this tool applies to; empty means "any file".
    pub extensions: Vec<String>,
    pub generated_files: Vec<String>,
}

impl CompilerTool {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.extensions.is_empty()
    }

    fn same_extensions(&self, other: &[String]) -> bool {
        let mut mine: Vec<String> = self.extensions.iter().map(|e| e.to_lowercase()).collect();
        let mut theirs: Vec<String> = other.iter().map(|e| e.to_lowercase()).collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    tools: BTreeMap<CommandType, Vec<CompilerTool>>,
}

impl CommandTable {
    pub fn tools(&self, kind: CommandType) -> &[CompilerTool] {
        self.tools.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds a tool. A tool with the same extension set replaces the existing
    /// one, so each command type keeps at most one catch-all entry.
    pub fn add(&mut self, kind: CommandType, tool: CompilerTool) {
        let tools = self.tools.entry(kind).or_default();
        match tools.iter_mut().find(|t| t.same_extensions(&tool.extensions)) {
            Some(existing) => *existing = tool,
            None => tools.push(tool),
        }
    }

    pub fn set(&mut self, kind: CommandType, tools: Vec<CompilerTool>) {
        if tools.is_empty() {
            self.tools.remove(&kind);
        } else {
            self.tools.insert(kind, tools);
        }
    }

    pub fn clear(&mut self, kind: CommandType) {
        self.tools.remove(&kind);
    }

    /// Picks the tool for a file extension: an exact extension match first,
    /// otherwise the catch-all entry.
    pub fn tool_for(&self, kind: CommandType, extension: &str) -> Option<&CompilerTool> {
        let tools = self.tools(kind);
        tools
            .iter()
            .find(|t| t.extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)))
            .or_else(|| tools.iter().find(|t| t.is_catch_all()))
    }
}
