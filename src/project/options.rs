use std::collections::BTreeMap;

/// Build options shared by projects, build targets and compilers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub compiler_options: Vec<String>,
    pub resource_compiler_options: Vec<String>,
    pub linker_options: Vec<String>,
    pub include_dirs: Vec<String>,
    pub resource_include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub link_libs: Vec<String>,
    pub commands_before_build: Vec<String>,
    pub commands_after_build: Vec<String>,
    pub always_run_post_build: bool,
    pub vars: BTreeMap<String, String>,
}

impl CompileOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a target combines one option category with its project's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionsRelation {
    UseParentOnly = 0,
    UseTargetOnly = 1,
    PrependToParent = 2,
    #[default]
    AppendToParent = 3,
}

impl OptionsRelation {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::UseParentOnly),
            1 => Some(Self::UseTargetOnly),
            2 => Some(Self::PrependToParent),
            3 => Some(Self::AppendToParent),
            _ => None,
        }
    }

    /// Merges `parent` and `target` values according to the relation.
    pub fn combine(self, parent: &[String], target: &[String]) -> Vec<String> {
        match self {
            Self::UseParentOnly => parent.to_vec(),
            Self::UseTargetOnly => target.to_vec(),
            Self::PrependToParent => target.iter().chain(parent).cloned().collect(),
            Self::AppendToParent => parent.iter().chain(target).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionsRelationType {
    Compiler = 0,
    Linker = 1,
    IncludeDirs = 2,
    LibDirs = 3,
    ResourceIncludeDirs = 4,
}

impl OptionsRelationType {
    pub const ALL: [OptionsRelationType; 5] = [
        Self::Compiler,
        Self::Linker,
        Self::IncludeDirs,
        Self::LibDirs,
        Self::ResourceIncludeDirs,
    ];

    /// Attribute name used in the project file.
    pub fn xml_name(self) -> &'static str {
        match self {
            Self::Compiler => "projectCompilerOptionsRelation",
            Self::Linker => "projectLinkerOptionsRelation",
            Self::IncludeDirs => "projectIncludeDirsRelation",
            Self::LibDirs => "projectLibDirsRelation",
            Self::ResourceIncludeDirs => "projectResourceIncludeDirsRelation",
        }
    }
}

/// Commands used when the project is built by a custom makefile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MakeCommand {
    Build,
    CompileFile,
    Clean,
    DistClean,
    AskRebuildNeeded,
    SilentBuild,
}

impl MakeCommand {
    pub const ALL: [MakeCommand; 6] = [
        Self::Build,
        Self::CompileFile,
        Self::Clean,
        Self::DistClean,
        Self::AskRebuildNeeded,
        Self::SilentBuild,
    ];

    pub fn xml_name(self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::CompileFile => "CompileFile",
            Self::Clean => "Clean",
            Self::DistClean => "DistClean",
            Self::AskRebuildNeeded => "AskRebuildNeeded",
            Self::SilentBuild => "SilentBuild",
        }
    }

    pub fn from_xml_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.xml_name() == name)
    }
}

pub type MakeCommands = BTreeMap<MakeCommand, String>;

/// Platform bitmask (`<Option platforms="Windows;Unix;"/>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platforms(pub u16);

impl Platforms {
    pub const WINDOWS: u16 = 0x0001;
    pub const UNIX: u16 = 0x0002;
    pub const MAC: u16 = 0x0004;
    pub const ALL: Platforms = Platforms(0x00ff);

    const NAMES: [(u16, &'static str); 3] = [
        (Self::WINDOWS, "Windows"),
        (Self::UNIX, "Unix"),
        (Self::MAC, "Mac"),
    ];

    pub fn is_all(self) -> bool {
        self.0 & Self::ALL.0 == Self::ALL.0
    }

    pub fn parse(text: &str) -> Self {
        let mut bits = 0u16;
        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Self::ALL;
            }
            if let Some((bit, _)) = Self::NAMES.iter().find(|(_, n)| n.eq_ignore_ascii_case(part)) {
                bits |= bit;
            }
        }
        if bits == 0 { Self::ALL } else { Platforms(bits) }
    }

    pub fn to_xml(self) -> String {
        if self.is_all() {
            return "All".to_string();
        }
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| format!("{name};"))
            .collect()
    }
}

impl Default for Platforms {
    fn default() -> Self {
        Self::ALL
    }
}
