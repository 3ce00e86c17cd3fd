use super::options::{
    CompileOptions, MakeCommands, OptionsRelation, OptionsRelationType, Platforms,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetType {
    Executable = 0,
    #[default]
    ConsoleOnly = 1,
    StaticLib = 2,
    DynamicLib = 3,
    CommandsOnly = 4,
    Native = 5,
}

impl TargetType {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Executable),
            1 => Some(Self::ConsoleOnly),
            2 => Some(Self::StaticLib),
            3 => Some(Self::DynamicLib),
            4 => Some(Self::CommandsOnly),
            5 => Some(Self::Native),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Executable => "GUI application",
            Self::ConsoleOnly => "Console application",
            Self::StaticLib => "Static library",
            Self::DynamicLib => "Dynamic library",
            Self::CommandsOnly => "Commands only",
            Self::Native => "Native",
        }
    }
}

/// Which program links the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkerExecutable {
    #[default]
    AutoDetect,
    CCompiler,
    CppCompiler,
    TargetDefault,
}

impl LinkerExecutable {
    pub fn xml_name(self) -> &'static str {
        match self {
            Self::AutoDetect => "AutoDetect",
            Self::CCompiler => "CCompiler",
            Self::CppCompiler => "CppCompiler",
            Self::TargetDefault => "TargetDefault",
        }
    }

    pub fn from_xml_name(name: &str) -> Option<Self> {
        [
            Self::AutoDetect,
            Self::CCompiler,
            Self::CppCompiler,
            Self::TargetDefault,
        ]
        .into_iter()
        .find(|l| l.xml_name() == name)
    }
}

/// A named build configuration producing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub title: String,
    pub platforms: Platforms,
    pub target_type: TargetType,
    pub output_filename: String,
    pub prefix_auto: bool,
    pub extension_auto: bool,
    pub working_dir: String,
    pub object_output: String,
    pub deps_output: String,
    pub external_deps: Vec<String>,
    pub additional_output: Vec<String>,
    pub compiler_id: String,
    pub linker_executable: LinkerExecutable,
    pub use_console_runner: bool,
    pub execution_parameters: String,
    pub host_application: String,
    pub run_host_in_terminal: bool,
    pub create_def_file: bool,
    pub create_static_lib: bool,
    pub relations: [OptionsRelation; 5],
    pub scripts: Vec<String>,
    pub options: CompileOptions,
    pub make_commands: MakeCommands,
}

impl BuildTarget {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            platforms: Platforms::ALL,
            target_type: TargetType::default(),
            output_filename: String::new(),
            prefix_auto: true,
            extension_auto: true,
            working_dir: String::new(),
            object_output: String::new(),
            deps_output: String::new(),
            external_deps: Vec::new(),
            additional_output: Vec::new(),
            compiler_id: String::new(),
            linker_executable: LinkerExecutable::default(),
            use_console_runner: true,
            execution_parameters: String::new(),
            host_application: String::new(),
            run_host_in_terminal: false,
            create_def_file: false,
            create_static_lib: false,
            relations: [OptionsRelation::default(); 5],
            scripts: Vec::new(),
            options: CompileOptions::default(),
            make_commands: MakeCommands::new(),
        }
    }

    pub fn relation(&self, kind: OptionsRelationType) -> OptionsRelation {
        self.relations[kind as usize]
    }

    pub fn set_relation(&mut self, kind: OptionsRelationType, relation: OptionsRelation) {
        self.relations[kind as usize] = relation;
    }
}
