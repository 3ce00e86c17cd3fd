use super::{
    FileVersion, LEGACY_ROOT_ELEMENT, LoadNotice, LoadObserver, ProjectLoaderHook, ROOT_ELEMENT,
    SilentObserver, format_changes,
};
use crate::compiler::{CompilerIdRegistry, CompilerSwitches};
use crate::error::ProjectError;
use crate::paths::unix_filename;
use crate::project::{
    BuildTarget, CompileOptions, CustomBuild, GlobId, INVALID_GLOB_ID, LinkerExecutable,
    MakeCommand, MakeCommands, OptionsRelation, OptionsRelationType, PchMode, Platforms, Project,
    TargetType,
};
use crate::xml::{XmlElement, bool_attr, child_elements, first_child, int_attr, text_of};
use roxmltree::Node;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// First `<Option>` child of `node` carrying `attr`.
fn option<'a>(node: Node<'a, '_>, attr: &str) -> Option<&'a str> {
    child_elements(node, "Option").find_map(|o| o.attribute(attr))
}

fn option_node<'a, 'input>(node: Node<'a, 'input>, attr: &str) -> Option<Node<'a, 'input>> {
    child_elements(node, "Option").find(|o| o.has_attribute(attr))
}

fn option_bool(node: Node<'_, '_>, attr: &str) -> Option<bool> {
    option_node(node, attr).and_then(|o| bool_attr(o, attr))
}

fn option_int(node: Node<'_, '_>, attr: &str) -> Option<i64> {
    option_node(node, attr).and_then(|o| int_attr(o, attr))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Collects `<Add attr="...">` values of the `section` child of `node`.
fn adds<'a>(node: Node<'a, '_>, section: &str, attr: &str) -> Vec<&'a str> {
    child_elements(node, section)
        .flat_map(|s| child_elements(s, "Add"))
        .filter_map(|a| a.attribute(attr))
        .collect()
}

fn read_compile_options(node: Node<'_, '_>, opts: &mut CompileOptions) {
    for v in adds(node, "Compiler", "option") {
        push_unique(&mut opts.compiler_options, v);
    }
    for v in adds(node, "Compiler", "directory") {
        push_unique(&mut opts.include_dirs, v);
    }
    for v in adds(node, "ResourceCompiler", "option") {
        push_unique(&mut opts.resource_compiler_options, v);
    }
    for v in adds(node, "ResourceCompiler", "directory") {
        push_unique(&mut opts.resource_include_dirs, v);
    }
    for v in adds(node, "Linker", "option") {
        push_unique(&mut opts.linker_options, v);
    }
    for v in adds(node, "Linker", "library") {
        push_unique(&mut opts.link_libs, v);
    }
    for v in adds(node, "Linker", "directory") {
        push_unique(&mut opts.lib_dirs, v);
    }
    // Pre-1.1 layout.
    for v in adds(node, "IncludeDirs", "directory") {
        push_unique(&mut opts.include_dirs, v);
    }
    for v in adds(node, "LibDirs", "directory") {
        push_unique(&mut opts.lib_dirs, v);
    }

    for v in adds(node, "ExtraCommands", "before") {
        opts.commands_before_build.push(v.to_string());
    }
    for v in adds(node, "ExtraCommands", "after") {
        opts.commands_after_build.push(v.to_string());
    }
    if child_elements(node, "ExtraCommands")
        .flat_map(|e| child_elements(e, "Mode"))
        .any(|m| m.attribute("after") == Some("always"))
    {
        opts.always_run_post_build = true;
    }

    for var in child_elements(node, "Environment").flat_map(|e| child_elements(e, "Variable")) {
        if let Some(name) = var.attribute("name")
            && !name.is_empty()
        {
            opts.vars
                .insert(name.to_string(), var.attribute("value").unwrap_or_default().to_string());
        }
    }
}

fn read_make_commands(node: Node<'_, '_>) -> MakeCommands {
    let mut commands = MakeCommands::new();
    if let Some(mc) = first_child(node, "MakeCommands") {
        for cmd in mc.children().filter(|n| n.is_element()) {
            if let Some(kind) = MakeCommand::from_xml_name(cmd.tag_name().name()) {
                commands.insert(kind, cmd.attribute("command").unwrap_or_default().to_string());
            }
        }
    }
    commands
}

fn scripts(node: Node<'_, '_>) -> Vec<String> {
    child_elements(node, "Script")
        .filter_map(|s| s.attribute("file"))
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads `.cbp` files into [`Project`]s.
///
/// ```no_run
/// use cbproject::loader::ProjectLoader;
///
/// let project = ProjectLoader::new().open(std::path::Path::new("hello.cbp"))?;
/// println!("{} targets", project.targets().len());
/// # Ok::<(), cbproject::error::ProjectError>(())
/// ```
pub struct ProjectLoader<'a> {
    observer: Option<&'a mut dyn LoadObserver>,
    silent: SilentObserver,
    registry: Option<&'a CompilerIdRegistry>,
    hooks: Vec<&'a dyn ProjectLoaderHook>,
    link_switches: CompilerSwitches,
    rescan_globs: bool,
    compiler_substitutes: HashMap<String, Option<String>>,
    version: FileVersion,
    include_in_all: Vec<String>,
}

impl Default for ProjectLoader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// `Code::Blocks_project_file` is not a valid XML name, so the legacy root
/// tags are renamed before parsing.
fn normalize_legacy_root(source: &str) -> Cow<'_, str> {
    if !source.contains(LEGACY_ROOT_ELEMENT) {
        return Cow::Borrowed(source);
    }
    Cow::Owned(
        source
            .replace(
                &format!("<{LEGACY_ROOT_ELEMENT}"),
                &format!("<{ROOT_ELEMENT}"),
            )
            .replace(
                &format!("</{LEGACY_ROOT_ELEMENT}"),
                &format!("</{ROOT_ELEMENT}"),
            ),
    )
}

impl<'a> ProjectLoader<'a> {
    pub fn new() -> Self {
        Self {
            observer: None,
            silent: SilentObserver,
            registry: None,
            hooks: Vec::new(),
            link_switches: CompilerSwitches::default(),
            rescan_globs: false,
            compiler_substitutes: HashMap::new(),
            version: FileVersion::CURRENT,
            include_in_all: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn LoadObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Compiler IDs missing from `registry` are offered for substitution.
    pub fn with_registry(mut self, registry: &'a CompilerIdRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_hook(mut self, hook: &'a dyn ProjectLoaderHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Switches used to recognize libraries among pre-1.1 linker options.
    pub fn with_link_switches(mut self, switches: CompilerSwitches) -> Self {
        self.link_switches = switches;
        self
    }

    /// Rescan every glob after loading.
    pub fn rescan_globs(mut self, rescan: bool) -> Self {
        self.rescan_globs = rescan;
        self
    }

    /// Version of the last loaded file.
    pub fn file_version(&self) -> FileVersion {
        self.version
    }

    fn observer(&mut self) -> &mut dyn LoadObserver {
        match &mut self.observer {
            Some(o) => &mut **o,
            None => &mut self.silent,
        }
    }

    pub fn open(&mut self, path: &Path) -> Result<Project, ProjectError> {
        let source = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&source, path)
    }

    /// Parses `source` as the project file at `path` (used for the project
    /// title fallback and to resolve globs).
    pub fn load_str(&mut self, source: &str, path: &Path) -> Result<Project, ProjectError> {
        let source = normalize_legacy_root(source);
        let doc = roxmltree::Document::parse(&source)?;
        let root = doc.root_element();
        let root_name = root.tag_name().name();
        if root_name != ROOT_ELEMENT {
            return Err(ProjectError::NotAProject(root_name.to_string()));
        }
        let proj = first_child(root, "Project").ok_or(ProjectError::MissingProjectElement)?;

        let mut project = Project::new(path);
        self.include_in_all.clear();
        let upgraded = self.detect_version(root);

        self.read_project_options(proj, &mut project);
        self.read_build(proj, &mut project);
        if project.targets().is_empty() {
            log::info!("project has no build targets, adding 'default'");
            project.add_build_target("default");
        }
        read_virtual_targets(proj, &mut project);
        read_compile_options(proj, &mut project.options);
        if let Some(build) = first_child(proj, "Build") {
            read_build_environment(build, &mut project.options);
        }

        if upgraded && self.observer().convert_link_libraries() {
            convert_link_libraries(&mut project, &self.link_switches);
        }

        self.read_units_globs(proj, &mut project);
        self.read_units(proj, &mut project);

        self.convert_all_target(&mut project);
        convert_default_target(&mut project);
        self.substitute_compilers(&mut project);

        if let Some(ext) = first_child(proj, "Extensions") {
            let element = XmlElement::from_node(ext);
            for hook in &self.hooks {
                hook.on_load(&mut project, &element);
            }
            project.extensions = Some(element);
        }

        let mut modified = upgraded;
        if self.rescan_globs && !project.globs().is_empty() {
            project.modified = false;
            modified |= project.update_globs();
        }
        project.modified = modified;

        log::debug!(
            "loaded {} ({} targets, {} files, format {})",
            path.display(),
            project.targets().len(),
            project.file_count(),
            self.version
        );
        Ok(project)
    }

    /// Reads `<FileVersion>` and reports format differences. Returns `true`
    /// for pre-1.1 files.
    fn detect_version(&mut self, root: Node<'_, '_>) -> bool {
        let Some(fv) = first_child(root, "FileVersion") else {
            self.version = FileVersion::new(1, 0);
            self.observer().notify(&LoadNotice::Upgraded);
            return true;
        };
        let read = |name: &str| int_attr(fv, name).and_then(|v| u32::try_from(v).ok());
        self.version = FileVersion::new(read("major").unwrap_or(1), read("minor").unwrap_or(0));

        let found = self.version;
        if found > FileVersion::CURRENT {
            log::warn!(
                "project file format {} is newer than {}; loading anyway",
                found,
                FileVersion::CURRENT
            );
            self.observer().notify(&LoadNotice::NewerFormat { found });
        } else if found < FileVersion::CURRENT {
            let changes = format_changes(found);
            if !changes.is_empty() {
                self.observer()
                    .notify(&LoadNotice::OlderFormat { found, changes });
            }
        }
        found < FileVersion::new(1, 1)
    }

    fn read_project_options(&mut self, proj: Node<'_, '_>, project: &mut Project) {
        if let Some(title) = option(proj, "title") {
            project.title = title.to_string();
        }
        if let Some(platforms) = option(proj, "platforms") {
            project.platforms = Platforms::parse(platforms);
        }
        if let Some(makefile) = option(proj, "makefile")
            && !makefile.is_empty()
        {
            project.makefile = makefile.to_string();
        }
        project.makefile_is_custom = option_bool(proj, "makefile_is_custom").unwrap_or(false);
        if let Some(dir) = option(proj, "execution_dir") {
            project.execution_dir = dir.to_string();
        }
        project.default_execute_target = option(proj, "default_target")
            .unwrap_or_default()
            .to_string();
        project.compiler_id = option(proj, "compiler").unwrap_or_default().to_string();
        project.extended_obj_names = option_bool(proj, "extended_obj_names").unwrap_or(false);

        project.pch_mode = match option_int(proj, "pch_mode").and_then(PchMode::from_index) {
            Some(mode) => mode,
            None if self.version < FileVersion::new(1, 2) => PchMode::SourceDir,
            None => PchMode::ObjectDir,
        };

        if let Some(folders) = option(proj, "virtualFolders") {
            project.virtual_folders = split_list(folders);
        }

        if let Some(notes) = option_node(proj, "show_notes") {
            project.show_notes_on_load = bool_attr(notes, "show_notes").unwrap_or(false);
            if let Some(text) = first_child(notes, "notes") {
                project.notes = text_of(text);
            }
        }

        project.make_commands = read_make_commands(proj);
    }

    fn read_build(&mut self, proj: Node<'_, '_>, project: &mut Project) {
        let Some(build) = first_child(proj, "Build") else {
            return;
        };
        project.scripts = scripts(build);

        let include_by_default = self.version < FileVersion::new(1, 2);
        for node in child_elements(build, "Target") {
            let title = node.attribute("title").unwrap_or_default();
            let Some(target) = project.add_build_target(title) else {
                log::warn!("skipping target with empty or duplicate title '{}'", title);
                continue;
            };
            read_target(node, target);
            if option_bool(node, "includeInTargetAll").unwrap_or(include_by_default) {
                self.include_in_all.push(title.to_string());
            }
        }
    }

    fn read_units_globs(&mut self, proj: Node<'_, '_>, project: &mut Project) {
        for node in child_elements(proj, "UnitsGlob") {
            let directory = node.attribute("directory").unwrap_or_default();
            let wildcard = node.attribute("wildcard").unwrap_or_default();
            let recursive = bool_attr(node, "recursive").unwrap_or(false);
            let wanted = int_attr(node, "id").unwrap_or(INVALID_GLOB_ID);
            let id = project.add_glob_with_id(wanted, directory, wildcard, recursive);
            if wanted >= 0 && id != wanted {
                log::warn!("glob id {} already in use, reassigned to {}", wanted, id);
            }
        }
    }

    fn read_units(&mut self, proj: Node<'_, '_>, project: &mut Project) {
        let infer_from_type = self.version < FileVersion::new(1, 6);
        let all_targets = project.target_titles();

        project.begin_add_files();
        for unit in child_elements(proj, "Unit") {
            let Some(filename) = unit.attribute("filename") else {
                continue;
            };
            let name = unix_filename(filename);
            if name.is_empty() {
                continue;
            }

            let glob: Option<GlobId> = option_int(unit, "glob")
                .or_else(|| int_attr(unit, "glob"))
                .filter(|id| *id != INVALID_GLOB_ID);
            let compiler_var = if infer_from_type {
                project.file_types.compiler_var_for(&name).to_string()
            } else {
                "CPP".to_string()
            };

            let Some(file) = project.add_file(&name) else {
                log::warn!("duplicate unit '{}' ignored", name);
                continue;
            };
            file.compiler_var = compiler_var;

            if let Some(var) = option(unit, "compilerVar") {
                file.compiler_var = var.to_string();
            }
            if let Some(compile) = option_bool(unit, "compile") {
                file.compile = compile;
            }
            if let Some(link) = option_bool(unit, "link") {
                file.link = link;
            }
            if let Some(weight) = option_int(unit, "weight") {
                file.weight = weight.clamp(0, 100) as u16;
            }
            if let Some(folder) = option(unit, "virtualFolder") {
                file.virtual_folder = folder.to_string();
            }
            for custom in child_elements(unit, "Option").filter(|o| o.has_attribute("compiler")) {
                let id = custom.attribute("compiler").unwrap_or_default();
                file.custom_builds.insert(
                    id.to_string(),
                    CustomBuild {
                        use_custom: bool_attr(custom, "use").unwrap_or(false),
                        command: custom.attribute("buildCommand").unwrap_or_default().to_string(),
                    },
                );
            }

            let mut has_target = false;
            for t in child_elements(unit, "Option").filter_map(|o| o.attribute("target")) {
                has_target = true;
                if all_targets.iter().any(|title| title == t) {
                    file.add_build_target(t);
                } else {
                    log::warn!("unit '{}' references unknown target '{}'", name, t);
                }
            }
            if !has_target {
                file.targets = all_targets.clone();
            }

            if let Some(id) = glob {
                file.glob_id = Some(id);
                if project.search_glob(id).is_none() {
                    project.remove_file(&name);
                    log::debug!("unit '{}' belongs to unknown glob {}, dropped", name, id);
                }
            }
        }
        project.end_add_files();
    }

    fn convert_all_target(&mut self, project: &mut Project) {
        if self.include_in_all.is_empty() || project.has_virtual_build_target("All") {
            return;
        }
        let members = std::mem::take(&mut self.include_in_all);
        if project.define_virtual_build_target("All", &members) {
            log::debug!("created virtual target 'All' from {} targets", members.len());
        }
    }

    fn substitute_compilers(&mut self, project: &mut Project) {
        let Some(registry) = self.registry else {
            return;
        };
        let mut ids: Vec<String> = vec![project.compiler_id.clone()];
        ids.extend(project.targets().iter().map(|t| t.compiler_id.clone()));

        for id in ids {
            if id.is_empty() || registry.contains(&id) || self.compiler_substitutes.contains_key(&id)
            {
                continue;
            }
            let replacement = self.observer().substitute_compiler(&id);
            if let Some(to) = &replacement {
                self.observer().notify(&LoadNotice::CompilerSubstituted {
                    from: id.clone(),
                    to: to.clone(),
                });
            }
            self.compiler_substitutes.insert(id, replacement);
        }

        let substitute = |id: &mut String| {
            if let Some(Some(to)) = self.compiler_substitutes.get(id.as_str()) {
                *id = to.clone();
            }
        };
        substitute(&mut project.compiler_id);
        for target in project.targets_mut() {
            substitute(&mut target.compiler_id);
        }
    }
}

/// Project-level `<Environment>` may also sit below `<Build>`.
fn read_build_environment(build: Node<'_, '_>, opts: &mut CompileOptions) {
    for var in child_elements(build, "Environment").flat_map(|e| child_elements(e, "Variable")) {
        if let Some(name) = var.attribute("name")
            && !name.is_empty()
        {
            opts.vars
                .entry(name.to_string())
                .or_insert_with(|| var.attribute("value").unwrap_or_default().to_string());
        }
    }
}

fn read_target(node: Node<'_, '_>, target: &mut BuildTarget) {
    if let Some(platforms) = option(node, "platforms") {
        target.platforms = Platforms::parse(platforms);
    }
    if let Some(output) = option_node(node, "output") {
        target.output_filename = output.attribute("output").unwrap_or_default().to_string();
        target.prefix_auto = bool_attr(output, "prefix_auto").unwrap_or(true);
        target.extension_auto = bool_attr(output, "extension_auto").unwrap_or(true);
    }
    let text = |attr: &str| option(node, attr).unwrap_or_default().to_string();
    target.working_dir = text("working_dir");
    target.object_output = text("object_output");
    target.deps_output = text("deps_output");
    target.external_deps = split_list(&text("external_deps"));
    target.additional_output = split_list(&text("additional_output"));
    target.compiler_id = text("compiler");
    target.execution_parameters = text("parameters");

    if let Some(kind) = option_int(node, "type") {
        match TargetType::from_index(kind) {
            Some(kind) => target.target_type = kind,
            None => log::warn!("target '{}' has unknown type {}", target.title, kind),
        }
    }
    if let Some(runner) = option_bool(node, "use_console_runner") {
        target.use_console_runner = runner;
    }
    if let Some(host) = option_node(node, "host_application") {
        target.host_application = host.attribute("host_application").unwrap_or_default().to_string();
        target.run_host_in_terminal =
            bool_attr(host, "run_host_application_in_terminal").unwrap_or(false);
    }
    target.create_def_file = option_bool(node, "createDefFile").unwrap_or(false);
    target.create_static_lib = option_bool(node, "createStaticLib").unwrap_or(false);
    if let Some(linker) = option(node, "linker_executable") {
        target.linker_executable = LinkerExecutable::from_xml_name(linker).unwrap_or_default();
    }
    for kind in OptionsRelationType::ALL {
        if let Some(relation) = option_int(node, kind.xml_name()).and_then(OptionsRelation::from_index)
        {
            target.set_relation(kind, relation);
        }
    }

    target.scripts = scripts(node);
    read_compile_options(node, &mut target.options);
    target.make_commands = read_make_commands(node);
}

fn read_virtual_targets(proj: Node<'_, '_>, project: &mut Project) {
    for add in child_elements(proj, "VirtualTargets").flat_map(|v| child_elements(v, "Add")) {
        let alias = add.attribute("alias").unwrap_or_default();
        let members = split_list(add.attribute("targets").unwrap_or_default());
        if !project.define_virtual_build_target(alias, &members) {
            log::warn!("virtual target '{}' dropped", alias);
        }
    }
}

/// Pre-1.1 files kept libraries among the linker options.
fn convert_link_libraries(project: &mut Project, switches: &CompilerSwitches) {
    let suffix = format!(".{}", switches.lib_extension);
    let convert = |opts: &mut CompileOptions| {
        let mut kept = Vec::new();
        for opt in std::mem::take(&mut opts.linker_options) {
            if let Some(lib) = opt
                .strip_prefix(switches.link_libs.as_str())
                .filter(|l| !switches.link_libs.is_empty() && !l.is_empty())
            {
                push_unique(&mut opts.link_libs, lib);
            } else if opt.ends_with(&suffix) {
                push_unique(&mut opts.link_libs, &opt);
            } else {
                kept.push(opt);
            }
        }
        opts.linker_options = kept;
    };
    convert(&mut project.options);
    for target in project.targets_mut() {
        convert(&mut target.options);
    }
}

/// Old files stored the default target as an index.
fn convert_default_target(project: &mut Project) {
    let current = project.default_execute_target.clone();
    if current.is_empty() || project.build_target(&current).is_some() {
        return;
    }
    if let Ok(index) = current.trim().parse::<i64>() {
        project.default_execute_target = usize::try_from(index)
            .ok()
            .and_then(|i| project.targets().get(i))
            .map(|t| t.title.clone())
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectError;

    const CURRENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<CodeBlocks_project_file>
	<FileVersion major="1" minor="6" />
	<Project>
		<Option title="hello" />
		<Option pch_mode="2" />
		<Option compiler="gcc" />
		<Build>
			<Target title="Debug">
				<Option output="bin/Debug/hello" prefix_auto="1" extension_auto="1" />
				<Option type="1" />
				<Compiler>
					<Add option="-g" />
				</Compiler>
			</Target>
			<Target title="Release">
				<Option type="1" />
				<Linker>
					<Add option="-s" />
				</Linker>
			</Target>
		</Build>
		<Compiler>
			<Add option="-Wall" />
			<Add directory="include" />
		</Compiler>
		<Unit filename="main.c" />
		<Unit filename="util.cpp">
			<Option target="Debug" />
			<Option target="Missing" />
		</Unit>
	</Project>
</CodeBlocks_project_file>
"#;

    fn load(xml: &str) -> Result<Project, ProjectError> {
        ProjectLoader::new().load_str(xml, Path::new("/work/hello.cbp"))
    }

    #[test]
    fn test_load_current_format() {
        let project = load(CURRENT).unwrap();
        assert_eq!(project.title, "hello");
        assert_eq!(project.pch_mode, PchMode::SourceFile);
        assert_eq!(project.target_titles(), vec!["Debug", "Release"]);
        assert_eq!(project.options.compiler_options, vec!["-Wall"]);
        assert_eq!(project.options.include_dirs, vec!["include"]);
        assert!(!project.modified);

        let main = project.file_by_name("main.c").unwrap();
        assert_eq!(main.targets, vec!["Debug", "Release"]);
        // 1.6: absent compilerVar means CPP.
        assert_eq!(main.compiler_var, "CPP");
        assert!(main.compile && main.link);

        let util = project.file_by_name("util.cpp").unwrap();
        assert_eq!(util.targets, vec!["Debug"]);
        assert!(!project.has_virtual_build_target("All"));
    }

    #[test]
    fn test_legacy_root_and_version_defaults() {
        let xml = r#"<Code::Blocks_project_file>
            <FileVersion major="1" minor="1" />
            <Project>
                <Option default_target="1" />
                <Build>
                    <Target title="A" />
                    <Target title="B"><Option includeInTargetAll="0" /></Target>
                </Build>
                <Unit filename="a.c" />
                <Unit filename="res.rc" />
            </Project>
        </Code::Blocks_project_file>"#;
        let project = load(xml).unwrap();
        assert_eq!(project.pch_mode, PchMode::SourceDir);
        assert_eq!(project.virtual_build_target("All"), Some(&["A".to_string()][..]));
        assert_eq!(project.default_execute_target, "B");
        assert_eq!(project.file_by_name("a.c").unwrap().compiler_var, "CC");
        assert_eq!(project.file_by_name("res.rc").unwrap().compiler_var, "WINDRES");
    }

    #[test]
    fn test_legacy_root_is_saved_under_current_name() {
        let xml = r#"<?xml version="1.0"?>
<Code::Blocks_project_file><Project><Option title="old" /></Project></Code::Blocks_project_file>"#;
        let project = load(xml).unwrap();
        assert_eq!(project.title, "old");
        let saved = crate::loader::to_xml_string(&project);
        assert!(saved.contains("<CodeBlocks_project_file>"));
        assert!(!saved.contains("Code::Blocks"));
    }

    #[test]
    fn test_pre_1_1_converts_link_libraries() {
        struct Yes(u32);
        impl LoadObserver for Yes {
            fn convert_link_libraries(&mut self) -> bool {
                self.0 += 1;
                true
            }
        }
        let xml = r#"<CodeBlocks_project_file><Project>
            <Linker><Add option="-lm" /><Add option="foo.a" /><Add option="-s" /></Linker>
            <IncludeDirs><Add directory="inc" /></IncludeDirs>
        </Project></CodeBlocks_project_file>"#;
        let mut observer = Yes(0);
        let project = ProjectLoader::new()
            .with_observer(&mut observer)
            .load_str(xml, Path::new("old.cbp"))
            .unwrap();
        assert_eq!(project.options.link_libs, vec!["m", "foo.a"]);
        assert_eq!(project.options.linker_options, vec!["-s"]);
        assert_eq!(project.options.include_dirs, vec!["inc"]);
        assert_eq!(project.target_titles(), vec!["default"]);
        assert!(project.modified);
        assert_eq!(observer.0, 1);
    }

    #[test]
    fn test_newer_format_loads_with_notice() {
        #[derive(Default)]
        struct Record(Vec<LoadNotice>);
        impl LoadObserver for Record {
            fn notify(&mut self, notice: &LoadNotice) {
                self.0.push(notice.clone());
            }
        }
        let xml = r#"<CodeBlocks_project_file><FileVersion major="1" minor="9" />
            <Project><Option title="future" /></Project></CodeBlocks_project_file>"#;
        let mut record = Record::default();
        let mut loader = ProjectLoader::new().with_observer(&mut record);
        let project = loader.load_str(xml, Path::new("f.cbp")).unwrap();
        assert_eq!(loader.file_version(), FileVersion::new(1, 9));
        drop(loader);
        assert_eq!(project.title, "future");
        assert_eq!(
            record.0,
            vec![LoadNotice::NewerFormat {
                found: FileVersion::new(1, 9)
            }]
        );
    }

    #[test]
    fn test_failures() {
        assert!(matches!(load("<nope"), Err(ProjectError::Xml(_))));
        assert!(matches!(load("<Other/>"), Err(ProjectError::NotAProject(_))));
        assert!(matches!(
            load("<CodeBlocks_project_file/>"),
            Err(ProjectError::MissingProjectElement)
        ));
    }

    #[test]
    fn test_compiler_substitution_asked_once() {
        struct Swap(u32);
        impl LoadObserver for Swap {
            fn substitute_compiler(&mut self, _: &str) -> Option<String> {
                self.0 += 1;
                Some("gcc".to_string())
            }
        }
        let xml = r#"<CodeBlocks_project_file><FileVersion major="1" minor="6" /><Project>
            <Option compiler="msvc8" />
            <Build>
                <Target title="A"><Option compiler="msvc8" /></Target>
                <Target title="B"><Option compiler="gcc" /></Target>
            </Build>
        </Project></CodeBlocks_project_file>"#;
        let mut registry = CompilerIdRegistry::new();
        registry.reserve("gcc").unwrap();
        let mut swap = Swap(0);
        let project = ProjectLoader::new()
            .with_observer(&mut swap)
            .with_registry(&registry)
            .load_str(xml, Path::new("p.cbp"))
            .unwrap();
        assert_eq!(project.compiler_id, "gcc");
        assert!(project.targets().iter().all(|t| t.compiler_id == "gcc"));
        assert_eq!(swap.0, 1);
    }

    #[test]
    fn test_unit_with_unknown_glob_is_dropped() {
        let xml = r#"<CodeBlocks_project_file><FileVersion major="1" minor="6" /><Project>
            <UnitsGlob directory="src" wildcard="*.c" recursive="0" id="3" />
            <Unit filename="src/a.c"><Option glob="3" /></Unit>
            <Unit filename="src/b.c"><Option glob="7" /></Unit>
        </Project></CodeBlocks_project_file>"#;
        let project = load(xml).unwrap();
        assert_eq!(project.file_by_name("src/a.c").unwrap().glob_id, Some(3));
        assert!(project.file_by_name("src/b.c").is_none());
        assert_eq!(project.globs()[0].id(), 3);
    }
}
