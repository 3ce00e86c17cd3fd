use super::{FileVersion, ProjectLoaderHook, ROOT_ELEMENT};
use crate::error::ProjectError;
use crate::project::{
    BuildTarget, CompileOptions, DEFAULT_WEIGHT, LinkerExecutable, MakeCommands, OptionsRelation,
    OptionsRelationType, Project, ProjectFile,
};
use crate::xml::{XmlElement, XmlNode, to_document};
use std::fs;
use std::path::Path;

fn opt(name: &str, value: impl ToString) -> XmlElement {
    XmlElement::new("Option").with_attr(name, value)
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// `a;b;` with a trailing separator.
fn join_list(items: &[String]) -> String {
    items.iter().map(|i| format!("{i};")).collect()
}

fn add_section(parent: &mut XmlElement, section: &str, entries: &[(&str, &[String])]) {
    if entries.iter().all(|(_, values)| values.is_empty()) {
        return;
    }
    let node = parent.push(XmlElement::new(section));
    for (attr, values) in entries {
        for value in *values {
            node.push(XmlElement::new("Add").with_attr(attr, value));
        }
    }
}

fn write_compile_options(parent: &mut XmlElement, opts: &CompileOptions) {
    add_section(
        parent,
        "Compiler",
        &[("option", &opts.compiler_options), ("directory", &opts.include_dirs)],
    );
    add_section(
        parent,
        "ResourceCompiler",
        &[
            ("option", &opts.resource_compiler_options),
            ("directory", &opts.resource_include_dirs),
        ],
    );
    add_section(
        parent,
        "Linker",
        &[
            ("option", &opts.linker_options),
            ("library", &opts.link_libs),
            ("directory", &opts.lib_dirs),
        ],
    );

    if !opts.commands_before_build.is_empty() || !opts.commands_after_build.is_empty() {
        let extra = parent.push(XmlElement::new("ExtraCommands"));
        for cmd in &opts.commands_before_build {
            extra.push(XmlElement::new("Add").with_attr("before", cmd));
        }
        for cmd in &opts.commands_after_build {
            extra.push(XmlElement::new("Add").with_attr("after", cmd));
        }
        if opts.always_run_post_build {
            extra.push(XmlElement::new("Mode").with_attr("after", "always"));
        }
    }

    if !opts.vars.is_empty() {
        let env = parent.push(XmlElement::new("Environment"));
        for (name, value) in &opts.vars {
            env.push(
                XmlElement::new("Variable")
                    .with_attr("name", name)
                    .with_attr("value", value),
            );
        }
    }
}

fn write_make_commands(parent: &mut XmlElement, commands: &MakeCommands) {
    if commands.is_empty() {
        return;
    }
    let node = parent.push(XmlElement::new("MakeCommands"));
    for (kind, command) in commands {
        node.push(XmlElement::new(kind.xml_name()).with_attr("command", command));
    }
}

fn write_target(parent: &mut XmlElement, target: &BuildTarget) {
    let node = parent.push(XmlElement::new("Target").with_attr("title", &target.title));
    if !target.platforms.is_all() {
        node.push(opt("platforms", target.platforms.to_xml()));
    }
    if !target.output_filename.is_empty() || !target.prefix_auto || !target.extension_auto {
        node.push(
            opt("output", &target.output_filename)
                .with_attr("prefix_auto", flag(target.prefix_auto))
                .with_attr("extension_auto", flag(target.extension_auto)),
        );
    }
    for (name, value) in [
        ("working_dir", &target.working_dir),
        ("object_output", &target.object_output),
        ("deps_output", &target.deps_output),
    ] {
        if !value.is_empty() {
            node.push(opt(name, value));
        }
    }
    if !target.external_deps.is_empty() {
        node.push(opt("external_deps", join_list(&target.external_deps)));
    }
    if !target.additional_output.is_empty() {
        node.push(opt("additional_output", join_list(&target.additional_output)));
    }
    node.push(opt("type", target.target_type as i32));
    if !target.compiler_id.is_empty() {
        node.push(opt("compiler", &target.compiler_id));
    }
    if !target.use_console_runner {
        node.push(opt("use_console_runner", "0"));
    }
    if !target.execution_parameters.is_empty() {
        node.push(opt("parameters", &target.execution_parameters));
    }
    if !target.host_application.is_empty() {
        node.push(
            opt("host_application", &target.host_application).with_attr(
                "run_host_application_in_terminal",
                flag(target.run_host_in_terminal),
            ),
        );
    }
    if target.create_def_file {
        node.push(opt("createDefFile", "1"));
    }
    if target.create_static_lib {
        node.push(opt("createStaticLib", "1"));
    }
    if target.linker_executable != LinkerExecutable::AutoDetect {
        node.push(opt("linker_executable", target.linker_executable.xml_name()));
    }
    for kind in OptionsRelationType::ALL {
        let relation = target.relation(kind);
        if relation != OptionsRelation::default() {
            node.push(opt(kind.xml_name(), relation as i32));
        }
    }
    for script in &target.scripts {
        node.push(XmlElement::new("Script").with_attr("file", script));
    }
    write_compile_options(node, &target.options);
    write_make_commands(node, &target.make_commands);
}

/// Writes [`Project`]s as `.cbp` files.
#[derive(Default)]
pub struct ProjectSaver<'a> {
    hooks: Vec<&'a dyn ProjectLoaderHook>,
}

impl<'a> ProjectSaver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: &'a dyn ProjectLoaderHook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn save(&self, project: &Project, path: &Path) -> Result<(), ProjectError> {
        self.export(project, path, None)
    }

    /// Writes `project` to `path`, optionally reduced to one build target.
    pub fn export(
        &self,
        project: &Project,
        path: &Path,
        only_target: Option<&str>,
    ) -> Result<(), ProjectError> {
        let xml = self.to_xml(project, only_target)?;
        fs::write(path, xml).map_err(|source| ProjectError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Renders the project file. Fails only if `only_target` is unknown.
    pub fn to_xml(&self, project: &Project, only_target: Option<&str>) -> Result<String, ProjectError> {
        if let Some(t) = only_target
            && project.build_target(t).is_none()
        {
            return Err(ProjectError::UnknownTarget(t.to_string()));
        }
        let exported: Vec<&BuildTarget> = project
            .targets()
            .iter()
            .filter(|t| only_target.is_none_or(|only| t.title == only))
            .collect();

        let mut root = XmlElement::new(ROOT_ELEMENT);
        root.push(
            XmlElement::new("FileVersion")
                .with_attr("major", FileVersion::CURRENT.major)
                .with_attr("minor", FileVersion::CURRENT.minor),
        );
        let proj = root.push(XmlElement::new("Project"));

        write_project_options(proj, project);
        write_make_commands(proj, &project.make_commands);

        let build = proj.push(XmlElement::new("Build"));
        for script in &project.scripts {
            build.push(XmlElement::new("Script").with_attr("file", script));
        }
        for target in &exported {
            write_target(build, target);
        }

        if only_target.is_none() && !project.virtual_build_targets().is_empty() {
            let vt = proj.push(XmlElement::new("VirtualTargets"));
            for (alias, members) in project.virtual_build_targets() {
                vt.push(
                    XmlElement::new("Add")
                        .with_attr("alias", alias)
                        .with_attr("targets", join_list(members)),
                );
            }
        }

        write_compile_options(proj, &project.options);

        for glob in project.globs() {
            proj.push(
                XmlElement::new("UnitsGlob")
                    .with_attr("directory", &glob.directory)
                    .with_attr("recursive", flag(glob.recursive))
                    .with_attr("wildcard", &glob.wildcard)
                    .with_attr("id", glob.id()),
            );
        }

        for file in project.files() {
            if file.auto_generated_by.is_some() {
                continue;
            }
            if let Some(only) = only_target
                && !file.belongs_to(only)
            {
                continue;
            }
            let all = exported.iter().all(|t| file.belongs_to(&t.title));
            write_unit(proj, project, file, all);
        }

        let mut extensions = project
            .extensions
            .clone()
            .unwrap_or_else(|| XmlElement::new("Extensions"));
        for hook in &self.hooks {
            hook.on_save(project, &mut extensions);
        }
        sort_extension_children(&mut extensions);
        proj.push(extensions);

        Ok(to_document(&root))
    }
}

fn write_project_options(proj: &mut XmlElement, project: &Project) {
    proj.push(opt("title", &project.title));
    if !project.platforms.is_all() {
        proj.push(opt("platforms", project.platforms.to_xml()));
    }
    proj.push(opt("makefile", &project.makefile));
    if project.makefile_is_custom {
        proj.push(opt("makefile_is_custom", "1"));
    }
    if project.execution_dir != "." && !project.execution_dir.is_empty() {
        proj.push(opt("execution_dir", &project.execution_dir));
    }
    proj.push(opt("pch_mode", project.pch_mode as i32));
    if !project.default_execute_target.is_empty() {
        proj.push(opt("default_target", &project.default_execute_target));
    }
    if !project.compiler_id.is_empty() {
        proj.push(opt("compiler", &project.compiler_id));
    }
    if !project.virtual_folders.is_empty() {
        proj.push(opt("virtualFolders", join_list(&project.virtual_folders)));
    }
    if project.extended_obj_names {
        proj.push(opt("extended_obj_names", "1"));
    }
    if !project.notes.is_empty() {
        let notes = proj.push(opt("show_notes", flag(project.show_notes_on_load)));
        notes.push(XmlElement::new("notes")).push_cdata(&project.notes);
    }
}

fn write_unit(proj: &mut XmlElement, project: &Project, file: &ProjectFile, in_all_targets: bool) {
    let unit = proj.push(XmlElement::new("Unit").with_attr("filename", &file.relative_filename));
    let ft = project.file_types.classify(&file.relative_filename);

    if file.compiler_var != "CPP" {
        unit.push(opt("compilerVar", &file.compiler_var));
    }
    if file.compile != ft.default_compile() {
        unit.push(opt("compile", flag(file.compile)));
    }
    if file.link != ft.default_link() {
        unit.push(opt("link", flag(file.link)));
    }
    if file.weight != DEFAULT_WEIGHT {
        unit.push(opt("weight", file.weight));
    }
    if !file.virtual_folder.is_empty() {
        unit.push(opt("virtualFolder", &file.virtual_folder));
    }
    if let Some(id) = file.glob_id {
        unit.push(opt("glob", id));
    }
    for (compiler, custom) in &file.custom_builds {
        unit.push(
            opt("compiler", compiler)
                .with_attr("use", flag(custom.use_custom))
                .with_attr("buildCommand", &custom.command),
        );
    }
    if !in_all_targets {
        for target in &file.targets {
            unit.push(opt("target", target));
        }
    }
}

/// Orders element children by tag name, keeping insertion order for equal
/// names. Non-element children keep their relative order after them.
fn sort_extension_children(extensions: &mut XmlElement) {
    let mut indexed: Vec<(usize, XmlNode)> = std::mem::take(&mut extensions.children)
        .into_iter()
        .enumerate()
        .collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let key = |n: &XmlNode| match n {
            XmlNode::Element(e) => (0, e.name.clone()),
            _ => (1, String::new()),
        };
        key(a).cmp(&key(b)).then(ia.cmp(ib))
    });
    extensions.children = indexed.into_iter().map(|(_, n)| n).collect();
}

/// Saves `project` to `path`, reduced to `only_target` when given.
pub fn export_target_as_project(
    project: &Project,
    path: &Path,
    only_target: Option<&str>,
) -> Result<(), ProjectError> {
    ProjectSaver::new().export(project, path, only_target)
}

/// Renders `project` without hooks.
pub fn to_xml_string(project: &Project) -> String {
    ProjectSaver::new()
        .to_xml(project, None)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ProjectLoader;

    fn sample() -> Project {
        let mut p = Project::new("/work/demo.cbp");
        p.add_build_target("Debug").unwrap().options.compiler_options.push("-g".into());
        p.add_build_target("Release");
        p.options.include_dirs.push("include".into());
        let all = p.target_titles();
        let f = p.add_file("main.cpp").unwrap();
        f.targets = all;
        let f = p.add_file("debug_only.c").unwrap();
        f.targets = vec!["Debug".into()];
        f.compiler_var = "CC".into();
        let f = p.add_file("gen/parser.c").unwrap();
        f.auto_generated_by = Some("parser.y".into());
        p
    }

    fn reload(xml: &str) -> Project {
        ProjectLoader::new()
            .load_str(xml, Path::new("/work/demo.cbp"))
            .unwrap()
    }

    #[test]
    fn test_round_trip_is_stable() {
        let first = to_xml_string(&sample());
        let second = to_xml_string(&reload(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_defaults_are_not_written() {
        let xml = to_xml_string(&sample());
        assert!(xml.contains(r#"<Unit filename="main.cpp" />"#));
        assert!(xml.contains(r#"<Option compilerVar="CC" />"#));
        assert!(!xml.contains("weight"));
        assert!(!xml.contains("parser.c"));
        assert!(xml.contains(r#"<FileVersion major="1" minor="6" />"#));
    }

    #[test]
    fn test_export_single_target() {
        let xml = ProjectSaver::new()
            .to_xml(&sample(), Some("Release"))
            .unwrap();
        assert!(!xml.contains(r#"title="Debug""#));
        assert!(!xml.contains("debug_only.c"));
        // main.cpp belongs to every exported target, so no target entries.
        assert!(xml.contains(r#"<Unit filename="main.cpp" />"#));

        assert!(matches!(
            ProjectSaver::new().to_xml(&sample(), Some("Nope")),
            Err(ProjectError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_extension_children_sorted() {
        struct Late;
        impl ProjectLoaderHook for Late {
            fn on_load(&self, _: &mut Project, _: &XmlElement) {}
            fn on_save(&self, _: &Project, ext: &mut XmlElement) {
                ext.push(XmlElement::new("code_completion").with_attr("n", 2));
                ext.push(XmlElement::new("a_plugin"));
            }
        }
        let mut project = sample();
        let mut ext = XmlElement::new("Extensions");
        ext.push(XmlElement::new("code_completion").with_attr("n", 1));
        project.extensions = Some(ext);

        let hook = Late;
        let xml = ProjectSaver::new().with_hook(&hook).to_xml(&project, None).unwrap();
        let a = xml.find("<a_plugin").unwrap();
        let c1 = xml.find(r#"<code_completion n="1""#).unwrap();
        let c2 = xml.find(r#"<code_completion n="2""#).unwrap();
        assert!(a < c1 && c1 < c2);
    }
}
