//! Project command handlers
//!
//! Handles `cbp info`, `cbp upgrade`, `cbp export` and `cbp globs`.

use anyhow::{Context, Result};
use colored::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::compiler::CompilerIdRegistry;
use crate::loader::{LoadNotice, LoadObserver, ProjectLoader, ProjectSaver};
use crate::project::Project;
use crate::ui;

/// Asks the user through `inquire`, or takes every default when
/// `assume_yes` is set or stdin is not a terminal.
pub struct PromptObserver {
    assume_yes: bool,
}

impl PromptObserver {
    pub fn new(assume_yes: bool) -> Self {
        let interactive = console::Term::stdout().is_term();
        Self {
            assume_yes: assume_yes || !interactive,
        }
    }
}

impl LoadObserver for PromptObserver {
    fn notify(&mut self, notice: &LoadNotice) {
        match notice {
            LoadNotice::NewerFormat { found } => ui::warning(format!(
                "file format {} is newer than this tool understands; loading anyway",
                found.to_string().yellow()
            )),
            LoadNotice::OlderFormat { found, changes } => {
                ui::note(format!("project uses file format {}", found));
                for change in changes {
                    println!("   - {}", change);
                }
            }
            LoadNotice::Upgraded => {
                ui::note("project predates file format 1.1 and will be saved in the new layout")
            }
            LoadNotice::CompilerSubstituted { from, to } => ui::note(format!(
                "compiler '{}' replaced by '{}'",
                from.yellow(),
                to.green()
            )),
        }
    }

    fn convert_link_libraries(&mut self) -> bool {
        if self.assume_yes {
            return true;
        }
        inquire::Confirm::new("Move library-looking linker options to the link libraries?")
            .with_default(true)
            .prompt()
            .unwrap_or(true)
    }

    fn substitute_compiler(&mut self, unknown_id: &str) -> Option<String> {
        if self.assume_yes {
            ui::warning(format!("unknown compiler '{}' kept as is", unknown_id));
            return None;
        }
        let answer = inquire::Text::new(&format!(
            "Compiler '{unknown_id}' is not configured. Replacement ID (empty keeps it):"
        ))
        .prompt()
        .ok()?;
        let answer = answer.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }
}

/// Collects compiler IDs from `options_<id>.xml` files in `dir`.
pub fn registry_from_dir(dir: &Path) -> Result<CompilerIdRegistry> {
    let mut registry = CompilerIdRegistry::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(id) = name
            .strip_prefix("options_")
            .and_then(|rest| rest.strip_suffix(".xml"))
        {
            if let Err(e) = registry.reserve(id) {
                log::warn!("skipping {}: {}", name, e);
            }
        }
    }
    Ok(registry)
}

pub struct LoadArgs<'a> {
    pub path: &'a Path,
    pub assume_yes: bool,
    pub options_dir: Option<&'a Path>,
    pub rescan_globs: bool,
}

pub fn load_project(args: &LoadArgs<'_>) -> Result<Project> {
    let registry = args.options_dir.map(registry_from_dir).transpose()?;
    let mut observer = PromptObserver::new(args.assume_yes);
    let mut loader = ProjectLoader::new()
        .with_observer(&mut observer)
        .rescan_globs(args.rescan_globs);
    if let Some(registry) = &registry {
        loader = loader.with_registry(registry);
    }
    loader
        .open(args.path)
        .with_context(|| format!("Failed to load {}", args.path.display()))
}

/// `cbp info`
pub fn print_info(args: &LoadArgs<'_>) -> Result<()> {
    let project = load_project(args)?;

    println!("{} {}", "📁".cyan(), project.title.bold());
    println!("{}", "─".repeat(50).dimmed());
    println!("{}: {}", "File".bold(), project.filename.display());
    if !project.compiler_id.is_empty() {
        println!("{}: {}", "Compiler".bold(), project.compiler_id);
    }
    println!("{}: {}", "Platforms".bold(), project.platforms.to_xml());
    println!("{}: {}", "Makefile".bold(), project.makefile);
    if !project.default_execute_target.is_empty() {
        println!("{}: {}", "Default target".bold(), project.default_execute_target);
    }
    println!();

    let mut targets = ui::Table::new(&["Target", "Type", "Output", "Compiler", "Files"]);
    for target in project.targets() {
        let files = project
            .files()
            .iter()
            .filter(|f| f.belongs_to(&target.title))
            .count();
        targets.add_row(vec![
            target.title.green().to_string(),
            target.target_type.label().to_string(),
            target.output_filename.clone(),
            target.compiler_id.clone(),
            files.to_string(),
        ]);
    }
    targets.print();

    if !project.virtual_build_targets().is_empty() {
        println!("\n{}", "Virtual targets:".bold());
        for (alias, members) in project.virtual_build_targets() {
            println!("  {} = {}", alias.cyan(), members.join(", "));
        }
    }

    if !project.globs().is_empty() {
        println!("\n{}", "Globs:".bold());
        for glob in project.globs() {
            println!(
                "  [{}] {}/{}{}",
                glob.id(),
                glob.directory,
                glob.wildcard,
                if glob.recursive { " (recursive)" } else { "" }
            );
        }
    }

    println!("\n{}: {}", "Files".bold(), project.file_count());
    if project.modified {
        ui::note("project would change on save; run `cbp upgrade` to rewrite it");
    }
    Ok(())
}

fn write_backup(path: &Path) -> Result<PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    std::fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up {}", path.display()))?;
    Ok(backup)
}

/// `cbp upgrade`: load and save in the current format.
pub fn upgrade(args: &LoadArgs<'_>, output: Option<&Path>) -> Result<()> {
    let project = load_project(args)?;
    let dest = output.unwrap_or(args.path);
    if dest == args.path {
        let backup = write_backup(args.path)?;
        ui::note(format!("backup written to {}", backup.display()));
    }
    ProjectSaver::new()
        .save(&project, dest)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    ui::success(format!("{} saved in the current format", dest.display()));
    Ok(())
}

/// `cbp export`: write one target as a standalone project.
pub fn export(args: &LoadArgs<'_>, target: &str, output: &Path) -> Result<()> {
    let project = load_project(args)?;
    ProjectSaver::new()
        .export(&project, output, Some(target))
        .with_context(|| format!("Failed to export target '{}'", target))?;
    ui::success(format!(
        "target '{}' exported to {}",
        target.green(),
        output.display()
    ));
    Ok(())
}

/// `cbp globs`: rescan globs and report what changed.
pub fn rescan_globs(args: &LoadArgs<'_>, save: bool) -> Result<()> {
    let mut project = load_project(&LoadArgs {
        rescan_globs: false,
        ..*args
    })?;
    if project.globs().is_empty() {
        ui::note("project has no globs");
        return Ok(());
    }

    let names = |p: &Project| -> BTreeSet<String> {
        p.files().iter().map(|f| f.relative_filename.clone()).collect()
    };
    let before = names(&project);
    let changed = project.update_globs();
    let after = names(&project);

    for removed in before.difference(&after) {
        println!("  {} {}", "-".red(), removed);
    }
    for added in after.difference(&before) {
        println!("  {} {}", "+".green(), added);
    }
    if !changed {
        ui::success("globs are up to date");
        return Ok(());
    }

    if save {
        ProjectSaver::new()
            .save(&project, args.path)
            .with_context(|| format!("Failed to write {}", args.path.display()))?;
        ui::success(format!("{} updated", args.path.display()));
    } else {
        ui::note("run with --save to write the changes");
    }
    Ok(())
}
