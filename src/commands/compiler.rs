//! Compiler command handlers
//!
//! Handles `cbp compiler show`, `cbp compiler diagnose` and
//! `cbp compiler version-cmp`.

use anyhow::{Context, Result};
use colored::*;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::compiler::{
    CommandType, Compiler, CompilerIdRegistry, CompilerLineType, DirSource, SystemRunner,
    VersionOp, cmp_version,
};
use crate::config::ConfigStore;
use crate::macros::EnvMacros;
use crate::ui;

/// Where option files and user settings come from.
pub struct CompilerArgs<'a> {
    pub id: &'a str,
    pub options_dir: &'a Path,
    pub global_dir: Option<&'a Path>,
    pub settings: &'a Path,
}

/// Builds a compiler from its option files, then applies the user's saved
/// settings on top.
pub fn load_compiler(args: &CompilerArgs<'_>) -> Result<Compiler> {
    let mut registry = CompilerIdRegistry::new();
    let mut compiler = Compiler::new(args.id, args.id, &mut registry)?;
    let source = DirSource::new(
        Some(args.options_dir.to_path_buf()),
        args.global_dir.map(Path::to_path_buf),
    );
    compiler
        .load_default_options(&source, &SystemRunner)
        .with_context(|| format!("Failed to load options for '{}'", args.id))?;

    let store = ConfigStore::load(args.settings)
        .with_context(|| format!("Failed to read {}", args.settings.display()))?;
    compiler.load_settings(&store);
    Ok(compiler)
}

/// `cbp compiler show`
pub fn show(args: &CompilerArgs<'_>) -> Result<()> {
    let mut compiler = load_compiler(args)?;

    println!("{} {} ({})", "🔧".cyan(), compiler.name.bold(), compiler.id().dimmed());
    println!("{}", "─".repeat(50).dimmed());
    if !compiler.parent_id.is_empty() {
        println!("{}: {}", "Extends".bold(), compiler.parent_id);
    }
    let master = if compiler.master_path.is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        compiler.master_path.clone()
    };
    println!("{}: {}", "Master path".bold(), master);
    let valid = compiler.is_valid(&EnvMacros::new());
    println!(
        "{}: {}",
        "Installation".bold(),
        if valid { "found".green() } else { "not found".red() }
    );
    println!();

    let mut programs = ui::Table::new(&["Program", "Executable"]);
    for name in crate::compiler::Programs::NAMES {
        if let Some(value) = compiler.programs.get(name)
            && !value.is_empty()
        {
            programs.add_row(vec![name.to_string(), value.to_string()]);
        }
    }
    if !programs.is_empty() {
        programs.print();
    }

    println!("\n{}", "Commands:".bold());
    for kind in CommandType::ALL {
        for tool in compiler.commands.tools(kind) {
            println!("  {} {}", format!("{}:", kind.name()).cyan(), tool.command);
        }
    }

    println!(
        "\n{}: {}  {}: {}",
        "Include switch".bold(),
        compiler.switches.include_dirs,
        "Object extension".bold(),
        compiler.switches.object_extension
    );

    let categories = compiler.custom_options.categories();
    println!(
        "{}: {} in {} categories",
        "Options".bold(),
        compiler.custom_options.len(),
        categories.len()
    );
    let checked = compiler.custom_options.checked_names();
    if !checked.is_empty() {
        println!("{}: {}", "Checked".bold(), checked.join(", "));
    }
    println!("{}: {}", "Diagnostic rules".bold(), compiler.regexes.len());
    Ok(())
}

/// `cbp compiler diagnose`: classify build output line by line.
pub fn diagnose(args: &CompilerArgs<'_>, input: Option<&PathBuf>) -> Result<()> {
    let mut compiler = load_compiler(args)?;
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let (mut warnings, mut errors) = (0usize, 0usize);
    for line in reader.lines() {
        let line = line?;
        let kind = compiler.check_for_warnings_and_errors(&line);
        let tag = match kind {
            CompilerLineType::Normal => continue,
            CompilerLineType::Warning => {
                warnings += 1;
                "warning".yellow()
            }
            CompilerLineType::Error => {
                errors += 1;
                "error".red()
            }
            CompilerLineType::Info => "info".blue(),
        };
        let location = match (compiler.error_filename(), compiler.error_line()) {
            ("", _) => String::new(),
            (file, "") => format!("{file}: "),
            (file, line) => format!("{file}:{line}: "),
        };
        println!("{} {}{}", tag.bold(), location, compiler.error());
    }
    println!();
    ui::note(format!("{} error(s), {} warning(s)", errors, warnings));
    Ok(())
}

/// `cbp compiler version-cmp`
pub fn version_cmp(first: &str, second: &str, op: Option<&str>) -> Result<()> {
    match op {
        Some(op) => {
            let parsed = VersionOp::parse(op)
                .with_context(|| format!("Unknown comparison operator '{}'", op))?;
            let holds = parsed.compare(first, second)?;
            println!("{} {} {}: {}", first, parsed.name(), second, holds);
        }
        None => {
            let ordering = cmp_version(first, second)?;
            let symbol = match ordering {
                std::cmp::Ordering::Less => "<",
                std::cmp::Ordering::Equal => "==",
                std::cmp::Ordering::Greater => ">",
            };
            println!("{} {} {}", first, symbol.bold(), second);
        }
    }
    Ok(())
}
