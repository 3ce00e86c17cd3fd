//! # cbp CLI Entry Point
//!
//! This is the main executable for the `cbp` command-line tool.
//! It parses CLI arguments using clap and routes commands to the handlers in
//! [`cbproject::commands`].
//!
//! ## Command Structure
//!
//! - **Projects**: `info`, `upgrade`, `export`, `globs`
//! - **Compilers**: `compiler show`, `compiler diagnose`, `compiler version-cmp`
//! - **Plugins**: `plugins scan`, `plugins manifest`
//! - **Shell**: `completions`

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::{Path, PathBuf};

use cbproject::commands;
use cbproject::commands::compiler::CompilerArgs;
use cbproject::commands::plugins::ScanArgs;
use cbproject::commands::project::LoadArgs;
use cbproject::config::ConfigStore;
use cbproject::logger;

#[derive(Parser)]
#[command(name = "cbp")]
#[command(about = "Inspect, migrate and export Code::Blocks projects", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Answer every question with its default
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Settings file [default: platform config dir]
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a project file
    Info {
        project: PathBuf,
        /// Directory with options_<id>.xml files, used to flag unknown compilers
        #[arg(long)]
        options_dir: Option<PathBuf>,
    },
    /// Rewrite a project in the current file format
    Upgrade {
        project: PathBuf,
        /// Write here instead of overwriting (a .bak copy is kept otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export one build target as a standalone project
    Export {
        project: PathBuf,
        #[arg(short, long)]
        target: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rescan the project's globs against the disk
    Globs {
        project: PathBuf,
        /// Save the project if files were added or removed
        #[arg(long)]
        save: bool,
    },
    /// Compiler option sets
    Compiler {
        #[command(subcommand)]
        op: CompilerOp,
    },
    /// Plugin discovery
    Plugins {
        #[command(subcommand)]
        op: PluginsOp,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum CompilerOp {
    /// Load a compiler's option files and settings and print them
    Show {
        id: String,
        #[arg(long)]
        options_dir: PathBuf,
        #[arg(long)]
        global_dir: Option<PathBuf>,
    },
    /// Classify build output (file or stdin) with the compiler's rules
    Diagnose {
        id: String,
        #[arg(long)]
        options_dir: PathBuf,
        #[arg(long)]
        global_dir: Option<PathBuf>,
        input: Option<PathBuf>,
    },
    /// Compare two dotted version strings
    VersionCmp {
        first: String,
        second: String,
        /// One of eq, ne, lt, le, gt, ge
        #[arg(long)]
        op: Option<String>,
    },
}

#[derive(Subcommand)]
enum PluginsOp {
    /// Load the plugin libraries in a directory
    Scan {
        dir: PathBuf,
        #[arg(long)]
        resource_dir: Option<PathBuf>,
        /// Do not load anything
        #[arg(long)]
        safe_mode: bool,
        /// Attach the enabled plugins after loading
        #[arg(long)]
        attach: bool,
    },
    /// Print the manifest of a plugin resource archive
    Manifest { archive: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logger::configure(cli.verbose) {
        eprintln!("{} failed to set up logging: {}", "x".red(), e);
    }
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_args<'a>(project: &'a Path, options_dir: Option<&'a Path>, yes: bool) -> LoadArgs<'a> {
    LoadArgs {
        path: project,
        assume_yes: yes,
        options_dir,
        rescan_globs: false,
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings.unwrap_or_else(ConfigStore::default_path);
    let yes = cli.yes;

    match &cli.command {
        Commands::Info {
            project,
            options_dir,
        } => commands::project::print_info(&load_args(project, options_dir.as_deref(), yes)),
        Commands::Upgrade { project, output } => {
            commands::project::upgrade(&load_args(project, None, yes), output.as_deref())
        }
        Commands::Export {
            project,
            target,
            output,
        } => commands::project::export(&load_args(project, None, yes), target, output),
        Commands::Globs { project, save } => {
            commands::project::rescan_globs(&load_args(project, None, yes), *save)
        }
        Commands::Compiler { op } => match op {
            CompilerOp::Show {
                id,
                options_dir,
                global_dir,
            } => commands::compiler::show(&CompilerArgs {
                id,
                options_dir,
                global_dir: global_dir.as_deref(),
                settings: &settings,
            }),
            CompilerOp::Diagnose {
                id,
                options_dir,
                global_dir,
                input,
            } => commands::compiler::diagnose(
                &CompilerArgs {
                    id,
                    options_dir,
                    global_dir: global_dir.as_deref(),
                    settings: &settings,
                },
                input.as_ref(),
            ),
            CompilerOp::VersionCmp { first, second, op } => {
                commands::compiler::version_cmp(first, second, op.as_deref())
            }
        },
        Commands::Plugins { op } => match op {
            PluginsOp::Scan {
                dir,
                resource_dir,
                safe_mode,
                attach,
            } => commands::plugins::scan(&ScanArgs {
                dir,
                resource_dir: resource_dir.as_deref(),
                settings: &settings,
                safe_mode: *safe_mode,
                attach: *attach,
            }),
            PluginsOp::Manifest { archive } => commands::plugins::show_manifest(archive),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
