//! # cbproject - Code::Blocks project and toolchain model
//!
//! Reads, migrates and writes Code::Blocks `.cbp` project files, loads
//! compiler option sets from their XML definitions, and discovers plugins
//! from their manifests.
//!
//! ## Features
//!
//! - **Versioned project files**: files from format 1.0 to 1.6 load with
//!   their historical defaults; newer files load after a warning
//! - **Minimal saves**: per-file and per-target settings are written only
//!   when they differ from their defaults
//! - **Globs**: directories tracked by wildcard are reconciled with the disk
//! - **Compiler option sets**: `extends` inheritance, shared `Common` files,
//!   conditional blocks probing the installed toolchain
//! - **User settings as diffs**: only values that differ from the loaded
//!   defaults are persisted
//! - **Plugins**: manifest and SDK checks, refcounted shared libraries,
//!   crash tracking across runs
//!
//! ## Quick Start
//!
//! ```bash
//! # Summarize a project
//! cbp info demo.cbp
//!
//! # Rewrite an old project in the current format
//! cbp upgrade old.cbp
//! ```
//!
//! ## Module Organization
//!
//! - [`project`] - In-memory project model
//! - [`loader`] - `.cbp` reading and writing
//! - [`compiler`] - Compiler option model and option files
//! - [`globs`] - Glob reconciliation
//! - [`plugins`] - Plugin manifests and loading
//! - [`commands`] - CLI command handlers

/// CLI command handlers.
pub mod commands;

/// Compiler option model, option files and diagnostics.
pub mod compiler;

/// Persisted key/value settings.
pub mod config;

/// Error types.
pub mod error;

/// File type classification by extension.
pub mod filetypes;

/// Glob reconciliation against the filesystem.
pub mod globs;

/// Project file loader and saver.
pub mod loader;

/// Logger setup for the `cbp` binary.
pub mod logger;

/// Macro expansion for paths and commands.
pub mod macros;

/// Path helpers: relative paths, wildcard enumeration.
pub mod paths;

/// Plugin discovery and lifetime.
pub mod plugins;

/// Project document model.
pub mod project;

/// Terminal UI utilities (tables, status lines).
pub mod ui;

/// Owned XML tree for writing.
pub mod xml;
