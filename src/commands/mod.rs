//! CLI Command handlers
//!
//! Each submodule implements one `cbp` command group; `main.rs` only parses
//! arguments and dispatches here.

pub mod compiler;
pub mod plugins;
pub mod project;
