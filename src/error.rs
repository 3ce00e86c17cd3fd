//! Error types shared across the crate.
//!
//! Each component has its own enum so callers can tell a malformed project
//! file apart from a missing compiler options file or a rejected plugin.
//! The `cbp` binary wraps all of them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort loading or saving a project file.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("not a Code::Blocks project file (root element is <{0}>)")]
    NotAProject(String),

    #[error("project file has no <Project> element")]
    MissingProjectElement,

    #[error("no such build target: {0}")]
    UnknownTarget(String),
}

/// Errors raised by the compiler option model.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("compiler id '{0}' is already in use")]
    DuplicateId(String),

    #[error("compiler id '{0}' is not valid")]
    InvalidId(String),

    #[error("options file '{0}' not found")]
    OptionsNotFound(String),

    #[error("XML error in '{file}': {source}")]
    Xml {
        file: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("'{0}' is not a compiler options file")]
    NotAnOptionsFile(String),
}

/// A version string that [`crate::compiler::cmp_version`] refuses to compare.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed version string '{0}'")]
pub struct VersionError(pub String);

/// Errors raised by the plugin loader.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to open resource archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid plugin manifest: {0}")]
    Manifest(String),

    #[error("plugin '{name}' was built for SDK {found}, host SDK is {expected}")]
    SdkMismatch {
        name: String,
        found: semver::Version,
        expected: semver::Version,
    },

    #[error("failed to load library {path}: {message}")]
    Library { path: PathBuf, message: String },

    #[error("library {path} does not provide plugin '{name}'")]
    MissingFactory { path: PathBuf, name: String },

    #[error("plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("plugin '{name}' failed to attach: {message}")]
    Attach { name: String, message: String },
}

/// Errors raised by the persisted configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}
