//! Persisted key/value configuration store.
//!
//! Keys are `/`-separated paths such as `/user_sets/gcc/switches/includeDirs`
//! or `/plugins/try_to_activate`. The store is saved as a flat TOML table
//! whose keys are the full paths.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<&String> for ConfigValue {
    fn from(value: &String) -> Self {
        ConfigValue::Text(value.clone())
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<&[String]> for ConfigValue {
    fn from(value: &[String]) -> Self {
        ConfigValue::List(value.to_vec())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigStore {
    entries: BTreeMap<String, ConfigValue>,
}

/// Normalizes a key path to `/a/b/c` form.
fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location used by the `cbp` binary when no `--settings` is given.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cbproject")
            .join("settings.toml")
    }

    /// Loads the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&mut self, path: &str, value: impl Into<ConfigValue>) {
        self.entries.insert(normalize(path), value.into());
    }

    pub fn read(&self, path: &str) -> Option<&ConfigValue> {
        self.entries.get(&normalize(path))
    }

    pub fn read_string(&self, path: &str) -> Option<String> {
        match self.read(path)? {
            ConfigValue::Text(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::List(items) => Some(items.join(";")),
        }
    }

    pub fn read_bool(&self, path: &str) -> Option<bool> {
        match self.read(path)? {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(i) => Some(*i != 0),
            ConfigValue::Text(s) => match s.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            ConfigValue::List(_) => None,
        }
    }

    pub fn read_int(&self, path: &str) -> Option<i64> {
        match self.read(path)? {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::List(_) => None,
        }
    }

    pub fn read_list(&self, path: &str) -> Option<Vec<String>> {
        match self.read(path)? {
            ConfigValue::List(items) => Some(items.clone()),
            ConfigValue::Text(s) => Some(
                s.split(';')
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// True if `path` is a key or has keys below it.
    pub fn exists(&self, path: &str) -> bool {
        let key = normalize(path);
        if self.entries.contains_key(&key) {
            return true;
        }
        let prefix = format!("{}/", key.trim_end_matches('/'));
        self.entries.keys().any(|k| k.starts_with(&prefix))
    }

    pub fn delete(&mut self, path: &str) -> bool {
        self.entries.remove(&normalize(path)).is_some()
    }

    /// Removes `path` and everything below it.
    pub fn delete_sub_path(&mut self, path: &str) {
        let key = normalize(path);
        let prefix = format!("{}/", key.trim_end_matches('/'));
        self.entries
            .retain(|k, _| k != &key && !k.starts_with(&prefix));
    }

    /// Names of the immediate child paths of `path` that have keys below them.
    pub fn enumerate_sub_paths(&self, path: &str) -> Vec<String> {
        self.children(path, true)
    }

    /// Names of the immediate leaf keys of `path`.
    pub fn enumerate_keys(&self, path: &str) -> Vec<String> {
        self.children(path, false)
    }

    fn children(&self, path: &str, want_paths: bool) -> Vec<String> {
        let key = normalize(path);
        let prefix = if key == "/" {
            key
        } else {
            format!("{key}/")
        };
        let mut names: Vec<String> = Vec::new();
        for k in self.entries.keys() {
            if let Some(rest) = k.strip_prefix(&prefix) {
                let (name, is_path) = match rest.split_once('/') {
                    Some((head, _)) => (head, true),
                    None => (rest, false),
                };
                if is_path == want_paths && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
