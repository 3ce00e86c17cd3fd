//! Compiler ID registry.
//!
//! Every live compiler holds a unique, sanitized ID. The registry is an
//! ordinary value owned by whoever creates compilers, so tests can start
//! from a clean slate.

use crate::error::CompilerError;
use std::collections::BTreeSet;

/// Derives a compiler ID from a display name.
///
/// Lower-cases, turns spaces into `_`, drops anything outside `[a-z0-9_-]`
/// and prefixes `_` when the result would start with a digit or `-`.
pub fn sanitize_id(name: &str) -> String {
    let mut id: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            'a'..='z' | '0'..='9' | '_' | '-' => Some(c),
            _ => None,
        })
        .collect();
    if id.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        id.insert(0, '_');
    }
    id
}

/// True if `id` already has the sanitized form.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && sanitize_id(id) == id
}

#[derive(Debug, Default, Clone)]
pub struct CompilerIdRegistry {
    ids: BTreeSet<String>,
}

impl CompilerIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id`. Fails if it is malformed or already taken.
    pub fn reserve(&mut self, id: &str) -> Result<(), CompilerError> {
        if !is_valid_id(id) {
            return Err(CompilerError::InvalidId(id.to_string()));
        }
        if !self.ids.insert(id.to_string()) {
            return Err(CompilerError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    pub fn release(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
