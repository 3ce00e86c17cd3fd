//! Dotted version comparison used by `<if exec=...>` predicates.

use crate::error::VersionError;
use std::cmp::Ordering;

fn components(version: &str) -> Result<Vec<u64>, VersionError> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return Err(VersionError(version.to_string()));
    }
    trimmed
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError(version.to_string()));
            }
            part.parse::<u64>()
                .map_err(|_| VersionError(version.to_string()))
        })
        .collect()
}

/// Compares two dotted integer versions.
///
/// The walk follows the components of `second`; a component missing on the
/// left reads as zero, and components left over on the left once `second`
/// is exhausted make `first` the greater one. So `"1.0"` equals `"1.0.0"`
/// while `"4.2.0"` is greater than `"4.2"`.
///
/// Empty strings, non-numeric components and stray dots are errors. An
/// `<if exec=...>` that hits one falls back to its `default`.
pub fn cmp_version(first: &str, second: &str) -> Result<Ordering, VersionError> {
    let a = components(first)?;
    let b = components(second)?;

    for (i, rhs) in b.iter().enumerate() {
        let lhs = a.get(i).copied().unwrap_or(0);
        match lhs.cmp(rhs) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }

    if a.len() > b.len() {
        Ok(Ordering::Greater)
    } else {
        Ok(Ordering::Equal)
    }
}

/// Comparison operator of a version predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Gt,
    Ge,
    Eq,
    Ne,
    Le,
    Lt,
}

impl VersionOp {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "gt" | ">" => Some(Self::Gt),
            "ge" | ">=" => Some(Self::Ge),
            "eq" | "==" | "=" => Some(Self::Eq),
            "ne" | "!=" => Some(Self::Ne),
            "le" | "<=" => Some(Self::Le),
            "lt" | "<" => Some(Self::Lt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Le => "le",
            Self::Lt => "lt",
        }
    }

    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Le => ordering != Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
        }
    }

    /// Evaluates `found <op> wanted`.
    pub fn compare(self, found: &str, wanted: &str) -> Result<bool, VersionError> {
        cmp_version(found, wanted).map(|o| self.holds(o))
    }
}
