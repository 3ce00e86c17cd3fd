//! Macro expansion for paths and command lines.
//!
//! Compiler paths like `$(CODEBLOCKS)/MinGW` must be expanded before the
//! filesystem is probed. The host supplies the expander; [`EnvMacros`] is the
//! default one and reads a custom map first, then the process environment.

use std::collections::HashMap;

pub trait MacroExpander {
    fn expand(&self, text: &str) -> String;
}

/// Expands `$(VAR)`, `${VAR}`, `$VAR` and `%VAR%`.
///
/// Unknown variables expand to the empty string. `$$` produces a literal `$`.
#[derive(Debug, Clone, Default)]
pub struct EnvMacros {
    vars: HashMap<String, String>,
    use_environment: bool,
}

impl EnvMacros {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            use_environment: true,
        }
    }

    /// An expander that never looks at the process environment.
    pub fn isolated() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    fn lookup(&self, name: &str) -> String {
        if let Some(value) = self.vars.get(name) {
            return value.clone();
        }
        if self.use_environment {
            return std::env::var(name).unwrap_or_default();
        }
        String::new()
    }
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl MacroExpander for EnvMacros {
    fn expand(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '$' => match chars.peek() {
                    Some('$') => {
                        chars.next();
                        result.push('$');
                    }
                    Some('(') | Some('{') => {
                        let close = if chars.next() == Some('(') { ')' } else { '}' };
                        let name: String = chars.by_ref().take_while(|&ch| ch != close).collect();
                        result.push_str(&self.lookup(&name));
                    }
                    Some(&ch) if is_var_char(ch) => {
                        let mut name = String::new();
                        while let Some(&ch) = chars.peek() {
                            if !is_var_char(ch) {
                                break;
                            }
                            name.push(ch);
                            chars.next();
                        }
                        result.push_str(&self.lookup(&name));
                    }
                    _ => result.push('$'),
                },
                '%' => {
                    let rest: String = chars.clone().take_while(|&ch| ch != '%').collect();
                    let closed = chars.clone().nth(rest.chars().count()) == Some('%');
                    if closed && !rest.is_empty() && rest.chars().all(is_var_char) {
                        for _ in 0..=rest.chars().count() {
                            chars.next();
                        }
                        result.push_str(&self.lookup(&rest));
                    } else {
                        result.push('%');
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }
}
