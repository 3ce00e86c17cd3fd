//! Regex-driven classification of compiler output lines.

use crate::paths::unix_filename;
use regex::Regex;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompilerLineType {
    #[default]
    Normal,
    Warning,
    Error,
    Info,
}

impl CompilerLineType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "normal" => Some(Self::Normal),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// One diagnostic rule. Capture indices of 0 mean "not captured".
#[derive(Debug, Clone)]
pub struct RegExStruct {
    pub desc: String,
    pub line_type: CompilerLineType,
    pattern: String,
    pub msg: [usize; 3],
    pub filename: usize,
    pub line: usize,
    compiled: Option<Regex>,
}

impl PartialEq for RegExStruct {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
            && self.line_type == other.line_type
            && self.pattern == other.pattern
            && self.msg == other.msg
            && self.filename == other.filename
            && self.line == other.line
    }
}

impl Eq for RegExStruct {}

impl RegExStruct {
    pub fn new(
        desc: impl Into<String>,
        line_type: CompilerLineType,
        pattern: impl Into<String>,
        msg: [usize; 3],
        filename: usize,
        line: usize,
    ) -> Self {
        let mut rs = Self {
            desc: desc.into(),
            line_type,
            pattern: String::new(),
            msg,
            filename,
            line,
            compiled: None,
        };
        rs.set_pattern(pattern);
        rs
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Replaces the pattern. An invalid pattern is kept as text but never
    /// matches.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
        self.compiled = if self.pattern.is_empty() {
            None
        } else {
            match Regex::new(&posix_brackets(&self.pattern)) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("invalid regex '{}' in rule '{}': {}", self.pattern, self.desc, e);
                    None
                }
            }
        };
    }

    pub fn has_regex(&self) -> bool {
        self.compiled.is_some()
    }
}

/// Rewrites POSIX bracket expressions into the `regex` crate's syntax.
///
/// Option files are written for POSIX engines, where `]` right after the
/// opening `[` (or `[^`) is a literal and a `[` inside a class needs no
/// escape. `&` and `~` are escaped too since doubled they are class set
/// operators. Named classes like `[:alnum:]` pass through.
pub fn posix_brackets(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains('[') {
        return Cow::Borrowed(pattern);
    }
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            out.push(c);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }
        if !in_class {
            out.push(c);
            if c == '[' {
                in_class = true;
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
                if chars.get(i + 1) == Some(&']') {
                    out.push_str("\\]");
                    i += 1;
                }
            }
            i += 1;
            continue;
        }
        match c {
            '[' if chars.get(i + 1) == Some(&':') => {
                let rest: String = chars[i + 2..].iter().collect();
                match rest.find(":]") {
                    Some(end) if rest[..end].chars().all(|c| c.is_ascii_alphabetic()) => {
                        out.push_str("[:");
                        out.push_str(&rest[..end]);
                        out.push_str(":]");
                        i += 2 + rest[..end].chars().count() + 2;
                        continue;
                    }
                    _ => out.push_str("\\["),
                }
            }
            '[' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            ']' => {
                out.push(c);
                in_class = false;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    Cow::Owned(out)
}

/// Result of the last classified line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticState {
    pub filename: String,
    pub line: String,
    pub message: String,
}

/// Classifies `line` with the first matching rule, updating `state`.
///
/// Without multi-line messages the state is cleared for every line. With
/// them, the fields carry over until a match captures a non-empty filename
/// or line number; captured message parts accumulate, space-separated.
pub fn check_line(
    rules: &[RegExStruct],
    multi_line: bool,
    state: &mut DiagnosticState,
    line: &str,
) -> CompilerLineType {
    if !multi_line {
        *state = DiagnosticState::default();
    }

    for rule in rules {
        let Some(re) = &rule.compiled else {
            continue;
        };
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let group = |index: usize| -> String {
            if index == 0 {
                return String::new();
            }
            caps.get(index).map(|m| m.as_str().to_string()).unwrap_or_default()
        };

        let filename = group(rule.filename);
        let line_no = group(rule.line);
        if multi_line && (!filename.is_empty() || !line_no.is_empty()) {
            *state = DiagnosticState::default();
        }
        if !filename.is_empty() {
            state.filename = unix_filename(&filename);
        }
        if !line_no.is_empty() {
            state.line = line_no;
        }
        for index in rule.msg {
            let part = group(index);
            if part.is_empty() {
                continue;
            }
            if !state.message.is_empty() {
                state.message.push(' ');
            }
            state.message.push_str(&part);
        }
        return rule.line_type;
    }

    CompilerLineType::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcc_rules() -> Vec<RegExStruct> {
        vec![
            RegExStruct::new(
                "Compiler warning",
                CompilerLineType::Warning,
                r"^([][{}() \t#%$~[:alnum:]&_:+/\.\\-]+):([0-9]+):[0-9]*:? [Ww]arning:[ \t]+(.*)",
                [3, 0, 0],
                1,
                2,
            ),
            RegExStruct::new(
                "Compiler error",
                CompilerLineType::Error,
                r"^([][{}() \t#%$~[:alnum:]&_:+/\.\\-]+):([0-9]+):[0-9]*:? (.*)",
                [3, 0, 0],
                1,
                2,
            ),
        ]
    }

    #[test]
    fn test_first_match_wins() {
        let rules = gcc_rules();
        let mut state = DiagnosticState::default();
        let lt = check_line(&rules, false, &mut state, "src\\main.cpp:12: warning: unused variable 'x'");
        assert_eq!(lt, CompilerLineType::Warning);
        assert_eq!(state.filename, "src/main.cpp");
        assert_eq!(state.line, "12");
        assert_eq!(state.message, "unused variable 'x'");

        let reversed: Vec<_> = rules.into_iter().rev().collect();
        let lt = check_line(&reversed, false, &mut state, "src/main.cpp:12: warning: unused variable 'x'");
        assert_eq!(lt, CompilerLineType::Error);
        assert_eq!(state.message, "warning: unused variable 'x'");
    }

    #[test]
    fn test_posix_bracket_patterns_compile() {
        assert!(gcc_rules().iter().all(RegExStruct::has_regex));
        assert_eq!(posix_brackets(r"^(\d+)$"), r"^(\d+)$");
        assert_eq!(posix_brackets("[]a]"), r"[\]a]");
        assert_eq!(posix_brackets("[^]a[]"), r"[^\]a\[]");
        assert_eq!(posix_brackets("[[:digit:]&~]x"), r"[[:digit:]\&\~]x");
        assert_eq!(posix_brackets(r"\[(a)\]"), r"\[(a)\]");

        let rule = RegExStruct::new(
            "Linker error",
            CompilerLineType::Error,
            r"^([][{}() \t#%$~[:alnum:]&_:+/\.\\-]+)\.o:[ \t]+(.*)",
            [2, 0, 0],
            1,
            0,
        );
        assert!(rule.has_regex());
        let mut state = DiagnosticState::default();
        let lt = check_line(&[rule], false, &mut state, "obj/Debug/[x] main.o: undefined reference to `foo'");
        assert_eq!(lt, CompilerLineType::Error);
        assert_eq!(state.filename, "obj/Debug/[x] main");
        assert_eq!(state.message, "undefined reference to `foo'");
    }

    #[test]
    fn test_no_match_is_normal_and_clears() {
        let rules = gcc_rules();
        let mut state = DiagnosticState {
            filename: "old.c".into(),
            ..Default::default()
        };
        assert_eq!(check_line(&rules, false, &mut state, "Linking console executable"), CompilerLineType::Normal);
        assert_eq!(state, DiagnosticState::default());
    }

    #[test]
    fn test_multi_line_accumulates() {
        let rules = vec![
            RegExStruct::new("head", CompilerLineType::Error, r"^(\S+)\((\d+)\) : error", [0, 0, 0], 1, 2),
            RegExStruct::new("cont", CompilerLineType::Error, r"^\s+(.+)$", [1, 0, 0], 0, 0),
        ];
        let mut state = DiagnosticState::default();
        check_line(&rules, true, &mut state, "foo.c(7) : error");
        check_line(&rules, true, &mut state, "   first part");
        check_line(&rules, true, &mut state, "plain text");
        check_line(&rules, true, &mut state, "   second part");
        assert_eq!(state.filename, "foo.c");
        assert_eq!(state.line, "7");
        assert_eq!(state.message, "first part second part");

        check_line(&rules, true, &mut state, "bar.c(9) : error");
        assert_eq!(state.filename, "bar.c");
        assert!(state.message.is_empty());
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let rule = RegExStruct::new("bad", CompilerLineType::Error, "([", [0, 0, 0], 0, 0);
        assert!(!rule.has_regex());
        let mut state = DiagnosticState::default();
        assert_eq!(check_line(&[rule], false, &mut state, "(["), CompilerLineType::Normal);
    }
}
