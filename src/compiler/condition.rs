//! `<if>` conditions of compiler option files.
//!
//! Parsing produces plain [`Condition`] data. Evaluation is done by a
//! [`ConditionEvaluator`], which owns the only piece that touches the outside
//! world: a [`CommandRunner`] used for `exec` probes.
//!
//! ## Syntax
//!
//! ```xml
//! <if platform="windows">...</if>
//! <if exec="C -dumpversion" version_ge="4.8" default="true">...</if>
//! <if exec="C --version" regex="clang version ([0-9.]+)" op="ge" version="10">...</if>
//! <else>...</else>
//! ```

use super::diagnostics::posix_brackets;
use super::version::VersionOp;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Program aliases accepted as the first token of `exec`.
pub const PROGRAM_ALIASES: [&str; 6] = ["C", "CPP", "LD", "LIB", "WINDRES", "MAKE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Some output line matches `pattern`. With `compare`, the first capture
    /// group (or the whole match) must also satisfy the version comparison.
    Regex {
        pattern: String,
        compare: Option<(VersionOp, String)>,
    },
    /// The first output line compared as a version.
    FirstLine(VersionOp, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// True when the host matches any of the tags.
    Platform(Vec<String>),
    /// Runs `argv` and ANDs the predicates over its output. If the command
    /// cannot be run, evaluates to `default`.
    Exec {
        argv: Vec<String>,
        predicates: Vec<Predicate>,
        default: bool,
    },
}

impl Condition {
    /// Parses the attributes of an `<if>` element. Returns `None` when the
    /// element has neither `platform` nor `exec`.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Option<Self> {
        if let Some(platform) = node.attribute("platform") {
            let tags = platform
                .split(['|', ';', ','])
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            return Some(Self::Platform(tags));
        }

        let exec = node.attribute("exec")?;
        let argv: Vec<String> = exec.split_whitespace().map(str::to_string).collect();
        let default = matches!(node.attribute("default"), Some("true" | "1"));

        let mut predicates = Vec::new();
        if let Some(pattern) = node.attribute("regex") {
            let compare = match (node.attribute("op"), node.attribute("version")) {
                (Some(op), Some(version)) => match VersionOp::parse(op) {
                    Some(op) => Some((op, version.to_string())),
                    None => {
                        log::warn!("unknown version operator '{}' in <if>", op);
                        None
                    }
                },
                _ => None,
            };
            predicates.push(Predicate::Regex {
                pattern: pattern.to_string(),
                compare,
            });
        }
        for attr in node.attributes() {
            if let Some(op) = attr.name().strip_prefix("version_") {
                match VersionOp::parse(op) {
                    Some(op) => predicates.push(Predicate::FirstLine(op, attr.value().to_string())),
                    None => log::warn!("unknown version predicate '{}' in <if>", attr.name()),
                }
            }
        }

        Some(Self::Exec {
            argv,
            predicates,
            default,
        })
    }
}

/// Tags the host platform answers to.
pub fn host_platform_tags() -> Vec<&'static str> {
    let mut tags = vec![std::env::consts::OS];
    if cfg!(windows) {
        tags.push("windows");
        tags.push("msw");
    }
    if cfg!(unix) {
        tags.push("unix");
    }
    if cfg!(target_os = "macos") {
        tags.extend(["macosx", "darwin", "mac"]);
    }
    tags
}

/// Runs a probe command and returns its output lines.
pub trait CommandRunner {
    /// `search_prefix`, when set, is prepended to the `PATH` of the child.
    fn run(&self, argv: &[String], search_prefix: Option<&Path>) -> std::io::Result<Vec<String>>;
}

impl<F> CommandRunner for F
where
    F: Fn(&[String], Option<&Path>) -> std::io::Result<Vec<String>>,
{
    fn run(&self, argv: &[String], search_prefix: Option<&Path>) -> std::io::Result<Vec<String>> {
        self(argv, search_prefix)
    }
}

/// Blocking runner backed by `std::process::Command`. Captures stdout
/// followed by stderr; there is no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String], search_prefix: Option<&Path>) -> std::io::Result<Vec<String>> {
        let Some((program, args)) = argv.split_first() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command",
            ));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(prefix) = search_prefix {
            let mut dirs = vec![prefix.to_path_buf()];
            if let Some(path) = std::env::var_os("PATH") {
                dirs.extend(std::env::split_paths(&path));
            }
            if let Ok(joined) = std::env::join_paths(dirs) {
                cmd.env("PATH", joined);
            }
        }

        log::debug!("probing: {}", argv.join(" "));
        let output = cmd.output()?;
        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string),
        );
        Ok(lines)
    }
}

/// Evaluates conditions for one compiler.
pub struct ConditionEvaluator<'a> {
    runner: &'a dyn CommandRunner,
    programs: Vec<(String, String)>,
    bin_dir: Option<PathBuf>,
    platform_tags: Vec<String>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            programs: Vec::new(),
            bin_dir: None,
            platform_tags: host_platform_tags().into_iter().map(str::to_string).collect(),
        }
    }

    /// Registers the value an `exec` alias (`C`, `CPP`, ...) stands for.
    pub fn with_program(mut self, alias: &str, value: &str) -> Self {
        self.programs.retain(|(a, _)| a != alias);
        self.programs.push((alias.to_string(), value.to_string()));
        self
    }

    /// Directory prepended to the probe's search path.
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// Overrides the host platform tags.
    pub fn with_platform_tags(mut self, tags: &[&str]) -> Self {
        self.platform_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn evaluate(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Platform(tags) => tags
                .iter()
                .any(|t| self.platform_tags.iter().any(|h| h == t)),
            Condition::Exec {
                argv,
                predicates,
                default,
            } => match self.probe(argv, predicates) {
                Ok(result) => result,
                Err(reason) => {
                    log::debug!(
                        "condition '{}' fell back to {}: {}",
                        argv.join(" "),
                        default,
                        reason
                    );
                    *default
                }
            },
        }
    }

    fn probe(&self, argv: &[String], predicates: &[Predicate]) -> Result<bool, String> {
        let mut argv = argv.to_vec();
        if let Some(first) = argv.first_mut()
            && let Some((_, value)) = self.programs.iter().find(|(alias, _)| alias == first)
        {
            *first = value.clone();
        }
        if argv.first().is_none_or(|p| p.is_empty()) {
            return Err("no program to run".to_string());
        }

        let lines = self
            .runner
            .run(&argv, self.bin_dir.as_deref())
            .map_err(|e| e.to_string())?;

        for predicate in predicates {
            if !check_predicate(predicate, &lines)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn check_predicate(predicate: &Predicate, lines: &[String]) -> Result<bool, String> {
    match predicate {
        Predicate::Regex { pattern, compare } => {
            let re = Regex::new(&posix_brackets(pattern)).map_err(|e| e.to_string())?;
            let Some(caps) = lines.iter().find_map(|l| re.captures(l)) else {
                return Ok(false);
            };
            match compare {
                None => Ok(true),
                Some((op, wanted)) => {
                    let found = caps
                        .get(1)
                        .or_else(|| caps.get(0))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    op.compare(found.trim(), wanted).map_err(|e| e.to_string())
                }
            }
        }
        Predicate::FirstLine(op, wanted) => {
            let first = lines.first().map(|l| l.trim()).unwrap_or_default();
            op.compare(first, wanted).map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Condition {
        let doc = roxmltree::Document::parse(xml).unwrap();
        Condition::from_node(doc.root_element()).unwrap()
    }

    fn fixed(lines: &'static [&'static str]) -> impl Fn(&[String], Option<&Path>) -> std::io::Result<Vec<String>> {
        move |_: &[String], _: Option<&Path>| Ok(lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn test_platform_condition() {
        let runner = fixed(&[]);
        let eval = ConditionEvaluator::new(&runner).with_platform_tags(&["linux", "unix"]);
        assert!(eval.evaluate(&parse(r#"<if platform="windows|unix"/>"#)));
        assert!(!eval.evaluate(&parse(r#"<if platform="windows"/>"#)));
    }

    #[test]
    fn test_version_shortcut_uses_first_line() {
        let runner = fixed(&["9.3.0", "ignored"]);
        let eval = ConditionEvaluator::new(&runner);
        assert!(eval.evaluate(&parse(r#"<if exec="C -dumpversion" version_ge="4.8"/>"#)));
        assert!(!eval.evaluate(&parse(r#"<if exec="C -dumpversion" version_lt="4.8"/>"#)));
    }

    #[test]
    fn test_regex_with_version_compare() {
        let runner = fixed(&["Target: x86_64", "clang version 14.0.6"]);
        let eval = ConditionEvaluator::new(&runner);
        assert!(eval.evaluate(&parse(
            r#"<if exec="C --version" regex="clang version ([0-9.]+)" op="ge" version="10"/>"#
        )));
        assert!(!eval.evaluate(&parse(r#"<if exec="C --version" regex="gcc version"/>"#)));
    }

    #[test]
    fn test_predicates_are_anded() {
        let runner = fixed(&["5.4"]);
        let eval = ConditionEvaluator::new(&runner);
        assert!(!eval.evaluate(&parse(r#"<if exec="C -v" version_gt="5.0" version_lt="5.2"/>"#)));
    }

    #[test]
    fn test_failed_probe_uses_default() {
        let failing = |_: &[String], _: Option<&Path>| -> std::io::Result<Vec<String>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"))
        };
        let eval = ConditionEvaluator::new(&failing);
        assert!(eval.evaluate(&parse(r#"<if exec="C -v" version_ge="1" default="true"/>"#)));
        assert!(!eval.evaluate(&parse(r#"<if exec="C -v" version_ge="1"/>"#)));
    }

    #[test]
    fn test_unparsable_version_uses_default() {
        let runner = fixed(&["gcc (GCC) twelve"]);
        let eval = ConditionEvaluator::new(&runner);
        assert!(eval.evaluate(&parse(r#"<if exec="C -dumpversion" version_ge="4.8" default="true"/>"#)));
        assert!(!eval.evaluate(&parse(r#"<if exec="C -dumpversion" version_ge="4.8"/>"#)));
        assert!(eval.evaluate(&parse(r#"<if exec="C -v" regex="([" default="true"/>"#)));
    }

    #[test]
    fn test_alias_is_replaced_by_program() {
        let seen = std::cell::RefCell::new(Vec::new());
        let runner = |argv: &[String], prefix: Option<&Path>| -> std::io::Result<Vec<String>> {
            seen.borrow_mut().push((argv.to_vec(), prefix.map(Path::to_path_buf)));
            Ok(vec!["1.0".to_string()])
        };
        let eval = ConditionEvaluator::new(&runner)
            .with_program("C", "x86_64-w64-mingw32-gcc")
            .with_bin_dir("/opt/mingw/bin");
        assert!(eval.evaluate(&parse(r#"<if exec="C -dumpversion"/>"#)));
        let seen = seen.borrow();
        assert_eq!(seen[0].0, vec!["x86_64-w64-mingw32-gcc", "-dumpversion"]);
        assert_eq!(seen[0].1.as_deref(), Some(Path::new("/opt/mingw/bin")));
    }
}
