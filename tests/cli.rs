//! End-to-end tests for the `cbp` binary.
//!
//! Each test writes its inputs to a temporary directory and runs the built
//! executable against them.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<CodeBlocks_project_file>
	<FileVersion major="1" minor="6" />
	<Project>
		<Option title="hello" />
		<Option compiler="gcc" />
		<Build>
			<Target title="Debug">
				<Option output="bin/Debug/hello" prefix_auto="1" extension_auto="1" />
				<Option type="1" />
			</Target>
			<Target title="Release">
				<Option output="bin/Release/hello" prefix_auto="1" extension_auto="1" />
				<Option type="1" />
			</Target>
		</Build>
		<Unit filename="main.cpp" />
		<Unit filename="debug_only.cpp">
			<Option target="Debug" />
		</Unit>
	</Project>
</CodeBlocks_project_file>
"#;

fn cbp(args: &[&str], settings: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cbp"))
        .args(args)
        .arg("--settings")
        .arg(settings)
        .arg("--yes")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run cbp")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_version_cmp() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("settings.toml");

    let output = cbp(&["compiler", "version-cmp", "4.10", "4.9"], &settings);
    assert!(output.status.success());
    assert!(stdout(&output).contains("4.10 > 4.9"));

    let output = cbp(
        &["compiler", "version-cmp", "1.0", "1.0.0", "--op", "eq"],
        &settings,
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("true"));

    let output = cbp(&["compiler", "version-cmp", "1.x", "1.0"], &settings);
    assert!(!output.status.success());
}

#[test]
fn test_info_lists_targets() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("hello.cbp");
    fs::write(&project, PROJECT).unwrap();

    let output = cbp(&["info", project.to_str().unwrap()], &dir.path().join("s.toml"));
    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("hello"));
    assert!(text.contains("Debug"));
    assert!(text.contains("Release"));
    assert!(text.contains("Files: 2"));
}

#[test]
fn test_upgrade_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("s.toml");
    let project = dir.path().join("hello.cbp");
    fs::write(&project, PROJECT).unwrap();

    let upgraded = dir.path().join("upgraded.cbp");
    let output = cbp(
        &[
            "upgrade",
            project.to_str().unwrap(),
            "-o",
            upgraded.to_str().unwrap(),
        ],
        &settings,
    );
    assert!(output.status.success(), "{:?}", output);
    assert!(!dir.path().join("hello.cbp.bak").exists());
    let text = fs::read_to_string(&upgraded).unwrap();
    assert!(text.contains(r#"<Option title="hello" />"#));

    let exported = dir.path().join("release.cbp");
    let output = cbp(
        &[
            "export",
            project.to_str().unwrap(),
            "--target",
            "Release",
            "-o",
            exported.to_str().unwrap(),
        ],
        &settings,
    );
    assert!(output.status.success(), "{:?}", output);
    let text = fs::read_to_string(&exported).unwrap();
    assert!(text.contains("main.cpp"));
    assert!(!text.contains("debug_only.cpp"));
    assert!(!text.contains(r#"title="Debug""#));

    let output = cbp(
        &[
            "export",
            project.to_str().unwrap(),
            "--target",
            "Profile",
            "-o",
            exported.to_str().unwrap(),
        ],
        &settings,
    );
    assert!(!output.status.success());
}

#[test]
fn test_upgrade_in_place_keeps_backup() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("hello.cbp");
    fs::write(&project, PROJECT).unwrap();

    let output = cbp(
        &["upgrade", project.to_str().unwrap()],
        &dir.path().join("s.toml"),
    );
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        fs::read_to_string(dir.path().join("hello.cbp.bak")).unwrap(),
        PROJECT
    );
}

#[test]
fn test_not_a_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.cbp");
    fs::write(&bogus, "<workspace/>").unwrap();

    let output = cbp(&["info", bogus.to_str().unwrap()], &dir.path().join("s.toml"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error"));
}
