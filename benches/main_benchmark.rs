use cbproject::compiler::{MemorySource, cmp_version};
use cbproject::compiler::{Compiler, CompilerIdRegistry, CompilerLineType, RegExStruct};
use cbproject::loader::{ProjectLoader, to_xml_string};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::Path;

const UNITS: usize = 200;

fn mock_project() -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<CodeBlocks_project_file>
	<FileVersion major="1" minor="6" />
	<Project>
		<Option title="bench" />
		<Option compiler="gcc" />
		<Build>
			<Target title="Debug">
				<Option output="bin/Debug/bench" prefix_auto="1" extension_auto="1" />
				<Option type="1" />
				<Compiler><Add option="-g" /></Compiler>
			</Target>
			<Target title="Release">
				<Option output="bin/Release/bench" prefix_auto="1" extension_auto="1" />
				<Option type="1" />
				<Compiler><Add option="-O2" /></Compiler>
			</Target>
		</Build>
		<Compiler><Add option="-Wall" /><Add directory="include" /></Compiler>
"#,
    );
    for i in 0..UNITS {
        xml.push_str(&format!("\t\t<Unit filename=\"src/module_{i}.cpp\" />\n"));
        xml.push_str(&format!(
            "\t\t<Unit filename=\"include/module_{i}.h\">\n\t\t\t<Option target=\"Debug\" />\n\t\t</Unit>\n"
        ));
    }
    xml.push_str("\t</Project>\n</CodeBlocks_project_file>\n");
    xml
}

fn bench_project_load(c: &mut Criterion) {
    let xml = mock_project();
    c.bench_function("load_project_400_units", |b| {
        b.iter(|| {
            ProjectLoader::new()
                .load_str(black_box(&xml), Path::new("/bench/bench.cbp"))
                .unwrap()
        })
    });
}

fn bench_project_save(c: &mut Criterion) {
    let project = ProjectLoader::new()
        .load_str(&mock_project(), Path::new("/bench/bench.cbp"))
        .unwrap();
    c.bench_function("save_project_400_units", |b| {
        b.iter(|| to_xml_string(black_box(&project)))
    });
}

fn no_exec(_: &[String], _: Option<&Path>) -> std::io::Result<Vec<String>> {
    Err(std::io::Error::other("disabled"))
}

fn bench_options_load(c: &mut Criterion) {
    let source = MemorySource::new()
        .with_file(
            "options_gcc.xml",
            r#"<CodeBlocks_compiler_options>
                <Program name="C" value="gcc"/>
                <Program name="CPP" value="g++"/>
                <Common name="warnings"/>
                <if platform="windows"><Switch name="objectExtension" value="obj"/></if>
                <else><Switch name="objectExtension" value="o"/></else>
            </CodeBlocks_compiler_options>"#,
        )
        .with_file(
            "common_warnings.xml",
            r#"<CodeBlocks_compiler_options>
                <Category name="Warnings">
                    <Option name="all" option="-Wall"/>
                    <Option name="extra" option="-Wextra"/>
                    <Option name="pedantic" option="-pedantic"/>
                </Category>
            </CodeBlocks_compiler_options>"#,
        );
    c.bench_function("load_options_gcc", |b| {
        b.iter(|| {
            let mut registry = CompilerIdRegistry::new();
            let mut gcc = Compiler::new("GNU GCC Compiler", "gcc", &mut registry).unwrap();
            gcc.load_default_options(black_box(&source), &no_exec).unwrap();
            gcc
        })
    });
}

fn bench_diagnostics(c: &mut Criterion) {
    let mut registry = CompilerIdRegistry::new();
    let mut gcc = Compiler::new("GNU GCC Compiler", "gcc", &mut registry).unwrap();
    gcc.regexes.push(RegExStruct::new(
        "Compiler warning",
        CompilerLineType::Warning,
        r"^(.+):([0-9]+):[0-9]*:? warning: (.*)$",
        [3, 0, 0],
        1,
        2,
    ));
    gcc.regexes.push(RegExStruct::new(
        "Compiler error",
        CompilerLineType::Error,
        r"^(.+):([0-9]+):[0-9]*:? error: (.*)$",
        [3, 0, 0],
        1,
        2,
    ));

    c.bench_function("check_build_output", |b| {
        b.iter(|| {
            let _ = gcc.check_for_warnings_and_errors(black_box("src/a.cpp:10:3: warning: unused"));
            let _ = gcc.check_for_warnings_and_errors(black_box("src/b.cpp:4:1: error: expected ';'"));
            let _ = gcc.check_for_warnings_and_errors(black_box("g++ -c src/c.cpp -o obj/c.o"));
        })
    });
}

fn bench_version_cmp(c: &mut Criterion) {
    c.bench_function("cmp_version", |b| {
        b.iter(|| {
            let _ = cmp_version(black_box("4.9.2"), black_box("4.10"));
            let _ = cmp_version(black_box("12.2.0"), black_box("12.2"));
            let _ = cmp_version(black_box("1.0"), black_box("1.0.0"));
        })
    });
}

criterion_group!(
    benches,
    bench_project_load,
    bench_project_save,
    bench_options_load,
    bench_diagnostics,
    bench_version_cmp
);
criterion_main!(benches);
