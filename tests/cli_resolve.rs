//! CLI integration tests driving the compiled binary.

mod common;

use std::process::Command;

use common::Project;

fn texflat() -> Command {
    Command::new(env!("CARGO_BIN_EXE_texflat"))
}

#[test]
fn resolve_prints_flattened_document_to_stdout() {
    let project = Project::new()
        .file("main.tex", "\\input{sections/intro}")
        .file("sections/intro.tex", "Hello");

    let output = texflat()
        .arg("resolve")
        .arg(project.root())
        .arg("--entry")
        .arg("main.tex")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello");
}

#[test]
fn resolve_autodetects_entry_document() {
    let project = Project::new()
        .file(
            "paper.tex",
            "\\documentclass{article}\\begin{document}\\input{body}\\end{document}",
        )
        .file("body.tex", "content");

    let output = texflat()
        .arg("resolve")
        .arg(project.root())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("content"));
    assert!(!stdout.contains("\\input{body}"));
}

#[test]
fn resolve_writes_output_and_bibliography_files() {
    let project = Project::new()
        .file("main.tex", "text \\bibliography{refs}")
        .file("refs.bib", "@misc{a, title={A}}");
    let out_tex = project.root().join("flat.tex");
    let out_bib = project.root().join("merged.bib");

    let status = texflat()
        .arg("resolve")
        .arg(project.root())
        .arg("--entry")
        .arg("main.tex")
        .arg("--output")
        .arg(&out_tex)
        .arg("--bib-output")
        .arg(&out_bib)
        .status()
        .unwrap();

    assert!(status.success());
    let flat = std::fs::read_to_string(&out_tex).unwrap();
    assert!(flat.contains("\\bibliography{merged}"));
    let bib = std::fs::read_to_string(&out_bib).unwrap();
    assert!(bib.contains("@misc{a,"));
}

#[test]
fn resolve_bib_format_json_writes_entry_list() {
    let project = Project::new()
        .file("main.tex", "text \\bibliography{refs}")
        .file("refs.bib", "@misc{a, title={A}}");
    let out_bib = project.root().join("merged.json");

    let status = texflat()
        .arg("resolve")
        .arg(project.root())
        .arg("--entry")
        .arg("main.tex")
        .arg("--bib-output")
        .arg(&out_bib)
        .arg("--bib-format")
        .arg("json")
        .status()
        .unwrap();

    assert!(status.success());
    let bib = std::fs::read_to_string(&out_bib).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&bib).unwrap();
    assert_eq!(entries[0]["key"], "a");
}

#[test]
fn resolve_on_missing_fail_exits_nonzero() {
    let project = Project::new().file("main.tex", "\\input{gone}");

    let output = texflat()
        .arg("resolve")
        .arg(project.root())
        .arg("--entry")
        .arg("main.tex")
        .arg("--on-missing")
        .arg("fail")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unresolved"), "stderr: {stderr}");
}

#[test]
fn resolve_json_report_on_stderr() {
    let project = Project::new().file("main.tex", "\\input{gone}");

    let output = texflat()
        .arg("resolve")
        .arg(project.root())
        .arg("--entry")
        .arg("main.tex")
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let json_start = stderr.find('{').expect("json object on stderr");
    let report: serde_json::Value = serde_json::from_str(&stderr[json_start..]).unwrap();
    assert_eq!(report["files"][0]["status"], "resolved");
    assert!(stderr.contains("missing"));
}

#[test]
fn find_main_prints_relative_path() {
    let project = Project::new().file(
        "nested/paper.tex",
        "\\documentclass{article}\\begin{document}x\\end{document}",
    );

    let output = texflat().arg("find-main").arg(project.root()).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("nested{}paper.tex", std::path::MAIN_SEPARATOR));
}

#[test]
fn id_extracts_arxiv_identifier_from_url() {
    let output = texflat()
        .arg("id")
        .arg("https://arxiv.org/abs/2103.12345v2")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2103.12345v2");
}

#[test]
fn id_rejects_unrecognized_url() {
    let output = texflat()
        .arg("id")
        .arg("https://example.com/nothing")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
