use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn tmplcheck_binary() -> &'static str {
    env!("CARGO_BIN_EXE_tmplcheck")
}

const MAIN_GO: &str = r#"package main

import "github.com/go-web-framework/templates"

var set templates.Set

func main() {
	set.Execute("root.html", nil, map[string]interface{}{"Title": "Home"})
}
"#;

fn project(template: &str, main_go: &str) -> TempDir {
    let dir = tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("templates")).expect("templates dir");
    fs::create_dir(dir.path().join("app")).expect("app dir");
    fs::write(dir.path().join("templates/root.html"), template).expect("write template");
    fs::write(dir.path().join("app/main.go"), main_go).expect("write go file");
    dir
}

fn run(dir: &Path, extra: &[&str]) -> Output {
    Command::new(tmplcheck_binary())
        .current_dir(dir)
        .args(["-t", "templates", "-p", "app"])
        .args(extra)
        .output()
        .expect("run tmplcheck")
}

#[test]
fn prints_missing_fields_as_plain_text() {
    let dir = project("{{.Title}} {{.Subtitle}}", MAIN_GO);
    let output = run(dir.path(), &[]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "root.html\nSubtitle missing: required by main.go:8 in set.Execute\n"
    );
}

#[test]
fn clean_templates_print_nothing() {
    let dir = project("{{.Title}}", MAIN_GO);
    let output = run(dir.path(), &[]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn accepts_single_and_double_dash_format_flags() {
    let dir = project("{{.Missing}}", MAIN_GO);

    for flag in [&["-format", "json"][..], &["--format=json"][..]] {
        let output = run(dir.path(), flag);
        assert!(output.status.success(), "flag {flag:?} failed");

        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("valid json output");
        assert_eq!(value[0]["template"], "root.html");
        let entry = &value[0]["missing"][0];
        assert_eq!(entry["template"]["file"], "root.html");
        assert_eq!(entry["template"]["line"], 1);
        assert_eq!(entry["source"]["key"], "Missing");
        assert_eq!(entry["source"]["call"], "set.Execute");
        assert_eq!(entry["source"]["line"], 8);
    }
}

#[test]
fn honours_custom_delimiters() {
    let dir = project("{{.Ignored}} <% .Body %>", MAIN_GO);
    let output = run(dir.path(), &["-ldelim", "<%", "-rdelim", "%>"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Body missing"), "stdout: {stdout}");
    assert!(!stdout.contains("Ignored"), "stdout: {stdout}");
}

#[test]
fn missing_flags_exit_with_usage() {
    let output = Command::new(tmplcheck_binary())
        .args(["-t", "templates"])
        .output()
        .expect("run tmplcheck");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn empty_delimiters_are_a_usage_error() {
    let dir = project("{{.Title}}", MAIN_GO);
    let output = run(dir.path(), &["-ldelim="]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}

#[test]
fn template_errors_exit_one() {
    let dir = project("first\n{{.Title", MAIN_GO);
    let output = run(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: template root.html:2:"), "stderr: {stderr}");
    assert_eq!(stderr.lines().count(), 1, "stderr: {stderr}");
}

#[test]
fn unsupported_calls_abort_unless_skipped() {
    let main_go = r#"package main

import "github.com/go-web-framework/templates"

var set templates.Set

func render(name string) {
	set.Execute(name, nil, nil)
}
"#;
    let dir = project("{{.Title}}", main_go);

    let strict = run(dir.path(), &[]);
    assert_eq!(strict.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&strict.stderr);
    assert!(
        stderr.contains("main.go:8: unsupported argument in call to set.Execute"),
        "stderr: {stderr}"
    );

    let lenient = run(dir.path(), &["-skip-unsupported"]);
    assert!(lenient.status.success());
    let stderr = String::from_utf8_lossy(&lenient.stderr);
    assert!(stderr.contains("warning: skipping call to set.Execute"), "stderr: {stderr}");
    assert!(stderr.contains("--> main.go:8:2"), "stderr: {stderr}");
    assert!(lenient.stdout.is_empty());
}
