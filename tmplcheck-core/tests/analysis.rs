use std::fs;
use std::path::Path;

use tempfile::tempdir;
use tmplcheck_core::{analyze, render_plain, CheckError, Config, UnsupportedCallPolicy};

const HANDLERS: &str = r#"package main

import "github.com/go-web-framework/templates"

var set templates.Set

func index() {
	set.Execute("root.html", nil, map[string]interface{}{"Title": "Home"})
}

func profile() {
	set.Execute("user/profile.html", nil, map[string]interface{}{
		"User":  nil,
		"Email": "",
	})
}
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, contents).expect("write file");
}

fn config(root: &Path) -> Config {
    Config::new(
        root.join("templates"),
        root.join("app").to_str().expect("utf-8 path"),
    )
}

#[test]
fn reports_fields_missing_from_call_sites() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "app/main.go", HANDLERS);
    write(dir.path(), "templates/root.html", "<h1>{{.Title}}</h1>\n<p>{{.Subtitle}}</p>\n");
    write(dir.path(), "templates/user/profile.html", "{{.User.Email}}");
    write(dir.path(), "templates/orphan.html", "{{.Anything}}");

    let analysis = analyze(&config(dir.path())).expect("analysis");

    assert_eq!(analysis.results.len(), 3);
    assert_eq!(analysis.diagnostic_count(), 1);
    assert!(analysis.warnings.is_empty());

    let root = analysis
        .results
        .iter()
        .find(|result| result.template_file == "root.html")
        .expect("root result");
    let missing = &root.diagnostics[0];
    assert_eq!(missing.missing_key, "Subtitle");
    assert_eq!((missing.template_line, missing.template_col), (2, 5));
    assert_eq!((missing.source_file.as_str(), missing.source_line), ("main.go", 8));

    assert_eq!(
        render_plain(&analysis.results),
        "root.html\nSubtitle missing: required by main.go:8 in set.Execute\n"
    );
}

#[test]
fn template_errors_fail_the_run() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "app/main.go", HANDLERS);
    write(dir.path(), "templates/root.html", "{{if .Title}}");

    let err = analyze(&config(dir.path())).expect_err("unterminated if");
    assert!(matches!(err, CheckError::TemplateParse { .. }), "got: {err:?}");
}

#[test]
fn host_errors_win_when_both_sides_fail() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "app/main.go", "package main\n\nfunc {\n");
    write(dir.path(), "templates/root.html", "{{end}}");

    let err = analyze(&config(dir.path())).expect_err("both broken");
    assert!(matches!(err, CheckError::HostParse { .. }), "got: {err:?}");
}

#[test]
fn skip_policy_keeps_going() {
    let dir = tempdir().expect("tempdir");
    write(
        dir.path(),
        "app/main.go",
        r#"package main

import "github.com/go-web-framework/templates"

var set templates.Set

func render(data map[string]string) {
	set.Execute("root.html", nil, data)
	set.Execute("root.html", nil, map[string]string{})
}
"#,
    );
    write(dir.path(), "templates/root.html", "{{.Title}}");

    let strict = analyze(&config(dir.path())).expect_err("abort policy");
    assert!(matches!(strict, CheckError::UnsupportedArgument { line: 8, .. }));

    let lenient = config(dir.path()).with_unsupported_calls(UnsupportedCallPolicy::Skip);
    let analysis = analyze(&lenient).expect("skip policy");
    assert_eq!(analysis.warnings.len(), 1);
    assert_eq!(analysis.diagnostic_count(), 1);
    assert_eq!(analysis.results[0].diagnostics[0].source_line, 9);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let err = analyze(&Config::new("", "")).expect_err("empty config");
    assert!(matches!(err, CheckError::Config(_)));
}
