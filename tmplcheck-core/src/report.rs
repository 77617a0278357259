use serde::Serialize;

use crate::check::CheckResult;
use crate::config::OutputFormat;
use crate::error::CheckError;

pub fn render(results: &[CheckResult], format: OutputFormat) -> Result<String, CheckError> {
    match format {
        OutputFormat::Plain => Ok(render_plain(results)),
        OutputFormat::Json => render_json(results),
    }
}

/// Each template with findings, followed by one line per finding.
pub fn render_plain(results: &[CheckResult]) -> String {
    let mut out = String::new();
    for result in results.iter().filter(|result| !result.diagnostics.is_empty()) {
        out.push_str(&result.template_file);
        out.push('\n');
        for diagnostic in &result.diagnostics {
            out.push_str(&format!(
                "{} missing: required by {}:{} in {}\n",
                diagnostic.missing_key,
                diagnostic.source_file,
                diagnostic.source_line,
                diagnostic.call()
            ));
        }
    }
    out
}

#[derive(Serialize)]
struct TemplateReport<'a> {
    template: &'a str,
    missing: Vec<MissingEntry<'a>>,
}

#[derive(Serialize)]
struct MissingEntry<'a> {
    template: TemplatePosition<'a>,
    source: SourcePosition<'a>,
}

#[derive(Serialize)]
struct TemplatePosition<'a> {
    file: &'a str,
    line: usize,
    col: usize,
}

#[derive(Serialize)]
struct SourcePosition<'a> {
    file: &'a str,
    line: usize,
    key: &'a str,
    call: String,
}

/// A pretty-printed array with one object per template, including the
/// templates without findings.
pub fn render_json(results: &[CheckResult]) -> Result<String, CheckError> {
    let reports: Vec<TemplateReport> = results
        .iter()
        .map(|result| TemplateReport {
            template: &result.template_file,
            missing: result
                .diagnostics
                .iter()
                .map(|diagnostic| MissingEntry {
                    template: TemplatePosition {
                        file: &diagnostic.template_file,
                        line: diagnostic.template_line,
                        col: diagnostic.template_col,
                    },
                    source: SourcePosition {
                        file: &diagnostic.source_file,
                        line: diagnostic.source_line,
                        key: &diagnostic.missing_key,
                        call: diagnostic.call(),
                    },
                })
                .collect(),
        })
        .collect();

    let mut json = serde_json::to_string_pretty(&reports)?;
    json.push('\n');
    Ok(json)
}
