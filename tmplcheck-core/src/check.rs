use serde::Serialize;

use crate::host::{CallSiteUsage, UsagesByTemplate};
use crate::template::{FieldReference, FieldsByTemplate};

/// A field a template reads that one call site does not supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFieldDiagnostic {
    pub template_file: String,
    pub template_line: usize,
    pub template_col: usize,
    pub missing_key: String,
    pub source_file: String,
    pub source_line: usize,
    pub receiver_name: String,
    pub method_name: String,
}

impl MissingFieldDiagnostic {
    fn new(reference: &FieldReference, key: &str, usage: &CallSiteUsage) -> Self {
        Self {
            template_file: reference.template_path.clone(),
            template_line: reference.line,
            template_col: reference.col,
            missing_key: key.to_string(),
            source_file: usage.source_file.clone(),
            source_line: usage.line,
            receiver_name: usage.receiver_name.clone(),
            method_name: usage.method_name.clone(),
        }
    }

    pub fn call(&self) -> String {
        format!("{}.{}", self.receiver_name, self.method_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub template_file: String,
    pub diagnostics: Vec<MissingFieldDiagnostic>,
}

/// Cross-checks every template against the call sites rendering it. One
/// result per template, in template path order; templates nobody renders
/// produce no diagnostics.
///
/// Each element of a field chain is looked up on its own in the flat key
/// set, so `.Foo.Bar` needs both `Foo` and `Bar` supplied.
pub fn check(fields: &FieldsByTemplate, usages: &UsagesByTemplate) -> Vec<CheckResult> {
    fields
        .iter()
        .map(|(template, references)| {
            let sites = usages.get(template).map(Vec::as_slice).unwrap_or(&[]);
            CheckResult {
                template_file: template.clone(),
                diagnostics: check_template(references, sites),
            }
        })
        .collect()
}

pub fn check_template(
    references: &[FieldReference],
    usages: &[CallSiteUsage],
) -> Vec<MissingFieldDiagnostic> {
    let mut diagnostics = Vec::new();
    for reference in references {
        for key in &reference.chain {
            for usage in usages {
                if !usage.supplied_keys.contains(key) {
                    diagnostics.push(MissingFieldDiagnostic::new(reference, key, usage));
                }
            }
        }
    }
    diagnostics
}
