use std::panic;
use std::thread;

use crate::check::{check, CheckResult};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::CheckError;
use crate::host::{extract_usages, load_package, UsageExtraction};
use crate::template::{parse_templates, FieldsByTemplate};

/// Outcome of a successful run.
#[derive(Debug)]
pub struct Analysis {
    pub results: Vec<CheckResult>,
    pub warnings: Diagnostics,
}

impl Analysis {
    pub fn diagnostic_count(&self) -> usize {
        self.results
            .iter()
            .map(|result| result.diagnostics.len())
            .sum()
    }
}

/// Parses the templates and the host package on two scoped threads, then
/// cross-checks them. If both sides fail, the host error is returned.
pub fn analyze(config: &Config) -> Result<Analysis, CheckError> {
    config.validate()?;

    let (host, templates) = thread::scope(|scope| {
        let host = scope.spawn(|| -> Result<UsageExtraction, CheckError> {
            let package = load_package(&config.package)?;
            extract_usages(&package, config.unsupported_calls)
        });
        let templates = scope.spawn(|| -> Result<FieldsByTemplate, CheckError> {
            parse_templates(&config.templates_dir, &config.delimiters)
        });

        let host = host.join().unwrap_or_else(|payload| panic::resume_unwind(payload));
        let templates = templates
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));
        (host, templates)
    });

    let extraction = host?;
    let fields = templates?;

    Ok(Analysis {
        results: check(&fields, &extraction.usages),
        warnings: extraction.warnings,
    })
}
