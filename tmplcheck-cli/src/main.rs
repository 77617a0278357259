use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tmplcheck_core::{
    analyze, render, Analysis, Config, Delimiters, Diagnostic, OutputFormat,
    UnsupportedCallPolicy, DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM,
};

/// Long flags that Go tooling spells with a single dash.
const GO_STYLE_FLAGS: &[&str] = &["ldelim", "rdelim", "format", "skip-unsupported"];

const AFTER_HELP: &str = "\
Every field a template reads (`.Foo`, `.Foo.Bar`) must be supplied as a key
by each call that renders it. Long flags accept one or two dashes:
  tmplcheck -t ./templates -p example.com/app -format json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Plain,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Plain => OutputFormat::Plain,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "tmplcheck",
    version,
    about = "Check that Go templates receive every field they reference.",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding the template files.
    #[arg(short = 't', value_name = "PATH")]
    templates: PathBuf,

    /// Package directory or Go import path of the rendering code.
    #[arg(short = 'p', value_name = "PATH")]
    package: String,

    /// Left action delimiter.
    #[arg(long, value_name = "DELIM", default_value = DEFAULT_LEFT_DELIM)]
    ldelim: String,

    /// Right action delimiter.
    #[arg(long, value_name = "DELIM", default_value = DEFAULT_RIGHT_DELIM)]
    rdelim: String,

    #[arg(long, value_enum, default_value_t = Format::Plain)]
    format: Format,

    /// Warn about render calls with unsupported arguments instead of failing.
    #[arg(long)]
    skip_unsupported: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let policy = if self.skip_unsupported {
            UnsupportedCallPolicy::Skip
        } else {
            UnsupportedCallPolicy::Abort
        };
        Config::new(self.templates, self.package)
            .with_delimiters(Delimiters::new(self.ldelim, self.rdelim))
            .with_format(self.format.into())
            .with_unsupported_calls(policy)
    }
}

fn main() -> ExitCode {
    let raw = normalize_go_flags(std::env::args_os().collect());
    let cli = match Cli::try_parse_from(raw) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    let config = cli.into_config();
    if let Err(err) = config.validate() {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let analysis = analyze(config)?;

    for diagnostic in analysis.warnings.entries() {
        print_diagnostic(diagnostic);
    }

    write_report(config, &analysis)
}

fn write_report(config: &Config, analysis: &Analysis) -> Result<()> {
    let report = render(&analysis.results, config.format)?;
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(report.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write report")
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    eprintln!("warning: {}", diagnostic.message);
    if let Some(location) = &diagnostic.location {
        eprintln!("  --> {location}");
    }
}

/// Rewrites `-ldelim x` and friends to their double-dash form so clap sees
/// regular long flags. Everything after a bare `--` is left untouched.
fn normalize_go_flags(raw: Vec<OsString>) -> Vec<OsString> {
    let mut normalized = Vec::with_capacity(raw.len());
    let mut passthrough = false;

    for (index, arg) in raw.into_iter().enumerate() {
        if index == 0 || passthrough {
            normalized.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        if text == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let rewritten = text
            .strip_prefix('-')
            .filter(|rest| !rest.starts_with('-'))
            .filter(|rest| {
                let name = rest.split_once('=').map_or(*rest, |(name, _)| name);
                GO_STYLE_FLAGS.contains(&name)
            })
            .map(|rest| OsString::from(format!("--{rest}")));
        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn rewrites_single_dash_long_flags() {
        let normalized = normalize_go_flags(args(&[
            "tmplcheck",
            "-t",
            "views",
            "-ldelim",
            "[[",
            "-rdelim=]]",
            "-format",
            "json",
            "-skip-unsupported",
        ]));
        assert_eq!(
            normalized,
            args(&[
                "tmplcheck",
                "-t",
                "views",
                "--ldelim",
                "[[",
                "--rdelim=]]",
                "--format",
                "json",
                "--skip-unsupported",
            ])
        );
    }

    #[test]
    fn leaves_short_and_double_dash_flags_alone() {
        let input = args(&["tmplcheck", "--format", "plain", "-p", "app", "-tviews"]);
        assert_eq!(normalize_go_flags(input.clone()), input);

        let after_separator = normalize_go_flags(args(&["tmplcheck", "--", "-format"]));
        assert_eq!(after_separator, args(&["tmplcheck", "--", "-format"]));
    }

    #[test]
    fn builds_config_from_flags() {
        let cli = Cli::try_parse_from(normalize_go_flags(args(&[
            "tmplcheck",
            "-t",
            "views",
            "-p",
            "example.com/app",
            "-format=json",
            "-skip-unsupported",
        ])))
        .expect("parse");
        let config = cli.into_config();
        assert_eq!(config.templates_dir, PathBuf::from("views"));
        assert_eq!(config.package, "example.com/app");
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.unsupported_calls, UnsupportedCallPolicy::Skip);
        assert_eq!(config.delimiters, Delimiters::default());
    }

    #[test]
    fn missing_required_flags_fail_to_parse() {
        assert!(Cli::try_parse_from(args(&["tmplcheck", "-t", "views"])).is_err());
    }
}
