use std::path::PathBuf;

use crate::error::CheckError;

pub const DEFAULT_LEFT_DELIM: &str = "{{";
pub const DEFAULT_RIGHT_DELIM: &str = "}}";

/// Action delimiters used when lexing template files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// What to do with a recognised render call whose arguments cannot be
/// analysed statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedCallPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the call site and record a warning.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub templates_dir: PathBuf,
    /// Package directory, or an import path resolved under `$GOPATH/src`.
    pub package: String,
    pub delimiters: Delimiters,
    pub format: OutputFormat,
    pub unsupported_calls: UnsupportedCallPolicy,
}

impl Config {
    pub fn new(templates_dir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            package: package.into(),
            delimiters: Delimiters::default(),
            format: OutputFormat::default(),
            unsupported_calls: UnsupportedCallPolicy::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_unsupported_calls(mut self, policy: UnsupportedCallPolicy) -> Self {
        self.unsupported_calls = policy;
        self
    }

    /// Rejects values that can never produce a meaningful run.
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.templates_dir.as_os_str().is_empty() {
            return Err(CheckError::Config("-t is required".to_string()));
        }
        if self.package.is_empty() {
            return Err(CheckError::Config("-p is required".to_string()));
        }
        if self.delimiters.left.is_empty() || self.delimiters.right.is_empty() {
            return Err(CheckError::Config(
                "template delimiters must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_go_templates() {
        let config = Config::new("templates", "example.com/app");
        assert_eq!(config.delimiters.left, "{{");
        assert_eq!(config.delimiters.right, "}}");
        assert_eq!(config.format, OutputFormat::Plain);
        assert_eq!(config.unsupported_calls, UnsupportedCallPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_values() {
        assert!(Config::new("", "pkg").validate().is_err());
        assert!(Config::new("dir", "").validate().is_err());
        let config = Config::new("dir", "pkg").with_delimiters(Delimiters::new("", "]]"));
        assert!(config.validate().is_err());
    }
}
