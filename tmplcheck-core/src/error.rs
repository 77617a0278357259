use thiserror::Error;

/// Fatal failures of a check run.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{0}")]
    Config(String),

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template {path}:{line}:{column}: {message}")]
    TemplateParse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("syntax error in {path}:{line}:{column}")]
    HostParse {
        path: String,
        line: usize,
        column: usize,
    },

    #[error("{file}:{line}: unsupported argument in call to {call}: {reason}")]
    UnsupportedArgument {
        file: String,
        line: usize,
        call: String,
        reason: String,
    },

    #[error("{0}")]
    PackageNotFound(String),

    #[error("failed to load Go grammar: {0}")]
    Grammar(String),

    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

impl CheckError {
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        CheckError::Io {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_failures_name_the_grammar() {
        let err = CheckError::Grammar("incompatible language version 15".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load Go grammar: incompatible language version 15"
        );
        assert!(!matches!(err, CheckError::Config(_)));
    }
}
