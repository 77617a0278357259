//! Template-side analysis: lexing and parsing Go template text, walking
//! the resulting tree and collecting the data fields it references.

pub mod ast;
mod error;
mod fields;
mod lexer;
mod parser;
mod walk;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tmplcheck_support::fs_error;
use walkdir::WalkDir;

use crate::config::Delimiters;
use crate::error::CheckError;

pub use error::TemplateError;
pub use fields::{extract_fields, line_col, FieldReference};
pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use parser::{Parser, BUILTIN_FUNCTIONS};
pub use walk::walk;

/// Field references of every template file, keyed by path relative to the
/// templates directory.
pub type FieldsByTemplate = BTreeMap<String, Vec<FieldReference>>;

pub fn parse_template(source: &str, delimiters: &Delimiters) -> Result<ast::Tree, TemplateError> {
    let tokens = Lexer::new(source, delimiters).tokenize()?;
    Parser::new(tokens).parse()
}

/// Parses one template file's text and extracts its field references.
pub fn analyze_template(
    source: &str,
    relative_path: &str,
    delimiters: &Delimiters,
) -> Result<Vec<FieldReference>, CheckError> {
    let tree = parse_template(source, delimiters).map_err(|err| {
        let lines: Vec<&str> = source.split('\n').collect();
        let (line, column) = line_col(err.pos, &lines);
        CheckError::TemplateParse {
            path: relative_path.to_string(),
            line,
            column,
            message: err.message,
        }
    })?;
    Ok(extract_fields(&tree, source, relative_path))
}

/// Parses every file below `root`. Any unreadable or malformed template
/// fails the whole pass.
pub fn parse_templates(root: &Path, delimiters: &Delimiters) -> Result<FieldsByTemplate, CheckError> {
    let mut fields = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let message = fs_error("walk", &root.display().to_string(), &err);
            CheckError::io(message, err.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let display = path.display().to_string();
        let bytes =
            fs::read(path).map_err(|err| CheckError::io(fs_error("read", &display, &err), err))?;
        let relative = relative_template_path(root, path);

        let references = analyze_template(&decode_source(&bytes), &relative, delimiters)?;
        fields.insert(relative, references);
    }

    Ok(fields)
}

/// Stands in for each byte that is not part of a valid UTF-8 sequence.
const INVALID_BYTE: char = '\u{1a}';

/// Decodes template bytes, replacing every invalid byte with a single
/// one-byte character so that byte offsets match the file on disk.
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut decoded = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                decoded.push_str(text);
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&rest[..valid]) {
                    decoded.push_str(text);
                }
                // A truncated sequence at the end has no error length.
                let invalid = err.error_len().unwrap_or(rest.len() - valid);
                decoded.extend(std::iter::repeat(INVALID_BYTE).take(invalid));
                rest = &rest[valid + invalid..];
            }
        }
    }
    Cow::Owned(decoded)
}

/// `root`-relative path with `/` separators on every platform.
fn relative_template_path(root: &Path, path: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_is_borrowed() {
        assert!(matches!(decode_source("héllo".as_bytes()), Cow::Borrowed("héllo")));
    }

    #[test]
    fn invalid_bytes_keep_their_width() {
        let bytes = b"caf\xe9 {{.Name}}\xf0\x9f";
        let decoded = decode_source(bytes);
        assert_eq!(decoded.len(), bytes.len());
        assert_eq!(decoded, "caf\u{1a} {{.Name}}\u{1a}\u{1a}");
    }
}
