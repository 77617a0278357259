use std::borrow::Cow;
use std::fmt;

fn escape_single_quotes(input: &str) -> Cow<'_, str> {
    if input.contains('\'') {
        Cow::Owned(input.replace('\'', "\\'"))
    } else {
        Cow::Borrowed(input)
    }
}

fn format_operation_error(
    component: &str,
    operation: &str,
    target: &str,
    error: impl fmt::Display,
) -> String {
    let escaped = escape_single_quotes(target);
    format!("{component}.{operation}('{escaped}') failed: {error}")
}

pub fn fs_error(operation: &str, path: &str, error: impl fmt::Display) -> String {
    format_operation_error("fs", operation, path, error)
}

pub fn package_error(operation: &str, package: &str, error: impl fmt::Display) -> String {
    format_operation_error("package", operation, package, error)
}

/// Error returned when a quoted Go literal is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnquoteError {
    pub literal: String,
    pub reason: &'static str,
}

impl fmt::Display for UnquoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid literal {}: {}", self.literal, self.reason)
    }
}

impl std::error::Error for UnquoteError {}

/// Decodes a Go string or character literal, including its surrounding
/// quotes. Interpreted strings (`"..."`), raw strings (`` `...` ``) and
/// character constants (`'x'`) are accepted.
pub fn unquote(literal: &str) -> Result<String, UnquoteError> {
    let fail = |reason| UnquoteError {
        literal: literal.to_string(),
        reason,
    };

    let mut chars = literal.chars();
    let quote = chars.next().ok_or_else(|| fail("empty literal"))?;
    if !matches!(quote, '"' | '\'' | '`') {
        return Err(fail("not a quoted literal"));
    }
    if literal.len() < 2 || !literal.ends_with(quote) {
        return Err(fail("missing closing quote"));
    }
    let body = &literal[1..literal.len() - 1];

    match quote {
        '`' => {
            if body.contains('`') {
                return Err(fail("backquote inside raw string"));
            }
            // Carriage returns are discarded from raw strings.
            Ok(body.replace('\r', ""))
        }
        '"' | '\'' => {
            let decoded = decode_escapes(body, quote).map_err(fail)?;
            if quote == '\'' && decoded.chars().count() != 1 {
                return Err(fail("character constant must hold exactly one character"));
            }
            Ok(decoded)
        }
        _ => unreachable!("quote kind checked above"),
    }
}

fn decode_escapes(body: &str, quote: char) -> Result<String, &'static str> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            return Err("newline in quoted literal");
        }
        if ch == quote {
            return Err("unescaped quote inside literal");
        }
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let escaped = chars.next().ok_or("unterminated escape sequence")?;
        match escaped {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '\\' => out.push('\\'),
            '"' if quote == '"' => out.push('"'),
            '\'' if quote == '\'' => out.push('\''),
            'x' => {
                let value = take_digits(&mut chars, 2, 16)?;
                out.push(char::from_u32(value).ok_or("invalid \\x escape")?);
            }
            'u' => {
                let value = take_digits(&mut chars, 4, 16)?;
                out.push(char::from_u32(value).ok_or("invalid \\u escape")?);
            }
            'U' => {
                let value = take_digits(&mut chars, 8, 16)?;
                out.push(char::from_u32(value).ok_or("invalid \\U escape")?);
            }
            '0'..='7' => {
                let rest = take_digits(&mut chars, 2, 8)?;
                let value = (escaped as u32 - '0' as u32) * 64 + rest;
                if value > 255 {
                    return Err("octal escape out of range");
                }
                out.push(char::from_u32(value).ok_or("invalid octal escape")?);
            }
            _ => return Err("unknown escape sequence"),
        }
    }

    Ok(out)
}

fn take_digits(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    count: usize,
    radix: u32,
) -> Result<u32, &'static str> {
    let mut value = 0u32;
    for _ in 0..count {
        let digit = chars
            .next()
            .and_then(|ch| ch.to_digit(radix))
            .ok_or("truncated numeric escape")?;
        value = value * radix + digit;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_interpreted_strings() {
        assert_eq!(unquote(r#""root.html""#).unwrap(), "root.html");
        assert_eq!(unquote(r#""a\tb\x41é""#).unwrap(), "a\tbAé");
        assert_eq!(unquote(r#""\101""#).unwrap(), "A");
    }

    #[test]
    fn decodes_raw_strings_and_chars() {
        assert_eq!(unquote("`a\\nb`").unwrap(), "a\\nb");
        assert_eq!(unquote("'x'").unwrap(), "x");
        assert_eq!(unquote(r"'\n'").unwrap(), "\n");
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(unquote("\"open").is_err());
        assert!(unquote(r#""bad \q""#).is_err());
        assert!(unquote("'ab'").is_err());
        assert!(unquote("plain").is_err());
    }

    #[test]
    fn formats_operation_errors() {
        assert_eq!(
            fs_error("read", "it's.tmpl", "denied"),
            "fs.read('it\\'s.tmpl') failed: denied"
        );
    }
}
