use crate::config::Delimiters;
use crate::template::error::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: &str, pos: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            pos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    LeftDelim,
    RightDelim,
    Space,
    Identifier,
    Keyword(Keyword),
    Field,
    Variable,
    Dot,
    Bool,
    Number,
    CharConstant,
    String,
    RawString,
    Pipe,
    LeftParen,
    RightParen,
    Declare,
    Assign,
    Comma,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Block,
    Break,
    Continue,
    Define,
    Else,
    End,
    If,
    Nil,
    Range,
    Template,
    With,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Block => "block",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Define => "define",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::If => "if",
            Keyword::Nil => "nil",
            Keyword::Range => "range",
            Keyword::Template => "template",
            Keyword::With => "with",
        }
    }
}

const TRIM_MARKER: char = '-';
const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

pub struct Lexer<'a> {
    input: &'a str,
    delimiters: &'a Delimiters,
    position: usize,
    paren_depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, delimiters: &'a Delimiters) -> Self {
        Self {
            input,
            delimiters,
            position: 0,
            paren_depth: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, TemplateError> {
        while self.position < self.input.len() {
            self.lex_text()?;
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.input.len()));
        Ok(self.tokens)
    }

    fn lex_text(&mut self) -> Result<(), TemplateError> {
        let delimiters = self.delimiters;
        let left = delimiters.left.as_str();
        let start = self.position;
        let Some(offset) = self.input[start..].find(left) else {
            self.push_text(start, self.input.len());
            self.position = self.input.len();
            return Ok(());
        };

        let delim_pos = start + offset;
        let after_delim = delim_pos + left.len();
        let trim_left = self.has_left_trim_marker(after_delim);
        let text_end = if trim_left {
            start + self.input[start..delim_pos].trim_end_matches(is_space).len()
        } else {
            delim_pos
        };
        self.push_text(start, text_end);

        self.position = if trim_left { after_delim + 2 } else { after_delim };
        if self.input[self.position..].starts_with(COMMENT_OPEN) {
            return self.lex_comment(delim_pos);
        }

        self.tokens
            .push(Token::new(TokenKind::LeftDelim, left, delim_pos));
        self.lex_inside_action()
    }

    fn push_text(&mut self, start: usize, end: usize) {
        if end > start {
            self.tokens.push(Token::new(
                TokenKind::Text,
                &self.input[start..end],
                start,
            ));
        }
    }

    fn lex_comment(&mut self, delim_pos: usize) -> Result<(), TemplateError> {
        let body_start = self.position + COMMENT_OPEN.len();
        let Some(offset) = self.input[body_start..].find(COMMENT_CLOSE) else {
            return Err(TemplateError::new(delim_pos, "unclosed comment"));
        };
        self.position = body_start + offset + COMMENT_CLOSE.len();

        let delimiters = self.delimiters;
        let right = delimiters.right.as_str();
        if let Some(marker_len) = self.right_trim_marker_len(self.position) {
            self.position += marker_len + right.len();
            self.skip_leading_space();
            return Ok(());
        }
        if self.input[self.position..].starts_with(right) {
            self.position += right.len();
            return Ok(());
        }
        Err(TemplateError::new(
            delim_pos,
            "comment ends before closing delimiter",
        ))
    }

    fn lex_inside_action(&mut self) -> Result<(), TemplateError> {
        let delimiters = self.delimiters;
        let right = delimiters.right.as_str();

        loop {
            if let Some(marker_len) = self.right_trim_marker_len(self.position) {
                if self.paren_depth > 0 {
                    return Err(TemplateError::new(self.position, "unclosed left paren"));
                }
                let delim_pos = self.position + marker_len;
                self.tokens
                    .push(Token::new(TokenKind::RightDelim, right, delim_pos));
                self.position = delim_pos + right.len();
                self.skip_leading_space();
                return Ok(());
            }
            if self.input[self.position..].starts_with(right) {
                if self.paren_depth > 0 {
                    return Err(TemplateError::new(self.position, "unclosed left paren"));
                }
                self.tokens
                    .push(Token::new(TokenKind::RightDelim, right, self.position));
                self.position += right.len();
                return Ok(());
            }

            let Some(ch) = self.peek_char() else {
                return Err(TemplateError::new(self.position, "unclosed action"));
            };

            match ch {
                ' ' | '\t' | '\r' | '\n' => self.lex_space(),
                '=' => self.simple_token(TokenKind::Assign),
                ':' => {
                    if self.peek_next_char() != Some('=') {
                        return Err(TemplateError::new(self.position, "expected :="));
                    }
                    let start = self.position;
                    self.position += 2;
                    self.push_token(TokenKind::Declare, start);
                }
                '|' => self.simple_token(TokenKind::Pipe),
                ',' => self.simple_token(TokenKind::Comma),
                '"' => self.lex_quote()?,
                '`' => self.lex_raw_quote()?,
                '\'' => self.lex_char()?,
                '$' => self.lex_variable()?,
                '.' => {
                    if matches!(self.peek_next_char(), Some('0'..='9')) {
                        self.lex_number()?;
                    } else {
                        self.lex_field()?;
                    }
                }
                '+' | '-' | '0'..='9' => self.lex_number()?,
                '(' => {
                    self.paren_depth += 1;
                    self.simple_token(TokenKind::LeftParen);
                }
                ')' => {
                    if self.paren_depth == 0 {
                        return Err(TemplateError::new(
                            self.position,
                            "unexpected right paren",
                        ));
                    }
                    self.paren_depth -= 1;
                    self.simple_token(TokenKind::RightParen);
                }
                c if is_alphanumeric(c) => self.lex_identifier()?,
                other => {
                    return Err(TemplateError::new(
                        self.position,
                        format!("unrecognized character in action: {other:?}"),
                    ));
                }
            }
        }
    }

    fn lex_space(&mut self) {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if !is_space(ch) || self.right_trim_marker_len(self.position).is_some() {
                break;
            }
            self.advance_char();
        }
        if self.position > start {
            self.push_token(TokenKind::Space, start);
        }
    }

    fn lex_quote(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.advance_char(); // consume opening quote
        loop {
            match self.advance_char() {
                Some('\\') => {
                    if matches!(self.advance_char(), None | Some('\n')) {
                        return Err(TemplateError::new(start, "unterminated quoted string"));
                    }
                }
                Some('"') => break,
                None | Some('\n') => {
                    return Err(TemplateError::new(start, "unterminated quoted string"));
                }
                Some(_) => {}
            }
        }
        self.push_token(TokenKind::String, start);
        Ok(())
    }

    fn lex_raw_quote(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.advance_char(); // consume opening backquote
        loop {
            match self.advance_char() {
                Some('`') => break,
                None => return Err(TemplateError::new(start, "unterminated raw quoted string")),
                Some(_) => {}
            }
        }
        self.push_token(TokenKind::RawString, start);
        Ok(())
    }

    fn lex_char(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.advance_char(); // consume opening quote
        loop {
            match self.advance_char() {
                Some('\\') => {
                    if matches!(self.advance_char(), None | Some('\n')) {
                        return Err(TemplateError::new(start, "unterminated character constant"));
                    }
                }
                Some('\'') => break,
                None | Some('\n') => {
                    return Err(TemplateError::new(start, "unterminated character constant"));
                }
                Some(_) => {}
            }
        }
        self.push_token(TokenKind::CharConstant, start);
        Ok(())
    }

    fn lex_variable(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.advance_char(); // consume '$'
        self.consume_alphanumeric();
        self.expect_terminator(start)?;
        self.push_token(TokenKind::Variable, start);
        Ok(())
    }

    fn lex_field(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.advance_char(); // consume '.'
        if !self.peek_char().is_some_and(is_alphanumeric) {
            self.push_token(TokenKind::Dot, start);
            return Ok(());
        }
        self.consume_alphanumeric();
        self.expect_terminator(start)?;
        self.push_token(TokenKind::Field, start);
        Ok(())
    }

    fn lex_identifier(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        self.consume_alphanumeric();
        self.expect_terminator(start)?;

        let word = &self.input[start..self.position];
        let kind = if let Some(keyword) = keyword_from_lexeme(word) {
            TokenKind::Keyword(keyword)
        } else if word == "true" || word == "false" {
            TokenKind::Bool
        } else {
            TokenKind::Identifier
        };
        self.push_token(kind, start);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), TemplateError> {
        let start = self.position;
        if matches!(self.peek_char(), Some('+' | '-')) {
            self.advance_char();
        }

        let mut digits: fn(char) -> bool = |c| c.is_ascii_digit() || c == '_';
        let mut exponent = ['e', 'E'];
        if self.peek_char() == Some('0') {
            match self.peek_next_char() {
                Some('x' | 'X') => {
                    self.position += 2;
                    digits = |c| c.is_ascii_hexdigit() || c == '_';
                    exponent = ['p', 'P'];
                }
                Some('o' | 'O') => {
                    self.position += 2;
                    digits = |c| matches!(c, '0'..='7' | '_');
                }
                Some('b' | 'B') => {
                    self.position += 2;
                    digits = |c| matches!(c, '0' | '1' | '_');
                }
                _ => {}
            }
        }

        self.consume_while(digits);
        if self.peek_char() == Some('.') {
            self.advance_char();
            self.consume_while(digits);
        }
        if self.peek_char().is_some_and(|c| exponent.contains(&c)) {
            self.advance_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance_char();
            }
            self.consume_while(|c| c.is_ascii_digit() || c == '_');
        }
        if self.peek_char() == Some('i') {
            self.advance_char();
        }

        let lexeme = &self.input[start..self.position];
        let has_digit = lexeme.chars().any(|c| c.is_ascii_digit());
        if !has_digit || self.peek_char().is_some_and(is_alphanumeric) {
            self.consume_alphanumeric();
            return Err(TemplateError::new(
                start,
                format!("bad number syntax: {:?}", &self.input[start..self.position]),
            ));
        }
        self.push_token(TokenKind::Number, start);
        Ok(())
    }

    fn expect_terminator(&self, start: usize) -> Result<(), TemplateError> {
        let Some(ch) = self.peek_char() else {
            return Ok(());
        };
        if is_space(ch) || matches!(ch, '.' | ',' | '|' | ':' | ')' | '(') {
            return Ok(());
        }
        if self.input[self.position..].starts_with(self.delimiters.right.as_str()) {
            return Ok(());
        }
        Err(TemplateError::new(
            start,
            format!("bad character {ch:?}"),
        ))
    }

    fn has_left_trim_marker(&self, at: usize) -> bool {
        let mut chars = self.input[at..].chars();
        chars.next() == Some(TRIM_MARKER) && chars.next().is_some_and(is_space)
    }

    /// Length of a ` -` marker sitting right before the right delimiter.
    fn right_trim_marker_len(&self, at: usize) -> Option<usize> {
        let rest = &self.input[at..];
        let mut chars = rest.chars();
        let space = chars.next().filter(|c| is_space(*c))?;
        let after_space = &rest[space.len_utf8()..];
        let after_marker = after_space.strip_prefix(TRIM_MARKER)?;
        after_marker
            .starts_with(self.delimiters.right.as_str())
            .then_some(space.len_utf8() + 1)
    }

    fn skip_leading_space(&mut self) {
        let rest = &self.input[self.position..];
        self.position += rest.len() - rest.trim_start_matches(is_space).len();
    }

    fn consume_alphanumeric(&mut self) {
        self.consume_while(is_alphanumeric);
    }

    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            self.advance_char();
        }
    }

    fn simple_token(&mut self, kind: TokenKind) {
        let start = self.position;
        self.advance_char();
        self.push_token(kind, start);
    }

    fn push_token(&mut self, kind: TokenKind, start: usize) {
        let lexeme = &self.input[start..self.position];
        self.tokens.push(Token::new(kind, lexeme, start));
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }
}

fn is_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

fn is_alphanumeric(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "block" => Some(Keyword::Block),
        "break" => Some(Keyword::Break),
        "continue" => Some(Keyword::Continue),
        "define" => Some(Keyword::Define),
        "else" => Some(Keyword::Else),
        "end" => Some(Keyword::End),
        "if" => Some(Keyword::If),
        "nil" => Some(Keyword::Nil),
        "range" => Some(Keyword::Range),
        "template" => Some(Keyword::Template),
        "with" => Some(Keyword::With),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let delimiters = Delimiters::default();
        Lexer::new(input, &delimiters)
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn splits_text_and_actions() {
        assert_eq!(
            kinds("Hi {{.Name}}!"),
            vec![
                TokenKind::Text,
                TokenKind::LeftDelim,
                TokenKind::Field,
                TokenKind::RightDelim,
                TokenKind::Text,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_chained_fields_as_separate_tokens() {
        let delimiters = Delimiters::default();
        let tokens = Lexer::new("{{.Foo.Bar}}", &delimiters)
            .tokenize()
            .expect("tokenize");
        let fields: Vec<_> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Field)
            .map(|token| (token.lexeme.as_str(), token.pos))
            .collect();
        assert_eq!(fields, vec![(".Foo", 2), (".Bar", 6)]);
    }

    #[test]
    fn trims_whitespace_around_markers() {
        let delimiters = Delimiters::default();
        let tokens = Lexer::new("a  {{- .X -}}  b", &delimiters)
            .tokenize()
            .expect("tokenize");
        let texts: Vec<_> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Text)
            .map(|token| token.lexeme.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn drops_comments() {
        assert_eq!(
            kinds("{{/* note */}}x"),
            vec![TokenKind::Text, TokenKind::Eof]
        );
    }

    #[test]
    fn honours_custom_delimiters() {
        let delimiters = Delimiters::new("[[", "]]");
        let tokens = Lexer::new("{{.Ignored}} [[.Used]]", &delimiters)
            .tokenize()
            .expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].lexeme, "{{.Ignored}} ");
        assert_eq!(tokens[2].lexeme, ".Used");
    }

    #[test]
    fn rejects_unclosed_actions() {
        let delimiters = Delimiters::default();
        let err = Lexer::new("{{.Name", &delimiters)
            .tokenize()
            .expect_err("unclosed action");
        assert_eq!(err.message, "unclosed action");
    }

    #[test]
    fn lexes_numbers_and_keywords() {
        assert_eq!(
            kinds("{{if eq 0x1F -2.5e3}}{{end}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Keyword(Keyword::If),
                TokenKind::Space,
                TokenKind::Identifier,
                TokenKind::Space,
                TokenKind::Number,
                TokenKind::Space,
                TokenKind::Number,
                TokenKind::RightDelim,
                TokenKind::LeftDelim,
                TokenKind::Keyword(Keyword::End),
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }
}
