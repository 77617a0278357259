use tmplcheck_support::unquote;

use crate::template::ast::*;
use crate::template::error::TemplateError;
use crate::template::lexer::{Keyword, Token, TokenKind};

/// Functions every template may call without a user function map.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "and", "call", "html", "index", "slice", "js", "len", "not", "or", "print", "printf",
    "println", "urlquery", "eq", "ge", "gt", "le", "lt", "ne",
];

type ParseResult<T> = Result<T, TemplateError>;

/// Result of parsing one item inside a list: a node, or one of the
/// actions that close the list.
enum Item {
    Node(TemplateNode),
    Closing(Closing),
}

#[derive(Clone, Copy)]
enum Closing {
    End(Pos),
    Else(Pos),
}

impl Closing {
    fn pos(self) -> Pos {
        match self {
            Closing::End(pos) | Closing::Else(pos) => pos,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Closing::End(_) => "{{end}}",
            Closing::Else(_) => "{{else}}",
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Variables visible at the current point; `$` is always in scope.
    vars: Vec<String>,
    defines: Vec<DefinedTemplate>,
    /// Number of `range` bodies enclosing the current item.
    range_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            vars: vec!["$".to_string()],
            defines: Vec::new(),
            range_depth: 0,
        }
    }

    pub fn parse(mut self) -> ParseResult<Tree> {
        let mut root = ListNode::new(self.peek().pos);

        while !self.is_at_end() {
            if self.peek_kind() == TokenKind::LeftDelim {
                let checkpoint = self.current;
                self.skip();
                if self.next_non_space().kind == TokenKind::Keyword(Keyword::Define) {
                    self.parse_definition()?;
                    continue;
                }
                self.current = checkpoint;
            }

            match self.text_or_action()? {
                Item::Node(node) => root.nodes.push(node),
                Item::Closing(closing) => {
                    return Err(TemplateError::new(
                        closing.pos(),
                        format!("unexpected {}", closing.describe()),
                    ));
                }
            }
        }

        Ok(Tree {
            root,
            defines: self.defines,
        })
    }

    fn parse_definition(&mut self) -> ParseResult<()> {
        const CONTEXT: &str = "define clause";
        let token = self.next_non_space();
        let name = self.parse_template_name(&token, CONTEXT)?;
        self.expect(TokenKind::RightDelim, CONTEXT)?;

        let root = self.definition_body(CONTEXT)?;
        self.add_definition(token.pos, name, root)
    }

    /// Parses a `define`/`block` body with only `$` in scope.
    fn definition_body(&mut self, context: &str) -> ParseResult<ListNode> {
        let outer = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let result = self.item_list();
        self.vars = outer;

        match result? {
            (root, Closing::End(_)) => Ok(root),
            (_, closing @ Closing::Else(pos)) => Err(TemplateError::new(
                pos,
                format!("unexpected {} in {context}", closing.describe()),
            )),
        }
    }

    fn add_definition(&mut self, pos: Pos, name: String, root: ListNode) -> ParseResult<()> {
        match self.defines.iter_mut().find(|existing| existing.name == name) {
            None => {
                self.defines.push(DefinedTemplate { name, root });
                Ok(())
            }
            Some(existing) if is_empty_list(&existing.root) => {
                existing.root = root;
                Ok(())
            }
            Some(_) if is_empty_list(&root) => Ok(()),
            Some(_) => Err(TemplateError::new(
                pos,
                format!("multiple definition of template {name:?}"),
            )),
        }
    }

    /// Parses text and actions until `{{end}}` or `{{else}}`, which is
    /// returned alongside the list.
    fn item_list(&mut self) -> ParseResult<(ListNode, Closing)> {
        let mut list = ListNode::new(self.peek_non_space().pos);
        while self.peek_non_space().kind != TokenKind::Eof {
            match self.text_or_action()? {
                Item::Node(node) => list.nodes.push(node),
                Item::Closing(closing) => return Ok((list, closing)),
            }
        }
        Err(TemplateError::new(self.peek().pos, "unexpected EOF"))
    }

    fn text_or_action(&mut self) -> ParseResult<Item> {
        let token = self.next_non_space();
        match token.kind {
            TokenKind::Text => Ok(Item::Node(TemplateNode::Text(TextNode {
                pos: token.pos,
                text: token.lexeme,
            }))),
            TokenKind::LeftDelim => self.action(),
            _ => Err(unexpected(&token, "input")),
        }
    }

    fn action(&mut self) -> ParseResult<Item> {
        let token = self.next_non_space();
        match token.kind {
            TokenKind::Keyword(Keyword::Block) => return self.block_control(),
            TokenKind::Keyword(Keyword::Break) => {
                let pos = self.loop_control(&token, "{{break}}")?;
                return Ok(Item::Node(TemplateNode::Break(LoopControlNode { pos })));
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let pos = self.loop_control(&token, "{{continue}}")?;
                return Ok(Item::Node(TemplateNode::Continue(LoopControlNode { pos })));
            }
            TokenKind::Keyword(Keyword::Else) => return self.else_control(),
            TokenKind::Keyword(Keyword::End) => return self.end_control(),
            TokenKind::Keyword(Keyword::If) => {
                let branch = self.parse_control(Keyword::If)?;
                return Ok(Item::Node(TemplateNode::If(branch)));
            }
            TokenKind::Keyword(Keyword::Range) => {
                let branch = self.parse_control(Keyword::Range)?;
                return Ok(Item::Node(TemplateNode::Range(branch)));
            }
            TokenKind::Keyword(Keyword::Template) => return self.template_control(),
            TokenKind::Keyword(Keyword::With) => {
                let branch = self.parse_control(Keyword::With)?;
                return Ok(Item::Node(TemplateNode::With(branch)));
            }
            _ => {}
        }
        self.backup();

        // Declarations made here stay in scope until the enclosing {{end}}.
        let pos = self.peek().pos;
        let pipe = self.pipeline("command", TokenKind::RightDelim)?;
        Ok(Item::Node(TemplateNode::Action(ActionNode { pos, pipe })))
    }

    /// `{{break}}` and `{{continue}}` take no arguments and only appear
    /// inside a `range` body.
    fn loop_control(&mut self, keyword: &Token, context: &str) -> ParseResult<Pos> {
        let token = self.next_non_space();
        if token.kind != TokenKind::RightDelim {
            return Err(unexpected(&token, context));
        }
        if self.range_depth == 0 {
            return Err(TemplateError::new(
                keyword.pos,
                format!("{context} outside {{{{range}}}}"),
            ));
        }
        Ok(keyword.pos)
    }

    /// Parses the rest of an `if`, `range` or `with` action, which
    /// `keyword` names.
    fn parse_control(&mut self, keyword: Keyword) -> ParseResult<BranchNode> {
        let saved_vars = self.vars.len();
        let result = self.parse_control_inner(keyword);
        self.vars.truncate(saved_vars);
        result
    }

    fn parse_control_inner(&mut self, keyword: Keyword) -> ParseResult<BranchNode> {
        let context = keyword.as_str();
        let pipe = self.pipeline(context, TokenKind::RightDelim)?;

        let in_range = keyword == Keyword::Range;
        if in_range {
            self.range_depth += 1;
        }
        let body = self.item_list();
        if in_range {
            self.range_depth -= 1;
        }
        let (list, next) = body?;

        let else_list = match next {
            Closing::End(_) => None,
            Closing::Else(else_pos) => {
                let chains = matches!(keyword, Keyword::If | Keyword::With)
                    && self.peek_kind() == TokenKind::Keyword(keyword);
                if chains {
                    // `{{else if b}}` reads as `{{else}}{{if b}}...{{end}}`; the
                    // nested action consumes the single shared {{end}}.
                    self.skip();
                    let nested = self.parse_control(keyword)?;
                    let node = match keyword {
                        Keyword::With => TemplateNode::With(nested),
                        _ => TemplateNode::If(nested),
                    };
                    Some(ListNode {
                        pos: else_pos,
                        nodes: vec![node],
                    })
                } else {
                    match self.item_list()? {
                        (else_list, Closing::End(_)) => Some(else_list),
                        (_, closing @ Closing::Else(pos)) => {
                            return Err(TemplateError::new(
                                pos,
                                format!("expected end; found {}", closing.describe()),
                            ));
                        }
                    }
                }
            }
        };

        Ok(BranchNode {
            pos: pipe.pos,
            pipe,
            list,
            else_list,
        })
    }

    fn else_control(&mut self) -> ParseResult<Item> {
        let peeked = self.peek_non_space();
        if matches!(
            peeked.kind,
            TokenKind::Keyword(Keyword::If) | TokenKind::Keyword(Keyword::With)
        ) {
            // Leave the keyword pending for parse_control.
            return Ok(Item::Closing(Closing::Else(peeked.pos)));
        }
        let token = self.expect(TokenKind::RightDelim, "else")?;
        Ok(Item::Closing(Closing::Else(token.pos)))
    }

    fn end_control(&mut self) -> ParseResult<Item> {
        let token = self.expect(TokenKind::RightDelim, "end")?;
        Ok(Item::Closing(Closing::End(token.pos)))
    }

    fn template_control(&mut self) -> ParseResult<Item> {
        const CONTEXT: &str = "template clause";
        let token = self.next_non_space();
        let name = self.parse_template_name(&token, CONTEXT)?;

        let pipe = if self.next_non_space().kind == TokenKind::RightDelim {
            None
        } else {
            self.backup();
            Some(self.pipeline(CONTEXT, TokenKind::RightDelim)?)
        };

        Ok(Item::Node(TemplateNode::Template(TemplateCallNode {
            pos: token.pos,
            name,
            pipe,
        })))
    }

    /// `{{block "name" pipeline}}body{{end}}` defines `name` and invokes it
    /// in place.
    fn block_control(&mut self) -> ParseResult<Item> {
        const CONTEXT: &str = "block clause";
        let token = self.next_non_space();
        let name = self.parse_template_name(&token, CONTEXT)?;
        let pipe = self.pipeline(CONTEXT, TokenKind::RightDelim)?;

        let root = self.definition_body(CONTEXT)?;
        self.add_definition(token.pos, name.clone(), root)?;

        Ok(Item::Node(TemplateNode::Template(TemplateCallNode {
            pos: token.pos,
            name,
            pipe: Some(pipe),
        })))
    }

    fn parse_template_name(&self, token: &Token, context: &str) -> ParseResult<String> {
        match token.kind {
            TokenKind::String | TokenKind::RawString => unquote(&token.lexeme)
                .map_err(|err| TemplateError::new(token.pos, err.to_string())),
            _ => Err(unexpected(token, context)),
        }
    }

    fn pipeline(&mut self, context: &str, end: TokenKind) -> ParseResult<PipeNode> {
        let mut pipe = PipeNode {
            pos: self.peek_non_space().pos,
            decl: Vec::new(),
            cmds: Vec::new(),
        };

        self.parse_declarations(&mut pipe, context)?;

        loop {
            let token = self.next_non_space();
            match token.kind {
                kind if kind == end => {
                    check_pipeline(&pipe, context)?;
                    return Ok(pipe);
                }
                TokenKind::Bool
                | TokenKind::CharConstant
                | TokenKind::Dot
                | TokenKind::Field
                | TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::Keyword(Keyword::Nil)
                | TokenKind::RawString
                | TokenKind::String
                | TokenKind::Variable
                | TokenKind::LeftParen => {
                    self.backup();
                    let command = self.command()?;
                    pipe.cmds.push(command);
                }
                _ => return Err(unexpected(&token, context)),
            }
        }
    }

    fn parse_declarations(&mut self, pipe: &mut PipeNode, context: &str) -> ParseResult<()> {
        loop {
            let checkpoint = self.current;
            let variable = self.next_non_space();
            if variable.kind != TokenKind::Variable {
                self.current = checkpoint;
                return Ok(());
            }

            let next = self.peek_non_space();
            match next.kind {
                TokenKind::Assign | TokenKind::Declare => {
                    self.skip();
                    self.declare(pipe, &variable);
                    return Ok(());
                }
                TokenKind::Comma => {
                    self.skip();
                    self.declare(pipe, &variable);
                    if context == "range" && pipe.decl.len() < 2 {
                        match self.peek_non_space().kind {
                            TokenKind::Variable
                            | TokenKind::RightDelim
                            | TokenKind::RightParen => continue,
                            _ => {
                                return Err(TemplateError::new(
                                    variable.pos,
                                    "range can only initialize variables",
                                ))
                            }
                        }
                    }
                    return Err(TemplateError::new(
                        variable.pos,
                        format!("too many declarations in {context}"),
                    ));
                }
                _ => {
                    // A plain use of the variable; reparse it as an operand.
                    self.current = checkpoint;
                    return Ok(());
                }
            }
        }
    }

    fn declare(&mut self, pipe: &mut PipeNode, variable: &Token) {
        pipe.decl.push(VariableNode {
            pos: variable.pos,
            ident: vec![variable.lexeme.clone()],
        });
        self.vars.push(variable.lexeme.clone());
    }

    fn command(&mut self) -> ParseResult<CommandNode> {
        let mut command = CommandNode {
            pos: self.peek_non_space().pos,
            args: Vec::new(),
        };

        loop {
            self.peek_non_space();
            if let Some(operand) = self.operand()? {
                command.args.push(operand);
            }
            let token = self.advance();
            match token.kind {
                TokenKind::Space => continue,
                TokenKind::RightDelim | TokenKind::RightParen => self.backup(),
                TokenKind::Pipe => {}
                _ => return Err(unexpected(&token, "operand")),
            }
            break;
        }

        if command.args.is_empty() {
            return Err(TemplateError::new(command.pos, "empty command"));
        }
        Ok(command)
    }

    fn operand(&mut self) -> ParseResult<Option<TemplateNode>> {
        let Some(node) = self.term()? else {
            return Ok(None);
        };
        if self.peek_kind() != TokenKind::Field {
            return Ok(Some(node));
        }

        let chain_pos = self.peek().pos;
        let mut fields = Vec::new();
        while self.peek_kind() == TokenKind::Field {
            let token = self.advance();
            fields.push(token.lexeme[1..].to_string());
        }

        let merged = match node {
            // `.A.B` and `$x.A` stay flat, positioned at the first trailing field.
            TemplateNode::Field(mut field) => {
                field.ident.extend(fields);
                TemplateNode::Field(FieldNode {
                    pos: chain_pos,
                    ident: field.ident,
                })
            }
            TemplateNode::Variable(mut variable) => {
                variable.ident.extend(fields);
                TemplateNode::Variable(VariableNode {
                    pos: chain_pos,
                    ident: variable.ident,
                })
            }
            TemplateNode::Bool(_)
            | TemplateNode::String(_)
            | TemplateNode::Number(_)
            | TemplateNode::Nil(_)
            | TemplateNode::Dot(_) => {
                return Err(TemplateError::new(
                    chain_pos,
                    format!("unexpected . after term {:?}", literal_text(&node)),
                ));
            }
            other => TemplateNode::Chain(ChainNode {
                pos: chain_pos,
                node: Box::new(other),
                field: fields,
            }),
        };
        Ok(Some(merged))
    }

    fn term(&mut self) -> ParseResult<Option<TemplateNode>> {
        let token = self.next_non_space();
        let pos = token.pos;
        let node = match token.kind {
            TokenKind::Identifier => {
                if !BUILTIN_FUNCTIONS.contains(&token.lexeme.as_str()) {
                    return Err(TemplateError::new(
                        pos,
                        format!("function {:?} not defined", token.lexeme),
                    ));
                }
                TemplateNode::Identifier(IdentifierNode {
                    pos,
                    ident: token.lexeme,
                    is_function: true,
                })
            }
            TokenKind::Dot => TemplateNode::Dot(DotNode { pos }),
            TokenKind::Keyword(Keyword::Nil) => TemplateNode::Nil(NilNode { pos }),
            TokenKind::Variable => TemplateNode::Variable(self.use_var(pos, &token.lexeme)?),
            TokenKind::Field => TemplateNode::Field(FieldNode {
                pos,
                ident: vec![token.lexeme[1..].to_string()],
            }),
            TokenKind::Bool => TemplateNode::Bool(BoolNode {
                pos,
                value: token.lexeme == "true",
            }),
            TokenKind::CharConstant => {
                unquote(&token.lexeme).map_err(|err| TemplateError::new(pos, err.to_string()))?;
                TemplateNode::Number(NumberNode {
                    pos,
                    text: token.lexeme,
                })
            }
            TokenKind::Number => {
                validate_number(pos, &token.lexeme)?;
                TemplateNode::Number(NumberNode {
                    pos,
                    text: token.lexeme,
                })
            }
            TokenKind::LeftParen => {
                TemplateNode::Pipe(self.pipeline("parenthesized pipeline", TokenKind::RightParen)?)
            }
            TokenKind::String | TokenKind::RawString => {
                unquote(&token.lexeme).map_err(|err| TemplateError::new(pos, err.to_string()))?;
                TemplateNode::String(StringNode {
                    pos,
                    quoted: token.lexeme,
                })
            }
            _ => {
                self.backup();
                return Ok(None);
            }
        };
        Ok(Some(node))
    }

    fn use_var(&self, pos: Pos, name: &str) -> ParseResult<VariableNode> {
        if !self.vars.iter().any(|var| var == name) {
            return Err(TemplateError::new(
                pos,
                format!("undefined variable {name:?}"),
            ));
        }
        Ok(VariableNode {
            pos,
            ident: vec![name.to_string()],
        })
    }

    fn expect(&mut self, expected: TokenKind, context: &str) -> ParseResult<Token> {
        let token = self.next_non_space();
        if token.kind != expected {
            return Err(unexpected(&token, context));
        }
        Ok(token)
    }

    fn next_non_space(&mut self) -> Token {
        while self.peek_kind() == TokenKind::Space {
            self.skip();
        }
        self.advance()
    }

    fn peek_non_space(&mut self) -> Token {
        while self.peek_kind() == TokenKind::Space {
            self.skip();
        }
        self.peek().clone()
    }

    /// Reads past the end keep returning the trailing EOF token.
    fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.current += 1;
        token
    }

    fn skip(&mut self) {
        self.current += 1;
    }

    fn backup(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }
}

fn check_pipeline(pipe: &PipeNode, context: &str) -> ParseResult<()> {
    if pipe.cmds.is_empty() {
        return Err(TemplateError::new(
            pipe.pos,
            format!("missing value for {context}"),
        ));
    }
    for (index, command) in pipe.cmds.iter().enumerate().skip(1) {
        if let Some(
            TemplateNode::Bool(_)
            | TemplateNode::Dot(_)
            | TemplateNode::Nil(_)
            | TemplateNode::Number(_)
            | TemplateNode::String(_),
        ) = command.args.first()
        {
            return Err(TemplateError::new(
                command.pos,
                format!("non executable command in pipeline stage {}", index + 1),
            ));
        }
    }
    Ok(())
}

fn validate_number(pos: Pos, text: &str) -> ParseResult<()> {
    let digits = text
        .trim_start_matches(['+', '-'])
        .trim_end_matches('i')
        .replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let valid = if let Some(hex) = lower.strip_prefix("0x") {
        !hex.is_empty()
            && hex
                .chars()
                .all(|c| c.is_ascii_hexdigit() || matches!(c, '.' | 'p' | '+' | '-'))
    } else if let Some(octal) = lower.strip_prefix("0o") {
        u64::from_str_radix(octal, 8).is_ok()
    } else if let Some(binary) = lower.strip_prefix("0b") {
        u64::from_str_radix(binary, 2).is_ok()
    } else {
        lower.parse::<f64>().is_ok()
    };

    if valid {
        Ok(())
    } else {
        Err(TemplateError::new(
            pos,
            format!("illegal number syntax: {text:?}"),
        ))
    }
}

fn literal_text(node: &TemplateNode) -> String {
    match node {
        TemplateNode::Bool(node) => node.value.to_string(),
        TemplateNode::String(node) => node.quoted.clone(),
        TemplateNode::Number(node) => node.text.clone(),
        TemplateNode::Nil(_) => "nil".to_string(),
        _ => ".".to_string(),
    }
}

fn is_empty_list(list: &ListNode) -> bool {
    list.nodes.iter().all(|node| match node {
        TemplateNode::Text(text) => text.text.trim().is_empty(),
        _ => false,
    })
}

fn unexpected(token: &Token, context: &str) -> TemplateError {
    let described = match token.kind {
        TokenKind::Eof => "EOF".to_string(),
        TokenKind::Keyword(keyword) => format!("<{}>", keyword.as_str()),
        _ => format!("{:?}", token.lexeme),
    };
    TemplateError::new(token.pos, format!("unexpected {described} in {context}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Delimiters;
    use crate::template::lexer::Lexer;

    fn parse(source: &str) -> ParseResult<Tree> {
        let delimiters = Delimiters::default();
        let tokens = Lexer::new(source, &delimiters).tokenize()?;
        Parser::new(tokens).parse()
    }

    #[test]
    fn merges_trailing_fields_into_field_node() {
        let tree = parse("{{.Foo.Bar}}").expect("parse");
        let TemplateNode::Action(action) = &tree.root.nodes[0] else {
            panic!("expected action, got {:?}", tree.root.nodes[0]);
        };
        let TemplateNode::Field(field) = &action.pipe.cmds[0].args[0] else {
            panic!("expected field");
        };
        assert_eq!(field.ident, vec!["Foo", "Bar"]);
        assert_eq!(field.pos, 6);
    }

    #[test]
    fn wraps_parenthesised_pipelines_in_chains() {
        let tree = parse("{{(index . 0).Name}}").expect("parse");
        let TemplateNode::Action(action) = &tree.root.nodes[0] else {
            panic!("expected action");
        };
        let TemplateNode::Chain(chain) = &action.pipe.cmds[0].args[0] else {
            panic!("expected chain");
        };
        assert_eq!(chain.field, vec!["Name"]);
        assert!(matches!(*chain.node, TemplateNode::Pipe(_)));
    }

    #[test]
    fn chains_else_if_into_nested_if() {
        let tree = parse("{{if .A}}a{{else if .B}}b{{else}}c{{end}}").expect("parse");
        let TemplateNode::If(branch) = &tree.root.nodes[0] else {
            panic!("expected if");
        };
        let else_list = branch.else_list.as_ref().expect("else list");
        assert!(matches!(else_list.nodes[0], TemplateNode::If(_)));
    }

    #[test]
    fn chains_else_with_into_nested_with() {
        let tree = parse("{{with .A}}a{{else with .B}}{{.C}}{{end}}").expect("parse");
        let TemplateNode::With(branch) = &tree.root.nodes[0] else {
            panic!("expected with");
        };
        let else_list = branch.else_list.as_ref().expect("else list");
        assert!(matches!(else_list.nodes[0], TemplateNode::With(_)));
    }

    #[test]
    fn accepts_break_and_continue_inside_range() {
        let tree = parse("{{range .Items}}{{if .Done}}{{break}}{{end}}{{continue}}{{end}}")
            .expect("parse");
        let TemplateNode::Range(range) = &tree.root.nodes[0] else {
            panic!("expected range");
        };
        let TemplateNode::If(inner) = &range.list.nodes[0] else {
            panic!("expected if");
        };
        assert!(matches!(inner.list.nodes[0], TemplateNode::Break(_)));
        assert!(matches!(range.list.nodes[1], TemplateNode::Continue(_)));
    }

    #[test]
    fn rejects_loop_control_outside_range_body() {
        let err = parse("{{break}}").expect_err("break outside range");
        assert_eq!(err.message, "{{break}} outside {{range}}");

        let err = parse("{{range .Items}}{{else}}{{continue}}{{end}}").expect_err("else list");
        assert_eq!(err.message, "{{continue}} outside {{range}}");

        let err = parse("{{range .Items}}{{break .X}}{{end}}").expect_err("argument");
        assert!(err.message.ends_with("in {{break}}"), "got: {}", err.message);
    }

    #[test]
    fn scopes_range_variables_to_the_block() {
        assert!(parse("{{range $i, $e := .Items}}{{$i}}{{$e}}{{end}}").is_ok());
        let err = parse("{{range $e := .Items}}{{end}}{{$e}}").expect_err("out of scope");
        assert_eq!(err.message, "undefined variable \"$e\"");
    }

    #[test]
    fn rejects_unknown_functions() {
        let err = parse("{{lookup .Name}}").expect_err("unknown function");
        assert_eq!(err.message, "function \"lookup\" not defined");
        assert_eq!(err.pos, 2);
    }

    #[test]
    fn rejects_literal_pipeline_stages() {
        let err = parse("{{.Name | \"x\"}}").expect_err("literal stage");
        assert_eq!(err.message, "non executable command in pipeline stage 2");
    }

    #[test]
    fn rejects_empty_pipelines() {
        let err = parse("{{if}}{{end}}").expect_err("empty if");
        assert_eq!(err.message, "missing value for if");
    }

    #[test]
    fn collects_definitions_separately() {
        let tree = parse("{{define \"row\"}}{{.Cell}}{{end}}{{template \"row\" .}}")
            .expect("parse");
        assert_eq!(tree.defines.len(), 1);
        assert_eq!(tree.defines[0].name, "row");
        assert_eq!(tree.root.nodes.len(), 1);
        assert!(matches!(tree.root.nodes[0], TemplateNode::Template(_)));
    }

    #[test]
    fn block_defines_and_invokes() {
        let tree = parse("{{block \"nav\" .}}{{.Links}}{{end}}").expect("parse");
        assert_eq!(tree.defines[0].name, "nav");
        let TemplateNode::Template(call) = &tree.root.nodes[0] else {
            panic!("expected template call");
        };
        assert_eq!(call.name, "nav");
        assert!(call.pipe.is_some());
    }

    #[test]
    fn reports_stray_end() {
        let err = parse("{{end}}").expect_err("stray end");
        assert_eq!(err.message, "unexpected {{end}}");
    }

    #[test]
    fn reports_unterminated_blocks() {
        let err = parse("{{if .A}}never closed").expect_err("eof");
        assert_eq!(err.message, "unexpected EOF");
    }
}
