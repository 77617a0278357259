/// Byte offset into the template source.
pub type Pos = usize;

/// Owned template syntax node. The set of kinds is closed; every traversal
/// matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Text(TextNode),
    Action(ActionNode),
    Pipe(PipeNode),
    Command(CommandNode),
    Chain(ChainNode),
    Field(FieldNode),
    Identifier(IdentifierNode),
    Variable(VariableNode),
    Dot(DotNode),
    Nil(NilNode),
    Bool(BoolNode),
    Number(NumberNode),
    String(StringNode),
    If(BranchNode),
    Range(BranchNode),
    With(BranchNode),
    Template(TemplateCallNode),
    Break(LoopControlNode),
    Continue(LoopControlNode),
    List(ListNode),
}

impl TemplateNode {
    pub fn as_node(&self) -> NodeRef<'_> {
        match self {
            TemplateNode::Text(node) => NodeRef::Text(node),
            TemplateNode::Action(node) => NodeRef::Action(node),
            TemplateNode::Pipe(node) => NodeRef::Pipe(node),
            TemplateNode::Command(node) => NodeRef::Command(node),
            TemplateNode::Chain(node) => NodeRef::Chain(node),
            TemplateNode::Field(node) => NodeRef::Field(node),
            TemplateNode::Identifier(node) => NodeRef::Identifier(node),
            TemplateNode::Variable(node) => NodeRef::Variable(node),
            TemplateNode::Dot(node) => NodeRef::Dot(node),
            TemplateNode::Nil(node) => NodeRef::Nil(node),
            TemplateNode::Bool(node) => NodeRef::Bool(node),
            TemplateNode::Number(node) => NodeRef::Number(node),
            TemplateNode::String(node) => NodeRef::String(node),
            TemplateNode::If(node) => NodeRef::If(node),
            TemplateNode::Range(node) => NodeRef::Range(node),
            TemplateNode::With(node) => NodeRef::With(node),
            TemplateNode::Template(node) => NodeRef::Template(node),
            TemplateNode::Break(node) => NodeRef::Break(node),
            TemplateNode::Continue(node) => NodeRef::Continue(node),
            TemplateNode::List(node) => NodeRef::List(node),
        }
    }
}

/// Borrowed view of any node, including the ones embedded by value in
/// their parents (a branch's pipe, an action's pipe, a pipe's commands).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Text(&'a TextNode),
    Action(&'a ActionNode),
    Pipe(&'a PipeNode),
    Command(&'a CommandNode),
    Chain(&'a ChainNode),
    Field(&'a FieldNode),
    Identifier(&'a IdentifierNode),
    Variable(&'a VariableNode),
    Dot(&'a DotNode),
    Nil(&'a NilNode),
    Bool(&'a BoolNode),
    Number(&'a NumberNode),
    String(&'a StringNode),
    If(&'a BranchNode),
    Range(&'a BranchNode),
    With(&'a BranchNode),
    Template(&'a TemplateCallNode),
    Break(&'a LoopControlNode),
    Continue(&'a LoopControlNode),
    List(&'a ListNode),
}

impl NodeRef<'_> {
    pub fn pos(&self) -> Pos {
        match self {
            NodeRef::Text(node) => node.pos,
            NodeRef::Action(node) => node.pos,
            NodeRef::Pipe(node) => node.pos,
            NodeRef::Command(node) => node.pos,
            NodeRef::Chain(node) => node.pos,
            NodeRef::Field(node) => node.pos,
            NodeRef::Identifier(node) => node.pos,
            NodeRef::Variable(node) => node.pos,
            NodeRef::Dot(node) => node.pos,
            NodeRef::Nil(node) => node.pos,
            NodeRef::Bool(node) => node.pos,
            NodeRef::Number(node) => node.pos,
            NodeRef::String(node) => node.pos,
            NodeRef::If(node) | NodeRef::Range(node) | NodeRef::With(node) => node.pos,
            NodeRef::Template(node) => node.pos,
            NodeRef::Break(node) | NodeRef::Continue(node) => node.pos,
            NodeRef::List(node) => node.pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub pos: Pos,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub pos: Pos,
    pub pipe: PipeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeNode {
    pub pos: Pos,
    pub decl: Vec<VariableNode>,
    pub cmds: Vec<CommandNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    pub pos: Pos,
    pub args: Vec<TemplateNode>,
}

/// `(pipeline).Field1.Field2` where the wrapped term is neither a field
/// nor a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    pub pos: Pos,
    pub node: Box<TemplateNode>,
    pub field: Vec<String>,
}

/// `.Foo.Bar` holds `["Foo", "Bar"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub pos: Pos,
    pub ident: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierNode {
    pub pos: Pos,
    pub ident: String,
    /// Set for identifiers resolved against the function table.
    pub is_function: bool,
}

/// `$x.Foo` holds `["$x", "Foo"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    pub pos: Pos,
    pub ident: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotNode {
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NilNode {
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolNode {
    pub pos: Pos,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub pos: Pos,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub pos: Pos,
    pub quoted: String,
}

/// Shared payload of `if`, `range` and `with`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub pos: Pos,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

/// `{{template "name" pipeline}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCallNode {
    pub pos: Pos,
    pub name: String,
    pub pipe: Option<PipeNode>,
}

/// `{{break}}` or `{{continue}}` inside a `range` body.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopControlNode {
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListNode {
    pub pos: Pos,
    pub nodes: Vec<TemplateNode>,
}

impl ListNode {
    pub fn new(pos: Pos) -> Self {
        Self {
            pos,
            nodes: Vec::new(),
        }
    }
}

/// A parsed template file: the root body plus any `define`/`block`
/// bodies it declares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    pub root: ListNode,
    pub defines: Vec<DefinedTemplate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinedTemplate {
    pub name: String,
    pub root: ListNode,
}
