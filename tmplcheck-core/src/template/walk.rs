use crate::template::ast::{BranchNode, NodeRef, PipeNode, TemplateNode};

/// Visits `node` and everything beneath it in pre-order, stopping at the
/// first error returned by `visit`.
pub fn walk<'a, E, F>(node: NodeRef<'a>, visit: &mut F) -> Result<(), E>
where
    F: FnMut(NodeRef<'a>) -> Result<(), E>,
{
    visit(node)?;

    match node {
        NodeRef::List(list) => walk_all(&list.nodes, visit),
        NodeRef::Action(action) => walk(NodeRef::Pipe(&action.pipe), visit),
        NodeRef::Pipe(pipe) => walk_pipe_children(pipe, visit),
        NodeRef::Command(command) => walk_all(&command.args, visit),
        NodeRef::Chain(chain) => walk(chain.node.as_node(), visit),
        NodeRef::If(branch) | NodeRef::Range(branch) | NodeRef::With(branch) => {
            walk_branch_children(branch, visit)
        }
        NodeRef::Template(call) => match &call.pipe {
            Some(pipe) => walk(NodeRef::Pipe(pipe), visit),
            None => Ok(()),
        },
        NodeRef::Text(_)
        | NodeRef::Break(_)
        | NodeRef::Continue(_)
        | NodeRef::Field(_)
        | NodeRef::Identifier(_)
        | NodeRef::Variable(_)
        | NodeRef::Dot(_)
        | NodeRef::Nil(_)
        | NodeRef::Bool(_)
        | NodeRef::Number(_)
        | NodeRef::String(_) => Ok(()),
    }
}

fn walk_all<'a, E, F>(nodes: &'a [TemplateNode], visit: &mut F) -> Result<(), E>
where
    F: FnMut(NodeRef<'a>) -> Result<(), E>,
{
    for node in nodes {
        walk(node.as_node(), visit)?;
    }
    Ok(())
}

fn walk_pipe_children<'a, E, F>(pipe: &'a PipeNode, visit: &mut F) -> Result<(), E>
where
    F: FnMut(NodeRef<'a>) -> Result<(), E>,
{
    for variable in &pipe.decl {
        walk(NodeRef::Variable(variable), visit)?;
    }
    for command in &pipe.cmds {
        walk(NodeRef::Command(command), visit)?;
    }
    Ok(())
}

fn walk_branch_children<'a, E, F>(branch: &'a BranchNode, visit: &mut F) -> Result<(), E>
where
    F: FnMut(NodeRef<'a>) -> Result<(), E>,
{
    walk(NodeRef::Pipe(&branch.pipe), visit)?;
    walk(NodeRef::List(&branch.list), visit)?;
    if let Some(else_list) = &branch.else_list {
        walk(NodeRef::List(else_list), visit)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Delimiters;
    use crate::template::ast::Tree;
    use crate::template::parse_template;

    fn parse(source: &str) -> Tree {
        parse_template(source, &Delimiters::default()).expect("parse")
    }

    fn label(node: NodeRef<'_>) -> String {
        match node {
            NodeRef::Field(field) => format!("field {}", field.ident.join(".")),
            NodeRef::List(_) => "list".to_string(),
            NodeRef::If(_) => "if".to_string(),
            NodeRef::Action(_) => "action".to_string(),
            NodeRef::Pipe(_) => "pipe".to_string(),
            NodeRef::Command(_) => "command".to_string(),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn visits_pipe_then_list_then_else_list() {
        let tree = parse("{{if .A}}{{.B}}{{else}}{{.C}}{{end}}");
        let mut seen = Vec::new();
        let result: Result<(), ()> = walk(NodeRef::List(&tree.root), &mut |node| {
            seen.push(label(node));
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(
            seen,
            vec![
                "list", "if", "pipe", "command", "field A", "list", "action", "pipe", "command",
                "field B", "list", "action", "pipe", "command", "field C",
            ]
        );
    }

    #[test]
    fn stops_at_the_first_error() {
        let tree = parse("{{.First}} {{range .Items}}{{.Second}}{{end}}");
        let mut visited = 0;
        let result = walk(NodeRef::List(&tree.root), &mut |node| {
            visited += 1;
            match node {
                NodeRef::Field(field) => Err(field.ident.clone()),
                _ => Ok(()),
            }
        });

        assert_eq!(result, Err(vec!["First".to_string()]));
        // list, action, pipe, command, field
        assert_eq!(visited, 5);
    }
}
