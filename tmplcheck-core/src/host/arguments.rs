use tmplcheck_support::unquote;
use tree_sitter::Node;

use crate::bindings::{ArgumentSource, UnsupportedArgument};
use crate::host::scope::{first_named_child, Resolver};
use crate::host::HostFile;

/// Arguments of one Go call expression, read through the resolver so a
/// plain identifier can stand in for its initializer.
pub struct CallArguments<'r, 'a> {
    resolver: &'r Resolver<'a>,
    file: &'a HostFile,
    nodes: Vec<Node<'a>>,
}

impl<'r, 'a> CallArguments<'r, 'a> {
    pub fn new(resolver: &'r Resolver<'a>, file: &'a HostFile, argument_list: Node<'a>) -> Self {
        let mut cursor = argument_list.walk();
        let nodes = argument_list
            .named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .collect();
        Self {
            resolver,
            file,
            nodes,
        }
    }

    fn argument(&self, index: usize) -> Result<Node<'a>, UnsupportedArgument> {
        self.nodes
            .get(index)
            .copied()
            .ok_or_else(|| UnsupportedArgument::new(format!("missing argument {}", index + 1)))
    }

    /// Follows an identifier to its initializer, one level only.
    fn initializer(
        &self,
        identifier: Node<'a>,
    ) -> Result<(&'a HostFile, Node<'a>), UnsupportedArgument> {
        let name = self.file.text(identifier);
        let binding = self
            .resolver
            .lookup(self.file, name, identifier)
            .ok_or_else(|| UnsupportedArgument::new(format!("cannot resolve {name}")))?;
        let value = binding
            .value
            .ok_or_else(|| UnsupportedArgument::new(format!("{name} has no initializer")))?;
        Ok((binding.file, value))
    }
}

impl ArgumentSource for CallArguments<'_, '_> {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn template_name(&self, index: usize) -> Result<String, UnsupportedArgument> {
        let argument = self.argument(index)?;
        let (file, literal) = match argument.kind() {
            "identifier" => self.initializer(argument)?,
            _ => (self.file, argument),
        };
        if !is_string_literal(literal) {
            return Err(UnsupportedArgument::new(format!(
                "template name {} is not a string literal",
                self.file.text(argument)
            )));
        }
        unquote(file.text(literal)).map_err(|err| UnsupportedArgument::new(err.to_string()))
    }

    fn supplied_keys(&self, index: usize) -> Result<Vec<String>, UnsupportedArgument> {
        let argument = self.argument(index)?;
        let (file, value) = match argument.kind() {
            "identifier" => self.initializer(argument)?,
            _ => (self.file, argument),
        };

        match value.kind() {
            "nil" => Ok(Vec::new()),
            "composite_literal" => composite_keys(file, value),
            "unary_expression" => {
                let operand = value
                    .child_by_field_name("operand")
                    .filter(|operand| operand.kind() == "composite_literal")
                    .filter(|_| {
                        value
                            .child_by_field_name("operator")
                            .is_some_and(|operator| file.text(operator) == "&")
                    })
                    .ok_or_else(|| unsupported_data(file, value))?;
                composite_keys(file, operand)
            }
            _ => Err(unsupported_data(file, value)),
        }
    }
}

fn unsupported_data(file: &HostFile, value: Node<'_>) -> UnsupportedArgument {
    UnsupportedArgument::new(format!(
        "data argument {} is not a composite literal",
        file.text(value)
    ))
}

fn is_string_literal(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "interpreted_string_literal" | "raw_string_literal"
    )
}

/// One key per keyed element: string keys unquoted, other literals as
/// written, identifiers by name. Keys of any other shape are skipped.
fn composite_keys(file: &HostFile, literal: Node<'_>) -> Result<Vec<String>, UnsupportedArgument> {
    let Some(body) = literal.child_by_field_name("body") else {
        return Ok(Vec::new());
    };

    let mut keys = Vec::new();
    let mut cursor = body.walk();
    let elements: Vec<Node> = body
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();

    for element in elements {
        if element.kind() != "keyed_element" {
            return Err(UnsupportedArgument::new(
                "composite literal elements must be keyed",
            ));
        }
        let Some(mut key) = element
            .child_by_field_name("key")
            .or_else(|| first_named_child(element))
        else {
            continue;
        };
        if key.kind() == "literal_element" {
            match first_named_child(key) {
                Some(inner) => key = inner,
                None => continue,
            }
        }

        match key.kind() {
            "interpreted_string_literal" | "raw_string_literal" => {
                let text = unquote(file.text(key))
                    .map_err(|err| UnsupportedArgument::new(err.to_string()))?;
                keys.push(text);
            }
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal" | "true"
            | "false" | "identifier" | "field_identifier" => {
                keys.push(file.text(key).to_string());
            }
            _ => {}
        }
    }

    Ok(keys)
}
