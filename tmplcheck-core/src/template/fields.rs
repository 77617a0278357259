use std::convert::Infallible;

use serde::Serialize;

use crate::template::ast::{NodeRef, Pos, Tree};
use crate::template::walk::walk;

/// A data reference found in a template, such as `.Foo.Bar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReference {
    pub template_path: String,
    pub byte_offset: Pos,
    pub line: usize,
    pub col: usize,
    pub chain: Vec<String>,
}

/// Collects field and non-function identifier references from the root
/// body of `tree`, in source order.
pub fn extract_fields(tree: &Tree, source: &str, relative_path: &str) -> Vec<FieldReference> {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut references = Vec::new();

    let result = walk(NodeRef::List(&tree.root), &mut |node| -> Result<(), Infallible> {
        let chain = match node {
            // Built-in function names are never data references.
            NodeRef::Identifier(identifier) if identifier.is_function => return Ok(()),
            NodeRef::Identifier(identifier) => vec![identifier.ident.clone()],
            NodeRef::Field(field) => field.ident.clone(),
            _ => return Ok(()),
        };
        let pos = node.pos();
        let (line, col) = line_col(pos, &lines);
        references.push(FieldReference {
            template_path: relative_path.to_string(),
            byte_offset: pos,
            line,
            col,
            chain,
        });
        Ok(())
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }

    references
}

/// Maps a byte offset onto a 1-based line and the offset within that line.
///
/// Lines are accumulated (length plus the `\n`) until the running total
/// reaches `offset`; the column is measured from the start of that line.
pub fn line_col(offset: usize, lines: &[&str]) -> (usize, usize) {
    let mut line = 1;
    let mut line_start = None;
    let mut total = 0;

    for text in lines {
        line_start = Some(total);
        total += text.len() + 1;
        if total >= offset {
            break;
        }
        line += 1;
    }

    let col = match line_start {
        Some(start) => offset - start,
        None => offset,
    };
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_inside_second_line() {
        let lines: Vec<&str> = "A\nBC\nDEF".split('\n').collect();
        assert_eq!(line_col(4, &lines), (2, 2));
    }

    #[test]
    fn offset_on_first_line() {
        let lines: Vec<&str> = "Hello {{.Name}}".split('\n').collect();
        assert_eq!(line_col(8, &lines), (1, 8));
    }

    #[test]
    fn no_lines_reports_raw_offset() {
        assert_eq!(line_col(7, &[]), (1, 7));
    }
}
