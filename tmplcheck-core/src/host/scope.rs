use tree_sitter::Node;

use crate::host::{HostFile, HostPackage};

/// Standard library template packages whose constructors are recognised.
const TEMPLATE_PACKAGES: &[&str] = &["html/template", "text/template"];

/// Package functions returning a `*Template` (possibly alongside an error).
const TEMPLATE_CONSTRUCTORS: &[&str] = &["New", "Must", "ParseFiles", "ParseGlob", "ParseFS"];

/// `*Template` methods returning the receiver's type alone.
const TEMPLATE_BUILDERS: &[&str] = &["New", "Funcs", "Delims", "Option", "Lookup"];

/// Bound on identifier-to-identifier hops while inferring a type.
const MAX_TYPE_DEPTH: usize = 8;

/// A declaration that introduces a name, with whatever the declaration
/// says about its type and initial value.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub file: &'a HostFile,
    pub type_node: Option<Node<'a>>,
    pub value: Option<Node<'a>>,
}

/// Answers static questions about identifiers in a parsed package.
pub struct Resolver<'a> {
    package: &'a HostPackage,
}

impl<'a> Resolver<'a> {
    pub fn new(package: &'a HostPackage) -> Self {
        Self { package }
    }

    /// Finds the declaration `name` refers to at `at`: the nearest one in an
    /// enclosing scope, else a package-level `var`/`const` in any file.
    pub fn lookup(&self, file: &'a HostFile, name: &str, at: Node<'a>) -> Option<Binding<'a>> {
        let position = at.start_byte();
        let mut current = at;

        while let Some(scope) = current.parent() {
            if scope.kind() == "source_file" {
                break;
            }
            if let Some(found) = self.declared_in_scope(file, scope, name, position) {
                return found;
            }
            current = scope;
        }

        self.package_level(name)
    }

    /// Static type name of identifier `name` used at `at`, such as
    /// `*html/template.Template`.
    pub fn identifier_type(&self, file: &'a HostFile, name: &str, at: Node<'a>) -> Option<String> {
        self.identifier_type_at_depth(file, name, at, 0)
    }

    fn identifier_type_at_depth(
        &self,
        file: &'a HostFile,
        name: &str,
        at: Node<'a>,
        depth: usize,
    ) -> Option<String> {
        let binding = self.lookup(file, name, at)?;
        if let Some(type_node) = binding.type_node {
            return self.type_name(binding.file, type_node);
        }
        self.expression_type(binding.file, binding.value?, depth + 1)
    }

    /// Type produced by `expr`, for the expression shapes that state it
    /// syntactically.
    pub fn expression_type(&self, file: &'a HostFile, expr: Node<'a>, depth: usize) -> Option<String> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }

        match expr.kind() {
            "composite_literal" => self.type_name(file, expr.child_by_field_name("type")?),
            "unary_expression" => {
                let operator = expr.child_by_field_name("operator")?;
                let operand = expr.child_by_field_name("operand")?;
                if file.text(operator) != "&" || operand.kind() != "composite_literal" {
                    return None;
                }
                let inner = self.type_name(file, operand.child_by_field_name("type")?)?;
                Some(format!("*{inner}"))
            }
            "parenthesized_expression" => {
                self.expression_type(file, first_named_child(expr)?, depth + 1)
            }
            "identifier" => self.identifier_type_at_depth(file, file.text(expr), expr, depth),
            "call_expression" => self.call_type(file, expr, depth),
            _ => None,
        }
    }

    fn call_type(&self, file: &'a HostFile, call: Node<'a>, depth: usize) -> Option<String> {
        let function = call.child_by_field_name("function")?;

        if function.kind() == "identifier" && file.text(function) == "new" {
            let arguments = call.child_by_field_name("arguments")?;
            let inner = self.type_name(file, first_named_child(arguments)?)?;
            return Some(format!("*{inner}"));
        }

        if function.kind() != "selector_expression" {
            return None;
        }
        let operand = function.child_by_field_name("operand")?;
        let field = file.text(function.child_by_field_name("field")?);

        if operand.kind() == "identifier" {
            let qualifier = file.text(operand);
            if self.lookup(file, qualifier, operand).is_none() {
                let import_path = file.imports.get(qualifier)?;
                if TEMPLATE_PACKAGES.contains(&import_path.as_str())
                    && TEMPLATE_CONSTRUCTORS.contains(&field)
                {
                    return Some(format!("*{import_path}.Template"));
                }
                return None;
            }
        }

        let receiver = self.expression_type(file, operand, depth + 1)?;
        let is_template = TEMPLATE_PACKAGES
            .iter()
            .any(|package| receiver == format!("*{package}.Template"));
        (is_template && TEMPLATE_BUILDERS.contains(&field)).then_some(receiver)
    }

    /// Fully qualified name of a type expression: `pkg.T` becomes
    /// `<import path>.T`, a local `T` is qualified with the package's own
    /// import path, and pointers keep their `*`.
    pub fn type_name(&self, file: &HostFile, type_node: Node<'_>) -> Option<String> {
        match type_node.kind() {
            "type_identifier" => Some(format!(
                "{}.{}",
                self.package.import_path,
                file.text(type_node)
            )),
            "qualified_type" => {
                let package = file.text(type_node.child_by_field_name("package")?);
                let name = file.text(type_node.child_by_field_name("name")?);
                let import_path = file.imports.get(package)?;
                Some(format!("{import_path}.{name}"))
            }
            "pointer_type" => {
                let inner = self.type_name(file, first_named_child(type_node)?)?;
                Some(format!("*{inner}"))
            }
            "parenthesized_type" => self.type_name(file, first_named_child(type_node)?),
            "generic_type" => self.type_name(file, type_node.child_by_field_name("type")?),
            _ => None,
        }
    }

    /// `Some(None)` means `name` is declared in `scope` but nothing useful is
    /// known about it; the declaration still shadows outer ones.
    fn declared_in_scope(
        &self,
        file: &'a HostFile,
        scope: Node<'a>,
        name: &str,
        position: usize,
    ) -> Option<Option<Binding<'a>>> {
        match scope.kind() {
            "function_declaration" | "func_literal" => signature_binding(file, scope, name),
            "method_declaration" => scope
                .child_by_field_name("receiver")
                .and_then(|receiver| parameters_binding(file, receiver, name))
                .or_else(|| signature_binding(file, scope, name)),
            "for_statement" => {
                let mut cursor = scope.walk();
                let clauses: Vec<Node> = scope.named_children(&mut cursor).collect();
                clauses.into_iter().find_map(|clause| match clause.kind() {
                    "range_clause" => {
                        let left = clause.child_by_field_name("left")?;
                        list_items(left)
                            .into_iter()
                            .any(|item| file.text(item) == name)
                            .then_some(None)
                    }
                    "for_clause" => {
                        declaration_binding(file, clause.child_by_field_name("initializer")?, name)
                    }
                    _ => None,
                })
            }
            "if_statement" | "expression_switch_statement" | "type_switch_statement" => {
                if let Some(alias) = scope.child_by_field_name("alias") {
                    if list_items(alias).into_iter().any(|item| file.text(item) == name) {
                        return Some(None);
                    }
                }
                declaration_binding(file, scope.child_by_field_name("initializer")?, name)
            }
            _ => {
                let mut cursor = scope.walk();
                let preceding: Vec<Node> = scope
                    .named_children(&mut cursor)
                    .filter(|child| child.end_byte() <= position)
                    .collect();
                preceding
                    .into_iter()
                    .rev()
                    .find_map(|child| declaration_binding(file, child, name))
            }
        }
    }

    fn package_level(&self, name: &str) -> Option<Binding<'a>> {
        self.package.files.iter().find_map(|file| {
            let root = file.tree.root_node();
            let mut cursor = root.walk();
            let declarations: Vec<Node> = root.named_children(&mut cursor).collect();
            declarations
                .into_iter()
                .find_map(|declaration| declaration_binding(file, declaration, name))
                .flatten()
        })
    }
}

/// Binding for `name` if `node` is a declaration statement that declares it.
fn declaration_binding<'a>(
    file: &'a HostFile,
    node: Node<'a>,
    name: &str,
) -> Option<Option<Binding<'a>>> {
    match node.kind() {
        "short_var_declaration" => {
            let names = list_items(node.child_by_field_name("left")?);
            let index = names.iter().position(|item| file.text(*item) == name)?;
            let values = node
                .child_by_field_name("right")
                .map(list_items)
                .unwrap_or_default();
            Some(Some(Binding {
                file,
                type_node: None,
                value: value_at(&values, names.len(), index),
            }))
        }
        "var_declaration" | "const_declaration" | "var_spec_list" | "const_spec_list" => {
            let mut cursor = node.walk();
            let specs: Vec<Node> = node.named_children(&mut cursor).collect();
            specs
                .into_iter()
                .find_map(|spec| declaration_binding(file, spec, name))
        }
        "var_spec" | "const_spec" => {
            let mut cursor = node.walk();
            let names: Vec<Node> = node
                .children_by_field_name("name", &mut cursor)
                .collect();
            let index = names.iter().position(|item| file.text(*item) == name)?;
            let values = node
                .child_by_field_name("value")
                .map(list_items)
                .unwrap_or_default();
            Some(Some(Binding {
                file,
                type_node: node.child_by_field_name("type"),
                value: value_at(&values, names.len(), index),
            }))
        }
        _ => None,
    }
}

/// Parameters of a function, then its named results. A result given as a
/// bare type is not a parameter list and declares nothing.
fn signature_binding<'a>(
    file: &'a HostFile,
    function: Node<'a>,
    name: &str,
) -> Option<Option<Binding<'a>>> {
    function
        .child_by_field_name("parameters")
        .and_then(|parameters| parameters_binding(file, parameters, name))
        .or_else(|| {
            let result = function.child_by_field_name("result")?;
            match result.kind() {
                "parameter_list" => parameters_binding(file, result, name),
                _ => None,
            }
        })
}

fn parameters_binding<'a>(
    file: &'a HostFile,
    parameters: Node<'a>,
    name: &str,
) -> Option<Option<Binding<'a>>> {
    let mut cursor = parameters.walk();
    let declarations: Vec<Node> = parameters.named_children(&mut cursor).collect();

    declarations.into_iter().find_map(|declaration| {
        let mut names_cursor = declaration.walk();
        let declares = declaration
            .children_by_field_name("name", &mut names_cursor)
            .any(|item| file.text(item) == name);
        if !declares {
            return None;
        }
        // Variadic parameters are slices; their element type says nothing
        // about the parameter itself.
        let type_node = match declaration.kind() {
            "parameter_declaration" => declaration.child_by_field_name("type"),
            _ => None,
        };
        Some(Some(Binding {
            file,
            type_node,
            value: None,
        }))
    })
}

/// Initializer for the `index`-th of `declared` names. A single call on the
/// right of several names binds its first result to the first name.
fn value_at<'a>(values: &[Node<'a>], declared: usize, index: usize) -> Option<Node<'a>> {
    if values.len() == declared {
        return values.get(index).copied();
    }
    if values.len() == 1 && index == 0 && values[0].kind() == "call_expression" {
        return Some(values[0]);
    }
    None
}

/// Named children of an `expression_list`, or the node itself when the
/// grammar produced a single expression.
pub(crate) fn list_items(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() != "expression_list" {
        return vec![node];
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let child = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    child
}
