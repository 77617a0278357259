use std::collections::HashMap;

use tree_sitter::Node;

use crate::bindings;
use crate::config::UnsupportedCallPolicy;
use crate::diagnostics::{Diagnostics, Location};
use crate::error::CheckError;
use crate::host::arguments::CallArguments;
use crate::host::scope::Resolver;
use crate::host::{HostFile, HostPackage};

/// One recognised render call and the data keys it passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteUsage {
    pub source_file: String,
    pub line: usize,
    pub byte_offset: usize,
    pub receiver_name: String,
    pub method_name: String,
    pub template_name: String,
    pub supplied_keys: Vec<String>,
}

/// Usages grouped by template name, each list in file then source order.
pub type UsagesByTemplate = HashMap<String, Vec<CallSiteUsage>>;

#[derive(Debug, Default)]
pub struct UsageExtraction {
    pub usages: UsagesByTemplate,
    /// Call sites dropped under the skip policy.
    pub warnings: Diagnostics,
}

/// Walks every call expression of the package and records the render calls
/// the registry recognises.
pub fn extract_usages(
    package: &HostPackage,
    policy: UnsupportedCallPolicy,
) -> Result<UsageExtraction, CheckError> {
    let resolver = Resolver::new(package);
    let mut extraction = UsageExtraction::default();

    for file in &package.files {
        for call in call_expressions(file.tree.root_node()) {
            let Some(site) = match_call(&resolver, file, call) else {
                continue;
            };

            let arguments = match call.child_by_field_name("arguments") {
                Some(list) => CallArguments::new(&resolver, file, list),
                None => continue,
            };
            match site.extractor.extract(&arguments) {
                Ok(extracted) => {
                    let usage = CallSiteUsage {
                        source_file: file.source.name.clone(),
                        line: site.function.start_position().row + 1,
                        byte_offset: site.function.start_byte(),
                        receiver_name: site.receiver,
                        method_name: site.method,
                        template_name: extracted.template_name,
                        supplied_keys: extracted.supplied_keys,
                    };
                    extraction
                        .usages
                        .entry(usage.template_name.clone())
                        .or_default()
                        .push(usage);
                }
                Err(unsupported) => {
                    let position = site.function.start_position();
                    let call_name = format!("{}.{}", site.receiver, site.method);
                    match policy {
                        UnsupportedCallPolicy::Abort => {
                            return Err(CheckError::UnsupportedArgument {
                                file: file.source.name.clone(),
                                line: position.row + 1,
                                call: call_name,
                                reason: unsupported.reason,
                            });
                        }
                        UnsupportedCallPolicy::Skip => {
                            extraction.warnings.push_warning_with_location(
                                format!(
                                    "skipping call to {call_name}: {}",
                                    unsupported.reason
                                ),
                                Some(Location::new(
                                    file.source.name.clone(),
                                    position.row + 1,
                                    position.column + 1,
                                )),
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(extraction)
}

struct MatchedCall<'a> {
    extractor: &'static bindings::BindingExtractor,
    function: Node<'a>,
    receiver: String,
    method: String,
}

/// Recognises `receiver.Method(...)` with a plain identifier receiver whose
/// static type and method name are registered.
fn match_call<'a>(
    resolver: &Resolver<'a>,
    file: &'a HostFile,
    call: Node<'a>,
) -> Option<MatchedCall<'a>> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "selector_expression" {
        return None;
    }
    let operand = function.child_by_field_name("operand")?;
    if operand.kind() != "identifier" {
        return None;
    }

    let receiver = file.text(operand);
    let method = file.text(function.child_by_field_name("field")?);
    let type_name = resolver.identifier_type(file, receiver, operand)?;
    let extractor = bindings::find(&type_name, method)?;

    Some(MatchedCall {
        extractor,
        function,
        receiver: receiver.to_string(),
        method: method.to_string(),
    })
}

/// Every `call_expression` below `root`, in pre-order.
fn call_expressions(root: Node<'_>) -> Vec<Node<'_>> {
    let mut calls = Vec::new();
    let mut cursor = root.walk();

    'walk: loop {
        let node = cursor.node();
        if node.kind() == "call_expression" {
            calls.push(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    calls
}
