//! Call sites: dispatched action types and message ids

use tree_sitter::Node;

use crate::tree_sitter::syntax::{
    callee_name, find_entry, jsx_attribute_value, jsx_element_name, node_text, string_value,
    unwrap_expression,
};
use crate::tree_sitter::{Range, Usage};

/// Collect usages in source order. Unqualified action types resolve to
/// `own_namespace` (the model's own actions) and are skipped elsewhere.
pub fn extract(root: Node, source: &str, own_namespace: Option<&str>) -> Vec<Usage> {
    let mut usages = Vec::new();

    // Explicit stack: generated code nests far deeper than the thread stack
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "call_expression" => inspect_call(node, source, own_namespace, &mut usages),
            "jsx_opening_element" | "jsx_self_closing_element" => {
                inspect_jsx(node, source, &mut usages)
            }
            _ => {}
        }

        // Reversed so children pop in source order
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }

    usages
}

fn inspect_call(call: Node, source: &str, own_namespace: Option<&str>, usages: &mut Vec<Usage>) {
    let Some(callee) = call.child_by_field_name("function") else {
        return;
    };
    let Some(argument) = first_object_argument(call) else {
        return;
    };

    if is_action_callee(&callee, source) {
        let Some((value, node)) = string_entry(argument, "type", source) else {
            return;
        };
        let qualified = match value.split_once('/') {
            Some((namespace, action)) => Some((namespace.to_string(), action.to_string())),
            None => own_namespace.map(|namespace| (namespace.to_string(), value.clone())),
        };
        if let Some((namespace, action)) = qualified {
            if !namespace.is_empty() && !action.is_empty() {
                usages.push(Usage::Action {
                    namespace,
                    action,
                    range: Range::from_node(&node),
                });
            }
        }
    } else if callee_name(&callee, source) == Some("formatMessage") {
        if let Some((key, node)) = string_entry(argument, "id", source) {
            usages.push(Usage::Message {
                key,
                range: Range::from_node(&node),
            });
        }
    }
}

/// `dispatch(...)`, `props.dispatch(...)`, `put(...)` and `put.resolve(...)`
fn is_action_callee(callee: &Node, source: &str) -> bool {
    match callee_name(callee, source) {
        Some("dispatch") | Some("put") => true,
        Some("resolve") => callee
            .child_by_field_name("object")
            .and_then(|object| node_text(&object, source))
            .is_some_and(|object| object == "put"),
        _ => false,
    }
}

fn inspect_jsx(element: Node, source: &str, usages: &mut Vec<Usage>) {
    let is_formatted_message = jsx_element_name(&element, source)
        .is_some_and(|name| name == "FormattedMessage" || name.ends_with(".FormattedMessage"));
    if !is_formatted_message {
        return;
    }
    if let Some(node) = jsx_attribute_value(element, "id", source) {
        if let Some(key) = string_value(&node, source) {
            usages.push(Usage::Message {
                key,
                range: Range::from_node(&node),
            });
        }
    }
}

fn first_object_argument(call: Node) -> Option<Node> {
    let arguments = call.child_by_field_name("arguments")?;
    let first = unwrap_expression(arguments.named_child(0)?);
    (first.kind() == "object").then_some(first)
}

fn string_entry<'tree>(object: Node<'tree>, key: &str, source: &str) -> Option<(String, Node<'tree>)> {
    let value = unwrap_expression(find_entry(object, key, source)?.value?);
    let text = string_value(&value, source)?;
    Some((text, value))
}
