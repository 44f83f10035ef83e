//! Route patterns from route config arrays and `<Route path>` elements

use tree_sitter::Node;

use crate::tree_sitter::syntax::{find_entry, jsx_attribute_value, string_value};
use crate::tree_sitter::{Range, Symbol};

pub fn extract(root: Node, source: &str) -> Vec<Symbol> {
    let mut routes = Vec::new();

    // Each node carries the pattern of the closest enclosing route
    let mut stack = vec![(root, String::new())];
    while let Some((node, prefix)) = stack.pop() {
        let scope = match route_path(node, source) {
            Some(value) => match string_value(&value, source) {
                Some(path) => {
                    let pattern = join_route(&prefix, &path);
                    routes.push(Symbol::RoutePath {
                        pattern: pattern.clone(),
                        range: Range::from_node(&value),
                    });
                    pattern
                }
                None => prefix,
            },
            None => prefix,
        };

        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push((child, scope.clone()));
            }
        }
    }

    routes
}

/// The `path` value of a route object or `<Route>` element
fn route_path<'tree>(node: Node<'tree>, source: &str) -> Option<Node<'tree>> {
    match node.kind() {
        "object" => find_entry(node, "path", source)?.value,
        "jsx_element" => {
            let open_tag = node.child_by_field_name("open_tag")?;
            jsx_attribute_value(open_tag, "path", source)
        }
        "jsx_self_closing_element" => jsx_attribute_value(node, "path", source),
        _ => None,
    }
}

/// Resolve a child route against its parent; absolute paths stand alone.
pub fn join_route(parent: &str, path: &str) -> String {
    if path.starts_with('/') || parent.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return parent.to_string();
    }
    if parent.ends_with('/') {
        format!("{}{}", parent, path)
    } else {
        format!("{}/{}", parent, path)
    }
}
