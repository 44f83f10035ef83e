//! Locale tables: nested message objects flattened into dotted keys

use tree_sitter::Node;

use crate::tree_sitter::syntax::{
    exported_values, node_text, object_entries, property_key, top_level_binding, unwrap_expression,
};
use crate::tree_sitter::{Range, Symbol};

pub fn extract(root: Node, source: &str, separator: &str) -> Vec<Symbol> {
    let Some(table) = exported_values(root, source)
        .into_iter()
        .map(unwrap_expression)
        .find(|value| value.kind() == "object")
    else {
        return Vec::new();
    };

    let flattener = Flattener {
        root,
        source,
        separator,
    };
    flattener.flatten(table)
}

/// Spread chains deeper than this are treated as cycles
const MAX_SPREAD_DEPTH: usize = 8;

enum Pending<'tree> {
    Object {
        node: Node<'tree>,
        prefix: String,
        spread_depth: usize,
    },
    Key {
        key: String,
        node: Node<'tree>,
    },
}

struct Flattener<'tree, 's> {
    root: Node<'tree>,
    source: &'s str,
    separator: &'s str,
}

impl<'tree, 's> Flattener<'tree, 's> {
    /// Keys in source order, spreads before the object's own entries
    fn flatten(&self, table: Node<'tree>) -> Vec<Symbol> {
        let mut keys = Vec::new();
        let mut stack = vec![Pending::Object {
            node: table,
            prefix: String::new(),
            spread_depth: 0,
        }];

        while let Some(pending) = stack.pop() {
            match pending {
                Pending::Key { key, node } => keys.push(Symbol::LocaleKey {
                    key,
                    range: Range::from_node(&node),
                }),
                Pending::Object {
                    node,
                    prefix,
                    spread_depth,
                } => {
                    let mut work = self.expand(node, &prefix, spread_depth);
                    work.reverse();
                    stack.extend(work);
                }
            }
        }

        keys
    }

    fn expand(&self, object: Node<'tree>, prefix: &str, spread_depth: usize) -> Vec<Pending<'tree>> {
        let mut work = Vec::new();

        for i in 0..object.named_child_count() {
            let Some(child) = object.named_child(i) else {
                continue;
            };
            // `...common` where `common` is a local table
            if child.kind() == "spread_element" && spread_depth < MAX_SPREAD_DEPTH {
                if let Some(spread) = self.local_object(child.named_child(0)) {
                    work.push(Pending::Object {
                        node: spread,
                        prefix: prefix.to_string(),
                        spread_depth: spread_depth + 1,
                    });
                }
            }
        }

        for entry in object_entries(object) {
            let Some(name) = property_key(&entry.key_node, self.source) else {
                continue;
            };
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{}{}{}", prefix, self.separator, name)
            };

            match entry.value.map(unwrap_expression) {
                Some(value) if value.kind() == "object" => work.push(Pending::Object {
                    node: value,
                    prefix: key,
                    spread_depth,
                }),
                _ => work.push(Pending::Key {
                    key,
                    node: entry.key_node,
                }),
            }
        }

        work
    }

    fn local_object(&self, node: Option<Node<'tree>>) -> Option<Node<'tree>> {
        let node = unwrap_expression(node?);
        let name = match node.kind() {
            "identifier" => node_text(&node, self.source)?,
            _ => return None,
        };
        top_level_binding(self.root, name, self.source)
            .map(unwrap_expression)
            .filter(|value| value.kind() == "object")
    }
}
