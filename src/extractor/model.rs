//! Model definitions: `namespace`, `state`, `reducers` and `effects`

use std::collections::BTreeSet;
use tree_sitter::Node;

use crate::tree_sitter::syntax::{
    exported_values, find_entry, node_text, object_entries, property_key, string_value,
    top_level_binding, unwrap_expression, ObjectEntry,
};
use crate::tree_sitter::{Range, Symbol};

struct ModelSource<'tree, 's> {
    root: Node<'tree>,
    source: &'s str,
}

pub fn extract(root: Node, source: &str) -> Vec<Symbol> {
    let ctx = ModelSource { root, source };

    exported_values(root, source)
        .into_iter()
        .find_map(|value| ctx.model_object(value))
        .map(|object| ctx.symbols(object))
        .unwrap_or_default()
}

impl<'tree, 's> ModelSource<'tree, 's> {
    /// The object literal holding the model, looking through
    /// `modelExtend(base, {...})` style wrappers.
    fn model_object(&self, value: Node<'tree>) -> Option<Node<'tree>> {
        let value = self.resolve(value);
        match value.kind() {
            "object" => self.has_namespace(value).then_some(value),
            "call_expression" => {
                let args = value.child_by_field_name("arguments")?;
                (0..args.named_child_count())
                    .filter_map(|i| args.named_child(i))
                    .map(|arg| self.resolve(arg))
                    .filter(|arg| arg.kind() == "object")
                    .find(|arg| self.has_namespace(*arg))
            }
            _ => None,
        }
    }

    fn has_namespace(&self, object: Node<'tree>) -> bool {
        find_entry(object, "namespace", self.source).is_some()
    }

    /// Unwrap an expression and follow an identifier to its top-level binding
    fn resolve(&self, node: Node<'tree>) -> Node<'tree> {
        let node = unwrap_expression(node);
        if node.kind() != "identifier" {
            return node;
        }
        node_text(&node, self.source)
            .and_then(|name| top_level_binding(self.root, name, self.source))
            .map(unwrap_expression)
            .unwrap_or(node)
    }

    /// Value of an entry; a shorthand `{ reducers }` resolves through its binding
    fn entry_value(&self, entry: &ObjectEntry<'tree>) -> Option<Node<'tree>> {
        match entry.value {
            Some(value) => Some(self.resolve(value)),
            None if entry.node.kind() == "shorthand_property_identifier" => {
                let name = node_text(&entry.key_node, self.source)?;
                top_level_binding(self.root, name, self.source).map(|v| self.resolve(v))
            }
            None => None,
        }
    }

    fn section(&self, model: Node<'tree>, key: &str) -> Vec<(String, Range)> {
        let Some(object) = find_entry(model, key, self.source)
            .and_then(|entry| self.entry_value(&entry))
            .filter(|value| value.kind() == "object")
        else {
            return Vec::new();
        };

        object_entries(object)
            .iter()
            .filter_map(|entry| {
                let name = property_key(&entry.key_node, self.source)?;
                Some((name, Range::from_node(&entry.key_node)))
            })
            .collect()
    }

    fn symbols(&self, model: Node<'tree>) -> Vec<Symbol> {
        let Some(namespace_entry) = find_entry(model, "namespace", self.source) else {
            return Vec::new();
        };
        let Some(namespace_node) = self.entry_value(&namespace_entry) else {
            return Vec::new();
        };
        let Some(namespace) = string_value(&namespace_node, self.source) else {
            return Vec::new();
        };
        if namespace.is_empty() {
            return Vec::new();
        }

        let state: BTreeSet<String> = self
            .section(model, "state")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let reducers = self.section(model, "reducers");
        let effects = self.section(model, "effects");

        let actions: BTreeSet<String> = reducers
            .iter()
            .chain(effects.iter())
            .map(|(name, _)| name.clone())
            .collect();

        let mut symbols = vec![Symbol::ModelNamespace {
            name: namespace.clone(),
            actions,
            state,
            range: Range::from_node(&namespace_node),
        }];
        symbols.extend(reducers.into_iter().map(|(name, range)| Symbol::ReducerName {
            namespace: namespace.clone(),
            name,
            range,
        }));
        symbols.extend(effects.into_iter().map(|(name, range)| Symbol::EffectName {
            namespace: namespace.clone(),
            name,
            range,
        }));
        symbols
    }
}
