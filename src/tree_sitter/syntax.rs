//! Syntax helpers over tree-sitter JS/TS trees
//!
//! Small accessors for the handful of shapes dva conventions use: object
//! literals, string literals, default exports and top-level bindings.

use tree_sitter::Node;

/// One entry of an object literal
#[derive(Debug, Clone, Copy)]
pub struct ObjectEntry<'tree> {
    /// Node carrying the key (property name, string key or method name)
    pub key_node: Node<'tree>,
    /// Value of a `key: value` pair; methods and shorthands have none
    pub value: Option<Node<'tree>>,
    /// The whole entry (pair, method or shorthand)
    pub node: Node<'tree>,
}

pub fn node_text<'s>(node: &Node, source: &'s str) -> Option<&'s str> {
    node.utf8_text(source.as_bytes()).ok()
}

/// Value of a plain string literal, without quotes.
///
/// Template strings count only when they have no substitutions.
pub fn string_value(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => {
            let text = strip_quotes(node_text(node, source)?);
            // JSX attribute strings have no escapes: `path="C:\dir"` is literal
            if node.parent().is_some_and(|parent| parent.kind() == "jsx_attribute") {
                Some(text.to_string())
            } else {
                Some(unescape(text))
            }
        }
        "template_string" => {
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i) {
                    if child.kind() == "template_substitution" {
                        return None;
                    }
                }
            }
            let text = node_text(node, source)?;
            Some(unescape(strip_quotes(text)))
        }
        _ => None,
    }
}

fn strip_quotes(text: &str) -> &str {
    match (text.chars().next(), text.chars().last()) {
        (Some(open), Some(close))
            if text.len() >= 2 && open == close && matches!(open, '\'' | '"' | '`') =>
        {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

/// Decode backslash escapes of a string literal body. Unknown escapes stand
/// for the escaped character and line continuations vanish.
fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => push_code_point(&mut out, &mut chars, Some(2)),
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                push_code_point(&mut out, &mut chars, None);
            }
            Some('u') => push_code_point(&mut out, &mut chars, Some(4)),
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `\xHH`, `\uHHHH` or `\u{H..}` once the prefix is consumed. Malformed or
/// lone-surrogate escapes become U+FFFD.
fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars>,
    width: Option<usize>,
) {
    let digits: String = match width {
        Some(width) => {
            let ahead: String = chars.clone().take(width).collect();
            if ahead.len() < width || !ahead.chars().all(|c| c.is_ascii_hexdigit()) {
                out.push(char::REPLACEMENT_CHARACTER);
                return;
            }
            chars.nth(width - 1);
            ahead
        }
        None => chars.by_ref().take_while(|c| *c != '}').collect(),
    };

    let decoded = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32);
    out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
}

/// Name of an object key node (`foo`, `'foo'`, `1`, `['foo']`)
pub fn property_key(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "property_identifier"
        | "identifier"
        | "shorthand_property_identifier"
        | "private_property_identifier"
        | "number" => node_text(node, source).map(str::to_string),
        "string" | "template_string" => string_value(node, source),
        "computed_property_name" => {
            let inner = node.named_child(0)?;
            string_value(&inner, source)
        }
        _ => None,
    }
}

/// Entries of an object literal, in source order
pub fn object_entries<'tree>(object: Node<'tree>) -> Vec<ObjectEntry<'tree>> {
    let mut entries = Vec::new();
    if object.kind() != "object" {
        return entries;
    }

    for i in 0..object.named_child_count() {
        let Some(child) = object.named_child(i) else {
            continue;
        };
        match child.kind() {
            "pair" => {
                if let Some(key_node) = child.child_by_field_name("key") {
                    entries.push(ObjectEntry {
                        key_node,
                        value: child.child_by_field_name("value"),
                        node: child,
                    });
                }
            }
            "method_definition" => {
                if let Some(key_node) = child.child_by_field_name("name") {
                    entries.push(ObjectEntry {
                        key_node,
                        value: None,
                        node: child,
                    });
                }
            }
            "shorthand_property_identifier" => entries.push(ObjectEntry {
                key_node: child,
                value: None,
                node: child,
            }),
            _ => {}
        }
    }

    entries
}

/// Find the entry for `key` in an object literal
pub fn find_entry<'tree>(object: Node<'tree>, key: &str, source: &str) -> Option<ObjectEntry<'tree>> {
    object_entries(object)
        .into_iter()
        .find(|entry| property_key(&entry.key_node, source).as_deref() == Some(key))
}

/// Strip parentheses and TypeScript-only wrappers around an expression
pub fn unwrap_expression(node: Node) -> Node {
    let mut current = node;
    loop {
        match current.kind() {
            "parenthesized_expression"
            | "as_expression"
            | "satisfies_expression"
            | "non_null_expression"
            | "type_assertion" => {
                // The wrapped expression is the first named child for every
                // wrapper except `<T>expr`, where the type comes first.
                let inner = if current.kind() == "type_assertion" {
                    current.named_child(current.named_child_count().saturating_sub(1))
                } else {
                    current.named_child(0)
                };
                match inner {
                    Some(inner) => current = inner,
                    None => return current,
                }
            }
            _ => return current,
        }
    }
}

/// Expressions a module exports by default.
///
/// Covers `export default <expr>` and `module.exports = <expr>`. Identifiers
/// are resolved to their top-level binding when one exists.
pub fn exported_values<'tree>(root: Node<'tree>, source: &str) -> Vec<Node<'tree>> {
    let mut values = Vec::new();

    for i in 0..root.named_child_count() {
        let Some(statement) = root.named_child(i) else {
            continue;
        };
        let value = match statement.kind() {
            "export_statement" => default_export_value(statement),
            "expression_statement" => statement
                .named_child(0)
                .and_then(|expr| module_exports_value(expr, source)),
            _ => None,
        };

        if let Some(value) = value {
            let value = unwrap_expression(value);
            if value.kind() == "identifier" {
                let resolved = node_text(&value, source)
                    .and_then(|name| top_level_binding(root, name, source));
                values.push(resolved.map(unwrap_expression).unwrap_or(value));
            } else {
                values.push(value);
            }
        }
    }

    values
}

fn default_export_value(statement: Node) -> Option<Node> {
    let is_default = (0..statement.child_count())
        .filter_map(|i| statement.child(i))
        .any(|child| child.kind() == "default");
    if !is_default {
        return None;
    }
    statement
        .child_by_field_name("value")
        .or_else(|| statement.child_by_field_name("declaration"))
}

fn module_exports_value<'tree>(expr: Node<'tree>, source: &str) -> Option<Node<'tree>> {
    if expr.kind() != "assignment_expression" {
        return None;
    }
    let left = expr.child_by_field_name("left")?;
    let target = node_text(&left, source)?;
    if target == "module.exports" || target == "exports.default" {
        expr.child_by_field_name("right")
    } else {
        None
    }
}

/// Initializer of a top-level `const`/`let`/`var` binding named `name`
pub fn top_level_binding<'tree>(root: Node<'tree>, name: &str, source: &str) -> Option<Node<'tree>> {
    for i in 0..root.named_child_count() {
        let Some(statement) = root.named_child(i) else {
            continue;
        };
        let declaration = match statement.kind() {
            "lexical_declaration" | "variable_declaration" => statement,
            "export_statement" => match statement.child_by_field_name("declaration") {
                Some(decl)
                    if matches!(decl.kind(), "lexical_declaration" | "variable_declaration") =>
                {
                    decl
                }
                _ => continue,
            },
            _ => continue,
        };

        for j in 0..declaration.named_child_count() {
            let Some(declarator) = declaration.named_child(j) else {
                continue;
            };
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let matches_name = declarator
                .child_by_field_name("name")
                .and_then(|n| node_text(&n, source))
                .is_some_and(|text| text == name);
            if matches_name {
                return declarator.child_by_field_name("value");
            }
        }
    }
    None
}

/// Last identifier of a callee (`dispatch`, `props.dispatch`, `put.resolve`)
pub fn callee_name<'s>(callee: &Node, source: &'s str) -> Option<&'s str> {
    match callee.kind() {
        "identifier" => node_text(callee, source),
        "member_expression" => {
            let property = callee.child_by_field_name("property")?;
            node_text(&property, source)
        }
        _ => None,
    }
}

/// Name of a JSX opening or self-closing element (`Route`, `Intl.FormattedMessage`)
pub fn jsx_element_name<'s>(element: &Node, source: &'s str) -> Option<&'s str> {
    let name = element.child_by_field_name("name")?;
    node_text(&name, source)
}

/// Literal node of a JSX attribute: `path="/users"` or `path={'/users'}`
pub fn jsx_attribute_value<'tree>(
    element: Node<'tree>,
    attribute: &str,
    source: &str,
) -> Option<Node<'tree>> {
    for i in 0..element.named_child_count() {
        let Some(child) = element.named_child(i) else {
            continue;
        };
        if child.kind() != "jsx_attribute" {
            continue;
        }
        let name_matches = child
            .named_child(0)
            .and_then(|name| node_text(&name, source))
            .is_some_and(|name| name == attribute);
        if !name_matches {
            continue;
        }

        let value = child.named_child(1)?;
        return match value.kind() {
            "jsx_expression" => value.named_child(0).map(unwrap_expression),
            _ => Some(value),
        };
    }
    None
}
