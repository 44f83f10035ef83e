//! Convention symbols extracted from dva sources
//!
//! Definitions (`Symbol`) and call sites (`Usage`) together with the
//! source positions they were found at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tree_sitter::Node;

/// Position in source code (zero-based line, byte column)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Range in source code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn from_node(node: &Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start: Position::new(start.row as u32, start.column as u32),
            end: Position::new(end.row as u32, end.column as u32),
        }
    }

    /// Inclusive on both ends so a cursor right after a literal still hits it.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A range inside a specific file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub range: Range,
}

impl Location {
    pub fn new(path: PathBuf, range: Range) -> Self {
        Self { path, range }
    }
}

/// Kind of model action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Reducer,
    Effect,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Reducer => write!(f, "reducer"),
            ActionKind::Effect => write!(f, "effect"),
        }
    }
}

/// A named entity defined by a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Symbol {
    /// A model definition; `actions` holds reducer and effect names.
    ModelNamespace {
        name: String,
        actions: BTreeSet<String>,
        state: BTreeSet<String>,
        range: Range,
    },
    EffectName {
        namespace: String,
        name: String,
        range: Range,
    },
    ReducerName {
        namespace: String,
        name: String,
        range: Range,
    },
    /// A route; `pattern` is already joined with its parent routes.
    RoutePath { pattern: String, range: Range },
    LocaleKey { key: String, range: Range },
}

impl Symbol {
    pub fn range(&self) -> Range {
        match self {
            Symbol::ModelNamespace { range, .. }
            | Symbol::EffectName { range, .. }
            | Symbol::ReducerName { range, .. }
            | Symbol::RoutePath { range, .. }
            | Symbol::LocaleKey { range, .. } => *range,
        }
    }

    /// The action this symbol defines, if it is an effect or reducer
    pub fn as_action(&self) -> Option<(&str, &str, ActionKind)> {
        match self {
            Symbol::EffectName {
                namespace, name, ..
            } => Some((namespace.as_str(), name.as_str(), ActionKind::Effect)),
            Symbol::ReducerName {
                namespace, name, ..
            } => Some((namespace.as_str(), name.as_str(), ActionKind::Reducer)),
            _ => None,
        }
    }
}

/// A call site referring to a definition elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Usage {
    /// `dispatch({ type: 'namespace/action' })` and friends
    Action {
        namespace: String,
        action: String,
        range: Range,
    },
    /// `formatMessage({ id })` or `<FormattedMessage id="..." />`
    Message { key: String, range: Range },
}

impl Usage {
    pub fn range(&self) -> Range {
        match self {
            Usage::Action { range, .. } | Usage::Message { range, .. } => *range,
        }
    }
}

/// `namespace/action`, the string form used in `dispatch` calls
pub fn action_type(namespace: &str, action: &str) -> String {
    format!("{}/{}", namespace, action)
}
