//! Tree-sitter integration
//!
//! Native tree-sitter parsing for the JS-family sources of a dva project,
//! plus the symbol types the extractors produce from the trees.

mod parser;
mod symbol;
pub mod syntax;

pub use parser::{Language, TreeSitterError, TreeSitterParser};
pub use symbol::{action_type, ActionKind, Location, Position, Range, Symbol, Usage};
