//! Language features for dva conventions
//!
//! Completion, hover, go-to-definition and find-references answered from
//! the model cache, plus document sync for unsaved buffers.

mod service;

pub use service::{CompletionItem, CompletionKind, Hover, LanguageService};
