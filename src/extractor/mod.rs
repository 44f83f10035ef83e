//! Convention symbol extraction
//!
//! Turns a file's text into the definitions it contributes and the usages it
//! contains. Extraction is best effort: editor content is often incomplete
//! while being typed, so any syntax error yields an empty extraction rather
//! than an error for the caller.

mod locale;
mod model;
mod router;
mod usage;

use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::config::IndexSettings;
use crate::indexer::types::FileKind;
use crate::tree_sitter::{Language, Symbol, TreeSitterError, TreeSitterParser, Usage};

/// Output of extracting one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub symbols: Vec<Symbol>,
    pub usages: Vec<Usage>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.usages.is_empty()
    }
}

/// Reasons a file contributes nothing. Never surfaced to callers of
/// [`SymbolExtractor::extract`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("syntax error")]
    Syntax,
    #[error("no parser for this file type")]
    UnsupportedLanguage,
    #[error(transparent)]
    Parser(#[from] TreeSitterError),
}

/// Extractor for all file kinds; owns the tree-sitter parsers
pub struct SymbolExtractor {
    parser: TreeSitterParser,
    locale_separator: String,
}

impl SymbolExtractor {
    pub fn new(settings: &IndexSettings) -> Result<Self, TreeSitterError> {
        Ok(Self {
            parser: TreeSitterParser::new()?,
            locale_separator: settings.locale_separator.clone(),
        })
    }

    /// Extract symbols and usages; failures degrade to an empty extraction.
    pub fn extract(&mut self, path: &Path, content: &str, kind: FileKind) -> Extraction {
        match self.try_extract(path, content, kind) {
            Ok(extraction) => extraction,
            Err(e) => {
                debug!("No symbols for {:?} ({}): {}", path, kind, e);
                Extraction::default()
            }
        }
    }

    pub fn try_extract(
        &mut self,
        path: &Path,
        content: &str,
        kind: FileKind,
    ) -> Result<Extraction, ExtractError> {
        if !kind.is_indexed() {
            return Ok(Extraction::default());
        }

        let language = Language::from_path(path).ok_or(ExtractError::UnsupportedLanguage)?;
        let tree = self.parser.parse(content, language)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Syntax);
        }

        let symbols = match kind {
            FileKind::Model => model::extract(root, content),
            FileKind::Router => router::extract(root, content),
            FileKind::Locale => locale::extract(root, content, &self.locale_separator),
            FileKind::Source | FileKind::Irrelevant => Vec::new(),
        };

        let own_namespace = symbols.iter().find_map(|symbol| match symbol {
            Symbol::ModelNamespace { name, .. } => Some(name.as_str()),
            _ => None,
        });
        let usages = usage::extract(root, content, own_namespace);

        Ok(Extraction { symbols, usages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SymbolExtractor {
        SymbolExtractor::new(&IndexSettings::default()).unwrap()
    }

    #[test]
    fn test_malformed_model_yields_nothing() {
        let mut extractor = extractor();
        let code = "export default {\n  namespace: 'user,\n  effects: { *fetchUser() {} },\n};";

        let extraction = extractor.extract(Path::new("src/models/user.js"), code, FileKind::Model);
        assert!(extraction.is_empty());
        assert!(matches!(
            extractor.try_extract(Path::new("src/models/user.js"), code, FileKind::Model),
            Err(ExtractError::Syntax)
        ));
    }

    #[test]
    fn test_irrelevant_files_are_not_parsed() {
        let mut extractor = extractor();
        let extraction = extractor.extract(Path::new("README.md"), "# hi", FileKind::Irrelevant);
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let mut extractor = extractor();
        assert!(matches!(
            extractor.try_extract(Path::new("src/App.vue"), "<template/>", FileKind::Source),
            Err(ExtractError::UnsupportedLanguage)
        ));
    }

    #[test]
    fn test_model_usages_resolve_own_namespace() {
        let mut extractor = extractor();
        let code = r#"
export default {
  namespace: 'user',
  effects: {
    *fetchUser(_, { put }) {
      yield put({ type: 'save' });
      yield put({ type: 'global/notify' });
    },
  },
  reducers: { save(state) { return state; } },
};
"#;
        let extraction = extractor.extract(Path::new("src/models/user.js"), code, FileKind::Model);

        let actions: Vec<(String, String)> = extraction
            .usages
            .iter()
            .filter_map(|usage| match usage {
                Usage::Action {
                    namespace, action, ..
                } => Some((namespace.clone(), action.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                ("user".to_string(), "save".to_string()),
                ("global".to_string(), "notify".to_string()),
            ]
        );
    }

    #[test]
    fn test_source_files_only_contribute_usages() {
        let mut extractor = extractor();
        let code = "export default { namespace: 'x', state: {} };\ndispatch({ type: 'user/fetchUser' });";
        let extraction = extractor.extract(Path::new("src/pages/index.js"), code, FileKind::Source);

        assert!(extraction.symbols.is_empty());
        assert_eq!(extraction.usages.len(), 1);
    }

    #[test]
    fn test_deeply_nested_source() {
        let mut extractor = extractor();
        let terms = vec!["'a'"; 50_000].join(" + ");
        let code = format!("export const s = {};\ndispatch({{ type: 'user/fetchUser' }});", terms);
        let extraction = extractor.extract(Path::new("src/pages/generated.js"), &code, FileKind::Source);

        assert_eq!(extraction.usages.len(), 1);
    }
}
