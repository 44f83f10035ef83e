//! Tree-sitter parser management
//!
//! Manages parsers for the JS-family languages dva projects are written in.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tree_sitter::{Parser, Tree};

/// Source languages the index understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Jsx,
    ];

    /// Detect language from file path extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "jsx" => Some(Language::Jsx),
            _ => None,
        }
    }
}

/// Error type for tree-sitter operations
#[derive(Debug, Error)]
pub enum TreeSitterError {
    #[error("Unsupported language")]
    UnsupportedLanguage,
    #[error("Failed to parse code")]
    ParseFailed,
    #[error("Failed to initialize language: {0}")]
    LanguageInitFailed(String),
}

/// One reusable parser per language
pub struct TreeSitterParser {
    parsers: HashMap<Language, Parser>,
}

impl TreeSitterParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let parsers = Language::ALL
            .iter()
            .map(|language| language_parser(*language).map(|parser| (*language, parser)))
            .collect::<Result<HashMap<_, _>, TreeSitterError>>()?;
        Ok(Self { parsers })
    }

    /// Full parse of `code`; trees are not kept between calls.
    pub fn parse(&mut self, code: &str, language: Language) -> Result<Tree, TreeSitterError> {
        self.parsers
            .get_mut(&language)
            .ok_or(TreeSitterError::UnsupportedLanguage)?
            .parse(code, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    pub fn supports_language(&self, language: Language) -> bool {
        self.parsers.contains_key(&language)
    }
}

fn language_parser(language: Language) -> Result<Parser, TreeSitterError> {
    let grammar: tree_sitter::Language = match language {
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        // tree-sitter-javascript parses JSX natively
        Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE.into(),
    };
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| TreeSitterError::LanguageInitFailed(e.to_string()))?;
    Ok(parser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        let cases = [
            ("src/models/user.ts", Some(Language::TypeScript)),
            ("typings.d.mts", Some(Language::TypeScript)),
            ("src/pages/index.tsx", Some(Language::Tsx)),
            ("src/router.js", Some(Language::JavaScript)),
            ("config/config.CJS", Some(Language::JavaScript)),
            ("src/components/Header.jsx", Some(Language::Jsx)),
            ("src/global.less", None),
            ("package.json", None),
            ("src/locales", None),
        ];
        for (path, expected) in cases {
            assert_eq!(Language::from_path(Path::new(path)), expected, "{path}");
        }
    }

    #[test]
    fn test_every_language_has_a_parser() {
        let parser = TreeSitterParser::new().unwrap();
        assert!(Language::ALL.iter().all(|l| parser.supports_language(*l)));
    }

    #[test]
    fn test_parse_typescript_model() {
        let mut parser = TreeSitterParser::new().unwrap();
        let code = "export default { namespace: 'user' } as Model;";
        let tree = parser.parse(code, Language::TypeScript).unwrap();

        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn test_parse_jsx_in_plain_javascript() {
        let mut parser = TreeSitterParser::new().unwrap();
        let code = "const Ok = () => <FormattedMessage id=\"button.ok\" />;";

        for language in [Language::JavaScript, Language::Jsx] {
            let tree = parser.parse(code, language).unwrap();
            assert!(!tree.root_node().has_error());
        }
    }

    #[test]
    fn test_unterminated_string_reports_error() {
        let mut parser = TreeSitterParser::new().unwrap();
        let code = "export default { namespace: 'user }";
        let tree = parser.parse(code, Language::JavaScript).unwrap();

        assert!(tree.root_node().has_error());
    }
}
