//! Queries over the symbol store
//!
//! Structured lookups used by the cache and the language service, plus a
//! ranked name search across every definition kind.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use super::store::SymbolStore;
use crate::indexer::types::FileKind;
use crate::tree_sitter::{action_type, ActionKind, Location, Position, Symbol, Usage};

/// Everything known about one namespace, merged across files
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    /// Reducers and effects
    pub actions: BTreeSet<String>,
    pub effects: BTreeSet<String>,
    pub reducers: BTreeSet<String>,
    pub state: BTreeSet<String>,
    /// Where the namespace string is declared, one per defining file
    pub definitions: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDefinition {
    pub namespace: String,
    pub action: String,
    pub kind: ActionKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub pattern: String,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub models: usize,
    pub routers: usize,
    pub locales: usize,
    pub sources: usize,
    pub namespaces: usize,
    pub actions: usize,
    pub routes: usize,
    pub locale_keys: usize,
    pub usages: usize,
}

/// Serializable view of the whole index
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSnapshot {
    pub stats: IndexStats,
    pub namespaces: Vec<NamespaceInfo>,
    pub routes: Vec<RouteEntry>,
    pub locale_keys: Vec<String>,
}

/// Kind of definition a search result points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Namespace,
    Action,
    Route,
    LocaleKey,
}

/// Structured search query
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Text query (name, fuzzy match)
    pub text: String,
    /// Filter by definition kinds
    pub kinds: Option<Vec<DefinitionKind>>,
    /// Maximum results to return
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Create a simple text search query
    pub fn text(query: &str) -> Self {
        Self {
            text: query.to_string(),
            limit: Some(50),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<DefinitionKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }
}

/// Search result with relevance score
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// `namespace`, `namespace/action`, route pattern or locale key
    pub name: String,
    pub kind: DefinitionKind,
    pub location: Location,
    /// Relevance score (0.0 to 1.0)
    pub score: f32,
}

impl SymbolStore {
    pub fn query_namespace(&self, name: &str) -> Option<NamespaceInfo> {
        let paths = self.postings().namespaces.get(name)?;
        let mut info = NamespaceInfo {
            name: name.to_string(),
            ..Default::default()
        };

        for record in paths.iter().filter_map(|path| self.get(path)) {
            for symbol in &record.symbols {
                match symbol {
                    Symbol::ModelNamespace {
                        name: ns,
                        actions,
                        state,
                        range,
                    } if ns == name => {
                        info.actions.extend(actions.iter().cloned());
                        info.state.extend(state.iter().cloned());
                        info.definitions
                            .push(Location::new(record.path.clone(), *range));
                    }
                    Symbol::EffectName {
                        namespace, name: action, ..
                    } if namespace == name => {
                        info.effects.insert(action.clone());
                    }
                    Symbol::ReducerName {
                        namespace, name: action, ..
                    } if namespace == name => {
                        info.reducers.insert(action.clone());
                    }
                    _ => {}
                }
            }
        }

        Some(info)
    }

    pub fn query_action_definitions(&self, namespace: &str, action: &str) -> Vec<ActionDefinition> {
        let Some(paths) = self.postings().namespaces.get(namespace) else {
            return Vec::new();
        };

        paths
            .iter()
            .filter_map(|path| self.get(path))
            .flat_map(|record| {
                record.symbols.iter().filter_map(move |symbol| {
                    let (ns, name, kind) = symbol.as_action()?;
                    (ns == namespace && name == action).then(|| ActionDefinition {
                        namespace: ns.to_string(),
                        action: name.to_string(),
                        kind,
                        location: Location::new(record.path.clone(), symbol.range()),
                    })
                })
            })
            .collect()
    }

    pub fn all_namespaces(&self) -> Vec<String> {
        self.postings().namespaces.keys().cloned().collect()
    }

    /// Every `namespace/action` pair, sorted
    pub fn all_action_types(&self) -> Vec<String> {
        let mut types: BTreeSet<String> = BTreeSet::new();
        for namespace in self.postings().namespaces.keys() {
            if let Some(info) = self.query_namespace(namespace) {
                types.extend(info.actions.iter().map(|action| action_type(namespace, action)));
            }
        }
        types.into_iter().collect()
    }

    pub fn query_locale_key(&self, key: &str) -> Vec<Location> {
        let Some(paths) = self.postings().locale_keys.get(key) else {
            return Vec::new();
        };

        paths
            .iter()
            .filter_map(|path| self.get(path))
            .flat_map(|record| {
                record.symbols.iter().filter_map(move |symbol| match symbol {
                    Symbol::LocaleKey { key: k, range } if k == key => {
                        Some(Location::new(record.path.clone(), *range))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    pub fn query_all_locale_keys(&self) -> Vec<String> {
        self.postings().locale_keys.keys().cloned().collect()
    }

    /// The route whose path literal covers `position`
    pub fn query_route_at(&self, path: &Path, position: Position) -> Option<RouteEntry> {
        let record = self.get(path)?;
        record.symbols.iter().find_map(|symbol| match symbol {
            Symbol::RoutePath { pattern, range } if range.contains(position) => Some(RouteEntry {
                pattern: pattern.clone(),
                location: Location::new(record.path.clone(), *range),
            }),
            _ => None,
        })
    }

    /// All routes ordered by pattern, then location
    pub fn query_all_routes(&self) -> Vec<RouteEntry> {
        let mut routes: Vec<RouteEntry> = self
            .postings()
            .routes
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|path| self.get(path))
            .flat_map(|record| {
                record.symbols.iter().filter_map(move |symbol| match symbol {
                    Symbol::RoutePath { pattern, range } => Some(RouteEntry {
                        pattern: pattern.clone(),
                        location: Location::new(record.path.clone(), *range),
                    }),
                    _ => None,
                })
            })
            .collect();
        routes.sort_by(|a, b| a.pattern.cmp(&b.pattern).then_with(|| a.location.cmp(&b.location)));
        routes
    }

    /// Every dispatch of `namespace/action`
    pub fn find_references(&self, namespace: &str, action: &str) -> Vec<Location> {
        let Some(paths) = self.postings().action_refs.get(&action_type(namespace, action)) else {
            return Vec::new();
        };

        paths
            .iter()
            .filter_map(|path| self.get(path))
            .flat_map(|record| {
                record.usages.iter().filter_map(move |usage| match usage {
                    Usage::Action {
                        namespace: ns,
                        action: a,
                        range,
                    } if ns == namespace && a == action => {
                        Some(Location::new(record.path.clone(), *range))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    pub fn find_locale_references(&self, key: &str) -> Vec<Location> {
        let Some(paths) = self.postings().message_refs.get(key) else {
            return Vec::new();
        };

        paths
            .iter()
            .filter_map(|path| self.get(path))
            .flat_map(|record| {
                record.usages.iter().filter_map(move |usage| match usage {
                    Usage::Message { key: k, range } if k == key => {
                        Some(Location::new(record.path.clone(), *range))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    pub fn usage_at(&self, path: &Path, position: Position) -> Option<Usage> {
        self.get(path)?
            .usages
            .iter()
            .find(|usage| usage.range().contains(position))
            .cloned()
    }

    pub fn symbol_at(&self, path: &Path, position: Position) -> Option<Symbol> {
        self.get(path)?
            .symbols
            .iter()
            .find(|symbol| symbol.range().contains(position))
            .cloned()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            files: self.file_count(),
            namespaces: self.postings().namespaces.len(),
            routes: self.postings().routes.len(),
            locale_keys: self.postings().locale_keys.len(),
            ..Default::default()
        };

        for record in self.records() {
            match record.kind {
                FileKind::Model => stats.models += 1,
                FileKind::Router => stats.routers += 1,
                FileKind::Locale => stats.locales += 1,
                FileKind::Source | FileKind::Irrelevant => stats.sources += 1,
            }
            stats.usages += record.usages.len();
        }
        stats.actions = self.all_action_types().len();
        stats
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            stats: self.stats(),
            namespaces: self
                .all_namespaces()
                .iter()
                .filter_map(|name| self.query_namespace(name))
                .collect(),
            routes: self.query_all_routes(),
            locale_keys: self.query_all_locale_keys(),
        }
    }

    /// Ranked search across namespaces, actions, routes and locale keys
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let limit = query.limit.unwrap_or(50);
        let wanted = |kind: DefinitionKind| {
            query
                .kinds
                .as_ref()
                .map_or(true, |kinds| kinds.contains(&kind))
        };

        let mut results = Vec::new();
        for record in self.records() {
            for symbol in &record.symbols {
                let (name, kind) = match symbol {
                    Symbol::ModelNamespace { name, .. } => (name.clone(), DefinitionKind::Namespace),
                    Symbol::EffectName {
                        namespace, name, ..
                    }
                    | Symbol::ReducerName {
                        namespace, name, ..
                    } => (action_type(namespace, name), DefinitionKind::Action),
                    Symbol::RoutePath { pattern, .. } => (pattern.clone(), DefinitionKind::Route),
                    Symbol::LocaleKey { key, .. } => (key.clone(), DefinitionKind::LocaleKey),
                };
                if !wanted(kind) {
                    continue;
                }
                let score = calculate_relevance(&name, &query.text);
                if score > 0.0 {
                    results.push(SearchResult {
                        name,
                        kind,
                        location: Location::new(record.path.clone(), symbol.range()),
                        score,
                    });
                }
            }
        }

        // Sort by score, then name for a stable order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        results.truncate(limit);
        results
    }
}

/// Calculate relevance score between query and symbol name
fn calculate_relevance(name: &str, query: &str) -> f32 {
    let name_lower = name.to_lowercase();
    let query_lower = query.to_lowercase();

    if query_lower.is_empty() {
        return 0.5;
    }

    // Exact match
    if name_lower == query_lower {
        return 1.0;
    }

    // Prefix match
    if name_lower.starts_with(&query_lower) {
        return 0.9;
    }

    // Contains match, earlier is better
    if let Some(pos) = name_lower.find(&query_lower) {
        let len = name_lower.len() as f32;
        return 0.7 - (pos as f32 / len) * 0.3;
    }

    // Fuzzy match using character overlap
    let query_chars: std::collections::HashSet<char> = query_lower.chars().collect();
    let name_chars: std::collections::HashSet<char> = name_lower.chars().collect();
    let intersection = query_chars.intersection(&name_chars).count() as f32;
    let union = query_chars.union(&name_chars).count() as f32;

    if union > 0.0 && intersection / union >= 0.5 {
        0.5 * (intersection / union)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extraction;
    use crate::indexer::types::FileRecord;
    use crate::tree_sitter::Range;
    use std::path::PathBuf;

    fn range(line: u32, start: u32, end: u32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    fn user_model(path: &str, actions: &[(&str, ActionKind)]) -> FileRecord {
        let mut symbols = vec![Symbol::ModelNamespace {
            name: "user".to_string(),
            actions: actions.iter().map(|(a, _)| a.to_string()).collect(),
            state: BTreeSet::from(["list".to_string()]),
            range: range(1, 13, 19),
        }];
        for (i, (action, kind)) in actions.iter().enumerate() {
            let r = range(3 + i as u32, 4, 4 + action.len() as u32);
            symbols.push(match kind {
                ActionKind::Effect => Symbol::EffectName {
                    namespace: "user".to_string(),
                    name: action.to_string(),
                    range: r,
                },
                ActionKind::Reducer => Symbol::ReducerName {
                    namespace: "user".to_string(),
                    name: action.to_string(),
                    range: r,
                },
            });
        }
        FileRecord::new(
            PathBuf::from(path),
            FileKind::Model,
            path.to_string(),
            Extraction {
                symbols,
                usages: vec![],
            },
        )
    }

    fn page(path: &str, usages: Vec<Usage>) -> FileRecord {
        FileRecord::new(
            PathBuf::from(path),
            FileKind::Source,
            path.to_string(),
            Extraction {
                symbols: vec![],
                usages,
            },
        )
    }

    #[test]
    fn test_relevance_exact_match() {
        assert_eq!(calculate_relevance("user/fetchUser", "user/fetchUser"), 1.0);
    }

    #[test]
    fn test_relevance_prefix_match() {
        let score = calculate_relevance("user/fetchUser", "user");
        assert!(score > 0.8 && score <= 0.9);
    }

    #[test]
    fn test_relevance_contains_match() {
        let score = calculate_relevance("user/fetchUser", "fetch");
        assert!(score > 0.4 && score < 0.7);
    }

    #[test]
    fn test_namespace_merges_files() {
        let mut store = SymbolStore::new();
        store.replace_file(user_model("/w/models/user.js", &[("fetchUser", ActionKind::Effect)]));
        store.replace_file(user_model("/w/pages/user/model.js", &[("save", ActionKind::Reducer)]));

        let info = store.query_namespace("user").unwrap();
        assert_eq!(
            info.actions,
            BTreeSet::from(["fetchUser".to_string(), "save".to_string()])
        );
        assert_eq!(info.effects, BTreeSet::from(["fetchUser".to_string()]));
        assert_eq!(info.reducers, BTreeSet::from(["save".to_string()]));
        assert_eq!(info.definitions.len(), 2);
        assert!(store.query_namespace("missing").is_none());
        assert_eq!(store.all_action_types(), vec!["user/fetchUser", "user/save"]);
    }

    #[test]
    fn test_action_definitions_and_references() {
        let mut store = SymbolStore::new();
        store.replace_file(user_model(
            "/w/models/user.js",
            &[("fetchUser", ActionKind::Effect), ("save", ActionKind::Reducer)],
        ));
        store.replace_file(page(
            "/w/pages/index.js",
            vec![
                Usage::Action {
                    namespace: "user".to_string(),
                    action: "fetchUser".to_string(),
                    range: range(5, 17, 33),
                },
                Usage::Message {
                    key: "app.title".to_string(),
                    range: range(7, 10, 21),
                },
            ],
        ));

        let definitions = store.query_action_definitions("user", "fetchUser");
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].kind, ActionKind::Effect);
        assert_eq!(definitions[0].location.range, range(3, 4, 13));

        let references = store.find_references("user", "fetchUser");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].path, PathBuf::from("/w/pages/index.js"));
        assert!(store.find_references("user", "save").is_empty());

        assert_eq!(store.find_locale_references("app.title").len(), 1);
        assert!(matches!(
            store.usage_at(Path::new("/w/pages/index.js"), Position::new(5, 20)),
            Some(Usage::Action { .. })
        ));
        assert!(store
            .usage_at(Path::new("/w/pages/index.js"), Position::new(6, 0))
            .is_none());
    }

    #[test]
    fn test_routes_and_locale_keys() {
        let mut store = SymbolStore::new();
        let routes = Extraction {
            symbols: vec![
                Symbol::RoutePath {
                    pattern: "/users".to_string(),
                    range: range(2, 10, 18),
                },
                Symbol::RoutePath {
                    pattern: "/".to_string(),
                    range: range(1, 10, 13),
                },
            ],
            usages: vec![],
        };
        store.replace_file(FileRecord::new(
            PathBuf::from("/w/config/routes.ts"),
            FileKind::Router,
            "h".to_string(),
            routes,
        ));
        let locale = Extraction {
            symbols: vec![Symbol::LocaleKey {
                key: "menu.home".to_string(),
                range: range(1, 2, 13),
            }],
            usages: vec![],
        };
        store.replace_file(FileRecord::new(
            PathBuf::from("/w/src/locales/en-US.js"),
            FileKind::Locale,
            "h".to_string(),
            locale,
        ));

        let all: Vec<String> = store.query_all_routes().into_iter().map(|r| r.pattern).collect();
        assert_eq!(all, vec!["/", "/users"]);
        let at = store
            .query_route_at(Path::new("/w/config/routes.ts"), Position::new(2, 12))
            .unwrap();
        assert_eq!(at.pattern, "/users");
        assert_eq!(store.query_all_locale_keys(), vec!["menu.home"]);
        assert_eq!(store.query_locale_key("menu.home").len(), 1);

        let stats = store.stats();
        assert_eq!((stats.files, stats.routers, stats.locales), (2, 1, 1));
        assert_eq!((stats.routes, stats.locale_keys), (2, 1));
    }

    #[test]
    fn test_search_ranks_and_filters() {
        let mut store = SymbolStore::new();
        store.replace_file(user_model(
            "/w/models/user.js",
            &[("fetchUser", ActionKind::Effect), ("save", ActionKind::Reducer)],
        ));

        let results = store.search(&SearchQuery::text("user"));
        assert_eq!(results[0].name, "user");
        assert_eq!(results[0].kind, DefinitionKind::Namespace);

        let actions = store.search(&SearchQuery::text("fetch").with_kinds(vec![DefinitionKind::Action]));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, "user/fetchUser");
    }
}
