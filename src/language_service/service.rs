//! Language service over the model cache
//!
//! Answers completion, hover, definition and reference requests for dva
//! conventions. Results are plain data; presenting them is up to the host.

use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::indexer::cache::{ModelInfoCache, ReloadOutcome};
use crate::tree_sitter::{action_type, ActionKind, Location, Position, Range, Symbol, Usage};

lazy_static::lazy_static! {
    /// Cursor inside the string of `type: '...`
    static ref ACTION_CONTEXT: Regex = Regex::new(r#"\btype\s*:\s*['"`]([^'"`]*)$"#).unwrap();
    /// Cursor inside `id: '...`, `id="...` or `id={'...`
    static ref MESSAGE_CONTEXT: Regex =
        Regex::new(r#"\bid\s*[:=]\s*\{?\s*['"`]([^'"`]*)$"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Action,
    LocaleKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hover {
    /// Markdown
    pub contents: String,
    pub range: Range,
}

/// Feature provider for one workspace
#[derive(Clone)]
pub struct LanguageService {
    cache: ModelInfoCache,
}

impl LanguageService {
    pub fn new(cache: ModelInfoCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ModelInfoCache {
        &self.cache
    }

    // =========================================================================
    // Features
    // =========================================================================

    /// Completions for the text left of the cursor on the current line
    pub fn completions(&self, line_prefix: &str) -> Vec<CompletionItem> {
        if let Some(typed) = ACTION_CONTEXT.captures(line_prefix).and_then(|c| c.get(1)) {
            return self.action_completions(typed.as_str());
        }
        if let Some(typed) = MESSAGE_CONTEXT.captures(line_prefix).and_then(|c| c.get(1)) {
            return self.locale_completions(typed.as_str());
        }
        Vec::new()
    }

    fn action_completions(&self, typed: &str) -> Vec<CompletionItem> {
        let mut items = Vec::new();
        for namespace in self.cache.all_namespaces() {
            let Some(info) = self.cache.query_namespace(&namespace) else {
                continue;
            };
            for action in &info.actions {
                let label = action_type(&namespace, action);
                if !label.starts_with(typed) {
                    continue;
                }
                let kind = if info.effects.contains(action) {
                    ActionKind::Effect
                } else {
                    ActionKind::Reducer
                };
                items.push(CompletionItem {
                    label,
                    kind: CompletionKind::Action,
                    detail: Some(kind.to_string()),
                });
            }
        }
        items
    }

    fn locale_completions(&self, typed: &str) -> Vec<CompletionItem> {
        self.cache
            .query_all_locale_keys()
            .into_iter()
            .filter(|key| key.starts_with(typed))
            .map(|key| {
                let detail = self
                    .cache
                    .query_locale_key(&key)
                    .first()
                    .and_then(|location| location.path.file_name())
                    .map(|name| name.to_string_lossy().to_string());
                CompletionItem {
                    label: key,
                    kind: CompletionKind::LocaleKey,
                    detail,
                }
            })
            .collect()
    }

    pub fn hover(&self, path: &Path, position: Position) -> Option<Hover> {
        if let Some(usage) = self.cache.usage_at(path, position) {
            let contents = match &usage {
                Usage::Action {
                    namespace, action, ..
                } => {
                    let definitions = self.cache.query_action_definitions(namespace, action);
                    let mut text = format!("**{}**", action_type(namespace, action));
                    match definitions.first() {
                        Some(definition) => {
                            text.push_str(&format!(
                                " ({} of `{}`)\n\n{}",
                                definition.kind,
                                namespace,
                                describe(&definition.location)
                            ));
                        }
                        None => text.push_str("\n\nNo such action is defined"),
                    }
                    text
                }
                Usage::Message { key, .. } => {
                    let locations = self.cache.query_locale_key(key);
                    if locations.is_empty() {
                        format!("**{}**\n\nMissing from every locale", key)
                    } else {
                        let defined: Vec<String> = locations.iter().map(describe).collect();
                        format!("**{}**\n\n{}", key, defined.join("\n"))
                    }
                }
            };
            return Some(Hover {
                contents,
                range: usage.range(),
            });
        }

        let symbol = self.cache.symbol_at(path, position)?;
        let contents = match &symbol {
            Symbol::RoutePath { pattern, .. } => format!("Route `{}`", pattern),
            Symbol::EffectName {
                namespace, name, ..
            }
            | Symbol::ReducerName {
                namespace, name, ..
            } => {
                let references = self.cache.find_references(namespace, name).len();
                format!(
                    "**{}**\n\n{} reference(s)",
                    action_type(namespace, name),
                    references
                )
            }
            Symbol::ModelNamespace { name, actions, .. } => {
                format!("Model `{}` with {} action(s)", name, actions.len())
            }
            Symbol::LocaleKey { key, .. } => {
                let references = self.cache.find_locale_references(key).len();
                format!("**{}**\n\n{} reference(s)", key, references)
            }
        };
        Some(Hover {
            contents,
            range: symbol.range(),
        })
    }

    /// Where the action or message under the cursor is defined
    pub fn definition(&self, path: &Path, position: Position) -> Vec<Location> {
        match self.cache.usage_at(path, position) {
            Some(Usage::Action {
                namespace, action, ..
            }) => {
                let definitions: Vec<Location> = self
                    .cache
                    .query_action_definitions(&namespace, &action)
                    .into_iter()
                    .map(|definition| definition.location)
                    .collect();
                if !definitions.is_empty() {
                    return definitions;
                }
                // Unknown action of a known model: jump to the model
                self.cache
                    .query_namespace(&namespace)
                    .map(|info| info.definitions)
                    .unwrap_or_default()
            }
            Some(Usage::Message { key, .. }) => self.cache.query_locale_key(&key),
            None => Vec::new(),
        }
    }

    /// Usages of the action or message under the cursor, from either a usage
    /// or its definition
    pub fn references(&self, path: &Path, position: Position) -> Vec<Location> {
        if let Some(usage) = self.cache.usage_at(path, position) {
            return match usage {
                Usage::Action {
                    namespace, action, ..
                } => self.cache.find_references(&namespace, &action),
                Usage::Message { key, .. } => self.cache.find_locale_references(&key),
            };
        }

        match self.cache.symbol_at(path, position) {
            Some(Symbol::EffectName {
                namespace, name, ..
            })
            | Some(Symbol::ReducerName {
                namespace, name, ..
            }) => self.cache.find_references(&namespace, &name),
            Some(Symbol::LocaleKey { key, .. }) => self.cache.find_locale_references(&key),
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Document Sync
    // =========================================================================

    /// Index an unsaved editor buffer
    pub fn did_change(&self, path: &Path, content: &str) -> ReloadOutcome {
        self.cache.reload_content(path, content)
    }

    /// Buffer closed: fall back to what is on disk
    pub async fn did_close(&self, path: &Path) -> ReloadOutcome {
        self.cache.reload_file(path).await
    }
}

fn describe(location: &Location) -> String {
    format!(
        "{}:{}",
        location.path.display(),
        location.range.start.line + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use std::path::PathBuf;

    const MODEL: &str = r#"export default {
  namespace: 'user',
  effects: {
    *fetchUser() {},
  },
  reducers: {
    save(state) { return state; },
  },
};"#;

    const PAGE: &str = r#"export default function Users({ dispatch }) {
  dispatch({ type: 'user/fetchUser' });
  dispatch({ type: 'user/missing' });
  return <FormattedMessage id="menu.users" />;
}"#;

    const LOCALE: &str = "export default { menu: { users: 'Users', home: 'Home' } };";

    struct Workspace {
        service: LanguageService,
        model: PathBuf,
        page: PathBuf,
        locale: PathBuf,
    }

    fn workspace() -> Workspace {
        let root = PathBuf::from("/workspace");
        let cache = ModelInfoCache::for_workspace(&root, &IndexSettings::default()).unwrap();
        let service = LanguageService::new(cache);

        let model = root.join("src/models/user.js");
        let page = root.join("src/pages/Users.jsx");
        let locale = root.join("src/locales/en-US.js");
        service.did_change(&model, MODEL);
        service.did_change(&page, PAGE);
        service.did_change(&locale, LOCALE);

        Workspace {
            service,
            model,
            page,
            locale,
        }
    }

    fn labels(items: Vec<CompletionItem>) -> Vec<String> {
        items.into_iter().map(|item| item.label).collect()
    }

    #[test]
    fn test_action_completions() {
        let ws = workspace();

        let items = ws.service.completions("  dispatch({ type: 'user/");
        assert_eq!(
            items.iter().map(|i| i.label.as_str()).collect::<Vec<_>>(),
            vec!["user/fetchUser", "user/save"]
        );
        assert_eq!(items[0].detail.as_deref(), Some("effect"));
        assert_eq!(items[1].detail.as_deref(), Some("reducer"));

        assert_eq!(labels(ws.service.completions("yield put({ type: \"user/sa")), vec!["user/save"]);
        assert!(ws.service.completions("const type = 1;").is_empty());
    }

    #[test]
    fn test_locale_completions() {
        let ws = workspace();

        assert_eq!(
            labels(ws.service.completions("<FormattedMessage id=\"menu.")),
            vec!["menu.home", "menu.users"]
        );
        let items = ws.service.completions("formatMessage({ id: 'menu.u");
        assert_eq!(labels(items.clone()), vec!["menu.users"]);
        assert_eq!(items[0].detail.as_deref(), Some("en-US.js"));
    }

    #[test]
    fn test_definition_from_usage() {
        let ws = workspace();

        let definitions = ws.service.definition(&ws.page, Position::new(1, 22));
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].path, ws.model);
        assert_eq!(definitions[0].range.start.line, 3);

        // Unknown action falls back to the model
        let fallback = ws.service.definition(&ws.page, Position::new(2, 22));
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].range.start.line, 1);

        let message = ws.service.definition(&ws.page, Position::new(3, 32));
        assert_eq!(message.len(), 1);
        assert_eq!(message[0].path, ws.locale);

        assert!(ws.service.definition(&ws.page, Position::new(0, 0)).is_empty());
    }

    #[test]
    fn test_references_from_usage_and_definition() {
        let ws = workspace();

        let from_usage = ws.service.references(&ws.page, Position::new(1, 22));
        let from_definition = ws.service.references(&ws.model, Position::new(3, 6));
        assert_eq!(from_usage.len(), 1);
        assert_eq!(from_usage, from_definition);
        assert_eq!(from_usage[0].path, ws.page);

        let message_refs = ws.service.references(&ws.locale, Position::new(0, 26));
        assert_eq!(message_refs.len(), 1);
    }

    #[test]
    fn test_hover() {
        let ws = workspace();

        let hover = ws.service.hover(&ws.page, Position::new(1, 22)).unwrap();
        assert!(hover.contents.starts_with("**user/fetchUser** (effect of `user`)"));
        assert_eq!(hover.range.start, Position::new(1, 19));

        let missing = ws.service.hover(&ws.page, Position::new(2, 22)).unwrap();
        assert!(missing.contents.contains("No such action"));

        let definition = ws.service.hover(&ws.model, Position::new(3, 6)).unwrap();
        assert!(definition.contents.contains("1 reference(s)"));

        assert!(ws.service.hover(&ws.page, Position::new(0, 0)).is_none());
    }

    #[test]
    fn test_did_change_reindexes_buffer() {
        let ws = workspace();
        ws.service
            .did_change(&ws.model, &MODEL.replace("fetchUser", "fetchUserInfo"));

        let definitions = ws.service.definition(&ws.page, Position::new(1, 22));
        assert_eq!(definitions[0].range.start.line, 1);
        assert_eq!(
            labels(ws.service.completions("type: 'user/f")),
            vec!["user/fetchUserInfo"]
        );
    }
}
