/**
 * Component Identifier
 *
 * DESIGN DECISION: Regex/substring lexical scanning, never an AST parser
 * WHY: The system is a deliberate lexical analyzer across a web-ecosystem
 * scripting language with two module forms (ESM, CommonJS); a full parser
 * would need a grammar per dialect this tool is not trying to own
 *
 * REASONING CHAIN:
 * 1. Classification rules are evaluated in a fixed priority order, first
 *    match wins, so the result is deterministic regardless of how many
 *    weak signals a file carries
 * 2. `classify` and `extract_raw_dependencies` are `pub(crate)` so the
 *    Cycle Detector can reuse the exact same extraction/classification the
 *    Component Identifier uses — the two analyzers are never allowed to
 *    disagree about what counts as an import or a role
 * 3. The cache guarantees `identify` is idempotent: re-ingesting a path
 *    returns the first-computed record without re-running any classifier
 *
 * PATTERN: closed-set role enum with exhaustive match, no trait hierarchy
 */

use crate::cache::Cache;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// The closed set of architectural roles a file can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentRole {
    ReactComponent,
    Service,
    Utility,
    Configuration,
    Middleware,
    Unknown,
}

/// Everything the Component Identifier knows about one ingested file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub raw_text: String,
    pub role: ComponentRole,
    pub component_name: String,
    pub exports: Vec<String>,
    pub dependencies: Vec<String>,
    pub metadata: HashMap<String, Value>,
}

/// Classifies source files into component roles and extracts their public surface.
///
/// Idempotent and cached by path: a second `identify` call for the same
/// path returns the cached record without re-running any classifier.
pub struct ComponentIdentifier {
    cache: Cache<String, FileRecord>,
}

impl ComponentIdentifier {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(),
        }
    }

    /// Classify `text` at `path`, returning a `FileRecord`. Cached by path.
    pub fn identify(&self, path: &str, text: &str) -> FileRecord {
        self.cache.get_or_insert_with(path.to_string(), || {
            let (role, metadata) = classify(path, text);
            let exports = extract_exports(text);
            let dependencies = resolve_dependencies(path, text);
            FileRecord {
                path: path.to_string(),
                raw_text: text.to_string(),
                role,
                component_name: derive_component_name(path),
                exports,
                dependencies,
                metadata,
            }
        })
    }

    /// Number of distinct paths ingested so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ComponentIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex is valid"))
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            re(&CELL, $pattern)
        }
    };
}

static_regex!(jsx_tag_re, r"</?[A-Za-z][A-Za-z0-9.]*(?:\s[^>]*)?/?>");
static_regex!(hook_declaration_re, r"\b(?:const|function)\s+(use[A-Z]\w*)\b");
static_regex!(hook_call_re, r"\buse[A-Z]\w*\s*\(");
static_regex!(class_component_re, r"\bextends\s+[\w.]*Component\b");
static_regex!(service_class_re, r"\bclass\s+\w*(?:Service|Repository)\b");
static_regex!(middleware_signature_re, r"\(\s*req\s*,\s*res\s*,\s*next\s*\)");
static_regex!(
    import_from_re,
    r#"import\s+(?:[^'";]+?)\s+from\s+['"]([^'"]+)['"]"#
);
static_regex!(import_call_re, r#"import\(\s*['"]([^'"]+)['"]\s*\)"#);
static_regex!(require_call_re, r#"require\(\s*['"]([^'"]+)['"]\s*\)"#);
static_regex!(export_function_re, r"export\s+function\s+(\w+)");
static_regex!(export_const_re, r"export\s+const\s+(\w+)");
static_regex!(export_default_re, r"export\s+default\b");
static_regex!(module_exports_re, r"module\.exports\b");

/// Raw import/require specifiers, captured exactly as written, in textual order.
pub(crate) fn extract_raw_dependencies(text: &str) -> Vec<String> {
    let mut matches: Vec<(usize, String)> = Vec::new();
    for caps in import_from_re().captures_iter(text) {
        let m = caps.get(0).unwrap();
        matches.push((m.start(), caps[1].to_string()));
    }
    for caps in import_call_re().captures_iter(text) {
        let m = caps.get(0).unwrap();
        matches.push((m.start(), caps[1].to_string()));
    }
    for caps in require_call_re().captures_iter(text) {
        let m = caps.get(0).unwrap();
        matches.push((m.start(), caps[1].to_string()));
    }
    matches.sort_by_key(|(pos, _)| *pos);
    matches.into_iter().map(|(_, spec)| spec).collect()
}

/// Resolve relative raw specifiers through the Path Normalizer; keep bare
/// specifiers verbatim. This is the "post-normalization" dependency list
/// stored on `FileRecord` (§3/§4.2).
fn resolve_dependencies(path: &str, text: &str) -> Vec<String> {
    extract_raw_dependencies(text)
        .into_iter()
        .map(|spec| {
            if spec.starts_with("./") || spec.starts_with("../") {
                crate::path_normalizer::PathNormalizer::resolve(path, &spec).unwrap_or(spec)
            } else {
                spec
            }
        })
        .collect()
}

fn extract_exports(text: &str) -> Vec<String> {
    let mut matches: Vec<(usize, String)> = Vec::new();
    for caps in export_function_re().captures_iter(text) {
        let m = caps.get(0).unwrap();
        matches.push((m.start(), caps[1].to_string()));
    }
    for caps in export_const_re().captures_iter(text) {
        let m = caps.get(0).unwrap();
        matches.push((m.start(), caps[1].to_string()));
    }
    for m in export_default_re().find_iter(text) {
        matches.push((m.start(), "default".to_string()));
    }
    for m in module_exports_re().find_iter(text) {
        matches.push((m.start(), "module".to_string()));
    }
    matches.sort_by_key(|(pos, _)| *pos);
    matches.into_iter().map(|(_, name)| name).collect()
}

fn derive_component_name(path: &str) -> String {
    let basename = path.rsplit('/').next().unwrap_or(path);
    let without_ext = basename.rsplit_once('.').map(|(n, _)| n).unwrap_or(basename);

    let name = if without_ext == "index" {
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop(); // drop file name
        segments.pop().unwrap_or("index").to_string()
    } else {
        without_ext.to_string()
    };

    for suffix in [".util", ".config", ".spec"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    name
}

/// Classify a file into a `ComponentRole` with role-specific metadata.
///
/// `pub(crate)` so the Cycle Detector can derive role-aware cycle typing
/// from only `(path, text)`, without a second pass through `identify`.
pub(crate) fn classify(path: &str, text: &str) -> (ComponentRole, HashMap<String, Value>) {
    let jsx_present = jsx_tag_re().is_match(text);
    let hook_declared = hook_declaration_re().is_match(text);

    if jsx_present || hook_declared {
        return classify_react(path, text, jsx_present);
    }

    if is_service_candidate(path, text) {
        let has_http_client = has_http_client_usage(text);
        let has_db_operations = has_db_operation_tokens(text);
        if has_http_client || has_db_operations {
            let mut metadata = HashMap::new();
            metadata.insert("has_http_client".to_string(), Value::Bool(has_http_client));
            metadata.insert("has_db_operations".to_string(), Value::Bool(has_db_operations));
            metadata.insert(
                "has_async_patterns".to_string(),
                Value::Bool(has_async_patterns(text)),
            );
            return (ComponentRole::Service, metadata);
        }
    }

    if path.contains("/middleware/") || middleware_signature_re().is_match(text) {
        let mut metadata = HashMap::new();
        metadata.insert("is_express_middleware".to_string(), Value::Bool(true));
        metadata.insert(
            "is_auth_middleware".to_string(),
            Value::Bool(is_auth_middleware(text)),
        );
        return (ComponentRole::Middleware, metadata);
    }

    if is_configuration_candidate(path, text) {
        let mut metadata = HashMap::new();
        metadata.insert("has_env_vars".to_string(), Value::Bool(text.contains("process.env")));
        metadata.insert("is_json".to_string(), Value::Bool(path.ends_with(".json")));
        return (ComponentRole::Configuration, metadata);
    }

    let exports = extract_exports(text);
    if has_pure_functions(text, &exports) {
        let mut metadata = HashMap::new();
        metadata.insert("has_pure_functions".to_string(), Value::Bool(true));
        return (ComponentRole::Utility, metadata);
    }

    (ComponentRole::Unknown, HashMap::new())
}

fn classify_react(path: &str, text: &str, jsx_present: bool) -> (ComponentRole, HashMap<String, Value>) {
    let is_class = class_component_re().is_match(text);
    let is_functional = jsx_present && !is_class;
    let uses_hooks = hook_call_re().is_match(text);
    let basename = path.rsplit('/').next().unwrap_or(path);
    let exports_hook_fn = export_function_re().captures_iter(text).any(|c| c[1].starts_with("use"))
        || export_const_re().captures_iter(text).any(|c| c[1].starts_with("use"));
    let is_custom_hook = !jsx_present && basename.starts_with("use") && exports_hook_fn;

    let confidence = if jsx_present && (is_class || is_functional) {
        "high"
    } else if is_custom_hook || uses_hooks {
        "medium"
    } else {
        "low"
    };

    let mut metadata = HashMap::new();
    metadata.insert("has_jsx".to_string(), Value::Bool(jsx_present));
    metadata.insert("is_functional".to_string(), Value::Bool(is_functional));
    metadata.insert("is_class".to_string(), Value::Bool(is_class));
    metadata.insert("uses_hooks".to_string(), Value::Bool(uses_hooks));
    if is_custom_hook {
        metadata.insert("is_custom_hook".to_string(), Value::Bool(true));
    }
    metadata.insert(
        "detection_confidence".to_string(),
        Value::String(confidence.to_string()),
    );

    (ComponentRole::ReactComponent, metadata)
}

fn is_service_candidate(path: &str, text: &str) -> bool {
    path.contains("/services/") || path.contains("/repositories/") || service_class_re().is_match(text)
}

fn has_http_client_usage(text: &str) -> bool {
    const TOKENS: &[&str] = &["axios.", "fetch(", "http.request", "https.request", "XMLHttpRequest"];
    TOKENS.iter().any(|t| text.contains(t))
}

fn has_db_operation_tokens(text: &str) -> bool {
    const TOKENS: &[&str] = &[
        "mongoose.",
        ".find(",
        ".findOne(",
        ".insertOne(",
        ".updateOne(",
        ".deleteOne(",
        "knex(",
        "prisma.",
        "pool.query(",
        "connection.query(",
    ];
    TOKENS.iter().any(|t| text.contains(t))
}

fn has_async_patterns(text: &str) -> bool {
    text.contains("async function") || text.contains("async (") || text.contains("await ")
}

fn is_auth_middleware(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("token") || lower.contains("jwt") || lower.contains("verify")
}

fn is_configuration_candidate(path: &str, text: &str) -> bool {
    if path.contains("/config/") || path.contains("/constants/") {
        return true;
    }
    let const_export_count = export_const_re().find_iter(text).count();
    let env_reads = text.matches("process.env").count();
    let has_function_logic = text.contains("function ") || text.contains("=> {");
    (const_export_count >= 3 || env_reads > 0) && !has_function_logic
}

fn has_pure_functions(text: &str, exports: &[String]) -> bool {
    !exports.is_empty()
        && !jsx_tag_re().is_match(text)
        && !has_http_client_usage(text)
        && !has_db_operation_tokens(text)
        && !middleware_signature_re().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functional_react_component_has_high_confidence() {
        let text = "import React from 'react';\nexport default function Button() {\n  return <button>Click</button>;\n}\n";
        let identifier = ComponentIdentifier::new();
        let record = identifier.identify("/src/components/Button.tsx", text);
        assert_eq!(record.role, ComponentRole::ReactComponent);
        assert_eq!(record.metadata["has_jsx"], Value::Bool(true));
        assert_eq!(record.metadata["is_functional"], Value::Bool(true));
        assert_eq!(record.metadata["is_class"], Value::Bool(false));
        assert_eq!(record.metadata["uses_hooks"], Value::Bool(false));
        assert_eq!(
            record.metadata["detection_confidence"],
            Value::String("high".to_string())
        );
    }

    #[test]
    fn identify_is_idempotent() {
        let identifier = ComponentIdentifier::new();
        let text = "export const helper = () => 1;\n";
        let first = identifier.identify("/src/utils/helper.util.js", text);
        let second = identifier.identify("/src/utils/helper.util.js", text);
        assert_eq!(first, second);
        assert_eq!(identifier.len(), 1);
    }

    #[test]
    fn service_requires_both_path_and_http_or_db_signal() {
        let text = "export class UserService {\n  async fetchAll() { return fetch('/users'); }\n}\n";
        let identifier = ComponentIdentifier::new();
        let record = identifier.identify("/src/services/UserService.js", text);
        assert_eq!(record.role, ComponentRole::Service);
        assert_eq!(record.metadata["has_http_client"], Value::Bool(true));
    }

    #[test]
    fn middleware_detected_by_signature() {
        let text = "export function auth(req, res, next) {\n  if (!req.headers.token) return res.status(401);\n  next();\n}\n";
        let identifier = ComponentIdentifier::new();
        let record = identifier.identify("/src/api/auth.js", text);
        assert_eq!(record.role, ComponentRole::Middleware);
        assert_eq!(record.metadata["is_auth_middleware"], Value::Bool(true));
    }

    #[test]
    fn component_name_strips_index_and_compound_suffix() {
        assert_eq!(derive_component_name("/src/components/Button/index.tsx"), "Button");
        assert_eq!(derive_component_name("/src/utils/format.util.js"), "format");
        assert_eq!(derive_component_name("/src/config/app.config.ts"), "app");
    }

    #[test]
    fn dependency_extraction_resolves_relative_and_keeps_bare_specifiers() {
        let text = "import React from 'react';\nimport Helper from './Helper';\nconst x = require('../lib/x');\n";
        let deps = resolve_dependencies("/src/components/Widget.js", text);
        assert_eq!(
            deps,
            vec![
                "react".to_string(),
                "/src/components/Helper.js".to_string(),
                "/src/lib/x.js".to_string(),
            ]
        );
    }
}
