//! Reference extractor: emits a `Reference` per module-level import or
//! re-export, recording the module specifier as written (not yet resolved
//! to a file).

use crate::models::ReferenceType;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    pub to_path: String,
    pub symbols: Vec<String>,
    pub reference_type: ReferenceType,
    pub is_type_only: bool,
    pub line: u32,
}

// `import ... from "spec"` / `import "spec"` (side-effect only) / `import type ... from "spec"`.
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(type\s+)?(?:(.*?)\s+from\s+)?['"]([^'"]+)['"]"#).unwrap()
});

// `export { a, b } from "spec"` / `export type { a } from "spec"`.
static RE_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+(type\s+)?\{([^}]*)\}\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});

// `export * from "spec"` / `export * as ns from "spec"`.
static EXPORT_ALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+\*(?:\s+as\s+[A-Za-z_$][A-Za-z0-9_$]*)?\s+from\s+['"]([^'"]+)['"]"#)
        .unwrap()
});

// `import(...)` dynamic import expression, anywhere in the file.
static DYNAMIC_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

// `require(...)` call expression, anywhere in the file.
static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

fn parse_named_symbols(clause: &str) -> Vec<String> {
    // Strip a default import / namespace import combined with named ones:
    // `Default, { a, b as c }` -> named list only; default handled separately.
    let named_start = clause.find('{');
    let named_end = clause.rfind('}');
    let mut names = Vec::new();
    if let (Some(s), Some(e)) = (named_start, named_end) {
        if e > s {
            for part in clause[s + 1..e].split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let name = part.split_whitespace().last().unwrap_or(part);
                names.push(name.to_string());
            }
        }
    } else if clause.contains('*') {
        // `* as ns` namespace import: symbols list stays empty; the
        // namespace itself isn't a named symbol.
    } else {
        let default_name = clause.trim();
        if !default_name.is_empty() {
            names.push(default_name.to_string());
        }
    }
    names
}

/// Emits references in source order: same source produces the same rows
/// in the same order. Side-effect-only imports produce an empty `symbols`.
pub fn extract_references(source: &str) -> Vec<ExtractedReference> {
    let mut out = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;

        if let Some(caps) = RE_EXPORT_RE.captures(line) {
            out.push(ExtractedReference {
                to_path: caps[3].to_string(),
                symbols: parse_named_symbols(&caps[2]),
                reference_type: ReferenceType::ReExport,
                is_type_only: caps.get(1).is_some(),
                line: line_no,
            });
            continue;
        }

        if let Some(caps) = EXPORT_ALL_RE.captures(line) {
            out.push(ExtractedReference {
                to_path: caps[1].to_string(),
                symbols: vec![],
                reference_type: ReferenceType::ExportAll,
                is_type_only: false,
                line: line_no,
            });
            continue;
        }

        if let Some(caps) = IMPORT_RE.captures(line) {
            let clause = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            out.push(ExtractedReference {
                to_path: caps[3].to_string(),
                symbols: parse_named_symbols(clause),
                reference_type: ReferenceType::Import,
                is_type_only: caps.get(1).is_some(),
                line: line_no,
            });
            continue;
        }

        for caps in DYNAMIC_IMPORT_RE.captures_iter(line) {
            out.push(ExtractedReference {
                to_path: caps[1].to_string(),
                symbols: vec![],
                reference_type: ReferenceType::DynamicImport,
                is_type_only: false,
                line: line_no,
            });
        }

        for caps in REQUIRE_RE.captures_iter(line) {
            out.push(ExtractedReference {
                to_path: caps[1].to_string(),
                symbols: vec![],
                reference_type: ReferenceType::Require,
                is_type_only: false,
                line: line_no,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_import() {
        let src = "import { foo, bar as baz } from './lib';\n";
        let refs = extract_references(src);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].to_path, "./lib");
        assert_eq!(refs[0].symbols, vec!["foo".to_string(), "baz".to_string()]);
        assert_eq!(refs[0].reference_type, ReferenceType::Import);
        assert!(!refs[0].is_type_only);
    }

    #[test]
    fn extracts_type_only_import() {
        let src = "import type { Foo } from './types';\n";
        let refs = extract_references(src);
        assert!(refs[0].is_type_only);
    }

    #[test]
    fn side_effect_import_has_no_symbols() {
        let src = "import './polyfill';\n";
        let refs = extract_references(src);
        assert_eq!(refs.len(), 1);
        assert!(refs[0].symbols.is_empty());
        assert_eq!(refs[0].reference_type, ReferenceType::Import);
    }

    #[test]
    fn extracts_re_export_and_export_all() {
        let src = "export { x } from './a';\nexport * from './b';\n";
        let refs = extract_references(src);
        assert_eq!(refs[0].reference_type, ReferenceType::ReExport);
        assert_eq!(refs[1].reference_type, ReferenceType::ExportAll);
    }

    #[test]
    fn extracts_dynamic_import_and_require() {
        let src = "const mod = await import('./dyn');\nconst legacy = require('./legacy');\n";
        let refs = extract_references(src);
        assert_eq!(refs[0].reference_type, ReferenceType::DynamicImport);
        assert_eq!(refs[1].reference_type, ReferenceType::Require);
    }
}
