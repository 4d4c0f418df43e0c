//! Dependency extractor: resolves a reference's `to_path` specifier to a
//! concrete `IndexedFile` in the repository, honoring a path alias map,
//! relative paths, and extensionless lookup.

use crate::models::{DependencyEdge, ReferenceType};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const LOOKUP_SUFFIXES: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    "/index.ts",
    "/index.tsx",
    "/index.js",
    "/index.jsx",
];

fn normalize_posix(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Resolve `specifier`, written in `from_path`, against `known_paths` (the
/// repository's current file set). Honors `aliases` (e.g. `@x/*` ->
/// `src/x/*`) before falling back to relative resolution.
pub fn resolve_specifier(
    from_path: &str,
    specifier: &str,
    known_paths: &HashMap<String, ()>,
    aliases: &HashMap<String, String>,
) -> Option<String> {
    let candidate_base = if let Some(resolved) = resolve_alias(specifier, aliases) {
        resolved
    } else if specifier.starts_with('.') {
        let source_dir = Path::new(from_path).parent().unwrap_or(Path::new(""));
        normalize_posix(&source_dir.join(specifier).to_string_lossy().replace('\\', "/"))
    } else {
        // Bare package specifier (node_modules-style), not resolvable to
        // a file within this repository; left as an unresolved reference.
        return None;
    };

    for suffix in LOOKUP_SUFFIXES {
        let candidate = normalize_posix(&format!("{candidate_base}{suffix}"));
        if known_paths.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Recomputes the repository's whole dependency edge set from freshly
/// extracted references (`new_refs`, keyed by the source file's path) plus
/// references already on record for files that weren't re-parsed this job
/// (`existing_refs`). Both sides go through the same resolution so an edge
/// set is never a mix of stale and fresh resolution rules.
pub fn resolve_dependencies(
    new_refs: &[(String, String, ReferenceType)],
    existing_refs: &[(String, String, String, String)],
    path_to_file_id: &HashMap<String, String>,
    aliases: &HashMap<String, String>,
) -> Vec<DependencyEdge> {
    let known_paths: HashMap<String, ()> =
        path_to_file_id.keys().map(|p| (p.clone(), ())).collect();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    let mut push_edge = |from_path: &str, to_path: &str, reference_type: ReferenceType| {
        let Some(source_file_id) = path_to_file_id.get(from_path) else {
            return;
        };
        let Some(resolved) = resolve_specifier(from_path, to_path, &known_paths, aliases) else {
            return;
        };
        let Some(target_file_id) = path_to_file_id.get(&resolved) else {
            return;
        };
        let key = (source_file_id.clone(), target_file_id.clone(), reference_type.as_str());
        if seen.insert(key) {
            edges.push(DependencyEdge {
                source_file_id: source_file_id.clone(),
                target_file_id: target_file_id.clone(),
                reference_type,
            });
        }
    };

    for (from_path, to_path, reference_type) in new_refs {
        push_edge(from_path, to_path, *reference_type);
    }
    for (_from_file_id, from_path, to_path, reference_type_str) in existing_refs {
        if let Some(reference_type) = ReferenceType::from_str(reference_type_str) {
            push_edge(from_path, to_path, reference_type);
        }
    }

    edges
}

fn resolve_alias(specifier: &str, aliases: &HashMap<String, String>) -> Option<String> {
    for (pattern, target) in aliases {
        if let Some(prefix) = pattern.strip_suffix('*') {
            if let Some(rest) = specifier.strip_prefix(prefix) {
                let target_prefix = target.strip_suffix('*').unwrap_or(target);
                return Some(normalize_posix(&format!("{target_prefix}{rest}")));
            }
        } else if specifier == pattern {
            return Some(target.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> HashMap<String, ()> {
        list.iter().map(|s| (s.to_string(), ())).collect()
    }

    #[test]
    fn resolves_relative_import_with_extension() {
        let known = paths(&["src/b.ts", "src/a.ts"]);
        let resolved = resolve_specifier("src/a.ts", "./b", &known, &HashMap::new());
        assert_eq!(resolved, Some("src/b.ts".to_string()));
    }

    #[test]
    fn resolves_relative_import_to_index() {
        let known = paths(&["src/lib/index.ts"]);
        let resolved = resolve_specifier("src/a.ts", "./lib", &known, &HashMap::new());
        assert_eq!(resolved, Some("src/lib/index.ts".to_string()));
    }

    #[test]
    fn resolves_alias_map() {
        let known = paths(&["src/shared/util.ts"]);
        let mut aliases = HashMap::new();
        aliases.insert("@x/*".to_string(), "src/shared/*".to_string());
        let resolved = resolve_specifier("src/a.ts", "@x/util", &known, &aliases);
        assert_eq!(resolved, Some("src/shared/util.ts".to_string()));
    }

    #[test]
    fn leaves_bare_package_specifiers_unresolved() {
        let known = paths(&["src/a.ts"]);
        let resolved = resolve_specifier("src/a.ts", "react", &known, &HashMap::new());
        assert_eq!(resolved, None);
    }
}
