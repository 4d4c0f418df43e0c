//! File Scanner: walks a working tree, applies include/ignore rules,
//! computes content fingerprints.

use crate::config::Config;
use crate::error::Result;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub relative_path: String,
    pub size_bytes: u64,
    pub content_hash: String,
}

/// Ordering is deterministic (lexicographic on normalized paths).
pub fn scan(root: &Path, config: &Config) -> Result<Vec<ScannedFile>> {
    let mut out = Vec::new();

    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(false)
        .git_ignore(true)
        .add_custom_ignore_filename(".kotadbignore")
        .filter_entry({
            let ignored: Vec<String> = config.ignored_dirs.clone();
            move |entry| {
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    let name = entry.file_name().to_string_lossy().to_string();
                    return !ignored.contains(&name);
                }
                true
            }
        });

    for entry in walker.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();

        // Path normalization: collapse `./`, forbid `..`, reject symlinks
        // that escape the root.
        let relative = match path.strip_prefix(root) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let relative_str = normalize_relative(relative);
        if relative_str.split('/').any(|seg| seg == "..") {
            continue;
        }
        if path.is_symlink() {
            if let Ok(canon) = path.canonicalize() {
                if !canon.starts_with(root) {
                    continue;
                }
            } else {
                continue;
            }
        }

        if !has_included_extension(&relative_str, &config.included_extensions) {
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => continue,
        };
        if is_binary(&bytes) {
            continue;
        }

        let content_hash = hash_content(&bytes);
        out.push(ScannedFile {
            relative_path: relative_str,
            size_bytes: bytes.len() as u64,
            content_hash,
        });
    }

    out.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(out)
}

fn normalize_relative(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").to_string()
}

fn has_included_extension(path: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}

/// Crude but standard binary-content sniff: a NUL byte within the first 8KB
/// marks the file as non-text.
fn is_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(8192)];
    sample.contains(&0)
}

pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Load `.kotadbignore` patterns from a repository root; absence is
/// equivalent to an empty file.
pub fn load_ignore_patterns(root: &Path) -> Vec<String> {
    let ignore_path = root.join(".kotadbignore");
    std::fs::read_to_string(ignore_path)
        .map(|s| {
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_included_extensions_only_and_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ts"), "export const b = 1;").unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/x.ts"), "nope").unwrap();

        let config = Config::default();
        let files = scan(dir.path(), &config).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(paths, vec!["a.ts".to_string(), "b.ts".to_string()]);
    }

    #[test]
    fn skips_binary_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin.js"), [0u8, 1, 2, 3]).unwrap();
        let config = Config::default();
        let files = scan(dir.path(), &config).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn rejects_parent_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!PathBuf::from("../escape.ts").to_string_lossy().is_empty());
        // Exercised indirectly via scan(); normalize_relative + the `..`
        // guard above is unit-testable directly:
        let p = Path::new("../evil.ts");
        assert!(normalize_relative(p).split('/').any(|s| s == ".."));
    }
}
