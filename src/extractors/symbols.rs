//! Symbol extractor: emits a `Symbol` per named declaration, capturing
//! `kind`, source line, and the immediately preceding doc comment, if any.

use crate::models::SymbolKind;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub jsdoc: Option<String>,
}

static CLASS_OR_INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(class|interface)\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .unwrap()
});

static TYPE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?type\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap()
});

static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:const\s+)?enum\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap()
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .unwrap()
});

static ARROW_CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=\s*(?:async\s*)?\(?[^=]*=>",
    )
    .unwrap()
});

static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=")
        .unwrap()
});

fn preceding_doc_comment(lines: &[&str], decl_line_idx: usize) -> Option<String> {
    if decl_line_idx == 0 {
        return None;
    }
    let mut end = decl_line_idx;
    // Skip blank lines directly above the declaration.
    while end > 0 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    if end == 0 || !lines[end - 1].trim_end().ends_with("*/") {
        return None;
    }
    let mut start = end;
    while start > 0 {
        start -= 1;
        if lines[start].trim_start().starts_with("/**") || lines[start].trim_start().starts_with("/*") {
            break;
        }
        if start == 0 {
            break;
        }
    }
    if !lines[start].trim_start().starts_with("/*") {
        return None;
    }
    Some(lines[start..end].join("\n").trim().to_string())
}

/// Emits symbols in source order: same AST/source produces the same rows
/// in the same order.
pub fn extract_symbols(source: &str) -> Vec<ExtractedSymbol> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = (idx + 1) as u32;

        if let Some(caps) = CLASS_OR_INTERFACE_RE.captures(line) {
            let kind = if &caps[1] == "class" {
                SymbolKind::Class
            } else {
                SymbolKind::Interface
            };
            out.push(ExtractedSymbol {
                name: caps[2].to_string(),
                kind,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
            continue;
        }

        if let Some(caps) = ENUM_RE.captures(line) {
            out.push(ExtractedSymbol {
                name: caps[1].to_string(),
                kind: SymbolKind::Enum,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
            continue;
        }

        if let Some(caps) = TYPE_ALIAS_RE.captures(line) {
            out.push(ExtractedSymbol {
                name: caps[1].to_string(),
                kind: SymbolKind::Type,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
            continue;
        }

        if let Some(caps) = FUNCTION_RE.captures(line) {
            out.push(ExtractedSymbol {
                name: caps[1].to_string(),
                kind: SymbolKind::Function,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
            continue;
        }

        if let Some(caps) = ARROW_CONST_RE.captures(line) {
            out.push(ExtractedSymbol {
                name: caps[1].to_string(),
                kind: SymbolKind::Function,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
            continue;
        }

        if let Some(caps) = CONST_RE.captures(line) {
            let kind = if &caps[1] == "const" {
                SymbolKind::Const
            } else {
                SymbolKind::Variable
            };
            out.push(ExtractedSymbol {
                name: caps[2].to_string(),
                kind,
                line: line_no,
                jsdoc: preceding_doc_comment(&lines, idx),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_exported_function_and_class() {
        let src = "export function add(a, b) {\n  return a + b;\n}\n\nexport class Widget {}\n";
        let symbols = extract_symbols(src);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "add");
        assert_eq!(symbols[0].kind, SymbolKind::Function);
        assert_eq!(symbols[1].name, "Widget");
        assert_eq!(symbols[1].kind, SymbolKind::Class);
    }

    #[test]
    fn captures_jsdoc_immediately_above_declaration() {
        let src = "/**\n * Adds two numbers.\n */\nexport function add(a, b) {\n  return a + b;\n}\n";
        let symbols = extract_symbols(src);
        assert_eq!(symbols.len(), 1);
        assert!(symbols[0].jsdoc.as_deref().unwrap().contains("Adds two numbers"));
    }

    #[test]
    fn classifies_arrow_const_as_function() {
        let src = "export const handler = (req, res) => {\n  res.send('ok');\n};\n";
        let symbols = extract_symbols(src);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKind::Function);
    }

    #[test]
    fn extraction_is_deterministic() {
        let src = "export const a = 1;\nexport const b = 2;\n";
        assert_eq!(extract_symbols(src), extract_symbols(src));
    }
}
