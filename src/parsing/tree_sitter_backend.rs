//! Tree-sitter backend for TS/TSX/JS/JSX parsing.

use super::SupportedLanguage;
use std::collections::HashMap;
use tree_sitter::{Language, Parser, Tree};

#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    pub line: u32,
    pub message: String,
}

/// A parsed file. `source` is retained so extractors can slice node text
/// without re-reading the file.
pub struct ParsedCode {
    pub language: SupportedLanguage,
    pub tree: Option<Tree>,
    pub source: String,
    pub diagnostics: Vec<ParseDiagnostic>,
}

fn language_for(lang: SupportedLanguage) -> Option<Language> {
    match lang {
        SupportedLanguage::TypeScript => {
            Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        }
        SupportedLanguage::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        SupportedLanguage::JavaScript | SupportedLanguage::Jsx => {
            Some(tree_sitter_javascript::LANGUAGE.into())
        }
        SupportedLanguage::Json => None, // extracted via serde_json, not tree-sitter
    }
}

pub struct CodeParser {
    parsers: HashMap<SupportedLanguage, Parser>,
}

impl CodeParser {
    pub fn new() -> anyhow::Result<Self> {
        Ok(CodeParser {
            parsers: HashMap::new(),
        })
    }

    fn parser_for(&mut self, lang: SupportedLanguage) -> anyhow::Result<Option<&mut Parser>> {
        if lang == SupportedLanguage::Json {
            return Ok(None);
        }
        if !self.parsers.contains_key(&lang) {
            let mut parser = Parser::new();
            if let Some(language) = language_for(lang) {
                parser.set_language(&language)?;
            }
            self.parsers.insert(lang, parser);
        }
        Ok(self.parsers.get_mut(&lang))
    }

    /// Parse errors never abort the pipeline: a tree-sitter parse always
    /// returns *some* tree (error nodes mark the unparsable spans), so
    /// diagnostics here are best-effort annotations, not a Result.
    pub fn parse(&mut self, path: &str, source: &str, language: SupportedLanguage) -> ParsedCode {
        if language == SupportedLanguage::Json {
            let mut diagnostics = Vec::new();
            if let Err(e) = serde_json::from_str::<serde_json::Value>(source) {
                diagnostics.push(ParseDiagnostic {
                    line: e.line() as u32,
                    message: e.to_string(),
                });
            }
            return ParsedCode {
                language,
                tree: None,
                source: source.to_string(),
                diagnostics,
            };
        }

        let parser = match self.parser_for(language) {
            Ok(Some(p)) => p,
            _ => {
                return ParsedCode {
                    language,
                    tree: None,
                    source: source.to_string(),
                    diagnostics: vec![ParseDiagnostic {
                        line: 0,
                        message: format!("no parser available for {}", language.as_str()),
                    }],
                }
            }
        };

        let tree = parser.parse(source, None);
        let mut diagnostics = Vec::new();
        if let Some(t) = &tree {
            collect_error_diagnostics(t, source, path, &mut diagnostics);
        } else {
            diagnostics.push(ParseDiagnostic {
                line: 0,
                message: "parser returned no tree".to_string(),
            });
        }

        ParsedCode {
            language,
            tree,
            source: source.to_string(),
            diagnostics,
        }
    }
}

fn collect_error_diagnostics(
    tree: &Tree,
    source: &str,
    path: &str,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    let mut cursor = tree.walk();
    let mut stack = vec![tree.root_node()];
    let _ = source;
    let _ = path;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            diagnostics.push(ParseDiagnostic {
                line: node.start_position().row as u32,
                message: if node.is_missing() {
                    "missing syntax".to_string()
                } else {
                    "syntax error".to_string()
                },
            });
            // Error nodes can be large; don't recurse into their children
            // to avoid diagnostic floods.
            continue;
        }
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_typescript_without_diagnostics() {
        let mut parser = CodeParser::new().unwrap();
        let parsed = parser.parse(
            "a.ts",
            "export function add(a: number, b: number): number { return a + b; }",
            SupportedLanguage::TypeScript,
        );
        assert!(parsed.tree.is_some());
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn tolerates_invalid_syntax_with_diagnostics() {
        let mut parser = CodeParser::new().unwrap();
        let parsed = parser.parse(
            "bad.ts",
            "export function broken( {{{ not valid at all",
            SupportedLanguage::TypeScript,
        );
        assert!(parsed.tree.is_some());
        assert!(!parsed.diagnostics.is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let mut parser = CodeParser::new().unwrap();
        let src = "export const x = 1;";
        let a = parser.parse("a.ts", src, SupportedLanguage::TypeScript);
        let b = parser.parse("a.ts", src, SupportedLanguage::TypeScript);
        assert_eq!(a.diagnostics.len(), b.diagnostics.len());
        assert_eq!(
            a.tree.unwrap().root_node().to_sexp(),
            b.tree.unwrap().root_node().to_sexp()
        );
    }
}
