//! AST Parser: produces a language-tagged syntax tree per source file,
//! tolerant of parse errors. Pure: multiple invocations on the same input
//! produce byte-identical output, which incremental no-op reindexing
//! depends on.

#[cfg(feature = "tree-sitter-parsing")]
mod tree_sitter_backend;

#[cfg(feature = "tree-sitter-parsing")]
pub use tree_sitter_backend::{CodeParser, ParseDiagnostic, ParsedCode};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Json,
}

impl SupportedLanguage {
    pub fn from_extension(path: &str) -> Option<Self> {
        if path.ends_with(".tsx") {
            Some(SupportedLanguage::Tsx)
        } else if path.ends_with(".ts") {
            Some(SupportedLanguage::TypeScript)
        } else if path.ends_with(".jsx") {
            Some(SupportedLanguage::Jsx)
        } else if path.ends_with(".js") || path.ends_with(".cjs") || path.ends_with(".mjs") {
            Some(SupportedLanguage::JavaScript)
        } else if path.ends_with(".json") {
            Some(SupportedLanguage::Json)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedLanguage::TypeScript => "typescript",
            SupportedLanguage::Tsx => "tsx",
            SupportedLanguage::JavaScript => "javascript",
            SupportedLanguage::Jsx => "jsx",
            SupportedLanguage::Json => "json",
        }
    }
}

#[cfg(not(feature = "tree-sitter-parsing"))]
pub mod stub {
    //! Parsing with tree-sitter disabled: every file parses to an empty
    //! tree with a single diagnostic, so extractors still run without
    //! panicking in minimal builds.
    use super::SupportedLanguage;

    #[derive(Debug, Clone)]
    pub struct ParseDiagnostic {
        pub line: u32,
        pub message: String,
    }

    #[derive(Debug, Clone)]
    pub struct ParsedCode {
        pub language: SupportedLanguage,
        pub diagnostics: Vec<ParseDiagnostic>,
    }

    pub struct CodeParser;

    impl CodeParser {
        pub fn new() -> anyhow::Result<Self> {
            Ok(CodeParser)
        }

        pub fn parse(&mut self, _path: &str, _source: &str, language: SupportedLanguage) -> ParsedCode {
            ParsedCode {
                language,
                diagnostics: vec![ParseDiagnostic {
                    line: 0,
                    message: "tree-sitter-parsing feature disabled".to_string(),
                }],
            }
        }
    }
}

#[cfg(not(feature = "tree-sitter-parsing"))]
pub use stub::{CodeParser, ParseDiagnostic, ParsedCode};
