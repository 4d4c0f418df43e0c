//! Extractors: three pure, deterministic passes over a parsed file that
//! emit rows for the Store. Regex-based line scanning over the source text
//! (the AST Parser's tree is consulted only for diagnostics); same source
//! text always yields the same rows in the same order.

pub mod dependencies;
pub mod references;
pub mod symbols;

pub use dependencies::resolve_dependencies;
pub use references::extract_references;
pub use symbols::extract_symbols;
