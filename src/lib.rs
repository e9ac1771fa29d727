//! # Logica
//!
//! A declarative Datalog-family logic language compiled to SQL for SQLite,
//! PostgreSQL, BigQuery, and DuckDB.
//!
//! ## Pipeline
//!
//! ```text
//! source text
//!     |
//! [parser]              -> ParsedFile (Vec<Statement>)
//!     |
//! [imports]              -> flat Vec<Statement> (dotted-path resolution, renaming)
//!     |
//! [rewrite]              -> Vec<Rule> (functors, DNF, aggregation, denotations)
//!     |
//! [universe]              -> classification, injection inlining, recursion unrolling
//!     |
//! [translate]              -> ir::TranslatedRule (one predicate body, algebraic form)
//!     |
//! [codegen]                -> dialect-rendered SQL text
//! ```
//!
//! [`compile_source`] drives the whole pipeline for the common case: one
//! source file, one compile target, one dialect.
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `span` | Source text ownership and byte-range diagnostics |
//! | `lexer` | Whitespace/comment/bracket-aware span splitting primitives |
//! | `ast` | The closed, tagged-variant syntax tree |
//! | `builtins` | Names of the built-in operators/functions the parser lowers to |
//! | `parser` | Recursive-descent statement and expression parsing |
//! | `annotations` | `@Engine`/`@Ground`/... annotation-as-fact-rule table |
//! | `imports` | Dotted-path import resolution and predicate renaming |
//! | `rewrite` | Functor instantiation, DNF, aggregation, denotation promotion |
//! | `universe` | Predicate classification, injection inlining, recursion unrolling |
//! | `translate` | Rule body lowering to the algebraic IR |
//! | `ir` | The dialect-agnostic algebraic intermediate form |
//! | `dialect` | Per-engine SQL surface syntax strategy objects |
//! | `codegen` | IR-to-SQL-text rendering |
//! | `config` | `figment`-backed configuration loading |
//! | `json_export` | Stable AST-to-JSON contract (spec §6) |
//! | `capi` | C ABI wrapper over `json_export` |
//! | `error` | The crate's `thiserror` error types |

pub mod annotations;
pub mod ast;
pub mod builtins;
pub mod capi;
pub mod codegen;
pub mod config;
pub mod dialect;
pub mod error;
pub mod imports;
pub mod ir;
pub mod json_export;
pub mod lexer;
pub mod parser;
pub mod rewrite;
pub mod span;
pub mod translate;
pub mod universe;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub use ast::{Literal, ParsedFile, Rule, Statement};
pub use config::Config;
pub use dialect::Engine;
pub use error::{LogicaError, LogicaResult};
pub use imports::ImportResolver;
pub use span::{SourceBuffer, SourceSpan};
pub use universe::Universe;

/// Everything needed to compile one predicate to SQL: the pieces of
/// [`Config`] a single call actually varies, spelled out so callers don't
/// need to build a whole `Config` for a one-off compile.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub import_roots: Vec<PathBuf>,
    pub engine: Engine,
    pub recursion_default_depth: u32,
    pub flag_overrides: HashMap<String, Literal>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            import_roots: Vec::new(),
            engine: Engine::Sqlite,
            recursion_default_depth: universe::DEFAULT_RECURSION_DEPTH,
            flag_overrides: HashMap::new(),
        }
    }
}

impl From<&Config> for CompileOptions {
    fn from(config: &Config) -> Self {
        CompileOptions {
            import_roots: config.import_roots.clone(),
            engine: config.default_engine,
            recursion_default_depth: config.recursion_default_depth,
            flag_overrides: HashMap::new(),
        }
    }
}

/// Parse `source`, resolve its imports, run every rewrite pass, and return
/// the flat rule set plus the statements the annotation table should be
/// built from. Exposed separately from [`compile_source`] for callers that
/// want the intermediate rule set (the `parse-ast` CLI subcommand, tests).
#[tracing::instrument(skip(source), fields(file = %file_name))]
pub fn parse_and_rewrite(source: &str, file_name: &str, import_roots: &[PathBuf]) -> LogicaResult<(Vec<Rule>, Vec<Statement>)> {
    let buffer = Arc::new(SourceBuffer::new(file_name, source));
    let parsed = parser::parse_program(buffer)?;
    tracing::debug!(statements = parsed.statements.len(), "parsed source file");

    let mut resolver = ImportResolver::new(import_roots);
    let statements = resolver.resolve(parsed)?;
    tracing::debug!(statements = statements.len(), "resolved imports");

    let rule_count_before = statements.iter().filter(|s| matches!(s, Statement::Rule(_))).count();
    let rules = rewrite::rewrite_program(statements.clone())?;
    if rules.len() > rule_count_before.saturating_mul(50).max(64) {
        tracing::warn!(before = rule_count_before, after = rules.len(), "rewrite passes expanded rule count sharply");
    }
    tracing::debug!(rules = rules.len(), "rewrite complete");

    Ok((rules, statements))
}

/// Compile `target` out of `source` into one SQL statement for `options.engine`.
///
/// This is the library's single entry point for the common case: parse,
/// resolve imports, rewrite, build the predicate universe, and render SQL,
/// all in one call.
#[tracing::instrument(skip(source, options), fields(file = %file_name, target = %target))]
pub fn compile_source(source: &str, file_name: &str, target: &str, options: &CompileOptions) -> LogicaResult<String> {
    let (rules, statements) = parse_and_rewrite(source, file_name, &options.import_roots)?;
    let universe = Universe::build(rules, &statements, options.engine, options.recursion_default_depth)?;
    let dialect = universe.engine().dialect();
    universe.compile(target, dialect, &options.flag_overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_simple_join_end_to_end() {
        let source = "Parent(a, b) :- Friend(a, b);\nGrandparent(a, c) :- Parent(a, b), Parent(b, c);";
        let sql = compile_source(source, "t.l", "Grandparent", &CompileOptions::default()).unwrap();
        assert!(sql.contains("WITH"));
        assert!(sql.to_uppercase().contains("SELECT"));
    }

    #[test]
    fn reports_undefined_predicate_as_semantic_error() {
        let err = compile_source("P(x) :- Q(x);", "t.l", "P", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, LogicaError::Semantic { .. }));
    }
}
