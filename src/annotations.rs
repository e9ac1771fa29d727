//! The nine recognized annotations (spec §6), each spelled as a fact-like
//! rule whose head predicate name is `@`-prefixed (e.g. `@Engine("sqlite")`).
//! This module is the single place that interprets that convention into
//! strongly typed directives; everywhere else in the pipeline an annotation
//! is just an ordinary [`crate::ast::Rule`] until it reaches here.

use crate::ast::{ExpressionKind, Literal, Rule, Statement};
use crate::dialect::Engine;
use crate::error::{LogicaError, LogicaResult};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone)]
pub enum Annotation {
    Engine { engine: Engine, type_checking: bool },
    Ground { predicate: String, external_table: Option<String> },
    With { predicate: String },
    OrderBy { predicate: String, columns: Vec<String> },
    Limit { predicate: String, n: u64 },
    NoInject { predicate: String },
    Recursive { predicate: String, depth: u32 },
    DefineFlag { name: String, default: Literal },
    CompileAsUdf { predicate: String },
}

/// Everything the universe needs from the program's annotations, indexed by
/// the predicate each one targets (`@Engine`/`@DefineFlag` are program-wide
/// and stored separately).
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    pub engine: Option<Engine>,
    pub type_checking: bool,
    pub grounded: IndexMap<String, Option<String>>,
    pub with_cte: IndexSet<String>,
    pub order_by: IndexMap<String, Vec<String>>,
    pub limit: IndexMap<String, u64>,
    pub no_inject: IndexSet<String>,
    pub recursion_depth: IndexMap<String, u32>,
    pub flags: IndexMap<String, Literal>,
    pub udfs: IndexSet<String>,
}

impl AnnotationTable {
    pub fn build(statements: &[Statement]) -> LogicaResult<Self> {
        let mut table = AnnotationTable::default();
        for statement in statements {
            let Statement::Rule(rule) = statement else { continue };
            if !rule.head.predicate_name.starts_with('@') {
                continue;
            }
            match parse_annotation(rule)? {
                Annotation::Engine { engine, type_checking } => {
                    table.engine = Some(engine);
                    table.type_checking = type_checking;
                }
                Annotation::Ground { predicate, external_table } => {
                    table.grounded.insert(predicate, external_table);
                }
                Annotation::With { predicate } => {
                    table.with_cte.insert(predicate);
                }
                Annotation::OrderBy { predicate, columns } => {
                    table.order_by.insert(predicate, columns);
                }
                Annotation::Limit { predicate, n } => {
                    table.limit.insert(predicate, n);
                }
                Annotation::NoInject { predicate } => {
                    table.no_inject.insert(predicate);
                }
                Annotation::Recursive { predicate, depth } => {
                    table.recursion_depth.insert(predicate, depth);
                }
                Annotation::DefineFlag { name, default } => {
                    table.flags.insert(name, default);
                }
                Annotation::CompileAsUdf { predicate } => {
                    table.udfs.insert(predicate);
                }
            }
        }
        Ok(table)
    }
}

fn parse_annotation(rule: &Rule) -> LogicaResult<Annotation> {
    let name = rule.head.predicate_name.as_str();
    let fields = &rule.head.record.fields;
    let span = || rule.full_text.clone();

    match name {
        "@Engine" => {
            let engine_name = string_arg(fields, 0, span())?;
            let engine = Engine::from_name(&engine_name)
                .ok_or_else(|| LogicaError::semantic(format!("unknown engine '{engine_name}'"), span()))?;
            let type_checking = fields
                .iter()
                .find(|f| matches!(&f.name, crate::ast::FieldName::Named(n) if n == "type_checking"))
                .map(|f| matches!(&f.value.kind, ExpressionKind::Literal(Literal::Bool(true))))
                .unwrap_or(false);
            Ok(Annotation::Engine { engine, type_checking })
        }
        "@Ground" => {
            let predicate = identifier_arg(fields, 0, span())?;
            let external_table = fields.get(1).and_then(|f| match &f.value.kind {
                ExpressionKind::Literal(Literal::String(s)) => Some(s.clone()),
                _ => None,
            });
            Ok(Annotation::Ground { predicate, external_table })
        }
        "@With" => Ok(Annotation::With { predicate: identifier_arg(fields, 0, span())? }),
        "@OrderBy" => {
            let predicate = identifier_arg(fields, 0, span())?;
            let columns = fields[1..]
                .iter()
                .map(|f| match &f.value.kind {
                    ExpressionKind::Literal(Literal::String(s)) => Ok(s.clone()),
                    ExpressionKind::Variable(v) => Ok(v.clone()),
                    _ => Err(LogicaError::semantic("@OrderBy columns must be names or strings", span())),
                })
                .collect::<LogicaResult<Vec<_>>>()?;
            Ok(Annotation::OrderBy { predicate, columns })
        }
        "@Limit" => {
            let predicate = identifier_arg(fields, 0, span())?;
            let n = int_arg(fields, 1, span())?;
            Ok(Annotation::Limit { predicate, n: n as u64 })
        }
        "@NoInject" => Ok(Annotation::NoInject { predicate: identifier_arg(fields, 0, span())? }),
        "@Recursive" => {
            let predicate = identifier_arg(fields, 0, span())?;
            let depth = int_arg(fields, 1, span())?;
            Ok(Annotation::Recursive { predicate, depth: depth as u32 })
        }
        "@DefineFlag" => {
            let flag_name = identifier_arg(fields, 0, span())?;
            let default = fields
                .get(1)
                .map(|f| literal_arg(f, span()))
                .transpose()?
                .unwrap_or(Literal::Null);
            Ok(Annotation::DefineFlag { name: flag_name, default })
        }
        "@CompileAsUdf" => Ok(Annotation::CompileAsUdf { predicate: identifier_arg(fields, 0, span())? }),
        "@Make" => Err(LogicaError::semantic(
            "@Make should have been consumed by functor expansion before annotation collection",
            span(),
        )),
        other => Err(LogicaError::semantic(format!("unrecognized annotation '{other}'"), span())),
    }
}

fn string_arg(fields: &[crate::ast::FieldValue], idx: usize, span: crate::span::SourceSpan) -> LogicaResult<String> {
    match fields.get(idx).map(|f| &f.value.kind) {
        Some(ExpressionKind::Literal(Literal::String(s))) => Ok(s.clone()),
        _ => Err(LogicaError::semantic("expected a string argument", span)),
    }
}

fn identifier_arg(fields: &[crate::ast::FieldValue], idx: usize, span: crate::span::SourceSpan) -> LogicaResult<String> {
    match fields.get(idx).map(|f| &f.value.kind) {
        Some(ExpressionKind::Variable(v)) => Ok(v.clone()),
        Some(ExpressionKind::Literal(Literal::String(s))) => Ok(s.clone()),
        _ => Err(LogicaError::semantic("expected a predicate name argument", span)),
    }
}

fn int_arg(fields: &[crate::ast::FieldValue], idx: usize, span: crate::span::SourceSpan) -> LogicaResult<i64> {
    match fields.get(idx).map(|f| &f.value.kind) {
        Some(ExpressionKind::Literal(Literal::Int(n))) => Ok(*n),
        _ => Err(LogicaError::semantic("expected an integer argument", span)),
    }
}

fn literal_arg(field: &crate::ast::FieldValue, span: crate::span::SourceSpan) -> LogicaResult<Literal> {
    match &field.value.kind {
        ExpressionKind::Literal(l) => Ok(l.clone()),
        _ => Err(LogicaError::semantic("expected a literal default value", span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn statements(text: &str) -> Vec<Statement> {
        parse_program(Arc::new(SourceBuffer::new("t.l", text))).unwrap().statements
    }

    #[test]
    fn collects_engine_annotation() {
        let stmts = statements(r#"@Engine("sqlite"); P(x) :- Q(x);"#);
        let table = AnnotationTable::build(&stmts).unwrap();
        assert!(matches!(table.engine, Some(Engine::Sqlite)));
    }

    #[test]
    fn collects_recursive_depth_override() {
        let stmts = statements("@Recursive(N, 20); N(0); N(n+1) :- N(n);");
        let table = AnnotationTable::build(&stmts).unwrap();
        assert_eq!(table.recursion_depth.get("N"), Some(&20));
    }

    #[test]
    fn collects_no_inject_and_with() {
        let stmts = statements("@NoInject(P); @With(Q); P(x) :- R(x); Q(x) :- R(x);");
        let table = AnnotationTable::build(&stmts).unwrap();
        assert!(table.no_inject.contains("P"));
        assert!(table.with_cte.contains("Q"));
    }
}
