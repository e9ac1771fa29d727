//! Abstract syntax tree for Logica programs.
//!
//! One tagged variant per syntactic category (spec §9 "dynamic dispatch over
//! AST kinds" redesign: the original's loosely-typed dictionaries become a
//! closed `enum` pattern-matched exhaustively everywhere). Every node that
//! can appear in a diagnostic carries a [`SourceSpan`] heritage so errors,
//! the JSON export, and round-trip tests can all recover the exact source
//! substring that produced it.

pub mod builders;

use crate::span::SourceSpan;
use serde::{Deserialize, Serialize};

/// A literal value appearing in source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Built-in aggregation operators usable in a `field? Op= expr` head field
/// or in a `combine Op= expr :- body` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOp {
    Sum,
    Count,
    ArrayConcat,
    Max,
    Min,
    ArgMax,
    ArgMin,
}

impl AggregateOp {
    /// The surface-syntax operator token, e.g. `+=`.
    pub fn token(self) -> &'static str {
        match self {
            AggregateOp::Sum => "+=",
            AggregateOp::Count => "Count=",
            AggregateOp::ArrayConcat => "++=",
            AggregateOp::Max => "Max=",
            AggregateOp::Min => "Min=",
            AggregateOp::ArgMax => "ArgMax=",
            AggregateOp::ArgMin => "ArgMin=",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+=" => Some(AggregateOp::Sum),
            "Count=" => Some(AggregateOp::Count),
            "++=" => Some(AggregateOp::ArrayConcat),
            "Max=" => Some(AggregateOp::Max),
            "Min=" => Some(AggregateOp::Min),
            "ArgMax=" => Some(AggregateOp::ArgMax),
            "ArgMin=" => Some(AggregateOp::ArgMin),
            _ => None,
        }
    }

    /// The bare operator name used by the `Op{expr :- body}` combine sugar,
    /// i.e. [`token`](Self::token) without its trailing `=`.
    pub fn bare_token(self) -> &'static str {
        match self {
            AggregateOp::Sum => "+",
            AggregateOp::Count => "Count",
            AggregateOp::ArrayConcat => "++",
            AggregateOp::Max => "Max",
            AggregateOp::Min => "Min",
            AggregateOp::ArgMax => "ArgMax",
            AggregateOp::ArgMin => "ArgMin",
        }
    }

    /// All operators, longest `token()` first so prefix-sensitive matching
    /// (`ArgMax=` before... none collide here, but kept consistent with
    /// `bare_token`'s ordering needs) picks the right one.
    pub fn all() -> [AggregateOp; 7] {
        [
            AggregateOp::ArgMax,
            AggregateOp::ArgMin,
            AggregateOp::Count,
            AggregateOp::ArrayConcat,
            AggregateOp::Max,
            AggregateOp::Min,
            AggregateOp::Sum,
        ]
    }
}

/// A field name in a record: either positional (auto-named `col0`, `col1`,
/// ...) or explicitly named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldName {
    Positional(usize),
    Named(String),
}

impl FieldName {
    /// The resolved column name: `colN` for positional fields.
    pub fn resolved(&self) -> String {
        match self {
            FieldName::Positional(i) => format!("col{i}"),
            FieldName::Named(name) => name.clone(),
        }
    }
}

/// One field of a record: `expr`, `name: expr`, or (head-only) `name? Op= expr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: FieldName,
    pub value: Expression,
    /// `Some` only for aggregating head fields (`name? Op= expr`).
    pub aggregate: Option<AggregateOp>,
}

/// A record literal: `(expr, name: expr, ..rest)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordExpr {
    pub fields: Vec<FieldValue>,
    /// The rest-of splat (`..var`), if present. Always last; unique.
    pub rest: Option<String>,
}

impl RecordExpr {
    pub fn empty() -> Self {
        RecordExpr {
            fields: Vec::new(),
            rest: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name.resolved() == name)
    }
}

/// `predicate_name(record)`, usable both as a body call and, for
/// value-producing calls, inside an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateCall {
    pub predicate_name: String,
    pub record: RecordExpr,
    pub heritage: SourceSpan,
}

/// `combine Op= expr :- body`, including its `Op{expr :- body}` sugar form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineExpr {
    pub op: AggregateOp,
    pub value: Box<Expression>,
    pub body: Box<Proposition>,
}

/// `if c1 then v1 else if c2 then v2 ... else vN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicationExpr {
    pub branches: Vec<(Proposition, Expression)>,
    pub else_value: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),
    Variable(String),
    Record(RecordExpr),
    List(Vec<Expression>),
    Call(Box<PredicateCall>),
    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    RecordSubscript {
        base: Box<Expression>,
        field: String,
    },
    Combine(Box<CombineExpr>),
    Implication(Box<ImplicationExpr>),
}

/// An expression, tagged by [`ExpressionKind`], with attached heritage.
/// `buffer[heritage.start..heritage.end]` always equals the exact substring
/// that produced this node (spec §8 "parse round-trip of heritage").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub heritage: SourceSpan,
}

impl Expression {
    pub fn new(kind: ExpressionKind, heritage: SourceSpan) -> Self {
        Expression { kind, heritage }
    }

    /// Variable names referenced anywhere inside this expression.
    pub fn free_variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_free_variables(&mut out);
        out
    }

    fn collect_free_variables(&self, out: &mut Vec<String>) {
        match &self.kind {
            ExpressionKind::Literal(_) => {}
            ExpressionKind::Variable(name) => {
                if name != "_" && !out.contains(name) {
                    out.push(name.clone());
                }
            }
            ExpressionKind::Record(r) => {
                for f in &r.fields {
                    f.value.collect_free_variables(out);
                }
            }
            ExpressionKind::List(items) => {
                for item in items {
                    item.collect_free_variables(out);
                }
            }
            ExpressionKind::Call(call) => {
                for f in &call.record.fields {
                    f.value.collect_free_variables(out);
                }
            }
            ExpressionKind::Subscript { base, index } => {
                base.collect_free_variables(out);
                index.collect_free_variables(out);
            }
            ExpressionKind::RecordSubscript { base, .. } => {
                base.collect_free_variables(out);
            }
            ExpressionKind::Combine(c) => {
                c.value.collect_free_variables(out);
            }
            ExpressionKind::Implication(i) => {
                for (_, v) in &i.branches {
                    v.collect_free_variables(out);
                }
                if let Some(e) = &i.else_value {
                    e.collect_free_variables(out);
                }
            }
        }
    }
}

/// A proposition, tagged by variant. A conjunction of a single element is
/// always normalized to that element (spec §3 invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proposition {
    Conjunction(Vec<Proposition>),
    Disjunction(Vec<Proposition>),
    Call(PredicateCall),
    Unification {
        left: Expression,
        right: Expression,
    },
    Inclusion {
        element: Expression,
        collection: Expression,
    },
    /// `~P`. Internally this is negation-as-aggregate: `IsNull(Combine(Min= 1 :- P))`.
    /// The translator, not the parser, performs that lowering.
    NegationAsAggregate(Box<Proposition>),
}

impl Proposition {
    /// Normalize a one-element conjunction to its sole member.
    pub fn conjunction(mut parts: Vec<Proposition>) -> Proposition {
        if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            Proposition::Conjunction(parts)
        }
    }
}

/// `order_by`, `limit`, `couldbe`, `cantbe`, `shouldbe` rule denotations.
/// `OrderBy`/`Limit` are promoted to sibling `@OrderBy`/`@Limit` annotation
/// rules by the rewriter; the assertion denotations are carried as metadata
/// only (spec has no interpreter to check them against — see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Denotation {
    OrderBy(Vec<(String, bool)>),
    Limit(u64),
    CouldBe(Expression),
    CantBe(Expression),
    ShouldBe(Expression),
}

/// Head call + optional body. Owns the `full_text` span covering the whole
/// statement, used to anchor semantic-error diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub head: PredicateCall,
    pub distinct: bool,
    pub denotations: Vec<Denotation>,
    pub body: Option<Proposition>,
    pub full_text: SourceSpan,
}

impl Rule {
    /// A rule with no body and no variables.
    pub fn is_fact(&self) -> bool {
        self.body.is_none() && self.head.record.fields.iter().all(|f| f.value.free_variables().is_empty())
    }

    /// `true` if the head assigns a value (`= expr` or `Op= expr`), i.e. the
    /// record carries a `logica_value` field.
    pub fn is_value_producing(&self) -> bool {
        self.head.record.field("logica_value").is_some()
    }

    pub fn is_aggregating(&self) -> bool {
        self.head.record.fields.iter().any(|f| f.aggregate.is_some())
    }
}

/// `NewName := Template(Slot: Value, ...)`, equivalently `@Make(NewName, Template, {...})`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctorApplication {
    pub new_name: String,
    pub template: String,
    pub slots: Vec<(String, String)>,
    pub heritage: SourceSpan,
}

/// `import a.b.Name [as Alias]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub path: Vec<String>,
    pub predicate_name: String,
    pub alias: Option<String>,
    pub heritage: SourceSpan,
}

/// One top-level statement, classified by the statement parser (spec §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Import(Import),
    Functor(FunctorApplication),
    Rule(Rule),
}

/// A parsed source file: its statements in source order, plus the file name
/// they came from (used by the import resolver for prefixing).
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub file_name: String,
    pub statements: Vec<Statement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn dummy_span() -> SourceSpan {
        Arc::new(SourceBuffer::new("t.l", "x")).whole_span()
    }

    #[test]
    fn free_variables_skip_underscore_and_dedup() {
        let span = dummy_span();
        let expr = Expression::new(
            ExpressionKind::List(vec![
                Expression::new(ExpressionKind::Variable("x".into()), span.clone()),
                Expression::new(ExpressionKind::Variable("_".into()), span.clone()),
                Expression::new(ExpressionKind::Variable("x".into()), span.clone()),
            ]),
            span,
        );
        assert_eq!(expr.free_variables(), vec!["x".to_string()]);
    }

    #[test]
    fn aggregate_op_token_round_trip() {
        for op in [
            AggregateOp::Sum,
            AggregateOp::Count,
            AggregateOp::ArrayConcat,
            AggregateOp::Max,
            AggregateOp::Min,
            AggregateOp::ArgMax,
            AggregateOp::ArgMin,
        ] {
            assert_eq!(AggregateOp::from_token(op.token()), Some(op));
        }
    }
}
