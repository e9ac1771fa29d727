//! Relational-algebra-like intermediate form (spec §3 `TranslatedRule`, §4.5).
//!
//! The translator lowers one normalized, conjunctive rule body into this
//! algebraic shape; the SQL writer (`codegen`) is the only consumer and the
//! only place that knows what a target dialect's surface syntax looks like.
//! Every free variable in a rule is bound by some column here (spec §3
//! `SqlFragment` invariant) — the translator is responsible for that, not
//! this module.

use crate::ast::{AggregateOp, Literal};

/// A table participating in one rule body: either a materialized predicate
/// (emitted earlier as a CTE) or a grounded external table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub alias: String,
    pub source: TableSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// References a CTE already emitted for predicate `name`.
    Cte(String),
    /// References a `@Ground`-ed external table by its engine-qualified name.
    External(String),
}

/// A scalar SQL expression. Deliberately small: everything not representable
/// here (arithmetic, comparisons, string ops, ...) has already been lowered
/// to a `FunctionCall` against a builtin name by the expression parser
/// (`crate::builtins`); `codegen::Dialect` maps those names to native syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column(ColumnRef),
    Literal(Literal),
    /// A list literal (spec §9 array builtins: `Element`, `ArrayToString`, `Size`).
    Array(Vec<SqlExpr>),
    FunctionCall {
        name: String,
        args: Vec<SqlExpr>,
    },
    /// A correlated scalar subquery: negation, `combine`, and `if/then/else`
    /// implications (spec §4.5 "sub-queries").
    Subquery(Box<SubQuery>),
    /// `CASE WHEN c1 THEN v1 WHEN c2 THEN v2 ... ELSE vN END`, the lowering
    /// target for implication expressions whose branches are all in-scope
    /// (no correlated sub-evaluation needed).
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        or_else: Option<Box<SqlExpr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub alias: String,
    pub field: String,
}

impl SqlExpr {
    pub fn col(alias: impl Into<String>, field: impl Into<String>) -> Self {
        SqlExpr::Column(ColumnRef {
            alias: alias.into(),
            field: field.into(),
        })
    }

    pub fn call(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::FunctionCall {
            name: name.into(),
            args,
        }
    }
}

/// A self-contained query used inside a correlated subquery expression: its
/// own tables/constraints/columns, plus the names of outer-scope columns it
/// references (for dialects that need explicit correlation hints — none of
/// the four supported dialects do, but the list documents the correlation).
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub kind: SubQueryKind,
    pub rule: Box<TranslatedRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubQueryKind {
    /// `~P`, lowered to a `NOT EXISTS` check over `P`'s own translated body
    /// (spec §4.5: equivalent to `IsNull(Combine(Min= 1 :- P))` but avoids
    /// routing plain negation through the aggregation machinery).
    Negation,
    /// A reference to a value-producing predicate (aggregating or not) used
    /// in expression position: selects that predicate's already-materialized
    /// `logica_value` column, correlated to the outer scope, `LIMIT 1`.
    Scalar,
}

/// A non-equality WHERE fragment: `left <op> right` where `<op>` is already
/// baked into `left`/`right` via a builtin `FunctionCall` (e.g. `Greater`),
/// so in practice every constraint is just "this boolean expression must be
/// true". Kept as a dedicated type rather than folding into `columns` so
/// codegen can place these under `WHERE` rather than `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: SqlExpr,
}

/// One projected output column: `SELECT <expr> AS <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub expr: SqlExpr,
}

/// `GROUP BY` keys plus aggregate projections, for a rule whose head carries
/// `name? Op= expr` fields (spec §4.5 "for aggregating heads").
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub group_by: Vec<OutputColumn>,
    pub aggregates: Vec<AggregateColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub name: String,
    pub op: AggregateOp,
    pub expr: SqlExpr,
}

/// One disjunct of one predicate, fully lowered. A predicate with several
/// (post-DNF) rules becomes several `TranslatedRule`s unioned together by
/// codegen (`UNION` for plain rules, `UNION ALL` pre-distinct for aggregating
/// ones — see `codegen::emit_predicate`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslatedRule {
    pub tables: Vec<TableRef>,
    pub constraints: Vec<Constraint>,
    pub columns: Vec<OutputColumn>,
    pub aggregation: Option<AggregateSpec>,
    pub distinct: bool,
}

impl TranslatedRule {
    pub fn new() -> Self {
        TranslatedRule::default()
    }
}
