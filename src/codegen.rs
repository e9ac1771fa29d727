//! SQL writer (spec §4.5): turns an ordered list of predicate CTEs plus a
//! target name into one dialect-rendered SQL statement. This is the only
//! module that knows SQL surface syntax — everything it consumes (`ir::*`)
//! is already a plain, dialect-agnostic algebraic shape.

use crate::ast::{AggregateOp, Literal};
use crate::dialect::Dialect;
use crate::error::LogicaResult;
use crate::ir::{AggregateColumn, SqlExpr, SubQueryKind, TableSource, TranslatedRule};

/// Assemble the full `WITH ... SELECT ...` statement for `target`. `ctes` is
/// in dependency order (callees first); each entry is `(name, alternatives,
/// distinct)` where `alternatives` are the rule's (post-DNF) disjuncts,
/// unioned with `UNION` when `distinct` else `UNION ALL`.
pub fn render_program(
    dialect: &dyn Dialect,
    ctes: &[(String, Vec<TranslatedRule>, bool)],
    target: &str,
    order_by: Option<&[String]>,
    limit: Option<u64>,
) -> LogicaResult<String> {
    let mut out = String::new();
    if !ctes.is_empty() {
        out.push_str("WITH ");
        for (i, (name, rules, distinct)) in ctes.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            out.push_str(&dialect.quote_ident(name));
            out.push_str(" AS (\n");
            out.push_str(&render_union(dialect, rules, *distinct)?);
            out.push_str("\n)");
        }
        out.push('\n');
    }
    out.push_str(&format!("SELECT * FROM {}", dialect.quote_ident(target)));
    if let Some(cols) = order_by {
        if !cols.is_empty() {
            out.push(' ');
            out.push_str(&render_order_by(dialect, cols));
        }
    }
    if let Some(n) = limit {
        out.push(' ');
        out.push_str(&dialect.limit_clause(n));
    }
    Ok(out)
}

/// `SELECT * FROM <table>`, for compiling a `@Ground`-ed predicate directly.
pub fn render_external_select(dialect: &dyn Dialect, table: &str) -> String {
    format!("SELECT * FROM {}", dialect.quote_ident(table))
}

fn render_union(dialect: &dyn Dialect, rules: &[TranslatedRule], distinct: bool) -> LogicaResult<String> {
    let op = if distinct { "UNION" } else { "UNION ALL" };
    let rendered = rules.iter().map(|r| render_rule(dialect, r)).collect::<LogicaResult<Vec<_>>>()?;
    if rendered.is_empty() {
        return Ok("SELECT 1 WHERE 1 = 0".to_string());
    }
    Ok(rendered.join(&format!("\n{op}\n")))
}

fn render_rule(dialect: &dyn Dialect, rule: &TranslatedRule) -> LogicaResult<String> {
    let mut select_list = Vec::new();
    let mut group_by_list = Vec::new();

    if let Some(agg) = &rule.aggregation {
        for col in &agg.group_by {
            let rendered = render_expr(dialect, &col.expr)?;
            select_list.push(format!("{} AS {}", rendered, dialect.quote_ident(&col.name)));
            group_by_list.push(rendered);
        }
        for col in &agg.aggregates {
            select_list.push(format!("{} AS {}", render_aggregate(dialect, col)?, dialect.quote_ident(&col.name)));
        }
    } else {
        for col in &rule.columns {
            let rendered = render_expr(dialect, &col.expr)?;
            select_list.push(format!("{} AS {}", rendered, dialect.quote_ident(&col.name)));
        }
    }
    if select_list.is_empty() {
        select_list.push("1 AS logica_value".to_string());
    }

    let mut from_list = Vec::new();
    for t in &rule.tables {
        let source = match &t.source {
            TableSource::Cte(name) => dialect.quote_ident(name),
            TableSource::External(name) => dialect.quote_ident(name),
        };
        from_list.push(format!("{} AS {}", source, dialect.quote_ident(&t.alias)));
    }

    let mut sql = String::from("SELECT ");
    if rule.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&select_list.join(", "));
    if !from_list.is_empty() {
        sql.push_str("\nFROM ");
        sql.push_str(&from_list.join(", "));
    }
    if !rule.constraints.is_empty() {
        let rendered = rule.constraints.iter().map(|c| render_expr(dialect, &c.expr)).collect::<LogicaResult<Vec<_>>>()?;
        sql.push_str("\nWHERE ");
        sql.push_str(&rendered.join(" AND "));
    }
    if !group_by_list.is_empty() {
        sql.push_str("\nGROUP BY ");
        sql.push_str(&group_by_list.join(", "));
    }
    Ok(sql)
}

fn render_aggregate(dialect: &dyn Dialect, col: &AggregateColumn) -> LogicaResult<String> {
    let expr = render_expr(dialect, &col.expr)?;
    Ok(match col.op {
        AggregateOp::Sum => format!("SUM({expr})"),
        AggregateOp::Count => format!("COUNT({expr})"),
        AggregateOp::ArrayConcat => dialect.array_concat_agg(&expr, false),
        AggregateOp::Max => format!("MAX({expr})"),
        AggregateOp::Min => format!("MIN({expr})"),
        // Without separate value/key syntax, order by the aggregated
        // expression itself (see DESIGN.md).
        AggregateOp::ArgMax => dialect.arg_aggregate(true, &expr, &expr),
        AggregateOp::ArgMin => dialect.arg_aggregate(false, &expr, &expr),
    })
}

fn render_expr(dialect: &dyn Dialect, expr: &SqlExpr) -> LogicaResult<String> {
    match expr {
        SqlExpr::Column(c) => Ok(format!("{}.{}", dialect.quote_ident(&c.alias), dialect.quote_ident(&c.field))),
        SqlExpr::Literal(l) => Ok(render_literal(dialect, l)),
        SqlExpr::Array(items) => {
            let rendered = items.iter().map(|i| render_expr(dialect, i)).collect::<LogicaResult<Vec<_>>>()?;
            Ok(dialect.array_literal(&rendered))
        }
        SqlExpr::FunctionCall { name, args } => {
            let rendered = args.iter().map(|a| render_expr(dialect, a)).collect::<LogicaResult<Vec<_>>>()?;
            dialect.builtin_call(name, &rendered)
        }
        SqlExpr::Subquery(sq) => {
            let inner = render_rule(dialect, &sq.rule)?;
            match &sq.kind {
                SubQueryKind::Negation => Ok(format!("(NOT EXISTS (\n{inner}\n))")),
                SubQueryKind::Scalar => Ok(format!("(\n{inner}\n{}\n)", dialect.limit_clause(1))),
            }
        }
        SqlExpr::Case { branches, or_else } => {
            let mut s = "CASE".to_string();
            for (c, v) in branches {
                s.push_str(&format!(" WHEN {} THEN {}", render_expr(dialect, c)?, render_expr(dialect, v)?));
            }
            if let Some(e) = or_else {
                s.push_str(&format!(" ELSE {}", render_expr(dialect, e)?));
            }
            s.push_str(" END");
            Ok(s)
        }
    }
}

fn render_literal(dialect: &dyn Dialect, literal: &Literal) -> String {
    match literal {
        Literal::Int(n) => n.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::String(s) => dialect.string_literal(s),
        Literal::Bool(b) => dialect.bool_literal(*b),
        Literal::Null => dialect.null_literal().to_string(),
    }
}

fn render_order_by(dialect: &dyn Dialect, columns: &[String]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut split = c.splitn(2, ' ');
            let ident = split.next().unwrap_or(c.as_str());
            match split.next() {
                Some(suffix) => format!("{} {}", dialect.quote_ident(ident), suffix),
                None => dialect.quote_ident(ident),
            }
        })
        .collect();
    format!("ORDER BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;
    use crate::ir::{ColumnRef, Constraint, OutputColumn, TableRef};

    fn simple_rule() -> TranslatedRule {
        TranslatedRule {
            tables: vec![TableRef { alias: "t0".into(), source: TableSource::Cte("A".into()) }],
            constraints: vec![Constraint { expr: SqlExpr::call(crate::builtins::GREATER, vec![SqlExpr::Column(ColumnRef { alias: "t0".into(), field: "x".into() }), SqlExpr::Literal(Literal::Int(0))]) }],
            columns: vec![OutputColumn { name: "x".into(), expr: SqlExpr::Column(ColumnRef { alias: "t0".into(), field: "x".into() }) }],
            aggregation: None,
            distinct: true,
        }
    }

    #[test]
    fn renders_select_from_where() {
        let sql = render_union(&Sqlite, &[simple_rule()], true).unwrap();
        assert!(sql.contains("SELECT DISTINCT"));
        assert!(sql.contains("FROM \"A\" AS \"t0\""));
        assert!(sql.contains("WHERE"));
    }

    #[test]
    fn renders_program_with_with_clause_and_limit() {
        let sql = render_program(&Sqlite, &[("A".to_string(), vec![simple_rule()], true)], "A", None, Some(5)).unwrap();
        assert!(sql.starts_with("WITH \"A\" AS ("));
        assert!(sql.contains("LIMIT 5"));
    }
}
