//! Rule translator (spec §4.4/§4.5): lowers one conjunctive, already-DNF'd
//! rule body into [`crate::ir::TranslatedRule`]. Variable unification is
//! resolved by treating the first call-site occurrence of a variable as its
//! canonical representative column — every later occurrence becomes an
//! equality constraint against that column, which is union-find with the
//! first-seen binding always chosen as the root.
//!
//! This module never decides *what* a predicate name resolves to (a CTE, an
//! external table, or an inlined copy of its own body) — that is the
//! universe's job, handed in here through the [`SourceResolver`] trait so
//! the translator stays a pure `Rule -> TranslatedRule` function.

use crate::ast::{Expression, ExpressionKind, ImplicationExpr, PredicateCall, Proposition, Rule};
use crate::builtins;
use crate::error::{LogicaError, LogicaResult};
use crate::ir::{
    AggregateColumn, AggregateSpec, Constraint, OutputColumn, SqlExpr, SubQuery, SubQueryKind, TableRef, TableSource,
    TranslatedRule,
};
use crate::span::SourceSpan;
use indexmap::IndexMap;

/// Resolves a predicate name referenced in a rule body to the physical
/// table it compiles against. Implemented by [`crate::universe::Universe`],
/// which alone knows predicate classification and CTE naming.
pub trait SourceResolver {
    fn resolve(&self, predicate_name: &str, span: &SourceSpan) -> LogicaResult<TableSource>;
}

/// `flags` supplies the resolved value (caller override, or the
/// `@DefineFlag` default) for every declared flag, made available to
/// [`Expression::Variable`] lookups the same way a bound rule variable
/// would be, anywhere in the rule including nested negation/value subqueries.
pub fn translate_rule(rule: &Rule, resolver: &dyn SourceResolver, flags: &IndexMap<String, SqlExpr>) -> LogicaResult<TranslatedRule> {
    let mut translator = Translator { resolver, alias_counter: 0, flags };
    let atoms = flatten_body(rule.body.as_ref());
    let (mut translated, var_binding) = translator.translate_conjunction(&atoms, IndexMap::new())?;

    if rule.is_aggregating() {
        let mut group_by = Vec::new();
        let mut aggregates = Vec::new();
        for field in &rule.head.record.fields {
            let name = field.name.resolved();
            let expr = translator.compile_expr(&field.value, &var_binding)?;
            match field.aggregate {
                Some(op) => aggregates.push(AggregateColumn { name, op, expr }),
                None => group_by.push(OutputColumn { name, expr }),
            }
        }
        translated.aggregation = Some(AggregateSpec { group_by, aggregates });
    } else {
        let mut columns = Vec::with_capacity(rule.head.record.fields.len());
        for field in &rule.head.record.fields {
            let expr = translator.compile_expr(&field.value, &var_binding)?;
            columns.push(OutputColumn { name: field.name.resolved(), expr });
        }
        translated.columns = columns;
    }
    translated.distinct = rule.distinct;
    Ok(translated)
}

struct Translator<'a> {
    resolver: &'a dyn SourceResolver,
    alias_counter: usize,
    flags: &'a IndexMap<String, SqlExpr>,
}

impl<'a> Translator<'a> {
    fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_counter);
        self.alias_counter += 1;
        alias
    }

    /// Lower a flattened list of atomic propositions into tables +
    /// constraints, returning the resolved variable bindings alongside so
    /// the caller can project the rule's head against them. `seed` carries
    /// bindings already resolved in an enclosing scope, for a correlated
    /// negation subquery.
    fn translate_conjunction(
        &mut self,
        atoms: &[Proposition],
        seed: IndexMap<String, SqlExpr>,
    ) -> LogicaResult<(TranslatedRule, IndexMap<String, SqlExpr>)> {
        let mut var_binding = seed;
        let mut tables = Vec::new();
        let mut constraints = Vec::new();
        let mut call_sites: Vec<(String, &PredicateCall)> = Vec::new();

        for atom in atoms {
            if let Proposition::Call(call) = atom {
                if builtins::is_builtin(&call.predicate_name) {
                    continue;
                }
                let alias = self.next_alias();
                let source = self.resolver.resolve(&call.predicate_name, &call.heritage)?;
                tables.push(TableRef { alias: alias.clone(), source });
                for field in &call.record.fields {
                    if let ExpressionKind::Variable(v) = &field.value.kind {
                        if v == "_" {
                            continue;
                        }
                        let col = SqlExpr::col(alias.clone(), field.name.resolved());
                        if let Some(existing) = var_binding.get(v) {
                            constraints.push(Constraint { expr: SqlExpr::call(builtins::EQUALS, vec![existing.clone(), col]) });
                        } else {
                            var_binding.insert(v.clone(), col);
                        }
                    }
                }
                call_sites.push((alias, call));
            }
        }

        let mut consumed = vec![false; atoms.len()];
        for _ in 0..=atoms.len() {
            let mut progressed = false;
            for (i, atom) in atoms.iter().enumerate() {
                if consumed[i] {
                    continue;
                }
                let Proposition::Unification { left, right } = atom else { continue };
                let left_fresh = is_fresh_var(left, &var_binding);
                let right_fresh = is_fresh_var(right, &var_binding);
                if left_fresh && !right_fresh {
                    if let Ok(rhs) = self.compile_expr(right, &var_binding) {
                        if let ExpressionKind::Variable(v) = &left.kind {
                            var_binding.insert(v.clone(), rhs);
                            consumed[i] = true;
                            progressed = true;
                        }
                    }
                } else if right_fresh && !left_fresh {
                    if let Ok(lhs) = self.compile_expr(left, &var_binding) {
                        if let ExpressionKind::Variable(v) = &right.kind {
                            var_binding.insert(v.clone(), lhs);
                            consumed[i] = true;
                            progressed = true;
                        }
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        for (alias, call) in &call_sites {
            for field in &call.record.fields {
                if matches!(&field.value.kind, ExpressionKind::Variable(_)) {
                    continue;
                }
                let expr = self.compile_expr(&field.value, &var_binding)?;
                let col = SqlExpr::col(alias.clone(), field.name.resolved());
                constraints.push(Constraint { expr: SqlExpr::call(builtins::EQUALS, vec![col, expr]) });
            }
        }

        for (i, atom) in atoms.iter().enumerate() {
            match atom {
                Proposition::Call(call) if builtins::is_builtin(&call.predicate_name) => {
                    let args = call
                        .record
                        .fields
                        .iter()
                        .map(|f| self.compile_expr(&f.value, &var_binding))
                        .collect::<LogicaResult<Vec<_>>>()?;
                    constraints.push(Constraint { expr: SqlExpr::call(call.predicate_name.clone(), args) });
                }
                Proposition::Call(_) => {}
                Proposition::Unification { left, right } => {
                    if consumed[i] {
                        continue;
                    }
                    let l = self.compile_expr(left, &var_binding)?;
                    let r = self.compile_expr(right, &var_binding)?;
                    constraints.push(Constraint { expr: SqlExpr::call(builtins::EQUALS, vec![l, r]) });
                }
                Proposition::Inclusion { element, collection } => {
                    let e = self.compile_expr(element, &var_binding)?;
                    let c = self.compile_expr(collection, &var_binding)?;
                    constraints.push(Constraint { expr: SqlExpr::call(builtins::IN, vec![e, c]) });
                }
                Proposition::NegationAsAggregate(inner) => {
                    constraints.push(Constraint { expr: self.compile_negation_expr(inner, &var_binding)? });
                }
                Proposition::Conjunction(_) | Proposition::Disjunction(_) => {
                    return Err(LogicaError::semantic(
                        "rule body reached the translator without being fully flattened",
                        call_sites
                            .first()
                            .map(|(_, c)| c.heritage.clone())
                            .unwrap_or_else(|| dummy_span()),
                    ));
                }
            }
        }

        let translated = TranslatedRule { tables, constraints, columns: Vec::new(), aggregation: None, distinct: false };
        Ok((translated, var_binding))
    }

    fn compile_expr(&mut self, expr: &Expression, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        match &expr.kind {
            ExpressionKind::Literal(l) => Ok(SqlExpr::Literal(l.clone())),
            ExpressionKind::Variable(v) => var_binding
                .get(v)
                .or_else(|| self.flags.get(v))
                .cloned()
                .ok_or_else(|| LogicaError::semantic(format!("unbound variable '{v}'"), expr.heritage.clone())),
            ExpressionKind::List(items) => {
                let compiled = items.iter().map(|i| self.compile_expr(i, var_binding)).collect::<LogicaResult<Vec<_>>>()?;
                Ok(SqlExpr::Array(compiled))
            }
            ExpressionKind::Subscript { base, index } => {
                let b = self.compile_expr(base, var_binding)?;
                let i = self.compile_expr(index, var_binding)?;
                Ok(SqlExpr::call(builtins::ELEMENT, vec![b, i]))
            }
            ExpressionKind::RecordSubscript { base, field } => {
                let b = self.compile_expr(base, var_binding)?;
                Ok(SqlExpr::call(builtins::ELEMENT, vec![b, SqlExpr::Literal(crate::ast::Literal::String(field.clone()))]))
            }
            ExpressionKind::Record(_) => {
                Err(LogicaError::semantic("record-valued expressions cannot be used as a scalar SQL value", expr.heritage.clone()))
            }
            ExpressionKind::Call(call) => self.compile_value_call(call, var_binding),
            ExpressionKind::Combine(_) => Err(LogicaError::semantic(
                "combine expressions must be rewritten to a predicate call before translation",
                expr.heritage.clone(),
            )),
            ExpressionKind::Implication(implication) => self.compile_implication(implication, var_binding),
        }
    }

    /// A predicate reference used in expression position (e.g. a `-->`
    /// function rule's call, or the call a combine expression was rewritten
    /// into): a correlated scalar subquery selecting `logica_value`.
    fn compile_value_call(&mut self, call: &PredicateCall, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        let source = self.resolver.resolve(&call.predicate_name, &call.heritage)?;
        let alias = self.next_alias();
        let mut constraints = Vec::new();
        for field in &call.record.fields {
            let expr = self.compile_expr(&field.value, var_binding)?;
            constraints.push(Constraint {
                expr: SqlExpr::call(builtins::EQUALS, vec![SqlExpr::col(alias.clone(), field.name.resolved()), expr]),
            });
        }
        let inner = TranslatedRule {
            tables: vec![TableRef { alias: alias.clone(), source }],
            constraints,
            columns: vec![OutputColumn { name: "logica_value".to_string(), expr: SqlExpr::col(alias, "logica_value") }],
            aggregation: None,
            distinct: false,
        };
        Ok(SqlExpr::Subquery(Box::new(SubQuery { kind: SubQueryKind::Scalar, rule: Box::new(inner) })))
    }

    fn compile_negation_expr(&mut self, inner: &Proposition, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        let atoms = flatten_body(Some(inner));
        let mut free = Vec::new();
        proposition_free_variables(inner, &mut free);
        let seed: IndexMap<String, SqlExpr> =
            free.into_iter().filter_map(|v| var_binding.get(&v).map(|e| (v, e.clone()))).collect();
        let (mut inner_rule, _) = self.translate_conjunction(&atoms, seed)?;
        inner_rule.columns = vec![OutputColumn { name: "one".to_string(), expr: SqlExpr::Literal(crate::ast::Literal::Int(1)) }];
        Ok(SqlExpr::Subquery(Box::new(SubQuery { kind: SubQueryKind::Negation, rule: Box::new(inner_rule) })))
    }

    fn compile_implication(&mut self, implication: &ImplicationExpr, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        let mut branches = Vec::with_capacity(implication.branches.len());
        for (cond, val) in &implication.branches {
            let c = self.compile_condition(cond, var_binding)?;
            let v = self.compile_expr(val, var_binding)?;
            branches.push((c, v));
        }
        let or_else = implication
            .else_value
            .as_ref()
            .map(|e| self.compile_expr(e, var_binding))
            .transpose()?
            .map(Box::new);
        Ok(SqlExpr::Case { branches, or_else })
    }

    /// Compile a proposition used as a `CASE WHEN` condition: a purely
    /// scalar boolean, never a new joined table. A bare call to a
    /// non-builtin predicate is rejected since it would need its own
    /// `EXISTS` subquery, which implications don't support here.
    fn compile_condition(&mut self, prop: &Proposition, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        match prop {
            Proposition::Unification { left, right } => {
                let l = self.compile_expr(left, var_binding)?;
                let r = self.compile_expr(right, var_binding)?;
                Ok(SqlExpr::call(builtins::EQUALS, vec![l, r]))
            }
            Proposition::Inclusion { element, collection } => {
                let e = self.compile_expr(element, var_binding)?;
                let c = self.compile_expr(collection, var_binding)?;
                Ok(SqlExpr::call(builtins::IN, vec![e, c]))
            }
            Proposition::Call(call) if builtins::is_builtin(&call.predicate_name) => {
                let args = call
                    .record
                    .fields
                    .iter()
                    .map(|f| self.compile_expr(&f.value, var_binding))
                    .collect::<LogicaResult<Vec<_>>>()?;
                Ok(SqlExpr::call(call.predicate_name.clone(), args))
            }
            Proposition::Call(call) => Err(LogicaError::semantic(
                format!("predicate '{}' cannot be used directly as a boolean condition", call.predicate_name),
                call.heritage.clone(),
            )),
            Proposition::Conjunction(parts) => self.fold_condition(parts, builtins::AND, var_binding),
            Proposition::Disjunction(parts) => self.fold_condition(parts, builtins::OR, var_binding),
            Proposition::NegationAsAggregate(inner) => self.compile_negation_expr(inner, var_binding),
        }
    }

    fn fold_condition(&mut self, parts: &[Proposition], op: &str, var_binding: &IndexMap<String, SqlExpr>) -> LogicaResult<SqlExpr> {
        let mut compiled = parts.iter().map(|p| self.compile_condition(p, var_binding)).collect::<LogicaResult<Vec<_>>>()?;
        if compiled.is_empty() {
            return Err(LogicaError::dialect("empty conjunction/disjunction in condition position"));
        }
        let mut acc = compiled.remove(0);
        for next in compiled {
            acc = SqlExpr::call(op, vec![acc, next]);
        }
        Ok(acc)
    }
}

fn is_fresh_var(expr: &Expression, var_binding: &IndexMap<String, SqlExpr>) -> bool {
    matches!(&expr.kind, ExpressionKind::Variable(v) if v != "_" && !var_binding.contains_key(v))
}

fn flatten_body(body: Option<&Proposition>) -> Vec<Proposition> {
    let mut atoms = Vec::new();
    if let Some(prop) = body {
        flatten_into(prop, &mut atoms);
    }
    atoms
}

fn flatten_into(prop: &Proposition, out: &mut Vec<Proposition>) {
    match prop {
        Proposition::Conjunction(parts) => {
            for p in parts {
                flatten_into(p, out);
            }
        }
        other => out.push(other.clone()),
    }
}

fn proposition_free_variables(prop: &Proposition, out: &mut Vec<String>) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                proposition_free_variables(p, out);
            }
        }
        Proposition::Call(call) => {
            for f in &call.record.fields {
                for v in f.value.free_variables() {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
            }
        }
        Proposition::Unification { left, right } => {
            for v in left.free_variables().into_iter().chain(right.free_variables()) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        Proposition::Inclusion { element, collection } => {
            for v in element.free_variables().into_iter().chain(collection.free_variables()) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        Proposition::NegationAsAggregate(inner) => proposition_free_variables(inner, out),
    }
}

fn dummy_span() -> SourceSpan {
    use std::sync::Arc;
    Arc::new(crate::span::SourceBuffer::new("<translate>", "")).whole_span()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::parser::parse_program;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    struct StubResolver;
    impl SourceResolver for StubResolver {
        fn resolve(&self, predicate_name: &str, _span: &SourceSpan) -> LogicaResult<TableSource> {
            Ok(TableSource::Cte(predicate_name.to_string()))
        }
    }

    fn rule_from(text: &str) -> Rule {
        let parsed = parse_program(Arc::new(SourceBuffer::new("t.l", text))).unwrap();
        match parsed.statements.into_iter().next().unwrap() {
            Statement::Rule(r) => r,
            _ => panic!("expected a rule"),
        }
    }

    #[test]
    fn translates_join_and_projects_head() {
        let rule = rule_from("P(x, y) :- A(x, y), B(y);");
        let translated = translate_rule(&rule, &StubResolver, &IndexMap::new()).unwrap();
        assert_eq!(translated.tables.len(), 2);
        assert_eq!(translated.columns.len(), 2);
        assert_eq!(translated.constraints.len(), 1); // y unified between A and B
    }

    #[test]
    fn translates_literal_field_as_constraint() {
        let rule = rule_from("P(x) :- A(x, 5);");
        let translated = translate_rule(&rule, &StubResolver, &IndexMap::new()).unwrap();
        assert_eq!(translated.tables.len(), 1);
        assert_eq!(translated.constraints.len(), 1);
    }

    #[test]
    fn translates_aggregating_head() {
        let rule = rule_from("P(x, total? += y) :- A(x, y);");
        let translated = translate_rule(&rule, &StubResolver, &IndexMap::new()).unwrap();
        let agg = translated.aggregation.unwrap();
        assert_eq!(agg.group_by.len(), 1);
        assert_eq!(agg.aggregates.len(), 1);
    }

    #[test]
    fn translates_negation_to_subquery_constraint() {
        let rule = rule_from("P(x) :- A(x), ~B(x);");
        let translated = translate_rule(&rule, &StubResolver, &IndexMap::new()).unwrap();
        assert_eq!(translated.tables.len(), 1);
        let has_subquery = translated
            .constraints
            .iter()
            .any(|c| matches!(&c.expr, SqlExpr::Subquery(sq) if matches!(sq.kind, SubQueryKind::Negation)));
        assert!(has_subquery);
    }

    #[test]
    fn unbound_variable_in_head_is_an_error() {
        let rule = rule_from("P(x, z) :- A(x);");
        assert!(translate_rule(&rule, &StubResolver, &IndexMap::new()).is_err());
    }
}
