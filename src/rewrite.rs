//! Syntactic rewriter (spec §4.3): functor instantiation, DNF expansion,
//! aggregation-as-expression, multi-body aggregation, and denotation
//! promotion. Each pass is a pure `Vec<Rule> -> Vec<Rule>` transform (or
//! `Vec<Statement> -> Vec<Statement>` for functor expansion, which still
//! operates on whole statements because it consumes `Statement::Functor`);
//! composing them in `rewrite_program` is what turns raw parsed statements
//! into the flat, normalized rule set the universe indexes.
//!
//! All intermediate maps are `indexmap::IndexMap`/`IndexSet`: multi-body
//! rewrite order and downstream CTE emission order both depend on iteration
//! order matching insertion order (spec §5).

use crate::ast::{
    AggregateOp, CombineExpr, Denotation, Expression, ExpressionKind, FieldName, FieldValue,
    Literal, PredicateCall, Proposition, RecordExpr, Rule, Statement,
};
use crate::error::{LogicaError, LogicaResult};
use indexmap::IndexMap;
use std::collections::VecDeque;

/// Upper bound on functor-expansion iterations, guarding against a functor
/// cycle (`F := G(...); G := F(...)`) rather than looping forever (spec
/// §4.3 "no cycles allowed").
const MAX_FUNCTOR_EXPANSIONS: usize = 10_000;

/// Run every rewrite pass in the order spec §4.3 describes them.
pub fn rewrite_program(statements: Vec<Statement>) -> LogicaResult<Vec<Rule>> {
    let statements = expand_functors(statements)?;
    let rules: Vec<Rule> = statements
        .into_iter()
        .filter_map(|s| match s {
            Statement::Rule(r) => Some(r),
            Statement::Functor(_) => None,
            Statement::Import(_) => None,
        })
        .collect();
    let rules = rewrite_aggregation_and_dnf(rules)?;
    let rules = rewrite_multi_body_aggregation(rules)?;
    let rules = promote_denotations(rules);
    Ok(rules)
}

// ---------------------------------------------------------------------
// Generic predicate-name substitution (spec §9 "typed visitors per AST
// kind with a uniform rewrite_children combinator"). Used by both functor
// expansion here and predicate-renaming in the import resolver.
// ---------------------------------------------------------------------

pub(crate) fn map_predicate_names_in_rule(rule: &mut Rule, f: &dyn Fn(&str) -> Option<String>) {
    map_call(&mut rule.head, f);
    if let Some(body) = &mut rule.body {
        map_proposition(body, f);
    }
    for d in &mut rule.denotations {
        match d {
            Denotation::CouldBe(e) | Denotation::CantBe(e) | Denotation::ShouldBe(e) => map_expression(e, f),
            Denotation::OrderBy(_) | Denotation::Limit(_) => {}
        }
    }
}

fn map_call(call: &mut PredicateCall, f: &dyn Fn(&str) -> Option<String>) {
    if let Some(new_name) = f(&call.predicate_name) {
        call.predicate_name = new_name;
    }
    for field in &mut call.record.fields {
        map_expression(&mut field.value, f);
    }
}

fn map_expression(expr: &mut Expression, f: &dyn Fn(&str) -> Option<String>) {
    match &mut expr.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => {}
        ExpressionKind::Record(r) => {
            for field in &mut r.fields {
                map_expression(&mut field.value, f);
            }
        }
        ExpressionKind::List(items) => {
            for item in items {
                map_expression(item, f);
            }
        }
        ExpressionKind::Call(call) => map_call(call, f),
        ExpressionKind::Subscript { base, index } => {
            map_expression(base, f);
            map_expression(index, f);
        }
        ExpressionKind::RecordSubscript { base, .. } => map_expression(base, f),
        ExpressionKind::Combine(c) => {
            map_expression(&mut c.value, f);
            map_proposition(&mut c.body, f);
        }
        ExpressionKind::Implication(i) => {
            for (cond, val) in &mut i.branches {
                map_proposition(cond, f);
                map_expression(val, f);
            }
            if let Some(e) = &mut i.else_value {
                map_expression(e, f);
            }
        }
    }
}

fn map_proposition(prop: &mut Proposition, f: &dyn Fn(&str) -> Option<String>) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                map_proposition(p, f);
            }
        }
        Proposition::Call(call) => map_call(call, f),
        Proposition::Unification { left, right } => {
            map_expression(left, f);
            map_expression(right, f);
        }
        Proposition::Inclusion { element, collection } => {
            map_expression(element, f);
            map_expression(collection, f);
        }
        Proposition::NegationAsAggregate(inner) => map_proposition(inner, f),
    }
}

fn free_variables_in_proposition(prop: &Proposition, out: &mut Vec<String>) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                free_variables_in_proposition(p, out);
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
        Proposition::NegationAsAggregate(inner) => free_variables_in_proposition(inner, out),
    }
}

// ---------------------------------------------------------------------
// Functor instantiation (`@Make` / `:=`).
// ---------------------------------------------------------------------

fn expand_functors(mut statements: Vec<Statement>) -> LogicaResult<Vec<Statement>> {
    let mut expansions = 0usize;
    loop {
        let Some(idx) = statements.iter().position(|s| matches!(s, Statement::Functor(_))) else {
            break;
        };
        expansions += 1;
        if expansions > MAX_FUNCTOR_EXPANSIONS {
            return Err(LogicaError::semantic(
                "functor expansion did not reach a fixpoint (likely a functor cycle)",
                match &statements[idx] {
                    Statement::Functor(f) => f.heritage.clone(),
                    _ => unreachable!(),
                },
            ));
        }
        let Statement::Functor(functor) = statements.remove(idx) else {
            unreachable!()
        };

        let mut rename: IndexMap<String, String> = functor.slots.iter().cloned().collect();
        rename.insert(functor.template.clone(), functor.new_name.clone());

        let mut cloned = Vec::new();
        for s in &statements {
            if let Statement::Rule(r) = s {
                if r.head.predicate_name == functor.template {
                    let mut clone = r.clone();
                    map_predicate_names_in_rule(&mut clone, &|name| rename.get(name).cloned());
                    cloned.push(Statement::Rule(clone));
                }
            }
        }
        if cloned.is_empty() {
            return Err(LogicaError::semantic(
                format!("functor template '{}' has no rules", functor.template),
                functor.heritage,
            ));
        }
        statements.extend(cloned);
    }
    Ok(statements)
}

// ---------------------------------------------------------------------
// Aggregation-as-expression + DNF, run together so a synthesized combine
// auxiliary rule gets its own DNF pass before the overall rewrite settles.
// ---------------------------------------------------------------------

fn rewrite_aggregation_and_dnf(rules: Vec<Rule>) -> LogicaResult<Vec<Rule>> {
    let mut counter = 0usize;
    let mut queue: VecDeque<Rule> = rules.into_iter().collect();
    let mut output = Vec::new();
    while let Some(rule) = queue.pop_front() {
        let mut synthesized = Vec::new();
        let rewritten = rewrite_combines_in_rule(rule, &mut counter, &mut synthesized);
        for s in synthesized {
            queue.push_back(s);
        }
        output.extend(expand_dnf_rule(rewritten)?);
    }
    Ok(output)
}

fn rewrite_combines_in_rule(mut rule: Rule, counter: &mut usize, synthesized: &mut Vec<Rule>) -> Rule {
    let mut outer_vars = Vec::new();
    for f in &rule.head.record.fields {
        for v in f.value.free_variables() {
            if !outer_vars.contains(&v) {
                outer_vars.push(v);
            }
        }
    }
    if let Some(body) = &rule.body {
        free_variables_in_proposition(body, &mut outer_vars);
    }

    if let Some(body) = rule.body.take() {
        rule.body = Some(rewrite_combines_in_proposition(body, &outer_vars, counter, synthesized));
    }
    for field in &mut rule.head.record.fields {
        let span = field.value.heritage.clone();
        let taken = std::mem::replace(&mut field.value, Expression::new(ExpressionKind::Variable(String::new()), span));
        field.value = rewrite_combines_in_expression(taken, &outer_vars, counter, synthesized);
    }
    rule
}

fn rewrite_combines_in_proposition(
    prop: Proposition,
    outer_vars: &[String],
    counter: &mut usize,
    synthesized: &mut Vec<Rule>,
) -> Proposition {
    match prop {
        Proposition::Conjunction(parts) => Proposition::Conjunction(
            parts
                .into_iter()
                .map(|p| rewrite_combines_in_proposition(p, outer_vars, counter, synthesized))
                .collect(),
        ),
        Proposition::Disjunction(parts) => Proposition::Disjunction(
            parts
                .into_iter()
                .map(|p| rewrite_combines_in_proposition(p, outer_vars, counter, synthesized))
                .collect(),
        ),
        Proposition::Call(mut call) => {
            for f in &mut call.record.fields {
                let span = f.value.heritage.clone();
                let taken = std::mem::replace(&mut f.value, Expression::new(ExpressionKind::Variable(String::new()), span));
                f.value = rewrite_combines_in_expression(taken, outer_vars, counter, synthesized);
            }
            Proposition::Call(call)
        }
        Proposition::Unification { left, right } => Proposition::Unification {
            left: rewrite_combines_in_expression(left, outer_vars, counter, synthesized),
            right: rewrite_combines_in_expression(right, outer_vars, counter, synthesized),
        },
        Proposition::Inclusion { element, collection } => Proposition::Inclusion {
            element: rewrite_combines_in_expression(element, outer_vars, counter, synthesized),
            collection: rewrite_combines_in_expression(collection, outer_vars, counter, synthesized),
        },
        Proposition::NegationAsAggregate(inner) => Proposition::NegationAsAggregate(Box::new(
            rewrite_combines_in_proposition(*inner, outer_vars, counter, synthesized),
        )),
    }
}

fn rewrite_combines_in_expression(
    expr: Expression,
    outer_vars: &[String],
    counter: &mut usize,
    synthesized: &mut Vec<Rule>,
) -> Expression {
    let heritage = expr.heritage.clone();
    match expr.kind {
        ExpressionKind::Combine(combine) => {
            let CombineExpr { op, value, body } = *combine;
            let value = rewrite_combines_in_expression(*value, outer_vars, counter, synthesized);
            let body = rewrite_combines_in_proposition(*body, outer_vars, counter, synthesized);

            let mut combine_vars = value.free_variables();
            free_variables_in_proposition(&body, &mut combine_vars);
            let params: Vec<String> = outer_vars.iter().filter(|v| combine_vars.contains(v)).cloned().collect();

            *counter += 1;
            let synth_name = format!("CombineAux{}", counter);

            let mut head_fields: Vec<FieldValue> = params
                .iter()
                .map(|v| FieldValue {
                    name: FieldName::Named(v.clone()),
                    value: Expression::new(ExpressionKind::Variable(v.clone()), heritage.clone()),
                    aggregate: None,
                })
                .collect();
            head_fields.push(FieldValue {
                name: FieldName::Named("logica_value".to_string()),
                value,
                aggregate: Some(op),
            });

            synthesized.push(Rule {
                head: PredicateCall {
                    predicate_name: synth_name.clone(),
                    record: RecordExpr { fields: head_fields, rest: None },
                    heritage: heritage.clone(),
                },
                distinct: true,
                denotations: Vec::new(),
                body: Some(body),
                full_text: heritage.clone(),
            });

            let call_fields = params
                .iter()
                .map(|v| FieldValue {
                    name: FieldName::Named(v.clone()),
                    value: Expression::new(ExpressionKind::Variable(v.clone()), heritage.clone()),
                    aggregate: None,
                })
                .collect();
            Expression::new(
                ExpressionKind::Call(Box::new(PredicateCall {
                    predicate_name: synth_name,
                    record: RecordExpr { fields: call_fields, rest: None },
                    heritage: heritage.clone(),
                })),
                heritage,
            )
        }
        ExpressionKind::Implication(implication) => {
            let branches = implication
                .branches
                .into_iter()
                .map(|(cond, val)| {
                    (
                        rewrite_combines_in_proposition(cond, outer_vars, counter, synthesized),
                        rewrite_combines_in_expression(val, outer_vars, counter, synthesized),
                    )
                })
                .collect();
            let else_value = implication
                .else_value
                .map(|e| Box::new(rewrite_combines_in_expression(*e, outer_vars, counter, synthesized)));
            Expression::new(
                ExpressionKind::Implication(Box::new(crate::ast::ImplicationExpr { branches, else_value })),
                heritage,
            )
        }
        ExpressionKind::Call(call) => {
            let mut call = *call;
            for f in &mut call.record.fields {
                let span = f.value.heritage.clone();
                let taken = std::mem::replace(&mut f.value, Expression::new(ExpressionKind::Variable(String::new()), span));
                f.value = rewrite_combines_in_expression(taken, outer_vars, counter, synthesized);
            }
            Expression::new(ExpressionKind::Call(Box::new(call)), heritage)
        }
        ExpressionKind::Record(mut r) => {
            for f in &mut r.fields {
                let span = f.value.heritage.clone();
                let taken = std::mem::replace(&mut f.value, Expression::new(ExpressionKind::Variable(String::new()), span));
                f.value = rewrite_combines_in_expression(taken, outer_vars, counter, synthesized);
            }
            Expression::new(ExpressionKind::Record(r), heritage)
        }
        ExpressionKind::List(items) => Expression::new(
            ExpressionKind::List(
                items
                    .into_iter()
                    .map(|i| rewrite_combines_in_expression(i, outer_vars, counter, synthesized))
                    .collect(),
            ),
            heritage,
        ),
        ExpressionKind::Subscript { base, index } => Expression::new(
            ExpressionKind::Subscript {
                base: Box::new(rewrite_combines_in_expression(*base, outer_vars, counter, synthesized)),
                index: Box::new(rewrite_combines_in_expression(*index, outer_vars, counter, synthesized)),
            },
            heritage,
        ),
        ExpressionKind::RecordSubscript { base, field } => Expression::new(
            ExpressionKind::RecordSubscript {
                base: Box::new(rewrite_combines_in_expression(*base, outer_vars, counter, synthesized)),
                field,
            },
            heritage,
        ),
        other @ (ExpressionKind::Literal(_) | ExpressionKind::Variable(_)) => Expression::new(other, heritage),
    }
}

// ---------------------------------------------------------------------
// DNF expansion: each disjunct of a rule body becomes its own rule.
// Negation-as-aggregate is opaque (spec §4.3).
// ---------------------------------------------------------------------

fn expand_dnf_rule(rule: Rule) -> LogicaResult<Vec<Rule>> {
    let Some(body) = &rule.body else {
        return Ok(vec![rule]);
    };
    let clauses = dnf(body);
    Ok(clauses
        .into_iter()
        .map(|clause| {
            let mut r = rule.clone();
            r.body = Some(Proposition::conjunction(clause));
            r
        })
        .collect())
}

fn dnf(prop: &Proposition) -> Vec<Vec<Proposition>> {
    match prop {
        Proposition::Disjunction(parts) => parts.iter().flat_map(dnf).collect(),
        Proposition::Conjunction(parts) => parts.iter().map(dnf).fold(vec![Vec::new()], |acc, part_clauses| {
            let mut out = Vec::with_capacity(acc.len() * part_clauses.len().max(1));
            for a in &acc {
                for c in &part_clauses {
                    let mut combined = a.clone();
                    combined.extend(c.clone());
                    out.push(combined);
                }
            }
            out
        }),
        atomic => vec![vec![atomic.clone()]],
    }
}

// ---------------------------------------------------------------------
// Multi-body aggregation rewrite (spec §4.3).
// ---------------------------------------------------------------------

fn rewrite_multi_body_aggregation(rules: Vec<Rule>) -> LogicaResult<Vec<Rule>> {
    let mut groups: IndexMap<String, Vec<Rule>> = IndexMap::new();
    for r in rules {
        groups.entry(r.head.predicate_name.clone()).or_default().push(r);
    }

    let mut output = Vec::new();
    for (pred_name, group) in groups {
        if group.len() > 1 && group.iter().all(Rule::is_aggregating) {
            output.extend(rewrite_one_multi_body_group(&pred_name, group)?);
        } else {
            output.extend(group);
        }
    }
    Ok(output)
}

fn aggregate_signature(r: &Rule) -> Vec<(String, AggregateOp)> {
    r.head
        .record
        .fields
        .iter()
        .filter_map(|f| f.aggregate.map(|op| (f.name.resolved(), op)))
        .collect()
}

fn non_aggregating_signature(r: &Rule) -> Vec<String> {
    r.head
        .record
        .fields
        .iter()
        .filter(|f| f.aggregate.is_none())
        .map(|f| f.name.resolved())
        .collect()
}

fn rewrite_one_multi_body_group(pred_name: &str, group: Vec<Rule>) -> LogicaResult<Vec<Rule>> {
    let sig0 = aggregate_signature(&group[0]);
    let non_agg0 = non_aggregating_signature(&group[0]);
    for r in &group[1..] {
        if aggregate_signature(r) != sig0 || non_aggregating_signature(r) != non_agg0 {
            return Err(LogicaError::semantic(
                format!("conflicting aggregation signatures across bodies of '{pred_name}'"),
                r.full_text.clone(),
            ));
        }
    }

    let aux_name = format!("{pred_name}_MultBodyAggAux");
    let mut aux_rules = Vec::with_capacity(group.len());
    for r in &group {
        let aux_fields: Vec<FieldValue> = r
            .head
            .record
            .fields
            .iter()
            .map(|f| FieldValue {
                name: f.name.clone(),
                value: f.value.clone(),
                aggregate: None,
            })
            .collect();
        aux_rules.push(Rule {
            head: PredicateCall {
                predicate_name: aux_name.clone(),
                record: RecordExpr { fields: aux_fields, rest: None },
                heritage: r.head.heritage.clone(),
            },
            distinct: false,
            denotations: Vec::new(),
            body: r.body.clone(),
            full_text: r.full_text.clone(),
        });
    }

    let head0 = &group[0].head;
    let final_fields: Vec<FieldValue> = head0
        .record
        .fields
        .iter()
        .map(|f| FieldValue {
            name: f.name.clone(),
            value: Expression::new(ExpressionKind::Variable(f.name.resolved()), f.value.heritage.clone()),
            aggregate: f.aggregate,
        })
        .collect();
    let aux_call_fields: Vec<FieldValue> = head0
        .record
        .fields
        .iter()
        .map(|f| FieldValue {
            name: f.name.clone(),
            value: Expression::new(ExpressionKind::Variable(f.name.resolved()), f.value.heritage.clone()),
            aggregate: None,
        })
        .collect();

    let final_rule = Rule {
        head: PredicateCall {
            predicate_name: pred_name.to_string(),
            record: RecordExpr { fields: final_fields, rest: None },
            heritage: head0.heritage.clone(),
        },
        distinct: true,
        denotations: group[0].denotations.clone(),
        body: Some(Proposition::Call(PredicateCall {
            predicate_name: aux_name,
            record: RecordExpr { fields: aux_call_fields, rest: None },
            heritage: head0.heritage.clone(),
        })),
        full_text: head0.heritage.clone(),
    };

    let mut out = aux_rules;
    out.push(final_rule);
    Ok(out)
}

// ---------------------------------------------------------------------
// Denotation promotion: `order_by`/`limit` become sibling `@OrderBy`/
// `@Limit` annotation rules. `couldbe`/`cantbe`/`shouldbe` have no
// interpreter in this core (spec §1 "no interpreter") so they stay attached
// to the rule as metadata only.
// ---------------------------------------------------------------------

fn promote_denotations(rules: Vec<Rule>) -> Vec<Rule> {
    let mut output = Vec::with_capacity(rules.len());
    for mut rule in rules {
        let pred = rule.head.predicate_name.clone();
        let span = rule.full_text.clone();
        let mut remaining = Vec::new();
        for d in rule.denotations.drain(..) {
            match d {
                Denotation::OrderBy(cols) => {
                    let mut fields = vec![FieldValue {
                        name: FieldName::Positional(0),
                        value: Expression::new(ExpressionKind::Variable(pred.clone()), span.clone()),
                        aggregate: None,
                    }];
                    for (i, (col, desc)) in cols.iter().enumerate() {
                        let text = if *desc { format!("{col} desc") } else { col.clone() };
                        fields.push(FieldValue {
                            name: FieldName::Positional(i + 1),
                            value: Expression::new(ExpressionKind::Literal(Literal::String(text)), span.clone()),
                            aggregate: None,
                        });
                    }
                    output.push(Rule {
                        head: PredicateCall {
                            predicate_name: "@OrderBy".to_string(),
                            record: RecordExpr { fields, rest: None },
                            heritage: span.clone(),
                        },
                        distinct: false,
                        denotations: Vec::new(),
                        body: None,
                        full_text: span.clone(),
                    });
                }
                Denotation::Limit(n) => {
                    let fields = vec![
                        FieldValue {
                            name: FieldName::Positional(0),
                            value: Expression::new(ExpressionKind::Variable(pred.clone()), span.clone()),
                            aggregate: None,
                        },
                        FieldValue {
                            name: FieldName::Positional(1),
                            value: Expression::new(ExpressionKind::Literal(Literal::Int(n as i64)), span.clone()),
                            aggregate: None,
                        },
                    ];
                    output.push(Rule {
                        head: PredicateCall {
                            predicate_name: "@Limit".to_string(),
                            record: RecordExpr { fields, rest: None },
                            heritage: span.clone(),
                        },
                        distinct: false,
                        denotations: Vec::new(),
                        body: None,
                        full_text: span.clone(),
                    });
                }
                other => remaining.push(other),
            }
        }
        rule.denotations = remaining;
        output.push(rule);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn parse(text: &str) -> Vec<Statement> {
        parse_program(Arc::new(SourceBuffer::new("t.l", text))).unwrap().statements
    }

    #[test]
    fn dnf_splits_disjunction_into_separate_rules() {
        let stmts = parse("P(x) :- Q(x), (R(x) | S(x));");
        let rules = rewrite_program(stmts).unwrap();
        assert_eq!(rules.iter().filter(|r| r.head.predicate_name == "P").count(), 2);
    }

    #[test]
    fn dnf_is_idempotent() {
        let stmts = parse("P(x) :- Q(x) | R(x);");
        let once = rewrite_program(stmts.clone()).unwrap();
        let twice_stmts: Vec<Statement> = once.iter().cloned().map(Statement::Rule).collect();
        let twice = rewrite_program(twice_stmts).unwrap();
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn multi_body_aggregation_produces_aux_and_single_final_rule() {
        let stmts = parse("A() += 1; A() += 2;");
        let rules = rewrite_program(stmts).unwrap();
        let aux_count = rules.iter().filter(|r| r.head.predicate_name == "A_MultBodyAggAux").count();
        assert_eq!(aux_count, 2);
        let final_rules: Vec<_> = rules.iter().filter(|r| r.head.predicate_name == "A").collect();
        assert_eq!(final_rules.len(), 1);
        assert!(final_rules[0].is_aggregating());
    }

    #[test]
    fn functor_expansion_clones_template_rules() {
        let stmts = parse("F(x) :- A(x) | B(x); G := F(A: C, B: D);");
        let rules = rewrite_program(stmts).unwrap();
        assert!(rules.iter().any(|r| r.head.predicate_name == "G"));
        assert!(!rules.iter().any(|r| r.head.predicate_name == "F"));
    }

    #[test]
    fn functor_expansion_is_deterministic() {
        let stmts = parse("F(x) :- A(x); G := F(A: C);");
        let a = rewrite_program(stmts.clone()).unwrap();
        let b = rewrite_program(stmts).unwrap();
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn order_by_and_limit_promote_to_annotation_rules() {
        let stmts = parse(r#"Top(x, score:) order_by score desc limit 10 :- Score(x, score);"#);
        let rules = rewrite_program(stmts).unwrap();
        assert!(rules.iter().any(|r| r.head.predicate_name == "@OrderBy"));
        assert!(rules.iter().any(|r| r.head.predicate_name == "@Limit"));
        let top_rule = rules.iter().find(|r| r.head.predicate_name == "Top").unwrap();
        assert!(top_rule.denotations.is_empty());
    }

    #[test]
    fn aggregation_as_expression_synthesizes_combine_auxiliary() {
        let stmts = parse("TotalFriends(p, total:) :- Person(p), total = Count{f :- Friend(p, f)};");
        let rules = rewrite_program(stmts).unwrap();
        assert!(rules.iter().any(|r| r.head.predicate_name.starts_with("CombineAux")));
    }
}
