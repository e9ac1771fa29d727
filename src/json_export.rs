//! AST-to-JSON export (spec §6 "AST JSON output"): the one stable,
//! externally-consumed contract this crate publishes besides SQL text. Every
//! other module derives `serde::Serialize` for convenience (snapshotting in
//! tests, `Debug`-adjacent introspection); this module alone owns the exact
//! key names external tooling and [`crate::capi`] depend on, so the two
//! never drift out of sync with each other even if the AST's derived shape
//! changes.
//!
//! Keys are written through `serde_json::Map`, which is a `BTreeMap` unless
//! the `preserve_order` feature is enabled (it isn't here), so the emitted
//! object always has lexicographically sorted keys without extra work.

use crate::ast::{
    AggregateOp, Denotation, Expression, ExpressionKind, FieldName, Literal, PredicateCall,
    Proposition, RecordExpr, Rule, Statement,
};
use serde_json::{json, Map, Value};

/// Export one parsed-and-import-resolved program to the spec §6 JSON shape:
/// top-level `rule` (array), `imported_predicates`, `predicates_prefix`,
/// `file_name`.
///
/// `imported_predicates` lists the dotted-path predicates the *original*
/// (pre-resolution) file imported, in source order. `predicates_prefix` maps
/// each such predicate's original bare name to the prefix the import
/// resolver applied to it (spec §4.3's capitalized-last-segment rule) — left
/// empty when nothing was imported.
pub fn export_program(original_statements: &[Statement], resolved_rules: &[Rule], file_name: &str) -> Value {
    let mut imported_predicates = Vec::new();
    let mut predicates_prefix = Map::new();
    for statement in original_statements {
        if let Statement::Import(import) = statement {
            let dotted = import.path.join(".") + "." + &import.predicate_name;
            imported_predicates.push(Value::String(dotted));
            if let Some(prefix) = import.path.last() {
                let prefix = capitalize(prefix);
                predicates_prefix.insert(import.predicate_name.clone(), Value::String(format!("{prefix}_")));
            }
        }
    }

    json!({
        "rule": resolved_rules.iter().map(export_rule).collect::<Vec<_>>(),
        "imported_predicates": imported_predicates,
        "predicates_prefix": predicates_prefix,
        "file_name": file_name,
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn export_rule(rule: &Rule) -> Value {
    let mut obj = Map::new();
    obj.insert("head".to_string(), export_call(&rule.head));
    if let Some(body) = &rule.body {
        obj.insert("body".to_string(), export_proposition(body));
    }
    if rule.distinct {
        obj.insert("distinct_denoted".to_string(), Value::Bool(true));
    }
    if !rule.denotations.is_empty() {
        obj.insert(
            "denotation".to_string(),
            Value::Array(rule.denotations.iter().map(export_denotation).collect()),
        );
    }
    obj.insert("full_text".to_string(), Value::String(rule.full_text.text().to_string()));
    Value::Object(obj)
}

fn export_denotation(d: &Denotation) -> Value {
    match d {
        Denotation::OrderBy(cols) => json!({"order_by": cols.iter().map(|(c, desc)| json!({"column": c, "descending": desc})).collect::<Vec<_>>()}),
        Denotation::Limit(n) => json!({"limit": n}),
        Denotation::CouldBe(e) => json!({"couldbe": export_expression(e)}),
        Denotation::CantBe(e) => json!({"cantbe": export_expression(e)}),
        Denotation::ShouldBe(e) => json!({"shouldbe": export_expression(e)}),
    }
}

fn export_call(call: &PredicateCall) -> Value {
    json!({
        "predicate_name": call.predicate_name,
        "record": export_record(&call.record),
    })
}

fn export_record(record: &RecordExpr) -> Value {
    let field_value: Vec<Value> = record
        .fields
        .iter()
        .map(|f| {
            let mut obj = Map::new();
            obj.insert("field".to_string(), Value::String(field_name(&f.name)));
            obj.insert("value".to_string(), export_expression(&f.value));
            if let Some(op) = f.aggregate {
                obj.insert("aggregate".to_string(), Value::String(aggregate_name(op)));
            }
            Value::Object(obj)
        })
        .collect();
    let mut obj = Map::new();
    obj.insert("field_value".to_string(), Value::Array(field_value));
    if let Some(rest) = &record.rest {
        obj.insert("rest".to_string(), Value::String(rest.clone()));
    }
    Value::Object(obj)
}

fn field_name(name: &FieldName) -> String {
    name.resolved()
}

fn aggregate_name(op: AggregateOp) -> String {
    op.bare_token().to_string()
}

fn export_expression(expr: &Expression) -> Value {
    let mut obj = match &expr.kind {
        ExpressionKind::Literal(l) => {
            let mut obj = Map::new();
            obj.insert("literal".to_string(), export_literal(l));
            obj
        }
        ExpressionKind::Variable(v) => {
            let mut obj = Map::new();
            obj.insert("variable".to_string(), json!({"var_name": v}));
            obj
        }
        ExpressionKind::Record(r) => {
            let mut obj = Map::new();
            obj.insert("record".to_string(), export_record(r));
            obj
        }
        ExpressionKind::List(items) => {
            let mut obj = Map::new();
            obj.insert("list".to_string(), Value::Array(items.iter().map(export_expression).collect()));
            obj
        }
        ExpressionKind::Call(call) => {
            let mut obj = Map::new();
            obj.insert("call".to_string(), export_call(call));
            obj
        }
        ExpressionKind::Subscript { base, index } => {
            let mut obj = Map::new();
            obj.insert("subscript".to_string(), json!({"base": export_expression(base), "index": export_expression(index)}));
            obj
        }
        ExpressionKind::RecordSubscript { base, field } => {
            let mut obj = Map::new();
            obj.insert("record_subscript".to_string(), json!({"base": export_expression(base), "field": field}));
            obj
        }
        ExpressionKind::Combine(c) => {
            let mut obj = Map::new();
            obj.insert(
                "combine".to_string(),
                json!({"aggregate": aggregate_name(c.op), "value": export_expression(&c.value), "body": export_proposition(&c.body)}),
            );
            obj
        }
        ExpressionKind::Implication(i) => {
            let branches: Vec<Value> = i
                .branches
                .iter()
                .map(|(cond, val)| json!({"condition": export_proposition(cond), "value": export_expression(val)}))
                .collect();
            let mut obj = Map::new();
            obj.insert(
                "implication".to_string(),
                json!({
                    "branch": branches,
                    "else": i.else_value.as_ref().map(|e| export_expression(e)),
                }),
            );
            obj
        }
    };
    obj.insert("expression_heritage".to_string(), Value::String(expr.heritage.text().to_string()));
    Value::Object(obj)
}

fn export_proposition(prop: &Proposition) -> Value {
    match prop {
        Proposition::Conjunction(parts) => json!({"conjunction": parts.iter().map(export_proposition).collect::<Vec<_>>()}),
        Proposition::Disjunction(parts) => json!({"disjunction": parts.iter().map(export_proposition).collect::<Vec<_>>()}),
        Proposition::Call(call) => export_call(call),
        Proposition::Unification { left, right } => json!({"left": export_expression(left), "right": export_expression(right)}),
        Proposition::Inclusion { element, collection } => {
            json!({"element": export_expression(element), "collection": export_expression(collection)})
        }
        Proposition::NegationAsAggregate(inner) => json!({"negation": export_proposition(inner)}),
    }
}

fn export_literal(l: &Literal) -> Value {
    match l {
        Literal::Int(n) => json!(n),
        Literal::Float(f) => json!(f),
        Literal::String(s) => json!(s),
        Literal::Bool(b) => json!(b),
        Literal::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn rules_from(text: &str) -> Vec<Rule> {
        let parsed = parse_program(Arc::new(SourceBuffer::new("t.l", text))).unwrap();
        parsed
            .statements
            .into_iter()
            .filter_map(|s| match s {
                Statement::Rule(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn exports_top_level_keys_sorted() {
        let rules = rules_from("Parent(a, b) :- Friend(a, b);");
        let value = export_program(&[], &rules, "t.l");
        let obj = value.as_object().unwrap();
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys, vec!["file_name", "imported_predicates", "predicates_prefix", "rule"]);
    }

    #[test]
    fn rule_carries_heritage_and_field_value() {
        let rules = rules_from("Parent(a, b) :- Friend(a, b);");
        let value = export_program(&[], &rules, "t.l");
        let rule = &value["rule"][0];
        assert_eq!(rule["full_text"], "Parent(a, b) :- Friend(a, b)");
        let head_fields = rule["head"]["record"]["field_value"].as_array().unwrap();
        assert_eq!(head_fields.len(), 2);
        assert!(head_fields[0]["value"]["expression_heritage"].is_string());
    }
}
