//! Statement parser: turns `;`-separated top-level text into [`Statement`]s
//! (spec §4.2). This is the only module that classifies a span into one of
//! `import` / function-rule (`-->`) / functor-rule (`:=` or `@Make(...)`) /
//! plain rule; everything below a single statement's boundary is handled by
//! [`expr`] (propositions, expressions, records).

pub mod expr;

use crate::ast::{
    Denotation, Expression, ExpressionKind, FieldName, FieldValue, FunctorApplication, Import,
    PredicateCall, Proposition, Rule, Statement,
};
use crate::ast::{AggregateOp, ParsedFile};
use crate::error::{LogicaError, LogicaResult};
use crate::lexer::{self, is_whole, strip};
use crate::span::{SourceBuffer, SourceSpan};
use std::sync::Arc;

pub use expr::{parse_expression, parse_proposition};

/// Parse a whole source file into its statements, in source order.
pub fn parse_program(buffer: Arc<SourceBuffer>) -> LogicaResult<ParsedFile> {
    let whole = buffer.whole_span();
    let spans = lexer::split(&whole, ";")?;
    let mut statements = Vec::new();
    for span in spans {
        if span.is_empty() {
            continue;
        }
        statements.extend(parse_statement(&span)?);
    }
    Ok(ParsedFile {
        file_name: buffer.name.to_string(),
        statements,
    })
}

/// Classify and parse a single `;`-delimited statement. Returns more than one
/// [`Statement`] only for the `-->` function-rule sugar, which synthesizes a
/// sibling `@CompileAsUdf` annotation alongside the rule itself (spec §4.2.2).
pub fn parse_statement(span: &SourceSpan) -> LogicaResult<Vec<Statement>> {
    let span = strip(span);
    if span.is_empty() {
        return Ok(Vec::new());
    }
    let text = span.text();

    if let Some(rest) = strip_keyword(text, "import") {
        return Ok(vec![Statement::Import(parse_import(&span, rest)?)]);
    }

    if let Some((lhs, rhs)) = lexer::split_once(&span, "-->")? {
        return parse_function_rule(&span, lhs, rhs);
    }

    if let Some(call) = try_parse_annotation_call(&span)? {
        if call.predicate_name == "@Make" {
            return Ok(vec![Statement::Functor(functor_from_make_call(&span, call)?)]);
        }
        return Ok(vec![Statement::Rule(Rule {
            head: call,
            distinct: false,
            denotations: Vec::new(),
            body: None,
            full_text: span.clone(),
        })]);
    }

    if let Some((lhs, rhs)) = lexer::split_once(&span, ":=")? {
        return Ok(vec![Statement::Functor(parse_functor_sugar(&span, lhs, rhs)?)]);
    }

    Ok(vec![Statement::Rule(parse_rule(&span)?)])
}

fn strip_keyword<'a>(text: &'a str, kw: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(kw)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// `import a.b.Name [as Alias]`.
fn parse_import(span: &SourceSpan, rest: &str) -> LogicaResult<Import> {
    let rest_span = strip(&span.sub(span.len() - rest.len(), span.len()));
    if rest_span.is_empty() {
        return Err(LogicaError::syntactic("import requires a dotted path", span.clone()));
    }
    let (path_part, alias) = match lexer::split_once(&rest_span, "as")? {
        Some((p, a)) => (p, Some(a.text().trim().to_string())),
        None => (rest_span.clone(), None),
    };
    let mut segments: Vec<String> = path_part
        .text()
        .split('.')
        .map(|s| s.trim().to_string())
        .collect();
    if segments.is_empty() || segments.iter().any(String::is_empty) {
        return Err(LogicaError::syntactic("malformed import path", span.clone()));
    }
    let predicate_name = segments.pop().unwrap();
    Ok(Import {
        path: segments,
        predicate_name,
        alias,
        heritage: span.clone(),
    })
}

/// `LHS --> RHS` sugar: synthesizes `@CompileAsUdf(P)` plus `LHS = RHS`.
fn parse_function_rule(span: &SourceSpan, lhs: SourceSpan, rhs: SourceSpan) -> LogicaResult<Vec<Statement>> {
    let call = expr::try_parse_call(&lhs)?.ok_or_else(|| {
        LogicaError::syntactic("the left-hand side of '-->' must be a predicate call", lhs.clone())
    })?;
    let rhs_expr = parse_expression(&rhs)?;

    let udf_annotation = Rule {
        head: PredicateCall {
            predicate_name: "@CompileAsUdf".to_string(),
            record: single_positional_ref(&call.predicate_name, lhs.clone()),
            heritage: span.clone(),
        },
        distinct: false,
        denotations: Vec::new(),
        body: None,
        full_text: span.clone(),
    };

    let mut value_call = call;
    value_call.record.fields.push(FieldValue {
        name: FieldName::Named("logica_value".to_string()),
        value: rhs_expr,
        aggregate: None,
    });
    let value_rule = Rule {
        head: value_call,
        distinct: false,
        denotations: Vec::new(),
        body: None,
        full_text: span.clone(),
    };

    Ok(vec![Statement::Rule(udf_annotation), Statement::Rule(value_rule)])
}

/// `NewName := Template(Slot: Value, ...)` sugar for `@Make`.
fn parse_functor_sugar(span: &SourceSpan, lhs: SourceSpan, rhs: SourceSpan) -> LogicaResult<FunctorApplication> {
    let new_name = lhs.text().trim().to_string();
    if !is_plain_identifier(&new_name) {
        return Err(LogicaError::syntactic("functor name must be a plain identifier", lhs.clone()));
    }
    let call = expr::try_parse_call(&rhs)?.ok_or_else(|| {
        LogicaError::syntactic("functor application must be 'Template(Slot: Value, ...)'", rhs.clone())
    })?;
    let mut slots = Vec::new();
    for f in &call.record.fields {
        let FieldName::Named(slot) = &f.name else {
            return Err(LogicaError::syntactic("functor slots must be named ('Slot: Value')", rhs.clone()));
        };
        slots.push((slot.clone(), expect_identifier_text(&f.value)?));
    }
    Ok(FunctorApplication {
        new_name,
        template: call.predicate_name,
        slots,
        heritage: span.clone(),
    })
}

/// `@Make(NewName, Template, {Slot: Value, ...})`, the explicit-annotation
/// spelling of the same functor instantiation as `:=`.
fn functor_from_make_call(span: &SourceSpan, call: PredicateCall) -> LogicaResult<FunctorApplication> {
    let fields = &call.record.fields;
    if fields.len() != 3 {
        return Err(LogicaError::syntactic("@Make requires exactly 3 arguments", span.clone()));
    }
    let new_name = expect_identifier_text(&fields[0].value)?;
    let template = expect_identifier_text(&fields[1].value)?;
    let ExpressionKind::Record(record) = &fields[2].value.kind else {
        return Err(LogicaError::syntactic(
            "@Make's third argument must be a record of slot bindings",
            fields[2].value.heritage.clone(),
        ));
    };
    let mut slots = Vec::new();
    for f in &record.fields {
        let FieldName::Named(slot) = &f.name else {
            return Err(LogicaError::syntactic("@Make slot bindings must be named", span.clone()));
        };
        slots.push((slot.clone(), expect_identifier_text(&f.value)?));
    }
    Ok(FunctorApplication {
        new_name,
        template,
        slots,
        heritage: span.clone(),
    })
}

fn expect_identifier_text(e: &Expression) -> LogicaResult<String> {
    match &e.kind {
        ExpressionKind::Variable(v) => Ok(v.clone()),
        _ => Err(LogicaError::syntactic("expected a predicate name", e.heritage.clone())),
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_') && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn single_positional_ref(name: &str, heritage: SourceSpan) -> crate::ast::RecordExpr {
    crate::ast::RecordExpr {
        fields: vec![FieldValue {
            name: FieldName::Positional(0),
            value: Expression::new(ExpressionKind::Variable(name.to_string()), heritage),
            aggregate: None,
        }],
        rest: None,
    }
}

/// Detects `@Name(record)` spanning the entire span. Annotation predicate
/// names keep their leading `@` (unlike ordinary identifiers) so the rest of
/// the pipeline can tell "this is a directive" from "this is data" by a
/// single prefix check (`crate::annotations`).
fn try_parse_annotation_call(span: &SourceSpan) -> LogicaResult<Option<PredicateCall>> {
    let text = span.text();
    if !text.starts_with('@') {
        return Ok(None);
    }
    let Some(paren_idx) = text.find('(') else {
        return Ok(None);
    };
    if !text.ends_with(')') || !is_whole(span) {
        return Ok(None);
    }
    let name = &text[1..paren_idx];
    if !is_plain_identifier(name) {
        return Ok(None);
    }
    let inner = span.sub(paren_idx + 1, span.len() - 1);
    let record = expr::parse_record_fields(&inner)?;
    Ok(Some(PredicateCall {
        predicate_name: format!("@{name}"),
        record,
        heritage: span.clone(),
    }))
}

/// Plain rule: `head [Op]= value [distinct] [denotations] [:- body]`.
fn parse_rule(span: &SourceSpan) -> LogicaResult<Rule> {
    let (head_part, body_part) = match lexer::split_once(span, ":-")? {
        Some((h, b)) => (h, Some(b)),
        None => (span.clone(), None),
    };
    if let Some(b) = &body_part {
        if b.is_empty() {
            return Err(LogicaError::syntactic("rule body after ':-' must not be empty", span.clone()));
        }
    }

    let (core, distinct_explicit, denotations) = peel_trailing_clauses(&head_part)?;
    let (head, implied_distinct) = parse_head(&core)?;
    let distinct = distinct_explicit || implied_distinct;

    if distinct_explicit && !implied_distinct && !head.record.fields.iter().any(|f| f.aggregate.is_some()) {
        // `distinct` on a non-aggregating head is legal (plain set dedup);
        // only the reverse (aggregating head without `distinct`) is invalid.
    }

    let body = body_part.as_ref().map(parse_proposition).transpose()?;

    Ok(Rule {
        head,
        distinct,
        denotations,
        body,
        full_text: span.clone(),
    })
}

/// Consume a call, then an optional `[Op]= <expr>` value assignment.
/// Returns the (possibly value-extended) head call and whether an
/// aggregating assignment implies `distinct`.
fn parse_head(span: &SourceSpan) -> LogicaResult<(PredicateCall, bool)> {
    let mut ops: Vec<&str> = AggregateOp::all().iter().map(|op| op.token()).collect();
    ops.push("=");
    let parts = lexer::split_any(span, &ops)?;

    if parts.len() == 1 {
        let call = expr::try_parse_call(&parts[0].0)?
            .ok_or_else(|| LogicaError::syntactic("expected a rule head call", span.clone()))?;
        return Ok((call, false));
    }
    if parts.len() != 2 {
        return Err(LogicaError::syntactic(
            "a rule head may carry at most one value assignment",
            span.clone(),
        ));
    }

    let (call_span, _) = &parts[0];
    let (value_span, op) = &parts[1];
    let mut call = expr::try_parse_call(call_span)?
        .ok_or_else(|| LogicaError::syntactic("expected a rule head call", call_span.clone()))?;
    let value_expr = parse_expression(value_span)?;

    match *op {
        Some("=") => {
            call.record.fields.push(FieldValue {
                name: FieldName::Named("logica_value".to_string()),
                value: value_expr,
                aggregate: None,
            });
            Ok((call, false))
        }
        Some(token) => {
            let agg_op = AggregateOp::from_token(token)
                .expect("split_any only matched tokens drawn from AggregateOp::all()");
            call.record.fields.push(FieldValue {
                name: FieldName::Named("logica_value".to_string()),
                value: value_expr,
                aggregate: Some(agg_op),
            });
            Ok((call, true))
        }
        None => unreachable!("split_any tags every non-first piece with its operator"),
    }
}

/// Peels `distinct`/`order_by`/`limit`/`couldbe`/`cantbe`/`shouldbe` clauses
/// trailing the head, in any order, returning what remains as the core head
/// span.
fn peel_trailing_clauses(span: &SourceSpan) -> LogicaResult<(SourceSpan, bool, Vec<Denotation>)> {
    const KEYWORDS: [&str; 6] = ["distinct", "order_by", "limit", "couldbe", "cantbe", "shouldbe"];
    let parts = lexer::split_any(span, &KEYWORDS)?;
    let core = parts[0].0.clone();
    let mut distinct = false;
    let mut denotations = Vec::new();

    for (piece, op) in parts.into_iter().skip(1) {
        match op.expect("split_any tags every non-first piece") {
            "distinct" => distinct = true,
            "order_by" => denotations.push(Denotation::OrderBy(parse_order_by_columns(&piece)?)),
            "limit" => {
                let n: u64 = piece
                    .text()
                    .trim()
                    .parse()
                    .map_err(|_| LogicaError::syntactic("limit requires a non-negative integer", piece.clone()))?;
                denotations.push(Denotation::Limit(n));
            }
            "couldbe" => denotations.push(Denotation::CouldBe(parse_expression(&piece)?)),
            "cantbe" => denotations.push(Denotation::CantBe(parse_expression(&piece)?)),
            "shouldbe" => denotations.push(Denotation::ShouldBe(parse_expression(&piece)?)),
            _ => unreachable!(),
        }
    }
    Ok((core, distinct, denotations))
}

fn parse_order_by_columns(span: &SourceSpan) -> LogicaResult<Vec<(String, bool)>> {
    let items = lexer::split(span, ",")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.text().trim();
        let (name, descending) = if let Some(stripped) = strip_trailing_word(text, "desc") {
            (stripped, true)
        } else if let Some(stripped) = strip_trailing_word(text, "asc") {
            (stripped, false)
        } else {
            (text, false)
        };
        out.push((name.trim().trim_matches('"').to_string(), descending));
    }
    Ok(out)
}

fn strip_trailing_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let trimmed = text.trim_end();
    let rest = trimmed.strip_suffix(word)?;
    match rest.chars().last() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest.trim_end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceBuffer;

    fn parse_all(text: &str) -> Vec<Statement> {
        let buf = Arc::new(SourceBuffer::new("t.l", text));
        parse_program(buf).unwrap().statements
    }

    #[test]
    fn parses_a_fact() {
        let stmts = parse_all(r#"Parent("A", "B");"#);
        assert_eq!(stmts.len(), 1);
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert!(r.is_fact());
        assert_eq!(r.head.predicate_name, "Parent");
    }

    #[test]
    fn parses_a_rule_with_body() {
        let stmts = parse_all("Grandparent(a, b) :- Parent(a, x), Parent(x, b);");
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert!(r.body.is_some());
        assert_eq!(r.head.predicate_name, "Grandparent");
    }

    #[test]
    fn parses_distinct_rule() {
        let stmts = parse_all("Fruit(fruit:) distinct :- FruitPurchase(fruit:);");
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert!(r.distinct);
    }

    #[test]
    fn parses_aggregating_rule_and_implies_distinct() {
        let stmts = parse_all("A() += 1;");
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert!(r.distinct);
        assert!(r.is_aggregating());
    }

    #[test]
    fn parses_value_producing_rule() {
        let stmts = parse_all("Double(x) = x * 2 :- Value(x);");
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert!(r.is_value_producing());
    }

    #[test]
    fn parses_import_with_alias() {
        let stmts = parse_all("import a.b.Name as Alias;");
        let Statement::Import(i) = &stmts[0] else { panic!() };
        assert_eq!(i.path, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(i.predicate_name, "Name");
        assert_eq!(i.alias, Some("Alias".to_string()));
    }

    #[test]
    fn parses_functor_sugar() {
        let stmts = parse_all("G := F(A: C, B: D);");
        let Statement::Functor(f) = &stmts[0] else { panic!() };
        assert_eq!(f.new_name, "G");
        assert_eq!(f.template, "F");
        assert_eq!(f.slots, vec![("A".to_string(), "C".to_string()), ("B".to_string(), "D".to_string())]);
    }

    #[test]
    fn parses_make_annotation_as_functor() {
        let stmts = parse_all("@Make(G, F, {A: C, B: D});");
        let Statement::Functor(f) = &stmts[0] else { panic!() };
        assert_eq!(f.new_name, "G");
        assert_eq!(f.template, "F");
    }

    #[test]
    fn parses_engine_annotation() {
        let stmts = parse_all(r#"@Engine("sqlite");"#);
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert_eq!(r.head.predicate_name, "@Engine");
    }

    #[test]
    fn parses_function_rule_sugar() {
        let stmts = parse_all("Double(x) --> x * 2;");
        assert_eq!(stmts.len(), 2);
        let Statement::Rule(udf) = &stmts[0] else { panic!() };
        assert_eq!(udf.head.predicate_name, "@CompileAsUdf");
        let Statement::Rule(value_rule) = &stmts[1] else { panic!() };
        assert!(value_rule.is_value_producing());
    }

    #[test]
    fn parses_order_by_and_limit_denotations() {
        let stmts = parse_all(r#"Top(x, score:) order_by score desc limit 10 :- Score(x, score);"#);
        let Statement::Rule(r) = &stmts[0] else { panic!() };
        assert_eq!(r.denotations.len(), 2);
        assert!(matches!(&r.denotations[0], Denotation::OrderBy(cols) if cols == &vec![("score".to_string(), true)]));
        assert!(matches!(&r.denotations[1], Denotation::Limit(10)));
    }

    #[test]
    fn parses_recursive_predicate_program() {
        let stmts = parse_all("N(0); N(n+1) :- N(n);");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn rejects_dangling_body_separator() {
        let buf = Arc::new(SourceBuffer::new("t.l", "P(x) :- ;"));
        assert!(parse_program(buf).is_err());
    }
}
