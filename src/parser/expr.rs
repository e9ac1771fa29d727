//! Expression and proposition parsing.
//!
//! There is no token stream here, only [`crate::lexer::split`]/[`split_any`]
//! applied to progressively smaller spans: each precedence level peels off
//! its operator at the top nesting level and recurses into the pieces.
//! Arithmetic and comparison operators carry no dedicated AST variant; they
//! lower straight into a [`PredicateCall`] against one of the
//! [`crate::builtins`] names, which keeps `ExpressionKind`/`Proposition`
//! closed and small.

use crate::ast::{
    AggregateOp, CombineExpr, Expression, ExpressionKind, FieldName, FieldValue,
    ImplicationExpr, Literal, PredicateCall, Proposition, RecordExpr,
};
use crate::builtins;
use crate::error::{LogicaError, LogicaResult};
use crate::lexer::{self, is_whole, strip, strip_and_unwrap};
use crate::span::SourceSpan;

/// Parse a full boolean body: `p1, p2 | p3, ~p4`, etc.
pub fn parse_proposition(span: &SourceSpan) -> LogicaResult<Proposition> {
    let span = strip_and_unwrap(span);
    if span.is_empty() {
        return Err(LogicaError::syntactic("expected a proposition, found nothing", span));
    }
    parse_disjunction(&span)
}

fn parse_disjunction(span: &SourceSpan) -> LogicaResult<Proposition> {
    let parts = lexer::split(span, "|")?;
    if parts.len() > 1 {
        let parsed = parts.iter().map(parse_conjunction).collect::<LogicaResult<Vec<_>>>()?;
        return Ok(Proposition::Disjunction(parsed));
    }
    parse_conjunction(span)
}

fn parse_conjunction(span: &SourceSpan) -> LogicaResult<Proposition> {
    let parts = lexer::split(span, ",")?;
    if parts.len() > 1 {
        let parsed = parts
            .iter()
            .map(parse_primary_proposition)
            .collect::<LogicaResult<Vec<_>>>()?;
        return Ok(Proposition::conjunction(parsed));
    }
    parse_primary_proposition(span)
}

fn parse_primary_proposition(span: &SourceSpan) -> LogicaResult<Proposition> {
    let text = span.text();
    if let Some(rest) = text.strip_prefix('~') {
        let inner = span.sub(span.len() - rest.len(), span.len());
        return Ok(Proposition::NegationAsAggregate(Box::new(parse_proposition(&inner)?)));
    }

    if let Some((left, right)) = lexer::split_once(span, "in")? {
        return Ok(Proposition::Inclusion {
            element: parse_expression(&left)?,
            collection: parse_expression(&right)?,
        });
    }

    // Unification uses `=` or `==`; the remaining comparisons lower to builtin calls.
    let parts = lexer::split_any(span, &["==", "!=", "<=", ">=", "<", ">", "="])?;
    if parts.len() == 2 {
        let (left, _) = &parts[0];
        let (right, op) = &parts[1];
        let left_expr = parse_expression(left)?;
        let right_expr = parse_expression(right)?;
        return Ok(match *op {
            Some("=") | Some("==") => Proposition::Unification {
                left: left_expr,
                right: right_expr,
            },
            Some(token) => Proposition::Call(builtin_call(
                comparison_builtin(token),
                vec![left_expr, right_expr],
                span.clone(),
            )),
            None => unreachable!("split_any always tags non-first pieces"),
        });
    }

    if let Some(call) = try_parse_call(span)? {
        return Ok(Proposition::Call(call));
    }

    Err(LogicaError::syntactic("could not parse proposition", span.clone()))
}

/// `token` is always one of the ordering comparisons from the `split_any`
/// call above; `"="`/`"=="` are matched separately as unification.
fn comparison_builtin(token: &str) -> &'static str {
    match token {
        "!=" => builtins::NOT_EQUALS,
        "<=" => builtins::LESS_OR_EQUAL,
        ">=" => builtins::GREATER_OR_EQUAL,
        "<" => builtins::LESS,
        _ => builtins::GREATER,
    }
}

/// Parse a value expression: record fields, combine values, list elements,
/// subscript indices, `if`/`else` branch values, and the top-level rule value.
pub fn parse_expression(span: &SourceSpan) -> LogicaResult<Expression> {
    let span = strip_and_unwrap(span);
    if span.is_empty() {
        return Err(LogicaError::syntactic("expected an expression, found nothing", span));
    }
    parse_or(&span)
}

macro_rules! binary_level {
    ($name:ident, $next:ident, $ops:expr, $builtin:expr) => {
        fn $name(span: &SourceSpan) -> LogicaResult<Expression> {
            let parts = lexer::split_any(span, $ops)?;
            if parts.len() == 1 {
                return $next(&parts[0].0);
            }
            let mut iter = parts.into_iter();
            let (first_span, _) = iter.next().unwrap();
            let mut acc = $next(&first_span)?;
            for (piece, op) in iter {
                let rhs = $next(&piece)?;
                let name = $builtin(op.expect("split_any tags every non-first piece"));
                acc = builtin_expr(name, vec![acc, rhs], span.clone());
            }
            Ok(acc)
        }
    };
}

binary_level!(parse_or, parse_and, &["||"], |_| builtins::OR);
binary_level!(parse_and, parse_implies, &["&&"], |_| builtins::AND);
binary_level!(parse_implies, parse_eq, &["->"], |_| builtins::IMPLIES);
binary_level!(parse_eq, parse_cmp, &["==", "="], |_| builtins::EQUALS);
binary_level!(parse_cmp, parse_in_is, &["<=", ">=", "!=", "<", ">"], |tok| match tok {
    "<=" => builtins::LESS_OR_EQUAL,
    ">=" => builtins::GREATER_OR_EQUAL,
    "!=" => builtins::NOT_EQUALS,
    "<" => builtins::LESS,
    _ => builtins::GREATER,
});
binary_level!(parse_in_is, parse_concat, &["is not", "is", "in"], |tok| match tok {
    "is not" => builtins::IS_NOT,
    "is" => builtins::IS,
    _ => builtins::IN,
});
binary_level!(parse_concat, parse_add, &["++?", "++"], |tok| {
    if tok == "++?" {
        builtins::CONCAT_OR_NULL
    } else {
        builtins::CONCAT
    }
});
binary_level!(parse_mul, parse_pow, &["*", "/", "%"], |tok| match tok {
    "*" => builtins::MULTIPLY,
    "/" => builtins::DIVIDE,
    _ => builtins::MOD,
});
binary_level!(parse_pow, parse_not, &["^"], |_| builtins::POW);

/// Unary `!`: only legal with an empty left-hand side (`!found`, not `a ! b`).
fn parse_not(span: &SourceSpan) -> LogicaResult<Expression> {
    let parts = lexer::split_any(span, &["!"])?;
    if parts.len() == 1 {
        return parse_postfix(&parts[0].0);
    }
    if parts.len() == 2 && parts[0].0.is_empty() {
        let operand = parse_postfix(&parts[1].0)?;
        return Ok(builtin_expr(builtins::NOT, vec![operand], span.clone()));
    }
    Err(LogicaError::syntactic("'!' requires an empty left-hand side", span.clone()))
}

/// Additive level, with unary `-`/`+` when the left-hand side is empty.
fn parse_add(span: &SourceSpan) -> LogicaResult<Expression> {
    let parts = lexer::split_any(span, &["+", "-"])?;
    if parts.len() == 1 {
        return parse_mul(&parts[0].0);
    }
    let mut iter = parts.into_iter();
    let (first_span, _) = iter.next().unwrap();
    let mut acc = if first_span.is_empty() {
        let (piece, op) = iter.next().ok_or_else(|| {
            LogicaError::syntactic("dangling '+'/'-' with no operand", span.clone())
        })?;
        let operand = parse_mul(&piece)?;
        match op {
            Some("-") => builtin_expr(builtins::NEGATE, vec![operand], span.clone()),
            _ => operand,
        }
    } else {
        parse_mul(&first_span)?
    };
    for (piece, op) in iter {
        let rhs = parse_mul(&piece)?;
        let name = if op == Some("-") { builtins::SUBTRACT } else { builtins::ADD };
        acc = builtin_expr(name, vec![acc, rhs], span.clone());
    }
    Ok(acc)
}

/// Subscript (`a[i]`) and record-subscript (`a.field`) chains, then the atom.
fn parse_postfix(span: &SourceSpan) -> LogicaResult<Expression> {
    let span = strip_and_unwrap(span);
    if let Some((base, index_list)) = trailing_subscript(&span)? {
        let base_expr = parse_postfix(&base)?;
        let indices = lexer::split(&index_list, ",")?;
        let mut acc = base_expr;
        for index_span in indices {
            let index = parse_expression(&index_span)?;
            acc = Expression::new(
                ExpressionKind::Subscript {
                    base: Box::new(acc),
                    index: Box::new(index),
                },
                span.clone(),
            );
        }
        return Ok(acc);
    }
    if let Some((base, field)) = trailing_record_subscript(&span)? {
        let base_expr = parse_postfix(&base)?;
        return Ok(Expression::new(
            ExpressionKind::RecordSubscript {
                base: Box::new(base_expr),
                field,
            },
            span,
        ));
    }
    parse_atom(&span)
}

fn parse_atom(span: &SourceSpan) -> LogicaResult<Expression> {
    let text = span.text();
    if text.is_empty() {
        return Err(LogicaError::syntactic("expected an expression, found nothing", span.clone()));
    }

    if let Some(combine) = try_parse_combine(span)? {
        return Ok(Expression::new(ExpressionKind::Combine(Box::new(combine)), span.clone()));
    }
    if let Some(implication) = try_parse_implication(span)? {
        return Ok(Expression::new(ExpressionKind::Implication(Box::new(implication)), span.clone()));
    }
    if let Some(call) = try_parse_call(span)? {
        return Ok(Expression::new(ExpressionKind::Call(Box::new(call)), span.clone()));
    }
    if text.starts_with('[') && text.ends_with(']') {
        let inner = span.sub(1, span.len() - 1);
        if is_whole(&inner) {
            let items = lexer::split(&inner, ",")?
                .iter()
                .filter(|p| !p.is_empty())
                .map(parse_expression)
                .collect::<LogicaResult<Vec<_>>>()?;
            return Ok(Expression::new(ExpressionKind::List(items), span.clone()));
        }
    }
    if looks_like_record(span)? {
        let record = parse_record_fields(span)?;
        return Ok(Expression::new(ExpressionKind::Record(record), span.clone()));
    }
    if let Some(lit) = try_parse_literal(text) {
        return Ok(Expression::new(ExpressionKind::Literal(lit), span.clone()));
    }
    if is_identifier(text) {
        return Ok(Expression::new(ExpressionKind::Variable(text.to_string()), span.clone()));
    }
    Err(LogicaError::syntactic(format!("could not parse expression '{text}'"), span.clone()))
}

fn looks_like_record(span: &SourceSpan) -> LogicaResult<bool> {
    let text = span.text();
    if text.starts_with("..") {
        return Ok(true);
    }
    let fields = lexer::split(span, ",")?;
    if fields.len() > 1 {
        return Ok(true);
    }
    // A single unnamed field is indistinguishable from a plain grouped
    // expression and is treated as one; a single *named* field (`name:
    // expr`) is still a one-field record.
    Ok(lexer::split_once(span, ":")?.is_some())
}

pub(crate) fn parse_record_fields(span: &SourceSpan) -> LogicaResult<RecordExpr> {
    if span.is_empty() {
        return Ok(RecordExpr::empty());
    }
    let pieces = lexer::split(span, ",")?;
    let mut fields = Vec::new();
    let mut rest = None;
    let mut positional_idx = 0usize;
    for piece in pieces {
        let text = piece.text();
        if let Some(name) = text.strip_prefix("..") {
            rest = Some(name.trim().to_string());
            continue;
        }
        if let Some((name_part, agg_part)) = split_before_aggregate_op(&piece)? {
            let (op, value_span) = agg_part;
            fields.push(FieldValue {
                name: FieldName::Named(name_part.text().to_string()),
                value: parse_expression(&value_span)?,
                aggregate: Some(op),
            });
        } else if let Some((name_part, value_part)) = lexer::split_once(&piece, ":")? {
            fields.push(FieldValue {
                name: FieldName::Named(name_part.text().to_string()),
                value: parse_expression(&value_part)?,
                aggregate: None,
            });
        } else {
            fields.push(FieldValue {
                name: FieldName::Positional(positional_idx),
                value: parse_expression(&piece)?,
                aggregate: None,
            });
        }
        positional_idx += 1;
    }
    Ok(RecordExpr { fields, rest })
}

/// Splits a head field of the form `name? Op= expr`, returning the name span
/// and the matched operator plus the remaining value span.
fn split_before_aggregate_op(piece: &SourceSpan) -> LogicaResult<Option<(SourceSpan, (AggregateOp, SourceSpan))>> {
    let Some((name_part, agg_part)) = lexer::split_once(piece, "?")? else {
        return Ok(None);
    };
    let agg_text = agg_part.text();
    let Some(op) = AggregateOp::all().into_iter().find(|op| agg_text.starts_with(op.token())) else {
        return Err(LogicaError::syntactic(
            "expected an aggregate operator (e.g. 'Sum=') after '?'",
            agg_part,
        ));
    };
    let value_span = strip(&agg_part.sub(op.token().len(), agg_part.len()));
    Ok(Some((name_part, (op, value_span))))
}

fn try_parse_literal(text: &str) -> Option<Literal> {
    match text {
        "true" => return Some(Literal::Bool(true)),
        "false" => return Some(Literal::Bool(false)),
        "null" => return Some(Literal::Null),
        _ => {}
    }
    if let Some(stripped) = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Some(Literal::String(unescape(stripped)));
    }
    if let Some(stripped) = text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Some(Literal::String(unescape(stripped)));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Literal::Int(i));
    }
    if text.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
        if let Ok(f) = text.parse::<f64>() {
            return Some(Literal::Float(f));
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Detects `name(record)` spanning the entire input.
pub(crate) fn try_parse_call(span: &SourceSpan) -> LogicaResult<Option<PredicateCall>> {
    let text = span.text();
    let Some(paren_idx) = text.find('(') else {
        return Ok(None);
    };
    if !text.ends_with(')') {
        return Ok(None);
    }
    let name = &text[..paren_idx];
    if name.is_empty() || !is_identifier(name) {
        return Ok(None);
    }
    if !is_whole(span) {
        return Ok(None);
    }
    let inner = span.sub(paren_idx + 1, span.len() - 1);
    let record = parse_record_fields(&inner)?;
    Ok(Some(PredicateCall {
        predicate_name: name.to_string(),
        record,
        heritage: span.clone(),
    }))
}

/// `combine Op= expr :- body`, and its `Op{expr :- body}` sugar.
fn try_parse_combine(span: &SourceSpan) -> LogicaResult<Option<CombineExpr>> {
    let text = span.text();
    if let Some(rest) = strip_keyword(text, "combine") {
        let rest_span = strip(&span.sub(span.len() - rest.len(), span.len()));
        let Some((assign_part, body_part)) = lexer::split_once(&rest_span, ":-")? else {
            return Err(LogicaError::syntactic("combine expression requires ':-'", span.clone()));
        };
        let assign_text = assign_part.text();
        let Some(op) = AggregateOp::all().into_iter().find(|op| assign_text.starts_with(op.token())) else {
            return Err(LogicaError::syntactic(
                "expected an aggregate operator (e.g. 'Sum=') after 'combine'",
                assign_part,
            ));
        };
        let value_span = strip(&assign_part.sub(op.token().len(), assign_part.len()));
        return Ok(Some(CombineExpr {
            op,
            value: Box::new(parse_expression(&value_span)?),
            body: Box::new(parse_proposition(&body_part)?),
        }));
    }

    for op in AggregateOp::all() {
        let bare = op.bare_token();
        if let Some(rest) = text.strip_prefix(bare) {
            if rest.starts_with('{') && text.ends_with('}') {
                let inner = span.sub(bare.len() + 1, span.len() - 1);
                if is_whole(&inner) {
                    let Some((value_part, body_part)) = lexer::split_once(&inner, ":-")? else {
                        return Err(LogicaError::syntactic("combine sugar requires ':-'", span.clone()));
                    };
                    return Ok(Some(CombineExpr {
                        op,
                        value: Box::new(parse_expression(&value_part)?),
                        body: Box::new(parse_proposition(&body_part)?),
                    }));
                }
            }
        }
    }
    Ok(None)
}

/// `if c1 then v1 else if c2 then v2 ... else vN`.
fn try_parse_implication(span: &SourceSpan) -> LogicaResult<Option<ImplicationExpr>> {
    let text = span.text();
    let Some(first_rest) = strip_keyword(text, "if") else {
        return Ok(None);
    };
    let mut rest_span = strip(&span.sub(span.len() - first_rest.len(), span.len()));
    let mut branches = Vec::new();
    let else_value = loop {
        let Some((cond_span, after_then)) = lexer::split_once(&rest_span, "then")? else {
            return Err(LogicaError::syntactic("'if' requires 'then'", span.clone()));
        };
        let Some((value_span, after_else)) = lexer::split_once(&after_then, "else")? else {
            // No trailing else: this language requires every branch of a
            // value-producing `if` to be covered, so a dangling `then` with
            // no `else` is a syntax error rather than an implicit null.
            return Err(LogicaError::syntactic("'if' expression requires 'else'", span.clone()));
        };
        branches.push((parse_proposition(&cond_span)?, parse_expression(&value_span)?));
        match strip_keyword(after_else.text(), "if") {
            Some(r) => {
                rest_span = strip(&after_else.sub(after_else.len() - r.len(), after_else.len()));
            }
            None => break Some(Box::new(parse_expression(&after_else)?)),
        }
    };
    Ok(Some(ImplicationExpr { branches, else_value }))
}

fn strip_keyword<'a>(text: &'a str, kw: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(kw)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

fn trailing_subscript(span: &SourceSpan) -> LogicaResult<Option<(SourceSpan, SourceSpan)>> {
    let text = span.text();
    if !text.ends_with(']') {
        return Ok(None);
    }
    let Some(open_byte) = find_top_level_open_for_trailing_close(span, '[', ']')? else {
        return Ok(None);
    };
    if open_byte == 0 {
        // `[...]` at the very start is a list literal, not a subscript.
        return Ok(None);
    }
    let base = span.sub(0, open_byte);
    if !is_whole(&base) {
        return Ok(None);
    }
    let index_list = span.sub(open_byte + 1, span.len() - 1);
    Ok(Some((strip_and_unwrap(&base), index_list)))
}

fn find_top_level_open_for_trailing_close(
    span: &SourceSpan,
    open: char,
    close: char,
) -> LogicaResult<Option<usize>> {
    let states = lexer::scan(span)?;
    let text = span.text();
    if !text.ends_with(close) {
        return Ok(None);
    }
    let mut stack: Vec<usize> = Vec::new();
    let mut last_pair: Option<(usize, usize)> = None;
    for (byte, ch) in text.char_indices() {
        let top = states
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, s)| !s.in_string && !s.in_comment)
            .unwrap_or(true);
        if !top {
            continue;
        }
        if ch == open {
            stack.push(byte);
        } else if ch == close {
            if let Some(start) = stack.pop() {
                if stack.is_empty() {
                    last_pair = Some((start, byte));
                }
            }
        }
    }
    match last_pair {
        Some((start, end)) if end + close.len_utf8() == text.len() => Ok(Some(start)),
        _ => Ok(None),
    }
}

fn trailing_record_subscript(span: &SourceSpan) -> LogicaResult<Option<(SourceSpan, String)>> {
    let states = lexer::scan(span)?;
    let text = span.text();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut found: Option<usize> = None;
    for (i, (byte, ch)) in chars.iter().enumerate() {
        if *ch != '.' {
            continue;
        }
        let top = states
            .iter()
            .find(|(b, _)| b == byte)
            .map(|(_, s)| s.is_top())
            .unwrap_or(false);
        if !top {
            continue;
        }
        let next = chars.get(i + 1).map(|(_, c)| *c);
        if next.map(|c| c.is_alphabetic() || c == '_').unwrap_or(false) {
            found = Some(*byte);
        }
    }
    let Some(dot_byte) = found else {
        return Ok(None);
    };
    let base = span.sub(0, dot_byte);
    if !is_whole(&base) {
        return Ok(None);
    }
    let field = text[dot_byte + 1..].to_string();
    if field.is_empty() || !field.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Ok(None);
    }
    Ok(Some((strip_and_unwrap(&base), field)))
}

fn builtin_expr(name: &str, args: Vec<Expression>, heritage: SourceSpan) -> Expression {
    Expression::new(ExpressionKind::Call(Box::new(builtin_call(name, args, heritage.clone()))), heritage)
}

fn builtin_call(name: &str, args: Vec<Expression>, heritage: SourceSpan) -> PredicateCall {
    let fields = args
        .into_iter()
        .enumerate()
        .map(|(i, value)| FieldValue {
            name: FieldName::Positional(i),
            value,
            aggregate: None,
        })
        .collect();
    PredicateCall {
        predicate_name: name.to_string(),
        record: RecordExpr { fields, rest: None },
        heritage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn span(text: &str) -> SourceSpan {
        Arc::new(SourceBuffer::new("t.l", text)).whole_span()
    }

    #[test]
    fn parses_variable_and_literal() {
        let expr = parse_expression(&span("x")).unwrap();
        assert!(matches!(expr.kind, ExpressionKind::Variable(ref n) if n == "x"));
        let expr = parse_expression(&span("42")).unwrap();
        assert!(matches!(expr.kind, ExpressionKind::Literal(Literal::Int(42))));
    }

    #[test]
    fn parses_arithmetic_into_builtin_calls() {
        let expr = parse_expression(&span("a + b * c")).unwrap();
        let ExpressionKind::Call(call) = expr.kind else {
            panic!("expected a call");
        };
        assert_eq!(call.predicate_name, builtins::ADD);
        assert_eq!(call.record.fields.len(), 2);
    }

    #[test]
    fn parses_unary_minus() {
        let expr = parse_expression(&span("-x")).unwrap();
        let ExpressionKind::Call(call) = expr.kind else {
            panic!("expected a call");
        };
        assert_eq!(call.predicate_name, builtins::NEGATE);
        assert_eq!(call.record.fields.len(), 1);
    }

    #[test]
    fn parses_call_with_named_fields() {
        let expr = parse_expression(&span("Parent(x: a, y: b)")).unwrap();
        let ExpressionKind::Call(call) = expr.kind else {
            panic!("expected a call");
        };
        assert_eq!(call.predicate_name, "Parent");
        assert_eq!(call.record.fields.len(), 2);
    }

    #[test]
    fn parses_subscript_chain() {
        let expr = parse_expression(&span("matrix[i][j]")).unwrap();
        let ExpressionKind::Subscript { base, index } = expr.kind else {
            panic!("expected a subscript");
        };
        assert!(matches!(index.kind, ExpressionKind::Variable(ref n) if n == "j"));
        assert!(matches!(base.kind, ExpressionKind::Subscript { .. }));
    }

    #[test]
    fn parses_record_subscript_chain() {
        let expr = parse_expression(&span("a.b.c")).unwrap();
        let ExpressionKind::RecordSubscript { base, field } = expr.kind else {
            panic!("expected a record subscript");
        };
        assert_eq!(field, "c");
        assert!(matches!(base.kind, ExpressionKind::RecordSubscript { ref field, .. } if field == "b"));
    }

    #[test]
    fn does_not_confuse_float_literal_with_record_subscript() {
        let expr = parse_expression(&span("3.14")).unwrap();
        assert!(matches!(expr.kind, ExpressionKind::Literal(Literal::Float(f)) if (f - 3.14).abs() < 1e-9));
    }

    #[test]
    fn parses_combine_sugar() {
        let expr = parse_expression(&span("Sum{x :- Edge(x, y)}")).unwrap();
        let ExpressionKind::Combine(c) = expr.kind else {
            panic!("expected a combine expression");
        };
        assert_eq!(c.op, AggregateOp::Sum);
    }

    #[test]
    fn parses_explicit_combine() {
        let expr = parse_expression(&span("combine Max= x :- Edge(x, y)")).unwrap();
        let ExpressionKind::Combine(c) = expr.kind else {
            panic!("expected a combine expression");
        };
        assert_eq!(c.op, AggregateOp::Max);
    }

    #[test]
    fn parses_if_then_else_chain() {
        let expr = parse_expression(&span("if x > 0 then 1 else if x < 0 then -1 else 0")).unwrap();
        let ExpressionKind::Implication(i) = expr.kind else {
            panic!("expected an implication");
        };
        assert_eq!(i.branches.len(), 2);
        assert!(i.else_value.is_some());
    }

    #[test]
    fn parses_list_literal() {
        let expr = parse_expression(&span("[1, 2, 3]")).unwrap();
        let ExpressionKind::List(items) = expr.kind else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn parses_proposition_disjunction_and_conjunction() {
        let prop = parse_proposition(&span("Edge(a, b), Edge(b, c) | Edge(a, c)")).unwrap();
        let Proposition::Disjunction(parts) = prop else {
            panic!("expected a disjunction");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Proposition::Conjunction(_)));
    }

    #[test]
    fn parses_negation_as_aggregate() {
        let prop = parse_proposition(&span("~Edge(a, b)")).unwrap();
        assert!(matches!(prop, Proposition::NegationAsAggregate(_)));
    }

    #[test]
    fn parses_inclusion() {
        let prop = parse_proposition(&span("x in [1, 2, 3]")).unwrap();
        assert!(matches!(prop, Proposition::Inclusion { .. }));
    }

    #[test]
    fn parses_bare_and_double_equals_as_unification() {
        let prop = parse_proposition(&span("x = y")).unwrap();
        assert!(matches!(prop, Proposition::Unification { .. }));
        let prop = parse_proposition(&span("x == y")).unwrap();
        assert!(matches!(prop, Proposition::Unification { .. }));
    }

    #[test]
    fn parses_ordering_comparisons_as_builtin_calls() {
        let prop = parse_proposition(&span("x != y")).unwrap();
        let Proposition::Call(call) = prop else {
            panic!("expected a call");
        };
        assert_eq!(call.predicate_name, builtins::NOT_EQUALS);

        let prop = parse_proposition(&span("x > 0")).unwrap();
        let Proposition::Call(call) = prop else {
            panic!("expected a call");
        };
        assert_eq!(call.predicate_name, builtins::GREATER);
    }

    #[test]
    fn single_field_parens_are_grouping_not_a_record() {
        let expr = parse_expression(&span("(a + b)")).unwrap();
        assert!(matches!(expr.kind, ExpressionKind::Call(_)));
    }

    #[test]
    fn multi_field_parens_are_a_record() {
        let expr = parse_expression(&span("(a, b: 2)")).unwrap();
        assert!(matches!(expr.kind, ExpressionKind::Record(_)));
    }
}
