//! Lexical traverser and splitter.
//!
//! This is the foundation every other parser in the crate is built on: a
//! character-by-character scan that tracks bracket nesting, string/backtick
//! quoting, and comments, plus a `split` primitive that cuts a span on a
//! separator *only* at top nesting level, outside strings and comments.
//! Nothing above this module inspects source text directly.

use crate::error::{LogicaError, LogicaResult};
use crate::span::SourceSpan;

/// The traversal state immediately before the character at some byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraverseState {
    pub bracket_depth: usize,
    pub in_string: bool,
    pub in_comment: bool,
}

impl TraverseState {
    /// "Top" state: empty bracket stack, not inside a string, not inside a comment.
    pub fn is_top(&self) -> bool {
        self.bracket_depth == 0 && !self.in_string && !self.in_comment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Single,
    Double,
    Triple(char),
    Backtick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentKind {
    Line,
    Block(u32),
}

/// One entry per character of the span: its byte offset and the state that
/// held immediately before that character was consumed. A final entry at
/// `text.len()` records the state after the last character, which is what
/// [`is_whole`] inspects.
pub fn scan(span: &SourceSpan) -> LogicaResult<Vec<(usize, TraverseState)>> {
    let text = span.text();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::with_capacity(chars.len() + 1);
    let mut brackets: Vec<char> = Vec::new();
    let mut string_kind: Option<StringKind> = None;
    let mut comment_kind: Option<CommentKind> = None;

    let at = |idx: usize| chars.get(idx).map(|(_, c)| *c);
    let starts_with = |idx: usize, pat: &str| {
        let pat_chars: Vec<char> = pat.chars().collect();
        pat_chars
            .iter()
            .enumerate()
            .all(|(o, pc)| at(idx + o) == Some(*pc))
    };

    let mut i = 0usize;
    while i < chars.len() {
        let (byte, c) = chars[i];
        out.push((
            byte,
            TraverseState {
                bracket_depth: brackets.len(),
                in_string: string_kind.is_some(),
                in_comment: comment_kind.is_some(),
            },
        ));

        if let Some(kind) = comment_kind {
            match kind {
                CommentKind::Line => {
                    if c == '\n' {
                        comment_kind = None;
                    }
                    i += 1;
                }
                CommentKind::Block(depth) => {
                    if starts_with(i, "*/") {
                        comment_kind = if depth > 1 {
                            Some(CommentKind::Block(depth - 1))
                        } else {
                            None
                        };
                        i += 2;
                    } else if starts_with(i, "/*") {
                        comment_kind = Some(CommentKind::Block(depth + 1));
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
            }
            continue;
        }

        if let Some(kind) = string_kind {
            match kind {
                StringKind::Single | StringKind::Double => {
                    let quote = if kind == StringKind::Single { '\'' } else { '"' };
                    if c == '\\' && i + 1 < chars.len() {
                        i += 2;
                    } else if c == quote {
                        string_kind = None;
                        i += 1;
                    } else if c == '\n' {
                        return Err(LogicaError::lexical(
                            "newline inside a single-line string",
                            span.sub(byte, (byte + 1).min(text.len())),
                        ));
                    } else {
                        i += 1;
                    }
                }
                StringKind::Triple(quote) => {
                    let triple: String = std::iter::repeat(quote).take(3).collect();
                    if c == '\\' && i + 1 < chars.len() {
                        i += 2;
                    } else if starts_with(i, &triple) {
                        string_kind = None;
                        i += 3;
                    } else {
                        i += 1;
                    }
                }
                StringKind::Backtick => {
                    if c == '`' {
                        string_kind = None;
                        i += 1;
                    } else if c == '\n' {
                        return Err(LogicaError::lexical(
                            "newline inside a backticked identifier",
                            span.sub(byte, (byte + 1).min(text.len())),
                        ));
                    } else {
                        i += 1;
                    }
                }
            }
            continue;
        }

        if c == '#' {
            comment_kind = Some(CommentKind::Line);
            i += 1;
        } else if starts_with(i, "/*") {
            comment_kind = Some(CommentKind::Block(1));
            i += 2;
        } else if starts_with(i, "\"\"\"") {
            string_kind = Some(StringKind::Triple('"'));
            i += 3;
        } else if starts_with(i, "'''") {
            string_kind = Some(StringKind::Triple('\''));
            i += 3;
        } else if c == '"' {
            string_kind = Some(StringKind::Double);
            i += 1;
        } else if c == '\'' {
            string_kind = Some(StringKind::Single);
            i += 1;
        } else if c == '`' {
            string_kind = Some(StringKind::Backtick);
            i += 1;
        } else if c == '(' || c == '[' || c == '{' {
            brackets.push(c);
            i += 1;
        } else if c == ')' || c == ']' || c == '}' {
            let expected = match c {
                ')' => '(',
                ']' => '[',
                _ => '{',
            };
            match brackets.pop() {
                Some(open) if open == expected => {}
                _ => {
                    return Err(LogicaError::lexical(
                        format!("unmatched '{c}'"),
                        span.sub(byte, (byte + 1).min(text.len())),
                    ));
                }
            }
            i += 1;
        } else {
            i += 1;
        }
    }

    out.push((
        text.len(),
        TraverseState {
            bracket_depth: brackets.len(),
            in_string: string_kind.is_some(),
            in_comment: comment_kind.is_some(),
        },
    ));

    if !brackets.is_empty() {
        return Err(LogicaError::lexical(
            format!("unclosed '{}'", brackets[brackets.len() - 1]),
            span.clone(),
        ));
    }
    if string_kind.is_some() {
        return Err(LogicaError::lexical("unterminated string", span.clone()));
    }

    Ok(out)
}

/// True iff traversal of `span` ends with an empty bracket stack and no open
/// string or comment. The fundamental predicate used throughout parsing.
pub fn is_whole(span: &SourceSpan) -> bool {
    match scan(span) {
        Ok(states) => states.last().map(|(_, s)| s.is_top()).unwrap_or(true),
        Err(_) => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whitespace-strip a span and, while it is wholly wrapped in a matching
/// outer bracket pair, remove that pair too.
pub fn strip_and_unwrap(span: &SourceSpan) -> SourceSpan {
    let mut cur = strip(span);
    loop {
        let text = cur.text();
        if text.len() < 2 {
            return cur;
        }
        let wraps = (text.starts_with('(') && text.ends_with(')'))
            || (text.starts_with('[') && text.ends_with(']'))
            || (text.starts_with('{') && text.ends_with('}'));
        if !wraps {
            return cur;
        }
        let inner = cur.sub(1, cur.len() - 1);
        if !is_whole(&inner) {
            return cur;
        }
        cur = strip(&inner);
    }
}

/// Whitespace-strip a span without touching brackets.
pub fn strip(span: &SourceSpan) -> SourceSpan {
    let text = span.text();
    let start = text.len() - text.trim_start().len();
    let end = start + text[start..].trim_end().len();
    span.sub(start, end)
}

/// Split `span` by `sep` at top nesting level, outside strings/comments.
/// Each returned span is whitespace-stripped and outer-paren-unwrapped.
/// `sep` adjacent to another `|` is never treated as a split point (so `||`
/// survives splitting on `|`); a single alphanumeric separator (`in`, `is`,
/// `as`, ...) only splits at a word boundary on both sides.
pub fn split(span: &SourceSpan, sep: &str) -> LogicaResult<Vec<SourceSpan>> {
    let states = scan(span)?;
    let text = span.text();
    let sep_chars: Vec<char> = sep.chars().collect();
    let sep_is_word = sep.chars().all(is_word_char) && !sep.is_empty();
    let text_chars: Vec<(usize, char)> = text.char_indices().collect();

    let top_at = |byte: usize| -> bool {
        states
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, s)| s.is_top())
            .unwrap_or(false)
    };

    let char_at_idx = |idx: usize| text_chars.get(idx).map(|(_, c)| *c);
    let matches_at = |idx: usize| -> bool {
        sep_chars
            .iter()
            .enumerate()
            .all(|(o, c)| char_at_idx(idx + o) == Some(*c))
    };

    let mut cut_points: Vec<(usize, usize)> = Vec::new(); // (start_byte, end_byte)
    let mut idx = 0usize;
    while idx < text_chars.len() {
        let (byte, _) = text_chars[idx];
        if top_at(byte) && matches_at(idx) {
            let end_idx = idx + sep_chars.len();
            let end_byte = text_chars
                .get(end_idx)
                .map(|(b, _)| *b)
                .unwrap_or(text.len());

            let prev_char = if idx > 0 { char_at_idx(idx - 1) } else { None };
            let next_char = char_at_idx(end_idx);

            let reject = if sep == "|" {
                prev_char == Some('|') || next_char == Some('|')
            } else if sep_is_word {
                let before_ok = prev_char.map(|c| !is_word_char(c)).unwrap_or(true);
                let after_ok = next_char.map(|c| !is_word_char(c)).unwrap_or(true);
                !(before_ok && after_ok)
            } else {
                false
            };

            if !reject {
                cut_points.push((byte, end_byte));
                idx = end_idx;
                continue;
            }
        }
        idx += 1;
    }

    let mut pieces = Vec::with_capacity(cut_points.len() + 1);
    let mut cursor = 0usize;
    for (start, end) in &cut_points {
        pieces.push(span.sub(cursor, *start));
        cursor = *end;
    }
    pieces.push(span.sub(cursor, text.len()));

    Ok(pieces.iter().map(strip_and_unwrap).collect())
}

/// Split `span` at top nesting level on the first (leftmost) occurrence, at
/// each candidate position, of any operator in `ops`. Candidates earlier in
/// `ops` win ties at the same position, so callers list longer tokens (e.g.
/// `"<="`) before their prefixes (`"<"`). Returns each piece paired with the
/// operator token that *preceded* it (`None` for the first piece).
pub fn split_any<'o>(
    span: &SourceSpan,
    ops: &[&'o str],
) -> LogicaResult<Vec<(SourceSpan, Option<&'o str>)>> {
    let states = scan(span)?;
    let text = span.text();
    let text_chars: Vec<(usize, char)> = text.char_indices().collect();

    let top_at = |byte: usize| -> bool {
        states
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, s)| s.is_top())
            .unwrap_or(false)
    };
    let char_at_idx = |idx: usize| text_chars.get(idx).map(|(_, c)| *c);
    let matches_at = |idx: usize, op: &str| -> bool {
        op.chars()
            .enumerate()
            .all(|(o, c)| char_at_idx(idx + o) == Some(c))
    };

    let mut cuts: Vec<(usize, usize, &'o str)> = Vec::new();
    let mut idx = 0usize;
    while idx < text_chars.len() {
        let (byte, _) = text_chars[idx];
        if top_at(byte) {
            if let Some(op) = ops.iter().find(|op| matches_at(idx, op)) {
                let op_chars = op.chars().count();
                let end_idx = idx + op_chars;
                let end_byte = text_chars
                    .get(end_idx)
                    .map(|(b, _)| *b)
                    .unwrap_or(text.len());
                let prev_char = if idx > 0 { char_at_idx(idx - 1) } else { None };
                let next_char = char_at_idx(end_idx);
                let op_is_word = op.chars().all(is_word_char);

                let reject = if *op == "|" {
                    prev_char == Some('|') || next_char == Some('|')
                } else if op_is_word {
                    let before_ok = prev_char.map(|c| !is_word_char(c)).unwrap_or(true);
                    let after_ok = next_char.map(|c| !is_word_char(c)).unwrap_or(true);
                    !(before_ok && after_ok)
                } else {
                    false
                };

                if !reject {
                    cuts.push((byte, end_byte, op));
                    idx = end_idx;
                    continue;
                }
            }
        }
        idx += 1;
    }

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut cursor = 0usize;
    let mut leading_op: Option<&'o str> = None;
    for (start, end, op) in &cuts {
        pieces.push((strip_and_unwrap(&span.sub(cursor, *start)), leading_op));
        leading_op = Some(op);
        cursor = *end;
    }
    pieces.push((strip_and_unwrap(&span.sub(cursor, text.len())), leading_op));

    Ok(pieces)
}

/// Split `span` at the *first* top-level occurrence of `tok` only; unlike
/// [`split`], later occurrences are left untouched in the right-hand piece.
/// Used for constructs parsed by iterated peeling (e.g. `if/then/else if`).
pub fn split_once(span: &SourceSpan, tok: &str) -> LogicaResult<Option<(SourceSpan, SourceSpan)>> {
    let states = scan(span)?;
    let text = span.text();
    let text_chars: Vec<(usize, char)> = text.char_indices().collect();
    let tok_is_word = tok.chars().all(is_word_char) && !tok.is_empty();

    let top_at = |byte: usize| -> bool {
        states
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, s)| s.is_top())
            .unwrap_or(false)
    };
    let char_at_idx = |idx: usize| text_chars.get(idx).map(|(_, c)| *c);
    let matches_at = |idx: usize| -> bool {
        tok.chars()
            .enumerate()
            .all(|(o, c)| char_at_idx(idx + o) == Some(c))
    };

    let mut idx = 0usize;
    while idx < text_chars.len() {
        let (byte, _) = text_chars[idx];
        if top_at(byte) && matches_at(idx) {
            let end_idx = idx + tok.chars().count();
            let end_byte = text_chars
                .get(end_idx)
                .map(|(b, _)| *b)
                .unwrap_or(text.len());
            let prev_char = if idx > 0 { char_at_idx(idx - 1) } else { None };
            let next_char = char_at_idx(end_idx);
            let reject = tok_is_word
                && !(prev_char.map(|c| !is_word_char(c)).unwrap_or(true)
                    && next_char.map(|c| !is_word_char(c)).unwrap_or(true));
            if !reject {
                let left = strip_and_unwrap(&span.sub(0, byte));
                let right = strip_and_unwrap(&span.sub(end_byte, text.len()));
                return Ok(Some((left, right)));
            }
        }
        idx += 1;
    }
    Ok(None)
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
    fn splits_at_top_level_only() {
        let s = span("Parent(a, b), Friend(a, Related(b, c))");
        let parts = split(&s, ",").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text(), "Parent(a, b)");
        assert_eq!(parts[1].text(), "Friend(a, Related(b, c))");
    }

    #[test]
    fn ignores_separator_inside_string() {
        let s = span(r#"f("a, b"), g(c)"#);
        let parts = split(&s, ",").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text(), r#"f("a, b")"#);
    }

    #[test]
    fn double_pipe_not_split_on_single_pipe() {
        let s = span("a || b | c");
        let parts = split(&s, "|").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text(), "a || b");
        assert_eq!(parts[1].text(), "c");
    }

    #[test]
    fn word_separator_requires_boundary() {
        let s = span("x in y, margin in z");
        let parts = split(&s, "in").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text(), "x");
        assert_eq!(parts[1].text(), "y, margin in z");
    }

    #[test]
    fn unwraps_redundant_outer_parens() {
        let s = span("((a + b))");
        let stripped = strip_and_unwrap(&s);
        assert_eq!(stripped.text(), "a + b");
    }

    #[test]
    fn does_not_unwrap_mismatched_parens() {
        let s = span("(a)(b)");
        let stripped = strip_and_unwrap(&s);
        assert_eq!(stripped.text(), "(a)(b)");
    }

    #[test]
    fn unmatched_closing_bracket_is_error() {
        let s = span("foo(a, b))");
        assert!(scan(&s).is_err());
    }

    #[test]
    fn eol_inside_single_line_string_is_error() {
        let s = span("\"abc\ndef\"");
        assert!(scan(&s).is_err());
    }

    #[test]
    fn triple_quoted_string_allows_newline() {
        let s = span("\"\"\"abc\ndef\"\"\"");
        assert!(is_whole(&s));
    }

    #[test]
    fn is_whole_false_for_open_bracket() {
        let s = span("foo(a, b");
        assert!(!is_whole(&s));
    }

    #[test]
    fn split_any_prefers_longer_token_and_tracks_operator() {
        let s = span("a <= b + c");
        let parts = split_any(&s, &["<=", "<", "+"]).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].0.text(), "a");
        assert_eq!(parts[0].1, None);
        assert_eq!(parts[1].0.text(), "b");
        assert_eq!(parts[1].1, Some("<="));
        assert_eq!(parts[2].0.text(), "c");
        assert_eq!(parts[2].1, Some("+"));
    }

    #[test]
    fn split_once_leaves_later_occurrences_untouched() {
        let s = span("if a then if b then 1 else 2 else 3");
        let (cond, rest) = split_once(&s, "then").unwrap().unwrap();
        assert_eq!(cond.text(), "if a");
        assert_eq!(rest.text(), "if b then 1 else 2 else 3");
    }

    // Property: concatenating split(s, t) with t reproduces s, modulo the
    // whitespace stripped from each fragment and the parens unwrapped.
    proptest::proptest! {
        #[test]
        fn split_soundness(a in "[a-zA-Z0-9_]{0,8}", b in "[a-zA-Z0-9_]{0,8}", c in "[a-zA-Z0-9_]{0,8}") {
            let text = format!("{a},{b},{c}");
            let s = span(&text);
            let parts = split(&s, ",").unwrap();
            let rebuilt = parts.iter().map(|p| p.text()).collect::<Vec<_>>().join(",");
            proptest::prop_assert_eq!(rebuilt, text);
        }
    }
}
