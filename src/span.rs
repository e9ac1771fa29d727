//! Source buffer with heritage tracking.
//!
//! Every AST node, error, and warning traces back to a substring of the
//! original program text through a [`SourceSpan`]. The buffer itself is
//! shared (never mutated) so spans stay cheap to copy: a span is just a
//! pair of byte offsets plus a handle to the backing text.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The text of one source file, shared by every span derived from it.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    /// Name used in diagnostics (file path, or "<inline>" for ad-hoc text).
    pub name: Arc<str>,
    text: Arc<str>,
}

impl SourceBuffer {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        SourceBuffer {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// A span covering the whole buffer.
    pub fn whole_span(self: &Arc<Self>) -> SourceSpan {
        SourceSpan {
            buffer: Arc::clone(self),
            start: 0,
            end: self.text.len(),
        }
    }
}

impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("name", &self.name)
            .field("len", &self.text.len())
            .finish()
    }
}

/// An immutable view into a [`SourceBuffer`]: `0 <= start <= end <= len(buffer)`.
///
/// Spans are the crate's only notion of provenance. Parsers construct them
/// from splitter output; every downstream rewrite either keeps the original
/// span (if the node survives unchanged) or drops it deliberately (e.g. a
/// freshly synthesized auxiliary predicate has no single span of its own —
/// it borrows the span of the rule it was synthesized from).
#[derive(Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub buffer: Arc<SourceBuffer>,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(buffer: Arc<SourceBuffer>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        debug_assert!(end <= buffer.len());
        SourceSpan { buffer, start, end }
    }

    /// The exact substring this span covers.
    pub fn text(&self) -> &str {
        &self.buffer.text()[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Sub-span of this span given offsets relative to its own start.
    pub fn sub(&self, rel_start: usize, rel_end: usize) -> SourceSpan {
        SourceSpan {
            buffer: Arc::clone(&self.buffer),
            start: self.start + rel_start,
            end: self.start + rel_end,
        }
    }

    /// Smallest span covering both `self` and `other`. Both must share a buffer.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        debug_assert!(Arc::ptr_eq(&self.buffer, &other.buffer));
        SourceSpan {
            buffer: Arc::clone(&self.buffer),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Up to `max` characters of source around this span, for diagnostics.
    /// The offending substring is wrapped in `>>>` `<<<` markers.
    pub fn snippet(&self, max: usize) -> String {
        let text = self.buffer.text();
        let half = max / 2;
        let ctx_start = self.start.saturating_sub(half);
        let ctx_end = (self.end + half).min(text.len());
        let ctx_start = floor_char_boundary(text, ctx_start);
        let ctx_end = ceil_char_boundary(text, ctx_end);
        let before = &text[ctx_start..self.start];
        let middle = &text[self.start..self.end];
        let after = &text[self.end..ctx_end];
        format!("{before}>>>{middle}<<<{after}")
    }
}

/// A span serializes as its literal source substring. This loses byte-offset
/// and file-name provenance, which is fine for the AST's derived `Serialize`
/// (the JSON export contract only ever wants `expression_heritage` text, not
/// offsets); deserializing rebuilds a standalone single-span buffer over that
/// text rather than reconnecting to the original file, so a round-tripped
/// span is self-consistent but not literally the same span it started as.
impl Serialize for SourceSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.text())
    }
}

impl<'de> Deserialize<'de> for SourceSpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Arc::new(SourceBuffer::new("<deserialized>", text)).whole_span())
    }
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

impl fmt::Debug for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SourceSpan({}:{}..{} {:?})",
            self.buffer.name, self.start, self.end, self.text()
        )
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Arc<SourceBuffer> {
        Arc::new(SourceBuffer::new("t.l", text))
    }

    #[test]
    fn heritage_round_trip() {
        let b = buf("Parent(a, b) :- Friend(a, b);");
        let span = b.whole_span().sub(0, 12);
        assert_eq!(span.text(), "Parent(a, b)");
    }

    #[test]
    fn merge_spans() {
        let b = buf("Parent(a, b) :- Friend(a, b);");
        let whole = b.whole_span();
        let left = whole.sub(0, 6);
        let right = whole.sub(16, 22);
        let merged = left.merge(&right);
        assert_eq!(merged.text(), "Parent(a, b) :- Frien");
    }

    #[test]
    fn snippet_marks_offending_substring() {
        let b = buf("Grandparent(a, b) :- Parent(a, x), Parent(x, b);");
        let span = b.whole_span().sub(21, 34);
        let snippet = span.snippet(300);
        assert!(snippet.contains(">>>Parent(a, x)<<<"));
    }
}
