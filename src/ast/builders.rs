//! Fluent builders for programmatic AST construction, used by the rewriter
//! when it synthesizes rules (multi-body aggregation auxiliaries,
//! `@OrderBy`/`@Limit` annotation rules, functor clones) rather than parsing
//! them from text.

use super::{FieldName, FieldValue, PredicateCall, RecordExpr};
use crate::span::SourceSpan;

pub struct RecordBuilder {
    record: RecordExpr,
}

impl RecordBuilder {
    pub fn new() -> Self {
        RecordBuilder {
            record: RecordExpr::empty(),
        }
    }

    pub fn positional(mut self, value: super::Expression) -> Self {
        let idx = self.record.fields.len();
        self.record.fields.push(FieldValue {
            name: FieldName::Positional(idx),
            value,
            aggregate: None,
        });
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: super::Expression) -> Self {
        self.record.fields.push(FieldValue {
            name: FieldName::Named(name.into()),
            value,
            aggregate: None,
        });
        self
    }

    pub fn build(self) -> RecordExpr {
        self.record
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn call(predicate_name: impl Into<String>, record: RecordExpr, heritage: SourceSpan) -> PredicateCall {
    PredicateCall {
        predicate_name: predicate_name.into(),
        record,
        heritage,
    }
}
