//! Reserved predicate names produced by lowering operators and comparison/
//! control-flow sugar (`==`, `+`, `in`, `is`, ...) into plain `Call` nodes.
//!
//! The parser never invents ad-hoc AST variants for these — every operator
//! becomes a [`crate::ast::PredicateCall`] against one of these names, so the
//! rest of the pipeline (free-variable analysis, predicate classification,
//! codegen) only ever has to deal with the closed `ExpressionKind`/
//! `Proposition` enums plus a name lookup. Predicate classification must
//! never treat one of these as a user relation needing a view; codegen maps
//! each one directly onto a dialect operator or function.

pub const EQUALS: &str = "Equals";
pub const NOT_EQUALS: &str = "NotEquals";
pub const LESS: &str = "Less";
pub const LESS_OR_EQUAL: &str = "LessOrEqual";
pub const GREATER: &str = "Greater";
pub const GREATER_OR_EQUAL: &str = "GreaterOrEqual";
pub const AND: &str = "And";
pub const OR: &str = "Or";
pub const IMPLIES: &str = "Implies";
pub const NOT: &str = "Not";
pub const IS: &str = "Is";
pub const IS_NOT: &str = "IsNot";
pub const IN: &str = "In";
pub const ADD: &str = "Add";
pub const SUBTRACT: &str = "Subtract";
pub const MULTIPLY: &str = "Multiply";
pub const DIVIDE: &str = "Divide";
pub const MOD: &str = "Mod";
pub const POW: &str = "Pow";
pub const NEGATE: &str = "Negate";
pub const CONCAT: &str = "Concat";
pub const CONCAT_OR_NULL: &str = "ConcatOrNull";
pub const IS_NULL: &str = "IsNull";
pub const ELEMENT: &str = "Element";
pub const ARRAY_TO_STRING: &str = "ArrayToString";
pub const SIZE: &str = "Size";
pub const RECORD_AS_JSON: &str = "RecordAsJson";

pub const ALL: &[&str] = &[
    EQUALS,
    NOT_EQUALS,
    LESS,
    LESS_OR_EQUAL,
    GREATER,
    GREATER_OR_EQUAL,
    AND,
    OR,
    IMPLIES,
    NOT,
    IS,
    IS_NOT,
    IN,
    ADD,
    SUBTRACT,
    MULTIPLY,
    DIVIDE,
    MOD,
    POW,
    NEGATE,
    CONCAT,
    CONCAT_OR_NULL,
    IS_NULL,
    ELEMENT,
    ARRAY_TO_STRING,
    SIZE,
    RECORD_AS_JSON,
];

pub fn is_builtin(name: &str) -> bool {
    ALL.contains(&name)
}
