//! Dialect shims (spec §4.5 "Dialect shims", §4.6 dialect errors).
//!
//! A `Dialect` is a small strategy object the SQL writer consults for every
//! piece of surface syntax that differs across engines: identifier quoting,
//! boolean literals, `LIMIT`/`OFFSET` grammar, recursive-CTE availability,
//! and the mapping from `crate::builtins` names to native functions. Adding a
//! fifth engine means adding one more `impl Dialect`, not touching `codegen`.

use crate::error::LogicaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Sqlite,
    Psql,
    Bigquery,
    Duckdb,
}

impl Engine {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqlite" => Some(Engine::Sqlite),
            "psql" | "postgres" | "postgresql" => Some(Engine::Psql),
            "bigquery" => Some(Engine::Bigquery),
            "duckdb" => Some(Engine::Duckdb),
            _ => None,
        }
    }

    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Engine::Sqlite => &Sqlite,
            Engine::Psql => &Postgres,
            Engine::Bigquery => &BigQuery,
            Engine::Duckdb => &DuckDb,
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Engine::Sqlite => "sqlite",
            Engine::Psql => "psql",
            Engine::Bigquery => "bigquery",
            Engine::Duckdb => "duckdb",
        };
        f.write_str(name)
    }
}

/// A bind-parameter placeholder for an `@DefineFlag`-declared flag, resolved
/// at `compile()` time into a literal if the caller supplied an override, or
/// left as a native placeholder otherwise.
pub enum FlagPlaceholder {
    Positional(&'static str),
    Named(String),
}

pub trait Dialect: Sync {
    fn engine(&self) -> Engine;

    /// Quote an identifier (table/column alias) for this dialect.
    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE".to_string() } else { "FALSE".to_string() }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn null_literal(&self) -> &'static str {
        "NULL"
    }

    /// `LIMIT n` / `LIMIT n OFFSET m` grammar; all four dialects agree.
    fn limit_clause(&self, n: u64) -> String {
        format!("LIMIT {n}")
    }

    /// Whether `WITH RECURSIVE` is available. When `false`, `codegen`
    /// unrolls recursion by repeated substitution instead (spec §4.4 step 5
    /// already mandates unrolling regardless, so this only controls whether
    /// the *non-recursive* per-iteration CTEs could instead share one
    /// `WITH RECURSIVE` block; kept for forward compatibility with engines
    /// that might want it, none of the four currently use it).
    fn supports_recursive_cte(&self) -> bool {
        false
    }

    /// Map a builtin predicate name (`crate::builtins`) and its already
    /// rendered argument strings onto a native SQL expression.
    fn builtin_call(&self, name: &str, args: &[String]) -> Result<String, LogicaError>;

    /// `ARGMAX`/`ARGMIN` over `(key, value)`, for dialects without a native
    /// aggregate: emit the struct/array-agg-then-index fallback (spec §4.5).
    fn arg_aggregate(&self, maximize: bool, value: &str, key: &str) -> String {
        let order = if maximize { "DESC" } else { "ASC" };
        format!("(ARRAY_AGG({value} ORDER BY {key} {order} LIMIT 1))[1]")
    }

    fn array_concat_agg(&self, expr: &str, distinct: bool) -> String {
        if distinct {
            format!("ARRAY_AGG(DISTINCT {expr})")
        } else {
            format!("ARRAY_AGG({expr})")
        }
    }

    fn integer_division(&self, lhs: &str, rhs: &str) -> String {
        format!("CAST({lhs} AS BIGINT) / CAST({rhs} AS BIGINT)")
    }

    fn flag_placeholder(&self, name: &str) -> String {
        format!("@{name}")
    }

    /// Render a list literal's already-rendered element strings.
    fn array_literal(&self, items: &[String]) -> String {
        format!("ARRAY[{}]", items.join(", "))
    }
}

fn generic_builtin_call(name: &str, args: &[String], dialect: &dyn Dialect) -> Result<String, LogicaError> {
    use crate::builtins::*;
    let a = |i: usize| args.get(i).cloned().unwrap_or_else(|| dialect.null_literal().to_string());
    Ok(match name {
        EQUALS => format!("({} = {})", a(0), a(1)),
        NOT_EQUALS => format!("({} != {})", a(0), a(1)),
        LESS => format!("({} < {})", a(0), a(1)),
        LESS_OR_EQUAL => format!("({} <= {})", a(0), a(1)),
        GREATER => format!("({} > {})", a(0), a(1)),
        GREATER_OR_EQUAL => format!("({} >= {})", a(0), a(1)),
        AND => format!("({} AND {})", a(0), a(1)),
        OR => format!("({} OR {})", a(0), a(1)),
        IMPLIES => format!("(NOT {} OR {})", a(0), a(1)),
        NOT => format!("(NOT {})", a(0)),
        IS => format!("({} IS {})", a(0), a(1)),
        IS_NOT => format!("({} IS NOT {})", a(0), a(1)),
        IN => format!("({} IN UNNEST({}))", a(0), a(1)),
        ADD => format!("({} + {})", a(0), a(1)),
        SUBTRACT => format!("({} - {})", a(0), a(1)),
        MULTIPLY => format!("({} * {})", a(0), a(1)),
        DIVIDE => dialect.integer_division(&a(0), &a(1)),
        MOD => format!("MOD({}, {})", a(0), a(1)),
        POW => format!("POWER({}, {})", a(0), a(1)),
        NEGATE => format!("(-{})", a(0)),
        CONCAT => format!("({} || {})", a(0), a(1)),
        CONCAT_OR_NULL => format!("CONCAT({}, {})", a(0), a(1)),
        IS_NULL => format!("({} IS NULL)", a(0)),
        ELEMENT => format!("({})[{} + 1]", a(0), a(1)),
        ARRAY_TO_STRING => format!("ARRAY_TO_STRING({}, {})", a(0), a(1)),
        SIZE => format!("ARRAY_LENGTH({})", a(0)),
        RECORD_AS_JSON => format!("TO_JSON({})", a(0)),
        other => {
            return Err(LogicaError::dialect(format!(
                "builtin '{other}' is not supported by the {} dialect",
                dialect.engine()
            )))
        }
    })
}

pub struct Sqlite;
impl Dialect for Sqlite {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }
    fn bool_literal(&self, value: bool) -> String {
        if value { "1".to_string() } else { "0".to_string() }
    }
    fn flag_placeholder(&self, _name: &str) -> String {
        "?".to_string()
    }
    fn builtin_call(&self, name: &str, args: &[String]) -> Result<String, LogicaError> {
        use crate::builtins::{ARRAY_TO_STRING, ELEMENT, IN, RECORD_AS_JSON, SIZE};
        if name == IN {
            return Ok(format!("({} IN ({}))", args[0], args.get(1).cloned().unwrap_or_default()));
        }
        if matches!(name, ELEMENT | ARRAY_TO_STRING | SIZE | RECORD_AS_JSON) {
            return Err(LogicaError::dialect(format!("'{name}' requires array/JSON support not available in the sqlite dialect")));
        }
        generic_builtin_call(name, args, self)
    }
    fn arg_aggregate(&self, maximize: bool, value: &str, key: &str) -> String {
        let order = if maximize { "DESC" } else { "ASC" };
        format!("(SELECT {value} ORDER BY {key} {order} LIMIT 1)")
    }
    fn array_literal(&self, items: &[String]) -> String {
        format!("({})", items.join(", "))
    }
}

pub struct Postgres;
impl Dialect for Postgres {
    fn engine(&self) -> Engine {
        Engine::Psql
    }
    fn flag_placeholder(&self, name: &str) -> String {
        format!("${name}")
    }
    fn supports_recursive_cte(&self) -> bool {
        true
    }
    fn builtin_call(&self, name: &str, args: &[String]) -> Result<String, LogicaError> {
        generic_builtin_call(name, args, self)
    }
}

pub struct BigQuery;
impl Dialect for BigQuery {
    fn engine(&self) -> Engine {
        Engine::Bigquery
    }
    fn quote_ident(&self, name: &str) -> String {
        format!("`{name}`")
    }
    fn supports_recursive_cte(&self) -> bool {
        false
    }
    fn array_concat_agg(&self, expr: &str, distinct: bool) -> String {
        if distinct {
            format!("ARRAY_CONCAT_AGG(DISTINCT {expr})")
        } else {
            format!("ARRAY_CONCAT_AGG({expr})")
        }
    }
    fn integer_division(&self, lhs: &str, rhs: &str) -> String {
        format!("DIV({lhs}, {rhs})")
    }
    fn builtin_call(&self, name: &str, args: &[String]) -> Result<String, LogicaError> {
        match name {
            crate::builtins::SIZE => Ok(format!("ARRAY_LENGTH({})", args[0])),
            crate::builtins::RECORD_AS_JSON => Ok(format!("TO_JSON_STRING({})", args[0])),
            _ => generic_builtin_call(name, args, self),
        }
    }
}

pub struct DuckDb;
impl Dialect for DuckDb {
    fn engine(&self) -> Engine {
        Engine::Duckdb
    }
    fn supports_recursive_cte(&self) -> bool {
        true
    }
    fn arg_aggregate(&self, maximize: bool, value: &str, key: &str) -> String {
        if maximize {
            format!("ARG_MAX({value}, {key})")
        } else {
            format!("ARG_MIN({value}, {key})")
        }
    }
    fn builtin_call(&self, name: &str, args: &[String]) -> Result<String, LogicaError> {
        match name {
            crate::builtins::SIZE => Ok(format!("len({})", args[0])),
            crate::builtins::RECORD_AS_JSON => Ok(format!("to_json({})", args[0])),
            _ => generic_builtin_call(name, args, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_from_name_round_trips() {
        for (name, engine) in [
            ("sqlite", Engine::Sqlite),
            ("psql", Engine::Psql),
            ("bigquery", Engine::Bigquery),
            ("duckdb", Engine::Duckdb),
        ] {
            assert_eq!(Engine::from_name(name), Some(engine));
        }
        assert_eq!(Engine::from_name("oracle"), None);
    }

    #[test]
    fn sqlite_in_uses_plain_parens_not_unnest() {
        let sql = Sqlite.builtin_call(crate::builtins::IN, &["x".into(), "(1, 2)".into()]).unwrap();
        assert_eq!(sql, "(x IN (1, 2))");
    }

    #[test]
    fn bigquery_quotes_with_backticks() {
        assert_eq!(BigQuery.quote_ident("col"), "`col`");
    }
}
