//! Import resolver (spec §4.3).
//!
//! Imports form a DAG: each file is loaded at most once, every predicate it
//! defines (or grounds via `@Ground`) is renamed with a prefix derived from
//! the last dotted path component of the file that defined it, and every
//! reference to an imported predicate at the call site is rewritten to that
//! prefixed name. Loading is recursive — an imported file's own imports are
//! resolved first, bottom-up, so a predicate two hops away already carries
//! its final prefixed name by the time the file that re-exports it gets its
//! own prefix applied.

use crate::ast::{ExpressionKind, FunctorApplication, Import, ParsedFile, PredicateCall, Proposition, Rule, Statement};
use crate::error::{LogicaError, LogicaResult};
use crate::rewrite::map_predicate_names_in_rule;
use crate::span::SourceBuffer;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Annotations whose first positional field names the predicate they
/// target, and therefore need that field rewritten alongside ordinary call
/// sites. `@Engine` (an engine name) and `@DefineFlag` (a flag name, a
/// separate namespace) are deliberately excluded.
const PREDICATE_TARGETED_ANNOTATIONS: &[&str] =
    &["@Ground", "@With", "@OrderBy", "@Limit", "@NoInject", "@Recursive", "@CompileAsUdf"];

pub struct ImportResolver<'a> {
    roots: &'a [PathBuf],
    loaded: IndexMap<PathBuf, Vec<Statement>>,
    stack: Vec<String>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(roots: &'a [PathBuf]) -> Self {
        ImportResolver { roots, loaded: IndexMap::new(), stack: Vec::new() }
    }

    /// Resolve `entry`'s imports (transitively), returning every statement
    /// that takes part in the program: imported modules' (prefixed,
    /// renamed) statements in first-load order, followed by the entry
    /// file's own statements, unprefixed, with references rewritten.
    pub fn resolve(&mut self, entry: ParsedFile) -> LogicaResult<Vec<Statement>> {
        let own = self.resolve_file(entry.statements, None)?;
        let mut out = Vec::new();
        for statements in self.loaded.values() {
            out.extend(statements.iter().cloned());
        }
        out.extend(own);
        Ok(out)
    }

    fn resolve_file(&mut self, statements: Vec<Statement>, prefix: Option<&str>) -> LogicaResult<Vec<Statement>> {
        let (imports, mut rest): (Vec<Statement>, Vec<Statement>) =
            statements.into_iter().partition(|s| matches!(s, Statement::Import(_)));

        let mut referenced: IndexSet<String> = IndexSet::new();
        for s in &rest {
            collect_referenced_names(s, &mut referenced);
        }

        let mut rename: IndexMap<String, String> = IndexMap::new();
        for s in imports {
            let Statement::Import(import) = s else { unreachable!() };
            let resolved_target = self.load_import(&import)?;
            let local_name = import.alias.clone().unwrap_or_else(|| import.predicate_name.clone());
            if !referenced.contains(&local_name) {
                return Err(LogicaError::import(
                    format!("imported predicate '{local_name}' is never referenced"),
                    self.chain_with(import.path.join(".")),
                ));
            }
            rename.insert(local_name, resolved_target);
        }

        for s in &mut rest {
            rename_statement(s, &rename);
        }

        if let Some(prefix) = prefix {
            let defined = locally_defined_names(&rest);
            let self_rename: IndexMap<String, String> =
                defined.into_iter().map(|n| (n.clone(), format!("{prefix}{n}"))).collect();
            for s in &mut rest {
                rename_statement(s, &self_rename);
            }
        }

        Ok(rest)
    }

    fn load_import(&mut self, import: &Import) -> LogicaResult<String> {
        let (path, prefix) = self.locate_file(&import.path, import)?;
        let resolved_target = format!("{prefix}{}", import.predicate_name);

        if !self.loaded.contains_key(&path) {
            let key = path.display().to_string();
            if self.stack.contains(&key) {
                return Err(LogicaError::import("import cycle detected", self.chain_with(key)));
            }
            self.stack.push(key);

            let text = std::fs::read_to_string(&path).map_err(|e| {
                LogicaError::import(format!("cannot read '{}': {e}", path.display()), self.chain_with(import.path.join(".")))
            })?;
            let buffer = Arc::new(SourceBuffer::new(path.display().to_string(), text));
            let parsed = crate::parser::parse_program(buffer)?;
            let resolved_statements = self.resolve_file(parsed.statements, Some(&prefix))?;

            self.stack.pop();
            self.loaded.insert(path.clone(), resolved_statements);
        }

        self.check_defined_or_grounded(&path, &resolved_target, import)?;
        Ok(resolved_target)
    }

    fn check_defined_or_grounded(&self, path: &Path, resolved_target: &str, import: &Import) -> LogicaResult<()> {
        let stmts = &self.loaded[path];
        let defined = locally_defined_names(stmts).contains(&resolved_target.to_string());
        if defined {
            return Ok(());
        }
        Err(LogicaError::import(
            format!(
                "imported predicate '{}' is not defined or grounded in '{}'",
                import.predicate_name,
                path.display()
            ),
            self.chain_with(import.path.join(".")),
        ))
    }

    fn locate_file(&self, segments: &[String], import: &Import) -> LogicaResult<(PathBuf, String)> {
        let rel = format!("{}.l", segments.join("/"));
        for root in self.roots {
            let candidate = root.join(&rel);
            if candidate.is_file() {
                let last = segments.last().expect("import path is non-empty");
                return Ok((candidate, format!("{}_", capitalize(last))));
            }
        }
        Err(LogicaError::import(
            format!("cannot locate '{rel}' on any import root"),
            self.chain_with(import.path.join(".")),
        ))
    }

    fn chain_with(&self, last: String) -> Vec<String> {
        let mut chain = self.stack.clone();
        chain.push(last);
        chain
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Predicate names this file itself defines or grounds: plain rule heads,
/// plus the target of any local `@Ground` annotation. These are exactly the
/// names that get this file's prefix applied when something imports it.
fn locally_defined_names(statements: &[Statement]) -> IndexSet<String> {
    let mut names = IndexSet::new();
    for s in statements {
        let Statement::Rule(r) = s else { continue };
        if !r.head.predicate_name.starts_with('@') {
            names.insert(r.head.predicate_name.clone());
        } else if r.head.predicate_name == "@Ground" {
            if let Some(field) = r.head.record.fields.first() {
                if let ExpressionKind::Variable(name) = &field.value.kind {
                    names.insert(name.clone());
                }
            }
        }
    }
    names
}

fn collect_referenced_names(statement: &Statement, out: &mut IndexSet<String>) {
    match statement {
        Statement::Rule(r) => collect_in_rule(r, out),
        Statement::Functor(f) => {
            out.insert(f.template.clone());
            for (_, value) in &f.slots {
                out.insert(value.clone());
            }
        }
        Statement::Import(_) => {}
    }
}

fn collect_in_rule(rule: &Rule, out: &mut IndexSet<String>) {
    collect_in_call(&rule.head, out);
    if let Some(body) = &rule.body {
        collect_in_proposition(body, out);
    }
}

fn collect_in_call(call: &PredicateCall, out: &mut IndexSet<String>) {
    out.insert(call.predicate_name.clone());
    for field in &call.record.fields {
        collect_in_expression(&field.value, out);
    }
}

fn collect_in_expression(expr: &crate::ast::Expression, out: &mut IndexSet<String>) {
    match &expr.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => {}
        ExpressionKind::Record(r) => {
            for f in &r.fields {
                collect_in_expression(&f.value, out);
            }
        }
        ExpressionKind::List(items) => {
            for item in items {
                collect_in_expression(item, out);
            }
        }
        ExpressionKind::Call(call) => collect_in_call(call, out),
        ExpressionKind::Subscript { base, index } => {
            collect_in_expression(base, out);
            collect_in_expression(index, out);
        }
        ExpressionKind::RecordSubscript { base, .. } => collect_in_expression(base, out),
        ExpressionKind::Combine(c) => {
            collect_in_expression(&c.value, out);
            collect_in_proposition(&c.body, out);
        }
        ExpressionKind::Implication(i) => {
            for (cond, val) in &i.branches {
                collect_in_proposition(cond, out);
                collect_in_expression(val, out);
            }
            if let Some(e) = &i.else_value {
                collect_in_expression(e, out);
            }
        }
    }
}

fn collect_in_proposition(prop: &Proposition, out: &mut IndexSet<String>) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                collect_in_proposition(p, out);
            }
        }
        Proposition::Call(call) => collect_in_call(call, out),
        Proposition::Unification { left, right } => {
            collect_in_expression(left, out);
            collect_in_expression(right, out);
        }
        Proposition::Inclusion { element, collection } => {
            collect_in_expression(element, out);
            collect_in_expression(collection, out);
        }
        Proposition::NegationAsAggregate(inner) => collect_in_proposition(inner, out),
    }
}

fn rename_statement(statement: &mut Statement, map: &IndexMap<String, String>) {
    match statement {
        Statement::Rule(rule) => rename_rule(rule, map),
        Statement::Functor(functor) => rename_functor(functor, map),
        Statement::Import(_) => {}
    }
}

fn rename_rule(rule: &mut Rule, map: &IndexMap<String, String>) {
    map_predicate_names_in_rule(rule, &|name| map.get(name).cloned());
    if PREDICATE_TARGETED_ANNOTATIONS.contains(&rule.head.predicate_name.as_str()) {
        if let Some(field) = rule.head.record.fields.first_mut() {
            let replacement = match &field.value.kind {
                ExpressionKind::Variable(name) => map.get(name).cloned(),
                _ => None,
            };
            if let Some(renamed) = replacement {
                field.value.kind = ExpressionKind::Variable(renamed);
            }
        }
    }
}

fn rename_functor(functor: &mut FunctorApplication, map: &IndexMap<String, String>) {
    if let Some(renamed) = map.get(&functor.template) {
        functor.template = renamed.clone();
    }
    for (_, value) in &mut functor.slots {
        if let Some(renamed) = map.get(value) {
            *value = renamed.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use tempfile::tempdir;

    fn parse(text: &str, name: &str) -> ParsedFile {
        parse_program(Arc::new(SourceBuffer::new(name, text))).unwrap()
    }

    #[test]
    fn prefixes_imported_predicates_and_rewrites_call_sites() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.l"), "Name(x) :- Other(x); Other(1);").unwrap();

        let entry = parse("import b.Name; P(x) :- Name(x);", "entry.l");
        let mut resolver = ImportResolver::new(std::slice::from_ref(&dir.path().to_path_buf()));
        let statements = resolver.resolve(entry).unwrap();

        assert!(statements.iter().any(|s| matches!(s, Statement::Rule(r) if r.head.predicate_name == "B_Name")));
        let p_rule = statements
            .iter()
            .find_map(|s| match s {
                Statement::Rule(r) if r.head.predicate_name == "P" => Some(r),
                _ => None,
            })
            .unwrap();
        let calls_b_name = matches!(
            &p_rule.body,
            Some(Proposition::Call(c)) if c.predicate_name == "B_Name"
        );
        assert!(calls_b_name);
    }

    #[test]
    fn errors_on_unused_import() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.l"), "Name(1);").unwrap();
        let entry = parse("import b.Name; P(x) :- Other(x);", "entry.l");
        let mut resolver = ImportResolver::new(std::slice::from_ref(&dir.path().to_path_buf()));
        assert!(resolver.resolve(entry).is_err());
    }

    #[test]
    fn errors_on_undefined_import_target() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.l"), "Other(1);").unwrap();
        let entry = parse("import b.Name; P(x) :- Name(x);", "entry.l");
        let mut resolver = ImportResolver::new(std::slice::from_ref(&dir.path().to_path_buf()));
        assert!(resolver.resolve(entry).is_err());
    }

    #[test]
    fn detects_import_cycles() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.l"), "import b.Y; X(v) :- Y(v);").unwrap();
        std::fs::write(dir.path().join("b.l"), "import a.X; Y(v) :- X(v);").unwrap();
        let entry = parse("import a.X; P(x) :- X(x);", "entry.l");
        let mut resolver = ImportResolver::new(std::slice::from_ref(&dir.path().to_path_buf()));
        let err = resolver.resolve(entry).unwrap_err();
        assert!(matches!(err, LogicaError::Import { .. }));
    }
}
