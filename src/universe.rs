//! Predicate universe (spec §4.4): classification, recursion unrolling,
//! injection inlining, and program-slice computation. This is the layer
//! between the flat rewritten rule set and the translator — it decides
//! *what* each predicate name resolves to (a materialized CTE, an inlined
//! copy of its own body, or a grounded external table) before
//! [`crate::translate::translate_rule`] ever lowers a body to SQL.
//!
//! Recursion is detected via Tarjan's strongly-connected-components
//! algorithm over the predicate dependency graph (spec §4.4: "P is
//! recursive iff P's transitive body-dependency graph contains P"), not
//! just direct self-calls: a predicate belongs to a non-trivial SCC (size
//! > 1, mutual recursion across two or more predicates) or has a direct
//! self-loop (size-1 SCC, the common case `@Recursive(P, N)` targets).
//! Every member of one SCC is unrolled together into synchronized levels
//! (see `unroll_scc`).

use crate::annotations::AnnotationTable;
use crate::ast::{Expression, ExpressionKind, Literal, PredicateCall, Proposition, Rule, Statement};
use crate::builtins;
use crate::codegen;
use crate::dialect::{Dialect, Engine};
use crate::error::{LogicaError, LogicaResult};
use crate::ir::{SqlExpr, TableSource, TranslatedRule};
use crate::rewrite::map_predicate_names_in_rule;
use crate::span::SourceSpan;
use crate::translate::{translate_rule, SourceResolver};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_RECURSION_DEPTH: u32 = 8;

pub struct Universe {
    engine: Engine,
    annotations: AnnotationTable,
    rules: IndexMap<String, Vec<Rule>>,
    default_recursion_depth: u32,
    sccs: Vec<Vec<String>>,
    scc_id: HashMap<String, usize>,
}

enum PredicateClass {
    External(String),
    Concrete,
}

impl Universe {
    pub fn build(rules: Vec<Rule>, statements: &[Statement], default_engine: Engine, default_recursion_depth: u32) -> LogicaResult<Self> {
        let annotations = AnnotationTable::build(statements)?;
        let mut by_name: IndexMap<String, Vec<Rule>> = IndexMap::new();
        for r in rules {
            if r.head.predicate_name.starts_with('@') {
                continue;
            }
            by_name.entry(r.head.predicate_name.clone()).or_default().push(r);
        }
        let engine = annotations.engine.unwrap_or(default_engine);

        let mut dep_graph: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, rules) in &by_name {
            let mut deps: Vec<String> = Vec::new();
            for r in rules {
                for d in dependencies_of_rule(r) {
                    if by_name.contains_key(&d) && !deps.contains(&d) {
                        deps.push(d);
                    }
                }
            }
            dep_graph.insert(name.clone(), deps);
        }
        let sccs = tarjan_sccs(&dep_graph);
        let mut scc_id = HashMap::new();
        for (id, members) in sccs.iter().enumerate() {
            for m in members {
                scc_id.insert(m.clone(), id);
            }
        }

        Ok(Universe { engine, annotations, rules: by_name, default_recursion_depth, sccs, scc_id })
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn type_checking_requested(&self) -> bool {
        self.annotations.type_checking
    }

    fn classify(&self, name: &str, span: &SourceSpan) -> LogicaResult<PredicateClass> {
        if let Some(table) = self.annotations.grounded.get(name) {
            return Ok(PredicateClass::External(table.clone().unwrap_or_else(|| name.to_string())));
        }
        if self.rules.contains_key(name) {
            return Ok(PredicateClass::Concrete);
        }
        Err(LogicaError::semantic(format!("predicate '{name}' is not defined or grounded"), span.clone()))
    }

    fn recursion_depth_for(&self, name: &str) -> u32 {
        self.annotations.recursion_depth.get(name).copied().unwrap_or(self.default_recursion_depth)
    }

    fn is_recursive(&self, name: &str) -> bool {
        let Some(&id) = self.scc_id.get(name) else { return false };
        if self.sccs[id].len() > 1 {
            return true;
        }
        let Some(rules) = self.rules.get(name) else { return false };
        rules.iter().any(|r| dependencies_of_rule(r).contains(&name.to_string()))
    }

    /// Every predicate in `name`'s strongly-connected component, `name`
    /// included. A predicate with no cyclic dependency is its own
    /// singleton component.
    fn scc_members(&self, name: &str) -> Vec<String> {
        match self.scc_id.get(name) {
            Some(&id) => self.sccs[id].clone(),
            None => vec![name.to_string()],
        }
    }

    /// A predicate eligible to be spliced directly into its call sites
    /// instead of materializing its own CTE: exactly one non-aggregating,
    /// non-recursive, non-grounded, non-`@NoInject`/`@With` rule that is not
    /// itself value-producing (value-producing predicates are referenced in
    /// expression position and always need their own CTE — see
    /// `translate::compile_value_call`).
    fn is_injectable(&self, name: &str) -> bool {
        if self.annotations.no_inject.contains(name) || self.annotations.with_cte.contains(name) {
            return false;
        }
        if self.annotations.grounded.contains_key(name) {
            return false;
        }
        let Some(rules) = self.rules.get(name) else { return false };
        if rules.len() != 1 {
            return false;
        }
        let rule = &rules[0];
        if rule.is_aggregating() || rule.is_value_producing() || self.is_recursive(name) {
            return false;
        }
        true
    }

    /// The program slice reachable from `target`, in dependency order
    /// (callees before the predicates that call them, target last) —
    /// exactly the order a `WITH` clause needs its CTEs defined in.
    fn slice(&self, target: &str, span: &SourceSpan) -> LogicaResult<Vec<String>> {
        let mut order = Vec::new();
        let mut done = IndexSet::new();
        let mut visiting = IndexSet::new();
        self.visit_slice(target, span, &mut order, &mut done, &mut visiting)?;
        Ok(order)
    }

    fn visit_slice(
        &self,
        name: &str,
        span: &SourceSpan,
        order: &mut Vec<String>,
        done: &mut IndexSet<String>,
        visiting: &mut IndexSet<String>,
    ) -> LogicaResult<()> {
        if done.contains(name) || builtins::is_builtin(name) {
            return Ok(());
        }
        if visiting.contains(name) {
            // A cycle back to a predicate already on the current DFS path:
            // `unroll_scc` handles the whole component together once the
            // outermost member in the cycle finishes visiting, so just stop
            // re-entering here rather than looping.
            return Ok(());
        }
        visiting.insert(name.to_string());
        if let PredicateClass::Concrete = self.classify(name, span)? {
            for rule in &self.rules[name] {
                for dep in dependencies_of_rule(rule) {
                    if dep != name {
                        self.visit_slice(&dep, span, order, done, visiting)?;
                    }
                }
            }
        }
        visiting.shift_remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// Inline every injectable predicate referenced in `rule`'s body,
    /// splicing its (alpha-renamed) body in place of the call and equating
    /// its head fields to the call site's arguments. Runs to a fixpoint
    /// since an injected body can itself call another injectable predicate.
    fn inline_injectables(&self, rule: &Rule, fresh: &mut usize) -> LogicaResult<Rule> {
        let mut rule = rule.clone();
        loop {
            let Some(body) = rule.body.take() else { break };
            let (new_body, changed) = self.inline_in_proposition(body, fresh);
            rule.body = Some(new_body);
            if !changed {
                break;
            }
        }
        Ok(rule)
    }

    fn inline_in_proposition(&self, prop: Proposition, fresh: &mut usize) -> (Proposition, bool) {
        match prop {
            Proposition::Conjunction(parts) => {
                let mut out = Vec::with_capacity(parts.len());
                let mut changed = false;
                for p in parts {
                    let (inlined, c) = self.inline_in_proposition(p, fresh);
                    changed |= c;
                    match inlined {
                        Proposition::Conjunction(mut inner) => out.append(&mut inner),
                        other => out.push(other),
                    }
                }
                (Proposition::conjunction(out), changed)
            }
            Proposition::Disjunction(parts) => {
                let mut out = Vec::with_capacity(parts.len());
                let mut changed = false;
                for p in parts {
                    let (inlined, c) = self.inline_in_proposition(p, fresh);
                    changed |= c;
                    out.push(inlined);
                }
                (Proposition::Disjunction(out), changed)
            }
            Proposition::Call(call) if self.is_injectable(&call.predicate_name) => (self.splice_injectable(&call, fresh), true),
            Proposition::Call(call) => (Proposition::Call(call), false),
            Proposition::Unification { left, right } => (Proposition::Unification { left, right }, false),
            Proposition::Inclusion { element, collection } => (Proposition::Inclusion { element, collection }, false),
            Proposition::NegationAsAggregate(inner) => {
                let (inlined, changed) = self.inline_in_proposition(*inner, fresh);
                (Proposition::NegationAsAggregate(Box::new(inlined)), changed)
            }
        }
    }

    fn splice_injectable(&self, call: &PredicateCall, fresh: &mut usize) -> Proposition {
        let template = &self.rules[&call.predicate_name][0];
        *fresh += 1;
        let suffix = format!("__inj{fresh}");
        let rename = |name: &str| format!("{name}{suffix}");

        let mut renamed = template.clone();
        alpha_rename_rule(&mut renamed, &rename);

        let mut parts = Vec::new();
        if let Some(body) = renamed.body {
            match body {
                Proposition::Conjunction(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        for (call_field, head_field) in call.record.fields.iter().zip(renamed.head.record.fields.iter()) {
            parts.push(Proposition::Unification { left: call_field.value.clone(), right: head_field.value.clone() });
        }
        Proposition::conjunction(parts)
    }

    /// Unroll one strongly-connected component (`members`) into synchronized
    /// levels `{member}_0 .. {member}_{depth}` for every member: level 0 is
    /// each member's non-recursive rules alone; level `i` is those plus the
    /// rules that depend on some member of the component, with every such
    /// cross- or self-reference rewritten to that member's level-`i - 1`
    /// name. `depth` is the largest `@Recursive` override across the
    /// component's members (or the default if none is set). Returned in
    /// dependency order: all of level 0 first, then all of level 1, etc.
    ///
    /// Aggregating recursive predicates must have non-aggregating seed
    /// (level-0) disjuncts (spec §4.4); a member whose base rules include an
    /// aggregating rule is a hard error.
    fn unroll_scc(&self, members: &[String]) -> LogicaResult<Vec<(String, Vec<Rule>)>> {
        let member_set: IndexSet<String> = members.iter().cloned().collect();
        let depth = members.iter().map(|m| self.recursion_depth_for(m)).max().unwrap_or(self.default_recursion_depth);

        let mut base: IndexMap<String, Vec<Rule>> = IndexMap::new();
        let mut recursive: IndexMap<String, Vec<Rule>> = IndexMap::new();
        for member in members {
            let rules = &self.rules[member];
            let (b, r): (Vec<Rule>, Vec<Rule>) =
                rules.iter().cloned().partition(|rule| dependencies_of_rule(rule).iter().all(|d| !member_set.contains(d)));
            if let Some(bad) = b.iter().find(|rule| rule.is_aggregating()) {
                return Err(LogicaError::semantic(
                    format!("recursive predicate '{member}' has an aggregating seed rule; seed disjuncts must be non-aggregating"),
                    bad.full_text.clone(),
                ));
            }
            base.insert(member.clone(), b);
            recursive.insert(member.clone(), r);
        }

        let mut levels = Vec::with_capacity((depth as usize + 1) * members.len());
        for member in members {
            levels.push((format!("{member}_0"), base[member].clone()));
        }
        for i in 1..=depth {
            for member in members {
                let mut level_rules = base[member].clone();
                for r in &recursive[member] {
                    let mut renamed = r.clone();
                    map_predicate_names_in_rule(&mut renamed, &|n| {
                        if member_set.contains(n) { Some(format!("{n}_{}", i - 1)) } else { None }
                    });
                    level_rules.push(renamed);
                }
                levels.push((format!("{member}_{i}"), level_rules));
            }
        }
        Ok(levels)
    }

    /// Compile `target` into one complete SQL statement for `dialect`.
    /// `flag_overrides` supplies a caller-chosen value for any
    /// `@DefineFlag`-declared name; anything not overridden falls back to
    /// its declared default.
    pub fn compile(&self, target: &str, dialect: &dyn Dialect, flag_overrides: &HashMap<String, Literal>) -> LogicaResult<String> {
        let span = self
            .rules
            .get(target)
            .and_then(|rs| rs.first())
            .map(|r| r.full_text.clone())
            .unwrap_or_else(dummy_span);

        if let PredicateClass::External(table) = self.classify(target, &span)? {
            return Ok(codegen::render_external_select(dialect, &table));
        }

        let mut flag_bindings: IndexMap<String, SqlExpr> = IndexMap::new();
        for (name, default) in &self.annotations.flags {
            let value = flag_overrides.get(name).cloned().unwrap_or_else(|| default.clone());
            flag_bindings.insert(name.clone(), SqlExpr::Literal(value));
        }

        let slice = self.slice(target, &span)?;
        let mut physical_name: HashMap<String, String> = HashMap::new();
        let mut known_ctes: IndexSet<String> = IndexSet::new();
        let mut ordered_ctes: Vec<(String, Vec<TranslatedRule>, bool)> = Vec::new();
        let mut fresh = 0usize;
        let mut handled: HashSet<String> = HashSet::new();

        for name in &slice {
            if handled.contains(name) || self.annotations.grounded.contains_key(name) {
                handled.insert(name.clone());
                continue;
            }
            if self.is_injectable(name) && name != target {
                // Never gets its own CTE: every call site inlines it.
                handled.insert(name.clone());
                continue;
            }
            if self.is_recursive(name) {
                let members = self.scc_members(name);
                let depth = members.iter().map(|m| self.recursion_depth_for(m)).max().unwrap_or(self.default_recursion_depth);
                let levels = self.unroll_scc(&members)?;
                for (cte_name, rules) in levels {
                    let distinct_union = rules.first().map(|r| r.distinct).unwrap_or(true);
                    let mut translated = Vec::with_capacity(rules.len());
                    for rule in &rules {
                        let inlined = self.inline_injectables(rule, &mut fresh)?;
                        let resolver = Resolver { universe: self, physical_name: &physical_name, known_ctes: &known_ctes };
                        translated.push(translate_rule(&inlined, &resolver, &flag_bindings)?);
                    }
                    known_ctes.insert(cte_name.clone());
                    ordered_ctes.push((cte_name, translated, distinct_union));
                }
                for member in &members {
                    physical_name.insert(member.clone(), format!("{member}_{depth}"));
                    handled.insert(member.clone());
                }
            } else {
                let rules = &self.rules[name];
                let distinct_union = rules.first().map(|r| r.distinct).unwrap_or(true);
                let mut translated = Vec::with_capacity(rules.len());
                for rule in rules {
                    let inlined = self.inline_injectables(rule, &mut fresh)?;
                    let resolver = Resolver { universe: self, physical_name: &physical_name, known_ctes: &known_ctes };
                    translated.push(translate_rule(&inlined, &resolver, &flag_bindings)?);
                }
                // Two predicates whose rules lower to the same algebraic
                // shape (same tables/constraints/columns; `TranslatedRule`
                // carries no predicate name, so structural equality here is
                // already alpha-renaming-insensitive) share one CTE.
                let existing = ordered_ctes
                    .iter()
                    .find(|(_, cte_rules, cte_distinct)| *cte_distinct == distinct_union && *cte_rules == translated)
                    .map(|(cte_name, _, _)| cte_name.clone());
                match existing {
                    Some(shared) => {
                        physical_name.insert(name.clone(), shared);
                    }
                    None => {
                        known_ctes.insert(name.clone());
                        ordered_ctes.push((name.clone(), translated, distinct_union));
                        physical_name.insert(name.clone(), name.clone());
                    }
                }
                handled.insert(name.clone());
            }
        }

        let target_physical = physical_name.get(target).cloned().unwrap_or_else(|| target.to_string());
        let order_by = self.annotations.order_by.get(target).cloned();
        let limit = self.annotations.limit.get(target).copied();
        codegen::render_program(dialect, &ordered_ctes, &target_physical, order_by.as_deref(), limit)
    }
}

struct Resolver<'a> {
    universe: &'a Universe,
    physical_name: &'a HashMap<String, String>,
    /// Names already emitted as CTEs this compile, including synthetic
    /// per-level recursion names (`N_2`) that never appear as keys in
    /// `Universe::rules` and so can't go through `classify`.
    known_ctes: &'a IndexSet<String>,
}

impl<'a> SourceResolver for Resolver<'a> {
    fn resolve(&self, predicate_name: &str, span: &SourceSpan) -> LogicaResult<TableSource> {
        if self.known_ctes.contains(predicate_name) {
            return Ok(TableSource::Cte(predicate_name.to_string()));
        }
        match self.universe.classify(predicate_name, span)? {
            PredicateClass::External(table) => Ok(TableSource::External(table)),
            PredicateClass::Concrete => {
                if self.universe.is_injectable(predicate_name) {
                    // inline_injectables should have already spliced this
                    // away; surviving to here means a bug upstream.
                    return Err(LogicaError::semantic(
                        format!("injectable predicate '{predicate_name}' reached codegen without being inlined"),
                        span.clone(),
                    ));
                }
                let physical = self.physical_name.get(predicate_name).cloned().unwrap_or_else(|| predicate_name.to_string());
                Ok(TableSource::Cte(physical))
            }
        }
    }
}

/// Tarjan's strongly-connected-components algorithm over the predicate
/// dependency graph. Each returned component is a set of predicates that are
/// mutually reachable from one another through rule bodies; a predicate with
/// no cyclic dependency comes back as its own singleton component. Edges to
/// names that aren't keys of `graph` (builtins, grounded tables, undefined
/// names) are ignored — they can't participate in a cycle with a defined
/// predicate.
fn tarjan_sccs(graph: &IndexMap<String, Vec<String>>) -> Vec<Vec<String>> {
    struct Tarjan<'g> {
        graph: &'g IndexMap<String, Vec<String>>,
        counter: usize,
        index: HashMap<String, usize>,
        lowlink: HashMap<String, usize>,
        on_stack: HashSet<String>,
        stack: Vec<String>,
        result: Vec<Vec<String>>,
    }

    impl<'g> Tarjan<'g> {
        fn strongconnect(&mut self, v: &str) {
            let v_index = self.counter;
            self.index.insert(v.to_string(), v_index);
            self.lowlink.insert(v.to_string(), v_index);
            self.counter += 1;
            self.stack.push(v.to_string());
            self.on_stack.insert(v.to_string());

            if let Some(deps) = self.graph.get(v) {
                for w in deps.clone() {
                    if !self.graph.contains_key(&w) {
                        continue;
                    }
                    if !self.index.contains_key(&w) {
                        self.strongconnect(&w);
                        let w_low = self.lowlink[&w];
                        let v_low = self.lowlink[v];
                        self.lowlink.insert(v.to_string(), v_low.min(w_low));
                    } else if self.on_stack.contains(&w) {
                        let w_index = self.index[&w];
                        let v_low = self.lowlink[v];
                        self.lowlink.insert(v.to_string(), v_low.min(w_index));
                    }
                }
            }

            if self.lowlink[v] == self.index[v] {
                let mut component = Vec::new();
                loop {
                    let w = self.stack.pop().expect("v's own frame is always on the stack");
                    self.on_stack.remove(&w);
                    let is_v = w == v;
                    component.push(w);
                    if is_v {
                        break;
                    }
                }
                self.result.push(component);
            }
        }
    }

    let mut tarjan =
        Tarjan { graph, counter: 0, index: HashMap::new(), lowlink: HashMap::new(), on_stack: HashSet::new(), stack: Vec::new(), result: Vec::new() };
    for name in graph.keys() {
        if !tarjan.index.contains_key(name) {
            tarjan.strongconnect(name);
        }
    }
    tarjan.result
}

fn dependencies_of_rule(rule: &Rule) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(body) = &rule.body {
        collect_proposition_deps(body, &mut out);
    }
    out
}

fn collect_proposition_deps(prop: &Proposition, out: &mut Vec<String>) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                collect_proposition_deps(p, out);
            }
        }
        Proposition::Call(call) => collect_call_deps(call, out),
        Proposition::Unification { left, right } => {
            collect_expr_deps(left, out);
            collect_expr_deps(right, out);
        }
        Proposition::Inclusion { element, collection } => {
            collect_expr_deps(element, out);
            collect_expr_deps(collection, out);
        }
        Proposition::NegationAsAggregate(inner) => collect_proposition_deps(inner, out),
    }
}

fn collect_call_deps(call: &PredicateCall, out: &mut Vec<String>) {
    if !builtins::is_builtin(&call.predicate_name) && !out.contains(&call.predicate_name) {
        out.push(call.predicate_name.clone());
    }
    for f in &call.record.fields {
        collect_expr_deps(&f.value, out);
    }
}

fn collect_expr_deps(expr: &Expression, out: &mut Vec<String>) {
    match &expr.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Variable(_) => {}
        ExpressionKind::Record(r) => {
            for f in &r.fields {
                collect_expr_deps(&f.value, out);
            }
        }
        ExpressionKind::List(items) => {
            for i in items {
                collect_expr_deps(i, out);
            }
        }
        ExpressionKind::Call(call) => collect_call_deps(call, out),
        ExpressionKind::Subscript { base, index } => {
            collect_expr_deps(base, out);
            collect_expr_deps(index, out);
        }
        ExpressionKind::RecordSubscript { base, .. } => collect_expr_deps(base, out),
        ExpressionKind::Combine(c) => {
            collect_expr_deps(&c.value, out);
            collect_proposition_deps(&c.body, out);
        }
        ExpressionKind::Implication(i) => {
            for (cond, val) in &i.branches {
                collect_proposition_deps(cond, out);
                collect_expr_deps(val, out);
            }
            if let Some(e) = &i.else_value {
                collect_expr_deps(e, out);
            }
        }
    }
}

/// Rename every variable occurrence in `rule` via `rename`, leaving
/// predicate names untouched. Used to alpha-rename an injectable
/// predicate's rule before splicing it into a call site, so its local
/// variables never collide with the caller's.
fn alpha_rename_rule(rule: &mut Rule, rename: &dyn Fn(&str) -> String) {
    rename_call_vars(&mut rule.head, rename);
    if let Some(body) = &mut rule.body {
        rename_proposition_vars(body, rename);
    }
    for d in &mut rule.denotations {
        match d {
            crate::ast::Denotation::CouldBe(e) | crate::ast::Denotation::CantBe(e) | crate::ast::Denotation::ShouldBe(e) => {
                rename_expr_vars(e, rename);
            }
            crate::ast::Denotation::OrderBy(_) | crate::ast::Denotation::Limit(_) => {}
        }
    }
}

fn rename_call_vars(call: &mut PredicateCall, rename: &dyn Fn(&str) -> String) {
    for field in &mut call.record.fields {
        rename_expr_vars(&mut field.value, rename);
    }
}

fn rename_expr_vars(expr: &mut Expression, rename: &dyn Fn(&str) -> String) {
    match &mut expr.kind {
        ExpressionKind::Literal(_) => {}
        ExpressionKind::Variable(v) => {
            if v != "_" {
                *v = rename(v);
            }
        }
        ExpressionKind::Record(r) => {
            for f in &mut r.fields {
                rename_expr_vars(&mut f.value, rename);
            }
        }
        ExpressionKind::List(items) => {
            for i in items {
                rename_expr_vars(i, rename);
            }
        }
        ExpressionKind::Call(call) => rename_call_vars(call, rename),
        ExpressionKind::Subscript { base, index } => {
            rename_expr_vars(base, rename);
            rename_expr_vars(index, rename);
        }
        ExpressionKind::RecordSubscript { base, .. } => rename_expr_vars(base, rename),
        ExpressionKind::Combine(c) => {
            rename_expr_vars(&mut c.value, rename);
            rename_proposition_vars(&mut c.body, rename);
        }
        ExpressionKind::Implication(i) => {
            for (cond, val) in &mut i.branches {
                rename_proposition_vars(cond, rename);
                rename_expr_vars(val, rename);
            }
            if let Some(e) = &mut i.else_value {
                rename_expr_vars(e, rename);
            }
        }
    }
}

fn rename_proposition_vars(prop: &mut Proposition, rename: &dyn Fn(&str) -> String) {
    match prop {
        Proposition::Conjunction(parts) | Proposition::Disjunction(parts) => {
            for p in parts {
                rename_proposition_vars(p, rename);
            }
        }
        Proposition::Call(call) => rename_call_vars(call, rename),
        Proposition::Unification { left, right } => {
            rename_expr_vars(left, rename);
            rename_expr_vars(right, rename);
        }
        Proposition::Inclusion { element, collection } => {
            rename_expr_vars(element, rename);
            rename_expr_vars(collection, rename);
        }
        Proposition::NegationAsAggregate(inner) => rename_proposition_vars(inner, rename),
    }
}

fn dummy_span() -> SourceSpan {
    use std::sync::Arc;
    Arc::new(crate::span::SourceBuffer::new("<universe>", "")).whole_span()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;
    use crate::parser::parse_program;
    use crate::rewrite::rewrite_program;
    use crate::span::SourceBuffer;
    use std::sync::Arc;

    fn compile(text: &str, target: &str) -> LogicaResult<String> {
        let parsed = parse_program(Arc::new(SourceBuffer::new("t.l", text)))?;
        let statements = parsed.statements;
        let rules = rewrite_program(statements.clone())?;
        let universe = Universe::build(rules, &statements, Engine::Sqlite, DEFAULT_RECURSION_DEPTH)?;
        universe.compile(target, &Sqlite, &HashMap::new())
    }

    #[test]
    fn compiles_simple_join() {
        let sql = compile("Parent(a, b) :- Friend(a, b); Grandparent(a, c) :- Parent(a, b), Parent(b, c);", "Grandparent").unwrap();
        assert!(sql.contains("WITH"));
        assert!(sql.contains("Grandparent"));
    }

    #[test]
    fn inlines_injectable_predicate_without_its_own_cte() {
        let sql = compile("Double(x, y) :- y = x; P(x, y) :- A(x), Double(x, y);", "P").unwrap();
        assert!(!sql.contains("\"Double\""));
    }

    #[test]
    fn unrolls_recursive_predicate_into_levels() {
        let sql = compile("@Recursive(N, 3); N(0); N(n) :- N(m), n = m;", "N").unwrap();
        assert!(sql.contains("N_0"));
        assert!(sql.contains("N_3"));
    }

    #[test]
    fn errors_on_undefined_predicate() {
        assert!(compile("P(x) :- Q(x);", "P").is_err());
    }

    #[test]
    fn unrolls_mutually_recursive_predicates_into_synchronized_levels() {
        let source = "Even(0); Even(n) :- Odd(m), n = m + 1; Odd(n) :- Even(m), n = m + 1;";
        let sql = compile(source, "Even").unwrap();
        assert!(sql.contains("Even_0"));
        assert!(sql.contains("Odd_0"));
        assert!(sql.contains(&format!("Even_{DEFAULT_RECURSION_DEPTH}")));
        assert!(sql.contains(&format!("Odd_{DEFAULT_RECURSION_DEPTH}")));
    }

    #[test]
    fn aggregating_seed_rule_in_a_recursive_predicate_is_a_semantic_error() {
        let source = "Total() += 1; Total() :- Total();";
        assert!(compile(source, "Total").is_err());
    }

    #[test]
    fn structurally_identical_predicates_share_one_cte() {
        let source = "A(x) :- Base(x); B(x) :- Base(x); P(x) :- A(x), B(x);";
        let sql = compile(source, "P").unwrap();
        // Only one of "A"/"B" should materialize; the other aliases to it.
        assert!(sql.contains("\"A\"") != sql.contains("\"B\""));
    }
}
