use super::{same_value, Diagnostic, DiagnosticBuilder, Rule, Severity};
use crate::engine::AnalysisContext;
use crate::sem::{Compilation, MemberId, OpId, OpKind, WellKnown};
use crate::syntax::UnaryOp;

/// Detects membership checks guarding the one mutation the check was
/// protecting, where the mutation already tolerates the unguarded case
pub struct RedundantContainsGuardRule;

/// One recognized guard/mutation pairing.
struct GuardRow {
    guard: WellKnown,
    guarded: WellKnown,
    /// True when the idiom tests `!Contains` before the call (insertion
    /// guards); false for the plain `Contains` form (removal guards).
    negated: bool,
    note: &'static str,
}

const GUARD_ROWS: &[GuardRow] = &[
    GuardRow {
        guard: WellKnown::DictContainsKey,
        guarded: WellKnown::DictRemove,
        negated: false,
        note: "`Remove` already handles a missing key",
    },
    GuardRow {
        guard: WellKnown::SetContains,
        guarded: WellKnown::SetRemove,
        negated: false,
        note: "`Remove` already handles a missing element",
    },
    GuardRow {
        guard: WellKnown::SetContains,
        guarded: WellKnown::SetAdd,
        negated: true,
        note: "`Add` already ignores a duplicate element",
    },
];

/// A row with its members resolved against the active profile.
struct ResolvedRow {
    guard: MemberId,
    guarded: MemberId,
    negated: bool,
    note: &'static str,
}

/// The condition as a single-key membership test, allowing one logical
/// negation around the call.
struct GuardShape {
    method: MemberId,
    receiver: OpId,
    key: OpId,
    negated: bool,
}

fn match_guard(comp: &Compilation, cond: OpId) -> Option<GuardShape> {
    let mut id = comp.strip_conversions(cond);
    let mut negated = false;
    if let OpKind::Unary {
        op: UnaryOp::Not,
        operand,
    } = comp.op(id).kind
    {
        negated = true;
        id = comp.strip_conversions(operand);
    }
    let OpKind::Invocation {
        method,
        receiver: Some(receiver),
        args,
        ..
    } = &comp.op(id).kind
    else {
        return None;
    };
    if args.len() != 1 {
        return None;
    }
    Some(GuardShape {
        method: *method,
        receiver: *receiver,
        key: args[0],
        negated,
    })
}

/// The branch's one statement, looking through block nesting.
fn sole_statement(comp: &Compilation, mut id: OpId) -> Option<OpId> {
    loop {
        match &comp.op(id).kind {
            OpKind::Block { stmts } if stmts.len() == 1 => id = stmts[0],
            OpKind::Block { .. } => return None,
            _ => return Some(id),
        }
    }
}

fn branch_is_empty(comp: &Compilation, id: OpId) -> bool {
    matches!(&comp.op(id).kind, OpKind::Block { stmts } if stmts.is_empty())
}

/// The mutation invocation inside a guarded statement: a bare call
/// statement, the right side of an assignment, or a local initializer.
fn guarded_call(comp: &Compilation, stmt: OpId) -> Option<OpId> {
    let inner = match &comp.op(stmt).kind {
        OpKind::ExpressionStatement { expr } => {
            let expr = comp.strip_conversions(*expr);
            match &comp.op(expr).kind {
                OpKind::Assignment { value, .. } => *value,
                _ => expr,
            }
        }
        OpKind::LocalDecl {
            init: Some(init), ..
        } => *init,
        _ => return None,
    };
    let inner = comp.strip_conversions(inner);
    matches!(comp.op(inner).kind, OpKind::Invocation { .. }).then_some(inner)
}

impl Rule for RedundantContainsGuardRule {
    fn id(&self) -> &'static str {
        "redundant-contains-guard"
    }

    fn name(&self) -> &'static str {
        "Redundant Contains Guard"
    }

    fn description(&self) -> &'static str {
        "Detects Contains/ContainsKey guards around mutations that already handle absence"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let well_known = comp.well_known();
        let rows: Vec<ResolvedRow> = GUARD_ROWS
            .iter()
            .filter_map(|row| {
                Some(ResolvedRow {
                    guard: well_known.get(row.guard)?,
                    guarded: well_known.get(row.guarded)?,
                    negated: row.negated,
                    note: row.note,
                })
            })
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }

        let mut diagnostics = Vec::new();
        for (_, node) in comp.ops.iter() {
            if node.quoted {
                continue;
            }
            let OpKind::Conditional {
                cond,
                when_true,
                when_false,
                is_statement: true,
            } = node.kind
            else {
                continue;
            };
            let Some(guard) = match_guard(comp, cond) else {
                continue;
            };

            // Guarded statement in the true branch, or in the false branch
            // when the true branch is empty. `sense` is true when the
            // statement runs on a failed membership test.
            let located = if branch_is_empty(comp, when_true) {
                when_false
                    .and_then(|f| sole_statement(comp, f))
                    .map(|stmt| (stmt, !guard.negated))
            } else if when_false.is_none_or(|f| branch_is_empty(comp, f)) {
                sole_statement(comp, when_true).map(|stmt| (stmt, guard.negated))
            } else {
                None
            };
            let Some((stmt, sense)) = located else {
                continue;
            };

            let Some(call) = guarded_call(comp, stmt) else {
                continue;
            };
            let OpKind::Invocation {
                method,
                receiver: Some(receiver),
                args,
                ..
            } = &comp.op(call).kind
            else {
                continue;
            };
            if args.len() != 1 {
                continue;
            }
            let Some(row) = rows
                .iter()
                .find(|row| row.guard == guard.method && row.guarded == *method && row.negated == sense)
            else {
                continue;
            };
            if !same_value(comp, guard.receiver, *receiver)
                || !same_value(comp, guard.key, args[0])
            {
                continue;
            }

            let stmt_span = comp.op(stmt).span;
            let guard_name = row.guard.name();
            diagnostics.push(
                DiagnosticBuilder::new(
                    ctx,
                    self.id(),
                    Severity::Warning,
                    comp.op(cond).span,
                    format!("`{guard_name}` guard is redundant; {}", row.note),
                )
                .suggestion(format!(
                    "Replace the conditional with `{}`",
                    stmt_span.text(ctx.source)
                ))
                .secondary(node.span)
                .secondary(stmt_span)
                .finish(),
            );
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AnalysisContext;
    use crate::sem::{compile, Profile};
    use crate::Config;
    use std::path::Path;

    fn check(source: &str) -> Vec<Diagnostic> {
        let compilation = compile(source, Profile::Modern).expect("Failed to compile");
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.opal"), source, &compilation, &config);
        RedundantContainsGuardRule.check(&ctx)
    }

    #[test]
    fn test_contains_key_guarding_remove() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (cache.ContainsKey(key)) {
                    cache.Remove(key);
                }
            }
        "#;
        let diagnostics = check(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.text(source), "cache.ContainsKey(key)");
        assert_eq!(diagnostics[0].secondary_spans.len(), 2);
        assert!(diagnostics[0].secondary_spans[0]
            .text(source)
            .starts_with("if (cache.ContainsKey(key))"));
        assert_eq!(
            diagnostics[0].secondary_spans[1].text(source),
            "cache.Remove(key);"
        );
    }

    #[test]
    fn test_negated_contains_guarding_add() {
        let source = r#"
            use collections;
            void Track(HashSet<int> seen, int value) {
                if (!seen.Contains(value)) {
                    seen.Add(value);
                }
            }
        "#;
        let diagnostics = check(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("duplicate"));
    }

    #[test]
    fn test_plain_contains_guarding_add_is_not_the_idiom() {
        // Without the negation this adds only when already present, which
        // is not equivalent to a bare Add.
        let source = r#"
            use collections;
            void Track(HashSet<int> seen, int value) {
                if (seen.Contains(value)) {
                    seen.Add(value);
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }

    #[test]
    fn test_flipped_polarity_in_else_branch() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (!cache.ContainsKey(key)) {
                } else {
                    cache.Remove(key);
                }
            }
        "#;
        let diagnostics = check(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].secondary_spans[1].text(source),
            "cache.Remove(key);"
        );
    }

    #[test]
    fn test_parenthesized_guard_matches() {
        let source = r#"
            use collections;
            void Evict(HashSet<string> names, string name) {
                if ((names.Contains(name))) {
                    names.Remove(name);
                }
            }
        "#;
        assert_eq!(check(source).len(), 1);
    }

    #[test]
    fn test_unbraced_guarded_statement() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (cache.ContainsKey(key))
                    cache.Remove(key);
            }
        "#;
        assert_eq!(check(source).len(), 1);
    }

    #[test]
    fn test_assignment_form_matches() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key, bool removed) {
                if (cache.ContainsKey(key)) {
                    removed = cache.Remove(key);
                }
            }
        "#;
        let diagnostics = check(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].secondary_spans[1].text(source),
            "removed = cache.Remove(key);"
        );
    }

    #[test]
    fn test_local_declaration_form_matches() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (cache.ContainsKey(key)) {
                    var removed = cache.Remove(key);
                }
            }
        "#;
        assert_eq!(check(source).len(), 1);
    }

    #[test]
    fn test_different_key_is_not_redundant() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key, string other) {
                if (cache.ContainsKey(key)) {
                    cache.Remove(other);
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }

    #[test]
    fn test_different_receiver_is_not_redundant() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> a, Dictionary<string, int> b, string key) {
                if (a.ContainsKey(key)) {
                    b.Remove(key);
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }

    #[test]
    fn test_identical_constant_keys_match() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache) {
                if (cache.ContainsKey("stale")) {
                    cache.Remove("stale");
                }
            }
        "#;
        assert_eq!(check(source).len(), 1);
    }

    #[test]
    fn test_extra_statement_in_branch_is_not_sole() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key, int count) {
                if (cache.ContainsKey(key)) {
                    count = count + 1;
                    cache.Remove(key);
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }

    #[test]
    fn test_nonempty_else_branch_blocks_the_rewrite() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key, int misses) {
                if (cache.ContainsKey(key)) {
                    cache.Remove(key);
                } else {
                    misses = misses + 1;
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }

    #[test]
    fn test_remove_under_negated_guard_is_not_the_idiom() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (!cache.ContainsKey(key)) {
                    cache.Remove(key);
                }
            }
        "#;
        assert_eq!(check(source).len(), 0);
    }
}
