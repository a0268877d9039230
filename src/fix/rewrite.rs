//! Fix construction by re-locating diagnostic spans.
//!
//! The file may have changed since detection, so nothing here trusts the
//! diagnostic beyond its recorded spans and properties: every span is
//! re-resolved against a fresh compilation and any mismatch declines the
//! fix. [`compute_fix`] is a pure function; file I/O and overlap policy
//! belong to the batch coordinator in the parent module.

use crate::rules::{constant_value, Diagnostic, Fix, Replacement};
use crate::sem::{
    ComparisonKind, Compilation, ConstValue, MemberId, OpId, OpKind, TypeTable, WellKnown,
};
use crate::syntax::lexer::{escape_char, escape_string};
use crate::syntax::Span;

use super::plan::{plan_for, PrefixVariant, RewritePlan, SizeReplacement};

/// Compute the fix for one diagnostic against the file's current text, or
/// decline.
///
/// `None` covers every non-defect outcome: the diagnostic certifies no
/// rewrite, or a recorded span no longer resolves to the expected shape.
pub fn compute_fix(diagnostic: &Diagnostic, source: &str, comp: &Compilation) -> Option<Fix> {
    let plan = match plan_for(diagnostic) {
        Ok(plan) => plan,
        Err(err) => {
            debug_assert!(!err.is_defect(), "{}: {err}", diagnostic.rule_id);
            return None;
        }
    };
    match plan {
        RewritePlan::CollapseGuard => collapse_guard(diagnostic, source, comp),
        RewritePlan::SizeCheck { replacement, empty } => {
            size_check(diagnostic, source, comp, replacement, empty)
        }
        RewritePlan::SizeProperty { length } => size_property(diagnostic, source, comp, length),
        RewritePlan::ClearFill => clear_fill(diagnostic, source, comp),
        RewritePlan::Prefix { variant, negated } => {
            prefix(diagnostic, source, comp, variant, negated)
        }
        RewritePlan::CharLiteral => char_literal(diagnostic, source, comp),
    }
}

fn replacement(diagnostic: &Diagnostic, span: Span, new_text: String) -> Replacement {
    Replacement {
        file_path: diagnostic.file_path.clone(),
        start_byte: span.start,
        end_byte: span.end,
        new_text,
    }
}

fn single(diagnostic: &Diagnostic, span: Span, text: String) -> Option<Fix> {
    Some(Fix {
        description: format!("Replace with `{text}`"),
        replacements: vec![replacement(diagnostic, span, text)],
    })
}

fn collapse_guard(diagnostic: &Diagnostic, source: &str, comp: &Compilation) -> Option<Fix> {
    let &[conditional, stmt] = diagnostic.secondary_spans.as_slice() else {
        return None;
    };
    comp.find_op(conditional, |n| {
        matches!(
            n.kind,
            OpKind::Conditional {
                is_statement: true,
                ..
            }
        )
    })?;
    comp.find_op(stmt, |n| {
        matches!(
            n.kind,
            OpKind::ExpressionStatement { .. } | OpKind::LocalDecl { .. }
        )
    })?;
    if !conditional.contains(stmt) {
        return None;
    }
    Some(Fix {
        description: "Remove the redundant membership guard".to_string(),
        replacements: vec![replacement(
            diagnostic,
            conditional,
            stmt.text(source).to_string(),
        )],
    })
}

fn size_check(
    diagnostic: &Diagnostic,
    source: &str,
    comp: &Compilation,
    kind: SizeReplacement,
    empty: bool,
) -> Option<Fix> {
    let &[receiver] = diagnostic.secondary_spans.as_slice() else {
        return None;
    };
    comp.find_op(diagnostic.span, |n| {
        matches!(
            n.kind,
            OpKind::Invocation { .. } | OpKind::Unary { .. } | OpKind::Binary { .. }
        )
    })?;
    comp.find_op(receiver, |_| true)?;
    let recv = receiver.text(source);
    let text = match (kind, empty) {
        (SizeReplacement::IsEmpty, true) => format!("{recv}.IsEmpty"),
        (SizeReplacement::IsEmpty, false) => format!("!{recv}.IsEmpty"),
        (SizeReplacement::Length, true) => format!("{recv}.Length == 0"),
        (SizeReplacement::Length, false) => format!("{recv}.Length > 0"),
        (SizeReplacement::Count, true) => format!("{recv}.Count == 0"),
        (SizeReplacement::Count, false) => format!("{recv}.Count > 0"),
        (SizeReplacement::Any, true) => format!("!{recv}.Any()"),
        (SizeReplacement::Any, false) => format!("{recv}.Any()"),
    };
    single(diagnostic, diagnostic.span, text)
}

fn size_property(
    diagnostic: &Diagnostic,
    source: &str,
    comp: &Compilation,
    length: bool,
) -> Option<Fix> {
    let &[receiver] = diagnostic.secondary_spans.as_slice() else {
        return None;
    };
    comp.find_op(diagnostic.span, |n| {
        matches!(n.kind, OpKind::Invocation { .. })
    })?;
    comp.find_op(receiver, |_| true)?;
    let name = if length { "Length" } else { "Count" };
    let text = format!("{}.{name}", receiver.text(source));
    single(diagnostic, diagnostic.span, text)
}

fn clear_fill(diagnostic: &Diagnostic, source: &str, comp: &Compilation) -> Option<Fix> {
    let &[receiver] = diagnostic.secondary_spans.as_slice() else {
        return None;
    };
    comp.find_op(diagnostic.span, |n| {
        matches!(n.kind, OpKind::Invocation { .. })
    })?;
    comp.find_op(receiver, |_| true)?;
    let text = format!("{}.Clear()", receiver.text(source));
    single(diagnostic, diagnostic.span, text)
}

/// The `IndexOf` invocation inside a re-located prefix comparison.
fn index_of_call(comp: &Compilation, binary: OpId) -> Option<OpId> {
    let OpKind::Binary { lhs, rhs, .. } = comp.op(binary).kind else {
        return None;
    };
    [lhs, rhs].into_iter().find_map(|side| {
        let id = comp.strip_conversions(side);
        let OpKind::Invocation { method, .. } = &comp.op(id).kind else {
            return None;
        };
        matches!(
            method,
            MemberId::StrIndexOfStr
                | MemberId::StrIndexOfStrCmp
                | MemberId::StrIndexOfChar
                | MemberId::StrIndexOfCharCmp
        )
        .then_some(id)
    })
}

fn char_constant(comp: &Compilation, span: Span) -> Option<char> {
    let id = comp.find_op(span, |n| {
        matches!(
            n.kind,
            OpKind::Literal {
                value: ConstValue::Char(_)
            }
        )
    })?;
    match &comp.op(id).kind {
        OpKind::Literal {
            value: ConstValue::Char(c),
        } => Some(*c),
        _ => None,
    }
}

/// `use spans;` insertion for rewrites that introduce `AsSpan`.
fn import_insertion(diagnostic: &Diagnostic, comp: &Compilation) -> Replacement {
    match comp.tree.uses.last() {
        Some(last) => Replacement {
            file_path: diagnostic.file_path.clone(),
            start_byte: last.span.end,
            end_byte: last.span.end,
            new_text: "\nuse spans;".to_string(),
        },
        None => Replacement {
            file_path: diagnostic.file_path.clone(),
            start_byte: 0,
            end_byte: 0,
            new_text: "use spans;\n\n".to_string(),
        },
    }
}

fn prefix(
    diagnostic: &Diagnostic,
    source: &str,
    comp: &Compilation,
    variant: PrefixVariant,
    negated: bool,
) -> Option<Fix> {
    let (&receiver, args) = diagnostic.secondary_spans.split_first()?;
    let binary = comp.find_op(diagnostic.span, |n| matches!(n.kind, OpKind::Binary { .. }))?;
    comp.find_op(receiver, |_| true)?;
    for &arg in args {
        comp.find_op(arg, |_| true)?;
    }

    // The variant was certified against the compilation that produced the
    // diagnostic; re-check it against this one.
    let call = index_of_call(comp, binary)?;
    let OpKind::Invocation { method, .. } = &comp.op(call).kind else {
        return None;
    };
    let symbols = comp.well_known();
    match (variant, *method) {
        (PrefixVariant::StartsWith, MemberId::StrIndexOfStr) => {
            symbols.get(WellKnown::StringStartsWithString)?;
        }
        (PrefixVariant::StartsWith, MemberId::StrIndexOfStrCmp) => {
            symbols.get(WellKnown::StringStartsWithStringComparison)?;
        }
        (PrefixVariant::StartsWith, MemberId::StrIndexOfChar) => {
            symbols.get(WellKnown::StringStartsWithChar)?;
        }
        (PrefixVariant::AsSpan, MemberId::StrIndexOfCharCmp) => {
            symbols.get(WellKnown::StringAsSpan)?;
            symbols.get(WellKnown::RoSpanStartsWithString)?;
        }
        (PrefixVariant::Expand, MemberId::StrIndexOfChar) => {
            symbols.get(WellKnown::StringLength)?;
            symbols.get(WellKnown::StringIndexer)?;
        }
        _ => return None,
    }

    let recv = receiver.text(source);
    let (text, needs_spans) = match variant {
        PrefixVariant::StartsWith => {
            if args.is_empty() {
                return None;
            }
            let rendered: Vec<&str> = args.iter().map(|a| a.text(source)).collect();
            let call = format!("{recv}.StartsWith({})", rendered.join(", "));
            (if negated { format!("!{call}") } else { call }, false)
        }
        PrefixVariant::AsSpan => {
            let &[literal, _] = args else {
                return None;
            };
            let c = char_constant(comp, literal)?;
            let call = format!(
                "{recv}.AsSpan().StartsWith({})",
                escape_string(&c.to_string())
            );
            (if negated { format!("!{call}") } else { call }, true)
        }
        PrefixVariant::Expand => {
            let &[ch] = args else {
                return None;
            };
            // The receiver is spelled twice, so it must still be a plain
            // symbol.
            comp.find_op(receiver, |n| {
                matches!(n.kind, OpKind::LocalRef { .. } | OpKind::ParamRef { .. })
            })?;
            let ch = ch.text(source);
            let text = if negated {
                format!("{recv}.Length == 0 || {recv}[0] != {ch}")
            } else {
                format!("{recv}.Length > 0 && {recv}[0] == {ch}")
            };
            (text, false)
        }
    };

    let mut replacements = vec![replacement(diagnostic, diagnostic.span, text.clone())];
    if needs_spans && !comp.imports.spans {
        replacements.push(import_insertion(diagnostic, comp));
    }
    Some(Fix {
        description: format!("Replace with `{text}`"),
        replacements,
    })
}

fn char_literal(diagnostic: &Diagnostic, source: &str, comp: &Compilation) -> Option<Fix> {
    let call = comp.find_op(diagnostic.span, |n| {
        matches!(n.kind, OpKind::Invocation { .. })
    })?;
    let OpKind::Invocation { method, args, .. } = &comp.op(call).kind else {
        return None;
    };
    // The rewritten call must bind the char overload in this compilation.
    let required = match method {
        MemberId::StrContainsStr => WellKnown::StringContainsChar,
        MemberId::StrStartsWithStr | MemberId::StrStartsWithStrCmp => {
            WellKnown::StringStartsWithChar
        }
        MemberId::StrEndsWithStr | MemberId::StrEndsWithStrCmp => WellKnown::StringEndsWithChar,
        MemberId::StrIndexOfStr | MemberId::StrIndexOfStrCmp => WellKnown::StringIndexOfChar,
        MemberId::StrIndexOfStrStart => WellKnown::StringIndexOfCharStart,
        _ => return None,
    };
    comp.well_known().get(required)?;

    let (&first, rest) = args.split_first()?;
    let literal = comp.strip_conversions(first);
    let OpKind::Literal {
        value: ConstValue::Str(value),
    } = &comp.op(literal).kind
    else {
        return None;
    };
    let mut chars = value.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };

    // An Ordinal comparison argument goes away with the literal; the char
    // overload is ordinal by definition. Any other trailing argument stays.
    let mut span = comp.op(literal).span;
    if let Some(&next) = rest.first() {
        if comp.op(next).ty == TypeTable::COMPARISON {
            if !matches!(
                constant_value(comp, next),
                Some(ConstValue::Comparison(ComparisonKind::Ordinal))
            ) {
                return None;
            }
            span = span.join(comp.op(comp.strip_conversions(next)).span);
        }
    }

    let char_text = escape_char(c);
    Some(Fix {
        description: format!("Replace `{}` with `{char_text}`", span.text(source)),
        replacements: vec![replacement(diagnostic, span, char_text)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AnalysisContext;
    use crate::rules::{registry, Rule};
    use crate::sem::{compile, Profile};
    use crate::Config;
    use std::path::Path;

    fn diagnose(source: &str, profile: Profile, rule_id: &str) -> Vec<Diagnostic> {
        let compilation = compile(source, profile).expect("Failed to compile");
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.opal"), source, &compilation, &config);
        registry::get_rule(rule_id).expect("unknown rule").check(&ctx)
    }

    fn apply(source: &str, fix: &Fix) -> String {
        let mut replacements: Vec<&Replacement> = fix.replacements.iter().collect();
        replacements.sort_by_key(|r| std::cmp::Reverse(r.start_byte));
        let mut out = source.to_string();
        for r in replacements {
            out.replace_range(r.start_byte..r.end_byte, &r.new_text);
        }
        out
    }

    fn fix_one(source: &str, profile: Profile, rule_id: &str) -> String {
        let diagnostics = diagnose(source, profile, rule_id);
        assert_eq!(diagnostics.len(), 1, "expected one diagnostic");
        let compilation = compile(source, profile).expect("Failed to compile");
        let fix = compute_fix(&diagnostics[0], source, &compilation).expect("expected a fix");
        apply(source, &fix)
    }

    #[test]
    fn test_collapse_guard_keeps_surrounding_code() {
        let source = "use collections;\n\
                      void Evict(Dictionary<string, int> cache, string key) {\n\
                      \x20   // drop stale entry\n\
                      \x20   if (cache.ContainsKey(key)) {\n\
                      \x20       cache.Remove(key);\n\
                      \x20   }\n\
                      \x20   return;\n\
                      }\n";
        let fixed = fix_one(source, Profile::Modern, "redundant-contains-guard");
        assert!(fixed.contains("// drop stale entry"));
        assert!(fixed.contains("cache.Remove(key);"));
        assert!(!fixed.contains("ContainsKey"));
        assert!(fixed.contains("return;"));
    }

    #[test]
    fn test_collapse_guard_is_idempotent() {
        let source = r#"
            use collections;
            void Evict(Dictionary<string, int> cache, string key) {
                if (cache.ContainsKey(key)) {
                    cache.Remove(key);
                }
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "redundant-contains-guard");
        assert_eq!(
            diagnose(&fixed, Profile::Modern, "redundant-contains-guard").len(),
            0
        );
    }

    #[test]
    fn test_any_becomes_is_empty() {
        let source = r#"
            use collections;
            bool IsIdle(Vector<int> queue) {
                return !queue.Any();
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "any-for-emptiness");
        assert!(fixed.contains("return queue.IsEmpty;"));
    }

    #[test]
    fn test_count_comparison_becomes_any() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() == 0;
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "count-call-comparison");
        assert!(fixed.contains("return !xs.Any();"));
    }

    #[test]
    fn test_count_becomes_length_property() {
        let source = r#"
            use collections;
            int Size(Vector<int> xs) {
                return xs.Count();
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "count-over-property");
        assert!(fixed.contains("return xs.Length;"));
    }

    #[test]
    fn test_fill_becomes_clear() {
        let source = r#"
            use spans;
            void Reset(Span<int> buffer) {
                buffer.Fill(default);
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "fill-with-default");
        assert!(fixed.contains("buffer.Clear();"));
        assert_eq!(diagnose(&fixed, Profile::Modern, "fill-with-default").len(), 0);
    }

    #[test]
    fn test_index_of_becomes_starts_with() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf("ab") == 0;
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "index-of-zero-comparison");
        assert!(fixed.contains("return s.StartsWith(\"ab\");"));
    }

    #[test]
    fn test_negated_index_of_keeps_the_negation() {
        let source = r#"
            bool LacksPrefix(string s) {
                return s.IndexOf("ab") != 0;
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "index-of-zero-comparison");
        assert!(fixed.contains("return !s.StartsWith(\"ab\");"));
    }

    #[test]
    fn test_as_span_rewrite_adds_import_after_existing_uses() {
        let source = "use collections;\n\
                      bool HasPrefix(string s) {\n\
                      \x20   return s.IndexOf('a', StringComparison.Ordinal) == 0;\n\
                      }\n";
        let fixed = fix_one(source, Profile::Modern, "index-of-zero-comparison");
        assert!(fixed.contains("use collections;\nuse spans;"));
        assert!(fixed.contains("s.AsSpan().StartsWith(\"a\")"));
    }

    #[test]
    fn test_as_span_rewrite_adds_import_to_bare_file() {
        let source = "bool HasPrefix(string s) {\n\
                      \x20   return s.IndexOf('a', StringComparison.Ordinal) == 0;\n\
                      }\n";
        let fixed = fix_one(source, Profile::Modern, "index-of-zero-comparison");
        assert!(fixed.starts_with("use spans;\n\n"));
    }

    #[test]
    fn test_as_span_rewrite_skips_import_when_present() {
        let source = "use spans;\n\
                      bool HasPrefix(string s) {\n\
                      \x20   return s.IndexOf('a', StringComparison.Ordinal) == 0;\n\
                      }\n";
        let fixed = fix_one(source, Profile::Modern, "index-of-zero-comparison");
        assert_eq!(fixed.matches("use spans;").count(), 1);
    }

    #[test]
    fn test_expansion_under_legacy_profile() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a') == 0;
            }
        "#;
        let fixed = fix_one(source, Profile::Legacy, "index-of-zero-comparison");
        assert!(fixed.contains("return s.Length > 0 && s[0] == 'a';"));
    }

    #[test]
    fn test_negated_expansion_under_legacy_profile() {
        let source = r#"
            bool LacksPrefix(string s) {
                return s.IndexOf('a') != 0;
            }
        "#;
        let fixed = fix_one(source, Profile::Legacy, "index-of-zero-comparison");
        assert!(fixed.contains("return s.Length == 0 || s[0] != 'a';"));
    }

    #[test]
    fn test_unfixable_prefix_report_declines() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a', StringComparison.CurrentCulture) == 0;
            }
        "#;
        let diagnostics = diagnose(source, Profile::Modern, "index-of-zero-comparison");
        assert_eq!(diagnostics.len(), 1);
        let compilation = compile(source, Profile::Modern).unwrap();
        assert!(compute_fix(&diagnostics[0], source, &compilation).is_none());
    }

    #[test]
    fn test_single_char_literal_rewrite() {
        let source = r#"
            bool HasDash(string s) {
                return s.Contains("-");
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "single-char-string");
        assert!(fixed.contains("s.Contains('-')"));
    }

    #[test]
    fn test_ordinal_argument_is_dropped() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.StartsWith("a", StringComparison.Ordinal);
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "single-char-string");
        assert!(fixed.contains("s.StartsWith('a')"));
        assert!(!fixed.contains("StringComparison"));
    }

    #[test]
    fn test_trailing_start_index_is_preserved() {
        let source = r#"
            int Find(string s) {
                return s.IndexOf("-", 3);
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "single-char-string");
        assert!(fixed.contains("s.IndexOf('-', 3)"));
    }

    #[test]
    fn test_escaped_char_is_rendered_escaped() {
        let source = r#"
            bool HasNewline(string s) {
                return s.Contains("\n");
            }
        "#;
        let fixed = fix_one(source, Profile::Modern, "single-char-string");
        assert!(fixed.contains("s.Contains('\\n')"));
    }

    #[test]
    fn test_stale_span_declines() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() == 0;
            }
        "#;
        let diagnostics = diagnose(source, Profile::Modern, "count-call-comparison");
        assert_eq!(diagnostics.len(), 1);

        // The file moved on since the diagnostic was recorded.
        let edited = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() < 10;
            }
        "#;
        let compilation = compile(edited, Profile::Modern).unwrap();
        assert!(compute_fix(&diagnostics[0], edited, &compilation).is_none());
    }

    #[test]
    fn test_fix_is_deterministic() {
        let source = r#"
            use collections;
            bool HasWork(Vector<int> queue) {
                return queue.Any();
            }
        "#;
        let diagnostics = diagnose(source, Profile::Modern, "any-for-emptiness");
        let compilation = compile(source, Profile::Modern).unwrap();
        let a = compute_fix(&diagnostics[0], source, &compilation).unwrap();
        let b = compute_fix(&diagnostics[0], source, &compilation).unwrap();
        assert_eq!(a.replacements[0].new_text, b.replacements[0].new_text);
        assert_eq!(a.replacements[0].start_byte, b.replacements[0].start_byte);
    }
}
