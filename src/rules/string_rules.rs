use super::{
    constant_value, integer_constant, is_symbol_ref, Diagnostic, DiagnosticBuilder, Rule,
    Severity, PROP_NEGATE, PROP_VARIANT,
};
use crate::engine::AnalysisContext;
use crate::sem::{
    ComparisonKind, Compilation, ConstValue, MemberId, OpId, OpKind, WellKnown, WellKnownSymbols,
};
use crate::syntax::lexer::{escape_char, escape_string};
use crate::syntax::BinaryOp;

/// Detects `IndexOf(...) == 0` and `!= 0` used as a prefix test
pub struct IndexOfZeroComparisonRule;

/// Detects single-character string literals passed where a char overload of
/// the same method exists
pub struct SingleCharStringRule;

/// The `IndexOf` overloads participating in the prefix-test idiom. The
/// start-index overloads are out: an offset search landing on 0 is not a
/// prefix test.
struct IndexOfFamily {
    string: MemberId,
    string_cmp: MemberId,
    char_plain: MemberId,
    char_cmp: Option<MemberId>,
}

impl IndexOfFamily {
    fn resolve(symbols: &WellKnownSymbols) -> Option<Self> {
        Some(IndexOfFamily {
            string: symbols.get(WellKnown::StringIndexOfString)?,
            string_cmp: symbols.get(WellKnown::StringIndexOfStringComparison)?,
            char_plain: symbols.get(WellKnown::StringIndexOfChar)?,
            char_cmp: symbols.get(WellKnown::StringIndexOfCharComparison),
        })
    }

    fn contains(&self, member: MemberId) -> bool {
        member == self.string
            || member == self.string_cmp
            || member == self.char_plain
            || Some(member) == self.char_cmp
    }
}

/// How the prefix test gets rewritten. `None` from [`prefix_rewrite`] means
/// the idiom is reported but no safe rewrite exists in this compilation.
enum PrefixRewrite {
    /// `s.StartsWith(...)` with the arguments carried across unchanged.
    StartsWith,
    /// `s.AsSpan().StartsWith("c")`; the char literal becomes a one-character
    /// string literal.
    AsSpan(char),
    /// `s.Length > 0 && s[0] == c` (or the `||`/`!=` form when negated).
    Expand,
}

impl PrefixRewrite {
    fn variant(&self) -> &'static str {
        match self {
            PrefixRewrite::StartsWith => "starts-with",
            PrefixRewrite::AsSpan(_) => "as-span",
            PrefixRewrite::Expand => "expand",
        }
    }
}

fn prefix_rewrite(
    comp: &Compilation,
    family: &IndexOfFamily,
    member: MemberId,
    receiver: OpId,
    args: &[OpId],
) -> Option<PrefixRewrite> {
    let symbols = comp.well_known();
    if member == family.string {
        symbols.get(WellKnown::StringStartsWithString)?;
        return Some(PrefixRewrite::StartsWith);
    }
    if member == family.string_cmp {
        symbols.get(WellKnown::StringStartsWithStringComparison)?;
        return Some(PrefixRewrite::StartsWith);
    }
    if member == family.char_plain {
        if symbols.get(WellKnown::StringStartsWithChar).is_some() {
            return Some(PrefixRewrite::StartsWith);
        }
        // The expansion spells the receiver twice, so it must be a plain
        // local or parameter.
        if symbols.get(WellKnown::StringLength).is_some()
            && symbols.get(WellKnown::StringIndexer).is_some()
            && is_symbol_ref(comp, receiver)
        {
            return Some(PrefixRewrite::Expand);
        }
        return None;
    }
    if Some(member) == family.char_cmp {
        // Only ordinal search is a plain prefix test, and only a literal can
        // be re-spelled as a string.
        let Some(ConstValue::Comparison(ComparisonKind::Ordinal)) = constant_value(comp, args[1])
        else {
            return None;
        };
        symbols.get(WellKnown::StringAsSpan)?;
        symbols.get(WellKnown::RoSpanStartsWithString)?;
        let Some(ConstValue::Char(c)) = constant_value(comp, args[0]) else {
            return None;
        };
        return Some(PrefixRewrite::AsSpan(*c));
    }
    None
}

/// The operand as a participating `IndexOf` invocation, conversions
/// unwrapped.
fn as_index_of(comp: &Compilation, family: &IndexOfFamily, id: OpId) -> Option<OpId> {
    let id = comp.strip_conversions(id);
    let OpKind::Invocation {
        method,
        receiver: Some(_),
        ..
    } = &comp.op(id).kind
    else {
        return None;
    };
    family.contains(*method).then_some(id)
}

fn prefix_preview(
    source: &str,
    comp: &Compilation,
    rewrite: &PrefixRewrite,
    negated: bool,
    receiver: OpId,
    args: &[OpId],
) -> String {
    let recv = comp.op_text(source, receiver);
    match rewrite {
        PrefixRewrite::StartsWith => {
            let rendered: Vec<&str> = args.iter().map(|&a| comp.op_text(source, a)).collect();
            let call = format!("{recv}.StartsWith({})", rendered.join(", "));
            if negated {
                format!("!{call}")
            } else {
                call
            }
        }
        PrefixRewrite::AsSpan(c) => {
            let call = format!(
                "{recv}.AsSpan().StartsWith({})",
                escape_string(&c.to_string())
            );
            if negated {
                format!("!{call}")
            } else {
                call
            }
        }
        PrefixRewrite::Expand => {
            let ch = comp.op_text(source, args[0]);
            if negated {
                format!("{recv}.Length == 0 || {recv}[0] != {ch}")
            } else {
                format!("{recv}.Length > 0 && {recv}[0] == {ch}")
            }
        }
    }
}

impl Rule for IndexOfZeroComparisonRule {
    fn id(&self) -> &'static str {
        "index-of-zero-comparison"
    }

    fn name(&self) -> &'static str {
        "IndexOf Zero Comparison"
    }

    fn description(&self) -> &'static str {
        "Detects IndexOf() results compared against 0 where StartsWith expresses the prefix test"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let Some(family) = IndexOfFamily::resolve(comp.well_known()) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        for (_, node) in comp.ops.iter() {
            if node.quoted {
                continue;
            }
            let OpKind::Binary { op, lhs, rhs } = node.kind else {
                continue;
            };
            let negated = match op {
                BinaryOp::Eq => false,
                BinaryOp::Ne => true,
                _ => continue,
            };
            let call = [(lhs, rhs), (rhs, lhs)].into_iter().find_map(|(a, b)| {
                let call = as_index_of(comp, &family, a)?;
                (integer_constant(comp, b) == Some(0)).then_some(call)
            });
            let Some(call) = call else {
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
            let receiver = comp.strip_conversions(*receiver);
            let rewrite = prefix_rewrite(comp, &family, *method, receiver, args);

            let message = match &rewrite {
                Some(rewrite) => {
                    let fixed = prefix_preview(ctx.source, comp, rewrite, negated, receiver, args);
                    format!("`IndexOf` compared against 0 tests for a prefix; `{fixed}` says it directly")
                }
                None => {
                    "`IndexOf` compared against 0 tests for a prefix; prefer a `StartsWith` check"
                        .to_string()
                }
            };

            let mut builder =
                DiagnosticBuilder::new(ctx, self.id(), Severity::Warning, node.span, message)
                    .secondary(comp.op(receiver).span);
            for &arg in args {
                builder = builder.secondary(comp.op(arg).span);
            }
            if let Some(rewrite) = &rewrite {
                let fixed = prefix_preview(ctx.source, comp, rewrite, negated, receiver, args);
                builder = builder
                    .suggestion(format!("Replace with `{fixed}`"))
                    .property(PROP_VARIANT, rewrite.variant());
            }
            if negated {
                builder = builder.flag(PROP_NEGATE);
            }
            diagnostics.push(builder.finish());
        }
        diagnostics
    }
}

/// A string-taking member with a char-taking twin. `has_comparison` rows
/// carry a `StringComparison` that must be `Ordinal` (char overloads are
/// ordinal by definition; any other comparison disqualifies the match).
struct LiteralRow {
    matched: WellKnown,
    replacement: WellKnown,
    has_comparison: bool,
}

const LITERAL_ROWS: &[LiteralRow] = &[
    LiteralRow {
        matched: WellKnown::StringContainsString,
        replacement: WellKnown::StringContainsChar,
        has_comparison: false,
    },
    LiteralRow {
        matched: WellKnown::StringStartsWithString,
        replacement: WellKnown::StringStartsWithChar,
        has_comparison: false,
    },
    LiteralRow {
        matched: WellKnown::StringStartsWithStringComparison,
        replacement: WellKnown::StringStartsWithChar,
        has_comparison: true,
    },
    LiteralRow {
        matched: WellKnown::StringEndsWithString,
        replacement: WellKnown::StringEndsWithChar,
        has_comparison: false,
    },
    LiteralRow {
        matched: WellKnown::StringEndsWithStringComparison,
        replacement: WellKnown::StringEndsWithChar,
        has_comparison: true,
    },
    LiteralRow {
        matched: WellKnown::StringIndexOfString,
        replacement: WellKnown::StringIndexOfChar,
        has_comparison: false,
    },
    LiteralRow {
        matched: WellKnown::StringIndexOfStringComparison,
        replacement: WellKnown::StringIndexOfChar,
        has_comparison: true,
    },
    LiteralRow {
        matched: WellKnown::StringIndexOfStringStart,
        replacement: WellKnown::StringIndexOfCharStart,
        has_comparison: false,
    },
];

impl Rule for SingleCharStringRule {
    fn id(&self) -> &'static str {
        "single-char-string"
    }

    fn name(&self) -> &'static str {
        "Single Char String"
    }

    fn description(&self) -> &'static str {
        "Detects one-character string literals passed to methods with a char overload"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let well_known = comp.well_known();
        let rows: Vec<(MemberId, bool)> = LITERAL_ROWS
            .iter()
            .filter_map(|row| {
                well_known.get(row.replacement)?;
                Some((well_known.get(row.matched)?, row.has_comparison))
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
            let OpKind::Invocation {
                method,
                receiver: Some(receiver),
                args,
                ..
            } = &node.kind
            else {
                continue;
            };
            let Some(&(_, has_comparison)) = rows.iter().find(|(m, _)| m == method) else {
                continue;
            };
            let Some(ConstValue::Str(value)) = constant_value(comp, args[0]) else {
                continue;
            };
            let mut chars = value.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                continue;
            };
            if has_comparison
                && !matches!(
                    constant_value(comp, args[1]),
                    Some(ConstValue::Comparison(ComparisonKind::Ordinal))
                )
            {
                continue;
            }

            let receiver = comp.strip_conversions(*receiver);
            let literal = comp.strip_conversions(args[0]);
            let literal_text = comp.op_text(ctx.source, literal);
            let char_text = escape_char(c);
            let mut builder = DiagnosticBuilder::new(
                ctx,
                self.id(),
                Severity::Info,
                node.span,
                format!(
                    "string literal `{literal_text}` has a single character; the char overload of `{}` avoids a substring search",
                    method.name()
                ),
            )
            .suggestion(format!("Replace `{literal_text}` with `{char_text}`"))
            .secondary(comp.op(receiver).span);
            for &arg in args {
                builder = builder.secondary(comp.op(arg).span);
            }
            diagnostics.push(builder.finish());
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

    fn run_rule(rule: &dyn Rule, source: &str, profile: Profile) -> Vec<Diagnostic> {
        let compilation = compile(source, profile).expect("Failed to compile");
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.opal"), source, &compilation, &config);
        rule.check(&ctx)
    }

    fn check_prefix(source: &str) -> Vec<Diagnostic> {
        run_rule(&IndexOfZeroComparisonRule, source, Profile::Modern)
    }

    fn check_prefix_legacy(source: &str) -> Vec<Diagnostic> {
        run_rule(&IndexOfZeroComparisonRule, source, Profile::Legacy)
    }

    fn check_literal(source: &str) -> Vec<Diagnostic> {
        run_rule(&SingleCharStringRule, source, Profile::Modern)
    }

    #[test]
    fn test_string_argument_becomes_starts_with() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf("ab") == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), Some("starts-with"));
        assert!(!diagnostics[0].has_flag(PROP_NEGATE));
        assert!(diagnostics[0].message.contains("s.StartsWith(\"ab\")"));
        assert_eq!(diagnostics[0].span.text(source), "s.IndexOf(\"ab\") == 0");
    }

    #[test]
    fn test_not_equal_negates() {
        let source = r#"
            bool LacksPrefix(string s) {
                return s.IndexOf("ab") != 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_flag(PROP_NEGATE));
        assert!(diagnostics[0].message.contains("!s.StartsWith(\"ab\")"));
    }

    #[test]
    fn test_reflected_operands_match() {
        let source = r#"
            bool HasPrefix(string s) {
                return 0 == s.IndexOf("ab");
            }
        "#;
        assert_eq!(check_prefix(source).len(), 1);
    }

    #[test]
    fn test_comparison_argument_is_carried() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf("ab", StringComparison.OrdinalIgnoreCase) == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), Some("starts-with"));
        assert!(diagnostics[0]
            .message
            .contains("s.StartsWith(\"ab\", StringComparison.OrdinalIgnoreCase)"));
    }

    #[test]
    fn test_char_argument_uses_char_starts_with_when_present() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a') == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), Some("starts-with"));
        assert!(diagnostics[0].message.contains("s.StartsWith('a')"));
    }

    #[test]
    fn test_char_argument_expands_without_char_overload() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a') == 0;
            }
        "#;
        let diagnostics = check_prefix_legacy(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), Some("expand"));
        assert!(diagnostics[0].message.contains("s.Length > 0 && s[0] == 'a'"));
    }

    #[test]
    fn test_negated_expansion_flips_both_checks() {
        let source = r#"
            bool LacksPrefix(string s) {
                return s.IndexOf('a') != 0;
            }
        "#;
        let diagnostics = check_prefix_legacy(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("s.Length == 0 || s[0] != 'a'"));
    }

    #[test]
    fn test_ordinal_char_comparison_wraps_receiver() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a', StringComparison.Ordinal) == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), Some("as-span"));
        assert!(diagnostics[0]
            .message
            .contains("s.AsSpan().StartsWith(\"a\")"));
    }

    #[test]
    fn test_culture_char_comparison_reports_without_fix() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf('a', StringComparison.CurrentCulture) == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), None);
        assert!(diagnostics[0].suggestion.is_none());
    }

    #[test]
    fn test_non_literal_char_with_ordinal_reports_without_fix() {
        let source = r#"
            bool HasPrefix(string s, char c) {
                return s.IndexOf(c, StringComparison.Ordinal) == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), None);
    }

    #[test]
    fn test_expansion_requires_symbol_receiver() {
        let source = r#"
            string Name() {
                return "widget";
            }
            bool HasPrefix() {
                return Name().IndexOf('a') == 0;
            }
        "#;
        let diagnostics = check_prefix_legacy(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_VARIANT), None);
    }

    #[test]
    fn test_other_constants_do_not_match() {
        let source = r#"
            bool Second(string s) {
                return s.IndexOf("ab") == 1;
            }
        "#;
        assert_eq!(check_prefix(source).len(), 0);
    }

    #[test]
    fn test_relational_comparison_does_not_match() {
        let source = r#"
            bool Found(string s) {
                return s.IndexOf("ab") > 0;
            }
        "#;
        assert_eq!(check_prefix(source).len(), 0);
    }

    #[test]
    fn test_start_index_overload_does_not_match() {
        let source = r#"
            bool Odd(string s) {
                return s.IndexOf("ab", 2) == 0;
            }
        "#;
        assert_eq!(check_prefix(source).len(), 0);
    }

    #[test]
    fn test_secondary_spans_are_receiver_then_arguments() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.IndexOf("ab", StringComparison.Ordinal) == 0;
            }
        "#;
        let diagnostics = check_prefix(source);
        assert_eq!(diagnostics.len(), 1);
        let spans: Vec<&str> = diagnostics[0]
            .secondary_spans
            .iter()
            .map(|s| s.text(source))
            .collect();
        assert_eq!(spans, vec!["s", "\"ab\"", "StringComparison.Ordinal"]);
    }

    #[test]
    fn test_quoted_prefix_test_is_ignored() {
        let source = r#"
            use collections;
            void Filter(Query<string> names) {
                names.Where(n => n.IndexOf("a") == 0);
            }
        "#;
        assert_eq!(check_prefix(source).len(), 0);
    }

    #[test]
    fn test_contains_single_char_literal() {
        let source = r#"
            bool HasDash(string s) {
                return s.Contains("-");
            }
        "#;
        let diagnostics = check_literal(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Info);
        assert!(diagnostics[0]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("'-'"));
    }

    #[test]
    fn test_two_char_literal_does_not_match() {
        let source = r#"
            bool HasArrow(string s) {
                return s.Contains("->");
            }
        "#;
        assert_eq!(check_literal(source).len(), 0);
    }

    #[test]
    fn test_empty_literal_does_not_match() {
        let source = r#"
            bool Weird(string s) {
                return s.Contains("");
            }
        "#;
        assert_eq!(check_literal(source).len(), 0);
    }

    #[test]
    fn test_escaped_literal_counts_as_one_char() {
        let source = r#"
            bool HasNewline(string s) {
                return s.Contains("\n");
            }
        "#;
        let diagnostics = check_literal(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("'\\n'"));
    }

    #[test]
    fn test_contains_has_no_char_overload_in_legacy() {
        let source = r#"
            bool HasDash(string s) {
                return s.Contains("-");
            }
        "#;
        assert_eq!(
            run_rule(&SingleCharStringRule, source, Profile::Legacy).len(),
            0
        );
    }

    #[test]
    fn test_index_of_has_char_overload_in_legacy() {
        let source = r#"
            int Find(string s) {
                return s.IndexOf("-");
            }
        "#;
        assert_eq!(
            run_rule(&SingleCharStringRule, source, Profile::Legacy).len(),
            1
        );
    }

    #[test]
    fn test_ordinal_comparison_is_droppable() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.StartsWith("a", StringComparison.Ordinal);
            }
        "#;
        let diagnostics = check_literal(source);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_culture_comparison_disqualifies() {
        let source = r#"
            bool HasPrefix(string s) {
                return s.StartsWith("a", StringComparison.CurrentCulture);
            }
        "#;
        assert_eq!(check_literal(source).len(), 0);
    }

    #[test]
    fn test_start_index_is_preserved_in_secondary_spans() {
        let source = r#"
            int Find(string s) {
                return s.IndexOf("-", 3);
            }
        "#;
        let diagnostics = check_literal(source);
        assert_eq!(diagnostics.len(), 1);
        let spans: Vec<&str> = diagnostics[0]
            .secondary_spans
            .iter()
            .map(|s| s.text(source))
            .collect();
        assert_eq!(spans, vec!["s", "\"-\"", "3"]);
    }

    #[test]
    fn test_ends_with_single_char() {
        let source = r#"
            bool HasSlash(string s) {
                return s.EndsWith("/");
            }
        "#;
        assert_eq!(check_literal(source).len(), 1);
    }
}
