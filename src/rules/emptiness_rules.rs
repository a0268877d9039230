use super::{
    integer_constant, sequence_source, DiagnosticBuilder, Diagnostic, Rule, Severity,
    PROP_NEGATE, PROP_PROPERTY, PROP_REPLACEMENT,
};
use crate::engine::AnalysisContext;
use crate::sem::{Compilation, MemberId, OpId, OpKind, OpNode, SizeProp, WellKnown};
use crate::syntax::{BinaryOp, UnaryOp};

/// Detects Any() used as an emptiness test where the receiver has an O(1)
/// size member
pub struct AnyForEmptinessRule;

/// Detects Count() compared against 0 or 1 as an emptiness test
pub struct CountCallComparisonRule;

/// Detects Count() calls where the receiver exposes a size property
pub struct CountOverPropertyRule;

/// A comparison between a sequence Count() call and a constant that means
/// "is empty" or "is non-empty".
struct EmptinessShape {
    /// The Count() invocation inside the comparison.
    count_call: OpId,
    /// The collection the call enumerates, conversions stripped.
    source: OpId,
    /// True when the comparison is satisfied exactly by an empty sequence.
    empty: bool,
}

fn mirror(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

/// Emptiness meaning with the count on the left-hand side. Any other
/// combination is not an emptiness check.
fn empty_meaning(op: BinaryOp, constant: i64) -> Option<bool> {
    match (op, constant) {
        (BinaryOp::Eq, 0) | (BinaryOp::Le, 0) | (BinaryOp::Lt, 1) => Some(true),
        (BinaryOp::Ne, 0) | (BinaryOp::Gt, 0) | (BinaryOp::Ge, 1) => Some(false),
        _ => None,
    }
}

/// The operand as a sequence Count() invocation, conversions unwrapped.
fn as_count_call(comp: &Compilation, count_member: MemberId, id: OpId) -> Option<(OpId, OpId)> {
    let id = comp.strip_conversions(id);
    let node = comp.op(id);
    let OpKind::Invocation { method, .. } = &node.kind else {
        return None;
    };
    if *method != count_member {
        return None;
    }
    let source = sequence_source(node)?;
    Some((id, comp.strip_conversions(source)))
}

/// Recognize `xs.Count() <op> const` (either operand order) as an emptiness
/// test. Used by [`CountCallComparisonRule`] to match and by
/// [`CountOverPropertyRule`] to stand aside.
fn emptiness_shape(
    comp: &Compilation,
    count_member: MemberId,
    node: &OpNode,
) -> Option<EmptinessShape> {
    let OpKind::Binary { op, lhs, rhs } = node.kind else {
        return None;
    };
    if !op.is_comparison() {
        return None;
    }
    if let (Some((count_call, source)), Some(constant)) = (
        as_count_call(comp, count_member, lhs),
        integer_constant(comp, rhs),
    ) {
        let empty = empty_meaning(op, constant)?;
        return Some(EmptinessShape {
            count_call,
            source,
            empty,
        });
    }
    if let (Some((count_call, source)), Some(constant)) = (
        as_count_call(comp, count_member, rhs),
        integer_constant(comp, lhs),
    ) {
        let empty = empty_meaning(mirror(op), constant)?;
        return Some(EmptinessShape {
            count_call,
            source,
            empty,
        });
    }
    None
}

/// Replacement expression text shown in messages; the fixer re-derives the
/// same text from the recorded properties.
fn size_check_text(receiver: &str, prop: SizeProp, empty: bool) -> String {
    match (prop, empty) {
        (SizeProp::IsEmpty, true) => format!("{receiver}.IsEmpty"),
        (SizeProp::IsEmpty, false) => format!("!{receiver}.IsEmpty"),
        (SizeProp::Length, true) => format!("{receiver}.Length == 0"),
        (SizeProp::Length, false) => format!("{receiver}.Length > 0"),
        (SizeProp::Count, true) => format!("{receiver}.Count == 0"),
        (SizeProp::Count, false) => format!("{receiver}.Count > 0"),
    }
}

fn replacement_key(prop: SizeProp) -> &'static str {
    match prop {
        SizeProp::IsEmpty => "is-empty",
        SizeProp::Length => "length",
        SizeProp::Count => "count",
    }
}

/// IsEmpty first, then Length, then Count.
fn preferred_size_property(comp: &Compilation, id: OpId) -> Option<SizeProp> {
    let props = comp.types.size_properties(comp.op(id).ty);
    for wanted in [SizeProp::IsEmpty, SizeProp::Length, SizeProp::Count] {
        if props.iter().any(|(p, _)| *p == wanted) {
            return Some(wanted);
        }
    }
    None
}

impl Rule for AnyForEmptinessRule {
    fn id(&self) -> &'static str {
        "any-for-emptiness"
    }

    fn name(&self) -> &'static str {
        "Any For Emptiness"
    }

    fn description(&self) -> &'static str {
        "Detects Any() emptiness tests on receivers with an O(1) IsEmpty/Length/Count member"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let Some(seq_any) = comp.well_known().get(WellKnown::SeqAny) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        for (id, node) in comp.ops.iter() {
            if node.quoted {
                continue;
            }
            let OpKind::Invocation { method, .. } = &node.kind else {
                continue;
            };
            if *method != seq_any {
                continue;
            }
            let Some(source) = sequence_source(node) else {
                continue;
            };
            let value = comp.strip_conversions(source);
            let Some(prop) = preferred_size_property(comp, value) else {
                continue;
            };

            // `!xs.Any()` reports and rewrites the whole negation.
            let (span, empty) = match comp.parent_op(id) {
                Some((_, parent))
                    if matches!(
                        parent.kind,
                        OpKind::Unary {
                            op: UnaryOp::Not,
                            ..
                        }
                    ) && !parent.quoted =>
                {
                    (parent.span, true)
                }
                _ => (node.span, false),
            };

            let receiver_span = comp.op(value).span;
            let fixed = size_check_text(receiver_span.text(ctx.source), prop, empty);
            let mut builder = DiagnosticBuilder::new(
                ctx,
                self.id(),
                Severity::Warning,
                span,
                format!("`Any()` enumerates the sequence to test for elements; `{fixed}` is O(1)"),
            )
            .suggestion(format!("Replace with `{fixed}`"))
            .secondary(receiver_span)
            .property(PROP_REPLACEMENT, replacement_key(prop));
            if empty {
                builder = builder.flag(PROP_NEGATE);
            }
            diagnostics.push(builder.finish());
        }
        diagnostics
    }
}

impl Rule for CountCallComparisonRule {
    fn id(&self) -> &'static str {
        "count-call-comparison"
    }

    fn name(&self) -> &'static str {
        "Count Call Comparison"
    }

    fn description(&self) -> &'static str {
        "Detects Count() compared against 0 or 1 where IsEmpty or Any() answers the same question"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let well_known = comp.well_known();
        let Some(seq_count) = well_known.get(WellKnown::SeqCount) else {
            return Vec::new();
        };
        if well_known.get(WellKnown::SeqAny).is_none() {
            return Vec::new();
        }

        let mut diagnostics = Vec::new();
        for (_, node) in comp.ops.iter() {
            if node.quoted {
                continue;
            }
            let Some(shape) = emptiness_shape(comp, seq_count, node) else {
                continue;
            };

            let receiver_span = comp.op(shape.source).span;
            let receiver_text = receiver_span.text(ctx.source);
            let has_is_empty = comp
                .types
                .size_properties(comp.op(shape.source).ty)
                .iter()
                .any(|(p, _)| *p == SizeProp::IsEmpty);

            let (replacement, fixed) = if has_is_empty {
                (
                    "is-empty",
                    size_check_text(receiver_text, SizeProp::IsEmpty, shape.empty),
                )
            } else if shape.empty {
                ("any", format!("!{receiver_text}.Any()"))
            } else {
                ("any", format!("{receiver_text}.Any()"))
            };

            let mut builder = DiagnosticBuilder::new(
                ctx,
                self.id(),
                Severity::Warning,
                node.span,
                format!(
                    "`Count()` walks the entire sequence to test emptiness; prefer `{fixed}`"
                ),
            )
            .suggestion(format!("Replace the comparison with `{fixed}`"))
            .secondary(receiver_span)
            .property(PROP_REPLACEMENT, replacement);
            if shape.empty {
                builder = builder.flag(PROP_NEGATE);
            }
            diagnostics.push(builder.finish());
        }
        diagnostics
    }
}

impl Rule for CountOverPropertyRule {
    fn id(&self) -> &'static str {
        "count-over-property"
    }

    fn name(&self) -> &'static str {
        "Count Over Property"
    }

    fn description(&self) -> &'static str {
        "Detects Count() calls on receivers that expose a Length or Count property"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let Some(seq_count) = comp.well_known().get(WellKnown::SeqCount) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        for (id, node) in comp.ops.iter() {
            if node.quoted {
                continue;
            }
            let OpKind::Invocation { method, .. } = &node.kind else {
                continue;
            };
            if *method != seq_count {
                continue;
            }

            // Emptiness comparisons belong to count-call-comparison.
            let mut ancestor = comp.parent_op(id);
            while let Some((aid, anode)) = ancestor {
                if !matches!(anode.kind, OpKind::Conversion { .. }) {
                    break;
                }
                ancestor = comp.parent_op(aid);
            }
            if let Some((_, anode)) = ancestor {
                if let Some(shape) = emptiness_shape(comp, seq_count, anode) {
                    if shape.count_call == id {
                        continue;
                    }
                }
            }

            let Some(source) = sequence_source(node) else {
                continue;
            };
            let value = comp.strip_conversions(source);
            let props = comp.types.size_properties(comp.op(value).ty);
            let property = if props.iter().any(|(p, _)| *p == SizeProp::Length) {
                SizeProp::Length
            } else if props.iter().any(|(p, _)| *p == SizeProp::Count) {
                SizeProp::Count
            } else {
                continue;
            };

            let receiver_span = comp.op(value).span;
            let name = property.property_name();
            diagnostics.push(
                DiagnosticBuilder::new(
                    ctx,
                    self.id(),
                    Severity::Warning,
                    node.span,
                    format!("`Count()` walks the entire sequence; the receiver has a `{name}` property"),
                )
                .suggestion(format!(
                    "Replace with `{}.{name}`",
                    receiver_span.text(ctx.source)
                ))
                .secondary(receiver_span)
                .property(
                    PROP_PROPERTY,
                    match property {
                        SizeProp::Length => "length",
                        _ => "count",
                    },
                )
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

    fn run_rule(rule: &dyn Rule, source: &str) -> Vec<Diagnostic> {
        let compilation = compile(source, Profile::Modern).expect("Failed to compile");
        let config = Config::default();
        let ctx = AnalysisContext::new(Path::new("test.opal"), source, &compilation, &config);
        rule.check(&ctx)
    }

    fn check_any(source: &str) -> Vec<Diagnostic> {
        run_rule(&AnyForEmptinessRule, source)
    }

    fn check_count_comparison(source: &str) -> Vec<Diagnostic> {
        run_rule(&CountCallComparisonRule, source)
    }

    fn check_count_property(source: &str) -> Vec<Diagnostic> {
        run_rule(&CountOverPropertyRule, source)
    }

    #[test]
    fn test_any_on_vector_prefers_is_empty() {
        let source = r#"
            use collections;
            bool HasWork(Vector<int> queue) {
                return queue.Any();
            }
        "#;
        let diagnostics = check_any(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_REPLACEMENT), Some("is-empty"));
        assert!(!diagnostics[0].has_flag(PROP_NEGATE));
        assert_eq!(diagnostics[0].secondary_spans.len(), 1);
        assert_eq!(diagnostics[0].secondary_spans[0].text(source), "queue");
    }

    #[test]
    fn test_negated_any_reports_whole_negation() {
        let source = r#"
            use collections;
            bool IsIdle(Vector<int> queue) {
                return !queue.Any();
            }
        "#;
        let diagnostics = check_any(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_flag(PROP_NEGATE));
        assert_eq!(diagnostics[0].span.text(source), "!queue.Any()");
        assert!(diagnostics[0].message.contains("queue.IsEmpty"));
    }

    #[test]
    fn test_any_on_list_falls_back_to_count() {
        let source = r#"
            use collections;
            bool HasItems(List<string> items) {
                return items.Any();
            }
        "#;
        let diagnostics = check_any(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_REPLACEMENT), Some("count"));
        assert!(diagnostics[0].message.contains("items.Count > 0"));
    }

    #[test]
    fn test_any_on_plain_seq_has_no_cheaper_member() {
        let source = r#"
            use collections;
            bool HasItems(Seq<int> items) {
                return items.Any();
            }
        "#;
        assert_eq!(check_any(source).len(), 0);
    }

    #[test]
    fn test_any_static_style_matches_too() {
        let source = r#"
            use collections;
            bool HasItems(List<int> items) {
                return Seq.Any(items);
            }
        "#;
        let diagnostics = check_any(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.text(source), "Seq.Any(items)");
        assert_eq!(diagnostics[0].secondary_spans[0].text(source), "items");
    }

    #[test]
    fn test_any_inside_deferred_lambda_is_ignored() {
        let source = r#"
            use collections;
            void Prune(Query<List<int>> groups) {
                groups.Where(g => g.Any());
            }
        "#;
        assert_eq!(check_any(source).len(), 0);
    }

    #[test]
    fn test_count_eq_zero_on_list_uses_any() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() == 0;
            }
        "#;
        let diagnostics = check_count_comparison(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_REPLACEMENT), Some("any"));
        assert!(diagnostics[0].has_flag(PROP_NEGATE));
        assert!(diagnostics[0].message.contains("!xs.Any()"));
        assert_eq!(diagnostics[0].span.text(source), "xs.Count() == 0");
    }

    #[test]
    fn test_count_eq_zero_on_vector_prefers_is_empty() {
        let source = r#"
            use collections;
            bool IsEmpty(Vector<int> xs) {
                return xs.Count() == 0;
            }
        "#;
        let diagnostics = check_count_comparison(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_REPLACEMENT), Some("is-empty"));
        assert!(diagnostics[0].has_flag(PROP_NEGATE));
    }

    #[test]
    fn test_count_ne_zero_on_vector_negates_is_empty() {
        let source = r#"
            use collections;
            bool HasItems(Vector<int> xs) {
                return xs.Count() != 0;
            }
        "#;
        let diagnostics = check_count_comparison(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].has_flag(PROP_NEGATE));
        assert!(diagnostics[0].message.contains("!xs.IsEmpty"));
    }

    #[test]
    fn test_reflected_comparison_matches() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return 0 == xs.Count();
            }
        "#;
        let diagnostics = check_count_comparison(source);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_flag(PROP_NEGATE));
    }

    #[test]
    fn test_relational_emptiness_shapes() {
        for (expr, empty) in [
            ("xs.Count() <= 0", true),
            ("xs.Count() < 1", true),
            ("xs.Count() > 0", false),
            ("xs.Count() >= 1", false),
            ("0 < xs.Count()", false),
            ("1 > xs.Count()", true),
        ] {
            let source = format!(
                "use collections;\nbool F(List<int> xs) {{ return {expr}; }}"
            );
            let diagnostics = check_count_comparison(&source);
            assert_eq!(diagnostics.len(), 1, "no match for {expr}");
            assert_eq!(diagnostics[0].has_flag(PROP_NEGATE), empty, "wrong sense for {expr}");
        }
    }

    #[test]
    fn test_count_eq_one_is_not_an_emptiness_check() {
        let source = r#"
            use collections;
            bool IsSingleton(List<int> xs) {
                return xs.Count() == 1;
            }
        "#;
        assert_eq!(check_count_comparison(source).len(), 0);
    }

    #[test]
    fn test_long_constant_matches_through_conversion() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() == 0L;
            }
        "#;
        let diagnostics = check_count_comparison(source);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_count_property_on_vector_prefers_length() {
        let source = r#"
            use collections;
            int Size(Vector<int> xs) {
                return xs.Count();
            }
        "#;
        let diagnostics = check_count_property(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_PROPERTY), Some("length"));
        assert_eq!(diagnostics[0].span.text(source), "xs.Count()");
    }

    #[test]
    fn test_count_property_on_list() {
        let source = r#"
            use collections;
            int Size(List<int> xs) {
                return xs.Count();
            }
        "#;
        let diagnostics = check_count_property(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].property(PROP_PROPERTY), Some("count"));
    }

    #[test]
    fn test_count_property_stands_aside_in_emptiness_comparison() {
        let source = r#"
            use collections;
            bool IsEmpty(List<int> xs) {
                return xs.Count() == 0;
            }
        "#;
        assert_eq!(check_count_property(source).len(), 0);
    }

    #[test]
    fn test_count_property_still_fires_in_other_comparisons() {
        let source = r#"
            use collections;
            bool IsBig(List<int> xs) {
                return xs.Count() > 10;
            }
        "#;
        let diagnostics = check_count_property(source);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_count_on_plain_seq_not_reported() {
        let source = r#"
            use collections;
            int Size(Seq<int> xs) {
                return xs.Count();
            }
        "#;
        assert_eq!(check_count_property(source).len(), 0);
    }
}
