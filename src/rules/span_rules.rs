use super::{Diagnostic, DiagnosticBuilder, Rule, Severity};
use crate::engine::AnalysisContext;
use crate::sem::{Compilation, ConstValue, Ctor, OpId, OpKind, TypeId, TypeKind, WellKnown};

/// Detects `span.Fill(x)` where `x` is provably the element default, so the
/// call is `span.Clear()` spelled the long way
pub struct FillWithDefaultRule;

/// True only when the argument is certainly the default value of `elem`.
/// Anything the binder could not fold to a known shape stays unmatched.
fn is_default_value(comp: &Compilation, elem: TypeId, arg: OpId) -> bool {
    let converted = comp.op(arg).ty;
    let id = comp.strip_conversions(arg);
    let node = comp.op(id);
    match &node.kind {
        OpKind::DefaultValue => converted == elem,
        OpKind::Literal { value } => match value {
            ConstValue::Null => comp.types.is_reference_type(elem),
            ConstValue::Int(0) | ConstValue::Long(0) => true,
            ConstValue::Char('\0') => true,
            ConstValue::Bool(false) => true,
            // Positive zero only; -0.0 and NaN fill differently than Clear.
            ConstValue::Float(bits) => *bits == 0f32.to_bits(),
            ConstValue::Double(bits) => *bits == 0f64.to_bits(),
            _ => false,
        },
        OpKind::ObjectCreation { args } => {
            args.is_empty() && node.ty == elem && comp.types.is_value_type(elem)
        }
        _ => false,
    }
}

impl Rule for FillWithDefaultRule {
    fn id(&self) -> &'static str {
        "fill-with-default"
    }

    fn name(&self) -> &'static str {
        "Fill With Default"
    }

    fn description(&self) -> &'static str {
        "Detects Fill() calls whose argument is the element default value, where Clear() says the same thing"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let comp = ctx.compilation;
        let well_known = comp.well_known();
        let Some(span_fill) = well_known.get(WellKnown::SpanFill) else {
            return Vec::new();
        };
        if well_known.get(WellKnown::SpanClear).is_none() {
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
            if *method != span_fill || args.len() != 1 {
                continue;
            }
            let receiver = comp.strip_conversions(*receiver);
            let TypeKind::Generic(Ctor::Span, type_args) = comp.types.kind(comp.op(receiver).ty)
            else {
                continue;
            };
            if !is_default_value(comp, type_args[0], args[0]) {
                continue;
            }

            let receiver_span = comp.op(receiver).span;
            let receiver_text = receiver_span.text(ctx.source);
            diagnostics.push(
                DiagnosticBuilder::new(
                    ctx,
                    self.id(),
                    Severity::Info,
                    node.span,
                    "`Fill()` with the element default value; `Clear()` states the intent directly"
                        .to_string(),
                )
                .suggestion(format!("Replace with `{receiver_text}.Clear()`"))
                .secondary(receiver_span)
                .finish(),
            );
        }
        diagnostics
    }
}
