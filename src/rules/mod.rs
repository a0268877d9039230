pub mod emptiness_rules;
pub mod guard_rules;
pub mod registry;
pub mod span_rules;
pub mod string_rules;

use crate::engine::AnalysisContext;
use crate::sem::{Compilation, ConstValue, OpId, OpKind, OpNode};
use crate::syntax::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Property-map keys shared between matchers and the fix selector. For the
/// flag-like keys, presence is the fact; the value is empty.
pub const PROP_VARIANT: &str = "variant";
pub const PROP_NEGATE: &str = "negate";
pub const PROP_REPLACEMENT: &str = "replacement";
pub const PROP_PROPERTY: &str = "property";

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "deny" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl clap::ValueEnum for Severity {
    fn value_variants<'a>() -> &'a [Self] {
        &[Severity::Info, Severity::Warning, Severity::Error]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Severity::Info => Some(clap::builder::PossibleValue::new("info")),
            Severity::Warning => Some(clap::builder::PossibleValue::new("warning")),
            Severity::Error => Some(clap::builder::PossibleValue::new("error")),
        }
    }
}

/// A diagnostic reported by a rule.
///
/// This is the only channel from detection to fix time: the primary span,
/// the secondary spans (in an order fixed per rule), and the string property
/// map must carry everything the fixer needs. Fixes are computed later by
/// re-resolving these spans against a fresh parse, never by retaining
/// operation nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub message: String,
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub suggestion: Option<String>,
    /// Primary byte range the rule flagged.
    pub span: Span,
    /// Sub-expression ranges the fixer re-locates positionally, by index.
    pub secondary_spans: Vec<Span>,
    /// Rewrite facts; for boolean facts the key's presence is the value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Diagnostic {
    pub fn has_flag(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// An auto-fix for a diagnostic
#[derive(Debug, Clone, Serialize)]
pub struct Fix {
    pub description: String,
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Replacement {
    pub file_path: PathBuf,
    pub start_byte: usize,
    pub end_byte: usize,
    pub new_text: String,
}

/// Assembles a [`Diagnostic`] from a match, filling in line/column from the
/// primary span.
pub struct DiagnosticBuilder {
    diag: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(
        ctx: &AnalysisContext,
        rule_id: &'static str,
        severity: Severity,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        let (line, column) = ctx.line_col(span.start);
        let (end_line, end_column) = ctx.line_col(span.end);
        DiagnosticBuilder {
            diag: Diagnostic {
                rule_id,
                severity,
                message: message.into(),
                file_path: ctx.file_path.to_path_buf(),
                line,
                column,
                end_line: Some(end_line),
                end_column: Some(end_column),
                suggestion: None,
                span,
                secondary_spans: Vec::new(),
                properties: BTreeMap::new(),
            },
        }
    }

    pub fn suggestion(mut self, text: impl Into<String>) -> Self {
        self.diag.suggestion = Some(text.into());
        self
    }

    /// Append a secondary span; order of calls is the order the fixer sees.
    pub fn secondary(mut self, span: Span) -> Self {
        self.diag.secondary_spans.push(span);
        self
    }

    pub fn property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.diag.properties.insert(key.to_string(), value.into());
        self
    }

    /// Record a presence-only boolean fact.
    pub fn flag(mut self, key: &str) -> Self {
        self.diag.properties.insert(key.to_string(), String::new());
        self
    }

    pub fn finish(self) -> Diagnostic {
        self.diag
    }
}

/// The Rule trait - implement this to add new checks
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule (e.g., "any-for-emptiness")
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Description of what this rule checks
    fn description(&self) -> &'static str;

    /// Default severity level
    fn default_severity(&self) -> Severity;

    /// Run the check and return diagnostics
    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic>;
}

/// The collection a sequence extension call enumerates, whichever of the two
/// invocation styles was written. Callers have already checked the method.
pub(crate) fn sequence_source(node: &OpNode) -> Option<OpId> {
    let OpKind::Invocation {
        receiver,
        args,
        reduced,
        ..
    } = &node.kind
    else {
        return None;
    };
    if *reduced {
        *receiver
    } else {
        args.first().copied()
    }
}

/// Same local, same parameter, or identical constants, after unwrapping
/// implicit conversions on both sides.
pub(crate) fn same_value(comp: &Compilation, a: OpId, b: OpId) -> bool {
    let a = comp.strip_conversions(a);
    let b = comp.strip_conversions(b);
    match (&comp.op(a).kind, &comp.op(b).kind) {
        (OpKind::LocalRef { local: x }, OpKind::LocalRef { local: y }) => x == y,
        (OpKind::ParamRef { param: x }, OpKind::ParamRef { param: y }) => x == y,
        (OpKind::Literal { value: x }, OpKind::Literal { value: y }) => x == y,
        _ => false,
    }
}

/// Whether the operation is a plain local/parameter reference once
/// conversions are unwrapped. Gate for rewrites that duplicate receiver text.
pub(crate) fn is_symbol_ref(comp: &Compilation, id: OpId) -> bool {
    matches!(
        comp.op(comp.strip_conversions(id)).kind,
        OpKind::LocalRef { .. } | OpKind::ParamRef { .. }
    )
}

/// Integral constant value after unwrapping conversions.
pub(crate) fn integer_constant(comp: &Compilation, id: OpId) -> Option<i64> {
    match &comp.op(comp.strip_conversions(id)).kind {
        OpKind::Literal { value } => value.as_integer(),
        _ => None,
    }
}

/// Constant value after unwrapping conversions, if the operand folded.
pub(crate) fn constant_value<'c>(comp: &'c Compilation, id: OpId) -> Option<&'c ConstValue> {
    match &comp.op(comp.strip_conversions(id)).kind {
        OpKind::Literal { value } => Some(value),
        _ => None,
    }
}
