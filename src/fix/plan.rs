//! Typed view of the detection/fix property protocol.
//!
//! Diagnostics carry an untyped string map across the detection/fix
//! boundary. This module is the read edge: it parses the map into a
//! [`RewritePlan`] and rejects combinations no matcher produces. Selection
//! is a pure function of the rule id and the map; no semantic reasoning
//! happens here.

use thiserror::Error;

use crate::rules::{Diagnostic, PROP_NEGATE, PROP_PROPERTY, PROP_REPLACEMENT, PROP_VARIANT};

/// Why a diagnostic yields no plan.
///
/// [`PlanError::NoVariant`] is the certified no-fix case; everything else is
/// a defect in the matcher/selector contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("diagnostic carries no rewrite variant")]
    NoVariant,

    #[error("unknown rule id `{0}`")]
    UnknownRule(String),

    #[error("missing property `{0}`")]
    MissingProperty(&'static str),

    #[error("unknown value `{value}` for property `{key}`")]
    UnknownValue { key: &'static str, value: String },
}

impl PlanError {
    /// Defects assert in development; a missing variant stays quiet.
    pub fn is_defect(&self) -> bool {
        !matches!(self, PlanError::NoVariant)
    }
}

/// Emptiness replacement recorded by the Any()/Count() rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeReplacement {
    IsEmpty,
    Length,
    Count,
    Any,
}

/// Rewrite shape for `index-of-zero-comparison`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixVariant {
    /// `s.StartsWith(...)` with the arguments carried across.
    StartsWith,
    /// `s.AsSpan().StartsWith("c")`, plus an import request when needed.
    AsSpan,
    /// `s.Length > 0 && s[0] == c` and the negated dual.
    Expand,
}

/// Resolved rewrite strategy for one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewritePlan {
    /// Replace the whole conditional with its guarded statement.
    CollapseGuard,
    /// Replace the matched expression with an emptiness check; `empty` is
    /// the sense of the original expression.
    SizeCheck {
        replacement: SizeReplacement,
        empty: bool,
    },
    /// Replace a `Count()` call with a property access.
    SizeProperty { length: bool },
    /// Replace `Fill(default)` with `Clear()`.
    ClearFill,
    /// Replace an `IndexOf` comparison with a prefix check.
    Prefix {
        variant: PrefixVariant,
        negated: bool,
    },
    /// Replace a one-character string literal with a char literal.
    CharLiteral,
}

/// Decode a diagnostic's property map into a plan.
pub fn plan_for(diagnostic: &Diagnostic) -> Result<RewritePlan, PlanError> {
    match diagnostic.rule_id {
        "redundant-contains-guard" => Ok(RewritePlan::CollapseGuard),
        "any-for-emptiness" | "count-call-comparison" => {
            let value = diagnostic
                .property(PROP_REPLACEMENT)
                .ok_or(PlanError::MissingProperty(PROP_REPLACEMENT))?;
            let replacement = match value {
                "is-empty" => SizeReplacement::IsEmpty,
                "length" => SizeReplacement::Length,
                "count" => SizeReplacement::Count,
                "any" => SizeReplacement::Any,
                other => {
                    return Err(PlanError::UnknownValue {
                        key: PROP_REPLACEMENT,
                        value: other.to_string(),
                    })
                }
            };
            Ok(RewritePlan::SizeCheck {
                replacement,
                empty: diagnostic.has_flag(PROP_NEGATE),
            })
        }
        "count-over-property" => {
            let value = diagnostic
                .property(PROP_PROPERTY)
                .ok_or(PlanError::MissingProperty(PROP_PROPERTY))?;
            let length = match value {
                "length" => true,
                "count" => false,
                other => {
                    return Err(PlanError::UnknownValue {
                        key: PROP_PROPERTY,
                        value: other.to_string(),
                    })
                }
            };
            Ok(RewritePlan::SizeProperty { length })
        }
        "fill-with-default" => Ok(RewritePlan::ClearFill),
        "index-of-zero-comparison" => {
            let value = diagnostic.property(PROP_VARIANT).ok_or(PlanError::NoVariant)?;
            let variant = match value {
                "starts-with" => PrefixVariant::StartsWith,
                "as-span" => PrefixVariant::AsSpan,
                "expand" => PrefixVariant::Expand,
                other => {
                    return Err(PlanError::UnknownValue {
                        key: PROP_VARIANT,
                        value: other.to_string(),
                    })
                }
            };
            Ok(RewritePlan::Prefix {
                variant,
                negated: diagnostic.has_flag(PROP_NEGATE),
            })
        }
        "single-char-string" => Ok(RewritePlan::CharLiteral),
        other => Err(PlanError::UnknownRule(other.to_string())),
    }
}
