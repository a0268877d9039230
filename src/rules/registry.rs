use super::emptiness_rules::{AnyForEmptinessRule, CountCallComparisonRule, CountOverPropertyRule};
use super::guard_rules::RedundantContainsGuardRule;
use super::span_rules::FillWithDefaultRule;
use super::string_rules::{IndexOfZeroComparisonRule, SingleCharStringRule};
use super::Rule;

/// Get all registered rules
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(RedundantContainsGuardRule),
        Box::new(AnyForEmptinessRule),
        Box::new(CountCallComparisonRule),
        Box::new(CountOverPropertyRule),
        Box::new(FillWithDefaultRule),
        Box::new(IndexOfZeroComparisonRule),
        Box::new(SingleCharStringRule),
    ]
}

/// Get a rule by its ID
pub fn get_rule(id: &str) -> Option<Box<dyn Rule>> {
    all_rules().into_iter().find(|r| r.id() == id)
}

/// Whether `id` names a registered rule.
pub fn has_rule(id: &str) -> bool {
    all_rules().iter().any(|r| r.id() == id)
}
