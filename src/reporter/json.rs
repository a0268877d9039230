use crate::rules::Diagnostic;
use anyhow::Result;

pub fn report(diagnostics: &[Diagnostic]) -> Result<()> {
    let json = serde_json::to_string_pretty(diagnostics)?;
    println!("{}", json);
    Ok(())
}

/// Format diagnostics as JSON string without printing.
pub fn format(diagnostics: &[Diagnostic]) -> Result<String> {
    Ok(serde_json::to_string_pretty(diagnostics)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Severity, PROP_NEGATE, PROP_REPLACEMENT};
    use crate::syntax::Span;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn test_diagnostic() -> Diagnostic {
        Diagnostic {
            rule_id: "test-rule",
            message: "Test message".to_string(),
            severity: Severity::Warning,
            file_path: PathBuf::from("test.opal"),
            line: 10,
            column: 5,
            end_line: None,
            end_column: None,
            suggestion: Some("Test suggestion".to_string()),
            span: Span::new(42, 60),
            secondary_spans: vec![Span::new(42, 47)],
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_format_empty_diagnostics() {
        let result = format(&[]).unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    fn test_format_single_diagnostic() {
        let diag = test_diagnostic();
        let result = format(&[diag]).unwrap();

        assert!(result.contains(r#""rule_id": "test-rule""#));
        assert!(result.contains(r#""message": "Test message""#));
        assert!(result.contains(r#""severity": "warning""#));
        assert!(result.contains(r#""line": 10"#));
        assert!(result.contains(r#""column": 5"#));
        assert!(result.contains(r#""suggestion": "Test suggestion""#));
        assert!(result.contains(r#""start": 42"#));
    }

    #[test]
    fn test_empty_properties_are_omitted() {
        let diag = test_diagnostic();
        let result = format(&[diag]).unwrap();
        assert!(!result.contains(r#""properties""#));
    }

    #[test]
    fn test_properties_round_trip() {
        let mut diag = test_diagnostic();
        diag.properties
            .insert(PROP_REPLACEMENT.to_string(), "is-empty".to_string());
        diag.properties.insert(PROP_NEGATE.to_string(), String::new());

        let result = format(&[diag]).unwrap();
        assert!(result.contains(r#""replacement": "is-empty""#));
        assert!(result.contains(r#""negate": """#));
    }

    #[test]
    fn test_format_multiple_diagnostics() {
        let mut diag1 = test_diagnostic();
        diag1.rule_id = "rule-a";
        diag1.severity = Severity::Error;
        let mut diag2 = test_diagnostic();
        diag2.rule_id = "rule-b";
        diag2.severity = Severity::Info;

        let result = format(&[diag1, diag2]).unwrap();

        assert!(result.contains(r#""rule_id": "rule-a""#));
        assert!(result.contains(r#""rule_id": "rule-b""#));
        assert!(result.contains(r#""severity": "error""#));
        assert!(result.contains(r#""severity": "info""#));
    }

    #[test]
    fn test_format_is_valid_json() {
        let diag = test_diagnostic();
        let result = format(&[diag]).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }
}
