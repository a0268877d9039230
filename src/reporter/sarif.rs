use crate::rules::{registry, Diagnostic, Severity};
use anyhow::Result;
use serde::Serialize;

/// SARIF (Static Analysis Results Interchange Format) output for CI integration
pub fn report(diagnostics: &[Diagnostic]) -> Result<()> {
    let sarif = SarifReport::from_diagnostics(diagnostics);
    let json = serde_json::to_string_pretty(&sarif)?;
    println!("{}", json);
    Ok(())
}

/// Format diagnostics as a SARIF string without printing.
pub fn format(diagnostics: &[Diagnostic]) -> Result<String> {
    let sarif = SarifReport::from_diagnostics(diagnostics);
    Ok(serde_json::to_string_pretty(&sarif)?)
}

#[derive(Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
}

impl SarifReport {
    fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        // One rule entry per distinct rule id, described from the registry
        // rather than from whichever diagnostic happened to come first.
        let mut rules: Vec<SarifRule> = Vec::new();
        let mut seen_rules = std::collections::HashSet::new();

        for d in diagnostics {
            if seen_rules.insert(d.rule_id) {
                let description = registry::get_rule(d.rule_id)
                    .map(|r| r.description().to_string())
                    .unwrap_or_else(|| d.message.clone());
                rules.push(SarifRule {
                    id: d.rule_id.to_string(),
                    name: d.rule_id.to_string(),
                    short_description: SarifMessage { text: description },
                });
            }
        }

        let results: Vec<SarifResult> = diagnostics
            .iter()
            .map(|d| SarifResult {
                rule_id: d.rule_id.to_string(),
                level: match d.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                },
                message: SarifMessage {
                    text: d.message.clone(),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation {
                            uri: d.file_path.to_string_lossy().to_string(),
                        },
                        region: SarifRegion {
                            start_line: d.line,
                            start_column: d.column,
                        },
                    },
                }],
            })
            .collect();

        SarifReport {
            schema: "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            version: "2.1.0",
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: "opal-perf",
                        version: env!("CARGO_PKG_VERSION"),
                        rules,
                    },
                },
                results,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn test_diagnostic(rule_id: &'static str, severity: Severity) -> Diagnostic {
        Diagnostic {
            rule_id,
            message: "Test message".to_string(),
            severity,
            file_path: PathBuf::from("src/cache.opal"),
            line: 4,
            column: 9,
            end_line: None,
            end_column: None,
            suggestion: None,
            span: Span::new(80, 100),
            secondary_spans: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_report_is_valid() {
        let result = format(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "opal-perf");
        assert_eq!(parsed["runs"][0]["results"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_severity_maps_to_sarif_levels() {
        let diagnostics = vec![
            test_diagnostic("a", Severity::Error),
            test_diagnostic("b", Severity::Warning),
            test_diagnostic("c", Severity::Info),
        ];
        let result = format(&diagnostics).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["level"], "warning");
        assert_eq!(results[2]["level"], "note");
    }

    #[test]
    fn test_rules_are_deduplicated() {
        let diagnostics = vec![
            test_diagnostic("redundant-contains-guard", Severity::Warning),
            test_diagnostic("redundant-contains-guard", Severity::Warning),
        ];
        let result = format(&diagnostics).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        let rules = parsed["runs"][0]["tool"]["driver"]["rules"]
            .as_array()
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["id"], "redundant-contains-guard");
    }

    #[test]
    fn test_locations_carry_line_and_column() {
        let result = format(&[test_diagnostic("a", Severity::Warning)]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        let region = &parsed["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 4);
        assert_eq!(region["startColumn"], 9);
    }
}
