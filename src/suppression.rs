//! Inline suppression comments.
//!
//! Two forms are recognized:
//! - `// opal-perf-ignore` or `// opal-perf-ignore: rule-a, rule-b`
//!   suppresses diagnostics on the next line
//! - `// opal-perf-ignore-file` suppresses the whole file

use std::collections::{HashMap, HashSet};

const LINE_MARKER: &str = "opal-perf-ignore";
const FILE_MARKER: &str = "opal-perf-ignore-file";

/// Suppressions scanned from one source file.
pub struct Suppressions {
    /// Rule ids suppressed per line; `"all"` stands for every rule.
    line_rules: HashMap<usize, HashSet<String>>,
    whole_file: bool,
}

impl Suppressions {
    /// Scan a file's text. The scanner only looks inside `//` comments, so
    /// a marker spelled in a string literal has no effect.
    pub fn scan(source: &str) -> Self {
        let mut suppressions = Suppressions {
            line_rules: HashMap::new(),
            whole_file: false,
        };

        for (idx, line) in source.lines().enumerate() {
            let line_num = idx + 1;
            let Some(comment_start) = line.find("//") else {
                continue;
            };
            let comment = &line[comment_start..];
            if comment.contains(FILE_MARKER) {
                suppressions.whole_file = true;
                continue;
            }
            let Some(pos) = comment.find(LINE_MARKER) else {
                continue;
            };

            // Only a bare marker or a `: rule, rule` list counts; any other
            // trailing text is an ordinary comment.
            let rest = comment[pos + LINE_MARKER.len()..].trim();
            let mut rules = Vec::new();
            if rest.is_empty() {
                rules.push("all".to_string());
            } else if let Some(list) = rest.strip_prefix(':') {
                rules.extend(
                    list.split(',')
                        .map(str::trim)
                        .filter(|rule| !rule.is_empty())
                        .map(String::from),
                );
            }
            if !rules.is_empty() {
                suppressions
                    .line_rules
                    .entry(line_num + 1)
                    .or_default()
                    .extend(rules);
            }
        }

        suppressions
    }

    /// Whether a diagnostic for `rule_id` at `line` should be dropped.
    pub fn is_suppressed(&self, rule_id: &str, line: usize) -> bool {
        if self.whole_file {
            return true;
        }
        self.line_rules
            .get(&line)
            .is_some_and(|rules| rules.contains("all") || rules.contains(rule_id))
    }
}
