use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sem::Profile;
use crate::Severity;

/// Maximum config file size (1 MB) - prevents memory exhaustion from malformed files
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: HashMap<String, RuleSeverity>,

    #[serde(default)]
    pub language: LanguageConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Deny,
    Warn,
    Info,
    Allow,
}

impl From<RuleSeverity> for Option<Severity> {
    fn from(rs: RuleSeverity) -> Option<Severity> {
        match rs {
            RuleSeverity::Deny => Some(Severity::Error),
            RuleSeverity::Warn => Some(Severity::Warning),
            RuleSeverity::Info => Some(Severity::Info),
            RuleSeverity::Allow => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "console".to_string()
}

fn default_color() -> String {
    "auto".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: default_color(),
        }
    }
}

impl Config {
    /// Load config from opal-perf.toml in the given path, or return default.
    ///
    /// When `path` is a file, the config is looked up in its parent
    /// directory. A missing config file is fine; a config file that exists
    /// but cannot be parsed is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }

        let dir_path = if path.is_file() {
            path.parent().unwrap_or(path)
        } else {
            path
        };

        let config_path = dir_path.join("opal-perf.toml");
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from an explicit file path.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(config_path).map_err(|e| Error::io(config_path, e))?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(Error::config(format!(
                "Config file too large ({} bytes, max {} bytes): {}",
                metadata.len(),
                MAX_CONFIG_SIZE,
                config_path.display()
            )));
        }

        let content =
            std::fs::read_to_string(config_path).map_err(|e| Error::io(config_path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", config_path.display())))?;

        Self::validate_rule_ids(&config);

        Ok(config)
    }

    /// Validate that configured rule IDs exist, warning about unknown ones.
    fn validate_rule_ids(config: &Config) {
        use crate::rules::registry;

        for rule_id in config.rules.keys() {
            if !registry::has_rule(rule_id) {
                eprintln!(
                    "Warning: Unknown rule '{}' in opal-perf.toml (will be ignored)",
                    rule_id
                );
            }
        }
    }

    /// Get the effective severity for a rule
    pub fn rule_severity(&self, rule_id: &str, default: Severity) -> Option<Severity> {
        match self.rules.get(rule_id) {
            Some(level) => (*level).into(),
            None => Some(default),
        }
    }

    /// The language profile analysis runs under.
    pub fn profile(&self) -> Profile {
        self.language.profile
    }

    /// Generate default TOML config
    pub fn default_toml() -> &'static str {
        r#"# opal-perf configuration

[rules]
# Set rule severity: "deny" (error), "warn" (warning), "info", "allow" (off)
# redundant-contains-guard = "deny"
# count-call-comparison = "warn"
# single-char-string = "allow"

[language]
profile = "modern"  # "modern" or "legacy"

[output]
format = "console"  # "console", "json", "sarif"
color = "auto"      # "auto", "always", "never"
"#
    }
}
