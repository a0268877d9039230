//! Analysis engine - coordinates file discovery and rule execution.

mod context;

pub use context::AnalysisContext;

use std::any::Any;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use rayon::prelude::*;

use crate::discovery::{discover_opal_files, DiscoveryOptions, MAX_FILE_SIZE};
use crate::error::{Error, Result};
use crate::rules::{registry, Diagnostic};
use crate::sem;
use crate::suppression::Suppressions;
use crate::Config;

pub struct Engine<'a> {
    config: &'a Config,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Analyze every Opal file under `path`.
    ///
    /// Files are analyzed in parallel; a file that fails to read or parse
    /// is reported to stderr and skipped. Diagnostics come back sorted by
    /// file, line, and column so output is stable across runs.
    pub fn analyze(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        let files = discover_opal_files(path, &DiscoveryOptions::secure());

        let errors: Mutex<Vec<(std::path::PathBuf, Error)>> = Mutex::new(Vec::new());

        let mut diagnostics: Vec<Diagnostic> = files
            .par_iter()
            .flat_map(|file_path| match analyze_file(file_path, self.config) {
                Ok(diagnostics) => diagnostics,
                Err(e) => {
                    if let Ok(mut errs) = errors.lock() {
                        errs.push((file_path.clone(), e));
                    }
                    Vec::new()
                }
            })
            .collect();

        if let Ok(errs) = errors.lock() {
            for (path, error) in errs.iter() {
                eprintln!("Warning: Failed to analyze {}: {}", path.display(), error);
            }
        }

        diagnostics.sort_by(|a, b| {
            (&a.file_path, a.line, a.column).cmp(&(&b.file_path, b.line, b.column))
        });
        Ok(diagnostics)
    }
}

/// Analyze a single file with every enabled rule.
pub fn analyze_file(file_path: &Path, config: &Config) -> Result<Vec<Diagnostic>> {
    let source = read_file_secure(file_path)?;
    let compilation = sem::compile(&source, config.profile())
        .map_err(|e| Error::parse(file_path, e.to_string()))?;

    let suppressions = Suppressions::scan(&source);
    let ctx = AnalysisContext::new(file_path, &source, &compilation, config);

    let mut diagnostics = Vec::new();
    for rule in registry::all_rules() {
        let Some(severity) = config.rule_severity(rule.id(), rule.default_severity()) else {
            continue;
        };

        // One misbehaving rule must not take down the whole run.
        let rule_diagnostics =
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rule.check(&ctx))) {
                Ok(diagnostics) => diagnostics,
                Err(payload) => {
                    eprintln!(
                        "Warning: Rule '{}' panicked while analyzing {}: {}",
                        rule.id(),
                        file_path.display(),
                        panic_message(&payload)
                    );
                    continue;
                }
            };

        for mut diagnostic in rule_diagnostics {
            if suppressions.is_suppressed(diagnostic.rule_id, diagnostic.line) {
                continue;
            }
            diagnostic.severity = severity;
            diagnostics.push(diagnostic);
        }
    }

    Ok(diagnostics)
}

/// Read a file through its descriptor so the metadata checks and the read
/// see the same inode.
pub fn read_file_secure(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path).map_err(|e| Error::io(file_path, e))?;

    let metadata = file.metadata().map_err(|e| Error::io(file_path, e))?;
    if !metadata.is_file() {
        return Err(Error::io(
            file_path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    if metadata.len() > MAX_FILE_SIZE {
        return Err(Error::io(
            file_path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "file too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    MAX_FILE_SIZE
                ),
            ),
        ));
    }

    let mut source = String::with_capacity(metadata.len() as usize);
    file.read_to_string(&mut source)
        .map_err(|e| Error::io(file_path, e))?;

    Ok(source)
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "(unknown panic payload)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSeverity;
    use crate::Severity;
    use tempfile::TempDir;

    const FIXABLE: &str = "use collections;\n\
                           void Evict(Dictionary<string, int> cache, string key) {\n\
                           \x20   if (cache.ContainsKey(key)) {\n\
                           \x20       cache.Remove(key);\n\
                           \x20   }\n\
                           }\n";

    #[test]
    fn test_analyze_reports_guarded_remove() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("cache.opal"), FIXABLE).unwrap();

        let config = Config::default();
        let engine = Engine::new(&config);
        let diagnostics = engine.analyze(temp_dir.path()).unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "redundant-contains-guard");
    }

    #[test]
    fn test_excluded_directories_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let obj_dir = temp_dir.path().join("obj");
        std::fs::create_dir(&obj_dir).unwrap();
        std::fs::write(obj_dir.join("cache.opal"), FIXABLE).unwrap();

        let config = Config::default();
        let engine = Engine::new(&config);
        let diagnostics = engine.analyze(temp_dir.path()).unwrap();

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unparseable_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.opal"), "void Broken( {").unwrap();
        std::fs::write(temp_dir.path().join("cache.opal"), FIXABLE).unwrap();

        let config = Config::default();
        let engine = Engine::new(&config);
        let diagnostics = engine.analyze(temp_dir.path()).unwrap();

        // The good file still gets analyzed.
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_suppressed_diagnostic_is_dropped() {
        let source = "use collections;\n\
                      void Evict(Dictionary<string, int> cache, string key) {\n\
                      \x20   // opal-perf-ignore: redundant-contains-guard\n\
                      \x20   if (cache.ContainsKey(key)) {\n\
                      \x20       cache.Remove(key);\n\
                      \x20   }\n\
                      }\n";
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache.opal");
        std::fs::write(&file, source).unwrap();

        let config = Config::default();
        let diagnostics = analyze_file(&file, &config).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_allowed_rule_is_not_run() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache.opal");
        std::fs::write(&file, FIXABLE).unwrap();

        let mut config = Config::default();
        config.rules.insert(
            "redundant-contains-guard".to_string(),
            RuleSeverity::Allow,
        );
        let diagnostics = analyze_file(&file, &config).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_configured_severity_overrides_default() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cache.opal");
        std::fs::write(&file, FIXABLE).unwrap();

        let mut config = Config::default();
        config
            .rules
            .insert("redundant-contains-guard".to_string(), RuleSeverity::Deny);
        let diagnostics = analyze_file(&file, &config).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_diagnostics_are_sorted_across_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.opal"), FIXABLE).unwrap();
        std::fs::write(temp_dir.path().join("a.opal"), FIXABLE).unwrap();

        let config = Config::default();
        let engine = Engine::new(&config);
        let diagnostics = engine.analyze(temp_dir.path()).unwrap();

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].file_path < diagnostics[1].file_path);
    }

    #[cfg(unix)]
    #[test]
    fn test_does_not_follow_symlinks() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let symlink_path = temp_dir.path().join("evil.opal");
        let _ = symlink("/etc/passwd", &symlink_path);
        std::fs::write(temp_dir.path().join("real.opal"), "void Main() {}").unwrap();

        let config = Config::default();
        let engine = Engine::new(&config);
        let result = engine.analyze(temp_dir.path());

        assert!(result.is_ok());
    }
}
