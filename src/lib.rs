//! opal-perf: performance analysis for Opal
//!
//! Compiles Opal sources, runs a set of performance rules over the
//! operation tree, and reports diagnostics that can later be turned
//! into source rewrites by the fix module.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fix;
pub mod reporter;
pub mod rules;
pub mod sem;
pub mod suppression;
pub mod syntax;

pub use config::Config;
pub use engine::{AnalysisContext, Engine};
pub use rules::{Diagnostic, Rule, Severity};

/// Analyze a file or directory with the given configuration.
pub fn analyze(path: &std::path::Path, config: &Config) -> error::Result<Vec<Diagnostic>> {
    let engine = Engine::new(config);
    engine.analyze(path)
}
