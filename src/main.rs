//! opal-perf CLI: analyze Opal sources for performance issues and apply fixes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use opal_perf::fix::apply_fixes;
use opal_perf::reporter;
use opal_perf::rules::registry;
use opal_perf::{analyze, Config, Diagnostic, Rule, Severity};

#[derive(Parser)]
#[command(name = "opal-perf")]
#[command(author, version, about = "Performance linter for Opal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to analyze (file or directory)
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Configuration file (default: opal-perf.toml next to the analyzed path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Color output
    #[arg(long, global = true)]
    color: Option<ColorChoice>,

    /// Minimum severity to report
    #[arg(long, global = true, default_value = "info")]
    min_severity: Severity,

    /// Exit non-zero if any diagnostic at or above this severity is found
    #[arg(long, global = true, default_value = "error")]
    fail_on: Severity,

    /// Print timing information
    #[arg(long, global = true)]
    timing: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze Opal files for performance issues
    Check {
        /// Path to analyze
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Apply automatic fixes
    Fix {
        /// Path to fix
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show what would change without writing files
        #[arg(long)]
        dry_run: bool,

        /// Only fix these rules (comma-separated)
        #[arg(long)]
        rules: Option<String>,
    },

    /// Create a default opal-perf.toml
    Init,

    /// List all available rules
    Rules,

    /// Explain a rule in detail
    Explain {
        /// Rule ID (e.g. index-of-zero-comparison)
        rule_id: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Console,
    Json,
    Sarif,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref(), &cli.path)?;
            apply_color(cli.color, &config);
            run_check(&cli.path, &config, resolve_format(cli.format, &config), &cli)
        }
        Some(Commands::Check { ref path }) => {
            let config = load_config(cli.config.as_deref(), path)?;
            apply_color(cli.color, &config);
            run_check(path, &config, resolve_format(cli.format, &config), &cli)
        }
        Some(Commands::Fix {
            ref path,
            dry_run,
            ref rules,
        }) => {
            let config = load_config(cli.config.as_deref(), path)?;
            apply_color(cli.color, &config);
            run_fix(path, &config, dry_run, rules.as_deref())
        }
        Some(Commands::Init) => run_init(&cli.path),
        Some(Commands::Rules) => run_list_rules(),
        Some(Commands::Explain { ref rule_id }) => run_explain(rule_id),
    }
}

fn load_config(explicit: Option<&Path>, path: &Path) -> Result<Config> {
    let config = match explicit {
        Some(file) => Config::load_file(file)?,
        None => Config::load_or_default(path)?,
    };
    Ok(config)
}

/// CLI flag wins; otherwise fall back to the `[output]` section of the config.
fn resolve_format(flag: Option<OutputFormat>, config: &Config) -> OutputFormat {
    match flag {
        Some(format) => format,
        None => match config.output.format.as_str() {
            "json" => OutputFormat::Json,
            "sarif" => OutputFormat::Sarif,
            _ => OutputFormat::Console,
        },
    }
}

fn apply_color(flag: Option<ColorChoice>, config: &Config) {
    let choice = flag.unwrap_or(match config.output.color.as_str() {
        "always" => ColorChoice::Always,
        "never" => ColorChoice::Never,
        _ => ColorChoice::Auto,
    });
    match choice {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
}

fn run_check(path: &Path, config: &Config, format: OutputFormat, cli: &Cli) -> Result<()> {
    let start = Instant::now();
    let mut diagnostics = analyze(path, config)?;
    let analysis_time = start.elapsed();

    diagnostics.retain(|d| d.severity >= cli.min_severity);

    match format {
        OutputFormat::Console => reporter::console::report(&diagnostics),
        OutputFormat::Json => reporter::json::report(&diagnostics)?,
        OutputFormat::Sarif => reporter::sarif::report(&diagnostics)?,
    }

    if cli.timing {
        eprintln!();
        eprintln!("{}", "Timing:".bold());
        eprintln!("  analysis: {analysis_time:.2?}");
        eprintln!("  diagnostics: {}", diagnostics.len());
    }

    let failing = count_at_or_above(&diagnostics, cli.fail_on);
    if failing > 0 {
        anyhow::bail!(
            "{failing} diagnostic(s) at or above {} severity",
            cli.fail_on
        );
    }

    Ok(())
}

fn count_at_or_above(diagnostics: &[Diagnostic], threshold: Severity) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity >= threshold)
        .count()
}

fn run_fix(path: &Path, config: &Config, dry_run: bool, rules: Option<&str>) -> Result<()> {
    let mut diagnostics = analyze(path, config)?;

    if let Some(filter) = rules {
        let wanted: Vec<&str> = filter.split(',').map(str::trim).collect();
        diagnostics.retain(|d| wanted.contains(&d.rule_id));
    }

    if diagnostics.is_empty() {
        println!("{}", "No issues found.".green());
        return Ok(());
    }

    let header = if dry_run {
        "Fix candidates (dry run):"
    } else {
        "Fix candidates:"
    };
    println!("{}", header.bold());
    for d in &diagnostics {
        let detail = d.suggestion.as_deref().unwrap_or(&d.message);
        println!(
            "  {} {}:{} - {}",
            d.rule_id.cyan(),
            d.file_path.display(),
            d.line,
            detail
        );
    }
    println!();

    let base_dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let summary = apply_fixes(&diagnostics, &base_dir, config.profile(), dry_run)?;

    if dry_run {
        println!(
            "{}",
            format!("Would apply {} fix(es).", summary.applied).yellow()
        );
    } else {
        println!("{}", format!("Applied {} fix(es).", summary.applied).green());
    }
    if summary.declined > 0 {
        println!(
            "{} diagnostic(s) could not be fixed automatically.",
            summary.declined
        );
    }
    if summary.overlapped > 0 {
        println!(
            "{} fix(es) overlapped with another and were skipped; run `opal-perf fix` again to apply them.",
            summary.overlapped
        );
    }
    if !dry_run && summary.applied > 0 {
        println!("Run `opal-perf check` to verify remaining issues.");
    }

    Ok(())
}

fn run_init(path: &Path) -> Result<()> {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or_else(|| Path::new("."))
    };
    let config_path = dir.join("opal-perf.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }
    std::fs::write(&config_path, Config::default_toml())?;
    println!("Created {}", config_path.display().to_string().green());
    Ok(())
}

fn run_list_rules() -> Result<()> {
    println!("{}", "Available rules:".bold());
    println!();
    for rule in registry::all_rules() {
        println!(
            "  {:<30} [{:?}] {}",
            rule.id().cyan(),
            rule.default_severity(),
            rule.description()
        );
    }
    println!();
    println!("Run `opal-perf explain <rule-id>` for details on a rule.");
    Ok(())
}

fn run_explain(rule_id: &str) -> Result<()> {
    let Some(rule) = registry::get_rule(rule_id) else {
        anyhow::bail!("unknown rule `{rule_id}`; run `opal-perf rules` to list rules");
    };

    println!("{}", rule.id().bold().underline());
    println!("{}", rule.description());
    println!();
    print_rule_explanation(rule.as_ref());
    println!();
    println!("{}", "Suppression:".bold());
    println!("  // opal-perf-ignore: {}", rule.id());
    println!("  // opal-perf-ignore-file   (whole file)");
    Ok(())
}

fn print_rule_explanation(rule: &dyn Rule) {
    match rule.id() {
        "redundant-contains-guard" => {
            explain(
                "The membership test walks the table, then Remove or Add walks it \
                 again. Both already handle the absent or duplicate key, so the guard \
                 doubles the lookup cost and adds a branch.",
                "if (cache.ContainsKey(key)) {\n      cache.Remove(key);\n  }",
                "cache.Remove(key);",
            );
        }
        "any-for-emptiness" => {
            explain(
                "Any() builds an iterator and pulls one element just to learn whether \
                 the sequence is empty. Receivers with a constant-time IsEmpty answer \
                 the same question directly.",
                "if (!pending.Any()) { return; }",
                "if (pending.IsEmpty) { return; }",
            );
        }
        "count-call-comparison" => {
            explain(
                "Count() walks the whole sequence, but comparing the result against \
                 zero only asks whether anything is there. Any() stops at the first \
                 element, and sized receivers answer in constant time.",
                "if (items.Count() == 0) { ... }",
                "if (!items.Any()) { ... }",
            );
        }
        "count-over-property" => {
            explain(
                "Count() enumerates every element even when the receiver already \
                 tracks its size. The Length or Count property reads a stored field.",
                "var n = values.Count();",
                "var n = values.Length;",
            );
        }
        "fill-with-default" => {
            explain(
                "Fill with the element default writes the value slot by slot. Clear() \
                 zeroes the buffer in bulk and states the intent.",
                "buffer.Fill(0);",
                "buffer.Clear();",
            );
        }
        "index-of-zero-comparison" => {
            explain(
                "IndexOf scans the whole string to compute a position, then the \
                 comparison throws everything but \"was it first\" away. A prefix \
                 check stops at the first mismatch.",
                "if (name.IndexOf(\"tmp_\") == 0) { ... }",
                "if (name.StartsWith(\"tmp_\")) { ... }",
            );
        }
        "single-char-string" => {
            explain(
                "Searching for a one-character string runs the general substring \
                 machinery. The char overload compares code units directly.",
                "var i = line.IndexOf(\",\");",
                "var i = line.IndexOf(',');",
            );
        }
        _ => {}
    }
}

fn explain(why: &str, bad: &str, good: &str) {
    println!("{}", "Why it matters:".bold());
    println!("  {why}");
    println!();
    println!("{}", "Bad:".red().bold());
    println!("  {bad}");
    println!();
    println!("{}", "Good:".green().bold());
    println!("  {good}");
}
