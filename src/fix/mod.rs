//! Batch fix application.
//!
//! Diagnostics carry spans and properties, never edits; the edits are
//! computed here by re-reading each file, compiling it again, and asking
//! [`rewrite::compute_fix`] to re-locate every span. A file that changed
//! since analysis simply declines its fixes. Writes are atomic and path
//! validation keeps every target inside the project directory.

pub mod plan;
pub mod rewrite;

pub use rewrite::compute_fix;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::rules::{Diagnostic, Fix, Replacement};
use crate::sem::{compile, Profile};

/// Errors that can occur during fix application
#[derive(Debug, Error)]
pub enum FixError {
    #[error("path traversal attempt: {path} is outside base directory {base}")]
    PathTraversal { path: String, base: String },

    #[error("invalid byte offset {offset} for file of length {len} in {path}")]
    InvalidOffset {
        path: String,
        offset: usize,
        len: usize,
    },

    #[error("byte offset {offset} is not on a UTF-8 character boundary in {path}")]
    InvalidUtf8Boundary { path: String, offset: usize },

    #[error("start_byte {start} is greater than end_byte {end} in {path}")]
    InvalidRange {
        path: String,
        start: usize,
        end: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome counts for one fix pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixSummary {
    /// Fixes written, or that would be written under a dry run.
    pub applied: usize,
    /// Diagnostics with no applicable rewrite: certified report-only,
    /// stale spans, or a file that no longer parses.
    pub declined: usize,
    /// Fixes dropped because they touched bytes an earlier fix already
    /// claimed.
    pub overlapped: usize,
}

/// Validate that a file path is within the allowed base directory.
///
/// A malicious diagnostic must not be able to direct a write outside the
/// project tree.
fn validate_path(path: &Path, base_dir: &Path) -> Result<PathBuf, FixError> {
    let canonical_base = base_dir.canonicalize().map_err(FixError::Io)?;

    // Canonicalize through the parent when the file itself doesn't exist.
    let canonical_path = if path.exists() {
        path.canonicalize().map_err(FixError::Io)?
    } else {
        let parent = path.parent().ok_or_else(|| FixError::PathTraversal {
            path: path.display().to_string(),
            base: canonical_base.display().to_string(),
        })?;
        let filename = path.file_name().ok_or_else(|| FixError::PathTraversal {
            path: path.display().to_string(),
            base: canonical_base.display().to_string(),
        })?;
        let canonical_parent = parent.canonicalize().map_err(FixError::Io)?;
        canonical_parent.join(filename)
    };

    if !canonical_path.starts_with(&canonical_base) {
        return Err(FixError::PathTraversal {
            path: canonical_path.display().to_string(),
            base: canonical_base.display().to_string(),
        });
    }

    Ok(canonical_path)
}

/// Validate byte offsets for a replacement operation.
fn validate_offsets(
    replacement: &Replacement,
    content: &str,
    path: &Path,
) -> Result<(), FixError> {
    let path_str = path.display().to_string();
    let len = content.len();

    if replacement.start_byte > len {
        return Err(FixError::InvalidOffset {
            path: path_str,
            offset: replacement.start_byte,
            len,
        });
    }

    if replacement.end_byte > len {
        return Err(FixError::InvalidOffset {
            path: path_str,
            offset: replacement.end_byte,
            len,
        });
    }

    if replacement.start_byte > replacement.end_byte {
        return Err(FixError::InvalidRange {
            path: path_str,
            start: replacement.start_byte,
            end: replacement.end_byte,
        });
    }

    if !content.is_char_boundary(replacement.start_byte) {
        return Err(FixError::InvalidUtf8Boundary {
            path: path_str,
            offset: replacement.start_byte,
        });
    }

    if !content.is_char_boundary(replacement.end_byte) {
        return Err(FixError::InvalidUtf8Boundary {
            path: path_str,
            offset: replacement.end_byte,
        });
    }

    Ok(())
}

fn replacement_span(fix: &Fix) -> (usize, usize) {
    let start = fix
        .replacements
        .iter()
        .map(|r| r.start_byte)
        .min()
        .unwrap_or(0);
    let end = fix
        .replacements
        .iter()
        .map(|r| r.end_byte)
        .max()
        .unwrap_or(0);
    (start, end)
}

fn intersects(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Pick a non-overlapping subset of the computed fixes.
///
/// Earliest first, widest first on ties; anything touching bytes an
/// accepted fix already claimed is dropped. Identical replacements are
/// collapsed rather than counted as conflicts, so two rewrites that both
/// insert the same `use` line share one insertion.
fn select_replacements(mut fixes: Vec<Fix>, summary: &mut FixSummary) -> Vec<Replacement> {
    fixes.sort_by_key(|f| {
        let (start, end) = replacement_span(f);
        (start, std::cmp::Reverse(end))
    });

    let mut chosen: Vec<Replacement> = Vec::new();
    for fix in fixes {
        let fresh: Vec<&Replacement> = fix
            .replacements
            .iter()
            .filter(|r| {
                !chosen.iter().any(|c| {
                    c.start_byte == r.start_byte
                        && c.end_byte == r.end_byte
                        && c.new_text == r.new_text
                })
            })
            .collect();
        let collides = fresh.iter().any(|r| {
            chosen
                .iter()
                .any(|c| intersects((r.start_byte, r.end_byte), (c.start_byte, c.end_byte)))
        });
        if collides {
            summary.overlapped += 1;
            continue;
        }
        chosen.extend(fresh.into_iter().cloned());
        summary.applied += 1;
    }
    chosen
}

/// Compute and apply fixes for a batch of diagnostics.
///
/// Diagnostics are grouped by file; each file is read and compiled once,
/// and every fix is re-derived from that compilation. All offsets are
/// validated before any byte of the file changes, and the write itself
/// goes through a temp file rename so an interrupted run never leaves a
/// torn file behind.
pub fn apply_fixes(
    diagnostics: &[Diagnostic],
    base_dir: &Path,
    profile: Profile,
    dry_run: bool,
) -> Result<FixSummary, FixError> {
    let mut by_file: BTreeMap<&Path, Vec<&Diagnostic>> = BTreeMap::new();
    for diagnostic in diagnostics {
        by_file
            .entry(diagnostic.file_path.as_path())
            .or_default()
            .push(diagnostic);
    }

    let mut summary = FixSummary::default();

    for (path, group) in by_file {
        let validated_path = validate_path(path, base_dir)?;
        let content = std::fs::read_to_string(&validated_path)?;

        let Ok(compilation) = compile(&content, profile) else {
            // The file moved on past what analysis saw.
            summary.declined += group.len();
            continue;
        };

        let mut fixes = Vec::new();
        for diagnostic in group {
            match compute_fix(diagnostic, &content, &compilation) {
                Some(fix) => fixes.push(fix),
                None => summary.declined += 1,
            }
        }

        for fix in &fixes {
            for replacement in &fix.replacements {
                validate_offsets(replacement, &content, path)?;
            }
        }

        let mut chosen = select_replacements(fixes, &mut summary);
        if chosen.is_empty() || dry_run {
            continue;
        }

        // Apply back-to-front so earlier offsets stay valid.
        chosen.sort_by_key(|r| std::cmp::Reverse((r.start_byte, r.end_byte)));
        let mut result = content;
        for replacement in &chosen {
            result.replace_range(
                replacement.start_byte..replacement.end_byte,
                &replacement.new_text,
            );
        }

        // Temp file in the same directory, then rename; the random name
        // also defeats symlink games on a predictable temp path.
        let parent = validated_path.parent().unwrap_or(Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(result.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(&validated_path)
            .map_err(|e| FixError::Io(e.error))?;
    }

    Ok(summary)
}
