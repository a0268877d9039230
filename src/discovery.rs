//! File discovery for opal-perf.
//!
//! The engine and the fix command share this walk so both see the same
//! set of files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum file size to analyze (10 MB).
///
/// Files larger than this are skipped to prevent memory exhaustion attacks.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Options for file discovery.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryOptions {
    /// Whether to check file size limits.
    pub check_file_size: bool,
    /// Whether to perform TOCTOU-safe metadata checks.
    pub security_checks: bool,
}

impl DiscoveryOptions {
    /// Create options with all security checks enabled (recommended for engine).
    pub fn secure() -> Self {
        Self {
            check_file_size: true,
            security_checks: true,
        }
    }

    /// Create options without security checks (faster, for trusted contexts).
    pub fn fast() -> Self {
        Self {
            check_file_size: false,
            security_checks: false,
        }
    }
}

/// Discover all Opal files at the given path.
///
/// Walks the directory tree, skipping hidden directories, common build
/// output directories, anything that is not a regular `.opal` file, and
/// (when `options.check_file_size` is set) oversized files. A single
/// `.opal` file path is accepted as-is.
pub fn discover_opal_files(path: &Path, options: &DiscoveryOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    // SECURITY: Disable symlink following within the tree to prevent attacks.
    // The root itself may be a symlink (common for /tmp on macOS).
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let file_path = entry.path();

        if !file_path.extension().is_some_and(|ext| ext == "opal") {
            continue;
        }

        if options.security_checks {
            // Re-check through symlink_metadata; the walker's file_type can
            // go stale between the walk and the read.
            match std::fs::symlink_metadata(file_path) {
                Ok(meta) if meta.is_file() => {
                    if options.check_file_size && meta.len() > MAX_FILE_SIZE {
                        eprintln!(
                            "Warning: Skipping {} (file too large: {} bytes, max: {} bytes)",
                            file_path.display(),
                            meta.len(),
                            MAX_FILE_SIZE
                        );
                        continue;
                    }
                    files.push(file_path.to_path_buf());
                }
                Ok(_) => {
                    // Not a regular file, skip silently
                    continue;
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Cannot read metadata for {}: {}",
                        file_path.display(),
                        e
                    );
                    continue;
                }
            }
        } else {
            files.push(file_path.to_path_buf());
        }
    }

    files.sort();
    files
}

/// Check if a directory entry should be excluded from traversal.
///
/// Hidden directories and common build/dependency output directories are
/// skipped. The root directory (depth 0) is never excluded, even if its
/// name starts with `.`.
pub fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    // Never exclude the root (allows temp dirs like .tmpXXX)
    if entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();

    if name.starts_with('.') {
        return true;
    }

    matches!(
        name.as_ref(),
        "bin" | "obj" | "build" | "dist" | "out" | "node_modules" | "vendor" | "third_party"
    )
}
