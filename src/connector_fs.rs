//! Filesystem scanner for a corpus root.
//!
//! Walks the root recursively, drops excluded paths, and returns files in
//! a deterministic order. Eligibility (page marker, extension) is left to
//! the identity resolver so skipped files can be counted.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file found under a corpus root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the corpus root, `/`-separated.
    pub relative_path: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))
    }
}

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

pub fn scan_directory(root: &Path, exclude_globs: &[String]) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            tracing::debug!(path = %rel_str, "excluded");
            continue;
        }

        files.push(SourceFile {
            relative_path: rel_str,
            path: path.to_path_buf(),
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
