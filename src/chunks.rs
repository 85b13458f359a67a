//! `dh chunks <file>`: show how one file is identified and chunked.

use anyhow::{bail, Context, Result};
use docs_harness_core::ingest::{prepare_file, Prepared};
use docs_harness_core::models::Corpus;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Corpus and root-relative path of a file, inferred from the configured
/// roots when `corpus` is not given.
pub fn locate(config: &Config, file: &Path, corpus: Option<Corpus>) -> Result<(Corpus, String)> {
    let file = absolute(file)?;
    let sources = config.sources(corpus);

    for source in &sources {
        let root = absolute(source.root)?;
        if let Ok(rel) = file.strip_prefix(&root) {
            return Ok((source.corpus, rel.to_string_lossy().replace('\\', "/")));
        }
    }

    match corpus {
        Some(c) => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok((c, name))
        }
        None => bail!(
            "{} is not under a configured corpus root; pass --corpus",
            file.display()
        ),
    }
}

/// Canonical form when the path exists, so `config/../app` and `app` compare
/// equal.
fn absolute(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

pub fn run_chunks(config: &Config, file: &Path, corpus: Option<Corpus>) -> Result<()> {
    let (corpus, relative) = locate(config, file, corpus)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;

    let prepared = match prepare_file(&relative, corpus, &bytes, &config.ingest_options())? {
        Prepared::Ready(p) => p,
        Prepared::Skipped(reason) => {
            println!("skipped {} ({}): {}", relative, corpus, reason);
            return Ok(());
        }
    };

    let id = &prepared.identity;
    println!("canonical id: {}", id.canonical_id);
    println!("corpus: {}", id.corpus);
    if let Some(route) = &id.route {
        println!("route: {}", route);
    }
    println!("source path: {}", id.source_path);
    println!("title: {}", prepared.title);
    println!("content hash: {}", prepared.content_hash);
    println!("chunks: {}", prepared.chunks.len());
    println!();

    for chunk in &prepared.chunks {
        println!(
            "[{}] {} (anchor: {}, {} chars)",
            chunk.chunk_index,
            chunk.heading_path.join(" > "),
            chunk.anchor.as_deref().unwrap_or("-"),
            chunk.content.chars().count()
        );
        for line in chunk.content.lines() {
            println!("    {}", line);
        }
        println!();
    }
    Ok(())
}
