//! Sync orchestration: scan corpus roots, prepare each file, apply it to
//! a store, and prune documents that disappeared.
//!
//! A file that cannot be read or normalized is logged and counted as
//! failed; the rest of the batch continues.

use anyhow::{bail, Result};
use docs_harness_core::ingest::{
    apply_prepared, prepare_file, prune_missing, IngestOptions, IngestOutcome, Prepared,
};
use docs_harness_core::identity::{resolve_identity, Resolution};
use docs_harness_core::models::Corpus;
use docs_harness_core::store::memory::InMemoryStore;
use docs_harness_core::store::Store;
use std::collections::HashSet;

use crate::config::{Config, CorpusSource};
use crate::connector_fs::{scan_directory, SourceFile};

/// Per-corpus sync counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub corpus: Option<Corpus>,
    pub scanned: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks_written: usize,
    pub pruned: usize,
}

impl SyncReport {
    fn print(&self, label: &str) {
        println!("sync {}{}", self.corpus.map(|c| c.tag()).unwrap_or("all"), label);
        println!("  files scanned: {}", self.scanned);
        println!("  created: {}", self.created);
        println!("  updated: {}", self.updated);
        println!("  unchanged: {}", self.unchanged);
        println!("  skipped: {}", self.skipped);
        println!("  failed: {}", self.failed);
        println!("  chunks written: {}", self.chunks_written);
        if self.pruned > 0 {
            println!("  pruned: {}", self.pruned);
        }
    }
}

/// Sync one corpus into `store`.
pub async fn sync_corpus<S: Store + ?Sized>(
    store: &S,
    config: &Config,
    source: &CorpusSource<'_>,
    now: i64,
) -> Result<SyncReport> {
    let files = scan_directory(source.root, source.exclude_globs)?;
    let options = config.ingest_options();
    let mut report = SyncReport {
        corpus: Some(source.corpus),
        scanned: files.len(),
        ..SyncReport::default()
    };
    let mut seen = HashSet::new();

    for file in &files {
        // an accepted path keeps its stored document even if this pass fails
        if let Resolution::Accept(identity) =
            resolve_identity(&file.relative_path, source.corpus, &options.policy)
        {
            seen.insert(identity.canonical_id);
        }

        let prepared = match read_and_prepare(file, source.corpus, &options) {
            Ok(p) => p,
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::warn!(path = %file.relative_path, %error, "failed to prepare file");
                report.failed += 1;
                continue;
            }
        };
        let prepared = match prepared {
            Prepared::Ready(p) => p,
            Prepared::Skipped(reason) => {
                tracing::debug!(path = %file.relative_path, %reason, "skipped");
                report.skipped += 1;
                continue;
            }
        };

        match apply_prepared(store, &config.workspace, prepared, now).await {
            Ok(IngestOutcome::Created { chunks }) => {
                report.created += 1;
                report.chunks_written += chunks;
            }
            Ok(IngestOutcome::Updated { chunks }) => {
                report.updated += 1;
                report.chunks_written += chunks;
            }
            Ok(IngestOutcome::Unchanged) => report.unchanged += 1,
            Ok(IngestOutcome::Skipped(_)) => report.skipped += 1,
            Err(e) => {
                tracing::warn!(path = %file.relative_path, error = %e, "failed to store document");
                report.failed += 1;
            }
        }
    }

    report.pruned = prune_missing(store, &config.workspace, source.corpus, &seen)
        .await?
        .len();

    tracing::info!(
        corpus = %source.corpus,
        scanned = report.scanned,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        skipped = report.skipped,
        failed = report.failed,
        "sync finished"
    );
    Ok(report)
}

fn read_and_prepare(
    file: &SourceFile,
    corpus: Corpus,
    options: &IngestOptions,
) -> Result<Prepared> {
    let bytes = file.read()?;
    Ok(prepare_file(&file.relative_path, corpus, &bytes, options)?)
}

/// Sync every configured corpus (or just `only`) into `store`.
pub async fn sync_all<S: Store + ?Sized>(
    store: &S,
    config: &Config,
    only: Option<Corpus>,
    now: i64,
) -> Result<Vec<SyncReport>> {
    let sources = config.sources(only);
    if sources.is_empty() {
        bail!(
            "Corpus '{}' is not configured",
            only.map(|c| c.tag()).unwrap_or("any")
        );
    }
    let mut reports = Vec::new();
    for source in &sources {
        reports.push(sync_corpus(store, config, source, now).await?);
    }
    Ok(reports)
}

/// Build a fresh in-memory index of the configured corpora.
pub async fn build_index(config: &Config, only: Option<Corpus>) -> Result<InMemoryStore> {
    let store = InMemoryStore::new();
    sync_all(&store, config, only, chrono::Utc::now().timestamp()).await?;
    Ok(store)
}

pub async fn run_sync(config: &Config, only: Option<Corpus>, dry_run: bool, verify: bool) -> Result<()> {
    if dry_run {
        return run_dry_run(config, only);
    }

    let store = InMemoryStore::new();
    let now = chrono::Utc::now().timestamp();
    let reports = sync_all(&store, config, only, now).await?;
    for report in &reports {
        report.print("");
    }

    if verify {
        let second = sync_all(&store, config, only, now).await?;
        for report in &second {
            report.print(" (verify)");
        }
        let changed: usize = second.iter().map(|r| r.created + r.updated).sum();
        if changed > 0 {
            bail!("verify failed: {} document(s) changed on re-ingestion", changed);
        }
    }

    let stats = store.stats(&config.workspace).await?;
    println!(
        "index: {} documents ({} docs, {} kb), {} chunks",
        stats.documents, stats.docs_documents, stats.kb_documents, stats.chunks
    );
    println!("ok");
    Ok(())
}

fn run_dry_run(config: &Config, only: Option<Corpus>) -> Result<()> {
    let sources = config.sources(only);
    if sources.is_empty() {
        bail!(
            "Corpus '{}' is not configured",
            only.map(|c| c.tag()).unwrap_or("any")
        );
    }
    let options = config.ingest_options();

    for source in &sources {
        let files = scan_directory(source.root, source.exclude_globs)?;
        let (mut documents, mut skipped, mut failed, mut chunks) = (0usize, 0usize, 0usize, 0usize);
        for file in &files {
            match read_and_prepare(file, source.corpus, &options) {
                Ok(Prepared::Ready(p)) => {
                    documents += 1;
                    chunks += p.chunks.len();
                }
                Ok(Prepared::Skipped(_)) => skipped += 1,
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::warn!(path = %file.relative_path, %error, "failed to prepare file");
                    failed += 1;
                }
            }
        }
        println!("sync {} (dry-run)", source.corpus);
        println!("  files scanned: {}", files.len());
        println!("  documents found: {}", documents);
        println!("  skipped: {}", skipped);
        println!("  failed: {}", failed);
        println!("  estimated chunks: {}", chunks);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::fs;
    use tempfile::TempDir;

    fn kb_config(dir: &TempDir) -> Config {
        parse_config("[corpora.kb]\nroot = \"kb\"\n", dir.path()).unwrap()
    }

    async fn kb_ids(store: &InMemoryStore, config: &Config) -> Vec<String> {
        store
            .list_canonical_ids(&config.workspace, Some(Corpus::Kb))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_failed_update_keeps_stored_document() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("kb")).unwrap();
        let file = dir.path().join("kb/a.md");
        fs::write(&file, "# A\n\ngood").unwrap();
        let config = kb_config(&dir);
        let store = InMemoryStore::new();

        sync_all(&store, &config, None, 1).await.unwrap();
        assert_eq!(kb_ids(&store, &config).await, vec!["kb:a.md"]);

        fs::write(&file, [0xff, 0xfe]).unwrap();
        let reports = sync_all(&store, &config, None, 2).await.unwrap();
        assert_eq!(reports[0].failed, 1);
        assert_eq!(reports[0].pruned, 0);
        assert_eq!(kb_ids(&store, &config).await, vec!["kb:a.md"]);

        let doc = store
            .get_document(&config.workspace, "kb:a.md")
            .await
            .unwrap()
            .unwrap();
        assert!(doc.chunks[0].content.contains("good"));
    }

    #[tokio::test]
    async fn test_removed_file_is_pruned() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("kb")).unwrap();
        fs::write(dir.path().join("kb/a.md"), "# A\n\na").unwrap();
        fs::write(dir.path().join("kb/b.md"), "# B\n\nb").unwrap();
        let config = kb_config(&dir);
        let store = InMemoryStore::new();

        sync_all(&store, &config, None, 1).await.unwrap();
        fs::remove_file(dir.path().join("kb/b.md")).unwrap();
        let reports = sync_all(&store, &config, None, 2).await.unwrap();

        assert_eq!(reports[0].pruned, 1);
        assert_eq!(reports[0].unchanged, 1);
        assert_eq!(kb_ids(&store, &config).await, vec!["kb:a.md"]);
    }
}
