//! Per-file ingestion: prepare, then apply with replace-on-change.
//!
//! [`prepare_file`] is pure: it resolves identity, normalizes, derives the
//! title and hash, and chunks. [`apply_prepared`] compares the hash with
//! what the [`Store`] has recorded and only writes when it differs, in a
//! single [`Store::replace_document`] call.
//!
//! Failures are per file. A batch caller logs the error and continues.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chunk::{chunk_document, ChunkConfig};
use crate::error::{IngestError, NormalizeError};
use crate::identity::{
    derive_title, hash_content, resolve_identity, DocumentIdentity, IdentityPolicy, Resolution,
    SkipReason, TitleSource,
};
use crate::models::{Chunk, Corpus, Document};
use crate::normalize::{normalize_bytes, Dialect};
use crate::store::Store;

/// Identity and chunking settings applied to every file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub policy: IdentityPolicy,
    pub chunking: ChunkConfig,
}

/// Everything needed to write one document, computed without a store.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedDocument {
    pub identity: DocumentIdentity,
    pub title: String,
    pub content_hash: String,
    pub frontmatter: Map<String, Value>,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone)]
pub enum Prepared {
    Ready(PreparedDocument),
    Skipped(SkipReason),
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created { chunks: usize },
    Updated { chunks: usize },
    Unchanged,
    Skipped(SkipReason),
}

/// Resolve, normalize, title, hash and chunk one file.
pub fn prepare_file(
    path: &str,
    corpus: Corpus,
    bytes: &[u8],
    options: &IngestOptions,
) -> Result<Prepared, NormalizeError> {
    let identity = match resolve_identity(path, corpus, &options.policy) {
        Resolution::Accept(identity) => identity,
        Resolution::Skip(reason) => return Ok(Prepared::Skipped(reason)),
    };

    let normalized = normalize_bytes(bytes, Dialect::for_path(&identity.source_path))?;

    let source = match &identity.route {
        Some(route) => TitleSource::Route(route),
        None => TitleSource::Path(&identity.source_path),
    };
    let title = derive_title(
        normalized.frontmatter_title(),
        normalized.first_heading.as_deref(),
        source,
    );

    let chunks = chunk_document(
        &normalized.normalized_content,
        normalized.first_heading.as_deref(),
        &options.chunking,
        corpus.is_routed(),
    );

    Ok(Prepared::Ready(PreparedDocument {
        title,
        content_hash: hash_content(bytes),
        frontmatter: normalized.frontmatter,
        chunks,
        identity,
    }))
}

/// Write a prepared document unless the store already has the same hash.
pub async fn apply_prepared<S: Store + ?Sized>(
    store: &S,
    workspace_id: &str,
    prepared: PreparedDocument,
    now: i64,
) -> Result<IngestOutcome, IngestError> {
    let canonical_id = &prepared.identity.canonical_id;
    let existing = store.content_hash(workspace_id, canonical_id).await?;

    if existing.as_deref() == Some(prepared.content_hash.as_str()) {
        tracing::debug!(canonical_id = %canonical_id, "unchanged");
        return Ok(IngestOutcome::Unchanged);
    }

    let doc = Document {
        workspace_id: workspace_id.to_string(),
        canonical_id: canonical_id.clone(),
        corpus: prepared.identity.corpus,
        route: prepared.identity.route.clone(),
        source_path: prepared.identity.source_path.clone(),
        title: prepared.title,
        content_hash: prepared.content_hash,
        frontmatter: prepared.frontmatter,
        ingested_at: now,
    };
    store.replace_document(&doc, &prepared.chunks).await?;

    let chunks = prepared.chunks.len();
    tracing::debug!(canonical_id = %doc.canonical_id, chunks, "document written");
    Ok(if existing.is_some() {
        IngestOutcome::Updated { chunks }
    } else {
        IngestOutcome::Created { chunks }
    })
}

/// [`prepare_file`] followed by [`apply_prepared`].
pub async fn ingest_file<S: Store + ?Sized>(
    store: &S,
    workspace_id: &str,
    path: &str,
    corpus: Corpus,
    bytes: &[u8],
    options: &IngestOptions,
    now: i64,
) -> Result<IngestOutcome, IngestError> {
    match prepare_file(path, corpus, bytes, options)? {
        Prepared::Ready(prepared) => apply_prepared(store, workspace_id, prepared, now).await,
        Prepared::Skipped(reason) => {
            tracing::debug!(path, %reason, "skipped");
            Ok(IngestOutcome::Skipped(reason))
        }
    }
}

/// Delete documents of `corpus` whose canonical ids are not in `seen`.
///
/// Returns the removed canonical ids.
pub async fn prune_missing<S: Store + ?Sized>(
    store: &S,
    workspace_id: &str,
    corpus: Corpus,
    seen: &HashSet<String>,
) -> anyhow::Result<Vec<String>> {
    let mut removed = Vec::new();
    for canonical_id in store.list_canonical_ids(workspace_id, Some(corpus)).await? {
        if !seen.contains(&canonical_id) && store.delete_document(workspace_id, &canonical_id).await? {
            removed.push(canonical_id);
        }
    }
    Ok(removed)
}
