//! Storage abstraction for Docs Harness.
//!
//! The [`Store`] trait is the persistence collaborator of the ingestion
//! and query pipeline. Documents are keyed by `(workspace_id,
//! canonical_id)`; chunks belong to exactly one document and go away
//! with it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes,
//! and [`replace_document`](Store::replace_document) must swap a
//! document and all of its chunks atomically.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Chunk, Citation, Corpus, Document};
use crate::search::Passage;

/// A stored passage, ready to be scored.
///
/// Carries its citation so ranked results can be linked without another
/// lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkCandidate {
    /// Chunk UUID.
    pub chunk_id: String,
    /// Parent document UUID.
    pub document_id: String,
    pub canonical_id: String,
    pub chunk_index: usize,
    pub heading_path: Vec<String>,
    pub content: String,
    pub citation: Citation,
}

impl Passage for ChunkCandidate {
    fn content(&self) -> &str {
        &self.content
    }

    fn heading_path(&self) -> &[String] {
        &self.heading_path
    }

    fn corpus(&self) -> Corpus {
        self.citation.corpus()
    }
}

/// A document with all of its chunks, in index order.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    #[serde(flatten)]
    pub document: Document,
    pub chunks: Vec<Chunk>,
}

/// Row counts for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: usize,
    pub docs_documents: usize,
    pub kb_documents: usize,
    pub chunks: usize,
}

/// Abstract storage backend for Docs Harness.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`content_hash`](Store::content_hash) | Recorded hash of a document, for change detection |
/// | [`replace_document`](Store::replace_document) | Insert or replace a document and all its chunks |
/// | [`delete_document`](Store::delete_document) | Remove a document and its chunks |
/// | [`get_document`](Store::get_document) | Retrieve a document with its chunks |
/// | [`list_canonical_ids`](Store::list_canonical_ids) | Enumerate stored documents |
/// | [`candidates`](Store::candidates) | Every passage of a workspace, for ranking |
/// | [`stats`](Store::stats) | Document and chunk counts |
#[async_trait]
pub trait Store: Send + Sync {
    /// Content hash recorded for a document, if it exists.
    async fn content_hash(&self, workspace_id: &str, canonical_id: &str) -> Result<Option<String>>;

    /// Insert or replace a document together with its full chunk set.
    ///
    /// Returns the document ID (existing or newly generated). Readers see
    /// either the old document and chunks or the new ones, never a mix.
    async fn replace_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<String>;

    /// Delete a document and its chunks. Returns whether it existed.
    async fn delete_document(&self, workspace_id: &str, canonical_id: &str) -> Result<bool>;

    async fn get_document(
        &self,
        workspace_id: &str,
        canonical_id: &str,
    ) -> Result<Option<DocumentResponse>>;

    /// Canonical ids of a workspace, sorted, optionally limited to one corpus.
    async fn list_canonical_ids(
        &self,
        workspace_id: &str,
        corpus: Option<Corpus>,
    ) -> Result<Vec<String>>;

    /// All passages of a workspace in a stable order (canonical id, then
    /// chunk index), optionally limited to one corpus.
    async fn candidates(
        &self,
        workspace_id: &str,
        corpus: Option<Corpus>,
    ) -> Result<Vec<ChunkCandidate>>;

    async fn stats(&self, workspace_id: &str) -> Result<StoreStats>;
}
