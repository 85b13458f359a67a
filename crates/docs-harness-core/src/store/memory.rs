//! In-memory [`Store`] implementation.
//!
//! All state sits behind one `std::sync::RwLock`, so a document and its
//! chunks are always swapped under the same write guard. Documents are
//! kept in a `BTreeMap` keyed by `(workspace_id, canonical_id)`, which
//! makes [`candidates`](Store::candidates) ordering deterministic.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Chunk, Citation, Corpus, Document};

use super::{ChunkCandidate, DocumentResponse, Store, StoreStats};

type Key = (String, String);

struct StoredDoc {
    id: String,
    doc: Document,
    chunks: Vec<StoredChunk>,
}

struct StoredChunk {
    id: String,
    chunk: Chunk,
}

/// In-memory store, used by the CLI and tests.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<Key, StoredDoc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Key, StoredDoc>>> {
        self.docs.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Key, StoredDoc>>> {
        self.docs.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

fn key(workspace_id: &str, canonical_id: &str) -> Key {
    (workspace_id.to_string(), canonical_id.to_string())
}

fn in_corpus(doc: &Document, corpus: Option<Corpus>) -> bool {
    corpus.map_or(true, |c| doc.corpus == c)
}

#[async_trait]
impl Store for InMemoryStore {
    async fn content_hash(&self, workspace_id: &str, canonical_id: &str) -> Result<Option<String>> {
        let docs = self.read()?;
        Ok(docs
            .get(&key(workspace_id, canonical_id))
            .map(|s| s.doc.content_hash.clone()))
    }

    async fn replace_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<String> {
        let stored_chunks: Vec<StoredChunk> = chunks
            .iter()
            .map(|c| StoredChunk {
                id: Uuid::new_v4().to_string(),
                chunk: c.clone(),
            })
            .collect();

        let mut docs = self.write()?;
        let k = key(&doc.workspace_id, &doc.canonical_id);
        let id = docs
            .get(&k)
            .map(|s| s.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        docs.insert(
            k,
            StoredDoc {
                id: id.clone(),
                doc: doc.clone(),
                chunks: stored_chunks,
            },
        );
        Ok(id)
    }

    async fn delete_document(&self, workspace_id: &str, canonical_id: &str) -> Result<bool> {
        let mut docs = self.write()?;
        Ok(docs.remove(&key(workspace_id, canonical_id)).is_some())
    }

    async fn get_document(
        &self,
        workspace_id: &str,
        canonical_id: &str,
    ) -> Result<Option<DocumentResponse>> {
        let docs = self.read()?;
        Ok(docs
            .get(&key(workspace_id, canonical_id))
            .map(|s| DocumentResponse {
                id: s.id.clone(),
                document: s.doc.clone(),
                chunks: s.chunks.iter().map(|sc| sc.chunk.clone()).collect(),
            }))
    }

    async fn list_canonical_ids(
        &self,
        workspace_id: &str,
        corpus: Option<Corpus>,
    ) -> Result<Vec<String>> {
        let docs = self.read()?;
        Ok(docs
            .iter()
            .filter(|((ws, _), s)| ws == workspace_id && in_corpus(&s.doc, corpus))
            .map(|((_, canonical), _)| canonical.clone())
            .collect())
    }

    async fn candidates(
        &self,
        workspace_id: &str,
        corpus: Option<Corpus>,
    ) -> Result<Vec<ChunkCandidate>> {
        let docs = self.read()?;
        let mut out = Vec::new();
        for ((ws, _), stored) in docs.iter() {
            if ws != workspace_id || !in_corpus(&stored.doc, corpus) {
                continue;
            }
            for sc in &stored.chunks {
                out.push(ChunkCandidate {
                    chunk_id: sc.id.clone(),
                    document_id: stored.id.clone(),
                    canonical_id: stored.doc.canonical_id.clone(),
                    chunk_index: sc.chunk.chunk_index,
                    heading_path: sc.chunk.heading_path.clone(),
                    content: sc.chunk.content.clone(),
                    citation: Citation::for_passage(&stored.doc, sc.chunk.anchor.as_deref()),
                });
            }
        }
        Ok(out)
    }

    async fn stats(&self, workspace_id: &str) -> Result<StoreStats> {
        let docs = self.read()?;
        let mut stats = StoreStats::default();
        for ((ws, _), stored) in docs.iter() {
            if ws != workspace_id {
                continue;
            }
            stats.documents += 1;
            match stored.doc.corpus {
                Corpus::Docs => stats.docs_documents += 1,
                Corpus::Kb => stats.kb_documents += 1,
            }
            stats.chunks += stored.chunks.len();
        }
        Ok(stats)
    }
}
