//! Core data models shared by ingestion and retrieval.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which corpus a document belongs to.
///
/// The routed corpus (`docs`) is addressable by a navigable route; the
/// path-addressed corpus (`kb`) is identified only by its relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corpus {
    Docs,
    Kb,
}

impl Corpus {
    /// Prefix used in canonical ids (`docs:/guides`, `kb:faq/billing.md`).
    pub fn tag(self) -> &'static str {
        match self {
            Corpus::Docs => "docs",
            Corpus::Kb => "kb",
        }
    }

    pub fn is_routed(self) -> bool {
        matches!(self, Corpus::Docs)
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Corpus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docs" => Ok(Corpus::Docs),
            "kb" => Ok(Corpus::Kb),
            other => Err(format!("unknown corpus '{}': expected docs or kb", other)),
        }
    }
}

/// A normalized document, ready to be written to a store.
///
/// `route` is `Some` iff `corpus == Corpus::Docs`.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub workspace_id: String,
    pub canonical_id: String,
    pub corpus: Corpus,
    pub route: Option<String>,
    pub source_path: String,
    pub title: String,
    pub content_hash: String,
    pub frontmatter: serde_json::Map<String, serde_json::Value>,
    pub ingested_at: i64,
}

/// A retrievable passage of a document.
///
/// `heading_path` holds at most two entries: the document's first
/// top-level heading and the section heading the passage sits under.
/// `anchor` is only set for routed documents and only for passages tied
/// to a real section heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_index: usize,
    pub heading_path: Vec<String>,
    pub anchor: Option<String>,
    pub content: String,
}

/// Where a passage came from, shaped by corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "corpus", rename_all = "lowercase")]
pub enum Citation {
    Docs {
        route: String,
        anchor: Option<String>,
        title: String,
    },
    Kb {
        path: String,
        title: String,
    },
}

impl Citation {
    /// Citation for a passage of `doc` under the given section anchor.
    pub fn for_passage(doc: &Document, anchor: Option<&str>) -> Self {
        match doc.corpus {
            Corpus::Docs => Citation::Docs {
                route: doc.route.clone().unwrap_or_else(|| "/".to_string()),
                anchor: anchor.map(str::to_string),
                title: doc.title.clone(),
            },
            Corpus::Kb => Citation::Kb {
                path: doc.source_path.clone(),
                title: doc.title.clone(),
            },
        }
    }

    pub fn corpus(&self) -> Corpus {
        match self {
            Citation::Docs { .. } => Corpus::Docs,
            Citation::Kb { .. } => Corpus::Kb,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Citation::Docs { title, .. } | Citation::Kb { title, .. } => title,
        }
    }

    /// Deep link for the passage: `route#anchor` for routed documents,
    /// the relative path for knowledge-base files.
    pub fn link(&self) -> String {
        match self {
            Citation::Docs {
                route,
                anchor: Some(anchor),
                ..
            } => format!("{}#{}", route, anchor),
            Citation::Docs { route, .. } => route.clone(),
            Citation::Kb { path, .. } => path.clone(),
        }
    }
}
