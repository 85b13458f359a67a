//! Canonical identity, routes, titles and content hashes.
//!
//! Two policies, selected by [`Corpus`]:
//!
//! - **Routed (`docs`)**: only files named after the page marker
//!   (`page.mdx` by default) are accepted. The route is the containing
//!   directory, rooted at `/`: `guides/webhooks/page.mdx` → `/guides/webhooks`,
//!   `page.mdx` → `/`. Canonical id: `docs:<route>`.
//! - **Path-addressed (`kb`)**: any file whose extension is in the
//!   accepted set. Canonical id: `kb:<normalized relative path>`. No route.
//!
//! Content hashes are SHA-256 over the raw bytes, hex-encoded, and are
//! only ever compared for equality.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::Corpus;

/// Default file name marking an addressable page.
pub const DEFAULT_PAGE_MARKER: &str = "page.mdx";

/// Humanized title of the root route.
pub const ROOT_TITLE: &str = "Home";

/// Last-resort title when every other source is empty.
const UNTITLED: &str = "Untitled";

/// Eligibility rules for both corpora.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
    /// File name marking a routed page, compared case-insensitively.
    pub page_marker: String,
    /// Extensions (without dot) accepted in the path-addressed corpus.
    pub kb_extensions: Vec<String>,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            page_marker: DEFAULT_PAGE_MARKER.to_string(),
            kb_extensions: vec!["md".to_string()],
        }
    }
}

/// Identity of an accepted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentIdentity {
    pub canonical_id: String,
    pub corpus: Corpus,
    /// Present iff `corpus == Corpus::Docs`.
    pub route: Option<String>,
    /// Relative path with `/` separators.
    pub source_path: String,
}

/// Why a file was not accepted into a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotAPage,
    UnsupportedExtension { extension: Option<String> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAPage => f.write_str("not a page file"),
            SkipReason::UnsupportedExtension { extension: Some(ext) } => {
                write!(f, "unsupported extension .{}", ext)
            }
            SkipReason::UnsupportedExtension { extension: None } => {
                f.write_str("no file extension")
            }
        }
    }
}

/// Result of [`resolve_identity`]: accept with an identity, or skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Accept(DocumentIdentity),
    Skip(SkipReason),
}

impl Resolution {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Resolution::Accept(_))
    }
}

/// Normalize a relative path: `/` separators, no leading `./` or `/`,
/// no empty segments.
pub fn normalize_relative_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the final path segment equals the page marker.
pub fn is_page_file(path: &str, page_marker: &str) -> bool {
    let normalized = normalize_relative_path(path);
    let last = normalized.rsplit('/').next().unwrap_or("");
    !page_marker.is_empty() && last.eq_ignore_ascii_case(page_marker)
}

/// Route of a routed page, or `None` when the path is not a page file.
pub fn derive_route(path: &str, page_marker: &str) -> Option<String> {
    if !is_page_file(path, page_marker) {
        return None;
    }
    let normalized = normalize_relative_path(path);
    let dir = normalized
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("");
    Some(format!("/{}", dir.trim_end_matches('/')))
}

/// Lowercased extension of the final path segment, if any.
fn extension(path: &str) -> Option<String> {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Apply the corpus policy to a relative path.
pub fn resolve_identity(path: &str, corpus: Corpus, policy: &IdentityPolicy) -> Resolution {
    let source_path = normalize_relative_path(path);
    match corpus {
        Corpus::Docs => match derive_route(&source_path, &policy.page_marker) {
            Some(route) => Resolution::Accept(DocumentIdentity {
                canonical_id: format!("{}:{}", corpus.tag(), route),
                corpus,
                route: Some(route),
                source_path,
            }),
            None => Resolution::Skip(SkipReason::NotAPage),
        },
        Corpus::Kb => {
            let ext = extension(&source_path);
            let accepted = ext
                .as_deref()
                .map(|e| policy.kb_extensions.iter().any(|k| k.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if accepted {
                Resolution::Accept(DocumentIdentity {
                    canonical_id: format!("{}:{}", corpus.tag(), source_path),
                    corpus,
                    route: None,
                    source_path,
                })
            } else {
                Resolution::Skip(SkipReason::UnsupportedExtension { extension: ext })
            }
        }
    }
}

/// What the title falls back to when metadata and headings are empty.
#[derive(Debug, Clone, Copy)]
pub enum TitleSource<'a> {
    Route(&'a str),
    Path(&'a str),
}

/// First non-empty of: front-matter title, first heading, humanized
/// route segment or file stem.
pub fn derive_title(
    frontmatter_title: Option<&str>,
    first_heading: Option<&str>,
    source: TitleSource<'_>,
) -> String {
    if let Some(title) = [frontmatter_title, first_heading]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
    {
        return title.to_string();
    }

    let fallback = match source {
        TitleSource::Route(route) => {
            let last = route.trim_end_matches('/').rsplit('/').next().unwrap_or("");
            if last.is_empty() {
                ROOT_TITLE.to_string()
            } else {
                humanize(last)
            }
        }
        TitleSource::Path(path) => {
            let normalized = normalize_relative_path(path);
            let file = normalized.rsplit('/').next().unwrap_or("");
            let stem = match file.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => file,
            };
            humanize(stem)
        }
    };

    if fallback.is_empty() {
        UNTITLED.to_string()
    } else {
        fallback
    }
}

/// `rate-limits` → `Rate Limits`, `getting_started` → `Getting Started`.
pub fn humanize(segment: &str) -> String {
    segment
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 of the raw bytes, lowercase hex.
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
