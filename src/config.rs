//! TOML configuration for the `dh` binary.
//!
//! ```toml
//! workspace = "default"
//!
//! [corpora.docs]
//! root = "./app"
//!
//! [corpora.kb]
//! root = "./kb"
//! extensions = ["md"]
//!
//! [chunking]
//! max_chars = 4000
//! overlap_chars = 400
//!
//! [retrieval]
//! top_k = 8
//! ```
//!
//! Every section except at least one corpus is optional. Relative corpus
//! roots are resolved against the directory holding the config file.

use anyhow::{bail, Context, Result};
use docs_harness_core::chunk::ChunkConfig;
use docs_harness_core::confidence::ConfidenceThresholds;
use docs_harness_core::identity::{IdentityPolicy, DEFAULT_PAGE_MARKER};
use docs_harness_core::ingest::IngestOptions;
use docs_harness_core::models::Corpus;
use docs_harness_core::search::ScoreWeights;
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub corpora: CorporaConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub confidence: ConfidenceThresholds,
}

fn default_workspace() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorporaConfig {
    pub docs: Option<DocsCorpusConfig>,
    pub kb: Option<KbCorpusConfig>,
}

/// Routed corpus: one page per folder, marked by `page_marker`.
#[derive(Debug, Deserialize, Clone)]
pub struct DocsCorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_page_marker")]
    pub page_marker: String,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_page_marker() -> String {
    DEFAULT_PAGE_MARKER.to_string()
}

/// Path-addressed corpus: every file with an accepted extension.
#[derive(Debug, Deserialize, Clone)]
pub struct KbCorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            weights: ScoreWeights::default(),
        }
    }
}

fn default_top_k() -> usize {
    8
}

/// Root directory and exclusions of one configured corpus.
#[derive(Debug, Clone)]
pub struct CorpusSource<'a> {
    pub corpus: Corpus,
    pub root: &'a Path,
    pub exclude_globs: &'a [String],
}

impl Config {
    /// Identity and chunking settings shared by both corpora.
    pub fn ingest_options(&self) -> IngestOptions {
        let mut policy = IdentityPolicy::default();
        if let Some(docs) = &self.corpora.docs {
            policy.page_marker = docs.page_marker.clone();
        }
        if let Some(kb) = &self.corpora.kb {
            policy.kb_extensions = kb
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        IngestOptions {
            policy,
            chunking: self.chunking,
        }
    }

    /// Configured corpora, routed first, optionally limited to one.
    pub fn sources(&self, only: Option<Corpus>) -> Vec<CorpusSource<'_>> {
        let mut out = Vec::new();
        if let Some(docs) = &self.corpora.docs {
            out.push(CorpusSource {
                corpus: Corpus::Docs,
                root: &docs.root,
                exclude_globs: &docs.exclude_globs,
            });
        }
        if let Some(kb) = &self.corpora.kb {
            out.push(CorpusSource {
                corpus: Corpus::Kb,
                root: &kb.root,
                exclude_globs: &kb.exclude_globs,
            });
        }
        out.retain(|s| only.map_or(true, |c| s.corpus == c));
        out
    }

    fn resolve_roots(&mut self, base: &Path) {
        if let Some(docs) = self.corpora.docs.as_mut() {
            docs.root = resolve(base, &docs.root);
        }
        if let Some(kb) = self.corpora.kb.as_mut() {
            kb.root = resolve(base, &kb.root);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace.trim().is_empty() {
            bail!("workspace must not be empty");
        }

        // Validate chunking
        if self.chunking.max_chars == 0 {
            bail!("chunking.max_chars must be > 0");
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            bail!(
                "chunking.overlap_chars ({}) must be < chunking.max_chars ({})",
                self.chunking.overlap_chars,
                self.chunking.max_chars
            );
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        let w = &self.retrieval.weights;
        for (name, value) in [
            ("content_term", w.content_term),
            ("heading_term", w.heading_term),
            ("phrase_heading", w.phrase_heading),
            ("phrase_content", w.phrase_content),
            ("proximity_bonus", w.proximity_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("retrieval.weights.{} must be a finite, non-negative number", name);
            }
        }

        // Validate confidence
        let c = &self.confidence;
        for (name, value) in [
            ("low_gap", c.low_gap),
            ("low_top_score", c.low_top_score),
            ("high_gap", c.high_gap),
            ("high_top_score", c.high_top_score),
        ] {
            if !value.is_finite() {
                bail!("confidence.{} must be a finite number", name);
            }
        }
        if c.low_gap > c.high_gap {
            bail!("confidence.low_gap must be <= confidence.high_gap");
        }
        if c.low_top_score > c.high_top_score {
            bail!("confidence.low_top_score must be <= confidence.high_top_score");
        }

        // Validate corpora
        if self.corpora.docs.is_none() && self.corpora.kb.is_none() {
            bail!("at least one of [corpora.docs] or [corpora.kb] must be configured");
        }
        if let Some(docs) = &self.corpora.docs {
            if docs.page_marker.trim().is_empty() {
                bail!("corpora.docs.page_marker must not be empty");
            }
            check_globs("corpora.docs.exclude_globs", &docs.exclude_globs)?;
        }
        if let Some(kb) = &self.corpora.kb {
            if kb.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
                bail!("corpora.kb.extensions must list at least one extension");
            }
            check_globs("corpora.kb.exclude_globs", &kb.exclude_globs)?;
        }

        Ok(())
    }
}

fn resolve(base: &Path, root: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        base.join(root)
    }
}

fn check_globs(field: &str, patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        Glob::new(pattern).with_context(|| format!("{}: invalid glob '{}'", field, pattern))?;
    }
    Ok(())
}

/// Parse config text; relative roots resolve against `base_dir`.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.resolve_roots(base_dir);
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&content, base_dir)
}
