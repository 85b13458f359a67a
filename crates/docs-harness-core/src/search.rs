//! Lexical scorer and ranker.
//!
//! The scorer operates on a single passage (content plus heading path)
//! against a [`TokenizedQuery`]. The ranker scores every candidate the
//! caller hands it; it never fetches anything itself.
//!
//! # Scoring Algorithm
//!
//! With lowercased content `c` and lowercased heading path `h` (entries
//! joined by `" > "`):
//!
//! 1. **Content**: Σ over terms of occurrences in `c` × `content_term`.
//! 2. **Heading**: Σ over terms contained in `h` of `heading_term`
//!    (once per term, not per occurrence).
//! 3. **Phrase**: Σ over phrases of `phrase_heading` if `h` contains it,
//!    plus occurrences in `c` × `phrase_content`.
//! 4. **Proximity**: `proximity_bonus` for every distinct pair of
//!    occurrence offsets of two different matched terms that lie within
//!    `proximity_window` bytes of each other.
//! 5. **Length normalization**: the raw sum is divided by
//!    `sqrt(max(chars(c), 100) / 1000)`.
//!
//! A raw sum of zero stays exactly zero.
//!
//! # Ranking
//!
//! Empty term set → empty result. Otherwise score all candidates, drop
//! scores ≤ 0, stable-sort descending (ties keep input order), truncate
//! to `top_k`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::Corpus;
use crate::tokenize::TokenizedQuery;

/// Floor on content length used by length normalization.
const LENGTH_FLOOR: f64 = 100.0;
/// Length at which normalization is neutral.
const LENGTH_PIVOT: f64 = 1000.0;

/// Weights of the scoring factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub content_term: f64,
    pub heading_term: f64,
    pub phrase_heading: f64,
    pub phrase_content: f64,
    pub proximity_bonus: f64,
    /// Maximum byte distance between two occurrences earning a bonus.
    pub proximity_window: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            content_term: 1.0,
            heading_term: 3.0,
            phrase_heading: 5.0,
            phrase_content: 4.0,
            proximity_bonus: 0.5,
            proximity_window: 30,
        }
    }
}

/// Per-factor contributions to a passage's score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub content: f64,
    pub heading: f64,
    pub phrase: f64,
    pub proximity: f64,
    /// Sum of the four factors before length normalization.
    pub raw: f64,
    /// Divisor applied to `raw`.
    pub length_factor: f64,
    pub score: f64,
}

/// Anything the ranker can score.
pub trait Passage {
    fn content(&self) -> &str;
    fn heading_path(&self) -> &[String];
    fn corpus(&self) -> Corpus;
}

/// A passage with its (positive) score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate<T> {
    pub candidate: T,
    pub score: f64,
    /// Populated by [`rank_explained`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreBreakdown>,
}

/// Score one passage, returning every factor.
pub fn score_breakdown(
    content: &str,
    heading_path: &[String],
    query: &TokenizedQuery,
    weights: &ScoreWeights,
) -> ScoreBreakdown {
    let content_lower = content.to_lowercase();
    let heading_lower = heading_path.join(" > ").to_lowercase();

    let mut breakdown = ScoreBreakdown::default();
    let mut matched: Vec<Vec<usize>> = Vec::new();

    for term in &query.terms {
        let positions = occurrences(&content_lower, term);
        breakdown.content += positions.len() as f64 * weights.content_term;
        if heading_lower.contains(term.as_str()) {
            breakdown.heading += weights.heading_term;
        }
        if !positions.is_empty() {
            matched.push(positions);
        }
    }

    for phrase in &query.phrases {
        if heading_lower.contains(phrase.as_str()) {
            breakdown.phrase += weights.phrase_heading;
        }
        breakdown.phrase += count_occurrences(&content_lower, phrase) as f64 * weights.phrase_content;
    }

    breakdown.proximity =
        proximity_pairs(&matched, weights.proximity_window) as f64 * weights.proximity_bonus;

    breakdown.raw = breakdown.content + breakdown.heading + breakdown.phrase + breakdown.proximity;
    breakdown.length_factor = length_factor(content);
    breakdown.score = if breakdown.raw == 0.0 {
        0.0
    } else {
        breakdown.raw / breakdown.length_factor
    };
    breakdown
}

/// Score one passage.
pub fn score(
    content: &str,
    heading_path: &[String],
    query: &TokenizedQuery,
    weights: &ScoreWeights,
) -> f64 {
    score_breakdown(content, heading_path, query, weights).score
}

/// Rank candidates and keep the best `top_k`.
pub fn rank<T: Passage>(
    candidates: impl IntoIterator<Item = T>,
    query: &TokenizedQuery,
    top_k: usize,
    weights: &ScoreWeights,
) -> Vec<ScoredCandidate<T>> {
    rank_inner(candidates, query, top_k, weights, false)
}

/// Like [`rank`], with a [`ScoreBreakdown`] attached to every result.
pub fn rank_explained<T: Passage>(
    candidates: impl IntoIterator<Item = T>,
    query: &TokenizedQuery,
    top_k: usize,
    weights: &ScoreWeights,
) -> Vec<ScoredCandidate<T>> {
    rank_inner(candidates, query, top_k, weights, true)
}

fn rank_inner<T: Passage>(
    candidates: impl IntoIterator<Item = T>,
    query: &TokenizedQuery,
    top_k: usize,
    weights: &ScoreWeights,
    explain: bool,
) -> Vec<ScoredCandidate<T>> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredCandidate<T>> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let breakdown =
                score_breakdown(candidate.content(), candidate.heading_path(), query, weights);
            (breakdown.score > 0.0).then(|| ScoredCandidate {
                score: breakdown.score,
                explain: explain.then_some(breakdown),
                candidate,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

/// Non-overlapping, left-to-right byte offsets of `needle` in `haystack`.
fn occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack.match_indices(needle).map(|(i, _)| i).collect()
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Distinct offset pairs, across different terms, within `window`.
fn proximity_pairs(matched: &[Vec<usize>], window: usize) -> usize {
    let mut pairs: HashSet<(usize, usize)> = HashSet::new();
    for (i, a_positions) in matched.iter().enumerate() {
        for b_positions in &matched[i + 1..] {
            for &a in a_positions {
                for &b in b_positions {
                    if a != b && a.abs_diff(b) <= window {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
    }
    pairs.len()
}

fn length_factor(content: &str) -> f64 {
    let chars = content.chars().count() as f64;
    (chars.max(LENGTH_FLOOR) / LENGTH_PIVOT).sqrt()
}
