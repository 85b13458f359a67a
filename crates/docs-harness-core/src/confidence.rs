//! Confidence signals over a ranked result set.
//!
//! Classification, evaluated in order:
//!
//! 1. no results → `low`
//! 2. `gap < low_gap` and `top < low_top_score` → `low`
//! 3. `gap > high_gap` or `top > high_top_score` → `high`
//! 4. otherwise → `medium`
//!
//! `low` maps to [`AnswerMode::Escalate`]; the caller decides what that means.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Corpus;
use crate::search::{Passage, ScoredCandidate};

/// Named classification cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub low_gap: f64,
    pub low_top_score: f64,
    pub high_gap: f64,
    pub high_top_score: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            low_gap: 1.0,
            low_top_score: 2.0,
            high_gap: 5.0,
            high_top_score: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn answer_mode(self) -> AnswerMode {
        match self {
            ConfidenceLevel::High | ConfidenceLevel::Medium => AnswerMode::Direct,
            ConfidenceLevel::Low => AnswerMode::Escalate,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        })
    }
}

/// Answer directly, or draft for human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Direct,
    Escalate,
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnswerMode::Direct => "direct",
            AnswerMode::Escalate => "escalate",
        })
    }
}

/// Signals derived from one ranked result list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceSignals {
    pub top_score: f64,
    pub second_score: f64,
    /// `top_score - second_score`; equals `top_score` with fewer than two results.
    pub score_gap: f64,
    pub docs_count: usize,
    pub kb_count: usize,
    pub top_is_docs: bool,
    pub result_count: usize,
    /// Mean of the first (up to) three scores.
    pub avg_top3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceReport {
    pub level: ConfidenceLevel,
    pub answer_mode: AnswerMode,
    pub signals: ConfidenceSignals,
}

/// Compute signals from results already sorted by descending score.
pub fn compute_signals<T: Passage>(results: &[ScoredCandidate<T>]) -> ConfidenceSignals {
    let top_score = results.first().map(|r| r.score).unwrap_or(0.0);
    let second_score = results.get(1).map(|r| r.score).unwrap_or(0.0);
    let docs_count = results
        .iter()
        .filter(|r| r.candidate.corpus() == Corpus::Docs)
        .count();
    let top3 = &results[..results.len().min(3)];
    let avg_top3 = if top3.is_empty() {
        0.0
    } else {
        top3.iter().map(|r| r.score).sum::<f64>() / top3.len() as f64
    };

    ConfidenceSignals {
        top_score,
        second_score,
        score_gap: top_score - second_score,
        docs_count,
        kb_count: results.len() - docs_count,
        top_is_docs: results
            .first()
            .map(|r| r.candidate.corpus() == Corpus::Docs)
            .unwrap_or(false),
        result_count: results.len(),
        avg_top3,
    }
}

/// Apply the thresholds to a set of signals.
pub fn classify(signals: &ConfidenceSignals, thresholds: &ConfidenceThresholds) -> ConfidenceLevel {
    if signals.result_count == 0 {
        ConfidenceLevel::Low
    } else if signals.score_gap < thresholds.low_gap && signals.top_score < thresholds.low_top_score {
        ConfidenceLevel::Low
    } else if signals.score_gap > thresholds.high_gap || signals.top_score > thresholds.high_top_score {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::Medium
    }
}

pub fn estimate_confidence<T: Passage>(
    results: &[ScoredCandidate<T>],
    thresholds: &ConfidenceThresholds,
) -> ConfidenceReport {
    let signals = compute_signals(results);
    let level = classify(&signals, thresholds);
    tracing::debug!(
        level = %level,
        top = signals.top_score,
        gap = signals.score_gap,
        results = signals.result_count,
        "confidence estimated"
    );
    ConfidenceReport {
        level,
        answer_mode: level.answer_mode(),
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct P(Corpus);

    impl Passage for P {
        fn content(&self) -> &str {
            ""
        }
        fn heading_path(&self) -> &[String] {
            &[]
        }
        fn corpus(&self) -> Corpus {
            self.0
        }
    }

    fn results(scores: &[(f64, Corpus)]) -> Vec<ScoredCandidate<P>> {
        scores
            .iter()
            .map(|&(score, corpus)| ScoredCandidate {
                candidate: P(corpus),
                score,
                explain: None,
            })
            .collect()
    }

    #[test]
    fn test_empty_is_low() {
        let report = estimate_confidence::<P>(&[], &ConfidenceThresholds::default());
        assert_eq!(report.level, ConfidenceLevel::Low);
        assert_eq!(report.answer_mode, AnswerMode::Escalate);
        assert_eq!(report.signals.top_score, 0.0);
        assert_eq!(report.signals.result_count, 0);
        assert!(!report.signals.top_is_docs);
    }

    #[test]
    fn test_single_dominant_is_high() {
        let r = results(&[(20.0, Corpus::Docs)]);
        let report = estimate_confidence(&r, &ConfidenceThresholds::default());
        assert_eq!(report.signals.score_gap, 20.0);
        assert_eq!(report.signals.second_score, 0.0);
        assert_eq!(report.level, ConfidenceLevel::High);
        assert_eq!(report.answer_mode, AnswerMode::Direct);
    }

    #[test]
    fn test_weak_and_flat_is_low() {
        let r = results(&[(1.5, Corpus::Kb), (1.2, Corpus::Kb)]);
        let report = estimate_confidence(&r, &ConfidenceThresholds::default());
        assert_eq!(report.level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_middle_is_medium() {
        let r = results(&[(6.0, Corpus::Docs), (4.0, Corpus::Kb), (3.0, Corpus::Docs)]);
        let report = estimate_confidence(&r, &ConfidenceThresholds::default());
        assert_eq!(report.level, ConfidenceLevel::Medium);
        assert_eq!(report.answer_mode, AnswerMode::Direct);
    }

    #[test]
    fn test_signals() {
        let r = results(&[
            (9.0, Corpus::Kb),
            (6.0, Corpus::Docs),
            (3.0, Corpus::Docs),
            (1.0, Corpus::Kb),
        ]);
        let s = compute_signals(&r);
        assert_eq!(s.top_score, 9.0);
        assert_eq!(s.second_score, 6.0);
        assert_eq!(s.score_gap, 3.0);
        assert_eq!(s.docs_count, 2);
        assert_eq!(s.kb_count, 2);
        assert!(!s.top_is_docs);
        assert_eq!(s.result_count, 4);
        assert_eq!(s.avg_top3, 6.0);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let r = results(&[(6.0, Corpus::Docs), (4.0, Corpus::Docs)]);
        let strict = ConfidenceThresholds {
            low_gap: 3.0,
            low_top_score: 10.0,
            ..ConfidenceThresholds::default()
        };
        assert_eq!(estimate_confidence(&r, &strict).level, ConfidenceLevel::Low);

        let lenient = ConfidenceThresholds {
            high_gap: 1.0,
            ..ConfidenceThresholds::default()
        };
        assert_eq!(estimate_confidence(&r, &lenient).level, ConfidenceLevel::High);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        let t = ConfidenceThresholds::default();
        // gap == high_gap is not above it
        let r = results(&[(5.0, Corpus::Docs)]);
        assert_eq!(estimate_confidence(&r, &t).level, ConfidenceLevel::Medium);
        // gap == low_gap is not below it
        let r = results(&[(1.5, Corpus::Docs), (0.5, Corpus::Docs)]);
        assert_eq!(estimate_confidence(&r, &t).level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ConfidenceLevel::Medium).unwrap(), "medium");
        assert_eq!(ConfidenceLevel::High.to_string(), "high");
    }
}
