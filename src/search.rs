//! `dh search` and `dh tokenize`.
//!
//! Search builds a fresh index of the configured corpora, ranks every
//! passage against the tokenized query and prints the top results with
//! their citation links, followed by the confidence report.

use anyhow::Result;
use docs_harness_core::confidence::{estimate_confidence, ConfidenceReport};
use docs_harness_core::models::Corpus;
use docs_harness_core::search::{rank, rank_explained, ScoreBreakdown};
use docs_harness_core::store::Store;
use docs_harness_core::tokenize::{tokenize, TokenizedQuery};
use serde::Serialize;

use crate::config::Config;
use crate::ingest::build_index;

const SNIPPET_CHARS: usize = 240;

/// One ranked passage as printed or serialized.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f64,
    pub corpus: Corpus,
    pub title: String,
    pub link: String,
    pub heading_path: Vec<String>,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub tokens: TokenizedQuery,
    pub results: Vec<SearchHit>,
    pub confidence: ConfidenceReport,
}

/// Index, rank and classify without printing.
pub async fn search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    corpus: Option<Corpus>,
    explain: bool,
) -> Result<SearchOutput> {
    let store = build_index(config, corpus).await?;
    let tokens = tokenize(query);
    let candidates = store.candidates(&config.workspace, corpus).await?;
    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let weights = &config.retrieval.weights;

    let ranked = if explain {
        rank_explained(candidates, &tokens, top_k, weights)
    } else {
        rank(candidates, &tokens, top_k, weights)
    };
    let confidence = estimate_confidence(&ranked, &config.confidence);

    let results = ranked
        .into_iter()
        .enumerate()
        .map(|(i, r)| SearchHit {
            rank: i + 1,
            score: r.score,
            corpus: r.candidate.citation.corpus(),
            title: r.candidate.citation.title().to_string(),
            link: r.candidate.citation.link(),
            heading_path: r.candidate.heading_path,
            snippet: snippet(&r.candidate.content),
            explain: r.explain,
        })
        .collect();

    Ok(SearchOutput {
        query: query.to_string(),
        tokens,
        results,
        confidence,
    })
}

pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    corpus: Option<Corpus>,
    explain: bool,
    json: bool,
) -> Result<()> {
    let output = search(config, query, limit, corpus, explain).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.results.is_empty() {
        println!("No results.");
    }

    for hit in &output.results {
        let heading = if hit.heading_path.is_empty() {
            hit.title.clone()
        } else {
            hit.heading_path.join(" > ")
        };
        println!("{}. [{:.2}] {} / {}", hit.rank, hit.score, hit.corpus, heading);
        println!("    link: {}", hit.link);
        println!("    excerpt: \"{}\"", hit.snippet);
        if let Some(b) = &hit.explain {
            println!(
                "    explain: content={:.2} heading={:.2} phrase={:.2} proximity={:.2} raw={:.2} length={:.3}",
                b.content, b.heading, b.phrase, b.proximity, b.raw, b.length_factor
            );
        }
        println!();
    }

    let c = &output.confidence;
    println!("confidence: {} (answer mode: {})", c.level, c.answer_mode);
    println!(
        "  top: {:.2}  second: {:.2}  gap: {:.2}  avg top3: {:.2}",
        c.signals.top_score, c.signals.second_score, c.signals.score_gap, c.signals.avg_top3
    );
    println!(
        "  results: {} (docs {}, kb {})  top is docs: {}",
        c.signals.result_count, c.signals.docs_count, c.signals.kb_count, c.signals.top_is_docs
    );
    Ok(())
}

pub fn run_tokenize(query: &str, json: bool) -> Result<()> {
    let tokens = tokenize(query);
    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }
    let terms: Vec<&str> = tokens.terms.iter().map(String::as_str).collect();
    println!("terms: {}", terms.join(", "));
    println!("phrases: {}", tokens.phrases.join(" | "));
    Ok(())
}

fn snippet(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_flattens_and_truncates() {
        assert_eq!(snippet("a\n\nb   c"), "a b c");
        let long = "word ".repeat(100);
        let s = snippet(&long);
        assert!(s.ends_with('…'));
        assert!(s.chars().count() <= SNIPPET_CHARS + 1);
    }
}
