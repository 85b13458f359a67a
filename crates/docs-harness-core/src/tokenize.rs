//! Query tokenization: phrases, stopwords, plural folding, synonyms.
//!
//! A raw query becomes a [`TokenizedQuery`]:
//!
//! 1. Double-quoted spans are pulled out as phrases (lowercased, trimmed,
//!    empty ones dropped) and removed from the text.
//! 2. The remainder is lowercased and split on runs of non-word characters.
//! 3. Tokens of length ≤ 1 and stopwords are dropped.
//! 4. Each token is plural-folded; both the folded and original forms
//!    become terms.
//! 5. One hop of synonyms of the folded form is added.
//!
//! # Example
//!
//! ```rust
//! use docs_harness_core::tokenize::tokenize;
//!
//! let q = tokenize(r#"How do I configure "rate limit" retries?"#);
//! assert_eq!(q.phrases, vec!["rate limit"]);
//! assert!(q.terms.contains("retry"));
//! assert!(q.terms.contains("retries"));
//! assert!(!q.terms.contains("how"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Deduplicated terms plus quoted phrases of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenizedQuery {
    pub terms: BTreeSet<String>,
    pub phrases: Vec<String>,
}

impl TokenizedQuery {
    /// No terms means nothing to rank against, regardless of phrases.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

static PHRASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("phrase regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does",
        "for", "from", "get", "has", "have", "how", "if", "in", "into", "is", "it", "its", "me",
        "my", "of", "on", "or", "should", "so", "than", "that", "the", "their", "then", "there",
        "these", "this", "to", "was", "we", "what", "when", "where", "which", "who", "why",
        "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Synonym pairs; lookups go both ways.
const SYNONYM_PAIRS: &[(&str, &str)] = &[
    ("auth", "authentication"),
    ("login", "signin"),
    ("api", "endpoint"),
    ("key", "token"),
    ("webhook", "callback"),
    ("error", "failure"),
    ("delete", "remove"),
    ("create", "add"),
    ("config", "configuration"),
    ("setting", "configuration"),
    ("limit", "quota"),
    ("retry", "backoff"),
    ("billing", "payment"),
    ("invoice", "bill"),
    ("user", "account"),
    ("install", "setup"),
    ("doc", "documentation"),
    ("cancel", "terminate"),
    ("update", "modify"),
    ("permission", "role"),
    ("org", "organization"),
    ("team", "workspace"),
    ("sdk", "library"),
    ("rate", "throttle"),
];

static SYNONYMS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for &(a, b) in SYNONYM_PAIRS {
        map.entry(a).or_default().push(b);
        map.entry(b).or_default().push(a);
    }
    map
});

/// Tokenize a raw query.
pub fn tokenize(query: &str) -> TokenizedQuery {
    let phrases: Vec<String> = PHRASE_RE
        .captures_iter(query)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    let remainder = PHRASE_RE.replace_all(query, " ").to_lowercase();

    let mut terms = BTreeSet::new();
    for token in remainder
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !STOPWORDS.contains(t))
    {
        let folded = normalize_plural(token);
        if let Some(synonyms) = SYNONYMS.get(folded.as_str()) {
            terms.extend(synonyms.iter().map(|s| s.to_string()));
        }
        if folded != token {
            terms.insert(token.to_string());
        }
        terms.insert(folded);
    }

    TokenizedQuery { terms, phrases }
}

/// Fold a plural to its singular with a few ordered suffix rules.
pub fn normalize_plural(word: &str) -> String {
    let len = word.chars().count();
    if len > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    if len > 3 {
        if let Some(stem) = word.strip_suffix("es") {
            if ["s", "x", "z", "ch", "sh"].iter().any(|s| stem.ends_with(s)) {
                return stem.to_string();
            }
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(q: &TokenizedQuery) -> Vec<&str> {
        q.terms.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_plural_rules() {
        assert_eq!(normalize_plural("retries"), "retry");
        assert_eq!(normalize_plural("ties"), "tie");
        assert_eq!(normalize_plural("boxes"), "box");
        assert_eq!(normalize_plural("matches"), "match");
        assert_eq!(normalize_plural("hashes"), "hash");
        assert_eq!(normalize_plural("notes"), "note");
        assert_eq!(normalize_plural("webhooks"), "webhook");
        assert_eq!(normalize_plural("access"), "access");
        assert_eq!(normalize_plural("data"), "data");
    }

    #[test]
    fn test_stopwords_and_short_tokens_dropped() {
        let q = tokenize("How do I get a token?");
        assert_eq!(terms(&q), vec!["key", "token"]);
    }

    #[test]
    fn test_original_and_folded_forms() {
        let q = tokenize("invoices");
        assert!(q.terms.contains("invoice"));
        assert!(q.terms.contains("invoices"));
        assert!(q.terms.contains("bill"));
    }

    #[test]
    fn test_synonyms_are_bidirectional() {
        assert!(tokenize("authentication").terms.contains("auth"));
        assert!(tokenize("auth").terms.contains("authentication"));
        let q = tokenize("configuration");
        assert!(q.terms.contains("config"));
        assert!(q.terms.contains("setting"));
    }

    #[test]
    fn test_synonyms_are_one_hop() {
        // setting -> configuration, but not configuration -> config
        let q = tokenize("settings");
        assert!(q.terms.contains("configuration"));
        assert!(!q.terms.contains("config"));
    }

    #[test]
    fn test_phrases_extracted_and_removed() {
        let q = tokenize(r#"handling "Rate Limit" "" errors"#);
        assert_eq!(q.phrases, vec!["rate limit"]);
        assert!(!q.terms.contains("rate"));
        assert!(q.terms.contains("errors"));
        assert!(q.terms.contains("error"));
        assert!(q.terms.contains("handling"));
    }

    #[test]
    fn test_split_on_non_word_runs() {
        let q = tokenize("x-api-key/rotate_now!!");
        assert!(q.terms.contains("api"));
        assert!(q.terms.contains("rotate_now"));
        assert!(!q.terms.contains("x"));
    }

    #[test]
    fn test_empty_query() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("the of and a").is_empty());
        assert!(tokenize(r#""only a phrase""#).is_empty());
    }

    #[test]
    fn test_unrelated_terms_pass_through() {
        let q = tokenize("completely unrelated xyz123");
        assert_eq!(terms(&q), vec!["completely", "unrelated", "xyz123"]);
    }
}
