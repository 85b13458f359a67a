//! Heading anchors compatible with GitHub-style slugging.
//!
//! A slug is the lowercased heading with every character outside
//! `[a-z0-9 -]` removed and each remaining space turned into a hyphen.
//! Punctuation vanishes rather than being replaced, so `"Limits & Retries"`
//! becomes `"limits--retries"`.
//!
//! Duplicate handling is stateful: a [`SlugSession`] remembers every slug
//! it has handed out and suffixes repeats with `-1`, `-2`, … A session
//! belongs to exactly one document's chunking pass.
//!
//! # Example
//!
//! ```rust
//! use docs_harness_core::anchor::SlugSession;
//!
//! let mut session = SlugSession::new();
//! assert_eq!(session.slug("Setup"), "setup");
//! assert_eq!(session.slug("Setup"), "setup-1");
//! ```

use std::collections::HashMap;

/// Slug a heading without duplicate tracking.
pub fn generate_anchor(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => Some(c),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect()
}

/// Slug a sequence of headings within one fresh session.
pub fn generate_anchors<S: AsRef<str>>(headings: &[S]) -> Vec<String> {
    let mut session = SlugSession::new();
    headings.iter().map(|h| session.slug(h.as_ref())).collect()
}

/// Per-document duplicate tracker.
#[derive(Debug, Default)]
pub struct SlugSession {
    occurrences: HashMap<String, usize>,
}

impl SlugSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug `text`, disambiguating against every slug issued so far.
    pub fn slug(&mut self, text: &str) -> String {
        let original = generate_anchor(text);
        let mut result = original.clone();

        while self.occurrences.contains_key(&result) {
            let count = self.occurrences.entry(original.clone()).or_insert(0);
            *count += 1;
            result = format!("{}-{}", original, count);
        }

        self.occurrences.insert(result.clone(), 0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_get_suffixes() {
        assert_eq!(
            generate_anchors(&["Setup", "Setup", "Setup"]),
            vec!["setup", "setup-1", "setup-2"]
        );
    }

    #[test]
    fn test_punctuation_vanishes() {
        assert_eq!(generate_anchor("Limits & Retries"), "limits--retries");
        assert_eq!(generate_anchor("What's new?"), "whats-new");
        assert_eq!(generate_anchor("v2.0 (beta)"), "v20-beta");
    }

    #[test]
    fn test_spaces_are_not_collapsed() {
        assert_eq!(generate_anchor("a  b"), "a--b");
    }

    #[test]
    fn test_existing_hyphens_kept() {
        assert_eq!(generate_anchor("Sign-in flow"), "sign-in-flow");
    }

    #[test]
    fn test_suffixed_slug_collides_with_literal_heading() {
        let mut session = SlugSession::new();
        assert_eq!(session.slug("Foo"), "foo");
        assert_eq!(session.slug("Foo 1"), "foo-1");
        assert_eq!(session.slug("Foo"), "foo-2");
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = SlugSession::new();
        first.slug("Intro");
        let mut second = SlugSession::new();
        assert_eq!(second.slug("Intro"), "intro");
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(generate_anchor("Café Setup"), "caf-setup");
        assert_eq!(generate_anchor("!!!"), "");
    }
}
