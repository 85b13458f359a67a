//! Heading-bounded chunker with overlapping windows for long sections.
//!
//! Normalized text is cut into sections at second-level heading lines
//! (`## `). Deeper headings never start a section. Text before the first
//! section heading forms a headingless preamble, dropped when empty.
//!
//! A section that fits in `max_chars` becomes one chunk. A longer one is
//! split by a sliding window of `max_chars` bytes that prefers to end at:
//!
//! 1. the last blank line past the window's first half,
//! 2. else the last `". "` or newline past the half-point,
//! 3. else the raw window edge.
//!
//! The next window starts `overlap_chars` before the previous end, or at
//! the end itself if that would not move forward. All windows of one
//! section share its heading path and anchor; `chunk_index` runs across
//! the whole document.
//!
//! # Example
//!
//! ```rust
//! use docs_harness_core::chunk::{chunk_docs_content, ChunkConfig};
//!
//! let text = "# Guide\n\nIntro.\n\n## Setup\n\nInstall it.";
//! let chunks = chunk_docs_content(text, Some("Guide"), &ChunkConfig::default());
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].heading_path, vec!["Guide", "Setup"]);
//! assert_eq!(chunks[1].anchor.as_deref(), Some("setup"));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::anchor::SlugSession;
use crate::models::Chunk;

/// Window sizes, in bytes of UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            overlap_chars: 400,
        }
    }
}

/// One `## ` section (or the preamble), trimmed, heading line included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub heading: Option<&'a str>,
    pub content: &'a str,
}

/// Split normalized text at second-level heading lines outside code fences.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current_start = 0;
    let mut current_heading: Option<&str> = None;
    let mut fence: Option<(char, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_end_matches(['\n', '\r']);

        if let Some(open) = fence {
            if closes_fence(trimmed, open) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = opens_fence(trimmed) {
            fence = Some(open);
            continue;
        }

        if let Some(heading) = trimmed.strip_prefix("## ") {
            push_section(&mut sections, current_heading, &text[current_start..line_start]);
            current_start = line_start;
            current_heading = Some(heading.trim());
        }
    }
    push_section(&mut sections, current_heading, &text[current_start..]);

    sections
}

fn push_section<'a>(sections: &mut Vec<Section<'a>>, heading: Option<&'a str>, raw: &'a str) {
    let content = raw.trim();
    if heading.is_none() && content.is_empty() {
        return;
    }
    sections.push(Section { heading, content });
}

fn opens_fence(line: &str) -> Option<(char, usize)> {
    let marker = line.trim_start().chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let run = line.trim_start().chars().take_while(|&c| c == marker).count();
    (run >= 3).then_some((marker, run))
}

fn closes_fence(line: &str, (marker, len): (char, usize)) -> bool {
    let t = line.trim();
    t.chars().count() >= len && t.chars().all(|c| c == marker)
}

/// Chunk one normalized document.
///
/// `first_heading` becomes the first heading-path entry of every chunk.
/// Anchors are only produced when `include_anchors` is set, and only for
/// sections whose heading slugs to something non-empty.
pub fn chunk_document(
    text: &str,
    first_heading: Option<&str>,
    config: &ChunkConfig,
    include_anchors: bool,
) -> Vec<Chunk> {
    let mut session = SlugSession::new();
    let mut chunks = Vec::new();
    let title = first_heading.map(str::trim).filter(|h| !h.is_empty());

    for section in split_sections(text) {
        let heading_path: Vec<String> = title
            .into_iter()
            .chain(section.heading.filter(|h| !h.is_empty()))
            .map(str::to_string)
            .collect();

        let anchor = if include_anchors {
            section
                .heading
                .map(|h| session.slug(h))
                .filter(|slug| !slug.is_empty())
        } else {
            None
        };

        if section.content.len() <= config.max_chars {
            chunks.push(Chunk {
                chunk_index: chunks.len(),
                heading_path,
                anchor,
                content: section.content.to_string(),
            });
            continue;
        }

        for range in split_windows(section.content, config) {
            let piece = section.content[range].trim();
            if piece.is_empty() {
                continue;
            }
            chunks.push(Chunk {
                chunk_index: chunks.len(),
                heading_path: heading_path.clone(),
                anchor: anchor.clone(),
                content: piece.to_string(),
            });
        }
    }

    chunks
}

/// Routed-corpus chunking: anchors on.
pub fn chunk_docs_content(text: &str, first_heading: Option<&str>, config: &ChunkConfig) -> Vec<Chunk> {
    chunk_document(text, first_heading, config, true)
}

/// Path-addressed chunking: anchors always `None`.
pub fn chunk_kb_content(text: &str, first_heading: Option<&str>, config: &ChunkConfig) -> Vec<Chunk> {
    chunk_document(text, first_heading, config, false)
}

/// Byte ranges of the overlapping windows covering `text`.
///
/// Every range starts at or before the previous range's end and ends
/// strictly after it; the last range ends at `text.len()`.
pub fn split_windows(text: &str, config: &ChunkConfig) -> Vec<Range<usize>> {
    let len = text.len();
    let max = config.max_chars.max(1);
    let mut ranges = Vec::new();
    if len == 0 {
        return ranges;
    }

    let mut start: usize = 0;
    let mut prev_end: usize = 0;
    loop {
        let mut end = snap_to_char_boundary(text, start.saturating_add(max).min(len));

        if end < len {
            let window = &text[start..end];
            // a break must land past the half-point and past what is already covered
            let floor = (window.len() / 2).max(prev_end.saturating_sub(start));
            if let Some(p) = window.rfind("\n\n").filter(|&p| p > floor) {
                end = start + p;
            } else if let Some(p) = last_sentence_break(window).filter(|&p| p > floor) {
                end = start + p + 1;
            }
        }

        if end <= start {
            end = next_char_boundary(text, start);
        }

        ranges.push(start..end);
        if end >= len {
            break;
        }

        let next = snap_to_char_boundary(text, end.saturating_sub(config.overlap_chars));
        prev_end = end;
        start = if next > start { next } else { end };
    }

    ranges
}

fn last_sentence_break(window: &str) -> Option<usize> {
    match (window.rfind(". "), window.rfind('\n')) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(s: &str, index: usize) -> usize {
    s[index..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| index + i)
        .unwrap_or(s.len())
}
