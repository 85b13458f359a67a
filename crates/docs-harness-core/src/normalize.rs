//! Structural normalization of Markdown and MDX documents.
//!
//! A document is split into an optional YAML front-matter block and a
//! body. The body is parsed into a flat sequence of [`Block`]s, and each
//! block is rendered back to text:
//!
//! | Block | Rendered as |
//! |-------|-------------|
//! | heading | `"#" × level` + space + text |
//! | fenced / indented code | a backtick fence with the language tag, body verbatim |
//! | paragraph, quote, list, table | plain text, inline markup stripped |
//! | thematic break | dropped |
//! | component (MDX only) | dropped |
//!
//! Rendered blocks are joined with a blank line. The output is stable
//! under re-normalization up to whitespace, so the chunker can rely on
//! heading lines and code fences surviving intact.
//!
//! The two [`Dialect`]s share every rule. MDX additionally recognizes
//! ESM statements, JSX elements and `{expression}` blocks; all of them
//! become [`Block::Component`] and render to nothing.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::NormalizeError;

/// Markup flavor of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Markdown,
    Mdx,
}

impl Dialect {
    /// `.mdx` files are MDX; everything else is plain Markdown.
    pub fn for_path(path: &str) -> Self {
        let is_mdx = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mdx"))
            .unwrap_or(false);
        if is_mdx {
            Dialect::Mdx
        } else {
            Dialect::Markdown
        }
    }

    /// Whether a block kind can occur in this dialect.
    pub fn allows(self, block: &Block) -> bool {
        !matches!((self, block), (Dialect::Markdown, Block::Component))
    }
}

/// Block-level node of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Quote(Vec<Block>),
    List(Vec<Vec<Block>>),
    Table(Vec<Vec<String>>),
    Code { lang: Option<String>, body: String },
    ThematicBreak,
    Component,
}

impl Block {
    /// Render this block in normalized form.
    pub fn render(&self) -> String {
        match self {
            Block::Heading { level, text } => {
                format!("{} {}", "#".repeat(*level as usize), text)
            }
            Block::Paragraph(text) => text.clone(),
            Block::Quote(children) => render_nested(children),
            Block::List(items) => items
                .iter()
                .map(|item| render_nested(item))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table(rows) => rows
                .iter()
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Code { lang, body } => render_fence(lang.as_deref(), body),
            Block::ThematicBreak | Block::Component => String::new(),
        }
    }
}

/// Nested content (inside quotes and list items) flattens headings to
/// their text so they never reappear as section markers.
fn render_nested(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| match b {
            Block::Heading { text, .. } => text.clone(),
            other => other.render(),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_fence(lang: Option<&str>, body: &str) -> String {
    let longest_run = body
        .lines()
        .map(|l| l.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let lang = lang.unwrap_or("");
    if body.is_empty() {
        format!("{fence}{lang}\n{fence}")
    } else {
        format!("{fence}{lang}\n{body}\n{fence}")
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedDocument {
    pub frontmatter: Map<String, Value>,
    pub normalized_content: String,
    pub first_heading: Option<String>,
}

impl NormalizedDocument {
    /// The `title` front-matter field, if it is a string.
    pub fn frontmatter_title(&self) -> Option<&str> {
        self.frontmatter.get("title").and_then(Value::as_str)
    }
}

/// Normalize raw bytes, rejecting invalid UTF-8.
pub fn normalize_bytes(raw: &[u8], dialect: Dialect) -> Result<NormalizedDocument, NormalizeError> {
    let text = std::str::from_utf8(raw).map_err(|_| NormalizeError::NotUtf8)?;
    normalize(text, dialect)
}

/// Split front matter, parse the body and render it in normalized form.
pub fn normalize(raw: &str, dialect: Dialect) -> Result<NormalizedDocument, NormalizeError> {
    let (frontmatter, body, line_offset) = split_front_matter(raw)?;
    let blocks = Parser::new(body, dialect, line_offset).parse()?;

    let first_heading = blocks.iter().find_map(|b| match b {
        Block::Heading { level: 1, text } if !text.is_empty() => Some(text.clone()),
        _ => None,
    });

    Ok(NormalizedDocument {
        frontmatter,
        normalized_content: render_blocks(&blocks, dialect),
        first_heading,
    })
}

/// Parse a body (no front matter) into blocks.
pub fn parse_blocks(body: &str, dialect: Dialect) -> Result<Vec<Block>, NormalizeError> {
    Parser::new(body, dialect, 0).parse()
}

/// Join rendered blocks with blank lines, skipping empty renderings.
pub fn render_blocks(blocks: &[Block], dialect: Dialect) -> String {
    blocks
        .iter()
        .filter(|b| dialect.allows(b))
        .map(Block::render)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split a leading `---` YAML block from the body.
///
/// Returns the parsed mapping, the remaining body and the number of lines
/// consumed. A `---` without a closing delimiter is not front matter.
pub fn split_front_matter(
    raw: &str,
) -> Result<(Map<String, Value>, &str, usize), NormalizeError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut lines = raw.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return Ok((Map::new(), raw, 0)),
    }

    let mut offset = raw.find('\n').map(|i| i + 1).unwrap_or(raw.len());
    let yaml_start = offset;
    for (idx, line) in lines.enumerate() {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &raw[yaml_start..offset];
            let body = &raw[offset + line.len()..];
            return Ok((parse_front_matter(yaml)?, body, idx + 2));
        }
        offset += line.len();
    }

    Ok((Map::new(), raw, 0))
}

fn parse_front_matter(yaml: &str) -> Result<Map<String, Value>, NormalizeError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| NormalizeError::FrontMatter(e.to_string()))?;

    match value {
        serde_yaml::Value::Null => Ok(Map::new()),
        serde_yaml::Value::Mapping(_) => match serde_json::to_value(&value) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(NormalizeError::FrontMatter("expected a mapping".to_string())),
            Err(e) => Err(NormalizeError::FrontMatter(e.to_string())),
        },
        _ => Err(NormalizeError::FrontMatter("expected a mapping".to_string())),
    }
}

// ============ Block parser ============

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^( {0,3})([-*+]|(\d{1,9})[.)])(?:([ \t]+)(.*))?$").expect("list item regex")
});
static TABLE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$").expect("table delimiter regex")
});

enum Scan {
    /// A flow-level construct ending before this line index.
    Flow(usize),
    /// The construct is followed by text on its line; treat as inline.
    Inline,
}

struct ListMarker<'a> {
    /// Bullet character, or the delimiter of an ordered marker.
    kind: char,
    ordered_start: Option<u64>,
    content: &'a str,
    content_indent: usize,
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    dialect: Dialect,
    line_offset: usize,
}

impl<'a> Parser<'a> {
    fn new(body: &'a str, dialect: Dialect, line_offset: usize) -> Self {
        Self {
            lines: body.lines().collect(),
            pos: 0,
            dialect,
            line_offset,
        }
    }

    fn parse(mut self) -> Result<Vec<Block>, NormalizeError> {
        let mut blocks = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                self.pos += 1;
                continue;
            }

            if let Some((ch, len, lang)) = fence_open(line) {
                blocks.push(self.fenced_code(ch, len, lang));
                continue;
            }

            if self.dialect == Dialect::Mdx {
                if is_esm(line) {
                    self.skip_esm();
                    blocks.push(Block::Component);
                    continue;
                }
                let scan = if is_jsx_start(line) {
                    Some(self.scan_component()?)
                } else if indent(line) <= 3 && line.trim_start().starts_with('{') {
                    Some(self.scan_expression()?)
                } else {
                    None
                };
                match scan {
                    Some(Scan::Flow(next)) => {
                        self.pos = next;
                        blocks.push(Block::Component);
                        continue;
                    }
                    Some(Scan::Inline) => {
                        if let Some(p) = self.paragraph() {
                            blocks.push(p);
                        }
                        continue;
                    }
                    None => {}
                }
            }

            if let Some((level, text)) = atx_heading(line) {
                blocks.push(Block::Heading {
                    level,
                    text: inline_text(text, self.dialect),
                });
                self.pos += 1;
                continue;
            }

            if is_thematic_break(line) {
                blocks.push(Block::ThematicBreak);
                self.pos += 1;
                continue;
            }

            if is_quote(line) {
                blocks.push(self.quote()?);
                continue;
            }

            if let Some(marker) = list_item(line) {
                blocks.push(self.list(marker)?);
                continue;
            }

            if indent(line) >= 4 {
                blocks.push(self.indented_code());
                continue;
            }

            if line.contains('|')
                && self
                    .lines
                    .get(self.pos + 1)
                    .map(|next| next.contains('|') && TABLE_DELIMITER.is_match(next))
                    .unwrap_or(false)
            {
                blocks.push(self.table());
                continue;
            }

            if let Some(p) = self.paragraph() {
                blocks.push(p);
            }
        }

        Ok(blocks)
    }

    fn line_number(&self, idx: usize) -> usize {
        self.line_offset + idx + 1
    }

    fn fenced_code(&mut self, ch: char, len: usize, lang: Option<String>) -> Block {
        self.pos += 1;
        let mut body = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if fence_close(line, ch, len) {
                break;
            }
            body.push(line);
        }
        Block::Code {
            lang,
            body: body.join("\n"),
        }
    }

    fn indented_code(&mut self) -> Block {
        let mut body = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if !is_blank(line) && indent(line) < 4 {
                break;
            }
            body.push(strip_indent(line, 4));
            self.pos += 1;
        }
        while body.last().map(|l| is_blank(l)).unwrap_or(false) {
            body.pop();
        }
        Block::Code {
            lang: None,
            body: body.join("\n"),
        }
    }

    fn paragraph(&mut self) -> Option<Block> {
        let mut buf = vec![self.lines[self.pos].trim()];
        self.pos += 1;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                break;
            }
            if let Some(level) = setext_level(line) {
                self.pos += 1;
                return Some(Block::Heading {
                    level,
                    text: inline_text(&buf.join(" "), self.dialect),
                });
            }
            if interrupts_paragraph(line) {
                break;
            }
            buf.push(line.trim());
            self.pos += 1;
        }

        let text = inline_text(&buf.join("\n"), self.dialect);
        if text.is_empty() {
            None
        } else {
            Some(Block::Paragraph(text))
        }
    }

    fn quote(&mut self) -> Result<Block, NormalizeError> {
        let start = self.pos;
        let mut inner = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                break;
            }
            if is_quote(line) {
                let rest = &line.trim_start()[1..];
                inner.push(rest.strip_prefix(' ').unwrap_or(rest));
            } else if self.pos > start && !interrupts_paragraph(line) {
                inner.push(line);
            } else {
                break;
            }
            self.pos += 1;
        }
        let children =
            Parser::new(&inner.join("\n"), self.dialect, self.line_number(start) - 1).parse()?;
        Ok(Block::Quote(children))
    }

    fn list(&mut self, first: ListMarker<'a>) -> Result<Block, NormalizeError> {
        let mut items = Vec::new();
        let mut item_start = self.pos;
        let mut current: Vec<&str> = vec![first.content];
        let mut content_indent = first.content_indent;
        let kind = first.kind;
        self.pos += 1;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];

            if is_blank(line) {
                let next = (self.pos + 1..self.lines.len()).find(|&i| !is_blank(self.lines[i]));
                match next {
                    Some(i)
                        if indent(self.lines[i]) >= 2
                            || list_item(self.lines[i]).map(|m| m.kind) == Some(kind) =>
                    {
                        current.push("");
                        self.pos = i;
                        continue;
                    }
                    _ => break,
                }
            }

            if indent(line) < content_indent && is_thematic_break(line) {
                break;
            }

            if indent(line) < content_indent {
                if let Some(marker) = list_item(line) {
                    if marker.kind != kind {
                        break;
                    }
                    items.push(self.list_item_blocks(&current, item_start)?);
                    current = vec![marker.content];
                    content_indent = marker.content_indent;
                    item_start = self.pos;
                    self.pos += 1;
                    continue;
                }
            }

            if indent(line) >= 2 || !interrupts_paragraph(line) {
                current.push(strip_indent(line, content_indent));
                self.pos += 1;
                continue;
            }

            break;
        }

        items.push(self.list_item_blocks(&current, item_start)?);
        Ok(Block::List(items))
    }

    fn list_item_blocks(&self, lines: &[&str], start: usize) -> Result<Vec<Block>, NormalizeError> {
        Parser::new(&lines.join("\n"), self.dialect, self.line_number(start) - 1).parse()
    }

    fn table(&mut self) -> Block {
        let mut rows = vec![split_row(self.lines[self.pos], self.dialect)];
        self.pos += 2;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) || !line.contains('|') {
                break;
            }
            // an all-dash body row would render as a delimiter line
            if !TABLE_DELIMITER.is_match(line) {
                rows.push(split_row(line, self.dialect));
            }
            self.pos += 1;
        }
        Block::Table(rows)
    }

    fn skip_esm(&mut self) {
        while self.pos < self.lines.len() && !is_blank(self.lines[self.pos]) {
            self.pos += 1;
        }
    }

    /// Scan a JSX element starting at the current line, tracking nesting
    /// across lines until every opened tag is closed.
    fn scan_component(&self) -> Result<Scan, NormalizeError> {
        let start = self.pos;
        let mut depth: usize = 0;
        let mut first_name: Option<String> = None;
        let mut tag: Option<TagScan> = None;
        let mut fence: Option<(char, usize)> = None;

        for idx in start..self.lines.len() {
            let line = self.lines[idx];

            if tag.is_none() {
                if let Some((ch, len)) = fence {
                    if fence_close(line, ch, len) {
                        fence = None;
                    }
                    continue;
                }
                if let Some((ch, len, _)) = fence_open(line) {
                    fence = Some((ch, len));
                    continue;
                }
            }

            for (i, c) in line.char_indices() {
                if let Some(t) = tag.as_mut() {
                    if !t.feed(c) {
                        continue;
                    }
                    let finished = tag.take().map(|t| t.buf).unwrap_or_default();
                    let name = tag_name(&finished);
                    if finished.starts_with('/') {
                        if depth == 0 {
                            return Err(NormalizeError::UnexpectedClosingTag {
                                name,
                                line: self.line_number(idx),
                            });
                        }
                        depth -= 1;
                    } else if !finished.trim_end().ends_with('/') {
                        depth += 1;
                    }
                    first_name.get_or_insert(name);

                    if depth == 0 {
                        let rest = &line[i + 1..];
                        if idx == start && !rest.trim().is_empty() {
                            return Ok(Scan::Inline);
                        }
                        return Ok(Scan::Flow(idx + 1));
                    }
                } else if c == '<' {
                    let next = line[i + 1..].chars().next();
                    if matches!(next, Some(n) if n.is_ascii_alphabetic() || n == '/' || n == '>') {
                        tag = Some(TagScan::default());
                    }
                }
            }

            if let Some(t) = tag.as_mut() {
                t.buf.push('\n');
                t.quote = None;
            }
        }

        Err(NormalizeError::UnclosedComponent {
            name: first_name
                .or_else(|| tag.map(|t| tag_name(&t.buf)))
                .unwrap_or_default(),
            line: self.line_number(start),
        })
    }

    /// Scan a `{…}` expression block, skipping strings and comments.
    fn scan_expression(&self) -> Result<Scan, NormalizeError> {
        let start = self.pos;
        let mut depth: usize = 0;
        let mut quote: Option<char> = None;
        let mut block_comment = false;

        for idx in start..self.lines.len() {
            let line = self.lines[idx];
            let mut prev = '\0';
            let mut chars = line.char_indices().peekable();

            while let Some((i, c)) = chars.next() {
                if block_comment {
                    if prev == '*' && c == '/' {
                        block_comment = false;
                        prev = '\0';
                    } else {
                        prev = c;
                    }
                    continue;
                }
                if let Some(q) = quote {
                    if c == q && prev != '\\' {
                        quote = None;
                    }
                    prev = c;
                    continue;
                }
                match c {
                    '"' | '\'' | '`' => quote = Some(c),
                    '/' if matches!(chars.peek(), Some((_, '*'))) => {
                        chars.next();
                        block_comment = true;
                        prev = '\0';
                        continue;
                    }
                    '/' if matches!(chars.peek(), Some((_, '/'))) => break,
                    '{' => depth += 1,
                    '}' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            let rest = &line[i + 1..];
                            if idx == start && !rest.trim().is_empty() {
                                return Ok(Scan::Inline);
                            }
                            return Ok(Scan::Flow(idx + 1));
                        }
                    }
                    _ => {}
                }
                prev = c;
            }

            if matches!(quote, Some('"') | Some('\'')) {
                quote = None;
            }
        }

        Err(NormalizeError::UnbalancedExpression {
            line: self.line_number(start),
        })
    }
}

/// In-progress JSX tag, from just after `<` up to the matching `>`.
#[derive(Default)]
struct TagScan {
    buf: String,
    quote: Option<char>,
    braces: usize,
}

impl TagScan {
    /// Feed one character; returns true when it closes the tag.
    fn feed(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            self.buf.push(c);
            return false;
        }
        match c {
            '"' | '\'' | '`' => self.quote = Some(c),
            '{' => self.braces += 1,
            '}' => self.braces = self.braces.saturating_sub(1),
            '>' if self.braces == 0 => return true,
            _ => {}
        }
        self.buf.push(c);
        false
    }
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_'))
        .collect()
}

// ============ Line classification ============

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - (width % 4),
            _ => break,
        }
    }
    width
}

fn strip_indent(line: &str, width: usize) -> &str {
    let mut removed = 0;
    for (i, c) in line.char_indices() {
        if removed >= width {
            return &line[i..];
        }
        match c {
            ' ' => removed += 1,
            '\t' => removed += 4 - (removed % 4),
            _ => return &line[i..],
        }
    }
    ""
}

fn fence_open(line: &str) -> Option<(char, usize, Option<String>)> {
    if indent(line) > 3 {
        return None;
    }
    let t = line.trim_start();
    let ch = t.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = t.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    let info = t[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    let lang = info.split_whitespace().next().map(str::to_string);
    Some((ch, len, lang))
}

fn fence_close(line: &str, ch: char, len: usize) -> bool {
    if indent(line) > 3 {
        return false;
    }
    let t = line.trim();
    let run = t.chars().take_while(|&c| c == ch).count();
    run >= len && t[run..].trim().is_empty()
}

fn atx_heading(line: &str) -> Option<(u8, &str)> {
    if indent(line) > 3 {
        return None;
    }
    let t = line.trim_start();
    let level = t.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &t[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with(' ') || without_closing.ends_with('\t') {
        without_closing.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

fn setext_level(line: &str) -> Option<u8> {
    if indent(line) > 3 {
        return None;
    }
    let t = line.trim();
    if t.is_empty() {
        None
    } else if t.chars().all(|c| c == '=') {
        Some(1)
    } else if t.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn is_thematic_break(line: &str) -> bool {
    if indent(line) > 3 {
        return false;
    }
    let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|m| marks.iter().all(|c| c == m))
}

fn is_quote(line: &str) -> bool {
    indent(line) <= 3 && line.trim_start().starts_with('>')
}

fn list_item(line: &str) -> Option<ListMarker<'_>> {
    let caps = LIST_ITEM.captures(line)?;
    let lead = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
    let marker = caps.get(2)?.as_str();
    let spacing = caps.get(4).map(|m| m.as_str().len()).unwrap_or(1);
    let content = caps.get(5).map(|m| m.as_str()).unwrap_or("");
    let ordered_start = caps.get(3).and_then(|m| m.as_str().parse().ok());
    Some(ListMarker {
        kind: marker.chars().last().unwrap_or('-'),
        ordered_start,
        content,
        content_indent: lead + marker.len() + spacing.min(4),
    })
}

fn is_esm(line: &str) -> bool {
    line.starts_with("import ") || line.starts_with("export ")
}

fn is_jsx_start(line: &str) -> bool {
    if indent(line) > 3 {
        return false;
    }
    let mut chars = line.trim_start().chars();
    chars.next() == Some('<')
        && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '>' || c == '/')
}

/// Lines that end a paragraph without a blank line.
fn interrupts_paragraph(line: &str) -> bool {
    if atx_heading(line).is_some()
        || fence_open(line).is_some()
        || is_thematic_break(line)
        || is_quote(line)
    {
        return true;
    }
    match list_item(line) {
        Some(marker) if !marker.content.trim().is_empty() => {
            marker.ordered_start.map(|n| n == 1).unwrap_or(true)
        }
        _ => false,
    }
}

fn split_row(line: &str, dialect: Dialect) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(|cell| inline_text(cell, dialect)).collect()
}

// ============ Inline markup ============

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+([^`]+)`+").expect("code span regex"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("image regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("link regex"));
static REF_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\[[^\]]*\]").expect("reference link regex"));
static AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<((?:https?|mailto):[^>\s]+)>").expect("autolink regex"));
static STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("strong regex"));
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("emphasis regex"));
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+)~~").expect("strike regex"));
static JSX_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][\w.:-]*(?:\s[^<>]*)?/?>|</?>").expect("inline jsx regex")
});
static EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("inline expression regex"));

/// Strip inline markup, keeping the visible text. Code span contents are
/// kept verbatim.
fn inline_text(text: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in CODE_SPAN.captures_iter(text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        out.push_str(&strip_markup(&text[last..whole.start], dialect));
        out.push_str(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        last = whole.end;
    }
    out.push_str(&strip_markup(&text[last..], dialect));
    out.trim().to_string()
}

fn strip_markup(segment: &str, dialect: Dialect) -> String {
    let mut s = segment.to_string();
    if dialect == Dialect::Mdx {
        s = EXPRESSION.replace_all(&s, "").into_owned();
        s = JSX_TAG.replace_all(&s, "").into_owned();
    }
    s = IMAGE.replace_all(&s, "$1").into_owned();
    s = LINK.replace_all(&s, "$1").into_owned();
    s = REF_LINK.replace_all(&s, "$1").into_owned();
    s = AUTOLINK.replace_all(&s, "$1").into_owned();
    s = STRONG.replace_all(&s, "$1").into_owned();
    s = EMPHASIS.replace_all(&s, "$1").into_owned();
    STRIKE.replace_all(&s, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn md(text: &str) -> NormalizedDocument {
        normalize(text, Dialect::Markdown).unwrap()
    }

    fn mdx(text: &str) -> NormalizedDocument {
        normalize(text, Dialect::Mdx).unwrap()
    }

    #[test]
    fn test_dialect_for_path() {
        assert_eq!(Dialect::for_path("app/guides/page.mdx"), Dialect::Mdx);
        assert_eq!(Dialect::for_path("kb/faq.MDX"), Dialect::Mdx);
        assert_eq!(Dialect::for_path("kb/faq.md"), Dialect::Markdown);
        assert_eq!(Dialect::for_path("mdx"), Dialect::Markdown);
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let doc = md("# Title\n\nSome **bold** and *italic* text.\n\n## Section ##\n\nBody [link](https://x.dev).");
        assert_eq!(
            doc.normalized_content,
            "# Title\n\nSome bold and italic text.\n\n## Section\n\nBody link."
        );
        assert_eq!(doc.first_heading.as_deref(), Some("Title"));
    }

    #[test]
    fn test_first_heading_is_first_level_one() {
        let doc = md("## Intro\n\ntext\n\n# Real Title\n\n# Second");
        assert_eq!(doc.first_heading.as_deref(), Some("Real Title"));
        assert!(md("## Only h2").first_heading.is_none());
    }

    #[test]
    fn test_setext_headings() {
        let doc = md("Title\n=====\n\nSub\n---\n\ntext");
        assert_eq!(doc.normalized_content, "# Title\n\n## Sub\n\ntext");
        assert_eq!(doc.first_heading.as_deref(), Some("Title"));
    }

    #[test]
    fn test_code_block_verbatim() {
        let raw = "```rust title=\"x\"\nfn main() {\n    // **not bold**\n}\n```\n\n~~~\n## not a heading\n~~~";
        let doc = md(raw);
        assert_eq!(
            doc.normalized_content,
            "```rust\nfn main() {\n    // **not bold**\n}\n```\n\n```\n## not a heading\n```"
        );
    }

    #[test]
    fn test_fence_lengthened_when_body_has_backticks() {
        let doc = md("~~~md\n```js\nx\n```\n~~~");
        assert_eq!(doc.normalized_content, "````md\n```js\nx\n```\n````");
    }

    #[test]
    fn test_indented_code_becomes_fenced() {
        let doc = md("Intro:\n\n    let x = 1;\n    let y = 2;\n\nAfter.");
        assert_eq!(
            doc.normalized_content,
            "Intro:\n\n```\nlet x = 1;\nlet y = 2;\n```\n\nAfter."
        );
    }

    #[test]
    fn test_lists_quotes_tables_render_plain() {
        let raw = "- one\n- two `code`\n  continued\n\n1. first\n2. second\n\n> quoted *text*\n> # inner heading\n\n| Name | Value |\n| --- | :---: |\n| a | **b** |";
        let doc = md(raw);
        assert_eq!(
            doc.normalized_content,
            "one\ntwo code\ncontinued\n\nfirst\nsecond\n\nquoted text\ninner heading\n\nName | Value\na | b"
        );
    }

    #[test]
    fn test_thematic_break_dropped() {
        assert_eq!(md("a\n\n---\n\nb").normalized_content, "a\n\nb");
        assert_eq!(md("a\n\n* * *\n\nb").normalized_content, "a\n\nb");
    }

    #[test]
    fn test_front_matter_extracted() {
        let doc = md("---\ntitle: Webhooks\ntags: [a, b]\n---\n# Heading\n\nBody");
        assert_eq!(doc.frontmatter_title(), Some("Webhooks"));
        assert_eq!(doc.frontmatter["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(doc.normalized_content, "# Heading\n\nBody");
    }

    #[test]
    fn test_unterminated_front_matter_is_body() {
        let doc = md("---\ntitle: x\n\nBody");
        assert!(doc.frontmatter.is_empty());
        assert!(doc.normalized_content.contains("Body"));
    }

    #[test]
    fn test_malformed_front_matter_is_invalid_input() {
        let err = normalize("---\ntitle: [unclosed\n---\nBody", Dialect::Markdown).unwrap_err();
        assert!(matches!(err, NormalizeError::FrontMatter(_)));

        let err = normalize("---\n- just\n- a list\n---\nBody", Dialect::Markdown).unwrap_err();
        assert!(matches!(err, NormalizeError::FrontMatter(_)));
    }

    #[test]
    fn test_mdx_components_and_esm_dropped() {
        let raw = "import { Callout } from '@/components'\n\nexport const meta = { a: 1 }\n\n# Guide\n\n<Callout type=\"warn\">\n\nHidden **content**\n\n</Callout>\n\n<Image\n  src=\"/a.png\"\n  alt=\"x > y\"\n/>\n\n{/* a comment, don't index */}\n\nVisible <Kbd>Ctrl</Kbd> text {props.name}.";
        let doc = mdx(raw);
        assert_eq!(doc.normalized_content, "# Guide\n\nVisible Ctrl text .");
        assert_eq!(doc.first_heading.as_deref(), Some("Guide"));
    }

    #[test]
    fn test_mdx_component_with_code_fence_inside() {
        let raw = "<Tabs>\n```html\n<div>\n```\n</Tabs>\n\nAfter";
        assert_eq!(mdx(raw).normalized_content, "After");
    }

    #[test]
    fn test_mdx_inline_component_line_is_paragraph() {
        let doc = mdx("<Badge>New</Badge> feature flags");
        assert_eq!(doc.normalized_content, "New feature flags");
    }

    #[test]
    fn test_markdown_keeps_angle_bracket_lines() {
        let doc = md("<Callout>\n\ntext\n\n</Callout>");
        assert_eq!(doc.normalized_content, "<Callout>\n\ntext\n\n</Callout>");
    }

    #[test]
    fn test_mdx_unclosed_component_fails() {
        let err = normalize("# T\n\n<Callout>\n\nnever closed", Dialect::Mdx).unwrap_err();
        match err {
            NormalizeError::UnclosedComponent { name, line } => {
                assert_eq!(name, "Callout");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mdx_unbalanced_expression_fails() {
        let err = normalize("{items.map(x => (\n  x\n)", Dialect::Mdx).unwrap_err();
        assert!(matches!(err, NormalizeError::UnbalancedExpression { line: 1 }));
    }

    #[test]
    fn test_mdx_stray_closing_tag_fails() {
        let err = normalize("</Callout>", Dialect::Mdx).unwrap_err();
        assert!(matches!(err, NormalizeError::UnexpectedClosingTag { .. }));
    }

    #[test]
    fn test_error_line_accounts_for_front_matter() {
        let err = normalize("---\ntitle: x\n---\n<Open>\n", Dialect::Mdx).unwrap_err();
        assert!(matches!(err, NormalizeError::UnclosedComponent { line: 4, .. }));
    }

    #[test]
    fn test_not_utf8() {
        let err = normalize_bytes(&[0xff, 0xfe, 0x00], Dialect::Markdown).unwrap_err();
        assert!(matches!(err, NormalizeError::NotUtf8));
    }

    #[test]
    fn test_renormalization_is_idempotent() {
        let raw = "---\ntitle: T\n---\n# Guide\n\nIntro with [a link](/x) and `code`.\n\n## Setup\n\n- install\n- configure\n  the *thing*\n\n> note\n\n```sh\nnpm i\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n## Limits & Retries\n\nText.\nMore text.";
        for dialect in [Dialect::Markdown, Dialect::Mdx] {
            let once = normalize(raw, dialect).unwrap().normalized_content;
            let twice = normalize(&once, dialect).unwrap().normalized_content;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_dash_only_table_row_is_dropped() {
        let raw = "| a | b |\n|---|---|\n| - | - |\n| 1 | 2 |";
        let once = normalize(raw, Dialect::Markdown).unwrap().normalized_content;
        assert_eq!(once, "a | b\n1 | 2");
        let twice = normalize(&once, Dialect::Markdown).unwrap().normalized_content;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_block_kinds_allowed_per_dialect() {
        assert!(!Dialect::Markdown.allows(&Block::Component));
        assert!(Dialect::Mdx.allows(&Block::Component));
        assert!(Dialect::Markdown.allows(&Block::ThematicBreak));
    }

    #[test]
    fn test_parse_blocks_shape() {
        let blocks = parse_blocks("# A\n\ntext\n\n```\nx\n```", Dialect::Markdown).unwrap();
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "A".to_string()
                },
                Block::Paragraph("text".to_string()),
                Block::Code {
                    lang: None,
                    body: "x".to_string()
                },
            ]
        );
    }
}
