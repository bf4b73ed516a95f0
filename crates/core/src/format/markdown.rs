//! Markdown reader and writer
//!
//! A small recursive-descent parser for the subset of Markdown the skills
//! exchange with Atlassian products: ATX headings, paragraphs, bullet and
//! ordered lists, fenced code blocks, block quotes, and the `**bold**`,
//! `*italic*`, `` `code` `` and `[link](url)` spans. Anything else is kept
//! as literal text; parsing never fails.

use std::collections::HashMap;

use super::document::{
    collapse_whitespace, link_label, merge_adjacent, plain_text, trim_inlines, Block, Document,
    Inline, ListItem,
};

// ============================================================================
// Block parsing
// ============================================================================

/// Parse Markdown into a [`Document`].
pub fn parse(markdown: &str) -> Document {
    let lines: Vec<&str> = markdown.lines().collect();
    Document::new(BlockParser::new(&lines).parse_blocks())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

struct BlockParser<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> BlockParser<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self { lines, pos: 0 }
    }

    fn parse_blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                self.pos += 1;
                continue;
            }

            let block = if let Some(fence) = Fence::open(line) {
                self.parse_fence(fence)
            } else if let Some((level, content)) = heading(line) {
                self.pos += 1;
                Block::Heading {
                    level,
                    content: parse_inlines(content),
                }
            } else if is_blockquote(line) {
                self.parse_blockquote()
            } else if let Some((kind, _)) = list_item(line) {
                self.parse_list(kind)
            } else {
                self.parse_paragraph()
            };

            let empty_list = matches!(
                &block,
                Block::BulletList(items) | Block::OrderedList(items) if items.is_empty()
            );
            if !empty_list {
                blocks.push(block);
            }
        }

        blocks
    }

    fn parse_fence(&mut self, fence: Fence) -> Block {
        let start = self.pos;
        let close = (start + 1..self.lines.len()).find(|&i| fence.closes(self.lines[i]));

        match close {
            Some(end) => {
                self.pos = end + 1;
                Block::CodeBlock {
                    language: fence.language,
                    text: self.lines[start + 1..end].join("\n"),
                }
            }
            None => {
                // Unterminated fence: keep everything that follows as literal text.
                self.pos = self.lines.len();
                let literal = self.lines[start..]
                    .iter()
                    .map(|line| line.trim())
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                Block::Paragraph(vec![Inline::Text(literal)])
            }
        }
    }

    fn parse_blockquote(&mut self) -> Block {
        let mut inner = Vec::new();

        while self.pos < self.lines.len() && is_blockquote(self.lines[self.pos]) {
            let stripped = self.lines[self.pos].trim_start();
            let stripped = &stripped[1..];
            inner.push(stripped.strip_prefix(' ').unwrap_or(stripped));
            self.pos += 1;
        }

        Block::Blockquote(BlockParser::new(&inner).parse_blocks())
    }

    fn parse_list(&mut self, kind: ListKind) -> Block {
        let mut items: Vec<String> = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];

            if line.trim().is_empty() {
                // A blank line only continues the list when the next item has the same kind.
                let next = (self.pos + 1..self.lines.len())
                    .find(|&i| !self.lines[i].trim().is_empty());
                match next.and_then(|i| list_item(self.lines[i])) {
                    Some((next_kind, _)) if next_kind == kind => {
                        self.pos = next.unwrap_or(self.pos + 1);
                        continue;
                    }
                    _ => break,
                }
            }

            match list_item(line) {
                Some((item_kind, content)) if item_kind == kind => {
                    items.push(content.trim().to_string());
                    self.pos += 1;
                }
                Some(_) => break,
                None if starts_block(line) => break,
                None => match items.last_mut() {
                    Some(item) => {
                        item.push(' ');
                        item.push_str(line.trim());
                        self.pos += 1;
                    }
                    None => break,
                },
            }
        }

        // Items without content are dropped, as the ADF and storage readers do.
        let items: Vec<ListItem> = items
            .iter()
            .map(|item| parse_inlines(item))
            .filter(|item| !item.is_empty())
            .collect();
        match kind {
            ListKind::Bullet => Block::BulletList(items),
            ListKind::Ordered => Block::OrderedList(items),
        }
    }

    fn parse_paragraph(&mut self) -> Block {
        let mut text = String::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() || (!text.is_empty() && starts_block(line)) {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(line.trim());
            self.pos += 1;
        }

        Block::Paragraph(parse_inlines(&text))
    }
}

struct Fence {
    marker: char,
    length: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let length = trimmed.chars().take_while(|c| *c == marker).count();
        if length < 3 {
            return None;
        }

        let info = trimmed[length..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }

        Some(Self {
            marker,
            length,
            language: info
                .split_whitespace()
                .next()
                .map(|language| language.to_string()),
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.chars().count() >= self.length && trimmed.chars().all(|c| c == self.marker)
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }

    let content = rest.trim();
    // Optional closing sequence: `## Title ##`
    let without_closing = content.trim_end_matches('#');
    if without_closing.len() < content.len()
        && (without_closing.is_empty() || without_closing.ends_with(' '))
    {
        return Some((level as u8, without_closing.trim_end()));
    }

    Some((level as u8, content))
}

fn is_blockquote(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();

    match chars.next()? {
        '-' | '*' | '+' => {
            let rest = &trimmed[1..];
            if rest.starts_with(' ') || rest.starts_with('\t') {
                Some((ListKind::Bullet, rest))
            } else {
                None
            }
        }
        c if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let rest = &trimmed[digits..];
            let after = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
            if after.starts_with(' ') || after.starts_with('\t') {
                Some((ListKind::Ordered, after))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn starts_block(line: &str) -> bool {
    Fence::open(line).is_some()
        || heading(line).is_some()
        || is_blockquote(line)
        || list_item(line).is_some()
}

// ============================================================================
// Inline parsing
// ============================================================================

/// Parse a single line of inline Markdown.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    trim_inlines(parse_span(&chars))
}

fn parse_span(chars: &[char]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() && chars[i + 1].is_ascii_punctuation() => {
                buffer.push(chars[i + 1]);
                i += 2;
            }
            '`' => {
                let run = run_length(chars, i, '`');
                match find_code_close(chars, i + run, run) {
                    Some(close) => {
                        flush(&mut buffer, &mut out);
                        out.push(Inline::Code(code_content(&chars[i + run..close])));
                        i = close + run;
                    }
                    None => {
                        buffer.extend(&chars[i..i + run]);
                        i += run;
                    }
                }
            }
            '*' | '_' => match parse_emphasis(chars, i) {
                Some((inline, next)) => {
                    flush(&mut buffer, &mut out);
                    out.push(inline);
                    i = next;
                }
                None => {
                    let run = run_length(chars, i, c);
                    buffer.extend(&chars[i..i + run]);
                    i += run;
                }
            },
            '[' => match parse_link(chars, i) {
                Some((inline, next)) => {
                    flush(&mut buffer, &mut out);
                    out.push(inline);
                    i = next;
                }
                None => {
                    buffer.push('[');
                    i += 1;
                }
            },
            _ => {
                buffer.push(c);
                i += 1;
            }
        }
    }

    flush(&mut buffer, &mut out);
    merge_adjacent(out)
}

fn flush(buffer: &mut String, out: &mut Vec<Inline>) {
    if !buffer.is_empty() {
        out.push(Inline::Text(collapse_whitespace(buffer)));
        buffer.clear();
    }
}

fn run_length(chars: &[char], start: usize, c: char) -> usize {
    chars[start..].iter().take_while(|&&x| x == c).count()
}

fn find_code_close(chars: &[char], start: usize, run: usize) -> Option<usize> {
    let mut j = start;
    while j < chars.len() {
        if chars[j] == '`' {
            let len = run_length(chars, j, '`');
            if len == run {
                return Some(j);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

fn code_content(chars: &[char]) -> String {
    let content: String = chars.iter().collect();
    let padded = content.len() >= 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && !content.trim().is_empty();
    if padded {
        content[1..content.len() - 1].to_string()
    } else {
        content
    }
}

/// Try to open `**strong**` or `*emphasis*` (or the `_` variants) at `start`.
fn parse_emphasis(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let delimiter = chars[start];
    if delimiter == '_' && start > 0 && chars[start - 1].is_alphanumeric() {
        return None;
    }

    let run = run_length(chars, start, delimiter);

    if run >= 2 {
        let content_start = start + 2;
        if chars.get(content_start).is_some_and(|c| !c.is_whitespace()) {
            if let Some(close) = find_closer(chars, content_start, delimiter, 2) {
                return Some((Inline::Bold(parse_span(&chars[content_start..close])), close + 2));
            }
        }
    }

    let content_start = start + 1;
    if chars.get(content_start).is_some_and(|c| !c.is_whitespace()) {
        if let Some(close) = find_closer(chars, content_start, delimiter, 1) {
            return Some((Inline::Italic(parse_span(&chars[content_start..close])), close + 1));
        }
    }

    None
}

/// Find the closing delimiter of length `len` for a span starting at `start`.
///
/// Code spans and escapes are skipped. A single delimiter ignores `**` pairs
/// nested inside it; a run of three closes both the inner and the outer span.
fn find_closer(chars: &[char], start: usize, delimiter: char, len: usize) -> Option<usize> {
    let mut j = start;

    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '`' => {
                let run = run_length(chars, j, '`');
                j = match find_code_close(chars, j + run, run) {
                    Some(close) => close + run,
                    None => j + run,
                };
            }
            c if c == delimiter => {
                let run = run_length(chars, j, delimiter);
                let end = j + run;
                let can_close = j > start
                    && !chars[j - 1].is_whitespace()
                    && (delimiter != '_'
                        || chars.get(end).map_or(true, |c| !c.is_alphanumeric()));

                if can_close {
                    if len == 2 && run >= 2 {
                        return Some(end - 2);
                    }
                    if len == 1 && run != 2 {
                        return Some(end - 1);
                    }
                }
                j = end;
            }
            _ => j += 1,
        }
    }

    None
}

fn parse_link(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let mut j = start + 1;
    let close_bracket = loop {
        match chars.get(j)? {
            '\\' => j += 2,
            ']' => break j,
            _ => j += 1,
        }
    };

    if chars.get(close_bracket + 1) != Some(&'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut k = close_bracket + 2;
    let close_paren = loop {
        match chars.get(k)? {
            '(' => depth += 1,
            ')' if depth == 0 => break k,
            ')' => depth -= 1,
            _ => {}
        }
        k += 1;
    };

    let text = plain_text(&parse_span(&chars[start + 1..close_bracket]));
    let url: String = chars[close_bracket + 2..close_paren].iter().collect();
    let url = url.trim().to_string();

    // A link needs something to show; `[]()` stays literal text.
    let text = match (text.trim().is_empty(), url.is_empty()) {
        (true, true) => return None,
        (true, false) => url.clone(),
        (false, _) => text,
    };

    Some((Inline::Link { text, url }, close_paren + 1))
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a [`Document`] as canonical Markdown.
///
/// Blocks are separated by one blank line, bullets use `-`, ordered items are
/// numbered from 1, and there is no trailing newline.
pub fn render(document: &Document) -> String {
    render_blocks(&document.blocks)
}

fn render_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(render_block)
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            let text = escape_heading_end(render_inlines(content));
            format!("{} {}", "#".repeat(*level as usize), text)
                .trim_end()
                .to_string()
        }
        Block::Paragraph(content) => escape_block_start(render_inlines(content)),
        Block::BulletList(items) => items
            .iter()
            .filter(|item| !item.is_empty())
            .map(|item| format!("- {}", render_inlines(item)).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        Block::OrderedList(items) => items
            .iter()
            .filter(|item| !item.is_empty())
            .enumerate()
            .map(|(index, item)| {
                format!("{}. {}", index + 1, render_inlines(item))
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::CodeBlock { language, text } => {
            let longest = longest_run(text, '`');
            let fence = "`".repeat(longest.max(2) + 1);
            let language = language.as_deref().unwrap_or("");
            if text.is_empty() {
                format!("{fence}{language}\n{fence}")
            } else {
                format!("{fence}{language}\n{text}\n{fence}")
            }
        }
        Block::Blockquote(blocks) => render_blocks(blocks)
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render inline spans as a single line of Markdown.
///
/// Emphasis markers are picked per span so that neighbouring spans never
/// share a delimiter run: `**a***b*` would read back as different spans, so
/// one of them switches to `_`. A span that fits neither marker keeps its
/// text and loses its emphasis.
pub fn render_inlines(inlines: &[Inline]) -> String {
    let (rendered, _) = InlineWriter::new(inlines, None, Vec::new()).write_from(0, None);
    collapse_newlines(&rendered)
}

/// Rendered text plus the number of spans written without their markers.
type Written = (String, usize);

struct InlineWriter<'a> {
    inlines: &'a [Inline],
    /// Character that follows the whole run (the enclosing closer, if any)
    after: Option<char>,
    /// Delimiters of the enclosing spans; reusing one would close it early.
    open: Vec<(char, usize)>,
    memo: HashMap<(usize, Option<char>), Written>,
}

impl<'a> InlineWriter<'a> {
    fn new(inlines: &'a [Inline], after: Option<char>, open: Vec<(char, usize)>) -> Self {
        Self {
            inlines,
            after,
            open,
            memo: HashMap::new(),
        }
    }

    /// Render `inlines[index..]` given the character written just before it.
    fn write_from(&mut self, index: usize, prev: Option<char>) -> Written {
        if index == self.inlines.len() {
            return (String::new(), 0);
        }
        if let Some(done) = self.memo.get(&(index, prev)) {
            return done.clone();
        }

        let inlines = self.inlines;
        let written = match &inlines[index] {
            Inline::Bold(children) => self.write_emphasis(index, prev, children, 2),
            Inline::Italic(children) => self.write_emphasis(index, prev, children, 1),
            atom => {
                let head = render_atom(atom);
                // Delimiter characters inside atoms are escaped and never extend a run.
                let last = head
                    .chars()
                    .last()
                    .map(|c| if matches!(c, '*' | '_') { '\\' } else { c });
                let (tail, dropped) = self.write_from(index + 1, last.or(prev));
                (head + &tail, dropped)
            }
        };

        self.memo.insert((index, prev), written.clone());
        written
    }

    fn write_emphasis(
        &mut self,
        index: usize,
        prev: Option<char>,
        children: &[Inline],
        width: usize,
    ) -> Written {
        // Edge whitespace moves outside the markers so they stay flanking.
        let (plain, _) =
            InlineWriter::new(children, None, self.open.clone()).write_from(0, prev);
        let lead = &plain[..plain.len() - plain.trim_start().len()];
        let trail = &plain[plain.trim_end().len()..];
        let trimmed = trim_inlines(children.to_vec());

        if trimmed.is_empty() {
            // Nothing to emphasize; keep the whitespace, if any.
            let (tail, dropped) = self.write_from(index + 1, plain.chars().last().or(prev));
            return (plain + &tail, dropped);
        }

        let mut best: Option<Written> = None;
        for marker in ['*', '_'] {
            if self.open.contains(&(marker, width)) {
                continue;
            }
            let mut open = self.open.clone();
            open.push((marker, width));
            let (body, inner_dropped) =
                InlineWriter::new(&trimmed, Some(marker), open).write_from(0, Some(marker));

            let before = lead.chars().last().or(prev);
            if !can_open(marker, before) {
                continue;
            }

            let (tail, tail_dropped) =
                self.write_from(index + 1, trail.chars().last().or(Some(marker)));
            let next = trail
                .chars()
                .next()
                .or_else(|| tail.chars().next())
                .or(self.after);
            if !can_close(marker, next) {
                continue;
            }

            let delimiter = marker.to_string().repeat(width);
            let candidate = (
                format!("{lead}{delimiter}{body}{delimiter}{trail}{tail}"),
                inner_dropped + tail_dropped,
            );
            if best.as_ref().map_or(true, |(_, dropped)| candidate.1 < *dropped) {
                best = Some(candidate);
            }
        }

        best.unwrap_or_else(|| self.write_unmarked(index, prev, children))
    }

    /// Write a span's children in its place, without markers.
    fn write_unmarked(&self, index: usize, prev: Option<char>, children: &[Inline]) -> Written {
        let mut spliced = children.to_vec();
        spliced.extend_from_slice(&self.inlines[index + 1..]);
        let spliced = merge_adjacent(spliced);
        let (text, dropped) =
            InlineWriter::new(&spliced, self.after, self.open.clone()).write_from(0, prev);
        (text, dropped + 1)
    }
}

/// A marker may not extend the delimiter run before it, and `_` may not
/// open inside a word.
fn can_open(marker: char, before: Option<char>) -> bool {
    before != Some(marker) && !(marker == '_' && before.is_some_and(char::is_alphanumeric))
}

fn can_close(marker: char, next: Option<char>) -> bool {
    can_open(marker, next)
}

fn render_atom(inline: &Inline) -> String {
    match inline {
        Inline::Text(text) => escape_text(text),
        Inline::Code(code) => render_code(code),
        Inline::Link { text, url } => match link_label(text, url) {
            "" => String::new(),
            label => format!("[{}]({})", escape_text(label), url),
        },
        Inline::Bold(children) | Inline::Italic(children) => render_inlines(children),
    }
}

fn render_code(code: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`') + 1);
    let needs_padding = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() >= 2
            && code.starts_with(' ')
            && code.ends_with(' ')
            && !code.trim().is_empty());

    if needs_padding {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for x in text.chars() {
        if x == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (index, &c) in chars.iter().enumerate() {
        match c {
            '\\' | '`' | '*' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '_' => {
                let inside_word = index > 0
                    && chars[index - 1].is_alphanumeric()
                    && chars.get(index + 1).is_some_and(|n| n.is_alphanumeric());
                if !inside_word {
                    out.push('\\');
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

/// Escape a leading character that would otherwise start a different block.
fn escape_block_start(text: String) -> String {
    let first = match text.chars().next() {
        Some(c) => c,
        None => return text,
    };

    if matches!(first, '#' | '>' | '-' | '+' | '~' | '=') {
        return format!("\\{text}");
    }

    if first.is_ascii_digit() {
        let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
        if matches!(text[digits..].chars().next(), Some('.') | Some(')')) {
            return format!("{}\\{}", &text[..digits], &text[digits..]);
        }
    }

    text
}

/// Keep a trailing `#` in heading text from reading as a closing sequence.
fn escape_heading_end(text: String) -> String {
    if !text.ends_with('#') {
        return text;
    }
    let stem = text.trim_end_matches('#');
    format!("{stem}\\{}", &text[stem.len()..])
}

fn collapse_newlines(text: &str) -> String {
    if text.contains('\n') {
        text.replace("\r\n", " ").replace('\n', " ")
    } else {
        text.to_string()
    }
}
