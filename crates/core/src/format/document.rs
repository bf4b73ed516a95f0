//! Format-neutral document model
//!
//! Every converter parses into and renders from these types, so Markdown,
//! ADF and storage XHTML never talk to each other directly.

/// A parsed document: an ordered sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading with a level in `1..=6`
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    BulletList(Vec<ListItem>),
    OrderedList(Vec<ListItem>),
    /// Fenced code block; the language tag is kept apart from the text
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    Blockquote(Vec<Block>),
}

/// A single list entry. Lists are one level deep.
pub type ListItem = Vec<Inline>;

/// Inline span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Code(String),
    Link { text: String, url: String },
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text(value.into())
    }
}

/// Text shown for a link; a link without text shows its URL, and a link
/// with neither is left out.
pub fn link_label<'a>(text: &'a str, url: &'a str) -> &'a str {
    if text.trim().is_empty() {
        url
    } else {
        text
    }
}

/// Clamp a heading level into the range every target supports.
pub fn clamp_level(level: u64) -> u8 {
    level.clamp(1, 6) as u8
}

/// Concatenate the visible text of a run of inlines, dropping all formatting.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Bold(children) | Inline::Italic(children) => {
                out.push_str(&plain_text(children))
            }
            Inline::Link { text, .. } => out.push_str(text),
        }
    }
    out
}

/// Merge neighbouring nodes of the same kind and drop empty ones.
///
/// Parsers that see formatting as flat marks (ADF) or split text nodes
/// (storage XHTML) produce sequences like `Bold[a] Bold[b]`; merging them
/// restores the nesting a Markdown author would have written.
pub fn merge_adjacent(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());

    for inline in inlines {
        let inline = match inline {
            Inline::Bold(children) => Inline::Bold(merge_adjacent(children)),
            Inline::Italic(children) => Inline::Italic(merge_adjacent(children)),
            other => other,
        };

        let is_empty = match &inline {
            Inline::Text(text) => text.is_empty(),
            Inline::Bold(children) | Inline::Italic(children) => children.is_empty(),
            Inline::Code(_) | Inline::Link { .. } => false,
        };
        if is_empty {
            continue;
        }

        let leftover = match merged.last_mut() {
            Some(last) => absorb(last, inline),
            None => Some(inline),
        };
        if let Some(inline) = leftover {
            merged.push(inline);
        }
    }

    merged
}

/// Fold `next` into `last` when both are the same kind; hand it back otherwise.
fn absorb(last: &mut Inline, next: Inline) -> Option<Inline> {
    match (last, next) {
        (Inline::Text(previous), Inline::Text(text)) => {
            previous.push_str(&text);
            None
        }
        (Inline::Bold(previous), Inline::Bold(children))
        | (Inline::Italic(previous), Inline::Italic(children)) => {
            previous.extend(children);
            let joined = merge_adjacent(std::mem::take(previous));
            *previous = joined;
            None
        }
        (_, next) => Some(next),
    }
}

/// Trim leading whitespace of the first text node and trailing whitespace of
/// the last one, descending into formatting wrappers.
pub fn trim_inlines(mut inlines: Vec<Inline>) -> Vec<Inline> {
    trim_edge(&mut inlines, Edge::Start);
    trim_edge(&mut inlines, Edge::End);
    merge_adjacent(inlines)
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

fn trim_edge(inlines: &mut [Inline], edge: Edge) {
    let node = match edge {
        Edge::Start => inlines.first_mut(),
        Edge::End => inlines.last_mut(),
    };

    match node {
        Some(Inline::Text(text)) => {
            *text = match edge {
                Edge::Start => text.trim_start().to_string(),
                Edge::End => text.trim_end().to_string(),
            };
        }
        Some(Inline::Bold(children)) | Some(Inline::Italic(children)) => {
            trim_edge(children, edge)
        }
        _ => {}
    }
}

/// Collapse every run of whitespace (including newlines) into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }

    out
}
