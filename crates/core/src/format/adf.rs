//! Atlassian Document Format (ADF) reader and writer
//!
//! ADF is the JSON tree Jira and Confluence Cloud store rich text in. Inline
//! formatting is flattened into `marks` on `text` nodes, so the writer walks
//! the nesting with a mark stack and the reader rebuilds it with
//! [`merge_adjacent`].

use serde_json::{json, Map, Value};

use super::document::{
    clamp_level, link_label, merge_adjacent, trim_inlines, Block, Document, Inline,
};

// ============================================================================
// Document -> ADF
// ============================================================================

/// Build an ADF `doc` node from a [`Document`].
pub fn from_document(document: &Document) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": document.blocks.iter().map(block_to_adf).collect::<Vec<_>>(),
    })
}

fn block_to_adf(block: &Block) -> Value {
    match block {
        Block::Heading { level, content } => json!({
            "type": "heading",
            "attrs": { "level": level },
            "content": inlines_to_adf(content),
        }),
        Block::Paragraph(content) => paragraph(content),
        Block::BulletList(items) => json!({
            "type": "bulletList",
            "content": list_items_to_adf(items),
        }),
        Block::OrderedList(items) => json!({
            "type": "orderedList",
            "attrs": { "order": 1 },
            "content": list_items_to_adf(items),
        }),
        Block::CodeBlock { language, text } => {
            let mut node = Map::new();
            node.insert("type".into(), json!("codeBlock"));
            if let Some(language) = language {
                node.insert("attrs".into(), json!({ "language": language }));
            }
            // Empty text nodes are invalid ADF.
            let content = if text.is_empty() {
                vec![]
            } else {
                vec![json!({ "type": "text", "text": text })]
            };
            node.insert("content".into(), Value::Array(content));
            Value::Object(node)
        }
        Block::Blockquote(blocks) => json!({
            "type": "blockquote",
            "content": blocks.iter().map(block_to_adf).collect::<Vec<_>>(),
        }),
    }
}

fn paragraph(content: &[Inline]) -> Value {
    json!({
        "type": "paragraph",
        "content": inlines_to_adf(content),
    })
}

/// Empty items are skipped; the readers drop them too.
fn list_items_to_adf(items: &[Vec<Inline>]) -> Vec<Value> {
    items
        .iter()
        .filter(|item| !item.is_empty())
        .map(|item| list_item(item))
        .collect()
}

fn list_item(content: &[Inline]) -> Value {
    json!({
        "type": "listItem",
        "content": [paragraph(content)],
    })
}

fn inlines_to_adf(inlines: &[Inline]) -> Vec<Value> {
    let mut out = Vec::new();
    let mut marks = Vec::new();
    for inline in inlines {
        push_inline(inline, &mut marks, &mut out);
    }
    out
}

/// Flatten one inline into `text` nodes, carrying the marks of its ancestors.
///
/// Marks are listed outermost first; the reader applies them in reverse.
fn push_inline(inline: &Inline, marks: &mut Vec<Value>, out: &mut Vec<Value>) {
    match inline {
        Inline::Text(text) => {
            if !text.is_empty() {
                out.push(text_node(text, marks));
            }
        }
        Inline::Code(code) => {
            if !code.is_empty() {
                marks.push(json!({ "type": "code" }));
                out.push(text_node(code, marks));
                marks.pop();
            }
        }
        Inline::Link { text, url } => {
            let label = link_label(text, url);
            if !label.is_empty() {
                marks.push(json!({ "type": "link", "attrs": { "href": url } }));
                out.push(text_node(label, marks));
                marks.pop();
            }
        }
        Inline::Bold(children) => {
            marks.push(json!({ "type": "strong" }));
            for child in children {
                push_inline(child, marks, out);
            }
            marks.pop();
        }
        Inline::Italic(children) => {
            marks.push(json!({ "type": "em" }));
            for child in children {
                push_inline(child, marks, out);
            }
            marks.pop();
        }
    }
}

fn text_node(text: &str, marks: &[Value]) -> Value {
    let mut node = Map::new();
    node.insert("type".into(), json!("text"));
    node.insert("text".into(), json!(text));
    if !marks.is_empty() {
        node.insert("marks".into(), Value::Array(marks.to_vec()));
    }
    Value::Object(node)
}

// ============================================================================
// ADF -> Document
// ============================================================================

/// Read an ADF tree into a [`Document`].
///
/// Accepts a `doc` node or any single node. Unknown node types contribute
/// their text instead of failing.
pub fn to_document(value: &Value) -> Document {
    let nodes = match node_type(value) {
        Some("doc") => children(value).to_vec(),
        Some(_) => vec![value.clone()],
        None => vec![],
    };
    Document::new(blocks_from_nodes(&nodes))
}

fn node_type(node: &Value) -> Option<&str> {
    node.get("type").and_then(|t| t.as_str())
}

fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(|c| c.as_array())
        .map(|c| c.as_slice())
        .unwrap_or(&[])
}

fn is_inline_node(node: &Value) -> bool {
    matches!(
        node_type(node),
        Some("text" | "hardBreak" | "mention" | "emoji" | "inlineCard" | "date" | "status")
    )
}

/// Convert a sequence of sibling nodes into blocks; stray inline nodes are
/// gathered into paragraphs.
fn blocks_from_nodes(nodes: &[Value]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Value> = Vec::new();

    for node in nodes {
        if is_inline_node(node) {
            pending.push(node.clone());
            continue;
        }

        flush_paragraph(&mut pending, &mut blocks);
        blocks.extend(block_from_node(node));
    }

    flush_paragraph(&mut pending, &mut blocks);
    blocks
}

fn flush_paragraph(pending: &mut Vec<Value>, blocks: &mut Vec<Block>) {
    if pending.is_empty() {
        return;
    }
    let inlines = inlines_from_nodes(pending);
    pending.clear();
    if !inlines.is_empty() {
        blocks.push(Block::Paragraph(inlines));
    }
}

fn block_from_node(node: &Value) -> Vec<Block> {
    match node_type(node) {
        Some("paragraph") => {
            let inlines = inlines_from_nodes(children(node));
            if inlines.is_empty() {
                vec![]
            } else {
                vec![Block::Paragraph(inlines)]
            }
        }
        Some("heading") => {
            let level = node
                .get("attrs")
                .and_then(|a| a.get("level"))
                .and_then(|l| l.as_u64())
                .unwrap_or(1);
            vec![Block::Heading {
                level: clamp_level(level),
                content: inlines_from_nodes(children(node)),
            }]
        }
        Some("bulletList") => vec![Block::BulletList(list_items(node))],
        Some("orderedList") => vec![Block::OrderedList(list_items(node))],
        Some("codeBlock") => {
            let language = node
                .get("attrs")
                .and_then(|a| a.get("language"))
                .and_then(|l| l.as_str())
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string());
            let text = children(node)
                .iter()
                .filter_map(|child| child.get("text").and_then(|t| t.as_str()))
                .collect::<String>();
            vec![Block::CodeBlock { language, text }]
        }
        Some("blockquote") => vec![Block::Blockquote(blocks_from_nodes(children(node)))],
        Some("rule") | Some("mediaSingle") | Some("mediaGroup") | Some("media") => vec![],
        // Panels, expands, tables, layouts: keep their text content.
        _ => blocks_from_nodes(children(node)),
    }
}

/// Items of a list node. Nested lists become following siblings.
fn list_items(list: &Value) -> Vec<Vec<Inline>> {
    let mut items = Vec::new();

    for item in children(list) {
        let mut inlines = Vec::new();
        let mut nested = Vec::new();

        for child in children(item) {
            match node_type(child) {
                Some("bulletList") | Some("orderedList") => nested.extend(list_items(child)),
                Some("paragraph") | Some("heading") => {
                    if !inlines.is_empty() {
                        inlines.push(Inline::text(" "));
                    }
                    inlines.extend(inlines_from_nodes(children(child)));
                }
                _ if is_inline_node(child) => {
                    inlines.extend(inlines_from_nodes(std::slice::from_ref(child)))
                }
                _ => {
                    let text = super::markdown::render_inlines(&inlines_from_blocks(child));
                    if !text.is_empty() {
                        if !inlines.is_empty() {
                            inlines.push(Inline::text(" "));
                        }
                        inlines.push(Inline::Text(text));
                    }
                }
            }
        }

        let inlines = trim_inlines(inlines);
        if !inlines.is_empty() {
            items.push(inlines);
        }
        items.extend(nested);
    }

    items
}

fn inlines_from_blocks(node: &Value) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for block in block_from_node(node) {
        match block {
            Block::Paragraph(content) | Block::Heading { content, .. } => inlines.extend(content),
            Block::CodeBlock { text, .. } => inlines.push(Inline::Code(text)),
            _ => {}
        }
    }
    inlines
}

fn inlines_from_nodes(nodes: &[Value]) -> Vec<Inline> {
    let inlines = nodes.iter().filter_map(inline_from_node).collect();
    trim_inlines(merge_adjacent(inlines))
}

fn inline_from_node(node: &Value) -> Option<Inline> {
    match node_type(node)? {
        "text" => {
            let text = node.get("text")?.as_str()?;
            let marks = node
                .get("marks")
                .and_then(|m| m.as_array())
                .map(|m| m.as_slice())
                .unwrap_or(&[]);
            Some(apply_marks(text, marks))
        }
        "hardBreak" => Some(Inline::text(" ")),
        "mention" | "emoji" | "date" | "status" => {
            let attrs = node.get("attrs")?;
            attrs
                .get("text")
                .or_else(|| attrs.get("shortName"))
                .or_else(|| attrs.get("timestamp"))
                .and_then(|t| t.as_str())
                .map(Inline::text)
        }
        "inlineCard" => {
            let url = node.get("attrs")?.get("url")?.as_str()?;
            Some(Inline::Link {
                text: url.to_string(),
                url: url.to_string(),
            })
        }
        _ => None,
    }
}

/// Rebuild nested inlines from a flat list of marks (outermost first).
fn apply_marks(text: &str, marks: &[Value]) -> Inline {
    let kinds: Vec<&str> = marks.iter().filter_map(node_type).collect();

    let link = marks
        .iter()
        .find(|m| node_type(m) == Some("link"))
        .and_then(|m| m.get("attrs"))
        .and_then(|a| a.get("href"))
        .and_then(|h| h.as_str());

    let mut inline = if kinds.contains(&"code") {
        Inline::Code(text.to_string())
    } else if let Some(url) = link {
        Inline::Link {
            text: text.to_string(),
            url: url.to_string(),
        }
    } else {
        Inline::text(text)
    };

    for kind in kinds.iter().rev() {
        inline = match *kind {
            "strong" => Inline::Bold(vec![inline]),
            "em" => Inline::Italic(vec![inline]),
            _ => inline,
        };
    }

    inline
}
