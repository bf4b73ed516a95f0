//! Confluence storage format reader and writer
//!
//! Storage format is the XHTML dialect Data Center and Server keep page
//! bodies in. Code blocks are `code` macros whose language is a macro
//! parameter and whose text sits in a CDATA section.

use std::sync::OnceLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use super::document::{
    clamp_level, collapse_whitespace, link_label, merge_adjacent, plain_text, trim_inlines, Block,
    Document, Inline,
};

// ============================================================================
// Document -> storage
// ============================================================================

/// Render a [`Document`] as a storage-format XHTML fragment.
pub fn from_document(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        write_block(block, &mut out);
    }
    out
}

fn write_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            write_inlines(content, out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::Paragraph(content) => {
            out.push_str("<p>");
            write_inlines(content, out);
            out.push_str("</p>");
        }
        Block::BulletList(items) => write_list("ul", items, out),
        Block::OrderedList(items) => write_list("ol", items, out),
        Block::CodeBlock { language, text } => {
            out.push_str(r#"<ac:structured-macro ac:name="code">"#);
            if let Some(language) = language {
                out.push_str(r#"<ac:parameter ac:name="language">"#);
                out.push_str(&html_escape::encode_text(language));
                out.push_str("</ac:parameter>");
            }
            out.push_str("<ac:plain-text-body><![CDATA[");
            // `]]>` cannot appear inside CDATA; split it across two sections.
            out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]></ac:plain-text-body></ac:structured-macro>");
        }
        Block::Blockquote(blocks) => {
            out.push_str("<blockquote>");
            for block in blocks {
                write_block(block, out);
            }
            out.push_str("</blockquote>");
        }
    }
}

fn write_list(tag: &str, items: &[Vec<Inline>], out: &mut String) {
    out.push_str(&format!("<{tag}>"));
    for item in items.iter().filter(|item| !item.is_empty()) {
        out.push_str("<li>");
        write_inlines(item, out);
        out.push_str("</li>");
    }
    out.push_str(&format!("</{tag}>"));
}

fn write_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Inline::Bold(children) => {
                out.push_str("<strong>");
                write_inlines(children, out);
                out.push_str("</strong>");
            }
            Inline::Italic(children) => {
                out.push_str("<em>");
                write_inlines(children, out);
                out.push_str("</em>");
            }
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&html_escape::encode_text(code));
                out.push_str("</code>");
            }
            Inline::Link { text, url } => {
                let label = link_label(text, url);
                if label.is_empty() {
                    continue;
                }
                out.push_str("<a href=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(url));
                out.push_str("\">");
                out.push_str(&html_escape::encode_text(label));
                out.push_str("</a>");
            }
        }
    }
}

// ============================================================================
// storage -> Document
// ============================================================================

fn cdata_regex() -> &'static Regex {
    static CDATA: OnceLock<Regex> = OnceLock::new();
    CDATA.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid CDATA regex"))
}

/// Read a storage-format fragment into a [`Document`].
///
/// The HTML parser treats CDATA as a comment, so sections are turned into
/// escaped text first. Unknown elements contribute their text.
pub fn to_document(storage: &str) -> Document {
    let prepared = cdata_regex().replace_all(storage, |captures: &regex::Captures| {
        html_escape::encode_text(&captures[1]).into_owned()
    });

    let fragment = Html::parse_fragment(&prepared);
    Document::new(blocks_from_children(fragment.root_element()))
}

fn is_inline_element(name: &str) -> bool {
    matches!(
        name,
        "strong"
            | "b"
            | "em"
            | "i"
            | "code"
            | "a"
            | "span"
            | "u"
            | "s"
            | "del"
            | "sub"
            | "sup"
            | "br"
            | "ac:link"
            | "ri:user"
            | "ri:page"
            | "ac:emoticon"
    )
}

fn blocks_from_children(parent: ElementRef<'_>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Inline> = Vec::new();

    for child in parent.children() {
        match child.value() {
            Node::Text(text) => pending.push(Inline::Text(collapse_whitespace(text))),
            Node::Element(_) => {
                let Some(element) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = element.value().name();
                if is_inline_element(name) {
                    pending.extend(inlines_from_element(element));
                } else {
                    flush_paragraph(&mut pending, &mut blocks);
                    blocks.extend(block_from_element(element, name));
                }
            }
            _ => {}
        }
    }

    flush_paragraph(&mut pending, &mut blocks);
    blocks
}

fn flush_paragraph(pending: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    let inlines = trim_inlines(merge_adjacent(std::mem::take(pending)));
    if !inlines.is_empty() {
        blocks.push(Block::Paragraph(inlines));
    }
}

fn block_from_element(element: ElementRef<'_>, name: &str) -> Vec<Block> {
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<u64>().unwrap_or(1);
            vec![Block::Heading {
                level: clamp_level(level),
                content: trimmed_inlines(element),
            }]
        }
        "p" => {
            let inlines = trimmed_inlines(element);
            if inlines.is_empty() {
                vec![]
            } else {
                vec![Block::Paragraph(inlines)]
            }
        }
        "ul" => vec![Block::BulletList(list_items(element))],
        "ol" => vec![Block::OrderedList(list_items(element))],
        "blockquote" => vec![Block::Blockquote(blocks_from_children(element))],
        "pre" => vec![Block::CodeBlock {
            language: None,
            text: element.text().collect(),
        }],
        "ac:structured-macro" => code_macro(element).into_iter().collect(),
        "hr" => vec![],
        // div, table, ac:layout and friends: keep whatever they contain.
        _ => blocks_from_children(element),
    }
}

fn code_macro(element: ElementRef<'_>) -> Option<Block> {
    let macro_name = element.value().attr("ac:name").unwrap_or_default();

    if macro_name != "code" && macro_name != "noformat" {
        let blocks = blocks_from_children(element);
        let text = blocks
            .iter()
            .map(block_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return (!text.is_empty()).then(|| Block::Paragraph(vec![Inline::Text(text)]));
    }

    let mut language = None;
    let mut text = String::new();

    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "ac:parameter" if child.value().attr("ac:name") == Some("language") => {
                let value = child.text().collect::<String>().trim().to_string();
                if !value.is_empty() {
                    language = Some(value);
                }
            }
            "ac:plain-text-body" => text = child.text().collect(),
            _ => {}
        }
    }

    Some(Block::CodeBlock { language, text })
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { content, .. } | Block::Paragraph(content) => plain_text(content),
        Block::BulletList(items) | Block::OrderedList(items) => items
            .iter()
            .map(|item| plain_text(item))
            .collect::<Vec<_>>()
            .join(" "),
        Block::CodeBlock { text, .. } => text.clone(),
        Block::Blockquote(blocks) => blocks.iter().map(block_text).collect::<Vec<_>>().join(" "),
    }
}

/// Items of a `ul`/`ol`. Nested lists become following siblings.
fn list_items(list: ElementRef<'_>) -> Vec<Vec<Inline>> {
    let mut items = Vec::new();

    for item in list.children().filter_map(ElementRef::wrap) {
        if item.value().name() != "li" {
            continue;
        }

        let mut inlines = Vec::new();
        let mut nested = Vec::new();

        for child in item.children() {
            let element = match child.value() {
                Node::Text(text) => {
                    inlines.push(Inline::Text(collapse_whitespace(text)));
                    continue;
                }
                Node::Element(_) => match ElementRef::wrap(child) {
                    Some(element) => element,
                    None => continue,
                },
                _ => continue,
            };

            match element.value().name() {
                "ul" | "ol" => nested.extend(list_items(element)),
                "p" => {
                    if !inlines.is_empty() {
                        inlines.push(Inline::text(" "));
                    }
                    inlines.extend(trimmed_inlines(element));
                }
                _ => inlines.extend(inlines_from_element(element)),
            }
        }

        let inlines = trim_inlines(merge_adjacent(inlines));
        if !inlines.is_empty() {
            items.push(inlines);
        }
        items.extend(nested);
    }

    items
}

fn trimmed_inlines(element: ElementRef<'_>) -> Vec<Inline> {
    trim_inlines(merge_adjacent(child_inlines(element)))
}

fn child_inlines(element: ElementRef<'_>) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => inlines.push(Inline::Text(collapse_whitespace(text))),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    inlines.extend(inlines_from_element(element));
                }
            }
            _ => {}
        }
    }
    inlines
}

fn inlines_from_element(element: ElementRef<'_>) -> Vec<Inline> {
    match element.value().name() {
        "strong" | "b" => vec![Inline::Bold(child_inlines(element))],
        "em" | "i" => vec![Inline::Italic(child_inlines(element))],
        "code" => vec![Inline::Code(element.text().collect())],
        "a" => {
            let text = plain_text(&child_inlines(element));
            match element.value().attr("href") {
                Some(url) => {
                    let label = link_label(&text, url);
                    if label.is_empty() {
                        vec![]
                    } else {
                        vec![Inline::Link {
                            text: label.to_string(),
                            url: url.to_string(),
                        }]
                    }
                }
                None => vec![Inline::Text(text)],
            }
        }
        "br" => vec![Inline::text(" ")],
        "ac:parameter" => vec![],
        _ => child_inlines(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_document_code_macro_with_language() {
        let doc = Document::new(vec![Block::CodeBlock {
            language: Some("python".to_string()),
            text: "print(1)".to_string(),
        }]);

        assert_eq!(
            from_document(&doc),
            r#"<ac:structured-macro ac:name="code"><ac:parameter ac:name="language">python</ac:parameter><ac:plain-text-body><![CDATA[print(1)]]></ac:plain-text-body></ac:structured-macro>"#
        );
    }

    #[test]
    fn test_from_document_escapes_text_and_attributes() {
        let doc = Document::new(vec![Block::Paragraph(vec![
            Inline::text("a < b & c"),
            Inline::Link {
                text: "q".to_string(),
                url: "https://x.io/?a=1&b=\"2\"".to_string(),
            },
        ])]);

        assert_eq!(
            from_document(&doc),
            r#"<p>a &lt; b &amp; c<a href="https://x.io/?a=1&amp;b=&quot;2&quot;">q</a></p>"#
        );
    }

    #[test]
    fn test_from_document_lists_and_headings() {
        let doc = Document::new(vec![
            Block::Heading {
                level: 2,
                content: vec![Inline::text("Steps")],
            },
            Block::OrderedList(vec![
                vec![Inline::Bold(vec![Inline::text("one")])],
                vec![Inline::Code("two".to_string())],
            ]),
        ]);

        assert_eq!(
            from_document(&doc),
            "<h2>Steps</h2><ol><li><strong>one</strong></li><li><code>two</code></li></ol>"
        );
    }

    #[test]
    fn test_from_document_skips_empty_items_and_labels_bare_links() {
        let doc = Document::new(vec![
            Block::BulletList(vec![vec![Inline::text("a")], vec![], vec![Inline::text("b")]]),
            Block::Paragraph(vec![
                Inline::Link {
                    text: String::new(),
                    url: "https://x.io".to_string(),
                },
                Inline::Link {
                    text: String::new(),
                    url: String::new(),
                },
            ]),
        ]);

        assert_eq!(
            from_document(&doc),
            r#"<ul><li>a</li><li>b</li></ul><p><a href="https://x.io">https://x.io</a></p>"#
        );
    }

    #[test]
    fn test_to_document_anchor_without_text() {
        let doc = to_document(r#"<p><a href="https://x.io"></a><a href=""> </a></p>"#);

        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(vec![Inline::Link {
                text: "https://x.io".to_string(),
                url: "https://x.io".to_string(),
            }])]
        );
    }

    #[test]
    fn test_to_document_reads_code_macro() {
        let storage = r#"<ac:structured-macro ac:name="code" ac:schema-version="1"><ac:parameter ac:name="language">rust</ac:parameter><ac:plain-text-body><![CDATA[fn main() {
    println!("<hi>");
}]]></ac:plain-text-body></ac:structured-macro>"#;

        let doc = to_document(storage);

        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                text: "fn main() {\n    println!(\"<hi>\");\n}".to_string()
            }]
        );
    }

    #[test]
    fn test_to_document_split_cdata_round_trips() {
        let block = Block::CodeBlock {
            language: None,
            text: "a ]]> b".to_string(),
        };
        let storage = from_document(&Document::new(vec![block.clone()]));

        assert_eq!(to_document(&storage).blocks, vec![block]);
    }

    #[test]
    fn test_to_document_pretty_printed_markup() {
        let storage = "<p>\n  Hello <strong>bold</strong>\n  world\n</p>\n<ul>\n  <li><p>one</p></li>\n  <li>two <em>x</em></li>\n</ul>";

        let doc = to_document(storage);

        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph(vec![
                    Inline::text("Hello "),
                    Inline::Bold(vec![Inline::text("bold")]),
                    Inline::text(" world"),
                ]),
                Block::BulletList(vec![
                    vec![Inline::text("one")],
                    vec![Inline::text("two "), Inline::Italic(vec![Inline::text("x")])],
                ]),
            ]
        );
    }

    #[test]
    fn test_to_document_unknown_macro_and_layout_keep_text() {
        let storage = r#"<ac:layout><ac:layout-section><ac:layout-cell><p>Inside</p></ac:layout-cell></ac:layout-section></ac:layout><ac:structured-macro ac:name="info"><ac:rich-text-body><p>Note</p></ac:rich-text-body></ac:structured-macro>"#;

        let doc = to_document(storage);

        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph(vec![Inline::text("Inside")]),
                Block::Paragraph(vec![Inline::text("Note")]),
            ]
        );
    }

    #[test]
    fn test_to_document_pre_block() {
        let doc = to_document("<pre>x = 1</pre>");
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "x = 1".to_string()
            }]
        );
    }

    #[test]
    fn test_to_document_plain_text() {
        let doc = to_document("just words");
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(vec![Inline::text("just words")])]
        );
    }
}
