//! Property-based tests for the Markdown round trip
//!
//! Documents are generated from the supported node set, rendered to
//! Markdown, pushed through each target and back, and compared with the
//! normalized source. Text mixes words with Markdown metacharacters, spans
//! may touch, and lists may hold empty items.

use super::document::{Block, Document, Inline};
use super::*;
use proptest::prelude::*;

// Markdown metacharacters and punctuation that must survive escaping.
const SYMBOLS: &[&str] = &[
    "*", "_", "**", "__", "[", "]", "(", ")", "\\", "`", "#", "1.", "2)", "-", "+", ">", "<",
    "&", "~", "!", ":",
];

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        5 => "[a-z]{1,6}",
        2 => prop::sample::select(SYMBOLS).prop_map(String::from),
    ]
}

fn word() -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 1..4).prop_map(|tokens| tokens.concat())
}

fn words() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..4).prop_map(|words| words.join(" "))
}

// Code spans stay free of backticks; at the start of a line a long fence
// would open a code block instead.
fn code_word() -> impl Strategy<Value = String> {
    "[a-z*_#<&\\[\\]\\\\]{1,8}"
}

fn link() -> impl Strategy<Value = Inline> {
    (
        prop_oneof![
            3 => words(),
            1 => Just(String::new()),
        ],
        "[a-z]{1,8}",
    )
        .prop_map(|(text, path)| Inline::Link {
            text,
            url: format!("https://example.com/{path}"),
        })
}

fn inline() -> impl Strategy<Value = Inline> {
    let leaf = prop_oneof![
        4 => words().prop_map(Inline::Text),
        1 => code_word().prop_map(Inline::Code),
        1 => link(),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            1 => prop::collection::vec(inner.clone(), 1..3).prop_map(Inline::Bold),
            1 => prop::collection::vec(inner, 1..3).prop_map(Inline::Italic),
        ]
    })
}

// Spans are sometimes separated by a space and sometimes written back to back.
fn inlines() -> impl Strategy<Value = Vec<Inline>> {
    prop::collection::vec((inline(), prop::bool::weighted(0.6)), 1..5).prop_map(|spans| {
        let mut out = Vec::new();
        for (index, (span, spaced)) in spans.into_iter().enumerate() {
            if index > 0 && spaced {
                out.push(Inline::text(" "));
            }
            out.push(span);
        }
        out
    })
}

fn list_item() -> impl Strategy<Value = Vec<Inline>> {
    prop_oneof![
        4 => inlines(),
        1 => Just(Vec::new()),
    ]
}

fn code_block() -> impl Strategy<Value = Block> {
    (
        prop::option::of(prop_oneof![
            Just("rust".to_string()),
            Just("python".to_string()),
            Just("sql".to_string()),
        ]),
        prop::collection::vec(words(), 0..4),
    )
        .prop_map(|(language, lines)| Block::CodeBlock {
            language,
            text: lines.join("\n"),
        })
}

fn block() -> impl Strategy<Value = Block> {
    prop_oneof![
        1 => (1u8..=6, inlines()).prop_map(|(level, content)| Block::Heading { level, content }),
        3 => inlines().prop_map(Block::Paragraph),
        1 => prop::collection::vec(list_item(), 1..4).prop_map(Block::BulletList),
        1 => prop::collection::vec(list_item(), 1..4).prop_map(Block::OrderedList),
        1 => code_block(),
        1 => prop::collection::vec(inlines().prop_map(Block::Paragraph), 1..3)
            .prop_map(Block::Blockquote),
    ]
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::vec(block(), 1..6).prop_map(Document::new)
}

proptest! {
    #[test]
    fn prop_round_trip_through_adf(doc in document()) {
        let md = markdown::render(&doc);
        let back = to_markdown(&to_target(&md, DeploymentType::Cloud));
        prop_assert_eq!(back, normalize(&md));
    }

    #[test]
    fn prop_round_trip_through_storage(doc in document()) {
        let md = markdown::render(&doc);
        let back = to_markdown(&to_target(&md, DeploymentType::DataCenter));
        prop_assert_eq!(back, normalize(&md));
    }

    #[test]
    fn prop_normalize_is_idempotent(doc in document()) {
        let once = normalize(&markdown::render(&doc));
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn prop_code_language_survives(block in code_block()) {
        let Block::CodeBlock { language, .. } = &block else {
            unreachable!("code_block only yields code blocks");
        };
        let md = markdown::render(&Document::new(vec![block.clone()]));

        let TargetDocument::Adf(value) = to_target(&md, DeploymentType::Cloud) else {
            unreachable!("cloud targets are ADF");
        };
        let adf_language = value["content"][0]["attrs"]["language"].as_str();
        prop_assert_eq!(adf_language, language.as_deref());
    }
}
