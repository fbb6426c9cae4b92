//! Property tests for content normalization.
//!
//! Whatever shape stored content arrives in, normalization must produce a
//! non-empty array of element nodes, and must leave canonical input alone.

use draftsafe_core::{ContentValue, LegacyContent, RichTextBlock, RichTextItem};
use proptest::prelude::*;
use serde_json::{json, Value};

fn block_strategy() -> impl Strategy<Value = RichTextBlock> {
    (
        prop_oneof![
            Just("heading".to_string()),
            Just("paragraph".to_string()),
            Just("list".to_string()),
            "[a-z]{1,8}",
        ],
        prop::option::of(0u32..7),
        prop::option::of("[a-zA-Z ]{0,12}"),
        prop::collection::vec(prop::option::of("[a-z]{0,6}"), 0..4),
    )
        .prop_map(|(kind, level, content, items)| RichTextBlock {
            kind,
            level,
            content,
            items: items
                .into_iter()
                .map(|content| RichTextItem { content })
                .collect(),
        })
}

/// Blocks as old clients actually stored them: levels as strings or
/// numbers, text as strings or numbers, and the odd bare value.
fn loose_block_strategy() -> impl Strategy<Value = Value> {
    let level = prop_oneof![
        Just(Value::Null),
        (0u64..400).prop_map(Value::from),
        (0u64..7).prop_map(|l| Value::from(l.to_string())),
        "[a-z]{1,4}".prop_map(Value::from),
    ];
    let content = prop_oneof![
        Just(Value::Null),
        "[a-zA-Z ]{0,12}".prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ];
    prop_oneof![
        4 => ("heading|paragraph|quote", level, content)
            .prop_map(|(kind, level, content)| json!({ "type": kind, "level": level, "content": content })),
        1 => "[a-z]{0,8}".prop_map(Value::from),
        1 => any::<i64>().prop_map(Value::from),
        1 => Just(Value::Null),
    ]
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{1,10}".prop_map(Value::from),
        Just(json!({ "text": "a" })),
    ]
}

fn is_element_array(content: &ContentValue) -> bool {
    match content.as_json() {
        Value::Array(nodes) => {
            !nodes.is_empty()
                && nodes
                    .iter()
                    .all(|n| n.get("type").is_some() && n.get("children").is_some())
        }
        _ => false,
    }
}

proptest! {
    #[test]
    fn rich_text_normalizes_to_one_node_per_block(
        blocks in prop::collection::vec(block_strategy(), 1..8)
    ) {
        let raw = json!({ "type": "rich_text", "blocks": serde_json::to_value(&blocks).unwrap() });
        let content = ContentValue::normalize(raw);

        prop_assert!(is_element_array(&content));
        prop_assert_eq!(content.as_json().as_array().unwrap().len(), blocks.len());
    }

    #[test]
    fn loose_blocks_each_keep_their_node(
        blocks in prop::collection::vec(loose_block_strategy(), 1..8)
    ) {
        let raw = json!({ "type": "rich_text", "blocks": blocks.clone() });
        let content = ContentValue::normalize(raw);

        prop_assert!(is_element_array(&content));
        prop_assert_eq!(content.as_json().as_array().unwrap().len(), blocks.len());

        // string text is never replaced by the raw JSON of the document
        for (block, text) in blocks.iter().zip(content.paragraph_texts()) {
            if let Some(expected) = block.get("content").and_then(Value::as_str) {
                prop_assert_eq!(text.as_str(), expected);
            }
        }
    }

    #[test]
    fn scalars_never_vanish(raw in scalar_strategy()) {
        let content = ContentValue::normalize(raw.clone());

        prop_assert!(is_element_array(&content));
        prop_assert_eq!(content.paragraph_texts(), vec![raw.to_string()]);
    }

    #[test]
    fn canonical_content_is_a_fixed_point(
        paragraphs in prop::collection::vec("[a-zA-Z0-9 ]{0,16}", 1..6)
    ) {
        let canonical = ContentValue::from_paragraphs(&paragraphs);
        let again = LegacyContent::classify(canonical.clone().into_json()).into_content();

        prop_assert_eq!(&again, &canonical);
        prop_assert_eq!(again.paragraph_texts(), paragraphs);
    }
}
