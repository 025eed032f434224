#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use strata_engine::format::markup::{parse_document, write_document, Directive, MarkupKind, MarkupNode};

fn text(key: &str, value: &str) -> MarkupNode {
    MarkupNode {
        directive: Directive::new(key),
        kind: MarkupKind::Text(value.to_string()),
    }
}

proptest! {
    // Character data, including edge whitespace and markup specials, is
    // content; only the writer's own newline and indent are formatting.
    #[test]
    fn prop_text_survives_document(value in "[ -~\n\t\r]{0,40}") {
        let nodes = vec![MarkupNode {
            directive: Directive::new("div"),
            kind: MarkupKind::Element {
                tag: "div".to_string(),
                attributes: BTreeMap::new(),
                children: vec![text("t", &value)],
            },
        }];
        let doc = write_document(&nodes).unwrap();
        prop_assert_eq!(parse_document(&doc).unwrap(), nodes);
    }

    #[test]
    fn prop_attribute_values_survive_document(value in "[ -~\n]{0,30}") {
        let mut attributes = BTreeMap::new();
        attributes.insert("title".to_string(), value);
        let nodes = vec![MarkupNode {
            directive: Directive::new("a"),
            kind: MarkupKind::Element {
                tag: "a".to_string(),
                attributes,
                children: Vec::new(),
            },
        }];
        let doc = write_document(&nodes).unwrap();
        prop_assert_eq!(parse_document(&doc).unwrap(), nodes);
    }

    #[test]
    fn prop_writing_is_deterministic(values in proptest::collection::vec("[a-z ]{0,8}", 0..6)) {
        let nodes: Vec<MarkupNode> = values
            .iter()
            .enumerate()
            .map(|(i, v)| text(&format!("k{}", i), v))
            .collect();
        prop_assert_eq!(write_document(&nodes).unwrap(), write_document(&nodes).unwrap());
    }
}
