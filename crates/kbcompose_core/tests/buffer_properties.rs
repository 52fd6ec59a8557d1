use kbcompose_core::buffer::mutation::{delete_one, join_documents};
use kbcompose_core::buffer::offset::document_at;
use kbcompose_core::buffer::separator::{parse, SEPARATOR};
use proptest::prelude::*;

fn document_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9éü,.!? \n\t]{0,40}"
        .prop_filter("content must not be blank", |text| !text.trim().is_empty())
}

fn padding() -> impl Strategy<Value = String> {
    "[ \n\t]{0,4}"
}

proptest! {
    #[test]
    fn join_then_parse_round_trips(docs in prop::collection::vec(document_text(), 0..8)) {
        let trimmed: Vec<String> = docs.iter().map(|doc| doc.trim().to_string()).collect();
        let parsed = parse(&join_documents(&trimmed));
        let contents: Vec<String> = parsed.into_iter().map(|doc| doc.content).collect();
        prop_assert_eq!(contents, trimmed);
    }

    #[test]
    fn parsed_content_is_trimmed_and_slices_exactly(
        segments in prop::collection::vec((padding(), document_text(), padding()), 1..6)
    ) {
        let buffer = segments
            .iter()
            .map(|(lead, body, trail)| format!("{lead}{body}{trail}"))
            .collect::<Vec<_>>()
            .join(SEPARATOR);

        let docs = parse(&buffer);
        prop_assert_eq!(docs.len(), segments.len());
        for (position, doc) in docs.iter().enumerate() {
            prop_assert_eq!(doc.index, position);
            prop_assert_eq!(doc.content.trim(), doc.content.as_str());
            prop_assert_eq!(&buffer[doc.start_pos..doc.end_pos], doc.content.as_str());
        }
    }

    #[test]
    fn every_position_in_a_document_maps_back_to_it(
        docs in prop::collection::vec(document_text(), 1..5)
    ) {
        let buffer = docs.join(SEPARATOR);
        for doc in parse(&buffer) {
            for pos in doc.start_pos..=doc.end_pos {
                if buffer.is_char_boundary(pos) {
                    prop_assert_eq!(document_at(pos, &buffer), Some(doc.index));
                }
            }
        }
    }

    #[test]
    fn delete_keeps_the_others_in_order(
        docs in prop::collection::vec(document_text(), 1..6),
        pick in any::<prop::sample::Index>()
    ) {
        let buffer = docs.join(SEPARATOR);
        let parsed = parse(&buffer);
        let target = pick.index(parsed.len());

        let mut expected: Vec<String> = parsed.iter().map(|doc| doc.content.clone()).collect();
        expected.remove(target);

        let after = parse(&delete_one(&parsed, target).unwrap());
        let actual: Vec<String> = after.iter().map(|doc| doc.content.clone()).collect();
        prop_assert_eq!(actual, expected);
        for (position, doc) in after.iter().enumerate() {
            prop_assert_eq!(doc.index, position);
        }
    }
}
