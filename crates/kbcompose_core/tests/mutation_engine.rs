use kbcompose_core::buffer::mutation::{
    append_imported, insert_separator, replace_all, replace_one, MutationError,
};
use kbcompose_core::buffer::separator::{parse, CANONICAL_SEPARATOR, SEPARATOR};
use kbcompose_core::{ComposerConfig, ComposerSession, OffsetError};

fn texts(session: &ComposerSession) -> Vec<String> {
    session.contents()
}

#[test]
fn insert_separator_always_appends_at_end() {
    let mut session = ComposerSession::default();
    session.set_buffer("first");
    session.set_cursor(0);
    session.insert_separator();

    assert_eq!(session.buffer(), format!("first{CANONICAL_SEPARATOR}"));
    assert_eq!(texts(&session), ["first"]);
    assert_eq!(insert_separator(""), CANONICAL_SEPARATOR);
}

#[test]
fn append_imported_replaces_blank_buffer() {
    assert_eq!(append_imported("  \n ", "imported"), "imported");
    assert_eq!(
        append_imported("draft", "imported"),
        format!("draft{CANONICAL_SEPARATOR}imported")
    );

    let mut session = ComposerSession::default();
    session.append_imported("one");
    session.append_imported("two");
    assert_eq!(texts(&session), ["one", "two"]);
}

#[test]
fn replace_one_rejects_single_or_blank_chunks() {
    let docs = parse(&format!("a{SEPARATOR}b"));
    assert_eq!(
        replace_one(&docs, 0, &["only"]),
        Err(MutationError::NothingToSplit { chunks: 1 })
    );
    assert_eq!(
        replace_one(&docs, 0, &["kept", "   "]),
        Err(MutationError::NothingToSplit { chunks: 1 })
    );
    assert_eq!(
        replace_one(&docs, 5, &["x", "y"]),
        Err(MutationError::IndexOutOfRange { index: 5, len: 2 })
    );
}

#[test]
fn replace_all_drops_blank_contents() {
    let buffer = replace_all(&[" one ", "", "two"]);
    assert_eq!(buffer, format!("one{CANONICAL_SEPARATOR}two"));
}

#[test]
fn stale_index_mutations_are_no_ops() {
    let mut session = ComposerSession::default();
    session.set_buffer(format!("a{SEPARATOR}b"));
    let before = session.buffer().to_string();

    assert!(!session.delete_document(2));
    assert!(!session.replace_document(7, &["x", "y"]));
    assert!(!session.replace_document(0, &["same"]));
    assert_eq!(session.buffer(), before);
    assert_eq!(texts(&session), ["a", "b"]);
}

#[test]
fn session_documents_track_every_edit() {
    let mut session = ComposerSession::default();
    session.set_buffer(format!("one{SEPARATOR}two{SEPARATOR}three"));
    assert!(session.delete_document(1));
    assert_eq!(texts(&session), ["one", "three"]);

    assert!(session.replace_document(0, &["1a", "1b"]));
    assert_eq!(texts(&session), ["1a", "1b", "three"]);
    for (position, doc) in session.documents().iter().enumerate() {
        assert_eq!(doc.index, position);
        assert_eq!(&session.buffer()[doc.start_pos..doc.end_pos], doc.content);
    }
}

#[test]
fn cursor_and_selection_stay_inside_the_buffer() {
    let mut session = ComposerSession::default();
    session.set_buffer(format!("héllo{SEPARATOR}world"));

    assert_eq!(session.set_cursor(-5), 0);
    assert_eq!(session.set_cursor(2), 1);
    assert_eq!(session.set_cursor(10_000), session.buffer().len());
    assert_eq!(session.document_at_cursor(), Some(1));

    let scroll = session.select_document(1, 1_000).unwrap();
    assert_eq!(scroll, 0);
    let selection = session.selection().unwrap();
    assert_eq!(&session.buffer()[selection], "world");
    assert_eq!(session.active_document().map(|doc| doc.index), Some(1));

    assert_eq!(
        session.select_document(9, 0),
        Err(OffsetError::OutOfRange { index: 9, len: 2 })
    );

    session.set_buffer("hé");
    assert!(session.cursor() <= session.buffer().len());
    assert!(session.buffer().is_char_boundary(session.cursor()));
}

#[test]
fn config_preview_limits_flow_into_parsing() {
    let config = ComposerConfig {
        preview_limit: 10,
        preview_min_break: 2,
        ..ComposerConfig::default()
    };
    let mut session = ComposerSession::from_config(&config);
    session.set_buffer("alpha beta gamma delta");
    assert_eq!(session.documents()[0].preview, "alpha...");
}
