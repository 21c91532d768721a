use super::*;

#[test]
fn test_text_buffer_basic() {
    let mut buffer = TextBuffer::from_text("hello\nworld");

    assert_eq!(buffer.len_lines(), 2);
    assert_eq!(buffer.selection(), Selection::caret((0, 0)));

    buffer.set_cursor((1, 2));
    assert_eq!(buffer.selection().head(), (1, 2));

    buffer.set_cursor((9, 9));
    assert_eq!(buffer.selection().head(), (1, 5));
}

#[test]
fn test_pos_to_char() {
    let buffer = TextBuffer::from_text("hello\nworld");

    assert_eq!(buffer.pos_to_char((0, 0)), 0);
    assert_eq!(buffer.pos_to_char((1, 0)), 6);
    assert_eq!(buffer.char_to_pos(8), (1, 2));
}

#[test]
fn test_line_text_strips_line_endings() {
    let buffer = TextBuffer::from_text("one\r\ntwo\nthree");

    assert_eq!(buffer.line_text(0).as_deref(), Some("one"));
    assert_eq!(buffer.line_text(1).as_deref(), Some("two"));
    assert_eq!(buffer.line_text(2).as_deref(), Some("three"));
    assert_eq!(buffer.line_text(3), None);
    assert_eq!(buffer.end_position(), (2, 5));
}

#[test]
fn test_selected_text_uses_char_columns() {
    let mut buffer = TextBuffer::from_text("héllo wörld");
    buffer.set_selection(Selection::new((0, 6), (0, 11)));
    assert_eq!(buffer.selected_text(), "wörld");
}

#[test]
fn test_replace_range_moves_caret_and_records_change() {
    let mut buffer = TextBuffer::from_text("foo bar");
    buffer.replace_range((0, 4), (0, 7), "baz\nqux");

    assert_eq!(buffer.text(), "foo baz\nqux");
    assert_eq!(buffer.selection(), Selection::caret((1, 3)));
    assert_eq!(buffer.version(), 1);

    let changes = buffer.changes_since(0).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].start_line, 0);
    assert!(changes[0].is_bulk());
}

#[test]
fn test_single_line_edit_is_not_bulk() {
    let mut buffer = TextBuffer::from_text("a\nb\nc");
    buffer.insert((1, 1), "xyz");

    let changes = buffer.changes_since(0).unwrap();
    assert_eq!(changes[0].start_line, 1);
    assert_eq!(changes[0].removed_lines, 1);
    assert_eq!(changes[0].inserted_lines, 1);
    assert!(!changes[0].is_bulk());
}

#[test]
fn test_non_lf_line_breaks_are_bulk() {
    let mut buffer = TextBuffer::from_text("x\nfoo");
    buffer.insert((0, 1), "\ry");
    assert_eq!(buffer.len_lines(), 3);
    assert_eq!(buffer.line_text(0).as_deref(), Some("x"));

    buffer.insert((2, 3), "\u{2028}z");
    assert_eq!(buffer.line_text(2).as_deref(), Some("foo"));
    assert_eq!(buffer.line_text(3).as_deref(), Some("z"));

    let changes = buffer.changes_since(0).unwrap();
    assert_eq!((changes[0].removed_lines, changes[0].inserted_lines), (1, 2));
    assert!(changes.iter().all(|c| c.is_bulk()));
}

#[test]
fn test_apply_edits_counts_lines_like_the_rope() {
    let mut buffer = TextBuffer::from_text("a b");
    buffer.apply_edits(vec![(1..2, "\r".to_string())]);

    assert_eq!(buffer.len_lines(), 2);
    let changes = buffer.changes_since(0).unwrap();
    assert_eq!(changes[0].inserted_lines, 2);
    assert!(changes[0].is_bulk());
}

#[test]
fn test_apply_edits_is_atomic_and_remaps_selection() {
    let mut buffer = TextBuffer::from_text("foo foo foo");
    buffer.set_selection(Selection::new((0, 8), (0, 11)));

    let applied = buffer.apply_edits(vec![
        (8..11, "bar".to_string()),
        (0..3, "bar".to_string()),
        (4..7, "bar".to_string()),
    ]);

    assert!(applied);
    assert_eq!(buffer.text(), "bar bar bar");
    assert_eq!(buffer.version(), 1);
    assert_eq!(buffer.selection(), Selection::new((0, 8), (0, 11)));
    assert!(!buffer.apply_edits(Vec::new()));
}

#[test]
fn test_apply_edits_shifts_selection_after_longer_replacement() {
    let mut buffer = TextBuffer::from_text("ab ab end");
    buffer.set_cursor((0, 6));

    buffer.apply_edits(vec![(0..2, "xyz".to_string()), (3..5, "xyz".to_string())]);

    assert_eq!(buffer.text(), "xyz xyz end");
    assert_eq!(buffer.selection().head(), (0, 8));
}

#[test]
fn test_changes_since_reports_journal_gap() {
    let mut buffer = TextBuffer::from_text("");
    for _ in 0..300 {
        buffer.insert((0, 0), "x");
    }
    assert!(buffer.changes_since(0).is_none());
    assert_eq!(buffer.changes_since(299).map(|c| c.len()), Some(1));
    assert_eq!(buffer.changes_since(300).map(|c| c.len()), Some(0));
}

#[test]
fn test_focus_and_reveal_are_recorded() {
    let mut buffer = TextBuffer::from_text("abc");
    assert!(!buffer.is_focused());
    buffer.focus();
    buffer.reveal((0, 2));
    assert!(buffer.is_focused());
    assert_eq!(buffer.revealed(), Some((0, 2)));
}
