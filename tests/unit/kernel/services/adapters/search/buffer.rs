use super::*;

fn query(text: &str) -> SearchQuery {
    SearchQuery::parse(text, false, false).unwrap()
}

fn regex(pattern: &str) -> SearchQuery {
    SearchQuery::parse(pattern, true, true).unwrap()
}

fn columns(matches: &[Match]) -> Vec<(usize, usize)> {
    matches.iter().map(|m| (m.line, m.column)).collect()
}

#[test]
fn test_scan_token_steps() {
    let q = query("foo");
    let line = "foo bar foo";

    assert_eq!(
        scan_token(&q, line, 0),
        ScanStep::Match {
            text: "foo".to_string(),
            next: 3
        }
    );
    assert_eq!(scan_token(&q, line, 1), ScanStep::Jump(8));
    assert_eq!(scan_token(&q, line, 9), ScanStep::EndOfLine);
    assert_eq!(scan_token(&q, line, 42), ScanStep::EndOfLine);
}

#[test]
fn test_scan_line_uses_char_columns() {
    let q = query("foo");
    assert_eq!(
        scan_line(&q, "ééfoo foo"),
        vec![(2, "foo".to_string()), (6, "foo".to_string())]
    );
    assert!(scan_line(&q, "bar").is_empty());
}

#[test]
fn test_scan_line_empty_matches_advance() {
    let q = regex(r"\b");
    let found: Vec<usize> = scan_line(&q, "foo bar").into_iter().map(|(c, _)| c).collect();
    assert_eq!(found, vec![0, 3, 4, 7]);
}

#[test]
fn test_start_query_selects_first_match_after_cursor() {
    let mut buffer = TextBuffer::from_text("foo bar\nbaz foo\nfoo");
    buffer.set_cursor((0, 5));
    let mut provider = BufferSearchProvider::new();

    let matches = provider.start_query_on(&query("foo"), &mut buffer);

    assert_eq!(columns(&matches), vec![(0, 0), (1, 4), (2, 0)]);
    assert_eq!(provider.current_match_index(), Some(1));
    assert_eq!(buffer.selection(), Selection::new((1, 4), (1, 7)));
    assert_eq!(buffer.revealed(), Some((1, 4)));
}

#[test]
fn test_highlight_next_wraps_once() {
    let mut buffer = TextBuffer::from_text("foo bar\nbaz foo\nfoo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    assert_eq!(provider.current_match_index(), Some(0));

    let indices: Vec<Option<usize>> = (0..3)
        .map(|_| provider.highlight_next_on(&mut buffer).map(|m| m.index))
        .collect();
    assert_eq!(indices, vec![Some(1), Some(2), Some(0)]);
}

#[test]
fn test_highlight_previous_wraps_to_end() {
    let mut buffer = TextBuffer::from_text("foo bar\nbaz foo\nfoo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);

    let prev = provider.highlight_previous_on(&mut buffer).unwrap();
    assert_eq!((prev.line, prev.column, prev.index), (2, 0, 2));

    let prev = provider.highlight_previous_on(&mut buffer).unwrap();
    assert_eq!((prev.line, prev.column, prev.index), (1, 4, 1));
}

#[test]
fn test_highlight_previous_evaluates_anchors_on_full_line() {
    let mut buffer = TextBuffer::from_text("aa");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&regex("a$"), &mut buffer);
    assert_eq!(columns(&provider.matches()), vec![(0, 1)]);

    let prev = provider.highlight_previous_on(&mut buffer).unwrap();
    assert_eq!((prev.line, prev.column, prev.index), (0, 1, 0));
    assert_eq!(buffer.selection(), Selection::new((0, 1), (0, 2)));

    assert!(provider.replace_current_on("X", &mut buffer));
    assert_eq!(buffer.text(), "aX");
}

#[test]
fn test_highlight_next_only_lands_on_recorded_matches() {
    let mut buffer = TextBuffer::from_text("aaaa");
    buffer.set_cursor((0, 1));
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("aa"), &mut buffer);
    assert_eq!(columns(&provider.matches()), vec![(0, 0), (0, 2)]);

    assert_eq!(provider.current_match().map(|m| m.column), Some(2));
    assert_eq!(provider.current_match_index(), Some(1));

    buffer.set_cursor((0, 1));
    let next = provider.highlight_next_on(&mut buffer).unwrap();
    assert_eq!((next.column, next.index), (2, 1));
}

#[test]
fn test_empty_matches_do_not_stick_cursor() {
    let mut buffer = TextBuffer::from_text("foo bar");
    let mut provider = BufferSearchProvider::new();
    let matches = provider.start_query_on(&regex(r"\b"), &mut buffer);
    assert_eq!(matches.len(), 4);

    let first = provider.current_match().unwrap();
    let mut seen = vec![first.column];
    for _ in 0..3 {
        seen.push(provider.highlight_next_on(&mut buffer).unwrap().column);
    }
    assert_eq!(seen, vec![3, 4, 7, 0]);
}

#[test]
fn test_sub_provider_does_not_navigate_or_wrap() {
    let mut buffer = TextBuffer::from_text("foo\nfoo");
    let mut provider = BufferSearchProvider::sub_provider(3);

    let matches = provider.start_query_on(&query("foo"), &mut buffer);
    assert_eq!(matches.len(), 2);
    assert_eq!(provider.current_match_index(), None);
    assert_eq!(buffer.selection(), Selection::caret((0, 0)));

    provider.set_index_offset(10);
    let first = provider.highlight_next_on(&mut buffer).unwrap();
    assert_eq!((first.unit, first.index), (3, 10));
    let second = provider.highlight_next_on(&mut buffer).unwrap();
    assert_eq!(second.index, 11);

    assert!(provider.highlight_next_on(&mut buffer).is_none());
    assert_eq!(provider.current_match_index(), None);
    assert_eq!(buffer.selection(), Selection::caret((1, 3)));
}

#[test]
fn test_end_query_collapses_selection_to_start() {
    let mut buffer = TextBuffer::from_text("foo bar\nbaz foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    provider.highlight_next_on(&mut buffer);
    assert_eq!(buffer.selection(), Selection::new((1, 4), (1, 7)));

    provider.end_query_on(&mut buffer);
    provider.end_query_on(&mut buffer);
    assert_eq!(buffer.selection(), Selection::caret((1, 4)));
    assert!(provider.matches().is_empty());

    provider.start_query_on(&query("foo"), &mut buffer);
    assert_eq!(provider.current_match_index(), Some(1));
}

#[test]
fn test_end_search_focuses_buffer() {
    let mut buffer = TextBuffer::from_text("foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);

    provider.end_search_on(&mut buffer);
    assert!(buffer.is_focused());

    let mut sub = BufferSearchProvider::sub_provider(0);
    let mut other = TextBuffer::from_text("foo");
    sub.start_query_on(&query("foo"), &mut other);
    sub.end_search_on(&mut other);
    assert!(!other.is_focused());
}

#[test]
fn test_replace_current_then_advances() {
    let mut buffer = TextBuffer::from_text("foo foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);

    assert!(provider.replace_current_on("bar", &mut buffer));
    assert_eq!(buffer.text(), "bar foo");
    assert_eq!(provider.match_count(), 1);
    assert_eq!(provider.current_match().map(|m| m.column), Some(4));

    assert!(provider.replace_current_on("bar", &mut buffer));
    assert_eq!(buffer.text(), "bar bar");
    assert_eq!(provider.match_count(), 0);
    assert!(!provider.replace_current_on("bar", &mut buffer));
}

#[test]
fn test_replace_current_requires_selected_match() {
    let mut buffer = TextBuffer::from_text("foo foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    buffer.set_cursor((0, 1));

    assert!(!provider.replace_current_on("bar", &mut buffer));
    assert_eq!(buffer.text(), "foo foo");
    assert_eq!(buffer.selection(), Selection::new((0, 4), (0, 7)));
}

#[test]
fn test_replace_all_is_single_edit() {
    let mut buffer = TextBuffer::from_text("Foo\nfoo foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    let version = buffer.version();

    assert!(provider.replace_all_on("bar", &mut buffer));
    assert_eq!(buffer.text(), "bar\nbar bar");
    assert_eq!(buffer.version(), version + 1);
    assert!(provider.matches().is_empty());
    assert!(provider.highlight_next_on(&mut buffer).is_none());
    assert!(!provider.poll_buffer(&buffer));
}

#[test]
fn test_replace_all_rescans_when_stale() {
    let mut buffer = TextBuffer::from_text("foo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    provider.replace_all_on("foofoo", &mut buffer);
    assert_eq!(provider.match_count(), 0);

    assert!(provider.refresh_if_stale(&buffer));
    assert_eq!(provider.match_count(), 2);
    assert!(!provider.refresh_if_stale(&buffer));
}

#[test]
fn test_poll_buffer_tracks_external_edits() {
    let mut buffer = TextBuffer::from_text("foo\nbar");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    assert!(!provider.poll_buffer(&buffer));

    buffer.insert((1, 0), "foo ");
    assert!(provider.poll_buffer(&buffer));
    assert_eq!(columns(&provider.matches()), vec![(0, 0), (1, 0)]);

    buffer.insert((1, 7), "\nfoo");
    assert!(provider.poll_buffer(&buffer));
    assert_eq!(provider.match_count(), 3);

    buffer.insert((0, 0), "x");
    assert!(provider.poll_buffer(&buffer));
    assert_eq!(columns(&provider.matches())[0], (0, 1));
}

#[test]
fn test_poll_buffer_rescans_on_carriage_return_break() {
    let mut buffer = TextBuffer::from_text("x\nfoo");
    let mut provider = BufferSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut buffer);
    assert_eq!(columns(&provider.matches()), vec![(1, 0)]);

    buffer.insert((0, 1), "\ry");
    assert_eq!(buffer.len_lines(), 3);
    assert!(provider.poll_buffer(&buffer));
    assert_eq!(columns(&provider.matches()), vec![(2, 0)]);
}

#[test]
fn test_initial_query_from_single_line_selection() {
    let mut buffer = TextBuffer::from_text("hello world\nnext");
    buffer.set_selection(Selection::new((0, 6), (0, 11)));
    let provider = BufferSearchProvider::new();
    assert_eq!(provider.initial_query(&Panel::Editor(buffer.clone())), "world");

    buffer.set_selection(Selection::new((0, 6), (1, 2)));
    assert_eq!(provider.initial_query(&Panel::Editor(buffer)), "");
}

#[test]
fn test_rejects_foreign_panel() {
    let mut provider = BufferSearchProvider::new();
    let mut panel = Panel::Output(crate::models::RenderTree::new());

    assert!(!BufferSearchProvider::can_search_on(&panel));
    let err = provider
        .start_query(&query("x"), &mut panel, &SearchFilters::default())
        .unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedPanel { .. }));
    assert!(!provider.replace_all_matches("y", &mut panel));
}
