use super::*;

#[test]
fn test_range_orders_endpoints() {
    let forward = Selection::new((0, 1), (2, 3));
    let backward = Selection::new((2, 3), (0, 1));

    assert_eq!(forward.range(), ((0, 1), (2, 3)));
    assert_eq!(backward.range(), ((0, 1), (2, 3)));
    assert_eq!(backward.start(), (0, 1));
    assert_eq!(backward.end(), (2, 3));
    assert_eq!(backward.head(), (0, 1));
}

#[test]
fn test_caret_is_empty_and_single_line() {
    let caret = Selection::caret((4, 2));
    assert!(caret.is_empty());
    assert!(caret.is_single_line());
    assert!(!caret.contains((4, 2)));
    assert_eq!(Selection::default(), Selection::caret((0, 0)));
}

#[test]
fn test_contains_is_half_open() {
    let sel = Selection::new((1, 0), (1, 3));
    assert!(sel.contains((1, 0)));
    assert!(sel.contains((1, 2)));
    assert!(!sel.contains((1, 3)));
    assert!(!Selection::new((0, 0), (1, 0)).is_single_line());
}
