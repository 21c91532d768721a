use super::*;
use crate::models::{Cell, RenderTree};

fn query(text: &str) -> SearchQuery {
    SearchQuery::parse(text, false, false).unwrap()
}

fn output_tree(text: &str) -> RenderTree {
    let mut tree = RenderTree::new();
    let pre = tree.create_element("pre");
    let t = tree.create_text(text);
    tree.append_child(pre, t).unwrap();
    tree.append_child(tree.root(), pre).unwrap();
    tree
}

fn three_foo() -> Notebook {
    Notebook::from_cells(vec![Cell::code("foo"), Cell::code("foo"), Cell::code("foo")])
}

#[test]
fn test_indices_are_contiguous_across_cells() {
    let mut nb = Notebook::from_cells(vec![
        Cell::code("foo foo"),
        Cell::markdown("no match"),
        Cell::code("foo"),
    ]);
    let mut provider = NotebookSearchProvider::new();

    let matches = provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    let indices: Vec<usize> = matches.iter().map(|m| m.index).collect();
    let units: Vec<usize> = matches.iter().map(|m| m.unit).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(units, vec![0, 0, 2]);
    assert_eq!(provider.current_match_index(), Some(0));
    assert_eq!(provider.sub_provider_count(), 3);
}

#[test]
fn test_next_crosses_into_following_cell() {
    let mut nb = three_foo();
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    let next = provider.highlight_next_on(&mut nb).unwrap();
    assert_eq!((next.unit, next.index), (1, 1));
    assert_eq!(nb.active_cell(), 1);
    assert_eq!(
        nb.cell(1).unwrap().buffer().selection(),
        crate::models::Selection::new((0, 0), (0, 3))
    );
}

#[test]
fn test_previous_wraps_through_all_cells() {
    let mut nb = three_foo();
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    let seen: Vec<usize> = (0..3)
        .filter_map(|_| provider.highlight_previous_on(&mut nb))
        .map(|m| m.index)
        .collect();
    assert_eq!(seen, vec![2, 1, 0]);
}

#[test]
fn test_next_wraps_after_last_cell() {
    let mut nb = three_foo();
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    for _ in 0..2 {
        provider.highlight_next_on(&mut nb);
    }
    assert_eq!(provider.current_match_index(), Some(2));
    assert_eq!(provider.highlight_next_on(&mut nb).map(|m| m.index), Some(0));
    assert_eq!(nb.active_cell(), 0);
}

#[test]
fn test_starts_from_active_cell() {
    let mut nb = three_foo();
    nb.set_active_cell(2);
    let mut provider = NotebookSearchProvider::new();

    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert_eq!(provider.current_match_index(), Some(2));
}

#[test]
fn test_markdown_cells_unrendered_only_while_matching() {
    let mut nb = Notebook::from_cells(vec![Cell::markdown("# foo"), Cell::markdown("# bar")]);
    let mut provider = NotebookSearchProvider::new();

    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert!(!nb.cell(0).unwrap().is_rendered());
    assert!(nb.cell(1).unwrap().is_rendered());

    provider.end_on(&mut nb, false);
    assert!(nb.cell(0).unwrap().is_rendered());
    assert!(nb.cell(1).unwrap().is_rendered());
}

#[test]
fn test_hidden_inputs_revealed_and_restored() {
    let mut nb = Notebook::from_cells(vec![Cell::code("foo"), Cell::code("bar")]);
    nb.cell_mut(0).unwrap().set_input_hidden(true);
    nb.cell_mut(1).unwrap().set_input_hidden(true);
    let mut provider = NotebookSearchProvider::new();

    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert!(!nb.cell(0).unwrap().input_hidden());
    assert!(nb.cell(1).unwrap().input_hidden());

    provider.end_on(&mut nb, false);
    assert!(nb.cell(0).unwrap().input_hidden());
}

#[test]
fn test_outputs_searched_when_filter_enabled() {
    let mut nb = Notebook::from_cells(vec![
        Cell::code("x = 1").with_outputs(output_tree("foo printed")),
        Cell::code("foo"),
    ]);
    let mut provider = NotebookSearchProvider::new();

    let matches = provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert_eq!(matches.len(), 2);
    assert_eq!(provider.sub_provider_count(), 3);
    assert_eq!(provider.current_match().map(|m| m.unit), Some(0));

    let filters = SearchFilters {
        output: false,
        selected_cells: false,
    };
    let matches = provider.start_query_on(&query("foo"), &mut nb, &filters);
    assert_eq!(matches.len(), 1);
    assert_eq!(provider.sub_provider_count(), 2);

    let tree = nb.cell(0).unwrap().outputs().unwrap();
    assert_eq!(tree.text_content(tree.root()), "foo printed");
    assert_eq!(tree.text_nodes(tree.root()).len(), 1);
}

#[test]
fn test_selected_cells_filter_includes_active_cell() {
    let mut nb = three_foo();
    nb.select(2);
    let filters = SearchFilters {
        output: true,
        selected_cells: true,
    };
    let mut provider = NotebookSearchProvider::new();

    let matches = provider.start_query_on(&query("foo"), &mut nb, &filters);
    let units: Vec<usize> = matches.iter().map(|m| m.unit).collect();
    assert_eq!(units, vec![0, 2]);
}

#[test]
fn test_structure_change_restarts_query() {
    let mut nb = three_foo();
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert!(!provider.poll_notebook(&mut nb));

    nb.insert_cell(1, Cell::code("foo again"));
    assert!(provider.poll_notebook(&mut nb));
    assert_eq!(provider.matches().len(), 4);
    assert_eq!(provider.matches()[1].unit, 1);
}

#[test]
fn test_poll_notebook_forwards_cell_edits() {
    let mut nb = three_foo();
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    nb.cell_mut(1).unwrap().buffer_mut().insert((0, 3), " foo");
    assert!(provider.poll_notebook(&mut nb));
    let indices: Vec<(usize, usize)> = provider.matches().iter().map(|m| (m.unit, m.index)).collect();
    assert_eq!(indices, vec![(0, 0), (1, 1), (1, 2), (2, 3)]);
}

#[test]
fn test_replace_current_moves_to_next_cell() {
    let mut nb = Notebook::from_cells(vec![Cell::code("foo foo"), Cell::code("foo")]);
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    assert!(provider.replace_current_on("X", &mut nb));
    assert_eq!(nb.cell(0).unwrap().buffer().text(), "X foo");
    assert_eq!(provider.current_match().map(|m| (m.unit, m.column)), Some((0, 2)));

    assert!(provider.replace_current_on("X", &mut nb));
    assert_eq!(nb.cell(0).unwrap().buffer().text(), "X X");
    let current = provider.current_match().unwrap();
    assert_eq!((current.unit, current.index), (1, 0));
    assert_eq!(nb.active_cell(), 1);
}

#[test]
fn test_replace_all_across_cells() {
    let mut nb = Notebook::from_cells(vec![
        Cell::code("foo bar").with_outputs(output_tree("foo")),
        Cell::code("foo"),
    ]);
    let mut provider = NotebookSearchProvider::new();
    provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());

    assert!(provider.replace_all_on("baz", &mut nb));
    assert_eq!(nb.cell(0).unwrap().buffer().text(), "baz bar");
    assert_eq!(nb.cell(1).unwrap().buffer().text(), "baz");
    assert_eq!(provider.current_match_index(), None);
    // 输出只读，仍然保留匹配
    assert_eq!(provider.matches().len(), 1);
}

#[test]
fn test_step_attempts_are_capped() {
    let mut nb = Notebook::from_cells(vec![Cell::code("a"), Cell::code("foo")]);
    let mut provider = NotebookSearchProvider::new().with_max_step_attempts(1);

    let matches = provider.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert_eq!(matches.len(), 1);
    assert_eq!(provider.current_match_index(), None);

    let mut uncapped = NotebookSearchProvider::new();
    uncapped.apply_settings(&SearchSettings::default());
    uncapped.start_query_on(&query("foo"), &mut nb, &SearchFilters::default());
    assert_eq!(uncapped.current_match_index(), Some(0));
}

#[test]
fn test_end_search_keeps_active_cell_and_enters_edit_mode() {
    let mut panel = Panel::Notebook(three_foo());
    let mut provider = NotebookSearchProvider::new();
    provider
        .start_query(&query("foo"), &mut panel, &SearchFilters::default())
        .unwrap();
    provider.highlight_next(&mut panel);

    provider.end_search(&mut panel);

    let nb = panel.as_notebook().unwrap();
    assert_eq!(nb.active_cell(), 1);
    assert_eq!(nb.mode(), NotebookMode::Edit);
    assert!(provider.matches().is_empty());
}

#[test]
fn test_initial_query_from_active_cell() {
    let mut nb = Notebook::from_cells(vec![Cell::code("alpha beta")]);
    nb.cell_mut(0)
        .unwrap()
        .buffer_mut()
        .set_selection(crate::models::Selection::new((0, 6), (0, 10)));
    let provider = NotebookSearchProvider::new();

    assert_eq!(provider.initial_query(&Panel::Notebook(nb)), "beta");
    assert!(provider.has_outputs());
    assert!(NotebookSearchProvider::can_search_on(&Panel::Notebook(Notebook::new())));
}
