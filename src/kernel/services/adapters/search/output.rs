//! 渲染输出搜索（只读）
//!
//! 命中的文本节点按匹配边界拆分，匹配片段包进高亮 span；
//! 结束查询时恢复原文本并移除插入的片段。

use crate::kernel::services::ports::search::{
    Match, Result, SearchError, SearchFilters, SearchProvider,
};
use crate::kernel::services::ports::SearchQuery;
use crate::models::{NodeId, Panel, RenderTree, RenderTreeError};

pub const FOUND_CLASSES: [&str; 3] = ["cm-string", "cm-overlay", "cm-searching"];
pub const SELECTED_CLASS: &str = "CodeMirror-selectedtext";

/// 这些元素内的文本不参与搜索
const UNSUPPORTED_ELEMENTS: &[&str] = &[
    "base", "head", "link", "meta", "style", "title", "body", "area", "audio", "img", "map",
    "track", "video", "applet", "embed", "iframe", "noembed", "object", "param", "picture",
    "source", "canvas", "noscript", "script", "svg",
];

#[derive(Debug, Clone)]
struct Highlight {
    span: NodeId,
    found: Match,
}

/// 被拆分的原始文本节点
#[derive(Debug)]
struct SplitNode {
    node: NodeId,
    text: String,
    fragments: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct OutputSearchProvider {
    query: Option<SearchQuery>,
    is_sub_provider: bool,
    unit: usize,
    index_offset: usize,
    highlights: Vec<Highlight>,
    split_nodes: Vec<SplitNode>,
    current: Option<usize>,
    /// 自身修改之后的树版本；不同即说明有外部修改
    seen_version: Option<u64>,
}

impl OutputSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sub_provider(unit: usize) -> Self {
        Self {
            is_sub_provider: true,
            unit,
            ..Self::default()
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn match_count(&self) -> usize {
        self.highlights.len()
    }

    pub fn set_index_offset(&mut self, offset: usize) {
        self.index_offset = offset;
        for (i, h) in self.highlights.iter_mut().enumerate() {
            h.found.index = offset + i;
        }
    }

    /// 当前匹配所在的高亮 span
    pub fn current_span(&self) -> Option<NodeId> {
        self.current
            .and_then(|i| self.highlights.get(i))
            .map(|h| h.span)
    }

    pub fn start_query_on(&mut self, query: &SearchQuery, tree: &mut RenderTree) -> Vec<Match> {
        self.end_query_on(tree);
        self.query = Some(query.clone());

        let root = tree.root();
        let candidates: Vec<NodeId> = tree
            .text_nodes(root)
            .into_iter()
            .filter(|&id| is_searchable(tree, id))
            .filter(|&id| tree.text(id).is_some_and(|t| query.regex().is_match(t)))
            .collect();

        let mut highlights = Vec::new();
        for node in candidates {
            let text = tree.text(node).map(str::to_string);
            let (Some(text), Some(parent)) = (text, tree.parent(node)) else {
                continue;
            };
            let found: Vec<(usize, usize, String)> = query
                .regex()
                .find_iter(&text)
                .filter(|m| m.start() != m.end())
                .map(|m| {
                    let start = text[..m.start()].chars().count();
                    (start, start + m.as_str().chars().count(), m.as_str().to_string())
                })
                .collect();
            if found.is_empty() {
                continue;
            }

            let mut split = SplitNode {
                node,
                text,
                fragments: Vec::new(),
            };
            let mut wrapped = Vec::with_capacity(found.len());
            let fragments = &mut split.fragments;
            if let Err(e) = wrap_matches(tree, node, parent, &found, fragments, &mut wrapped) {
                tracing::warn!(error = %e, "wrap output match failed");
            }
            self.split_nodes.push(split);

            wrapped.reverse();
            for (index_in_original, span) in wrapped {
                let (start, _, matched) = &found[index_in_original];
                highlights.push(Highlight {
                    span,
                    found: Match {
                        text: matched.clone(),
                        line: 0,
                        column: *start,
                        unit: self.unit,
                        index: 0,
                    },
                });
            }
        }

        self.highlights = highlights;
        self.set_index_offset(self.index_offset);
        if !self.is_sub_provider && !self.highlights.is_empty() {
            self.current = Some(0);
        }
        self.seen_version = Some(tree.version());
        tracing::debug!(
            pattern = query.pattern(),
            matches = self.highlights.len(),
            "output query started"
        );
        self.matches()
    }

    pub fn end_query_on(&mut self, tree: &mut RenderTree) {
        for split in self.split_nodes.drain(..) {
            for fragment in split.fragments {
                if tree.contains(fragment) {
                    let _ = tree.remove(fragment);
                }
            }
            if tree.contains(split.node) {
                let _ = tree.set_text(split.node, &split.text);
            }
        }
        self.highlights.clear();
        self.current = None;
        self.query = None;
        self.seen_version = None;
    }

    pub fn highlight_next_on(&mut self, tree: &mut RenderTree) -> Option<Match> {
        self.step(tree, false)
    }

    pub fn highlight_previous_on(&mut self, tree: &mut RenderTree) -> Option<Match> {
        self.step(tree, true)
    }

    /// 树被外部修改时重新查询
    pub fn poll_tree(&mut self, tree: &mut RenderTree) -> bool {
        let Some(seen) = self.seen_version else {
            return false;
        };
        if tree.version() == seen {
            return false;
        }
        let Some(query) = self.query.clone() else {
            return false;
        };
        tracing::debug!(unit = self.unit, "rendered output mutated, restarting query");
        self.start_query_on(&query, tree);
        true
    }

    pub fn clear_current(&mut self, tree: &mut RenderTree) {
        if let Some(span) = self.current_span() {
            tree.remove_class(span, SELECTED_CLASS);
        }
        self.current = None;
    }

    fn step(&mut self, tree: &mut RenderTree, reverse: bool) -> Option<Match> {
        let len = self.highlights.len();
        if len == 0 {
            return None;
        }
        let next = match self.current {
            Some(current) => {
                if let Some(h) = self.highlights.get(current) {
                    tree.remove_class(h.span, SELECTED_CLASS);
                }
                let target = if reverse {
                    current as isize - 1
                } else {
                    current as isize + 1
                };
                if self.is_sub_provider && (target < 0 || target >= len as isize) {
                    self.current = None;
                    return None;
                }
                target.rem_euclid(len as isize) as usize
            }
            None if reverse => len - 1,
            None => 0,
        };

        self.current = Some(next);
        let h = self.highlights.get(next)?;
        tree.add_class(h.span, SELECTED_CLASS);
        if !tree.is_in_viewport(h.span) {
            tree.scroll_into_view(h.span);
        }
        tree.focus(h.span);
        tracing::trace!(index = h.found.index, "output match selected");
        Some(h.found.clone())
    }
}

fn is_searchable(tree: &RenderTree, node: NodeId) -> bool {
    let root = tree.root();
    !tree
        .ancestors(node)
        .take_while(|&a| a != root)
        .any(|a| {
            tree.tag(a)
                .is_some_and(|tag| UNSUPPORTED_ELEMENTS.contains(&tag))
        })
}

/// 自右向左拆分文本节点并包裹匹配；`node` 最终保留第一个匹配之前的文本
fn wrap_matches(
    tree: &mut RenderTree,
    node: NodeId,
    parent: NodeId,
    found: &[(usize, usize, String)],
    fragments: &mut Vec<NodeId>,
    wrapped: &mut Vec<(usize, NodeId)>,
) -> std::result::Result<(), RenderTreeError> {
    for (i, (start, end, _)) in found.iter().enumerate().rev() {
        let len = tree.text(node).map(|t| t.chars().count()).unwrap_or(0);
        if *end < len {
            fragments.push(tree.split_text(node, *end)?);
        }
        let matched = tree.split_text(node, *start)?;
        let span = tree.create_element("span");
        for class in FOUND_CLASSES {
            tree.add_class(span, class);
        }
        tree.insert_before(parent, span, matched)?;
        fragments.push(span);
        tree.append_child(span, matched)?;
        wrapped.push((i, span));
    }
    Ok(())
}

impl SearchProvider for OutputSearchProvider {
    fn name(&self) -> &'static str {
        "output"
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn initial_query(&self, _panel: &Panel) -> String {
        String::new()
    }

    fn start_query(
        &mut self,
        query: &SearchQuery,
        panel: &mut Panel,
        _filters: &SearchFilters,
    ) -> Result<Vec<Match>> {
        let kind = panel.kind();
        let Some(tree) = panel.as_output_mut() else {
            return Err(SearchError::UnsupportedPanel {
                provider: self.name(),
                panel: kind,
            });
        };
        Ok(self.start_query_on(query, tree))
    }

    fn end_query(&mut self, panel: &mut Panel) {
        match panel.as_output_mut() {
            Some(tree) => self.end_query_on(tree),
            None => tracing::warn!(panel = %panel.kind(), "output provider torn down on foreign panel"),
        }
    }

    fn end_search(&mut self, panel: &mut Panel) {
        self.end_query(panel);
    }

    fn highlight_next(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_next_on(panel.as_output_mut()?)
    }

    fn highlight_previous(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_previous_on(panel.as_output_mut()?)
    }

    fn replace_current_match(&mut self, _new_text: &str, _panel: &mut Panel) -> bool {
        false
    }

    fn replace_all_matches(&mut self, _new_text: &str, _panel: &mut Panel) -> bool {
        false
    }

    fn matches(&self) -> Vec<Match> {
        self.highlights.iter().map(|h| h.found.clone()).collect()
    }

    fn current_match_index(&self) -> Option<usize> {
        self.current
            .and_then(|i| self.highlights.get(i))
            .map(|h| h.found.index)
    }

    fn current_match(&self) -> Option<Match> {
        self.current
            .and_then(|i| self.highlights.get(i))
            .map(|h| h.found.clone())
    }

    fn poll_changes(&mut self, panel: &mut Panel) -> bool {
        match panel.as_output_mut() {
            Some(tree) => self.poll_tree(tree),
            None => false,
        }
    }

    fn can_search_on(panel: &Panel) -> bool {
        panel.as_output().is_some()
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/output.rs"]
mod tests;
