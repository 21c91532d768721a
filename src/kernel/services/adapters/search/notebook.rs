//! Notebook 组合搜索
//!
//! 每个 cell 一个缓冲区子 provider，带输出的代码 cell 再加一个输出子 provider。
//! 子 provider 的匹配按顺序偏移成连续的全局序号；导航在子 provider 之间循环步进。

use super::buffer::BufferSearchProvider;
use super::output::OutputSearchProvider;
use crate::kernel::services::ports::search::{
    Match, Result, SearchError, SearchFilters, SearchProvider,
};
use crate::kernel::services::ports::{SearchQuery, SearchSettings};
use crate::models::{CellId, CellKind, Notebook, NotebookMode, Panel};
use rustc_hash::FxHashSet;

const DEFAULT_MAX_STEP_ATTEMPTS: usize = 10_000;

#[derive(Debug)]
enum SubProvider {
    Buffer(BufferSearchProvider),
    Output(OutputSearchProvider),
}

#[derive(Debug)]
struct SubSearch {
    cell: CellId,
    provider: SubProvider,
}

impl SubSearch {
    fn matches(&self) -> Vec<Match> {
        match &self.provider {
            SubProvider::Buffer(p) => p.matches(),
            SubProvider::Output(p) => p.matches(),
        }
    }

    fn match_count(&self) -> usize {
        match &self.provider {
            SubProvider::Buffer(p) => p.match_count(),
            SubProvider::Output(p) => p.match_count(),
        }
    }

    fn current_match(&self) -> Option<Match> {
        match &self.provider {
            SubProvider::Buffer(p) => p.current_match(),
            SubProvider::Output(p) => p.current_match(),
        }
    }

    fn set_index_offset(&mut self, offset: usize) {
        match &mut self.provider {
            SubProvider::Buffer(p) => p.set_index_offset(offset),
            SubProvider::Output(p) => p.set_index_offset(offset),
        }
    }

    fn highlight(&mut self, notebook: &mut Notebook, reverse: bool) -> Option<Match> {
        let cell = notebook.cell_by_id_mut(self.cell)?;
        match &mut self.provider {
            SubProvider::Buffer(p) if reverse => p.highlight_previous_on(cell.buffer_mut()),
            SubProvider::Buffer(p) => p.highlight_next_on(cell.buffer_mut()),
            SubProvider::Output(p) => {
                let tree = cell.outputs_mut()?;
                if reverse {
                    p.highlight_previous_on(tree)
                } else {
                    p.highlight_next_on(tree)
                }
            }
        }
    }

    /// 步进进入该子 provider 时，把缓冲区光标放到对应的一端
    fn reset_cursor(&mut self, notebook: &mut Notebook, forward: bool) {
        let Some(cell) = notebook.cell_by_id_mut(self.cell) else {
            return;
        };
        if let SubProvider::Buffer(p) = &mut self.provider {
            p.reset_cursor(cell.buffer_mut(), forward);
        }
    }

    fn refresh_if_stale(&mut self, notebook: &Notebook) -> bool {
        let Some(cell) = notebook.index_of(self.cell).and_then(|i| notebook.cell(i)) else {
            return false;
        };
        match &mut self.provider {
            SubProvider::Buffer(p) => p.refresh_if_stale(cell.buffer()),
            SubProvider::Output(_) => false,
        }
    }

    fn replace_all(&mut self, new_text: &str, notebook: &mut Notebook) -> bool {
        let Some(cell) = notebook.cell_by_id_mut(self.cell) else {
            return false;
        };
        match &mut self.provider {
            SubProvider::Buffer(p) => p.replace_all_on(new_text, cell.buffer_mut()),
            SubProvider::Output(_) => false,
        }
    }

    fn poll(&mut self, notebook: &mut Notebook) -> bool {
        let Some(cell) = notebook.cell_by_id_mut(self.cell) else {
            return false;
        };
        match &mut self.provider {
            SubProvider::Buffer(p) => p.poll_buffer(cell.buffer()),
            SubProvider::Output(p) => cell.outputs_mut().is_some_and(|tree| p.poll_tree(tree)),
        }
    }

    fn end(&mut self, notebook: &mut Notebook, end_search: bool) {
        let Some(cell) = notebook.cell_by_id_mut(self.cell) else {
            return;
        };
        match &mut self.provider {
            SubProvider::Buffer(p) if end_search => p.end_search_on(cell.buffer_mut()),
            SubProvider::Buffer(p) => p.end_query_on(cell.buffer_mut()),
            SubProvider::Output(p) => {
                if let Some(tree) = cell.outputs_mut() {
                    p.end_query_on(tree);
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct NotebookSearchProvider {
    query: Option<SearchQuery>,
    filters: SearchFilters,
    subs: Vec<SubSearch>,
    current_sub: Option<usize>,
    current: Option<Match>,
    /// 因搜索而切到源码视图、且有匹配的 markdown cell
    unrendered_markdown: FxHashSet<CellId>,
    /// 因搜索而展开、且有匹配的隐藏输入
    revealed_inputs: FxHashSet<CellId>,
    seen_structure: Option<u64>,
    max_step_attempts: usize,
}

impl Default for NotebookSearchProvider {
    fn default() -> Self {
        Self {
            query: None,
            filters: SearchFilters::default(),
            subs: Vec::new(),
            current_sub: None,
            current: None,
            unrendered_markdown: FxHashSet::default(),
            revealed_inputs: FxHashSet::default(),
            seen_structure: None,
            max_step_attempts: DEFAULT_MAX_STEP_ATTEMPTS,
        }
    }
}

impl NotebookSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_step_attempts(mut self, attempts: usize) -> Self {
        self.max_step_attempts = attempts.max(1);
        self
    }

    pub fn filters(&self) -> SearchFilters {
        self.filters
    }

    pub fn sub_provider_count(&self) -> usize {
        self.subs.len()
    }

    pub fn start_query_on(
        &mut self,
        query: &SearchQuery,
        notebook: &mut Notebook,
        filters: &SearchFilters,
    ) -> Vec<Match> {
        self.end_on(notebook, false);
        self.query = Some(query.clone());
        self.filters = *filters;

        let units: Vec<usize> = if filters.selected_cells && !notebook.is_empty() {
            let mut units = notebook.selected_cells();
            let active = notebook.active_cell();
            if !units.contains(&active) {
                units.push(active);
                units.sort_unstable();
            }
            units
        } else {
            (0..notebook.len()).collect()
        };

        for index in units {
            let Some(cell) = notebook.cell_mut(index) else {
                continue;
            };
            let id = cell.id();
            let was_rendered = cell.is_rendered();
            if was_rendered {
                cell.set_rendered(false);
            }
            let was_hidden = cell.input_hidden();
            if was_hidden {
                cell.set_input_hidden(false);
            }

            let mut buffer_search = BufferSearchProvider::sub_provider(index);
            let found = buffer_search.start_query_on(query, cell.buffer_mut());
            if found.is_empty() {
                if was_rendered {
                    cell.set_rendered(true);
                }
                if was_hidden {
                    cell.set_input_hidden(true);
                }
            } else {
                if was_rendered {
                    self.unrendered_markdown.insert(id);
                }
                if was_hidden {
                    self.revealed_inputs.insert(id);
                }
            }
            self.subs.push(SubSearch {
                cell: id,
                provider: SubProvider::Buffer(buffer_search),
            });

            if cell.kind() == CellKind::Code && filters.output && cell.has_outputs() {
                let mut output_search = OutputSearchProvider::sub_provider(index);
                if let Some(tree) = cell.outputs_mut() {
                    output_search.start_query_on(query, tree);
                }
                self.subs.push(SubSearch {
                    cell: id,
                    provider: SubProvider::Output(output_search),
                });
            }
        }

        self.reindex();
        self.seen_structure = Some(notebook.structure_version());
        tracing::debug!(
            pattern = query.pattern(),
            sub_providers = self.subs.len(),
            "notebook query started"
        );

        let start = self.updated_current_provider(notebook, false);
        self.current = start.and_then(|start| self.step(notebook, start, false));
        self.matches()
    }

    fn end_on(&mut self, notebook: &mut Notebook, end_search: bool) {
        for mut sub in self.subs.drain(..) {
            sub.end(notebook, end_search);
        }
        for id in self.unrendered_markdown.drain() {
            if let Some(cell) = notebook.cell_by_id_mut(id) {
                cell.set_rendered(true);
            }
        }
        for id in self.revealed_inputs.drain() {
            if let Some(cell) = notebook.cell_by_id_mut(id) {
                cell.set_input_hidden(true);
            }
        }
        self.current_sub = None;
        self.current = None;
        self.query = None;
        self.seen_structure = None;
    }

    pub fn highlight_next_on(&mut self, notebook: &mut Notebook) -> Option<Match> {
        self.navigate(notebook, false)
    }

    pub fn highlight_previous_on(&mut self, notebook: &mut Notebook) -> Option<Match> {
        self.navigate(notebook, true)
    }

    pub fn replace_current_on(&mut self, new_text: &str, notebook: &mut Notebook) -> bool {
        let mut replaced = false;
        if self.current_match_is_selected(notebook) {
            if let Some(sub) = self.current_sub.and_then(|i| self.subs.get_mut(i)) {
                if let (SubProvider::Buffer(p), Some(cell)) =
                    (&mut sub.provider, notebook.cell_by_id_mut(sub.cell))
                {
                    replaced = p.replace_current_on(new_text, cell.buffer_mut());
                }
            }
            if replaced {
                self.reindex();
                self.current = self
                    .current_sub
                    .and_then(|i| self.subs.get(i))
                    .and_then(SubSearch::current_match);
                if self.current.is_some() {
                    return replaced;
                }
            }
        }
        self.highlight_next_on(notebook);
        replaced
    }

    pub fn replace_all_on(&mut self, new_text: &str, notebook: &mut Notebook) -> bool {
        let mut replaced = false;
        for sub in &mut self.subs {
            replaced = sub.replace_all(new_text, notebook) || replaced;
        }
        self.current = None;
        self.reindex();
        replaced
    }

    pub fn poll_notebook(&mut self, notebook: &mut Notebook) -> bool {
        let Some(seen) = self.seen_structure else {
            return false;
        };
        if notebook.structure_version() != seen {
            let Some(query) = self.query.clone() else {
                return false;
            };
            let filters = self.filters;
            tracing::debug!("notebook structure changed, restarting query");
            self.start_query_on(&query, notebook, &filters);
            return true;
        }

        let mut changed = false;
        for sub in &mut self.subs {
            changed = sub.poll(notebook) || changed;
        }
        if changed {
            self.reindex();
        }
        changed
    }

    fn current_match_is_selected(&self, notebook: &Notebook) -> bool {
        let (Some(current), Some(cell)) = (self.current.as_ref(), notebook.active()) else {
            return false;
        };
        let selection = cell.buffer().selection();
        let (start, end) = selection.range();
        current.unit == notebook.active_cell()
            && selection.is_single_line()
            && current.line == start.0
            && current.column == start.1
            && current.len_chars() == end.1 - start.1
    }

    fn navigate(&mut self, notebook: &mut Notebook, reverse: bool) -> Option<Match> {
        let mut refreshed = false;
        for sub in &mut self.subs {
            refreshed = sub.refresh_if_stale(notebook) || refreshed;
        }
        if refreshed {
            self.reindex();
        }
        let start = self.updated_current_provider(notebook, reverse)?;
        self.current = self.step(notebook, start, reverse);
        self.current.clone()
    }

    /// 当前子 provider：属于活动 cell 则沿用，否则按方向移到相邻的一个
    fn updated_current_provider(&mut self, notebook: &Notebook, reverse: bool) -> Option<usize> {
        let len = self.subs.len();
        if len == 0 {
            return None;
        }
        let active = notebook.cell(notebook.active_cell()).map(|c| c.id());

        let next = match self.current_sub {
            Some(current)
                if active.is_some() && self.subs.get(current).map(|s| s.cell) == active =>
            {
                current
            }
            Some(current) => adjacent(current, len, reverse),
            None => {
                let owned = |s: &SubSearch| Some(s.cell) == active;
                let found = if reverse {
                    self.subs.iter().rposition(owned)
                } else {
                    self.subs.iter().position(owned)
                };
                found.unwrap_or(if reverse { len - 1 } else { 0 })
            }
        };
        self.current_sub = Some(next);
        Some(next)
    }

    /// 从 `start` 开始找下一个匹配，最多走一整圈
    fn step(&mut self, notebook: &mut Notebook, start: usize, reverse: bool) -> Option<Match> {
        let len = self.subs.len();
        let limit = (len + 1).min(self.max_step_attempts);
        let mut index = start;
        for attempt in 0..limit {
            let sub = self.subs.get_mut(index)?;
            if let Some(found) = sub.highlight(notebook, reverse) {
                if let Some(cell) = notebook.index_of(sub.cell) {
                    notebook.set_active_cell(cell);
                }
                self.current_sub = Some(index);
                tracing::trace!(index = found.index, unit = found.unit, "notebook match selected");
                return Some(found);
            }
            if attempt + 1 == limit {
                break;
            }
            index = adjacent(index, len, reverse);
            if let Some(next) = self.subs.get_mut(index) {
                next.reset_cursor(notebook, !reverse);
            }
            self.current_sub = Some(index);
        }
        None
    }

    fn reindex(&mut self) {
        let mut offset = 0;
        for sub in &mut self.subs {
            sub.set_index_offset(offset);
            offset += sub.match_count();
        }
        if self.current.is_some() {
            self.current = self
                .current_sub
                .and_then(|i| self.subs.get(i))
                .and_then(SubSearch::current_match);
        }
    }
}

fn adjacent(index: usize, len: usize, reverse: bool) -> usize {
    if reverse {
        (index + len - 1) % len
    } else {
        (index + 1) % len
    }
}

impl SearchProvider for NotebookSearchProvider {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn has_outputs(&self) -> bool {
        true
    }

    fn initial_query(&self, panel: &Panel) -> String {
        let Some(cell) = panel.as_notebook().and_then(Notebook::active) else {
            return String::new();
        };
        let selected = cell.buffer().selected_text();
        if selected.contains(['\n', '\r']) {
            String::new()
        } else {
            selected
        }
    }

    fn apply_settings(&mut self, settings: &SearchSettings) {
        self.max_step_attempts = settings.max_step_attempts.max(1);
    }

    fn start_query(
        &mut self,
        query: &SearchQuery,
        panel: &mut Panel,
        filters: &SearchFilters,
    ) -> Result<Vec<Match>> {
        let kind = panel.kind();
        let Some(notebook) = panel.as_notebook_mut() else {
            return Err(SearchError::UnsupportedPanel {
                provider: self.name(),
                panel: kind,
            });
        };
        Ok(self.start_query_on(query, notebook, filters))
    }

    fn end_query(&mut self, panel: &mut Panel) {
        match panel.as_notebook_mut() {
            Some(notebook) => self.end_on(notebook, false),
            None => tracing::warn!(panel = %panel.kind(), "notebook provider torn down on foreign panel"),
        }
    }

    fn end_search(&mut self, panel: &mut Panel) {
        let Some(notebook) = panel.as_notebook_mut() else {
            tracing::warn!(panel = %panel.kind(), "notebook provider torn down on foreign panel");
            return;
        };
        let active = notebook.active_cell();
        self.end_on(notebook, true);
        notebook.set_active_cell(active);
        notebook.set_mode(NotebookMode::Edit);
    }

    fn highlight_next(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_next_on(panel.as_notebook_mut()?)
    }

    fn highlight_previous(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_previous_on(panel.as_notebook_mut()?)
    }

    fn replace_current_match(&mut self, new_text: &str, panel: &mut Panel) -> bool {
        match panel.as_notebook_mut() {
            Some(notebook) => self.replace_current_on(new_text, notebook),
            None => false,
        }
    }

    fn replace_all_matches(&mut self, new_text: &str, panel: &mut Panel) -> bool {
        match panel.as_notebook_mut() {
            Some(notebook) => self.replace_all_on(new_text, notebook),
            None => false,
        }
    }

    fn matches(&self) -> Vec<Match> {
        self.subs.iter().flat_map(SubSearch::matches).collect()
    }

    fn current_match_index(&self) -> Option<usize> {
        self.current.as_ref().map(|m| m.index)
    }

    fn current_match(&self) -> Option<Match> {
        self.current.clone()
    }

    fn poll_changes(&mut self, panel: &mut Panel) -> bool {
        match panel.as_notebook_mut() {
            Some(notebook) => self.poll_notebook(notebook),
            None => false,
        }
    }

    fn can_search_on(panel: &Panel) -> bool {
        panel.as_notebook().is_some()
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/notebook.rs"]
mod tests;
