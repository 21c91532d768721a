//! 可编辑缓冲区搜索
//!
//! - 匹配状态：行 → 列 → 匹配，每行一次非重叠扫描
//! - overlay：`scan_token` 纯函数，扫描位置由调用方显式传递
//! - 导航：带方向的游标直接在缓冲区上查找，到边界后回绕一次

use crate::kernel::services::ports::search::{
    Match, Result, SearchError, SearchFilters, SearchProvider,
};
use crate::kernel::services::ports::SearchQuery;
use crate::models::{Panel, Position, Selection, TextBuffer};
use std::collections::BTreeMap;

/// overlay 在一个扫描位置上的结果（列以字符计）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// `pos` 处有匹配，`next` 为下一个扫描位置（空匹配前进一个字符）
    Match { text: String, next: usize },
    /// 下一个可能的匹配起点
    Jump(usize),
    EndOfLine,
}

pub fn scan_token(query: &SearchQuery, line: &str, pos: usize) -> ScanStep {
    let Some(byte_pos) = char_to_byte(line, pos) else {
        return ScanStep::EndOfLine;
    };
    match query.regex().find_at(line, byte_pos) {
        Some(m) if m.start() == byte_pos => {
            let text = m.as_str().to_string();
            let next = pos + text.chars().count().max(1);
            ScanStep::Match { text, next }
        }
        Some(m) => ScanStep::Jump(pos + line[byte_pos..m.start()].chars().count()),
        None => ScanStep::EndOfLine,
    }
}

/// 一行内的全部非重叠匹配：(列, 文本)
pub fn scan_line(query: &SearchQuery, line: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    loop {
        match scan_token(query, line, pos) {
            ScanStep::Match { text, next } => {
                out.push((pos, text));
                pos = next;
            }
            ScanStep::Jump(next) => pos = next,
            ScanStep::EndOfLine => break,
        }
    }
    out
}

fn char_to_byte(s: &str, char_idx: usize) -> Option<usize> {
    match s.char_indices().nth(char_idx) {
        Some((b, _)) => Some(b),
        None if s.chars().count() == char_idx => Some(s.len()),
        None => None,
    }
}

/// 从 `from` 向后查找第一个匹配；只会落在 `scan_line` 记录过的匹配上
fn search_forward(
    query: &SearchQuery,
    buffer: &TextBuffer,
    from: Position,
    skip_empty_at_origin: bool,
) -> Option<(Position, String)> {
    let (row, col) = buffer.clamp_position(from);
    for line_idx in row..buffer.len_lines() {
        let Some(line) = buffer.line_text(line_idx) else {
            break;
        };
        let on_origin = line_idx == row;
        let found = scan_line(query, &line).into_iter().find(|(c, t)| {
            if !on_origin {
                return true;
            }
            *c >= col && !(skip_empty_at_origin && *c == col && t.is_empty())
        });
        if let Some((column, matched)) = found {
            return Some(((line_idx, column), matched));
        }
    }
    None
}

/// 从 `from` 向前查找最后一个结束于 `from` 之前的匹配
///
/// 总是扫描整行，行锚点（`$`、`\b`）按完整行求值。
fn search_backward(
    query: &SearchQuery,
    buffer: &TextBuffer,
    from: Position,
    skip_empty_at_origin: bool,
) -> Option<(Position, String)> {
    let (row, col) = buffer.clamp_position(from);
    for line_idx in (0..=row).rev() {
        let Some(line) = buffer.line_text(line_idx) else {
            continue;
        };
        let on_origin = line_idx == row;
        let found = scan_line(query, &line)
            .into_iter()
            .filter(|(c, t)| {
                if !on_origin {
                    return true;
                }
                let end = *c + t.chars().count();
                end <= col && !(skip_empty_at_origin && *c == col && t.is_empty())
            })
            .last();
        if let Some((column, matched)) = found {
            return Some(((line_idx, column), matched));
        }
    }
    None
}

#[derive(Debug, Default)]
pub struct BufferSearchProvider {
    query: Option<SearchQuery>,
    is_sub_provider: bool,
    unit: usize,
    index_offset: usize,
    match_state: BTreeMap<usize, BTreeMap<usize, Match>>,
    current: Option<Match>,
    /// 已消化的缓冲区版本；None 表示未挂接
    tracked_version: Option<u64>,
    /// replace all 之后状态作废，下一次导航重新扫描
    stale: bool,
}

impl BufferSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 组合 provider 内部使用：不回绕，匹配归属于 `unit`
    pub fn sub_provider(unit: usize) -> Self {
        Self {
            is_sub_provider: true,
            unit,
            ..Self::default()
        }
    }

    pub fn is_sub_provider(&self) -> bool {
        self.is_sub_provider
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    pub fn match_count(&self) -> usize {
        self.match_state.values().map(BTreeMap::len).sum()
    }

    pub fn set_index_offset(&mut self, offset: usize) {
        self.index_offset = offset;
        self.reindex();
    }

    pub fn start_query_on(&mut self, query: &SearchQuery, buffer: &mut TextBuffer) -> Vec<Match> {
        self.end_query_on(buffer);
        self.query = Some(query.clone());
        self.tracked_version = Some(buffer.version());
        self.rebuild(buffer);

        let matches = self.matches();
        if matches.is_empty() {
            return matches;
        }
        if !self.is_sub_provider {
            self.find_next(buffer, false);
        }
        matches
    }

    pub fn end_query_on(&mut self, buffer: &mut TextBuffer) {
        self.match_state.clear();
        self.current = None;
        self.query = None;
        self.tracked_version = None;
        self.stale = false;

        let selection = buffer.selection();
        if !selection.is_empty() {
            buffer.set_cursor(selection.start());
        }
    }

    pub fn end_search_on(&mut self, buffer: &mut TextBuffer) {
        if !self.is_sub_provider {
            buffer.focus();
        }
        self.end_query_on(buffer);
    }

    pub fn highlight_next_on(&mut self, buffer: &mut TextBuffer) -> Option<Match> {
        self.find_next(buffer, false)
    }

    pub fn highlight_previous_on(&mut self, buffer: &mut TextBuffer) -> Option<Match> {
        self.find_next(buffer, true)
    }

    pub fn replace_current_on(&mut self, new_text: &str, buffer: &mut TextBuffer) -> bool {
        let mut replaced = false;
        if self.current_match_is_selected(buffer) {
            let selection = buffer.selection();
            buffer.replace_range(selection.start(), selection.end(), new_text);
            self.poll_buffer(buffer);
            replaced = true;
        }
        self.highlight_next_on(buffer);
        replaced
    }

    pub fn replace_all_on(&mut self, new_text: &str, buffer: &mut TextBuffer) -> bool {
        if self.query.is_none() {
            return false;
        }
        self.poll_buffer(buffer);
        if self.stale {
            self.rebuild(buffer);
        }

        let edits: Vec<_> = self
            .match_state
            .values()
            .flat_map(BTreeMap::values)
            .map(|m| {
                let start = buffer.pos_to_char((m.line, m.column));
                (start..start + m.len_chars(), new_text.to_string())
            })
            .collect();
        let replaced = buffer.apply_edits(edits);

        self.match_state.clear();
        self.current = None;
        self.stale = true;
        if self.tracked_version.is_some() {
            self.tracked_version = Some(buffer.version());
        }
        replaced
    }

    /// 消化缓冲区变更日志；匹配集合变化时返回 true
    pub fn poll_buffer(&mut self, buffer: &TextBuffer) -> bool {
        let Some(since) = self.tracked_version else {
            return false;
        };
        if since == buffer.version() {
            return false;
        }
        let before = self.matches();
        match buffer.changes_since(since) {
            Some(changes) if !changes.iter().any(|c| c.is_bulk()) => {
                for change in changes {
                    self.highlight_line(buffer, change.start_line);
                }
            }
            _ => {
                tracing::debug!(unit = self.unit, "buffer changed in bulk, rebuilding matches");
                self.rebuild(buffer);
            }
        }
        self.tracked_version = Some(buffer.version());
        before != self.matches()
    }

    /// 宿主渲染一行时调用：用 overlay 重新记录该行的匹配
    pub fn highlight_line(&mut self, buffer: &TextBuffer, line: usize) {
        let Some(query) = self.query.as_ref() else {
            return;
        };
        let found = buffer
            .line_text(line)
            .map(|text| scan_line(query, &text))
            .unwrap_or_default();
        if found.is_empty() {
            self.match_state.remove(&line);
        } else {
            let row = found
                .into_iter()
                .map(|(column, text)| (column, self.new_match(text, line, column)))
                .collect();
            self.match_state.insert(line, row);
        }
        self.reindex();
    }

    pub fn current_match_is_selected(&self, buffer: &TextBuffer) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        let selection = buffer.selection();
        let (start, end) = selection.range();
        selection.is_single_line()
            && current.line == start.0
            && current.column == start.1
            && current.len_chars() == end.1 - start.1
    }

    /// 把光标放到缓冲区起点（向后导航）或终点（向前导航）
    pub fn reset_cursor(&mut self, buffer: &mut TextBuffer, forward: bool) {
        let pos = if forward {
            buffer.start_position()
        } else {
            buffer.end_position()
        };
        buffer.set_cursor(pos);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// replace all 之后的状态在下一次导航前重新扫描
    pub fn refresh_if_stale(&mut self, buffer: &TextBuffer) -> bool {
        if !self.stale {
            return false;
        }
        self.rebuild(buffer);
        true
    }

    fn find_next(&mut self, buffer: &mut TextBuffer, reverse: bool) -> Option<Match> {
        if self.query.is_none() {
            return None;
        }
        if self.stale {
            self.rebuild(buffer);
        }

        let selection = buffer.selection();
        let origin = if reverse {
            selection.anchor()
        } else {
            selection.head()
        };
        let found = {
            let query = self.query.as_ref()?;
            let search = |from: Position, skip: bool| {
                if reverse {
                    search_backward(query, buffer, from, skip)
                } else {
                    search_forward(query, buffer, from, skip)
                }
            };
            match search(origin, true) {
                Some(hit) => Some(hit),
                None if self.is_sub_provider => None,
                None => {
                    let restart = if reverse {
                        buffer.end_position()
                    } else {
                        buffer.start_position()
                    };
                    search(restart, false)
                }
            }
        };

        let Some(((line, column), text)) = found else {
            if self.is_sub_provider {
                buffer.set_cursor(origin);
            }
            self.current = None;
            return None;
        };

        let end = (line, column + text.chars().count());
        buffer.set_selection(Selection::new((line, column), end));
        buffer.reveal((line, column));

        if self.lookup(line, column).is_none() {
            self.highlight_line(buffer, line);
        }
        let found = match self.lookup(line, column) {
            Some(m) => m.clone(),
            None => self.new_match(text, line, column),
        };
        tracing::trace!(line, column, index = found.index, "buffer match selected");
        self.current = Some(found.clone());
        Some(found)
    }

    fn lookup(&self, line: usize, column: usize) -> Option<&Match> {
        self.match_state.get(&line)?.get(&column)
    }

    fn new_match(&self, text: String, line: usize, column: usize) -> Match {
        Match {
            text,
            line,
            column,
            unit: self.unit,
            index: 0,
        }
    }

    fn rebuild(&mut self, buffer: &TextBuffer) {
        self.match_state.clear();
        self.stale = false;
        let Some(query) = self.query.as_ref() else {
            return;
        };
        let mut state = BTreeMap::new();
        for line in 0..buffer.len_lines() {
            let Some(text) = buffer.line_text(line) else {
                break;
            };
            let found = scan_line(query, &text);
            if found.is_empty() {
                continue;
            }
            let row: BTreeMap<usize, Match> = found
                .into_iter()
                .map(|(column, text)| (column, self.new_match(text, line, column)))
                .collect();
            state.insert(line, row);
        }
        self.match_state = state;
        self.reindex();
    }

    fn reindex(&mut self) {
        let offset = self.index_offset;
        let unit = self.unit;
        for (i, m) in self
            .match_state
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .enumerate()
        {
            m.index = offset + i;
            m.unit = unit;
        }
        if let Some(current) = self.current.as_mut() {
            if let Some(m) = self
                .match_state
                .get(&current.line)
                .and_then(|row| row.get(&current.column))
            {
                current.index = m.index;
            }
        }
    }
}

impl SearchProvider for BufferSearchProvider {
    fn name(&self) -> &'static str {
        "editor"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn initial_query(&self, panel: &Panel) -> String {
        let Some(buffer) = panel.as_editor() else {
            return String::new();
        };
        let selected = buffer.selected_text();
        if selected.contains(['\n', '\r']) {
            String::new()
        } else {
            selected
        }
    }

    fn start_query(
        &mut self,
        query: &SearchQuery,
        panel: &mut Panel,
        _filters: &SearchFilters,
    ) -> Result<Vec<Match>> {
        let kind = panel.kind();
        let Some(buffer) = panel.as_editor_mut() else {
            return Err(SearchError::UnsupportedPanel {
                provider: self.name(),
                panel: kind,
            });
        };
        tracing::debug!(pattern = query.pattern(), "editor query started");
        Ok(self.start_query_on(query, buffer))
    }

    fn end_query(&mut self, panel: &mut Panel) {
        match panel.as_editor_mut() {
            Some(buffer) => self.end_query_on(buffer),
            None => tracing::warn!(panel = %panel.kind(), "editor provider torn down on foreign panel"),
        }
    }

    fn end_search(&mut self, panel: &mut Panel) {
        match panel.as_editor_mut() {
            Some(buffer) => self.end_search_on(buffer),
            None => tracing::warn!(panel = %panel.kind(), "editor provider torn down on foreign panel"),
        }
    }

    fn highlight_next(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_next_on(panel.as_editor_mut()?)
    }

    fn highlight_previous(&mut self, panel: &mut Panel) -> Option<Match> {
        self.highlight_previous_on(panel.as_editor_mut()?)
    }

    fn replace_current_match(&mut self, new_text: &str, panel: &mut Panel) -> bool {
        match panel.as_editor_mut() {
            Some(buffer) => self.replace_current_on(new_text, buffer),
            None => false,
        }
    }

    fn replace_all_matches(&mut self, new_text: &str, panel: &mut Panel) -> bool {
        match panel.as_editor_mut() {
            Some(buffer) => self.replace_all_on(new_text, buffer),
            None => false,
        }
    }

    fn matches(&self) -> Vec<Match> {
        self.match_state
            .values()
            .flat_map(BTreeMap::values)
            .cloned()
            .collect()
    }

    fn current_match_index(&self) -> Option<usize> {
        let current = self.current.as_ref()?;
        self.lookup(current.line, current.column).map(|m| m.index)
    }

    fn current_match(&self) -> Option<Match> {
        let current = self.current.as_ref()?;
        self.lookup(current.line, current.column).cloned()
    }

    fn poll_changes(&mut self, panel: &mut Panel) -> bool {
        match panel.as_editor() {
            Some(buffer) => self.poll_buffer(buffer),
            None => false,
        }
    }

    fn can_search_on(panel: &Panel) -> bool {
        panel.as_editor().is_some()
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/buffer.rs"]
mod tests;
