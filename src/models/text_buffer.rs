//! 文本缓冲区模型
//!
//! 职责：
//! - 文本存储（Rope）
//! - 选区管理
//! - 行列 ↔ 字符偏移映射
//! - 变更日志（供搜索 overlay 增量刷新）

use super::selection::{Position, Selection};
use ropey::{Rope, RopeSlice};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::ops::Range;

const CHANGE_JOURNAL_LIMIT: usize = 256;

/// 从 RopeSlice 获取字符串，优先零拷贝
pub fn slice_to_cow(slice: RopeSlice<'_>) -> Cow<'_, str> {
    match slice.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(slice.to_string()),
    }
}

/// ropey 认可的行尾：CRLF 以及单字符换行
fn strip_line_break(line: &str) -> &str {
    if let Some(rest) = line.strip_suffix("\r\n") {
        return rest;
    }
    line.strip_suffix([
        '\n', '\r', '\u{000B}', '\u{000C}', '\u{0085}', '\u{2028}', '\u{2029}',
    ])
    .unwrap_or(line)
}

/// 一次编辑的行级摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferChange {
    pub version: u64,
    pub start_line: usize,
    /// 被删除文本覆盖的行片段数（单行内编辑为 1）
    pub removed_lines: usize,
    /// 插入文本的行片段数（不含换行为 1）
    pub inserted_lines: usize,
}

impl BufferChange {
    pub fn is_bulk(&self) -> bool {
        self.removed_lines > 1 || self.inserted_lines > 1
    }
}

#[derive(Clone)]
pub struct TextBuffer {
    rope: Rope,
    selection: Selection,
    version: u64,
    changes: VecDeque<BufferChange>,
    focused: bool,
    revealed: Option<Position>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selection: Selection::default(),
            version: 0,
            changes: VecDeque::new(),
            focused: false,
            revealed: None,
        }
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// 行文本（不含行尾换行符）
    pub fn line_text(&self, row: usize) -> Option<Cow<'_, str>> {
        if row >= self.rope.len_lines() {
            return None;
        }
        let line = slice_to_cow(self.rope.line(row));
        let trimmed_len = strip_line_break(&line).len();
        Some(match line {
            Cow::Borrowed(s) => Cow::Borrowed(&s[..trimmed_len]),
            Cow::Owned(mut s) => {
                s.truncate(trimmed_len);
                Cow::Owned(s)
            }
        })
    }

    pub fn line_len_chars(&self, row: usize) -> usize {
        self.line_text(row).map(|l| l.chars().count()).unwrap_or(0)
    }

    pub fn start_position(&self) -> Position {
        (0, 0)
    }

    pub fn end_position(&self) -> Position {
        let last = self.rope.len_lines().saturating_sub(1);
        (last, self.line_len_chars(last))
    }

    pub fn clamp_position(&self, pos: Position) -> Position {
        let last = self.rope.len_lines().saturating_sub(1);
        let row = pos.0.min(last);
        (row, pos.1.min(self.line_len_chars(row)))
    }

    pub fn pos_to_char(&self, pos: Position) -> usize {
        let (row, col) = self.clamp_position(pos);
        self.rope.line_to_char(row) + col
    }

    pub fn char_to_pos(&self, char_idx: usize) -> Position {
        let char_idx = char_idx.min(self.rope.len_chars());
        let row = self.rope.char_to_line(char_idx);
        (row, char_idx - self.rope.line_to_char(row))
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Selection::new(
            self.clamp_position(selection.anchor()),
            self.clamp_position(selection.head()),
        );
    }

    pub fn set_cursor(&mut self, pos: Position) {
        self.selection = Selection::caret(self.clamp_position(pos));
    }

    pub fn selected_text(&self) -> String {
        let (start, end) = self.selection.range();
        let start = self.pos_to_char(start);
        let end = self.pos_to_char(end);
        self.rope.slice(start..end).to_string()
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// 请求宿主把位置滚动到可见区域
    pub fn reveal(&mut self, pos: Position) {
        self.revealed = Some(pos);
    }

    pub fn revealed(&self) -> Option<Position> {
        self.revealed
    }

    pub fn insert(&mut self, pos: Position, text: &str) {
        self.replace_range(pos, pos, text);
    }

    /// 替换 [start, end) 区间，光标落在插入文本末尾
    pub fn replace_range(&mut self, start: Position, end: Position, text: &str) {
        let start_char = self.pos_to_char(start.min(end));
        let end_char = self.pos_to_char(start.max(end));
        let start_line = self.rope.char_to_line(start_char);
        let removed_lines = self.rope.char_to_line(end_char) - start_line + 1;

        self.rope.remove(start_char..end_char);
        self.rope.insert(start_char, text);

        let inserted_end = start_char + text.chars().count();
        let inserted_lines = self.rope.char_to_line(inserted_end) - start_line + 1;
        self.selection = Selection::caret(self.char_to_pos(inserted_end));
        self.record_change(start_line, removed_lines, inserted_lines);
    }

    /// 原子地应用一组互不重叠的编辑（字符区间），只记录一次变更
    pub fn apply_edits(&mut self, mut edits: Vec<(Range<usize>, String)>) -> bool {
        if edits.is_empty() {
            return false;
        }
        edits.sort_by_key(|(range, _)| range.start);

        let first_char = edits[0].0.start.min(self.rope.len_chars());
        let last_char = edits
            .last()
            .map(|(range, _)| range.end.min(self.rope.len_chars()))
            .unwrap_or(first_char);
        let start_line = self.rope.char_to_line(first_char);
        let removed_lines = self.rope.char_to_line(last_char) - start_line + 1;

        let anchor = self.pos_to_char(self.selection.anchor());
        let head = self.pos_to_char(self.selection.head());

        let lines_before = self.rope.len_lines();
        for (range, text) in edits.iter().rev() {
            let start = range.start.min(self.rope.len_chars());
            let end = range.end.min(self.rope.len_chars()).max(start);
            self.rope.remove(start..end);
            self.rope.insert(start, text);
        }

        let map_offset = |offset: usize| -> usize {
            let mut delta: isize = 0;
            for (range, text) in &edits {
                let new_len = text.chars().count();
                if range.end <= offset {
                    delta += new_len as isize - range.len() as isize;
                } else if range.start < offset {
                    return (range.start as isize + delta) as usize + new_len;
                } else {
                    break;
                }
            }
            (offset as isize + delta).max(0) as usize
        };
        let anchor = self.char_to_pos(map_offset(anchor));
        let head = self.char_to_pos(map_offset(head));
        self.selection = Selection::new(anchor, head);

        // 行数差按 ropey 的换行规则计算
        let inserted_lines = (removed_lines + self.rope.len_lines())
            .saturating_sub(lines_before)
            .max(1);
        self.record_change(start_line, removed_lines, inserted_lines);
        true
    }

    /// 自 `since` 之后的所有变更；日志已被截断时返回 None
    pub fn changes_since(&self, since: u64) -> Option<Vec<BufferChange>> {
        if since >= self.version {
            return Some(Vec::new());
        }
        let oldest = self.changes.front()?.version;
        if oldest > since + 1 {
            return None;
        }
        Some(
            self.changes
                .iter()
                .filter(|c| c.version > since)
                .copied()
                .collect(),
        )
    }

    fn record_change(&mut self, start_line: usize, removed_lines: usize, inserted_lines: usize) {
        self.version += 1;
        if self.changes.len() >= CHANGE_JOURNAL_LIMIT {
            self.changes.pop_front();
        }
        self.changes.push_back(BufferChange {
            version: self.version,
            start_line,
            removed_lines,
            inserted_lines,
        });
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/text_buffer.rs"]
mod tests;
