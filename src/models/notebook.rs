//! Notebook 模型
//!
//! 有序的 cell 序列。每个 cell 拥有可编辑的输入缓冲区，
//! 代码 cell 可带渲染输出，markdown cell 可处于渲染/源码两种状态。

use super::render_tree::RenderTree;
use super::text_buffer::TextBuffer;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static CELL_ID: AtomicU64 = AtomicU64::new(1);

/// cell 的稳定标识，不随插入/移动变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(CELL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Code,
    Markdown,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotebookMode {
    #[default]
    Command,
    Edit,
}

pub struct Cell {
    id: CellId,
    kind: CellKind,
    buffer: TextBuffer,
    outputs: Option<RenderTree>,
    rendered_view: Option<RenderTree>,
    input_hidden: bool,
}

impl Cell {
    pub fn code(source: &str) -> Self {
        Self {
            id: CellId::next(),
            kind: CellKind::Code,
            buffer: TextBuffer::from_text(source),
            outputs: None,
            rendered_view: None,
            input_hidden: false,
        }
    }

    /// markdown cell 创建后即处于渲染状态
    pub fn markdown(source: &str) -> Self {
        Self {
            id: CellId::next(),
            kind: CellKind::Markdown,
            buffer: TextBuffer::from_text(source),
            outputs: None,
            rendered_view: Some(RenderTree::from_markdown(source)),
            input_hidden: false,
        }
    }

    pub fn raw(source: &str) -> Self {
        Self {
            id: CellId::next(),
            kind: CellKind::Raw,
            buffer: TextBuffer::from_text(source),
            outputs: None,
            rendered_view: None,
            input_hidden: false,
        }
    }

    pub fn with_outputs(mut self, outputs: RenderTree) -> Self {
        self.set_outputs(outputs);
        self
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn outputs(&self) -> Option<&RenderTree> {
        self.outputs.as_ref()
    }

    pub fn outputs_mut(&mut self) -> Option<&mut RenderTree> {
        self.outputs.as_mut()
    }

    pub fn set_outputs(&mut self, outputs: RenderTree) {
        if self.kind == CellKind::Code {
            self.outputs = Some(outputs);
        }
    }

    pub fn has_outputs(&self) -> bool {
        self.outputs
            .as_ref()
            .is_some_and(|tree| !tree.children(tree.root()).is_empty())
    }

    pub fn input_hidden(&self) -> bool {
        self.input_hidden
    }

    pub fn set_input_hidden(&mut self, hidden: bool) {
        self.input_hidden = hidden;
    }

    pub fn is_rendered(&self) -> bool {
        self.kind == CellKind::Markdown && self.rendered_view.is_some()
    }

    /// 切换 markdown cell 的渲染状态；渲染时从当前源码重新生成视图
    pub fn set_rendered(&mut self, rendered: bool) {
        if self.kind != CellKind::Markdown {
            return;
        }
        self.rendered_view = if rendered {
            Some(RenderTree::from_markdown(&self.buffer.text()))
        } else {
            None
        };
    }

    pub fn rendered_view(&self) -> Option<&RenderTree> {
        self.rendered_view.as_ref()
    }
}

#[derive(Default)]
pub struct Notebook {
    cells: Vec<Cell>,
    active_cell: usize,
    selected: FxHashSet<usize>,
    mode: NotebookMode,
    structure_version: u64,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cell_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    pub fn index_of(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id == id)
    }

    pub fn cell_by_id_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.id == id)
    }

    pub fn active_cell(&self) -> usize {
        self.active_cell
    }

    pub fn set_active_cell(&mut self, index: usize) {
        self.active_cell = index.min(self.cells.len().saturating_sub(1));
    }

    pub fn active(&self) -> Option<&Cell> {
        self.cells.get(self.active_cell)
    }

    pub fn mode(&self) -> NotebookMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: NotebookMode) {
        self.mode = mode;
    }

    /// 结构版本：增删、移动 cell 时递增
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    pub fn select(&mut self, index: usize) {
        if index < self.cells.len() {
            self.selected.insert(index);
        }
    }

    pub fn deselect(&mut self, index: usize) {
        self.selected.remove(&index);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// 已选中的 cell（升序）
    pub fn selected_cells(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.selected.iter().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn push_cell(&mut self, cell: Cell) {
        self.insert_cell(self.cells.len(), cell);
    }

    pub fn insert_cell(&mut self, index: usize, cell: Cell) {
        let index = index.min(self.cells.len());
        self.cells.insert(index, cell);
        self.selected = self
            .selected
            .iter()
            .map(|&i| if i >= index { i + 1 } else { i })
            .collect();
        if self.cells.len() > 1 && self.active_cell >= index {
            self.active_cell += 1;
        }
        self.set_active_cell(self.active_cell);
        self.structure_version += 1;
    }

    pub fn remove_cell(&mut self, index: usize) -> Option<Cell> {
        if index >= self.cells.len() {
            return None;
        }
        let cell = self.cells.remove(index);
        self.selected = self
            .selected
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        if self.active_cell > index {
            self.active_cell -= 1;
        }
        self.set_active_cell(self.active_cell);
        self.structure_version += 1;
        Some(cell)
    }

    pub fn move_cell(&mut self, from: usize, to: usize) {
        if from >= self.cells.len() || from == to {
            return;
        }
        let was_active = self.active_cell == from;
        let was_selected = self.selected.contains(&from);
        let Some(cell) = self.remove_cell(from) else {
            return;
        };
        let to = to.min(self.cells.len());
        self.insert_cell(to, cell);
        if was_selected {
            self.selected.insert(to);
        }
        if was_active {
            self.active_cell = to;
        }
        // remove + insert 各记一次，合并为一次结构变更
        self.structure_version -= 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/notebook.rs"]
mod tests;
