//! 可搜索面板：宿主交给搜索引擎的内容

use super::notebook::Notebook;
use super::render_tree::RenderTree;
use super::text_buffer::TextBuffer;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Editor,
    Output,
    Notebook,
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanelKind::Editor => "editor",
            PanelKind::Output => "output",
            PanelKind::Notebook => "notebook",
        };
        f.write_str(name)
    }
}

pub enum Panel {
    Editor(TextBuffer),
    Output(RenderTree),
    Notebook(Notebook),
}

impl Panel {
    pub fn kind(&self) -> PanelKind {
        match self {
            Panel::Editor(_) => PanelKind::Editor,
            Panel::Output(_) => PanelKind::Output,
            Panel::Notebook(_) => PanelKind::Notebook,
        }
    }

    pub fn as_editor(&self) -> Option<&TextBuffer> {
        match self {
            Panel::Editor(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn as_editor_mut(&mut self) -> Option<&mut TextBuffer> {
        match self {
            Panel::Editor(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn as_output(&self) -> Option<&RenderTree> {
        match self {
            Panel::Output(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_output_mut(&mut self) -> Option<&mut RenderTree> {
        match self {
            Panel::Output(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_notebook(&self) -> Option<&Notebook> {
        match self {
            Panel::Notebook(notebook) => Some(notebook),
            _ => None,
        }
    }

    pub fn as_notebook_mut(&mut self) -> Option<&mut Notebook> {
        match self {
            Panel::Notebook(notebook) => Some(notebook),
            _ => None,
        }
    }
}
