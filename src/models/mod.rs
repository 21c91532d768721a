//! 数据模型层

pub mod notebook;
pub mod panel;
pub mod render_tree;
pub mod selection;
pub mod text_buffer;

pub use notebook::{Cell, CellId, CellKind, Notebook, NotebookMode};
pub use panel::{Panel, PanelKind};
pub use render_tree::{NodeData, NodeId, RenderTree, RenderTreeError};
pub use selection::{Position, Selection};
pub use text_buffer::{slice_to_cow, BufferChange, TextBuffer};
