//! 搜索 provider 模块
//!
//! - BufferSearchProvider: 可编辑缓冲区（overlay 扫描 + 方向游标）
//! - OutputSearchProvider: 渲染输出（拆分文本节点 + 高亮 span）
//! - NotebookSearchProvider: 多 cell 组合（子 provider 序号拼接）
//! - SearchProviderRegistry: 按面板选择 provider

mod buffer;
mod notebook;
mod output;
mod registry;

pub use buffer::{scan_line, scan_token, BufferSearchProvider, ScanStep};
pub use notebook::NotebookSearchProvider;
pub use output::{OutputSearchProvider, FOUND_CLASSES, SELECTED_CLASS};
pub use registry::{ProviderRegistration, RegistryEvent, SearchProviderRegistry};
