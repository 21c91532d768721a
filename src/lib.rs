//! docsearch - 多 provider 文档搜索引擎
//!
//! 模块结构：
//! - models: 内容模型（TextBuffer, RenderTree, Notebook, Panel）
//! - kernel: 搜索 provider、注册表、会话控制器
//! - logging: tracing 初始化

pub mod kernel;
pub mod logging;
pub mod models;
