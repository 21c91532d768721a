//! 搜索会话：显示状态、展示层操作、控制器

pub mod action;
pub mod controller;
pub mod state;

pub use action::SearchAction;
pub use controller::{SearchSession, SessionEvent};
pub use state::DisplayState;
