//! 搜索浮层的显示状态
//!
//! 只由会话控制器修改，通过快照（clone）发布给展示层。

use crate::kernel::services::ports::{SearchFilters, SearchQuery};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub search_text: String,
    pub replace_text: String,
    #[serde(skip)]
    pub query: Option<SearchQuery>,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub current_index: Option<usize>,
    pub total_matches: usize,
    pub error_message: String,
    pub search_input_focused: bool,
    pub replace_input_focused: bool,
    pub force_focus: bool,
    pub replace_entry_shown: bool,
    pub filters: SearchFilters,
    pub filters_open: bool,
    pub is_read_only: bool,
    pub has_outputs: bool,
}

impl DisplayState {
    /// 实际生效的查询模式
    pub fn query_pattern(&self) -> Option<&str> {
        self.query.as_ref().map(SearchQuery::pattern)
    }

    /// 匹配计数文本："-/-"、"-/5"、"3/5"
    pub fn match_count_display(&self) -> String {
        if self.total_matches == 0 {
            return "-/-".to_string();
        }
        match self.current_index {
            Some(current) => format!("{}/{}", current + 1, self.total_matches),
            None => format!("-/{}", self.total_matches),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error_message.is_empty()
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            replace_text: String::new(),
            query: None,
            case_sensitive: false,
            use_regex: false,
            current_index: None,
            total_matches: 0,
            error_message: String::new(),
            search_input_focused: true,
            replace_input_focused: false,
            force_focus: true,
            replace_entry_shown: false,
            filters: SearchFilters::default(),
            filters_open: false,
            is_read_only: false,
            has_outputs: false,
        }
    }
}
