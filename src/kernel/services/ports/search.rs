use super::query::SearchQuery;
use super::settings::SearchSettings;
use crate::models::{Panel, PanelKind};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    InvalidPattern(regex::Error),
    UnsupportedPanel {
        provider: &'static str,
        panel: PanelKind,
    },
    NoProvider(PanelKind),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::InvalidPattern(e) => write!(f, "Invalid regex: {}", e),
            SearchError::UnsupportedPanel { provider, panel } => {
                write!(f, "{} provider cannot search a {} panel", provider, panel)
            }
            SearchError::NoProvider(kind) => {
                write!(f, "No search provider registered for {} panels", kind)
            }
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::InvalidPattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<regex::Error> for SearchError {
    fn from(e: regex::Error) -> Self {
        SearchError::InvalidPattern(e)
    }
}

/// 一处匹配
///
/// `line`/`column` 从 0 开始，`column` 以字符计；`unit` 为所属 cell（非组合 provider 为 0）；
/// `index` 是展平后的全局序号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub unit: usize,
    pub index: usize,
}

impl Match {
    pub fn new(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            text: text.into(),
            line,
            column,
            unit: 0,
            index: 0,
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default = "default_true")]
    pub output: bool,
    #[serde(default)]
    pub selected_cells: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            output: true,
            selected_cells: false,
        }
    }
}

/// 搜索 provider：绑定到一个面板，面板在每次调用时由调用方传入
pub trait SearchProvider {
    fn name(&self) -> &'static str;

    fn is_read_only(&self) -> bool;

    fn has_outputs(&self) -> bool {
        false
    }

    /// 打开搜索框时预填的文本
    fn initial_query(&self, panel: &Panel) -> String;

    fn apply_settings(&mut self, _settings: &SearchSettings) {}

    /// 先结束上一次查询，再建立新的匹配集合
    fn start_query(
        &mut self,
        query: &SearchQuery,
        panel: &mut Panel,
        filters: &SearchFilters,
    ) -> Result<Vec<Match>>;

    /// 清理匹配状态并撤销对内容的修改；可重复调用
    fn end_query(&mut self, panel: &mut Panel);

    fn end_search(&mut self, panel: &mut Panel);

    fn highlight_next(&mut self, panel: &mut Panel) -> Option<Match>;

    fn highlight_previous(&mut self, panel: &mut Panel) -> Option<Match>;

    fn replace_current_match(&mut self, new_text: &str, panel: &mut Panel) -> bool;

    fn replace_all_matches(&mut self, new_text: &str, panel: &mut Panel) -> bool;

    fn matches(&self) -> Vec<Match>;

    fn current_match_index(&self) -> Option<usize>;

    fn current_match(&self) -> Option<Match>;

    /// 消化面板的外部修改；匹配集合发生变化时返回 true
    fn poll_changes(&mut self, panel: &mut Panel) -> bool;

    fn can_search_on(panel: &Panel) -> bool
    where
        Self: Sized;
}

/// 注册表中的 provider 工厂
#[derive(Clone, Copy)]
pub struct ProviderFactory {
    pub can_search_on: fn(&Panel) -> bool,
    pub create: fn() -> Box<dyn SearchProvider>,
}

impl ProviderFactory {
    pub fn of<P>() -> Self
    where
        P: SearchProvider + Default + 'static,
    {
        Self {
            can_search_on: P::can_search_on,
            create: create_boxed::<P>,
        }
    }
}

fn create_boxed<P>() -> Box<dyn SearchProvider>
where
    P: SearchProvider + Default + 'static,
{
    Box::new(P::default())
}
