/// 展示层发给会话的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// 输入框内容变化，经去抖后重新查询
    SearchTextChanged(String),
    ReplaceTextChanged(String),
    /// Enter / Shift+Enter：新查询，或在查询不变时导航
    StartQuery { forward: bool },
    HighlightNext,
    HighlightPrevious,
    ReplaceCurrent,
    ReplaceAll,
    ToggleCaseSensitive,
    ToggleRegex,
    ToggleSearchOutput,
    ToggleSelectedCells,
    ToggleReplaceEntry,
    ToggleFiltersOpen,
    SearchInputFocused(bool),
    ReplaceInputFocused(bool),
    FocusInput,
    ActiveUnitChanged,
    EndSearch,
}
