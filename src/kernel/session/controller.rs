//! 搜索会话控制器
//!
//! 持有显示状态与 provider；输入经去抖（截止时间 + tick 轮询）后重新查询，
//! 导航/替换转发给 provider，结束时恰好拆除一次。

use super::action::SearchAction;
use super::state::DisplayState;
use crate::kernel::services::adapters::SearchProviderRegistry;
use crate::kernel::services::ports::{
    Result, SearchError, SearchFilters, SearchProvider, SearchQuery, SearchSettings,
};
use crate::models::Panel;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    DisplayUpdated(DisplayState),
    Disposed,
}

pub struct SearchSession {
    provider: Box<dyn SearchProvider>,
    state: DisplayState,
    debounce: Duration,
    pending_deadline: Option<Instant>,
    disposed: bool,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl SearchSession {
    /// 为面板选择 provider 并打开会话；预填文本非空时立即搜索
    pub fn open(
        registry: &SearchProviderRegistry,
        panel: &mut Panel,
        settings: &SearchSettings,
    ) -> Result<Self> {
        let mut provider = registry
            .provider_for_panel(panel)
            .ok_or(SearchError::NoProvider(panel.kind()))?;
        provider.apply_settings(settings);

        let state = DisplayState {
            search_text: provider.initial_query(panel),
            case_sensitive: settings.case_sensitive,
            use_regex: settings.use_regex,
            filters: settings.filters(),
            is_read_only: provider.is_read_only(),
            has_outputs: provider.has_outputs(),
            ..DisplayState::default()
        };
        tracing::debug!(provider = provider.name(), panel = %panel.kind(), "search session opened");

        let mut session = Self {
            provider,
            state,
            debounce: settings.debounce(),
            pending_deadline: None,
            disposed: false,
            subscribers: Vec::new(),
        };
        if !session.state.search_text.is_empty() {
            session.execute_search(panel, true, None, false);
        }
        Ok(session)
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn snapshot(&self) -> DisplayState {
        self.state.clone()
    }

    pub fn provider(&self) -> &dyn SearchProvider {
        self.provider.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending_deadline
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// 编译文本并搜索：查询变化（或强制）时重新开始，否则按方向导航
    pub fn execute_search(
        &mut self,
        panel: &mut Panel,
        forward: bool,
        override_text: Option<&str>,
        force_restart: bool,
    ) {
        if self.disposed {
            return;
        }
        self.pending_deadline = None;

        let text = override_text.unwrap_or(&self.state.search_text).to_string();
        let query = match SearchQuery::parse(&text, self.state.case_sensitive, self.state.use_regex)
        {
            Ok(query) => {
                self.state.error_message.clear();
                query
            }
            Err(e) => {
                self.state.error_message = e.to_string();
                self.update_display();
                return;
            }
        };

        if force_restart || self.state.query.as_ref() != Some(&query) {
            let filters = self.state.filters;
            self.start_query(panel, query, filters);
        } else if forward {
            self.navigate(panel, false);
        } else {
            self.navigate(panel, true);
        }
    }

    fn start_query(&mut self, panel: &mut Panel, query: SearchQuery, filters: SearchFilters) {
        if self.state.query.is_some() {
            self.provider.end_query(panel);
        }
        self.state.filters = filters;
        match self.provider.start_query(&query, panel, &filters) {
            Ok(_) => self.state.query = Some(query),
            Err(e) => {
                tracing::warn!(error = %e, "start query failed");
                self.state.error_message = e.to_string();
                self.state.query = None;
            }
        }
        self.update_indices();
    }

    /// 输入变化：推迟到 `now + debounce` 再查询，新的输入覆盖旧的截止时间
    pub fn set_search_text(&mut self, text: &str, now: Instant) {
        if self.disposed {
            return;
        }
        self.state.search_text = text.to_string();
        self.pending_deadline = Some(now + self.debounce);
        self.update_display();
    }

    pub fn set_replace_text(&mut self, text: &str) {
        self.state.replace_text = text.to_string();
        self.update_display();
    }

    /// 宿主 tick：到期的去抖查询 + provider 内容变化
    pub fn tick(&mut self, panel: &mut Panel, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        let mut changed = false;
        if self.pending_deadline.is_some_and(|deadline| now >= deadline) {
            self.pending_deadline = None;
            self.execute_search(panel, true, None, false);
            changed = true;
        }
        if self.state.query.is_some() && self.provider.poll_changes(panel) {
            self.update_indices();
            changed = true;
        }
        changed
    }

    pub fn highlight_next(&mut self, panel: &mut Panel) {
        self.navigate(panel, false);
    }

    pub fn highlight_previous(&mut self, panel: &mut Panel) {
        self.navigate(panel, true);
    }

    fn navigate(&mut self, panel: &mut Panel, reverse: bool) {
        if self.disposed || self.flush_pending(panel) || self.state.query.is_none() {
            return;
        }
        if reverse {
            self.provider.highlight_previous(panel);
        } else {
            self.provider.highlight_next(panel);
        }
        self.update_indices();
    }

    pub fn replace_current(&mut self, panel: &mut Panel) -> bool {
        if self.disposed {
            return false;
        }
        self.flush_pending(panel);
        if self.state.query.is_none() {
            return false;
        }
        let replaced = self
            .provider
            .replace_current_match(&self.state.replace_text, panel);
        self.update_indices();
        replaced
    }

    pub fn replace_all(&mut self, panel: &mut Panel) -> bool {
        if self.disposed {
            return false;
        }
        self.flush_pending(panel);
        if self.state.query.is_none() {
            return false;
        }
        let replaced = self
            .provider
            .replace_all_matches(&self.state.replace_text, panel);
        self.update_indices();
        replaced
    }

    pub fn toggle_case_sensitive(&mut self, panel: &mut Panel) {
        self.state.case_sensitive = !self.state.case_sensitive;
        self.execute_search(panel, true, None, true);
    }

    pub fn toggle_regex(&mut self, panel: &mut Panel) {
        self.state.use_regex = !self.state.use_regex;
        self.execute_search(panel, true, None, true);
    }

    pub fn toggle_search_output(&mut self, panel: &mut Panel) {
        self.state.filters.output = !self.state.filters.output;
        self.execute_search(panel, true, None, true);
    }

    pub fn toggle_selected_cells(&mut self, panel: &mut Panel) {
        self.state.filters.selected_cells = !self.state.filters.selected_cells;
        self.execute_search(panel, true, None, true);
    }

    pub fn toggle_replace_entry(&mut self) {
        self.state.replace_entry_shown = !self.state.replace_entry_shown;
        self.update_display();
    }

    pub fn toggle_filters_open(&mut self) {
        self.state.filters_open = !self.state.filters_open;
        self.update_display();
    }

    pub fn set_search_input_focused(&mut self, focused: bool) {
        if self.state.search_input_focused != focused {
            self.state.search_input_focused = focused;
            self.update_display();
        }
    }

    pub fn set_replace_input_focused(&mut self, focused: bool) {
        if self.state.replace_input_focused != focused {
            self.state.replace_input_focused = focused;
            self.update_display();
        }
    }

    /// 强制展示层把焦点放回搜索框（只在这一次发布中为 true）
    pub fn focus_input(&mut self) {
        self.state.force_focus = true;
        self.state.search_input_focused = true;
        self.publish();
        self.state.force_focus = false;
    }

    /// 仅搜索选中 cell 时，活动 cell 变化需要重新查询
    pub fn on_active_unit_changed(&mut self, panel: &mut Panel) {
        if self.disposed || !self.state.filters.selected_cells {
            return;
        }
        let Some(query) = self.state.query.clone() else {
            return;
        };
        let filters = self.state.filters;
        self.start_query(panel, query, filters);
    }

    pub fn update_indices(&mut self) {
        self.state.total_matches = self.provider.matches().len();
        self.state.current_index = self.provider.current_match_index();
        self.update_display();
    }

    /// 结束会话；只有运行过查询时才拆除 provider 的搜索
    pub fn dispose(&mut self, panel: &mut Panel) {
        if self.disposed {
            return;
        }
        if self.state.query.is_some() {
            self.provider.end_search(panel);
        }
        self.finish();
    }

    /// 面板已经不存在时结束会话
    pub fn detach(&mut self) {
        if self.disposed {
            return;
        }
        self.finish();
    }

    pub fn dispatch(&mut self, action: SearchAction, panel: &mut Panel, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        let before = self.state.clone();
        match action {
            SearchAction::SearchTextChanged(text) => self.set_search_text(&text, now),
            SearchAction::ReplaceTextChanged(text) => self.set_replace_text(&text),
            SearchAction::StartQuery { forward } => self.execute_search(panel, forward, None, false),
            SearchAction::HighlightNext => self.highlight_next(panel),
            SearchAction::HighlightPrevious => self.highlight_previous(panel),
            SearchAction::ReplaceCurrent => {
                self.replace_current(panel);
            }
            SearchAction::ReplaceAll => {
                self.replace_all(panel);
            }
            SearchAction::ToggleCaseSensitive => self.toggle_case_sensitive(panel),
            SearchAction::ToggleRegex => self.toggle_regex(panel),
            SearchAction::ToggleSearchOutput => self.toggle_search_output(panel),
            SearchAction::ToggleSelectedCells => self.toggle_selected_cells(panel),
            SearchAction::ToggleReplaceEntry => self.toggle_replace_entry(),
            SearchAction::ToggleFiltersOpen => self.toggle_filters_open(),
            SearchAction::SearchInputFocused(focused) => self.set_search_input_focused(focused),
            SearchAction::ReplaceInputFocused(focused) => self.set_replace_input_focused(focused),
            SearchAction::FocusInput => self.focus_input(),
            SearchAction::ActiveUnitChanged => self.on_active_unit_changed(panel),
            SearchAction::EndSearch => {
                self.dispose(panel);
                return true;
            }
        }
        before != self.state
    }

    /// 有待执行的去抖查询时立即执行；返回是否执行了
    fn flush_pending(&mut self, panel: &mut Panel) -> bool {
        if self.pending_deadline.take().is_none() {
            return false;
        }
        self.execute_search(panel, true, None, false);
        true
    }

    fn finish(&mut self) {
        self.disposed = true;
        self.pending_deadline = None;
        self.state.query = None;
        tracing::debug!(provider = self.provider.name(), "search session disposed");
        for tx in self.subscribers.drain(..) {
            let _ = tx.send(SessionEvent::Disposed);
        }
    }

    fn update_display(&mut self) {
        self.state.force_focus = false;
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.state.clone();
        self.subscribers
            .retain(|tx| tx.send(SessionEvent::DisplayUpdated(snapshot.clone())).is_ok());
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/session/controller.rs"]
mod tests;
