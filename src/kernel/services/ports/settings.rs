use super::search::SearchFilters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default = "default_search_outputs")]
    pub search_outputs: bool,
    #[serde(default)]
    pub selected_cells_only: bool,
    #[serde(default = "default_max_step_attempts")]
    pub max_step_attempts: usize,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_search_outputs() -> bool {
    true
}

fn default_max_step_attempts() -> usize {
    10_000
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            output: self.search_outputs,
            selected_cells: self.selected_cells_only,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            case_sensitive: false,
            use_regex: false,
            search_outputs: default_search_outputs(),
            selected_cells_only: false,
            max_step_attempts: default_max_step_attempts(),
        }
    }
}
