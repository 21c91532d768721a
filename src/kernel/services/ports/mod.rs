//! Service ports: traits + data contracts.

pub mod query;
pub mod search;
pub mod settings;

pub use query::SearchQuery;
pub use search::{
    Match, ProviderFactory, Result, SearchError, SearchFilters, SearchProvider,
};
pub use settings::SearchSettings;
