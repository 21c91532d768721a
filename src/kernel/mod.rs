//! Headless search core: services (ports + adapters) and the session controller.

pub mod services;
pub mod session;

pub use services::adapters::{
    BufferSearchProvider, NotebookSearchProvider, OutputSearchProvider, ProviderRegistration,
    RegistryEvent, SearchProviderRegistry,
};
pub use services::ports::{
    Match, ProviderFactory, SearchError, SearchFilters, SearchProvider, SearchQuery,
    SearchSettings,
};
pub use session::{DisplayState, SearchAction, SearchSession, SessionEvent};
