//! Service adapters: provider implementations and settings IO.

pub mod search;
pub mod settings;

pub use search::{
    scan_line, scan_token, BufferSearchProvider, NotebookSearchProvider, OutputSearchProvider,
    ProviderRegistration, RegistryEvent, ScanStep, SearchProviderRegistry,
};
pub use settings::{
    ensure_log_dir, ensure_settings_file, get_log_dir, get_settings_path, load_settings,
    load_settings_from, write_default_settings,
};
