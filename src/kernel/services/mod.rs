//! Services layer (ports + adapters).
//!
//! - `ports`: pure contracts/types (query, match, provider trait, settings).
//! - `adapters`: provider implementations and settings file IO.

pub mod adapters;
pub mod ports;
