//! A hierarchical, dynamically-typed configuration store.
//!
//! Decoded data (from `serde_json`, `toml`, or any `serde::Serialize` value)
//! is normalized into a tree of mappings, sequences and scalars, then read
//! back through dotted paths such as `"server.hosts.0"` with best-effort
//! type coercion and default fallback.

pub mod config;
pub mod global;

pub use config::{ConfigError, Format, FromValue, Map, Options, Store, StoreBuilder, Value};
