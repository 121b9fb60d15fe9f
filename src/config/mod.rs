//! Configuration tree, path resolution and value coercion.

mod bind;
mod builder;
mod coerce;
mod error;
mod format;
mod normalize;
mod path;
mod store;
mod value;

pub use builder::StoreBuilder;
pub use coerce::{coerce, FromValue};
pub use error::ConfigError;
pub use format::Format;
pub use normalize::normalize;
pub use path::resolve;
pub use store::{Options, Store};
pub use value::{Map, Value};
