//! The configuration store.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::bind::bind;
use super::builder::StoreBuilder;
use super::coerce::{coerce, FromValue};
use super::normalize::normalize;
use super::path::{lookup, segments};
use super::value::{Map, Value};
use super::{ConfigError, Format};

/// Lookup behaviour of a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Separator between path segments.
    pub separator: char,
    /// Whether reads split paths into segments by default. When `false`,
    /// paths are literal top-level keys.
    pub dotted: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            separator: '.',
            dotted: true,
        }
    }
}

/// A hierarchical configuration tree with path-qualified, coercing accessors.
///
/// Reads never fail: a missing or mistyped value yields the caller's default
/// (or the type's zero value). Writes and struct binding report errors, which
/// are also kept for later inspection through [`error`](Self::error).
///
/// ## Example
///
/// ```
/// use dragon_conf::{Format, Store};
///
/// let mut store = Store::new();
/// store.load_str(Format::Json, r#"{"server": {"port": 8080, "hosts": ["a", "b"]}}"#)?;
///
/// assert_eq!(store.int("server.port"), 8080);
/// assert_eq!(store.string("server.hosts.1"), "b");
/// assert_eq!(store.int_or("server.timeout", 30), 30);
/// # Ok::<(), dragon_conf::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    root: Map,
    options: Options,
    last_error: RefCell<Option<ConfigError>>,
}

impl Store {
    /// Creates an empty store with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Creates a builder that assembles a store from ordered sources.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Read-only view of the whole tree.
    pub fn data(&self) -> &Map {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The last error recorded by this store, if any.
    ///
    /// Failed writes and binds are recorded here as well as returned. Reads
    /// that miss record [`ConfigError::NotFound`].
    pub fn error(&self) -> Option<ConfigError> {
        self.last_error.borrow().clone()
    }

    /// Drops all data and the recorded error.
    pub fn clear_all(&mut self) {
        self.root.clear();
        *self.last_error.get_mut() = None;
        tracing::debug!("cleared configuration store");
    }

    /// Looks up `path` using the store's default lookup mode.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.get_value(path, self.options.dotted)
    }

    /// Looks up `path`, splitting it into segments only if `dotted` is set.
    pub fn get_value(&self, path: &str, dotted: bool) -> Option<&Value> {
        let found = lookup(&self.root, path, dotted, self.options.separator);
        if found.is_none() {
            tracing::trace!(path, dotted, "config path not found");
            *self.last_error.borrow_mut() = Some(ConfigError::NotFound(path.to_string()));
        }
        found
    }

    pub fn exists(&self, path: &str) -> bool {
        self.exists_with(path, self.options.dotted)
    }

    /// Whether `path` resolves to a node. Explicit nulls exist.
    pub fn exists_with(&self, path: &str, dotted: bool) -> bool {
        lookup(&self.root, path, dotted, self.options.separator).is_some()
    }

    /// Coerces the value at `path` into `T`, or `None` if it is missing or
    /// not convertible.
    pub fn get_as<T: FromValue>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(T::from_value)
    }

    pub fn string(&self, path: &str) -> String {
        self.string_or(path, "")
    }

    /// Scalars are rendered as text; sequences and mappings are rendered as
    /// `[a b]` and `{k:v}`.
    pub fn string_or(&self, path: &str, default: &str) -> String {
        match self.get(path) {
            Some(node @ (Value::Sequence(_) | Value::Mapping(_))) => node.to_string(),
            found => coerce(found, default.to_string()),
        }
    }

    pub fn strings(&self, path: &str) -> Vec<String> {
        coerce(self.get(path), Vec::new())
    }

    /// Integer read; numeric values and numeric strings are truncated to
    /// `i64`.
    pub fn int(&self, path: &str) -> i64 {
        self.int_or(path, 0)
    }

    pub fn int_or(&self, path: &str, default: i64) -> i64 {
        coerce(self.get(path), default)
    }

    /// Alias of [`int`](Self::int).
    pub fn int64(&self, path: &str) -> i64 {
        self.int64_or(path, 0)
    }

    pub fn int64_or(&self, path: &str, default: i64) -> i64 {
        coerce(self.get(path), default)
    }

    pub fn float(&self, path: &str) -> f64 {
        self.float_or(path, 0.0)
    }

    pub fn float_or(&self, path: &str, default: f64) -> f64 {
        coerce(self.get(path), default)
    }

    pub fn bool(&self, path: &str) -> bool {
        self.bool_or(path, false)
    }

    /// Only boolean values convert; numbers and strings yield `default`.
    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        coerce(self.get(path), default)
    }

    pub fn ints(&self, path: &str) -> Vec<i64> {
        coerce(self.get(path), Vec::new())
    }

    pub fn int_map(&self, path: &str) -> HashMap<String, i64> {
        coerce(self.get(path), HashMap::new())
    }

    pub fn string_map(&self, path: &str) -> HashMap<String, String> {
        coerce(self.get(path), HashMap::new())
    }

    /// Stores `value` at `path`, creating intermediate mappings as needed.
    ///
    /// Fails without touching the tree if `value` cannot be normalized or an
    /// intermediate segment holds a scalar or sequence.
    pub fn set<T: Serialize + ?Sized>(&mut self, path: &str, value: &T) -> Result<(), ConfigError> {
        let result = normalize(value).and_then(|value| self.insert(path, value));
        if result.is_ok() {
            tracing::debug!(path, "set config value");
        }
        self.settle(result)
    }

    /// Deep-merges decoded data into the tree. Mappings merge key by key;
    /// any other value replaces what was there.
    pub fn load_data<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<(), ConfigError> {
        let result = normalize(data).and_then(|value| self.merge(value));
        self.settle(result)
    }

    /// Parses `input` as `format` and merges it like [`load_data`](Self::load_data).
    pub fn load_str(&mut self, format: Format, input: &str) -> Result<(), ConfigError> {
        let result = format.parse(input).and_then(|value| self.merge(value));
        self.settle(result)
    }

    /// Binds the subtree at `path` (the whole tree if empty) onto `out`.
    ///
    /// Struct fields are matched to keys case-insensitively; fields with no
    /// matching key keep their current value and unknown keys are ignored.
    /// Values are coerced like the scalar accessors, but anything that does
    /// not convert fails the whole bind and leaves `out` unchanged.
    pub fn map_struct<T>(&self, path: &str, out: &mut T) -> Result<(), ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        let result = self.subtree(path).and_then(|input| {
            bind(input, out).map_err(|message| ConfigError::Bind {
                path: path.to_string(),
                message,
            })
        });
        if result.is_ok() {
            tracing::debug!(path, "bound config subtree");
        }
        self.settle(result)
    }

    fn subtree(&self, path: &str) -> Result<Value, ConfigError> {
        if path.is_empty() {
            return Ok(Value::Mapping(self.root.clone()));
        }
        lookup(&self.root, path, self.options.dotted, self.options.separator)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(path.to_string()))
    }

    fn insert(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidPath(path.to_string());
        let parts = segments(path, self.options.separator).ok_or_else(invalid)?;
        let (leaf, parents) = parts.split_last().ok_or_else(invalid)?;

        // Mappings created here are empty, so a blocked segment can only be
        // met before anything was created.
        let mut node = &mut self.root;
        for segment in parents {
            let slot = node
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Mapping(Map::new()));
            if slot.is_null() {
                *slot = Value::Mapping(Map::new());
            }
            node = match slot {
                Value::Mapping(map) => map,
                _ => {
                    return Err(ConfigError::PathBlocked {
                        path: path.to_string(),
                        segment: (*segment).to_string(),
                    })
                }
            };
        }
        node.insert((*leaf).to_string(), value);
        Ok(())
    }

    pub(crate) fn merge(&mut self, value: Value) -> Result<(), ConfigError> {
        match value {
            Value::Mapping(overlay) => {
                let keys = overlay.len();
                deep_merge(&mut self.root, overlay);
                tracing::debug!(keys, "merged configuration data");
                Ok(())
            }
            other => Err(ConfigError::Normalize(format!(
                "top-level configuration data must be a mapping, found {}",
                other.kind()
            ))),
        }
    }

    fn settle(&self, result: Result<(), ConfigError>) -> Result<(), ConfigError> {
        result.map_err(|err| {
            tracing::warn!(error = %err, "configuration operation failed");
            *self.last_error.borrow_mut() = Some(err.clone());
            err
        })
    }
}

fn deep_merge(base: &mut Map, overlay: Map) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(base_map)), Value::Mapping(overlay_map)) => {
                deep_merge(base_map, overlay_map);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
