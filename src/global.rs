//! Process-wide default store.
//!
//! The store is created on first use and guarded by a mutex. Every function
//! here locks it for the duration of a single call and delegates to the
//! matching [`Store`] method; reads return owned values instead of borrows.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ConfigError, Format, FromValue, Map, Store, Value};

static DEFAULT: Lazy<Mutex<Store>> = Lazy::new(|| Mutex::new(Store::new()));

/// Locks the default store for a sequence of operations.
///
/// Do not call other functions of this module while the guard is held.
pub fn default_store() -> MutexGuard<'static, Store> {
    DEFAULT.lock()
}

/// Looks up `path` using the default lookup mode.
pub fn get(path: &str) -> Option<Value> {
    DEFAULT.lock().get(path).cloned()
}

/// Looks up `path`, splitting it only if `dotted` is set.
pub fn get_value(path: &str, dotted: bool) -> Option<Value> {
    DEFAULT.lock().get_value(path, dotted).cloned()
}

/// Whether `path` resolves. Explicit nulls exist.
pub fn exists(path: &str) -> bool {
    DEFAULT.lock().exists(path)
}

/// [`exists`] with an explicit lookup mode.
pub fn exists_with(path: &str, dotted: bool) -> bool {
    DEFAULT.lock().exists_with(path, dotted)
}

/// Coerces the value at `path` into `T`.
pub fn get_as<T: FromValue>(path: &str) -> Option<T> {
    DEFAULT.lock().get_as(path)
}

/// String value at `path`, or `""`.
pub fn string(path: &str) -> String {
    DEFAULT.lock().string(path)
}

/// String value at `path`, or `default` if missing or null.
pub fn string_or(path: &str, default: &str) -> String {
    DEFAULT.lock().string_or(path, default)
}

/// All-or-nothing list of strings.
pub fn strings(path: &str) -> Vec<String> {
    DEFAULT.lock().strings(path)
}

/// Integer value at `path`, or `0`.
pub fn int(path: &str) -> i64 {
    DEFAULT.lock().int(path)
}

/// Integer value at `path`, or `default` if missing or not numeric.
pub fn int_or(path: &str, default: i64) -> i64 {
    DEFAULT.lock().int_or(path, default)
}

/// Alias of [`int`].
pub fn int64(path: &str) -> i64 {
    DEFAULT.lock().int64(path)
}

/// Alias of [`int_or`].
pub fn int64_or(path: &str, default: i64) -> i64 {
    DEFAULT.lock().int64_or(path, default)
}

/// Float value at `path`, or `0.0`.
pub fn float(path: &str) -> f64 {
    DEFAULT.lock().float(path)
}

/// Float value at `path`, or `default` if missing or not numeric.
pub fn float_or(path: &str, default: f64) -> f64 {
    DEFAULT.lock().float_or(path, default)
}

/// Boolean value at `path`, or `false`.
pub fn bool(path: &str) -> bool {
    DEFAULT.lock().bool(path)
}

/// Boolean value at `path`, or `default` unless it is a boolean.
pub fn bool_or(path: &str, default: bool) -> bool {
    DEFAULT.lock().bool_or(path, default)
}

/// All-or-nothing list of integers.
pub fn ints(path: &str) -> Vec<i64> {
    DEFAULT.lock().ints(path)
}

/// All-or-nothing mapping of integers.
pub fn int_map(path: &str) -> HashMap<String, i64> {
    DEFAULT.lock().int_map(path)
}

/// All-or-nothing mapping of strings.
pub fn string_map(path: &str) -> HashMap<String, String> {
    DEFAULT.lock().string_map(path)
}

/// Stores `value` at `path`; see [`Store::set`].
pub fn set<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<(), ConfigError> {
    DEFAULT.lock().set(path, value)
}

/// Deep-merges `data` into the default store.
pub fn load_data<T: Serialize + ?Sized>(data: &T) -> Result<(), ConfigError> {
    DEFAULT.lock().load_data(data)
}

/// Parses `input` as `format` and deep-merges it.
pub fn load_str(format: Format, input: &str) -> Result<(), ConfigError> {
    DEFAULT.lock().load_str(format, input)
}

/// Binds the subtree at `path` onto `out`; see [`Store::map_struct`].
pub fn map_struct<T>(path: &str, out: &mut T) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    DEFAULT.lock().map_struct(path, out)
}

/// Drops all data and the recorded error.
pub fn clear_all() {
    DEFAULT.lock().clear_all();
}

/// The last recorded error, if any.
pub fn error() -> Option<ConfigError> {
    DEFAULT.lock().error()
}

/// Whether the default tree holds no keys.
pub fn is_empty() -> bool {
    DEFAULT.lock().is_empty()
}

/// A copy of the whole default tree.
pub fn data() -> Map {
    DEFAULT.lock().data().clone()
}
