use serde::Serialize;

use super::normalize::normalize;
use super::store::{Options, Store};
use super::value::Value;
use super::{ConfigError, Format};

/// A data source in the loading pipeline.
#[derive(Debug)]
enum Source {
    Data(Result<Value, ConfigError>),
    Text { format: Format, text: String },
}

/// Builder for assembling a [`Store`] from several sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested mappings are merged recursively; other values
/// (including sequences) are replaced entirely.
///
/// ## Example
///
/// ```
/// use dragon_conf::{Format, Store};
/// use serde_json::json;
///
/// let store = Store::builder()
///     .with_data(&json!({"server": {"host": "localhost", "port": 80}}))
///     .with_str(Format::Toml, "[server]\nport = 8080\n")
///     .build()?;
///
/// assert_eq!(store.string("server.host"), "localhost");
/// assert_eq!(store.int("server.port"), 8080);
/// # Ok::<(), dragon_conf::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct StoreBuilder {
    options: Options,
    sources: Vec<Source>,
}

impl StoreBuilder {
    /// Sets the path separator. Defaults to `.`.
    pub fn separator(mut self, separator: char) -> Self {
        self.options.separator = separator;
        self
    }

    /// Sets whether reads split paths into segments by default.
    pub fn dotted(mut self, dotted: bool) -> Self {
        self.options.dotted = dotted;
        self
    }

    /// Adds already-decoded data.
    ///
    /// The data is normalized immediately; a failure is reported by
    /// [`build`](Self::build).
    pub fn with_data<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        self.sources.push(Source::Data(normalize(data)));
        self
    }

    /// Adds serialized text to be parsed as `format`.
    pub fn with_str(mut self, format: Format, text: impl Into<String>) -> Self {
        self.sources.push(Source::Text {
            format,
            text: text.into(),
        });
        self
    }

    /// Builds the store by parsing and merging every source in order.
    pub fn build(self) -> Result<Store, ConfigError> {
        let mut store = Store::with_options(self.options);

        for source in self.sources {
            let value = match source {
                Source::Data(value) => value?,
                Source::Text { format, text } => format.parse(&text)?,
            };
            store.merge(value)?;
        }

        Ok(store)
    }
}
