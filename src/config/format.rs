use std::fmt;

use super::normalize::normalize;
use super::value::Value;
use super::ConfigError;

/// Serialized formats accepted by [`Store::load_str`](super::Store::load_str).
///
/// Parsing is delegated to `serde_json` and `toml`; the decoded tree is then
/// normalized like any other input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("JSON"),
            Format::Toml => f.write_str("TOML"),
        }
    }
}

impl Format {
    pub(crate) fn parse(self, input: &str) -> Result<Value, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            format: self,
            message,
        };
        match self {
            Format::Json => {
                let decoded: serde_json::Value =
                    serde_json::from_str(input).map_err(|e| parse_error(e.to_string()))?;
                normalize(&decoded)
            }
            Format::Toml => {
                let decoded: toml::Table =
                    toml::from_str(input).map_err(|e| parse_error(e.to_string()))?;
                normalize(&decoded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let value = Format::Json.parse(r#"{"age": 123, "arr": [1, "a"]}"#).unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map["age"], Value::Int(123));
        assert_eq!(map["arr"].as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_toml() {
        let value = Format::Toml
            .parse("name = \"app\"\n[server]\nport = 8080\n")
            .unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map["name"], Value::String("app".into()));
        assert_eq!(map["server"].as_mapping().unwrap()["port"], Value::Int(8080));
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Format::Toml.parse("name = ").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse {
                format: Format::Toml,
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to parse TOML data"));
    }
}
