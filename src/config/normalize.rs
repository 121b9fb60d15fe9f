//! Conversion of arbitrary decoded input into the canonical [`Value`] tree.
//!
//! Normalization is implemented as a [`serde::Serializer`], so anything a
//! decoder produces (`serde_json::Value`, `toml::Table`, plain maps and
//! vectors) can be brought into canonical form without format-specific code.
//! Non-string map keys are stringified; structs are rejected unless the caller
//! explicitly asks for field decomposition.

use std::fmt::Display;

use serde::ser::{self, Impossible, Serialize};
use thiserror::Error;

use super::value::{Map, Value};
use super::ConfigError;

// Private wrapper the toml crate serializes its datetime through.
const TOML_DATETIME_NAME: &str = "$__toml_private_Datetime";
const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

/// Normalizes decoded input into a canonical value tree.
///
/// Structs and struct-like enum variants are rejected: a fixed-shape record
/// has no place in a dynamically-typed tree and must be converted to a map
/// by the caller first.
pub fn normalize<T: Serialize + ?Sized>(raw: &T) -> Result<Value, ConfigError> {
    raw.serialize(Normalizer {
        records: Records::Reject,
    })
    .map_err(|e| ConfigError::Normalize(e.0))
}

/// Like [`normalize`], but decomposes structs into mappings keyed by field
/// name. Used to snapshot a binding target before it is overwritten.
pub(crate) fn decompose<T: Serialize + ?Sized>(raw: &T) -> Result<Value, ConfigError> {
    raw.serialize(Normalizer {
        records: Records::Decompose,
    })
    .map_err(|e| ConfigError::Normalize(e.0))
}

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct NormalizeError(String);

impl ser::Error for NormalizeError {
    fn custom<T: Display>(msg: T) -> Self {
        NormalizeError(msg.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Records {
    Reject,
    Decompose,
}

#[derive(Debug, Clone, Copy)]
struct Normalizer {
    records: Records,
}

fn wrap_variant(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(name) => {
            let mut map = Map::new();
            map.insert(name.to_string(), value);
            Value::Mapping(map)
        }
        None => value,
    }
}

impl ser::Serializer for Normalizer {
    type Ok = Value;
    type Error = NormalizeError;

    type SerializeSeq = SeqNormalizer;
    type SerializeTuple = SeqNormalizer;
    type SerializeTupleStruct = SeqNormalizer;
    type SerializeTupleVariant = SeqNormalizer;
    type SerializeMap = MapNormalizer;
    type SerializeStruct = RecordNormalizer;
    type SerializeStructVariant = RecordNormalizer;

    fn serialize_bool(self, v: bool) -> Result<Value, NormalizeError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, NormalizeError> {
        Ok(Value::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, NormalizeError> {
        Ok(Value::Int(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, NormalizeError> {
        Ok(i64::try_from(v).map_or(Value::Float(v as f64), Value::Int))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, NormalizeError> {
        Ok(Value::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, NormalizeError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, NormalizeError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, NormalizeError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, NormalizeError> {
        Ok(Value::Sequence(
            v.iter().map(|b| Value::Int(i64::from(*b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value, NormalizeError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, NormalizeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, NormalizeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, NormalizeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, NormalizeError> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, NormalizeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, NormalizeError> {
        Ok(wrap_variant(Some(variant), value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqNormalizer, NormalizeError> {
        Ok(SeqNormalizer {
            records: self.records,
            items: Vec::with_capacity(len.unwrap_or(0)),
            variant: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqNormalizer, NormalizeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqNormalizer, NormalizeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqNormalizer, NormalizeError> {
        Ok(SeqNormalizer {
            records: self.records,
            items: Vec::with_capacity(len),
            variant: Some(variant),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapNormalizer, NormalizeError> {
        Ok(MapNormalizer {
            records: self.records,
            map: Map::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<RecordNormalizer, NormalizeError> {
        if self.records == Records::Reject && name != TOML_DATETIME_NAME {
            return Err(NormalizeError(format!(
                "struct `{name}` cannot be stored as a configuration value; convert it to a map"
            )));
        }
        Ok(RecordNormalizer {
            records: self.records,
            name,
            map: Map::new(),
            variant: None,
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<RecordNormalizer, NormalizeError> {
        if self.records == Records::Reject {
            return Err(NormalizeError(format!(
                "struct variant `{name}::{variant}` cannot be stored as a configuration value"
            )));
        }
        Ok(RecordNormalizer {
            records: self.records,
            name,
            map: Map::new(),
            variant: Some(variant),
        })
    }
}

pub(crate) struct SeqNormalizer {
    records: Records,
    items: Vec<Value>,
    variant: Option<&'static str>,
}

impl SeqNormalizer {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        self.items.push(value.serialize(Normalizer {
            records: self.records,
        })?);
        Ok(())
    }

    fn finish(self) -> Value {
        wrap_variant(self.variant, Value::Sequence(self.items))
    }
}

impl ser::SerializeSeq for SeqNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

pub(crate) struct MapNormalizer {
    records: Records,
    map: Map,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NormalizeError> {
        self.pending_key = Some(key.serialize(KeyNormalizer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NormalizeError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| NormalizeError("map value serialized before its key".into()))?;
        let value = value.serialize(Normalizer {
            records: self.records,
        })?;
        // Distinct keys may stringify identically; the later one wins.
        if self.map.insert(key, value).is_some() {
            tracing::trace!("duplicate map key after stringification, keeping the later entry");
        }
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(Value::Mapping(self.map))
    }
}

pub(crate) struct RecordNormalizer {
    records: Records,
    name: &'static str,
    map: Map,
    variant: Option<&'static str>,
}

impl RecordNormalizer {
    fn field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), NormalizeError> {
        let value = value.serialize(Normalizer {
            records: self.records,
        })?;
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn finish(mut self) -> Value {
        if self.name == TOML_DATETIME_NAME {
            if let Some(Value::String(s)) = self.map.remove(TOML_DATETIME_FIELD) {
                return Value::String(s);
            }
        }
        wrap_variant(self.variant, Value::Mapping(self.map))
    }
}

impl ser::SerializeStruct for RecordNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), NormalizeError> {
        self.field(key, value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for RecordNormalizer {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), NormalizeError> {
        self.field(key, value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(self.finish())
    }
}

/// Turns a scalar map key into its string form.
struct KeyNormalizer;

fn key_rejected(kind: &str) -> NormalizeError {
    NormalizeError(format!("map keys must be scalars, found {kind}"))
}

impl ser::Serializer for KeyNormalizer {
    type Ok = String;
    type Error = NormalizeError;

    type SerializeSeq = Impossible<String, NormalizeError>;
    type SerializeTuple = Impossible<String, NormalizeError>;
    type SerializeTupleStruct = Impossible<String, NormalizeError>;
    type SerializeTupleVariant = Impossible<String, NormalizeError>;
    type SerializeMap = Impossible<String, NormalizeError>;
    type SerializeStruct = Impossible<String, NormalizeError>;
    type SerializeStructVariant = Impossible<String, NormalizeError>;

    fn serialize_bool(self, v: bool) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, NormalizeError> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, NormalizeError> {
        Err(key_rejected("bytes"))
    }

    fn serialize_none(self) -> Result<String, NormalizeError> {
        Err(key_rejected("none"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, NormalizeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, NormalizeError> {
        Err(key_rejected("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String, NormalizeError> {
        Err(key_rejected(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, NormalizeError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, NormalizeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, NormalizeError> {
        Err(key_rejected("enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NormalizeError> {
        Err(key_rejected("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NormalizeError> {
        Err(key_rejected("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NormalizeError> {
        Err(key_rejected("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NormalizeError> {
        Err(key_rejected("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, NormalizeError> {
        Err(key_rejected("mapping"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, NormalizeError> {
        Err(key_rejected("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, NormalizeError> {
        Err(key_rejected("struct variant"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_scalars_map_directly() {
        assert_eq!(normalize(&true).unwrap(), Value::Bool(true));
        assert_eq!(normalize(&7u8).unwrap(), Value::Int(7));
        assert_eq!(normalize(&-3i16).unwrap(), Value::Int(-3));
        assert_eq!(normalize(&23.45).unwrap(), Value::Float(23.45));
        assert_eq!(normalize("app").unwrap(), Value::String("app".into()));
        assert_eq!(normalize(&Option::<i32>::None).unwrap(), Value::Null);
        assert_eq!(normalize(&()).unwrap(), Value::Null);
    }

    #[test]
    fn test_unsigned_beyond_i64_widens_to_float() {
        let value = normalize(&u64::MAX).unwrap();
        assert!(matches!(value, Value::Float(_)));
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let mut input = BTreeMap::new();
        input.insert(1, "one");
        input.insert(2, "two");
        let value = normalize(&input).unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map["1"], Value::String("one".into()));
        assert_eq!(map["2"], Value::String("two".into()));
    }

    #[test]
    fn test_key_collision_keeps_later_entry() {
        let input = vec![(1, "first"), (1, "second")];
        // Serialize a vector of pairs as a map to force a collision.
        struct Pairs<'a>(&'a [(i32, &'a str)]);
        impl Serialize for Pairs<'_> {
            fn serialize<S: ser::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_map(self.0.iter().map(|(k, v)| (k, v)))
            }
        }
        let value = normalize(&Pairs(&input)).unwrap();
        assert_eq!(value.as_mapping().unwrap()["1"], Value::String("second".into()));
    }

    #[test]
    fn test_mixed_sequence_keeps_order() {
        let input = serde_json::json!([23, 45, "val", {"k4": "v4"}]);
        let value = normalize(&input).unwrap();
        let items = value.as_sequence().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], Value::Int(23));
        assert_eq!(items[2], Value::String("val".into()));
        assert_eq!(
            items[3].as_mapping().unwrap()["k4"],
            Value::String("v4".into())
        );
    }

    #[test]
    fn test_typed_map_is_normalized() {
        let mut input = HashMap::new();
        input.insert("a".to_string(), 1);
        input.insert("b".to_string(), 2);
        let value = normalize(&input).unwrap();
        assert_eq!(value.as_mapping().unwrap()["b"], Value::Int(2));
    }

    #[test]
    fn test_structs_are_rejected() {
        #[derive(Serialize)]
        struct Server {
            host: String,
        }
        let result = normalize(&Server {
            host: "localhost".into(),
        });
        assert!(matches!(result, Err(ConfigError::Normalize(_))));
    }

    #[test]
    fn test_structs_decompose_on_request() {
        #[derive(Serialize)]
        struct Server {
            host: String,
            port: u16,
        }
        let value = decompose(&Server {
            host: "localhost".into(),
            port: 8080,
        })
        .unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map["host"], Value::String("localhost".into()));
        assert_eq!(map["port"], Value::Int(8080));
    }

    #[test]
    fn test_sequence_keys_are_rejected() {
        let mut input = BTreeMap::new();
        input.insert(vec![1, 2], "pair");
        assert!(matches!(normalize(&input), Err(ConfigError::Normalize(_))));
    }

    #[test]
    fn test_enum_variants() {
        #[derive(Serialize)]
        enum Mode {
            Fast,
            Limit(u32),
        }
        assert_eq!(normalize(&Mode::Fast).unwrap(), Value::String("Fast".into()));
        let limited = normalize(&Mode::Limit(3)).unwrap();
        assert_eq!(limited.as_mapping().unwrap()["Limit"], Value::Int(3));
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let table: toml::Table = toml::from_str("at = 1979-05-27T07:32:00Z").unwrap();
        let value = normalize(&table).unwrap();
        assert_eq!(
            value.as_mapping().unwrap()["at"],
            Value::String("1979-05-27T07:32:00Z".into())
        );
    }
}
