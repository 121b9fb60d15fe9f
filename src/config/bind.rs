//! Binding a resolved subtree onto a caller-supplied structured value.
//!
//! The subtree is fed through a [`serde::Deserializer`] that applies the
//! same coercions as the scalar accessors, matches struct fields against
//! mapping keys case-insensitively, and fills any field the subtree does not
//! mention from the target's current state. Unlike the accessors, any value
//! that cannot be coerced fails the whole bind.

use std::fmt::Display;

use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, Unexpected, Visitor,
};
use serde::{forward_to_deserialize_any, Serialize};
use thiserror::Error;

use super::coerce::{to_f64, to_i64, to_scalar_string};
use super::normalize::decompose;
use super::value::{Map, Value};

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct BindError(String);

impl de::Error for BindError {
    fn custom<T: Display>(msg: T) -> Self {
        BindError(msg.to_string())
    }
}

/// Overwrites `out` with `input`, keeping fields of `out` that `input` does
/// not provide. On error `out` is left as it was.
pub(crate) fn bind<T>(input: Value, out: &mut T) -> Result<(), String>
where
    T: Serialize + DeserializeOwned,
{
    let current = decompose(out).map_err(|e| e.to_string())?;
    let binder = Binder {
        input,
        fallback: Some(current),
    };
    *out = T::deserialize(binder).map_err(|e| e.to_string())?;
    Ok(())
}

struct Binder {
    input: Value,
    // Current state of the target at this position, consulted for struct
    // fields the input does not mention.
    fallback: Option<Value>,
}

impl Binder {
    fn plain(input: Value) -> Self {
        Binder {
            input,
            fallback: None,
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Int(i) => Unexpected::Signed(*i),
        Value::Float(f) => Unexpected::Float(*f),
        Value::String(s) => Unexpected::Str(s),
        Value::Sequence(_) => Unexpected::Seq,
        Value::Mapping(_) => Unexpected::Map,
    }
}

fn mismatch<'de, V: Visitor<'de>>(value: &Value, visitor: &V) -> BindError {
    de::Error::invalid_type(unexpected(value), visitor)
}

fn visit_sequence<'de, V: Visitor<'de>>(
    items: Vec<Value>,
    visitor: V,
) -> Result<V::Value, BindError> {
    let mut access: SeqDeserializer<_, BindError> =
        SeqDeserializer::new(items.into_iter().map(Binder::plain));
    let value = visitor.visit_seq(&mut access)?;
    access.end()?;
    Ok(value)
}

fn visit_entries<'de, V: Visitor<'de>>(
    entries: Vec<(String, Binder)>,
    visitor: V,
) -> Result<V::Value, BindError> {
    let mut access: MapDeserializer<'de, _, BindError> = MapDeserializer::new(entries.into_iter());
    let value = visitor.visit_map(&mut access)?;
    access.end()?;
    Ok(value)
}

/// Removes the entry for `field`, preferring an exact key match.
fn take_field(input: &mut Map, field: &str) -> Option<Value> {
    if let Some(value) = input.remove(field) {
        return Some(value);
    }
    let folded = field.to_lowercase();
    let key = input
        .keys()
        .find(|k| k.to_lowercase() == folded)
        .cloned()?;
    input.remove(&key)
}

impl<'de> IntoDeserializer<'de, BindError> for Binder {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for Binder {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Sequence(items) => visit_sequence(items, visitor),
            Value::Mapping(map) => visit_entries(
                map.into_iter().map(|(k, v)| (k, Binder::plain(v))).collect(),
                visitor,
            ),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Bool(b) => visitor.visit_bool(b),
            ref other => Err(mismatch(other, &visitor)),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match to_i64(&self.input) {
            Some(i) => visitor.visit_i64(i),
            None => Err(mismatch(&self.input, &visitor)),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match to_f64(&self.input) {
            Some(f) => visitor.visit_f64(f),
            None => Err(mismatch(&self.input, &visitor)),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match to_scalar_string(&self.input) {
            Some(s) => visitor.visit_string(s),
            None => Err(mismatch(&self.input, &visitor)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Null => visitor.visit_unit(),
            ref other => Err(mismatch(other, &visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Sequence(items) => visit_sequence(items, visitor),
            ref other => Err(mismatch(other, &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.input {
            Value::Mapping(map) => visit_entries(
                map.into_iter().map(|(k, v)| (k, Binder::plain(v))).collect(),
                visitor,
            ),
            ref other => Err(mismatch(other, &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let mut input = match self.input {
            Value::Mapping(map) => map,
            ref other => return Err(mismatch(other, &visitor)),
        };
        let mut current = match self.fallback {
            Some(Value::Mapping(map)) => map,
            _ => Map::new(),
        };

        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            let fallback = current.remove(*field);
            match (take_field(&mut input, field), fallback) {
                (Some(value), fallback) => entries.push((
                    field.to_string(),
                    Binder {
                        input: value,
                        fallback,
                    },
                )),
                (None, Some(existing)) => {
                    entries.push((field.to_string(), Binder::plain(existing)));
                }
                (None, None) => {}
            }
        }
        visit_entries(entries, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.input {
            Value::String(variant) => {
                let access: StringDeserializer<BindError> = variant.into_deserializer();
                visitor.visit_enum(access)
            }
            Value::Mapping(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumBinder {
                        variant,
                        value: Binder::plain(value),
                    }),
                    None => Err(de::Error::invalid_length(0, &"a single-key mapping")),
                }
            }
            ref other => Err(mismatch(other, &visitor)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf
    }
}

struct EnumBinder {
    variant: String,
    value: Binder,
}

impl<'de> de::EnumAccess<'de> for EnumBinder {
    type Error = BindError;
    type Variant = Binder;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, Binder), BindError> {
        let key: StringDeserializer<BindError> = self.variant.into_deserializer();
        Ok((seed.deserialize(key)?, self.value))
    }
}

impl<'de> de::VariantAccess<'de> for Binder {
    type Error = BindError;

    fn unit_variant(self) -> Result<(), BindError> {
        match self.input {
            Value::Null => Ok(()),
            ref other => Err(de::Error::invalid_type(unexpected(other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, BindError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_struct("", fields, visitor)
    }
}
