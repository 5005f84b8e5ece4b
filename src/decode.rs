//! Weakly typed deserialization of configuration values.
//!
//! Environment bindings, `${VAR}` expansion and override flags all produce
//! strings, so a typed read has to accept `"8"` for a `u32` and `"true"` for a
//! `bool`. [`from_value`] wraps a `serde_json::Value` in a deserializer that
//! converts between scalars on demand:
//!
//! - string to integer, float or bool when the target asks for one
//!   (an empty string is zero or `false`)
//! - number or bool to string when the target asks for a string
//!
//! Everything else behaves exactly like `serde_json::from_value`.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Error, Map, Value};

/// Deserialize `T` from `value`, converting scalars where the target needs it.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    T::deserialize(WeakValue(value))
}

/// Parse a bool the way configuration files spell them.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "" | "0" | "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        _ => None,
    }
}

struct WeakValue(Value);

impl WeakValue {
    fn deserialize_integer<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Value::String(s) = &self.0 else {
            return self.0.deserialize_any(visitor);
        };
        let s = s.trim();
        if s.is_empty() {
            return visitor.visit_u64(0);
        }
        if let Ok(n) = s.parse::<u64>() {
            return visitor.visit_u64(n);
        }
        if let Ok(n) = s.parse::<i64>() {
            return visitor.visit_i64(n);
        }
        self.0.deserialize_any(visitor)
    }

    fn deserialize_float<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let Value::String(s) = &self.0 else {
            return self.0.deserialize_any(visitor);
        };
        let s = s.trim();
        if s.is_empty() {
            return visitor.visit_f64(0.0);
        }
        match s.parse::<f64>() {
            Ok(n) => visitor.visit_f64(n),
            Err(_) => self.0.deserialize_any(visitor),
        }
    }
}

macro_rules! weak_integer {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                self.deserialize_integer(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for WeakValue {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(WeakSeq(items.into_iter())),
            Value::Object(map) => visitor.visit_map(WeakMap::new(map)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if let Value::String(s) = &self.0 {
            if let Some(b) = parse_bool(s) {
                return visitor.visit_bool(b);
            }
        }
        self.0.deserialize_any(visitor)
    }

    weak_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_float(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => WeakValue(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(WeakValue(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        char bytes byte_buf unit unit_struct seq tuple tuple_struct map struct identifier
    }
}

struct WeakSeq(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for WeakSeq {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Error> {
        match self.0.next() {
            Some(value) => seed.deserialize(WeakValue(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct WeakMap {
    entries: serde_json::map::IntoIter,
    pending: Option<Value>,
}

impl WeakMap {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for WeakMap {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.pending = Some(value);
        seed.deserialize(key.into_deserializer()).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        match self.pending.take() {
            Some(value) => seed.deserialize(WeakValue(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}
