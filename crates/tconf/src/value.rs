//! value representation
//!
//! Every document `tconf` reads or writes is a tree of these types
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Objects keep insertion order for serialization. Equality ignores key order.
//!
//! Mapping keys that are scalars in the source (`1: one` in yaml) are converted to strings.
use serde::{
    de::{MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserializer, Serializer,
};

pub type Map = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Parse json text into a [Value]
    pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Compact json text
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Text used when a value is spliced into a larger string
    ///
    /// Null becomes the empty string, arrays and objects become compact json.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json(),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

impl<'de> serde::de::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("any document value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or(Value::Decimal(v as f64)))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Decimal(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut array = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(element) = seq.next_element::<Value>()? {
            array.push(element);
        }
        Ok(Value::Array(array))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        use serde::de::Error;

        let mut map = Map::with_capacity(access.size_hint().unwrap_or_default());
        while let Some((key, value)) = access.next_entry::<Value, Value>()? {
            let key = match key {
                Value::Array(_) | Value::Object(_) => {
                    return Err(A::Error::custom(format!(
                        "mapping keys must be scalars, found {}",
                        key.type_name()
                    )))
                }
                Value::Null => "null".to_string(),
                scalar => scalar.to_text(),
            };
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

/// Utility macro to create a [Value] from json text
///
/// ```
/// # use tconf::document;
/// let doc = document!(r#"{ "attribute": 42 }"#);
/// assert!(doc.is_object());
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use tconf::document;
/// document!("not = valid = json");
/// ```
#[macro_export]
macro_rules! document {
    { $expr:expr } => {
        $crate::value::Value::parse_json($expr).expect("document must parse")
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equality_ignores_key_order() {
        let left = document!(r#"{"a": 1, "b": {"c": true, "d": null}}"#);
        let right = document!(r#"{"b": {"d": null, "c": true}, "a": 1}"#);
        assert_eq!(left, right);
    }

    #[test]
    fn serialization_keeps_insertion_order() {
        let doc = document!(r#"{"zeta": 1, "alpha": [1.5, "x"], "mid": null}"#);
        assert_eq!(doc.to_json(), r#"{"zeta":1,"alpha":[1.5,"x"],"mid":null}"#);
    }

    #[test]
    fn yaml_scalar_keys_become_strings() {
        let doc: Value = serde_yaml::from_str("1: one\ntrue: yes\n").unwrap();
        let expected: Value = [("1", "one"), ("true", "yes")].into_iter().collect();
        assert_eq!(doc, expected);
    }

    #[test]
    fn large_unsigned_becomes_decimal() {
        let doc = document!("18446744073709551615");
        assert!(matches!(doc, Value::Decimal(_)));
    }

    #[test]
    fn text_of_values() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Integer(2).to_text(), "2");
        assert_eq!(Value::Decimal(2.5).to_text(), "2.5");
        assert_eq!(Value::from(false).to_text(), "false");
        assert_eq!(document!(r#"{"a":[1]}"#).to_text(), r#"{"a":[1]}"#);
    }
}
