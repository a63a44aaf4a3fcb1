//! Record value model.
//!
//! # Responsibility
//! - Define the canonical scalar stored for every form variable.
//! - Define the flat `Record` snapshot mirrored from form controls.
//!
//! # Invariants
//! - `Value::NoValue` is distinct from `Number(0.0)` and from `Text("")`.
//! - Boolean and choice controls store their display text as `Text`.
//! - `Record` iteration order is the variable name order.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// One scalar value of the form record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numeric measurement (integral or real).
    Number(f64),
    /// Free text, checkbox display text or current choice text.
    Text(String),
    /// Sentinel for "not measured".
    NoValue,
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_no_value(&self) -> bool {
        matches!(self, Self::NoValue)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Renders the value for reports, using `no_value_text` for the sentinel.
    pub fn display_with<'a>(&'a self, no_value_text: &'a str) -> DisplayValue<'a> {
        DisplayValue {
            value: self,
            no_value_text,
        }
    }
}

/// Display adapter returned by [`Value::display_with`].
pub struct DisplayValue<'a> {
    value: &'a Value,
    no_value_text: &'a str,
}

impl Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Number(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::NoValue => f.write_str(self.no_value_text),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::NoValue => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string or null")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        Ok(Value::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::Text(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::NoValue)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::NoValue)
    }
}

/// Flat snapshot of all form variables, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Inserts or replaces one value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Keys whose value equals the value of the same key in `baseline`.
    pub fn keys_equal_to(&self, baseline: &Record) -> BTreeSet<String> {
        self.values
            .iter()
            .filter(|(key, value)| baseline.get(key) == Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, Value};

    #[test]
    fn numbers_display_without_trailing_zero_fraction() {
        assert_eq!(Value::Number(12.0).display_with("-").to_string(), "12");
        assert_eq!(Value::Number(0.5).display_with("-").to_string(), "0.5");
        assert_eq!(Value::NoValue.display_with("Ei mitattu").to_string(), "Ei mitattu");
    }

    #[test]
    fn json_maps_no_value_to_null() {
        let record: Record = [
            ("AntropPaino".to_string(), Value::Number(80.0)),
            ("TiedotNimi".to_string(), Value::text("Testi")),
            ("AntropPituus".to_string(), Value::NoValue),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"AntropPaino":80.0,"AntropPituus":null,"TiedotNimi":"Testi"}"#
        );
        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn json_rejects_non_scalar_values() {
        assert!(serde_json::from_str::<Record>(r#"{"a": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"a": true}"#).is_err());
    }

    #[test]
    fn keys_equal_to_reports_unchanged_keys() {
        let baseline: Record = [
            ("a".to_string(), Value::NoValue),
            ("b".to_string(), Value::text("")),
        ]
        .into_iter()
        .collect();
        let mut current = baseline.clone();
        current.insert("b", Value::text("x"));

        let unchanged = current.keys_equal_to(&baseline);
        assert!(unchanged.contains("a"));
        assert!(!unchanged.contains("b"));
    }
}
