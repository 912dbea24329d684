use std::ops::Deref;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Optional list of annotation records.
///
/// The renderer writes empty Lua tables as `{}`, non-empty ones as arrays, and omits fields it
/// has nothing to say about. All three shapes collapse here into a plain list, so nothing past
/// deserialization needs to care which one arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotations<T>(Vec<T>);

impl<T> Annotations<T> {
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for Annotations<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for Annotations<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for Annotations<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<'a, T> IntoIterator for &'a Annotations<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Serialize> Serialize for Annotations<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Annotations<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        let items = match raw {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()
                .map_err(D::Error::custom)?,
            Some(Value::Object(map)) => {
                // Sparse Lua arrays come through keyed by index.
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                });
                entries
                    .into_iter()
                    .map(|(_, v)| serde_json::from_value(v))
                    .collect::<Result<Vec<T>, _>>()
                    .map_err(D::Error::custom)?
            }
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "expected a list of annotations, found {other}"
                )));
            }
        };
        Ok(Self(items))
    }
}

#[cfg(test)]
mod tests {
    use super::Annotations;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default)]
        items: Annotations<u32>,
    }

    fn parse(json: &str) -> Vec<u32> {
        serde_json::from_str::<Holder>(json)
            .expect("holder should parse")
            .items
            .into_vec()
    }

    #[test]
    fn absent_empty_object_and_empty_list_are_all_empty() {
        assert!(parse("{}").is_empty());
        assert!(parse(r#"{"items":{}}"#).is_empty());
        assert!(parse(r#"{"items":[]}"#).is_empty());
        assert!(parse(r#"{"items":null}"#).is_empty());
    }

    #[test]
    fn populated_list_keeps_order() {
        assert_eq!(parse(r#"{"items":[3,1,2]}"#), vec![3, 1, 2]);
    }

    #[test]
    fn keyed_object_is_read_in_numeric_key_order() {
        assert_eq!(parse(r#"{"items":{"10":5,"2":7,"1":9}}"#), vec![9, 7, 5]);
    }

    #[test]
    fn scalar_is_rejected() {
        assert!(serde_json::from_str::<Holder>(r#"{"items":"nope"}"#).is_err());
    }
}
