//! Keyed bodies and the body-producing trait.
//!
//! Every filter, search clause and aggregation serializes to a
//! [`KeyedBody`]: a JSON object with exactly one key, the target field,
//! mapping to the node's payload.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{QueryError, Result};

/// A single-key mapping from a field name to a payload.
///
/// # Example
///
/// ```
/// use datakit_query::KeyedBody;
/// use serde_json::json;
///
/// let body = KeyedBody::new("age", json!({"operator": ">", "value": 18})).unwrap();
/// assert_eq!(body.field(), "age");
/// assert_eq!(body.into_value(), json!({"age": {"operator": ">", "value": 18}}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedBody {
    field: String,
    payload: Value,
}

impl KeyedBody {
    /// Creates a keyed body.
    ///
    /// Returns [`QueryError::EmptyField`] if `field` is empty.
    pub fn new(field: impl Into<String>, payload: impl Into<Value>) -> Result<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(QueryError::EmptyField);
        }
        Ok(KeyedBody {
            field,
            payload: payload.into(),
        })
    }

    /// Returns the key of this body.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the payload stored under the key.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Converts this body into a one-entry JSON object.
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.field, self.payload);
        Value::Object(map)
    }
}

impl From<KeyedBody> for Value {
    fn from(body: KeyedBody) -> Self {
        body.into_value()
    }
}

impl Serialize for KeyedBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.payload)?;
        map.end()
    }
}

/// Trait for query nodes that serialize to a [`KeyedBody`].
///
/// Implemented by [`Filter`](crate::Filter) and
/// [`Aggregation`](crate::Aggregation). Each call is one serialization pass;
/// implementations must not keep state between calls.
///
/// # Manual Implementation
///
/// ```
/// use datakit_query::{KeyedBody, Result, ToBody};
/// use serde_json::json;
///
/// struct Boost {
///     field: String,
///     factor: f64,
/// }
///
/// impl ToBody for Boost {
///     fn body(&self) -> Result<KeyedBody> {
///         KeyedBody::new(&self.field, json!({"operator": "boost", "value": self.factor}))
///     }
/// }
///
/// let boost = Boost { field: "title".into(), factor: 2.0 };
/// assert_eq!(boost.body_value().unwrap(), json!({"title": {"operator": "boost", "value": 2.0}}));
/// ```
pub trait ToBody {
    /// Produces the keyed body of this node.
    fn body(&self) -> Result<KeyedBody>;

    /// Produces the keyed body as a JSON object.
    fn body_value(&self) -> Result<Value> {
        self.body().map(KeyedBody::into_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyed_body_rejects_empty_field() {
        assert!(matches!(
            KeyedBody::new("", json!(1)),
            Err(QueryError::EmptyField)
        ));
    }

    #[test]
    fn keyed_body_single_key() {
        let body = KeyedBody::new("name", json!({"operator": "="})).unwrap();
        let value = body.clone().into_value();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["name"], json!({"operator": "="}));
        assert_eq!(body.payload(), &json!({"operator": "="}));
    }

    #[test]
    fn keyed_body_serializes_as_object() {
        let body = KeyedBody::new("f", json!([1, 2])).unwrap();
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"f":[1,2]}"#);
    }
}
